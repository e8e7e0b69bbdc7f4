//! Provider descriptors and the per-category ladder registry.

use crate::TaskCategory;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

/// Identifier of a model provider entry in a ladder.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProviderId(String);

impl ProviderId {
    /// Create a new ProviderId from a string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the inner string reference.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ProviderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ProviderId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Relative cost/capability band of a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CostClass {
    /// Cheap and fast, less capable.
    Economy,
    /// Balanced default tier.
    Standard,
    /// Most capable, slowest and most expensive.
    Premium,
}

/// A candidate backend within a category's ladder.
///
/// Static configuration; never mutated at runtime. Ladder position is the
/// priority: earlier entries are tried first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderDescriptor {
    /// Provider identifier, resolved by the adapter layer.
    pub id: ProviderId,

    /// Cost/capability band.
    pub cost_class: CostClass,

    /// Attempts allowed against this provider before failing over.
    pub max_attempts: u32,

    /// Wall-clock budget for a single attempt.
    pub per_attempt_timeout: Duration,
}

impl ProviderDescriptor {
    /// Create a descriptor with one attempt and a 30s per-attempt budget.
    pub fn new(id: impl Into<ProviderId>, cost_class: CostClass) -> Self {
        Self {
            id: id.into(),
            cost_class,
            max_attempts: 1,
            per_attempt_timeout: Duration::from_secs(30),
        }
    }

    /// Builder method to set the attempt budget.
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Builder method to set the per-attempt timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.per_attempt_timeout = timeout;
        self
    }
}

/// Ordered provider ladders, one per task category.
///
/// The registry is the only routing table the executor consults. An empty
/// resolution means the category is unmapped and the request must be
/// rejected before any provider is invoked.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LadderRegistry {
    ladders: HashMap<TaskCategory, Vec<ProviderDescriptor>>,
}

impl LadderRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the ladder for a category, replacing any
    /// previous ladder.
    pub fn with_ladder(
        mut self,
        category: TaskCategory,
        providers: Vec<ProviderDescriptor>,
    ) -> Self {
        self.ladders.insert(category, providers);
        self
    }

    /// Resolve the ladder for a category. Empty when unmapped.
    pub fn resolve(&self, category: TaskCategory) -> &[ProviderDescriptor] {
        self.ladders
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Categories with at least one configured provider.
    pub fn categories(&self) -> impl Iterator<Item = TaskCategory> + '_ {
        self.ladders
            .iter()
            .filter(|(_, l)| !l.is_empty())
            .map(|(c, _)| *c)
    }

    /// Reference ladder configuration.
    ///
    /// REFLEX runs cheapest-first; MATH and PHYSICS need precision and run
    /// most-capable-first; INGEST takes the balanced tier with a premium
    /// fallback.
    pub fn default_ladders() -> Self {
        let economy = |id: &str| ProviderDescriptor::new(id, CostClass::Economy);
        let standard = |id: &str| ProviderDescriptor::new(id, CostClass::Standard);
        let premium = |id: &str| ProviderDescriptor::new(id, CostClass::Premium);

        Self::new()
            .with_ladder(
                TaskCategory::Reflex,
                vec![
                    economy("flash-lite")
                        .with_max_attempts(2)
                        .with_timeout(Duration::from_secs(8)),
                    standard("flash").with_timeout(Duration::from_secs(15)),
                ],
            )
            .with_ladder(
                TaskCategory::Physics,
                vec![
                    premium("apex-pro")
                        .with_max_attempts(2)
                        .with_timeout(Duration::from_secs(60)),
                    standard("flash").with_timeout(Duration::from_secs(30)),
                ],
            )
            .with_ladder(
                TaskCategory::Math,
                vec![
                    premium("apex-pro")
                        .with_max_attempts(2)
                        .with_timeout(Duration::from_secs(60)),
                    standard("flash").with_timeout(Duration::from_secs(30)),
                ],
            )
            .with_ladder(
                TaskCategory::Ingest,
                vec![
                    standard("flash")
                        .with_max_attempts(2)
                        .with_timeout(Duration::from_secs(45)),
                    premium("apex-pro").with_timeout(Duration::from_secs(90)),
                ],
            )
    }
}
