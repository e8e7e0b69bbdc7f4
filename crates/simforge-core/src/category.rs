//! Task categories routed through the provider ladders.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of work a task asks a model provider to do.
///
/// Every category must map to a provider ladder before a request for it can
/// execute; an unmapped category is rejected up front.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskCategory {
    /// World-state and physics generation; needs the most capable models.
    Physics,
    /// Low-latency interaction tasks; cheapest ladder entries first.
    Reflex,
    /// Numeric/precision work; most capable first.
    Math,
    /// Document/image ingestion and extraction.
    Ingest,
}

impl TaskCategory {
    /// All categories, in declaration order.
    pub fn all() -> [TaskCategory; 4] {
        [Self::Physics, Self::Reflex, Self::Math, Self::Ingest]
    }

    /// Wire/display name for this category.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Physics => "PHYSICS",
            Self::Reflex => "REFLEX",
            Self::Math => "MATH",
            Self::Ingest => "INGEST",
        }
    }

    /// Parse a category from its wire name.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PHYSICS" => Some(Self::Physics),
            "REFLEX" => Some(Self::Reflex),
            "MATH" => Some(Self::Math),
            "INGEST" => Some(Self::Ingest),
            _ => None,
        }
    }
}

impl fmt::Display for TaskCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
