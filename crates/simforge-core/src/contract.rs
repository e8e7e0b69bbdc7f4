//! Output contract descriptors.
//!
//! A contract declares the shape a provider's payload must have before the
//! core will trust it. Contracts are plain data: the executor treats them as
//! opaque and only the validator interprets them.

use serde::{Deserialize, Serialize};

/// Primitive kind a declared field must match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FieldKind {
    String,
    Number,
    Integer,
    Boolean,
    Array,
    Object,
    /// Accepts any JSON value; constraints still apply where meaningful.
    Any,
}

/// Optional per-field constraints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldConstraints {
    /// Inclusive lower bound for numeric fields.
    pub min: Option<f64>,

    /// Inclusive upper bound for numeric fields.
    pub max: Option<f64>,

    /// Allowed values for string fields.
    pub one_of: Option<Vec<String>>,

    /// Reject empty strings/arrays when set.
    pub non_empty: bool,
}

/// A single declared field in an output contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Field name as it appears in the payload object.
    pub name: String,

    /// Expected kind.
    pub kind: FieldKind,

    /// Whether the field must be present. Defaults to true.
    pub required: bool,

    /// Extra constraints checked after the kind matches.
    pub constraints: FieldConstraints,
}

impl FieldSpec {
    /// Create a required field of the given kind.
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: true,
            constraints: FieldConstraints::default(),
        }
    }

    /// Builder method to mark the field optional.
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Builder method to set an inclusive numeric minimum.
    pub fn with_min(mut self, min: f64) -> Self {
        self.constraints.min = Some(min);
        self
    }

    /// Builder method to set an inclusive numeric maximum.
    pub fn with_max(mut self, max: f64) -> Self {
        self.constraints.max = Some(max);
        self
    }

    /// Builder method to restrict a string field to a fixed set of values.
    pub fn one_of(mut self, values: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.constraints.one_of = Some(values.into_iter().map(Into::into).collect());
        self
    }

    /// Builder method to reject empty strings/arrays.
    pub fn non_empty(mut self) -> Self {
        self.constraints.non_empty = true;
        self
    }
}

/// Declared shape of a provider's output payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputContract {
    /// Contract name, used in logs and validation errors.
    pub name: String,

    /// Declared fields, in declaration order.
    pub fields: Vec<FieldSpec>,
}

impl OutputContract {
    /// Create an empty contract with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Builder method to add a field.
    pub fn with_field(mut self, field: FieldSpec) -> Self {
        self.fields.push(field);
        self
    }

    /// Look up a declared field by name.
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Iterate over required fields.
    pub fn required_fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter().filter(|f| f.required)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_chain() {
        let contract = OutputContract::new("world_state")
            .with_field(FieldSpec::new("name", FieldKind::String).non_empty())
            .with_field(
                FieldSpec::new("gravity", FieldKind::Number)
                    .with_min(0.0)
                    .with_max(100.0),
            )
            .with_field(FieldSpec::new("notes", FieldKind::String).optional());

        assert_eq!(contract.fields.len(), 3);
        assert_eq!(contract.required_fields().count(), 2);
        assert!(contract.field("gravity").unwrap().constraints.min == Some(0.0));
    }
}
