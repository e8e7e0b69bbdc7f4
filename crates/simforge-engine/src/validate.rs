//! Contract validation boundary.
//!
//! The only place untrusted provider output becomes trusted data. A payload
//! either comes back as a [`ValidatedOutput`] or a [`ValidationError`]
//! listing every violation; nothing downstream ever sees a raw payload.

use serde_json::Value;
use simforge_core::{FieldKind, FieldSpec, OutputContract};
use thiserror::Error;

/// A payload that passed contract validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedOutput(Value);

impl ValidatedOutput {
    /// Borrow the validated payload.
    pub fn value(&self) -> &Value {
        &self.0
    }

    /// Consume and return the validated payload.
    pub fn into_inner(self) -> Value {
        self.0
    }
}

/// A payload that failed contract validation.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("Payload failed contract '{contract}': {}", violations.join("; "))]
pub struct ValidationError {
    /// Name of the contract that rejected the payload.
    pub contract: String,

    /// Every violation found, one per field problem.
    pub violations: Vec<String>,
}

/// Validate a payload against a contract.
///
/// Required fields must be present; present declared fields must match their
/// kind and constraints. Undeclared fields are preserved, not rejected —
/// providers routinely over-answer.
pub fn validate(payload: &Value, contract: &OutputContract) -> Result<ValidatedOutput, ValidationError> {
    let mut violations = Vec::new();

    let Some(object) = payload.as_object() else {
        return Err(ValidationError {
            contract: contract.name.clone(),
            violations: vec![format!("expected a JSON object, got {}", kind_name(payload))],
        });
    };

    for field in &contract.fields {
        match object.get(&field.name) {
            None => {
                if field.required {
                    violations.push(format!("missing required field '{}'", field.name));
                }
            }
            Some(value) => check_field(field, value, &mut violations),
        }
    }

    if violations.is_empty() {
        Ok(ValidatedOutput(payload.clone()))
    } else {
        Err(ValidationError {
            contract: contract.name.clone(),
            violations,
        })
    }
}

fn check_field(field: &FieldSpec, value: &Value, violations: &mut Vec<String>) {
    let kind_ok = match field.kind {
        FieldKind::String => value.is_string(),
        FieldKind::Number => value.is_number(),
        FieldKind::Integer => value.is_i64() || value.is_u64(),
        FieldKind::Boolean => value.is_boolean(),
        FieldKind::Array => value.is_array(),
        FieldKind::Object => value.is_object(),
        FieldKind::Any => true,
    };

    if !kind_ok {
        violations.push(format!(
            "field '{}' expected {:?}, got {}",
            field.name,
            field.kind,
            kind_name(value)
        ));
        return;
    }

    let constraints = &field.constraints;

    if let Some(n) = value.as_f64() {
        if let Some(min) = constraints.min {
            if n < min {
                violations.push(format!("field '{}' below minimum {min}: {n}", field.name));
            }
        }
        if let Some(max) = constraints.max {
            if n > max {
                violations.push(format!("field '{}' above maximum {max}: {n}", field.name));
            }
        }
    }

    if let Some(allowed) = &constraints.one_of {
        if let Some(s) = value.as_str() {
            if !allowed.iter().any(|a| a == s) {
                violations.push(format!("field '{}' value '{s}' not in {allowed:?}", field.name));
            }
        }
    }

    if constraints.non_empty {
        let empty = match value {
            Value::String(s) => s.is_empty(),
            Value::Array(a) => a.is_empty(),
            _ => false,
        };
        if empty {
            violations.push(format!("field '{}' must not be empty", field.name));
        }
    }
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
