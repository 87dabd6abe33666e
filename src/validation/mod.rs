//! Schema validation port.
//!
//! Validation sits behind a small trait so the schema engine can be swapped
//! without touching resolver or validator logic: schemas stay generic
//! structured data and tools stay declarative.

use serde_json::Value;

/// Outcome of validating a value against a schema.
#[derive(Debug, Clone)]
pub struct ValidationReport {
    pub is_valid: bool,
    pub errors: Vec<String>,
}

impl ValidationReport {
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
        }
    }

    pub fn invalid(errors: Vec<String>) -> Self {
        Self {
            is_valid: false,
            errors,
        }
    }
}

/// Port for JSON-schema validation engines.
pub trait SchemaValidator: Send + Sync {
    /// Validate `value` against `schema`.
    ///
    /// Never errors: a schema that fails to compile reports as invalid.
    fn validate(&self, value: &Value, schema: &Value) -> ValidationReport;
}

/// Default validator backed by the `jsonschema` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSchemaValidator;

impl SchemaValidator for JsonSchemaValidator {
    fn validate(&self, value: &Value, schema: &Value) -> ValidationReport {
        let compiled = match jsonschema::JSONSchema::compile(schema) {
            Ok(compiled) => compiled,
            Err(e) => return ValidationReport::invalid(vec![format!("invalid schema: {}", e)]),
        };

        match compiled.validate(value) {
            Ok(()) => ValidationReport::valid(),
            Err(errors) => ValidationReport::invalid(
                errors
                    .map(|e| {
                        let path = e.instance_path.to_string();
                        if path.is_empty() {
                            e.to_string()
                        } else {
                            format!("{}: {}", path, e)
                        }
                    })
                    .collect(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_valid_params() {
        let schema = json!({
            "type": "object",
            "properties": {"lat": {"type": "number"}},
            "required": ["lat"]
        });
        let report = JsonSchemaValidator.validate(&json!({"lat": 4.6}), &schema);
        assert!(report.is_valid);
        assert!(report.errors.is_empty());
    }

    #[test]
    fn test_type_mismatch_reported() {
        let schema = json!({
            "type": "object",
            "properties": {"lat": {"type": "number"}},
            "required": ["lat"]
        });
        let report = JsonSchemaValidator.validate(&json!({"lat": "4.6"}), &schema);
        assert!(!report.is_valid);
        assert!(!report.errors.is_empty());
    }

    #[test]
    fn test_missing_required_reported() {
        let schema = json!({
            "type": "object",
            "properties": {"lat": {"type": "number"}},
            "required": ["lat"]
        });
        let report = JsonSchemaValidator.validate(&json!({}), &schema);
        assert!(!report.is_valid);
    }

    #[test]
    fn test_broken_schema_is_invalid_not_panic() {
        let schema = json!({"type": "not-a-type"});
        let report = JsonSchemaValidator.validate(&json!(1), &schema);
        assert!(!report.is_valid);
    }
}
