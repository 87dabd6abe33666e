//! Inter-step reference resolution and type coercion.
//!
//! Step parameters reference prior results with `{{stepId}}` or
//! `{{stepId.property}}`. A string that is exactly one placeholder resolves
//! to the typed value; placeholders embedded in surrounding text
//! interpolate as strings. Leaf values are coerced toward the target
//! parameter schema.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;
use tracing::warn;

use super::{ResolutionContext, StepValue};

fn full_reference_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\{\{([A-Za-z0-9_-]+)(?:\.([A-Za-z0-9_-]+))?\}\}$")
            .expect("valid full reference regex")
    })
}

fn embedded_reference_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\{\{([A-Za-z0-9_-]+)(?:\.([A-Za-z0-9_-]+))?\}\}")
            .expect("valid embedded reference regex")
    })
}

/// One `{{stepId[.property]}}` occurrence found in serialized parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub step_id: String,
    pub property: Option<String>,
}

/// Enumerate every placeholder occurrence in a serialized params blob.
pub fn extract_template_references(serialized: &str) -> Vec<Reference> {
    embedded_reference_regex()
        .captures_iter(serialized)
        .map(|cap| Reference {
            step_id: cap[1].to_string(),
            property: cap.get(2).map(|m| m.as_str().to_string()),
        })
        .collect()
}

/// Recursively substitute placeholders in `params` with prior step results,
/// coercing leaf values toward `schema`.
pub fn resolve_references(
    params: &Value,
    ctx: &ResolutionContext<'_>,
    schema: Option<&Value>,
) -> Value {
    match params {
        Value::String(text) => resolve_string(text, ctx, schema),
        Value::Array(items) => {
            let item_schema = schema.and_then(|s| s.get("items"));
            Value::Array(
                items
                    .iter()
                    .map(|item| resolve_references(item, ctx, item_schema))
                    .collect(),
            )
        }
        Value::Object(map) => {
            let properties = schema.and_then(|s| s.get("properties"));
            Value::Object(
                map.iter()
                    .map(|(key, value)| {
                        let property_schema = properties.and_then(|p| p.get(key));
                        (key.clone(), resolve_references(value, ctx, property_schema))
                    })
                    .collect(),
            )
        }
        scalar => coerce(scalar.clone(), schema),
    }
}

fn resolve_string(text: &str, ctx: &ResolutionContext<'_>, schema: Option<&Value>) -> Value {
    if let Some(cap) = full_reference_regex().captures(text) {
        let value = lookup(&cap[1], cap.get(2).map(|m| m.as_str()), ctx);
        return coerce(value, schema);
    }

    if embedded_reference_regex().is_match(text) {
        let interpolated = embedded_reference_regex().replace_all(text, |cap: &regex::Captures| {
            stringify(&lookup(&cap[1], cap.get(2).map(|m| m.as_str()), ctx))
        });
        return Value::String(interpolated.into_owned());
    }

    coerce(Value::String(text.to_string()), schema)
}

/// Look up a step result, optionally drilling into one property.
///
/// Missing steps and missing properties resolve to an empty string rather
/// than failing the run.
fn lookup(step_id: &str, property: Option<&str>, ctx: &ResolutionContext<'_>) -> Value {
    let Some(stored) = ctx.results.get(step_id) else {
        warn!(step_id, "reference to unknown step, substituting empty string");
        return Value::String(String::new());
    };

    let Some(property) = property else {
        return stored.to_value();
    };

    let parsed = match stored {
        StepValue::Structured(value) => value.clone(),
        StepValue::Raw(text) => match serde_json::from_str::<Value>(text) {
            Ok(value) => value,
            Err(_) => {
                warn!(
                    step_id,
                    property, "step result is not structured, substituting empty string"
                );
                return Value::String(String::new());
            }
        },
    };

    match parsed.get(property) {
        Some(value) => value.clone(),
        None => {
            warn!(
                step_id,
                property, "property missing on step result, substituting empty string"
            );
            Value::String(String::new())
        }
    }
}

/// Coerce a resolved value toward `schema.type`.
///
/// Parse failures fall back to the original value; coercion never fails.
fn coerce(value: Value, schema: Option<&Value>) -> Value {
    let Some(target) = schema.and_then(|s| s.get("type")).and_then(|t| t.as_str()) else {
        return value;
    };

    match target {
        "number" | "integer" => coerce_number(value),
        "boolean" => Value::Bool(coerce_bool(&value)),
        "string" => Value::String(stringify(&value)),
        _ => value,
    }
}

fn coerce_number(value: Value) -> Value {
    let Value::String(ref text) = value else {
        return value;
    };
    let trimmed = text.trim();

    if let Ok(int) = trimmed.parse::<i64>() {
        return Value::from(int);
    }
    if let Ok(float) = trimmed.parse::<f64>()
        && let Some(number) = serde_json::Number::from_f64(float)
    {
        return Value::Number(number);
    }
    value
}

/// Boolean coercion: the literal string "true" (any case) is true;
/// everything else follows truthiness (empty string, zero, and null are
/// false).
fn coerce_bool(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Null => false,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => s.eq_ignore_ascii_case("true") || !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Stringify for interpolation: strings verbatim, composites as compact
/// JSON.
fn stringify(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::StepMetadata;
    use serde_json::json;
    use std::collections::HashMap;

    fn context_with(
        results: Vec<(&str, StepValue)>,
    ) -> (
        HashMap<String, StepValue>,
        HashMap<String, StepMetadata>,
    ) {
        let results = results
            .into_iter()
            .map(|(id, value)| (id.to_string(), value))
            .collect();
        (results, HashMap::new())
    }

    #[test]
    fn test_whole_placeholder_resolves_typed() {
        let (results, metadata) = context_with(vec![("s1", StepValue::Structured(json!(42)))]);
        let ctx = ResolutionContext {
            results: &results,
            metadata: &metadata,
        };

        let resolved = resolve_references(&json!("{{s1}}"), &ctx, Some(&json!({"type": "number"})));
        assert_eq!(resolved, json!(42));
    }

    #[test]
    fn test_numeric_string_result_coerced() {
        let (results, metadata) = context_with(vec![("s1", StepValue::Raw("42".into()))]);
        let ctx = ResolutionContext {
            results: &results,
            metadata: &metadata,
        };

        let resolved = resolve_references(&json!("{{s1}}"), &ctx, Some(&json!({"type": "number"})));
        assert_eq!(resolved, json!(42));
    }

    #[test]
    fn test_embedded_placeholder_interpolates() {
        let (results, metadata) = context_with(vec![("s1", StepValue::Structured(json!(42)))]);
        let ctx = ResolutionContext {
            results: &results,
            metadata: &metadata,
        };

        let resolved = resolve_references(&json!("x={{s1}}"), &ctx, None);
        assert_eq!(resolved, json!("x=42"));
    }

    #[test]
    fn test_missing_step_resolves_empty_never_panics() {
        let (results, metadata) = context_with(vec![]);
        let ctx = ResolutionContext {
            results: &results,
            metadata: &metadata,
        };

        assert_eq!(resolve_references(&json!("{{ghost}}"), &ctx, None), json!(""));
        assert_eq!(
            resolve_references(&json!("value: {{ghost}}!"), &ctx, None),
            json!("value: !")
        );
    }

    #[test]
    fn test_property_reference_on_structured_result() {
        let (results, metadata) = context_with(vec![(
            "s1",
            StepValue::Structured(json!({"latitude": 4.6, "longitude": -74.1})),
        )]);
        let ctx = ResolutionContext {
            results: &results,
            metadata: &metadata,
        };

        let resolved = resolve_references(
            &json!({"lat": "{{s1.latitude}}", "lon": "{{s1.longitude}}"}),
            &ctx,
            Some(&json!({
                "type": "object",
                "properties": {
                    "lat": {"type": "number"},
                    "lon": {"type": "number"}
                }
            })),
        );
        assert_eq!(resolved, json!({"lat": 4.6, "lon": -74.1}));
    }

    #[test]
    fn test_property_reference_parses_raw_json_text() {
        let (results, metadata) = context_with(vec![(
            "s1",
            StepValue::Raw(r#"{"latitude": 4.6}"#.into()),
        )]);
        let ctx = ResolutionContext {
            results: &results,
            metadata: &metadata,
        };

        let resolved =
            resolve_references(&json!("{{s1.latitude}}"), &ctx, Some(&json!({"type": "number"})));
        assert_eq!(resolved, json!(4.6));
    }

    #[test]
    fn test_property_on_plain_text_resolves_empty() {
        let (results, metadata) =
            context_with(vec![("s1", StepValue::Raw("just some prose".into()))]);
        let ctx = ResolutionContext {
            results: &results,
            metadata: &metadata,
        };

        assert_eq!(resolve_references(&json!("{{s1.field}}"), &ctx, None), json!(""));
    }

    #[test]
    fn test_array_recursion_threads_items_schema() {
        let (results, metadata) = context_with(vec![("s1", StepValue::Raw("7".into()))]);
        let ctx = ResolutionContext {
            results: &results,
            metadata: &metadata,
        };

        let resolved = resolve_references(
            &json!(["{{s1}}", "8"]),
            &ctx,
            Some(&json!({"type": "array", "items": {"type": "integer"}})),
        );
        assert_eq!(resolved, json!([7, 8]));
    }

    #[test]
    fn test_boolean_coercion() {
        let (results, metadata) = context_with(vec![("s1", StepValue::Raw("TRUE".into()))]);
        let ctx = ResolutionContext {
            results: &results,
            metadata: &metadata,
        };
        let schema = json!({"type": "boolean"});

        assert_eq!(resolve_references(&json!("{{s1}}"), &ctx, Some(&schema)), json!(true));
        assert_eq!(resolve_references(&json!(""), &ctx, Some(&schema)), json!(false));
        assert_eq!(resolve_references(&json!(0), &ctx, Some(&schema)), json!(false));
    }

    #[test]
    fn test_unparseable_number_falls_back_to_original() {
        let (results, metadata) = context_with(vec![]);
        let ctx = ResolutionContext {
            results: &results,
            metadata: &metadata,
        };

        let resolved =
            resolve_references(&json!("not a number"), &ctx, Some(&json!({"type": "number"})));
        assert_eq!(resolved, json!("not a number"));
    }

    #[test]
    fn test_extract_template_references() {
        let refs =
            extract_template_references(r#"{"lat": "{{s1.latitude}}", "note": "from {{s1}}"}"#);
        assert_eq!(
            refs,
            vec![
                Reference {
                    step_id: "s1".into(),
                    property: Some("latitude".into())
                },
                Reference {
                    step_id: "s1".into(),
                    property: None
                },
            ]
        );
    }
}
