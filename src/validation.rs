//! Schema validation helpers.
//!
//! This module validates a `serde_json::Value` attribute tree against a
//! [`Schema`] and fills in schema defaults.
//!
//! # Example
//!
//! ```
//! use cpln_org_logging::schema::{Attribute, Block, NestedBlock, Schema};
//! use cpln_org_logging::validation::validate;
//! use serde_json::json;
//!
//! let schema = Schema::v0()
//!     .with_block("datadog_logging", NestedBlock::single(
//!         Block::new()
//!             .with_attribute("host", Attribute::required_string())
//!             .with_attribute("credentials", Attribute::required_string()),
//!     ))
//!     .with_block("logzio_logging", NestedBlock::single(
//!         Block::new()
//!             .with_attribute("listener_host", Attribute::required_string())
//!             .with_attribute("credentials", Attribute::required_string()),
//!     ))
//!     .with_exactly_one_of(["datadog_logging", "logzio_logging"]);
//!
//! let input = json!({
//!     "datadog_logging": [{"host": "http-intake.logs.datadoghq.com", "credentials": "/org/acme/secret/dd"}]
//! });
//! assert!(validate(&schema, &input).is_empty());
//!
//! // Neither backend set
//! let diagnostics = validate(&schema, &json!({}));
//! assert_eq!(diagnostics.len(), 1);
//! ```

use crate::schema::{Attribute, AttributeType, Block, Diagnostic, NestedBlock, Schema};
use serde_json::Value;

/// Validate a JSON value against a schema.
///
/// Returns a list of diagnostics for any validation errors found.
/// An empty list means the value is valid.
///
/// # Validation Rules
///
/// - Required attributes must be present and non-null
/// - Optional attributes may be absent or null
/// - Computed attributes are skipped (provider sets these)
/// - Attribute types must match the schema
/// - Nested blocks are validated recursively with min/max item constraints
/// - Exactly one member of each `exactly_one_of` group must be set
pub fn validate(schema: &Schema, value: &Value) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    validate_block(&schema.block, value, "", &mut diagnostics);
    diagnostics
}

/// Validate a JSON value against a schema, returning Ok if valid or Err with diagnostics.
pub fn validate_result(schema: &Schema, value: &Value) -> Result<(), Vec<Diagnostic>> {
    let diagnostics = validate(schema, value);
    if diagnostics.is_empty() {
        Ok(())
    } else {
        Err(diagnostics)
    }
}

/// Check if a JSON value is valid against a schema.
pub fn is_valid(schema: &Schema, value: &Value) -> bool {
    validate(schema, value).is_empty()
}

/// Fill in schema defaults for attributes that are absent or null.
///
/// Defaults are applied recursively inside nested block items. Values of
/// the wrong shape are left untouched for [`validate`] to report.
pub fn apply_defaults(schema: &Schema, value: Value) -> Value {
    apply_block_defaults(&schema.block, value)
}

fn apply_block_defaults(block: &Block, value: Value) -> Value {
    let Value::Object(mut obj) = value else {
        return value;
    };

    for (name, attr) in &block.attributes {
        if let Some(default) = &attr.default {
            let missing = matches!(obj.get(name), None | Some(Value::Null));
            if missing {
                obj.insert(name.clone(), default.clone());
            }
        }
    }

    for (name, nested) in &block.blocks {
        if let Some(Value::Array(items)) = obj.get_mut(name) {
            for item in items.iter_mut() {
                *item = apply_block_defaults(&nested.block, item.take());
            }
        }
    }

    Value::Object(obj)
}

fn validate_block(block: &Block, value: &Value, path: &str, diagnostics: &mut Vec<Diagnostic>) {
    let obj = match value {
        Value::Object(map) => map,
        Value::Null => {
            // Null is valid for optional blocks, but we can't validate further
            return;
        }
        _ => {
            diagnostics.push(
                Diagnostic::error("Expected object")
                    .with_detail(format!("Got {}", value_type_name(value)))
                    .with_attribute_if_not_empty(path),
            );
            return;
        }
    };

    for (name, attr) in &block.attributes {
        let attr_path = join_path(path, name);
        validate_attribute(attr, obj.get(name), &attr_path, diagnostics);
    }

    for (name, nested_block) in &block.blocks {
        let block_path = join_path(path, name);
        validate_nested_block(nested_block, obj.get(name), &block_path, diagnostics);
    }

    for group in &block.exactly_one_of {
        let set: Vec<&String> = group
            .iter()
            .filter(|name| is_set(obj.get(name.as_str())))
            .collect();

        match set.len() {
            1 => {}
            0 => diagnostics.push(
                Diagnostic::error(format!("One of [{}] must be set", group.join(", ")))
                    .with_attribute_if_not_empty(path),
            ),
            _ => diagnostics.push(
                Diagnostic::error(format!(
                    "Only one of [{}] can be set",
                    group.join(", ")
                ))
                .with_detail(format!(
                    "Got: {}",
                    set.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(", ")
                ))
                .with_attribute_if_not_empty(path),
            ),
        }
    }
}

fn is_set(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Array(items)) => !items.is_empty(),
        Some(_) => true,
    }
}

fn validate_attribute(
    attr: &Attribute,
    value: Option<&Value>,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    // Skip computed-only attributes (provider sets these)
    if attr.flags.computed && !attr.flags.optional && !attr.flags.required {
        return;
    }

    match value {
        None | Some(Value::Null) => {
            if attr.flags.required {
                diagnostics.push(
                    Diagnostic::error(format!("Missing required attribute '{}'", path))
                        .with_detail("This attribute is required and must be provided")
                        .with_attribute(path),
                );
            }
        }
        Some(v) => validate_attribute_type(&attr.attr_type, v, path, diagnostics),
    }
}

fn validate_attribute_type(
    attr_type: &AttributeType,
    value: &Value,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match attr_type {
        AttributeType::String => {
            if !value.is_string() {
                diagnostics.push(type_error(path, "string", value));
            }
        }
        AttributeType::Map(value_type) => {
            if let Some(obj) = value.as_object() {
                for (key, val) in obj {
                    let key_path = format!("{}.{}", path, key);
                    validate_attribute_type(value_type, val, &key_path, diagnostics);
                }
            } else {
                diagnostics.push(type_error(path, "map", value));
            }
        }
    }
}

fn validate_nested_block(
    nested: &NestedBlock,
    value: Option<&Value>,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match value {
        None | Some(Value::Null) => {
            if nested.min_items > 0 {
                diagnostics.push(
                    Diagnostic::error(format!(
                        "Block '{}' requires at least {} item(s)",
                        path, nested.min_items
                    ))
                    .with_attribute(path),
                );
            }
        }
        Some(Value::Array(arr)) => {
            let len = arr.len() as u32;

            if len < nested.min_items {
                diagnostics.push(
                    Diagnostic::error(format!(
                        "Block '{}' requires at least {} item(s), got {}",
                        path, nested.min_items, len
                    ))
                    .with_attribute(path),
                );
            }

            // 0 means unlimited
            if nested.max_items > 0 && len > nested.max_items {
                diagnostics.push(
                    Diagnostic::error(format!(
                        "Block '{}' allows at most {} item(s), got {}",
                        path, nested.max_items, len
                    ))
                    .with_attribute(path),
                );
            }

            for (i, item) in arr.iter().enumerate() {
                let item_path = format!("{}.{}", path, i);
                validate_block(&nested.block, item, &item_path, diagnostics);
            }
        }
        Some(v) => {
            diagnostics.push(
                Diagnostic::error(format!("Expected list for block '{}'", path))
                    .with_detail(format!("Got {}", value_type_name(v)))
                    .with_attribute(path),
            );
        }
    }
}

// Helper functions

fn join_path(base: &str, name: &str) -> String {
    if base.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", base, name)
    }
}

fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn type_error(path: &str, expected: &str, got: &Value) -> Diagnostic {
    Diagnostic::error(format!("Invalid type for attribute '{}'", path))
        .with_detail(format!("Expected {}, got {}", expected, value_type_name(got)))
        .with_attribute(path)
}

trait DiagnosticExt {
    fn with_attribute_if_not_empty(self, path: &str) -> Self;
}

impl DiagnosticExt for Diagnostic {
    fn with_attribute_if_not_empty(self, path: &str) -> Self {
        if path.is_empty() {
            self
        } else {
            self.with_attribute(path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Attribute, Block, NestedBlock, Schema};
    use serde_json::json;

    fn s3_block() -> Block {
        Block::new()
            .with_attribute("bucket", Attribute::required_string())
            .with_attribute("region", Attribute::required_string())
            .with_attribute("prefix", Attribute::optional_string().with_default(json!("/")))
            .with_attribute("credentials", Attribute::required_string().sensitive())
    }

    fn datadog_block() -> Block {
        Block::new()
            .with_attribute("host", Attribute::required_string())
            .with_attribute("credentials", Attribute::required_string().sensitive())
    }

    fn logging_schema() -> Schema {
        Schema::v0()
            .with_attribute("id", Attribute::computed_string())
            .with_attribute("tags", Attribute::computed_string_map())
            .with_block("s3_logging", NestedBlock::single(s3_block()))
            .with_block("datadog_logging", NestedBlock::single(datadog_block()))
            .with_exactly_one_of(["s3_logging", "datadog_logging"])
    }

    #[test]
    fn test_validate_single_backend() {
        let diagnostics = validate(
            &logging_schema(),
            &json!({"s3_logging": [{"bucket": "b", "region": "r", "credentials": "c"}]}),
        );
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_validate_no_backend() {
        let diagnostics = validate(&logging_schema(), &json!({"s3_logging": [], "datadog_logging": null}));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.starts_with("One of"));
    }

    #[test]
    fn test_validate_two_backends() {
        let diagnostics = validate(
            &logging_schema(),
            &json!({
                "s3_logging": [{"bucket": "b", "region": "r", "credentials": "c"}],
                "datadog_logging": [{"host": "h", "credentials": "c"}]
            }),
        );
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.starts_with("Only one of"));
        let detail = diagnostics[0].detail.as_deref().unwrap();
        assert!(detail.contains("s3_logging"));
        assert!(detail.contains("datadog_logging"));
    }

    #[test]
    fn test_validate_missing_required_in_block() {
        let diagnostics = validate(
            &logging_schema(),
            &json!({"datadog_logging": [{"credentials": "c"}]}),
        );
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(
            diagnostics[0].attribute,
            Some("datadog_logging.0.host".to_string())
        );
    }

    #[test]
    fn test_validate_wrong_type_in_block() {
        let diagnostics = validate(
            &logging_schema(),
            &json!({"datadog_logging": [{"host": 443, "credentials": "c"}]}),
        );
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("Invalid type"));
    }

    #[test]
    fn test_validate_max_items() {
        let block = json!({"host": "h", "credentials": "c"});
        let diagnostics = validate(
            &logging_schema(),
            &json!({"datadog_logging": [block.clone(), block]}),
        );
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("at most 1"));
    }

    #[test]
    fn test_validate_block_not_list() {
        let diagnostics = validate(
            &logging_schema(),
            &json!({"datadog_logging": {"host": "h", "credentials": "c"}}),
        );
        assert!(diagnostics
            .iter()
            .any(|d| d.summary.contains("Expected list")));
    }

    #[test]
    fn test_validate_computed_attribute_skipped() {
        let diagnostics = validate(
            &logging_schema(),
            &json!({
                "id": 123,
                "tags": "not a map",
                "datadog_logging": [{"host": "h", "credentials": "c"}]
            }),
        );
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_validate_map() {
        let schema = Schema::v0().with_attribute(
            "labels",
            Attribute::new(
                AttributeType::map(AttributeType::String),
                crate::schema::AttributeFlags::required(),
            ),
        );

        assert!(validate(&schema, &json!({"labels": {"env": "prod"}})).is_empty());

        let diagnostics = validate(&schema, &json!({"labels": {"env": "prod", "count": 42}}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute, Some("labels.count".to_string()));
    }

    #[test]
    fn test_validate_root_not_object() {
        let diagnostics = validate(&logging_schema(), &json!("not an object"));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("Expected object"));
        assert!(diagnostics[0].attribute.is_none());
    }

    #[test]
    fn test_is_valid_and_result_helpers() {
        let valid = json!({"datadog_logging": [{"host": "h", "credentials": "c"}]});
        assert!(is_valid(&logging_schema(), &valid));
        assert!(validate_result(&logging_schema(), &valid).is_ok());

        let result = validate_result(&logging_schema(), &json!({}));
        assert_eq!(result.unwrap_err().len(), 1);
    }

    #[test]
    fn test_apply_defaults_in_block() {
        let value = apply_defaults(
            &logging_schema(),
            json!({"s3_logging": [{"bucket": "b", "region": "r", "credentials": "c"}]}),
        );
        assert_eq!(value["s3_logging"][0]["prefix"], "/");

        let value = apply_defaults(
            &logging_schema(),
            json!({"s3_logging": [{"bucket": "b", "region": "r", "credentials": "c", "prefix": null}]}),
        );
        assert_eq!(value["s3_logging"][0]["prefix"], "/");
    }

    #[test]
    fn test_apply_defaults_keeps_explicit_value() {
        let value = apply_defaults(
            &logging_schema(),
            json!({"s3_logging": [{"bucket": "b", "region": "r", "credentials": "c", "prefix": "logs/"}]}),
        );
        assert_eq!(value["s3_logging"][0]["prefix"], "logs/");
    }

    #[test]
    fn test_apply_defaults_leaves_bad_shapes() {
        let value = apply_defaults(&logging_schema(), json!({"datadog_logging": "oops"}));
        assert_eq!(value["datadog_logging"], "oops");
        assert_eq!(apply_defaults(&logging_schema(), json!(null)), json!(null));
    }
}
