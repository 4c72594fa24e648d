//! JSON Schema validation for produced documents.
//!
//! Documents are plain JSON trees, so any user-supplied JSON Schema (Draft 7)
//! can check them after conversion. Nothing here is required for assembly.
//!
//! # Example
//!
//! ```rust,ignore
//! use serde_json::json;
//! use rowgraph::validation::validate;
//!
//! let schema = json!({
//!     "type": "object",
//!     "required": ["departments"],
//!     "properties": { "departments": { "type": "array" } }
//! });
//! assert!(validate(&schema, &json!({ "departments": [] })).is_ok());
//! ```

use serde_json::Value;
use std::path::Path;

use crate::error::{ConfigError, ConfigResult};

/// Validate a JSON value against a JSON schema.
///
/// # Returns
/// * `Ok(())` if valid
/// * `Err(Vec<String>)` with every error otherwise
pub fn validate(schema: &Value, data: &Value) -> Result<(), Vec<String>> {
    let validator = jsonschema::draft7::new(schema)
        .map_err(|e| vec![format!("Invalid schema: {}", e)])?;

    let errors: Vec<String> = validator
        .iter_errors(data)
        .map(|e| e.to_string())
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Quick true/false check.
pub fn is_valid(schema: &Value, data: &Value) -> bool {
    jsonschema::draft7::is_valid(schema, data)
}

/// Validate many documents with one compiled schema.
///
/// Returns the failing documents' positions with their errors, in input order.
pub fn validate_documents<'d, I>(schema: &Value, documents: I) -> Result<Vec<(usize, Vec<String>)>, String>
where
    I: IntoIterator<Item = &'d Value>,
{
    let validator = jsonschema::draft7::new(schema).map_err(|e| format!("Invalid schema: {}", e))?;

    Ok(documents
        .into_iter()
        .enumerate()
        .filter_map(|(i, doc)| {
            let errors: Vec<String> = validator.iter_errors(doc).map(|e| e.to_string()).collect();
            (!errors.is_empty()).then_some((i, errors))
        })
        .collect())
}

/// Read a schema file.
pub fn load_schema(path: impl AsRef<Path>) -> ConfigResult<Value> {
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(ConfigError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    fn schema() -> Value {
        json!({
            "type": "object",
            "required": ["departments"],
            "properties": {
                "departments": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "required": ["id"]
                    }
                }
            }
        })
    }

    #[test]
    fn test_validate_ok() {
        let doc = json!({ "departments": [{ "id": "D1" }] });
        assert!(validate(&schema(), &doc).is_ok());
        assert!(is_valid(&schema(), &doc));
    }

    #[test]
    fn test_validate_reports_errors() {
        let doc = json!({ "departments": [{ "name": "no id" }] });
        let errors = validate(&schema(), &doc).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("id"));
        assert!(!is_valid(&schema(), &doc));
    }

    #[test]
    fn test_invalid_schema() {
        let errors = validate(&json!({ "type": 12 }), &json!({})).unwrap_err();
        assert!(errors[0].starts_with("Invalid schema"));
    }

    #[test]
    fn test_validate_documents_positions() {
        let docs = vec![
            json!({ "departments": [] }),
            json!({}),
            json!({ "departments": [{ "id": 1 }] }),
            json!({ "departments": "x" }),
        ];
        let failures = validate_documents(&schema(), &docs).unwrap();
        let positions: Vec<usize> = failures.iter().map(|(i, _)| *i).collect();
        assert_eq!(positions, vec![1, 3]);
    }

    #[test]
    fn test_load_schema() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", schema()).unwrap();
        assert_eq!(load_schema(file.path()).unwrap(), schema());

        assert!(load_schema("/definitely/not/here.json").is_err());
    }
}
