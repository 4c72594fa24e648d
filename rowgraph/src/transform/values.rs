//! Value transformer.
//!
//! Converts one raw row into typed [`RowValues`]: primitive-split fields become
//! arrays, blanks become nulls when the null policy asks for it, everything else
//! keeps its scalar kind. Keys stay full flat paths; nesting is the assembler's
//! job.

use crate::config::{Mapping, PrimitiveRule};
use crate::models::{LeafValue, Row, RowValues};

/// Per-row value conversion for one mapping.
#[derive(Debug, Clone, Copy)]
pub struct ValueTransformer<'m> {
    mapping: &'m Mapping,
}

impl<'m> ValueTransformer<'m> {
    pub fn new(mapping: &'m Mapping) -> Self {
        Self { mapping }
    }

    /// Transform every entry of `row`.
    pub fn transform(&self, row: &Row) -> RowValues {
        let blanks_as_nulls = self.mapping.blanks_as_nulls();

        row.iter()
            .map(|(path, raw)| {
                let value = match (self.mapping.primitive(path), raw) {
                    (Some(rule), LeafValue::Text(text)) => split_primitive(text, rule, blanks_as_nulls),
                    _ => normalize(raw, blanks_as_nulls),
                };
                (path.clone(), value)
            })
            .collect()
    }
}

/// Split a delimited string into an array of text-or-null leaves.
///
/// Empty pieces (including trailing ones) are kept.
pub fn split_primitive(raw: &str, rule: &PrimitiveRule, blanks_as_nulls: bool) -> LeafValue {
    let pieces = raw
        .split(rule.delimiter.as_str())
        .map(|piece| {
            let piece = if rule.trim { piece.trim() } else { piece };
            if blanks_as_nulls && piece.trim().is_empty() {
                LeafValue::Null
            } else {
                LeafValue::Text(piece.to_string())
            }
        })
        .collect();
    LeafValue::Array(pieces)
}

/// Scalar normalization: blank text becomes null under `blanks_as_nulls`.
pub fn normalize(raw: &LeafValue, blanks_as_nulls: bool) -> LeafValue {
    match raw {
        LeafValue::Text(_) if blanks_as_nulls && raw.is_blank() => LeafValue::Null,
        LeafValue::Array(items) => LeafValue::Array(
            items
                .iter()
                .map(|item| normalize(item, blanks_as_nulls))
                .collect(),
        ),
        LeafValue::Null
        | LeafValue::Bool(_)
        | LeafValue::Int(_)
        | LeafValue::Float(_)
        | LeafValue::Text(_) => raw.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MappingConfig;
    use serde_json::json;

    fn mapping(config: MappingConfig) -> Mapping {
        Mapping::new(config).unwrap()
    }

    fn row(value: serde_json::Value) -> Row {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_split_with_trim() {
        let rule = PrimitiveRule::new("tags", ",");
        let value = split_primitive("a, b, c", &rule, false);
        assert_eq!(value, LeafValue::Array(vec!["a".into(), "b".into(), "c".into()]));
    }

    #[test]
    fn test_split_roundtrip() {
        let rule = PrimitiveRule::new("tags", ",");
        let first = split_primitive("a, b, c", &rule, false);

        let pieces: Vec<String> = match &first {
            LeafValue::Array(items) => items.iter().map(|i| i.sort_text().into_owned()).collect(),
            other => panic!("unexpected: {:?}", other),
        };
        let rejoined = pieces.join(&rule.delimiter);
        assert_eq!(split_primitive(&rejoined, &rule, false), first);
    }

    #[test]
    fn test_split_keeps_trailing_empty_pieces() {
        let rule = PrimitiveRule::new("tags", ";").with_trim(false);
        let value = split_primitive("a;; b;", &rule, false);
        assert_eq!(
            value,
            LeafValue::Array(vec!["a".into(), "".into(), " b".into(), "".into()])
        );

        let value = split_primitive("a;; b;", &rule, true);
        assert_eq!(
            value,
            LeafValue::Array(vec!["a".into(), LeafValue::Null, " b".into(), LeafValue::Null])
        );
    }

    #[test]
    fn test_transform_scalars_keep_kind() {
        let m = mapping(MappingConfig::new());
        let values = ValueTransformer::new(&m).transform(&row(json!({
            "id": 7,
            "ratio": 0.5,
            "active": true,
            "name": "x",
            "blank": "  ",
            "none": null
        })));

        assert_eq!(values["id"], LeafValue::Int(7));
        assert_eq!(values["ratio"], LeafValue::Float(0.5));
        assert_eq!(values["active"], LeafValue::Bool(true));
        assert_eq!(values["name"], LeafValue::from("x"));
        assert_eq!(values["blank"], LeafValue::from("  "));
        assert_eq!(values["none"], LeafValue::Null);
    }

    #[test]
    fn test_transform_blanks_as_nulls() {
        let m = mapping(MappingConfig::new().with_blanks_as_nulls(true));
        let values = ValueTransformer::new(&m).transform(&row(json!({ "blank": "  ", "name": " x " })));

        assert_eq!(values["blank"], LeafValue::Null);
        assert_eq!(values["name"], LeafValue::from(" x "));
    }

    #[test]
    fn test_transform_only_splits_configured_text() {
        let m = mapping(MappingConfig::new().with_primitive(PrimitiveRule::new("d/tags", "|")));
        let values = ValueTransformer::new(&m).transform(&row(json!({
            "d/tags": "x|y",
            "d/other": "x|y"
        })));

        assert_eq!(values["d/tags"], LeafValue::Array(vec!["x".into(), "y".into()]));
        assert_eq!(values["d/other"], LeafValue::from("x|y"));

        // non-text values at a primitive path pass through
        let values = ValueTransformer::new(&m).transform(&row(json!({ "d/tags": 5 })));
        assert_eq!(values["d/tags"], LeafValue::Int(5));
    }

    #[test]
    fn test_transform_preserves_entry_order() {
        let m = mapping(MappingConfig::new());
        let values = ValueTransformer::new(&m).transform(&row(json!({ "z": 1, "a": 2, "m": 3 })));
        let keys: Vec<&str> = values.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
    }
}
