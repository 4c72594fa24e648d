//! Hierarchy validation for mapping configurations.
//!
//! Runs once per configuration, before any row is read:
//!
//! - every list is declared after the nearest list it is nested under;
//! - key and order-by paths are relative to their own list;
//! - no duplicate list paths, empty paths, or keys reaching into nested lists.

use super::MappingConfig;
use crate::error::{ConfigError, ConfigResult, PathKind};
use crate::path;

/// Validate the structure of a configuration.
pub fn validate_hierarchy(config: &MappingConfig) -> ConfigResult<()> {
    let sep = config.separator.as_str();
    if sep.is_empty() {
        return Err(ConfigError::EmptySeparator);
    }

    let paths: Vec<&str> = config.lists.iter().map(|r| r.path.as_str()).collect();
    for (i, p) in paths.iter().enumerate() {
        if path::split(p, sep).is_empty() {
            return Err(ConfigError::EmptyPath(PathKind::List));
        }
        if paths[..i].contains(p) {
            return Err(ConfigError::DuplicateList(p.to_string()));
        }
    }

    for (i, ancestor) in nearest_ancestors(&paths, sep).into_iter().enumerate() {
        if let Some(a) = ancestor {
            if a > i {
                return Err(ConfigError::ListBeforeAncestor {
                    list: paths[i].to_string(),
                    ancestor: paths[a].to_string(),
                });
            }
        }
    }

    for (i, rule) in config.lists.iter().enumerate() {
        let order_paths = rule.order_by.iter().map(|o| (PathKind::OrderBy, o.path.as_str()));
        let key_paths = rule.key_paths.iter().map(|k| (PathKind::Key, k.as_str()));

        for (kind, field) in key_paths.chain(order_paths) {
            if path::split(field, sep).is_empty() {
                return Err(ConfigError::EmptyPath(kind));
            }
            if let Some(relative) = path::suffix_after(field, &rule.path, sep) {
                return Err(ConfigError::AbsolutePath {
                    list: rule.path.clone(),
                    kind,
                    path: field.to_string(),
                    relative: relative.to_string(),
                });
            }
        }

        for key in &rule.key_paths {
            let absolute = path::join(&rule.path, key, sep);
            let nested = paths.iter().enumerate().find(|(j, p)| {
                *j != i && path::is_under(p, &rule.path, sep) && path::is_at_or_under(&absolute, p, sep)
            });
            if let Some((_, nested)) = nested {
                return Err(ConfigError::KeyInsideNestedList {
                    list: rule.path.clone(),
                    path: key.clone(),
                    nested: nested.to_string(),
                });
            }
        }
    }

    if config.root_keys.iter().any(|k| path::split(k, sep).is_empty()) {
        return Err(ConfigError::EmptyPath(PathKind::RootKey));
    }
    if config.primitives.iter().any(|p| path::split(&p.path, sep).is_empty()) {
        return Err(ConfigError::EmptyPath(PathKind::Primitive));
    }

    Ok(())
}

/// For each path, the index of the longest other path it lies strictly under.
///
/// Paths are visited shortest first; scanning backward from a path's position
/// finds its longest proper prefix first.
pub(crate) fn nearest_ancestors(paths: &[&str], separator: &str) -> Vec<Option<usize>> {
    let mut by_length: Vec<usize> = (0..paths.len()).collect();
    by_length.sort_by_key(|&i| paths[i].len());

    let mut ancestors = vec![None; paths.len()];
    for (pos, &i) in by_length.iter().enumerate() {
        ancestors[i] = by_length[..pos]
            .iter()
            .rev()
            .copied()
            .find(|&j| path::is_under(paths[i], paths[j], separator));
    }
    ancestors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ListRule, OrderSpec, PrimitiveRule};

    fn lists(rules: Vec<ListRule>) -> MappingConfig {
        rules.into_iter().fold(MappingConfig::new(), |c, r| c.with_list(r))
    }

    #[test]
    fn test_nearest_ancestors() {
        let paths = ["a", "a/b/c", "a/b", "x", "a/bc"];
        let ancestors = nearest_ancestors(&paths, "/");
        assert_eq!(ancestors, vec![None, Some(2), Some(0), None, Some(0)]);
    }

    #[test]
    fn test_valid_hierarchy() {
        let config = lists(vec![
            ListRule::new("departments").with_keys(["id"]),
            ListRule::new("departments/employees").with_keys(["id"]),
            ListRule::new("projects").with_keys(["code"]),
        ]);
        assert!(validate_hierarchy(&config).is_ok());
    }

    #[test]
    fn test_child_before_ancestor_rejected() {
        let config = lists(vec![
            ListRule::new("departments/employees").with_keys(["id"]),
            ListRule::new("departments").with_keys(["id"]),
        ]);
        match validate_hierarchy(&config) {
            Err(ConfigError::ListBeforeAncestor { list, ancestor }) => {
                assert_eq!(list, "departments/employees");
                assert_eq!(ancestor, "departments");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_only_nearest_ancestor_must_precede() {
        // "a/b/c" only needs "a/b" before it; "a/b" needs "a".
        let config = lists(vec![
            ListRule::new("a"),
            ListRule::new("a/b"),
            ListRule::new("a/b/c"),
        ]);
        assert!(validate_hierarchy(&config).is_ok());

        let config = lists(vec![
            ListRule::new("a/b"),
            ListRule::new("a/b/c"),
            ListRule::new("a"),
        ]);
        assert!(matches!(
            validate_hierarchy(&config),
            Err(ConfigError::ListBeforeAncestor { ancestor, .. }) if ancestor == "a"
        ));
    }

    #[test]
    fn test_absolute_key_path_rejected() {
        let config = lists(vec![ListRule::new("departments").with_keys(["departments/id"])]);
        match validate_hierarchy(&config) {
            Err(ConfigError::AbsolutePath { kind, relative, .. }) => {
                assert_eq!(kind, PathKind::Key);
                assert_eq!(relative, "id");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_absolute_order_path_rejected() {
        let config = lists(vec![
            ListRule::new("d").with_keys(["id"]).order_by(OrderSpec::asc("d/meta/rank")),
        ]);
        match validate_hierarchy(&config) {
            Err(ConfigError::AbsolutePath { kind, relative, .. }) => {
                assert_eq!(kind, PathKind::OrderBy);
                assert_eq!(relative, "meta/rank");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_duplicate_list_rejected() {
        let config = lists(vec![ListRule::new("a"), ListRule::new("a")]);
        assert!(matches!(validate_hierarchy(&config), Err(ConfigError::DuplicateList(p)) if p == "a"));
    }

    #[test]
    fn test_key_inside_nested_list_rejected() {
        let config = lists(vec![
            ListRule::new("d").with_keys(["e/id"]),
            ListRule::new("d/e").with_keys(["id"]),
        ]);
        assert!(matches!(
            validate_hierarchy(&config),
            Err(ConfigError::KeyInsideNestedList { nested, .. }) if nested == "d/e"
        ));
    }

    #[test]
    fn test_empty_paths_rejected() {
        assert!(matches!(
            validate_hierarchy(&lists(vec![ListRule::new("")])),
            Err(ConfigError::EmptyPath(PathKind::List))
        ));
        assert!(matches!(
            validate_hierarchy(&lists(vec![ListRule::new("a").with_keys([""])])),
            Err(ConfigError::EmptyPath(PathKind::Key))
        ));
        assert!(matches!(
            validate_hierarchy(&MappingConfig::new().with_root_keys([""])),
            Err(ConfigError::EmptyPath(PathKind::RootKey))
        ));
        assert!(matches!(
            validate_hierarchy(&MappingConfig::new().with_primitive(PrimitiveRule::new("", ","))),
            Err(ConfigError::EmptyPath(PathKind::Primitive))
        ));
        assert!(matches!(
            validate_hierarchy(&MappingConfig::new().with_separator("")),
            Err(ConfigError::EmptySeparator)
        ));
    }

    #[test]
    fn test_custom_separator() {
        let config = lists(vec![
            ListRule::new("d").with_keys(["d.id"]),
        ])
        .with_separator(".");
        assert!(matches!(validate_hierarchy(&config), Err(ConfigError::AbsolutePath { .. })));
    }
}
