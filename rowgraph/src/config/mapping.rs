//! Compiled, immutable mapping.
//!
//! Everything the assembler asks per row is answered here from data computed
//! once: pre-split paths, nearest-ancestor links, direct children, absolute key
//! paths and comparator chains.

use std::collections::HashMap;
use std::path::Path;

use super::validate::{nearest_ancestors, validate_hierarchy};
use super::{ConflictPolicy, Direction, MappingConfig, NullPlacement, PrimitiveRule};
use crate::error::ConfigResult;
use crate::path;

/// A validated configuration, ready to drive conversions.
///
/// Immutable and `Send + Sync`; share one instance across any number of
/// concurrent conversions.
#[derive(Debug, Clone)]
pub struct Mapping {
    config: MappingConfig,
    rules: Vec<CompiledRule>,
    primitives: HashMap<String, PrimitiveRule>,
}

/// A list rule with its paths resolved.
#[derive(Debug, Clone)]
pub struct CompiledRule {
    pub index: usize,
    pub path: String,
    /// Nearest ancestor rule
    pub parent: Option<usize>,
    /// Segments from the parent element (or document root) to this list
    pub relative_segments: Vec<String>,
    pub key_fields: Vec<KeyField>,
    pub comparators: Vec<Comparator>,
    /// Rules whose nearest ancestor is this one
    pub children: Vec<usize>,
    pub dedupe: bool,
    pub policy: ConflictPolicy,
}

/// One identity field of a list rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyField {
    pub relative: String,
    pub absolute: String,
}

/// One link of an ordering chain.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Comparator {
    pub path: String,
    pub segments: Vec<String>,
    pub direction: Direction,
    pub nulls: NullPlacement,
}

impl Mapping {
    /// Validate and compile a configuration.
    pub fn new(config: MappingConfig) -> ConfigResult<Self> {
        validate_hierarchy(&config)?;

        let sep = config.separator.as_str();
        let paths: Vec<&str> = config.lists.iter().map(|r| r.path.as_str()).collect();
        let parents = nearest_ancestors(&paths, sep);

        let mut rules: Vec<CompiledRule> = config
            .lists
            .iter()
            .enumerate()
            .map(|(index, rule)| {
                let parent = parents[index];
                let from_parent = match parent {
                    Some(p) => path::suffix_after(&rule.path, paths[p], sep).unwrap_or(&rule.path),
                    None => rule.path.as_str(),
                };

                CompiledRule {
                    index,
                    path: rule.path.clone(),
                    parent,
                    relative_segments: path::split_owned(from_parent, sep),
                    key_fields: rule
                        .key_paths
                        .iter()
                        .map(|k| KeyField {
                            relative: k.clone(),
                            absolute: path::join(&rule.path, k, sep),
                        })
                        .collect(),
                    comparators: rule
                        .order_by
                        .iter()
                        .map(|o| Comparator {
                            path: o.path.clone(),
                            segments: path::split_owned(&o.path, sep),
                            direction: o.direction,
                            nulls: o.nulls,
                        })
                        .collect(),
                    children: Vec::new(),
                    dedupe: rule.dedupe,
                    policy: rule.on_conflict,
                }
            })
            .collect();

        for index in 0..rules.len() {
            if let Some(parent) = rules[index].parent {
                rules[parent].children.push(index);
            }
        }

        let primitives = config
            .primitives
            .iter()
            .map(|p| (p.path.clone(), p.clone()))
            .collect();

        Ok(Self {
            config,
            rules,
            primitives,
        })
    }

    /// Parse, validate and compile a JSON configuration.
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        Self::new(MappingConfig::from_json(json)?)
    }

    /// Read, validate and compile a configuration file.
    pub fn from_path(path: impl AsRef<Path>) -> ConfigResult<Self> {
        Self::new(MappingConfig::from_path(path)?)
    }

    pub fn config(&self) -> &MappingConfig {
        &self.config
    }

    pub fn separator(&self) -> &str {
        &self.config.separator
    }

    pub fn root_keys(&self) -> &[String] {
        &self.config.root_keys
    }

    pub fn blanks_as_nulls(&self) -> bool {
        self.config.null_policy.blanks_as_nulls
    }

    /// Accepted but currently has no effect on assembly.
    pub fn allow_sparse_rows(&self) -> bool {
        self.config.allow_sparse_rows
    }

    /// Rules in declaration order.
    pub fn rules(&self) -> &[CompiledRule] {
        &self.rules
    }

    pub fn rule(&self, index: usize) -> &CompiledRule {
        &self.rules[index]
    }

    /// All declared list paths.
    pub fn list_paths(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|r| r.path.as_str())
    }

    /// Paths of the lists directly nested under `list_path`.
    pub fn direct_children(&self, list_path: &str) -> Vec<&str> {
        self.rules
            .iter()
            .find(|r| r.path == list_path)
            .map(|r| r.children.iter().map(|&c| self.rules[c].path.as_str()).collect())
            .unwrap_or_default()
    }

    pub fn primitive(&self, flat_path: &str) -> Option<&PrimitiveRule> {
        self.primitives.get(flat_path)
    }

    /// The innermost list whose path is `flat_path` or one of its prefixes.
    ///
    /// A field owned by a list is written into that list's element; a field with
    /// no owner belongs to the document root.
    pub fn owner_of(&self, flat_path: &str) -> Option<usize> {
        let sep = self.separator();
        self.rules
            .iter()
            .filter(|r| path::is_at_or_under(flat_path, &r.path, sep))
            .max_by_key(|r| r.path.len())
            .map(|r| r.index)
    }

    /// Whether `rule` is nested (at any depth) under `ancestor`.
    pub fn is_descendant(&self, rule: usize, ancestor: usize) -> bool {
        let mut current = self.rules[rule].parent;
        while let Some(p) = current {
            if p == ancestor {
                return true;
            }
            current = self.rules[p].parent;
        }
        false
    }
}
