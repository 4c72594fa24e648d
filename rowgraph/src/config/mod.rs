//! Mapping configuration.
//!
//! A [`MappingConfig`] is the plain, serde-loadable description of how flat rows
//! become documents. [`Mapping::new`] validates it once and compiles it into the
//! immutable form the assembler works from.
//!
//! ```json
//! {
//!   "separator": "/",
//!   "rootKeys": ["tenant"],
//!   "lists": [
//!     { "path": "departments", "keyPaths": ["id"], "orderBy": [{ "path": "name" }] },
//!     { "path": "departments/employees", "keyPaths": ["id"], "onConflict": "lastWriteWins" }
//!   ],
//!   "primitives": [{ "path": "departments/tags", "delimiter": "," }],
//!   "nullPolicy": { "blanksAsNulls": true }
//! }
//! ```

pub mod mapping;
pub mod validate;

pub use mapping::{Comparator, CompiledRule, KeyField, Mapping};
pub use validate::validate_hierarchy;

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ConfigResult;

/// The whole conversion contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingConfig {
    /// Separator joining path segments in row keys
    #[serde(default = "default_separator")]
    pub separator: String,

    /// Accepted for compatibility; does not change assembly
    #[serde(default)]
    pub allow_sparse_rows: bool,

    /// Paths whose values partition the batch into documents
    #[serde(default)]
    pub root_keys: Vec<String>,

    /// One rule per nested list, parents before children
    #[serde(default)]
    pub lists: Vec<ListRule>,

    /// String fields split into arrays
    #[serde(default)]
    pub primitives: Vec<PrimitiveRule>,

    #[serde(default)]
    pub null_policy: NullPolicy,
}

fn default_separator() -> String {
    "/".to_string()
}

/// One nested list in the output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListRule {
    /// Absolute path of the list from the document root
    pub path: String,

    /// Identity fields, relative to `path`
    #[serde(default)]
    pub key_paths: Vec<String>,

    /// Element ordering, relative to `path`
    #[serde(default)]
    pub order_by: Vec<OrderSpec>,

    /// Merge rows with equal keys into one element
    #[serde(default = "default_dedupe")]
    pub dedupe: bool,

    #[serde(default)]
    pub on_conflict: ConflictPolicy,
}

fn default_dedupe() -> bool {
    true
}

/// Ordering clause of a list rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSpec {
    pub path: String,
    #[serde(default)]
    pub direction: Direction,
    #[serde(default)]
    pub nulls: NullPlacement,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

/// Where null or missing sort values go, regardless of direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NullPlacement {
    First,
    #[default]
    Last,
}

/// How a new row's values combine with an element that already exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConflictPolicy {
    /// Differing scalar values fail the build
    #[default]
    Error,
    /// Incoming values overwrite
    LastWriteWins,
    /// Existing values are kept
    FirstWriteWins,
    /// Objects merge recursively, everything else overwrites
    Merge,
}

/// Split a string field into an array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrimitiveRule {
    /// Absolute flat path of the field
    pub path: String,
    #[serde(default = "default_delimiter")]
    pub delimiter: String,
    #[serde(default = "default_trim")]
    pub trim: bool,
}

fn default_delimiter() -> String {
    ",".to_string()
}

fn default_trim() -> bool {
    true
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NullPolicy {
    /// Treat blank strings as null
    #[serde(default)]
    pub blanks_as_nulls: bool,
}

impl MappingConfig {
    /// Create an empty configuration with the default separator.
    pub fn new() -> Self {
        Self {
            separator: default_separator(),
            allow_sparse_rows: false,
            root_keys: Vec::new(),
            lists: Vec::new(),
            primitives: Vec::new(),
            null_policy: NullPolicy::default(),
        }
    }

    /// Parse a configuration from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Parse a configuration from a JSON value.
    pub fn from_value(value: &serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value.clone())
    }

    /// Read a configuration file.
    pub fn from_path(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(Self::from_json(&content)?)
    }

    /// Serialize to a JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    pub fn with_root_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.root_keys = keys.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_list(mut self, rule: ListRule) -> Self {
        self.lists.push(rule);
        self
    }

    pub fn with_primitive(mut self, rule: PrimitiveRule) -> Self {
        self.primitives.push(rule);
        self
    }

    pub fn with_blanks_as_nulls(mut self, enabled: bool) -> Self {
        self.null_policy.blanks_as_nulls = enabled;
        self
    }
}

impl Default for MappingConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl ListRule {
    /// A deduplicating list with the `error` policy and no keys.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            key_paths: Vec::new(),
            order_by: Vec::new(),
            dedupe: default_dedupe(),
            on_conflict: ConflictPolicy::default(),
        }
    }

    pub fn with_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.key_paths = keys.into_iter().map(Into::into).collect();
        self
    }

    pub fn order_by(mut self, spec: OrderSpec) -> Self {
        self.order_by.push(spec);
        self
    }

    pub fn with_dedupe(mut self, dedupe: bool) -> Self {
        self.dedupe = dedupe;
        self
    }

    pub fn on_conflict(mut self, policy: ConflictPolicy) -> Self {
        self.on_conflict = policy;
        self
    }
}

impl OrderSpec {
    pub fn asc(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            direction: Direction::Asc,
            nulls: NullPlacement::Last,
        }
    }

    pub fn desc(path: impl Into<String>) -> Self {
        Self {
            direction: Direction::Desc,
            ..Self::asc(path)
        }
    }

    pub fn nulls(mut self, placement: NullPlacement) -> Self {
        self.nulls = placement;
        self
    }
}

impl PrimitiveRule {
    pub fn new(path: impl Into<String>, delimiter: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            delimiter: delimiter.into(),
            trim: default_trim(),
        }
    }

    pub fn with_trim(mut self, trim: bool) -> Self {
        self.trim = trim;
        self
    }
}

/// A small but complete mapping: tenants, departments, employees, skills.
pub fn example_mapping() -> MappingConfig {
    MappingConfig::new()
        .with_root_keys(["tenant"])
        .with_list(
            ListRule::new("departments")
                .with_keys(["id"])
                .order_by(OrderSpec::asc("name")),
        )
        .with_list(
            ListRule::new("departments/employees")
                .with_keys(["id"])
                .order_by(OrderSpec::desc("salary").nulls(NullPlacement::Last))
                .order_by(OrderSpec::asc("name"))
                .on_conflict(ConflictPolicy::Merge),
        )
        .with_list(
            ListRule::new("departments/employees/skills")
                .with_keys(["code"])
                .on_conflict(ConflictPolicy::FirstWriteWins),
        )
        .with_primitive(PrimitiveRule::new("departments/tags", ","))
        .with_blanks_as_nulls(true)
}
