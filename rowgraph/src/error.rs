//! Error types for the rowgraph conversion pipeline.
//!
//! - [`ConfigError`] - Mapping configuration / hierarchy errors (raised before any row is read)
//! - [`BuildError`] - Errors raised while assembling one document
//! - [`MaterializeError`] - Binding a finished document into a typed target failed
//! - [`ConvertError`] - Top-level errors returned by the conversion entry points
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use thiserror::Error;

use crate::models::LeafValue;
use crate::parser::CsvError;

// =============================================================================
// Configuration Errors
// =============================================================================

/// Structural problems in a mapping configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A list was declared before the list it is nested under.
    #[error("List '{list}' is declared before its ancestor list '{ancestor}'")]
    ListBeforeAncestor { list: String, ancestor: String },

    /// A key or order-by path repeats the list's own absolute prefix.
    #[error("{kind} path '{path}' of list '{list}' must be relative to the list; use '{relative}'")]
    AbsolutePath {
        list: String,
        kind: PathKind,
        path: String,
        relative: String,
    },

    /// Two list rules share the same path.
    #[error("List '{0}' is declared more than once")]
    DuplicateList(String),

    /// A key field lives inside a list nested under the rule it identifies.
    #[error("Key path '{path}' of list '{list}' points inside nested list '{nested}'")]
    KeyInsideNestedList {
        list: String,
        path: String,
        nested: String,
    },

    /// An empty path where a path is required.
    #[error("Empty {0} path")]
    EmptyPath(PathKind),

    /// The separator is empty.
    #[error("Path separator must not be empty")]
    EmptySeparator,

    /// Failed to read a configuration file.
    #[error("Failed to read mapping: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration JSON.
    #[error("Invalid mapping JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Which configured path an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    List,
    Key,
    OrderBy,
    RootKey,
    Primitive,
}

impl std::fmt::Display for PathKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PathKind::List => "list",
            PathKind::Key => "key",
            PathKind::OrderBy => "orderBy",
            PathKind::RootKey => "root key",
            PathKind::Primitive => "primitive",
        };
        f.write_str(name)
    }
}

// =============================================================================
// Build Errors
// =============================================================================

/// Errors raised while assembling a single document.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BuildError {
    /// The `error` conflict policy saw two different values for one field.
    #[error("Conflicting values for field '{field}' in list '{list}': existing {existing}, incoming {incoming}")]
    Conflict {
        list: String,
        field: String,
        existing: LeafValue,
        incoming: LeafValue,
    },

    /// A field value and a nested list claim the same position in the tree.
    #[error("Value at '{path}' collides with a nested list")]
    PathConflict { path: String },
}

// =============================================================================
// Materialization Errors
// =============================================================================

/// Binding a finished document into a typed target failed.
#[derive(Debug, Error)]
#[error("Failed to materialize document {document}: {source}")]
pub struct MaterializeError {
    pub document: String,
    #[source]
    pub source: serde_json::Error,
}

// =============================================================================
// Conversion Errors (top-level)
// =============================================================================

/// Top-level conversion errors.
///
/// This is the error type returned by [`crate::transform::pipeline::Converter`]
/// and the file helpers. It wraps all lower-level errors.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// Mapping configuration error.
    #[error("Mapping error: {0}")]
    Config(#[from] ConfigError),

    /// A document build failed.
    #[error("Build failed for document {group}: {source}")]
    Build {
        group: String,
        #[source]
        source: BuildError,
    },

    /// Typed binding failed.
    #[error(transparent)]
    Materialize(#[from] MaterializeError),

    /// CSV parsing error.
    #[error("CSV error: {0}")]
    Csv(#[from] CsvError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON input error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// No rows to convert.
    #[error("No rows to convert")]
    EmptyInput,
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type for document assembly.
pub type BuildResult<T> = Result<T, BuildError>;

/// Result type for conversion entry points.
pub type ConvertResult<T> = Result<T, ConvertError>;
