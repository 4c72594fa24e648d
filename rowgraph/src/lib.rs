//! # rowgraph - flat rows to nested documents
//!
//! rowgraph rebuilds nested documents from denormalized, repeating row streams
//! (CSV exports, SQL join output) under a declarative mapping: which flat paths
//! form lists, which fields identify a list element, how duplicate descriptions
//! of one element are reconciled, and how each list is ordered.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  Flat rows  │────▶│   Grouper   │────▶│  Assembler  │────▶│  Documents  │
//! │ (CSV/JSON)  │     │ (root keys) │     │ (per group) │     │   (JSON)    │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use rowgraph::{convert, example_mapping, Mapping};
//!
//! let mapping = Mapping::new(example_mapping())?;
//! let output = convert(rows, &mapping)?;
//! println!("Built {} documents", output.documents.len());
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`models`] - Row and leaf value types, composite keys
//! - [`path`] - Flat path helpers
//! - [`config`] - Mapping configuration, validation and compilation
//! - [`transform`] - Grouping, assembly, finalization and the conversion API
//! - [`parser`] - CSV / JSON row input with auto-detection
//! - [`validation`] - JSON Schema validation of produced documents
//! - [`diagnostics`] - Conversion log entries and sinks

// Core modules
pub mod error;
pub mod models;
pub mod path;

// Configuration
pub mod config;

// Transformation
pub mod transform;

// Input
pub mod parser;

// Validation
pub mod validation;

// Diagnostics
pub mod diagnostics;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    BuildError,
    BuildResult,
    ConfigError,
    ConfigResult,
    ConvertError,
    ConvertResult,
    MaterializeError,
    PathKind,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{CompositeKey, LeafValue, Row, RowValues};

// =============================================================================
// Re-exports - Configuration
// =============================================================================

pub use config::{
    example_mapping,
    validate_hierarchy,
    ConflictPolicy,
    Direction,
    ListRule,
    Mapping,
    MappingConfig,
    NullPlacement,
    NullPolicy,
    OrderSpec,
    PrimitiveRule,
};

// =============================================================================
// Re-exports - Pipeline
// =============================================================================

pub use transform::pipeline::{
    convert,
    convert_bytes,
    convert_csv,
    convert_json,
    materialize,
    ConvertOutput,
    ConvertStats,
    Converter,
    Document,
    GroupOutcome,
};

pub use transform::{group_by_root_keys, BuildContext, ValueTransformer};

// =============================================================================
// Re-exports - Parsing
// =============================================================================

pub use parser::{
    decode_content,
    detect_delimiter,
    detect_encoding,
    parse_bytes_auto,
    parse_file_auto,
    parse_json_rows,
    CsvError,
    ParseResult,
};

// =============================================================================
// Re-exports - Validation / Diagnostics
// =============================================================================

pub use validation::{is_valid, validate, validate_documents};

pub use diagnostics::{DiagnosticSink, LogEntry, LogLevel, MemorySink, StderrSink};
