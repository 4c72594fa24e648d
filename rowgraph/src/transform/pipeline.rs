//! High-level conversion API: rows in, documents out.
//!
//! Combines all steps: root-key grouping, per-group assembly and
//! finalization, and optional typed binding.
//!
//! # Example
//!
//! ```rust,ignore
//! use rowgraph::{convert_csv, Mapping, MappingConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mapping = Mapping::new(MappingConfig::from_path("mapping.json")?)?;
//!     let output = convert_csv("company.csv", &mapping)?;
//!
//!     println!("Built {} documents", output.documents.len());
//!     Ok(())
//! }
//! ```

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::path::Path;

use super::assembler::assemble;
use super::grouper::{group_by_root_keys, IndexedRow};
use crate::config::Mapping;
use crate::diagnostics::{emit, DiagnosticSink, LogEntry};
use crate::error::{BuildError, ConvertError, ConvertResult, MaterializeError};
use crate::models::{CompositeKey, LeafValue, Row};
use crate::parser::{parse_bytes_auto, parse_file_auto, parse_json_rows};

/// One finished document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
    /// Root key values of the group, empty without root keys
    pub key: Vec<LeafValue>,
    pub body: Value,
}

impl Document {
    /// Human-readable group key.
    pub fn label(&self) -> String {
        CompositeKey::new(self.key.clone()).to_string()
    }

    pub fn into_body(self) -> Value {
        self.body
    }
}

/// Outcome of one group in lenient mode.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupOutcome {
    pub key: Vec<LeafValue>,
    pub result: Result<Document, BuildError>,
}

/// Conversion counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertStats {
    /// Rows received
    pub rows: usize,
    /// Rows without a root key
    pub dropped_rows: usize,
    pub groups: usize,
    pub documents: usize,
    pub failed_groups: usize,
    /// (row, list) pairs skipped for missing identity
    pub skips: usize,
    /// Field entries with nowhere to go
    pub dropped_entries: usize,
}

/// Result of a strict conversion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConvertOutput {
    pub documents: Vec<Document>,
    pub stats: ConvertStats,
}

impl ConvertOutput {
    /// Document bodies only.
    pub fn bodies(&self) -> Vec<&Value> {
        self.documents.iter().map(|d| &d.body).collect()
    }
}

/// Converts row batches under one mapping.
///
/// Holds no build state: every call partitions its own batch and every group
/// gets a fresh build context, so one converter can serve any number of calls.
#[derive(Clone, Copy)]
pub struct Converter<'a> {
    mapping: &'a Mapping,
    sink: Option<&'a dyn DiagnosticSink>,
}

impl<'a> Converter<'a> {
    pub fn new(mapping: &'a Mapping) -> Self {
        Self { mapping, sink: None }
    }

    /// Report diagnostics to `sink`.
    pub fn with_sink(mut self, sink: &'a dyn DiagnosticSink) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn mapping(&self) -> &Mapping {
        self.mapping
    }

    /// Convert a batch; the first failing group aborts the whole conversion.
    pub fn convert(&self, rows: Vec<Row>) -> ConvertResult<ConvertOutput> {
        let mut stats = ConvertStats::default();
        let groups = self.partition(rows, &mut stats);

        let mut documents = Vec::with_capacity(groups.len());
        for (key, members) in groups {
            let label = key.to_string();
            let document = self
                .build_group(key, &members, &mut stats)
                .map_err(|source| {
                    emit(self.sink, LogEntry::error(format!("Document {}: {}", label, source)));
                    ConvertError::Build {
                        group: label,
                        source,
                    }
                })?;
            documents.push(document);
        }

        stats.documents = documents.len();
        emit(self.sink, LogEntry::success(format!("{} documents", stats.documents)));
        Ok(ConvertOutput { documents, stats })
    }

    /// Convert a batch, reporting each group's outcome independently.
    pub fn convert_groups(&self, rows: Vec<Row>) -> (Vec<GroupOutcome>, ConvertStats) {
        let mut stats = ConvertStats::default();
        let groups = self.partition(rows, &mut stats);

        let outcomes: Vec<GroupOutcome> = groups
            .into_iter()
            .map(|(key, members)| {
                let values = key.values().to_vec();
                let result = self.build_group(key, &members, &mut stats);
                match &result {
                    Ok(_) => stats.documents += 1,
                    Err(e) => {
                        stats.failed_groups += 1;
                        emit(
                            self.sink,
                            LogEntry::error(format!("Document {}: {}", CompositeKey::new(values.clone()), e)),
                        );
                    }
                }
                GroupOutcome { key: values, result }
            })
            .collect();

        if stats.failed_groups > 0 {
            emit(
                self.sink,
                LogEntry::warning(format!("{} of {} documents failed", stats.failed_groups, stats.groups)),
            );
        } else {
            emit(self.sink, LogEntry::success(format!("{} documents", stats.documents)));
        }
        (outcomes, stats)
    }

    /// Strict conversion followed by typed binding of every document.
    pub fn convert_into<T: DeserializeOwned>(&self, rows: Vec<Row>) -> ConvertResult<Vec<T>> {
        let output = self.convert(rows)?;
        output
            .documents
            .iter()
            .map(|doc| materialize(doc).map_err(ConvertError::from))
            .collect()
    }

    fn partition(&self, rows: Vec<Row>, stats: &mut ConvertStats) -> Vec<(CompositeKey, Vec<IndexedRow>)> {
        stats.rows = rows.len();
        emit(self.sink, LogEntry::info(format!("Grouping {} rows by root key...", rows.len())));

        let grouping = group_by_root_keys(rows, self.mapping.root_keys(), self.mapping.blanks_as_nulls());
        for index in &grouping.dropped {
            emit(
                self.sink,
                LogEntry::warning(format!("Row {}: no root key value; dropped", index)).with_indent(1),
            );
        }

        stats.dropped_rows = grouping.dropped.len();
        stats.groups = grouping.len();
        grouping.groups.into_iter().collect()
    }

    fn build_group(
        &self,
        key: CompositeKey,
        members: &[IndexedRow],
        stats: &mut ConvertStats,
    ) -> Result<Document, BuildError> {
        let rows = members.iter().map(|(index, row)| (*index, row));
        let (body, build) = assemble(self.mapping, rows, self.sink)?;

        stats.skips += build.skips;
        stats.dropped_entries += build.dropped_entries;
        emit(
            self.sink,
            LogEntry::info(format!("Document {}: {} rows", key, build.rows)).with_indent(1),
        );

        Ok(Document {
            key: key.into_values(),
            body,
        })
    }
}

/// Bind a finished document into a typed target.
pub fn materialize<T: DeserializeOwned>(document: &Document) -> Result<T, MaterializeError> {
    serde_json::from_value(document.body.clone()).map_err(|source| MaterializeError {
        document: document.label(),
        source,
    })
}

/// Strict conversion without diagnostics.
pub fn convert(rows: Vec<Row>, mapping: &Mapping) -> ConvertResult<ConvertOutput> {
    Converter::new(mapping).convert(rows)
}

/// Convert a CSV file with auto-detected encoding and delimiter.
pub fn convert_csv<P: AsRef<Path>>(path: P, mapping: &Mapping) -> ConvertResult<ConvertOutput> {
    let parsed = parse_file_auto(path)?;
    convert_nonempty(parsed.rows, mapping)
}

/// Convert CSV bytes with auto-detected encoding and delimiter.
pub fn convert_bytes(bytes: &[u8], mapping: &Mapping) -> ConvertResult<ConvertOutput> {
    let parsed = parse_bytes_auto(bytes)?;
    convert_nonempty(parsed.rows, mapping)
}

/// Convert a JSON array of flat row objects.
pub fn convert_json(json: &str, mapping: &Mapping) -> ConvertResult<ConvertOutput> {
    let rows = parse_json_rows(json)?;
    convert_nonempty(rows, mapping)
}

fn convert_nonempty(rows: Vec<Row>, mapping: &Mapping) -> ConvertResult<ConvertOutput> {
    if rows.is_empty() {
        return Err(ConvertError::EmptyInput);
    }
    convert(rows, mapping)
}
