//! Row graph assembler: builds one document from the rows of one group.
//!
//! ```text
//! row ──▶ ValueTransformer ──▶ RowValues
//!                                 │
//!           for each list rule (declared order)
//!                                 │
//!     parent skipped? ──yes──▶ skip this rule too
//!                                 │ no
//!     key fields present? ──no──▶ skip (diagnostic)
//!                                 │ yes
//!     ensure array under parent element ──▶ upsert element ──▶ write owned fields
//!                                 │
//!     remaining fields ──▶ document root (last write wins)
//! ```
//!
//! All state lives in a [`BuildContext`] owned by one group build.

use super::bucket::GroupingEngine;
use super::conflict::{self, Fragment, Scope};
use super::finalize::finalize;
use super::tree::{NodeId, Tree};
use super::values::ValueTransformer;
use crate::config::{CompiledRule, ConflictPolicy, Mapping};
use crate::diagnostics::{emit, DiagnosticSink, LogEntry};
use crate::error::BuildResult;
use crate::models::{CompositeKey, LeafValue, Row, RowValues};
use crate::path;

/// Rules inhibited for the current row.
///
/// A rule is skipped when one of its key fields is missing or null, or when
/// its nearest ancestor rule is skipped.
#[derive(Debug, Clone, Default)]
pub struct SkipSet {
    skipped: Vec<bool>,
}

impl SkipSet {
    pub fn new(rules: usize) -> Self {
        Self {
            skipped: vec![false; rules],
        }
    }

    pub fn insert(&mut self, rule: usize) {
        self.skipped[rule] = true;
    }

    pub fn contains(&self, rule: usize) -> bool {
        self.skipped.get(rule).copied().unwrap_or(false)
    }

    pub fn clear(&mut self) {
        self.skipped.iter_mut().for_each(|s| *s = false);
    }

    pub fn len(&self) -> usize {
        self.skipped.iter().filter(|s| **s).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Counters for one document build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildStats {
    pub rows: usize,
    /// (row, rule) pairs skipped, including propagated skips
    pub skips: usize,
    /// Entries that had nowhere to go
    pub dropped_entries: usize,
}

/// Build state for one root-key group.
pub struct BuildContext<'a> {
    mapping: &'a Mapping,
    transformer: ValueTransformer<'a>,
    tree: Tree,
    engine: GroupingEngine,
    /// Element upserted for each rule in the current row
    current: Vec<Option<NodeId>>,
    skipped: SkipSet,
    stats: BuildStats,
    sink: Option<&'a dyn DiagnosticSink>,
}

impl<'a> BuildContext<'a> {
    pub fn new(mapping: &'a Mapping) -> Self {
        let rules = mapping.rules().len();
        Self {
            mapping,
            transformer: ValueTransformer::new(mapping),
            tree: Tree::new(),
            engine: GroupingEngine::new(),
            current: vec![None; rules],
            skipped: SkipSet::new(rules),
            stats: BuildStats::default(),
            sink: None,
        }
    }

    pub fn with_sink(mut self, sink: Option<&'a dyn DiagnosticSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn stats(&self) -> BuildStats {
        self.stats
    }

    /// Rules skipped for the most recent row.
    pub fn skipped(&self) -> &SkipSet {
        &self.skipped
    }

    /// Thread one row through every list rule, then onto the root.
    ///
    /// `index` is the row's position in the input batch, used in diagnostics.
    pub fn push_row(&mut self, index: usize, row: &Row) -> BuildResult<()> {
        let mapping = self.mapping;
        let sep = mapping.separator();
        let values = self.transformer.transform(row);
        let owners: Vec<Option<usize>> = values.keys().map(|p| mapping.owner_of(p)).collect();

        self.skipped.clear();
        self.current.iter_mut().for_each(|c| *c = None);
        self.stats.rows += 1;

        for rule in mapping.rules() {
            let i = rule.index;

            let base = match rule.parent {
                Some(parent) if self.skipped.contains(parent) => {
                    self.skip(i);
                    continue;
                }
                Some(parent) => match self.current[parent] {
                    Some(element) => element,
                    None => {
                        self.skip(i);
                        continue;
                    }
                },
                None => NodeId::ROOT,
            };

            let key = match composite_key(rule, &values) {
                Ok(key) => key,
                Err(missing) => {
                    self.skip(i);
                    emit(
                        self.sink,
                        LogEntry::warning(format!(
                            "Row {}: skipped '{}' (missing key {})",
                            index,
                            rule.path,
                            missing.join(", ")
                        )),
                    );
                    continue;
                }
            };

            let mut fragment = Fragment::new();
            for ((flat, value), owner) in values.iter().zip(&owners) {
                if *owner != Some(i) {
                    continue;
                }
                match path::suffix_after(flat, &rule.path, sep) {
                    Some(relative) => fragment.insert(&path::split(relative, sep), value.clone()),
                    None => self.drop_entry(index, flat),
                }
            }

            let array = self
                .tree
                .ensure_array(base, &rule.relative_segments, i, &rule.path)?;
            let scope = Scope {
                list: &rule.path,
                separator: sep,
            };
            let (element, _) = self.engine.bucket(array, rule.dedupe).upsert(
                &mut self.tree,
                key,
                Tree::alloc_object,
                fragment,
                rule.policy,
                scope,
            )?;
            self.current[i] = Some(element);
        }

        let mut root = Fragment::new();
        for ((flat, value), owner) in values.iter().zip(&owners) {
            match owner {
                None => root.insert(&path::split(flat, sep), value.clone()),
                Some(rule) if self.skipped.contains(*rule) => self.stats.dropped_entries += 1,
                Some(_) => {}
            }
        }
        conflict::apply(
            &mut self.tree,
            NodeId::ROOT,
            root,
            ConflictPolicy::LastWriteWins,
            Scope {
                list: "",
                separator: sep,
            },
        )
    }

    /// Finalize the tree into a document.
    pub fn finish(mut self) -> serde_json::Value {
        finalize(&self.tree, &mut self.engine, self.mapping)
    }

    fn skip(&mut self, rule: usize) {
        self.skipped.insert(rule);
        self.stats.skips += 1;
    }

    fn drop_entry(&mut self, index: usize, flat: &str) {
        self.stats.dropped_entries += 1;
        emit(
            self.sink,
            LogEntry::info(format!("Row {}: '{}' names a list, not a field; dropped", index, flat)),
        );
    }
}

/// Key values for `rule`, or the key paths that are missing or null.
fn composite_key(rule: &CompiledRule, values: &RowValues) -> Result<CompositeKey, Vec<String>> {
    let mut parts = Vec::with_capacity(rule.key_fields.len());
    let mut missing = Vec::new();

    for field in &rule.key_fields {
        match values.get(&field.absolute) {
            None | Some(LeafValue::Null) => missing.push(field.relative.clone()),
            Some(value) => parts.push(value.clone()),
        }
    }

    if missing.is_empty() {
        Ok(CompositeKey::new(parts))
    } else {
        Err(missing)
    }
}

/// Build a whole group in one call.
pub fn assemble<'a, I>(
    mapping: &'a Mapping,
    rows: I,
    sink: Option<&'a dyn DiagnosticSink>,
) -> BuildResult<(serde_json::Value, BuildStats)>
where
    I: IntoIterator<Item = (usize, &'a Row)>,
{
    let mut context = BuildContext::new(mapping).with_sink(sink);
    for (index, row) in rows {
        context.push_row(index, row)?;
    }
    let stats = context.stats();
    Ok((context.finish(), stats))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ListRule, MappingConfig, OrderSpec, PrimitiveRule};
    use crate::diagnostics::{LogLevel, MemorySink};
    use crate::error::BuildError;
    use serde_json::json;

    fn rows(values: serde_json::Value) -> Vec<Row> {
        serde_json::from_value(values).unwrap()
    }

    fn build(config: MappingConfig, input: serde_json::Value) -> BuildResult<serde_json::Value> {
        let mapping = Mapping::new(config).unwrap();
        let input = rows(input);
        assemble(&mapping, input.iter().enumerate(), None).map(|(doc, _)| doc)
    }

    fn company() -> MappingConfig {
        MappingConfig::new()
            .with_list(ListRule::new("departments").with_keys(["id"]))
            .with_list(ListRule::new("departments/employees").with_keys(["id"]))
    }

    #[test]
    fn test_nested_lists_deduplicate_parents() {
        let doc = build(
            company(),
            json!([
                { "company": "Acme", "departments/id": "D1", "departments/name": "Ops",
                  "departments/employees/id": 1, "departments/employees/name": "Ann" },
                { "company": "Acme", "departments/id": "D1", "departments/name": "Ops",
                  "departments/employees/id": 2, "departments/employees/name": "Bob" },
                { "company": "Acme", "departments/id": "D2", "departments/name": "Dev",
                  "departments/employees/id": 1, "departments/employees/name": "Cat" }
            ]),
        )
        .unwrap();

        assert_eq!(
            doc,
            json!({
                "departments": [
                    { "id": "D1", "name": "Ops", "employees": [
                        { "id": 1, "name": "Ann" },
                        { "id": 2, "name": "Bob" }
                    ]},
                    { "id": "D2", "name": "Dev", "employees": [
                        { "id": 1, "name": "Cat" }
                    ]}
                ],
                "company": "Acme"
            })
        );
    }

    #[test]
    fn test_skip_propagates_to_descendants() {
        let mapping = Mapping::new(
            company().with_list(ListRule::new("departments/employees/skills").with_keys(["code"])),
        )
        .unwrap();
        let input = rows(json!([
            { "departments/id": "D1",
              "departments/employees/id": 1,
              "departments/employees/skills/code": "rust" },
            { "departments/id": null,
              "departments/name": "lost",
              "departments/employees/id": 2,
              "departments/employees/skills/code": "go" }
        ]));

        let sink = MemorySink::new();
        let mut context = BuildContext::new(&mapping).with_sink(Some(&sink));
        context.push_row(0, &input[0]).unwrap();
        context.push_row(1, &input[1]).unwrap();

        assert_eq!(context.skipped().len(), 3);
        let stats = context.stats();
        assert_eq!(stats.skips, 3);
        assert_eq!(stats.dropped_entries, 4);
        assert_eq!(sink.count(LogLevel::Warning), 1);

        let doc = context.finish();
        assert_eq!(
            doc,
            json!({
                "departments": [
                    { "id": "D1", "employees": [
                        { "id": 1, "skills": [{ "code": "rust" }] }
                    ]}
                ]
            })
        );
    }

    #[test]
    fn test_skip_is_per_row() {
        let doc = build(
            company(),
            json!([
                { "departments/id": "D1", "departments/employees/name": "no id" },
                { "departments/id": "D1", "departments/employees/id": 7 }
            ]),
        )
        .unwrap();

        assert_eq!(doc, json!({ "departments": [{ "id": "D1", "employees": [{ "id": 7 }] }] }));
    }

    #[test]
    fn test_conflict_error_aborts() {
        let result = build(
            MappingConfig::new().with_list(ListRule::new("departments").with_keys(["id"])),
            json!([
                { "departments/id": "D-1", "departments/name": "Alpha" },
                { "departments/id": "D-1", "departments/name": "Beta" }
            ]),
        );

        match result {
            Err(BuildError::Conflict { list, field, .. }) => {
                assert_eq!(list, "departments");
                assert_eq!(field, "name");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_root_fields_last_write_wins() {
        let doc = build(
            MappingConfig::new(),
            json!([
                { "title": "first", "meta/owner": "a" },
                { "title": "second" }
            ]),
        )
        .unwrap();
        assert_eq!(doc, json!({ "title": "second", "meta": { "owner": "a" } }));
    }

    #[test]
    fn test_nested_root_fields_accumulate_across_rows() {
        let doc = build(
            MappingConfig::new(),
            json!([
                { "info/a": "x" },
                { "info/b": "y" },
                { "info/a": "z" }
            ]),
        )
        .unwrap();
        assert_eq!(doc, json!({ "info": { "a": "z", "b": "y" } }));
    }

    #[test]
    fn test_keyless_list_one_element_per_parent() {
        let doc = build(
            MappingConfig::new()
                .with_list(ListRule::new("departments").with_keys(["id"]))
                .with_list(ListRule::new("departments/address")),
            json!([
                { "departments/id": 1, "departments/address/city": "Oslo" },
                { "departments/id": 1, "departments/address/zip": "0150" },
                { "departments/id": 2, "departments/address/city": "Rome" }
            ]),
        )
        .unwrap();

        assert_eq!(
            doc,
            json!({
                "departments": [
                    { "id": 1, "address": [{ "city": "Oslo", "zip": "0150" }] },
                    { "id": 2, "address": [{ "city": "Rome" }] }
                ]
            })
        );
    }

    #[test]
    fn test_dedupe_off_appends_every_row() {
        let doc = build(
            MappingConfig::new().with_list(ListRule::new("events").with_keys(["kind"]).with_dedupe(false)),
            json!([
                { "events/kind": "click", "events/at": 1 },
                { "events/kind": "click", "events/at": 2 },
                { "events/at": 3 }
            ]),
        )
        .unwrap();

        assert_eq!(
            doc,
            json!({ "events": [{ "kind": "click", "at": 1 }, { "kind": "click", "at": 2 }] })
        );
    }

    #[test]
    fn test_intermediate_objects_between_lists() {
        let doc = build(
            MappingConfig::new()
                .with_list(ListRule::new("departments").with_keys(["id"]))
                .with_list(ListRule::new("departments/info/rooms").with_keys(["no"]).order_by(OrderSpec::asc("no"))),
            json!([
                { "departments/id": 1, "departments/info/floor": 3, "departments/info/rooms/no": 12 },
                { "departments/id": 1, "departments/info/rooms/no": 4 }
            ]),
        )
        .unwrap();

        assert_eq!(
            doc,
            json!({
                "departments": [
                    { "id": 1, "info": { "floor": 3, "rooms": [{ "no": 4 }, { "no": 12 }] } }
                ]
            })
        );
    }

    #[test]
    fn test_field_naming_a_list_is_dropped() {
        let mapping = Mapping::new(company()).unwrap();
        let input = rows(json!([{
            "departments/id": 1,
            "departments/employees": "flat",
            "departments/employees/id": 5
        }]));

        let (doc, stats) = assemble(&mapping, input.iter().enumerate(), None).unwrap();
        assert_eq!(stats.dropped_entries, 1);
        assert_eq!(doc, json!({ "departments": [{ "id": 1, "employees": [{ "id": 5 }] }] }));
    }

    #[test]
    fn test_root_field_colliding_with_list_is_path_conflict() {
        let result = build(
            MappingConfig::new().with_list(ListRule::new("info/rooms").with_keys(["no"])),
            json!([{ "info/rooms/no": 1, "info": "flat" }]),
        );
        assert_eq!(result, Err(BuildError::PathConflict { path: "info".into() }));
    }

    #[test]
    fn test_primitive_split_lands_in_element() {
        let doc = build(
            MappingConfig::new()
                .with_list(ListRule::new("departments").with_keys(["id"]))
                .with_primitive(PrimitiveRule::new("departments/tags", ",")),
            json!([{ "departments/id": 1, "departments/tags": "a, b" }]),
        )
        .unwrap();
        assert_eq!(doc, json!({ "departments": [{ "id": 1, "tags": ["a", "b"] }] }));
    }

    #[test]
    fn test_blank_key_is_missing_under_blanks_as_nulls() {
        let doc = build(
            MappingConfig::new()
                .with_list(ListRule::new("departments").with_keys(["id"]))
                .with_blanks_as_nulls(true),
            json!([{ "departments/id": " ", "departments/name": "x" }, { "departments/id": "D", "departments/name": "y" }]),
        )
        .unwrap();
        assert_eq!(doc, json!({ "departments": [{ "id": "D", "name": "y" }] }));
    }

    #[test]
    fn test_skip_set_basics() {
        let mut set = SkipSet::new(3);
        assert!(set.is_empty());
        set.insert(1);
        assert!(set.contains(1));
        assert!(!set.contains(5));
        set.clear();
        assert!(set.is_empty());
    }
}
