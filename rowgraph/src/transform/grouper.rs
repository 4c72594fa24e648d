//! Partition a row batch into one group per root key.
//!
//! ```text
//! Flat rows                          Groups (first-occurrence order)
//! ┌──────────────────────────┐       ┌────────────────────────────┐
//! │ tenant: 1, dept: Ops     │       │ tenant 1: rows 0, 2        │
//! │ tenant: 2, dept: Sales   │  →    ├────────────────────────────┤
//! │ tenant: 1, dept: Dev     │       │ tenant 2: row 1            │
//! │ dept: Orphan             │       └────────────────────────────┘
//! └──────────────────────────┘       row 3 dropped (no tenant)
//! ```
//!
//! Each group becomes one output document.

use indexmap::IndexMap;

use crate::models::{CompositeKey, LeafValue, Row};

/// A row with its position in the input batch.
pub type IndexedRow = (usize, Row);

/// Result of partitioning a batch.
#[derive(Debug, Clone, Default)]
pub struct Grouping {
    /// Groups in first-occurrence order of their key
    pub groups: IndexMap<CompositeKey, Vec<IndexedRow>>,
    /// Input positions of rows lacking a root key value
    pub dropped: Vec<usize>,
}

impl Grouping {
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// Group `rows` by the values at `root_keys`.
///
/// With no root keys every row lands in one implicit group (keyed by the empty
/// key). A row where any root key is absent, null, or blank under
/// `blanks_as_nulls` is excluded from every group.
pub fn group_by_root_keys(rows: Vec<Row>, root_keys: &[String], blanks_as_nulls: bool) -> Grouping {
    let mut grouping = Grouping::default();

    for (index, row) in rows.into_iter().enumerate() {
        match root_key_of(&row, root_keys, blanks_as_nulls) {
            Some(key) => grouping.groups.entry(key).or_default().push((index, row)),
            None => grouping.dropped.push(index),
        }
    }

    grouping
}

/// The composite root key of one row, if every part is present.
pub fn root_key_of(row: &Row, root_keys: &[String], blanks_as_nulls: bool) -> Option<CompositeKey> {
    let parts = root_keys
        .iter()
        .map(|path| match row.get(path) {
            None | Some(LeafValue::Null) => None,
            Some(value) if blanks_as_nulls && value.is_blank() => None,
            Some(value) => Some(value.clone()),
        })
        .collect::<Option<Vec<_>>>()?;
    Some(CompositeKey::new(parts))
}
