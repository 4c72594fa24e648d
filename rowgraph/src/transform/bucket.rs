//! Grouping engine: per-array deduplication and ordering state.
//!
//! Every pending array in the document tree gets one [`ArrayBucket`], created
//! the first time the array is touched and keyed by the array's [`NodeId`].
//! Buckets map composite keys to element containers, remember insertion order,
//! and cache the last sorted view until a new key is inserted.

use std::cmp::Ordering;
use std::collections::HashMap;

use super::conflict::{self, Fragment, Scope};
use super::tree::{NodeId, Tree};
use crate::config::{Comparator, ConflictPolicy, Direction, NullPlacement};
use crate::error::BuildResult;
use crate::models::{CompositeKey, LeafValue};

/// Dedup/ordering state for one array.
#[derive(Debug, Clone)]
pub struct ArrayBucket {
    dedupe: bool,
    index: HashMap<CompositeKey, usize>,
    elements: Vec<NodeId>,
    sorted: Option<SortedView>,
}

#[derive(Debug, Clone)]
struct SortedView {
    chain: Vec<Comparator>,
    order: Vec<NodeId>,
}

impl ArrayBucket {
    /// With `dedupe` off every upsert appends a new element.
    pub fn new(dedupe: bool) -> Self {
        Self {
            dedupe,
            index: HashMap::new(),
            elements: Vec::new(),
            sorted: None,
        }
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Elements in insertion order.
    pub fn elements(&self) -> &[NodeId] {
        &self.elements
    }

    pub fn get(&self, key: &CompositeKey) -> Option<NodeId> {
        self.index.get(key).map(|&pos| self.elements[pos])
    }

    /// Find or create the element for `key` and write `incoming` into it.
    ///
    /// A new element comes from `new_element` and receives the values as is.
    /// An existing element combines them under `policy`. Returns the element
    /// and whether it was created.
    pub fn upsert<F>(
        &mut self,
        tree: &mut Tree,
        key: CompositeKey,
        new_element: F,
        incoming: Fragment,
        policy: ConflictPolicy,
        scope: Scope<'_>,
    ) -> BuildResult<(NodeId, bool)>
    where
        F: FnOnce(&mut Tree) -> NodeId,
    {
        let existing = if self.dedupe { self.get(&key) } else { None };

        let (element, inserted) = match existing {
            Some(element) => (element, false),
            None => {
                let element = new_element(tree);
                if self.dedupe {
                    self.index.insert(key, self.elements.len());
                }
                self.elements.push(element);
                self.sorted = None;
                (element, true)
            }
        };

        conflict::apply(tree, element, incoming, policy, scope)?;
        Ok((element, inserted))
    }

    /// Elements sorted by `chain`, ties kept in insertion order.
    ///
    /// The result is cached for this exact chain until the next insert.
    pub fn ordered(&mut self, tree: &Tree, chain: &[Comparator]) -> &[NodeId] {
        if !self.is_cached(chain) {
            let mut order = self.elements.clone();
            if !chain.is_empty() {
                order.sort_by(|a, b| compare_elements(tree, *a, *b, chain));
            }
            self.sorted = Some(SortedView {
                chain: chain.to_vec(),
                order,
            });
        }
        match &self.sorted {
            Some(view) => &view.order,
            None => &self.elements,
        }
    }

    /// Whether a sorted view for `chain` is cached.
    pub fn is_cached(&self, chain: &[Comparator]) -> bool {
        self.sorted
            .as_ref()
            .is_some_and(|view| view.chain.as_slice() == chain)
    }
}

/// All array buckets of one document build.
#[derive(Debug, Default)]
pub struct GroupingEngine {
    buckets: HashMap<NodeId, ArrayBucket>,
}

impl GroupingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bucket for `array`, created on first use.
    pub fn bucket(&mut self, array: NodeId, dedupe: bool) -> &mut ArrayBucket {
        self.buckets
            .entry(array)
            .or_insert_with(|| ArrayBucket::new(dedupe))
    }

    pub fn get(&self, array: NodeId) -> Option<&ArrayBucket> {
        self.buckets.get(&array)
    }

    pub fn get_mut(&mut self, array: NodeId) -> Option<&mut ArrayBucket> {
        self.buckets.get_mut(&array)
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}

/// Compare two elements by a comparator chain.
pub fn compare_elements(tree: &Tree, a: NodeId, b: NodeId, chain: &[Comparator]) -> Ordering {
    for comparator in chain {
        let left = sort_value(tree, a, comparator);
        let right = sort_value(tree, b, comparator);
        let ordering = compare_nullable(left, right, comparator);
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

fn sort_value<'t>(tree: &'t Tree, element: NodeId, comparator: &Comparator) -> Option<&'t LeafValue> {
    tree.lookup(element, &comparator.segments)
        .filter(|value| !value.is_null())
}

/// Null placement is absolute; direction only flips non-null comparisons.
fn compare_nullable(left: Option<&LeafValue>, right: Option<&LeafValue>, comparator: &Comparator) -> Ordering {
    match (left, right) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => match comparator.nulls {
            NullPlacement::First => Ordering::Less,
            NullPlacement::Last => Ordering::Greater,
        },
        (Some(_), None) => match comparator.nulls {
            NullPlacement::First => Ordering::Greater,
            NullPlacement::Last => Ordering::Less,
        },
        (Some(l), Some(r)) => {
            let ordering = compare_values(l, r);
            match comparator.direction {
                Direction::Asc => ordering,
                Direction::Desc => ordering.reverse(),
            }
        }
    }
}

/// Numeric when both sides are numeric, lexicographic when neither is.
/// Numeric values sort before text.
pub fn compare_values(left: &LeafValue, right: &LeafValue) -> Ordering {
    match (left.as_numeric(), right.as_numeric()) {
        (Some(l), Some(r)) => l.compare(r),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => left.sort_text().cmp(&right.sort_text()),
    }
}
