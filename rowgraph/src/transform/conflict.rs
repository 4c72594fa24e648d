//! Conflict policies: how a row's values land on an element that already exists.
//!
//! A row's fields for one element are first gathered into a [`Fragment`], a small
//! object tree keyed by relative path segments. [`apply`] then walks the fragment
//! against the element, asking the rule's [`ConflictPolicy`] what to do at each
//! field that is already present. Objects on both sides are always walked into, so
//! every policy decides per leaf.
//!
//! Containers that hold nested list arrays are never replaced: incoming objects
//! always descend into them, and an incoming scalar there is a path conflict.

use indexmap::IndexMap;

use super::tree::{NodeId, Slot, Tree};
use crate::config::ConflictPolicy;
use crate::error::{BuildError, BuildResult};
use crate::models::LeafValue;

/// Incoming value for one field.
#[derive(Debug, Clone, PartialEq)]
pub enum Incoming {
    Leaf(LeafValue),
    Object(Fragment),
}

/// Values one row contributes to one container.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fragment {
    fields: IndexMap<String, Incoming>,
}

impl Fragment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn get(&self, name: &str) -> Option<&Incoming> {
        self.fields.get(name)
    }

    /// Place `value` at `segments`, creating intermediate objects.
    ///
    /// Within one fragment the later write wins when a leaf and an object claim
    /// the same name.
    pub fn insert<S: AsRef<str>>(&mut self, segments: &[S], value: LeafValue) {
        let Some((first, rest)) = segments.split_first() else {
            return;
        };
        let name = first.as_ref();
        if rest.is_empty() {
            self.fields.insert(name.to_string(), Incoming::Leaf(value));
            return;
        }
        let entry = self
            .fields
            .entry(name.to_string())
            .or_insert_with(|| Incoming::Object(Fragment::new()));
        if matches!(entry, Incoming::Leaf(_)) {
            *entry = Incoming::Object(Fragment::new());
        }
        if let Incoming::Object(inner) = entry {
            inner.insert(rest, value);
        }
    }
}

/// What the existing value at a field looks like.
#[derive(Debug, Clone, Copy)]
pub enum Existing<'a> {
    Leaf(&'a LeafValue),
    Object,
}

/// A policy's decision for one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Keep,
    Replace,
    /// Merge the incoming object into the existing one
    Descend,
    Conflict,
}

impl ConflictPolicy {
    pub fn resolve(self, existing: Existing<'_>, incoming: &Incoming) -> Resolution {
        match self {
            ConflictPolicy::Error => resolve_error(existing, incoming),
            ConflictPolicy::FirstWriteWins => resolve_first_write(existing, incoming),
            ConflictPolicy::LastWriteWins => resolve_last_write(existing, incoming),
            ConflictPolicy::Merge => resolve_merge(existing, incoming),
        }
    }
}

fn resolve_error(existing: Existing<'_>, incoming: &Incoming) -> Resolution {
    match (existing, incoming) {
        (Existing::Object, Incoming::Object(_)) => Resolution::Descend,
        (Existing::Leaf(old), Incoming::Leaf(new)) => {
            if old.is_array() || new.is_array() {
                Resolution::Replace
            } else if new.is_null() || old == new {
                Resolution::Keep
            } else if old.is_null() {
                Resolution::Replace
            } else {
                Resolution::Conflict
            }
        }
        _ => Resolution::Replace,
    }
}

fn resolve_first_write(existing: Existing<'_>, incoming: &Incoming) -> Resolution {
    match (existing, incoming) {
        (Existing::Object, Incoming::Object(_)) => Resolution::Descend,
        (Existing::Leaf(old), Incoming::Leaf(new)) if old.is_null() && !new.is_null() => Resolution::Replace,
        (Existing::Leaf(old), Incoming::Object(_)) if old.is_null() => Resolution::Replace,
        _ => Resolution::Keep,
    }
}

fn resolve_last_write(existing: Existing<'_>, incoming: &Incoming) -> Resolution {
    match (existing, incoming) {
        (Existing::Object, Incoming::Object(_)) => Resolution::Descend,
        _ => Resolution::Replace,
    }
}

fn resolve_merge(existing: Existing<'_>, incoming: &Incoming) -> Resolution {
    match (existing, incoming) {
        (Existing::Object, Incoming::Object(_)) => Resolution::Descend,
        _ => Resolution::Replace,
    }
}

/// Where a fragment is being applied, for error messages.
#[derive(Debug, Clone, Copy)]
pub struct Scope<'a> {
    /// List path, empty for the document root
    pub list: &'a str,
    pub separator: &'a str,
}

impl Scope<'_> {
    fn field(&self, segments: &[String]) -> String {
        segments.join(self.separator)
    }

    fn absolute(&self, segments: &[String]) -> String {
        crate::path::join(self.list, &self.field(segments), self.separator)
    }
}

/// Combine `fragment` into container `target` under `policy`.
pub fn apply(
    tree: &mut Tree,
    target: NodeId,
    fragment: Fragment,
    policy: ConflictPolicy,
    scope: Scope<'_>,
) -> BuildResult<()> {
    let mut trail = Vec::new();
    apply_at(tree, target, fragment, policy, scope, &mut trail)
}

enum Current {
    Absent,
    Leaf(LeafValue),
    Object(NodeId),
    Array,
}

fn apply_at(
    tree: &mut Tree,
    target: NodeId,
    fragment: Fragment,
    policy: ConflictPolicy,
    scope: Scope<'_>,
    trail: &mut Vec<String>,
) -> BuildResult<()> {
    for (name, incoming) in fragment.fields {
        trail.push(name.clone());

        let current = match tree.slot(target, &name) {
            None => Current::Absent,
            Some(Slot::Leaf(value)) => Current::Leaf(value.clone()),
            Some(Slot::Node(id)) if tree.is_array(*id) => Current::Array,
            Some(Slot::Node(id)) => Current::Object(*id),
        };

        match current {
            Current::Absent => write(tree, target, name, incoming)?,
            Current::Array => {
                return Err(BuildError::PathConflict {
                    path: scope.absolute(trail),
                })
            }
            Current::Object(id) if tree.holds_lists(id) => match incoming {
                Incoming::Object(inner) => apply_at(tree, id, inner, policy, scope, trail)?,
                Incoming::Leaf(_) => {
                    return Err(BuildError::PathConflict {
                        path: scope.absolute(trail),
                    })
                }
            },
            Current::Object(id) => match policy.resolve(Existing::Object, &incoming) {
                Resolution::Keep => {}
                Resolution::Replace | Resolution::Conflict => write(tree, target, name, incoming)?,
                Resolution::Descend => match incoming {
                    Incoming::Object(inner) => apply_at(tree, id, inner, policy, scope, trail)?,
                    Incoming::Leaf(_) => write(tree, target, name, incoming)?,
                },
            },
            Current::Leaf(old) => match policy.resolve(Existing::Leaf(&old), &incoming) {
                Resolution::Keep => {}
                Resolution::Replace | Resolution::Descend => write(tree, target, name, incoming)?,
                Resolution::Conflict => {
                    let incoming = match incoming {
                        Incoming::Leaf(value) => value,
                        Incoming::Object(_) => LeafValue::Null,
                    };
                    return Err(BuildError::Conflict {
                        list: scope.list.to_string(),
                        field: scope.field(trail),
                        existing: old,
                        incoming,
                    });
                }
            },
        }

        trail.pop();
    }
    Ok(())
}

/// Overwrite field `name` of `target` with `incoming`.
fn write(tree: &mut Tree, target: NodeId, name: String, incoming: Incoming) -> BuildResult<()> {
    match incoming {
        Incoming::Leaf(value) => tree.set(target, name, Slot::Leaf(value)),
        Incoming::Object(inner) => {
            let child = tree.alloc_object();
            tree.set(target, name, Slot::Node(child));
            for (field, value) in inner.fields {
                write(tree, child, field, value)?;
            }
        }
    }
    Ok(())
}
