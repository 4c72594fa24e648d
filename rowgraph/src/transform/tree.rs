//! Arena-backed document tree.
//!
//! Containers live in a flat `Vec` and are addressed by [`NodeId`]. Array
//! containers are placeholders: their elements and ordering state live in the
//! grouping engine, keyed by the array's `NodeId`, until the finalizer
//! materializes them.

use indexmap::IndexMap;

use crate::error::{BuildError, BuildResult};
use crate::models::LeafValue;

/// Handle of a container node in a [`Tree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

impl NodeId {
    /// The document root, always an object.
    pub const ROOT: NodeId = NodeId(0);

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone)]
pub enum Node {
    Object(IndexMap<String, Slot>),
    /// Pending array for the list rule at this index
    Array { rule: usize },
}

/// A named field of an object.
#[derive(Debug, Clone, PartialEq)]
pub enum Slot {
    Leaf(LeafValue),
    Node(NodeId),
}

#[derive(Debug, Clone)]
pub struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    /// A tree holding only the empty root object.
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::Object(IndexMap::new())],
        }
    }

    pub fn alloc_object(&mut self) -> NodeId {
        self.alloc(Node::Object(IndexMap::new()))
    }

    pub fn alloc_array(&mut self, rule: usize) -> NodeId {
        self.alloc(Node::Array { rule })
    }

    fn alloc(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn object(&self, id: NodeId) -> Option<&IndexMap<String, Slot>> {
        match self.node(id) {
            Node::Object(fields) => Some(fields),
            Node::Array { .. } => None,
        }
    }

    pub fn object_mut(&mut self, id: NodeId) -> Option<&mut IndexMap<String, Slot>> {
        match &mut self.nodes[id.index()] {
            Node::Object(fields) => Some(fields),
            Node::Array { .. } => None,
        }
    }

    pub fn is_array(&self, id: NodeId) -> bool {
        matches!(self.node(id), Node::Array { .. })
    }

    /// Field slot `name` of object `id`.
    pub fn slot(&self, id: NodeId, name: &str) -> Option<&Slot> {
        self.object(id).and_then(|fields| fields.get(name))
    }

    /// Set field `name` of object `id`. No-op on arrays.
    pub fn set(&mut self, id: NodeId, name: impl Into<String>, slot: Slot) {
        if let Some(fields) = self.object_mut(id) {
            fields.insert(name.into(), slot);
        }
    }

    /// Leaf reached by following `segments` through objects from `id`.
    pub fn lookup<S: AsRef<str>>(&self, id: NodeId, segments: &[S]) -> Option<&LeafValue> {
        let (last, parents) = segments.split_last()?;
        let mut current = id;
        for segment in parents {
            match self.slot(current, segment.as_ref())? {
                Slot::Node(next) => current = *next,
                Slot::Leaf(_) => return None,
            }
        }
        match self.slot(current, last.as_ref())? {
            Slot::Leaf(value) => Some(value),
            Slot::Node(_) => None,
        }
    }

    /// Whether an array placeholder exists anywhere under `id`.
    ///
    /// Such objects are structural: they belong to the list hierarchy and may
    /// not be replaced wholesale by field values.
    pub fn holds_lists(&self, id: NodeId) -> bool {
        match self.node(id) {
            Node::Array { .. } => true,
            Node::Object(fields) => fields.values().any(|slot| match slot {
                Slot::Node(child) => self.holds_lists(*child),
                Slot::Leaf(_) => false,
            }),
        }
    }

    /// Resolve the array for `rule` at `segments` below `base`, creating it and
    /// any intermediate objects on first use.
    ///
    /// `label` names the list in errors.
    pub fn ensure_array<S: AsRef<str>>(
        &mut self,
        base: NodeId,
        segments: &[S],
        rule: usize,
        label: &str,
    ) -> BuildResult<NodeId> {
        let collision = || BuildError::PathConflict {
            path: label.to_string(),
        };
        let (last, parents) = segments.split_last().ok_or_else(collision)?;

        let mut current = base;
        for segment in parents {
            let segment = segment.as_ref();
            current = match self.slot(current, segment) {
                None => {
                    let child = self.alloc_object();
                    self.set(current, segment, Slot::Node(child));
                    child
                }
                Some(Slot::Node(child)) if !self.is_array(*child) => *child,
                Some(_) => return Err(collision()),
            };
        }

        match self.slot(current, last.as_ref()) {
            None => {
                let array = self.alloc_array(rule);
                self.set(current, last.as_ref(), Slot::Node(array));
                Ok(array)
            }
            Some(Slot::Node(existing)) => match self.node(*existing) {
                Node::Array { rule: owner } if *owner == rule => Ok(*existing),
                _ => Err(collision()),
            },
            Some(Slot::Leaf(_)) => Err(collision()),
        }
    }
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}
