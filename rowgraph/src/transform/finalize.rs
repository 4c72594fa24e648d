//! Finalizer: turn a built tree into a plain JSON document.
//!
//! Objects are rendered in field insertion order. Every pending array is
//! replaced by its bucket's ordered element sequence under the owning rule's
//! comparator chain, and each element is rendered in turn.

use serde_json::{Map, Value};

use super::bucket::GroupingEngine;
use super::tree::{Node, NodeId, Slot, Tree};
use crate::config::Mapping;

/// Render the whole tree from its root.
pub fn finalize(tree: &Tree, engine: &mut GroupingEngine, mapping: &Mapping) -> Value {
    render(tree, engine, mapping, NodeId::ROOT)
}

fn render(tree: &Tree, engine: &mut GroupingEngine, mapping: &Mapping, id: NodeId) -> Value {
    match tree.node(id) {
        Node::Object(fields) => {
            let mut object = Map::with_capacity(fields.len());
            for (name, slot) in fields {
                let value = match slot {
                    Slot::Leaf(leaf) => Value::from(leaf.clone()),
                    Slot::Node(child) => render(tree, engine, mapping, *child),
                };
                object.insert(name.clone(), value);
            }
            Value::Object(object)
        }
        Node::Array { rule } => {
            let chain = &mapping.rule(*rule).comparators;
            let elements = match engine.get_mut(id) {
                Some(bucket) => bucket.ordered(tree, chain).to_vec(),
                None => Vec::new(),
            };
            Value::Array(
                elements
                    .into_iter()
                    .map(|element| render(tree, engine, mapping, element))
                    .collect(),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConflictPolicy, ListRule, MappingConfig, OrderSpec};
    use crate::models::{CompositeKey, LeafValue};
    use crate::transform::conflict::{Fragment, Scope};
    use serde_json::json;

    fn leaf(tree: &mut Tree, id: NodeId, name: &str, value: LeafValue) {
        tree.set(id, name, Slot::Leaf(value));
    }

    #[test]
    fn test_renders_objects_in_insertion_order() {
        let mapping = Mapping::new(MappingConfig::new()).unwrap();
        let mut tree = Tree::new();
        leaf(&mut tree, NodeId::ROOT, "z", LeafValue::Int(1));
        let meta = tree.alloc_object();
        tree.set(NodeId::ROOT, "meta", Slot::Node(meta));
        leaf(&mut tree, meta, "b", "y".into());
        leaf(&mut tree, meta, "a", "x".into());

        let doc = finalize(&tree, &mut GroupingEngine::new(), &mapping);
        assert_eq!(serde_json::to_string(&doc).unwrap(), r#"{"z":1,"meta":{"b":"y","a":"x"}}"#);
    }

    #[test]
    fn test_arrays_follow_rule_ordering() {
        let mapping = Mapping::new(
            MappingConfig::new().with_list(ListRule::new("items").with_keys(["id"]).order_by(OrderSpec::desc("id"))),
        )
        .unwrap();
        let mut tree = Tree::new();
        let mut engine = GroupingEngine::new();
        let array = tree.ensure_array(NodeId::ROOT, &["items"], 0, "items").unwrap();
        let scope = Scope { list: "items", separator: "/" };

        for id in [1, 3, 2] {
            let mut fragment = Fragment::new();
            fragment.insert(&["id"], LeafValue::Int(id));
            engine
                .bucket(array, true)
                .upsert(
                    &mut tree,
                    CompositeKey::new(vec![LeafValue::Int(id)]),
                    Tree::alloc_object,
                    fragment,
                    ConflictPolicy::Error,
                    scope,
                )
                .unwrap();
        }

        let doc = finalize(&tree, &mut engine, &mapping);
        assert_eq!(doc, json!({ "items": [{ "id": 3 }, { "id": 2 }, { "id": 1 }] }));
    }

    #[test]
    fn test_untouched_array_renders_empty() {
        let mapping = Mapping::new(MappingConfig::new().with_list(ListRule::new("items"))).unwrap();
        let mut tree = Tree::new();
        tree.ensure_array(NodeId::ROOT, &["items"], 0, "items").unwrap();

        let doc = finalize(&tree, &mut GroupingEngine::new(), &mapping);
        assert_eq!(doc, json!({ "items": [] }));
    }
}
