//! Path addressing over a JSON document tree.
//!
//! The store never keeps `null` leaves or empty objects: writing either one
//! removes the node, and parents left empty by a removal are pruned.

use crate::core::StorePath;
use serde_json::{Map, Value};

pub fn get_at<'a>(root: &'a Value, path: &StorePath) -> Option<&'a Value> {
    let mut node = root;
    for segment in path.segments() {
        node = node.as_object()?.get(segment)?;
    }
    Some(node)
}

/// Replace the node at `path`, creating intermediate objects as needed.
pub fn set_at(root: &mut Value, path: &StorePath, value: Value) {
    let value = prune(value);
    if value.is_null() {
        remove_at(root, path);
        return;
    }

    let Some((leaf, parents)) = path.segments().split_last() else {
        *root = value;
        return;
    };

    let mut node = root;
    for segment in parents {
        node = ensure_object(node)
            .entry(segment.clone())
            .or_insert_with(|| Value::Object(Map::new()));
    }
    ensure_object(node).insert(leaf.clone(), value);
}

/// Remove the node at `path`. Returns whether anything was removed.
pub fn remove_at(root: &mut Value, path: &StorePath) -> bool {
    if path.is_root() {
        let existed = !root.is_null();
        *root = Value::Object(Map::new());
        return existed;
    }
    remove_in(root, path.segments())
}

fn remove_in(node: &mut Value, segments: &[String]) -> bool {
    let Some(map) = node.as_object_mut() else {
        return false;
    };
    match segments {
        [] => false,
        [leaf] => map.remove(leaf).is_some(),
        [head, rest @ ..] => {
            let Some(child) = map.get_mut(head) else {
                return false;
            };
            let removed = remove_in(child, rest);
            if removed && child.as_object().is_some_and(Map::is_empty) {
                map.remove(head);
            }
            removed
        }
    }
}

/// Drop `null` members and empty objects recursively.
pub fn prune(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let pruned: Map<String, Value> = map
                .into_iter()
                .map(|(k, v)| (k, prune(v)))
                .filter(|(_, v)| !v.is_null())
                .collect();
            if pruned.is_empty() {
                Value::Null
            } else {
                Value::Object(pruned)
            }
        }
        other => other,
    }
}

fn ensure_object(node: &mut Value) -> &mut Map<String, Value> {
    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    match node {
        Value::Object(map) => map,
        _ => unreachable!("node was just replaced with an object"),
    }
}
