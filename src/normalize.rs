//! Adapter from raw snapshot payloads to a uniform component tree.
//!
//! This is the only place that knows which payload shapes the instrumented
//! app sends. Tree display and change highlighting consume [`FiberNode`]s and
//! never look at raw payloads, so a new shape only needs a new
//! [`SnapshotShape`] variant here.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::diff;
use crate::snapshot::{Snapshot, TIMESTAMP_KEY};

/// Name of the node produced for null or non-object payloads.
pub const PLACEHOLDER_NAME: &str = "Snapshot";

/// Name of the root node produced for flat key/value payloads.
pub const FLAT_ROOT_NAME: &str = "App";

/// One component in the normalized tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FiberNode {
    /// Display name of the component.
    pub name: String,
    /// State entries, each a one-key object so per-key identity survives.
    pub state: Vec<Value>,
    /// Component props, when the payload carries them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub props: Option<Map<String, Value>>,
    /// Child components.
    pub children: Vec<FiberNode>,
}

impl FiberNode {
    fn leaf(name: impl Into<String>, state: Vec<Value>, props: Option<Map<String, Value>>) -> Self {
        Self {
            name: name.into(),
            state,
            props,
            children: Vec::new(),
        }
    }

    /// Node used when there is nothing to show.
    #[must_use]
    pub fn placeholder() -> Self {
        Self::leaf(PLACEHOLDER_NAME, Vec::new(), None)
    }
}

/// The payload shapes the instrumented app is known to send.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SnapshotShape<'a> {
    /// Serialized fiber tree: `{name, children[], state, props}`.
    Fiber(&'a Map<String, Value>),
    /// Debug panel shape: `{component, state, props}`.
    Panel {
        /// Component name.
        component: &'a str,
        /// Raw `state` field.
        state: Option<&'a Value>,
        /// Raw `props` field.
        props: Option<&'a Value>,
    },
    /// Flat key/value shape such as `{count, letter, timestamp}`.
    Flat(&'a Map<String, Value>),
    /// Null or non-object payload.
    Empty,
}

impl<'a> SnapshotShape<'a> {
    /// Classifies a payload; the first matching shape wins.
    #[must_use]
    pub fn classify(raw: &'a Value) -> Self {
        let Some(map) = raw.as_object() else {
            return Self::Empty;
        };
        let has_name = map.get("name").is_some_and(Value::is_string);
        let has_children = map.get("children").is_some_and(Value::is_array);
        if has_name && has_children {
            return Self::Fiber(map);
        }
        if let Some(component) = map.get("component").and_then(Value::as_str) {
            return Self::Panel {
                component,
                state: map.get("state"),
                props: map.get("props"),
            };
        }
        Self::Flat(map)
    }
}

/// Normalizes a raw payload into a non-empty list of root nodes.
#[must_use]
pub fn normalize(raw: &Value) -> Vec<FiberNode> {
    vec![normalize_one(raw)]
}

/// Normalizes a snapshot; shorthand for [`normalize`] on its payload.
#[must_use]
pub fn normalize_snapshot(snapshot: &Snapshot) -> Vec<FiberNode> {
    normalize(snapshot.value())
}

fn normalize_one(raw: &Value) -> FiberNode {
    match SnapshotShape::classify(raw) {
        SnapshotShape::Fiber(map) => fiber_node(map),
        SnapshotShape::Panel {
            component,
            state,
            props,
        } => FiberNode::leaf(
            component,
            state.map_or_else(Vec::new, state_entries),
            props.and_then(Value::as_object).cloned(),
        ),
        SnapshotShape::Flat(map) => {
            let state = map
                .iter()
                .filter(|(key, _)| key.as_str() != TIMESTAMP_KEY)
                .map(|(key, value)| single_entry(key, value))
                .collect();
            FiberNode::leaf(FLAT_ROOT_NAME, state, None)
        }
        SnapshotShape::Empty => FiberNode::placeholder(),
    }
}

fn fiber_node(map: &Map<String, Value>) -> FiberNode {
    let name = map
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or(PLACEHOLDER_NAME)
        .to_string();
    let state = match map.get("state") {
        Some(Value::Array(items)) => items.clone(),
        Some(Value::Null) | None => Vec::new(),
        Some(other) => vec![other.clone()],
    };
    let children = map
        .get("children")
        .and_then(Value::as_array)
        .map(|items| items.iter().map(fiber_child).collect())
        .unwrap_or_default();
    FiberNode {
        name,
        state,
        props: map.get("props").and_then(Value::as_object).cloned(),
        children,
    }
}

/// Children of a fiber tree are fiber nodes too; they are never matched
/// against the panel or flat shapes.
fn fiber_child(raw: &Value) -> FiberNode {
    raw.as_object().map_or_else(FiberNode::placeholder, fiber_node)
}

fn state_entries(state: &Value) -> Vec<Value> {
    state
        .as_object()
        .map(|map| {
            map.iter()
                .map(|(key, value)| single_entry(key, value))
                .collect()
        })
        .unwrap_or_default()
}

fn single_entry(key: &str, value: &Value) -> Value {
    let mut entry = Map::new();
    entry.insert(key.to_string(), value.clone());
    Value::Object(entry)
}

/// Names of nodes to highlight as changed between two snapshots.
///
/// Empty when either side is missing. Payloads without per-node identity
/// only mark the root of the current tree.
#[must_use]
pub fn changed_node_names(prev: Option<&Snapshot>, curr: Option<&Snapshot>) -> BTreeSet<String> {
    let mut changed = BTreeSet::new();
    let (Some(prev), Some(curr)) = (prev, curr) else {
        return changed;
    };
    if prev.value().is_null() || curr.value().is_null() {
        return changed;
    }
    if diff::has_changes(&diff::diff_snapshots(prev, curr)) {
        changed.insert(normalize_one(curr.value()).name);
    }
    changed
}

/// Renders a tree as indented text, marking changed nodes with `*`.
#[must_use]
pub fn render_tree(nodes: &[FiberNode], changed: &BTreeSet<String>) -> String {
    let mut lines = Vec::new();
    for node in nodes {
        render_node(node, 0, changed, &mut lines);
    }
    lines.join("\n")
}

fn render_node(
    node: &FiberNode,
    depth: usize,
    changed: &BTreeSet<String>,
    lines: &mut Vec<String>,
) {
    let pad = "  ".repeat(depth);
    let marker = if changed.contains(&node.name) {
        " *"
    } else {
        ""
    };
    lines.push(format!("{pad}{}{marker}", node.name));
    for entry in &node.state {
        match entry.as_object() {
            Some(map) => {
                for (key, value) in map {
                    lines.push(format!("{pad}  . {key}: {value}"));
                }
            }
            None => lines.push(format!("{pad}  . {entry}")),
        }
    }
    for child in &node.children {
        render_node(child, depth + 1, changed, lines);
    }
}
