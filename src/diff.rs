//! Structural diff between two snapshots.
//!
//! [`diff`] produces a keyed tree of [`DiffNode`]s. Recursion only descends
//! into key/value objects on both sides; arrays and scalars are compared as
//! whole values.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::snapshot::Snapshot;

/// Classification of a single key in a diff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffKind {
    /// Key exists in the current value only.
    Added,
    /// Key exists in the previous value only.
    Removed,
    /// Key exists in both and the values differ.
    Changed,
    /// Key exists in both and the values are equal.
    Unchanged,
}

impl DiffKind {
    /// Gutter marker used by [`render`].
    #[must_use]
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Added => "+ ",
            Self::Removed => "- ",
            Self::Changed => "~ ",
            Self::Unchanged => "  ",
        }
    }
}

/// Diff of one key. `children` is set only when both sides are objects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffNode {
    /// How the key changed.
    #[serde(rename = "type")]
    pub kind: DiffKind,
    /// Value before; absent for added keys.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prev_value: Option<Value>,
    /// Value after; absent for removed keys.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_value: Option<Value>,
    /// Per-key diff of nested objects.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<SnapshotDiff>,
}

impl DiffNode {
    fn added(next: &Value) -> Self {
        Self {
            kind: DiffKind::Added,
            prev_value: None,
            next_value: Some(next.clone()),
            children: None,
        }
    }

    fn removed(prev: &Value) -> Self {
        Self {
            kind: DiffKind::Removed,
            prev_value: Some(prev.clone()),
            next_value: None,
            children: None,
        }
    }

    fn compared(
        kind: DiffKind,
        prev: &Value,
        next: &Value,
        children: Option<SnapshotDiff>,
    ) -> Self {
        Self {
            kind,
            prev_value: Some(prev.clone()),
            next_value: Some(next.clone()),
            children,
        }
    }

    /// True for `unchanged` nodes.
    #[must_use]
    pub fn is_unchanged(&self) -> bool {
        self.kind == DiffKind::Unchanged
    }
}

/// Key to [`DiffNode`] mapping, ordered by key.
pub type SnapshotDiff = BTreeMap<String, DiffNode>;

/// Computes the per-key delta from `prev` to `curr`.
///
/// Inputs that are not key/value objects (null, arrays, scalars) contribute no
/// keys, so diffing against `null` behaves like diffing against `{}`. Never
/// panics.
#[must_use]
pub fn diff(prev: &Value, curr: &Value) -> SnapshotDiff {
    let empty = Map::new();
    let prev_obj = prev.as_object().unwrap_or(&empty);
    let curr_obj = curr.as_object().unwrap_or(&empty);

    let mut result = SnapshotDiff::new();

    for (key, prev_val) in prev_obj {
        let node = match curr_obj.get(key) {
            None => DiffNode::removed(prev_val),
            Some(curr_val) => diff_values(prev_val, curr_val),
        };
        result.insert(key.clone(), node);
    }
    for (key, curr_val) in curr_obj {
        if !prev_obj.contains_key(key) {
            result.insert(key.clone(), DiffNode::added(curr_val));
        }
    }

    result
}

/// Diffs two snapshots; shorthand for [`diff`] on their payloads.
#[must_use]
pub fn diff_snapshots(prev: &Snapshot, curr: &Snapshot) -> SnapshotDiff {
    diff(prev.value(), curr.value())
}

fn diff_values(prev: &Value, curr: &Value) -> DiffNode {
    if prev.is_object() && curr.is_object() {
        let children = diff(prev, curr);
        let kind = if has_changes(&children) {
            DiffKind::Changed
        } else {
            DiffKind::Unchanged
        };
        return DiffNode::compared(kind, prev, curr, Some(children));
    }
    let kind = if canonical_eq(prev, curr) {
        DiffKind::Unchanged
    } else {
        DiffKind::Changed
    };
    DiffNode::compared(kind, prev, curr, None)
}

/// Structural equality with JSON number semantics: `1` and `1.0` are the
/// same number. Object key order is ignored; array order is not.
fn canonical_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x == y || x.as_f64() == y.as_f64(),
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| canonical_eq(x, y))
        }
        (Value::Object(xs), Value::Object(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(key, x)| ys.get(key).is_some_and(|y| canonical_eq(x, y)))
        }
        _ => a == b,
    }
}

/// True when any node in the diff is not `unchanged`.
#[must_use]
pub fn has_changes(diff: &SnapshotDiff) -> bool {
    diff.values().any(|node| !node.is_unchanged())
}

/// Renders a diff as indented text, one key per line.
#[must_use]
pub fn render(diff: &SnapshotDiff) -> String {
    let mut lines = Vec::new();
    render_nodes(diff, 0, &mut lines);
    lines.join("\n")
}

/// Renders the diff view for `curr` against the snapshot before it.
#[must_use]
pub fn render_against(prev: Option<&Snapshot>, curr: &Snapshot) -> String {
    let Some(prev) = prev else {
        return "First snapshot, no previous state to compare.".to_string();
    };
    let nodes = diff_snapshots(prev, curr);
    let body = render(&nodes);
    if has_changes(&nodes) {
        body
    } else if body.is_empty() {
        "No changes from previous snapshot.".to_string()
    } else {
        format!("No changes from previous snapshot.\n{body}")
    }
}

fn render_nodes(nodes: &SnapshotDiff, depth: usize, lines: &mut Vec<String>) {
    let pad = "  ".repeat(depth);
    for (key, node) in nodes {
        let prefix = node.kind.prefix();
        if let Some(children) = &node.children {
            lines.push(format!("{pad}{prefix}{key}: {{"));
            render_nodes(children, depth + 1, lines);
            lines.push(format!("{pad}  }}"));
            continue;
        }
        let shown = match node.kind {
            DiffKind::Changed => format!(
                "{} -> {}",
                format_value(node.prev_value.as_ref()),
                format_value(node.next_value.as_ref())
            ),
            DiffKind::Removed => format_value(node.prev_value.as_ref()),
            DiffKind::Added | DiffKind::Unchanged => format_value(node.next_value.as_ref()),
        };
        lines.push(format!("{pad}{prefix}{key}: {shown}"));
    }
}

fn format_value(value: Option<&Value>) -> String {
    value.map_or_else(|| "undefined".to_string(), ToString::to_string)
}
