use indexmap::IndexMap;

use crate::error::Result;
use crate::frame::Frame;

/// An immutable, ordering-stable deep copy of a builder's tree at a point in
/// time. Never mutated after creation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Snapshot {
    pub root: Frame,
}

impl Snapshot {
    pub fn new(root: Frame) -> Self {
        let mut root = root;
        root.sort_children_by_value_desc();
        Self { root }
    }

    /// The empty tree rooted at `name`, used as the `∅` operand of [`diff`].
    pub fn empty(name: impl Into<String>) -> Self {
        Self {
            root: Frame::new(name, 0),
        }
    }

    /// Flattened `(path, value)` pairs for every node, root→leaf joined by
    /// `;`, in the snapshot's stable traversal order. A convenience for
    /// exporters and tests, not part of the wire format.
    pub fn flatten(&self) -> Vec<(String, i64)> {
        let mut out = Vec::new();
        flatten_into(&self.root.name, &self.root, &mut out);
        out
    }
}

fn flatten_into(path: &str, frame: &Frame, out: &mut Vec<(String, i64)>) {
    out.push((path.to_string(), frame.value));
    for child in frame.children.values() {
        let child_path = format!("{path};{}", child.name);
        flatten_into(&child_path, child, out);
    }
}

/// Produce a tree whose every node's value is `head.value - base.value`,
/// recursing over the union of child names. A node with `value == 0` and no
/// retained children is pruned. Returns `None` when the entire subtree
/// collapses.
pub fn diff(head: &Snapshot, base: &Snapshot) -> Option<Snapshot> {
    diff_node(&head.root.name, Some(&head.root), Some(&base.root)).map(Snapshot::new)
}

fn diff_node(name: &str, head: Option<&Frame>, base: Option<&Frame>) -> Option<Frame> {
    let head_value = head.map(|f| f.value).unwrap_or(0);
    let base_value = base.map(|f| f.value).unwrap_or(0);
    let value = head_value - base_value;

    let mut children: IndexMap<String, Frame> = IndexMap::new();
    for child_name in union_child_names(head, base) {
        let head_child = head.and_then(|f| f.children.get(&child_name));
        let base_child = base.and_then(|f| f.children.get(&child_name));
        if let Some(diffed) = diff_node(&child_name, head_child, base_child) {
            children.insert(child_name, diffed);
        }
    }

    if value == 0 && children.is_empty() {
        None
    } else {
        Some(Frame {
            name: name.to_string(),
            value,
            children,
        })
    }
}

fn union_child_names(head: Option<&Frame>, base: Option<&Frame>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut names = Vec::new();
    for frame in [head, base].into_iter().flatten() {
        for name in frame.children.keys() {
            if seen.insert(name.clone()) {
                names.push(name.clone());
            }
        }
    }
    names
}

/// The serialized byte form of a [`Snapshot`] as delivered on the wire and
/// held in retention. Opaque to the gateway except for length.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Chunk(Vec<u8>);

impl Chunk {
    #[cfg(feature = "serde")]
    pub fn encode(snapshot: &Snapshot) -> Result<Self> {
        Ok(Self(serde_json::to_vec(&snapshot.root)?))
    }

    #[cfg(feature = "serde")]
    pub fn decode(&self) -> Result<Snapshot> {
        let root: Frame = serde_json::from_slice(&self.0)?;
        Ok(Snapshot::new(root))
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
