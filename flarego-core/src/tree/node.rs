use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use dashmap::DashMap;
use flarego_model::Frame;

/// A live, concurrently-mutable tree node.
///
/// `value` is an atomic so `add` never blocks on it; `children` is a
/// [`DashMap`] so concurrent writers descending through different child
/// names contend only at the shard level, not on the whole node (§4.1,
/// "fine-grained locking at the node boundary").
pub(crate) struct Node {
    pub(crate) name: String,
    value: AtomicI64,
    children: DashMap<String, Arc<Node>>,
}

impl Node {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: AtomicI64::new(0),
            children: DashMap::new(),
        }
    }

    pub(crate) fn add_value(&self, delta: i64) {
        self.value.fetch_add(delta, Ordering::Relaxed);
    }

    pub(crate) fn value(&self) -> i64 {
        self.value.load(Ordering::Relaxed)
    }

    /// Return the child named `name`, creating it if absent.
    pub(crate) fn child_or_insert(self: &Arc<Self>, name: &str) -> Arc<Node> {
        if let Some(existing) = self.children.get(name) {
            return Arc::clone(&existing);
        }
        Arc::clone(
            &self
                .children
                .entry(name.to_string())
                .or_insert_with(|| Arc::new(Node::new(name))),
        )
    }

    /// Deep-copy this node and its subtree into an immutable [`Frame`].
    /// Children are emitted in arbitrary order here; [`Frame::sort_children_by_value_desc`]
    /// imposes the deterministic ordering rule afterwards.
    pub(crate) fn to_frame(&self) -> Frame {
        let mut frame = Frame::new(self.name.clone(), self.value());
        for entry in self.children.iter() {
            frame
                .children
                .insert(entry.key().clone(), entry.value().to_frame());
        }
        frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn child_or_insert_is_idempotent() {
        let root = Arc::new(Node::new("root"));
        let a1 = root.child_or_insert("a");
        let a2 = root.child_or_insert("a");
        assert!(Arc::ptr_eq(&a1, &a2));
    }

    #[test]
    fn to_frame_copies_values() {
        let root = Arc::new(Node::new("root"));
        let child = root.child_or_insert("a");
        child.add_value(5);
        let frame = root.to_frame();
        assert_eq!(frame.children["a"].value, 5);
    }
}
