use std::sync::Arc;

use flarego_model::{Sample, Snapshot};
use parking_lot::RwLock;

use super::node::Node;

/// Owns the live flamegraph tree and exposes the aggregation and
/// snapshotting primitives described in §4.1.
///
/// The root pointer is the only shared mutable piece (§5): `add` reads it
/// once per call and descends through immutable `Arc<Node>` links;
/// `snapshot_and_reset` takes a brief exclusive lock only to swap the
/// pointer, then finishes the deep copy off that critical section.
pub struct Builder {
    root_name: String,
    root: RwLock<Arc<Node>>,
}

impl Builder {
    pub fn new(root_name: impl Into<String>) -> Self {
        let root_name = root_name.into();
        Self {
            root: RwLock::new(Arc::new(Node::new(root_name.clone()))),
            root_name,
        }
    }

    /// Merge `sample` into the live tree. A no-op for an empty stack or a
    /// zero weight. The root's own value is never mutated here.
    pub fn add(&self, sample: &Sample) {
        if sample.is_noop() {
            return;
        }
        let mut node = Arc::clone(&self.root.read());
        for name in &sample.stack {
            node = node.child_or_insert(name);
            node.add_value(sample.weight);
        }
    }

    /// Atomically swap the live root for a fresh, empty one, then deep-copy
    /// the old tree into an ordered [`Snapshot`]. No sample added after the
    /// swap can appear in the returned snapshot; none added before is lost.
    pub fn snapshot_and_reset(&self) -> Snapshot {
        let old_root = {
            let mut guard = self.root.write();
            std::mem::replace(&mut *guard, Arc::new(Node::new(self.root_name.clone())))
        };
        Snapshot::new(old_root.to_frame())
    }

    /// Discard the live tree without producing a snapshot.
    pub fn reset(&self) {
        let mut guard = self.root.write();
        *guard = Arc::new(Node::new(self.root_name.clone()));
    }

    /// Deep-copy the live tree into a [`Snapshot`] without resetting it.
    /// A read-only traversal helper for diagnostics and tests; not part of
    /// the collector's export path.
    pub fn peek(&self) -> Snapshot {
        Snapshot::new(self.root.read().to_frame())
    }

    pub fn root_name(&self) -> &str {
        &self.root_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_a_aggregation() {
        let builder = Builder::new("root");
        builder.add(&Sample::new(
            vec!["main".into(), "doWork".into(), "heavy".into()],
            100,
        ));
        builder.add(&Sample::new(
            vec!["main".into(), "doWork".into(), "light".into()],
            50,
        ));
        let snap = builder.snapshot_and_reset();

        let main = &snap.root.children["main"];
        assert_eq!(main.value, 150);
        let do_work = &main.children["doWork"];
        assert_eq!(do_work.value, 150);
        assert_eq!(do_work.children["heavy"].value, 100);
        assert_eq!(do_work.children["light"].value, 50);
    }

    #[test]
    fn scenario_b_negative_weight() {
        let builder = Builder::new("root");
        builder.add(&Sample::new(vec!["main".into()], 100));
        builder.add(&Sample::new(vec!["main".into()], -30));
        let snap = builder.snapshot_and_reset();
        assert_eq!(snap.root.children["main"].value, 70);
    }

    #[test]
    fn scenario_c_noop_inputs() {
        let builder = Builder::new("root");
        builder.add(&Sample::new(vec![], 5));
        builder.add(&Sample::new(vec!["x".into()], 0));
        let snap = builder.snapshot_and_reset();
        assert!(snap.root.children.is_empty());
    }

    #[test]
    fn snapshot_resets_the_live_tree() {
        let builder = Builder::new("root");
        builder.add(&Sample::new(vec!["main".into()], 10));
        let first = builder.snapshot_and_reset();
        assert_eq!(first.root.children["main"].value, 10);

        let second = builder.snapshot_and_reset();
        assert!(second.root.children.is_empty());
    }

    #[test]
    fn root_value_is_never_mutated_by_add() {
        let builder = Builder::new("root");
        builder.add(&Sample::new(vec!["main".into()], 10));
        let snap = builder.snapshot_and_reset();
        assert_eq!(snap.root.value, 0);
    }

    #[test]
    fn concurrent_adds_are_commutative() {
        use std::thread;

        let builder = Arc::new(Builder::new("root"));
        let mut handles = Vec::new();
        for i in 0..8u32 {
            let builder = Arc::clone(&builder);
            handles.push(thread::spawn(move || {
                for _ in 0..100 {
                    builder.add(&Sample::new(
                        vec!["main".into(), format!("fn{i}")],
                        1,
                    ));
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        let snap = builder.snapshot_and_reset();
        assert_eq!(snap.root.children["main"].value, 800);
        for i in 0..8u32 {
            assert_eq!(snap.root.children["main"].children[&format!("fn{i}")].value, 100);
        }
    }
}
