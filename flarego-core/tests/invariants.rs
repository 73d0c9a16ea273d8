//! Property tests for the builder/diff invariants: commutativity,
//! conservation, the diff laws, and the encode/decode round trip.
//! Scenario-level unit tests for the same invariants already live alongside
//! the code they exercise; these generalize them over random sample streams.

use std::sync::Arc;

use flarego_core::tree::Builder;
use flarego_model::{Chunk, Sample, Snapshot, diff};
use proptest::prelude::*;

const ALPHABET: [&str; 4] = ["a", "b", "c", "d"];

fn arb_sample() -> impl Strategy<Value = Sample> {
    (
        prop::collection::vec(prop::sample::select(&ALPHABET[..]), 0..4),
        -50i64..50,
    )
        .prop_map(|(stack, weight)| Sample::new(stack.into_iter().map(String::from).collect(), weight))
}

fn apply_all(builder: &Builder, samples: &[Sample]) {
    for sample in samples {
        builder.add(sample);
    }
}

proptest! {
    /// Invariant 1: commutativity — applying two disjoint sample batches in
    /// either order yields the same snapshot, node-wise on `value`.
    #[test]
    fn commutativity_holds_regardless_of_batch_order(
        first in prop::collection::vec(arb_sample(), 0..20),
        second in prop::collection::vec(arb_sample(), 0..20),
    ) {
        let forward = Builder::new("root");
        apply_all(&forward, &first);
        apply_all(&forward, &second);
        let forward_snap = forward.snapshot_and_reset();

        let backward = Builder::new("root");
        apply_all(&backward, &second);
        apply_all(&backward, &first);
        let backward_snap = backward.snapshot_and_reset();

        prop_assert_eq!(forward_snap.flatten(), backward_snap.flatten());
    }

    /// Invariant 2 (first-level form): every non-noop sample contributes its
    /// weight to exactly one of the root's immediate children, so their
    /// values sum to the total weight of non-noop samples applied.
    #[test]
    fn first_level_children_conserve_total_weight(samples in prop::collection::vec(arb_sample(), 0..30)) {
        let builder = Builder::new("root");
        apply_all(&builder, &samples);
        let snap = builder.snapshot_and_reset();

        let expected: i64 = samples.iter().filter(|s| !s.is_noop()).map(|s| s.weight).sum();
        let actual: i64 = snap.root.children.values().map(|f| f.value).sum();
        prop_assert_eq!(actual, expected);
    }

    /// Invariant 4: diff(a, a) is nil, diff(a, empty) == a, diff(empty, a) negates.
    #[test]
    fn diff_laws_hold(samples in prop::collection::vec(arb_sample(), 1..20)) {
        let builder = Builder::new("root");
        apply_all(&builder, &samples);
        let snap = builder.snapshot_and_reset();

        prop_assert!(diff(&snap, &snap).is_none());

        let empty = Snapshot::empty("root");
        if let Some(identity) = diff(&snap, &empty) {
            prop_assert_eq!(identity.flatten(), snap.flatten());
        } else {
            prop_assert!(snap.root.children.is_empty() && snap.root.value == 0);
        }

        if let Some(negated) = diff(&empty, &snap) {
            let snap_values: Vec<i64> = snap.flatten().into_iter().map(|(_, v)| v).collect();
            let negated_values: Vec<i64> = negated.flatten().into_iter().map(|(_, v)| v).collect();
            prop_assert_eq!(
                negated_values,
                snap_values.into_iter().map(|v| -v).collect::<Vec<_>>()
            );
        }
    }

    /// Invariant 5: decode(encode(s)) == s, structurally.
    #[test]
    fn encode_decode_round_trips(samples in prop::collection::vec(arb_sample(), 0..20)) {
        let builder = Builder::new("root");
        apply_all(&builder, &samples);
        let snap = builder.snapshot_and_reset();

        let chunk = Chunk::encode(&snap).unwrap();
        let decoded = chunk.decode().unwrap();
        prop_assert_eq!(decoded, snap);
    }
}

/// Invariant 3: snapshot atomicity — concurrent adds during a snapshot swap
/// are partitioned cleanly between the snapshot taken and the next one.
#[tokio::test]
async fn snapshot_atomicity_under_concurrent_writers() {
    let builder = Arc::new(Builder::new("root"));
    let mut writers = Vec::new();
    for i in 0..4u32 {
        let builder = Arc::clone(&builder);
        writers.push(tokio::task::spawn_blocking(move || {
            for _ in 0..500 {
                builder.add(&Sample::new(vec!["main".into(), format!("fn{i}")], 1));
            }
        }));
    }

    let mut total_before_join = 0i64;
    // Take an interleaved snapshot partway through; whatever it captures
    // must not reappear in the next one.
    tokio::task::yield_now().await;
    let first = builder.snapshot_and_reset();
    total_before_join += first.root.children.get("main").map(|f| f.value).unwrap_or(0);

    for writer in writers {
        writer.await.unwrap();
    }
    let second = builder.snapshot_and_reset();
    let total_after = second.root.children.get("main").map(|f| f.value).unwrap_or(0);

    assert_eq!(total_before_join + total_after, 4 * 500);
}
