use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use flarego_alert::RuleEngine;
use flarego_model::{LABEL_BLOCKED, LABEL_GC, LABEL_HEAP, Snapshot};
use parking_lot::Mutex;

/// The single place the `name → f64` metric map is built and the single
/// evaluator run against it: once per retained chunk arrival, from the
/// chunk's top-level pseudo-label children plus a running GC-sample
/// counter.
pub struct AlertRuntime {
    engine: Mutex<RuleEngine>,
    gc_count: AtomicU64,
}

impl AlertRuntime {
    pub fn new(engine: RuleEngine) -> Self {
        Self {
            engine: Mutex::new(engine),
            gc_count: AtomicU64::new(0),
        }
    }

    /// Returns the names of rules that newly transitioned to firing on
    /// this chunk.
    pub fn on_chunk(&self, snapshot: &Snapshot) -> Vec<String> {
        let mut metrics = HashMap::new();
        if let Some(gc) = snapshot.root.children.get(LABEL_GC) {
            metrics.insert("gc_pause_ns".to_string(), gc.value as f64);
            self.gc_count.fetch_add(1, Ordering::Relaxed);
        }
        if let Some(heap) = snapshot.root.children.get(LABEL_HEAP) {
            metrics.insert("heap_bytes".to_string(), heap.value as f64);
        }
        if let Some(blocked) = snapshot.root.children.get(LABEL_BLOCKED) {
            metrics.insert("blocked_goroutines".to_string(), blocked.value as f64);
        }
        metrics.insert(
            "gc_count".to_string(),
            self.gc_count.load(Ordering::Relaxed) as f64,
        );

        self.engine
            .lock()
            .tick(&metrics, Instant::now())
            .into_iter()
            .map(str::to_string)
            .collect()
    }
}
