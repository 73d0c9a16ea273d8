use std::sync::Arc;

use flarego_model::{LABEL_HEAP, Sample};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::tree::Builder;

use super::{Sampler, SamplerError, SamplerHandle, StartGuard, clamp_hz, hz_to_period};

/// Source of the runtime's current heap size, in bytes.
pub trait HeapSource: Send + Sync {
    fn heap_bytes(&self) -> i64;
}

#[derive(Clone, Copy, Debug)]
pub struct HeapSamplerConfig {
    pub hz: u32,
}

impl Default for HeapSamplerConfig {
    fn default() -> Self {
        Self { hz: 2 }
    }
}

pub struct HeapSampler<S: HeapSource> {
    builder: Arc<Builder>,
    source: S,
    config: HeapSamplerConfig,
    previous: Mutex<Option<i64>>,
    guard: StartGuard,
}

impl<S: HeapSource + 'static> HeapSampler<S> {
    pub fn new(builder: Arc<Builder>, source: S, config: HeapSamplerConfig) -> Arc<Self> {
        let config = HeapSamplerConfig {
            hz: clamp_hz(config.hz, 1, 4),
        };
        Arc::new(Self {
            builder,
            source,
            config,
            previous: Mutex::new(None),
            guard: StartGuard::new(),
        })
    }

    fn tick(&self) {
        let current = self.source.heap_bytes();
        let mut previous = self.previous.lock();
        let delta = match *previous {
            Some(prev) => current - prev,
            // First observation establishes the baseline; nothing to
            // compare a delta against yet.
            None => {
                *previous = Some(current);
                return;
            }
        };
        *previous = Some(current);
        drop(previous);

        if delta == 0 {
            return;
        }
        self.builder.add(&Sample::pseudo(LABEL_HEAP, delta));
    }
}

impl<S: HeapSource + 'static> Sampler for HeapSampler<S> {
    fn name(&self) -> &'static str {
        "heap"
    }

    fn start(self: Arc<Self>) -> Result<SamplerHandle, SamplerError> {
        self.guard.begin()?;
        let token = CancellationToken::new();
        let child = token.child_token();
        let this = Arc::clone(&self);
        let join = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(hz_to_period(this.config.hz));
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = child.cancelled() => break,
                    _ = ticker.tick() => this.tick(),
                }
            }
        });
        Ok(SamplerHandle::new(token, join))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI64, Ordering};

    struct FixedSource(AtomicI64);

    impl HeapSource for FixedSource {
        fn heap_bytes(&self) -> i64 {
            self.0.load(Ordering::Relaxed)
        }
    }

    #[test]
    fn first_tick_establishes_baseline_without_emitting() {
        let builder = Arc::new(Builder::new("root"));
        let source = FixedSource(AtomicI64::new(1000));
        let sampler = HeapSampler::new(builder.clone(), source, HeapSamplerConfig::default());
        sampler.tick();
        let snap = builder.snapshot_and_reset();
        assert!(snap.root.children.is_empty());
    }

    #[test]
    fn emits_signed_delta_on_subsequent_ticks() {
        let builder = Arc::new(Builder::new("root"));
        let source = FixedSource(AtomicI64::new(1000));
        let sampler = HeapSampler::new(builder.clone(), source, HeapSamplerConfig::default());
        sampler.tick();
        sampler.source.0.store(1500, Ordering::Relaxed);
        sampler.tick();
        sampler.source.0.store(1200, Ordering::Relaxed);
        sampler.tick();

        let snap = builder.snapshot_and_reset();
        assert_eq!(snap.root.children[LABEL_HEAP].value, 500 - 300);
    }

    #[test]
    fn zero_delta_is_skipped() {
        let builder = Arc::new(Builder::new("root"));
        let source = FixedSource(AtomicI64::new(1000));
        let sampler = HeapSampler::new(builder.clone(), source, HeapSamplerConfig::default());
        sampler.tick();
        sampler.tick();
        let snap = builder.snapshot_and_reset();
        assert!(snap.root.children.is_empty());
    }
}
