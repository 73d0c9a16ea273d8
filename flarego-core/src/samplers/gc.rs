use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use flarego_model::{LABEL_GC, Sample};
use tokio_util::sync::CancellationToken;

use crate::tree::Builder;

use super::{Sampler, SamplerError, SamplerHandle, StartGuard, clamp_hz, hz_to_period};

/// One poll of the runtime's GC counters: a monotonic cycle count and a
/// fixed-size ring of recent pause durations, indexed by
/// `cycle % pause_ring_capacity`.
pub struct GcPoll {
    pub num_gc: u64,
    pub pause_ring_capacity: usize,
}

/// Source of GC statistics. Production wiring is an external collaborator
/// concern; tests supply a deterministic double.
pub trait GcSource: Send + Sync {
    fn poll(&self) -> GcPoll;
    /// Pause duration, in nanoseconds, for the given completed cycle.
    /// Only valid for cycles still held in the ring
    /// (`cycle > num_gc - pause_ring_capacity`).
    fn pause_ns(&self, cycle: u64) -> i64;
}

#[derive(Clone, Copy, Debug)]
pub struct GcSamplerConfig {
    pub hz: u32,
}

impl Default for GcSamplerConfig {
    fn default() -> Self {
        Self { hz: 10 }
    }
}

pub struct GcSampler<S: GcSource> {
    builder: Arc<Builder>,
    source: S,
    config: GcSamplerConfig,
    last_num_gc: AtomicU64,
    guard: StartGuard,
}

impl<S: GcSource + 'static> GcSampler<S> {
    pub fn new(builder: Arc<Builder>, source: S, config: GcSamplerConfig) -> Arc<Self> {
        let config = GcSamplerConfig {
            hz: clamp_hz(config.hz, 1, 1000),
        };
        Arc::new(Self {
            builder,
            source,
            config,
            last_num_gc: AtomicU64::new(0),
            guard: StartGuard::new(),
        })
    }

    fn tick(&self) {
        let poll = self.source.poll();
        let last = self.last_num_gc.load(Ordering::Acquire);
        let delta = poll.num_gc.wrapping_sub(last);
        if delta == 0 {
            return;
        }
        // Cap at the ring's capacity: cycles older than that have already
        // been overwritten and can no longer be read (§4.2 "handles
        // counter wrap-around by modular iteration").
        let new_cycles = delta.min(poll.pause_ring_capacity as u64);
        for i in 0..new_cycles {
            let cycle = poll.num_gc - new_cycles + 1 + i;
            let pause_ns = self.source.pause_ns(cycle);
            self.builder.add(&Sample::pseudo(LABEL_GC, pause_ns));
        }
        self.last_num_gc.store(poll.num_gc, Ordering::Release);
    }
}

impl<S: GcSource + 'static> Sampler for GcSampler<S> {
    fn name(&self) -> &'static str {
        "gc"
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
