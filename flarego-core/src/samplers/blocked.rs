use std::sync::Arc;

use flarego_model::{LABEL_BLOCKED, Sample};
use tokio_util::sync::CancellationToken;

use crate::tree::Builder;

use super::{Sampler, SamplerError, SamplerHandle, StartGuard, clamp_hz, hz_to_period};

/// Source of task counts used to approximate how many tasks are blocked.
/// This is explicitly a heuristic (§4.2, §9): `total - running`, floored at
/// zero. An implementation with a more accurate source may replace it, but
/// must still emit a non-negative value.
pub trait BlockedSource: Send + Sync {
    fn total_tasks(&self) -> u64;
    fn running_tasks(&self) -> u64;
}

#[derive(Clone, Copy, Debug)]
pub struct BlockedSamplerConfig {
    pub hz: u32,
}

impl Default for BlockedSamplerConfig {
    fn default() -> Self {
        Self { hz: 50 }
    }
}

pub struct BlockedSampler<S: BlockedSource> {
    builder: Arc<Builder>,
    source: S,
    config: BlockedSamplerConfig,
    guard: StartGuard,
}

impl<S: BlockedSource + 'static> BlockedSampler<S> {
    pub fn new(builder: Arc<Builder>, source: S, config: BlockedSamplerConfig) -> Arc<Self> {
        let config = BlockedSamplerConfig {
            hz: clamp_hz(config.hz, 5, 500),
        };
        Arc::new(Self {
            builder,
            source,
            config,
            guard: StartGuard::new(),
        })
    }

    fn tick(&self) {
        let total = self.source.total_tasks();
        let running = self.source.running_tasks();
        let blocked = total.saturating_sub(running);
        if blocked > 0 {
            self.builder
                .add(&Sample::pseudo(LABEL_BLOCKED, blocked as i64));
        }
    }
}

impl<S: BlockedSource + 'static> Sampler for BlockedSampler<S> {
    fn name(&self) -> &'static str {
        "blocked"
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

    struct FixedSource {
        total: u64,
        running: u64,
    }

    impl BlockedSource for FixedSource {
        fn total_tasks(&self) -> u64 {
            self.total
        }
        fn running_tasks(&self) -> u64 {
            self.running
        }
    }

    #[test]
    fn emits_positive_difference() {
        let builder = Arc::new(Builder::new("root"));
        let source = FixedSource { total: 12, running: 5 };
        let sampler = BlockedSampler::new(builder.clone(), source, BlockedSamplerConfig::default());
        sampler.tick();
        let snap = builder.snapshot_and_reset();
        assert_eq!(snap.root.children[LABEL_BLOCKED].value, 7);
    }

    #[test]
    fn floors_at_zero_when_running_exceeds_total() {
        let builder = Arc::new(Builder::new("root"));
        let source = FixedSource { total: 3, running: 5 };
        let sampler = BlockedSampler::new(builder.clone(), source, BlockedSamplerConfig::default());
        sampler.tick();
        let snap = builder.snapshot_and_reset();
        assert!(snap.root.children.is_empty());
    }
}
