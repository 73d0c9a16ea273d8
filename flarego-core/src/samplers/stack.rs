use std::sync::Arc;

use flarego_model::Sample;
use tokio_util::sync::CancellationToken;

use crate::tree::Builder;

use super::{Sampler, SamplerError, SamplerHandle, StartGuard, clamp_hz, hz_to_period, trim_import_prefix};

/// Decouples the stack sampler from how a concrete host runtime exposes
/// live call stacks. Production wiring of a real source (walking native
/// thread stacks, an async-task registry, etc.) is an external
/// collaborator concern; tests supply a deterministic double.
pub trait StackSource: Send + Sync {
    /// One raw stack per live execution context. Frames are returned
    /// leaf→root, the order most unwinders naturally produce; the sampler
    /// reverses them to root→leaf before emitting a [`Sample`].
    fn sample_raw_stacks(&self) -> Vec<Vec<String>>;
}

#[derive(Clone, Debug)]
pub struct StackSamplerConfig {
    pub hz: u32,
    /// Runtime wrapper frame names dropped from every stack before
    /// trimming and reversal (§4.2, §9 "both should be configurable, not
    /// hard-coded").
    pub deny_list: Vec<String>,
}

impl Default for StackSamplerConfig {
    fn default() -> Self {
        Self {
            hz: 100,
            deny_list: vec!["task::entry".into(), "runtime::main_entry".into()],
        }
    }
}

pub struct StackSampler<S: StackSource> {
    builder: Arc<Builder>,
    source: S,
    config: StackSamplerConfig,
    guard: StartGuard,
}

impl<S: StackSource + 'static> StackSampler<S> {
    pub fn new(builder: Arc<Builder>, source: S, config: StackSamplerConfig) -> Arc<Self> {
        let config = StackSamplerConfig {
            hz: clamp_hz(config.hz, 10, 200),
            ..config
        };
        Arc::new(Self {
            builder,
            source,
            config,
            guard: StartGuard::new(),
        })
    }

    fn process_raw(&self, raw: Vec<String>) -> Option<Sample> {
        let mut stack: Vec<String> = raw
            .into_iter()
            .filter(|frame| !self.config.deny_list.contains(frame))
            .map(|frame| trim_import_prefix(&frame))
            .collect();
        if stack.is_empty() {
            return None;
        }
        stack.reverse();
        Some(Sample::new(stack, 1))
    }

    fn tick(&self) {
        for raw in self.source.sample_raw_stacks() {
            if let Some(sample) = self.process_raw(raw) {
                self.builder.add(&sample);
            }
        }
    }
}

impl<S: StackSource + 'static> Sampler for StackSampler<S> {
    fn name(&self) -> &'static str {
        "stack"
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
