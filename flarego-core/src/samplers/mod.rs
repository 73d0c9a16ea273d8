mod blocked;
mod gc;
mod heap;
mod stack;

pub use blocked::{BlockedSampler, BlockedSamplerConfig, BlockedSource};
pub use gc::{GcPoll, GcSampler, GcSamplerConfig, GcSource};
pub use heap::{HeapSampler, HeapSamplerConfig, HeapSource};
pub use stack::{StackSampler, StackSamplerConfig, StackSource};

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

#[derive(Error, Debug)]
pub enum SamplerError {
    #[error("sampler already started")]
    AlreadyStarted,
}

/// Every sampler shares this lifecycle: `start` launches one background
/// task; `stop` signals it and blocks until it drains. A stopped sampler is
/// terminal, and `start` may only ever succeed once per instance (§4.2,
/// §9 "restart is explicitly forbidden").
pub trait Sampler: Send + Sync {
    fn name(&self) -> &'static str;

    fn start(self: Arc<Self>) -> Result<SamplerHandle, SamplerError>;
}

/// Guards a sampler instance against being started more than once.
pub(crate) struct StartGuard(AtomicBool);

impl StartGuard {
    pub(crate) fn new() -> Self {
        Self(AtomicBool::new(false))
    }

    /// Returns `Ok(())` the first time it is called, `Err` on every
    /// subsequent call.
    pub(crate) fn begin(&self) -> Result<(), SamplerError> {
        self.0
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(|_| SamplerError::AlreadyStarted)
    }
}

/// A running sampler's background task and its cancellation signal.
pub struct SamplerHandle {
    token: CancellationToken,
    join: JoinHandle<()>,
}

impl SamplerHandle {
    pub(crate) fn new(token: CancellationToken, join: JoinHandle<()>) -> Self {
        Self { token, join }
    }

    /// Signal the background task to stop and block until it drains.
    pub async fn stop(self) {
        self.token.cancel();
        let _ = self.join.await;
    }
}

/// Clamp a requested sampling frequency into `[min, max]` Hz, per sampler
/// (§4.2).
pub(crate) fn clamp_hz(requested: u32, min: u32, max: u32) -> u32 {
    requested.clamp(min, max)
}

pub(crate) fn hz_to_period(hz: u32) -> Duration {
    Duration::from_secs_f64(1.0 / f64::from(hz.max(1)))
}

/// Trim a raw symbol's leading import-path components, leaving
/// `package.function` (§4.2, §9 "symbol resolution... trimming leading path
/// components").
pub(crate) fn trim_import_prefix(raw: &str) -> String {
    raw.rsplit('/').next().unwrap_or(raw).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_hz_respects_bounds() {
        assert_eq!(clamp_hz(5, 10, 200), 10);
        assert_eq!(clamp_hz(9999, 10, 200), 200);
        assert_eq!(clamp_hz(50, 10, 200), 50);
    }

    #[test]
    fn trim_import_prefix_keeps_last_segment() {
        assert_eq!(
            trim_import_prefix("github.com/flarego/agent.Collect"),
            "agent.Collect"
        );
        assert_eq!(trim_import_prefix("main.run"), "main.run");
    }

    #[test]
    fn start_guard_allows_exactly_one_start() {
        let guard = StartGuard::new();
        assert!(guard.begin().is_ok());
        assert!(matches!(guard.begin(), Err(SamplerError::AlreadyStarted)));
    }
}
