use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::{CoreError, Result};
use crate::exporter::Exporter;
use crate::samplers::{Sampler, SamplerError, SamplerHandle};
use crate::tree::Builder;

enum Phase {
    NotStarted { samplers: Vec<Arc<dyn Sampler>> },
    Running { handles: Vec<SamplerHandle> },
    Stopped,
}

/// Owns the sampling tree, every registered sampler and exporter, and the
/// periodic export loop. `start`/`stop` mirror the lifecycle vocabulary
/// [`crate::samplers::Sampler`] uses.
pub struct Collector {
    builder: Arc<Builder>,
    exporters: Mutex<Vec<Arc<dyn Exporter>>>,
    phase: Mutex<Phase>,
    export_every: Option<Duration>,
    export_token: CancellationToken,
    export_task: Mutex<Option<JoinHandle<()>>>,
}

impl Collector {
    pub fn new(builder: Arc<Builder>, export_every: Option<Duration>) -> Arc<Self> {
        Arc::new(Self {
            builder,
            exporters: Mutex::new(Vec::new()),
            phase: Mutex::new(Phase::NotStarted {
                samplers: Vec::new(),
            }),
            export_every,
            export_token: CancellationToken::new(),
            export_task: Mutex::new(None),
        })
    }

    pub fn builder(&self) -> &Arc<Builder> {
        &self.builder
    }

    /// Before `start`, registers for later. After `start`, starts
    /// immediately. After `stop`, a no-op.
    pub fn add_sampler(&self, sampler: Arc<dyn Sampler>) -> std::result::Result<(), SamplerError> {
        match &mut *self.phase.lock() {
            Phase::NotStarted { samplers } => {
                samplers.push(sampler);
                Ok(())
            }
            Phase::Running { handles } => {
                handles.push(sampler.start()?);
                Ok(())
            }
            Phase::Stopped => Ok(()),
        }
    }

    pub fn add_exporter(&self, exporter: Arc<dyn Exporter>) {
        self.exporters.lock().push(exporter);
    }

    /// Starts every registered sampler and, if `export_every` is set, the
    /// periodic export loop. Idempotent: a second call on an already
    /// running or stopped collector does nothing.
    pub fn start(self: &Arc<Self>) -> std::result::Result<(), SamplerError> {
        let samplers = {
            let mut phase = self.phase.lock();
            match std::mem::replace(&mut *phase, Phase::Stopped) {
                Phase::NotStarted { samplers } => samplers,
                other => {
                    *phase = other;
                    return Ok(());
                }
            }
        };

        let mut handles = Vec::with_capacity(samplers.len());
        for sampler in samplers {
            handles.push(sampler.start()?);
        }
        *self.phase.lock() = Phase::Running { handles };

        if let Some(period) = self.export_every {
            self.spawn_export_loop(period);
        }
        Ok(())
    }

    fn spawn_export_loop(self: &Arc<Self>, period: Duration) {
        let this = Arc::clone(self);
        let token = self.export_token.child_token();
        let join = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        // A single exporter failure aborts this tick's
                        // fan-out; the next tick starts fresh.
                        if let Err(err) = this.export_once().await {
                            tracing::error!(error = %err, "periodic export failed");
                        }
                    }
                }
            }
        });
        *self.export_task.lock() = Some(join);
    }

    /// Snapshot the tree and deliver it to every exporter in registration
    /// order. Stops at the first failure; exporters are not retried within
    /// one tick.
    pub async fn trigger_export(&self) -> Result<()> {
        self.export_once().await
    }

    async fn export_once(&self) -> Result<()> {
        let snapshot = self.builder.snapshot_and_reset();
        let exporters = self.exporters.lock().clone();
        for exporter in exporters {
            exporter
                .export(&snapshot)
                .await
                .map_err(|source| CoreError::Export {
                    exporter: exporter.name(),
                    source,
                })?;
        }
        Ok(())
    }

    /// Stops the export loop, waits for it to drain, stops every running
    /// sampler concurrently, then closes every registered exporter.
    /// Idempotent.
    pub async fn stop(&self) {
        let previous = std::mem::replace(&mut *self.phase.lock(), Phase::Stopped);
        self.export_token.cancel();
        if let Some(task) = self.export_task.lock().take() {
            let _ = task.await;
        }
        if let Phase::Running { handles } = previous {
            futures::future::join_all(handles.into_iter().map(|handle| handle.stop())).await;
        }

        let exporters = self.exporters.lock().clone();
        futures::future::join_all(exporters.iter().map(|exporter| exporter.close())).await;
    }
}
