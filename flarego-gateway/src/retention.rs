use std::collections::VecDeque;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::errors::Result;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetainedChunk {
    pub bytes: Vec<u8>,
    pub timestamp: DateTime<Utc>,
}

/// A bounded history of recently-ingested chunks.
/// `read_all` always yields oldest→newest, detached copies.
#[async_trait::async_trait]
pub trait RetentionStore: Send + Sync {
    async fn write(&self, bytes: Vec<u8>) -> Result<()>;
    async fn read_all(&self) -> Result<Vec<RetainedChunk>>;
}

/// Ring buffer sized `ceil(retention_seconds * expected_write_rate)` plus
/// headroom. Purge is lazy: a write that would overwrite a slot rescans
/// once to drop anything already outside the window.
pub struct InMemoryRetention {
    window: Duration,
    capacity: usize,
    entries: Mutex<VecDeque<RetainedChunk>>,
}

impl InMemoryRetention {
    pub fn new(window: Duration, expected_write_rate_hz: f64, headroom: f64) -> Self {
        let estimated = window.as_secs_f64() * expected_write_rate_hz;
        let capacity = ((estimated * (1.0 + headroom)).ceil() as usize).max(1);
        Self {
            window,
            capacity,
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    fn purge_stale(entries: &mut VecDeque<RetainedChunk>, window: Duration, now: DateTime<Utc>) {
        while let Some(front) = entries.front() {
            let age = now.signed_duration_since(front.timestamp);
            if age.to_std().map(|a| a > window).unwrap_or(false) {
                entries.pop_front();
            } else {
                break;
            }
        }
    }
}

#[async_trait::async_trait]
impl RetentionStore for InMemoryRetention {
    async fn write(&self, bytes: Vec<u8>) -> Result<()> {
        let now = Utc::now();
        let mut entries = self.entries.lock();
        if entries.len() >= self.capacity {
            Self::purge_stale(&mut entries, self.window, now);
        }
        if entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(RetainedChunk {
            bytes,
            timestamp: now,
        });
        Ok(())
    }

    async fn read_all(&self) -> Result<Vec<RetainedChunk>> {
        Ok(self.entries.lock().iter().cloned().collect())
    }
}

/// The contract a distributed, TTL-backed retention backend must satisfy.
/// No concrete backend ships here; wiring one is an external collaborator
/// concern.
#[async_trait::async_trait]
pub trait SharedRetentionBackend: Send + Sync {
    async fn push_capped(&self, key: &str, bytes: Vec<u8>, ttl: Duration) -> Result<()>;
    /// Returns entries newest-first, as most distributed capped-list
    /// backends naturally store them.
    async fn read_newest_first(&self, key: &str) -> Result<Vec<Vec<u8>>>;
}

pub struct SharedRetention<B: SharedRetentionBackend> {
    backend: B,
    key: String,
    window: Duration,
}

impl<B: SharedRetentionBackend> SharedRetention<B> {
    pub fn new(backend: B, key: impl Into<String>, window: Duration) -> Self {
        Self {
            backend,
            key: key.into(),
            window,
        }
    }
}

#[async_trait::async_trait]
impl<B: SharedRetentionBackend> RetentionStore for SharedRetention<B> {
    async fn write(&self, bytes: Vec<u8>) -> Result<()> {
        self.backend.push_capped(&self.key, bytes, self.window).await
    }

    async fn read_all(&self) -> Result<Vec<RetainedChunk>> {
        let newest_first = self.backend.read_newest_first(&self.key).await?;
        let now = Utc::now();
        Ok(newest_first
            .into_iter()
            .rev()
            .map(|bytes| RetainedChunk {
                bytes,
                timestamp: now,
            })
            .collect())
    }
}
