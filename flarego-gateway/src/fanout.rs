use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::subscriber::SubscriberHandle;

/// Fans out ingress chunks to every live subscriber queue using
/// non-blocking enqueue; a full queue drops the chunk for that subscriber
/// only. A soft cap on concurrent subscribers returns
/// `None` from `register`, which callers turn into an immediately-closed
/// handle.
pub struct FanOut {
    subscribers: DashMap<Uuid, mpsc::Sender<Vec<u8>>>,
    max_subscribers: usize,
    queue_depth: usize,
    slow_consumer_drops: AtomicU64,
}

impl FanOut {
    pub fn new(max_subscribers: usize, queue_depth: usize) -> Self {
        Self {
            subscribers: DashMap::new(),
            max_subscribers,
            queue_depth,
            slow_consumer_drops: AtomicU64::new(0),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    pub fn slow_consumer_drops(&self) -> u64 {
        self.slow_consumer_drops.load(Ordering::Relaxed)
    }

    /// `None` when the soft cap on concurrent subscribers is reached.
    pub fn register(&self) -> Option<SubscriberHandle> {
        if self.subscribers.len() >= self.max_subscribers {
            return None;
        }
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::channel(self.queue_depth);
        self.subscribers.insert(id, tx);
        Some(SubscriberHandle { id, receiver: rx })
    }

    /// Idempotent.
    pub fn unregister(&self, id: Uuid) {
        self.subscribers.remove(&id);
    }

    /// Delivers `bytes` to every live subscriber in the same call, so a
    /// single chunk is observed by all non-dropping subscribers in the
    /// same relative order.
    pub fn broadcast(&self, bytes: &[u8]) {
        let mut disconnected = Vec::new();
        for entry in self.subscribers.iter() {
            match entry.value().try_send(bytes.to_vec()) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    self.slow_consumer_drops.fetch_add(1, Ordering::Relaxed);
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    disconnected.push(*entry.key());
                }
            }
        }
        for id in disconnected {
            self.subscribers.remove(&id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn full_queue_drops_only_for_the_slow_subscriber() {
        let fanout = FanOut::new(10, 1);
        let mut fast = fanout.register().unwrap();
        let mut slow = fanout.register().unwrap();

        fanout.broadcast(b"a");
        // Don't drain `slow` yet so its queue of depth 1 is full.
        fanout.broadcast(b"b");

        assert_eq!(fanout.slow_consumer_drops(), 1);
        assert_eq!(fast.receiver.recv().await.unwrap(), b"a");
        assert_eq!(fast.receiver.recv().await.unwrap(), b"b");
        assert_eq!(slow.receiver.recv().await.unwrap(), b"a");
    }

    #[test]
    fn register_returns_none_past_the_soft_cap() {
        let fanout = FanOut::new(1, 4);
        let _first = fanout.register().unwrap();
        assert!(fanout.register().is_none());
    }

    #[tokio::test]
    async fn unregister_is_idempotent() {
        let fanout = FanOut::new(10, 4);
        let handle = fanout.register().unwrap();
        fanout.unregister(handle.id);
        fanout.unregister(handle.id);
        assert_eq!(fanout.subscriber_count(), 0);
    }
}
