use tokio::sync::mpsc;
use uuid::Uuid;

/// A live fan-out subscriber handle, returned on attach. Dropping it
/// unregisters nothing by itself — callers must call
/// [`crate::fanout::FanOut::unregister`] once their receive loop ends.
pub struct SubscriberHandle {
    pub id: Uuid,
    pub receiver: mpsc::Receiver<Vec<u8>>,
}
