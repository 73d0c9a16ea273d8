mod file;
mod streaming;

pub use file::{FileExporter, FileExporterConfig};
pub use streaming::{BackoffConfig, StreamTransport, StreamingExporter, StreamingExporterConfig};

use flarego_model::Snapshot;

use crate::error::ExportError;

/// Capability set shared by every exporter (§4.4): serialize and deliver one
/// snapshot, and release any held resources on shutdown.
#[async_trait::async_trait]
pub trait Exporter: Send + Sync {
    /// Short identifier used in collector error context; not part of the
    /// wire format.
    fn name(&self) -> &'static str;

    async fn export(&self, snapshot: &Snapshot) -> Result<(), ExportError>;

    async fn close(&self);
}
