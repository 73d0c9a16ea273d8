use std::io::Write;
use std::path::PathBuf;

use flarego_model::{Chunk, Snapshot};

use crate::error::ExportError;

use super::Exporter;

#[derive(Clone, Debug)]
pub struct FileExporterConfig {
    pub dir: PathBuf,
    pub prefix: String,
    pub gzip: bool,
    /// Call `sync_all` after every write. Costs latency, guarantees the
    /// frame is durable before `export` returns.
    pub sync: bool,
}

impl FileExporterConfig {
    pub fn new(dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            prefix: prefix.into(),
            gzip: false,
            sync: false,
        }
    }
}

/// Writes each snapshot to its own file under `dir`, named
/// `<prefix>-<unix-nanos>.json[.gz]`. Uses exclusive-create so an export
/// never silently overwrites a prior one (§4.4).
pub struct FileExporter {
    config: FileExporterConfig,
}

impl FileExporter {
    pub fn new(config: FileExporterConfig) -> Self {
        Self { config }
    }

    fn file_name(&self, nanos: u128) -> String {
        if self.config.gzip {
            format!("{}-{nanos}.json.gz", self.config.prefix)
        } else {
            format!("{}-{nanos}.json", self.config.prefix)
        }
    }

    fn write_blocking(
        dir: PathBuf,
        name: String,
        bytes: Vec<u8>,
        gzip: bool,
        sync: bool,
    ) -> Result<(), ExportError> {
        let path = dir.join(&name);
        let mut file = std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|err| match err.kind() {
                std::io::ErrorKind::AlreadyExists => {
                    ExportError::AlreadyExists(path.display().to_string())
                }
                _ => ExportError::Io(err),
            })?;

        if gzip {
            let mut encoder =
                flate2::write::GzEncoder::new(&mut file, flate2::Compression::default());
            encoder.write_all(&bytes)?;
            encoder.finish()?;
        } else {
            file.write_all(&bytes)?;
        }

        if sync {
            file.sync_all()?;
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl Exporter for FileExporter {
    fn name(&self) -> &'static str {
        "file"
    }

    async fn export(&self, snapshot: &Snapshot) -> Result<(), ExportError> {
        let chunk = Chunk::encode(snapshot)?;
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let name = self.file_name(nanos);
        let dir = self.config.dir.clone();
        let bytes = chunk.into_bytes();
        let gzip = self.config.gzip;
        let sync = self.config.sync;
        tokio::task::spawn_blocking(move || Self::write_blocking(dir, name, bytes, gzip, sync))
            .await
            .map_err(|err| ExportError::Transport(err.to_string()))?
    }

    async fn close(&self) {}
}
