use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("sampler error: {0}")]
    Sampler(#[from] crate::samplers::SamplerError),

    #[error("exporter {exporter} failed: {source}")]
    Export {
        exporter: &'static str,
        #[source]
        source: ExportError,
    },
}

pub type Result<T> = std::result::Result<T, CoreError>;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] flarego_model::ModelError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("destination already exists: {0}")]
    AlreadyExists(String),

    #[error("export timed out")]
    Timeout,
}
