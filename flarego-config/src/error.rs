use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigLoadError {
    #[error("configuration file missing: {path}")]
    MissingConfig { path: PathBuf },

    #[error("failed to build configuration from sources")]
    Build(#[from] config::ConfigError),
}

pub type Result<T> = std::result::Result<T, ConfigLoadError>;
