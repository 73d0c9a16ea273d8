//! Configuration models and a minimal file+env loader for the FlareGo
//! pipeline. Sourcing beyond one explicit path plus environment overlay is
//! out of scope.
#![allow(missing_docs)]

mod error;
mod loader;
mod models;

pub use error::{ConfigLoadError, Result};
pub use loader::load;
pub use models::{
    AlertRuleConfig, AuthConfigSource, BuilderConfig, CollectorConfig, Config, GatewayConfig,
    TlsPaths,
};
