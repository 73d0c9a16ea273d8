//! Authenticated WebSocket ingress, retention, fan-out, and alert wiring for
//! the FlareGo gateway: the process that sits between samplers and viewers.
#![allow(missing_docs)]

pub mod alerts_runtime;
pub mod auth;
pub mod errors;
pub mod fanout;
pub mod ingress;
pub mod retention;
pub mod routes;
pub mod state;
pub mod subscriber;

pub use alerts_runtime::AlertRuntime;
pub use auth::AuthMode;
pub use errors::{GatewayError, Result};
pub use fanout::FanOut;
pub use retention::{InMemoryRetention, RetainedChunk, RetentionStore, SharedRetention, SharedRetentionBackend};
pub use routes::router;
pub use state::GatewayState;
pub use subscriber::SubscriberHandle;
