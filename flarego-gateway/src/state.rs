use std::sync::Arc;

use crate::alerts_runtime::AlertRuntime;
use crate::auth::AuthMode;
use crate::fanout::FanOut;
use crate::retention::RetentionStore;

/// Shared application state handed to every axum handler.
#[derive(Clone)]
pub struct GatewayState {
    pub retention: Arc<dyn RetentionStore>,
    pub fanout: Arc<FanOut>,
    pub alerts: Arc<AlertRuntime>,
    pub auth: Arc<AuthMode>,
}
