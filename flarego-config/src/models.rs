use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// Top-level configuration surface for all four components.
#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    pub builder: BuilderConfig,
    #[serde(default)]
    pub collector: CollectorConfig,
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub alert_rules: Vec<AlertRuleConfig>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct BuilderConfig {
    pub root_name: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct CollectorConfig {
    #[serde(default = "default_hz")]
    pub hz: u32,
    /// Unset disables the periodic export loop.
    #[serde(default, with = "humantime_serde::option")]
    pub export_every: Option<Duration>,
}

fn default_hz() -> u32 {
    1000
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            hz: default_hz(),
            export_every: None,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct GatewayConfig {
    pub listen_addr: SocketAddr,
    #[serde(default = "default_retention_window", with = "humantime_serde")]
    pub retention_window: Duration,
    #[serde(default = "default_max_subscribers")]
    pub max_subscribers: usize,
    #[serde(default)]
    pub auth: AuthConfigSource,
    #[serde(default)]
    pub tls: Option<TlsPaths>,
}

fn default_retention_window() -> Duration {
    Duration::from_secs(15 * 60)
}

fn default_max_subscribers() -> usize {
    256
}

/// Resolves to an `AuthMode` at gateway startup: HMAC takes precedence over
/// static, which takes precedence over open.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct AuthConfigSource {
    pub static_token: Option<String>,
    pub hmac_secret: Option<String>,
    pub hmac_issuer: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct TlsPaths {
    pub cert: PathBuf,
    pub key: PathBuf,
}

#[derive(Clone, Debug, Deserialize)]
pub struct AlertRuleConfig {
    pub name: String,
    pub expr: String,
    #[serde(rename = "for", with = "humantime_serde")]
    pub for_: Duration,
    #[serde(default)]
    pub sinks: Vec<String>,
}
