//! FlareGo gateway entrypoint: loads config, wires auth/retention/fan-out/
//! alerting, and serves the ingress and subscribe WebSocket routes.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use flarego_alert::{Rule, RuleEngine};
use flarego_config::Config;
use flarego_gateway::{AlertRuntime, AuthMode, FanOut, GatewayState, InMemoryRetention};
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser, Debug)]
#[command(name = "flarego-gateway")]
#[command(about = "Authenticated ingress, retention, fan-out, and alert gateway for FlareGo")]
struct Args {
    /// Path to the gateway's TOML configuration file.
    #[arg(long, env = "FLAREGO_CONFIG", default_value = "flarego.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "flarego_gateway=info,flarego_alert=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let config = flarego_config::load(&args.config)?;
    info!(path = %args.config.display(), "configuration loaded");

    let state = build_state(&config)?;
    let app = flarego_gateway::router(state);

    match &config.gateway.tls {
        Some(tls) => {
            info!(addr = %config.gateway.listen_addr, "gateway listening (TLS)");
            let _ = rustls::crypto::ring::default_provider().install_default();
            let rustls_config = axum_server::tls_rustls::RustlsConfig::from_pem_file(&tls.cert, &tls.key)
                .await
                .context("failed to load TLS certificate/key")?;
            axum_server::bind_rustls(config.gateway.listen_addr, rustls_config)
                .serve(app.into_make_service())
                .await?;
        }
        None => {
            let listener = tokio::net::TcpListener::bind(config.gateway.listen_addr).await?;
            info!(addr = %config.gateway.listen_addr, "gateway listening");
            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await?;
        }
    }

    Ok(())
}

fn build_state(config: &Config) -> anyhow::Result<GatewayState> {
    let auth = match (&config.gateway.auth.hmac_secret, &config.gateway.auth.hmac_issuer) {
        (Some(secret), Some(issuer)) => AuthMode::Hmac {
            secret: secret.clone(),
            issuer: issuer.clone(),
        },
        _ => match &config.gateway.auth.static_token {
            Some(token) => AuthMode::Static(token.clone()),
            None => {
                warn!("no auth credentials configured, gateway ingress is open");
                AuthMode::Open
            }
        },
    };

    let retention = InMemoryRetention::new(config.gateway.retention_window, config.collector.hz as f64, 0.2);
    let fanout = FanOut::new(config.gateway.max_subscribers, 32);

    let rules = config
        .alert_rules
        .iter()
        .map(|rule| Rule::compile(rule.name.clone(), &rule.expr, rule.for_, rule.sinks.clone()))
        .collect::<Result<Vec<_>, _>>()?;
    info!(count = rules.len(), "alert rules compiled");
    let alerts = AlertRuntime::new(RuleEngine::new(rules));

    Ok(GatewayState {
        retention: Arc::new(retention),
        fanout: Arc::new(fanout),
        alerts: Arc::new(alerts),
        auth: Arc::new(auth),
    })
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    info!("shutdown signal received");
}
