use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use flarego_model::{Chunk, Snapshot};
use futures_util::{SinkExt, StreamExt};
use rand::Rng;
use tokio::sync::Mutex as AsyncMutex;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;

use crate::error::ExportError;

use super::Exporter;

/// Jittered exponential back-off schedule for reconnection (§4.4).
#[derive(Clone, Copy, Debug)]
pub struct BackoffConfig {
    pub initial: Duration,
    pub cap: Duration,
    /// Total wall-clock budget for one reconnection attempt before it is
    /// reported as a failure.
    pub budget: Duration,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial: Duration::from_millis(500),
            cap: Duration::from_secs(15),
            budget: Duration::from_secs(60),
        }
    }
}

/// The persistent duplex connection a [`StreamingExporter`] pushes frames
/// over. Abstracted so the reconnect/back-off logic is testable without a
/// live socket; [`WsStreamTransport`] is the production implementation.
#[async_trait::async_trait]
pub trait StreamTransport: Send + Sync {
    async fn connect(&self) -> Result<(), ExportError>;
    async fn send(&self, bytes: &[u8]) -> Result<(), ExportError>;
    async fn close(&self);
}

#[derive(Clone, Debug)]
pub struct StreamingExporterConfig {
    pub backoff: BackoffConfig,
    pub call_timeout: Duration,
}

impl Default for StreamingExporterConfig {
    fn default() -> Self {
        Self {
            backoff: BackoffConfig::default(),
            call_timeout: Duration::from_secs(5),
        }
    }
}

/// Holds a persistent authenticated stream to the gateway. A send failure
/// marks the connection dead; the next `export` call reconnects with
/// jittered exponential back-off before retrying. Stale frames are never
/// buffered across a reconnect — the caller is expected to keep offering
/// fresh snapshots (§4.4).
pub struct StreamingExporter<T: StreamTransport> {
    transport: T,
    config: StreamingExporterConfig,
    connected: AtomicBool,
    reconnect_guard: AsyncMutex<()>,
}

impl<T: StreamTransport> StreamingExporter<T> {
    pub fn new(transport: T, config: StreamingExporterConfig) -> Self {
        Self {
            transport,
            config,
            connected: AtomicBool::new(false),
            reconnect_guard: AsyncMutex::new(()),
        }
    }

    async fn ensure_connected(&self) -> Result<(), ExportError> {
        if self.connected.load(Ordering::Acquire) {
            return Ok(());
        }
        let _serialize = self.reconnect_guard.lock().await;
        if self.connected.load(Ordering::Acquire) {
            return Ok(());
        }
        self.reconnect_with_backoff().await
    }

    async fn reconnect_with_backoff(&self) -> Result<(), ExportError> {
        let started = Instant::now();
        let mut delay = self.config.backoff.initial;
        loop {
            match self.transport.connect().await {
                Ok(()) => {
                    self.connected.store(true, Ordering::Release);
                    return Ok(());
                }
                Err(err) => {
                    if started.elapsed() >= self.config.backoff.budget {
                        return Err(err);
                    }
                    let jitter = rand::thread_rng().gen_range(0.5..1.0);
                    let sleep_for = delay.mul_f64(jitter).min(self.config.backoff.cap);
                    tokio::time::sleep(sleep_for).await;
                    delay = (delay * 2).min(self.config.backoff.cap);
                }
            }
        }
    }
}

#[async_trait::async_trait]
impl<T: StreamTransport + 'static> Exporter for StreamingExporter<T> {
    fn name(&self) -> &'static str {
        "streaming"
    }

    async fn export(&self, snapshot: &Snapshot) -> Result<(), ExportError> {
        self.ensure_connected().await?;
        let chunk = Chunk::encode(snapshot)?;
        let send = self.transport.send(chunk.as_bytes());
        match tokio::time::timeout(self.config.call_timeout, send).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => {
                self.connected.store(false, Ordering::Release);
                Err(err)
            }
            Err(_) => {
                self.connected.store(false, Ordering::Release);
                Err(ExportError::Timeout)
            }
        }
    }

    async fn close(&self) {
        self.connected.store(false, Ordering::Release);
        self.transport.close().await;
    }
}

type WsSink = futures_util::stream::SplitSink<
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>,
    Message,
>;

/// Production [`StreamTransport`]: a client-streaming WebSocket connection
/// to the gateway's producer-ingress endpoint, the client-side counterpart
/// of the `ws`-feature axum server the gateway runs (§4.5, §6).
pub struct WsStreamTransport {
    url: String,
    bearer_token: Option<String>,
    sink: AsyncMutex<Option<WsSink>>,
}

impl WsStreamTransport {
    pub fn new(url: impl Into<String>, bearer_token: Option<String>) -> Self {
        Self {
            url: url.into(),
            bearer_token,
            sink: AsyncMutex::new(None),
        }
    }
}

#[async_trait::async_trait]
impl StreamTransport for WsStreamTransport {
    async fn connect(&self) -> Result<(), ExportError> {
        let mut request = self
            .url
            .clone()
            .into_client_request()
            .map_err(|e| ExportError::Transport(e.to_string()))?;
        if let Some(token) = &self.bearer_token {
            let value = format!("Bearer {token}")
                .parse()
                .map_err(|_| ExportError::Transport("invalid bearer token".into()))?;
            request.headers_mut().insert("authorization", value);
        }
        let (stream, _response) = tokio_tungstenite::connect_async(request)
            .await
            .map_err(|e| ExportError::Transport(e.to_string()))?;
        let (sink, _source) = stream.split();
        *self.sink.lock().await = Some(sink);
        Ok(())
    }

    async fn send(&self, bytes: &[u8]) -> Result<(), ExportError> {
        let mut guard = self.sink.lock().await;
        let sink = guard
            .as_mut()
            .ok_or_else(|| ExportError::Transport("not connected".into()))?;
        sink.send(Message::Binary(bytes.to_vec().into()))
            .await
            .map_err(|e| ExportError::Transport(e.to_string()))
    }

    async fn close(&self) {
        if let Some(mut sink) = self.sink.lock().await.take() {
            let _ = sink.close().await;
        }
    }
}
