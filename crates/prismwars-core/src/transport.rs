// WebSocket client transport.
//
// `run` owns the socket. It forwards inbound text frames as
// `TransportEvent::Message`, writes outbound frames handed to it through
// `TransportRequest::Send`, and reports lifecycle changes. After a connection
// drops it stays offline until asked to `Reconnect`; the pacing of rejoin
// attempts belongs to the connection manager, not to this loop. Failed
// connection attempts are retried here with capped exponential backoff.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("websocket error: {0}")]
    Ws(#[from] tungstenite::Error),
    #[error("connection closed")]
    Closed,
}

/// Lifecycle and data events emitted to the application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Connected,
    Disconnected,
    ConnectError(String),
    /// Raw JSON text frame from the authority.
    Message(String),
}

/// Requests from the application to the transport task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportRequest {
    Send(String),
    Reconnect,
    Shutdown,
}

/// Backoff between failed connection attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub initial: Duration,
    pub max: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            initial: Duration::from_secs(1),
            max: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// Delay before attempt `attempt + 1`, doubling up to `max`.
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt.min(16)).unwrap_or(u32::MAX);
        self.initial.saturating_mul(factor).min(self.max)
    }
}

// ---------------------------------------------------------------------------
// Link / Connector seams
// ---------------------------------------------------------------------------

/// One established text-frame connection.
#[async_trait]
pub trait Link: Send {
    async fn send(&mut self, text: String) -> Result<(), TransportError>;
    /// Next text frame. `None` means the peer closed the connection.
    async fn recv(&mut self) -> Option<Result<String, TransportError>>;
    async fn close(&mut self);
}

#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn Link>, TransportError>;
}

/// Connects to the authority with tokio-tungstenite.
pub struct WsConnector {
    url: String,
}

impl WsConnector {
    pub fn new(url: impl Into<String>) -> Self {
        WsConnector { url: url.into() }
    }
}

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self) -> Result<Box<dyn Link>, TransportError> {
        let (stream, _response) = tokio_tungstenite::connect_async(self.url.as_str()).await?;
        Ok(Box::new(WsLink { stream }))
    }
}

struct WsLink {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl Link for WsLink {
    async fn send(&mut self, text: String) -> Result<(), TransportError> {
        self.stream.send(Message::Text(text.into())).await?;
        Ok(())
    }

    async fn recv(&mut self) -> Option<Result<String, TransportError>> {
        while let Some(msg_result) = self.stream.next().await {
            match msg_result {
                Ok(Message::Text(text)) => return Some(Ok(text.to_string())),
                Ok(Message::Close(_)) => {
                    info!("server sent close frame");
                    return None;
                }
                Err(e) => return Some(Err(e.into())),
                _ => {
                    // Ignore Binary, Ping, Pong, Frame variants.
                }
            }
        }
        None
    }

    async fn close(&mut self) {
        if let Err(e) = self.stream.close(None).await {
            debug!("error closing websocket: {e}");
        }
    }
}

// ---------------------------------------------------------------------------
// Transport task
// ---------------------------------------------------------------------------

/// Run the transport until shut down or until either channel closes.
pub async fn run<C: Connector>(
    connector: C,
    mut req_rx: mpsc::Receiver<TransportRequest>,
    event_tx: mpsc::Sender<TransportEvent>,
    policy: RetryPolicy,
) {
    loop {
        let Some(mut link) = connect_with_retry(&connector, &mut req_rx, &event_tx, policy).await
        else {
            return;
        };
        if event_tx.send(TransportEvent::Connected).await.is_err() {
            link.close().await;
            return;
        }

        if !pump(link.as_mut(), &mut req_rx, &event_tx).await {
            return;
        }
        if event_tx.send(TransportEvent::Disconnected).await.is_err() {
            return;
        }

        // Offline until the application asks for a reconnect.
        loop {
            match req_rx.recv().await {
                Some(TransportRequest::Reconnect) => break,
                Some(TransportRequest::Send(_)) => {
                    debug!("dropping outbound frame while disconnected");
                }
                Some(TransportRequest::Shutdown) | None => return,
            }
        }
    }
}

/// Keep trying to connect. Returns `None` if shut down meanwhile, including
/// in the middle of a handshake.
async fn connect_with_retry<C: Connector>(
    connector: &C,
    req_rx: &mut mpsc::Receiver<TransportRequest>,
    event_tx: &mpsc::Sender<TransportEvent>,
    policy: RetryPolicy,
) -> Option<Box<dyn Link>> {
    let mut attempt = 0u32;
    loop {
        let connecting = connector.connect();
        tokio::pin!(connecting);
        let outcome = loop {
            tokio::select! {
                result = &mut connecting => break result,
                req = req_rx.recv() => {
                    if !still_wanted(req) {
                        info!("shutdown requested during connection attempt");
                        return None;
                    }
                }
            }
        };

        match outcome {
            Ok(link) => {
                info!("transport connected after {} failed attempts", attempt);
                return Some(link);
            }
            Err(e) => {
                warn!("connection attempt {} failed: {e}", attempt + 1);
                if event_tx
                    .send(TransportEvent::ConnectError(e.to_string()))
                    .await
                    .is_err()
                {
                    return None;
                }
            }
        }

        let backoff = tokio::time::sleep(policy.delay(attempt));
        tokio::pin!(backoff);
        attempt = attempt.saturating_add(1);
        loop {
            tokio::select! {
                _ = &mut backoff => break,
                req = req_rx.recv() => {
                    if !still_wanted(req) {
                        return None;
                    }
                }
            }
        }
    }
}

/// Handle a request that arrives while no link is up. Returns false once
/// the application wants the transport gone.
fn still_wanted(req: Option<TransportRequest>) -> bool {
    match req {
        Some(TransportRequest::Send(_)) => {
            debug!("dropping outbound frame while connecting");
            true
        }
        // Already trying; the next attempt happens on schedule.
        Some(TransportRequest::Reconnect) => true,
        Some(TransportRequest::Shutdown) | None => false,
    }
}

/// Shuttle frames until the link drops (returns true) or the task should
/// exit (returns false).
async fn pump(
    link: &mut dyn Link,
    req_rx: &mut mpsc::Receiver<TransportRequest>,
    event_tx: &mpsc::Sender<TransportEvent>,
) -> bool {
    loop {
        tokio::select! {
            req = req_rx.recv() => match req {
                Some(TransportRequest::Send(text)) => {
                    if let Err(e) = link.send(text).await {
                        warn!("send failed: {e}");
                        return true;
                    }
                }
                Some(TransportRequest::Reconnect) => {
                    debug!("reconnect requested while connected; ignoring");
                }
                Some(TransportRequest::Shutdown) | None => {
                    link.close().await;
                    return false;
                }
            },
            incoming = link.recv() => match incoming {
                Some(Ok(text)) => {
                    if event_tx.send(TransportEvent::Message(text)).await.is_err() {
                        link.close().await;
                        return false;
                    }
                }
                Some(Err(e)) => {
                    warn!("receive failed: {e}");
                    return true;
                }
                None => {
                    info!("connection closed by server");
                    return true;
                }
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
