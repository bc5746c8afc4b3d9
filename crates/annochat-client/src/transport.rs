//! WebSocket transport for one Socket.IO namespace.
//!
//! [`connect`] spawns a task that opens the WebSocket and runs a sans-IO
//! [`Link`] over it. This is a thin layer that just moves text frames and
//! timer ticks - protocol logic remains in the link.
//!
//! Dropping the [`SocketHandle`] closes the command channel, which makes the
//! task leave the namespace and close the socket. Its event receiver goes
//! with it, so no event is observed after the drop.

use std::time::{Duration, Instant};

use annochat_core::{Link, LinkAction, LinkConfig};
use annochat_proto::Packet;
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};

use crate::TransportError;

/// How often the link checks its timeouts.
const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Events delivered by the socket task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketEvent {
    /// Namespace accepted the handshake.
    Connected,
    /// Named event on the namespace.
    Event {
        /// Event name.
        name: String,
        /// Event arguments.
        args: Vec<Value>,
    },
    /// Namespace refused the handshake.
    Rejected {
        /// Rejection payload.
        data: Option<Value>,
    },
    /// Socket closed. Always the last event.
    Closed {
        /// Close reason.
        reason: String,
    },
}

#[derive(Debug)]
struct Outbound {
    name: String,
    args: Vec<Value>,
}

/// What a socket task connects to.
#[derive(Debug, Clone)]
pub struct SocketTarget {
    /// WebSocket URL of the Engine.IO endpoint.
    pub url: String,
    /// Socket.IO namespace.
    pub namespace: String,
    /// Auth object sent with the namespace CONNECT.
    pub auth: Option<Value>,
    /// Time allowed for the WebSocket to open.
    pub connect_timeout: Duration,
}

/// Handle to a socket task.
///
/// Events are received from [`SocketHandle::recv`]; emits are queued to the
/// task.
#[derive(Debug)]
pub struct SocketHandle {
    to_server: mpsc::UnboundedSender<Outbound>,
    from_server: mpsc::Receiver<SocketEvent>,
    abort_handle: tokio::task::AbortHandle,
}

impl SocketHandle {
    /// Queue an event. Dropped by the task unless the namespace is connected.
    pub fn emit(&self, name: impl Into<String>, args: Vec<Value>) -> Result<(), TransportError> {
        self.to_server
            .send(Outbound { name: name.into(), args })
            .map_err(|_| TransportError::Stream("socket task has exited".into()))
    }

    /// Next event. `None` once the task has exited.
    pub async fn recv(&mut self) -> Option<SocketEvent> {
        self.from_server.recv().await
    }

    /// Stop the task immediately, without leaving the namespace.
    pub fn abort(&self) {
        self.abort_handle.abort();
    }
}

/// Open a socket to `target` in a background task.
///
/// Never fails up front: connection errors arrive as
/// [`SocketEvent::Closed`]. Must be called within a tokio runtime.
pub fn connect(target: SocketTarget) -> SocketHandle {
    let (to_server_tx, to_server_rx) = mpsc::unbounded_channel();
    let (from_server_tx, from_server_rx) = mpsc::channel(64);

    let handle = tokio::spawn(run_socket(target, to_server_rx, from_server_tx));

    SocketHandle {
        to_server: to_server_tx,
        from_server: from_server_rx,
        abort_handle: handle.abort_handle(),
    }
}

async fn run_socket(
    target: SocketTarget,
    to_server: mpsc::UnboundedReceiver<Outbound>,
    from_server: mpsc::Sender<SocketEvent>,
) {
    let namespace = target.namespace.clone();
    let reason = match drive(target, to_server, &from_server).await {
        Ok(reason) => reason,
        Err(e) => e.to_string(),
    };
    tracing::info!(%namespace, %reason, "socket closed");
    let _ = from_server.send(SocketEvent::Closed { reason }).await;
}

/// Run the link until it closes. Returns the close reason.
async fn drive(
    target: SocketTarget,
    mut to_server: mpsc::UnboundedReceiver<Outbound>,
    from_server: &mpsc::Sender<SocketEvent>,
) -> Result<String, TransportError> {
    let (ws, _) = tokio::time::timeout(target.connect_timeout, connect_async(target.url.as_str()))
        .await
        .map_err(|_| TransportError::Timeout(target.connect_timeout))?
        .map_err(|e| TransportError::Connection(e.to_string()))?;
    let (mut sink, mut stream) = ws.split();
    tracing::debug!(url = %target.url, namespace = %target.namespace, "websocket open");

    let mut link = Link::new(now(), target.namespace, target.auth, LinkConfig::default());
    let mut ticker = tokio::time::interval(TICK_INTERVAL);

    loop {
        let actions = tokio::select! {
            message = stream.next() => match message {
                Some(Ok(Message::Text(text))) => match Packet::decode(text.as_str()) {
                    Ok(packet) => match link.handle_packet(packet, now()) {
                        Ok(actions) => actions,
                        Err(e) => {
                            tracing::warn!(error = %e, "dropping packet");
                            continue;
                        },
                    },
                    Err(e) => {
                        tracing::warn!(error = %e, "undecodable packet");
                        continue;
                    },
                },
                Some(Ok(Message::Close(_))) | None => {
                    return Ok("server closed websocket".into());
                },
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(TransportError::Stream(e.to_string())),
            },
            outbound = to_server.recv() => match outbound {
                Some(Outbound { name, args }) => match link.emit(&name, args) {
                    Ok(packet) => vec![LinkAction::Send(packet)],
                    Err(e) => {
                        tracing::debug!(event = %name, error = %e, "dropping emit");
                        continue;
                    },
                },
                // Handle dropped: leave the namespace.
                None => {
                    let actions = link.disconnect();
                    if actions.is_empty() {
                        return Ok("client disconnect".into());
                    }
                    actions
                },
            },
            _ = ticker.tick() => link.tick(now()),
        };

        for action in actions {
            match action {
                LinkAction::Send(packet) => {
                    let text = packet.encode().map_err(|e| TransportError::Protocol(e.to_string()))?;
                    sink.send(Message::text(text))
                        .await
                        .map_err(|e| TransportError::Stream(e.to_string()))?;
                },
                LinkAction::Connected => {
                    let _ = from_server.send(SocketEvent::Connected).await;
                },
                LinkAction::Deliver { name, args } => {
                    let _ = from_server.send(SocketEvent::Event { name, args }).await;
                },
                LinkAction::Rejected { data } => {
                    let _ = from_server.send(SocketEvent::Rejected { data }).await;
                    let _ = sink.close().await;
                    return Ok("namespace connect rejected".into());
                },
                LinkAction::Close { reason } => {
                    let _ = sink.close().await;
                    return Ok(reason);
                },
            }
        }
    }
}

#[allow(clippy::disallowed_methods)]
fn now() -> Instant {
    Instant::now()
}
