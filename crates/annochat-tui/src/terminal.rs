//! Terminal driver for the TUI.
//!
//! Implements the [`Driver`] trait for terminal I/O using crossterm for
//! keyboard events and ratatui for rendering. The chat and presence sockets
//! run as background tasks from [`annochat_client::transport`]; their events
//! are polled here alongside the keyboard and the session's typing deadline.

use std::{
    io::{self, Stdout, stdout},
    time::Instant,
};

use annochat_app::{AppEvent, AppView, ConnectionId, Driver, KeyInput, PresenceEvent, SessionEvent};
use annochat_client::{
    ClientConfig, TransportError,
    transport::{self, SocketEvent, SocketHandle, SocketTarget},
};
use annochat_proto::{ClientEvent, PresenceUpdate, ServerEvent};
use crossterm::{
    ExecutableCommand,
    event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use futures::StreamExt;
use ratatui::{Terminal, backend::CrosstermBackend};
use thiserror::Error;

use crate::ui;

/// Namespace of the chat connection.
const CHAT_NAMESPACE: &str = "/";

/// Terminal driver errors.
#[derive(Debug, Error)]
pub enum TerminalError {
    /// I/O error from terminal operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Transport error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}

struct ChatSocket {
    conn: ConnectionId,
    handle: SocketHandle,
}

/// What woke up the driver.
enum Wake {
    Terminal(Option<io::Result<Event>>),
    Chat(ConnectionId, Option<SocketEvent>),
    Presence(Option<SocketEvent>),
    Deadline,
}

/// Terminal driver implementing the [`Driver`] trait.
///
/// Owns the terminal (raw mode, alternate screen) for its whole lifetime and
/// restores it on drop.
pub struct TerminalDriver {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    event_stream: EventStream,
    config: ClientConfig,
    chat: Option<ChatSocket>,
    presence: Option<SocketHandle>,
}

impl TerminalDriver {
    /// Take over the terminal.
    pub fn new(config: ClientConfig) -> Result<Self, TerminalError> {
        if config.socket_url().is_none() {
            return Err(TransportError::InvalidUrl(config.server_url).into());
        }

        enable_raw_mode()?;
        stdout().execute(EnterAlternateScreen)?;

        let backend = CrosstermBackend::new(stdout());
        let terminal = Terminal::new(backend)?;
        let event_stream = EventStream::new();

        Ok(Self { terminal, event_stream, config, chat: None, presence: None })
    }

    fn target(&self, namespace: &str, auth: Option<serde_json::Value>) -> Result<SocketTarget, TerminalError> {
        let url = self
            .config
            .socket_url()
            .ok_or_else(|| TransportError::InvalidUrl(self.config.server_url.clone()))?;
        Ok(SocketTarget {
            url,
            namespace: namespace.to_owned(),
            auth,
            connect_timeout: self.config.connect_timeout,
        })
    }

    fn on_chat(&mut self, conn: ConnectionId, event: Option<SocketEvent>) -> Option<AppEvent<Instant>> {
        let Some(event) = event else {
            self.chat = None;
            return None;
        };
        if matches!(event, SocketEvent::Closed { .. }) {
            self.chat = None;
        }
        chat_event(conn, event).map(AppEvent::Session)
    }

    fn on_presence(&mut self, event: Option<SocketEvent>) -> Option<AppEvent<Instant>> {
        let Some(event) = event else {
            self.presence = None;
            return None;
        };
        if matches!(event, SocketEvent::Closed { .. }) {
            self.presence = None;
        }
        presence_event(event).map(AppEvent::Presence)
    }
}

/// Convert a crossterm key event to [`KeyInput`].
pub fn convert_key(key: KeyEvent) -> Option<KeyInput> {
    match key.code {
        KeyCode::Char('n') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            Some(KeyInput::FindNew)
        },
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Some(KeyInput::Esc),
        KeyCode::Char(c) => Some(KeyInput::Char(c)),
        KeyCode::F(2) => Some(KeyInput::FindNew),
        KeyCode::Enter => Some(KeyInput::Enter),
        KeyCode::Backspace => Some(KeyInput::Backspace),
        KeyCode::Esc => Some(KeyInput::Esc),
        _ => None,
    }
}

/// Session event for an event from chat socket `conn`.
///
/// Events the session does not understand are logged and dropped.
pub fn chat_event<I>(conn: ConnectionId, event: SocketEvent) -> Option<SessionEvent<I>> {
    match event {
        SocketEvent::Connected => Some(SessionEvent::TransportOpened { conn }),
        SocketEvent::Event { name, args } => match ServerEvent::from_event(&name, &args) {
            Ok(event) => Some(SessionEvent::Server { conn, event }),
            Err(e) => {
                tracing::warn!(%conn, event = %name, error = %e, "dropping chat event");
                None
            },
        },
        SocketEvent::Rejected { data } => Some(SessionEvent::Server {
            conn,
            event: ServerEvent::from_connect_error(data.as_ref()),
        }),
        SocketEvent::Closed { reason } => Some(SessionEvent::TransportClosed { conn, reason }),
    }
}

/// Presence event for an event from the presence socket.
pub fn presence_event(event: SocketEvent) -> Option<PresenceEvent> {
    match event {
        SocketEvent::Connected => Some(PresenceEvent::Opened),
        SocketEvent::Event { name, args } => match PresenceUpdate::from_event(&name, &args) {
            Ok(PresenceUpdate::OnlineUsers(count)) => Some(PresenceEvent::OnlineUsers(count)),
            Err(e) => {
                tracing::warn!(event = %name, error = %e, "dropping presence event");
                None
            },
        },
        // The socket closes right after; its Closed event reports it.
        SocketEvent::Rejected { data } => {
            tracing::warn!(?data, "presence namespace rejected");
            None
        },
        SocketEvent::Closed { reason } => Some(PresenceEvent::Closed { reason }),
    }
}

async fn next_chat(chat: &mut Option<ChatSocket>) -> (ConnectionId, Option<SocketEvent>) {
    match chat {
        Some(socket) => (socket.conn, socket.handle.recv().await),
        None => std::future::pending().await,
    }
}

async fn next_presence(presence: &mut Option<SocketHandle>) -> Option<SocketEvent> {
    match presence {
        Some(handle) => handle.recv().await,
        None => std::future::pending().await,
    }
}

async fn until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline.into()).await,
        None => std::future::pending().await,
    }
}

impl Driver for TerminalDriver {
    type Error = TerminalError;
    type Instant = Instant;

    async fn poll_event(
        &mut self,
        deadline: Option<Instant>,
    ) -> Result<Option<AppEvent<Instant>>, TerminalError> {
        let wake = tokio::select! {
            biased;

            event = self.event_stream.next() => Wake::Terminal(event),
            (conn, event) = next_chat(&mut self.chat) => Wake::Chat(conn, event),
            event = next_presence(&mut self.presence) => Wake::Presence(event),
            () = until(deadline) => Wake::Deadline,
        };

        match wake {
            Wake::Terminal(Some(Ok(Event::Key(key)))) if key.kind == KeyEventKind::Press => {
                Ok(convert_key(key).map(AppEvent::Key))
            },
            Wake::Terminal(Some(Ok(Event::Resize(cols, rows)))) => {
                Ok(Some(AppEvent::Resize(cols, rows)))
            },
            Wake::Terminal(Some(Ok(_))) => Ok(None),
            Wake::Terminal(Some(Err(e))) => Err(TerminalError::Io(e)),
            Wake::Terminal(None) => Ok(Some(AppEvent::Quit)),
            Wake::Chat(conn, event) => Ok(self.on_chat(conn, event)),
            Wake::Presence(event) => Ok(self.on_presence(event)),
            Wake::Deadline => Ok(Some(AppEvent::Tick)),
        }
    }

    fn open_chat(&mut self, conn: ConnectionId, token: String) -> Result<(), TerminalError> {
        let auth = serde_json::json!({ "token": token });
        let target = self.target(CHAT_NAMESPACE, Some(auth))?;
        tracing::info!(%conn, url = %target.url, "opening chat socket");
        self.chat = Some(ChatSocket { conn, handle: transport::connect(target) });
        Ok(())
    }

    fn emit_chat(&mut self, conn: ConnectionId, event: ClientEvent) -> Result<(), TerminalError> {
        match &self.chat {
            Some(socket) if socket.conn == conn => {
                if let Err(e) = socket.handle.emit(event.name(), event.args()) {
                    tracing::warn!(%conn, event = event.name(), error = %e, "emit failed");
                }
            },
            _ => tracing::debug!(%conn, event = event.name(), "dropping emit for closed socket"),
        }
        Ok(())
    }

    fn close_chat(&mut self, conn: ConnectionId) {
        if self.chat.as_ref().is_some_and(|socket| socket.conn == conn) {
            tracing::debug!(%conn, "closing chat socket");
            self.chat = None;
        }
    }

    fn open_presence(&mut self) -> Result<(), TerminalError> {
        let target = self.target(&self.config.presence_namespace, None)?;
        tracing::info!(namespace = %target.namespace, "opening presence socket");
        self.presence = Some(transport::connect(target));
        Ok(())
    }

    fn close_presence(&mut self) {
        self.presence = None;
    }

    fn render(&mut self, view: &AppView) -> Result<(), TerminalError> {
        self.terminal.draw(|frame| ui::render(frame, view))?;
        Ok(())
    }

    fn stop(&mut self) {
        self.chat = None;
        self.presence = None;
    }
}

impl Drop for TerminalDriver {
    fn drop(&mut self) {
        self.stop();
        let _ = disable_raw_mode();
        let _ = stdout().execute(LeaveAlternateScreen);
    }
}
