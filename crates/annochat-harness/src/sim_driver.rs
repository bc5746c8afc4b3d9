//! Simulation driver for deterministic testing.
//!
//! Implements [`Driver`] over a scripted queue of user input and server
//! traffic. Server events are tagged with whichever chat connection the
//! runtime currently has open, the same way a real socket only delivers to
//! its own listeners. Time advances only through the script or when the
//! runtime waits on a deadline with nothing else queued.

#![allow(clippy::disallowed_types, reason = "Synchronous locking operations only")]

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use annochat_app::{AppEvent, AppView, ConnectionId, Driver, KeyInput, PresenceEvent, SessionEvent};
use annochat_core::env::Environment;
use annochat_proto::{ClientEvent, ServerEvent};
use serde_json::Value;

use crate::{InvariantRegistry, Observation, ScriptedTokens, SimEnv, SimInstant};

/// One scripted step.
#[derive(Debug, Clone)]
pub enum Scripted {
    /// Deliver an application event as-is.
    App(AppEvent<SimInstant>),
    /// Open chat socket reports the namespace connected.
    ChatOpened,
    /// Server event on the open chat socket. Dropped if none is open.
    Server(ServerEvent),
    /// Server event on the most recently closed chat socket.
    StaleServer(ServerEvent),
    /// Open chat socket drops.
    ChatClosed(String),
    /// Server refuses the namespace handshake of the opening chat socket
    /// with this payload.
    ChatRejected(Option<Value>),
    /// Next chat socket is refused instead of opening.
    RejectNextChat(Option<Value>),
    /// Presence feed event. Dropped unless presence is open.
    Presence(PresenceEvent),
    /// Let virtual time pass.
    Advance(Duration),
    /// Next token fetch fails.
    FailNextToken,
}

/// Close reason reported after a refused handshake.
pub const REJECTED_REASON: &str = "namespace connect rejected";

/// Driver operation performed by the runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverCall {
    /// Chat socket requested.
    OpenChat {
        /// Connection id.
        conn: ConnectionId,
        /// Credential.
        token: String,
    },
    /// Event emitted on a chat socket.
    EmitChat {
        /// Connection id.
        conn: ConnectionId,
        /// Emitted event.
        event: ClientEvent,
        /// Virtual time of the emit.
        at: SimInstant,
    },
    /// Chat socket closed.
    CloseChat {
        /// Connection id.
        conn: ConnectionId,
    },
    /// Presence socket requested.
    OpenPresence,
    /// Presence socket closed.
    ClosePresence,
    /// Driver stopped.
    Stop,
}

/// Simulation driver errors.
#[derive(Debug, Clone)]
pub struct SimDriverError(pub String);

impl std::fmt::Display for SimDriverError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SimDriverError: {}", self.0)
    }
}

impl std::error::Error for SimDriverError {}

#[derive(Debug, Default)]
struct SharedState {
    script: VecDeque<Scripted>,
    calls: Vec<DriverCall>,
    renders: Vec<AppView>,
    open_chat: Option<ConnectionId>,
    closed_chats: Vec<ConnectionId>,
    presence_open: bool,
    pending_rejection: Option<Option<Value>>,
}

/// Simulation driver. Clones share state, so a test can keep a handle after
/// moving the driver into a runtime.
#[derive(Clone)]
pub struct SimDriver {
    env: SimEnv,
    tokens: ScriptedTokens,
    state: Arc<Mutex<SharedState>>,
    invariants: Option<Arc<InvariantRegistry>>,
    auto_open: bool,
}

impl SimDriver {
    /// Driver on `env` that controls `tokens`.
    ///
    /// Sockets report themselves open as soon as they are requested.
    pub fn new(env: SimEnv, tokens: ScriptedTokens) -> Self {
        Self {
            env,
            tokens,
            state: Arc::new(Mutex::new(SharedState::default())),
            invariants: None,
            auto_open: true,
        }
    }

    /// Check `invariants` on every render. A violation fails the render.
    #[must_use]
    pub fn with_invariants(mut self, invariants: InvariantRegistry) -> Self {
        self.invariants = Some(Arc::new(invariants));
        self
    }

    /// Require chat sockets to be opened explicitly with
    /// [`Scripted::ChatOpened`].
    #[must_use]
    pub fn manual_open(mut self) -> Self {
        self.auto_open = false;
        self
    }

    /// Append a step to the script.
    pub fn push(&self, step: Scripted) {
        self.lock().script.push_back(step);
    }

    /// Append several steps.
    pub fn extend(&self, steps: impl IntoIterator<Item = Scripted>) {
        self.lock().script.extend(steps);
    }

    /// Append a key press.
    pub fn key(&self, key: KeyInput) {
        self.push(Scripted::App(AppEvent::Key(key)));
    }

    /// Append one key press per character of `text`.
    pub fn type_text(&self, text: &str) {
        self.extend(text.chars().map(|c| Scripted::App(AppEvent::Key(KeyInput::Char(c)))));
    }

    /// Append a server event on the open chat socket.
    pub fn server(&self, event: ServerEvent) {
        self.push(Scripted::Server(event));
    }

    /// Refuse the next chat socket's handshake with `data`, then drop it.
    pub fn reject_next_chat(&self, data: Option<Value>) {
        self.lock().pending_rejection = Some(data);
    }

    /// Every driver operation so far.
    pub fn calls(&self) -> Vec<DriverCall> {
        self.lock().calls.clone()
    }

    /// Events emitted on chat sockets, with their virtual time.
    pub fn emitted(&self) -> Vec<(ConnectionId, ClientEvent, SimInstant)> {
        self.lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                DriverCall::EmitChat { conn, event, at } => Some((*conn, event.clone(), *at)),
                _ => None,
            })
            .collect()
    }

    /// Every rendered view.
    pub fn renders(&self) -> Vec<AppView> {
        self.lock().renders.clone()
    }

    /// Chat connection currently open.
    pub fn open_connection(&self) -> Option<ConnectionId> {
        self.lock().open_chat
    }

    /// Whether the script has run out.
    pub fn is_idle(&self) -> bool {
        self.lock().script.is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, SharedState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn next_event(&self, deadline: Option<SimInstant>) -> Option<AppEvent<SimInstant>> {
        let mut state = self.lock();
        loop {
            let Some(step) = state.script.pop_front() else {
                return match deadline {
                    Some(deadline) => {
                        self.env.advance_to(deadline);
                        Some(AppEvent::Tick)
                    },
                    None => Some(AppEvent::Quit),
                };
            };

            let event = match step {
                Scripted::App(event) => Some(event),
                Scripted::Advance(duration) => {
                    let now = self.env.now();
                    let target = now + duration;
                    match deadline {
                        Some(deadline) if deadline < target => {
                            let stop = deadline.max(now);
                            self.env.advance_to(stop);
                            state.script.push_front(Scripted::Advance(target - stop));
                        },
                        _ => self.env.advance_to(target),
                    }
                    Some(AppEvent::Tick)
                },
                Scripted::ChatOpened => state
                    .open_chat
                    .map(|conn| AppEvent::Session(SessionEvent::TransportOpened { conn })),
                Scripted::Server(event) => state
                    .open_chat
                    .map(|conn| AppEvent::Session(SessionEvent::Server { conn, event })),
                Scripted::StaleServer(event) => state
                    .closed_chats
                    .last()
                    .map(|&conn| AppEvent::Session(SessionEvent::Server { conn, event })),
                Scripted::ChatClosed(reason) => state
                    .open_chat
                    .map(|conn| AppEvent::Session(SessionEvent::TransportClosed { conn, reason })),
                Scripted::ChatRejected(data) => state.open_chat.map(|conn| {
                    AppEvent::Session(SessionEvent::Server {
                        conn,
                        event: ServerEvent::from_connect_error(data.as_ref()),
                    })
                }),
                Scripted::RejectNextChat(data) => {
                    state.pending_rejection = Some(data);
                    None
                },
                Scripted::Presence(event) => {
                    state.presence_open.then_some(AppEvent::Presence(event))
                },
                Scripted::FailNextToken => {
                    self.tokens.fail_next();
                    None
                },
            };

            if event.is_some() {
                return event;
            }
        }
    }
}

impl Driver for SimDriver {
    type Error = SimDriverError;
    type Instant = SimInstant;

    async fn poll_event(
        &mut self,
        deadline: Option<SimInstant>,
    ) -> Result<Option<AppEvent<SimInstant>>, SimDriverError> {
        Ok(self.next_event(deadline))
    }

    fn open_chat(&mut self, conn: ConnectionId, token: String) -> Result<(), SimDriverError> {
        let auto_open = self.auto_open;
        let mut state = self.lock();
        state.calls.push(DriverCall::OpenChat { conn, token });
        state.open_chat = Some(conn);
        if let Some(data) = state.pending_rejection.take() {
            state.script.push_front(Scripted::ChatClosed(REJECTED_REASON.to_owned()));
            state.script.push_front(Scripted::ChatRejected(data));
        } else if auto_open {
            state.script.push_front(Scripted::ChatOpened);
        }
        Ok(())
    }

    fn emit_chat(&mut self, conn: ConnectionId, event: ClientEvent) -> Result<(), SimDriverError> {
        let at = self.env.now();
        self.lock().calls.push(DriverCall::EmitChat { conn, event, at });
        Ok(())
    }

    fn close_chat(&mut self, conn: ConnectionId) {
        let mut state = self.lock();
        state.calls.push(DriverCall::CloseChat { conn });
        if state.open_chat == Some(conn) {
            state.open_chat = None;
            state.closed_chats.push(conn);
        }
    }

    fn open_presence(&mut self) -> Result<(), SimDriverError> {
        let auto_open = self.auto_open;
        let mut state = self.lock();
        state.calls.push(DriverCall::OpenPresence);
        state.presence_open = true;
        if auto_open {
            state.script.push_front(Scripted::Presence(PresenceEvent::Opened));
        }
        Ok(())
    }

    fn close_presence(&mut self) {
        let mut state = self.lock();
        state.calls.push(DriverCall::ClosePresence);
        state.presence_open = false;
    }

    fn render(&mut self, view: &AppView) -> Result<(), SimDriverError> {
        let observation = {
            let mut state = self.lock();
            state.renders.push(view.clone());
            Observation {
                view: view.clone(),
                open_chat: state.open_chat,
                calls: state.calls.clone(),
            }
        };

        if let Some(invariants) = &self.invariants {
            invariants.check_all(&observation).map_err(|violations| {
                let messages: Vec<String> = violations.iter().map(ToString::to_string).collect();
                SimDriverError(messages.join("; "))
            })?;
        }
        Ok(())
    }

    fn stop(&mut self) {
        self.lock().calls.push(DriverCall::Stop);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn driver() -> SimDriver {
        SimDriver::new(SimEnv::new(), ScriptedTokens::new())
    }

    #[test]
    fn exhausted_script_quits_without_deadline() {
        let driver = driver();
        assert!(matches!(driver.next_event(None), Some(AppEvent::Quit)));
    }

    #[test]
    fn exhausted_script_waits_for_deadline() {
        let driver = driver();
        let deadline = SimInstant::from_millis(1500);
        assert!(matches!(driver.next_event(Some(deadline)), Some(AppEvent::Tick)));
        assert_eq!(driver.env.now(), deadline);
    }

    #[test]
    fn advance_stops_at_earlier_deadline() {
        let driver = driver();
        driver.push(Scripted::Advance(Duration::from_secs(2)));

        let deadline = SimInstant::from_millis(500);
        assert!(matches!(driver.next_event(Some(deadline)), Some(AppEvent::Tick)));
        assert_eq!(driver.env.now(), deadline);

        assert!(matches!(driver.next_event(None), Some(AppEvent::Tick)));
        assert_eq!(driver.env.now(), SimInstant::from_millis(2000));
    }

    #[test]
    fn server_events_need_an_open_socket() {
        let mut driver = driver().manual_open();
        driver.server(ServerEvent::UserDisconnected);
        // Dropped, then script exhausted
        assert!(matches!(driver.next_event(None), Some(AppEvent::Quit)));

        let conn = ConnectionId::new(3);
        driver.open_chat(conn, "t".into()).ok();
        driver.server(ServerEvent::UserDisconnected);
        assert!(matches!(
            driver.next_event(None),
            Some(AppEvent::Session(SessionEvent::Server { conn: c, .. })) if c == conn
        ));
    }

    #[test]
    fn stale_events_carry_the_closed_id() {
        let mut driver = driver().manual_open();
        let old = ConnectionId::new(0);
        driver.open_chat(old, "t".into()).ok();
        driver.close_chat(old);
        driver.open_chat(ConnectionId::new(1), "t".into()).ok();

        driver.push(Scripted::StaleServer(ServerEvent::Typing { is_typing: true }));
        assert!(matches!(
            driver.next_event(None),
            Some(AppEvent::Session(SessionEvent::Server { conn, .. })) if conn == old
        ));
    }

    #[test]
    fn rejected_socket_reports_error_then_close() {
        let mut driver = driver();
        let conn = ConnectionId::new(0);
        driver.reject_next_chat(Some(serde_json::json!({ "message": "bad token" })));
        driver.open_chat(conn, "t".into()).ok();

        assert!(matches!(
            driver.next_event(None),
            Some(AppEvent::Session(SessionEvent::Server {
                event: ServerEvent::Error { message: Some(ref m) },
                ..
            })) if m == "bad token"
        ));
        assert!(matches!(
            driver.next_event(None),
            Some(AppEvent::Session(SessionEvent::TransportClosed { ref reason, .. }))
                if reason == REJECTED_REASON
        ));

        // Only the next socket is refused.
        driver.open_chat(ConnectionId::new(1), "t".into()).ok();
        assert!(matches!(
            driver.next_event(None),
            Some(AppEvent::Session(SessionEvent::TransportOpened { .. }))
        ));
    }

    #[test]
    fn token_failures_are_applied_in_order() {
        let driver = driver();
        driver.extend([Scripted::FailNextToken, Scripted::App(AppEvent::Resize(80, 24))]);
        assert!(matches!(driver.next_event(None), Some(AppEvent::Resize(80, 24))));
    }
}
