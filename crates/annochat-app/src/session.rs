//! Chat session state machine.
//!
//! [`ChatSession`] owns one matchmaking connection at a time and everything
//! the user sees about it: status, message log, room, typing flags and the
//! local draft. It is a pure state machine: it consumes
//! [`SessionEvent`]s and produces [`SessionAction`]s for the runtime to
//! execute.
//!
//! # Phases
//!
//! ```text
//! ┌────────────┐ opened ┌─────────────────┐ matched ┌─────────┐
//! │ Connecting │───────>│ WaitingForMatch │────────>│ Matched │
//! └────────────┘        └─────────────────┘         └─────────┘
//!   ↑     │                                            │    │
//!   │     │ token failed / error / socket lost         │    │ user disconnected
//!   │     ↓                                            │    ↓
//!   │  ┌─────────┐<──────────────────────────────────┘  ┌───────┐
//!   │  │ Errored │                                       │ Ended │
//!   │  └─────────┘                                       └───────┘
//!   └──────────────── find new (from any phase) ─────────────┘
//! ```
//!
//! # Connection ownership
//!
//! The session holds a single slot with a generation-tagged
//! [`ConnectionId`]. Restarting tears down the slot's connection before the
//! new generation is allocated, and every transport event carries the id it
//! was produced under. Events for any other id are dropped, so nothing from a
//! previous match can reach the current one.

use std::time::Duration;

use annochat_core::env::Environment;
use annochat_proto::{ClientEvent, RoomId, ServerEvent};

use crate::{
    ConnectionId, Message, SessionAction, SessionEvent, SessionPhase, SessionSnapshot,
    SessionStatus,
    typing::{DEFAULT_TYPING_TIMEOUT, TypingDebounce},
};

/// Session configuration.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Quiet period after the last keystroke before `typing=false` is sent.
    pub typing_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { typing_timeout: DEFAULT_TYPING_TIMEOUT }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    FetchingToken,
    Opening,
    Open,
}

#[derive(Debug, Clone, Copy)]
struct ConnectionSlot {
    id: ConnectionId,
    stage: Stage,
}

/// Chat session state machine.
///
/// Generic over [`Environment`] so the typing debounce runs on virtual time in
/// simulation.
#[derive(Debug, Clone)]
pub struct ChatSession<E: Environment> {
    env: E,
    phase: SessionPhase,
    status: SessionStatus,
    messages: Vec<Message>,
    room: Option<RoomId>,
    /// Matched and the connection is live.
    connected: bool,
    peer_typing: bool,
    draft: String,
    typing: TypingDebounce<E::Instant>,
    /// The one connection this session owns. `None` when torn down.
    slot: Option<ConnectionSlot>,
    next_generation: u64,
}

impl<E: Environment> ChatSession<E> {
    /// Create an inactive session. Nothing happens until [`SessionEvent::Start`].
    pub fn new(env: E, config: SessionConfig) -> Self {
        Self {
            env,
            phase: SessionPhase::Connecting,
            status: SessionStatus::Idle,
            messages: Vec::new(),
            room: None,
            connected: false,
            peer_typing: false,
            draft: String::new(),
            typing: TypingDebounce::new(config.typing_timeout),
            slot: None,
            next_generation: 0,
        }
    }

    /// Process an event and return actions.
    pub fn handle(&mut self, event: SessionEvent<E::Instant>) -> Vec<SessionAction> {
        match event {
            SessionEvent::Start => self.start(),
            SessionEvent::FindNew => self.find_new(),
            SessionEvent::SendMessage { text } => self.send_message(&text),
            SessionEvent::InputChanged { text } => self.input_changed(text),
            SessionEvent::Tick { now } => self.tick(now),

            SessionEvent::TokenFetched { conn, token } => {
                if !self.stage_is(conn, Stage::FetchingToken) {
                    tracing::debug!(%conn, "dropping token for stale attempt");
                    return vec![];
                }
                self.set_stage(Stage::Opening);
                vec![SessionAction::OpenConnection { conn, token }]
            },
            SessionEvent::TokenFailed { conn, reason } => {
                if !self.stage_is(conn, Stage::FetchingToken) {
                    tracing::debug!(%conn, "dropping token failure for stale attempt");
                    return vec![];
                }
                tracing::warn!(%conn, %reason, "token fetch failed");
                self.slot = None;
                self.phase = SessionPhase::Errored;
                self.status = SessionStatus::AuthError;
                vec![SessionAction::Render]
            },
            SessionEvent::TransportOpened { conn } => {
                if !self.stage_is(conn, Stage::Opening) {
                    tracing::debug!(%conn, "dropping open for stale connection");
                    return vec![];
                }
                tracing::info!(%conn, "chat connection open");
                self.set_stage(Stage::Open);
                self.phase = SessionPhase::WaitingForMatch;
                vec![SessionAction::Render]
            },
            SessionEvent::TransportClosed { conn, reason } => {
                if !self.is_current(conn) || self.stage_is(conn, Stage::FetchingToken) {
                    tracing::debug!(%conn, "dropping close for stale connection");
                    return vec![];
                }
                tracing::warn!(%conn, %reason, "chat connection lost");
                self.fail(conn, reason)
            },
            SessionEvent::Server { conn, event } => {
                // A handshake rejection arrives before the namespace opens.
                let rejected = matches!(event, ServerEvent::Error { .. })
                    && self.stage_is(conn, Stage::Opening);
                if !rejected && !self.stage_is(conn, Stage::Open) {
                    tracing::debug!(%conn, event = event.name(), "dropping event from stale connection");
                    return vec![];
                }
                self.handle_server(conn, event)
            },
        }
    }

    fn handle_server(&mut self, conn: ConnectionId, event: ServerEvent) -> Vec<SessionAction> {
        match event {
            ServerEvent::Matched { room_id } => {
                tracing::info!(%conn, room = %room_id, "matched");
                self.phase = SessionPhase::Matched;
                self.status = SessionStatus::Matched;
                self.connected = true;
                self.room = Some(room_id.clone());
                vec![
                    SessionAction::Emit { conn, event: ClientEvent::JoinRoom { room_id } },
                    SessionAction::Render,
                ]
            },
            ServerEvent::ChatMessage { msg } => {
                if !self.connected || self.room.is_none() {
                    tracing::debug!(%conn, "dropping message outside a room");
                    return vec![];
                }
                self.messages.push(Message::stranger(msg));
                vec![SessionAction::Render]
            },
            ServerEvent::Typing { is_typing } => {
                if !self.connected {
                    tracing::debug!(%conn, "dropping typing signal outside a room");
                    return vec![];
                }
                self.peer_typing = is_typing;
                vec![SessionAction::Render]
            },
            ServerEvent::UserDisconnected => {
                tracing::info!(%conn, "stranger disconnected");
                self.phase = SessionPhase::Ended;
                self.status = SessionStatus::PeerDisconnected;
                self.connected = false;
                self.peer_typing = false;
                self.typing.cancel();
                vec![SessionAction::Render]
            },
            ServerEvent::Error { message: Some(message) } => {
                tracing::warn!(%conn, %message, "server error");
                self.fail(conn, message)
            },
            ServerEvent::Error { message: None } => {
                tracing::debug!(%conn, "ignoring error event without message");
                vec![]
            },
        }
    }

    /// First activation: open a connection, keeping the idle status.
    pub fn start(&mut self) -> Vec<SessionAction> {
        self.restart()
    }

    /// Clear the log and room, then reconnect with a fresh token.
    pub fn find_new(&mut self) -> Vec<SessionAction> {
        self.messages.clear();
        self.room = None;
        self.connected = false;
        self.peer_typing = false;
        self.status = SessionStatus::Searching;
        self.restart()
    }

    /// Send the text to the stranger.
    ///
    /// No-op unless connected, in a room and the text is not blank.
    pub fn send_message(&mut self, text: &str) -> Vec<SessionAction> {
        let (Some(room_id), Some(slot)) = (self.room.clone(), self.slot) else {
            return vec![];
        };
        if !self.connected || text.trim().is_empty() {
            return vec![];
        }

        let conn = slot.id;
        self.messages.push(Message::you(text));
        self.draft.clear();
        self.peer_typing = false;
        self.typing.cancel();

        vec![
            SessionAction::Emit {
                conn,
                event: ClientEvent::ChatMessage { msg: text.to_owned(), room_id: room_id.clone() },
            },
            SessionAction::Emit { conn, event: ClientEvent::Typing { room_id, is_typing: false } },
            SessionAction::Render,
        ]
    }

    /// Input text changed. Signals typing and restarts the debounce window.
    pub fn input_changed(&mut self, text: String) -> Vec<SessionAction> {
        self.draft = text;

        let mut actions = Vec::with_capacity(2);
        if let Some(signal) = self.typing_signal(true) {
            self.typing.touch(self.env.now());
            actions.push(signal);
        }
        actions.push(SessionAction::Render);
        actions
    }

    fn tick(&mut self, now: E::Instant) -> Vec<SessionAction> {
        if !self.typing.poll(now) {
            return vec![];
        }
        self.typing_signal(false).into_iter().collect()
    }

    /// Tear down the owned connection, if any. Idempotent.
    pub fn teardown(&mut self) -> Vec<SessionAction> {
        self.connected = false;
        self.peer_typing = false;
        self.typing.cancel();
        match self.slot.take() {
            Some(slot) => {
                tracing::debug!(conn = %slot.id, "tearing down chat connection");
                vec![SessionAction::Teardown { conn: slot.id }]
            },
            None => vec![],
        }
    }

    /// Tear down, allocate the next generation and fetch a token for it.
    fn restart(&mut self) -> Vec<SessionAction> {
        let mut actions = self.teardown();

        let conn = ConnectionId::new(self.next_generation);
        self.next_generation += 1;
        self.slot = Some(ConnectionSlot { id: conn, stage: Stage::FetchingToken });
        self.phase = SessionPhase::Connecting;

        tracing::info!(%conn, "starting chat connection");
        actions.push(SessionAction::FetchToken { conn });
        actions.push(SessionAction::Render);
        actions
    }

    /// Terminal failure of the current connection. No retry.
    fn fail(&mut self, conn: ConnectionId, message: String) -> Vec<SessionAction> {
        self.slot = None;
        self.connected = false;
        self.peer_typing = false;
        self.typing.cancel();
        self.phase = SessionPhase::Errored;
        self.status = SessionStatus::ConnectionError(message);
        vec![SessionAction::Teardown { conn }, SessionAction::Render]
    }

    fn typing_signal(&self, is_typing: bool) -> Option<SessionAction> {
        if !self.connected {
            return None;
        }
        let room_id = self.room.clone()?;
        let slot = self.slot?;
        Some(SessionAction::Emit { conn: slot.id, event: ClientEvent::Typing { room_id, is_typing } })
    }

    fn is_current(&self, conn: ConnectionId) -> bool {
        self.slot.is_some_and(|slot| slot.id == conn)
    }

    fn stage_is(&self, conn: ConnectionId, stage: Stage) -> bool {
        self.slot.is_some_and(|slot| slot.id == conn && slot.stage == stage)
    }

    fn set_stage(&mut self, stage: Stage) {
        if let Some(slot) = self.slot.as_mut() {
            slot.stage = stage;
        }
    }

    /// When the runtime must deliver the next [`SessionEvent::Tick`]. `None`
    /// when no timer is pending.
    pub fn next_deadline(&self) -> Option<E::Instant> {
        self.typing.deadline()
    }

    /// Owned read-only view of the session.
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            phase: self.phase,
            status: self.status.clone(),
            status_text: self.status.to_string(),
            messages: self.messages.clone(),
            room: self.room.clone(),
            connected: self.connected,
            peer_typing: self.peer_typing,
            draft: self.draft.clone(),
        }
    }

    /// Lifecycle phase.
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Display status.
    pub fn status(&self) -> &SessionStatus {
        &self.status
    }

    /// Message log, oldest first.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Current room. `None` if not matched since the last new-match request.
    pub fn room(&self) -> Option<&RoomId> {
        self.room.as_ref()
    }

    /// Matched and the connection is live.
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Stranger is composing.
    pub fn peer_typing(&self) -> bool {
        self.peer_typing
    }

    /// Local input text.
    pub fn draft(&self) -> &str {
        &self.draft
    }

    /// Connection the session currently owns. `None` when torn down.
    pub fn connection(&self) -> Option<ConnectionId> {
        self.slot.map(|slot| slot.id)
    }
}

#[cfg(test)]
mod tests {
    use std::{
        future::Future,
        sync::{
            Arc,
            atomic::{AtomicU64, Ordering},
        },
    };

    use super::*;
    use crate::Sender;

    #[derive(Debug, Clone, Default)]
    struct TestEnv {
        millis: Arc<AtomicU64>,
    }

    impl TestEnv {
        fn set(&self, millis: u64) {
            self.millis.store(millis, Ordering::SeqCst);
        }
    }

    impl Environment for TestEnv {
        type Instant = Duration;

        fn now(&self) -> Duration {
            Duration::from_millis(self.millis.load(Ordering::SeqCst))
        }

        fn sleep(&self, _duration: Duration) -> impl Future<Output = ()> + Send {
            std::future::ready(())
        }
    }

    fn new_session() -> (ChatSession<TestEnv>, TestEnv) {
        let env = TestEnv::default();
        (ChatSession::new(env.clone(), SessionConfig::default()), env)
    }

    fn server(conn: ConnectionId, event: ServerEvent) -> SessionEvent<Duration> {
        SessionEvent::Server { conn, event }
    }

    /// Session matched into room `r1` on its first connection.
    fn matched() -> (ChatSession<TestEnv>, TestEnv, ConnectionId) {
        let (mut session, env) = new_session();
        session.handle(SessionEvent::Start);
        let conn = ConnectionId::new(0);
        session.handle(SessionEvent::TokenFetched { conn, token: "t".into() });
        session.handle(SessionEvent::TransportOpened { conn });
        session.handle(server(conn, ServerEvent::Matched { room_id: "r1".into() }));
        (session, env, conn)
    }

    fn emits(actions: &[SessionAction]) -> Vec<&ClientEvent> {
        actions
            .iter()
            .filter_map(|a| match a {
                SessionAction::Emit { event, .. } => Some(event),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn start_fetches_token_and_keeps_idle_status() {
        let (mut session, _) = new_session();
        let actions = session.handle(SessionEvent::Start);

        assert_eq!(actions, vec![
            SessionAction::FetchToken { conn: ConnectionId::new(0) },
            SessionAction::Render
        ]);
        assert_eq!(session.phase(), SessionPhase::Connecting);
        assert_eq!(session.status(), &SessionStatus::Idle);
    }

    #[test]
    fn token_opens_connection_then_waits_for_match() {
        let (mut session, _) = new_session();
        session.handle(SessionEvent::Start);
        let conn = ConnectionId::new(0);

        let actions = session.handle(SessionEvent::TokenFetched { conn, token: "abc".into() });
        assert_eq!(actions, vec![SessionAction::OpenConnection { conn, token: "abc".into() }]);

        session.handle(SessionEvent::TransportOpened { conn });
        assert_eq!(session.phase(), SessionPhase::WaitingForMatch);
    }

    #[test]
    fn token_failure_reports_auth_error_without_connection() {
        let (mut session, _) = new_session();
        session.handle(SessionEvent::Start);

        session.handle(SessionEvent::TokenFailed {
            conn: ConnectionId::new(0),
            reason: "connection refused".into(),
        });

        assert_eq!(session.status(), &SessionStatus::AuthError);
        assert_eq!(session.snapshot().status_text, "Error: Could not get auth token");
        assert_eq!(session.connection(), None);

        let actions = session.handle(SessionEvent::FindNew);
        assert!(actions.contains(&SessionAction::FetchToken { conn: ConnectionId::new(1) }));
        assert!(!actions.iter().any(|a| matches!(a, SessionAction::Teardown { .. })));
    }

    #[test]
    fn matched_joins_room() {
        let (mut session, _) = new_session();
        session.handle(SessionEvent::Start);
        let conn = ConnectionId::new(0);
        session.handle(SessionEvent::TokenFetched { conn, token: "t".into() });
        session.handle(SessionEvent::TransportOpened { conn });

        let actions = session.handle(server(conn, ServerEvent::Matched { room_id: "r1".into() }));

        assert_eq!(actions, vec![
            SessionAction::Emit { conn, event: ClientEvent::JoinRoom { room_id: "r1".into() } },
            SessionAction::Render,
        ]);
        assert!(session.is_connected());
        assert_eq!(session.room().map(RoomId::as_str), Some("r1"));
        assert_eq!(session.status(), &SessionStatus::Matched);
    }

    #[test]
    fn send_appends_once_and_emits_room_scoped() {
        let (mut session, _, conn) = matched();
        session.handle(SessionEvent::InputChanged { text: "hi".into() });

        let actions = session.handle(SessionEvent::SendMessage { text: "hi".into() });

        assert_eq!(emits(&actions), vec![
            &ClientEvent::ChatMessage { msg: "hi".into(), room_id: "r1".into() },
            &ClientEvent::Typing { room_id: "r1".into(), is_typing: false },
        ]);
        assert_eq!(session.draft(), "");

        // The server echoing our text back is a stranger message, never a
        // second copy of ours.
        session.handle(server(conn, ServerEvent::ChatMessage { msg: "hi".into() }));
        let senders: Vec<_> = session.messages().iter().map(|m| m.sender).collect();
        assert_eq!(senders, vec![Sender::You, Sender::Stranger]);
    }

    #[test]
    fn blank_or_disconnected_send_is_a_no_op() {
        let (mut session, _, conn) = matched();
        assert!(session.handle(SessionEvent::SendMessage { text: "   \t".into() }).is_empty());

        session.handle(server(conn, ServerEvent::UserDisconnected));
        assert!(session.handle(SessionEvent::SendMessage { text: "hello".into() }).is_empty());
        assert!(session.messages().is_empty());

        let (mut fresh, _) = new_session();
        assert!(fresh.handle(SessionEvent::SendMessage { text: "hello".into() }).is_empty());
    }

    #[test]
    fn user_disconnected_keeps_history_and_room() {
        let (mut session, _, conn) = matched();
        session.handle(server(conn, ServerEvent::ChatMessage { msg: "yo".into() }));
        session.handle(server(conn, ServerEvent::Typing { is_typing: true }));

        session.handle(server(conn, ServerEvent::UserDisconnected));

        assert!(!session.is_connected());
        assert!(!session.peer_typing());
        assert_eq!(session.messages(), &[Message::stranger("yo")]);
        assert_eq!(session.room().map(RoomId::as_str), Some("r1"));
        assert_eq!(session.phase(), SessionPhase::Ended);
        assert_eq!(session.status(), &SessionStatus::PeerDisconnected);
    }

    #[test]
    fn find_new_tears_down_before_fetching() {
        let (mut session, _, conn) = matched();
        session.handle(server(conn, ServerEvent::ChatMessage { msg: "yo".into() }));

        let actions = session.handle(SessionEvent::FindNew);

        assert_eq!(actions, vec![
            SessionAction::Teardown { conn },
            SessionAction::FetchToken { conn: ConnectionId::new(1) },
            SessionAction::Render,
        ]);
        assert!(session.messages().is_empty());
        assert_eq!(session.room(), None);
        assert_eq!(session.status(), &SessionStatus::Searching);
    }

    #[test]
    fn stale_events_are_dropped() {
        let (mut session, _, old) = matched();
        session.handle(SessionEvent::FindNew);
        let before = session.snapshot();

        for event in [
            ServerEvent::ChatMessage { msg: "late".into() },
            ServerEvent::Matched { room_id: "r0".into() },
            ServerEvent::Error { message: Some("old".into()) },
        ] {
            assert!(session.handle(server(old, event)).is_empty());
        }
        assert!(session.handle(SessionEvent::TokenFetched { conn: old, token: "x".into() }).is_empty());
        assert!(session.handle(SessionEvent::TransportClosed { conn: old, reason: "bye".into() }).is_empty());
        assert_eq!(session.snapshot(), before);
    }

    #[test]
    fn error_with_message_tears_down_without_retry() {
        let (mut session, _, conn) = matched();

        let actions = session.handle(server(conn, ServerEvent::Error { message: Some("room full".into()) }));

        assert_eq!(actions, vec![SessionAction::Teardown { conn }, SessionAction::Render]);
        assert_eq!(session.snapshot().status_text, "Error: room full");
        assert_eq!(session.phase(), SessionPhase::Errored);
        assert_eq!(session.connection(), None);
        assert!(session.handle(SessionEvent::InputChanged { text: "x".into() })
            .iter()
            .all(|a| !matches!(a, SessionAction::Emit { .. })));
    }

    #[test]
    fn error_without_message_is_ignored() {
        let (mut session, _, conn) = matched();
        let before = session.snapshot();

        assert!(session.handle(server(conn, ServerEvent::Error { message: None })).is_empty());
        assert_eq!(session.snapshot(), before);
    }

    #[test]
    fn handshake_rejection_shows_server_message() {
        let (mut session, _) = new_session();
        session.handle(SessionEvent::Start);
        let conn = ConnectionId::new(0);
        session.handle(SessionEvent::TokenFetched { conn, token: "t".into() });

        let actions =
            session.handle(server(conn, ServerEvent::Error { message: Some("bad token".into()) }));
        assert_eq!(actions, vec![SessionAction::Teardown { conn }, SessionAction::Render]);

        // The socket close that follows belongs to a torn-down connection.
        let closed = session.handle(SessionEvent::TransportClosed {
            conn,
            reason: "namespace connect rejected".into(),
        });
        assert!(closed.is_empty());
        assert_eq!(session.snapshot().status_text, "Error: bad token");
        assert_eq!(session.phase(), SessionPhase::Errored);
        assert_eq!(session.connection(), None);
    }

    #[test]
    fn only_errors_are_accepted_before_the_namespace_opens() {
        let (mut session, _) = new_session();
        session.handle(SessionEvent::Start);
        let conn = ConnectionId::new(0);
        session.handle(SessionEvent::TokenFetched { conn, token: "t".into() });

        assert!(session.handle(server(conn, ServerEvent::Matched { room_id: "r1".into() })).is_empty());
        assert!(session.handle(server(conn, ServerEvent::Error { message: None })).is_empty());
        assert_eq!(session.room(), None);
        assert_eq!(session.phase(), SessionPhase::Connecting);
    }

    #[test]
    fn typing_false_once_after_quiet_period() {
        let (mut session, env, _) = matched();

        for (at, text) in [(0, "h"), (500, "he"), (1000, "hey")] {
            env.set(at);
            let actions = session.handle(SessionEvent::InputChanged { text: text.into() });
            assert_eq!(emits(&actions), vec![&ClientEvent::Typing {
                room_id: "r1".into(),
                is_typing: true
            }]);
        }

        assert!(session.handle(SessionEvent::Tick { now: Duration::from_millis(1500) }).is_empty());
        assert!(session.handle(SessionEvent::Tick { now: Duration::from_millis(2000) }).is_empty());
        assert_eq!(session.next_deadline(), Some(Duration::from_millis(2500)));

        let actions = session.handle(SessionEvent::Tick { now: Duration::from_millis(2500) });
        assert_eq!(emits(&actions), vec![&ClientEvent::Typing { room_id: "r1".into(), is_typing: false }]);
        assert_eq!(session.next_deadline(), None);
    }

    #[test]
    fn leaving_matched_clears_typing_timer() {
        let (mut session, _, conn) = matched();
        session.handle(SessionEvent::InputChanged { text: "h".into() });
        assert!(session.next_deadline().is_some());

        session.handle(server(conn, ServerEvent::UserDisconnected));
        assert_eq!(session.next_deadline(), None);
    }

    #[test]
    fn teardown_is_idempotent() {
        let (mut session, _, conn) = matched();
        assert_eq!(session.teardown(), vec![SessionAction::Teardown { conn }]);
        assert!(session.teardown().is_empty());
        assert!(!session.is_connected());
    }

    #[test]
    fn transport_loss_is_a_connection_error() {
        let (mut session, _, conn) = matched();
        session.handle(SessionEvent::TransportClosed { conn, reason: "heartbeat timeout".into() });

        assert_eq!(session.status(), &SessionStatus::ConnectionError("heartbeat timeout".into()));
        assert_eq!(session.connection(), None);
    }
}
