//! Generic runtime for application orchestration.
//!
//! The Runtime drives the application event loop, coordinating between:
//! - [`ChatSession`]: chat state machine
//! - [`PresenceChannel`]: online-user feed
//! - [`TokenProvider`]: credentials for new chat connections
//! - [`Driver`]: platform-specific I/O

use std::collections::VecDeque;

use annochat_core::env::Environment;
use tokio::sync::watch;

use crate::{
    AppEvent, AppView, ChatSession, Driver, KeyInput, PresenceAction, PresenceChannel,
    SessionAction, SessionConfig, SessionEvent, TokenProvider,
};

/// Work queued while executing a batch of actions.
#[derive(Debug)]
enum Pending {
    Session(SessionAction),
    Presence(PresenceAction),
}

/// Generic runtime that orchestrates the state machines and the driver.
///
/// # Type Parameters
///
/// - `D`: Platform-specific I/O driver
/// - `E`: Environment providing the clock
/// - `T`: Token provider for chat connections
pub struct Runtime<D, E, T>
where
    D: Driver<Instant = E::Instant>,
    E: Environment,
    T: TokenProvider,
{
    driver: D,
    env: E,
    tokens: T,
    session: ChatSession<E>,
    presence: PresenceChannel,
    view: watch::Sender<AppView>,
}

impl<D, E, T> Runtime<D, E, T>
where
    D: Driver<Instant = E::Instant>,
    E: Environment,
    T: TokenProvider,
{
    /// Create a new runtime with the given driver, environment and token
    /// provider.
    pub fn new(driver: D, env: E, tokens: T, config: SessionConfig) -> Self {
        let session = ChatSession::new(env.clone(), config);
        let presence = PresenceChannel::new();
        let (view, _) = watch::channel(Self::view_of(&session, &presence));
        Self { driver, env, tokens, session, presence, view }
    }

    /// Receive a fresh [`AppView`] after every state change.
    pub fn subscribe(&self) -> watch::Receiver<AppView> {
        self.view.subscribe()
    }

    /// Run the main event loop until the driver reports quit.
    ///
    /// Activates presence and the chat session, then loops:
    /// 1. Polls the driver for the next event, bounded by the session's
    ///    typing deadline
    /// 2. Feeds it to the owning state machine
    /// 3. Executes the resulting actions
    ///
    /// On quit the session and presence are torn down before the driver
    /// stops.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver encounters an I/O error.
    pub async fn run(&mut self) -> Result<(), D::Error> {
        self.render()?;

        let mut startup: Vec<Pending> =
            self.presence.connect().into_iter().map(Pending::Presence).collect();
        startup.extend(self.session.start().into_iter().map(Pending::Session));
        self.execute(startup).await?;

        loop {
            let deadline = self.session.next_deadline();
            if let Some(event) = self.driver.poll_event(deadline).await?
                && self.handle_event(event).await?
            {
                break;
            }

            let now = self.env.now();
            let actions = self.session.handle(SessionEvent::Tick { now });
            self.execute(actions.into_iter().map(Pending::Session).collect()).await?;
        }

        self.shutdown().await?;
        self.driver.stop();
        Ok(())
    }

    /// Process one driver event.
    ///
    /// Returns `true` if the application should quit.
    async fn handle_event(&mut self, event: AppEvent<E::Instant>) -> Result<bool, D::Error> {
        let pending = match event {
            AppEvent::Quit | AppEvent::Key(KeyInput::Esc) => return Ok(true),
            AppEvent::Key(key) => match key.to_session_event(self.session.draft()) {
                Some(event) => self.session_actions(event),
                None => return Ok(false),
            },
            AppEvent::Session(event) => self.session_actions(event),
            AppEvent::Presence(event) => {
                self.presence.handle(event).into_iter().map(Pending::Presence).collect()
            },
            AppEvent::Resize(..) => vec![Pending::Session(SessionAction::Render)],
            // Deadlines are checked after every event
            AppEvent::Tick => return Ok(false),
        };
        self.execute(pending).await?;
        Ok(false)
    }

    fn session_actions(&mut self, event: SessionEvent<E::Instant>) -> Vec<Pending> {
        self.session.handle(event).into_iter().map(Pending::Session).collect()
    }

    /// Execute actions until no follow-up work remains.
    ///
    /// Iterative rather than recursive: follow-up actions (the result of a
    /// token fetch) are queued behind the current batch. Renders are
    /// coalesced into one per batch.
    async fn execute(&mut self, initial: Vec<Pending>) -> Result<(), D::Error> {
        let mut queue = VecDeque::from(initial);
        let mut dirty = false;

        while let Some(pending) = queue.pop_front() {
            match pending {
                Pending::Session(SessionAction::FetchToken { conn }) => {
                    let event = match self.tokens.fetch_token().await {
                        Ok(token) => SessionEvent::TokenFetched { conn, token },
                        Err(e) => SessionEvent::TokenFailed { conn, reason: e.to_string() },
                    };
                    queue.extend(self.session.handle(event).into_iter().map(Pending::Session));
                },
                Pending::Session(SessionAction::OpenConnection { conn, token }) => {
                    self.driver.open_chat(conn, token)?;
                },
                Pending::Session(SessionAction::Teardown { conn }) => self.driver.close_chat(conn),
                Pending::Session(SessionAction::Emit { conn, event }) => {
                    self.driver.emit_chat(conn, event)?;
                },
                Pending::Presence(PresenceAction::Open) => self.driver.open_presence()?,
                Pending::Presence(PresenceAction::Close) => self.driver.close_presence(),
                Pending::Session(SessionAction::Render) | Pending::Presence(PresenceAction::Render) => {
                    dirty = true;
                },
            }
        }

        if dirty {
            self.render()?;
        }
        Ok(())
    }

    /// Explicit app teardown: close the chat connection and presence.
    async fn shutdown(&mut self) -> Result<(), D::Error> {
        let mut pending: Vec<Pending> =
            self.session.teardown().into_iter().map(Pending::Session).collect();
        pending.extend(self.presence.disconnect().into_iter().map(Pending::Presence));
        self.execute(pending).await
    }

    fn render(&mut self) -> Result<(), D::Error> {
        let view = Self::view_of(&self.session, &self.presence);
        self.view.send_replace(view.clone());
        self.driver.render(&view)
    }

    fn view_of(session: &ChatSession<E>, presence: &PresenceChannel) -> AppView {
        AppView {
            session: session.snapshot(),
            online_users: presence.online_users(),
            presence: presence.state(),
        }
    }

    /// Current view.
    pub fn view(&self) -> AppView {
        Self::view_of(&self.session, &self.presence)
    }

    /// The chat session.
    pub fn session(&self) -> &ChatSession<E> {
        &self.session
    }

    /// The presence channel.
    pub fn presence(&self) -> &PresenceChannel {
        &self.presence
    }

    /// The driver.
    pub fn driver(&self) -> &D {
        &self.driver
    }
}
