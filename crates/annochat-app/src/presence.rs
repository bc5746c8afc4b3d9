//! Presence feed state machine.
//!
//! One long-lived connection per application run, independent of the chat
//! session and unauthenticated. The last count survives socket loss; there is
//! no reconnect.

use crate::{PresenceAction, PresenceEvent, PresenceState};

/// Online-user count tracker.
#[derive(Debug, Clone)]
pub struct PresenceChannel {
    state: PresenceState,
    online_users: u64,
}

impl Default for PresenceChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl PresenceChannel {
    /// Disconnected channel with a zero count.
    pub fn new() -> Self {
        Self { state: PresenceState::Disconnected, online_users: 0 }
    }

    /// Open the presence socket. No-op unless disconnected.
    pub fn connect(&mut self) -> Vec<PresenceAction> {
        if self.state != PresenceState::Disconnected {
            return vec![];
        }
        self.state = PresenceState::Connecting;
        vec![PresenceAction::Open, PresenceAction::Render]
    }

    /// Close the presence socket. Idempotent.
    pub fn disconnect(&mut self) -> Vec<PresenceAction> {
        if self.state == PresenceState::Disconnected {
            return vec![];
        }
        self.state = PresenceState::Disconnected;
        vec![PresenceAction::Close, PresenceAction::Render]
    }

    /// Process an event and return actions.
    pub fn handle(&mut self, event: PresenceEvent) -> Vec<PresenceAction> {
        if self.state == PresenceState::Disconnected {
            tracing::debug!(?event, "dropping presence event while disconnected");
            return vec![];
        }
        match event {
            PresenceEvent::Opened => {
                self.state = PresenceState::Connected;
                vec![PresenceAction::Render]
            },
            PresenceEvent::OnlineUsers(count) => {
                self.online_users = count;
                vec![PresenceAction::Render]
            },
            PresenceEvent::Closed { reason } => {
                tracing::warn!(%reason, "presence connection lost");
                self.state = PresenceState::Disconnected;
                vec![PresenceAction::Render]
            },
        }
    }

    /// Connection state.
    pub fn state(&self) -> PresenceState {
        self.state
    }

    /// Last reported online-user count.
    pub fn online_users(&self) -> u64 {
        self.online_users
    }
}
