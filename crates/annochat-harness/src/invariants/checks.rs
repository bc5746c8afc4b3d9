//! Standard invariant checks.
//!
//! Each check looks at one property of the connection lifecycle or the
//! rendered view that must hold after any sequence of events.

use std::collections::{BTreeSet, HashSet};

use annochat_app::ConnectionId;
use annochat_proto::{ClientEvent, RoomId};

use super::{Invariant, InvariantResult, Observation, Violation};
use crate::DriverCall;

/// At most one chat connection is open at a time.
///
/// Every `open_chat` after the first must be preceded by closing the
/// previous connection.
pub struct SingleConnection;

impl Invariant for SingleConnection {
    fn name(&self) -> &'static str {
        "single_connection"
    }

    fn check(&self, state: &Observation) -> InvariantResult {
        let mut open = BTreeSet::new();
        for call in &state.calls {
            match call {
                DriverCall::OpenChat { conn, .. } => {
                    open.insert(*conn);
                    if open.len() > 1 {
                        return Err(Violation {
                            invariant: self.name(),
                            message: format!("opened {conn} while {open:?} open"),
                        });
                    }
                },
                DriverCall::CloseChat { conn } => {
                    open.remove(conn);
                },
                _ => {},
            }
        }
        Ok(())
    }
}

/// Nothing is emitted on a connection that is not open.
///
/// Covers both connections never opened and connections already torn
/// down: a closed connection stays silent forever.
pub struct NoEmitAfterClose;

impl Invariant for NoEmitAfterClose {
    fn name(&self) -> &'static str {
        "no_emit_after_close"
    }

    fn check(&self, state: &Observation) -> InvariantResult {
        let mut open: HashSet<ConnectionId> = HashSet::new();
        for call in &state.calls {
            match call {
                DriverCall::OpenChat { conn, .. } => {
                    open.insert(*conn);
                },
                DriverCall::CloseChat { conn } => {
                    open.remove(conn);
                },
                DriverCall::EmitChat { conn, event, .. } if !open.contains(conn) => {
                    return Err(Violation {
                        invariant: self.name(),
                        message: format!("{} emitted on {conn} which is not open", event.name()),
                    });
                },
                _ => {},
            }
        }
        Ok(())
    }
}

/// Chat messages and typing signals only go to a room already joined on
/// the same connection.
pub struct JoinBeforeEmit;

impl Invariant for JoinBeforeEmit {
    fn name(&self) -> &'static str {
        "join_before_emit"
    }

    fn check(&self, state: &Observation) -> InvariantResult {
        let mut joined: HashSet<(ConnectionId, RoomId)> = HashSet::new();
        for call in &state.calls {
            let DriverCall::EmitChat { conn, event, .. } = call else {
                continue;
            };
            match event {
                ClientEvent::JoinRoom { room_id } => {
                    joined.insert((*conn, room_id.clone()));
                },
                ClientEvent::ChatMessage { room_id, .. } | ClientEvent::Typing { room_id, .. } => {
                    if !joined.contains(&(*conn, room_id.clone())) {
                        return Err(Violation {
                            invariant: self.name(),
                            message: format!(
                                "{} for room {room_id} on {conn} before joining",
                                event.name()
                            ),
                        });
                    }
                },
            }
        }
        Ok(())
    }
}

/// The stranger can only be shown typing while the chat is live.
pub struct TypingRequiresConnection;

impl Invariant for TypingRequiresConnection {
    fn name(&self) -> &'static str {
        "typing_requires_connection"
    }

    fn check(&self, state: &Observation) -> InvariantResult {
        let session = &state.view.session;
        if session.peer_typing && !session.connected {
            return Err(Violation {
                invariant: self.name(),
                message: format!("peer typing shown while disconnected ({:?})", session.phase),
            });
        }
        Ok(())
    }
}

/// A non-empty message log belongs to a room.
///
/// Messages are only added inside a room, and the log is cleared whenever
/// the room is.
pub struct LogRequiresRoom;

impl Invariant for LogRequiresRoom {
    fn name(&self) -> &'static str {
        "log_requires_room"
    }

    fn check(&self, state: &Observation) -> InvariantResult {
        let session = &state.view.session;
        if !session.messages.is_empty() && session.room.is_none() {
            return Err(Violation {
                invariant: self.name(),
                message: format!("{} messages without a room", session.messages.len()),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use annochat_app::{AppView, Message, SessionSnapshot};

    use super::*;
    use crate::SimInstant;

    fn conn(n: u64) -> ConnectionId {
        ConnectionId::new(n)
    }

    fn observation(calls: Vec<DriverCall>) -> Observation {
        Observation { calls, ..Observation::default() }
    }

    fn emit(conn: ConnectionId, event: ClientEvent) -> DriverCall {
        DriverCall::EmitChat { conn, event, at: SimInstant::ZERO }
    }

    #[test]
    fn reopening_after_close_is_fine() {
        let state = observation(vec![
            DriverCall::OpenChat { conn: conn(0), token: "a".into() },
            DriverCall::CloseChat { conn: conn(0) },
            DriverCall::OpenChat { conn: conn(1), token: "b".into() },
        ]);
        assert!(SingleConnection.check(&state).is_ok());
    }

    #[test]
    fn overlapping_connections_are_caught() {
        let state = observation(vec![
            DriverCall::OpenChat { conn: conn(0), token: "a".into() },
            DriverCall::OpenChat { conn: conn(1), token: "b".into() },
        ]);
        assert_eq!(SingleConnection.check(&state).map_err(|v| v.invariant), Err("single_connection"));
    }

    #[test]
    fn emit_after_teardown_is_caught() {
        let join = ClientEvent::JoinRoom { room_id: "r".into() };
        let state = observation(vec![
            DriverCall::OpenChat { conn: conn(0), token: "a".into() },
            emit(conn(0), join.clone()),
            DriverCall::CloseChat { conn: conn(0) },
            emit(conn(0), join),
        ]);
        assert!(NoEmitAfterClose.check(&state).is_err());
    }

    #[test]
    fn typing_needs_join_on_same_connection() {
        let room: RoomId = "r".into();
        let state = observation(vec![
            emit(conn(0), ClientEvent::JoinRoom { room_id: room.clone() }),
            emit(conn(1), ClientEvent::Typing { room_id: room, is_typing: true }),
        ]);
        assert!(JoinBeforeEmit.check(&state).is_err());
    }

    #[test]
    fn view_checks() {
        let mut view = AppView {
            session: SessionSnapshot { peer_typing: true, ..SessionSnapshot::default() },
            ..AppView::default()
        };
        assert!(TypingRequiresConnection.check(&Observation::of_view(view.clone())).is_err());

        view.session.peer_typing = false;
        view.session.messages.push(Message::stranger("hi"));
        assert!(LogRequiresRoom.check(&Observation::of_view(view.clone())).is_err());

        view.session.room = Some("r".into());
        assert!(LogRequiresRoom.check(&Observation::of_view(view)).is_ok());
    }
}
