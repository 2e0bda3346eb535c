// Session for the duel relay.
//
// `Session` is the central data structure that `server.rs` drives. It owns the
// per-slot game state (`state.rs`), the slot→connection bindings, and the
// admitted connections' outboxes (`transport.rs`). All mutation happens through
// methods called from the server's single session task, one event at a time,
// so there is no internal locking and every event is handled atomically.
//
// Key responsibilities:
// - Admission (`admit`): lowest free slot wins; a third connection gets a
//   `full` event and a close, and the session is left untouched.
// - Routing (`handle_frame`): decode a client frame, check the sender is
//   bound to a slot, and dispatch `state` / `shoot` / `hit`. Malformed frames,
//   unknown kinds, and invalid hit targets are dropped without reply.
// - Lifecycle (`disconnect`): free the slot, respawn it, notify the peer.
//
// Ordering: within one event, state is mutated first and then announced.
// Admission sends `welcome` to the newcomer before `player_joined` goes to the
// peer, followed by `presence` and `health` to everyone.

use duel_protocol::{ClientMessage, DecodeError, PlayerState, SLOT_COUNT, ServerMessage, Slot};
use thiserror::Error;
use tracing::{debug, info};

use crate::state::{HitOutcome, SessionState};
use crate::transport::{ConnectionId, Connections, Outbound, Outbox, send_direct};

/// Text of the `full` rejection event.
pub const ROOM_FULL_MESSAGE: &str = "Room full (2 players max).";

/// Why a connection was not admitted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum AdmissionError {
    #[error("room full (2 players max)")]
    RoomFull,
}

/// Relay session managing one two-player duel.
#[derive(Debug, Default)]
pub struct Session {
    state: SessionState,
    bindings: [Option<ConnectionId>; SLOT_COUNT],
    connections: Connections,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Try to seat a new connection. On success, the connection is tracked
    /// and receives `welcome`; the peer receives `player_joined`; everyone
    /// receives `presence` and `health`.
    ///
    /// On `RoomFull`, `full` and a close are pushed straight to `outbox` and
    /// nothing in the session changes.
    pub fn admit(&mut self, id: ConnectionId, outbox: Outbox) -> Result<Slot, AdmissionError> {
        let Some(slot) = self.free_slot() else {
            send_direct(
                &outbox,
                &ServerMessage::Full {
                    message: ROOM_FULL_MESSAGE.into(),
                },
            );
            let _ = outbox.try_send(Outbound::Close);
            info!(connection = id, "rejected connection: room full");
            return Err(AdmissionError::RoomFull);
        };

        self.bindings[slot.index()] = Some(id);
        self.connections.insert(id, outbox);
        self.state.set_connected(slot, true);
        info!(connection = id, %slot, "player joined");

        let welcome = ServerMessage::Welcome {
            slot,
            players: self.state.players(),
            health: self.state.health_values(),
        };
        self.connections.unicast(id, &welcome);

        let joined = ServerMessage::PlayerJoined {
            slot,
            state: *self.state.player(slot),
        };
        self.connections.broadcast(&joined, Some(id));
        self.broadcast_presence();
        self.broadcast_health();

        Ok(slot)
    }

    /// Handle one inbound text frame from `id`.
    pub fn handle_frame(&mut self, id: ConnectionId, text: &str) {
        match duel_protocol::decode_client(text) {
            Ok(msg) => self.handle_message(id, msg),
            Err(DecodeError::UnknownType(kind)) => {
                debug!(connection = id, kind = %kind, "ignoring unknown message type");
            }
            Err(e) => {
                debug!(connection = id, error = %e, "dropping malformed frame");
            }
        }
    }

    /// Dispatch a decoded client message from `id`. Messages from connections
    /// that are not bound to a slot are dropped.
    pub fn handle_message(&mut self, id: ConnectionId, msg: ClientMessage) {
        let Some(from) = self.slot_of(id) else {
            debug!(connection = id, kind = msg.kind(), "dropping message from unseated connection");
            return;
        };

        match msg {
            ClientMessage::State {
                x,
                y,
                flip_x,
                moving,
            } => self.update_state(id, from, x, y, flip_x, moving),
            ClientMessage::Shoot { x, y, dx, dy } => self.relay_shot(id, from, x, y, dx, dy),
            ClientMessage::Hit { target_slot } => self.resolve_hit(from, target_slot),
        }
    }

    /// Connection `id` went away. Frees the slot it owns, if any. Rejected,
    /// unknown and already-released connections own no slot, so their close
    /// changes nothing.
    pub fn disconnect(&mut self, id: ConnectionId) {
        self.connections.remove(id);
        let Some(slot) = self.slot_of(id) else {
            debug!(connection = id, "close from connection without a slot");
            return;
        };

        self.bindings[slot.index()] = None;
        self.state.set_connected(slot, false);
        self.state.respawn(slot);
        info!(connection = id, %slot, "player left");

        self.connections
            .broadcast(&ServerMessage::PlayerLeft { slot }, None);
        self.broadcast_presence();
        self.broadcast_health();
    }

    /// Close every admitted connection (server shutdown).
    pub fn close_all(&self) {
        self.connections.close_all();
    }

    /// The slot `id` is bound to, if any. The slot bindings are the only
    /// record of ownership.
    pub fn slot_of(&self, id: ConnectionId) -> Option<Slot> {
        Slot::ALL
            .into_iter()
            .find(|slot| self.bindings[slot.index()] == Some(id))
    }

    /// Whether `slot` currently has a live connection.
    pub fn occupied(&self, slot: Slot) -> bool {
        self.bindings[slot.index()].is_some()
    }

    pub fn player(&self, slot: Slot) -> &PlayerState {
        self.state.player(slot)
    }

    pub fn health(&self, slot: Slot) -> u32 {
        self.state.health(slot)
    }

    /// Number of admitted connections (0, 1 or 2).
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    fn free_slot(&self) -> Option<Slot> {
        Slot::ALL.into_iter().find(|slot| !self.occupied(*slot))
    }

    fn update_state(
        &mut self,
        id: ConnectionId,
        from: Slot,
        x: Option<f64>,
        y: Option<f64>,
        flip_x: bool,
        moving: bool,
    ) {
        let player = self.state.apply_state(from, x, y, flip_x, moving);
        self.connections
            .broadcast(&ServerMessage::state_of(from, &player), Some(id));
    }

    fn relay_shot(
        &self,
        id: ConnectionId,
        from: Slot,
        x: Option<f64>,
        y: Option<f64>,
        dx: Option<f64>,
        dy: Option<f64>,
    ) {
        let shooter = self.state.player(from);
        let shot = ServerMessage::Shoot {
            slot: from,
            x: x.unwrap_or(shooter.x),
            y: y.unwrap_or(shooter.y),
            dx: dx.unwrap_or(0.0),
            dy: dy.unwrap_or(0.0),
        };
        self.connections.broadcast(&shot, Some(id));
    }

    fn resolve_hit(&mut self, from: Slot, target: Option<Slot>) {
        let Some(target) = target else {
            debug!(%from, "dropping hit with invalid target");
            return;
        };
        if target == from {
            debug!(%from, "dropping self-targeted hit");
            return;
        }

        match self.state.apply_hit(target) {
            HitOutcome::Respawned => {
                info!(%target, by = %from, "player defeated, respawning");
                let respawn = ServerMessage::state_of(target, self.state.player(target));
                self.connections.broadcast(&respawn, None);
            }
            HitOutcome::Wounded { remaining } => {
                debug!(%target, by = %from, remaining, "player hit");
            }
        }
        self.broadcast_health();
    }

    fn broadcast_presence(&self) {
        self.connections.broadcast(
            &ServerMessage::Presence {
                players: self.state.presence(),
            },
            None,
        );
    }

    fn broadcast_health(&self) {
        self.connections.broadcast(
            &ServerMessage::Health {
                values: self.state.health_values(),
            },
            None,
        );
    }
}
