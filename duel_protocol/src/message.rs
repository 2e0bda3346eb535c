// Protocol messages for client-relay communication.
//
// Two enums define the full protocol vocabulary:
// - `ClientMessage`: sent by game clients to the relay.
// - `ServerMessage`: sent by the relay to game clients.
//
// Both are internally tagged by a `type` field with snake_case names, matching
// the JSON events the browser clients exchange (`{"type":"state",...}`).
//
// `ClientMessage` fields are optional where the relay tolerates missing or
// garbage values: an absent or non-numeric `x` means "keep the last known
// position", an absent `dx` means 0, an out-of-range `targetSlot` decodes to
// `None` and the relay drops the hit. Decoding from untrusted text goes
// through `codec::decode_client`, which coerces loosely typed JSON into these
// fields, so `ClientMessage` has no `Deserialize` impl.

use serde::{Deserialize, Serialize};

use crate::types::{PlayerState, Presence, Slot, SlotPair};

/// Messages sent by a client to the relay.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Periodic avatar sync from the slot's owner.
    State {
        #[serde(skip_serializing_if = "Option::is_none")]
        x: Option<f64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        y: Option<f64>,
        #[serde(rename = "flipX")]
        flip_x: bool,
        moving: bool,
    },
    /// A shot fired. Origin defaults to the shooter's last known position.
    Shoot {
        #[serde(skip_serializing_if = "Option::is_none")]
        x: Option<f64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        y: Option<f64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        dx: Option<f64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        dy: Option<f64>,
    },
    /// The sender's projectile struck `target_slot`.
    Hit {
        #[serde(rename = "targetSlot", skip_serializing_if = "Option::is_none")]
        target_slot: Option<Slot>,
    },
}

/// Messages sent by the relay to a client.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Admission accepted: the assigned slot plus a full session snapshot.
    Welcome {
        slot: Slot,
        players: SlotPair<PlayerState>,
        health: SlotPair<u32>,
    },
    /// Admission refused. The relay closes the connection right after.
    Full { message: String },
    /// The other seat was taken.
    PlayerJoined { slot: Slot, state: PlayerState },
    /// A seat was vacated.
    PlayerLeft { slot: Slot },
    /// Connected flags for both seats.
    Presence { players: SlotPair<Presence> },
    /// Health for both seats.
    Health { values: SlotPair<u32> },
    /// Avatar sync for one slot (relayed, or forced after a respawn).
    State {
        slot: Slot,
        x: f64,
        y: f64,
        #[serde(rename = "flipX")]
        flip_x: bool,
        moving: bool,
    },
    /// A shot relayed from `slot`.
    Shoot {
        slot: Slot,
        x: f64,
        y: f64,
        dx: f64,
        dy: f64,
    },
}

impl ServerMessage {
    /// A `state` event carrying `player`'s current fields.
    pub fn state_of(slot: Slot, player: &PlayerState) -> Self {
        ServerMessage::State {
            slot,
            x: player.x,
            y: player.y,
            flip_x: player.flip_x,
            moving: player.moving,
        }
    }

    /// The wire `type` tag, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            ServerMessage::Welcome { .. } => "welcome",
            ServerMessage::Full { .. } => "full",
            ServerMessage::PlayerJoined { .. } => "player_joined",
            ServerMessage::PlayerLeft { .. } => "player_left",
            ServerMessage::Presence { .. } => "presence",
            ServerMessage::Health { .. } => "health",
            ServerMessage::State { .. } => "state",
            ServerMessage::Shoot { .. } => "shoot",
        }
    }
}

impl ClientMessage {
    /// The wire `type` tag, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            ClientMessage::State { .. } => "state",
            ClientMessage::Shoot { .. } => "shoot",
            ClientMessage::Hit { .. } => "hit",
        }
    }
}
