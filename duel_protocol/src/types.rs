// Core types for the duel protocol.
//
// `Slot` is the relay-assigned seat (1 or 2), serialized as a bare number on
// the wire. `PlayerState` is the per-slot record the relay keeps and echoes in
// `welcome`/`player_joined`. `SlotPair<T>` is the `{"1": T, "2": T}` object
// shape used by every per-slot snapshot (`players`, `health`, `presence`).
//
// The gameplay constants live here too so that clients and the relay agree on
// them: the relay enforces them, clients use them to render health bars and
// respawn positions.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Health every slot starts with and respawns with.
pub const MAX_HEALTH: u32 = 100;

/// Health removed by one validated `hit`.
pub const DAMAGE_PER_HIT: u32 = 12;

/// Number of seats in a session.
pub const SLOT_COUNT: usize = 2;

/// One of the two fixed seats in a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Slot {
    One,
    Two,
}

/// A slot number outside `1..=2`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
#[error("invalid slot number {0} (expected 1 or 2)")]
pub struct InvalidSlot(pub u8);

impl Slot {
    /// All slots in allocation order. Admission walks this front to back, so
    /// the lowest free slot always wins.
    pub const ALL: [Slot; SLOT_COUNT] = [Slot::One, Slot::Two];

    /// Zero-based index into per-slot tables.
    pub fn index(self) -> usize {
        match self {
            Slot::One => 0,
            Slot::Two => 1,
        }
    }

    /// The wire number (1 or 2).
    pub fn number(self) -> u8 {
        match self {
            Slot::One => 1,
            Slot::Two => 2,
        }
    }

    /// Fixed spawn coordinates for this slot.
    pub fn spawn_point(self) -> (f64, f64) {
        match self {
            Slot::One => (384.0, 576.0),
            Slot::Two => (504.0, 456.0),
        }
    }
}

impl TryFrom<u8> for Slot {
    type Error = InvalidSlot;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Slot::One),
            2 => Ok(Slot::Two),
            other => Err(InvalidSlot(other)),
        }
    }
}

impl From<Slot> for u8 {
    fn from(slot: Slot) -> u8 {
        slot.number()
    }
}

impl std::fmt::Display for Slot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.number())
    }
}

/// Position, orientation and presence of one slot's avatar.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayerState {
    pub x: f64,
    pub y: f64,
    /// Mirrors the sprite's horizontal flip.
    #[serde(rename = "flipX")]
    pub flip_x: bool,
    pub moving: bool,
    pub connected: bool,
}

impl PlayerState {
    /// A freshly spawned, disconnected avatar for `slot`.
    pub fn spawn(slot: Slot) -> Self {
        let (x, y) = slot.spawn_point();
        Self {
            x,
            y,
            flip_x: false,
            moving: false,
            connected: false,
        }
    }
}

/// Connected flag for one slot, as carried by `presence`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Presence {
    pub connected: bool,
}

/// A value per slot, serialized as `{"1": .., "2": ..}`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotPair<T> {
    #[serde(rename = "1")]
    pub one: T,
    #[serde(rename = "2")]
    pub two: T,
}

impl<T> SlotPair<T> {
    /// Build a pair by evaluating `f` for slot 1 then slot 2.
    pub fn from_fn(mut f: impl FnMut(Slot) -> T) -> Self {
        Self {
            one: f(Slot::One),
            two: f(Slot::Two),
        }
    }
}
