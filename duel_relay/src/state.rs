// Session state store for the duel relay.
//
// `SessionState` holds the authoritative per-slot data: avatar position and
// flags (`PlayerState`) and health. It is a fixed two-entry table indexed by
// `Slot`; records are created at spawn defaults when the session starts and
// are only ever rewritten, never removed.
//
// This module does no I/O. `session.rs` calls these methods and then
// announces the result, so every mutation here precedes its broadcast.
//
// Health invariant: every slot's health stays in `0..=MAX_HEALTH`. Damage
// saturates at 0, and a slot that reaches 0 is immediately respawned (full
// health, spawn position), so 0 is never observable after a call returns.

use duel_protocol::{
    DAMAGE_PER_HIT, MAX_HEALTH, PlayerState, Presence, SLOT_COUNT, Slot, SlotPair,
};

/// Authoritative record for one slot.
#[derive(Clone, Copy, Debug, PartialEq)]
struct SlotRecord {
    player: PlayerState,
    health: u32,
}

impl SlotRecord {
    fn spawn(slot: Slot) -> Self {
        Self {
            player: PlayerState::spawn(slot),
            health: MAX_HEALTH,
        }
    }
}

/// Result of applying one hit's damage to a slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HitOutcome {
    /// Health dropped but stayed above zero.
    Wounded { remaining: u32 },
    /// Health reached zero; the slot was respawned at full health.
    Respawned,
}

/// Per-slot player and health tables.
#[derive(Clone, Debug)]
pub struct SessionState {
    slots: [SlotRecord; SLOT_COUNT],
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            slots: Slot::ALL.map(SlotRecord::spawn),
        }
    }

    pub fn player(&self, slot: Slot) -> &PlayerState {
        &self.slots[slot.index()].player
    }

    pub fn health(&self, slot: Slot) -> u32 {
        self.slots[slot.index()].health
    }

    pub fn set_connected(&mut self, slot: Slot, connected: bool) {
        self.slots[slot.index()].player.connected = connected;
    }

    /// Overwrite a slot's avatar from a `state` update. Coordinates that are
    /// `None` keep their previous value; flags are always overwritten.
    /// Returns the updated record.
    pub fn apply_state(
        &mut self,
        slot: Slot,
        x: Option<f64>,
        y: Option<f64>,
        flip_x: bool,
        moving: bool,
    ) -> PlayerState {
        let player = &mut self.slots[slot.index()].player;
        if let Some(x) = x {
            player.x = x;
        }
        if let Some(y) = y {
            player.y = y;
        }
        player.flip_x = flip_x;
        player.moving = moving;
        *player
    }

    /// Apply one hit's worth of damage to `slot`.
    pub fn apply_hit(&mut self, slot: Slot) -> HitOutcome {
        let record = &mut self.slots[slot.index()];
        record.health = record.health.saturating_sub(DAMAGE_PER_HIT);
        if record.health == 0 {
            self.respawn(slot);
            HitOutcome::Respawned
        } else {
            HitOutcome::Wounded {
                remaining: record.health,
            }
        }
    }

    /// Reset a slot to full health at its spawn point, facing right and
    /// standing still. The connected flag is left alone.
    pub fn respawn(&mut self, slot: Slot) {
        let record = &mut self.slots[slot.index()];
        let connected = record.player.connected;
        *record = SlotRecord::spawn(slot);
        record.player.connected = connected;
    }

    pub fn players(&self) -> SlotPair<PlayerState> {
        SlotPair::from_fn(|slot| *self.player(slot))
    }

    pub fn health_values(&self) -> SlotPair<u32> {
        SlotPair::from_fn(|slot| self.health(slot))
    }

    pub fn presence(&self) -> SlotPair<Presence> {
        SlotPair::from_fn(|slot| Presence {
            connected: self.player(slot).connected,
        })
    }
}
