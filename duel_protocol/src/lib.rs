// duel_protocol — wire protocol for the two-slot duel relay.
//
// This crate defines the message types, gameplay constants, and text-frame
// codec used by the relay (`duel_relay`) and game clients to communicate over
// WebSocket. It is shared between both sides and has no networking code.
//
// Module overview:
// - `types.rs`:    `Slot`, `PlayerState`, `Presence`, the `{"1":..,"2":..}`
//                  `SlotPair` shape, and the health/damage constants.
// - `message.rs`:  Client-to-relay and relay-to-client message enums.
// - `codec.rs`:    One JSON event per text frame; strict decoding for relay
//                  events, lenient coercing decoding for client events.
//
// Design decisions:
// - **JSON text frames.** The clients are browser games speaking plain JSON
//   over a WebSocket; no binary framing.
// - **Lenient client decoding.** Client fields are coerced rather than
//   rejected so that one sloppy field never costs a whole `state` update.

pub mod codec;
pub mod message;
pub mod types;

pub use codec::{DecodeError, MAX_FRAME_BYTES, decode_client, decode_server, encode};
pub use message::{ClientMessage, ServerMessage};
pub use types::{DAMAGE_PER_HIT, MAX_HEALTH, PlayerState, Presence, SLOT_COUNT, Slot, SlotPair};
