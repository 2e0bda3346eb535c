// duel_relay — realtime relay server for two-player duels.
//
// The relay hosts a single session with exactly two player slots. Browser
// clients connect over WebSocket, are seated in the lowest free slot, and
// stream their avatar state, shots and hits as JSON text frames. The relay
// keeps the authoritative position and health for each slot, applies damage
// and respawns, and fans events out to the other player. A third concurrent
// connection is told the room is full and closed.
//
// Module overview:
// - `state.rs`:     Per-slot position/flags and health tables. Pure data, no
//                   I/O; health and respawn rules live here.
// - `transport.rs`: Per-connection outboxes with unicast/broadcast. The
//                   session pushes text frames; writer tasks own the sockets.
// - `session.rs`:   Admission, message routing, hit resolution and
//                   disconnect handling. The core data structure that
//                   `server.rs` drives.
// - `server.rs`:    TCP listener, WebSocket upgrade, per-connection reader
//                   and writer tasks, and the session task. Uses tokio with a
//                   central `mpsc` channel funnelling events into the
//                   single-owner `Session`.
// - `client.rs`:    Async `DuelClient` for tests and tools.
// - `config.rs`:    `RelayConfig` (defaults, TOML file, CLI overrides).
// - `error.rs`:     `RelayError` for startup failures.
// - `logging.rs`:   Tracing subscriber setup for the binary.
//
// Dependencies: `duel_protocol` (shared message types and codec).
//
// The relay can run as a standalone binary (`main.rs`) or be embedded in
// another tokio program via the library API (`start_relay`).

pub mod client;
pub mod config;
pub mod error;
pub mod logging;
pub mod server;
pub mod session;
pub mod state;
pub mod transport;

pub use client::{ClientError, DuelClient};
pub use config::{Args, LoggingSettings, RelayConfig};
pub use error::RelayError;
pub use server::{RelayHandle, start_relay};
pub use session::{AdmissionError, Session};
