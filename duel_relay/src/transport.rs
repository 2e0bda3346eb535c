// Unicast/broadcast transport for the duel relay.
//
// Each WebSocket connection gets a bounded outbox channel; a writer task in
// `server.rs` drains it into the socket. The session never touches sockets
// directly, so a send is just a non-blocking channel push and never stalls the
// session task.
//
// A connection counts as open while its writer task still holds the receiving
// end. Once the writer exits (socket error, close frame sent, shutdown), the
// outbox reports closed and every further send to it is a silent no-op.
// A peer that stops draining its socket fills its outbox; messages that do
// not fit are dropped, not queued. There is no retry: clients resync from
// the next periodic `state`.

use std::collections::BTreeMap;

use duel_protocol::{ServerMessage, encode};
use tokio::sync::mpsc::{self, Receiver, Sender, error::TrySendError};
use tracing::{trace, warn};

/// Relay-assigned connection ID, unique for the lifetime of the process.
pub type ConnectionId = u64;

/// Instructions for a connection's writer task.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outbound {
    /// Send one JSON text frame.
    Text(String),
    /// Send a close frame and stop writing.
    Close,
}

/// Frames a connection may have waiting for its writer. A healthy client
/// keeps this near empty; a stalled one hits the cap and starts losing events.
pub const OUTBOX_CAPACITY: usize = 64;

/// Sending half of a connection's outbox.
pub type Outbox = Sender<Outbound>;

/// Receiving half of a connection's outbox, owned by its writer task.
pub type Inbox = Receiver<Outbound>;

/// A fresh outbox pair with `OUTBOX_CAPACITY` slots.
pub fn outbox() -> (Outbox, Inbox) {
    mpsc::channel(OUTBOX_CAPACITY)
}

/// All admitted connections, keyed by ID.
#[derive(Debug, Default)]
pub struct Connections {
    by_id: BTreeMap<ConnectionId, Outbox>,
}

impl Connections {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking a connection.
    pub fn insert(&mut self, id: ConnectionId, outbox: Outbox) {
        self.by_id.insert(id, outbox);
    }

    /// Stop tracking a connection. Returns whether it was tracked.
    pub fn remove(&mut self, id: ConnectionId) -> bool {
        self.by_id.remove(&id).is_some()
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.by_id.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Send a message to one connection. No-op if it is unknown or closed.
    pub fn unicast(&self, id: ConnectionId, msg: &ServerMessage) {
        let Some(outbox) = self.by_id.get(&id) else {
            return;
        };
        if let Some(text) = serialize(msg) {
            push(id, outbox, text);
        }
    }

    /// Send a message to every open connection except `except`.
    pub fn broadcast(&self, msg: &ServerMessage, except: Option<ConnectionId>) {
        let Some(text) = serialize(msg) else {
            return;
        };
        for (&id, outbox) in &self.by_id {
            if Some(id) == except {
                continue;
            }
            push(id, outbox, text.clone());
        }
    }

    /// Ask every connection's writer to close its socket. A writer whose
    /// outbox is full still stops once the session drops its outbox.
    pub fn close_all(&self) {
        for outbox in self.by_id.values() {
            let _ = outbox.try_send(Outbound::Close);
        }
    }
}

/// Send a message straight to an untracked outbox (used for rejections
/// before a connection is admitted). Returns false if it was not queued.
pub fn send_direct(outbox: &Outbox, msg: &ServerMessage) -> bool {
    match serialize(msg) {
        Some(text) => outbox.try_send(Outbound::Text(text)).is_ok(),
        None => false,
    }
}

fn serialize(msg: &ServerMessage) -> Option<String> {
    match encode(msg) {
        Ok(text) => Some(text),
        Err(e) => {
            warn!(kind = msg.kind(), error = %e, "failed to encode server message");
            None
        }
    }
}

fn push(id: ConnectionId, outbox: &Outbox, text: String) {
    match outbox.try_send(Outbound::Text(text)) {
        Ok(()) => {}
        Err(TrySendError::Full(_)) => {
            trace!(connection = id, "outbox full, dropping message");
        }
        Err(TrySendError::Closed(_)) => {
            trace!(connection = id, "skipping send to closed connection");
        }
    }
}
