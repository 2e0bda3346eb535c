// WebSocket server and session event loop for the duel relay.
//
// Architecture: task-per-connection with a central `mpsc` channel.
//
// - **Accept task** (`TcpListener::accept()` loop): accepts TCP connections
//   and spawns one connection task per socket.
// - **Connection tasks**: perform the WebSocket upgrade (only the configured
//   path is accepted; anything else gets a 404), then split the socket. A
//   writer task drains the connection's outbox into the socket, and the
//   connection task itself becomes the reader, forwarding each text frame as
//   `InternalEvent::Frame`. On close, error or EOF it sends
//   `InternalEvent::Disconnected`.
// - **Session task**: owns the `Session` and handles one `InternalEvent` at a
//   time. It is the only code that reads or mutates session state, so every
//   client event is processed atomically with respect to the others.
//
// The session never writes to sockets. Sends are non-blocking pushes onto
// per-connection bounded outboxes (see `transport.rs`), so a slow client
// cannot stall the session task; it loses events instead. Inbound events use
// a bounded channel too: a reader waits for room, which pushes back on a
// client that floods the relay.
//
// Shutdown: `RelayHandle::stop` flips a `watch` flag. The accept task stops
// listening, reader tasks stop reading, and the session task asks every
// admitted connection's writer to send a close frame before exiting.

use std::net::SocketAddr;
use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc::{self, Receiver, Sender};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tracing::{debug, info, warn};

use crate::config::RelayConfig;
use crate::error::RelayError;
use crate::session::Session;
use crate::transport::{self, ConnectionId, Outbound, Outbox};

/// Inbound events that may wait for the session task.
const EVENT_QUEUE: usize = 1024;

/// Events sent from connection tasks to the session task.
#[derive(Debug)]
enum InternalEvent {
    NewConnection {
        id: ConnectionId,
        peer: SocketAddr,
        outbox: Outbox,
    },
    Frame {
        id: ConnectionId,
        text: String,
    },
    Disconnected {
        id: ConnectionId,
    },
}

/// Per-connection settings shared by every connection task.
#[derive(Debug)]
struct ConnectionSettings {
    ws_path: String,
    max_frame_bytes: usize,
}

impl ConnectionSettings {
    fn ws_config(&self) -> WebSocketConfig {
        WebSocketConfig::default()
            .max_message_size(Some(self.max_frame_bytes))
            .max_frame_size(Some(self.max_frame_bytes))
    }
}

/// Handle returned by `start_relay` to control the running server. Dropping
/// it without calling `stop` also shuts the relay down.
#[derive(Debug)]
pub struct RelayHandle {
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl RelayHandle {
    /// Signal the relay to stop and wait for the accept and session tasks to
    /// finish. Admitted clients receive a close frame.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        for task in self.tasks {
            let _ = task.await;
        }
    }
}

/// Bind the listener and start the relay on the current tokio runtime.
/// Returns a handle for stopping it and the actual bound address (useful
/// when port 0 is used to let the OS pick a free port).
pub async fn start_relay(config: RelayConfig) -> Result<(RelayHandle, SocketAddr), RelayError> {
    config.validate()?;

    let listener = TcpListener::bind(config.listen_addr).await?;
    let addr = listener.local_addr()?;

    let settings = Arc::new(ConnectionSettings {
        ws_path: config.ws_path,
        max_frame_bytes: config.max_frame_bytes,
    });

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (events_tx, events_rx) = mpsc::channel(EVENT_QUEUE);

    let session_task = tokio::spawn(run_session(events_rx, shutdown_rx.clone()));
    let accept_task = tokio::spawn(accept_loop(listener, settings.clone(), events_tx, shutdown_rx));

    info!(%addr, path = %settings.ws_path, "relay listening");

    Ok((
        RelayHandle {
            shutdown: shutdown_tx,
            tasks: vec![accept_task, session_task],
        },
        addr,
    ))
}

/// Accept TCP connections until shutdown, spawning a task for each.
async fn accept_loop(
    listener: TcpListener,
    settings: Arc<ConnectionSettings>,
    events: Sender<InternalEvent>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut next_id: ConnectionId = 0;
    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    next_id += 1;
                    tokio::spawn(serve_connection(
                        stream,
                        peer,
                        next_id,
                        settings.clone(),
                        events.clone(),
                        shutdown.clone(),
                    ));
                }
                Err(e) => warn!(error = %e, "accept failed"),
            },
        }
    }
    debug!("accept loop stopped");
}

/// Upgrade one TCP connection to a WebSocket and pump it until it closes.
async fn serve_connection(
    stream: TcpStream,
    peer: SocketAddr,
    id: ConnectionId,
    settings: Arc<ConnectionSettings>,
    events: Sender<InternalEvent>,
    mut shutdown: watch::Receiver<bool>,
) {
    let check_path = |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
        if req.uri().path() == settings.ws_path {
            Ok(resp)
        } else {
            let mut err = ErrorResponse::new(Some("not found".into()));
            *err.status_mut() = StatusCode::NOT_FOUND;
            Err(err)
        }
    };

    let ws = match tokio_tungstenite::accept_hdr_async_with_config(
        stream,
        check_path,
        Some(settings.ws_config()),
    )
    .await
    {
        Ok(ws) => ws,
        Err(e) => {
            debug!(connection = id, %peer, error = %e, "WebSocket handshake failed");
            return;
        }
    };

    let (mut sink, mut source) = ws.split();
    let (outbox, mut inbox) = transport::outbox();
    if events
        .send(InternalEvent::NewConnection { id, peer, outbox })
        .await
        .is_err()
    {
        return;
    }

    // Writer: drain the outbox into the socket. Ends when the session drops
    // the outbox, asks for a close, or the socket fails.
    tokio::spawn(async move {
        while let Some(out) = inbox.recv().await {
            match out {
                Outbound::Text(text) => {
                    if let Err(e) = sink.send(Message::text(text)).await {
                        debug!(connection = id, error = %e, "write failed");
                        break;
                    }
                }
                Outbound::Close => break,
            }
        }
        let _ = sink.close().await;
    });

    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            frame = source.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    let text = text.as_str().to_owned();
                    if events.send(InternalEvent::Frame { id, text }).await.is_err() {
                        break;
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                // Binary frames are not part of the protocol; pings are
                // answered by tungstenite itself.
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    debug!(connection = id, error = %e, "read failed");
                    break;
                }
            },
        }
    }

    let _ = events.send(InternalEvent::Disconnected { id }).await;
}

/// Session task. Runs until shutdown or until every event sender is gone.
async fn run_session(
    mut events: Receiver<InternalEvent>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut session = Session::new();
    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            event = events.recv() => match event {
                Some(event) => handle_event(&mut session, event),
                None => break,
            },
        }
    }
    session.close_all();
    debug!("session task stopped");
}

/// Dispatch a single event to the session.
fn handle_event(session: &mut Session, event: InternalEvent) {
    match event {
        InternalEvent::NewConnection { id, peer, outbox } => {
            debug!(connection = id, %peer, "connection opened");
            // Rejections are logged and answered by the session.
            let _ = session.admit(id, outbox);
        }
        InternalEvent::Frame { id, text } => session.handle_frame(id, &text),
        InternalEvent::Disconnected { id } => {
            debug!(connection = id, "connection closed");
            session.disconnect(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use duel_protocol::{ServerMessage, Slot, decode_server};

    use super::*;

    fn texts(rx: &mut transport::Inbox) -> Vec<ServerMessage> {
        let mut out = Vec::new();
        while let Ok(Outbound::Text(text)) = rx.try_recv() {
            out.push(decode_server(&text).unwrap());
        }
        out
    }

    #[test]
    fn events_drive_the_session_in_order() {
        let mut session = Session::new();
        let (tx_a, mut rx_a) = transport::outbox();
        let (tx_b, mut rx_b) = transport::outbox();
        let peer: SocketAddr = "127.0.0.1:1".parse().unwrap();

        handle_event(
            &mut session,
            InternalEvent::NewConnection { id: 1, peer, outbox: tx_a },
        );
        handle_event(
            &mut session,
            InternalEvent::NewConnection { id: 2, peer, outbox: tx_b },
        );
        texts(&mut rx_a);
        texts(&mut rx_b);

        handle_event(
            &mut session,
            InternalEvent::Frame {
                id: 1,
                text: r#"{"type":"state","x":1,"y":2,"flipX":true,"moving":true}"#.into(),
            },
        );
        assert!(texts(&mut rx_a).is_empty());
        assert!(matches!(
            texts(&mut rx_b).as_slice(),
            [ServerMessage::State { slot: Slot::One, .. }]
        ));

        handle_event(&mut session, InternalEvent::Disconnected { id: 1 });
        assert!(!session.occupied(Slot::One));
        assert_eq!(
            texts(&mut rx_b).first(),
            Some(&ServerMessage::PlayerLeft { slot: Slot::One })
        );
    }
}
