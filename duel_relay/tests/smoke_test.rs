// Integration smoke test for the relay server.
//
// Starts a relay on localhost (port 0), connects real WebSocket clients, and
// exercises the full protocol lifecycle: admission and welcome, state and
// shot relay, hit resolution through a respawn, rejection of a third
// connection, malformed input, disconnect, and slot reuse.
//
// Each client is a `DuelClient` speaking the protocol crate's JSON message
// types, so this tests the relay end-to-end exactly as a browser sees it.

use std::net::SocketAddr;
use std::time::Duration;

use duel_protocol::{
    ClientMessage, DAMAGE_PER_HIT, MAX_HEALTH, PlayerState, Presence, ServerMessage, Slot,
    SlotPair,
};
use duel_relay::{DuelClient, RelayConfig, RelayHandle, start_relay};

const TIMEOUT: Duration = Duration::from_secs(5);
const QUIET: Duration = Duration::from_millis(200);

async fn start() -> (RelayHandle, SocketAddr) {
    let config = RelayConfig {
        listen_addr: "127.0.0.1:0".parse().unwrap(),
        ..RelayConfig::default()
    };
    start_relay(config).await.unwrap()
}

fn url(addr: SocketAddr) -> String {
    format!("ws://{addr}/ws")
}

/// Receive the next message or fail the test.
async fn expect(client: &mut DuelClient) -> ServerMessage {
    match client.recv_timeout(TIMEOUT).await {
        Ok(Some(msg)) => msg,
        other => panic!("expected a relay message, got {other:?}"),
    }
}

/// Connect and consume the admission burst (welcome, presence, health).
/// Returns the client and its welcome.
async fn join(addr: SocketAddr) -> (DuelClient, ServerMessage) {
    let mut client = DuelClient::connect(&url(addr)).await.unwrap();
    let welcome = expect(&mut client).await;
    assert!(matches!(welcome, ServerMessage::Welcome { .. }), "got {welcome:?}");
    assert!(matches!(expect(&mut client).await, ServerMessage::Presence { .. }));
    assert!(matches!(expect(&mut client).await, ServerMessage::Health { .. }));
    (client, welcome)
}

/// Connect both slots and consume the peer's join notifications.
async fn join_both(addr: SocketAddr) -> (DuelClient, DuelClient) {
    let (mut a, _) = join(addr).await;
    let (b, _) = join(addr).await;
    assert!(matches!(
        expect(&mut a).await,
        ServerMessage::PlayerJoined { slot: Slot::Two, .. }
    ));
    assert!(matches!(expect(&mut a).await, ServerMessage::Presence { .. }));
    assert!(matches!(expect(&mut a).await, ServerMessage::Health { .. }));
    (a, b)
}

fn hit(target: Slot) -> ClientMessage {
    ClientMessage::Hit {
        target_slot: Some(target),
    }
}

#[tokio::test]
async fn full_session_lifecycle() {
    let (handle, addr) = start().await;

    // First client takes slot 1 and sees both avatars at spawn.
    let mut a = DuelClient::connect(&url(addr)).await.unwrap();
    assert_eq!(
        expect(&mut a).await,
        ServerMessage::Welcome {
            slot: Slot::One,
            players: SlotPair {
                one: PlayerState {
                    connected: true,
                    ..PlayerState::spawn(Slot::One)
                },
                two: PlayerState::spawn(Slot::Two),
            },
            health: SlotPair::from_fn(|_| MAX_HEALTH),
        }
    );
    assert_eq!(
        expect(&mut a).await,
        ServerMessage::Presence {
            players: SlotPair {
                one: Presence { connected: true },
                two: Presence { connected: false },
            }
        }
    );
    assert_eq!(
        expect(&mut a).await,
        ServerMessage::Health {
            values: SlotPair::from_fn(|_| MAX_HEALTH)
        }
    );

    // Second client takes slot 2; the first is told.
    let (mut b, welcome) = join(addr).await;
    assert!(matches!(welcome, ServerMessage::Welcome { slot: Slot::Two, .. }));
    assert_eq!(
        expect(&mut a).await,
        ServerMessage::PlayerJoined {
            slot: Slot::Two,
            state: PlayerState {
                connected: true,
                ..PlayerState::spawn(Slot::Two)
            },
        }
    );
    assert_eq!(
        expect(&mut a).await,
        ServerMessage::Presence {
            players: SlotPair::from_fn(|_| Presence { connected: true })
        }
    );
    assert!(matches!(expect(&mut a).await, ServerMessage::Health { .. }));

    // State updates go to the peer only.
    a.send(&ClientMessage::State {
        x: Some(400.0),
        y: Some(570.0),
        flip_x: true,
        moving: true,
    })
    .await
    .unwrap();
    assert_eq!(
        expect(&mut b).await,
        ServerMessage::State {
            slot: Slot::One,
            x: 400.0,
            y: 570.0,
            flip_x: true,
            moving: true,
        }
    );

    // Eight hits wound slot 2 down to 4.
    for i in 1..=8 {
        a.send(&hit(Slot::Two)).await.unwrap();
        let expected = ServerMessage::Health {
            values: SlotPair {
                one: MAX_HEALTH,
                two: MAX_HEALTH - i * DAMAGE_PER_HIT,
            },
        };
        assert_eq!(expect(&mut a).await, expected);
        assert_eq!(expect(&mut b).await, expected);
    }

    // The ninth respawns slot 2 at full health, announced to both.
    a.send(&hit(Slot::Two)).await.unwrap();
    for client in [&mut a, &mut b] {
        assert_eq!(
            expect(client).await,
            ServerMessage::State {
                slot: Slot::Two,
                x: 504.0,
                y: 456.0,
                flip_x: false,
                moving: false,
            }
        );
        assert_eq!(
            expect(client).await,
            ServerMessage::Health {
                values: SlotPair::from_fn(|_| MAX_HEALTH)
            }
        );
    }

    // Slot 1 leaves; slot 2 hears about it.
    a.close().await.unwrap();
    assert_eq!(
        expect(&mut b).await,
        ServerMessage::PlayerLeft { slot: Slot::One }
    );
    assert_eq!(
        expect(&mut b).await,
        ServerMessage::Presence {
            players: SlotPair {
                one: Presence { connected: false },
                two: Presence { connected: true },
            }
        }
    );
    assert!(matches!(expect(&mut b).await, ServerMessage::Health { .. }));

    handle.stop().await;
}

#[tokio::test]
async fn third_connection_is_rejected() {
    let (handle, addr) = start().await;
    let (mut a, mut b) = join_both(addr).await;

    let mut c = DuelClient::connect(&url(addr)).await.unwrap();
    assert_eq!(
        expect(&mut c).await,
        ServerMessage::Full {
            message: "Room full (2 players max).".into()
        }
    );
    assert_eq!(c.recv_timeout(TIMEOUT).await.unwrap(), None);

    // The seated players see nothing of it.
    assert!(a.drain(QUIET).await.is_empty());
    assert!(b.drain(QUIET).await.is_empty());

    handle.stop().await;
}

#[tokio::test]
async fn shots_are_relayed_to_the_peer() {
    let (handle, addr) = start().await;
    let (mut a, mut b) = join_both(addr).await;

    b.send(&ClientMessage::Shoot {
        x: Some(10.0),
        y: Some(20.0),
        dx: Some(-1.0),
        dy: Some(0.0),
    })
    .await
    .unwrap();
    assert_eq!(
        expect(&mut a).await,
        ServerMessage::Shoot {
            slot: Slot::Two,
            x: 10.0,
            y: 20.0,
            dx: -1.0,
            dy: 0.0,
        }
    );
    assert!(b.drain(QUIET).await.is_empty());

    handle.stop().await;
}

#[tokio::test]
async fn malformed_and_invalid_input_is_ignored() {
    let (handle, addr) = start().await;
    let (mut a, mut b) = join_both(addr).await;

    a.send_raw("not json").await.unwrap();
    a.send_raw("[1,2,3]").await.unwrap();
    a.send_raw(r#"{"type":"teleport","x":1}"#).await.unwrap();
    a.send_raw(r#"{"type":"hit","targetSlot":3}"#).await.unwrap();
    a.send(&hit(Slot::One)).await.unwrap();

    // Lenient coercion: numeric strings and truthy flags are accepted.
    a.send_raw(r#"{"type":"state","x":"12","y":null,"flipX":1,"moving":""}"#)
        .await
        .unwrap();
    assert_eq!(
        expect(&mut b).await,
        ServerMessage::State {
            slot: Slot::One,
            x: 12.0,
            y: 576.0,
            flip_x: true,
            moving: false,
        }
    );
    assert!(a.drain(QUIET).await.is_empty());
    assert!(b.drain(QUIET).await.is_empty());

    handle.stop().await;
}

#[tokio::test]
async fn freed_slot_is_reused() {
    let (handle, addr) = start().await;
    let (a, mut b) = join_both(addr).await;

    a.close().await.unwrap();
    assert_eq!(
        expect(&mut b).await,
        ServerMessage::PlayerLeft { slot: Slot::One }
    );
    b.drain(QUIET).await;

    let (_c, welcome) = join(addr).await;
    assert!(matches!(welcome, ServerMessage::Welcome { slot: Slot::One, .. }));
    assert!(matches!(
        expect(&mut b).await,
        ServerMessage::PlayerJoined { slot: Slot::One, .. }
    ));

    handle.stop().await;
}

#[tokio::test]
async fn wrong_path_is_refused() {
    let (handle, addr) = start().await;
    assert!(DuelClient::connect(&format!("ws://{addr}/other")).await.is_err());

    // The refused attempt does not take a slot.
    let (_a, welcome) = join(addr).await;
    assert!(matches!(welcome, ServerMessage::Welcome { slot: Slot::One, .. }));

    handle.stop().await;
}

#[tokio::test]
async fn stop_closes_admitted_clients() {
    let (handle, addr) = start().await;
    let (mut a, _) = join(addr).await;

    handle.stop().await;
    assert_eq!(a.recv_timeout(TIMEOUT).await.unwrap(), None);
}
