use std::time::Duration;

use assert_matches::assert_matches;
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use validator::Validate;
use vinxen_client::realtime::{
    ConnectionState, Inbound, Payload, PeerEvent, PeerSocketService, RealtimeError, SocketEvent,
    WebSocketService,
};
use vinxen_client::{Schema, SchemaError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
struct SensorReading {
    #[validate(length(min = 1))]
    sensor: String,
    #[validate(range(min = 0, max = 100))]
    level: i32,
}

/// Echo server: text and binary frames come back unchanged, `"bye"` makes
/// the server close with code 4000.
async fn spawn_echo_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                break;
            };
            tokio::spawn(async move {
                let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await else {
                    return;
                };
                while let Some(Ok(message)) = ws.next().await {
                    match message {
                        Message::Text(ref text) if text == "bye" => {
                            let frame = CloseFrame {
                                code: CloseCode::Library(4000),
                                reason: "bye".into(),
                            };
                            let _ = ws.close(Some(frame)).await;
                            break;
                        }
                        Message::Text(_) | Message::Binary(_) => {
                            if ws.send(message).await.is_err() {
                                break;
                            }
                        }
                        Message::Close(_) => break,
                        _ => {}
                    }
                }
            });
        }
    });
    format!("ws://{addr}")
}

async fn next_event<E>(rx: &mut UnboundedReceiver<E>) -> E {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for socket event")
        .expect("event channel closed")
}

#[tokio::test]
async fn structured_messages_round_trip_through_the_schema() {
    let url = spawn_echo_server().await;
    let (socket, mut events) =
        WebSocketService::new(Some(Schema::<SensorReading>::validated("SensorReading")));

    socket.connect(&url).await.unwrap();
    assert_matches!(next_event(&mut events).await, SocketEvent::Open);
    assert_eq!(socket.state(), ConnectionState::Open);

    let reading = SensorReading {
        sensor: "press-3".into(),
        level: 42,
    };
    socket.send(Payload::Data(reading.clone())).unwrap();
    assert_matches!(
        next_event(&mut events).await,
        SocketEvent::Message(Inbound::Data(r)) if r == reading
    );

    socket.send(Payload::Binary(vec![0xde, 0xad])).unwrap();
    assert_matches!(
        next_event(&mut events).await,
        SocketEvent::Message(Inbound::Binary(b)) if b == vec![0xde, 0xad]
    );
}

#[tokio::test]
async fn schema_failures_arrive_as_error_events() {
    let url = spawn_echo_server().await;
    let (socket, mut events) =
        WebSocketService::new(Some(Schema::<SensorReading>::validated("SensorReading")));
    socket.connect(&url).await.unwrap();
    next_event(&mut events).await;

    socket
        .send(Payload::Text(r#"{"sensor":"press-3","level":250}"#.into()))
        .unwrap();
    assert_matches!(
        next_event(&mut events).await,
        SocketEvent::Error(RealtimeError::Schema(SchemaError::Invalid { .. }))
    );

    socket.send(Payload::Text("not json".into())).unwrap();
    assert_matches!(
        next_event(&mut events).await,
        SocketEvent::Error(RealtimeError::Schema(SchemaError::Parse { .. }))
    );

    // The socket stays usable after a bad message.
    assert!(socket.is_connected());
}

#[tokio::test]
async fn text_passes_through_without_a_schema() {
    let url = spawn_echo_server().await;
    let (socket, mut events) = WebSocketService::<Value>::new(None);
    socket.connect(&url).await.unwrap();
    next_event(&mut events).await;

    socket.send(Payload::Text("plain text".into())).unwrap();
    assert_matches!(
        next_event(&mut events).await,
        SocketEvent::Message(Inbound::Text(t)) if t == "plain text"
    );
}

#[tokio::test]
async fn send_requires_an_open_connection() {
    let (socket, _events) = WebSocketService::<Value>::new(None);
    assert_eq!(socket.state(), ConnectionState::Disconnected);
    assert_matches!(
        socket.send(Payload::Text("x".into())),
        Err(RealtimeError::NotConnected)
    );
}

#[tokio::test]
async fn connecting_twice_to_the_same_target_fails() {
    let url = spawn_echo_server().await;
    let (socket, mut events) = WebSocketService::<Value>::new(None);
    socket.connect(&url).await.unwrap();
    next_event(&mut events).await;

    assert_matches!(
        socket.connect(&url).await,
        Err(RealtimeError::AlreadyConnected(target)) if target == url
    );
    assert!(socket.is_connected());
}

#[tokio::test]
async fn close_is_idempotent_and_always_reported() {
    let url = spawn_echo_server().await;
    let (socket, mut events) = WebSocketService::<Value>::new(None);
    socket.connect(&url).await.unwrap();
    next_event(&mut events).await;

    socket.close();
    socket.close();
    for _ in 0..2 {
        assert_matches!(
            next_event(&mut events).await,
            SocketEvent::Close(info) if info.code == 1000 && info.reason == "manual-close"
        );
    }
    assert!(!socket.is_connected());
    assert_matches!(
        socket.send(Payload::Text("late".into())),
        Err(RealtimeError::NotConnected)
    );

    // Nothing else trickles in from the closed socket.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn remote_close_is_reported_with_its_frame() {
    let url = spawn_echo_server().await;
    let (socket, mut events) = WebSocketService::<Value>::new(None);
    socket.connect(&url).await.unwrap();
    next_event(&mut events).await;

    socket.send(Payload::Text("bye".into())).unwrap();
    assert_matches!(
        next_event(&mut events).await,
        SocketEvent::Close(info) if info.code == 4000 && info.reason == "bye"
    );
    assert_eq!(socket.state(), ConnectionState::Closed);
}

#[tokio::test]
async fn failed_handshake_leaves_socket_disconnected() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let (socket, _events) = WebSocketService::<Value>::new(None);
    assert_matches!(
        socket.connect(&format!("ws://{addr}")).await,
        Err(RealtimeError::Handshake(_))
    );
    assert_eq!(socket.state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn cancelled_handshake_does_not_block_later_connects() {
    // Accepts TCP but never answers the upgrade request.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let stalled = format!("ws://{}", listener.local_addr().unwrap());
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((stream, _)) = listener.accept().await {
            held.push(stream);
        }
    });
    let url = spawn_echo_server().await;

    let (socket, mut events) = WebSocketService::<Value>::new(None);
    let attempt = tokio::time::timeout(Duration::from_millis(100), socket.connect(&stalled)).await;
    assert!(attempt.is_err());
    assert_eq!(socket.state(), ConnectionState::Disconnected);

    socket.connect(&url).await.unwrap();
    assert_matches!(next_event(&mut events).await, SocketEvent::Open);
    assert!(socket.is_connected());
}

async fn next_peer_event(rx: &mut UnboundedReceiver<PeerEvent<Value>>) -> PeerEvent<Value> {
    next_event(rx).await
}

#[tokio::test]
async fn peers_are_addressed_individually_or_broadcast() {
    let url = spawn_echo_server().await;
    let (peers, mut events) = PeerSocketService::<Value>::new(format!("{url}/peers"), None);

    peers.connect("crane-1").await.unwrap();
    peers.connect("crane-2").await.unwrap();
    for expected in ["crane-1", "crane-2"] {
        let event = next_peer_event(&mut events).await;
        assert_eq!(event.peer.as_deref(), Some(expected));
        assert_matches!(event.event, SocketEvent::Open);
    }
    assert_matches!(
        peers.connect("crane-1").await,
        Err(RealtimeError::AlreadyConnected(_))
    );

    peers.send(Payload::Text("all hands".into()), None).unwrap();
    let mut echoed = Vec::new();
    for _ in 0..2 {
        let event = next_peer_event(&mut events).await;
        assert_matches!(event.event, SocketEvent::Message(Inbound::Text(ref t)) if t == "all hands");
        echoed.push(event.peer.unwrap());
    }
    echoed.sort();
    assert_eq!(echoed, ["crane-1", "crane-2"]);

    peers.send(Payload::Text("just you".into()), Some("crane-2")).unwrap();
    let event = next_peer_event(&mut events).await;
    assert_eq!(event.peer.as_deref(), Some("crane-2"));

    assert_matches!(
        peers.send(Payload::Text("?".into()), Some("crane-9")),
        Err(RealtimeError::PeerNotConnected(peer)) if peer == "crane-9"
    );
}

#[tokio::test]
async fn closing_and_destroying_peers() {
    let url = spawn_echo_server().await;
    let (peers, mut events) = PeerSocketService::<Value>::new(url, None);
    peers.connect("a").await.unwrap();
    peers.connect("b").await.unwrap();
    next_peer_event(&mut events).await;
    next_peer_event(&mut events).await;

    peers.close("a");
    let event = next_peer_event(&mut events).await;
    assert_eq!(event.peer.as_deref(), Some("a"));
    assert_matches!(event.event, SocketEvent::Close(info) if info.reason == "manual-close");
    assert!(!peers.is_connected(Some("a")));
    assert!(peers.is_connected(Some("b")));
    assert!(peers.is_connected(None));

    // Closing again, or closing a peer that never existed, still reports.
    for peer in ["a", "ghost"] {
        peers.close(peer);
        let event = next_peer_event(&mut events).await;
        assert_eq!(event.peer.as_deref(), Some(peer));
        assert_matches!(event.event, SocketEvent::Close(info) if info.reason == "manual-close");
    }
    assert!(peers.is_connected(Some("b")));

    peers.destroy();
    let event = next_peer_event(&mut events).await;
    assert_eq!(event.peer, None);
    assert_matches!(event.event, SocketEvent::Close(info) if info.reason == "manual-close-all");
    assert!(!peers.is_connected(None));
    assert_matches!(
        peers.send(Payload::Text("anyone?".into()), None),
        Err(RealtimeError::NotConnected)
    );
}
