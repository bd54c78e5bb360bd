//! End-to-end tests: a real server, real WebSocket clients, real JSON
//! frames. These exercise the full path (transport upgrade, bridge
//! parsing, lobby registry, and session broadcasts) exactly as a game
//! client would.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio_tungstenite::tungstenite::Message;
use voltgrid::{Server, ServerConfig};

type ClientWs = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

// =========================================================================
// Helpers
// =========================================================================

async fn start_server() -> std::net::SocketAddr {
    let config = ServerConfig {
        bind_addr: "127.0.0.1:0".into(),
        ..ServerConfig::default()
    };
    let server = Server::bind(config).await.expect("server should bind");
    let addr = server.local_addr().expect("server should have an address");
    tokio::spawn(server.run());
    addr
}

async fn connect(addr: std::net::SocketAddr) -> ClientWs {
    let url = format!("ws://{addr}/ws");
    let (ws, _) = tokio_tungstenite::connect_async(&url)
        .await
        .expect("client should connect");
    ws
}

async fn send(ws: &mut ClientWs, value: Value) {
    ws.send(Message::Text(value.to_string().into()))
        .await
        .expect("client send");
}

/// Receives the next text frame as JSON, with a timeout so a missing
/// broadcast fails the test instead of hanging it.
async fn recv(ws: &mut ClientWs) -> Value {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("stream ended unexpectedly")
            .expect("websocket error");
        if let Message::Text(text) = msg {
            return serde_json::from_str(text.as_str()).expect("valid json");
        }
    }
}

/// Completes the handshake and returns the assigned player id.
async fn handshake(ws: &mut ClientWs, name: &str) -> String {
    send(ws, json!({ "type": "HELLO", "payload": { "playerName": name } }))
        .await;
    let welcome = recv(ws).await;
    assert_eq!(welcome["type"], "WELCOME");
    let player_id = welcome["payload"]["playerId"]
        .as_str()
        .expect("playerId")
        .to_string();
    assert!(!player_id.is_empty());
    player_id
}

// =========================================================================
// Handshake and keep-alive (Scenario A)
// =========================================================================

#[tokio::test]
async fn test_handshake_assigns_a_player_id() {
    let addr = start_server().await;
    let mut ws = connect(addr).await;
    let player_id = handshake(&mut ws, "Alice").await;
    assert_eq!(player_id.len(), 32);
}

#[tokio::test]
async fn test_ping_pong_survives_garbage_input() {
    let addr = start_server().await;
    let mut ws = connect(addr).await;

    // Malformed frames are dropped without closing the connection.
    send(&mut ws, json!({ "type": "NOT_A_KIND" })).await;
    ws.send(Message::Text("definitely not json".into()))
        .await
        .expect("client send");

    send(&mut ws, json!({ "type": "PING" })).await;
    let pong = recv(&mut ws).await;
    assert_eq!(pong["type"], "PONG");
}

// =========================================================================
// Rooms over the wire (Scenario B)
// =========================================================================

#[tokio::test]
async fn test_create_and_join_room_end_to_end() {
    let addr = start_server().await;

    let mut alice = connect(addr).await;
    let alice_id = handshake(&mut alice, "Alice").await;

    let mut bob = connect(addr).await;
    handshake(&mut bob, "Bob").await;

    send(
        &mut alice,
        json!({ "type": "CREATE_ROOM", "payload": { "roomName": "Test" } }),
    )
    .await;
    let joined = recv(&mut alice).await;
    assert_eq!(joined["type"], "ROOM_JOINED");
    assert_eq!(joined["payload"]["roomName"], "Test");
    let room_id = joined["payload"]["roomId"].as_str().expect("roomId");

    send(
        &mut bob,
        json!({ "type": "JOIN_ROOM", "payload": { "roomId": room_id } }),
    )
    .await;
    let joined = recv(&mut bob).await;
    assert_eq!(joined["type"], "ROOM_JOINED");

    // The host hears about the new roster.
    let updated = recv(&mut alice).await;
    assert_eq!(updated["type"], "ROOM_UPDATED");
    assert_eq!(updated["payload"]["hostId"], alice_id.as_str());
    assert_eq!(
        updated["payload"]["players"].as_array().expect("players").len(),
        2
    );
}

// =========================================================================
// Starting a game over the wire (Scenario D, happy path)
// =========================================================================

#[tokio::test]
async fn test_start_game_reaches_all_members_and_first_turn_is_hosts() {
    let addr = start_server().await;

    let mut alice = connect(addr).await;
    let alice_id = handshake(&mut alice, "Alice").await;
    let mut bob = connect(addr).await;
    let bob_id = handshake(&mut bob, "Bob").await;

    send(
        &mut alice,
        json!({ "type": "CREATE_ROOM", "payload": { "roomName": "Live" } }),
    )
    .await;
    let joined = recv(&mut alice).await;
    let room_id = joined["payload"]["roomId"].as_str().expect("roomId");

    send(
        &mut bob,
        json!({ "type": "JOIN_ROOM", "payload": { "roomId": room_id } }),
    )
    .await;
    recv(&mut bob).await; // ROOM_JOINED
    recv(&mut bob).await; // ROOM_UPDATED
    recv(&mut alice).await; // ROOM_UPDATED

    send(&mut alice, json!({ "type": "START_GAME" })).await;

    for ws in [&mut alice, &mut bob] {
        let starting = recv(ws).await;
        assert_eq!(starting["type"], "GAME_STARTING");
        assert_eq!(starting["payload"]["roomId"], room_id);

        let state = recv(ws).await;
        assert_eq!(state["type"], "GAME_STATE_UPDATE");
        assert_eq!(state["payload"]["phase"], "IN_PROGRESS");
        assert_eq!(state["payload"]["currentPlayerId"], alice_id.as_str());

        let turn = recv(ws).await;
        assert_eq!(turn["type"], "PLAYER_TURN");
        assert_eq!(turn["payload"]["playerId"], alice_id.as_str());
    }

    // The host ends their turn; everyone sees it pass to Bob.
    send(&mut alice, json!({ "type": "END_TURN" })).await;
    let state = recv(&mut bob).await;
    assert_eq!(state["type"], "GAME_STATE_UPDATE");
    assert_eq!(state["payload"]["currentPlayerId"], bob_id.as_str());
}
