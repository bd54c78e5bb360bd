//! Integration tests for the WebSocket transport.
//!
//! These spin up a real listener and a `tokio-tungstenite` client to verify
//! that text frames actually flow, the `/ws` path is enforced, and closes
//! are observed as `Ok(None)`.

use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::Message;
use voltgrid_transport::{Connection, Transport, WebSocketTransport, WS_PATH};

type ClientWs = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

async fn connect_client(addr: std::net::SocketAddr, path: &str) -> ClientWs {
    let url = format!("ws://{addr}{path}");
    let (ws, _) = tokio_tungstenite::connect_async(&url)
        .await
        .expect("client should connect");
    ws
}

/// Binds on an ephemeral port and returns the transport plus its address.
async fn bind_ephemeral() -> (WebSocketTransport, std::net::SocketAddr) {
    let transport = WebSocketTransport::bind("127.0.0.1:0")
        .await
        .expect("should bind");
    let addr = transport.local_addr().expect("should have a local addr");
    (transport, addr)
}

#[tokio::test]
async fn test_accept_and_exchange_text() {
    let (mut transport, addr) = bind_ephemeral().await;

    let server = tokio::spawn(async move {
        transport.accept().await.expect("should accept")
    });
    let mut client = connect_client(addr, WS_PATH).await;
    let conn = server.await.expect("accept task should complete");

    assert!(conn.id().into_inner() > 0);

    // client → server
    client
        .send(Message::Text("hello server".into()))
        .await
        .expect("client send");
    let received = conn.recv_text().await.expect("server recv");
    assert_eq!(received.as_deref(), Some("hello server"));

    // server → client
    conn.send_text("hello client").await.expect("server send");
    let reply = client.next().await.expect("client should receive").unwrap();
    assert_eq!(reply, Message::Text("hello client".into()));
}

#[tokio::test]
async fn test_binary_utf8_frames_are_accepted() {
    let (mut transport, addr) = bind_ephemeral().await;

    let server = tokio::spawn(async move {
        transport.accept().await.expect("should accept")
    });
    let mut client = connect_client(addr, WS_PATH).await;
    let conn = server.await.expect("accept task should complete");

    client
        .send(Message::Binary(b"{\"type\":\"PING\"}".to_vec().into()))
        .await
        .expect("client send");
    let received = conn.recv_text().await.expect("server recv");
    assert_eq!(received.as_deref(), Some("{\"type\":\"PING\"}"));
}

#[tokio::test]
async fn test_wrong_path_is_rejected() {
    let (mut transport, addr) = bind_ephemeral().await;

    tokio::spawn(async move {
        // The upgrade fails server-side; accept returns an error.
        let _ = transport.accept().await;
    });

    let url = format!("ws://{addr}/definitely-not-ws");
    let result = tokio_tungstenite::connect_async(&url).await;
    assert!(result.is_err(), "upgrade off {WS_PATH} should be refused");
}

#[tokio::test]
async fn test_client_close_yields_none() {
    let (mut transport, addr) = bind_ephemeral().await;

    let server = tokio::spawn(async move {
        transport.accept().await.expect("should accept")
    });
    let mut client = connect_client(addr, WS_PATH).await;
    let conn = server.await.expect("accept task should complete");

    client.close(None).await.expect("client close");
    let received = conn.recv_text().await.expect("server recv");
    assert_eq!(received, None);
}
