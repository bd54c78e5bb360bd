//! Per-connection bridge: translates wire text into lobby commands and
//! owns the connection's outbound queue.
//!
//! Each accepted connection gets a fresh player id (before any handshake),
//! a bounded drop-oldest outbound queue, and two tasks: the reader loop
//! below (the bridge unit itself) and a writer task draining the queue
//! into the socket. Everything the lobby or a session sends to this
//! player lands in the queue through the [`ClientHandle`] the bridge
//! registered.

use voltgrid_lobby::LobbyHandle;
use voltgrid_protocol::{
    ClientCommand, Codec, Envelope, JsonCodec, MessageType, PlayerId,
};
use voltgrid_session::{
    outbound_channel, ClientHandle, OutboundReceiver, OUTBOUND_CAPACITY,
};
use voltgrid_transport::{Connection, WebSocketConnection};

/// Runs one connection from accept to close.
pub(crate) async fn run_connection(
    conn: WebSocketConnection,
    lobby: LobbyHandle,
) {
    let player_id = PlayerId::generate();
    let (client, outbound) =
        outbound_channel(player_id.clone(), OUTBOUND_CAPACITY);

    let writer = tokio::spawn(drain_outbound(conn.clone(), outbound));

    let mut bridge = ConnectionBridge::new(player_id, lobby, client);
    loop {
        match conn.recv_text().await {
            Ok(Some(text)) => bridge.on_incoming_text(&text),
            Ok(None) => break,
            Err(e) => {
                tracing::debug!(
                    player_id = %bridge.player_id,
                    conn = %conn.id(),
                    error = %e,
                    "receive failed"
                );
                break;
            }
        }
    }

    bridge.on_connection_closed();
    let _ = writer.await;
}

/// Drains the outbound queue into the socket until the queue closes or
/// the socket dies, then closes the socket.
async fn drain_outbound(conn: WebSocketConnection, outbound: OutboundReceiver) {
    while let Some(text) = outbound.recv().await {
        if let Err(e) = conn.send_text(&text).await {
            tracing::debug!(
                conn = %conn.id(),
                error = %e,
                "send failed, stopping writer"
            );
            break;
        }
    }
    let _ = conn.close().await;
}

/// The per-connection unit of serialized state.
pub(crate) struct ConnectionBridge {
    player_id: PlayerId,
    lobby: LobbyHandle,
    client: ClientHandle,
    codec: JsonCodec,
    registered: bool,
}

impl ConnectionBridge {
    pub(crate) fn new(
        player_id: PlayerId,
        lobby: LobbyHandle,
        client: ClientHandle,
    ) -> Self {
        Self {
            player_id,
            lobby,
            client,
            codec: JsonCodec,
            registered: false,
        }
    }

    /// Parses one inbound frame and dispatches it. Unreadable frames are
    /// logged and dropped; the connection stays open.
    pub(crate) fn on_incoming_text(&mut self, raw: &str) {
        let command = self
            .codec
            .decode::<Envelope>(raw)
            .and_then(ClientCommand::from_envelope);
        match command {
            Ok(cmd) => self.dispatch(cmd),
            Err(e) => {
                tracing::warn!(
                    player_id = %self.player_id,
                    error = %e,
                    "dropping unreadable message"
                );
            }
        }
    }

    fn dispatch(&mut self, command: ClientCommand) {
        match command {
            ClientCommand::Hello { player_name } => {
                self.lobby.player_connected(
                    self.player_id.clone(),
                    player_name,
                    self.client.clone(),
                );
                self.registered = true;
            }

            // Answered locally: pings are stateless and high-frequency,
            // the lobby never sees them.
            ClientCommand::Ping => {
                self.client.send(&Envelope::bare(MessageType::Pong));
            }

            ClientCommand::ListRooms => {
                self.lobby.list_rooms(self.player_id.clone());
            }
            ClientCommand::CreateRoom { room_name } => {
                self.lobby.create_room(self.player_id.clone(), room_name);
            }
            ClientCommand::JoinRoom { room_id } => {
                self.lobby.join_room(self.player_id.clone(), room_id);
            }
            ClientCommand::LeaveRoom => {
                self.lobby.leave_room(self.player_id.clone());
            }
            ClientCommand::StartGame => {
                self.lobby.start_game(self.player_id.clone());
            }
            ClientCommand::Action(action) => {
                self.lobby.player_action(self.player_id.clone(), action);
            }
        }
    }

    /// Tears the bridge down: tells the lobby (if this connection ever
    /// registered) and closes the outbound queue so the writer exits.
    pub(crate) fn on_connection_closed(&mut self) {
        tracing::info!(player_id = %self.player_id, "connection closed");
        if self.registered {
            self.lobby.player_disconnected(self.player_id.clone());
        }
        self.client.close();
    }
}
