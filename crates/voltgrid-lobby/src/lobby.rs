//! The lobby actor: central authority for players and joinable rooms.
//!
//! A single lobby runs per process, spawned at startup. Bridges reach it
//! through a [`LobbyHandle`] passed at construction; there is no global
//! registry. The actor owns every registry map and processes one command
//! at a time, so room membership can never race.

use std::collections::HashMap;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::mpsc;
use voltgrid_protocol::{
    Envelope, ErrorPayload, GameStartingPayload, MessageType, PlayerAction,
    PlayerId, PlayerInfo, RoomId, RoomJoinedPayload, RoomListPayload,
    RoomSummary, RoomUpdatedPayload, WelcomePayload,
};
use voltgrid_session::{
    spawn_session, ClientHandle, RuleEngine, SessionConfig, SessionHandle,
    StubRules,
};

use crate::{LobbyError, LobbyRoom, Player};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Lobby settings.
#[derive(Debug, Clone)]
pub struct LobbyConfig {
    /// Minimum members before the host may start the game.
    pub min_players_to_start: usize,
    /// Maximum members per room.
    pub max_room_players: usize,
    /// Turn timeout handed to every spawned session.
    pub turn_timeout: Duration,
}

impl Default for LobbyConfig {
    fn default() -> Self {
        Self {
            min_players_to_start: 2,
            max_room_players: 6,
            turn_timeout: Duration::from_secs(120),
        }
    }
}

/// Produces one rules engine per started game.
pub type RulesFactory = Box<dyn Fn() -> Box<dyn RuleEngine> + Send + 'static>;

// ---------------------------------------------------------------------------
// Commands and handle
// ---------------------------------------------------------------------------

/// Commands processed by the lobby actor, one at a time, in arrival order.
pub enum LobbyCommand {
    /// A connection completed its handshake. Re-registration under the
    /// same id overwrites the delivery address.
    PlayerConnected {
        player_id: PlayerId,
        player_name: String,
        client: ClientHandle,
    },

    /// A registered connection closed.
    PlayerDisconnected { player_id: PlayerId },

    /// Create a room and make the player its host.
    CreateRoom {
        player_id: PlayerId,
        room_name: String,
    },

    /// Join an existing room.
    JoinRoom {
        player_id: PlayerId,
        room_id: RoomId,
    },

    /// Leave the current room. No-op when roomless.
    LeaveRoom { player_id: PlayerId },

    /// Request a snapshot of all joinable rooms.
    ListRooms { player_id: PlayerId },

    /// Host starts the game in their current room.
    StartGame { player_id: PlayerId },

    /// A game action to route to the player's running session.
    PlayerAction {
        player_id: PlayerId,
        action: PlayerAction,
    },

    /// A spawned session reached ENDED; clear its routing entries.
    SessionEnded { room_id: RoomId },
}

/// Handle to the lobby actor. Cheap to clone; sends never block.
#[derive(Clone)]
pub struct LobbyHandle {
    sender: mpsc::UnboundedSender<LobbyCommand>,
}

impl LobbyHandle {
    /// Enqueues a raw command.
    pub fn send(&self, cmd: LobbyCommand) {
        if self.sender.send(cmd).is_err() {
            tracing::error!("lobby is gone, dropping command");
        }
    }

    pub fn player_connected(
        &self,
        player_id: PlayerId,
        player_name: impl Into<String>,
        client: ClientHandle,
    ) {
        self.send(LobbyCommand::PlayerConnected {
            player_id,
            player_name: player_name.into(),
            client,
        });
    }

    pub fn player_disconnected(&self, player_id: PlayerId) {
        self.send(LobbyCommand::PlayerDisconnected { player_id });
    }

    pub fn create_room(&self, player_id: PlayerId, room_name: impl Into<String>) {
        self.send(LobbyCommand::CreateRoom {
            player_id,
            room_name: room_name.into(),
        });
    }

    pub fn join_room(&self, player_id: PlayerId, room_id: RoomId) {
        self.send(LobbyCommand::JoinRoom { player_id, room_id });
    }

    pub fn leave_room(&self, player_id: PlayerId) {
        self.send(LobbyCommand::LeaveRoom { player_id });
    }

    pub fn list_rooms(&self, player_id: PlayerId) {
        self.send(LobbyCommand::ListRooms { player_id });
    }

    pub fn start_game(&self, player_id: PlayerId) {
        self.send(LobbyCommand::StartGame { player_id });
    }

    pub fn player_action(&self, player_id: PlayerId, action: PlayerAction) {
        self.send(LobbyCommand::PlayerAction { player_id, action });
    }
}

// ---------------------------------------------------------------------------
// Spawning
// ---------------------------------------------------------------------------

/// Spawns the lobby actor with the built-in placeholder rules.
pub fn spawn_lobby(config: LobbyConfig) -> LobbyHandle {
    spawn_lobby_with(config, Box::new(|| Box::new(StubRules)))
}

/// Spawns the lobby actor with a custom rules engine per game.
pub fn spawn_lobby_with(
    config: LobbyConfig,
    rules: RulesFactory,
) -> LobbyHandle {
    let (tx, rx) = mpsc::unbounded_channel();
    let (ended_tx, mut ended_rx) = mpsc::unbounded_channel::<RoomId>();

    // Finished sessions report on their own channel; fold those
    // notifications into the lobby's ordinary command stream so they are
    // serialized with everything else.
    let feedback = LobbyHandle { sender: tx.clone() };
    tokio::spawn(async move {
        while let Some(room_id) = ended_rx.recv().await {
            feedback.send(LobbyCommand::SessionEnded { room_id });
        }
    });

    let actor = LobbyActor {
        config,
        rules,
        players: HashMap::new(),
        clients: HashMap::new(),
        rooms: HashMap::new(),
        player_rooms: HashMap::new(),
        sessions: HashMap::new(),
        player_sessions: HashMap::new(),
        ended_tx,
        receiver: rx,
    };
    tokio::spawn(actor.run());

    LobbyHandle { sender: tx }
}

// ---------------------------------------------------------------------------
// Actor
// ---------------------------------------------------------------------------

struct LobbyActor {
    config: LobbyConfig,
    rules: RulesFactory,

    /// Registered players.
    players: HashMap<PlayerId, Player>,
    /// Delivery addresses for registered players.
    clients: HashMap<PlayerId, ClientHandle>,
    /// Joinable rooms.
    rooms: HashMap<RoomId, LobbyRoom>,
    /// Which joinable room each player is in. At most one entry per
    /// player (key invariant).
    player_rooms: HashMap<PlayerId, RoomId>,
    /// Running sessions, keyed by the room they were started from.
    sessions: HashMap<RoomId, SessionHandle>,
    /// Which session each player is in, for routing actions and
    /// disconnects.
    player_sessions: HashMap<PlayerId, RoomId>,

    ended_tx: mpsc::UnboundedSender<RoomId>,
    receiver: mpsc::UnboundedReceiver<LobbyCommand>,
}

impl LobbyActor {
    async fn run(mut self) {
        tracing::info!("lobby started");
        while let Some(cmd) = self.receiver.recv().await {
            self.handle(cmd);
        }
        tracing::info!("lobby stopped");
    }

    fn handle(&mut self, cmd: LobbyCommand) {
        match cmd {
            LobbyCommand::PlayerConnected {
                player_id,
                player_name,
                client,
            } => self.on_player_connected(player_id, player_name, client),
            LobbyCommand::PlayerDisconnected { player_id } => {
                self.on_player_disconnected(&player_id);
            }
            LobbyCommand::CreateRoom {
                player_id,
                room_name,
            } => self.on_create_room(player_id, room_name),
            LobbyCommand::JoinRoom { player_id, room_id } => {
                self.on_join_room(player_id, room_id);
            }
            LobbyCommand::LeaveRoom { player_id } => {
                self.leave_current_room(&player_id);
            }
            LobbyCommand::ListRooms { player_id } => {
                self.on_list_rooms(&player_id);
            }
            LobbyCommand::StartGame { player_id } => {
                self.on_start_game(&player_id);
            }
            LobbyCommand::PlayerAction { player_id, action } => {
                self.on_player_action(player_id, action);
            }
            LobbyCommand::SessionEnded { room_id } => {
                self.on_session_ended(&room_id);
            }
        }
    }

    // -- Connection lifecycle --

    fn on_player_connected(
        &mut self,
        player_id: PlayerId,
        player_name: String,
        client: ClientHandle,
    ) {
        tracing::info!(%player_id, player_name, "player connected");
        self.players.insert(
            player_id.clone(),
            Player {
                id: player_id.clone(),
                name: player_name,
            },
        );
        self.clients.insert(player_id.clone(), client);

        self.deliver(
            &player_id,
            MessageType::Welcome,
            &WelcomePayload {
                player_id: player_id.clone(),
            },
        );
    }

    fn on_player_disconnected(&mut self, player_id: &PlayerId) {
        tracing::info!(%player_id, "player disconnected");

        if let Some(room_id) = self.player_sessions.remove(player_id) {
            if let Some(session) = self.sessions.get(&room_id) {
                session.player_left(player_id.clone());
            }
        }

        self.leave_current_room(player_id);
        self.players.remove(player_id);
        self.clients.remove(player_id);
    }

    // -- Room management --

    fn on_create_room(&mut self, player_id: PlayerId, room_name: String) {
        if !self.players.contains_key(&player_id) {
            self.deliver_error(&player_id, &LobbyError::NotConnected);
            return;
        }

        self.leave_current_room(&player_id);

        let room_id = RoomId::generate();
        let room =
            LobbyRoom::new(room_id.clone(), room_name, player_id.clone());
        tracing::info!(%room_id, %player_id, "room created");

        let payload = RoomJoinedPayload {
            room_id: room_id.clone(),
            room_name: room.name.clone(),
        };
        self.player_rooms.insert(player_id.clone(), room_id.clone());
        self.rooms.insert(room_id, room);

        self.deliver(&player_id, MessageType::RoomJoined, &payload);
    }

    fn on_join_room(&mut self, player_id: PlayerId, room_id: RoomId) {
        // Rejoining the current room confirms it without churning
        // membership.
        if self.player_rooms.get(&player_id) == Some(&room_id) {
            if let Some(room) = self.rooms.get(&room_id) {
                let payload = RoomJoinedPayload {
                    room_id: room.id.clone(),
                    room_name: room.name.clone(),
                };
                self.deliver(&player_id, MessageType::RoomJoined, &payload);
            }
            return;
        }

        let Some(room) = self.rooms.get(&room_id) else {
            self.deliver_error(
                &player_id,
                &LobbyError::RoomNotFound(room_id),
            );
            return;
        };
        if room.players.len() >= self.config.max_room_players {
            self.deliver_error(&player_id, &LobbyError::RoomFull(room_id));
            return;
        }

        self.leave_current_room(&player_id);

        let Some(room) = self.rooms.get_mut(&room_id) else {
            return;
        };
        room.players.push(player_id.clone());
        let payload = RoomJoinedPayload {
            room_id: room.id.clone(),
            room_name: room.name.clone(),
        };
        self.player_rooms.insert(player_id.clone(), room_id.clone());
        tracing::info!(%player_id, %room_id, "player joined room");

        self.deliver(&player_id, MessageType::RoomJoined, &payload);
        self.broadcast_room_update(&room_id);
    }

    fn on_list_rooms(&self, player_id: &PlayerId) {
        let rooms: Vec<RoomSummary> =
            self.rooms.values().map(LobbyRoom::summary).collect();
        self.deliver(
            player_id,
            MessageType::RoomList,
            &RoomListPayload { rooms },
        );
    }

    // -- Game start --

    fn on_start_game(&mut self, player_id: &PlayerId) {
        let Some(room_id) = self.player_rooms.get(player_id).cloned() else {
            self.deliver_error(player_id, &LobbyError::NotInRoom);
            return;
        };
        let Some(room) = self.rooms.get(&room_id) else {
            self.deliver_error(player_id, &LobbyError::NotInRoom);
            return;
        };
        if &room.host_id != player_id {
            self.deliver_error(player_id, &LobbyError::NotHost);
            return;
        }
        if room.players.len() < self.config.min_players_to_start {
            self.deliver_error(
                player_id,
                &LobbyError::NotEnoughPlayers {
                    needed: self.config.min_players_to_start,
                },
            );
            return;
        }

        let Some(room) = self.rooms.remove(&room_id) else {
            return;
        };
        tracing::info!(
            %room_id,
            host = %player_id,
            players = room.players.len(),
            "starting game"
        );

        // Tell the members first so GAME_STARTING precedes the session's
        // own broadcasts in every outbound queue.
        let payload = GameStartingPayload {
            room_id: room_id.clone(),
        };
        for member in &room.players {
            self.deliver(member, MessageType::GameStarting, &payload);
        }

        // The session gets direct delivery addresses for exactly its
        // members; from here on its broadcasts bypass the lobby.
        let roster = self.roster(&room);
        let mut clients = HashMap::new();
        for member in &room.players {
            if let Some(client) = self.clients.get(member) {
                clients.insert(member.clone(), client.clone());
            }
            self.player_rooms.remove(member);
            self.player_sessions
                .insert(member.clone(), room_id.clone());
        }

        let session = spawn_session(
            room_id.clone(),
            roster,
            clients,
            SessionConfig {
                turn_timeout: self.config.turn_timeout,
            },
            (self.rules)(),
            self.ended_tx.clone(),
        );
        self.sessions.insert(room_id, session);
    }

    // -- Session routing --

    fn on_player_action(&mut self, player_id: PlayerId, action: PlayerAction) {
        let Some(room_id) = self.player_sessions.get(&player_id) else {
            tracing::debug!(
                %player_id,
                kind = %action.kind(),
                "action from player with no active session, dropping"
            );
            return;
        };
        if let Some(session) = self.sessions.get(room_id) {
            session.player_action(player_id, action);
        }
    }

    fn on_session_ended(&mut self, room_id: &RoomId) {
        if self.sessions.remove(room_id).is_some() {
            self.player_sessions.retain(|_, rid| rid != room_id);
            tracing::info!(%room_id, "session ended, routing cleared");
        }
    }

    // -- Shared leave logic --

    /// Removes a player from their current room: the last member out
    /// destroys the room, otherwise the host slot passes to the first
    /// remaining member in join order and the remainder is notified.
    fn leave_current_room(&mut self, player_id: &PlayerId) {
        let Some(room_id) = self.player_rooms.remove(player_id) else {
            return;
        };
        let Some(room) = self.rooms.get_mut(&room_id) else {
            return;
        };
        room.players.retain(|p| p != player_id);

        if room.players.is_empty() {
            self.rooms.remove(&room_id);
            tracing::info!(%room_id, "room removed (empty)");
            return;
        }

        if &room.host_id == player_id {
            room.host_id = room.players[0].clone();
            tracing::info!(
                %room_id,
                new_host = %room.host_id,
                "host reassigned"
            );
        }
        self.broadcast_room_update(&room_id);
    }

    // -- Delivery helpers --

    fn roster(&self, room: &LobbyRoom) -> Vec<PlayerInfo> {
        room.players
            .iter()
            .filter_map(|pid| self.players.get(pid))
            .map(|p| PlayerInfo {
                player_id: p.id.clone(),
                player_name: p.name.clone(),
            })
            .collect()
    }

    fn broadcast_room_update(&self, room_id: &RoomId) {
        let Some(room) = self.rooms.get(room_id) else {
            return;
        };
        let payload = RoomUpdatedPayload {
            room_id: room.id.clone(),
            room_name: room.name.clone(),
            host_id: room.host_id.clone(),
            players: self.roster(room),
        };
        for member in &room.players {
            self.deliver(member, MessageType::RoomUpdated, &payload);
        }
    }

    /// Serializes and enqueues one envelope for one player. Failures are
    /// logged and suppressed per recipient so a broadcast never aborts.
    fn deliver<T: Serialize>(
        &self,
        player_id: &PlayerId,
        kind: MessageType,
        payload: &T,
    ) {
        let Some(client) = self.clients.get(player_id) else {
            return;
        };
        match Envelope::new(kind, payload) {
            Ok(envelope) => client.send(&envelope),
            Err(e) => tracing::error!(
                %player_id,
                %kind,
                error = %e,
                "failed to serialize envelope"
            ),
        }
    }

    fn deliver_error(&self, player_id: &PlayerId, error: &LobbyError) {
        tracing::debug!(
            %player_id,
            code = error.code(),
            "request failed: {error}"
        );
        self.deliver(
            player_id,
            MessageType::Error,
            &ErrorPayload {
                code: error.code().to_string(),
                message: error.to_string(),
            },
        );
    }
}
