//! Game session actor: the per-room turn state machine.
//!
//! One session per started game, spawned by the lobby. The actor owns the
//! ordered roster, the current-turn index, the round counter, and the turn
//! deadline, and holds a direct player→[`ClientHandle`] map so broadcasts
//! need no indirection through the lobby.
//!
//! The turn timer is a `sleep_until` branch of the actor's own
//! `tokio::select!` loop, so an expiry is processed in the same serialized
//! sequence as player commands; a timeout can never race an END_TURN on
//! the same session. Overwriting the deadline replaces the pending timer,
//! which keeps the "at most one outstanding timer per session" invariant
//! by construction.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::time::Instant;
use voltgrid_protocol::{
    Envelope, GameOverPayload, MessageType, PlayerAction, PlayerId,
    PlayerInfo, PlayerTurnPayload, RoomId,
};

use crate::{ClientHandle, RuleEngine};

/// The timer key for the per-turn deadline. There is only one phase key
/// today; rules engines with timed sub-phases would add their own.
pub const TURN_PHASE: &str = "TURN";

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

/// Session lifecycle. Linear, terminal at `Ended`:
///
/// ```text
/// WAITING → STARTING → IN_PROGRESS → ENDED
/// ```
///
/// Construction walks straight through to `IN_PROGRESS`; nothing awaits
/// in the earlier phases today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    Waiting,
    Starting,
    InProgress,
    Ended,
}

impl Phase {
    /// Returns `true` once no further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Ended)
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Phase::Waiting => "WAITING",
            Phase::Starting => "STARTING",
            Phase::InProgress => "IN_PROGRESS",
            Phase::Ended => "ENDED",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Serializable view of the session, broadcast as GAME_STATE_UPDATE after
/// every accepted action, turn advance, and roster change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSnapshot {
    pub room_id: RoomId,
    pub round: u32,
    pub phase: Phase,
    pub current_player_id: Option<PlayerId>,
    pub players: Vec<PlayerInfo>,
}

// ---------------------------------------------------------------------------
// Configuration and commands
// ---------------------------------------------------------------------------

/// Session settings.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// How long the current player gets before the turn is advanced for
    /// them.
    pub turn_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            turn_timeout: Duration::from_secs(120),
        }
    }
}

/// Commands processed by a session actor, one at a time, in arrival order.
#[derive(Debug)]
pub enum SessionCommand {
    /// A game action from a player, routed through the lobby.
    PlayerAction {
        player_id: PlayerId,
        action: PlayerAction,
    },

    /// A phase deadline expired. Fired internally by the turn timer;
    /// carries the phase key the deadline was armed under.
    PhaseTimeout { phase: String },

    /// A member disconnected or otherwise left the game.
    PlayerLeft { player_id: PlayerId },
}

/// Handle to a running session actor. Cheap to clone; sends never block.
#[derive(Clone)]
pub struct SessionHandle {
    room_id: RoomId,
    sender: mpsc::UnboundedSender<SessionCommand>,
}

impl SessionHandle {
    /// The room this session was started from.
    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    /// Forwards a player's game action. Dropped silently once the session
    /// has ended.
    pub fn player_action(&self, player_id: PlayerId, action: PlayerAction) {
        let _ = self
            .sender
            .send(SessionCommand::PlayerAction { player_id, action });
    }

    /// Injects a phase timeout, as the internal timer would.
    pub fn phase_timeout(&self, phase: impl Into<String>) {
        let _ = self.sender.send(SessionCommand::PhaseTimeout {
            phase: phase.into(),
        });
    }

    /// Removes a player from the running game.
    pub fn player_left(&self, player_id: PlayerId) {
        let _ = self
            .sender
            .send(SessionCommand::PlayerLeft { player_id });
    }
}

// ---------------------------------------------------------------------------
// Actor
// ---------------------------------------------------------------------------

/// Spawns a session actor for a started room and returns its handle.
///
/// `players` is the roster in join order; `clients` maps exactly those
/// players to their delivery addresses. `ended_tx` receives the room id
/// once, when the session reaches `ENDED`, so the owner can clean up its
/// routing tables.
pub fn spawn_session(
    room_id: RoomId,
    players: Vec<PlayerInfo>,
    clients: HashMap<PlayerId, ClientHandle>,
    config: SessionConfig,
    rules: Box<dyn RuleEngine>,
    ended_tx: mpsc::UnboundedSender<RoomId>,
) -> SessionHandle {
    let (tx, rx) = mpsc::unbounded_channel();

    let session = GameSession {
        room_id: room_id.clone(),
        players,
        clients,
        phase: Phase::Waiting,
        round: 1,
        current: 0,
        config,
        rules,
        deadline: None,
        ended_tx,
        receiver: rx,
    };

    tokio::spawn(session.run());

    SessionHandle {
        room_id,
        sender: tx,
    }
}

struct GameSession {
    room_id: RoomId,
    /// Roster in join order. `current` always indexes into this.
    players: Vec<PlayerInfo>,
    clients: HashMap<PlayerId, ClientHandle>,
    phase: Phase,
    round: u32,
    current: usize,
    config: SessionConfig,
    rules: Box<dyn RuleEngine>,
    /// Pending turn deadline. `None` means no timer armed.
    deadline: Option<Instant>,
    ended_tx: mpsc::UnboundedSender<RoomId>,
    receiver: mpsc::UnboundedReceiver<SessionCommand>,
}

impl GameSession {
    async fn run(mut self) {
        self.begin();

        while !self.phase.is_terminal() {
            let deadline = self.deadline;
            let timer = async move {
                match deadline {
                    Some(at) => tokio::time::sleep_until(at).await,
                    // No timer armed: pend forever, select! keeps
                    // serving the command branch.
                    None => std::future::pending().await,
                }
            };

            tokio::select! {
                cmd = self.receiver.recv() => match cmd {
                    Some(cmd) => self.handle(cmd),
                    None => break,
                },
                _ = timer => self.on_phase_timeout(TURN_PHASE),
            }
        }

        tracing::info!(room_id = %self.room_id, "session actor stopped");
    }

    fn begin(&mut self) {
        self.phase = Phase::Starting;
        tracing::debug!(room_id = %self.room_id, "session starting");

        self.phase = Phase::InProgress;
        tracing::info!(
            room_id = %self.room_id,
            players = self.players.len(),
            "game started"
        );
        self.broadcast_snapshot();
        self.broadcast_turn();
        self.arm_turn_timer();
    }

    fn handle(&mut self, cmd: SessionCommand) {
        match cmd {
            SessionCommand::PlayerAction { player_id, action } => {
                self.on_player_action(player_id, action);
            }
            SessionCommand::PhaseTimeout { phase } => {
                self.on_phase_timeout(&phase);
            }
            SessionCommand::PlayerLeft { player_id } => {
                self.on_player_left(&player_id);
            }
        }
    }

    fn on_player_action(&mut self, player_id: PlayerId, action: PlayerAction) {
        if self.phase != Phase::InProgress {
            tracing::warn!(
                room_id = %self.room_id,
                %player_id,
                kind = %action.kind(),
                phase = %self.phase,
                "ignoring action outside of play"
            );
            return;
        }

        match action {
            // END_TURN is the session's own business, never the rules
            // engine's.
            PlayerAction::EndTurn => self.on_end_turn(&player_id),
            other => self.apply_rules(&player_id, &other),
        }
    }

    fn on_end_turn(&mut self, player_id: &PlayerId) {
        let Some(current) = self.players.get(self.current) else {
            return;
        };
        if &current.player_id != player_id {
            tracing::warn!(
                room_id = %self.room_id,
                %player_id,
                "out-of-turn END_TURN, ignoring"
            );
            return;
        }
        self.advance_turn();
    }

    fn apply_rules(&mut self, player_id: &PlayerId, action: &PlayerAction) {
        let snapshot = self.snapshot();
        match self.rules.apply(&snapshot, player_id, action) {
            Ok(events) => {
                for envelope in &events {
                    self.broadcast(envelope);
                }
                self.broadcast_snapshot();
            }
            Err(reason) => {
                tracing::debug!(
                    room_id = %self.room_id,
                    %player_id,
                    kind = %action.kind(),
                    %reason,
                    "action rejected by rules"
                );
            }
        }
    }

    fn on_phase_timeout(&mut self, phase: &str) {
        if self.phase != Phase::InProgress {
            return;
        }
        tracing::info!(room_id = %self.room_id, phase, "phase timeout");
        self.advance_turn();
    }

    fn on_player_left(&mut self, player_id: &PlayerId) {
        let Some(index) =
            self.players.iter().position(|p| &p.player_id == player_id)
        else {
            return;
        };
        self.players.remove(index);
        self.clients.remove(player_id);
        tracing::info!(
            room_id = %self.room_id,
            %player_id,
            remaining = self.players.len(),
            "player left game"
        );

        // Keep `current` pointing at a live member: a departed
        // predecessor shifts everyone down one, a departure at or past
        // the end wraps to the front.
        if index < self.current {
            self.current -= 1;
        } else if self.current >= self.players.len() {
            self.current = 0;
        }

        if self.players.len() < 2 {
            self.end_game("Player disconnected, not enough players to continue.");
            return;
        }
        self.broadcast_snapshot();
    }

    fn advance_turn(&mut self) {
        // Dropping the deadline cancels the pending timer before its
        // replacement is armed.
        self.deadline = None;
        if self.players.is_empty() {
            return;
        }

        self.current = (self.current + 1) % self.players.len();
        if self.current == 0 {
            self.round += 1;
        }

        self.broadcast_snapshot();
        self.broadcast_turn();
        self.arm_turn_timer();
    }

    fn end_game(&mut self, reason: &str) {
        if self.phase.is_terminal() {
            return;
        }
        self.phase = Phase::Ended;
        self.deadline = None;
        tracing::info!(room_id = %self.room_id, reason, "game over");

        match Envelope::new(
            MessageType::GameOver,
            &GameOverPayload {
                room_id: self.room_id.clone(),
                reason: reason.to_string(),
            },
        ) {
            Ok(envelope) => self.broadcast(&envelope),
            Err(e) => tracing::error!(
                room_id = %self.room_id,
                error = %e,
                "failed to serialize game-over payload"
            ),
        }

        let _ = self.ended_tx.send(self.room_id.clone());
    }

    fn snapshot(&self) -> GameSnapshot {
        GameSnapshot {
            room_id: self.room_id.clone(),
            round: self.round,
            phase: self.phase,
            current_player_id: self
                .players
                .get(self.current)
                .map(|p| p.player_id.clone()),
            players: self.players.clone(),
        }
    }

    fn broadcast_snapshot(&self) {
        match Envelope::new(MessageType::GameStateUpdate, &self.snapshot()) {
            Ok(envelope) => self.broadcast(&envelope),
            Err(e) => tracing::error!(
                room_id = %self.room_id,
                error = %e,
                "failed to serialize game state"
            ),
        }
    }

    fn broadcast_turn(&self) {
        let Some(current) = self.players.get(self.current) else {
            return;
        };
        match Envelope::new(
            MessageType::PlayerTurn,
            &PlayerTurnPayload {
                player_id: current.player_id.clone(),
            },
        ) {
            Ok(envelope) => self.broadcast(&envelope),
            Err(e) => tracing::error!(
                room_id = %self.room_id,
                error = %e,
                "failed to serialize turn notice"
            ),
        }
    }

    /// Delivers an envelope to every member. Members whose address is
    /// gone are skipped; one bad recipient never aborts the others.
    fn broadcast(&self, envelope: &Envelope) {
        for player in &self.players {
            if let Some(client) = self.clients.get(&player.player_id) {
                client.send(envelope);
            }
        }
    }

    fn arm_turn_timer(&mut self) {
        self.deadline = Some(Instant::now() + self.config.turn_timeout);
    }
}
