//! Core protocol types for Voltgrid's wire format.
//!
//! Every message on the wire is an [`Envelope`]: a `type` discriminator
//! drawn from the closed [`MessageType`] enumeration plus an optional JSON
//! `payload`. Inbound envelopes are converted to a typed [`ClientCommand`]
//! at parse time so that business logic never sees a raw JSON tree.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A unique, opaque identifier for a player.
///
/// Generated server-side when a connection is opened, before any handshake.
/// `#[serde(transparent)]` makes it serialize as a plain JSON string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub String);

impl PlayerId {
    /// Generates a fresh random id (32 lowercase hex chars, 128 bits).
    pub fn generate() -> Self {
        Self(random_id())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A unique, opaque identifier for a lobby room (and the session spawned
/// from it).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(pub String);

impl RoomId {
    /// Generates a fresh random id (32 lowercase hex chars, 128 bits).
    pub fn generate() -> Self {
        Self(random_id())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn random_id() -> String {
    use rand::Rng;
    let mut rng = rand::rng();
    format!("{:016x}{:016x}", rng.random::<u64>(), rng.random::<u64>())
}

// ---------------------------------------------------------------------------
// MessageType: the closed set of wire kinds
// ---------------------------------------------------------------------------

/// Every valid `type` discriminator on the wire, in both directions.
///
/// The wire spelling is SCREAMING_SNAKE_CASE (`"BID_PLANT"`); an envelope
/// whose tag is not one of these fails to decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageType {
    // -- Client → Server --
    /// Initial handshake. Payload: `{ "playerName": "..." }`.
    Hello,
    /// Request the current lobby room list. No payload.
    ListRooms,
    /// Create a new game room. Payload: `{ "roomName": "..." }`.
    CreateRoom,
    /// Join an existing room. Payload: `{ "roomId": "..." }`.
    JoinRoom,
    /// Leave the current room. No payload.
    LeaveRoom,
    /// Host starts the game. No payload.
    StartGame,
    /// Bid on a power plant. Payload: `{ "plantId": int, "amount": int }`.
    BidPlant,
    /// Pass during an auction round. No payload.
    PassBid,
    /// Buy resources from the market. Payload: `{ "resource": "...", "amount": int }`.
    BuyResource,
    /// Build in a city. Payload: `{ "cityId": "..." }`.
    BuildCity,
    /// End the current player's turn. No payload.
    EndTurn,
    /// Keep-alive ping. No payload.
    Ping,

    // -- Server → Client --
    /// Assigns the player id after HELLO. Payload: `{ "playerId": "..." }`.
    Welcome,
    /// Request failure. Payload: `{ "code": "...", "message": "..." }`.
    Error,
    /// Snapshot of joinable rooms. Payload: `{ "rooms": [ ... ] }`.
    RoomList,
    /// The player entered a room. Payload: `{ "roomId": "...", "roomName": "..." }`.
    RoomJoined,
    /// Room membership changed. Payload: roster snapshot.
    RoomUpdated,
    /// The game is about to begin. Payload: `{ "roomId": "..." }`.
    GameStarting,
    /// Full session snapshot after every accepted action.
    GameStateUpdate,
    /// Whose turn it is. Payload: `{ "playerId": "..." }`.
    PlayerTurn,
    /// A power plant auction began. Payload: `{ "plantId": int, "minimumBid": int }`.
    AuctionStarted,
    /// A bid was placed. Payload: `{ "playerId": "...", "plantId": int, "amount": int }`.
    BidPlaced,
    /// A power plant was sold. Payload: `{ "playerId": "...", "plantId": int, "amount": int }`.
    PlantSold,
    /// The game ended. Payload: `{ "roomId": "...", "reason": "..." }`.
    GameOver,
    /// Keep-alive response. No payload.
    Pong,
}

impl MessageType {
    /// Every kind, client-bound and server-bound. Handy for exhaustive tests.
    pub const ALL: [MessageType; 25] = [
        MessageType::Hello,
        MessageType::ListRooms,
        MessageType::CreateRoom,
        MessageType::JoinRoom,
        MessageType::LeaveRoom,
        MessageType::StartGame,
        MessageType::BidPlant,
        MessageType::PassBid,
        MessageType::BuyResource,
        MessageType::BuildCity,
        MessageType::EndTurn,
        MessageType::Ping,
        MessageType::Welcome,
        MessageType::Error,
        MessageType::RoomList,
        MessageType::RoomJoined,
        MessageType::RoomUpdated,
        MessageType::GameStarting,
        MessageType::GameStateUpdate,
        MessageType::PlayerTurn,
        MessageType::AuctionStarted,
        MessageType::BidPlaced,
        MessageType::PlantSold,
        MessageType::GameOver,
        MessageType::Pong,
    ];
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Matches the wire spelling exactly.
        let name = match self {
            MessageType::Hello => "HELLO",
            MessageType::ListRooms => "LIST_ROOMS",
            MessageType::CreateRoom => "CREATE_ROOM",
            MessageType::JoinRoom => "JOIN_ROOM",
            MessageType::LeaveRoom => "LEAVE_ROOM",
            MessageType::StartGame => "START_GAME",
            MessageType::BidPlant => "BID_PLANT",
            MessageType::PassBid => "PASS_BID",
            MessageType::BuyResource => "BUY_RESOURCE",
            MessageType::BuildCity => "BUILD_CITY",
            MessageType::EndTurn => "END_TURN",
            MessageType::Ping => "PING",
            MessageType::Welcome => "WELCOME",
            MessageType::Error => "ERROR",
            MessageType::RoomList => "ROOM_LIST",
            MessageType::RoomJoined => "ROOM_JOINED",
            MessageType::RoomUpdated => "ROOM_UPDATED",
            MessageType::GameStarting => "GAME_STARTING",
            MessageType::GameStateUpdate => "GAME_STATE_UPDATE",
            MessageType::PlayerTurn => "PLAYER_TURN",
            MessageType::AuctionStarted => "AUCTION_STARTED",
            MessageType::BidPlaced => "BID_PLACED",
            MessageType::PlantSold => "PLANT_SOLD",
            MessageType::GameOver => "GAME_OVER",
            MessageType::Pong => "PONG",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// Envelope: the top-level wire format
// ---------------------------------------------------------------------------

/// The directionless message wrapper: `{ "type": "<KIND>", "payload": ... }`.
///
/// `payload` is omitted on the wire when absent; whether it is required
/// depends on the kind and is checked when converting to a typed command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: MessageType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

impl Envelope {
    /// Builds an envelope by serializing a typed payload.
    pub fn new<T: Serialize>(
        kind: MessageType,
        payload: &T,
    ) -> Result<Self, ProtocolError> {
        let value =
            serde_json::to_value(payload).map_err(ProtocolError::Encode)?;
        Ok(Self {
            kind,
            payload: Some(value),
        })
    }

    /// Builds a payload-less envelope (PING, PONG, ...).
    pub fn bare(kind: MessageType) -> Self {
        Self {
            kind,
            payload: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Typed inbound commands
// ---------------------------------------------------------------------------

/// A game action forwarded to a running session.
///
/// Everything except `EndTurn` is interpreted by the rules engine; the
/// session only guarantees the action arrived while the game was in
/// progress.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerAction {
    BidPlant { plant_id: u32, amount: u32 },
    PassBid,
    BuyResource { resource: String, amount: u32 },
    BuildCity { city_id: String },
    EndTurn,
}

impl PlayerAction {
    /// The wire kind this action arrived as.
    pub fn kind(&self) -> MessageType {
        match self {
            PlayerAction::BidPlant { .. } => MessageType::BidPlant,
            PlayerAction::PassBid => MessageType::PassBid,
            PlayerAction::BuyResource { .. } => MessageType::BuyResource,
            PlayerAction::BuildCity { .. } => MessageType::BuildCity,
            PlayerAction::EndTurn => MessageType::EndTurn,
        }
    }
}

/// A validated client→server message, produced from an [`Envelope`] at
/// parse time. Unknown kinds, server-bound kinds, and malformed payloads
/// never make it past [`ClientCommand::from_envelope`].
#[derive(Debug, Clone, PartialEq)]
pub enum ClientCommand {
    Hello { player_name: String },
    ListRooms,
    CreateRoom { room_name: String },
    JoinRoom { room_id: RoomId },
    LeaveRoom,
    StartGame,
    Action(PlayerAction),
    Ping,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct HelloRequest {
    #[serde(default = "default_player_name")]
    player_name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateRoomRequest {
    #[serde(default = "default_room_name")]
    room_name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct JoinRoomRequest {
    room_id: RoomId,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BidPlantRequest {
    plant_id: u32,
    amount: u32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BuyResourceRequest {
    resource: String,
    amount: u32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BuildCityRequest {
    city_id: String,
}

fn default_player_name() -> String {
    "Unknown".to_string()
}

fn default_room_name() -> String {
    "New Room".to_string()
}

impl ClientCommand {
    /// Converts a decoded envelope into a typed command.
    ///
    /// # Errors
    /// Returns [`ProtocolError::InvalidMessage`] when the kind is
    /// server-bound or the payload is missing a required field / has the
    /// wrong shape.
    pub fn from_envelope(envelope: Envelope) -> Result<Self, ProtocolError> {
        let Envelope { kind, payload } = envelope;

        match kind {
            MessageType::Hello => {
                let req: HelloRequest = extract(kind, payload)?;
                Ok(ClientCommand::Hello {
                    player_name: req.player_name,
                })
            }
            MessageType::ListRooms => Ok(ClientCommand::ListRooms),
            MessageType::CreateRoom => {
                let req: CreateRoomRequest = extract(kind, payload)?;
                Ok(ClientCommand::CreateRoom {
                    room_name: req.room_name,
                })
            }
            MessageType::JoinRoom => {
                let req: JoinRoomRequest = extract(kind, payload)?;
                Ok(ClientCommand::JoinRoom {
                    room_id: req.room_id,
                })
            }
            MessageType::LeaveRoom => Ok(ClientCommand::LeaveRoom),
            MessageType::StartGame => Ok(ClientCommand::StartGame),
            MessageType::BidPlant => {
                let req: BidPlantRequest = extract(kind, payload)?;
                Ok(ClientCommand::Action(PlayerAction::BidPlant {
                    plant_id: req.plant_id,
                    amount: req.amount,
                }))
            }
            MessageType::PassBid => {
                Ok(ClientCommand::Action(PlayerAction::PassBid))
            }
            MessageType::BuyResource => {
                let req: BuyResourceRequest = extract(kind, payload)?;
                Ok(ClientCommand::Action(PlayerAction::BuyResource {
                    resource: req.resource,
                    amount: req.amount,
                }))
            }
            MessageType::BuildCity => {
                let req: BuildCityRequest = extract(kind, payload)?;
                Ok(ClientCommand::Action(PlayerAction::BuildCity {
                    city_id: req.city_id,
                }))
            }
            MessageType::EndTurn => {
                Ok(ClientCommand::Action(PlayerAction::EndTurn))
            }
            MessageType::Ping => Ok(ClientCommand::Ping),
            other => Err(ProtocolError::InvalidMessage(format!(
                "{other} is not a client message"
            ))),
        }
    }
}

/// Deserializes a kind-specific payload. An absent payload is treated as
/// an empty object so kinds with defaultable fields still parse.
fn extract<T: serde::de::DeserializeOwned>(
    kind: MessageType,
    payload: Option<Value>,
) -> Result<T, ProtocolError> {
    let value = payload.unwrap_or_else(|| Value::Object(Default::default()));
    serde_json::from_value(value)
        .map_err(|e| ProtocolError::InvalidMessage(format!("{kind}: {e}")))
}

// ---------------------------------------------------------------------------
// Outbound payload shapes
// ---------------------------------------------------------------------------

/// One `{playerId, playerName}` roster entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerInfo {
    pub player_id: PlayerId,
    pub player_name: String,
}

/// Payload of [`MessageType::Welcome`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WelcomePayload {
    pub player_id: PlayerId,
}

/// Payload of [`MessageType::Error`]: a stable machine code plus a
/// human-readable message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorPayload {
    pub code: String,
    pub message: String,
}

/// One joinable room in a [`MessageType::RoomList`] snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummary {
    pub room_id: RoomId,
    pub room_name: String,
    pub player_count: usize,
    pub host_id: PlayerId,
}

/// Payload of [`MessageType::RoomList`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomListPayload {
    pub rooms: Vec<RoomSummary>,
}

/// Payload of [`MessageType::RoomJoined`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomJoinedPayload {
    pub room_id: RoomId,
    pub room_name: String,
}

/// Payload of [`MessageType::RoomUpdated`]: the full roster after a
/// membership change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomUpdatedPayload {
    pub room_id: RoomId,
    pub room_name: String,
    pub host_id: PlayerId,
    pub players: Vec<PlayerInfo>,
}

/// Payload of [`MessageType::GameStarting`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameStartingPayload {
    pub room_id: RoomId,
}

/// Payload of [`MessageType::PlayerTurn`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerTurnPayload {
    pub player_id: PlayerId,
}

/// Payload of [`MessageType::GameOver`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameOverPayload {
    pub room_id: RoomId,
    pub reason: String,
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_id_serializes_as_plain_string() {
        let json = serde_json::to_string(&PlayerId("abc123".into())).unwrap();
        assert_eq!(json, "\"abc123\"");
    }

    #[test]
    fn test_player_id_generate_is_hex_and_unique() {
        let a = PlayerId::generate();
        let b = PlayerId::generate();
        assert_eq!(a.as_str().len(), 32);
        assert!(a.as_str().chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn test_message_type_wire_spelling() {
        let json = serde_json::to_string(&MessageType::BidPlant).unwrap();
        assert_eq!(json, "\"BID_PLANT\"");
        let json = serde_json::to_string(&MessageType::GameStateUpdate).unwrap();
        assert_eq!(json, "\"GAME_STATE_UPDATE\"");
    }

    #[test]
    fn test_message_type_display_matches_wire_spelling() {
        for kind in MessageType::ALL {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{kind}\""));
        }
    }

    #[test]
    fn test_envelope_without_payload_omits_key() {
        let env = Envelope::bare(MessageType::Ping);
        let json = serde_json::to_string(&env).unwrap();
        assert_eq!(json, r#"{"type":"PING"}"#);
    }

    #[test]
    fn test_envelope_round_trip_preserves_kind_for_every_type() {
        for kind in MessageType::ALL {
            let env = Envelope::bare(kind);
            let json = serde_json::to_string(&env).unwrap();
            let decoded: Envelope = serde_json::from_str(&json).unwrap();
            assert_eq!(decoded.kind, kind, "kind {kind} did not survive");
        }
    }

    #[test]
    fn test_envelope_with_payload_round_trip() {
        let env = Envelope::new(
            MessageType::Welcome,
            &WelcomePayload {
                player_id: PlayerId("p-1".into()),
            },
        )
        .unwrap();
        let json = serde_json::to_string(&env).unwrap();
        let decoded: Envelope = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, env);
        assert_eq!(decoded.payload.unwrap()["playerId"], "p-1");
    }

    #[test]
    fn test_envelope_unknown_kind_fails() {
        let result: Result<Envelope, _> =
            serde_json::from_str(r#"{"type":"FLY_TO_MOON"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_envelope_garbage_fails() {
        let result: Result<Envelope, _> =
            serde_json::from_str("not json at all");
        assert!(result.is_err());
    }

    #[test]
    fn test_hello_with_name() {
        let env: Envelope = serde_json::from_str(
            r#"{"type":"HELLO","payload":{"playerName":"Alice"}}"#,
        )
        .unwrap();
        let cmd = ClientCommand::from_envelope(env).unwrap();
        assert_eq!(
            cmd,
            ClientCommand::Hello {
                player_name: "Alice".into()
            }
        );
    }

    #[test]
    fn test_hello_without_payload_defaults_name() {
        let env: Envelope =
            serde_json::from_str(r#"{"type":"HELLO"}"#).unwrap();
        let cmd = ClientCommand::from_envelope(env).unwrap();
        assert_eq!(
            cmd,
            ClientCommand::Hello {
                player_name: "Unknown".into()
            }
        );
    }

    #[test]
    fn test_create_room_defaults_name() {
        let env: Envelope = serde_json::from_str(
            r#"{"type":"CREATE_ROOM","payload":{}}"#,
        )
        .unwrap();
        let cmd = ClientCommand::from_envelope(env).unwrap();
        assert_eq!(
            cmd,
            ClientCommand::CreateRoom {
                room_name: "New Room".into()
            }
        );
    }

    #[test]
    fn test_join_room_requires_room_id() {
        let env: Envelope =
            serde_json::from_str(r#"{"type":"JOIN_ROOM","payload":{}}"#)
                .unwrap();
        let result = ClientCommand::from_envelope(env);
        assert!(matches!(
            result,
            Err(ProtocolError::InvalidMessage(_))
        ));
    }

    #[test]
    fn test_bid_plant_payload() {
        let env: Envelope = serde_json::from_str(
            r#"{"type":"BID_PLANT","payload":{"plantId":4,"amount":21}}"#,
        )
        .unwrap();
        let cmd = ClientCommand::from_envelope(env).unwrap();
        assert_eq!(
            cmd,
            ClientCommand::Action(PlayerAction::BidPlant {
                plant_id: 4,
                amount: 21
            })
        );
    }

    #[test]
    fn test_end_turn_is_an_action() {
        let env: Envelope =
            serde_json::from_str(r#"{"type":"END_TURN"}"#).unwrap();
        let cmd = ClientCommand::from_envelope(env).unwrap();
        assert_eq!(cmd, ClientCommand::Action(PlayerAction::EndTurn));
        assert_eq!(PlayerAction::EndTurn.kind(), MessageType::EndTurn);
    }

    #[test]
    fn test_server_bound_kind_rejected_inbound() {
        let env: Envelope =
            serde_json::from_str(r#"{"type":"WELCOME"}"#).unwrap();
        let result = ClientCommand::from_envelope(env);
        assert!(matches!(
            result,
            Err(ProtocolError::InvalidMessage(_))
        ));
    }

    #[test]
    fn test_room_updated_payload_uses_camel_case_keys() {
        let payload = RoomUpdatedPayload {
            room_id: RoomId("r-1".into()),
            room_name: "Test".into(),
            host_id: PlayerId("p-1".into()),
            players: vec![PlayerInfo {
                player_id: PlayerId("p-1".into()),
                player_name: "Alice".into(),
            }],
        };
        let json: Value = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["roomId"], "r-1");
        assert_eq!(json["hostId"], "p-1");
        assert_eq!(json["players"][0]["playerName"], "Alice");
    }

    #[test]
    fn test_room_list_payload_shape() {
        let payload = RoomListPayload {
            rooms: vec![RoomSummary {
                room_id: RoomId("r-9".into()),
                room_name: "Open".into(),
                player_count: 3,
                host_id: PlayerId("h".into()),
            }],
        };
        let json: Value = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["rooms"][0]["playerCount"], 3);
        assert_eq!(json["rooms"][0]["roomName"], "Open");
    }
}
