//! Error types for lobby requests.

use voltgrid_protocol::RoomId;

/// A precondition violation on a lobby request.
///
/// These are surfaced to the requesting connection as an ERROR envelope
/// carrying [`code`](LobbyError::code) and the display message; no state
/// is mutated.
#[derive(Debug, thiserror::Error)]
pub enum LobbyError {
    /// The player never completed a handshake.
    #[error("Player not registered.")]
    NotConnected,

    /// The room id is unknown.
    #[error("Room does not exist.")]
    RoomNotFound(RoomId),

    /// The room is at capacity.
    #[error("Room is full.")]
    RoomFull(RoomId),

    /// The player has no current room.
    #[error("You are not in a room.")]
    NotInRoom,

    /// Only the host may perform this operation.
    #[error("Only the host can start the game.")]
    NotHost,

    /// The room is below the minimum size for this operation.
    #[error("Need at least {needed} players to start.")]
    NotEnoughPlayers { needed: usize },
}

impl LobbyError {
    /// The stable machine-readable code carried in ERROR payloads.
    pub fn code(&self) -> &'static str {
        match self {
            LobbyError::NotConnected => "NOT_CONNECTED",
            LobbyError::RoomNotFound(_) => "ROOM_NOT_FOUND",
            LobbyError::RoomFull(_) => "ROOM_FULL",
            LobbyError::NotInRoom => "NOT_IN_ROOM",
            LobbyError::NotHost => "NOT_HOST",
            LobbyError::NotEnoughPlayers { .. } => "NOT_ENOUGH_PLAYERS",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(LobbyError::NotConnected.code(), "NOT_CONNECTED");
        assert_eq!(
            LobbyError::RoomFull(RoomId("r".into())).code(),
            "ROOM_FULL"
        );
        assert_eq!(
            LobbyError::NotEnoughPlayers { needed: 2 }.code(),
            "NOT_ENOUGH_PLAYERS"
        );
    }

    #[test]
    fn test_messages_are_human_readable() {
        assert_eq!(
            LobbyError::NotHost.to_string(),
            "Only the host can start the game."
        );
        assert_eq!(
            LobbyError::NotEnoughPlayers { needed: 2 }.to_string(),
            "Need at least 2 players to start."
        );
    }
}
