//! Lobby domain model: registered players and joinable rooms.

use voltgrid_protocol::{PlayerId, RoomId, RoomSummary};

/// A registered player.
#[derive(Debug, Clone)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
}

/// A joinable pre-game room.
///
/// Member order is join order; when the host leaves, the slot passes to
/// the longest-standing remaining member. The host is always a member.
#[derive(Debug, Clone)]
pub struct LobbyRoom {
    pub id: RoomId,
    pub name: String,
    pub host_id: PlayerId,
    pub players: Vec<PlayerId>,
}

impl LobbyRoom {
    /// Creates a room with the creator as sole member and host.
    pub fn new(id: RoomId, name: String, host_id: PlayerId) -> Self {
        Self {
            id,
            name,
            players: vec![host_id.clone()],
            host_id,
        }
    }

    /// Returns `true` if the player is a member.
    pub fn contains(&self, player_id: &PlayerId) -> bool {
        self.players.contains(player_id)
    }

    /// The room-list entry for this room.
    pub fn summary(&self) -> RoomSummary {
        RoomSummary {
            room_id: self.id.clone(),
            room_name: self.name.clone(),
            player_count: self.players.len(),
            host_id: self.host_id.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid(name: &str) -> PlayerId {
        PlayerId(name.to_string())
    }

    #[test]
    fn test_new_room_has_creator_as_sole_member_and_host() {
        let room = LobbyRoom::new(RoomId("r".into()), "Test".into(), pid("p1"));
        assert_eq!(room.players, vec![pid("p1")]);
        assert_eq!(room.host_id, pid("p1"));
        assert!(room.contains(&pid("p1")));
        assert!(!room.contains(&pid("p2")));
    }

    #[test]
    fn test_summary_reflects_membership() {
        let mut room =
            LobbyRoom::new(RoomId("r".into()), "Test".into(), pid("p1"));
        room.players.push(pid("p2"));
        let summary = room.summary();
        assert_eq!(summary.player_count, 2);
        assert_eq!(summary.host_id, pid("p1"));
        assert_eq!(summary.room_name, "Test");
    }
}
