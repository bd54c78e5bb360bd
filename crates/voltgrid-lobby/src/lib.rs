//! Lobby layer for Voltgrid.
//!
//! One lobby actor per process owns the player registry, the joinable
//! room registry, and the player→room membership index, and spawns a
//! game session per started room.
//!
//! # Key types
//!
//! - [`spawn_lobby`] / [`LobbyHandle`]: start the actor and send
//!   commands to it
//! - [`LobbyCommand`]: everything a bridge can ask of the lobby
//! - [`LobbyRoom`] / [`Player`]: the registry model
//! - [`LobbyError`]: request precondition failures and their stable
//!   wire codes

mod error;
mod lobby;
mod room;

pub use error::LobbyError;
pub use lobby::{
    spawn_lobby, spawn_lobby_with, LobbyCommand, LobbyConfig, LobbyHandle,
    RulesFactory,
};
pub use room::{LobbyRoom, Player};
