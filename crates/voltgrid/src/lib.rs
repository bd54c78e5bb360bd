//! # Voltgrid
//!
//! Real-time multiplayer backend for a turn-based power-auction game.
//!
//! Clients connect over WebSocket at `/ws`, handshake for an identity,
//! gather in lobby rooms, and play turn-based sessions. Every stateful
//! component (bridge, lobby, and each game session) is an isolated Tokio
//! task fed by its own channel, so state is never shared and never
//! locked.
//!
//! ```text
//! socket ⇄ bridge ⇄ lobby ⇄ session
//!             ↑ outbound queue (bounded, drop-oldest)
//! ```

mod bridge;
mod error;
mod server;

pub use error::ServerError;
pub use server::{Server, ServerConfig, DEFAULT_PORT};
