//! Wire protocol for Voltgrid.
//!
//! This crate defines the language clients and the server speak:
//!
//! - **Types** ([`Envelope`], [`MessageType`], [`ClientCommand`], payload
//!   structs): the structures that travel on the wire.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how those messages are
//!   converted to/from text frames.
//! - **Errors** ([`ProtocolError`]): what can go wrong on the way.
//!
//! The protocol layer sits between transport (raw frames) and the actors
//! (lobby, sessions). It doesn't know about connections or rooms; it only
//! knows how to turn text into typed commands and typed payloads into text.
//!
//! ```text
//! Transport (text) → Protocol (Envelope/ClientCommand) → Lobby/Session
//! ```

mod codec;
mod error;
mod types;

pub use codec::{Codec, JsonCodec};
pub use error::ProtocolError;
pub use types::{
    ClientCommand, Envelope, ErrorPayload, GameOverPayload,
    GameStartingPayload, MessageType, PlayerAction, PlayerId, PlayerInfo,
    PlayerTurnPayload, RoomId, RoomJoinedPayload, RoomListPayload,
    RoomSummary, RoomUpdatedPayload, WelcomePayload,
};
