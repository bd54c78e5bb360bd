//! Game session management for Voltgrid.
//!
//! Each started game runs as an isolated Tokio task (actor model) owning
//! the turn state machine for one room: player order, round counter,
//! phase, and turn-timeout scheduling.
//!
//! # Key types
//!
//! - [`spawn_session`] / [`SessionHandle`]: start a session actor and
//!   send commands to it
//! - [`Phase`] / [`GameSnapshot`]: the lifecycle state machine and the
//!   serializable view broadcast to members
//! - [`RuleEngine`]: the extension point where actual game rules live
//! - [`ClientHandle`] / [`outbound_channel`]: the bounded, drop-oldest
//!   delivery address used for all outbound traffic

mod outbound;
mod rules;
mod session;

pub use outbound::{
    outbound_channel, ClientHandle, OutboundReceiver, OUTBOUND_CAPACITY,
};
pub use rules::{RuleEngine, StubRules};
pub use session::{
    spawn_session, GameSnapshot, Phase, SessionCommand, SessionConfig,
    SessionHandle, TURN_PHASE,
};
