//! The rules-engine extension point.
//!
//! The session owns turn order, timing, and broadcasting; what a bid or a
//! purchase actually *does* lives behind [`RuleEngine`]. A real
//! implementation keeps its own auction/market state and may emit extra
//! envelopes (AUCTION_STARTED, BID_PLACED, PLANT_SOLD) ahead of the
//! snapshot the session broadcasts after every accepted action.

use voltgrid_protocol::{Envelope, PlayerAction, PlayerId};

use crate::GameSnapshot;

/// Game rules invoked by the session for every non-END_TURN action that
/// arrives while the game is in progress.
pub trait RuleEngine: Send + 'static {
    /// Applies one player action.
    ///
    /// On acceptance, returns envelopes to broadcast before the session's
    /// snapshot broadcast (may be empty). On rejection, returns the reason;
    /// the session logs it and broadcasts nothing.
    fn apply(
        &mut self,
        snapshot: &GameSnapshot,
        sender: &PlayerId,
        action: &PlayerAction,
    ) -> Result<Vec<Envelope>, String>;
}

/// Placeholder rules: every action is accepted with no effect and no extra
/// events, so the observable behavior is "re-broadcast the current
/// snapshot".
#[derive(Debug, Clone, Copy, Default)]
pub struct StubRules;

impl RuleEngine for StubRules {
    fn apply(
        &mut self,
        _snapshot: &GameSnapshot,
        sender: &PlayerId,
        action: &PlayerAction,
    ) -> Result<Vec<Envelope>, String> {
        tracing::debug!(
            %sender,
            kind = %action.kind(),
            "rules stub accepted action with no effect"
        );
        Ok(Vec::new())
    }
}
