use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::ContestantId;

/// Why an action from a contestant was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum Violation {
    UnknownContestant,
    NotYourTurn,
    CountdownElapsed,
    MatchAlreadyDecided,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, thiserror::Error)]
#[ts(export)]
pub enum MatchError {
    #[error("only {usable} usable words, {required} required")]
    GenerationShortfall { usable: u32, required: u32 },
    #[error("contestant {contestant_id} may not act: {violation:?}")]
    OwnershipViolation {
        contestant_id: ContestantId,
        violation: Violation,
    },
    #[error("peer link lost")]
    LinkLost,
    #[error("remote side failed: {message}")]
    RemoteFault { message: String },
    #[error("invalid match state: {current_state}")]
    InvalidMatchState { current_state: String },
}

impl MatchError {
    /// Link loss and remote faults end the match on both sides.
    pub fn is_terminal(&self) -> bool {
        matches!(self, MatchError::LinkLost | MatchError::RemoteFault { .. })
    }
}
