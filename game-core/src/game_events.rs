use game_types::{ContestantId, TurnPhase, WinReason};

use crate::SelectionRejection;

/// Everything a single engine mutation produced, in the order it happened.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchEvent {
    SelectionRejected {
        contestant_id: ContestantId,
        reason: SelectionRejection,
    },
    SelectionMissed {
        contestant_id: ContestantId,
    },
    WordFound {
        contestant_id: ContestantId,
        word: String,
        phase: TurnPhase,
        bonus_awarded: bool,
    },
    StealOpened {
        stealer_id: ContestantId,
        word: String,
    },
    WordRetired {
        word: String,
    },
    TurnStarted {
        active_contestant_index: usize,
        turn_number: u64,
    },
    CountdownTicked {
        seconds_remaining: u32,
    },
    BonusSpent {
        contestant_id: ContestantId,
        seconds_added: u32,
        seconds_remaining: u32,
    },
    MatchWon {
        winner_id: ContestantId,
        reason: WinReason,
    },
}

impl MatchEvent {
    /// Rejections and misses leave the canonical state untouched.
    pub fn changes_state(&self) -> bool {
        !matches!(
            self,
            MatchEvent::SelectionRejected { .. } | MatchEvent::SelectionMissed { .. }
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, MatchEvent::MatchWon { .. })
    }
}

/// True when any event in the batch needs to be replicated.
pub fn any_state_change(events: &[MatchEvent]) -> bool {
    events.iter().any(MatchEvent::changes_state)
}
