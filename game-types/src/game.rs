use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::{Contestant, ContestantId, Puzzle, WordLocation};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum MatchMode {
    HumanVsHuman,
    HumanVsComputer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl std::str::FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(format!("unknown difficulty '{}'", other)),
        }
    }
}

/// The side a peer plays over the canonical match state; fixed for the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum PeerRole {
    Authority,
    Mirror,
}

impl PeerRole {
    /// Contestant slot owned by this side. The Authority is always index 0.
    pub fn contestant_index(self) -> usize {
        match self {
            PeerRole::Authority => 0,
            PeerRole::Mirror => 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct MatchConfig {
    pub words_required: u32,
    pub total_words_requested: u32,
    pub turn_duration_seconds: u32,
    pub bonus_threshold_seconds: u32,
    pub bonus_award_seconds: u32,
    pub grid_size: usize,
}

impl MatchConfig {
    pub const TURN_DURATION_SECONDS: u32 = 60;
    pub const BONUS_THRESHOLD_SECONDS: u32 = 30;
    pub const BONUS_AWARD_SECONDS: u32 = 5;
    pub const GRID_SIZE: usize = 10;

    pub fn for_mode(mode: MatchMode) -> Self {
        let (words_required, total_words_requested) = match mode {
            MatchMode::HumanVsHuman => (2, 4),
            MatchMode::HumanVsComputer => (5, 10),
        };

        Self {
            words_required,
            total_words_requested,
            turn_duration_seconds: Self::TURN_DURATION_SECONDS,
            bonus_threshold_seconds: Self::BONUS_THRESHOLD_SECONDS,
            bonus_award_seconds: Self::BONUS_AWARD_SECONDS,
            grid_size: Self::GRID_SIZE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum TurnPhase {
    Normal,
    Steal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum TurnOutcome {
    None,
    Success,
    Fail,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TurnState {
    pub active_contestant_index: usize,
    pub phase: TurnPhase,
    pub target_word: Option<WordLocation>,
    pub seconds_remaining: u32,
    pub last_result: TurnOutcome,
    /// Bumped on every turn or phase change; stale timers compare against it.
    pub turn_number: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum WinReason {
    Threshold,
    Exhaustion,
    TieBreak,
    Knockout,
    Forfeit,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ChatMessage {
    pub sender_id: ContestantId,
    pub sender_name: String,
    pub text: String,
    pub sent_at: String, // ISO 8601 string
}

/// Everything a Mirror needs to render; replaces its previous view wholesale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct MatchSnapshot {
    pub config: MatchConfig,
    pub contestants: Vec<Contestant>,
    pub puzzle: Puzzle,
    pub turn: TurnState,
    pub first_mover_index: usize,
    pub winner_id: Option<ContestantId>,
    pub win_reason: Option<WinReason>,
    pub chat: Vec<ChatMessage>,
}

impl MatchSnapshot {
    pub fn is_over(&self) -> bool {
        self.winner_id.is_some()
    }

    pub fn active_contestant(&self) -> Option<&Contestant> {
        self.contestants.get(self.turn.active_contestant_index)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum CoinSide {
    Heads,
    Tails,
}

impl std::str::FromStr for CoinSide {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "heads" => Ok(CoinSide::Heads),
            "tails" => Ok(CoinSide::Tails),
            other => Err(format!("'{}' is neither heads nor tails", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CoinFlipOutcome {
    pub result: CoinSide,
    pub winner_index: usize,
    pub call: CoinSide,
}
