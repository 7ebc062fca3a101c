use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::{
    CellCoord, ChatMessage, CoinFlipOutcome, CoinSide, Contestant, ContestantId, Identity,
    MatchConfig, MatchSnapshot, Puzzle,
};

/// What a Mirror asks the Authority to do on behalf of its contestant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum ActionIntent {
    SelectCells { cells: Vec<CellCoord> },
    SelectWord { text: String },
    SpendBonus,
    Forfeit,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum PeerMessage {
    IdentityExchange { identity: Identity },
    CoinFlipCall { call: CoinSide },
    CoinFlipOutcome { outcome: CoinFlipOutcome },
    MatchStart {
        first_mover_index: usize,
        puzzle: Puzzle,
        config: MatchConfig,
    },
    StateSnapshot { snapshot: MatchSnapshot },
    MatchOver {
        winner_id: ContestantId,
        final_contestants: Vec<Contestant>,
    },
    ChatMessage { message: ChatMessage },
    ActionIntent { intent: ActionIntent },
    RematchFlag,
    ThemeOptions { themes: Vec<String> },
    ThemeVote { theme: String },
    /// The Authority could not build a playable puzzle; it may try again.
    MatchStartFailed { theme: String, reason: String },
    Fault { message: String },
}

impl PeerMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            PeerMessage::IdentityExchange { .. } => "IdentityExchange",
            PeerMessage::CoinFlipCall { .. } => "CoinFlipCall",
            PeerMessage::CoinFlipOutcome { .. } => "CoinFlipOutcome",
            PeerMessage::MatchStart { .. } => "MatchStart",
            PeerMessage::StateSnapshot { .. } => "StateSnapshot",
            PeerMessage::MatchOver { .. } => "MatchOver",
            PeerMessage::ChatMessage { .. } => "ChatMessage",
            PeerMessage::ActionIntent { .. } => "ActionIntent",
            PeerMessage::RematchFlag => "RematchFlag",
            PeerMessage::ThemeOptions { .. } => "ThemeOptions",
            PeerMessage::ThemeVote { .. } => "ThemeVote",
            PeerMessage::MatchStartFailed { .. } => "MatchStartFailed",
            PeerMessage::Fault { .. } => "Fault",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intent_wire_shape() {
        let message = PeerMessage::ActionIntent {
            intent: ActionIntent::SelectCells {
                cells: vec![CellCoord::new(0, 0), CellCoord::new(0, 1)],
            },
        };

        let json = serde_json::to_string(&message).unwrap();
        assert!(json.contains("ActionIntent"));
        assert!(json.contains("SelectCells"));

        let parsed: PeerMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, message);
        assert_eq!(parsed.kind(), "ActionIntent");
    }

    #[test]
    fn test_unit_variant_parses() {
        let parsed: PeerMessage = serde_json::from_str("\"RematchFlag\"").unwrap();
        assert_eq!(parsed, PeerMessage::RematchFlag);
    }
}
