use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

pub type ContestantId = Uuid;

/// Who a side claims to be; exchanged once when the link opens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Identity {
    pub id: ContestantId,
    pub display_name: String,
    pub avatar: String,
    pub is_computer: bool,
}

impl Identity {
    pub fn human(display_name: impl Into<String>, avatar: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            display_name: display_name.into(),
            avatar: avatar.into(),
            is_computer: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Contestant {
    pub id: ContestantId,
    pub display_name: String,
    pub avatar: String,
    pub is_computer: bool,
    pub score: u32,
    pub bonus_time_seconds: u32,
    pub bonus_chunks_earned: u32,
}

impl Contestant {
    pub fn new(identity: &Identity) -> Self {
        Self {
            id: identity.id,
            display_name: identity.display_name.clone(),
            avatar: identity.avatar.clone(),
            is_computer: identity.is_computer,
            score: 0,
            bonus_time_seconds: 0,
            bonus_chunks_earned: 0,
        }
    }

    /// Zero the per-match counters; identity survives rematches.
    pub fn reset_for_match(&mut self) {
        self.score = 0;
        self.bonus_time_seconds = 0;
        self.bonus_chunks_earned = 0;
    }

    pub fn identity(&self) -> Identity {
        Identity {
            id: self.id,
            display_name: self.display_name.clone(),
            avatar: self.avatar.clone(),
            is_computer: self.is_computer,
        }
    }
}
