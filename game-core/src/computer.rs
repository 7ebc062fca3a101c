use std::time::{Duration, Instant};

use game_types::{CellCoord, Contestant, Difficulty, Identity, TurnState};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

/// Probability that a notable event passes without a comment.
pub const COMMENT_SKIP_PROBABILITY: f64 = 0.35;
pub const COMMENT_COOLDOWN_SECONDS: (u64, u64) = (4, 7);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChatEventKind {
    MatchStart,
    OpponentFoundWord,
    ComputerFoundWord,
    ComputerStealChance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Persona {
    pub name: &'static str,
    pub avatar: &'static str,
    pub personality: &'static str,
    id: u128,
}

impl Persona {
    pub fn for_difficulty(difficulty: Difficulty) -> Self {
        match difficulty {
            Difficulty::Easy => Persona {
                name: "Recruit",
                avatar: "deadeye",
                personality: "a friendly but slightly nervous rookie, encouraging and impressed by the player",
                id: 0x5eed_0001,
            },
            Difficulty::Medium => Persona {
                name: "Veteran",
                avatar: "boomer",
                personality: "a seasoned professional, calm and focused, respectful but confident",
                id: 0x5eed_0002,
            },
            Difficulty::Hard => Persona {
                name: "Commando",
                avatar: "sgt_stealth",
                personality: "a cocky, arrogant elite who loves to taunt and show off",
                id: 0x5eed_0003,
            },
        }
    }

    /// Stable identity so stats for a given opponent accumulate across matches.
    pub fn identity(&self) -> Identity {
        Identity {
            id: Uuid::from_u128(self.id),
            display_name: self.name.to_string(),
            avatar: self.avatar.to_string(),
            is_computer: true,
        }
    }
}

/// The human side as the flavor-text generator sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListenerContext {
    pub name: String,
    pub score: u32,
    pub speaker_score: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlavorRequest {
    pub speaker: String,
    pub personality: String,
    pub listener: ListenerContext,
    pub event: ChatEventKind,
}

/// Drives a computer contestant: when to move, what to select, when to talk.
pub struct ComputerAgent<R = StdRng> {
    difficulty: Difficulty,
    persona: Persona,
    rng: R,
    quiet_until: Option<Instant>,
}

impl ComputerAgent<StdRng> {
    pub fn new(difficulty: Difficulty) -> Self {
        Self::with_rng(difficulty, StdRng::from_entropy())
    }
}

impl<R: Rng> ComputerAgent<R> {
    pub fn with_rng(difficulty: Difficulty, rng: R) -> Self {
        Self {
            difficulty,
            persona: Persona::for_difficulty(difficulty),
            rng,
            quiet_until: None,
        }
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn persona(&self) -> &Persona {
        &self.persona
    }

    pub fn identity(&self) -> Identity {
        self.persona.identity()
    }

    /// How long the computer "searches" before answering.
    pub fn think_time(&mut self) -> Duration {
        let (low, high) = match self.difficulty {
            Difficulty::Easy => (5_000, 10_000),
            Difficulty::Medium => (3_000, 6_000),
            Difficulty::Hard => (1_000, 3_000),
        };
        Duration::from_millis(self.rng.gen_range(low..=high))
    }

    /// The computer always finds the current target.
    pub fn plan_selection(&self, turn: &TurnState) -> Option<Vec<CellCoord>> {
        turn.target_word
            .as_ref()
            .filter(|word| !word.found)
            .map(|word| word.cells())
    }

    /// Decide whether to say something about `kind`. Returns the request to hand to the
    /// flavor-text generator, or `None` to stay quiet.
    pub fn consider_comment(
        &mut self,
        kind: ChatEventKind,
        computer: &Contestant,
        listener: &Contestant,
        now: Instant,
    ) -> Option<FlavorRequest> {
        if self.quiet_until.is_some_and(|until| now < until) {
            debug!("{} is cooling down, skipping {:?}", self.persona.name, kind);
            return None;
        }
        if self.rng.gen_bool(COMMENT_SKIP_PROBABILITY) {
            return None;
        }

        let (low, high) = COMMENT_COOLDOWN_SECONDS;
        let cooldown = Duration::from_millis(self.rng.gen_range(low * 1000..=high * 1000));
        self.quiet_until = Some(now + cooldown);

        Some(FlavorRequest {
            speaker: self.persona.name.to_string(),
            personality: self.persona.personality.to_string(),
            listener: ListenerContext {
                name: listener.display_name.clone(),
                score: listener.score,
                speaker_score: computer.score,
            },
            event: kind,
        })
    }

    pub fn vote_theme(&mut self, options: &[String]) -> Option<String> {
        options.choose(&mut self.rng).cloned()
    }
}
