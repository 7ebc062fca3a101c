use game_types::{
    CellCoord, ChatMessage, Contestant, ContestantId, MatchConfig, MatchError, MatchSnapshot,
    Puzzle, TurnOutcome, TurnPhase, TurnState, Violation, WinReason, WordLocation,
};
use tracing::{debug, info, warn};

use crate::{MatchEvent, SelectionRejection, selection_hits, text_hits};

/// Authoritative turn and steal state machine for one match.
///
/// Every mutation runs to completion and returns the events it produced. Only the
/// Authority side ever holds one of these.
#[derive(Debug, Clone)]
pub struct TurnEngine {
    config: MatchConfig,
    contestants: Vec<Contestant>,
    puzzle: Puzzle,
    turn: TurnState,
    target_index: Option<usize>,
    first_mover_index: usize,
    outcome: Option<(ContestantId, WinReason)>,
}

impl TurnEngine {
    pub fn new(
        mut contestants: Vec<Contestant>,
        mut puzzle: Puzzle,
        config: MatchConfig,
        first_mover_index: usize,
    ) -> Result<Self, MatchError> {
        if contestants.len() != 2 {
            return Err(MatchError::InvalidMatchState {
                current_state: format!("expected two contestants, got {}", contestants.len()),
            });
        }
        if first_mover_index > 1 {
            return Err(MatchError::InvalidMatchState {
                current_state: format!("first mover index {} out of range", first_mover_index),
            });
        }
        if puzzle.words.is_empty() {
            return Err(MatchError::GenerationShortfall {
                usable: 0,
                required: config.words_required.max(1),
            });
        }

        for contestant in &mut contestants {
            contestant.reset_for_match();
        }
        for word in &mut puzzle.words {
            word.found = false;
            word.found_by = None;
        }

        let turn = TurnState {
            active_contestant_index: first_mover_index,
            phase: TurnPhase::Normal,
            target_word: puzzle.words.first().cloned(),
            seconds_remaining: config.turn_duration_seconds,
            last_result: TurnOutcome::None,
            turn_number: 1,
        };

        info!(
            "Match started with {} words, {} moves first",
            puzzle.words.len(),
            contestants[first_mover_index].display_name
        );

        Ok(Self {
            config,
            contestants,
            puzzle,
            turn,
            target_index: Some(0),
            first_mover_index,
            outcome: None,
        })
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    pub fn contestants(&self) -> &[Contestant] {
        &self.contestants
    }

    pub fn puzzle(&self) -> &Puzzle {
        &self.puzzle
    }

    pub fn turn(&self) -> &TurnState {
        &self.turn
    }

    pub fn first_mover_index(&self) -> usize {
        self.first_mover_index
    }

    pub fn outcome(&self) -> Option<(ContestantId, WinReason)> {
        self.outcome
    }

    pub fn is_over(&self) -> bool {
        self.outcome.is_some()
    }

    pub fn active_contestant(&self) -> &Contestant {
        &self.contestants[self.turn.active_contestant_index]
    }

    pub fn target_word(&self) -> Option<&WordLocation> {
        self.target_index.map(|i| &self.puzzle.words[i])
    }

    pub fn contestant_index(&self, contestant_id: ContestantId) -> Option<usize> {
        self.contestants.iter().position(|c| c.id == contestant_id)
    }

    /// Full visible state for replication.
    pub fn snapshot(&self, chat: &[ChatMessage]) -> MatchSnapshot {
        MatchSnapshot {
            config: self.config.clone(),
            contestants: self.contestants.clone(),
            puzzle: self.puzzle.clone(),
            turn: self.turn.clone(),
            first_mover_index: self.first_mover_index,
            winner_id: self.outcome.map(|(id, _)| id),
            win_reason: self.outcome.map(|(_, reason)| reason),
            chat: chat.to_vec(),
        }
    }

    /// Attempt a find with a cell selection, in any order the renderer produced.
    pub fn select_cells(
        &mut self,
        actor: ContestantId,
        cells: &[CellCoord],
    ) -> Result<Vec<MatchEvent>, MatchError> {
        let index = self.authorize(actor)?;
        let hit = selection_hits(self.target_word(), cells, self.puzzle.grid.size);
        Ok(self.judge(index, actor, hit))
    }

    /// Attempt a find by typing the word.
    pub fn select_text(
        &mut self,
        actor: ContestantId,
        text: &str,
    ) -> Result<Vec<MatchEvent>, MatchError> {
        let index = self.authorize(actor)?;
        let hit = text_hits(self.target_word(), text);
        Ok(self.judge(index, actor, hit))
    }

    /// One second of the active countdown. Expiry is handled when it reaches zero.
    pub fn tick(&mut self) -> Vec<MatchEvent> {
        if self.is_over() {
            return Vec::new();
        }

        self.turn.seconds_remaining = self.turn.seconds_remaining.saturating_sub(1);
        let mut events = vec![MatchEvent::CountdownTicked {
            seconds_remaining: self.turn.seconds_remaining,
        }];

        if self.turn.seconds_remaining == 0 {
            events.extend(self.expire());
        }
        events
    }

    /// Redeem one stored bonus chunk onto the live countdown. A no-op during a steal or
    /// without enough stored time.
    pub fn spend_bonus(&mut self, actor: ContestantId) -> Result<Vec<MatchEvent>, MatchError> {
        let index = self.authorize(actor)?;
        let award = self.config.bonus_award_seconds;

        if self.turn.phase == TurnPhase::Steal {
            debug!("Bonus spend ignored during steal");
            return Ok(Vec::new());
        }
        let contestant = &mut self.contestants[index];
        if contestant.bonus_time_seconds < award {
            debug!(
                "Bonus spend ignored, {} has {}s stored",
                contestant.display_name, contestant.bonus_time_seconds
            );
            return Ok(Vec::new());
        }

        contestant.bonus_time_seconds -= award;
        self.turn.seconds_remaining += award;

        Ok(vec![MatchEvent::BonusSpent {
            contestant_id: actor,
            seconds_added: award,
            seconds_remaining: self.turn.seconds_remaining,
        }])
    }

    /// End the match in the opponent's favour, whoever's turn it is.
    pub fn forfeit(&mut self, contestant_id: ContestantId) -> Result<Vec<MatchEvent>, MatchError> {
        if self.is_over() {
            return Err(self.violation(contestant_id, Violation::MatchAlreadyDecided));
        }
        let index = self
            .contestant_index(contestant_id)
            .ok_or_else(|| self.violation(contestant_id, Violation::UnknownContestant))?;

        let winner_id = self.contestants[1 - index].id;
        info!("{} forfeited", self.contestants[index].display_name);
        Ok(vec![self.declare(winner_id, WinReason::Forfeit)])
    }

    fn judge(
        &mut self,
        index: usize,
        actor: ContestantId,
        hit: Result<bool, SelectionRejection>,
    ) -> Vec<MatchEvent> {
        match hit {
            Ok(true) => self.resolve_find(index),
            Ok(false) => vec![MatchEvent::SelectionMissed {
                contestant_id: actor,
            }],
            Err(reason) => {
                debug!("Selection by {} rejected: {:?}", actor, reason);
                vec![MatchEvent::SelectionRejected {
                    contestant_id: actor,
                    reason,
                }]
            }
        }
    }

    fn authorize(&self, actor: ContestantId) -> Result<usize, MatchError> {
        if self.is_over() {
            return Err(self.violation(actor, Violation::MatchAlreadyDecided));
        }
        let index = self
            .contestant_index(actor)
            .ok_or_else(|| self.violation(actor, Violation::UnknownContestant))?;
        if index != self.turn.active_contestant_index {
            return Err(self.violation(actor, Violation::NotYourTurn));
        }
        if self.turn.seconds_remaining == 0 {
            return Err(self.violation(actor, Violation::CountdownElapsed));
        }
        Ok(index)
    }

    fn violation(&self, contestant_id: ContestantId, violation: Violation) -> MatchError {
        warn!(
            turn = self.turn.turn_number,
            "Rejected action from {}: {:?}", contestant_id, violation
        );
        MatchError::OwnershipViolation {
            contestant_id,
            violation,
        }
    }

    fn resolve_find(&mut self, index: usize) -> Vec<MatchEvent> {
        let Some(target_index) = self.target_index else {
            return Vec::new();
        };
        let scorer_id = self.contestants[index].id;
        let phase = self.turn.phase;

        let word = &mut self.puzzle.words[target_index];
        word.found = true;
        word.found_by = Some(scorer_id);
        let text = word.text.clone();

        let bonus_awarded = phase == TurnPhase::Normal
            && self.turn.seconds_remaining >= self.config.bonus_threshold_seconds;

        let scorer = &mut self.contestants[index];
        scorer.score += 1;
        if bonus_awarded {
            scorer.bonus_time_seconds += self.config.bonus_award_seconds;
            scorer.bonus_chunks_earned += 1;
        }
        info!(
            turn = self.turn.turn_number,
            "{} found {} ({:?}, {}s left)", scorer.display_name, text, phase,
            self.turn.seconds_remaining
        );

        self.turn.last_result = TurnOutcome::Success;
        self.turn.target_word = Some(self.puzzle.words[target_index].clone());

        let mut events = vec![MatchEvent::WordFound {
            contestant_id: scorer_id,
            word: text,
            phase,
            bonus_awarded,
        }];

        if phase == TurnPhase::Steal {
            events.push(self.declare(scorer_id, WinReason::Knockout));
            return events;
        }

        match self.evaluate_winner() {
            Some((winner_id, reason)) => events.push(self.declare(winner_id, reason)),
            None => events.extend(self.advance(1 - index)),
        }
        events
    }

    fn expire(&mut self) -> Vec<MatchEvent> {
        self.turn.last_result = TurnOutcome::Fail;
        let Some(target_index) = self.target_index else {
            return Vec::new();
        };

        match self.turn.phase {
            TurnPhase::Normal => {
                let stealer = 1 - self.turn.active_contestant_index;
                self.turn.active_contestant_index = stealer;
                self.turn.phase = TurnPhase::Steal;
                self.turn.seconds_remaining = self.config.turn_duration_seconds;
                self.turn.turn_number += 1;
                info!(
                    turn = self.turn.turn_number,
                    "Steal opened for {}", self.contestants[stealer].display_name
                );

                vec![MatchEvent::StealOpened {
                    stealer_id: self.contestants[stealer].id,
                    word: self.puzzle.words[target_index].text.clone(),
                }]
            }
            TurnPhase::Steal => {
                let stealer = self.turn.active_contestant_index;
                let word = &mut self.puzzle.words[target_index];
                word.found = true;
                word.found_by = None;
                let text = word.text.clone();
                self.turn.target_word = Some(word.clone());
                info!(turn = self.turn.turn_number, "Nobody found {}, retired", text);

                // Play continues as if the word had been found in the normal turn.
                let mut events = vec![MatchEvent::WordRetired { word: text }];
                match self.evaluate_winner() {
                    Some((winner_id, reason)) => events.push(self.declare(winner_id, reason)),
                    None => events.extend(self.advance(stealer)),
                }
                events
            }
        }
    }

    fn advance(&mut self, next_active: usize) -> Vec<MatchEvent> {
        self.target_index = self.puzzle.words.iter().position(|w| !w.found);
        self.turn = TurnState {
            active_contestant_index: next_active,
            phase: TurnPhase::Normal,
            target_word: self.target_index.map(|i| self.puzzle.words[i].clone()),
            seconds_remaining: self.config.turn_duration_seconds,
            last_result: self.turn.last_result,
            turn_number: self.turn.turn_number + 1,
        };

        vec![MatchEvent::TurnStarted {
            active_contestant_index: next_active,
            turn_number: self.turn.turn_number,
        }]
    }

    /// Threshold first, then exhaustion. Equal scores on exhaustion go to the first mover.
    fn evaluate_winner(&self) -> Option<(ContestantId, WinReason)> {
        if let Some(leader) = self
            .contestants
            .iter()
            .find(|c| c.score >= self.config.words_required)
        {
            return Some((leader.id, WinReason::Threshold));
        }

        if self.puzzle.unfound_count() > 0 {
            return None;
        }

        let (a, b) = (&self.contestants[0], &self.contestants[1]);
        Some(match a.score.cmp(&b.score) {
            std::cmp::Ordering::Greater => (a.id, WinReason::Exhaustion),
            std::cmp::Ordering::Less => (b.id, WinReason::Exhaustion),
            std::cmp::Ordering::Equal => {
                (self.contestants[self.first_mover_index].id, WinReason::TieBreak)
            }
        })
    }

    fn declare(&mut self, winner_id: ContestantId, reason: WinReason) -> MatchEvent {
        self.outcome = Some((winner_id, reason));
        info!("Match won by {} ({:?})", winner_id, reason);
        MatchEvent::MatchWon { winner_id, reason }
    }
}
