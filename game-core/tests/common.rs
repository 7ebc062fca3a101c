#![allow(dead_code)]

use game_core::{MatchEvent, PuzzleBuilder, TurnEngine};
use game_types::{Contestant, Direction, Identity, MatchConfig, Puzzle};
use rand::SeedableRng;
use rand::rngs::StdRng;

/// Five non-crossing words on even rows of a 10x10 grid.
pub const FIXED_WORDS: [(&str, usize, usize, Direction); 5] = [
    ("REEF", 0, 0, Direction::Horizontal),
    ("KELP", 2, 1, Direction::Horizontal),
    ("SQUID", 4, 2, Direction::Horizontal),
    ("WHALE", 6, 3, Direction::Horizontal),
    ("CORAL", 8, 4, Direction::Horizontal),
];

pub fn create_fixed_puzzle() -> Puzzle {
    let mut builder = PuzzleBuilder::new(10);
    for (word, row, col, direction) in FIXED_WORDS {
        builder
            .try_place(word, row, col, direction)
            .expect("fixed layout fits");
    }
    builder.fill(&mut StdRng::seed_from_u64(42))
}

pub fn create_test_contestant(name: &str) -> Contestant {
    Contestant::new(&Identity::human(name, "fox"))
}

pub fn create_test_config(words_required: u32) -> MatchConfig {
    MatchConfig {
        words_required,
        total_words_requested: FIXED_WORDS.len() as u32,
        turn_duration_seconds: 60,
        bonus_threshold_seconds: 30,
        bonus_award_seconds: 5,
        grid_size: 10,
    }
}

/// Ada (index 0) against Ben (index 1) on the fixed puzzle.
pub fn create_engine(words_required: u32, first_mover: usize) -> TurnEngine {
    let contestants = vec![create_test_contestant("Ada"), create_test_contestant("Ben")];
    TurnEngine::new(
        contestants,
        create_fixed_puzzle(),
        create_test_config(words_required),
        first_mover,
    )
    .expect("valid engine")
}

/// The active contestant selects the target word's cells, last cell first.
pub fn find_target(engine: &mut TurnEngine) -> Vec<MatchEvent> {
    let actor = engine.active_contestant().id;
    let mut cells = engine.target_word().expect("a target").cells();
    cells.reverse();
    engine.select_cells(actor, &cells).expect("active contestant may act")
}

pub fn let_clock_run(engine: &mut TurnEngine, seconds: u32) -> Vec<MatchEvent> {
    (0..seconds).flat_map(|_| engine.tick()).collect()
}

/// Run the current countdown out completely.
pub fn expire_turn(engine: &mut TurnEngine) -> Vec<MatchEvent> {
    let remaining = engine.turn().seconds_remaining;
    let_clock_run(engine, remaining)
}

pub fn assert_score_invariant(engine: &TurnEngine) {
    for contestant in engine.contestants() {
        assert_eq!(
            contestant.score as usize,
            engine.puzzle().found_by(contestant.id),
            "score of {} disagrees with found words",
            contestant.display_name
        );
    }
}
