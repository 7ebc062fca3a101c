//! Agreement rounds both sides run outside of play: who moves first, whether to play
//! again, and which theme the next puzzle uses.

use game_types::{CoinFlipOutcome, CoinSide, MatchMode, PeerRole};
use rand::Rng;
use rand::seq::SliceRandom;
use tracing::debug;

pub const THEMES: [&str; 20] = [
    "Space Exploration",
    "Ancient Mythology",
    "Ocean Life",
    "Cooking & Baking",
    "Famous Artists",
    "World Capitals",
    "Fantasy Creatures",
    "Computer Science",
    "Musical Instruments",
    "Sports & Athletics",
    "Movie Genres",
    "Literary Classics",
    "Weather & Climate",
    "In the Garden",
    "Types of Vehicles",
    "Everyday Electronics",
    "Fruits & Vegetables",
    "Office Supplies",
    "Astronomy",
    "Chemistry Terms",
];

pub const THEME_OPTION_COUNT: usize = 3;

pub fn random_theme<R: Rng>(rng: &mut R) -> String {
    THEMES[rng.gen_range(0..THEMES.len())].to_string()
}

/// Distinct themes offered for a rematch vote.
pub fn draw_theme_options<R: Rng>(rng: &mut R) -> Vec<String> {
    THEMES
        .choose_multiple(rng, THEME_OPTION_COUNT)
        .map(|theme| theme.to_string())
        .collect()
}

pub fn flip_coin<R: Rng>(rng: &mut R) -> CoinSide {
    if rng.gen_bool(0.5) {
        CoinSide::Heads
    } else {
        CoinSide::Tails
    }
}

/// The joining side calls; a correct call puts it (index 1) first.
pub fn resolve_coin_flip(call: CoinSide, result: CoinSide) -> CoinFlipOutcome {
    let winner_index = if call == result {
        PeerRole::Mirror.contestant_index()
    } else {
        PeerRole::Authority.contestant_index()
    };
    CoinFlipOutcome {
        result,
        winner_index,
        call,
    }
}

/// Human matches alternate the opening move; against the computer the human always opens.
pub fn next_first_mover(mode: MatchMode, previous_first_mover: usize) -> usize {
    match mode {
        MatchMode::HumanVsHuman => 1 - previous_first_mover.min(1),
        MatchMode::HumanVsComputer => 0,
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RematchHandshake {
    local: bool,
    remote: bool,
}

impl RematchHandshake {
    /// Returns true once both sides have flagged.
    pub fn flag_local(&mut self) -> bool {
        self.local = true;
        self.is_agreed()
    }

    pub fn flag_remote(&mut self) -> bool {
        self.remote = true;
        self.is_agreed()
    }

    pub fn local_flagged(&self) -> bool {
        self.local
    }

    pub fn is_agreed(&self) -> bool {
        self.local && self.remote
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// One theme vote per side over a fixed set of options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThemeBallot {
    options: Vec<String>,
    authority_vote: Option<String>,
    mirror_vote: Option<String>,
}

impl ThemeBallot {
    pub fn new(options: Vec<String>) -> Self {
        Self {
            options,
            authority_vote: None,
            mirror_vote: None,
        }
    }

    pub fn options(&self) -> &[String] {
        &self.options
    }

    /// Record a vote. Returns false (and changes nothing) for a theme that was not
    /// offered or for a side that already voted.
    pub fn cast(&mut self, role: PeerRole, theme: &str) -> bool {
        let Some(choice) = self.options.iter().find(|o| o.as_str() == theme).cloned() else {
            debug!("Ignoring vote for unoffered theme '{}'", theme);
            return false;
        };

        let slot = match role {
            PeerRole::Authority => &mut self.authority_vote,
            PeerRole::Mirror => &mut self.mirror_vote,
        };
        if slot.is_some() {
            debug!("Ignoring second vote from {:?}", role);
            return false;
        }
        *slot = Some(choice);
        true
    }

    pub fn has_voted(&self, role: PeerRole) -> bool {
        match role {
            PeerRole::Authority => self.authority_vote.is_some(),
            PeerRole::Mirror => self.mirror_vote.is_some(),
        }
    }

    /// The winning theme once both votes are in. Matching votes win outright; otherwise
    /// the Authority's vote stands between humans and a fair coin decides against the
    /// computer.
    pub fn resolve<R: Rng>(&self, mode: MatchMode, rng: &mut R) -> Option<String> {
        let (authority, mirror) = (self.authority_vote.as_ref()?, self.mirror_vote.as_ref()?);
        if authority == mirror {
            return Some(authority.clone());
        }
        match mode {
            MatchMode::HumanVsHuman => Some(authority.clone()),
            MatchMode::HumanVsComputer => {
                if rng.gen_bool(0.5) {
                    Some(authority.clone())
                } else {
                    Some(mirror.clone())
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::HashSet;

    #[test]
    fn test_theme_options_are_distinct_catalogue_entries() {
        let mut rng = StdRng::seed_from_u64(4);
        for _ in 0..20 {
            let options = draw_theme_options(&mut rng);
            assert_eq!(options.len(), THEME_OPTION_COUNT);
            let unique: HashSet<_> = options.iter().collect();
            assert_eq!(unique.len(), THEME_OPTION_COUNT);
            assert!(options.iter().all(|o| THEMES.contains(&o.as_str())));
        }
    }

    #[test]
    fn test_coin_flip_call() {
        let outcome = resolve_coin_flip(CoinSide::Heads, CoinSide::Heads);
        assert_eq!(outcome.winner_index, 1);
        let outcome = resolve_coin_flip(CoinSide::Heads, CoinSide::Tails);
        assert_eq!(outcome.winner_index, 0);
        assert_eq!(outcome.call, CoinSide::Heads);
    }

    #[test]
    fn test_rematch_first_mover() {
        assert_eq!(next_first_mover(MatchMode::HumanVsHuman, 0), 1);
        assert_eq!(next_first_mover(MatchMode::HumanVsHuman, 1), 0);
        assert_eq!(next_first_mover(MatchMode::HumanVsComputer, 1), 0);
    }

    #[test]
    fn test_rematch_needs_both_flags() {
        let mut handshake = RematchHandshake::default();
        assert!(!handshake.flag_remote());
        assert!(!handshake.flag_remote());
        assert!(handshake.flag_local());
        handshake.reset();
        assert!(!handshake.is_agreed());
    }

    fn ballot() -> ThemeBallot {
        ThemeBallot::new(vec![
            "Ocean Life".to_string(),
            "Space Exploration".to_string(),
            "Astronomy".to_string(),
        ])
    }

    #[test]
    fn test_matching_votes_win_outright() {
        let mut ballot = ballot();
        let mut rng = StdRng::seed_from_u64(0);
        assert!(ballot.cast(PeerRole::Authority, "Ocean Life"));
        assert_eq!(ballot.resolve(MatchMode::HumanVsHuman, &mut rng), None);
        assert!(ballot.cast(PeerRole::Mirror, "Ocean Life"));
        assert_eq!(
            ballot.resolve(MatchMode::HumanVsHuman, &mut rng),
            Some("Ocean Life".to_string())
        );
    }

    #[test]
    fn test_split_vote_between_humans_goes_to_authority() {
        let mut ballot = ballot();
        let mut rng = StdRng::seed_from_u64(0);
        ballot.cast(PeerRole::Authority, "Ocean Life");
        ballot.cast(PeerRole::Mirror, "Space Exploration");
        for _ in 0..10 {
            assert_eq!(
                ballot.resolve(MatchMode::HumanVsHuman, &mut rng),
                Some("Ocean Life".to_string())
            );
        }
    }

    #[test]
    fn test_split_vote_against_computer_picks_one_of_the_two() {
        let mut ballot = ballot();
        let mut rng = StdRng::seed_from_u64(8);
        ballot.cast(PeerRole::Authority, "Ocean Life");
        ballot.cast(PeerRole::Mirror, "Astronomy");
        let picks: HashSet<_> = (0..40)
            .filter_map(|_| ballot.resolve(MatchMode::HumanVsComputer, &mut rng))
            .collect();
        assert_eq!(picks.len(), 2);
        assert!(picks.contains("Astronomy"));
    }

    #[test]
    fn test_bad_votes_ignored() {
        let mut ballot = ballot();
        assert!(!ballot.cast(PeerRole::Mirror, "Movie Genres"));
        assert!(ballot.cast(PeerRole::Mirror, "Astronomy"));
        assert!(!ballot.cast(PeerRole::Mirror, "Ocean Life"));
        assert!(ballot.has_voted(PeerRole::Mirror));
        assert!(!ballot.has_voted(PeerRole::Authority));
    }
}
