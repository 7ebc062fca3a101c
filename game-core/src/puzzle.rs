use game_types::{Direction, Grid, GridCell, MatchError, Puzzle, WordLocation};
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::collections::HashSet;
use tracing::{debug, warn};

pub const MAX_PLACEMENT_ATTEMPTS: usize = 100;

const ALPHABET: &[u8; 26] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Grid under construction. Empty cells are `None` until `fill` runs.
#[derive(Debug, Clone)]
pub struct PuzzleBuilder {
    size: usize,
    cells: Vec<Vec<Option<GridCell>>>,
    words: Vec<WordLocation>,
}

impl PuzzleBuilder {
    pub fn new(size: usize) -> Self {
        Self {
            size,
            cells: vec![vec![None; size]; size],
            words: Vec::new(),
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn placed_words(&self) -> &[WordLocation] {
        &self.words
    }

    /// True when every cell the word would occupy is empty or already holds the same letter.
    pub fn can_place(&self, word: &str, row: usize, col: usize, direction: Direction) -> bool {
        let (dr, dc) = direction.step();
        let len = word.chars().count();
        if len == 0 {
            return false;
        }
        let end_row = row + (len - 1) * dr;
        let end_col = col + (len - 1) * dc;
        if end_row >= self.size || end_col >= self.size {
            return false;
        }

        word.chars().enumerate().all(|(i, letter)| {
            match &self.cells[row + i * dr][col + i * dc] {
                Some(cell) => cell.letter == letter,
                None => true,
            }
        })
    }

    /// Write the word if it fits, returning its location record.
    pub fn try_place(
        &mut self,
        word: &str,
        row: usize,
        col: usize,
        direction: Direction,
    ) -> Option<WordLocation> {
        if !self.can_place(word, row, col, direction) {
            return None;
        }

        let (dr, dc) = direction.step();
        for (i, letter) in word.chars().enumerate() {
            let cell = &mut self.cells[row + i * dr][col + i * dc];
            // A crossing keeps the first owner; the letter is identical either way.
            if cell.is_none() {
                *cell = Some(GridCell {
                    letter,
                    owner: Some(word.to_string()),
                });
            }
        }

        let location = WordLocation::new(word.to_string(), row, col, direction);
        self.words.push(location.clone());
        Some(location)
    }

    /// Fill every empty cell with a uniformly random letter and freeze the puzzle.
    pub fn fill<R: Rng>(self, rng: &mut R) -> Puzzle {
        let cells = self
            .cells
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|cell| {
                        cell.unwrap_or_else(|| GridCell {
                            letter: ALPHABET[rng.gen_range(0..ALPHABET.len())] as char,
                            owner: None,
                        })
                    })
                    .collect()
            })
            .collect();

        Puzzle {
            grid: Grid {
                size: self.size,
                cells,
            },
            words: self.words,
        }
    }
}

/// Places a word list into a square grid with randomized, crossing-tolerant placement.
pub struct PuzzleGenerator<R = StdRng> {
    grid_size: usize,
    rng: R,
}

impl PuzzleGenerator<StdRng> {
    pub fn new(grid_size: usize) -> Self {
        Self::with_rng(grid_size, StdRng::from_entropy())
    }
}

impl<R: Rng> PuzzleGenerator<R> {
    pub fn with_rng(grid_size: usize, rng: R) -> Self {
        Self { grid_size, rng }
    }

    /// Generate a puzzle. Words that cannot be placed within the attempt budget are
    /// dropped, so the result may hold fewer words than requested.
    pub fn generate(&mut self, words: &[String]) -> Puzzle {
        let mut builder = PuzzleBuilder::new(self.grid_size);
        let mut seen = HashSet::new();

        for word in words {
            if word.is_empty() || !word.chars().all(|c| c.is_ascii_uppercase()) {
                warn!("Skipping malformed puzzle word '{}'", word);
                continue;
            }
            if !seen.insert(word.clone()) {
                debug!("Skipping duplicate puzzle word '{}'", word);
                continue;
            }
            if self.place_word(&mut builder, word).is_none() {
                warn!("Could not place word: {}", word);
            }
        }

        builder.fill(&mut self.rng)
    }

    fn place_word(&mut self, builder: &mut PuzzleBuilder, word: &str) -> Option<WordLocation> {
        let len = word.chars().count();
        if len > self.grid_size {
            return None;
        }
        // Start coordinates range only over positions that keep the word inside the grid.
        let span = self.grid_size - len + 1;

        for _ in 0..MAX_PLACEMENT_ATTEMPTS {
            let direction = Direction::ALL[self.rng.gen_range(0..Direction::ALL.len())];
            let (row, col) = match direction {
                Direction::Horizontal => {
                    (self.rng.gen_range(0..self.grid_size), self.rng.gen_range(0..span))
                }
                Direction::Vertical => {
                    (self.rng.gen_range(0..span), self.rng.gen_range(0..self.grid_size))
                }
                Direction::DiagonalDownRight => {
                    (self.rng.gen_range(0..span), self.rng.gen_range(0..span))
                }
            };

            if let Some(location) = builder.try_place(word, row, col, direction) {
                return Some(location);
            }
        }

        None
    }
}

/// Convenience wrapper over a freshly seeded generator.
pub fn generate(words: &[String], grid_size: usize) -> Puzzle {
    PuzzleGenerator::new(grid_size).generate(words)
}

/// Fail when too few words survived to make the match playable.
pub fn ensure_playable(puzzle: &Puzzle, words_required: u32) -> Result<(), MatchError> {
    let usable = puzzle.words.len() as u32;
    if usable < words_required.max(1) {
        return Err(MatchError::GenerationShortfall {
            usable,
            required: words_required.max(1),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(list: &[&str]) -> Vec<String> {
        list.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn test_crossing_requires_same_letter() {
        let mut builder = PuzzleBuilder::new(5);
        assert!(builder.try_place("CAT", 0, 0, Direction::Horizontal).is_some());

        // Shares the 'C' at (0,0)
        assert!(builder.can_place("COW", 0, 0, Direction::Vertical));
        // Would overwrite 'A' at (0,1) with 'O'
        assert!(!builder.can_place("OX", 0, 1, Direction::Vertical));
    }

    #[test]
    fn test_placement_rejects_out_of_bounds() {
        let builder = PuzzleBuilder::new(4);
        assert!(!builder.can_place("HOUSE", 0, 0, Direction::Horizontal));
        assert!(!builder.can_place("TOE", 2, 0, Direction::Vertical));
        assert!(builder.can_place("TOE", 1, 1, Direction::DiagonalDownRight));
    }

    #[test]
    fn test_fill_leaves_no_blank_cells() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut builder = PuzzleBuilder::new(6);
        builder.try_place("REEF", 1, 1, Direction::Horizontal);
        let puzzle = builder.fill(&mut rng);

        for row in &puzzle.grid.cells {
            for cell in row {
                assert!(cell.letter.is_ascii_uppercase());
            }
        }
        assert_eq!(puzzle.grid.cells[1][1].owner.as_deref(), Some("REEF"));
        assert_eq!(puzzle.grid.cells[0][0].owner, None);
    }

    #[test]
    fn test_oversized_word_is_dropped() {
        let mut generator = PuzzleGenerator::with_rng(5, StdRng::seed_from_u64(9));
        let puzzle = generator.generate(&words(&["TOOLONGWORD", "SEAL"]));
        assert_eq!(puzzle.words.len(), 1);
        assert_eq!(puzzle.words[0].text, "SEAL");
    }

    #[test]
    fn test_duplicates_and_malformed_words_skipped() {
        let mut generator = PuzzleGenerator::with_rng(10, StdRng::seed_from_u64(1));
        let puzzle = generator.generate(&words(&["CORAL", "CORAL", "sea", "KELP"]));
        let texts: Vec<_> = puzzle.words.iter().map(|w| w.text.as_str()).collect();
        assert_eq!(texts, vec!["CORAL", "KELP"]);
    }

    #[test]
    fn test_ensure_playable() {
        let mut generator = PuzzleGenerator::with_rng(10, StdRng::seed_from_u64(5));
        let puzzle = generator.generate(&words(&["WHALE", "SHARK"]));
        assert!(ensure_playable(&puzzle, 2).is_ok());
        assert_eq!(
            ensure_playable(&puzzle, 3),
            Err(MatchError::GenerationShortfall {
                usable: 2,
                required: 3
            })
        );
    }
}
