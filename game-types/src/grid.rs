use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::ContestantId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum Direction {
    Horizontal,
    Vertical,
    DiagonalDownRight,
}

impl Direction {
    pub const ALL: [Direction; 3] = [
        Direction::Horizontal,
        Direction::Vertical,
        Direction::DiagonalDownRight,
    ];

    /// Row and column increment for one letter along this direction.
    pub fn step(self) -> (usize, usize) {
        match self {
            Direction::Horizontal => (0, 1),
            Direction::Vertical => (1, 0),
            Direction::DiagonalDownRight => (1, 1),
        }
    }

    pub fn from_step(step: (usize, usize)) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.step() == step)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CellCoord {
    pub row: usize,
    pub col: usize,
}

impl CellCoord {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct GridCell {
    pub letter: char,
    /// Text of the placed word that claimed this cell. Filler cells have none.
    pub owner: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Grid {
    pub size: usize,
    pub cells: Vec<Vec<GridCell>>,
}

impl Grid {
    pub fn cell(&self, coord: CellCoord) -> Option<&GridCell> {
        self.cells.get(coord.row).and_then(|row| row.get(coord.col))
    }

    pub fn letter_at(&self, coord: CellCoord) -> Option<char> {
        self.cell(coord).map(|cell| cell.letter)
    }

    pub fn contains(&self, coord: CellCoord) -> bool {
        coord.row < self.size && coord.col < self.size
    }

    /// Render rows as strings, mostly useful for logs and console output
    pub fn rows(&self) -> Vec<String> {
        self.cells
            .iter()
            .map(|row| row.iter().map(|cell| cell.letter).collect())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct WordLocation {
    pub text: String,
    pub start_row: usize,
    pub start_col: usize,
    pub direction: Direction,
    pub found: bool,
    pub found_by: Option<ContestantId>,
}

impl WordLocation {
    pub fn new(text: String, start_row: usize, start_col: usize, direction: Direction) -> Self {
        Self {
            text,
            start_row,
            start_col,
            direction,
            found: false,
            found_by: None,
        }
    }

    pub fn len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Cells covered by this word, already in ascending row-then-column order.
    pub fn cells(&self) -> Vec<CellCoord> {
        let (dr, dc) = self.direction.step();
        (0..self.len())
            .map(|i| CellCoord::new(self.start_row + i * dr, self.start_col + i * dc))
            .collect()
    }

    /// A word retired after a failed steal is marked found with nobody credited.
    pub fn is_retired(&self) -> bool {
        self.found && self.found_by.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Puzzle {
    pub grid: Grid,
    pub words: Vec<WordLocation>,
}

impl Puzzle {
    pub fn unfound_count(&self) -> usize {
        self.words.iter().filter(|w| !w.found).count()
    }

    pub fn found_by(&self, contestant_id: ContestantId) -> usize {
        self.words
            .iter()
            .filter(|w| w.found_by == Some(contestant_id))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_cells_follow_direction() {
        let word = WordLocation::new("CAT".to_string(), 2, 3, Direction::DiagonalDownRight);
        assert_eq!(
            word.cells(),
            vec![
                CellCoord::new(2, 3),
                CellCoord::new(3, 4),
                CellCoord::new(4, 5)
            ]
        );

        let word = WordLocation::new("DOG".to_string(), 0, 0, Direction::Vertical);
        assert_eq!(word.cells().last(), Some(&CellCoord::new(2, 0)));
    }

    #[test]
    fn test_direction_from_step() {
        assert_eq!(Direction::from_step((0, 1)), Some(Direction::Horizontal));
        assert_eq!(Direction::from_step((1, 1)), Some(Direction::DiagonalDownRight));
        assert_eq!(Direction::from_step((1, 2)), None);
    }

    #[test]
    fn test_retired_word() {
        let mut word = WordLocation::new("REEF".to_string(), 0, 0, Direction::Horizontal);
        assert!(!word.is_retired());
        word.found = true;
        assert!(word.is_retired());
        word.found_by = Some(uuid::Uuid::new_v4());
        assert!(!word.is_retired());
    }
}
