use game_types::{CellCoord, Direction, WordLocation};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectionRejection {
    TooShort,
    OutOfBounds,
    NotInLine,
}

/// A selection that has the shape of a placed word.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordShape {
    pub cells: Vec<CellCoord>,
    pub direction: Direction,
}

/// Cells swept by a drag from `start` to `end`. Straight runs follow rows, columns or
/// 45 degree diagonals in either sense; anything else collapses to the start cell.
pub fn line_between(start: CellCoord, end: CellCoord) -> Vec<CellCoord> {
    let dr = end.row as isize - start.row as isize;
    let dc = end.col as isize - start.col as isize;

    let straight = (dr == 0) != (dc == 0) || (dr != 0 && dr.abs() == dc.abs());
    if !straight {
        return vec![start];
    }

    let steps = dr.abs().max(dc.abs());
    let (sr, sc) = (dr.signum(), dc.signum());
    (0..=steps)
        .map(|i| {
            CellCoord::new(
                (start.row as isize + i * sr) as usize,
                (start.col as isize + i * sc) as usize,
            )
        })
        .collect()
}

/// Sort row-then-column and check the cells form a contiguous run along one of the
/// three puzzle directions.
pub fn classify_selection(
    cells: &[CellCoord],
    grid_size: usize,
) -> Result<WordShape, SelectionRejection> {
    if cells.len() < 2 {
        return Err(SelectionRejection::TooShort);
    }
    if cells.iter().any(|c| c.row >= grid_size || c.col >= grid_size) {
        return Err(SelectionRejection::OutOfBounds);
    }

    let mut sorted = cells.to_vec();
    sorted.sort();

    let step = |a: &CellCoord, b: &CellCoord| -> Option<(usize, usize)> {
        let dr = b.row.checked_sub(a.row)?;
        let dc = b.col.checked_sub(a.col)?;
        Some((dr, dc))
    };

    let direction = step(&sorted[0], &sorted[1])
        .and_then(Direction::from_step)
        .ok_or(SelectionRejection::NotInLine)?;

    let contiguous = sorted
        .windows(2)
        .all(|pair| step(&pair[0], &pair[1]) == Some(direction.step()));
    if !contiguous {
        return Err(SelectionRejection::NotInLine);
    }

    Ok(WordShape {
        cells: sorted,
        direction,
    })
}

/// Whether a cell selection picks out the unfound `target`.
pub fn selection_hits(
    target: Option<&WordLocation>,
    cells: &[CellCoord],
    grid_size: usize,
) -> Result<bool, SelectionRejection> {
    let shape = classify_selection(cells, grid_size)?;
    Ok(target.is_some_and(|target| !target.found && target.cells() == shape.cells))
}

/// Whether typed text names the unfound `target`, ignoring case and surrounding space.
pub fn text_hits(target: Option<&WordLocation>, text: &str) -> Result<bool, SelectionRejection> {
    let text = text.trim();
    if text.chars().count() < 2 {
        return Err(SelectionRejection::TooShort);
    }
    Ok(target.is_some_and(|target| !target.found && target.text.eq_ignore_ascii_case(text)))
}
