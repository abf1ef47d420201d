//! Text grammar shared by humans and peer programs.
//!
//! - placement: `row column direction`, direction being `R` (right) or `U`/`D` (down)
//! - shot: `row column`
//!
//! Rows and columns are numbers from 0 to 9.

use crate::board::{Orientation, PlacementError, ShipPlacement, BOARD_SIZE};

/// Coordinates of a shot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shot {
    /// Target row.
    pub row: usize,
    /// Target column.
    pub col: usize,
}

/// Why a line could not be turned into a move.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    /// The line does not follow the expected grammar.
    #[error("invalid input, expected a line of the form:\n\n   {expected}\n\nrow and column are numbers from 0 to 9")]
    Syntax {
        /// Description of the expected line.
        expected: &'static str,
    },
    /// The direction is neither right nor down.
    #[error("invalid direction '{0}': must be either 'R' (right) or 'U'/'D' (down)")]
    Direction(String),
    /// A row or column is not on the board.
    #[error("invalid {axis} {value}: must be a number from 0 to 9")]
    OutOfRange {
        /// `"row"` or `"column"`.
        axis: &'static str,
        /// The offending number.
        value: i64,
    },
    /// The ship cannot go there.
    #[error(transparent)]
    Placement(#[from] PlacementError),
}

const PLACEMENT_FORM: &str = "row column direction";
const SHOT_FORM: &str = "row column";

/// Parse a ship placement line.
pub fn parse_placement(line: &str) -> Result<ShipPlacement, InputError> {
    let syntax = || InputError::Syntax {
        expected: PLACEMENT_FORM,
    };
    let [row, col, direction] = split_exact::<3>(line).ok_or_else(syntax)?;
    let row = parse_number(row).ok_or_else(syntax)?;
    let col = parse_number(col).ok_or_else(syntax)?;
    let orientation = match direction {
        "R" => Orientation::Right,
        "U" | "D" => Orientation::Down,
        other => return Err(InputError::Direction(other.to_string())),
    };
    Ok(ShipPlacement::new(
        coordinate("row", row)?,
        coordinate("column", col)?,
        orientation,
    ))
}

/// Parse a shot line.
pub fn parse_shot(line: &str) -> Result<Shot, InputError> {
    let syntax = || InputError::Syntax {
        expected: SHOT_FORM,
    };
    let [row, col] = split_exact::<2>(line).ok_or_else(syntax)?;
    let row = parse_number(row).ok_or_else(syntax)?;
    let col = parse_number(col).ok_or_else(syntax)?;
    Ok(Shot {
        row: coordinate("row", row)?,
        col: coordinate("column", col)?,
    })
}

fn split_exact<const N: usize>(line: &str) -> Option<[&str; N]> {
    let words: Vec<&str> = line.split_whitespace().collect();
    words.try_into().ok()
}

fn parse_number(word: &str) -> Option<i64> {
    word.parse().ok()
}

fn coordinate(axis: &'static str, value: i64) -> Result<usize, InputError> {
    usize::try_from(value)
        .ok()
        .filter(|v| *v < BOARD_SIZE)
        .ok_or(InputError::OutOfRange { axis, value })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placements() {
        assert_eq!(
            parse_placement("3 4 R"),
            Ok(ShipPlacement::new(3, 4, Orientation::Right))
        );
        assert_eq!(
            parse_placement("  0\t9 U \r"),
            Ok(ShipPlacement::new(0, 9, Orientation::Down))
        );
        assert_eq!(
            parse_placement("0 9 D"),
            Ok(ShipPlacement::new(0, 9, Orientation::Down))
        );
    }

    #[test]
    fn malformed_placements() {
        let syntax = Err(InputError::Syntax {
            expected: PLACEMENT_FORM,
        });
        assert_eq!(parse_placement("3 4"), syntax);
        assert_eq!(parse_placement("3 4 R extra"), syntax);
        assert_eq!(parse_placement("three 4 R"), syntax);
        assert_eq!(
            parse_placement("3 4 Right"),
            Err(InputError::Direction("Right".to_string()))
        );
        assert_eq!(
            parse_placement("3 10 R"),
            Err(InputError::OutOfRange {
                axis: "column",
                value: 10
            })
        );
    }

    #[test]
    fn shots() {
        assert_eq!(parse_shot("9 0"), Ok(Shot { row: 9, col: 0 }));
        assert_eq!(
            parse_shot("-1 0"),
            Err(InputError::OutOfRange {
                axis: "row",
                value: -1
            })
        );
        assert_eq!(
            parse_shot("x y"),
            Err(InputError::Syntax {
                expected: SHOT_FORM
            })
        );
        assert!(parse_shot("1 2 3").is_err());
        assert!(parse_shot("").is_err());
    }
}
