//! One player's 10×10 grid: ship placement and incoming shots.

use std::fmt;

/// Width and height of a board.
pub const BOARD_SIZE: usize = 10;
/// Number of ships every player places.
pub const SHIP_COUNT: usize = 4;
/// Length of every ship.
pub const SHIP_LENGTH: usize = 4;

/// State of a single board cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cell {
    /// Water nobody shot at.
    #[default]
    Empty,
    /// Intact part of a ship.
    Ship,
    /// Part of a ship that was shot.
    Hit,
    /// Water that was shot.
    Miss,
}

/// Direction in which a ship extends from its origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    /// Towards higher row numbers.
    Down,
    /// Towards higher column numbers.
    Right,
}

/// Where and how a ship should be put on a board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShipPlacement {
    /// Row of the ship's first cell.
    pub row: usize,
    /// Column of the ship's first cell.
    pub col: usize,
    /// Number of cells.
    pub length: usize,
    /// Direction of the remaining cells.
    pub orientation: Orientation,
}

impl ShipPlacement {
    /// A ship of the standard length.
    pub fn new(row: usize, col: usize, orientation: Orientation) -> Self {
        Self {
            row,
            col,
            length: SHIP_LENGTH,
            orientation,
        }
    }

    fn cells(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        (0..self.length).map(move |i| match self.orientation {
            Orientation::Down => (self.row + i, self.col),
            Orientation::Right => (self.row, self.col + i),
        })
    }
}

/// Result of a shot at a board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Nothing was hit.
    Miss,
    /// A ship was hit and still has intact cells.
    Hit,
    /// The last intact cell of a ship was hit.
    Sunk,
}

/// Why a ship could not be placed.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementError {
    /// The origin is not on the board.
    #[error("position is outside the board")]
    OutOfBounds,
    /// The ship would touch or overlap another ship.
    #[error("ship touches another ship")]
    Adjacent,
    /// The ship would stick out of the board.
    #[error("ship does not fit on the board in that direction")]
    NoRoom,
    /// Ships need at least one cell.
    #[error("invalid ship size")]
    InvalidSize,
}

/// A player's grid plus the number of ship cells still afloat.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Board {
    cells: [[Cell; BOARD_SIZE]; BOARD_SIZE],
    live: usize,
}

impl Board {
    /// An empty board.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cell at `(row, col)`, `None` outside the board.
    pub fn cell(&self, row: usize, col: usize) -> Option<Cell> {
        self.cells.get(row).and_then(|r| r.get(col)).copied()
    }

    /// Number of ship cells not hit yet.
    pub fn live(&self) -> usize {
        self.live
    }

    /// True while at least one ship cell is intact.
    pub fn is_alive(&self) -> bool {
        self.live > 0
    }

    /// Put a ship on the board.
    ///
    /// Neither the ship's cells nor their orthogonal neighbours may already hold a ship.
    /// On error the board is left untouched.
    pub fn place(&mut self, placement: ShipPlacement) -> Result<(), PlacementError> {
        if placement.length == 0 {
            return Err(PlacementError::InvalidSize);
        }
        if placement.row >= BOARD_SIZE || placement.col >= BOARD_SIZE {
            return Err(PlacementError::OutOfBounds);
        }
        let end = match placement.orientation {
            Orientation::Down => placement.row,
            Orientation::Right => placement.col,
        } + placement.length;
        if end > BOARD_SIZE {
            return Err(PlacementError::NoRoom);
        }
        if placement.cells().any(|(r, c)| self.touches_ship(r, c)) {
            return Err(PlacementError::Adjacent);
        }

        for (r, c) in placement.cells() {
            self.cells[r][c] = Cell::Ship;
        }
        self.live += placement.length;
        Ok(())
    }

    /// Resolve a shot at `(row, col)`.
    ///
    /// Cells already shot are left as they are and count as a miss.
    pub fn incoming(&mut self, row: usize, col: usize) -> Result<Outcome, PlacementError> {
        let Some(cell) = self.cell(row, col) else {
            return Err(PlacementError::OutOfBounds);
        };
        match cell {
            Cell::Ship => {
                self.cells[row][col] = Cell::Hit;
                self.live -= 1;
                if self.ship_still_floating(row, col) {
                    Ok(Outcome::Hit)
                } else {
                    Ok(Outcome::Sunk)
                }
            }
            Cell::Empty => {
                self.cells[row][col] = Cell::Miss;
                Ok(Outcome::Miss)
            }
            // FIXME: a repeated hit reports Miss, waiting on a decision whether it should
            // report Hit again or be rejected
            Cell::Hit | Cell::Miss => Ok(Outcome::Miss),
        }
    }

    fn touches_ship(&self, row: usize, col: usize) -> bool {
        self.cell(row, col) == Some(Cell::Ship)
            || neighbours(row, col).any(|(r, c)| self.cells[r][c] == Cell::Ship)
    }

    /// Walk from a hit cell along each axis direction over contiguous hits, looking for an
    /// intact cell of the same ship.
    fn ship_still_floating(&self, row: usize, col: usize) -> bool {
        const DIRECTIONS: [(isize, isize); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];
        DIRECTIONS.iter().any(|&(dr, dc)| {
            let (mut r, mut c) = (row, col);
            loop {
                let (Some(nr), Some(nc)) = (r.checked_add_signed(dr), c.checked_add_signed(dc))
                else {
                    return false;
                };
                match self.cell(nr, nc) {
                    Some(Cell::Ship) => return true,
                    Some(Cell::Hit) => {
                        r = nr;
                        c = nc;
                    }
                    _ => return false,
                }
            }
        })
    }
}

fn neighbours(row: usize, col: usize) -> impl Iterator<Item = (usize, usize)> {
    [
        row.checked_sub(1).map(|r| (r, col)),
        (row + 1 < BOARD_SIZE).then(|| (row + 1, col)),
        col.checked_sub(1).map(|c| (row, c)),
        (col + 1 < BOARD_SIZE).then(|| (row, col + 1)),
    ]
    .into_iter()
    .flatten()
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Orientation::Down => write!(f, "down"),
            Orientation::Right => write!(f, "right"),
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Miss => write!(f, "miss"),
            Outcome::Hit => write!(f, "hit"),
            Outcome::Sunk => write!(f, "sunk"),
        }
    }
}
