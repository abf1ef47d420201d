//! Text rendering of two boards side by side, for the diagnostic stream.

use std::fmt::Write;

use crate::agent::PlayerId;
use crate::board::{Board, Cell, BOARD_SIZE};

const MARGIN: &str = "        ";
const GAP: &str = "          ";

/// Render `me` (fully visible) next to `other`.
///
/// Unless `other_visible`, only the shots fired at `other` are shown.
pub fn render_boards(
    me: (PlayerId, &Board),
    other: (PlayerId, &Board),
    other_visible: bool,
) -> String {
    let left = board_lines(me.0, me.1, true);
    let right = board_lines(other.0, other.1, other_visible);
    let mut out = String::from("\n");
    for (l, r) in left.iter().zip(&right) {
        let _ = writeln!(out, "{MARGIN}{l}{GAP}{r}");
    }
    out
}

fn board_lines(id: PlayerId, board: &Board, visible: bool) -> Vec<String> {
    let header = format!("{id} | 0 1 2 3 4 5 6 7 8 9 | {id}");
    let rule = "--+---------------------+--".to_string();

    let mut lines = vec![header.clone(), rule.clone()];
    for row in 0..BOARD_SIZE {
        let mut line = format!("{row} | ");
        for col in 0..BOARD_SIZE {
            let symbol = match board.cell(row, col) {
                Some(Cell::Hit) => 'X',
                Some(Cell::Miss) => 'o',
                Some(Cell::Ship) if visible => 'S',
                _ => '.',
            };
            line.push(symbol);
            line.push(' ');
        }
        let _ = write!(line, "| {row}");
        lines.push(line);
    }
    lines.push(rule);
    lines.push(header);
    lines
}
