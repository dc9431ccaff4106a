// Snake turn order and the sheet cursor movement table.
//
// The sheet lays players out as columns starting at column 2, with pick rows
// starting at row 2. A forward pass walks columns left to right, a backward
// pass walks them right to left, and each pass ends by dropping one row.

use serde::{Deserialize, Serialize};

/// Snake order over `n` seats: `0..n` followed by `n..0`.
pub fn snake_order(n: usize) -> Vec<usize> {
    (0..n).chain((0..n).rev()).collect()
}

/// Row/column position in the mirrored sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetCursor {
    pub row: u32,
    pub column: u32,
}

impl Default for SheetCursor {
    fn default() -> Self {
        SheetCursor { row: 2, column: 2 }
    }
}

/// Per-turn-index cursor deltas, indexed by the index of the player who just
/// picked.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementTable {
    pub row_move: Vec<i32>,
    pub column_move: Vec<i32>,
}

impl MovementTable {
    /// Boustrophedon traversal across `players` columns.
    pub fn for_players(players: usize) -> Self {
        let len = players * 2;
        let mut row_move = vec![0; len];
        let mut column_move = vec![0; len];

        for i in 0..len {
            if i == players - 1 || i == len - 1 {
                row_move[i] = 1;
            } else if i < players {
                column_move[i] = 1;
            } else {
                column_move[i] = -1;
            }
        }

        MovementTable {
            row_move,
            column_move,
        }
    }

    pub fn len(&self) -> usize {
        self.row_move.len()
    }

    pub fn is_empty(&self) -> bool {
        self.row_move.is_empty()
    }

    /// Move `cursor` after a pick made at turn index `index`.
    pub fn apply(&self, index: usize, cursor: &mut SheetCursor) {
        cursor.row = cursor.row.saturating_add_signed(self.row_move[index]);
        cursor.column = cursor.column.saturating_add_signed(self.column_move[index]);
    }
}
