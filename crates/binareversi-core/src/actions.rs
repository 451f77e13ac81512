//! Moves a player can make.
//!
//! A `Move` is transient: it is validated and applied as a single step by
//! whoever owns the [`Game`](crate::Game), then discarded.

use crate::bitop::Operator;
use serde::{Deserialize, Serialize};

/// All state-changing actions a player can take
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Move {
    /// Place a disc at row `x`, column `y`
    PlaceDisc { x: i32, y: i32 },
    /// Rewrite a row with a bit operation
    BitOperation {
        row: i32,
        value: u32,
        operator: Operator,
    },
    /// Give the turn away
    Pass,
    /// Concede; the opponent wins
    Surrender,
    /// Close the room for good
    ExitRoom,
}

impl Move {
    /// Whether this move needs an unfinished game
    pub fn is_gameplay(&self) -> bool {
        !matches!(self, Move::ExitRoom)
    }
}
