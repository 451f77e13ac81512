//! Game state and turn handling.
//!
//! This module contains the `Game` struct owned by a single room: the board,
//! whose turn it is, and the running turn counter.

use crate::board::{Board, BoardView, Color, Position, Row, BOARD_SIZE, VALID_MOVE_MARKER};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when applying a move
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum GameError {
    #[error("move out of board bounds")]
    OutOfBounds,

    #[error("not player's turn")]
    WrongTurn,

    #[error("invalid move")]
    IllegalMove,
}

/// Outcome of a game by disc majority.
///
/// Wire codes: Black `1`, White `0`, Draw `-1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "i8", try_from = "i8")]
pub enum Winner {
    Black,
    White,
    Draw,
}

impl From<Color> for Winner {
    fn from(color: Color) -> Self {
        match color {
            Color::Black => Winner::Black,
            Color::White => Winner::White,
        }
    }
}

impl From<Winner> for i8 {
    fn from(winner: Winner) -> Self {
        match winner {
            Winner::Black => 1,
            Winner::White => 0,
            Winner::Draw => -1,
        }
    }
}

impl TryFrom<i8> for Winner {
    type Error = String;

    fn try_from(code: i8) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(Winner::Black),
            0 => Ok(Winner::White),
            -1 => Ok(Winner::Draw),
            other => Err(format!("invalid winner code: {other}")),
        }
    }
}

/// The game played in one room
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Game {
    /// Room this game belongs to
    pub room_id: String,
    board: Board,
    turn: Color,
    /// Resolved actions so far; drives the displayed turn number
    turn_count: u32,
}

impl Game {
    /// Start a fresh game with the standard opening, black to move
    pub fn new(room_id: impl Into<String>) -> Self {
        Self::with_board(room_id, Board::new(), Color::Black)
    }

    /// Start from an arbitrary position
    pub fn with_board(room_id: impl Into<String>, board: Board, turn: Color) -> Self {
        Self {
            room_id: room_id.into(),
            board,
            turn,
            turn_count: 0,
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Color to move
    pub fn turn(&self) -> Color {
        self.turn
    }

    pub fn turn_count(&self) -> u32 {
        self.turn_count
    }

    pub fn increment_turn_count(&mut self) {
        self.turn_count += 1;
    }

    /// Turn number shown to players: two resolved actions make one turn
    pub fn turn_index(&self) -> u32 {
        (self.turn_count + 1) / 2
    }

    /// Hand the turn to the other color without touching the board
    pub fn pass_turn(&mut self) {
        self.turn = self.turn.opponent();
    }

    /// Legal positions for `color` in row-major order
    pub fn valid_moves(&self, color: Color) -> Vec<Position> {
        self.board.legal_moves(color)
    }

    /// Overlay with [`VALID_MOVE_MARKER`] on legal cells and `0` elsewhere
    pub fn valid_moves_map(&self, color: Color) -> BoardView {
        let mut map = [[0u8; BOARD_SIZE]; BOARD_SIZE];
        for pos in self.valid_moves(color) {
            map[pos.x][pos.y] = VALID_MOVE_MARKER;
        }
        map
    }

    /// Board codes with legal cells for `color` marked
    pub fn board_with_valid_moves(&self, color: Color) -> BoardView {
        self.board.to_view_with_moves(color)
    }

    /// Place a disc for `color` at `(x, y)`, flip captured runs and pass the
    /// turn to the opponent.
    pub fn place_disc(&mut self, color: Color, x: i32, y: i32) -> Result<&Board, GameError> {
        let pos = Position::checked(x, y).ok_or(GameError::OutOfBounds)?;
        if color != self.turn {
            return Err(GameError::WrongTurn);
        }
        if !self.board.can_place(color, pos) {
            return Err(GameError::IllegalMove);
        }

        self.board.place(color, pos);
        self.pass_turn();
        Ok(&self.board)
    }

    /// Replace one row wholesale
    pub fn set_row(&mut self, index: usize, row: Row) -> Result<(), GameError> {
        if self.board.set_row(index, row) {
            Ok(())
        } else {
            Err(GameError::OutOfBounds)
        }
    }

    /// Returns `(black_count, white_count)`
    pub fn disc_counts(&self) -> (usize, usize) {
        self.board.counts()
    }

    /// Current leader by disc count. Valid at any point in the game.
    pub fn winner(&self) -> Winner {
        let (black, white) = self.disc_counts();
        match black.cmp(&white) {
            std::cmp::Ordering::Greater => Winner::Black,
            std::cmp::Ordering::Less => Winner::White,
            std::cmp::Ordering::Equal => Winner::Draw,
        }
    }

    /// True when neither color has a legal move
    pub fn is_game_over(&self) -> bool {
        self.valid_moves(Color::Black).is_empty() && self.valid_moves(Color::White).is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Cell;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_new_game_black_to_move() {
        let game = Game::new("room-1");
        assert_eq!(game.room_id, "room-1");
        assert_eq!(game.turn(), Color::Black);
        assert_eq!(game.turn_count(), 0);
        assert_eq!(game.valid_moves(Color::Black).len(), 4);
        assert_eq!(game.disc_counts(), (2, 2));
    }

    #[test]
    fn test_place_disc_errors() {
        let mut game = Game::new("r");
        assert_eq!(game.place_disc(Color::Black, 8, 0), Err(GameError::OutOfBounds));
        assert_eq!(game.place_disc(Color::Black, 0, -1), Err(GameError::OutOfBounds));
        assert_eq!(game.place_disc(Color::White, 2, 3), Err(GameError::WrongTurn));
        assert_eq!(game.place_disc(Color::Black, 3, 3), Err(GameError::IllegalMove));
        assert_eq!(game.place_disc(Color::Black, 0, 0), Err(GameError::IllegalMove));
        assert_eq!(game.turn(), Color::Black);
        assert_eq!(game.board(), &Board::new());
    }

    #[test]
    fn test_out_of_bounds_checked_before_turn() {
        let mut game = Game::new("r");
        assert_eq!(game.place_disc(Color::White, -1, 9), Err(GameError::OutOfBounds));
    }

    #[test]
    fn test_place_disc_flips_and_toggles_turn() {
        let mut game = Game::new("r");
        game.place_disc(Color::Black, 2, 3).unwrap();

        assert_eq!(game.board().get(Position::new(2, 3)), Cell::Black);
        assert_eq!(game.board().get(Position::new(3, 3)), Cell::Black);
        assert_eq!(game.disc_counts(), (4, 1));
        assert_eq!(game.turn(), Color::White);
        // Turn counting belongs to the caller
        assert_eq!(game.turn_count(), 0);
    }

    #[test]
    fn test_pass_turn_keeps_board() {
        let mut game = Game::new("r");
        game.pass_turn();
        assert_eq!(game.turn(), Color::White);
        assert_eq!(game.board(), &Board::new());
        assert_eq!(game.turn_count(), 0);
    }

    #[test]
    fn test_turn_index() {
        let mut game = Game::new("r");
        assert_eq!(game.turn_index(), 0);
        game.increment_turn_count();
        assert_eq!(game.turn_index(), 1);
        game.increment_turn_count();
        assert_eq!(game.turn_index(), 1);
        game.increment_turn_count();
        assert_eq!(game.turn_index(), 2);
    }

    #[test]
    fn test_winner_all_black() {
        let board = Board::from_cells([[Cell::Black; BOARD_SIZE]; BOARD_SIZE]);
        let game = Game::with_board("r", board, Color::Black);
        assert_eq!(game.winner(), Winner::Black);
        assert!(game.is_game_over());
    }

    #[test]
    fn test_winner_checkerboard_is_draw() {
        let mut board = Board::empty();
        for x in 0..BOARD_SIZE {
            for y in 0..BOARD_SIZE {
                let cell = if (x + y) % 2 == 0 { Cell::Black } else { Cell::White };
                board.set(Position::new(x, y), cell);
            }
        }
        let game = Game::with_board("r", board, Color::Black);
        assert_eq!(game.winner(), Winner::Draw);
    }

    #[test]
    fn test_winner_mid_game() {
        let mut game = Game::new("r");
        assert_eq!(game.winner(), Winner::Draw);
        game.place_disc(Color::Black, 2, 3).unwrap();
        assert_eq!(game.winner(), Winner::Black);
    }

    #[test]
    fn test_game_over_on_non_full_board() {
        let mut board = Board::empty();
        board.set(Position::new(0, 0), Cell::Black);
        board.set(Position::new(7, 7), Cell::White);
        let game = Game::with_board("r", board, Color::Black);
        assert!(game.is_game_over());
    }

    #[test]
    fn test_not_over_while_one_side_can_move() {
        // Black can capture at (0,2); white has no move
        let mut board = Board::empty();
        board.set(Position::new(0, 0), Cell::Black);
        board.set(Position::new(0, 1), Cell::White);
        let game = Game::with_board("r", board, Color::White);
        assert!(game.valid_moves(Color::White).is_empty());
        assert_eq!(game.valid_moves(Color::Black), vec![Position::new(0, 2)]);
        assert!(!game.is_game_over());
    }

    #[test]
    fn test_valid_moves_map() {
        let game = Game::new("r");
        let map = game.valid_moves_map(Color::Black);
        let marked: usize = map.iter().flatten().filter(|&&c| c == VALID_MOVE_MARKER).count();
        assert_eq!(marked, 4);
        assert_eq!(map[2][3], VALID_MOVE_MARKER);
        assert_eq!(map[3][3], 0);
        assert_eq!(map[0][0], 0);
    }

    #[test]
    fn test_set_row() {
        let mut game = Game::new("r");
        assert_eq!(game.set_row(8, [Cell::Empty; BOARD_SIZE]), Err(GameError::OutOfBounds));
        game.set_row(3, [Cell::Empty; BOARD_SIZE]).unwrap();
        assert_eq!(game.disc_counts(), (1, 1));
    }
}
