//! Board representation and the Reversi capture rule.
//!
//! This module contains:
//! - Cell and disc colors, with their integer wire codes
//! - The fixed 8x8 board grid
//! - Direction scanning used for legality checks and flip resolution
//! - Board views with a valid-move overlay for clients

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Width and height of the board
pub const BOARD_SIZE: usize = 8;

/// Marker written on legal cells in a board view
pub const VALID_MOVE_MARKER: u8 = 9;

/// The eight scan directions as (dx, dy) steps
const DIRECTIONS: [(i32, i32); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

/// One row of the board, left to right
pub type Row = [Cell; BOARD_SIZE];

/// An 8x8 grid of integer codes as sent to clients
pub type BoardView = [[u8; BOARD_SIZE]; BOARD_SIZE];

/// Raised when decoding an integer that is not a known cell or color code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid cell code: {0}")]
pub struct InvalidCode(pub u8);

/// Disc color of a player.
///
/// Wire codes match the cell codes: White is `0`, Black is `1`. These double
/// as bit values when a row is read as a binary number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Color {
    Black,
    White,
}

impl Color {
    /// The other player's color
    pub fn opponent(self) -> Self {
        match self {
            Color::Black => Color::White,
            Color::White => Color::Black,
        }
    }

    pub fn code(self) -> u8 {
        match self {
            Color::White => 0,
            Color::Black => 1,
        }
    }
}

impl From<Color> for u8 {
    fn from(color: Color) -> Self {
        color.code()
    }
}

impl TryFrom<u8> for Color {
    type Error = InvalidCode;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Color::White),
            1 => Ok(Color::Black),
            other => Err(InvalidCode(other)),
        }
    }
}

/// Contents of a single board position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Cell {
    Empty,
    Black,
    White,
}

impl Cell {
    /// Integer code used on the wire (White 0, Black 1, Empty 7)
    pub fn code(self) -> u8 {
        match self {
            Cell::White => 0,
            Cell::Black => 1,
            Cell::Empty => 7,
        }
    }

    /// Color of the disc in this cell, if any
    pub fn color(self) -> Option<Color> {
        match self {
            Cell::Black => Some(Color::Black),
            Cell::White => Some(Color::White),
            Cell::Empty => None,
        }
    }

    pub fn is_empty(self) -> bool {
        self == Cell::Empty
    }
}

impl From<Color> for Cell {
    fn from(color: Color) -> Self {
        match color {
            Color::Black => Cell::Black,
            Color::White => Cell::White,
        }
    }
}

impl From<Cell> for u8 {
    fn from(cell: Cell) -> Self {
        cell.code()
    }
}

impl TryFrom<u8> for Cell {
    type Error = InvalidCode;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Cell::White),
            1 => Ok(Cell::Black),
            7 => Ok(Cell::Empty),
            other => Err(InvalidCode(other)),
        }
    }
}

/// A board coordinate. `x` selects the row, `y` the column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: usize,
    pub y: usize,
}

impl Position {
    pub fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }

    /// Convert signed coordinates, returning `None` when off the board
    pub fn checked(x: i32, y: i32) -> Option<Self> {
        if in_bounds(x, y) {
            Some(Self::new(x as usize, y as usize))
        } else {
            None
        }
    }
}

fn in_bounds(x: i32, y: i32) -> bool {
    (0..BOARD_SIZE as i32).contains(&x) && (0..BOARD_SIZE as i32).contains(&y)
}

/// The 8x8 Reversi board.
///
/// Serializes as a nested array of cell codes indexed `[x][y]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Board {
    cells: [Row; BOARD_SIZE],
}

impl Board {
    /// Canonical opening: white on the main diagonal of the centre, black on
    /// the anti-diagonal
    pub fn new() -> Self {
        let mut board = Self::empty();
        board.cells[3][3] = Cell::White;
        board.cells[4][4] = Cell::White;
        board.cells[3][4] = Cell::Black;
        board.cells[4][3] = Cell::Black;
        board
    }

    /// A board with no discs at all
    pub fn empty() -> Self {
        Self {
            cells: [[Cell::Empty; BOARD_SIZE]; BOARD_SIZE],
        }
    }

    pub fn from_cells(cells: [Row; BOARD_SIZE]) -> Self {
        Self { cells }
    }

    pub fn get(&self, pos: Position) -> Cell {
        self.cells[pos.x][pos.y]
    }

    pub fn set(&mut self, pos: Position, cell: Cell) {
        self.cells[pos.x][pos.y] = cell;
    }

    /// Copy of row `index`, or `None` when the index is off the board
    pub fn row(&self, index: usize) -> Option<Row> {
        self.cells.get(index).copied()
    }

    /// Overwrite row `index`. Returns false when the index is off the board.
    pub fn set_row(&mut self, index: usize, row: Row) -> bool {
        match self.cells.get_mut(index) {
            Some(slot) => {
                *slot = row;
                true
            }
            None => false,
        }
    }

    /// Number of discs of the given color
    pub fn count(&self, color: Color) -> usize {
        let target = Cell::from(color);
        self.cells
            .iter()
            .flatten()
            .filter(|&&cell| cell == target)
            .count()
    }

    /// Returns `(black_count, white_count)`
    pub fn counts(&self) -> (usize, usize) {
        (self.count(Color::Black), self.count(Color::White))
    }

    /// Length of the opponent run capturable from `pos` in one direction.
    ///
    /// Zero unless the run is closed by a disc of `color` before the edge or
    /// an empty cell.
    fn flippable(&self, color: Color, pos: Position, (dx, dy): (i32, i32)) -> usize {
        let own = Cell::from(color);
        let opponent = Cell::from(color.opponent());
        let mut count = 0;
        let mut x = pos.x as i32 + dx;
        let mut y = pos.y as i32 + dy;

        while in_bounds(x, y) {
            let cell = self.cells[x as usize][y as usize];
            if cell == opponent {
                count += 1;
            } else if cell == own {
                return count;
            } else {
                break;
            }
            x += dx;
            y += dy;
        }
        0
    }

    /// Whether `color` may place a disc at `pos`
    pub fn can_place(&self, color: Color, pos: Position) -> bool {
        self.get(pos).is_empty()
            && DIRECTIONS
                .iter()
                .any(|&dir| self.flippable(color, pos, dir) > 0)
    }

    /// All legal positions for `color` in row-major order
    pub fn legal_moves(&self, color: Color) -> Vec<Position> {
        let mut moves = Vec::new();
        for x in 0..BOARD_SIZE {
            for y in 0..BOARD_SIZE {
                let pos = Position::new(x, y);
                if self.can_place(color, pos) {
                    moves.push(pos);
                }
            }
        }
        moves
    }

    /// Put a disc at `pos` and flip every captured run.
    ///
    /// The caller must have checked [`Board::can_place`]. Returns the number
    /// of flipped discs.
    pub(crate) fn place(&mut self, color: Color, pos: Position) -> usize {
        let own = Cell::from(color);
        let mut flipped = 0;

        for &(dx, dy) in &DIRECTIONS {
            let run = self.flippable(color, pos, (dx, dy));
            let mut x = pos.x as i32;
            let mut y = pos.y as i32;
            for _ in 0..run {
                x += dx;
                y += dy;
                self.cells[x as usize][y as usize] = own;
            }
            flipped += run;
        }

        self.set(pos, own);
        flipped
    }

    /// Cell codes with no overlay
    pub fn to_view(&self) -> BoardView {
        let mut view = [[0u8; BOARD_SIZE]; BOARD_SIZE];
        for (x, row) in self.cells.iter().enumerate() {
            for (y, cell) in row.iter().enumerate() {
                view[x][y] = cell.code();
            }
        }
        view
    }

    /// Cell codes with [`VALID_MOVE_MARKER`] on every legal cell for `color`
    pub fn to_view_with_moves(&self, color: Color) -> BoardView {
        let mut view = self.to_view();
        for pos in self.legal_moves(color) {
            view[pos.x][pos.y] = VALID_MOVE_MARKER;
        }
        view
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}
