//! Binary Reversi - a Reversi rules engine with row bit operations
//!
//! This crate provides the core game logic, including:
//! - The 8x8 board with the standard capture rule
//! - Game state: turn order, turn counting, scoring and game-over detection
//! - The bit operation that rewrites a row as a binary number
//!
//! # Architecture
//!
//! The engine is pure: no I/O and no locking. A server owns one [`Game`] per
//! room and is responsible for serializing access to it.
//!
//! # Modules
//!
//! - [`board`]: Cells, colors, positions and the capture rule
//! - [`game`]: Game state and turn handling
//! - [`bitop`]: Row-as-binary-number arithmetic
//! - [`actions`]: The moves a player can make

pub mod actions;
pub mod bitop;
pub mod board;
pub mod game;

// Re-export commonly used types
pub use actions::Move;
pub use bitop::{apply_bit_operation, BitOpError, Operator};
pub use board::{
    Board, BoardView, Cell, Color, InvalidCode, Position, Row, BOARD_SIZE, VALID_MOVE_MARKER,
};
pub use game::{Game, GameError, Winner};
