//! Row bit operations.
//!
//! A row's discs are read left to right as a binary number (White = 0,
//! Black = 1). Empty cells are skipped and never written. The number is
//! combined with an operand and written back into the same cells, keeping
//! the original width: excess low-order bits are dropped and short results
//! are zero-padded on the left.

use crate::board::{Cell, Row};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors from [`apply_bit_operation`]
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum BitOpError {
    #[error("unsupported operator: must be '+' or '*' (got {0:?})")]
    UnsupportedOperator(String),
}

/// Arithmetic applied to a row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = "+")]
    Add,
    #[serde(rename = "*")]
    Mul,
}

impl Operator {
    pub fn symbol(self) -> &'static str {
        match self {
            Operator::Add => "+",
            Operator::Mul => "*",
        }
    }

    fn apply(self, lhs: u64, rhs: u64) -> u64 {
        match self {
            Operator::Add => lhs + rhs,
            Operator::Mul => lhs * rhs,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for Operator {
    type Err = BitOpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "+" => Ok(Operator::Add),
            "*" => Ok(Operator::Mul),
            other => Err(BitOpError::UnsupportedOperator(other.to_string())),
        }
    }
}

/// Parse `operator` and apply it to `row`. See [`apply`].
pub fn apply_bit_operation(row: Row, value: u32, operator: &str) -> Result<Row, BitOpError> {
    let operator = operator.parse::<Operator>()?;
    Ok(apply(row, value, operator))
}

/// Apply `operator` with operand `value` to the discs of `row`.
///
/// A row without discs comes back unchanged.
pub fn apply(mut row: Row, value: u32, operator: Operator) -> Row {
    let indices: Vec<usize> = row
        .iter()
        .enumerate()
        .filter(|(_, cell)| !cell.is_empty())
        .map(|(i, _)| i)
        .collect();

    if indices.is_empty() {
        return row;
    }

    let original = indices
        .iter()
        .fold(0u64, |acc, &i| (acc << 1) | u64::from(row[i] == Cell::Black));
    // Both operands are bounded (8 bits, 32 bits), so u64 cannot overflow
    let result = operator.apply(original, u64::from(value));

    let width = indices.len();
    let bits = fit_width(&format!("{result:b}"), width);

    for (&idx, bit) in indices.iter().zip(bits.bytes()) {
        row[idx] = if bit == b'1' { Cell::Black } else { Cell::White };
    }
    row
}

/// Keep the `width` most significant digits, or left-pad with zeros
fn fit_width(digits: &str, width: usize) -> String {
    if digits.len() >= width {
        digits[..width].to_string()
    } else {
        format!("{digits:0>width$}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const E: Cell = Cell::Empty;
    const B: Cell = Cell::Black;
    const W: Cell = Cell::White;

    #[test]
    fn test_addition_same_width() {
        // 1011 + 4 = 1111
        let row = [E, B, W, B, B, E, E, E];
        assert_eq!(apply_bit_operation(row, 4, "+"), Ok([E, B, B, B, B, E, E, E]));
    }

    #[test]
    fn test_multiplication_drops_low_bits() {
        // 1011 * 3 = 100001, keep the leftmost four digits: 1000
        let row = [E, B, W, B, B, E, E, E];
        assert_eq!(apply_bit_operation(row, 3, "*"), Ok([E, B, W, W, W, E, E, E]));
    }

    #[test]
    fn test_no_discs_is_noop() {
        let row = [E; 8];
        assert_eq!(apply_bit_operation(row, 1, "+"), Ok(row));
        assert_eq!(apply_bit_operation(row, 0, "*"), Ok(row));
    }

    #[test]
    fn test_short_result_is_left_padded() {
        // 10 + 1 = 11
        let row = [E, B, W, E, E, E, E, E];
        assert_eq!(apply_bit_operation(row, 1, "+"), Ok([E, B, B, E, E, E, E, E]));

        // 101 * 0 = 0 -> 000
        let row = [B, E, W, E, B, E, E, E];
        assert_eq!(apply_bit_operation(row, 0, "*"), Ok([W, E, W, E, W, E, E, E]));
    }

    #[test]
    fn test_leading_zero_bits_pad_back() {
        // 0001 + 1 = 10 -> 0010
        let row = [W, W, W, B, E, E, E, E];
        assert_eq!(apply_bit_operation(row, 1, "+"), Ok([W, W, B, W, E, E, E, E]));
    }

    #[test]
    fn test_empty_cells_untouched() {
        // Discs at 0, 3, 7: 110 + 1 = 111
        let row = [B, E, E, B, E, E, E, W];
        assert_eq!(apply_bit_operation(row, 1, "+"), Ok([B, E, E, B, E, E, E, B]));
    }

    #[test]
    fn test_full_row_overflow() {
        // 11111111 + 1 = 100000000, leftmost eight digits: 10000000
        let row = [B; 8];
        assert_eq!(apply_bit_operation(row, 1, "+"), Ok([B, W, W, W, W, W, W, W]));
    }

    #[test]
    fn test_large_operand() {
        let row = [B; 8];
        let out = apply_bit_operation(row, u32::MAX, "*").unwrap();
        // 255 * (2^32 - 1) starts with binary 11111110
        assert_eq!(out, [B, B, B, B, B, B, B, W]);
    }

    #[test]
    fn test_unsupported_operator() {
        let row = [E, B, W, B, B, E, E, E];
        assert_eq!(
            apply_bit_operation(row, 1, "-"),
            Err(BitOpError::UnsupportedOperator("-".to_string()))
        );
    }

    #[test]
    fn test_operator_parse_and_display() {
        assert_eq!("+".parse::<Operator>(), Ok(Operator::Add));
        assert_eq!("*".parse::<Operator>(), Ok(Operator::Mul));
        assert!("/".parse::<Operator>().is_err());
        assert_eq!(Operator::Mul.to_string(), "*");
    }
}
