//! Built-in 5x5 icons.
//!
//! Each row is a 5-bit mask; bit 4 is the leftmost column.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Side length of the LED matrix.
pub const MATRIX_SIZE: usize = 5;

/// Status icons shown by the drive loop.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Icon {
    /// Tick mark, shown when a reading was taken.
    Yes,
    /// Shown while the rover is moving.
    Heart,
    /// Shown when the rover stays put in front of an obstacle.
    Duck,
    /// Shown once at start-up.
    Happy,
}

impl Icon {
    /// Row masks, top row first.
    pub const fn rows(self) -> [u8; MATRIX_SIZE] {
        match self {
            Icon::Yes => [0b00000, 0b00001, 0b00010, 0b10100, 0b01000],
            Icon::Heart => [0b01010, 0b11111, 0b11111, 0b01110, 0b00100],
            Icon::Duck => [0b01100, 0b11100, 0b01111, 0b01110, 0b00000],
            Icon::Happy => [0b00000, 0b01010, 0b00000, 0b10001, 0b01110],
        }
    }

    /// Whether the LED at `row`, `col` is lit. Out-of-range coordinates are dark.
    pub fn is_lit(self, row: usize, col: usize) -> bool {
        if row >= MATRIX_SIZE || col >= MATRIX_SIZE {
            return false;
        }
        self.rows()[row] & (1 << (MATRIX_SIZE - 1 - col)) != 0
    }
}
