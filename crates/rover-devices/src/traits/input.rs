#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Named push-buttons on the controller board.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ButtonId {
    #[default]
    A,
    B,
}

/// Source of button state.
pub trait ButtonInput {
    type Error: core::fmt::Debug;

    /// Whether `button` is held down right now. No debouncing is applied.
    fn is_pressed(&mut self, button: ButtonId) -> Result<bool, Self::Error>;
}
