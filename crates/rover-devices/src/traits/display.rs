use crate::icon::Icon;

/// Small LED matrix used for status feedback. Output only.
pub trait LedDisplay {
    type Error: core::fmt::Debug;

    fn show_icon(&mut self, icon: Icon) -> Result<(), Self::Error>;

    fn show_number(&mut self, value: i32) -> Result<(), Self::Error>;

    /// Turn every LED off.
    fn clear(&mut self) -> Result<(), Self::Error>;
}
