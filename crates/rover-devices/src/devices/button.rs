use embedded_hal::digital::InputPin;

use crate::traits::input::{ButtonId, ButtonInput};

/// The two front buttons of the controller board, wired active-low.
///
/// Pins must already be configured as pulled-up inputs.
pub struct ButtonPad<P> {
    a: P,
    b: P,
}

impl<P: InputPin> ButtonPad<P> {
    pub fn new(a: P, b: P) -> Self {
        ButtonPad { a, b }
    }

    pub fn into_pins(self) -> (P, P) {
        (self.a, self.b)
    }
}

impl<P: InputPin> ButtonInput for ButtonPad<P> {
    type Error = P::Error;

    fn is_pressed(&mut self, button: ButtonId) -> Result<bool, Self::Error> {
        // Pressed pulls the line to ground.
        match button {
            ButtonId::A => self.a.is_low(),
            ButtonId::B => self.b.is_low(),
        }
    }
}
