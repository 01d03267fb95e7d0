//! Four-wire unipolar stepper (28BYJ-48 behind a ULN2003 board).

use core::fmt;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;

const L: bool = false;
const H: bool = true;

/// Coil pattern for half-stepping: alternates one and two energized coils.
pub const HALF_STEP: [[bool; 4]; 8] = [
    [L, L, L, H],
    [L, L, H, H],
    [L, L, H, L],
    [L, H, H, L],
    [L, H, L, L],
    [H, H, L, L],
    [H, L, L, L],
    [H, L, L, H],
];

/// Coil pattern for full-stepping: two coils energized at every phase.
pub const FULL_STEP: [[bool; 4]; 4] = [
    [H, L, H, L],
    [L, H, H, L],
    [L, H, L, H],
    [H, L, L, H],
];

/// Coil sequencing mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StepMode {
    /// Eight phases per electrical cycle. Smoother, half the torque step.
    #[default]
    Half,
    /// Four phases per electrical cycle.
    Full,
}

impl StepMode {
    pub const fn sequence(self) -> &'static [[bool; 4]] {
        match self {
            StepMode::Half => &HALF_STEP,
            StepMode::Full => &FULL_STEP,
        }
    }
}

/// Shaft rotation direction, as seen by the stepper itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Reverse,
}

impl Direction {
    const fn sign(self) -> i64 {
        match self {
            Direction::Forward => 1,
            Direction::Reverse => -1,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StepperError<E> {
    /// A coil pin could not be driven.
    Pin(E),
}

impl<E: fmt::Debug> fmt::Display for StepperError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepperError::Pin(e) => write!(f, "Stepper coil pin error: {:?}", e),
        }
    }
}

/// A unipolar stepper driven one phase at a time through four coil pins.
///
/// The position counter is open-loop: it counts phases emitted, not shaft motion.
pub struct Stepper<P> {
    pins: [P; 4],
    mode: StepMode,
    phase: usize,
    position: i64,
}

impl<P: OutputPin> Stepper<P> {
    /// Takes ownership of the coil pins and switches all of them off.
    pub fn new(mode: StepMode, pins: [P; 4]) -> Result<Self, StepperError<P::Error>> {
        let mut stepper = Stepper {
            pins,
            mode,
            phase: 0,
            position: 0,
        };
        stepper.release()?;
        Ok(stepper)
    }

    /// Phases emitted since construction (forward minus reverse).
    pub fn position(&self) -> i64 {
        self.position
    }

    /// Advance one phase in `direction`, then wait `phase_delay_us`.
    ///
    /// Coils stay energized afterwards; call [`Stepper::release`] when the move is done.
    pub fn step_once<D: DelayNs>(
        &mut self,
        delay: &mut D,
        direction: Direction,
        phase_delay_us: u32,
    ) -> Result<(), StepperError<P::Error>> {
        let sequence = self.mode.sequence();
        let len = sequence.len();
        self.phase = match direction {
            Direction::Forward => (self.phase + 1) % len,
            Direction::Reverse => (self.phase + len - 1) % len,
        };
        self.energize(sequence[self.phase])?;
        self.position += direction.sign();
        delay.delay_us(phase_delay_us);
        Ok(())
    }

    /// Emit `phases` phases in `direction` and release the coils.
    pub fn step<D: DelayNs>(
        &mut self,
        delay: &mut D,
        phases: u32,
        direction: Direction,
        phase_delay_us: u32,
    ) -> Result<(), StepperError<P::Error>> {
        for _ in 0..phases {
            if let Err(e) = self.step_once(delay, direction, phase_delay_us) {
                let _ = self.release();
                return Err(e);
            }
        }
        self.release()
    }

    /// De-energize every coil. The gearbox holds the shaft without current.
    pub fn release(&mut self) -> Result<(), StepperError<P::Error>> {
        for pin in self.pins.iter_mut() {
            pin.set_low().map_err(StepperError::Pin)?;
        }
        Ok(())
    }

    pub fn into_pins(self) -> [P; 4] {
        self.pins
    }

    fn energize(&mut self, coils: [bool; 4]) -> Result<(), StepperError<P::Error>> {
        for (pin, on) in self.pins.iter_mut().zip(coils) {
            if on {
                pin.set_high().map_err(StepperError::Pin)?;
            } else {
                pin.set_low().map_err(StepperError::Pin)?;
            }
        }
        Ok(())
    }
}

/// A phase budget for one stepper inside [`interleave`].
pub struct StepCommand<'a, P> {
    pub stepper: &'a mut Stepper<P>,
    pub phases: u32,
    pub direction: Direction,
}

impl<'a, P> StepCommand<'a, P> {
    pub fn new(stepper: &'a mut Stepper<P>, phases: u32, direction: Direction) -> Self {
        StepCommand {
            stepper,
            phases,
            direction,
        }
    }
}

/// Run several steppers together by handing out one phase at a time, round robin.
///
/// Commands with a spent budget are skipped, so a shorter move finishes early while the
/// others carry on. Every stepper is released once all budgets reach zero.
pub fn interleave<P: OutputPin, D: DelayNs>(
    commands: &mut [StepCommand<'_, P>],
    delay: &mut D,
    phase_delay_us: u32,
) -> Result<(), StepperError<P::Error>> {
    if let Err(e) = spend_budgets(commands, delay, phase_delay_us) {
        for command in commands.iter_mut() {
            let _ = command.stepper.release();
        }
        return Err(e);
    }

    for command in commands.iter_mut() {
        command.stepper.release()?;
    }
    Ok(())
}

fn spend_budgets<P: OutputPin, D: DelayNs>(
    commands: &mut [StepCommand<'_, P>],
    delay: &mut D,
    phase_delay_us: u32,
) -> Result<(), StepperError<P::Error>> {
    let mut remaining: u64 = commands.iter().map(|c| c.phases as u64).sum();

    while remaining > 0 {
        for command in commands.iter_mut().filter(|c| c.phases > 0) {
            command.stepper.step_once(delay, command.direction, phase_delay_us)?;
            command.phases -= 1;
            remaining -= 1;
        }
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use core::convert::Infallible;
    use embedded_hal::digital::{Error, ErrorKind, ErrorType};
    use std::cell::Cell;
    use std::rc::Rc;

    /// Output pin whose level can be inspected from the test.
    #[derive(Clone, Default)]
    pub(crate) struct FakePin {
        pub level: Rc<Cell<bool>>,
    }

    impl ErrorType for FakePin {
        type Error = Infallible;
    }

    impl OutputPin for FakePin {
        fn set_low(&mut self) -> Result<(), Self::Error> {
            self.level.set(false);
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Self::Error> {
            self.level.set(true);
            Ok(())
        }
    }

    /// Delay that only adds up the requested time.
    #[derive(Clone, Default)]
    pub(crate) struct CountingDelay {
        pub total_ns: Rc<Cell<u64>>,
    }

    impl DelayNs for CountingDelay {
        fn delay_ns(&mut self, ns: u32) {
            self.total_ns.set(self.total_ns.get() + ns as u64);
        }
    }

    pub(crate) fn fake_stepper(mode: StepMode) -> (Stepper<FakePin>, [FakePin; 4]) {
        let pins: [FakePin; 4] = Default::default();
        let stepper = Stepper::new(mode, pins.clone()).unwrap();
        (stepper, pins)
    }

    fn levels(pins: &[FakePin; 4]) -> [bool; 4] {
        [
            pins[0].level.get(),
            pins[1].level.get(),
            pins[2].level.get(),
            pins[3].level.get(),
        ]
    }

    #[derive(Debug)]
    struct BrokenPinError;

    impl Error for BrokenPinError {
        fn kind(&self) -> ErrorKind {
            ErrorKind::Other
        }
    }

    struct BrokenPin;

    impl ErrorType for BrokenPin {
        type Error = BrokenPinError;
    }

    impl OutputPin for BrokenPin {
        fn set_low(&mut self) -> Result<(), Self::Error> {
            Err(BrokenPinError)
        }

        fn set_high(&mut self) -> Result<(), Self::Error> {
            Err(BrokenPinError)
        }
    }

    #[test]
    fn test_new_releases_coils() {
        let pins: [FakePin; 4] = Default::default();
        for pin in &pins {
            pin.level.set(true);
        }
        let _stepper = Stepper::new(StepMode::Half, pins.clone()).unwrap();
        assert_eq!(levels(&pins), [false; 4]);
    }

    #[test]
    fn test_forward_walks_half_step_table() {
        let (mut stepper, pins) = fake_stepper(StepMode::Half);
        let mut delay = CountingDelay::default();

        for expected in 1..=HALF_STEP.len() {
            stepper.step_once(&mut delay, Direction::Forward, 0).unwrap();
            assert_eq!(levels(&pins), HALF_STEP[expected % HALF_STEP.len()]);
        }
        assert_eq!(stepper.position(), 8);
    }

    #[test]
    fn test_reverse_walks_table_backwards() {
        let (mut stepper, pins) = fake_stepper(StepMode::Full);
        let mut delay = CountingDelay::default();

        stepper.step_once(&mut delay, Direction::Reverse, 0).unwrap();
        assert_eq!(levels(&pins), FULL_STEP[3]);
        stepper.step_once(&mut delay, Direction::Reverse, 0).unwrap();
        assert_eq!(levels(&pins), FULL_STEP[2]);
        assert_eq!(stepper.position(), -2);
    }

    #[test]
    fn test_step_releases_and_waits() {
        let (mut stepper, pins) = fake_stepper(StepMode::Half);
        let delay = CountingDelay::default();

        stepper.step(&mut delay.clone(), 10, Direction::Forward, 5_000).unwrap();

        assert_eq!(levels(&pins), [false; 4]);
        assert_eq!(stepper.position(), 10);
        assert_eq!(delay.total_ns.get(), 10 * 5_000 * 1_000);
    }

    #[test]
    fn test_broken_pin_is_reported() {
        let result = Stepper::new(StepMode::Half, [BrokenPin, BrokenPin, BrokenPin, BrokenPin]);
        assert!(matches!(result, Err(StepperError::Pin(BrokenPinError))));
    }

    #[test]
    fn test_interleave_alternates_until_budgets_spent() {
        let (mut left, _) = fake_stepper(StepMode::Half);
        let (mut right, _) = fake_stepper(StepMode::Half);
        let delay = CountingDelay::default();

        {
            let mut commands = [
                StepCommand::new(&mut left, 6, Direction::Forward),
                StepCommand::new(&mut right, 3, Direction::Reverse),
            ];
            interleave(&mut commands, &mut delay.clone(), 1).unwrap();
            assert!(commands.iter().all(|c| c.phases == 0));
        }

        assert_eq!(left.position(), 6);
        assert_eq!(right.position(), -3);
        // One delay per emitted phase.
        assert_eq!(delay.total_ns.get(), 9 * 1_000);
    }

    #[test]
    fn test_interleave_order_is_round_robin() {
        struct SnapshotDelay {
            a: [FakePin; 4],
            b: [FakePin; 4],
            snapshots: Vec<([bool; 4], [bool; 4])>,
        }

        impl DelayNs for SnapshotDelay {
            fn delay_ns(&mut self, _ns: u32) {
                self.snapshots.push((levels(&self.a), levels(&self.b)));
            }
        }

        let (mut a, a_pins) = fake_stepper(StepMode::Full);
        let (mut b, b_pins) = fake_stepper(StepMode::Full);
        let mut delay = SnapshotDelay {
            a: a_pins,
            b: b_pins,
            snapshots: Vec::new(),
        };

        let mut commands = [
            StepCommand::new(&mut a, 2, Direction::Forward),
            StepCommand::new(&mut b, 2, Direction::Forward),
        ];
        interleave(&mut commands, &mut delay, 0).unwrap();

        assert_eq!(
            delay.snapshots,
            vec![
                (FULL_STEP[1], [false; 4]),
                (FULL_STEP[1], FULL_STEP[1]),
                (FULL_STEP[2], FULL_STEP[1]),
                (FULL_STEP[2], FULL_STEP[2]),
            ]
        );
    }
}
