//! HC-SR04 ultrasonic range finder.
//!
//! A 10 µs trigger pulse starts a burst; the echo pin then stays high for as long as the
//! sound took to travel to the target and back.

use core::fmt;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};

use crate::traits::clock::MicrosClock;
use crate::traits::ranging::{DistanceUnit, RangingDevice};

/// Longest wait for each echo edge before the ping counts as lost.
pub const ECHO_TIMEOUT_US: u64 = 30_000;

/// Sensor's rated maximum range. Longer echoes are reported as no echo.
pub const MAX_RANGE_CM: f32 = 400.0;

/// Speed of sound at room temperature, 343 m/s.
pub const SOUND_CM_PER_US: f32 = 0.0343;

const CM_PER_INCH: f32 = 2.54;

#[derive(Debug, Clone, PartialEq)]
pub enum Hcsr04Error<TE, EE> {
    Trigger(TE),
    Echo(EE),
}

impl<TE: fmt::Debug, EE: fmt::Debug> fmt::Display for Hcsr04Error<TE, EE> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Hcsr04Error::Trigger(e) => write!(f, "HC-SR04 trigger pin error: {:?}", e),
            Hcsr04Error::Echo(e) => write!(f, "HC-SR04 echo pin error: {:?}", e),
        }
    }
}

/// Converts an echo pulse width to `unit`.
pub fn echo_to_unit(echo_us: u64, unit: DistanceUnit) -> f32 {
    let centimeters = echo_us as f32 * SOUND_CM_PER_US / 2.0;
    match unit {
        DistanceUnit::Centimeters => centimeters,
        DistanceUnit::Inches => centimeters / CM_PER_INCH,
        DistanceUnit::MicroSeconds => echo_us as f32,
    }
}

pub struct Hcsr04<T, E, C, D> {
    trigger: T,
    echo: E,
    clock: C,
    delay: D,
}

impl<T, E, C, D> Hcsr04<T, E, C, D>
where
    T: OutputPin,
    E: InputPin,
    C: MicrosClock,
    D: DelayNs,
{
    pub fn new(trigger: T, echo: E, clock: C, delay: D) -> Self {
        Hcsr04 {
            trigger,
            echo,
            clock,
            delay,
        }
    }

    /// Fires one burst and returns the echo pulse width in microseconds.
    ///
    /// Busy-waits on the echo pin. Returns `Ok(None)` when either edge misses
    /// [`ECHO_TIMEOUT_US`].
    pub fn measure_echo_us(&mut self) -> Result<Option<u64>, Hcsr04Error<T::Error, E::Error>> {
        self.trigger.set_low().map_err(Hcsr04Error::Trigger)?;
        self.delay.delay_us(2);
        self.trigger.set_high().map_err(Hcsr04Error::Trigger)?;
        self.delay.delay_us(10);
        self.trigger.set_low().map_err(Hcsr04Error::Trigger)?;

        let start = self.clock.now_us();
        while !self.echo.is_high().map_err(Hcsr04Error::Echo)? {
            if self.clock.now_us().saturating_sub(start) > ECHO_TIMEOUT_US {
                return Ok(None);
            }
        }

        let rise = self.clock.now_us();
        while !self.echo.is_low().map_err(Hcsr04Error::Echo)? {
            if self.clock.now_us().saturating_sub(rise) > ECHO_TIMEOUT_US {
                return Ok(None);
            }
        }

        let fall = self.clock.now_us();
        Ok(Some(fall.saturating_sub(rise)))
    }

    pub fn release(self) -> (T, E, C, D) {
        (self.trigger, self.echo, self.clock, self.delay)
    }
}

impl<T, E, C, D> RangingDevice for Hcsr04<T, E, C, D>
where
    T: OutputPin,
    E: InputPin,
    C: MicrosClock,
    D: DelayNs,
{
    type Error = Hcsr04Error<T::Error, E::Error>;

    fn ping(&mut self, unit: DistanceUnit) -> Result<Option<f32>, Self::Error> {
        let Some(echo_us) = self.measure_echo_us()? else {
            return Ok(None);
        };
        if echo_to_unit(echo_us, DistanceUnit::Centimeters) > MAX_RANGE_CM {
            return Ok(None);
        }
        Ok(Some(echo_to_unit(echo_us, unit)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::stepper::tests::{CountingDelay, FakePin};
    use core::convert::Infallible;
    use embedded_hal::digital::ErrorType;
    use std::cell::Cell;
    use std::rc::Rc;

    /// Clock that advances one microsecond per read.
    #[derive(Clone, Default)]
    struct TickingClock {
        now: Rc<Cell<u64>>,
    }

    impl MicrosClock for TickingClock {
        fn now_us(&mut self) -> u64 {
            let t = self.now.get();
            self.now.set(t + 1);
            t
        }
    }

    /// Echo pin that is high between two instants of the shared clock.
    struct EchoWindow {
        now: Rc<Cell<u64>>,
        rise_at: u64,
        fall_at: u64,
    }

    impl ErrorType for EchoWindow {
        type Error = Infallible;
    }

    impl InputPin for EchoWindow {
        fn is_high(&mut self) -> Result<bool, Self::Error> {
            let t = self.now.get();
            Ok(t >= self.rise_at && t < self.fall_at)
        }

        fn is_low(&mut self) -> Result<bool, Self::Error> {
            Ok(!self.is_high()?)
        }
    }

    fn sensor(
        rise_at: u64,
        pulse_us: u64,
    ) -> Hcsr04<FakePin, EchoWindow, TickingClock, CountingDelay> {
        let clock = TickingClock::default();
        let echo = EchoWindow {
            now: clock.now.clone(),
            rise_at,
            fall_at: rise_at + pulse_us,
        };
        Hcsr04::new(FakePin::default(), echo, clock, CountingDelay::default())
    }

    #[test]
    fn test_echo_pulse_width_is_measured() {
        let mut sonar = sensor(100, 583);
        assert_eq!(sonar.measure_echo_us().unwrap(), Some(583));
    }

    #[test]
    fn test_ping_in_centimeters() {
        // 583 us * 0.0343 / 2 = 9.998 cm
        let mut sonar = sensor(100, 583);
        let cm = sonar.ping(DistanceUnit::Centimeters).unwrap().unwrap();
        assert!((cm - 10.0).abs() < 0.01);
    }

    #[test]
    fn test_unit_conversions() {
        assert!((echo_to_unit(1_481, DistanceUnit::Inches) - 10.0).abs() < 0.01);
        assert_eq!(echo_to_unit(1_481, DistanceUnit::MicroSeconds), 1_481.0);
    }

    #[test]
    fn test_missing_echo_times_out() {
        let mut sonar = sensor(u64::MAX - 1, 1);
        assert_eq!(sonar.ping(DistanceUnit::Centimeters).unwrap(), None);
    }

    #[test]
    fn test_stuck_echo_times_out() {
        let mut sonar = sensor(10, u64::MAX / 2);
        assert_eq!(sonar.measure_echo_us().unwrap(), None);
    }

    #[test]
    fn test_beyond_rated_range_is_no_echo() {
        // 25_000 us is about 429 cm.
        let mut sonar = sensor(10, 25_000);
        assert_eq!(sonar.ping(DistanceUnit::Centimeters).unwrap(), None);
    }

    #[test]
    fn test_trigger_pulse_is_issued() {
        let sonar = sensor(10, 100);
        let (trigger, _, _, delay) = {
            let mut sonar = sonar;
            sonar.measure_echo_us().unwrap();
            sonar.release()
        };
        assert!(!trigger.level.get());
        assert_eq!(delay.total_ns.get(), 12_000);
    }
}
