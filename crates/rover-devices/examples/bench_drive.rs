//! Runs the real drivers on a bench of simulated pins.
//!
//! The car drives toward a wall until the HC-SR04 reads it as near, turns both steppers
//! away, and carries on. Virtual time advances through the shared delay and clock.

use std::cell::Cell;
use std::convert::Infallible;
use std::rc::Rc;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorType, InputPin, OutputPin};
use rover_devices::devices::hcsr04::SOUND_CM_PER_US;
use rover_devices::{
    ButtonId, ButtonInput, ButtonPad, DistanceUnit, DriveTrain, Hcsr04, MicrosClock,
    RangingDevice, StepMode, Stepper, StepperCar, StepperId, Turn,
};
use rover_kinematics::StepperGeometry;

const THRESHOLD_CM: f32 = 10.0;
const LEG_CM: f64 = 10.0;
const SPEED: u32 = 200;
const CYCLES: u32 = 8;

/// Shared state of the bench: virtual clock, distance to the wall and the pending echo.
#[derive(Clone, Default)]
struct Bench {
    now_us: Rc<Cell<u64>>,
    wall_cm: Rc<Cell<f32>>,
    echo_window: Rc<Cell<(u64, u64)>>,
}

struct CoilPin;

impl ErrorType for CoilPin {
    type Error = Infallible;
}

impl OutputPin for CoilPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Trigger line; its falling edge schedules the echo for the current wall distance.
struct TriggerPin {
    bench: Bench,
    high: bool,
}

impl ErrorType for TriggerPin {
    type Error = Infallible;
}

impl OutputPin for TriggerPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        if self.high {
            let rise = self.bench.now_us.get() + 200;
            let pulse = (self.bench.wall_cm.get() * 2.0 / SOUND_CM_PER_US).round() as u64;
            self.bench.echo_window.set((rise, rise + pulse));
        }
        self.high = false;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.high = true;
        Ok(())
    }
}

struct EchoPin {
    bench: Bench,
}

impl ErrorType for EchoPin {
    type Error = Infallible;
}

impl InputPin for EchoPin {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        let (rise, fall) = self.bench.echo_window.get();
        let now = self.bench.now_us.get();
        Ok(now >= rise && now < fall)
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.is_high()?)
    }
}

/// Each read advances virtual time by a microsecond, like a busy-wait would.
struct BenchClock {
    bench: Bench,
}

impl MicrosClock for BenchClock {
    fn now_us(&mut self) -> u64 {
        let t = self.bench.now_us.get();
        self.bench.now_us.set(t + 1);
        t
    }
}

struct BenchDelay {
    bench: Bench,
}

impl DelayNs for BenchDelay {
    fn delay_ns(&mut self, ns: u32) {
        let now = self.bench.now_us.get();
        self.bench.now_us.set(now + u64::from(ns).div_ceil(1_000));
    }
}

/// Push-button wired active-low.
struct Button {
    pressed: bool,
}

impl ErrorType for Button {
    type Error = Infallible;
}

impl InputPin for Button {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.pressed)
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(self.pressed)
    }
}

fn coils() -> [CoilPin; 4] {
    [CoilPin, CoilPin, CoilPin, CoilPin]
}

fn run(bench: &Bench) -> Result<(), String> {
    let geometry = StepperGeometry::default();
    let m1 = Stepper::new(StepMode::Half, coils()).map_err(|e| e.to_string())?;
    let m2 = Stepper::new(StepMode::Half, coils()).map_err(|e| e.to_string())?;
    let mut car = StepperCar::new(m1, m2, BenchDelay { bench: bench.clone() }, geometry);
    let mut sonar = Hcsr04::new(
        TriggerPin {
            bench: bench.clone(),
            high: false,
        },
        EchoPin {
            bench: bench.clone(),
        },
        BenchClock {
            bench: bench.clone(),
        },
        BenchDelay {
            bench: bench.clone(),
        },
    );
    let mut buttons = ButtonPad::new(Button { pressed: true }, Button { pressed: false });

    println!("Geometry: {}", geometry);
    for cycle in 1..=CYCLES {
        if !buttons.is_pressed(ButtonId::A).map_err(|e| format!("{:?}", e))? {
            continue;
        }
        let reading = sonar
            .ping(DistanceUnit::Centimeters)
            .map_err(|e| e.to_string())?;
        let distance = reading.unwrap_or(0.0);

        if distance >= THRESHOLD_CM {
            car.move_forward(SPEED, LEG_CM).map_err(|e| e.to_string())?;
            bench.wall_cm.set((bench.wall_cm.get() - LEG_CM as f32).max(0.0));
            println!("Cycle {:>2}: {:>6.1} cm -> forward", cycle, distance);
        } else {
            car.turn_stepper(StepperId::M1, Turn::Quarter)
                .map_err(|e| e.to_string())?;
            car.turn_stepper(StepperId::M2, Turn::Quarter)
                .map_err(|e| e.to_string())?;
            car.move_forward(SPEED, LEG_CM).map_err(|e| e.to_string())?;
            // Facing open floor after the turn.
            bench.wall_cm.set(80.0 - LEG_CM as f32);
            println!("Cycle {:>2}: {:>6.1} cm -> turn, forward", cycle, distance);
        }
        println!("          phase counters (M1, M2): {:?}", car.positions());
    }

    car.stop().map_err(|e| e.to_string())?;
    println!(
        "Stopped after {:.2} s of virtual time.",
        bench.now_us.get() as f64 / 1e6
    );
    Ok(())
}

fn main() {
    let bench = Bench::default();
    bench.wall_cm.set(42.0);

    if let Err(e) = run(&bench) {
        eprintln!("Bench run failed: {}", e);
    }
}
