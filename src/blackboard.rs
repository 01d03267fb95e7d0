use parking_lot::RwLock;
use std::{sync::Arc, time::Instant};

use crate::control::{CycleOutcome, DistanceReading};
use crate::error::ControlError;

/// Running counters of the drive loop, shared between the control thread and reporters.
#[derive(Debug, Clone)]
pub struct DriveStats {
    pub cycles: u64,
    pub idle: u64,
    pub forward: u64,
    pub stopped: u64,
    pub turned: u64,
    pub no_echo: u64,
    pub errors: u64,
    pub last_reading: Option<DistanceReading>,
    pub last_error: Option<String>,
    pub last_cycle_ts: Instant,
}

impl Default for DriveStats {
    fn default() -> Self {
        DriveStats {
            cycles: 0,
            idle: 0,
            forward: 0,
            stopped: 0,
            turned: 0,
            no_echo: 0,
            errors: 0,
            last_reading: None,
            last_error: None,
            last_cycle_ts: Instant::now(),
        }
    }
}

impl DriveStats {
    /// Cycles in which the trigger was held.
    pub fn active(&self) -> u64 {
        self.forward + self.stopped + self.turned
    }
}

pub type Blackboard = Arc<RwLock<DriveStats>>;

pub fn snapshot(bb: &Blackboard) -> DriveStats {
    (*bb.read()).clone()
}

pub fn record(bb: &Blackboard, result: &Result<CycleOutcome, ControlError>) {
    let mut g = bb.write();
    g.cycles += 1;
    g.last_cycle_ts = Instant::now();

    let outcome = match result {
        Ok(outcome) => outcome,
        Err(e) => {
            g.errors += 1;
            g.last_error = Some(e.to_string());
            return;
        }
    };
    match outcome {
        CycleOutcome::Idle => g.idle += 1,
        CycleOutcome::Forward { .. } => g.forward += 1,
        CycleOutcome::Stopped { .. } => g.stopped += 1,
        CycleOutcome::TurnedThenForward { .. } => g.turned += 1,
    }
    if let Some(reading) = outcome.reading() {
        if reading == DistanceReading::NoEcho {
            g.no_echo += 1;
        }
        g.last_reading = Some(reading);
    }
}
