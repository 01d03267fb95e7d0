/// Free-running microsecond counter used to time echo pulses.
pub trait MicrosClock {
    /// Microseconds elapsed since an arbitrary fixed origin.
    fn now_us(&mut self) -> u64;
}
