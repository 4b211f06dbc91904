//! Host-side fixtures shared by the unit tests

use core::cell::Cell;
use core::convert::Infallible;

use crate::hal::timer::CompareTimer;

/// Software stand-in for Timer1: the test moves the counter by hand and
/// inspects what the scheduler programmed.
#[derive(Debug)]
pub struct MockTimer {
    period: u32,
    count: Cell<u16>,
    /// Ticks the counter moves on after every `now()` read
    drift: u16,
    compare: Option<u16>,
    enabled: bool,
    /// Incremented on every disable, so tests can check the masking discipline
    pub masks: u32,
}

impl MockTimer {
    pub fn new(period: u32) -> Self {
        assert!(period > 0 && period <= 1 << 16);
        Self {
            period,
            count: Cell::new(0),
            drift: 0,
            compare: None,
            enabled: false,
            masks: 0,
        }
    }

    pub fn set_count(&mut self, count: u16) {
        assert!(u32::from(count) < self.period);
        self.count.set(count);
    }

    /// Make the counter run while the scheduler works, as the real one does.
    pub fn set_drift(&mut self, ticks: u16) {
        self.drift = ticks;
    }

    /// Advance the counter, wrapping at the period.
    pub fn tick(&mut self, ticks: u32) {
        let count = (u32::from(self.count.get()) + ticks) % self.period;
        self.count.set(count as u16);
    }

    pub fn compare(&self) -> Option<u16> {
        self.compare
    }
}

impl CompareTimer for MockTimer {
    fn period(&self) -> u32 {
        self.period
    }

    fn now(&self) -> u16 {
        let count = self.count.get();
        let next = (u32::from(count) + u32::from(self.drift)) % self.period;
        self.count.set(next as u16);
        count
    }

    fn set_compare(&mut self, at: u16) {
        assert!(u32::from(at) < self.period);
        self.compare = Some(at);
    }

    fn enable_compare(&mut self) {
        self.enabled = true;
    }

    fn disable_compare(&mut self) {
        self.enabled = false;
        self.masks += 1;
    }

    fn compare_enabled(&self) -> bool {
        self.enabled
    }
}

/// Fixed-capacity `uWrite` sink for checking log output.
pub struct LogBuffer {
    buf: [u8; 512],
    len: usize,
}

impl LogBuffer {
    pub fn new() -> Self {
        Self {
            buf: [0; 512],
            len: 0,
        }
    }

    pub fn as_str(&self) -> &str {
        core::str::from_utf8(&self.buf[..self.len]).unwrap()
    }
}

impl ufmt::uWrite for LogBuffer {
    type Error = Infallible;

    fn write_str(&mut self, s: &str) -> Result<(), Infallible> {
        let take = s.len().min(self.buf.len() - self.len);
        self.buf[self.len..self.len + take].copy_from_slice(&s.as_bytes()[..take]);
        self.len += take;
        Ok(())
    }
}
