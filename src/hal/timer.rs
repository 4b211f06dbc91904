//! Hardware timer used by the task scheduler

/// A free-running counter with one compare channel and its interrupt.
///
/// The counter counts `0..period()` and wraps. The scheduler owns the compare
/// value and the interrupt enable; nothing else may touch them.
pub trait CompareTimer {
    /// Counter modulus, at most 65536.
    fn period(&self) -> u32;

    /// Current counter value, always below `period()`.
    fn now(&self) -> u16;

    /// Program the compare register and discard any match already pending.
    fn set_compare(&mut self, at: u16);

    fn enable_compare(&mut self);

    fn disable_compare(&mut self);

    fn compare_enabled(&self) -> bool;
}

#[cfg(target_arch = "avr")]
pub use self::avr::{Prescaler, Timer1};

#[cfg(target_arch = "avr")]
mod avr {
    use super::CompareTimer;
    use avr_device::atmega128::{TC0, TC1};

    // TIMSK / TIFR are shared by all timers; Timer1 compare A sits on bit 4
    const OCIE1A: u8 = 1 << 4;
    const OCF1A: u8 = 1 << 4;
    const PRESCALER_MASK: u8 = 0x07;

    #[derive(Clone, Copy)]
    pub enum Prescaler {
        Stop = 0,
        Direct = 1,
        Div8 = 2,
        Div64 = 3,
        Div256 = 4,
        Div1024 = 5,
    }

    /// Timer/Counter1 in normal mode, compare channel A.
    pub struct Timer1 {
        _private: (),
    }

    impl Timer1 {
        pub fn new(prescaler: Prescaler) -> Self {
            unsafe {
                let p = TC1::ptr();
                // Normal mode, outputs disconnected
                (*p).tccr1a.write(|w| w.bits(0));
                (*p).tccr1b.write(|w| w.bits(prescaler as u8 & PRESCALER_MASK));
                (*p).tcnt1.write(|w| w.bits(0));
            }
            let mut timer = Self { _private: () };
            timer.disable_compare();
            timer
        }
    }

    impl CompareTimer for Timer1 {
        fn period(&self) -> u32 {
            crate::config::TIMER_PERIOD
        }

        fn now(&self) -> u16 {
            unsafe { (*TC1::ptr()).tcnt1.read().bits() }
        }

        fn set_compare(&mut self, at: u16) {
            unsafe {
                (*TC1::ptr()).ocr1a.write(|w| w.bits(at));
                // Writing a one clears the flag
                (*TC0::ptr()).tifr.write(|w| w.bits(OCF1A));
            }
        }

        fn enable_compare(&mut self) {
            unsafe {
                (*TC0::ptr()).timsk.modify(|r, w| w.bits(r.bits() | OCIE1A));
            }
        }

        fn disable_compare(&mut self) {
            unsafe {
                (*TC0::ptr()).timsk.modify(|r, w| w.bits(r.bits() & !OCIE1A));
            }
        }

        fn compare_enabled(&self) -> bool {
            unsafe { (*TC0::ptr()).timsk.read().bits() & OCIE1A != 0 }
        }
    }
}
