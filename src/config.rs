//! Configuration constants for the blind controller firmware

use crate::logger::Level;

/// CPU frequency in Hz
pub const CPU_FREQ_HZ: u32 = 16_000_000;

/// UART baud rate
pub const UART_BAUD: u32 = 9600;

/// Timer1 prescaler (clk/1024)
pub const TIMER_PRESCALER: u32 = 1024;

/// Timer1 tick rate, 15625 Hz at 16 MHz
pub const TIMER_TICK_HZ: u32 = CPU_FREQ_HZ / TIMER_PRESCALER;

/// Timer1 is 16 bits wide and runs in normal mode
pub const TIMER_PERIOD: u32 = 1 << 16;

/// Number of scheduler slots (simultaneously pending chains)
pub const SLOT_COUNT: usize = 6;

/// Number of consumer groups with their own flag word
pub const GROUP_COUNT: usize = 3;

/// Button debounce window in milliseconds
pub const BUTTON_DEBOUNCE_MS: u16 = 30;

/// A press held this long is a hold instead of a click
pub const BUTTON_HOLD_MS: u16 = 800;

/// LED blink half period in milliseconds
pub const BLINK_MS: u16 = 250;

/// Buzzer beep length in milliseconds
pub const BEEP_MS: u16 = 80;

/// Ambient light sensor poll interval in milliseconds
pub const LIGHT_POLL_MS: u16 = 2000;

/// Sensor settle time between power-up and sampling
pub const LIGHT_WARMUP_MS: u16 = 20;

/// Raw ADC reading at or below which the room counts as dark
pub const LIGHT_DARK_BELOW: u16 = 180;

/// Raw ADC reading at or above which the room counts as bright again
pub const LIGHT_BRIGHT_ABOVE: u16 = 260;

/// Maximum level written to the serial console
pub const LOG_LEVEL: Level = if cfg!(feature = "debug") {
    Level::Debug
} else {
    Level::Info
};

/// Convert milliseconds to Timer1 ticks.
///
/// Saturates at the largest delay the 16-bit counter can express.
pub const fn ms_to_ticks(ms: u16) -> u16 {
    let ticks = (ms as u32 * TIMER_TICK_HZ) / 1000;
    if ticks >= TIMER_PERIOD {
        (TIMER_PERIOD - 1) as u16
    } else {
        ticks as u16
    }
}
