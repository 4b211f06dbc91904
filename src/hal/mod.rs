pub mod timer;
#[cfg(target_arch = "avr")]
pub mod adc;
#[cfg(target_arch = "avr")]
pub mod gpio;
#[cfg(target_arch = "avr")]
pub mod uart;

// Re-export commonly used types
pub use timer::CompareTimer;
#[cfg(target_arch = "avr")]
pub use adc::{Adc, AdcPin};
#[cfg(target_arch = "avr")]
pub use gpio::{board, Input, Output, Pin};
#[cfg(target_arch = "avr")]
pub use timer::{Prescaler, Timer1};
#[cfg(target_arch = "avr")]
pub use uart::Uart;
