pub mod button_handler;
pub mod cadence;
pub mod light_sensor;
#[cfg(target_arch = "avr")]
pub mod serial_console;

pub use button_handler::{ButtonEvent, ButtonHandler};
pub use cadence::Cadence;
pub use light_sensor::{AmbientLight, LightLevel, Reading, Thresholds};
#[cfg(target_arch = "avr")]
pub use serial_console::SerialConsole;
