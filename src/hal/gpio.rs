use avr_device::atmega128::{PORTA, PORTB, PORTD, PORTE};
use core::convert::Infallible;
use core::marker::PhantomData;
use embedded_hal::digital::v2::{InputPin, OutputPin};

pub struct Input;
pub struct Output;
pub struct Unconfigured;

pub struct Pin<PORT, const PIN: u8, MODE> {
    _port: PhantomData<PORT>,
    _mode: PhantomData<MODE>,
}

impl<PORT, const P: u8> Pin<PORT, P, Unconfigured> {
    /// Each board pin must be taken exactly once.
    pub const fn new() -> Self {
        Pin {
            _port: PhantomData,
            _mode: PhantomData,
        }
    }
}

macro_rules! impl_port {
    ($PORT:ident, $port:ident, $ddr:ident, $pin:ident) => {
        impl<const P: u8, MODE> Pin<$PORT, P, MODE> {
            pub fn into_output(self) -> Pin<$PORT, P, Output> {
                unsafe {
                    let p = $PORT::ptr();
                    (*p).$port.modify(|r, w| w.bits(r.bits() & !(1 << P)));
                    (*p).$ddr.modify(|r, w| w.bits(r.bits() | (1 << P)));
                }
                Pin {
                    _port: PhantomData,
                    _mode: PhantomData,
                }
            }

            /// Input with the internal pull-up, for switches to ground.
            pub fn into_pull_up_input(self) -> Pin<$PORT, P, Input> {
                unsafe {
                    let p = $PORT::ptr();
                    (*p).$ddr.modify(|r, w| w.bits(r.bits() & !(1 << P)));
                    (*p).$port.modify(|r, w| w.bits(r.bits() | (1 << P)));
                }
                Pin {
                    _port: PhantomData,
                    _mode: PhantomData,
                }
            }
        }

        impl<const P: u8> OutputPin for Pin<$PORT, P, Output> {
            type Error = Infallible;

            #[inline]
            fn set_high(&mut self) -> Result<(), Infallible> {
                unsafe {
                    (*$PORT::ptr()).$port.modify(|r, w| w.bits(r.bits() | (1 << P)));
                }
                Ok(())
            }

            #[inline]
            fn set_low(&mut self) -> Result<(), Infallible> {
                unsafe {
                    (*$PORT::ptr()).$port.modify(|r, w| w.bits(r.bits() & !(1 << P)));
                }
                Ok(())
            }
        }

        impl<const P: u8> InputPin for Pin<$PORT, P, Input> {
            type Error = Infallible;

            #[inline]
            fn is_high(&self) -> Result<bool, Infallible> {
                Ok(unsafe { (*$PORT::ptr()).$pin.read().bits() } & (1 << P) != 0)
            }

            #[inline]
            fn is_low(&self) -> Result<bool, Infallible> {
                self.is_high().map(|high| !high)
            }
        }
    };
}

impl_port!(PORTA, porta, ddra, pina);
impl_port!(PORTB, portb, ddrb, pinb);
impl_port!(PORTD, portd, ddrd, pind);
impl_port!(PORTE, porte, ddre, pine);

// Blind controller board wiring
pub mod board {
    use super::*;

    // Up/down buttons to ground (PORTB)
    pub type BtnUp = Pin<PORTB, 0, Unconfigured>;
    pub type BtnDown = Pin<PORTB, 1, Unconfigured>;

    // Status LED and piezo buzzer (PORTA)
    pub type Led = Pin<PORTA, 0, Unconfigured>;
    pub type Buzzer = Pin<PORTA, 1, Unconfigured>;

    // Light sensor supply switch (PORTA), sensor output on ADC0
    pub type LightEnable = Pin<PORTA, 2, Unconfigured>;
    pub const LIGHT_ADC_CHANNEL: u8 = 0;
}
