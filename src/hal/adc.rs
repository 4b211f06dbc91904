use avr_device::atmega128::ADC;
use core::convert::Infallible;
use embedded_hal::adc::{Channel, OneShot};

const ADEN: u8 = 1 << 7;
const ADSC: u8 = 1 << 6;
// clk/128: 125 kHz conversion clock at 16 MHz
const PRESCALER_DIV128: u8 = 0x07;
// AVCC reference
const REFS_AVCC: u8 = 0x40;

/// Single-ended input `CH` (0..=7).
pub struct AdcPin<const CH: u8>;

impl<const CH: u8> Channel<Adc> for AdcPin<CH> {
    type ID = u8;

    fn channel() -> u8 {
        CH
    }
}

pub struct Adc {
    converting: bool,
}

impl Adc {
    pub fn new() -> Self {
        unsafe {
            let p = ADC::ptr();
            (*p).adcsra.write(|w| w.bits(ADEN | PRESCALER_DIV128));
            (*p).admux.write(|w| w.bits(REFS_AVCC));
        }
        Self { converting: false }
    }
}

impl Default for Adc {
    fn default() -> Self {
        Self::new()
    }
}

impl<const CH: u8> OneShot<Adc, u16, AdcPin<CH>> for Adc {
    type Error = Infallible;

    fn read(&mut self, _pin: &mut AdcPin<CH>) -> nb::Result<u16, Infallible> {
        unsafe {
            let p = ADC::ptr();
            if !self.converting {
                (*p).admux.write(|w| w.bits(REFS_AVCC | (CH & 0x07)));
                (*p).adcsra.modify(|r, w| w.bits(r.bits() | ADSC));
                self.converting = true;
                return Err(nb::Error::WouldBlock);
            }
            if (*p).adcsra.read().bits() & ADSC != 0 {
                return Err(nb::Error::WouldBlock);
            }

            self.converting = false;
            // ADCL must be read first
            let low = (*p).adcl.read().bits() as u16;
            let high = (*p).adch.read().bits() as u16;
            Ok((high << 8) | low)
        }
    }
}
