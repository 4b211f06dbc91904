//! Ambient light sensor behind a switched supply
//!
//! The sensor is only powered while it is being read. A repeating chain
//! powers it up, waits for it to settle, then samples; the driver classifies
//! each sample as dark or bright with hysteresis so the blind does not chatter
//! around a single threshold.

use core::marker::PhantomData;

use embedded_hal::adc::{Channel, OneShot};
use embedded_hal::digital::v2::OutputPin;

use crate::config::{LIGHT_BRIGHT_ABOVE, LIGHT_DARK_BELOW};
use crate::hal::timer::CompareTimer;
use crate::rtos::{Enqueued, Rejected, Scheduler, TaskId};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LightLevel {
    Dark,
    Bright,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Reading {
    pub raw: u16,
    pub level: LightLevel,
    /// The level differs from the previous reading's.
    pub changed: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Error<A, P> {
    Adc(A),
    Pin(P),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Thresholds {
    pub dark_below: u16,
    pub bright_above: u16,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            dark_below: LIGHT_DARK_BELOW,
            bright_above: LIGHT_BRIGHT_ABOVE,
        }
    }
}

pub struct AmbientLight<ADC, A, CH, EN> {
    adc: A,
    channel: CH,
    enable: EN,
    power: TaskId,
    sample: TaskId,
    thresholds: Thresholds,
    level: Option<LightLevel>,
    _adc: PhantomData<ADC>,
}

impl<ADC, A, CH, EN> AmbientLight<ADC, A, CH, EN>
where
    A: OneShot<ADC, u16, CH>,
    CH: Channel<ADC>,
    EN: OutputPin,
{
    /// `power` must start a chain whose next step is `sample`.
    pub fn new(adc: A, channel: CH, enable: EN, power: TaskId, sample: TaskId) -> Self {
        Self {
            adc,
            channel,
            enable,
            power,
            sample,
            thresholds: Thresholds::default(),
            level: None,
            _adc: PhantomData,
        }
    }

    pub fn with_thresholds(mut self, thresholds: Thresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// Last classified level, `None` before the first sample.
    pub fn level(&self) -> Option<LightLevel> {
        self.level
    }

    /// Arm the polling chain. Meant to run once at startup.
    pub fn start<T, const S: usize, const G: usize>(
        &mut self,
        sched: &mut Scheduler<'_, T, S, G>,
    ) -> Result<Enqueued, Rejected>
    where
        T: CompareTimer,
    {
        sched.enqueue(self.power)
    }

    pub fn poll<T, const S: usize, const G: usize>(
        &mut self,
        sched: &Scheduler<'_, T, S, G>,
    ) -> Result<Option<Reading>, Error<A::Error, EN::Error>>
    where
        T: CompareTimer,
    {
        if sched.take_fired(self.power) {
            self.enable.set_high().map_err(Error::Pin)?;
        }
        if !sched.take_fired(self.sample) {
            return Ok(None);
        }

        let sampled = nb::block!(self.adc.read(&mut self.channel)).map_err(Error::Adc);
        // Power down even when the conversion failed
        self.enable.set_low().map_err(Error::Pin)?;
        let raw = sampled?;

        let level = self.classify(raw);
        let changed = self.level.map_or(false, |previous| previous != level);
        self.level = Some(level);
        Ok(Some(Reading { raw, level, changed }))
    }

    fn classify(&self, raw: u16) -> LightLevel {
        match self.level {
            Some(LightLevel::Dark) if raw < self.thresholds.bright_above => LightLevel::Dark,
            Some(LightLevel::Bright) if raw > self.thresholds.dark_below => LightLevel::Bright,
            _ if raw <= self.thresholds.dark_below => LightLevel::Dark,
            _ if raw >= self.thresholds.bright_above => LightLevel::Bright,
            // First reading inside the band
            _ => LightLevel::Bright,
        }
    }

    pub fn release(self) -> (A, CH, EN) {
        (self.adc, self.channel, self.enable)
    }
}
