//! Firmware for a motorized blind controller on the ATmega128
//!
//! Buttons, the status LED, the buzzer and the ambient light sensor all time
//! their work through one scheduler multiplexed onto Timer1's compare channel.
#![cfg_attr(not(test), no_std)]

pub mod config;
pub mod drivers;
pub mod hal;
#[macro_use]
pub mod logger;
pub mod rtos;
pub mod tasks;
#[cfg(test)]
pub(crate) mod testing;
