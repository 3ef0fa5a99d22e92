//! TM4C123 backend for the lockstep HAL
//!
//! Register-level drivers for the TM4C123GH6PM peripherals the node
//! uses: the clock tree, one-shot delay timer (TIMER0), free-running
//! tick counter (WTIMER0), temperature sample sequencer (ADC0 SS0),
//! EEPROM block, the two UARTs (host and board link), and port F GPIO
//! (user switch, status LEDs).
//!
//! Each driver is generic over a small register-ops trait with exactly
//! one hardware implementation; tests substitute simulated registers so
//! the driver logic (arming rules, enabled-state checks, bounded polls)
//! runs on the host. Hardware implementations poke fixed peripheral
//! addresses with volatile accesses and are handed out exactly once by
//! [`bringup::init`].

#![no_std]

#[cfg(test)]
extern crate std;

pub mod adc;
pub mod bringup;
pub mod eeprom;
pub mod gpio;
pub mod sysctl;
pub mod timer;
pub mod uart;

mod mmio;

pub use bringup::{init, BringupError, Node};
pub use sysctl::{Peripheral, SYSTEM_CLOCK_HZ};
