//! Board-agnostic core logic for the lockstep node
//!
//! Everything here runs unchanged on the host and on the target:
//!
//! - System clock reference and microsecond/cycle conversions
//! - Bounded busy-poll helper
//! - Boot-seed entropy folding

#![no_std]
#![deny(unsafe_code)]

#[cfg(test)]
extern crate std;

pub mod entropy;
pub mod poll;
pub mod timebase;
