//! Lockstep Hardware Abstraction Layer
//!
//! This crate defines the hardware abstraction traits consumed by the
//! protocol layer of a lockstep node. Chip-specific backends implement
//! them against real registers; tests implement them against simulated
//! hardware.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  Protocol layer (out of scope here)     │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  lockstep-hal (this crate - traits)     │
//! └─────────────────────────────────────────┘
//!                     │
//!         ┌───────────┴───────────┐
//!         ▼                       ▼
//! ┌───────────────┐       ┌───────────────┐
//! │ lockstep-hal- │       │ test doubles  │
//! │   tm4c123     │       │ (sim regs)    │
//! └───────────────┘       └───────────────┘
//! ```
//!
//! # Traits
//!
//! - [`timer::DelayTimer`] - one-shot microsecond countdown
//! - [`timer::TickCounter`] - free-running 64-bit tick source
//! - [`adc::EntropySampler`] - batched noisy temperature readings
//! - [`uart::SerialLink`] - byte-level serial channel
//! - [`storage::WordStorage`] - word-addressed persistent storage
//! - [`gpio::InputPin`], [`gpio::OutputPin`] - digital I/O

#![no_std]
#![deny(unsafe_code)]

pub mod adc;
pub mod gpio;
pub mod storage;
pub mod timer;
pub mod uart;

// Re-export key traits at crate root for convenience
pub use adc::{EntropySampler, SampleError, TEMP_SAMPLE_COUNT};
pub use gpio::{InputPin, OutputPin};
pub use storage::{StorageError, WordStorage};
pub use timer::{DelayTimer, TickCounter, TimerError};
pub use uart::{SerialLink, UartConfig};
