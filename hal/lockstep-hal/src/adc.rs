//! Entropy sampling abstractions
//!
//! The analog front end doubles as a noise source: batches of raw
//! temperature-sensor conversions carry thermal and circuit noise that
//! the protocol layer folds into its random seed. The readings are
//! uncalibrated sensor codes, never a physical temperature.

/// Readings per sample batch
pub const TEMP_SAMPLE_COUNT: usize = 8;

/// Errors from entropy sampling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SampleError {
    /// The conversion sequence never completed (stuck hardware)
    Timeout,
}

/// Batched noisy temperature sampler
///
/// Each call triggers a full conversion sequence and blocks
/// (busy-polls) until the hardware signals batch completion. There is
/// no streaming or partial-read mode; every batch is produced fresh and
/// owned by the caller, with no state retained between calls.
pub trait EntropySampler {
    /// Collect one batch of raw temperature readings
    fn sample(&mut self) -> Result<[u32; TEMP_SAMPLE_COUNT], SampleError>;
}
