//! Batched temperature sampling on ADC0
//!
//! Sample sequencer 0 is configured once at bringup: eight steps, every
//! step reading the internal temperature sensor, processor-triggered,
//! raw interrupt on the last step. Hardware oversampling stays off -
//! the conversion noise is the product here, not a defect to average
//! away.

use lockstep_core::poll::poll_until;
use lockstep_hal::adc::{EntropySampler, SampleError, TEMP_SAMPLE_COUNT};

use crate::mmio;

const ADC0_BASE: u32 = 0x4003_8000;

const ADC_ACTSS: u32 = ADC0_BASE + 0x000;
const ADC_RIS: u32 = ADC0_BASE + 0x004;
const ADC_ISC: u32 = ADC0_BASE + 0x00C;
const ADC_EMUX: u32 = ADC0_BASE + 0x014;
const ADC_PSSI: u32 = ADC0_BASE + 0x028;
const ADC_SAC: u32 = ADC0_BASE + 0x030;
const ADC_SSMUX0: u32 = ADC0_BASE + 0x040;
const ADC_SSCTL0: u32 = ADC0_BASE + 0x044;
const ADC_SSFIFO0: u32 = ADC0_BASE + 0x048;

// Sequencer 0 bits
const SS0: u32 = 1 << 0;
const EMUX_SS0_MASK: u32 = 0xF;

// Per-step control nibbles: temperature sensor on every step, raw
// interrupt and end-of-sequence on the last
const SSCTL0_TEMP_BATCH: u32 = 0xE888_8888;

/// Attempt budget for one eight-step conversion sequence
const CONVERSION_POLL_BOUND: u32 = 1 << 20;

/// Register operations of the sample sequencer
pub trait SequencerRegs {
    /// Kick off one full conversion sequence
    fn trigger(&mut self);
    /// Whether the sequence has completed
    fn batch_done(&self) -> bool;
    /// Clear the completion flag
    fn clear_done(&mut self);
    /// Pop the next conversion result from the FIFO
    fn pop_fifo(&mut self) -> u32;
}

/// ADC0 register file
pub struct Adc0Regs {
    _private: (),
}

impl Adc0Regs {
    pub(crate) fn new() -> Self {
        Self { _private: () }
    }

    /// Configure sequencer 0 for the eight-step temperature batch
    pub(crate) fn configure_temperature_batch(&mut self) {
        mmio::clear_bits(ADC_ACTSS, SS0);
        // Processor trigger
        mmio::clear_bits(ADC_EMUX, EMUX_SS0_MASK);
        mmio::write(ADC_SSMUX0, 0);
        mmio::write(ADC_SSCTL0, SSCTL0_TEMP_BATCH);
        // Oversampling off to keep the noise
        mmio::write(ADC_SAC, 0);
        mmio::set_bits(ADC_ACTSS, SS0);
    }
}

impl SequencerRegs for Adc0Regs {
    fn trigger(&mut self) {
        mmio::write(ADC_PSSI, SS0);
    }

    fn batch_done(&self) -> bool {
        mmio::read(ADC_RIS) & SS0 != 0
    }

    fn clear_done(&mut self) {
        mmio::write(ADC_ISC, SS0);
    }

    fn pop_fifo(&mut self) -> u32 {
        mmio::read(ADC_SSFIFO0)
    }
}

/// Batched temperature sampler
///
/// Owns the node's ADC sequencer; constructed once by bringup around
/// [`Adc0Regs`].
pub struct TempSampler<R: SequencerRegs> {
    regs: R,
}

impl<R: SequencerRegs> TempSampler<R> {
    pub(crate) fn new(regs: R) -> Self {
        Self { regs }
    }
}

impl<R: SequencerRegs> EntropySampler for TempSampler<R> {
    fn sample(&mut self) -> Result<[u32; TEMP_SAMPLE_COUNT], SampleError> {
        self.regs.trigger();
        poll_until(CONVERSION_POLL_BOUND, || self.regs.batch_done())
            .map_err(|_| SampleError::Timeout)?;
        self.regs.clear_done();

        let mut batch = [0u32; TEMP_SAMPLE_COUNT];
        for slot in &mut batch {
            *slot = self.regs.pop_fifo();
        }
        Ok(batch)
    }
}
