//! Boot-seed entropy folding
//!
//! Folds the node's two hardware noise sources into 32-byte seed
//! material: the low bytes of many temperature sample batches (thermal
//! and circuit noise) and a burst of free-running tick readings (boot
//! timing jitter). Key derivation from the seed belongs to the protocol
//! layer; this module only gathers material.

use sha2::{Digest, Sha256};

use lockstep_hal::adc::{EntropySampler, SampleError};
use lockstep_hal::timer::TickCounter;

/// Seed material length in bytes
pub const SEED_LEN: usize = 32;

/// Temperature batches folded into one seed
pub const TEMP_FOLD_ROUNDS: usize = 1024;

/// Tick readings folded into one seed
pub const TICK_FOLD_ROUNDS: usize = 128;

/// SHA-256 over the low bytes of [`TEMP_FOLD_ROUNDS`] sample batches
///
/// Only the least significant byte of each raw reading is folded in:
/// the upper bits track the (slowly varying) die temperature while the
/// low bits carry the conversion noise that makes the source useful.
pub fn temp_seed<S: EntropySampler>(sampler: &mut S) -> Result<[u8; SEED_LEN], SampleError> {
    let mut hash = Sha256::new();
    for _ in 0..TEMP_FOLD_ROUNDS {
        let samples = sampler.sample()?;
        hash.update(samples.map(|s| s as u8));
    }
    Ok(hash.finalize().into())
}

/// SHA-256 over [`TICK_FOLD_ROUNDS`] consecutive tick readings
pub fn tick_seed<C: TickCounter>(counter: &C) -> [u8; SEED_LEN] {
    let mut hash = Sha256::new();
    for _ in 0..TICK_FOLD_ROUNDS {
        hash.update(counter.now().to_le_bytes());
    }
    hash.finalize().into()
}

/// Combine both sources into one 32-byte boot seed
///
/// The contributions are XORed byte-wise, so a weak source can only
/// fail to add entropy, never remove what the other contributed.
pub fn boot_seed<S, C>(sampler: &mut S, counter: &C) -> Result<[u8; SEED_LEN], SampleError>
where
    S: EntropySampler,
    C: TickCounter,
{
    let temp = temp_seed(sampler)?;
    let ticks = tick_seed(counter);
    let mut seed = [0u8; SEED_LEN];
    for (i, byte) in seed.iter_mut().enumerate() {
        *byte = temp[i] ^ ticks[i];
    }
    Ok(seed)
}
