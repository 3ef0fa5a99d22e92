//! EEPROM block storage
//!
//! The 2 KiB on-chip EEPROM, addressed as 32 blocks of 16 words. The
//! protocol layer stores its persistent secrets here; this driver only
//! moves aligned words and enforces the block's bounds.

use lockstep_core::poll::poll_until;
use lockstep_hal::storage::{StorageError, WordStorage};

use crate::mmio;

const EEPROM_BASE: u32 = 0x400A_F000;

const EEPROM_EEBLOCK: u32 = EEPROM_BASE + 0x004;
const EEPROM_EEOFFSET: u32 = EEPROM_BASE + 0x008;
const EEPROM_EERDWR: u32 = EEPROM_BASE + 0x010;
const EEPROM_EEDONE: u32 = EEPROM_BASE + 0x018;
const EEPROM_EESUPP: u32 = EEPROM_BASE + 0x01C;

const EEDONE_WORKING: u32 = 1 << 0;
const EESUPP_PRETRY: u32 = 1 << 2;
const EESUPP_ERETRY: u32 = 1 << 3;

/// Total storage size in bytes
pub const EEPROM_SIZE_BYTES: u32 = 0x800;

const WORDS_PER_BLOCK: u32 = 16;

/// Attempt budget for one word program (a few ms worst case)
const PROGRAM_POLL_BOUND: u32 = 1 << 20;

/// Attempt budget for the power-up busy wait during bringup
pub(crate) const STARTUP_POLL_BOUND: u32 = 1 << 20;

/// Register operations of the EEPROM block
pub trait EepromRegs {
    /// Select the word at `block`/`offset` for the next access
    fn select(&mut self, block: u32, offset: u32);
    /// Read the selected word
    fn read_word(&mut self) -> u32;
    /// Program the selected word
    fn write_word(&mut self, value: u32);
    /// Whether a program operation is still in flight
    fn busy(&self) -> bool;
}

/// EEPROM register file
pub struct Eeprom0Regs {
    _private: (),
}

impl Eeprom0Regs {
    pub(crate) fn new() -> Self {
        Self { _private: () }
    }

    /// Whether power-up recovery of the copy buffer failed
    pub(crate) fn copy_buffer_faulted(&self) -> bool {
        mmio::read(EEPROM_EESUPP) & (EESUPP_PRETRY | EESUPP_ERETRY) != 0
    }
}

impl EepromRegs for Eeprom0Regs {
    fn select(&mut self, block: u32, offset: u32) {
        mmio::write(EEPROM_EEBLOCK, block);
        mmio::write(EEPROM_EEOFFSET, offset);
    }

    fn read_word(&mut self) -> u32 {
        mmio::read(EEPROM_EERDWR)
    }

    fn write_word(&mut self, value: u32) {
        mmio::write(EEPROM_EERDWR, value);
    }

    fn busy(&self) -> bool {
        mmio::read(EEPROM_EEDONE) & EEDONE_WORKING != 0
    }
}

/// Word-addressed persistent storage over the EEPROM block
pub struct Eeprom<R: EepromRegs> {
    regs: R,
}

impl<R: EepromRegs> Eeprom<R> {
    pub(crate) fn new(regs: R) -> Self {
        Self { regs }
    }
}

fn check_range(addr: u32, words: usize) -> Result<(), StorageError> {
    if addr % 4 != 0 {
        return Err(StorageError::Misaligned);
    }
    if addr as u64 + words as u64 * 4 > EEPROM_SIZE_BYTES as u64 {
        return Err(StorageError::OutOfBounds);
    }
    Ok(())
}

impl<R: EepromRegs> WordStorage for Eeprom<R> {
    fn read_words(&mut self, addr: u32, out: &mut [u32]) -> Result<(), StorageError> {
        check_range(addr, out.len())?;
        let mut word = addr / 4;
        for slot in out {
            self.regs
                .select(word / WORDS_PER_BLOCK, word % WORDS_PER_BLOCK);
            *slot = self.regs.read_word();
            word += 1;
        }
        Ok(())
    }

    fn write_words(&mut self, addr: u32, words: &[u32]) -> Result<(), StorageError> {
        check_range(addr, words.len())?;
        let mut word = addr / 4;
        for &value in words {
            self.regs
                .select(word / WORDS_PER_BLOCK, word % WORDS_PER_BLOCK);
            self.regs.write_word(value);
            poll_until(PROGRAM_POLL_BOUND, || !self.regs.busy())
                .map_err(|_| StorageError::Timeout)?;
            word += 1;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::Cell;
    use std::cell::RefCell;

    /// Simulated EEPROM: a word array plus the block/offset latches
    struct SimEeprom {
        mem: RefCell<[u32; (EEPROM_SIZE_BYTES / 4) as usize]>,
        block: Cell<u32>,
        offset: Cell<u32>,
        busy_polls: Cell<u32>,
        stuck: bool,
    }

    impl SimEeprom {
        fn new() -> Self {
            Self {
                mem: RefCell::new([0; (EEPROM_SIZE_BYTES / 4) as usize]),
                block: Cell::new(0),
                offset: Cell::new(0),
                busy_polls: Cell::new(0),
                stuck: false,
            }
        }

        fn index(&self) -> usize {
            (self.block.get() * WORDS_PER_BLOCK + self.offset.get()) as usize
        }
    }

    impl EepromRegs for SimEeprom {
        fn select(&mut self, block: u32, offset: u32) {
            self.block.set(block);
            self.offset.set(offset);
        }

        fn read_word(&mut self) -> u32 {
            self.mem.borrow()[self.index()]
        }

        fn write_word(&mut self, value: u32) {
            let index = self.index();
            self.mem.borrow_mut()[index] = value;
            // Programming holds the busy flag for a few polls
            self.busy_polls.set(3);
        }

        fn busy(&self) -> bool {
            if self.stuck {
                return true;
            }
            let left = self.busy_polls.get();
            if left > 0 {
                self.busy_polls.set(left - 1);
                return true;
            }
            false
        }
    }

    #[test]
    fn write_then_read_round_trips_across_a_block_boundary() {
        let mut storage = Eeprom::new(SimEeprom::new());
        // Words 14..18 of the array span the block 0 / block 1 seam
        let written = [0x1111_1111, 0x2222_2222, 0x3333_3333, 0x4444_4444];
        storage.write_words(14 * 4, &written).unwrap();

        let mut read = [0u32; 4];
        storage.read_words(14 * 4, &mut read).unwrap();
        assert_eq!(read, written);
    }

    #[test]
    fn misaligned_addresses_are_rejected() {
        let mut storage = Eeprom::new(SimEeprom::new());
        let mut out = [0u32; 1];
        assert_eq!(
            storage.read_words(2, &mut out),
            Err(StorageError::Misaligned)
        );
        assert_eq!(
            storage.write_words(5, &[0xFFFF_FFFF]),
            Err(StorageError::Misaligned)
        );
    }

    #[test]
    fn out_of_range_requests_are_rejected() {
        let mut storage = Eeprom::new(SimEeprom::new());
        let mut out = [0u32; 2];
        // Last valid word is at EEPROM_SIZE_BYTES - 4
        assert_eq!(
            storage.read_words(EEPROM_SIZE_BYTES - 4, &mut out),
            Err(StorageError::OutOfBounds)
        );
        assert_eq!(
            storage.write_words(EEPROM_SIZE_BYTES, &[0]),
            Err(StorageError::OutOfBounds)
        );
    }

    #[test]
    fn last_word_of_the_block_is_reachable() {
        let mut storage = Eeprom::new(SimEeprom::new());
        storage
            .write_words(EEPROM_SIZE_BYTES - 4, &[0xCAFE_F00D])
            .unwrap();
        let mut out = [0u32; 1];
        storage.read_words(EEPROM_SIZE_BYTES - 4, &mut out).unwrap();
        assert_eq!(out[0], 0xCAFE_F00D);
    }

    #[test]
    fn stuck_program_surfaces_a_timeout() {
        let mut sim = SimEeprom::new();
        sim.stuck = true;
        let mut storage = Eeprom::new(sim);
        assert_eq!(
            storage.write_words(0, &[0xDEAD_BEEF]),
            Err(StorageError::Timeout)
        );
    }
}
