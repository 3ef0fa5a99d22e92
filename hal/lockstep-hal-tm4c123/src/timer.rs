//! One-shot delay timer and free-running tick counter
//!
//! TIMER0 provides the node's single one-shot countdown: armed from a
//! microsecond duration, polled or waited on, then idle again. WTIMER0
//! runs as a 64-bit up-counter on the alternate always-on oscillator,
//! so its count keeps advancing across system clock reconfiguration and
//! is never reset by anyone.
//!
//! Both drivers are generic over a register-ops trait; the hardware
//! implementations live here alongside them, the simulated ones in the
//! test module.

use embedded_hal::delay::DelayNs;

use lockstep_core::poll::poll_until;
use lockstep_core::timebase::SystemClock;
use lockstep_hal::timer::{DelayTimer, TickCounter, TimerError};

use crate::mmio;

const TIMER0_BASE: u32 = 0x4003_0000;
const WTIMER0_BASE: u32 = 0x4003_6000;

// GPTM register offsets
const GPTM_CFG: u32 = 0x000;
const GPTM_TAMR: u32 = 0x004;
const GPTM_CTL: u32 = 0x00C;
const GPTM_RIS: u32 = 0x01C;
const GPTM_ICR: u32 = 0x024;
const GPTM_TAILR: u32 = 0x028;
const GPTM_TAR: u32 = 0x048;
const GPTM_TBR: u32 = 0x04C;
const GPTM_CC: u32 = 0xFC8;

// Whole-width timer (32-bit on TIMER0, 64-bit on the wide timers)
const CFG_FULL_WIDTH: u32 = 0x0;
const TAMR_ONE_SHOT: u32 = 0x1;
const TAMR_PERIODIC: u32 = 0x2;
const TAMR_COUNT_UP: u32 = 1 << 4;
const CTL_TAEN: u32 = 1 << 0;
const INT_TATO: u32 = 1 << 0;
const CC_ALTCLK: u32 = 1 << 0;

/// Poll slack added on top of the armed cycle count in [`OneShot::wait`]
const WAIT_POLL_SLACK: u32 = 1 << 16;

/// Register operations of a one-shot countdown timer
///
/// The seam between the arming/expiry logic and the GPTM registers;
/// tests drive the logic against a simulated implementation.
pub trait CountdownRegs {
    /// Load the start value for the next countdown
    fn set_load(&mut self, cycles: u32);
    /// Current countdown value
    fn value(&self) -> u32;
    /// Begin counting down from the loaded value
    fn enable(&mut self);
    /// Whether the countdown is currently enabled
    ///
    /// One-shot hardware clears this itself on expiry, but not
    /// atomically with the count reaching zero - a just-expired timer
    /// can briefly read count 0 with the enable bit still set.
    fn is_enabled(&self) -> bool;
    /// Whether the timeout flag is raised
    fn timeout_raised(&self) -> bool;
    /// Clear the timeout flag
    fn clear_timeout(&mut self);
}

/// Register operations of a free-running 64-bit up-counter
pub trait WideCounterRegs {
    /// Low 32 bits of the count
    fn count_lo(&self) -> u32;
    /// High 32 bits of the count
    fn count_hi(&self) -> u32;
}

/// TIMER0 register file
pub struct Timer0Regs {
    _private: (),
}

impl Timer0Regs {
    pub(crate) fn new() -> Self {
        Self { _private: () }
    }

    /// Put the timer in one-shot countdown mode, disabled
    pub(crate) fn configure_one_shot(&mut self) {
        mmio::clear_bits(TIMER0_BASE + GPTM_CTL, CTL_TAEN);
        mmio::write(TIMER0_BASE + GPTM_CFG, CFG_FULL_WIDTH);
        mmio::write(TIMER0_BASE + GPTM_TAMR, TAMR_ONE_SHOT);
    }
}

impl CountdownRegs for Timer0Regs {
    fn set_load(&mut self, cycles: u32) {
        mmio::write(TIMER0_BASE + GPTM_TAILR, cycles);
    }

    fn value(&self) -> u32 {
        mmio::read(TIMER0_BASE + GPTM_TAR)
    }

    fn enable(&mut self) {
        mmio::set_bits(TIMER0_BASE + GPTM_CTL, CTL_TAEN);
    }

    fn is_enabled(&self) -> bool {
        mmio::read(TIMER0_BASE + GPTM_CTL) & CTL_TAEN != 0
    }

    fn timeout_raised(&self) -> bool {
        mmio::read(TIMER0_BASE + GPTM_RIS) & INT_TATO != 0
    }

    fn clear_timeout(&mut self) {
        mmio::write(TIMER0_BASE + GPTM_ICR, INT_TATO);
    }
}

/// WTIMER0 register file
pub struct Wtimer0Regs {
    _private: (),
}

impl Wtimer0Regs {
    pub(crate) fn new() -> Self {
        Self { _private: () }
    }

    /// Start the 64-bit up-count on the alternate always-on oscillator
    pub(crate) fn configure_free_running(&mut self) {
        mmio::clear_bits(WTIMER0_BASE + GPTM_CTL, CTL_TAEN);
        mmio::write(WTIMER0_BASE + GPTM_CFG, CFG_FULL_WIDTH);
        mmio::write(WTIMER0_BASE + GPTM_TAMR, TAMR_PERIODIC | TAMR_COUNT_UP);
        // Alternate clock source: the count survives system clock changes
        mmio::write(WTIMER0_BASE + GPTM_CC, CC_ALTCLK);
        mmio::set_bits(WTIMER0_BASE + GPTM_CTL, CTL_TAEN);
    }
}

impl WideCounterRegs for Wtimer0Regs {
    fn count_lo(&self) -> u32 {
        mmio::read(WTIMER0_BASE + GPTM_TAR)
    }

    fn count_hi(&self) -> u32 {
        mmio::read(WTIMER0_BASE + GPTM_TBR)
    }
}

/// One-shot microsecond delay timer
///
/// Owns the node's single countdown instance; constructed once by
/// bringup around [`Timer0Regs`].
pub struct OneShot<R: CountdownRegs> {
    regs: R,
    clock: SystemClock,
    armed_us: u32,
}

impl<R: CountdownRegs> OneShot<R> {
    pub(crate) fn new(regs: R, clock: SystemClock) -> Self {
        Self {
            regs,
            clock,
            armed_us: 0,
        }
    }

    /// Attempt budget for [`DelayTimer::wait`]
    ///
    /// Each poll attempt spans several bus cycles, so a budget of the
    /// armed cycle count plus slack strictly over-estimates the real
    /// wait; exhausting it means the hardware stopped counting.
    fn wait_poll_bound(&self) -> u32 {
        self.clock
            .cycles_from_us(self.armed_us)
            .saturating_add(WAIT_POLL_SLACK)
    }
}

impl<R: CountdownRegs> DelayTimer for OneShot<R> {
    fn start(&mut self, duration_us: u32) -> Result<(), TimerError> {
        if self.is_armed() {
            return Err(TimerError::Busy);
        }
        // A countdown that expired unobserved leaves its flag raised;
        // arming consumes it so the new wait cannot return early.
        self.regs.clear_timeout();
        self.regs.set_load(self.clock.cycles_from_us(duration_us));
        self.regs.enable();
        self.armed_us = duration_us;
        Ok(())
    }

    fn wait(&mut self) -> Result<(), TimerError> {
        if !self.is_armed() && !self.regs.timeout_raised() {
            return Err(TimerError::NotArmed);
        }
        let bound = self.wait_poll_bound();
        poll_until(bound, || self.regs.timeout_raised())
            .map_err(|_| TimerError::HardwareTimeout)?;
        self.regs.clear_timeout();
        self.armed_us = 0;
        Ok(())
    }

    fn remaining_us(&self) -> u32 {
        // Enabled state decides armed-ness; a just-expired countdown
        // reads count 0 while the enable bit is still set.
        if self.regs.is_enabled() {
            self.clock.us_from_cycles(self.regs.value())
        } else {
            0
        }
    }

    fn is_armed(&self) -> bool {
        self.regs.is_enabled()
    }
}

/// Free-running tick counter
pub struct FreeRunning<R: WideCounterRegs> {
    regs: R,
}

impl<R: WideCounterRegs> FreeRunning<R> {
    pub(crate) fn new(regs: R) -> Self {
        Self { regs }
    }
}

impl<R: WideCounterRegs> TickCounter for FreeRunning<R> {
    fn now(&self) -> u64 {
        // Re-read the high word so a low-word carry between the two
        // halves cannot produce a torn value.
        loop {
            let hi = self.regs.count_hi();
            let lo = self.regs.count_lo();
            if hi == self.regs.count_hi() {
                return (hi as u64) << 32 | lo as u64;
            }
        }
    }
}

/// Cycle-calibrated software spin delay
///
/// For the few places that need a pause below the delay timer's
/// granularity (debounce spacing between switch reads). Also serves
/// ecosystem drivers through `embedded_hal::delay::DelayNs`.
pub struct SpinDelay {
    clock: SystemClock,
}

impl SpinDelay {
    pub(crate) fn new(clock: SystemClock) -> Self {
        Self { clock }
    }
}

impl DelayNs for SpinDelay {
    fn delay_ns(&mut self, ns: u32) {
        cortex_m::asm::delay(self.clock.cycles_from_ns(ns));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::Cell;

    use crate::sysctl::SYSTEM_CLOCK_HZ;

    /// Simulated one-shot countdown hardware
    ///
    /// Mirrors the GPTM one-shot behavior: counting down while enabled,
    /// raising the timeout flag and clearing the enable bit at zero.
    /// Every `timeout_raised` poll advances the count by a fixed number
    /// of cycles, modelling time passing while the driver busy-waits.
    #[derive(Default)]
    struct SimState {
        count: Cell<u32>,
        enabled: Cell<bool>,
        raised: Cell<bool>,
        cycles_per_poll: Cell<u32>,
        // Expiry variations under test
        hold_enable_on_expiry: Cell<bool>,
        stuck: Cell<bool>,
    }

    impl SimState {
        fn step(&self, cycles: u32) {
            if !self.enabled.get() {
                return;
            }
            let count = self.count.get();
            if count > cycles {
                self.count.set(count - cycles);
                return;
            }
            self.count.set(0);
            if self.stuck.get() {
                return;
            }
            self.raised.set(true);
            if !self.hold_enable_on_expiry.get() {
                self.enabled.set(false);
            }
        }
    }

    struct SimRegs<'a>(&'a SimState);

    impl CountdownRegs for SimRegs<'_> {
        fn set_load(&mut self, cycles: u32) {
            self.0.count.set(cycles);
        }

        fn value(&self) -> u32 {
            self.0.count.get()
        }

        fn enable(&mut self) {
            self.0.enabled.set(true);
        }

        fn is_enabled(&self) -> bool {
            self.0.enabled.get()
        }

        fn timeout_raised(&self) -> bool {
            self.0.step(self.0.cycles_per_poll.get());
            self.0.raised.get()
        }

        fn clear_timeout(&mut self) {
            self.0.raised.set(false);
        }
    }

    fn clock() -> SystemClock {
        SystemClock::new(SYSTEM_CLOCK_HZ)
    }

    fn sim() -> SimState {
        let state = SimState::default();
        state.cycles_per_poll.set(64);
        state
    }

    #[test]
    fn start_then_remaining_round_trips_within_one_microsecond() {
        let state = sim();
        let mut timer = OneShot::new(SimRegs(&state), clock());

        timer.start(1_000).unwrap();
        let remaining = timer.remaining_us();
        assert!(remaining <= 1_000);
        assert!(1_000 - remaining <= 1);
    }

    #[test]
    fn remaining_strictly_decreases_until_expiry() {
        let state = sim();
        let mut timer = OneShot::new(SimRegs(&state), clock());

        timer.start(1_000).unwrap();
        let mut last = timer.remaining_us();
        while state.enabled.get() {
            state.step(6_700); // ~100 us of cycles
            let now = timer.remaining_us();
            assert!(now < last, "remaining went {} -> {}", last, now);
            last = now;
        }
        assert_eq!(timer.remaining_us(), 0);
    }

    #[test]
    fn idle_after_wait_and_immediately_reusable() {
        let state = sim();
        let mut timer = OneShot::new(SimRegs(&state), clock());

        timer.start(500).unwrap();
        timer.wait().unwrap();

        assert_eq!(timer.remaining_us(), 0);
        assert!(!timer.is_armed());
        timer.start(500).unwrap();
    }

    #[test]
    fn sleep_is_start_then_wait() {
        let state = sim();
        let mut timer = OneShot::new(SimRegs(&state), clock());

        timer.sleep(250).unwrap();
        assert!(!timer.is_armed());
        assert_eq!(timer.remaining_us(), 0);
    }

    #[test]
    fn second_start_while_armed_is_rejected() {
        let state = sim();
        let mut timer = OneShot::new(SimRegs(&state), clock());

        timer.start(1_000).unwrap();
        assert_eq!(timer.start(1_000), Err(TimerError::Busy));
        // The running countdown is untouched by the rejected arm
        assert!(timer.is_armed());
    }

    #[test]
    fn wait_without_start_is_rejected() {
        let state = sim();
        let mut timer = OneShot::new(SimRegs(&state), clock());

        assert_eq!(timer.wait(), Err(TimerError::NotArmed));
    }

    #[test]
    fn expired_but_not_yet_disabled_still_reads_as_armed() {
        let state = sim();
        state.hold_enable_on_expiry.set(true);
        let mut timer = OneShot::new(SimRegs(&state), clock());

        timer.start(100).unwrap();
        // Run the countdown to zero; the enable bit stays set
        state.step(u32::MAX);
        assert_eq!(state.count.get(), 0);
        assert!(state.enabled.get());

        assert!(timer.is_armed());
        assert_eq!(timer.remaining_us(), 0);
        // The pending expiry is still consumable
        timer.wait().unwrap();
    }

    #[test]
    fn unobserved_expiry_does_not_leak_into_the_next_wait() {
        let state = sim();
        let mut timer = OneShot::new(SimRegs(&state), clock());

        timer.start(100).unwrap();
        state.step(u32::MAX); // expires with nobody waiting
        assert!(state.raised.get());

        // Re-arm: the stale flag must not satisfy the new wait early
        timer.start(1_000).unwrap();
        assert!(!state.raised.get());
        assert!(timer.is_armed());
    }

    #[test]
    fn stuck_hardware_surfaces_a_timeout_instead_of_hanging() {
        let state = sim();
        state.stuck.set(true);
        let mut timer = OneShot::new(SimRegs(&state), clock());

        timer.start(100).unwrap();
        assert_eq!(timer.wait(), Err(TimerError::HardwareTimeout));
    }

    #[test]
    fn tick_counter_assembles_the_64_bit_count() {
        struct Fixed;
        impl WideCounterRegs for Fixed {
            fn count_lo(&self) -> u32 {
                0xDEAD_BEEF
            }
            fn count_hi(&self) -> u32 {
                0x0000_0042
            }
        }
        let ticks = FreeRunning::new(Fixed);
        assert_eq!(ticks.now(), 0x0000_0042_DEAD_BEEF);
    }

    #[test]
    fn tick_counter_retries_across_a_low_word_carry() {
        /// First observation tears across a carry: hi reads 0, then the
        /// low word has wrapped and the confirming hi read differs.
        struct Torn {
            hi_reads: Cell<u32>,
        }
        impl WideCounterRegs for Torn {
            fn count_lo(&self) -> u32 {
                match self.hi_reads.get() {
                    1 => 0x0000_0003, // already wrapped
                    _ => 0x0000_0007,
                }
            }
            fn count_hi(&self) -> u32 {
                let reads = self.hi_reads.get();
                self.hi_reads.set(reads + 1);
                match reads {
                    0 => 0, // before the carry
                    _ => 1, // after the carry
                }
            }
        }
        let ticks = FreeRunning::new(Torn {
            hi_reads: Cell::new(0),
        });
        assert_eq!(ticks.now(), (1u64 << 32) | 0x0000_0007);
    }

    #[test]
    fn tick_counter_is_monotonic_over_an_advancing_count() {
        struct Advancing {
            count: Cell<u64>,
        }
        impl WideCounterRegs for Advancing {
            fn count_lo(&self) -> u32 {
                let value = self.count.get();
                self.count.set(value + 3);
                value as u32
            }
            fn count_hi(&self) -> u32 {
                (self.count.get() >> 32) as u32
            }
        }
        let ticks = FreeRunning::new(Advancing {
            count: Cell::new(u32::MAX as u64 - 4),
        });
        let mut last = ticks.now();
        for _ in 0..8 {
            let now = ticks.now();
            assert!(now >= last);
            last = now;
        }
    }
}
