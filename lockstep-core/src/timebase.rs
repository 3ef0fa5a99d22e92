//! System clock reference and time-unit conversions
//!
//! The operating clock frequency is established once during bringup and
//! never changes afterwards; every duration conversion in the timing
//! subsystem reads it from a [`SystemClock`] value handed out by the
//! bringup sequence.
//!
//! All conversions are integer arithmetic, widened to 64 bits before
//! the division and narrowed after. Results truncate toward zero, so a
//! microseconds → cycles → microseconds round trip may lose up to one
//! microsecond at clock rates of 1 MHz and above.

const MICROS_PER_SEC: u64 = 1_000_000;
const NANOS_PER_SEC: u64 = 1_000_000_000;

/// Operating clock frequency, in cycles per second
///
/// Immutable for the life of the program once constructed. Copies are
/// handed to every component that converts between durations and cycle
/// counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SystemClock {
    hz: u32,
}

impl SystemClock {
    /// Wrap a clock rate established by clock-tree bringup
    pub const fn new(hz: u32) -> Self {
        assert!(hz > 0);
        Self { hz }
    }

    /// Clock rate in cycles per second
    pub const fn hz(&self) -> u32 {
        self.hz
    }

    /// Cycles spanning `duration_us` microseconds, truncating
    ///
    /// Saturates at `u32::MAX` for durations beyond the 32-bit
    /// countdown range (about 64 seconds at 66.67 MHz).
    pub const fn cycles_from_us(&self, duration_us: u32) -> u32 {
        saturate(duration_us as u64 * self.hz as u64 / MICROS_PER_SEC)
    }

    /// Microseconds spanned by `cycles`, truncating
    pub const fn us_from_cycles(&self, cycles: u32) -> u32 {
        saturate(cycles as u64 * MICROS_PER_SEC / self.hz as u64)
    }

    /// Cycles spanning `duration_ns` nanoseconds, truncating
    pub const fn cycles_from_ns(&self, duration_ns: u32) -> u32 {
        saturate(duration_ns as u64 * self.hz as u64 / NANOS_PER_SEC)
    }
}

const fn saturate(value: u64) -> u32 {
    if value > u32::MAX as u64 {
        u32::MAX
    } else {
        value as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// 16 MHz crystal through the PLL, as configured by bringup
    const CLOCK_HZ: u32 = 66_666_666;

    #[test]
    fn one_second_is_the_clock_rate() {
        let clock = SystemClock::new(CLOCK_HZ);
        assert_eq!(clock.cycles_from_us(1_000_000), CLOCK_HZ);
        assert_eq!(clock.us_from_cycles(CLOCK_HZ), 1_000_000);
    }

    #[test]
    fn conversions_truncate_toward_zero() {
        let clock = SystemClock::new(CLOCK_HZ);
        // 1 us = 66.66 cycles; 66 cycles = 0.99 us
        assert_eq!(clock.cycles_from_us(1), 66);
        assert_eq!(clock.us_from_cycles(66), 0);
    }

    #[test]
    fn over_range_durations_saturate() {
        let clock = SystemClock::new(CLOCK_HZ);
        assert_eq!(clock.cycles_from_us(u32::MAX), u32::MAX);
    }

    #[test]
    fn nanosecond_conversion_matches_microsecond_scale() {
        let clock = SystemClock::new(CLOCK_HZ);
        assert_eq!(clock.cycles_from_ns(1_000_000_000), CLOCK_HZ);
        assert_eq!(clock.cycles_from_ns(1_000), clock.cycles_from_us(1));
    }

    proptest! {
        /// us -> cycles -> us loses at most one microsecond and never
        /// gains time, across realistic MCU clock rates.
        #[test]
        fn round_trip_within_one_microsecond(
            us in 0u32..30_000_000,
            hz in 1_000_000u32..=120_000_000,
        ) {
            let clock = SystemClock::new(hz);
            let back = clock.us_from_cycles(clock.cycles_from_us(us));
            prop_assert!(back <= us);
            prop_assert!(us - back <= 1);
        }

        /// More cycles never read as less time.
        #[test]
        fn us_from_cycles_is_monotonic(
            cycles in 0u32..u32::MAX,
            hz in 1_000_000u32..=120_000_000,
        ) {
            let clock = SystemClock::new(hz);
            prop_assert!(clock.us_from_cycles(cycles + 1) >= clock.us_from_cycles(cycles));
        }
    }
}
