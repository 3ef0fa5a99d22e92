//! Delay timer and tick counter abstractions
//!
//! Two timing primitives back the protocol layer: a one-shot countdown
//! convertible to and from microseconds, and a free-running 64-bit tick
//! counter used for relative-time measurement and as an entropy
//! contributor.

/// Errors from delay timer operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimerError {
    /// A countdown is already outstanding
    Busy,
    /// No countdown is outstanding
    NotArmed,
    /// The countdown never signalled expiry (stuck hardware)
    HardwareTimeout,
}

/// One-shot microsecond delay timer
///
/// The hardware carries a single countdown instance, so at most one
/// delay may be outstanding at a time. [`DelayTimer::start`] rejects a
/// second arm attempt with [`TimerError::Busy`] rather than silently
/// overwriting the running deadline.
///
/// Conversions between microseconds and timer cycles are integer
/// arithmetic with truncating division; callers must tolerate up to one
/// cycle-period of rounding (sub-microsecond at typical clock rates)
/// and should not expect exact round-trips for very short durations.
pub trait DelayTimer {
    /// Arm the countdown for `duration_us` microseconds
    ///
    /// Non-blocking: returns as soon as the countdown is running. Do
    /// other work, then [`DelayTimer::wait`] or poll
    /// [`DelayTimer::remaining_us`].
    fn start(&mut self, duration_us: u32) -> Result<(), TimerError>;

    /// Busy-poll until the armed countdown expires, then clear it
    ///
    /// On `Ok` the timer is idle and immediately reusable. Returns
    /// [`TimerError::NotArmed`] if nothing is outstanding, and
    /// [`TimerError::HardwareTimeout`] if the poll bound is exhausted
    /// without the hardware ever signalling expiry.
    fn wait(&mut self) -> Result<(), TimerError>;

    /// Microseconds left on the countdown, or 0 when idle
    ///
    /// Armed-ness is decided by the hardware enable state, never by
    /// whether the count reads zero: a just-expired countdown reads
    /// count 0 while still enabled.
    fn remaining_us(&self) -> u32;

    /// Whether a countdown is currently outstanding
    fn is_armed(&self) -> bool;

    /// Arm and wait in one call
    fn sleep(&mut self, duration_us: u32) -> Result<(), TimerError> {
        self.start(duration_us)?;
        self.wait()
    }
}

/// Free-running tick counter
///
/// A monotonically increasing 64-bit count of elapsed ticks since boot,
/// driven by an always-on clock source independent of the main system
/// clock. Nothing resets it; it is purely observed. The count wraps
/// only after an astronomically long runtime (thousands of years at
/// realistic tick rates), which no caller needs to handle.
pub trait TickCounter {
    /// Current tick count
    ///
    /// Never blocks, has no side effects, and is safe to call at any
    /// time. Successive calls return non-decreasing values.
    fn now(&self) -> u64;
}
