//! System control: clock tree and peripheral run-mode clock gating
//!
//! The clock tree is configured exactly once at boot: main oscillator
//! with a 16 MHz crystal feeding the PLL, whose 400 MHz VCO is divided
//! by 6 to the system clock. Every other peripheral is powered by
//! enabling its run-mode clock gate and waiting for the ready bit.

use lockstep_core::poll::{poll_until, PollTimeout};
use lockstep_core::timebase::SystemClock;

use crate::mmio;

/// System clock rate produced by [`configure_system_clock`]
///
/// 400 MHz PLL VCO / 6, truncated to whole hertz.
pub const SYSTEM_CLOCK_HZ: u32 = 66_666_666;

const SYSCTL_BASE: u32 = 0x400F_E000;

const SYSCTL_RIS: u32 = SYSCTL_BASE + 0x050;
const SYSCTL_MISC: u32 = SYSCTL_BASE + 0x058;
const SYSCTL_RCC: u32 = SYSCTL_BASE + 0x060;
const SYSCTL_RCC2: u32 = SYSCTL_BASE + 0x070;

// Run-mode clock gating and peripheral-ready register banks
const SYSCTL_RCGC_BASE: u32 = SYSCTL_BASE + 0x600;
const SYSCTL_PR_BASE: u32 = SYSCTL_BASE + 0xA00;

// RCC fields
const RCC_MOSCDIS: u32 = 1 << 0;
const RCC_OSCSRC_MASK: u32 = 0x3 << 4;
const RCC_XTAL_MASK: u32 = 0x1F << 6;
const RCC_XTAL_16MHZ: u32 = 0x15 << 6;
const RCC_BYPASS: u32 = 1 << 11;

// RCC2 fields
const RCC2_OSCSRC2_MASK: u32 = 0x7 << 4;
const RCC2_BYPASS2: u32 = 1 << 11;
const RCC2_PWRDN2: u32 = 1 << 13;
const RCC2_SYSDIV2LSB: u32 = 1 << 22;
const RCC2_SYSDIV2_MASK: u32 = 0x3F << 23;
const RCC2_DIV400: u32 = 1 << 30;
const RCC2_USERCC2: u32 = 1 << 31;

// {SYSDIV2, SYSDIV2LSB} = 5 divides the 400 MHz VCO by 6
const RCC2_SYSDIV_DIV6: u32 = (2 << 23) | RCC2_SYSDIV2LSB;

// Raw interrupt status
const RIS_PLLLRIS: u32 = 1 << 6;

/// Attempts allowed for a peripheral-ready poll
const READY_POLL_BOUND: u32 = 1 << 16;

/// Attempts allowed for the PLL lock poll (lock takes ~0.5 ms)
const PLL_LOCK_POLL_BOUND: u32 = 1 << 22;

/// Peripherals the node powers during bringup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Peripheral {
    GpioA,
    GpioB,
    GpioF,
    Timer0,
    WideTimer0,
    Adc0,
    Eeprom,
    Uart0,
    Uart1,
}

impl Peripheral {
    /// Offset of the peripheral's RCGC/PR register and its bit within
    ///
    /// The PR bank mirrors the RCGC bank layout, so one offset serves
    /// both.
    const fn gate(self) -> (u32, u32) {
        match self {
            Peripheral::Timer0 => (0x04, 1 << 0),
            Peripheral::GpioA => (0x08, 1 << 0),
            Peripheral::GpioB => (0x08, 1 << 1),
            Peripheral::GpioF => (0x08, 1 << 5),
            Peripheral::Uart0 => (0x18, 1 << 0),
            Peripheral::Uart1 => (0x18, 1 << 1),
            Peripheral::Adc0 => (0x38, 1 << 0),
            Peripheral::Eeprom => (0x58, 1 << 0),
            Peripheral::WideTimer0 => (0x5C, 1 << 0),
        }
    }
}

/// Enable a peripheral's run-mode clock and wait until it is ready
pub fn enable_peripheral(peripheral: Peripheral) -> Result<(), PollTimeout> {
    let (offset, bit) = peripheral.gate();
    mmio::set_bits(SYSCTL_RCGC_BASE + offset, bit);
    poll_until(READY_POLL_BOUND, || {
        mmio::read(SYSCTL_PR_BASE + offset) & bit != 0
    })
}

/// Bring the clock tree to its operating configuration
///
/// Runs the system from the raw oscillator while reconfiguring, powers
/// the main oscillator and PLL, then switches over once the PLL reports
/// lock. Returns the [`SystemClock`] every timing component converts
/// against.
pub fn configure_system_clock() -> Result<SystemClock, PollTimeout> {
    // Bypass the PLL while the tree is reconfigured
    mmio::set_bits(SYSCTL_RCC2, RCC2_USERCC2 | RCC2_BYPASS2);
    mmio::set_bits(SYSCTL_RCC, RCC_BYPASS);

    // Main oscillator on, 16 MHz crystal, main oscillator source
    let rcc = mmio::read(SYSCTL_RCC);
    mmio::write(
        SYSCTL_RCC,
        (rcc & !(RCC_MOSCDIS | RCC_XTAL_MASK | RCC_OSCSRC_MASK)) | RCC_XTAL_16MHZ,
    );
    mmio::clear_bits(SYSCTL_RCC2, RCC2_OSCSRC2_MASK);

    // Power up the PLL: 400 MHz VCO divided down to the system clock
    let rcc2 = mmio::read(SYSCTL_RCC2);
    mmio::write(
        SYSCTL_RCC2,
        (rcc2 & !(RCC2_PWRDN2 | RCC2_SYSDIV2_MASK | RCC2_SYSDIV2LSB))
            | RCC2_DIV400
            | RCC2_SYSDIV_DIV6,
    );

    // Switch over once the PLL reports lock
    mmio::write(SYSCTL_MISC, RIS_PLLLRIS);
    poll_until(PLL_LOCK_POLL_BOUND, || {
        mmio::read(SYSCTL_RIS) & RIS_PLLLRIS != 0
    })?;
    mmio::clear_bits(SYSCTL_RCC2, RCC2_BYPASS2);

    Ok(SystemClock::new(SYSTEM_CLOCK_HZ))
}
