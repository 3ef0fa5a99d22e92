//! One-time peripheral bringup
//!
//! [`init`] runs exactly once at boot and returns a [`Node`] owning one
//! handle per peripheral. Every hardware singleton in this crate is
//! constructed here and nowhere else, so holding a handle is proof of
//! exclusive access; a second `init` call is rejected rather than
//! re-running clock configuration over live peripherals.

use core::sync::atomic::{AtomicBool, Ordering};

use lockstep_core::poll::poll_until;
use lockstep_core::timebase::SystemClock;
use lockstep_hal::uart::UartConfig;

use crate::adc::{Adc0Regs, TempSampler};
use crate::eeprom::{Eeprom, Eeprom0Regs, EepromRegs, STARTUP_POLL_BOUND};
use crate::gpio::{self, StatusLeds, Sw1};
use crate::sysctl::{self, Peripheral};
use crate::timer::{FreeRunning, OneShot, SpinDelay, Timer0Regs, Wtimer0Regs};
use crate::uart::{Uart, UartRegs};

static TAKEN: AtomicBool = AtomicBool::new(false);

/// PA0/PA1 carry the host link, PB0/PB1 the board link
const UART_PINS: u8 = 0b0000_0011;

/// Errors from the bringup sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BringupError {
    /// `init` was already called
    AlreadyTaken,
    /// The PLL never reported lock
    ClockTimeout,
    /// A peripheral clock domain never became ready
    NotReady(Peripheral),
    /// EEPROM power-up recovery failed
    StorageFault,
}

/// Every peripheral handle of a brought-up node
///
/// Each hardware field is the only live handle to its peripheral.
/// Consumers borrow what they need; the peripheral handles are neither
/// `Copy` nor re-constructible.
pub struct Node {
    /// Operating clock frequency established by clock-tree bringup
    pub clock: SystemClock,
    /// One-shot microsecond delay timer (TIMER0)
    pub delay: OneShot<Timer0Regs>,
    /// Free-running tick counter (WTIMER0)
    pub ticks: FreeRunning<Wtimer0Regs>,
    /// Batched temperature entropy sampler (ADC0)
    pub sampler: TempSampler<Adc0Regs>,
    /// Host link (UART0)
    pub host: Uart<UartRegs>,
    /// Board link (UART1), drained during bringup
    pub board: Uart<UartRegs>,
    /// Persistent word storage (EEPROM)
    pub storage: Eeprom<Eeprom0Regs>,
    /// SW1 user switch
    pub switch: Sw1,
    /// Tri-color status LED
    pub leds: StatusLeds,
    /// Cycle-calibrated spin delay
    pub spin: SpinDelay,
}

/// Bring every peripheral to its operating state
///
/// Must complete before any other component is used. The order matters:
/// the clock tree comes first because every later divisor and every
/// conversion derives from it; the board link is configured last and
/// drained so the protocol layer starts from a clean receive state.
pub fn init() -> Result<Node, BringupError> {
    if TAKEN.swap(true, Ordering::SeqCst) {
        return Err(BringupError::AlreadyTaken);
    }

    let clock = sysctl::configure_system_clock().map_err(|_| BringupError::ClockTimeout)?;

    // Temperature entropy sampler
    enable(Peripheral::Adc0)?;
    let mut adc = Adc0Regs::new();
    adc.configure_temperature_batch();
    let sampler = TempSampler::new(adc);

    // One-shot delay timer
    enable(Peripheral::Timer0)?;
    let mut timer0 = Timer0Regs::new();
    timer0.configure_one_shot();
    let delay = OneShot::new(timer0, clock);

    // Free-running tick counter
    enable(Peripheral::WideTimer0)?;
    let mut wtimer0 = Wtimer0Regs::new();
    wtimer0.configure_free_running();
    let ticks = FreeRunning::new(wtimer0);

    // Persistent storage
    enable(Peripheral::Eeprom)?;
    let eeprom_regs = Eeprom0Regs::new();
    poll_until(STARTUP_POLL_BOUND, || !eeprom_regs.busy())
        .map_err(|_| BringupError::NotReady(Peripheral::Eeprom))?;
    if eeprom_regs.copy_buffer_faulted() {
        return Err(BringupError::StorageFault);
    }
    let storage = Eeprom::new(eeprom_regs);

    // Host link
    enable(Peripheral::Uart0)?;
    enable(Peripheral::GpioA)?;
    gpio::configure_uart_pins(gpio::GPIOA_BASE, UART_PINS);
    let mut host_regs = UartRegs::uart0();
    host_regs.apply(UartConfig::default(), clock);
    let host = Uart::new(host_regs);

    // Board link, drained of anything buffered before this boot
    enable(Peripheral::Uart1)?;
    enable(Peripheral::GpioB)?;
    gpio::configure_uart_pins(gpio::GPIOB_BASE, UART_PINS);
    let mut board_regs = UartRegs::uart1();
    board_regs.apply(UartConfig::default(), clock);
    let mut board = Uart::new(board_regs);
    board.drain();

    // User switch and status LEDs
    enable(Peripheral::GpioF)?;
    let switch = Sw1::configure();
    let leds = StatusLeds::configure();

    Ok(Node {
        clock,
        delay,
        ticks,
        sampler,
        host,
        board,
        storage,
        switch,
        leds,
        spin: SpinDelay::new(clock),
    })
}

fn enable(peripheral: Peripheral) -> Result<(), BringupError> {
    sysctl::enable_peripheral(peripheral).map_err(|_| BringupError::NotReady(peripheral))
}
