//! Host and board serial links
//!
//! UART0 carries the host link, UART1 the board link; both run the
//! node's fixed 115200 8N1 line configuration with FIFOs enabled. The
//! board link is drained once right after configuration so the protocol
//! layer starts from a clean receive state.

use lockstep_core::timebase::SystemClock;
use lockstep_hal::uart::{DataBits, Parity, SerialLink, StopBits, UartConfig};

use crate::mmio;

const UART0_BASE: u32 = 0x4000_C000;
const UART1_BASE: u32 = 0x4000_D000;

// UART register offsets
const UART_DR: u32 = 0x000;
const UART_FR: u32 = 0x018;
const UART_IBRD: u32 = 0x024;
const UART_FBRD: u32 = 0x028;
const UART_LCRH: u32 = 0x02C;
const UART_CTL: u32 = 0x030;

// Flag register
const FR_RXFE: u32 = 1 << 4;
const FR_TXFF: u32 = 1 << 5;

// Line control
const LCRH_PEN: u32 = 1 << 1;
const LCRH_EPS: u32 = 1 << 2;
const LCRH_STP2: u32 = 1 << 3;
const LCRH_FEN: u32 = 1 << 4;
const LCRH_WLEN_SHIFT: u32 = 5;

// Control
const CTL_UARTEN: u32 = 1 << 0;
const CTL_TXE: u32 = 1 << 8;
const CTL_RXE: u32 = 1 << 9;

/// Register operations of one UART's data path
pub trait FifoRegs {
    /// Whether the receive FIFO is empty
    fn rx_empty(&self) -> bool;
    /// Whether the transmit FIFO is full
    fn tx_full(&self) -> bool;
    /// Pop one entry from the receive FIFO
    fn read_data(&mut self) -> u32;
    /// Push one byte into the transmit FIFO
    fn write_data(&mut self, byte: u8);
}

/// Fixed-address register file of one UART peripheral
pub struct UartRegs {
    base: u32,
}

impl UartRegs {
    pub(crate) const fn uart0() -> Self {
        Self { base: UART0_BASE }
    }

    pub(crate) const fn uart1() -> Self {
        Self { base: UART1_BASE }
    }

    /// Apply a line configuration against the given system clock
    pub(crate) fn apply(&mut self, config: UartConfig, clock: SystemClock) {
        mmio::clear_bits(self.base + UART_CTL, CTL_UARTEN);
        let (ibrd, fbrd) = baud_divisors(clock.hz(), config.baudrate);
        mmio::write(self.base + UART_IBRD, ibrd);
        mmio::write(self.base + UART_FBRD, fbrd);
        mmio::write(self.base + UART_LCRH, lcrh_bits(config) | LCRH_FEN);
        mmio::write(self.base + UART_CTL, CTL_UARTEN | CTL_TXE | CTL_RXE);
    }
}

impl FifoRegs for UartRegs {
    fn rx_empty(&self) -> bool {
        mmio::read(self.base + UART_FR) & FR_RXFE != 0
    }

    fn tx_full(&self) -> bool {
        mmio::read(self.base + UART_FR) & FR_TXFF != 0
    }

    fn read_data(&mut self) -> u32 {
        mmio::read(self.base + UART_DR)
    }

    fn write_data(&mut self, byte: u8) {
        mmio::write(self.base + UART_DR, byte as u32);
    }
}

/// Integer baud-rate divisor pair for the 16x oversampling clock
///
/// `BRD = clock / (16 * baud)`; the fractional part lands in the 6-bit
/// FBRD register, rounded to nearest.
pub(crate) fn baud_divisors(clock_hz: u32, baud: u32) -> (u32, u32) {
    let denom = 16 * baud;
    let ibrd = clock_hz / denom;
    let rem = clock_hz % denom;
    let fbrd = (rem * 64 + denom / 2) / denom;
    (ibrd, fbrd)
}

/// Line-control bits for a [`UartConfig`]
pub(crate) fn lcrh_bits(config: UartConfig) -> u32 {
    let wlen = match config.data_bits {
        DataBits::Seven => 0x2,
        DataBits::Eight => 0x3,
    };
    let mut bits = wlen << LCRH_WLEN_SHIFT;
    match config.parity {
        Parity::None => {}
        Parity::Odd => bits |= LCRH_PEN,
        Parity::Even => bits |= LCRH_PEN | LCRH_EPS,
    }
    if config.stop_bits == StopBits::Two {
        bits |= LCRH_STP2;
    }
    bits
}

/// Byte-level serial channel over one UART
///
/// Two instances exist on a node - the host link (UART0) and the board
/// link (UART1) - both constructed once by bringup.
pub struct Uart<R: FifoRegs> {
    regs: R,
}

impl<R: FifoRegs> Uart<R> {
    pub(crate) fn new(regs: R) -> Self {
        Self { regs }
    }

    /// Discard every byte currently buffered on the receive side
    ///
    /// Run once at bringup on the board link so stale bytes from before
    /// a reset cannot leak into the protocol's first exchange.
    pub fn drain(&mut self) {
        while self.has_byte() {
            let _ = self.read_byte();
        }
    }
}

impl<R: FifoRegs> SerialLink for Uart<R> {
    fn has_byte(&self) -> bool {
        !self.regs.rx_empty()
    }

    fn read_byte(&mut self) -> u8 {
        while self.regs.rx_empty() {}
        (self.regs.read_data() & 0xFF) as u8
    }

    fn write_byte(&mut self, byte: u8) {
        while self.regs.tx_full() {}
        self.regs.write_data(byte);
    }
}
