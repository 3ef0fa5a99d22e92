//! Lockstep secure node firmware
//!
//! Boot flow: bring up the peripherals, gather the boot seed, then run
//! the demonstration loop. The real protocol layer replaces the loop;
//! everything up to it is the production boot path.

#![no_std]
#![no_main]

use cortex_m_rt::entry;
use defmt::info;
use embedded_hal::delay::DelayNs;
use {defmt_rtt as _, panic_probe as _};

use lockstep_core::entropy;
use lockstep_hal::gpio::OutputPin;
use lockstep_hal::timer::{DelayTimer, TickCounter};
use lockstep_hal::uart::SerialLink;
use lockstep_hal_tm4c123::bringup;

/// Heartbeat LED period
const HEARTBEAT_PERIOD_US: u32 = 500_000;

#[entry]
fn main() -> ! {
    let mut node = match bringup::init() {
        Ok(node) => node,
        Err(err) => defmt::panic!("bringup failed: {}", err),
    };
    info!("peripherals up, system clock {} Hz", node.clock.hz());

    // Lamp test while the rest of boot runs
    node.leds.red.set_high();
    node.spin.delay_ms(100);
    node.leds.red.set_low();

    let seed = match entropy::boot_seed(&mut node.sampler, &node.ticks) {
        Ok(seed) => seed,
        Err(err) => defmt::panic!("entropy gathering failed: {}", err),
    };
    info!("boot seed gathered ({} bytes)", seed.len());

    // Demonstration loop: heartbeat paced by the delay timer, host
    // bytes serviced while the countdown runs out.
    loop {
        if let Err(err) = node.delay.start(HEARTBEAT_PERIOD_US) {
            defmt::panic!("delay timer fault: {}", err);
        }

        while node.delay.is_armed() {
            while node.host.has_byte() {
                let byte = node.host.read_byte();
                node.host.write_byte(byte);
            }
        }

        if let Err(err) = node.delay.wait() {
            defmt::panic!("delay timer fault: {}", err);
        }
        node.leds.green.toggle();

        if node.switch.is_pressed() {
            info!("SW1 pressed at tick {}", node.ticks.now());
        }
    }
}
