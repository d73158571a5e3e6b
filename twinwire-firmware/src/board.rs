//! Board services for the console

use embassy_rp::gpio::Output;
use twinwire_console::Board;

/// Raspberry Pi Pico style board: one LED, software reset
pub struct PicoBoard {
    led: Output<'static>,
}

impl PicoBoard {
    pub fn new(led: Output<'static>) -> Self {
        Self { led }
    }
}

impl Board for PicoBoard {
    fn toggle_led(&mut self) -> bool {
        self.led.toggle();
        self.led.is_set_high()
    }

    fn reboot(&mut self) {
        defmt::info!("Reboot requested from console");
        cortex_m::peripheral::SCB::sys_reset();
    }
}
