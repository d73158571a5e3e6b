//! Twinwire - bit-banged I2C console firmware
//!
//! Main firmware binary for RP2040 boards. Drives an AHT10/AHT20 sensor
//! over two plain GPIOs and exposes a command console on UART0.

#![no_std]
#![no_main]

use defmt::*;
use embassy_executor::Spawner;
use embassy_rp::bind_interrupts;
use embassy_rp::gpio::{Level, Output};
use embassy_rp::peripherals::UART0;
use embassy_rp::uart::{BufferedInterruptHandler, Config as UartConfig, Uart};
use embassy_time::Delay;
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use twinwire_console::Console;
use twinwire_core::config::{parse_config, BoardConfig};
use twinwire_core::BitBangI2c;
use twinwire_hal_rp2040::{FlexLines, PinBank, PinBankPeripherals};

use crate::board::PicoBoard;

mod board;
mod tasks;

/// Embedded board configuration (compiled into firmware)
/// Edit board.toml and rebuild to customize
const EMBEDDED_CONFIG: &str = include_str!("../board.toml");

bind_interrupts!(struct Irqs {
    UART0_IRQ => BufferedInterruptHandler<UART0>;
});

// Static cells for UART buffers (must live forever)
static TX_BUF: StaticCell<[u8; 512]> = StaticCell::new();
static RX_BUF: StaticCell<[u8; 64]> = StaticCell::new();

/// Main entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Twinwire firmware starting...");

    let p = embassy_rp::init(Default::default());
    let config = load_config();

    // Fixed-function pins come out first, the bus pins follow the config
    let (mut pins, rest) = PinBankPeripherals::from_peripherals(p);
    let tx_pin = unwrap!(pins.pin0.take());
    let rx_pin = unwrap!(pins.pin1.take());
    let led_pin = unwrap!(pins.pin25.take());
    let mut bank = PinBank::new(&mut pins);

    let scl = unwrap!(bank.take(config.bus.scl.pin));
    let sda = unwrap!(bank.take(config.bus.sda.pin));
    let pull_up = config.bus.scl.pull_up || config.bus.sda.pull_up;
    let lines = FlexLines::new(scl, sda, pull_up);
    info!(
        "I2C on SCL=GPIO{} SDA=GPIO{}, half cycle {} ns, internal pull-ups {}",
        config.bus.scl.pin, config.bus.sda.pin, config.bus.half_cycle_ns, pull_up
    );

    let i2c = BitBangI2c::new(lines, Delay, config.bus.timing());
    let board = PicoBoard::new(Output::new(led_pin, Level::Low));
    let console = Console::new(i2c, Delay, board, &config);

    let mut uart_config = UartConfig::default();
    uart_config.baudrate = config.console.baudrate;

    let tx_buf = TX_BUF.init([0u8; 512]);
    let rx_buf = RX_BUF.init([0u8; 64]);

    let uart = Uart::new_blocking(rest.uart0, tx_pin, rx_pin, uart_config);
    let uart = uart.into_buffered(Irqs, tx_buf, rx_buf);
    let (tx, rx) = uart.split();
    info!("UART0 console at {} baud", config.console.baudrate);

    spawner.spawn(tasks::console_task(console, tx, rx)).unwrap();

    info!("Console task spawned, firmware running");

    loop {
        embassy_time::Timer::after_secs(60).await;
        trace!("Main loop heartbeat");
    }
}

/// Parse the embedded board config, falling back to defaults
fn load_config() -> BoardConfig {
    match parse_config(EMBEDDED_CONFIG) {
        Ok(config) => {
            info!("Board config loaded");
            config
        }
        Err(e) => {
            error!("Invalid board config: {:?}, using defaults", e);
            BoardConfig::default()
        }
    }
}
