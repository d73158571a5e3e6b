//! Console UART task
//!
//! Feeds received bytes to the console one at a time. Commands run to
//! completion inside the feed, bit-banging the bus with blocking delays,
//! so nothing else on this executor runs while a command is active.

use defmt::*;
use embassy_rp::uart::{BufferedUartRx, BufferedUartTx};
use embassy_time::Delay;
use embedded_io_async::Read;

use twinwire_console::{Console, CrlfWriter};
use twinwire_hal_rp2040::FlexLines;

use crate::board::PicoBoard;

/// Buffer size for UART receive
const RX_BUF_SIZE: usize = 32;

/// Console wired to the board's pins and delays
pub type BoardConsole = Console<FlexLines<'static>, Delay, Delay, PicoBoard>;

/// Console task - reads the UART and runs commands
#[embassy_executor::task]
pub async fn console_task(mut console: BoardConsole, mut tx: BufferedUartTx, mut rx: BufferedUartRx) {
    info!("Console task started");

    if console.banner(&mut CrlfWriter::new(&mut tx)).is_err() {
        warn!("Failed to write console banner");
    }

    let mut buf = [0u8; RX_BUF_SIZE];

    loop {
        match rx.read(&mut buf).await {
            Ok(n) => {
                for &byte in &buf[..n] {
                    match console.feed(byte, &mut CrlfWriter::new(&mut tx)) {
                        Ok(Some(line)) => debug!("Command: {}", line.as_str()),
                        Ok(None) => {}
                        Err(_) => warn!("Console output failed"),
                    }
                }
            }
            Err(e) => {
                warn!("UART read error: {:?}", e);
            }
        }
    }
}
