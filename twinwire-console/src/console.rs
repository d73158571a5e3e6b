//! Command dispatcher
//!
//! Ties the line editor to the bus engine, the sensor session and the
//! board. Output goes to any [`core::fmt::Write`]; the firmware hands it
//! a UART writer, tests hand it a string.

use core::fmt::{self, Write};

use embedded_hal::delay::DelayNs;
use heapless::String;
use twinwire_core::bus::{BitBangI2c, BusError};
use twinwire_core::config::{BoardConfig, MAX_PROMPT_LEN};
use twinwire_core::{Address, LinePort};
use twinwire_drivers::sensor::{AhtError, AhtSession};

use crate::command::{Command, COMMANDS};
use crate::line::{Line, LineEditor};

/// Board services the console needs besides the bus
pub trait Board {
    /// Toggle the user LED and return its new state
    fn toggle_led(&mut self) -> bool;

    /// Reset the CPU
    fn reboot(&mut self);
}

/// Fixed-point value in hundredths, printed as `-3.25`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Centi(pub i32);

impl fmt::Display for Centi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
    }
}

/// Interactive console
pub struct Console<P, D, S, B> {
    i2c: BitBangI2c<P, D>,
    delay: S,
    sensor: AhtSession,
    board: B,
    editor: LineEditor,
    prompt: String<MAX_PROMPT_LEN>,
    scan_range: (Address, Address),
}

impl<P, D, S, B> Console<P, D, S, B>
where
    P: LinePort,
    D: DelayNs,
    S: DelayNs,
    B: Board,
{
    /// Create a console
    ///
    /// # Arguments
    /// - `i2c`: bus engine, already built from the board's bus settings
    /// - `delay`: delay for sensor settle and poll intervals
    /// - `board`: LED and reset
    /// - `config`: board configuration
    pub fn new(i2c: BitBangI2c<P, D>, delay: S, board: B, config: &BoardConfig) -> Self {
        Self {
            i2c,
            delay,
            sensor: AhtSession::new(config.sensor),
            board,
            editor: LineEditor::new(config.console.echo),
            prompt: config.console.prompt.clone(),
            scan_range: config.bus.scan_range(),
        }
    }

    /// Print the greeting, the command list and the first prompt
    pub fn banner<W: Write>(&mut self, out: &mut W) -> fmt::Result {
        writeln!(out)?;
        writeln!(out, "twinwire - bit-banged I2C console")?;
        self.help(out)?;
        self.prompt(out)
    }

    /// Feed one received byte
    ///
    /// When the byte completes a line, the command runs, a new prompt is
    /// printed and the line is returned.
    pub fn feed<W: Write>(&mut self, byte: u8, out: &mut W) -> Result<Option<Line>, fmt::Error> {
        let Some(line) = self.editor.feed(byte, out)? else {
            return Ok(None);
        };
        self.execute(&line, out)?;
        self.prompt(out)?;
        Ok(Some(line))
    }

    /// Run one command line
    pub fn execute<W: Write>(&mut self, line: &str, out: &mut W) -> fmt::Result {
        match Command::parse(line) {
            Command::Help => self.help(out),
            Command::Reboot => {
                writeln!(out, "rebooting...")?;
                self.board.reboot();
                Ok(())
            }
            Command::Led => {
                let on = self.board.toggle_led();
                writeln!(out, "toggling led... {}", if on { "on" } else { "off" })
            }
            Command::I2cCheck => self.i2c_check(out),
            Command::I2cScan => self.i2c_scan(out),
            Command::AhtProbe => self.aht_probe(out),
            Command::AhtInit => self.aht_init(out),
            Command::AhtMeasure => self.aht_measure(out),
            Command::Empty => Ok(()),
            Command::Unknown(word) => writeln!(out, "Unknown command: {} (try 'help')", word),
        }
    }

    fn prompt<W: Write>(&self, out: &mut W) -> fmt::Result {
        out.write_str(&self.prompt)
    }

    fn help<W: Write>(&self, out: &mut W) -> fmt::Result {
        writeln!(out, "Available commands:")?;
        for (name, description) in COMMANDS {
            writeln!(out, "{:<32}- {}", name, description)?;
        }
        Ok(())
    }

    fn i2c_check<W: Write>(&mut self, out: &mut W) -> fmt::Result {
        let levels = self.i2c.check_lines();
        let verdict = if levels.scl && levels.sda {
            "OK (pull-ups present)"
        } else {
            "ERROR (lines do not rise)"
        };
        writeln!(
            out,
            "I2C lines: SCL={} SDA={} -> {}",
            levels.scl as u8, levels.sda as u8, verdict
        )
    }

    fn i2c_scan<W: Write>(&mut self, out: &mut W) -> fmt::Result {
        writeln!(out, "I2C scan:")?;
        let (first, last) = self.scan_range;
        match self.i2c.scan_between(first, last) {
            Ok(found) if found.is_empty() => writeln!(out, "  No devices found"),
            Ok(found) => {
                for address in found.iter() {
                    writeln!(out, "  Found device at 0x{:02X}", address.get())?;
                }
                Ok(())
            }
            Err(e) => writeln!(out, "  Scan aborted: {}", e),
        }
    }

    fn aht_probe<W: Write>(&mut self, out: &mut W) -> fmt::Result {
        match self.sensor.probe(&mut self.i2c) {
            Ok(status) => writeln!(out, "AHT10 device found (status 0x{:02X})", status.0),
            Err(e) => probe_failed(out, &e),
        }
    }

    fn aht_init<W: Write>(&mut self, out: &mut W) -> fmt::Result {
        if let Err(e) = self.sensor.reset(&mut self.i2c, &mut self.delay) {
            return init_failed(out, &e);
        }
        if let Err(e) = self.sensor.probe(&mut self.i2c) {
            return probe_failed(out, &e);
        }
        match self.sensor.init(&mut self.i2c, &mut self.delay) {
            Ok(variant) => writeln!(out, "AHT10 initialized successfully ({})", variant.name()),
            Err(e) => init_failed(out, &e),
        }
    }

    fn aht_measure<W: Write>(&mut self, out: &mut W) -> fmt::Result {
        match self.sensor.measure(&mut self.i2c, &mut self.delay) {
            Ok(m) => writeln!(
                out,
                "AHT10: RH = {} %, Temp = {} C",
                Centi(i32::from(m.humidity_centi)),
                Centi(i32::from(m.temperature_centi))
            ),
            Err(e) => writeln!(out, "AHT10 failed with error code {}", e.code()),
        }
    }

    /// Bus engine
    pub fn i2c(&self) -> &BitBangI2c<P, D> {
        &self.i2c
    }

    /// Bus engine, mutably
    pub fn i2c_mut(&mut self) -> &mut BitBangI2c<P, D> {
        &mut self.i2c
    }

    /// Sensor session
    pub fn sensor(&self) -> &AhtSession {
        &self.sensor
    }

    /// Board services
    pub fn board(&self) -> &B {
        &self.board
    }
}

fn probe_failed<W: Write>(out: &mut W, e: &AhtError<BusError>) -> fmt::Result {
    writeln!(out, "AHT10 probe failed with error code {}", e.code())
}

fn init_failed<W: Write>(out: &mut W, e: &AhtError<BusError>) -> fmt::Result {
    writeln!(out, "AHT10 initialization failed with error code {}", e.code())
}

#[cfg(test)]
mod tests {
    use super::*;
    use twinwire_core::bus::BusTiming;
    use twinwire_core::config::parse_config;
    use twinwire_core::sim::{Echo, SimBus, SimDelay, SimTarget};
    use twinwire_drivers::sim::AhtModel;

    #[derive(Default)]
    struct TestBoard {
        led: bool,
        reboots: u8,
    }

    impl Board for TestBoard {
        fn toggle_led(&mut self) -> bool {
            self.led = !self.led;
            self.led
        }

        fn reboot(&mut self) {
            self.reboots += 1;
        }
    }

    type Out = String<2048>;

    fn console<T: SimTarget>(bus: SimBus<T>) -> Console<SimBus<T>, SimDelay, SimDelay, TestBoard> {
        let i2c = BitBangI2c::new(bus, SimDelay::new(), BusTiming::new(1_000, 50));
        Console::new(i2c, SimDelay::new(), TestBoard::default(), &BoardConfig::default())
    }

    fn run<T: SimTarget>(
        console: &mut Console<SimBus<T>, SimDelay, SimDelay, TestBoard>,
        input: &str,
    ) -> Out {
        let mut out = Out::new();
        for &b in input.as_bytes() {
            console.feed(b, &mut out).unwrap();
        }
        out
    }

    #[test]
    fn test_centi_formatting() {
        let mut s = String::<16>::new();
        write!(s, "{}", Centi(2534)).unwrap();
        assert_eq!(s.as_str(), "25.34");
        s.clear();
        write!(s, "{}", Centi(-325)).unwrap();
        assert_eq!(s.as_str(), "-3.25");
        s.clear();
        write!(s, "{}", Centi(-5)).unwrap();
        assert_eq!(s.as_str(), "-0.05");
        s.clear();
        write!(s, "{}", Centi(0)).unwrap();
        assert_eq!(s.as_str(), "0.00");
    }

    #[test]
    fn test_banner_lists_commands() {
        let mut c = console(SimBus::with_target(AhtModel::new(0xE1)));
        let mut out = Out::new();
        c.banner(&mut out).unwrap();
        for (name, _) in COMMANDS {
            assert!(out.contains(name));
        }
        assert!(out.ends_with("RUNTIME>"));
    }

    #[test]
    fn test_prompt_after_each_line() {
        let mut c = console(SimBus::with_target(AhtModel::new(0xE1)));
        let out = run(&mut c, "\r\r");
        assert_eq!(out.as_str(), "\nRUNTIME>\nRUNTIME>");
    }

    #[test]
    fn test_led_and_reboot() {
        let mut c = console(SimBus::with_target(AhtModel::new(0xE1)));
        let out = run(&mut c, "led\r");
        assert!(out.contains("toggling led... on"));
        assert!(c.board().led);
        run(&mut c, "reboot\r");
        assert_eq!(c.board().reboots, 1);
    }

    #[test]
    fn test_i2c_check() {
        let mut c = console(SimBus::with_target(AhtModel::new(0xE1)));
        let out = run(&mut c, "i2c_check\r");
        assert!(out.contains("I2C lines: SCL=1 SDA=1 -> OK (pull-ups present)"));

        let mut bus = SimBus::with_target(AhtModel::new(0xE1));
        bus.set_pullups(false);
        let mut c = console(bus);
        let out = run(&mut c, "i2c_check\r");
        assert!(out.contains("SCL=0 SDA=0 -> ERROR (lines do not rise)"));
    }

    #[test]
    fn test_i2c_scan() {
        let mut bus = SimBus::new();
        bus.attach(Echo::new(0x38)).ok();
        bus.attach(Echo::new(0x77)).ok();
        let mut c = console(bus);
        let out = run(&mut c, "i2c_scan\r");
        assert!(out.contains("I2C scan:\n  Found device at 0x38\n  Found device at 0x77\n"));

        let mut c = console(SimBus::<Echo>::new());
        let out = run(&mut c, "i2c_scan\r");
        assert!(out.contains("  No devices found"));

        let mut bus = SimBus::<Echo>::new();
        bus.hold_scl(true);
        let mut c = console(bus);
        let out = run(&mut c, "i2c_scan\r");
        assert!(out.contains("  Scan aborted: SCL did not rise"));
    }

    #[test]
    fn test_aht_session_commands() {
        let mut c = console(SimBus::with_target(AhtModel::new(0xBE)));

        let out = run(&mut c, "aht10_probe\r");
        assert!(out.contains("AHT10 device found (status 0x00)"));

        let out = run(&mut c, "aht10_init\r");
        assert!(out.contains("AHT10 initialized successfully (AHT20)"));

        let out = run(&mut c, "aht10\r");
        assert!(out.contains("AHT10: RH = 50.00 %, Temp = 25.00 C"));
    }

    #[test]
    fn test_negative_temperature() {
        // a quarter of full scale (0x40000) reads 0 C
        let raw_t = 0x3F000;
        let mut c = console(SimBus::with_target(AhtModel::new(0xE1).with_raw(0, raw_t)));
        let out = run(&mut c, "aht10\r");
        assert!(out.contains("AHT10: RH = 0.00 %, Temp = -0.78 C"));
    }

    #[test]
    fn test_aht_errors_print_codes() {
        let mut c = console(SimBus::<Echo>::new());
        let out = run(&mut c, "aht10_probe\r");
        assert!(out.contains("AHT10 probe failed with error code -1"));
        let out = run(&mut c, "aht10_init\r");
        assert!(out.contains("AHT10 initialization failed with error code -1"));
        let out = run(&mut c, "aht10\r");
        assert!(out.contains("AHT10 failed with error code -1"));

        let mut bus = SimBus::with_target(AhtModel::new(0xE1));
        bus.hold_scl(true);
        let mut c = console(bus);
        let out = run(&mut c, "aht10\r");
        assert!(out.contains("AHT10 failed with error code -10"));
    }

    #[test]
    fn test_unknown_command() {
        let mut c = console(SimBus::<Echo>::new());
        let out = run(&mut c, "frobnicate 3\r");
        assert!(out.contains("Unknown command: frobnicate"));
    }

    #[test]
    fn test_config_drives_prompt_and_scan_range() {
        let config = parse_config("[bus]\nscan_first = 0x40\n[console]\nprompt = \"> \"\necho = false\n")
            .unwrap();
        let mut bus = SimBus::new();
        bus.attach(Echo::new(0x38)).ok();
        bus.attach(Echo::new(0x50)).ok();
        let i2c = BitBangI2c::new(bus, SimDelay::new(), config.bus.timing());
        let mut c = Console::new(i2c, SimDelay::new(), TestBoard::default(), &config);

        let out = run(&mut c, "i2c_scan\r");
        assert!(!out.contains("0x38"));
        assert!(out.contains("Found device at 0x50"));
        assert!(out.starts_with("I2C scan:"));
        assert!(out.ends_with("> "));
    }

    #[test]
    fn test_firmware_board_file_matches_defaults() {
        let config = parse_config(include_str!("../../twinwire-firmware/board.toml")).unwrap();
        assert_eq!(config, BoardConfig::default());
    }
}
