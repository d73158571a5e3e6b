//! Console commands

/// A parsed command line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command<'a> {
    /// List the commands
    Help,
    /// Reset the CPU
    Reboot,
    /// Toggle the board LED
    Led,
    /// Report the idle levels of both bus lines
    I2cCheck,
    /// Probe every address in the scan range
    I2cScan,
    /// Probe the sensor's write and read addresses
    AhtProbe,
    /// Reset, probe and calibrate the sensor
    AhtInit,
    /// Take one measurement
    AhtMeasure,
    /// Blank line
    Empty,
    /// First word did not match any command
    Unknown(&'a str),
}

/// Name and description of every command, in `help` order
pub const COMMANDS: &[(&str, &str)] = &[
    ("help", "this command"),
    ("reboot", "reboot CPU"),
    ("led", "led test"),
    ("i2c_check", "check I2C lines levels (pull-ups)"),
    ("i2c_scan", "scan I2C bus for devices"),
    ("aht10_probe", "probe AHT10 sensor"),
    ("aht10_init", "initialize AHT10 sensor"),
    ("aht10", "single measurement (RH, Temp)"),
];

impl<'a> Command<'a> {
    /// Parse a line; only the first space-separated word is looked at
    ///
    /// Spaces before that word are skipped.
    pub fn parse(line: &'a str) -> Self {
        let token = line.split(' ').find(|t| !t.is_empty()).unwrap_or("");
        match token {
            "" => Command::Empty,
            "help" => Command::Help,
            "reboot" => Command::Reboot,
            "led" => Command::Led,
            "i2c_check" => Command::I2cCheck,
            "i2c_scan" => Command::I2cScan,
            "aht10_probe" => Command::AhtProbe,
            "aht10_init" => Command::AhtInit,
            "aht10" => Command::AhtMeasure,
            other => Command::Unknown(other),
        }
    }
}
