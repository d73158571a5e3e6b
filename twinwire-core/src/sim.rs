//! Simulated open-drain bus
//!
//! An electrical model of the two wires with one or more slave devices
//! attached, for exercising the engine (and drivers built on it) on the
//! host. The wires are the wired-AND of what the master releases, what the
//! slaves pull low and whether pull-ups are fitted. Slaves react only to
//! clock edges and START/STOP conditions, the same way real devices do:
//!
//! - rising clock: a receiving slave samples data
//! - falling clock: a transmitting slave puts the next bit on data, or
//!   pulls data low to acknowledge
//! - data falling while clock is high: START (or repeated START)
//! - data rising while clock is high: STOP
//!
//! Faults can be injected: missing pull-ups, a clock held low forever, a
//! clock stretched for a number of polls, and a data line jammed low for a
//! number of clock pulses.

use embedded_hal::delay::DelayNs;
use heapless::{Deque, Vec};
use twinwire_hal::{LineLevels, LinePort, LineState};

/// Jam count that never runs out
pub const JAM_FOREVER: u32 = u32::MAX;

/// Device model attached to a [`SimBus`]
pub trait SimTarget {
    /// 7-bit address the device answers to
    fn address(&self) -> u8;

    /// Called when the device sees its address; return `true` to ACK
    fn select(&mut self, _read: bool) -> bool {
        true
    }

    /// Byte received from the master; return `true` to ACK
    fn write(&mut self, byte: u8) -> bool;

    /// Next byte to transmit to the master
    fn read(&mut self) -> u8;

    /// The transfer ended with STOP or a repeated START
    fn finish(&mut self) {}
}

/// Protocol phase of the addressed slave
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Waiting for START
    Idle,
    /// Receiving the address byte
    Address,
    /// Driving the address acknowledgment
    AddressAck,
    /// Receiving a data byte
    Write,
    /// Driving (or withholding) a data acknowledgment
    WriteAck { acked: bool },
    /// Transmitting a data byte
    Read,
    /// Waiting for the master's acknowledgment
    MasterAck,
    /// Not addressed, or transfer refused; waiting for START/STOP
    Ignore,
}

/// Simulated bus with up to `N` devices
pub struct SimBus<T, const N: usize = 4> {
    targets: Vec<T, N>,
    master: LineState,
    wire: LineLevels,
    pullups: bool,
    scl_held: bool,
    stretch_per_ack: u32,
    stretch_remaining: u32,
    sda_jam: u32,
    slave_sda_low: bool,
    phase: Phase,
    active: Option<usize>,
    read_mode: bool,
    shift: u8,
    bits: u8,
    master_acked: bool,
    writes: usize,
    reads: usize,
    starts: usize,
    stops: usize,
    clock_pulses: usize,
    addressed: usize,
}

impl<T: SimTarget, const N: usize> Default for SimBus<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: SimTarget, const N: usize> SimBus<T, N> {
    /// Create an empty bus with pull-ups fitted
    pub fn new() -> Self {
        Self {
            targets: Vec::new(),
            master: LineState::IDLE,
            wire: LineLevels {
                scl: true,
                sda: true,
            },
            pullups: true,
            scl_held: false,
            stretch_per_ack: 0,
            stretch_remaining: 0,
            sda_jam: 0,
            slave_sda_low: false,
            phase: Phase::Idle,
            active: None,
            read_mode: false,
            shift: 0,
            bits: 0,
            master_acked: false,
            writes: 0,
            reads: 0,
            starts: 0,
            stops: 0,
            clock_pulses: 0,
            addressed: 0,
        }
    }

    /// Create a bus with a single device
    pub fn with_target(target: T) -> Self {
        let mut bus = Self::new();
        let _ = bus.attach(target);
        bus
    }

    /// Attach a device; gives it back if the bus is full
    pub fn attach(&mut self, target: T) -> Result<(), T> {
        self.targets.push(target)
    }

    /// Attached devices
    pub fn targets(&self) -> &[T] {
        &self.targets
    }

    /// Fit or remove the pull-up resistors
    pub fn set_pullups(&mut self, fitted: bool) {
        self.pullups = fitted;
        self.update();
    }

    /// Hold the clock low forever (or let it go)
    pub fn hold_scl(&mut self, held: bool) {
        self.scl_held = held;
        self.update();
    }

    /// Stretch the clock for `polls` line reads whenever a device acknowledges
    pub fn set_stretch(&mut self, polls: u32) {
        self.stretch_per_ack = polls;
    }

    /// Jam the data line low for the next `pulses` falling clock edges
    pub fn jam_sda(&mut self, pulses: u32) {
        self.sda_jam = pulses;
        self.update();
    }

    /// What the master is currently driving
    pub fn master_state(&self) -> LineState {
        self.master
    }

    /// Current wire levels, without counting a read
    pub fn wire(&self) -> LineLevels {
        self.wire
    }

    /// Check that both wires are high and no device is mid-transfer
    pub fn is_idle(&self) -> bool {
        self.wire.scl && self.wire.sda && matches!(self.phase, Phase::Idle | Phase::Ignore)
    }

    /// Number of port writes
    pub fn writes(&self) -> usize {
        self.writes
    }

    /// Number of port reads
    pub fn reads(&self) -> usize {
        self.reads
    }

    /// Number of START conditions seen (including repeated STARTs)
    pub fn starts(&self) -> usize {
        self.starts
    }

    /// Number of STOP conditions seen
    pub fn stops(&self) -> usize {
        self.stops
    }

    /// Number of rising clock edges seen
    pub fn clock_pulses(&self) -> usize {
        self.clock_pulses
    }

    /// Number of complete address bytes seen
    pub fn addressed(&self) -> usize {
        self.addressed
    }

    fn compute_wire(&self) -> LineLevels {
        LineLevels {
            scl: self.pullups
                && self.master.scl_released
                && !self.scl_held
                && self.stretch_remaining == 0,
            sda: self.pullups && self.master.sda_released && !self.slave_sda_low && self.sda_jam == 0,
        }
    }

    fn update(&mut self) {
        let old = self.wire;
        let new = self.compute_wire();
        self.wire = new;

        if old.scl && new.scl {
            if old.sda && !new.sda {
                self.on_start();
            } else if !old.sda && new.sda {
                self.on_stop();
            }
        } else if !old.scl && new.scl {
            self.clock_pulses += 1;
            self.on_rising(new.sda);
        } else if old.scl && !new.scl {
            self.on_falling();
        }

        self.wire = self.compute_wire();
    }

    fn end_transfer(&mut self) {
        if let Some(index) = self.active.take() {
            self.targets[index].finish();
        }
        self.slave_sda_low = false;
        self.shift = 0;
        self.bits = 0;
    }

    fn on_start(&mut self) {
        self.starts += 1;
        self.end_transfer();
        self.phase = Phase::Address;
    }

    fn on_stop(&mut self) {
        self.stops += 1;
        self.end_transfer();
        self.phase = Phase::Idle;
    }

    fn on_rising(&mut self, sda: bool) {
        match self.phase {
            Phase::Address | Phase::Write => {
                self.shift = (self.shift << 1) | sda as u8;
                self.bits += 1;
            }
            Phase::MasterAck => self.master_acked = !sda,
            _ => {}
        }
    }

    fn drive_bit(&mut self) {
        self.slave_sda_low = self.shift & (0x80 >> self.bits) == 0;
        self.bits += 1;
    }

    fn load_read_byte(&mut self, index: usize) {
        self.shift = self.targets[index].read();
        self.bits = 0;
        self.drive_bit();
        self.phase = Phase::Read;
    }

    fn stretch(&mut self) {
        self.stretch_remaining = self.stretch_per_ack;
    }

    fn on_falling(&mut self) {
        if self.sda_jam > 0 && self.sda_jam != JAM_FOREVER {
            self.sda_jam -= 1;
        }

        match self.phase {
            Phase::Address if self.bits == 8 => {
                self.addressed += 1;
                let address = self.shift >> 1;
                let read = self.shift & 0x01 != 0;
                let selected = self
                    .targets
                    .iter()
                    .position(|t| t.address() == address)
                    .filter(|&i| self.targets[i].select(read));
                match selected {
                    Some(i) => {
                        self.active = Some(i);
                        self.read_mode = read;
                        self.slave_sda_low = true;
                        self.phase = Phase::AddressAck;
                        self.stretch();
                    }
                    None => self.phase = Phase::Ignore,
                }
            }
            Phase::AddressAck => {
                self.slave_sda_low = false;
                match (self.active, self.read_mode) {
                    (Some(i), true) => self.load_read_byte(i),
                    _ => {
                        self.shift = 0;
                        self.bits = 0;
                        self.phase = Phase::Write;
                    }
                }
            }
            Phase::Write if self.bits == 8 => {
                let acked = match self.active {
                    Some(i) => self.targets[i].write(self.shift),
                    None => false,
                };
                self.slave_sda_low = acked;
                self.phase = Phase::WriteAck { acked };
                if acked {
                    self.stretch();
                }
            }
            Phase::WriteAck { acked } => {
                self.slave_sda_low = false;
                self.shift = 0;
                self.bits = 0;
                self.phase = if acked { Phase::Write } else { Phase::Ignore };
            }
            Phase::Read if self.bits == 8 => {
                self.slave_sda_low = false;
                self.phase = Phase::MasterAck;
            }
            Phase::Read => self.drive_bit(),
            Phase::MasterAck => match self.active {
                Some(i) if self.master_acked => self.load_read_byte(i),
                _ => {
                    self.slave_sda_low = false;
                    self.phase = Phase::Ignore;
                }
            },
            _ => {}
        }
    }
}

impl<T: SimTarget, const N: usize> LinePort for SimBus<T, N> {
    fn write_lines(&mut self, state: LineState) {
        self.writes += 1;
        self.master = state;
        self.update();
    }

    fn read_lines(&mut self) -> LineLevels {
        self.reads += 1;
        if self.stretch_remaining > 0 {
            self.stretch_remaining -= 1;
            self.update();
        }
        self.wire
    }
}

/// Device that hands back what was written to it
///
/// Bytes are queued on write and dequeued on read; an empty queue reads
/// as 0xFF, like a released data line.
pub struct Echo {
    address: u8,
    queue: Deque<u8, 16>,
    transfers: usize,
}

impl Echo {
    /// Create an echo device at an address
    pub fn new(address: u8) -> Self {
        Self {
            address,
            queue: Deque::new(),
            transfers: 0,
        }
    }

    /// Number of finished transfers
    pub fn transfers(&self) -> usize {
        self.transfers
    }

    /// Bytes waiting to be read back
    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}

impl SimTarget for Echo {
    fn address(&self) -> u8 {
        self.address
    }

    fn write(&mut self, byte: u8) -> bool {
        self.queue.push_back(byte).is_ok()
    }

    fn read(&mut self) -> u8 {
        self.queue.pop_front().unwrap_or(0xFF)
    }

    fn finish(&mut self) {
        self.transfers += 1;
    }
}

/// Delay that only accumulates simulated time
#[derive(Debug, Default, Clone, Copy)]
pub struct SimDelay {
    elapsed_ns: u64,
}

impl SimDelay {
    /// Create a delay at time zero
    pub const fn new() -> Self {
        Self { elapsed_ns: 0 }
    }

    /// Total simulated time in nanoseconds
    pub fn elapsed_ns(&self) -> u64 {
        self.elapsed_ns
    }

    /// Total simulated time in milliseconds
    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ns / 1_000_000
    }
}

impl DelayNs for SimDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.elapsed_ns += ns as u64;
    }
}
