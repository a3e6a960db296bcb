//! Bit-level model of a 64 Mbit SPI NOR flash.
//!
//! [`FlashDevice::tick`] is called on every half clock edge by the
//! simulation loop. Commands are sampled on rising SCK edges and the device
//! drives SDO on falling edges (SPI mode 0). Releasing chip select always
//! returns the part to idle.

mod fault;
mod image;
mod opcode;
mod page;
mod register;

use std::ops::{Index, IndexMut};

use tracing::{debug, trace};

use crate::bus::SpiPeripheral;

use self::page::PageBuffer;
use self::register::{AddressRegister, CommandRegister};

pub use self::fault::{Fault, Violation};
pub use self::image::ImageError;
pub use self::opcode::Command;
pub use self::opcode::{PP, RDSR, READ, SE, SLEEP, WAKE, WREN};

pub const ADDRESS_BITS: u8 = 24;
pub const PAGE_SIZE: usize = 256;
pub const BLOCK_SIZE: usize = 4096;
pub const MEMORY_SIZE: usize = 8 * 1024 * 1024;

/// Status register: write in progress. This model never reports busy.
pub const SR_WIP: u8 = 1 << 0;
/// Status register: write enable latch.
pub const SR_WEL: u8 = 1 << 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlashConfig {
    /// Value a block erase leaves behind.
    pub erase_value: u8,
    /// Power-on contents of the array.
    pub fill_value: u8,
    /// Log matched commands and resolved addresses.
    pub debug: bool,
}

impl Default for FlashConfig {
    fn default() -> Self {
        Self {
            erase_value: 0xFF,
            fill_value: 0x00,
            debug: false,
        }
    }
}

/// Transaction phase. Data phases carry the in-page byte offset and the
/// next bit (7..=0) of the byte being shifted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum State {
    Idle,
    Program { offset: u8, bit: u8 },
    Read { offset: u8, bit: u8 },
    Erase,
    Status { bit: u8 },
    WriteEnable,
    Sleep,
    Wake,
    Error,
}

impl From<Command> for State {
    fn from(command: Command) -> Self {
        match command {
            Command::Program => State::Program { offset: 0, bit: 7 },
            Command::Read => State::Read { offset: 0, bit: 7 },
            Command::Erase => State::Erase,
            Command::Status => State::Status { bit: 7 },
            Command::WriteEnable => State::WriteEnable,
            Command::Sleep => State::Sleep,
            Command::Wake => State::Wake,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Edge {
    Rising,
    Falling,
}

/// Clock edges seen since the last reset.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EdgeCount {
    pub rising: usize,
    pub falling: usize,
}

pub struct FlashDevice {
    config: FlashConfig,
    memory: Box<[u8]>,

    state: State,
    command: CommandRegister,
    address: AddressRegister,
    page_base: usize,
    page: PageBuffer,

    write_enabled: bool,
    sleeping: bool,

    last_sck: bool,
    sdo: bool,
    edges: EdgeCount,
    last_fault: Option<Fault>,
}

impl Default for FlashDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl FlashDevice {
    pub fn new() -> Self {
        Self::with_config(FlashConfig::default())
    }

    pub fn with_config(config: FlashConfig) -> Self {
        Self {
            memory: vec![config.fill_value; MEMORY_SIZE].into_boxed_slice(),
            config,
            state: State::Idle,
            command: CommandRegister::default(),
            address: AddressRegister::default(),
            page_base: 0,
            page: PageBuffer::new(),
            write_enabled: false,
            sleeping: false,
            last_sck: false,
            sdo: false,
            edges: EdgeCount::default(),
            last_fault: None,
        }
    }

    /// Advance the device by one bus edge and return the level it drives on
    /// SDO.
    ///
    /// - `sdi`: serial data from the bus owner
    /// - `sck`: serial clock level
    /// - `cs_n`: chip select, active low
    pub fn tick(&mut self, sdi: bool, sck: bool, cs_n: bool) -> bool {
        let edge = if sck != self.last_sck {
            self.last_sck = sck;
            Some(if sck { Edge::Rising } else { Edge::Falling })
        } else {
            None
        };

        if cs_n {
            self.deselect();
        } else if let Some(edge) = edge {
            match edge {
                Edge::Rising => self.edges.rising += 1,
                Edge::Falling => self.edges.falling += 1,
            }
            self.clock(edge, sdi);
        }

        self.sdo
    }

    fn clock(&mut self, edge: Edge, sdi: bool) {
        match (self.state, edge) {
            (State::Idle, Edge::Rising) => {
                if let Some(opcode) = self.command.shift(sdi) {
                    self.dispatch(opcode);
                }
            }
            (State::Program { offset, bit }, Edge::Rising) => {
                if self.address.is_complete() {
                    self.program_bit(offset, bit, sdi);
                } else {
                    self.shift_address(sdi);
                }
            }
            (State::Read { .. } | State::Erase, Edge::Rising) => {
                if !self.address.is_complete() {
                    self.shift_address(sdi);
                }
            }
            (State::Read { offset, bit }, Edge::Falling) => {
                if self.address.is_complete() {
                    self.read_bit(offset, bit);
                }
            }
            (State::Erase, Edge::Falling) => {
                if self.address.is_complete() {
                    self.erase_block();
                }
            }
            (State::Status { bit }, Edge::Falling) => {
                self.sdo = (self.status() >> bit) & 1 != 0;
            }
            (State::Status { bit }, Edge::Rising) => {
                if bit == 0 {
                    self.reset();
                } else {
                    self.state = State::Status { bit: bit - 1 };
                }
            }
            (State::WriteEnable, Edge::Rising) => self.unexpected_clock(Command::WriteEnable),
            (State::Sleep, Edge::Rising) => self.unexpected_clock(Command::Sleep),
            (State::Wake, Edge::Rising) => self.unexpected_clock(Command::Wake),
            _ => {}
        }
    }

    fn dispatch(&mut self, opcode: u8) {
        let command = match Command::try_from(opcode) {
            Ok(command) => command,
            Err(opcode) => return self.fault(Fault::UnknownOpcode(opcode)),
        };
        if self.config.debug {
            debug!("flash: command {command} ({:02X})", command.opcode());
        }

        if self.sleeping && !command.allowed_while_sleeping() {
            return self.fault(Fault::SleepViolation(command));
        }
        if command.requires_write_enable() && !self.write_enabled {
            return self.fault(Fault::PermissionDenied(command));
        }

        self.state = command.into();
    }

    fn fault(&mut self, fault: Fault) {
        trace!("flash: {fault}");
        self.last_fault = Some(fault);
        self.state = State::Error;
    }

    fn unexpected_clock(&mut self, command: Command) {
        self.fault(Fault::ProtocolViolation(Violation::UnexpectedClock(command)));
    }

    fn shift_address(&mut self, sdi: bool) {
        if self.address.shift(sdi) {
            let address = self.address.value() as usize & (MEMORY_SIZE - 1);
            self.page_base = address & !(PAGE_SIZE - 1);
            let start = (address % PAGE_SIZE) as u8;
            if let State::Program { offset, .. } | State::Read { offset, .. } = &mut self.state {
                *offset = start;
            }
            if self.config.debug {
                debug!(
                    "flash: address {:06X} (page offset {start})",
                    self.address.value()
                );
            }
        }
    }

    fn program_bit(&mut self, offset: u8, bit: u8, sdi: bool) {
        self.page.merge_bit(offset, bit, sdi);
        let (offset, bit) = next_bit(offset, bit);
        self.state = State::Program { offset, bit };
    }

    fn read_bit(&mut self, offset: u8, bit: u8) {
        let byte = self.memory[self.page_base + offset as usize];
        self.sdo = (byte >> bit) & 1 != 0;
        let (offset, bit) = next_bit(offset, bit);
        self.state = State::Read { offset, bit };
    }

    fn erase_block(&mut self) {
        let address = self.address.value() as usize & (MEMORY_SIZE - 1);
        let start = address & !(BLOCK_SIZE - 1);
        trace!("flash: erase {start:06X}..{:06X}", start + BLOCK_SIZE);
        self.memory[start..start + BLOCK_SIZE].fill(self.config.erase_value);
        self.write_enabled = false;
        self.reset();
    }

    fn commit_page(&mut self, bit: u8) {
        if bit != 7 {
            let violation = Violation::PartialByte { bits: 7 - bit };
            trace!("flash: {violation}");
            self.last_fault = Some(Fault::ProtocolViolation(violation));
        } else if !self.page.is_empty() {
            trace!("flash: program page {:06X}", self.page_base);
            for (offset, value) in self.page.iter() {
                self.memory[self.page_base + offset] = value;
            }
        }
        self.write_enabled = false;
    }

    /// Chip select released: apply any deferred effect and return to idle.
    fn deselect(&mut self) {
        match self.state {
            State::Program { bit, .. } => self.commit_page(bit),
            State::WriteEnable => self.write_enabled = true,
            State::Sleep => self.sleeping = true,
            State::Wake => self.sleeping = false,
            State::Idle
            | State::Read { .. }
            | State::Erase
            | State::Status { .. }
            | State::Error => {}
        }
        self.reset();
    }

    fn reset(&mut self) {
        self.state = State::Idle;
        self.command.clear();
        self.address.clear();
        self.page_base = 0;
        self.page.clear();
        self.sdo = false;
        self.edges = EdgeCount::default();
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// The status register as it would be shifted out right now.
    pub fn status(&self) -> u8 {
        if self.write_enabled { SR_WEL } else { 0 }
    }

    pub fn write_enabled(&self) -> bool {
        self.write_enabled
    }

    pub fn sleeping(&self) -> bool {
        self.sleeping
    }

    /// The most recent fault. Kept across resets until another fault occurs.
    pub fn last_fault(&self) -> Option<Fault> {
        self.last_fault
    }

    pub fn take_fault(&mut self) -> Option<Fault> {
        self.last_fault.take()
    }

    pub fn edges(&self) -> EdgeCount {
        self.edges
    }

    pub fn config(&self) -> &FlashConfig {
        &self.config
    }

    pub fn set_debug(&mut self, debug: bool) {
        self.config.debug = debug;
    }

    pub fn memory(&self) -> &[u8] {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut [u8] {
        &mut self.memory
    }
}

/// Position after shifting bit `bit` of the byte at `offset`. Offsets wrap
/// within the page.
fn next_bit(offset: u8, bit: u8) -> (u8, u8) {
    if bit == 0 {
        (offset.wrapping_add(1), 7)
    } else {
        (offset, bit - 1)
    }
}

impl SpiPeripheral for FlashDevice {
    fn tick(&mut self, sdi: bool, sck: bool, cs_n: bool) -> bool {
        FlashDevice::tick(self, sdi, sck, cs_n)
    }
}

impl Index<usize> for FlashDevice {
    type Output = u8;
    fn index(&self, address: usize) -> &u8 {
        &self.memory[address]
    }
}

impl IndexMut<usize> for FlashDevice {
    fn index_mut(&mut self, address: usize) -> &mut u8 {
        &mut self.memory[address]
    }
}
