use std::fmt;

/// Page Program: 24-bit address followed by up to a page of data.
pub const PP: u8 = 0x02;
/// Read Data: 24-bit address, then data streams out until deselect.
pub const READ: u8 = 0x03;
/// 4 KiB block (sector) erase.
pub const SE: u8 = 0x20;
/// Read Status Register.
pub const RDSR: u8 = 0x05;
/// Write Enable.
pub const WREN: u8 = 0x06;
/// Deep power-down.
pub const SLEEP: u8 = 0xB9;
/// Release from deep power-down.
pub const WAKE: u8 = 0xA9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Command {
    Program = PP,
    Read = READ,
    Erase = SE,
    Status = RDSR,
    WriteEnable = WREN,
    Sleep = SLEEP,
    Wake = WAKE,
}

impl TryFrom<u8> for Command {
    type Error = u8;
    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            PP => Ok(Command::Program),
            READ => Ok(Command::Read),
            SE => Ok(Command::Erase),
            RDSR => Ok(Command::Status),
            WREN => Ok(Command::WriteEnable),
            SLEEP => Ok(Command::Sleep),
            WAKE => Ok(Command::Wake),
            other => Err(other),
        }
    }
}

impl Command {
    pub fn opcode(self) -> u8 {
        self as u8
    }

    /// Program and erase consume the write-enable latch.
    pub fn requires_write_enable(self) -> bool {
        matches!(self, Command::Program | Command::Erase)
    }

    pub fn allowed_while_sleeping(self) -> bool {
        matches!(self, Command::Sleep | Command::Wake)
    }

    pub fn name(self) -> &'static str {
        match self {
            Command::Program => "program",
            Command::Read => "read",
            Command::Erase => "erase",
            Command::Status => "status",
            Command::WriteEnable => "write enable",
            Command::Sleep => "sleep",
            Command::Wake => "wake",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
