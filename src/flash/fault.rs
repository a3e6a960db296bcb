use thiserror::Error;

use super::Command;

/// Why the device stopped responding. Faults are never returned from `tick`;
/// they are recorded and the device locks up until chip select is released.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Fault {
    #[error("unknown opcode {0:#04x}")]
    UnknownOpcode(u8),
    #[error("{0} issued without the write enable latch set")]
    PermissionDenied(Command),
    #[error("{0} issued while in deep power-down")]
    SleepViolation(Command),
    #[error("protocol violation: {0}")]
    ProtocolViolation(Violation),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Violation {
    #[error("clock edge during {0}, which takes no payload")]
    UnexpectedClock(Command),
    /// Program deselected mid-byte. The page is dropped but the device does
    /// not enter the error state.
    #[error("program ended {bits} bits into a byte, page discarded")]
    PartialByte { bits: u8 },
}
