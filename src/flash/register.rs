//! MSB-first shift registers for the command and address phases.

use super::ADDRESS_BITS;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct CommandRegister {
    shift: u8,
    bits: u8,
}

impl CommandRegister {
    /// Shift in one bit, returning the byte once eight bits have arrived.
    /// The register is empty again afterwards.
    pub fn shift(&mut self, bit: bool) -> Option<u8> {
        self.shift = (self.shift << 1) | bit as u8;
        self.bits += 1;
        if self.bits == 8 {
            let byte = self.shift;
            *self = Self::default();
            Some(byte)
        } else {
            None
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct AddressRegister {
    value: u32,
    bits: u8,
}

impl AddressRegister {
    /// Shift in one bit. Returns true when this bit completed the address.
    /// Bits arriving after completion are ignored.
    pub fn shift(&mut self, bit: bool) -> bool {
        if self.is_complete() {
            return false;
        }
        self.value = (self.value << 1) | bit as u32;
        self.bits += 1;
        self.is_complete()
    }

    pub fn is_complete(&self) -> bool {
        self.bits == ADDRESS_BITS
    }

    pub fn value(&self) -> u32 {
        self.value
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
