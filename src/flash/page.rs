use bit_set::BitSet;

use super::PAGE_SIZE;

/// Page program buffer.
///
/// A slot only carries data once a bit has been shifted into it during the
/// current transaction. The first bit initialises the slot, later bits (and
/// later bytes that wrap around onto the same slot) are OR-ed in.
#[derive(Debug, Clone)]
pub(crate) struct PageBuffer {
    data: [u8; PAGE_SIZE],
    written: BitSet,
}

impl PageBuffer {
    pub fn new() -> Self {
        Self {
            data: [0; PAGE_SIZE],
            written: BitSet::with_capacity(PAGE_SIZE),
        }
    }

    /// Merge one data bit into `offset` at bit position `bit` (0 = LSB).
    pub fn merge_bit(&mut self, offset: u8, bit: u8, level: bool) {
        let slot = offset as usize;
        if self.written.insert(slot) {
            self.data[slot] = 0;
        }
        self.data[slot] |= (level as u8) << bit;
    }

    #[cfg(test)]
    pub fn get(&self, offset: u8) -> Option<u8> {
        let slot = offset as usize;
        self.written.contains(slot).then(|| self.data[slot])
    }

    /// Touched slots in offset order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, u8)> + '_ {
        self.written.iter().map(|slot| (slot, self.data[slot]))
    }

    pub fn is_empty(&self) -> bool {
        self.written.is_empty()
    }

    pub fn clear(&mut self) {
        self.written.clear();
    }
}
