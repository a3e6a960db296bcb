//! Bus owner side of a single-wire SPI bus.
//!
//! [`SpiBus`] plays the part of the simulation loop: it holds the line levels
//! and calls the peripheral once per edge, including while chip select is
//! high. Transfers are SPI mode 0, MSB first. The peripheral samples MOSI on
//! the rising edge and changes MISO on the falling edge, so the bus samples
//! MISO just before each rising edge.

use tracing::trace;

/// A device attached to the bus, advanced once per edge.
pub trait SpiPeripheral {
    /// `cs_n` is active low. Returns the level driven on MISO.
    fn tick(&mut self, sdi: bool, sck: bool, cs_n: bool) -> bool;
}

#[derive(Debug, Clone)]
pub struct SpiBus {
    sck: bool,
    cs_n: bool,
    mosi: bool,
    miso: bool,
    edges: u64,
}

impl Default for SpiBus {
    fn default() -> Self {
        Self::new()
    }
}

impl SpiBus {
    pub fn new() -> Self {
        Self {
            sck: false,
            cs_n: true,
            mosi: false,
            miso: false,
            edges: 0,
        }
    }

    fn edge<P: SpiPeripheral + ?Sized>(&mut self, dev: &mut P) {
        self.miso = dev.tick(self.mosi, self.sck, self.cs_n);
        self.edges += 1;
    }

    /// Pull chip select low with the clock idle.
    pub fn select<P: SpiPeripheral + ?Sized>(&mut self, dev: &mut P) {
        trace!("SPI: select");
        self.sck = false;
        self.cs_n = false;
        self.edge(dev);
    }

    /// Release chip select with the clock idle.
    pub fn deselect<P: SpiPeripheral + ?Sized>(&mut self, dev: &mut P) {
        trace!("SPI: deselect");
        self.sck = false;
        self.cs_n = true;
        self.mosi = false;
        self.edge(dev);
    }

    /// One full clock: rising edge with `bit` on MOSI, then falling edge.
    /// Returns MISO as sampled at the rising edge.
    pub fn clock_bit<P: SpiPeripheral + ?Sized>(&mut self, dev: &mut P, bit: bool) -> bool {
        let sampled = self.miso;
        self.mosi = bit;
        self.sck = true;
        self.edge(dev);
        self.sck = false;
        self.edge(dev);
        sampled
    }

    pub fn exchange_byte<P: SpiPeripheral + ?Sized>(&mut self, dev: &mut P, byte: u8) -> u8 {
        let mut input = 0u8;
        for i in (0..8).rev() {
            let bit = (byte >> i) & 1 != 0;
            input = (input << 1) | self.clock_bit(dev, bit) as u8;
        }
        input
    }

    pub fn write<P: SpiPeripheral + ?Sized>(&mut self, dev: &mut P, bytes: &[u8]) {
        for &byte in bytes {
            self.exchange_byte(dev, byte);
        }
    }

    /// Clock in `buf.len()` bytes while holding MOSI low.
    pub fn read<P: SpiPeripheral + ?Sized>(&mut self, dev: &mut P, buf: &mut [u8]) {
        for byte in buf.iter_mut() {
            *byte = self.exchange_byte(dev, 0x00);
        }
    }

    /// A complete transaction: select, write `tx`, read into `rx`, deselect.
    pub fn transfer<P: SpiPeripheral + ?Sized>(
        &mut self,
        dev: &mut P,
        tx: &[u8],
        rx: &mut [u8],
    ) {
        self.select(dev);
        self.write(dev, tx);
        self.read(dev, rx);
        self.deselect(dev);
    }

    /// Run the clock for `cycles` with chip select released.
    pub fn idle<P: SpiPeripheral + ?Sized>(&mut self, dev: &mut P, cycles: usize) {
        self.cs_n = true;
        for _ in 0..cycles {
            self.sck = true;
            self.edge(dev);
            self.sck = false;
            self.edge(dev);
        }
    }

    pub fn selected(&self) -> bool {
        !self.cs_n
    }

    pub fn miso(&self) -> bool {
        self.miso
    }

    /// Edges driven since the bus was created.
    pub fn edges(&self) -> u64 {
        self.edges
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 8-bit shift register between MOSI and MISO: echoes each byte back
    /// during the following byte.
    #[derive(Default)]
    struct Loopback {
        last_sck: bool,
        shift: u8,
        out: bool,
        ticks: usize,
    }

    impl SpiPeripheral for Loopback {
        fn tick(&mut self, sdi: bool, sck: bool, cs_n: bool) -> bool {
            self.ticks += 1;
            if cs_n {
                self.shift = 0;
                self.out = false;
            } else if sck && !self.last_sck {
                self.shift = (self.shift << 1) | sdi as u8;
            } else if !sck && self.last_sck {
                self.out = self.shift & 0x80 != 0;
            }
            self.last_sck = sck;
            self.out
        }
    }

    #[test]
    fn test_loopback_exchange() {
        let mut bus = SpiBus::new();
        let mut dev = Loopback::default();
        bus.select(&mut dev);
        assert!(bus.selected());
        bus.exchange_byte(&mut dev, 0xA5);
        assert_eq!(bus.exchange_byte(&mut dev, 0x3C), 0xA5);
        assert_eq!(bus.exchange_byte(&mut dev, 0x00), 0x3C);
        bus.deselect(&mut dev);
        assert!(!bus.selected());
        assert!(!bus.miso());
    }

    #[test]
    fn test_edge_accounting() {
        let mut bus = SpiBus::new();
        let mut dev = Loopback::default();
        let mut rx = [0u8; 2];
        bus.transfer(&mut dev, &[0x01], &mut rx);
        // select + 3 bytes of two edges per bit + deselect
        assert_eq!(bus.edges(), 1 + 3 * 16 + 1);
        assert_eq!(dev.ticks as u64, bus.edges());

        bus.idle(&mut dev, 4);
        assert_eq!(bus.edges(), 50 + 8);
    }
}
