//! Command sequences for the flash model, each one a complete chip select
//! cycle on the bus.
//!
//! The device reports faults by going quiet rather than by erroring, so none
//! of these return a `Result`. Check [`FlashDevice::last_fault`] when it
//! matters.
//!
//! [`FlashDevice::last_fault`]: crate::flash::FlashDevice::last_fault

use crate::bus::{SpiBus, SpiPeripheral};
use crate::flash::{PP, RDSR, READ, SE, SLEEP, WAKE, WREN};

/// 24-bit address, MSB first.
pub fn address_bytes(address: u32) -> [u8; 3] {
    [(address >> 16) as u8, (address >> 8) as u8, address as u8]
}

fn addressed(opcode: u8, address: u32) -> [u8; 4] {
    let [a2, a1, a0] = address_bytes(address);
    [opcode, a2, a1, a0]
}

pub fn write_enable<P: SpiPeripheral + ?Sized>(bus: &mut SpiBus, dev: &mut P) {
    bus.transfer(dev, &[WREN], &mut []);
}

pub fn read_status<P: SpiPeripheral + ?Sized>(bus: &mut SpiBus, dev: &mut P) -> u8 {
    let mut buf = [0u8; 1];
    bus.transfer(dev, &[RDSR], &mut buf);
    buf[0]
}

pub fn read<P: SpiPeripheral + ?Sized>(
    bus: &mut SpiBus,
    dev: &mut P,
    address: u32,
    buf: &mut [u8],
) {
    bus.transfer(dev, &addressed(READ, address), buf);
}

/// Page program. Data past the end of the page wraps to the page start.
/// Requires a prior [`write_enable`].
pub fn program<P: SpiPeripheral + ?Sized>(
    bus: &mut SpiBus,
    dev: &mut P,
    address: u32,
    data: &[u8],
) {
    bus.select(dev);
    bus.write(dev, &addressed(PP, address));
    bus.write(dev, data);
    bus.deselect(dev);
}

/// Erase the 4 KiB block containing `address`. Requires a prior
/// [`write_enable`].
pub fn erase_block<P: SpiPeripheral + ?Sized>(bus: &mut SpiBus, dev: &mut P, address: u32) {
    bus.transfer(dev, &addressed(SE, address), &mut []);
}

pub fn sleep<P: SpiPeripheral + ?Sized>(bus: &mut SpiBus, dev: &mut P) {
    bus.transfer(dev, &[SLEEP], &mut []);
}

pub fn wake<P: SpiPeripheral + ?Sized>(bus: &mut SpiBus, dev: &mut P) {
    bus.transfer(dev, &[WAKE], &mut []);
}
