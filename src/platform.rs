//! The register interface the loader drives. Clock gating, pin muxing and the delay source
//! are provided by the board; the loader only needs 32-bit register access and a microsecond
//! busy wait.

use crate::regs;

/// Raw access to the NAND flash controller register block.
pub trait Registers {
    /// Read the 32-bit register at `offset` from the controller base.
    fn read32(&mut self, offset: u32) -> u32;

    /// Write the 32-bit register at `offset` from the controller base.
    fn write32(&mut self, offset: u32, value: u32);

    /// Copy bytes out of the controller SRAM window starting at `offset`.
    ///
    /// The window only supports word accesses, so bytes are unpacked from little-endian words.
    fn read_sram(&mut self, offset: u32, buf: &mut [u8]) {
        for (i, chunk) in buf.chunks_mut(4).enumerate() {
            let word = self.read32(offset + (i * 4) as u32).to_le_bytes();
            chunk.copy_from_slice(&word[..chunk.len()]);
        }
    }

    /// Called once the loader is done with the controller. Gate the controller clocks here.
    fn release(&mut self) {}
}

pub trait Delay {
    fn delay_us(&mut self, us: u32);
}

/// See README.md for an example implementation.
pub trait Platform: Registers + Delay {}

impl<T: Registers + Delay> Platform for T {}

impl<T: Registers> Registers for &mut T {
    fn read32(&mut self, offset: u32) -> u32 {
        T::read32(self, offset)
    }

    fn write32(&mut self, offset: u32, value: u32) {
        T::write32(self, offset, value)
    }

    fn read_sram(&mut self, offset: u32, buf: &mut [u8]) {
        T::read_sram(self, offset, buf)
    }

    fn release(&mut self) {
        T::release(self)
    }
}

impl<T: Delay> Delay for &mut T {
    fn delay_us(&mut self, us: u32) {
        T::delay_us(self, us)
    }
}

/// Memory mapped controller at a fixed base address.
pub struct Mmio<D> {
    base: usize,
    delay: D,
}

impl<D: Delay> Mmio<D> {
    /// # Safety
    ///
    /// `base` must point to the NAND flash controller register block, with its clocks and
    /// resets already released, and nothing else may access it while this value lives.
    pub const unsafe fn new(base: usize, delay: D) -> Self {
        Self { base, delay }
    }
}

impl<D> Registers for Mmio<D> {
    fn read32(&mut self, offset: u32) -> u32 {
        debug_assert!(offset < regs::RAM1_BASE + regs::SRAM_SIZE as u32);
        unsafe { core::ptr::read_volatile((self.base + offset as usize) as *const u32) }
    }

    fn write32(&mut self, offset: u32, value: u32) {
        debug_assert!(offset < regs::RAM1_BASE + regs::SRAM_SIZE as u32);
        unsafe { core::ptr::write_volatile((self.base + offset as usize) as *mut u32, value) }
    }
}

impl<D: Delay> Delay for Mmio<D> {
    fn delay_us(&mut self, us: u32) {
        self.delay.delay_us(us)
    }
}

#[inline(always)]
pub const fn align_ceil(size: usize, alignment: usize) -> usize {
    if alignment.is_power_of_two() {
        size.saturating_add(alignment - 1) & !(alignment - 1)
    } else {
        size.saturating_add(alignment - 1) / alignment * alignment
    }
}

#[inline(always)]
pub const fn align_floor(size: usize, alignment: usize) -> usize {
    if alignment.is_power_of_two() {
        size & !(alignment - 1)
    } else {
        size / alignment * alignment
    }
}
