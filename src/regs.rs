//! Register map of the Allwinner NAND flash controller (NFC).
//!
//! The read path touches only part of it. The remaining read side registers and status bits
//! are listed for completeness, as the controller documents them.

use bitflags::bitflags;

pub const CTL: u32 = 0x0000;
pub const ST: u32 = 0x0004;
pub const INT: u32 = 0x0008;
pub const TIMING_CTL: u32 = 0x000C;
pub const TIMING_CFG: u32 = 0x0010;
pub const ADDR_LOW: u32 = 0x0014;
pub const ADDR_HIGH: u32 = 0x0018;
pub const SECTOR_NUM: u32 = 0x001C;
pub const CNT: u32 = 0x0020;
pub const CMD: u32 = 0x0024;
pub const RCMD_SET: u32 = 0x0028;
pub const IO_DATA: u32 = 0x0030;
pub const ECC_CTL: u32 = 0x0034;
pub const ECC_ST: u32 = 0x0038;
pub const DEBUG: u32 = 0x003C;
pub const SPARE_AREA: u32 = 0x00A0;
pub const PAT_ID: u32 = 0x00A4;
pub const RAM0_BASE: u32 = 0x0400;
pub const RAM1_BASE: u32 = 0x0800;

/// Four sectors share one error counter register, one byte each.
pub const fn ecc_err_cnt(sector: u32) -> u32 {
    (0x0040 + sector) & !0x3
}

/// Hardware corrected user bytes (the first four OOB bytes) of a sector.
pub const fn user_data(sector: u32) -> u32 {
    0x0050 + sector * 4
}

pub const SRAM_SIZE: usize = 1024;

/// Default timing configuration written at bring-up (tCAD = 7).
pub const TIMING_CFG_DEFAULT: u32 = 0x700;

/// Every poll loop gives up after this many 1µs steps.
pub const POLL_ITERATIONS: u32 = 100_000;

/// tR: time to move a page from the array into the device cache before polling the controller.
pub const PAGE_LOAD_SETTLE_US: u32 = 2000;

/// tCCS: column change to data output.
pub const COLUMN_SETTLE_US: u32 = 1;

pub mod opcode {
    pub const READ0: u8 = 0x00;
    pub const RNDOUT: u8 = 0x05;
    pub const READSTART: u8 = 0x30;
    pub const STATUS: u8 = 0x70;
    pub const READID: u8 = 0x90;
    pub const RNDOUTSTART: u8 = 0xE0;
    pub const RESET: u8 = 0xFF;
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Ctl: u32 {
        const EN = 1 << 0;
        const RESET = 1 << 1;
        /// Never set, the loader only drives 8-bit devices
        const BUS_WIDTH_16 = 1 << 2;
        const RB_SEL = 1 << 3;
        const CE_CTL = 1 << 6;
        const PAGE_SHIFT_MASK = 0xf << 8;
        const SAM = 1 << 12;
        const RAM_METHOD = 1 << 14;
        const CE_SEL_MASK = 0x7 << 24;
        const DEBUG_CTL = 1 << 31;
    }
}

impl Ctl {
    /// Page size field, encoded as `log2(page_size) - 10`.
    pub const fn page_shift(page_size: u32) -> Self {
        let shift = page_size.trailing_zeros();
        let field = if shift < 10 { 0 } else { shift - 10 };
        Self::from_bits_retain((field & 0xf) << 8)
    }

    pub const fn chip_select(cs: u32) -> Self {
        Self::from_bits_retain((cs & 0x7) << 24)
    }

    pub const fn page_size(self) -> u32 {
        1 << (((self.bits() >> 8) & 0xf) + 10)
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Status: u32 {
        const RB_B2R = 1 << 0;
        const CMD_INT_FLAG = 1 << 1;
        const DMA_INT_FLAG = 1 << 2;
        const CMD_FIFO_BUSY = 1 << 3;
        const STA = 1 << 4;
        const NATCH_INT_FLAG = 1 << 5;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct IntEnable: u32 {
        const B2R = 1 << 0;
        const CMD = 1 << 1;
        const DMA = 1 << 2;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TimingCtl: u32 {
        /// Never set, see `Ctl::BUS_WIDTH_16`
        const EDO = 1 << 8;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Cmd: u32 {
        const LOW_BYTE_MASK = 0xff;
        const HIGH_BYTE_MASK = 0xff << 8;
        const ADDR_NUM_MASK = 0x7 << 16;
        const SEND_ADDR = 1 << 19;
        const ACCESS_DIR = 1 << 20;
        const DATA_TRANS = 1 << 21;
        const SEND_CMD1 = 1 << 22;
        const WAIT_FLAG = 1 << 23;
        const SEND_CMD2 = 1 << 24;
        const SEQ = 1 << 25;
        const DATA_SWAP_METHOD = 1 << 26;
        const ROW_AUTO_INC = 1 << 27;
        const SEND_CMD3 = 1 << 28;
        const SEND_CMD4 = 1 << 29;
        const ECC_CMD = 1 << 30;
        const PAGE_CMD = 2 << 30;
    }
}

impl Cmd {
    pub const fn opcode(op: u8) -> Self {
        Self::from_bits_retain(op as u32)
    }

    /// Number of address bytes sent with `SEND_ADDR`, 1 to 8.
    pub const fn addr_cycles(count: u32) -> Self {
        Self::from_bits_retain((count.wrapping_sub(1) & 0x7) << 16)
    }

    pub const fn low_byte(self) -> u8 {
        (self.bits() & 0xff) as u8
    }

    pub const fn addr_count(self) -> u32 {
        ((self.bits() >> 16) & 0x7) + 1
    }
}

/// Pack the three chained opcodes used by page reads and column changes.
pub const fn rcmd_set(read: u8, rnd_read0: u8, rnd_read1: u8) -> u32 {
    (read as u32) | ((rnd_read0 as u32) << 8) | ((rnd_read1 as u32) << 16)
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct EccCtl: u32 {
        const EN = 1 << 0;
        const PIPELINE = 1 << 3;
        const EXCEPTION = 1 << 4;
        const BLOCK_512 = 1 << 5;
        const RANDOM_EN = 1 << 9;
        const RANDOM_DIRECTION = 1 << 10;
        const MODE_MASK = 0xf << 12;
        const RANDOM_SEED_MASK = 0x7fff << 16;
    }
}

impl EccCtl {
    pub const fn mode(strength: u8) -> Self {
        Self::from_bits_retain(((strength as u32) & 0xf) << 12)
    }

    pub const fn random_seed(seed: u16) -> Self {
        Self::from_bits_retain(((seed as u32) & 0x7fff) << 16)
    }

    pub const fn strength(self) -> u8 {
        ((self.bits() >> 12) & 0xf) as u8
    }

    pub const fn seed(self) -> u16 {
        ((self.bits() >> 16) & 0x7fff) as u16
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct EccStatus: u32 {
        const ERR_MASK = 0xffff;
        const PAT_FOUND_MASK = 0xffff << 16;
    }
}

impl EccStatus {
    pub const fn err(sector: u32) -> Self {
        Self::from_bits_retain(1 << sector)
    }

    pub const fn pat_found(sector: u32) -> Self {
        Self::from_bits_retain(1 << (sector + 16))
    }
}

/// Extract the corrected bit count of `sector` from its `ecc_err_cnt` register value.
pub const fn ecc_err_count(value: u32, sector: u32) -> u8 {
    ((value >> ((sector % 4) * 8)) & 0xff) as u8
}
