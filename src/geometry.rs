//! Geometry of a raw NAND device as seen through the controller: addressing, page size and the
//! ECC layout of the out-of-band area.

use crate::error::Error;

/// Size of an eraseblock of the boot medium. The randomizer period of the bad block marker
/// derives from it.
pub const ERASE_BLOCK_SIZE: u32 = 0x20_0000;
pub const WRITE_SIZE: u32 = 0x2000;
pub const ERASE_BLOCK_PAGES: u32 = ERASE_BLOCK_SIZE / WRITE_SIZE;

/// OOB bytes consumed per ECC sector, indexed by ECC strength (weakest first).
pub const ECC_BYTES: [u8; 9] = [32, 46, 54, 60, 74, 88, 102, 110, 116];

/// The engine protects four user bytes in front of the parity of every sector.
pub const USER_DATA_BYTES: usize = 4;

pub const MAX_PAGE_SIZE: usize = PageSize::P16384.bytes() as usize;
pub const MAX_ECC_SIZE: usize = EccSize::B1024.bytes() as usize;
pub const MAX_OOB_CHUNK_SIZE: usize = ECC_BYTES[ECC_BYTES.len() - 1] as usize + USER_DATA_BYTES;

pub const MIN_SEED_PERIOD: u32 = 16;
pub const MAX_SEED_PERIOD: u32 = 128;

#[derive(strum::FromRepr, strum::EnumIter, Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u32)]
pub enum PageSize {
    P2048 = 2048,
    P4096 = 4096,
    P8192 = 8192,
    P16384 = 16384,
}

impl PageSize {
    pub const fn bytes(self) -> u32 {
        self as u32
    }

    /// The OOB area grows with the page size. ECC parity has to fit in it.
    pub const fn max_oob(self) -> u32 {
        match self {
            PageSize::P2048 => 64,
            PageSize::P4096 => 256,
            PageSize::P8192 => 640,
            PageSize::P16384 => 1664,
        }
    }
}

/// Iteration order is the detection order: 1k sectors first.
#[derive(strum::FromRepr, strum::EnumIter, Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u32)]
pub enum EccSize {
    B1024 = 1024,
    B512 = 512,
}

impl EccSize {
    pub const fn bytes(self) -> u32 {
        self as u32
    }

    /// NAND with pages larger than 4k will require 1k sectors.
    pub const fn min_for(page_size: PageSize) -> EccSize {
        if page_size.bytes() > 4096 {
            EccSize::B1024
        } else {
            EccSize::B512
        }
    }
}

/// Iteration order is the detection order: modern devices first.
#[derive(strum::FromRepr, strum::EnumIter, Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum AddrCycles {
    Five = 5,
    Four = 4,
}

impl AddrCycles {
    pub const fn count(self) -> u32 {
        self as u32
    }

    /// Two row bytes only address devices with small pages.
    pub const fn max_page_size(self) -> PageSize {
        match self {
            AddrCycles::Five => PageSize::P16384,
            AddrCycles::Four => PageSize::P2048,
        }
    }
}

/// Strongest ECC strength whose parity fits the OOB area, `None` if not even the weakest fits.
pub const fn max_ecc_strength(page_size: PageSize, ecc_size: EccSize) -> Option<u8> {
    let nsectors = page_size.bytes() / ecc_size.bytes();
    let max_ecc_bytes = page_size.max_oob() / nsectors;

    let mut i = 0;
    while i < ECC_BYTES.len() {
        if ECC_BYTES[i] as u32 > max_ecc_bytes {
            break;
        }
        i += 1;
    }

    if i == 0 { None } else { Some(i as u8 - 1) }
}

/// How the controller has to address and decode the boot medium.
///
/// Only [`Geometry::new`] and [`Geometry::randomized`] build one, so every value satisfies the
/// layout invariants:
///
/// ```compile_fail
/// # use sunxi_nand_spl::Geometry;
/// # use sunxi_nand_spl::geometry::{AddrCycles, EccSize, PageSize};
/// let geometry = Geometry {
///     addr_cycles: AddrCycles::Five,
///     page_size: PageSize::P4096,
///     ecc_size: EccSize::B1024,
///     ecc_strength: 12,
///     randomize: false,
///     nseeds: 0,
/// };
/// ```
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Geometry {
    pub(crate) addr_cycles: AddrCycles,
    pub(crate) page_size: PageSize,
    pub(crate) ecc_size: EccSize,
    pub(crate) ecc_strength: u8,
    pub(crate) randomize: bool,
    /// Randomizer period hypothesis in pages, only meaningful while `randomize` is set. Narrowing
    /// during a read may leave it at a value that is not a power of two.
    pub(crate) nseeds: u32,
}

impl Geometry {
    /// A non randomized geometry. Fails if the page size is out of reach of the address cycles
    /// or the ECC strength doesn't fit the OOB area.
    pub fn new(
        addr_cycles: AddrCycles,
        page_size: PageSize,
        ecc_size: EccSize,
        ecc_strength: u8,
    ) -> Result<Self, Error> {
        if page_size > addr_cycles.max_page_size() {
            return Err(Error::InvalidGeometry);
        }

        if ecc_size.bytes() < EccSize::min_for(page_size).bytes() {
            return Err(Error::InvalidGeometry);
        }

        match max_ecc_strength(page_size, ecc_size) {
            Some(max) if ecc_strength <= max => {}
            _ => return Err(Error::InvalidGeometry),
        }

        Ok(Self {
            addr_cycles,
            page_size,
            ecc_size,
            ecc_strength,
            randomize: false,
            nseeds: 0,
        })
    }

    /// Enable the randomizer with a period of `nseeds` pages, a power of two in `16..=128`.
    pub fn randomized(self, nseeds: u32) -> Result<Self, Error> {
        if !nseeds.is_power_of_two() || !(MIN_SEED_PERIOD..=MAX_SEED_PERIOD).contains(&nseeds) {
            return Err(Error::InvalidGeometry);
        }

        Ok(Self {
            randomize: true,
            nseeds,
            ..self
        })
    }

    pub const fn addr_cycles(&self) -> AddrCycles {
        self.addr_cycles
    }

    pub const fn page_size(&self) -> PageSize {
        self.page_size
    }

    pub const fn ecc_size(&self) -> EccSize {
        self.ecc_size
    }

    pub const fn ecc_strength(&self) -> u8 {
        self.ecc_strength
    }

    pub const fn randomize(&self) -> bool {
        self.randomize
    }

    pub const fn nseeds(&self) -> u32 {
        self.nseeds
    }

    pub const fn nsectors(&self) -> u32 {
        self.page_size.bytes() / self.ecc_size.bytes()
    }

    /// ECC parity bytes per sector
    pub const fn oob_bytes(&self) -> usize {
        ECC_BYTES[self.ecc_strength as usize] as usize
    }

    /// Protected OOB bytes per sector: user bytes plus parity
    pub const fn oob_chunk_size(&self) -> usize {
        self.oob_bytes() + USER_DATA_BYTES
    }

    pub const fn data_offset(&self, sector: u32) -> u32 {
        sector * self.ecc_size.bytes()
    }

    /// The OOB of every sector is stored in sector order after the page data.
    pub const fn oob_offset(&self, sector: u32) -> u32 {
        self.page_size.bytes() + sector * self.oob_chunk_size() as u32
    }

    pub const fn page_of(&self, offset: u32) -> u32 {
        offset / self.page_size.bytes()
    }

    pub const fn is_page_aligned(&self, offset: u32) -> bool {
        offset.is_multiple_of(self.page_size.bytes())
    }
}
