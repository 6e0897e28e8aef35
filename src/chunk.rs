use crate::error::Error;
use crate::geometry::{EccSize, Geometry, MAX_OOB_CHUNK_SIZE, USER_DATA_BYTES};
use crate::platform::Platform;
use crate::randomizer;
use crate::regs::{self, Cmd, EccCtl, EccStatus};
use crate::NandSpl;
#[cfg(feature = "defmt")]
use defmt::{debug, trace};

/// Outcome of a successful sector read.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChunkStatus {
    Clean,
    /// The engine corrected this many bitflips
    Corrected(u8),
    /// The sector matches the erased pattern, no data was transferred
    PatternFound,
}

impl ChunkStatus {
    /// Data was transferred and is valid.
    pub fn is_valid(self) -> bool {
        matches!(self, ChunkStatus::Clean | ChunkStatus::Corrected(_))
    }

    fn worst(self, other: ChunkStatus) -> ChunkStatus {
        match (self, other) {
            (ChunkStatus::PatternFound, _) | (_, ChunkStatus::PatternFound) => {
                ChunkStatus::PatternFound
            }
            (ChunkStatus::Corrected(a), ChunkStatus::Corrected(b)) => {
                ChunkStatus::Corrected(a.max(b))
            }
            (ChunkStatus::Corrected(n), ChunkStatus::Clean)
            | (ChunkStatus::Clean, ChunkStatus::Corrected(n)) => ChunkStatus::Corrected(n),
            (ChunkStatus::Clean, ChunkStatus::Clean) => ChunkStatus::Clean,
        }
    }
}

/// ECC engine setup for reading `page` with `geometry`.
pub(crate) fn ecc_ctl(geometry: &Geometry, page: u32) -> EccCtl {
    let mut ctl = EccCtl::EN | EccCtl::EXCEPTION | EccCtl::mode(geometry.ecc_strength);

    if geometry.ecc_size == EccSize::B512 {
        ctl |= EccCtl::BLOCK_512;
    }

    if geometry.randomize {
        ctl |= EccCtl::RANDOM_EN
            | EccCtl::random_seed(randomizer::seed_for_period(page, geometry.nseeds));
    }

    ctl
}

impl<T: Platform> NandSpl<T> {
    /// Read ECC sector `sector` of the loaded `page` through the hardware ECC engine.
    ///
    /// On success `data` receives the corrected sector and `oob` its protected OOB bytes: the
    /// four user bytes first (bad block marker derandomized on sector 0), then the parity.
    /// `data` must hold the ECC size and `oob` the OOB chunk size of `geometry`.
    pub fn read_chunk(
        &mut self,
        geometry: &Geometry,
        page: u32,
        sector: u32,
        data: &mut [u8],
        oob: &mut [u8],
    ) -> Result<ChunkStatus, Error> {
        let ecc_size = geometry.ecc_size.bytes() as usize;
        let oob_len = geometry.oob_chunk_size();
        if data.len() < ecc_size || oob.len() < oob_len {
            return Err(Error::BufferTooSmall);
        }

        // the column is always moved explicitly, the cursor position is never assumed
        self.select_chip();
        self.change_column(geometry.data_offset(sector))?;

        self.hal.write32(regs::ECC_ST, 0);
        self.hal.write32(regs::ECC_CTL, ecc_ctl(geometry, page).bits());

        let result = self.ecc_transfer(
            geometry,
            page,
            sector,
            &mut data[..ecc_size],
            &mut oob[..oob_len],
        );
        self.disable_ecc();

        #[cfg(feature = "defmt")]
        trace!("read_chunk: page {} sector {}: {}", page, sector, result);

        #[cfg(feature = "debug-logs")]
        println!("  chunk: page {page} sector {sector}: {result:?}");

        result
    }

    fn ecc_transfer(
        &mut self,
        geometry: &Geometry,
        page: u32,
        sector: u32,
        data: &mut [u8],
        oob: &mut [u8],
    ) -> Result<ChunkStatus, Error> {
        self.wait_cmd_fifo_empty()?;
        self.hal.write32(regs::CNT, data.len() as u32);
        self.exec_command(Cmd::DATA_TRANS | Cmd::DATA_SWAP_METHOD | Cmd::ECC_CMD)?;

        let status = EccStatus::from_bits_retain(self.hal.read32(regs::ECC_ST));
        if status.contains(EccStatus::pat_found(0)) {
            return Ok(ChunkStatus::PatternFound);
        }
        if status.contains(EccStatus::err(0)) {
            return Err(Error::EccUncorrectable);
        }

        let bitflips = regs::ecc_err_count(self.hal.read32(regs::ecc_err_cnt(0)), 0);
        self.hal.read_sram(regs::RAM0_BASE, data);

        self.change_column(geometry.oob_offset(sector))?;
        self.read_buf(oob)?;

        let user_data = self.hal.read32(regs::user_data(0)).to_le_bytes();
        oob[..USER_DATA_BYTES].copy_from_slice(&user_data);

        if sector == 0 && geometry.randomize {
            if let Some(marker) = oob.first_chunk_mut::<2>() {
                randomizer::derandomize_bad_block_marker(page, marker);
            }
        }

        Ok(match bitflips {
            0 => ChunkStatus::Clean,
            n => ChunkStatus::Corrected(n),
        })
    }

    /// Read the page at `offset` sector by sector into `dest`. The page has to be loaded with
    /// `load_page` first.
    ///
    /// Returns the worst sector status. A first sector matching the erased pattern marks the whole
    /// page erased: reading stops, `PatternFound` is returned and `dest` is left untouched. Erased
    /// sectors behind programmed ones read as 0xFF and do not affect the status.
    pub fn read_page(
        &mut self,
        geometry: &Geometry,
        offset: u32,
        dest: &mut [u8],
    ) -> Result<ChunkStatus, Error> {
        if !geometry.is_page_aligned(offset) {
            return Err(Error::InvalidOffset);
        }

        let page_size = geometry.page_size.bytes() as usize;
        if dest.len() < page_size {
            return Err(Error::BufferTooSmall);
        }

        let page = geometry.page_of(offset);
        let mut oob = [0u8; MAX_OOB_CHUNK_SIZE];
        let mut status = ChunkStatus::Clean;

        for (sector, data) in dest[..page_size]
            .chunks_exact_mut(geometry.ecc_size.bytes() as usize)
            .enumerate()
        {
            match self.read_chunk(geometry, page, sector as u32, data, &mut oob)? {
                ChunkStatus::PatternFound if sector == 0 => return Ok(ChunkStatus::PatternFound),
                ChunkStatus::PatternFound => data.fill(0xFF),
                other => status = status.worst(other),
            }
        }

        #[cfg(feature = "defmt")]
        if let ChunkStatus::Corrected(n) = status {
            debug!("read_page: page {}: corrected {} bitflips", page, n);
        }

        Ok(status)
    }
}
