use crate::chunk::ChunkStatus;
use crate::error::Error;
use crate::platform::{Platform, align_ceil};
use crate::NandSpl;
#[cfg(feature = "defmt")]
use defmt::{debug, warn};

impl<T: Platform> NandSpl<T> {
    /// Stream `size` bytes, rounded up to whole pages, from the page aligned `offset` into
    /// `dest`. Requires a detected geometry.
    ///
    /// Erased pages read as 0xFF. The randomizer period is a guess until a page proves it wrong:
    /// an uncorrectable page narrows the period to the seed index it was read with and is read
    /// once more. If that index was already covered since the start of the transfer, or the
    /// second read fails as well, the page is corrupted.
    pub fn read_buffer(&mut self, offset: u32, size: u32, dest: &mut [u8]) -> Result<(), Error> {
        let mut geometry = self.geometry.ok_or(Error::NotDetected)?;
        if !geometry.is_page_aligned(offset) {
            return Err(Error::InvalidOffset);
        }

        let page_size = geometry.page_size.bytes() as usize;
        let size = align_ceil(size as usize, page_size);
        if offset as u64 + size as u64 > u32::MAX as u64 + 1 {
            return Err(Error::InvalidOffset);
        }
        let dest = dest.get_mut(..size).ok_or(Error::BufferTooSmall)?;

        #[cfg(feature = "debug-logs")]
        println!("read_buffer: 0x{offset:08x} [0x{size:08x}]");

        self.apply_geometry(&geometry)?;

        let first_page = geometry.page_of(offset);
        let first_seed = if geometry.randomize {
            first_page.checked_rem(geometry.nseeds).unwrap_or(0)
        } else {
            0
        };

        for (i, dest) in dest.chunks_exact_mut(page_size).enumerate() {
            let page = first_page + i as u32;
            let offset = offset + (i * page_size) as u32;

            self.load_page(&geometry, offset)?;

            match self.read_page(&geometry, offset, dest) {
                Ok(ChunkStatus::PatternFound) => dest.fill(0xFF),
                Ok(_) => {}
                Err(Error::EccUncorrectable) if geometry.randomize => {
                    let seed = page.checked_rem(geometry.nseeds).unwrap_or(0);

                    // every seed index up to here was read fine: real corruption
                    if seed == 0 || seed < first_seed {
                        #[cfg(feature = "defmt")]
                        warn!("read_buffer: page {} corrupted", page);

                        return Err(Error::Corrupted);
                    }

                    #[cfg(feature = "defmt")]
                    debug!(
                        "read_buffer: page {}: seed period {} -> {}",
                        page, geometry.nseeds, seed
                    );

                    #[cfg(feature = "debug-logs")]
                    println!(
                        "read_buffer: page {page}: seed period {} -> {seed}",
                        geometry.nseeds
                    );

                    geometry.nseeds = seed;
                    self.geometry = Some(geometry);

                    self.change_column(0)?;
                    match self.read_page(&geometry, offset, dest) {
                        Ok(status) if status.is_valid() => {}
                        Err(Error::Timeout) => return Err(Error::Timeout),
                        _ => return Err(Error::Corrupted),
                    }
                }
                Err(e) => return Err(e),
            }
        }

        Ok(())
    }
}
