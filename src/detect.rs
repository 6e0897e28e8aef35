//! Geometry detection. Every combination of address cycles, page size, ECC sector size, ECC
//! strength and randomizer period is tried in a fixed order by reading the first sector of the
//! page at the boot offset, until one reads back without ECC errors.

use core::iter;

use strum::IntoEnumIterator;

use crate::error::Error;
use crate::geometry::{
    AddrCycles, EccSize, Geometry, MAX_ECC_SIZE, MAX_OOB_CHUNK_SIZE, MAX_SEED_PERIOD,
    MIN_SEED_PERIOD, PageSize, max_ecc_strength,
};
use crate::platform::Platform;
use crate::NandSpl;
#[cfg(feature = "defmt")]
use defmt::{debug, trace, warn};

/// Randomizer periods worth trying for `page`: 128 first, then halving, skipping periods that
/// would select the same seed as the previous one.
#[derive(Debug, Clone)]
pub struct SeedPeriods {
    page: u32,
    next: Option<u32>,
}

impl SeedPeriods {
    pub fn new(page: u32) -> Self {
        Self {
            page,
            next: Some(MAX_SEED_PERIOD),
        }
    }
}

impl Iterator for SeedPeriods {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        let current = self.next?;

        let mut nseeds = current;
        self.next = loop {
            let seed = self.page % nseeds;
            nseeds >>= 1;
            if nseeds < MIN_SEED_PERIOD {
                break None;
            }
            if seed != self.page % nseeds {
                break Some(nseeds);
            }
        };

        Some(current)
    }
}

/// All geometries in detection order for a boot image at `offset`.
///
/// Outermost to innermost: address cycles (5, 4), page size (ascending up to what the address
/// cycles can reach), ECC size (1k, then 512 for pages up to 4k), ECC strength (strongest
/// first), then non randomized followed by every randomizer period of [`SeedPeriods`].
pub fn candidates(offset: u32) -> impl Iterator<Item = Geometry> {
    AddrCycles::iter().flat_map(move |addr_cycles| {
        PageSize::iter()
            .filter(move |page_size| *page_size <= addr_cycles.max_page_size())
            .flat_map(move |page_size| {
                let page = offset / page_size.bytes();

                EccSize::iter()
                    .filter(move |ecc_size| {
                        ecc_size.bytes() >= EccSize::min_for(page_size).bytes()
                    })
                    .flat_map(move |ecc_size| {
                        // no strength at all if the weakest ECC doesn't fit the OOB area
                        let strengths = max_ecc_strength(page_size, ecc_size)
                            .into_iter()
                            .flat_map(|max| (0..=max).rev());

                        strengths.flat_map(move |ecc_strength| {
                            let plain = Geometry {
                                addr_cycles,
                                page_size,
                                ecc_size,
                                ecc_strength,
                                randomize: false,
                                nseeds: 0,
                            };

                            iter::once(plain).chain(SeedPeriods::new(page).map(move |nseeds| {
                                Geometry {
                                    randomize: true,
                                    nseeds,
                                    ..plain
                                }
                            }))
                        })
                    })
            })
    })
}

impl<T: Platform> NandSpl<T> {
    /// Detect the geometry by reading the page at `offset`, which must hold programmed data.
    ///
    /// Memoized: once a geometry was found, it is returned without touching the controller.
    pub fn detect_geometry(&mut self, offset: u32) -> Result<Geometry, Error> {
        if let Some(geometry) = self.geometry {
            return Ok(geometry);
        }

        let mut data = [0u8; MAX_ECC_SIZE];
        let mut oob = [0u8; MAX_OOB_CHUNK_SIZE];

        for candidate in candidates(offset) {
            #[cfg(feature = "defmt")]
            trace!("detect: trying {}", candidate);

            #[cfg(feature = "debug-logs")]
            println!("detect: trying {candidate:?}");

            // a controller that can't even move its cursor won't read with any geometry
            self.apply_geometry(&candidate)?;
            self.load_page(&candidate, offset)?;
            self.change_column(0)?;

            let page = candidate.page_of(offset);
            match self.read_chunk(&candidate, page, 0, &mut data, &mut oob) {
                Ok(status) if status.is_valid() => {
                    #[cfg(feature = "defmt")]
                    debug!("detect: found {}", candidate);

                    self.geometry = Some(candidate);
                    return Ok(candidate);
                }
                Ok(_) if !candidate.randomize => {
                    #[cfg(feature = "defmt")]
                    warn!("detect: page {} is blank", page);

                    return Err(Error::BlankPage);
                }
                Ok(_) | Err(Error::EccUncorrectable) | Err(Error::Timeout) => {}
                Err(e) => return Err(e),
            }
        }

        #[cfg(feature = "defmt")]
        warn!("detect: no geometry reads offset {:#010x}", offset);

        Err(Error::InvalidGeometry)
    }
}
