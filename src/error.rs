use thiserror::Error;

/// Errors that can occur while detecting the NAND geometry or reading pages. Marked as
/// non-exhaustive to allow for future additions without breaking the API. Only a failing
/// `load_image` is meant to abort the boot; everything below it returns these to the caller.
#[derive(Error, Debug, PartialEq, Eq, Copy, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[non_exhaustive]
pub enum Error {
    /// A polled controller condition did not become true within its budget (100ms)
    #[error("timeout waiting for the flash controller")]
    Timeout,

    /// The hardware ECC engine could not correct a sector
    #[error("uncorrectable ECC error")]
    EccUncorrectable,

    /// Every address cycle / page size / ECC combination failed to read the page
    #[error("no geometry could read the page")]
    InvalidGeometry,

    /// Detection hit an erased page. Nothing can be deduced from blank media.
    #[error("page is blank")]
    BlankPage,

    /// A page still failed after narrowing the randomizer period
    #[error("corrupted page")]
    Corrupted,

    /// Pages can only be streamed once a geometry has been detected or provided
    #[error("geometry not detected")]
    NotDetected,

    /// The source offset has to be aligned to the page size
    #[error("invalid offset")]
    InvalidOffset,

    /// The destination has to hold the size rounded up to whole pages
    #[error("buffer too small")]
    BufferTooSmall,
}
