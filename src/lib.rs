#![doc = include_str ! ("../README.md")]
#![cfg_attr(not(target_arch = "x86_64"), no_std)]

mod chunk;
mod command;
pub mod detect;
pub mod error;
pub mod geometry;
pub mod platform;
pub mod randomizer;
mod read;
pub mod regs;
pub mod storage;

pub use chunk::ChunkStatus;
pub use geometry::Geometry;
pub use storage::NandStorage;

use crate::error::Error;
use crate::platform::{Platform, align_ceil};
#[cfg(feature = "defmt")]
use defmt::info;

/// The NandSpl struct owns the flash controller for the duration of the boot and remembers the
/// geometry once it was detected. Nothing else may touch the controller meanwhile.
pub struct NandSpl<T: Platform> {
    pub(crate) hal: T,
    pub(crate) geometry: Option<Geometry>,
}

impl<T: Platform> NandSpl<T> {
    /// Takes over a controller whose clocks and pins were set up by the board. The geometry is
    /// detected on the first `load_image`.
    pub fn new(hal: T) -> NandSpl<T> {
        Self {
            hal,
            geometry: None,
        }
    }

    /// Skip detection for boards with a known NAND.
    pub fn with_geometry(hal: T, geometry: Geometry) -> NandSpl<T> {
        Self {
            hal,
            geometry: Some(geometry),
        }
    }

    /// The detected or provided geometry, `None` until detection succeeded.
    pub fn geometry(&self) -> Option<&Geometry> {
        self.geometry.as_ref()
    }

    /// Load `size` bytes of the boot image stored at `offset` into `dest`.
    ///
    /// The first call detects the geometry from the page at `offset`. The size is rounded up to
    /// whole pages, so `dest` has to be large enough for that.
    pub fn load_image(&mut self, offset: u32, size: u32, dest: &mut [u8]) -> Result<(), Error> {
        let _geometry = self.detect_geometry(offset)?;

        #[cfg(feature = "defmt")]
        info!("load_image: {:#010x} [{:#x}] {}", offset, size, _geometry);

        self.read_buffer(offset, size, dest)
    }

    /// Same as [`NandSpl::load_image`], for boot code that only has a load address.
    ///
    /// # Safety
    ///
    /// `dest` must be valid for writes of `size` rounded up to the page size of the device
    /// (up to 16k more than `size`), and not be aliased during the call.
    pub unsafe fn load_image_raw(
        &mut self,
        offset: u32,
        size: u32,
        dest: *mut u8,
    ) -> Result<(), Error> {
        let geometry = self.detect_geometry(offset)?;
        let len = align_ceil(size as usize, geometry.page_size().bytes() as usize);
        let dest = unsafe { core::slice::from_raw_parts_mut(dest, len) };

        self.read_buffer(offset, size, dest)
    }

    /// Hand the controller back once the image is loaded. The platform's `release` hook gates
    /// the controller; no register access happens through this loader afterwards.
    pub fn deselect(mut self) -> T {
        self.hal.release();
        self.hal
    }
}
