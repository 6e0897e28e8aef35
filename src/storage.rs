//! Byte granular reads on top of the page streaming loader, for consumers written against
//! `embedded-storage`.

use core::mem;

use embedded_storage::ReadStorage;

use crate::error::Error;
use crate::platform::{Platform, align_floor};
use crate::NandSpl;

/// Reads arbitrary ranges. Whole pages are streamed straight into the destination, partial
/// pages are staged in `scratch`, which must hold one page of the detected geometry.
///
/// The geometry is detected on the first read, at the offset being read.
pub struct NandStorage<'a, T: Platform> {
    nand: &'a mut NandSpl<T>,
    scratch: &'a mut [u8],
    capacity: usize,
}

impl<'a, T: Platform> NandStorage<'a, T> {
    pub fn new(nand: &'a mut NandSpl<T>, scratch: &'a mut [u8], capacity: usize) -> Self {
        Self {
            nand,
            scratch,
            capacity,
        }
    }
}

impl<T: Platform> ReadStorage for NandStorage<'_, T> {
    type Error = Error;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        match (offset as usize).checked_add(bytes.len()) {
            Some(end) if end <= self.capacity => {}
            _ => return Err(Error::InvalidOffset),
        }

        let geometry = self.nand.detect_geometry(offset)?;
        let page_size = geometry.page_size().bytes() as usize;
        if self.scratch.len() < page_size {
            return Err(Error::BufferTooSmall);
        }

        let mut pos = offset as usize;
        let mut out = bytes;

        while !out.is_empty() {
            let in_page = pos % page_size;
            // the loader addresses at most 4 GiB
            let page_start = u32::try_from(pos - in_page).map_err(|_| Error::InvalidOffset)?;

            if in_page == 0 && out.len() >= page_size {
                let len = align_floor(out.len(), page_size);
                let (head, tail) = mem::take(&mut out).split_at_mut(len);
                let size = u32::try_from(len).map_err(|_| Error::InvalidOffset)?;
                self.nand.read_buffer(page_start, size, head)?;
                out = tail;
                pos += len;
            } else {
                let len = (page_size - in_page).min(out.len());
                self.nand
                    .read_buffer(page_start, page_size as u32, &mut self.scratch[..page_size])?;
                let (head, tail) = mem::take(&mut out).split_at_mut(len);
                head.copy_from_slice(&self.scratch[in_page..in_page + len]);
                out = tail;
                pos += len;
            }
        }

        Ok(())
    }

    fn capacity(&self) -> usize {
        self.capacity
    }
}
