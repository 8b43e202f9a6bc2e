// SPDX-License-Identifier: MIT

use core::slice;

use super::{PhysicalAddress, PhysicalMemory, PhysicalWindow, VmemError};

/// Something that can make physical memory visible at a host pointer, such as
/// an `mmap` of `/dev/mem`.
pub trait Mapper {
    unsafe fn map_aligned(
        &mut self,
        address: PhysicalAddress,
        size: usize,
    ) -> Result<*mut u8, VmemError>;
    unsafe fn unmap_aligned(&mut self, pointer: *mut u8, size: usize) -> Result<(), VmemError>;
    fn page_size(&self) -> usize;

    unsafe fn map(&mut self, address: PhysicalAddress, size: usize) -> Result<*mut u8, VmemError> {
        let page_size = self.page_size() as u64;
        let aligned_address = PhysicalAddress(address.0 / page_size * page_size);
        let offset = (address.0 - aligned_address.0) as usize;
        let aligned_size = aligned_len(offset, size, page_size as usize)?;
        let pointer = self.map_aligned(aligned_address, aligned_size)?;
        Ok(pointer.add(offset))
    }

    unsafe fn unmap(&mut self, pointer: *mut u8, size: usize) -> Result<(), VmemError> {
        let page_size = self.page_size();
        let offset = pointer as usize % page_size;
        let aligned_size = aligned_len(offset, size, page_size)?;
        self.unmap_aligned(pointer.sub(offset), aligned_size)
    }
}

fn aligned_len(offset: usize, size: usize, page_size: usize) -> Result<usize, VmemError> {
    let end = offset
        .checked_add(size)
        .and_then(|end| end.checked_add(page_size - 1))
        .ok_or(VmemError::Range)?;
    Ok(end / page_size * page_size)
}

/// Physical memory reached by mapping each transfer on demand
pub struct MappedMemory<M: Mapper> {
    mapper: M,
}

impl<M: Mapper> MappedMemory<M> {
    pub fn new(mapper: M) -> Self {
        MappedMemory { mapper }
    }

    pub fn into_inner(self) -> M {
        self.mapper
    }

    fn with_window<F>(
        &mut self,
        address: PhysicalAddress,
        size: usize,
        f: F,
    ) -> Result<(), VmemError>
    where
        F: FnOnce(&mut PhysicalWindow) -> Result<(), VmemError>,
    {
        if size == 0 {
            return Ok(());
        }

        let pointer = unsafe { self.mapper.map(address, size)? };
        let result = {
            let bytes = unsafe { slice::from_raw_parts_mut(pointer, size) };
            f(&mut PhysicalWindow::new(address, bytes))
        };
        unsafe { self.mapper.unmap(pointer, size)? };
        result
    }
}

impl<M: Mapper> PhysicalMemory for MappedMemory<M> {
    fn phys_read(&mut self, address: PhysicalAddress, buf: &mut [u8]) -> Result<(), VmemError> {
        self.with_window(address, buf.len(), |window| window.phys_read(address, buf))
    }

    fn phys_write(&mut self, address: PhysicalAddress, buf: &[u8]) -> Result<(), VmemError> {
        self.with_window(address, buf.len(), |window| window.phys_write(address, buf))
    }
}
