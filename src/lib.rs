// SPDX-License-Identifier: MIT

#![cfg_attr(not(test), no_std)]

extern crate alloc;

#[macro_use]
extern crate bitflags;

#[macro_use]
extern crate log;

use core::fmt;

pub use self::addr::{DirectoryBase, PhysicalAddress, VirtualAddress, PAGE_SIZE};
pub mod addr;

pub use self::entry::{Entry, EntryFlags};
pub mod entry;

pub use self::mapper::{MappedMemory, Mapper};
pub mod mapper;

pub use self::mmio::PhysicalWindow;
mod mmio;

pub use self::plan::{descriptor_capacity, plan, TransferDescriptor};
pub mod plan;

pub use self::translate::{translate, walk, Mapping, PageSize};
pub mod translate;

pub use self::virt::{read_u64, read_virtual, write_u64, write_virtual, VirtualMemory};
pub mod virt;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum VmemError {
    /// A walked entry was not present
    Unmapped(VirtualAddress),
    /// The raw layer failed to transfer at this physical address
    Access(PhysicalAddress),
    /// An address or buffer range overflowed or fell outside its backing store
    Range,
    /// Physical memory could not be mapped into this process
    Map,
}

impl fmt::Display for VmemError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            VmemError::Unmapped(address) => {
                write!(f, "virtual address {:#x} is not mapped", address.0)
            }
            VmemError::Access(address) => write!(f, "physical access at {:#x} failed", address.0),
            VmemError::Range => write!(f, "address range out of bounds"),
            VmemError::Map => write!(f, "failed to map physical memory"),
        }
    }
}

/// Raw physical memory access, supplied by whatever can reach physical memory
/// such as a driver or `/dev/mem`.
///
/// Addresses passed in are already translated. A transfer succeeds only if
/// every requested byte was moved.
pub trait PhysicalMemory {
    fn phys_read(&mut self, address: PhysicalAddress, buf: &mut [u8]) -> Result<(), VmemError>;

    fn phys_write(&mut self, address: PhysicalAddress, buf: &[u8]) -> Result<(), VmemError>;

    /// Read every descriptor of `plan` into its slice of `buf`.
    ///
    /// The batch is not atomic: on failure, earlier descriptors may already
    /// have been transferred.
    fn phys_read_scatter(
        &mut self,
        plan: &[TransferDescriptor],
        buf: &mut [u8],
    ) -> Result<(), VmemError> {
        for desc in plan {
            let local = buf.get_mut(desc.local_range()).ok_or(VmemError::Range)?;
            self.phys_read(desc.physical, local)?;
        }
        Ok(())
    }

    fn phys_write_scatter(
        &mut self,
        plan: &[TransferDescriptor],
        buf: &[u8],
    ) -> Result<(), VmemError> {
        for desc in plan {
            let local = buf.get(desc.local_range()).ok_or(VmemError::Range)?;
            self.phys_write(desc.physical, local)?;
        }
        Ok(())
    }

    /// Read a little-endian 8 byte value at a physical address, used for page table entries.
    fn phys_read_u64(&mut self, address: PhysicalAddress) -> Result<u64, VmemError> {
        let mut bytes = [0; 8];
        self.phys_read(address, &mut bytes)?;
        Ok(u64::from_le_bytes(bytes))
    }
}

impl<T: PhysicalMemory + ?Sized> PhysicalMemory for &mut T {
    fn phys_read(&mut self, address: PhysicalAddress, buf: &mut [u8]) -> Result<(), VmemError> {
        (**self).phys_read(address, buf)
    }

    fn phys_write(&mut self, address: PhysicalAddress, buf: &[u8]) -> Result<(), VmemError> {
        (**self).phys_write(address, buf)
    }

    fn phys_read_scatter(
        &mut self,
        plan: &[TransferDescriptor],
        buf: &mut [u8],
    ) -> Result<(), VmemError> {
        (**self).phys_read_scatter(plan, buf)
    }

    fn phys_write_scatter(
        &mut self,
        plan: &[TransferDescriptor],
        buf: &[u8],
    ) -> Result<(), VmemError> {
        (**self).phys_write_scatter(plan, buf)
    }

    fn phys_read_u64(&mut self, address: PhysicalAddress) -> Result<u64, VmemError> {
        (**self).phys_read_u64(address)
    }
}

#[cfg(test)]
pub(crate) mod testmem;
