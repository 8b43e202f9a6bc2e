// SPDX-License-Identifier: MIT

//! Splitting a virtual byte range into transfers that never cross a 4KiB page.

use alloc::vec::Vec;
use core::ops::Range;

use crate::addr::{DirectoryBase, PhysicalAddress, VirtualAddress, PAGE_SIZE};
use crate::translate::translate;
use crate::{PhysicalMemory, VmemError};

/// One page bounded copy between the caller's buffer and physical memory
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct TransferDescriptor {
    /// Byte offset into the caller's buffer
    pub local: usize,
    pub physical: PhysicalAddress,
    pub size: usize,
}

impl TransferDescriptor {
    pub fn local_range(&self) -> Range<usize> {
        self.local..self.local + self.size
    }
}

/// Upper bound on the number of descriptors a transfer of `length` bytes needs,
/// whatever the alignment of its start.
pub fn descriptor_capacity(length: usize) -> usize {
    if length == 0 {
        return 0;
    }
    (length - 1).div_ceil(PAGE_SIZE as usize) + 1
}

/// Build the ordered list of page bounded transfers covering
/// `[remote, remote + length)`, translating each page on the way.
///
/// Local offsets start at 0 and partition the caller's buffer contiguously.
/// The whole plan fails if any page in the range is unmapped.
pub fn plan<T>(
    mem: &mut T,
    dir_base: DirectoryBase,
    remote: VirtualAddress,
    length: usize,
) -> Result<Vec<TransferDescriptor>, VmemError>
where
    T: PhysicalMemory + ?Sized,
{
    // Grown per translated page, so a bogus length fails on its first unmapped page
    let mut descriptors = Vec::new();
    if length == 0 {
        return Ok(descriptors);
    }
    remote.checked_add(length as u64 - 1).ok_or(VmemError::Range)?;

    let head = (PAGE_SIZE - remote.page_offset()) as usize;
    let mut size = head.min(length);
    let mut address = remote;
    let mut local = 0;
    loop {
        descriptors.push(TransferDescriptor {
            local,
            physical: translate(mem, dir_base, address)?,
            size,
        });
        local += size;
        if local == length {
            break;
        }
        address = VirtualAddress(address.page_base().0 + PAGE_SIZE);
        size = (length - local).min(PAGE_SIZE as usize);
    }

    debug!(
        "plan {:#x}+{:#x}: {} descriptors",
        remote.0,
        length,
        descriptors.len()
    );
    Ok(descriptors)
}
