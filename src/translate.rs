// SPDX-License-Identifier: MIT

use crate::addr::{DirectoryBase, PhysicalAddress, VirtualAddress};
use crate::entry::Entry;
use crate::{PhysicalMemory, VmemError};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PageSize {
    Size4K,
    Size2M,
    Size1G,
}

impl PageSize {
    pub fn bytes(&self) -> u64 {
        match self {
            PageSize::Size4K => 0x1000,
            PageSize::Size2M => 0x20_0000,
            PageSize::Size1G => 0x4000_0000,
        }
    }
}

/// Result of a successful walk
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Mapping {
    pub physical: PhysicalAddress,
    pub page_size: PageSize,
}

fn read_entry<T>(mem: &mut T, table: PhysicalAddress, index: u64) -> Result<Entry, VmemError>
where
    T: PhysicalMemory + ?Sized,
{
    let slot = table.checked_add(8 * index).ok_or(VmemError::Range)?;
    mem.phys_read_u64(slot).map(Entry)
}

/// Walk the four level x86-64 page tables rooted at `dir_base` for `address`.
///
/// Large pages end the walk early: a large entry one level below the top maps
/// 1GiB, a large entry two levels below maps 2MiB. A final entry with no frame
/// bits counts as unmapped.
pub fn walk<T>(
    mem: &mut T,
    dir_base: DirectoryBase,
    address: VirtualAddress,
) -> Result<Mapping, VmemError>
where
    T: PhysicalMemory + ?Sized,
{
    let unmapped = |level: &str| {
        trace!("walk {:#x}: {} entry not present", address.0, level);
        VmemError::Unmapped(address)
    };

    let pml4e = read_entry(mem, dir_base.address(), address.pml4_index())?;
    if !pml4e.is_present() {
        return Err(unmapped("pml4"));
    }

    let pdpte = read_entry(mem, pml4e.frame(), address.pdpt_index())?;
    if !pdpte.is_present() {
        return Err(unmapped("pdpt"));
    }
    if pdpte.is_large() {
        return Ok(Mapping {
            physical: PhysicalAddress(pdpte.large_1g_frame().0 + address.large_1g_offset()),
            page_size: PageSize::Size1G,
        });
    }

    let pde = read_entry(mem, pdpte.frame(), address.pd_index())?;
    if !pde.is_present() {
        return Err(unmapped("pd"));
    }
    if pde.is_large() {
        return Ok(Mapping {
            physical: PhysicalAddress(pde.frame().0 + address.large_2m_offset()),
            page_size: PageSize::Size2M,
        });
    }

    let pte = read_entry(mem, pde.frame(), address.pt_index())?;
    let frame = pte.frame();
    if frame.0 == 0 {
        return Err(unmapped("pt"));
    }

    Ok(Mapping {
        physical: PhysicalAddress(frame.0 + address.page_offset()),
        page_size: PageSize::Size4K,
    })
}

/// Translate one virtual address to its physical address
pub fn translate<T>(
    mem: &mut T,
    dir_base: DirectoryBase,
    address: VirtualAddress,
) -> Result<PhysicalAddress, VmemError>
where
    T: PhysicalMemory + ?Sized,
{
    walk(mem, dir_base, address).map(|mapping| mapping.physical)
}
