// SPDX-License-Identifier: MIT

//! Address types and the bit fields an x86-64 walk pulls out of them.

pub const PAGE_SHIFT: u32 = 12;
pub const PAGE_SIZE: u64 = 1 << PAGE_SHIFT;

pub const PAGE_OFFSET_MASK: u64 = PAGE_SIZE - 1;
pub const LARGE_2M_OFFSET_MASK: u64 = (1 << 21) - 1;
pub const LARGE_1G_OFFSET_MASK: u64 = (1 << 30) - 1;

/// Each table holds 512 entries, so every index is 9 bits wide
pub const INDEX_MASK: u64 = 0x1ff;
pub const PT_SHIFT: u32 = 12;
pub const PD_SHIFT: u32 = 21;
pub const PDPT_SHIFT: u32 = 30;
pub const PML4_SHIFT: u32 = 39;

/// Low bits of the page table base register that carry metadata, not address
pub const DIRECTORY_BASE_FLAGS: u64 = 0xf;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct PhysicalAddress(pub u64);

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct VirtualAddress(pub u64);

/// Physical address of a process's top level page table.
///
/// Built from the raw page table base register value, with the metadata bits
/// already cleared.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct DirectoryBase(PhysicalAddress);

impl DirectoryBase {
    pub const fn new(raw: u64) -> Self {
        DirectoryBase(PhysicalAddress(raw & !DIRECTORY_BASE_FLAGS))
    }

    pub const fn address(&self) -> PhysicalAddress {
        self.0
    }
}

impl PhysicalAddress {
    /// Add a byte offset, failing on overflow
    pub fn checked_add(self, offset: u64) -> Option<PhysicalAddress> {
        self.0.checked_add(offset).map(PhysicalAddress)
    }
}

impl VirtualAddress {
    pub fn checked_add(self, offset: u64) -> Option<VirtualAddress> {
        self.0.checked_add(offset).map(VirtualAddress)
    }

    pub const fn page_offset(self) -> u64 {
        self.0 & PAGE_OFFSET_MASK
    }

    pub const fn page_number(self) -> u64 {
        self.0 >> PAGE_SHIFT
    }

    /// Start of the 4KiB page containing this address
    pub const fn page_base(self) -> VirtualAddress {
        VirtualAddress(self.0 & !PAGE_OFFSET_MASK)
    }

    pub const fn pt_index(self) -> u64 {
        (self.0 >> PT_SHIFT) & INDEX_MASK
    }

    pub const fn pd_index(self) -> u64 {
        (self.0 >> PD_SHIFT) & INDEX_MASK
    }

    pub const fn pdpt_index(self) -> u64 {
        (self.0 >> PDPT_SHIFT) & INDEX_MASK
    }

    pub const fn pml4_index(self) -> u64 {
        (self.0 >> PML4_SHIFT) & INDEX_MASK
    }

    /// Offset inside a 2MiB page
    pub const fn large_2m_offset(self) -> u64 {
        self.0 & LARGE_2M_OFFSET_MASK
    }

    /// Offset inside a 1GiB page
    pub const fn large_1g_offset(self) -> u64 {
        self.0 & LARGE_1G_OFFSET_MASK
    }
}
