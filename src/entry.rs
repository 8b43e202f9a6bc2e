// SPDX-License-Identifier: MIT

use crate::addr::PhysicalAddress;

/// Frame bits of a table or 4KiB/2MiB entry: bits 12 through 35
pub const FRAME_MASK: u64 = 0xf_ffff_f000;
/// Frame bits of a 1GiB entry: bits 30 through 51
pub const LARGE_1G_FRAME_MASK: u64 = 0x000f_ffff_c000_0000;

bitflags! {
    #[derive(Clone, Copy, Debug, Eq, PartialEq)]
    pub struct EntryFlags: u64 {
        const PRESENT = 1 << 0;
        const WRITABLE = 1 << 1;
        const USER = 1 << 2;
        const WRITE_THROUGH = 1 << 3;
        const NO_CACHE = 1 << 4;
        const ACCESSED = 1 << 5;
        const DIRTY = 1 << 6;
        const LARGE = 1 << 7;
        const GLOBAL = 1 << 8;
        const NO_EXECUTE = 1 << 63;
    }
}

/// One 8 byte page table entry as read from physical memory
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Entry(pub u64);

impl Entry {
    pub fn flags(&self) -> EntryFlags {
        EntryFlags::from_bits_truncate(self.0)
    }

    pub fn is_present(&self) -> bool {
        self.flags().contains(EntryFlags::PRESENT)
    }

    pub fn is_large(&self) -> bool {
        self.flags().contains(EntryFlags::LARGE)
    }

    pub fn frame(&self) -> PhysicalAddress {
        PhysicalAddress(self.0 & FRAME_MASK)
    }

    pub fn large_1g_frame(&self) -> PhysicalAddress {
        PhysicalAddress(self.0 & LARGE_1G_FRAME_MASK)
    }
}
