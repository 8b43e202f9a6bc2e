// SPDX-License-Identifier: MIT

//! Sparse simulated physical memory and a page table builder for unit tests.

use std::collections::BTreeMap;

use crate::addr::{DirectoryBase, PhysicalAddress, VirtualAddress, PAGE_SIZE};
use crate::entry::EntryFlags;
use crate::{PhysicalMemory, TransferDescriptor, VmemError};

const TABLE_FLAGS: u64 = EntryFlags::PRESENT.bits() | EntryFlags::WRITABLE.bits();
const LARGE_FLAGS: u64 = TABLE_FLAGS | EntryFlags::LARGE.bits();

/// Physical memory that reads zero wherever nothing was written
#[derive(Default)]
pub struct SparseMemory {
    pages: BTreeMap<u64, Box<[u8; PAGE_SIZE as usize]>>,
    /// Every physical read or write must stay below this address
    pub limit: Option<u64>,
    pub reads: usize,
    pub writes: usize,
    pub scatter_reads: usize,
    pub scatter_writes: usize,
}

impl SparseMemory {
    pub fn read_bytes(&self, address: u64, buf: &mut [u8]) {
        for (i, byte) in buf.iter_mut().enumerate() {
            let at = address + i as u64;
            let page = self.pages.get(&(at / PAGE_SIZE));
            *byte = page.map_or(0, |page| page[(at % PAGE_SIZE) as usize]);
        }
    }

    pub fn write_bytes(&mut self, address: u64, buf: &[u8]) {
        for (i, byte) in buf.iter().enumerate() {
            let at = address + i as u64;
            let page = self
                .pages
                .entry(at / PAGE_SIZE)
                .or_insert_with(|| Box::new([0; PAGE_SIZE as usize]));
            page[(at % PAGE_SIZE) as usize] = *byte;
        }
    }

    pub fn write_u64(&mut self, address: u64, value: u64) {
        self.write_bytes(address, &value.to_le_bytes());
    }

    fn check(&self, address: PhysicalAddress, size: usize) -> Result<(), VmemError> {
        match self.limit {
            Some(limit) if address.0 + size as u64 > limit => Err(VmemError::Access(address)),
            _ => Ok(()),
        }
    }
}

impl PhysicalMemory for SparseMemory {
    fn phys_read(&mut self, address: PhysicalAddress, buf: &mut [u8]) -> Result<(), VmemError> {
        self.check(address, buf.len())?;
        self.reads += 1;
        self.read_bytes(address.0, buf);
        Ok(())
    }

    fn phys_write(&mut self, address: PhysicalAddress, buf: &[u8]) -> Result<(), VmemError> {
        self.check(address, buf.len())?;
        self.writes += 1;
        self.write_bytes(address.0, buf);
        Ok(())
    }

    fn phys_read_scatter(
        &mut self,
        plan: &[TransferDescriptor],
        buf: &mut [u8],
    ) -> Result<(), VmemError> {
        self.scatter_reads += 1;
        for desc in plan {
            self.check(desc.physical, desc.size)?;
            self.read_bytes(desc.physical.0, &mut buf[desc.local_range()]);
        }
        Ok(())
    }

    fn phys_write_scatter(
        &mut self,
        plan: &[TransferDescriptor],
        buf: &[u8],
    ) -> Result<(), VmemError> {
        self.scatter_writes += 1;
        for desc in plan {
            self.check(desc.physical, desc.size)?;
            self.write_bytes(desc.physical.0, &buf[desc.local_range()]);
        }
        Ok(())
    }
}

/// Builds four level page tables inside a `SparseMemory`
pub struct PageTables {
    pub mem: SparseMemory,
    pub dtb: DirectoryBase,
    next_table: u64,
}

impl PageTables {
    pub fn new() -> Self {
        PageTables {
            mem: SparseMemory::default(),
            dtb: DirectoryBase::new(0x1000),
            next_table: 0x2000,
        }
    }

    fn next_level(&mut self, table: u64, index: u64) -> u64 {
        let slot = table + 8 * index;
        let mut raw = [0u8; 8];
        self.mem.read_bytes(slot, &mut raw);
        let entry = u64::from_le_bytes(raw);
        if entry & 1 != 0 {
            return entry & 0xf_ffff_f000;
        }
        let frame = self.next_table;
        self.next_table += PAGE_SIZE;
        self.mem.write_u64(slot, frame | TABLE_FLAGS);
        frame
    }

    pub fn map_4k(&mut self, vaddr: u64, frame: u64) {
        let v = VirtualAddress(vaddr);
        let pdpt = self.next_level(self.dtb.address().0, v.pml4_index());
        let pd = self.next_level(pdpt, v.pdpt_index());
        let pt = self.next_level(pd, v.pd_index());
        self.mem.write_u64(pt + 8 * v.pt_index(), frame | TABLE_FLAGS);
    }

    pub fn map_2m(&mut self, vaddr: u64, frame: u64) {
        let v = VirtualAddress(vaddr);
        let pdpt = self.next_level(self.dtb.address().0, v.pml4_index());
        let pd = self.next_level(pdpt, v.pdpt_index());
        self.mem.write_u64(pd + 8 * v.pd_index(), frame | LARGE_FLAGS);
    }

    pub fn map_1g(&mut self, vaddr: u64, frame: u64) {
        let v = VirtualAddress(vaddr);
        let pdpt = self.next_level(self.dtb.address().0, v.pml4_index());
        self.mem.write_u64(pdpt + 8 * v.pdpt_index(), frame | LARGE_FLAGS);
    }

    /// Map `count` consecutive pages of `vaddr` to consecutive frames from `frame`
    pub fn map_range(&mut self, vaddr: u64, frame: u64, count: u64) {
        for i in 0..count {
            self.map_4k(vaddr + i * PAGE_SIZE, frame + i * PAGE_SIZE);
        }
    }

    /// Overwrite the raw entry the walk would read at `level` (0 = top) for `vaddr`
    pub fn set_entry(&mut self, vaddr: u64, level: usize, value: u64) {
        let v = VirtualAddress(vaddr);
        let indices = [v.pml4_index(), v.pdpt_index(), v.pd_index(), v.pt_index()];
        let mut table = self.dtb.address().0;
        for index in &indices[..level] {
            table = self.next_level(table, *index);
        }
        self.mem.write_u64(table + 8 * indices[level], value);
    }
}
