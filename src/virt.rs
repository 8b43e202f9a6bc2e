// SPDX-License-Identifier: MIT

//! Reads and writes of another address space's virtual memory.

use crate::addr::{DirectoryBase, PhysicalAddress, VirtualAddress};
use crate::plan::plan;
use crate::translate::{translate, walk, Mapping};
use crate::{PhysicalMemory, VmemError};

/// Whether `[remote, remote + len]` stays in one page, so one translation covers it.
///
/// A range ending at the very top of the address space goes to the planner.
fn single_page(remote: VirtualAddress, len: usize) -> bool {
    match remote.checked_add(len as u64) {
        Some(end) => remote.page_number() == end.page_number(),
        None => false,
    }
}

pub fn read_virtual<T>(
    mem: &mut T,
    dir_base: DirectoryBase,
    remote: VirtualAddress,
    buf: &mut [u8],
) -> Result<(), VmemError>
where
    T: PhysicalMemory + ?Sized,
{
    if buf.is_empty() {
        return Ok(());
    }

    if single_page(remote, buf.len()) {
        let physical = translate(mem, dir_base, remote)?;
        return mem.phys_read(physical, buf);
    }

    let plan = plan(mem, dir_base, remote, buf.len())?;
    mem.phys_read_scatter(&plan, buf)
}

pub fn write_virtual<T>(
    mem: &mut T,
    dir_base: DirectoryBase,
    remote: VirtualAddress,
    buf: &[u8],
) -> Result<(), VmemError>
where
    T: PhysicalMemory + ?Sized,
{
    if buf.is_empty() {
        return Ok(());
    }

    if single_page(remote, buf.len()) {
        let physical = translate(mem, dir_base, remote)?;
        return mem.phys_write(physical, buf);
    }

    let plan = plan(mem, dir_base, remote, buf.len())?;
    mem.phys_write_scatter(&plan, buf)
}

/// Read a little-endian `u64` at a virtual address, even if it straddles a page
pub fn read_u64<T>(
    mem: &mut T,
    dir_base: DirectoryBase,
    remote: VirtualAddress,
) -> Result<u64, VmemError>
where
    T: PhysicalMemory + ?Sized,
{
    let mut bytes = [0; 8];
    read_virtual(mem, dir_base, remote, &mut bytes)?;
    Ok(u64::from_le_bytes(bytes))
}

pub fn write_u64<T>(
    mem: &mut T,
    dir_base: DirectoryBase,
    remote: VirtualAddress,
    value: u64,
) -> Result<(), VmemError>
where
    T: PhysicalMemory + ?Sized,
{
    write_virtual(mem, dir_base, remote, &value.to_le_bytes())
}

/// The address space of one process, reached through raw physical memory
pub struct VirtualMemory<T: PhysicalMemory> {
    mem: T,
    dir_base: DirectoryBase,
}

impl<T: PhysicalMemory> VirtualMemory<T> {
    pub fn new(mem: T, dir_base: DirectoryBase) -> Self {
        VirtualMemory { mem, dir_base }
    }

    pub fn dir_base(&self) -> DirectoryBase {
        self.dir_base
    }

    pub fn physical(&mut self) -> &mut T {
        &mut self.mem
    }

    pub fn into_inner(self) -> T {
        self.mem
    }

    pub fn walk(&mut self, address: VirtualAddress) -> Result<Mapping, VmemError> {
        walk(&mut self.mem, self.dir_base, address)
    }

    pub fn translate(&mut self, address: VirtualAddress) -> Result<PhysicalAddress, VmemError> {
        translate(&mut self.mem, self.dir_base, address)
    }

    pub fn read(&mut self, address: VirtualAddress, buf: &mut [u8]) -> Result<(), VmemError> {
        read_virtual(&mut self.mem, self.dir_base, address, buf)
    }

    pub fn write(&mut self, address: VirtualAddress, buf: &[u8]) -> Result<(), VmemError> {
        write_virtual(&mut self.mem, self.dir_base, address, buf)
    }

    pub fn read_u64(&mut self, address: VirtualAddress) -> Result<u64, VmemError> {
        read_u64(&mut self.mem, self.dir_base, address)
    }

    pub fn write_u64(&mut self, address: VirtualAddress, value: u64) -> Result<(), VmemError> {
        write_u64(&mut self.mem, self.dir_base, address, value)
    }
}
