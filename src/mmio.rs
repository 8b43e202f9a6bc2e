// SPDX-License-Identifier: MIT

use core::ptr;

use super::{PhysicalAddress, PhysicalMemory, VmemError};

/// A contiguous run of physical memory visible in this process, starting at `base`.
///
/// Every byte goes through a volatile load or store, so the window can sit on
/// top of a live `/dev/mem` mapping as well as a plain buffer.
pub struct PhysicalWindow<'a> {
    base: PhysicalAddress,
    bytes: &'a mut [u8],
}

impl<'a> PhysicalWindow<'a> {
    pub fn new(base: PhysicalAddress, bytes: &'a mut [u8]) -> Self {
        PhysicalWindow { base, bytes }
    }

    pub fn base(&self) -> PhysicalAddress {
        self.base
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    fn offset(&self, address: PhysicalAddress, size: usize) -> Result<usize, VmemError> {
        let offset = address.0.checked_sub(self.base.0).ok_or(VmemError::Access(address))?;
        let offset = usize::try_from(offset).map_err(|_| VmemError::Access(address))?;
        match offset.checked_add(size) {
            Some(end) if end <= self.bytes.len() => Ok(offset),
            _ => Err(VmemError::Access(address)),
        }
    }
}

impl PhysicalMemory for PhysicalWindow<'_> {
    fn phys_read(&mut self, address: PhysicalAddress, buf: &mut [u8]) -> Result<(), VmemError> {
        let offset = self.offset(address, buf.len())?;
        for (dst, src) in buf.iter_mut().zip(&self.bytes[offset..]) {
            *dst = unsafe { ptr::read_volatile(src) };
        }
        Ok(())
    }

    fn phys_write(&mut self, address: PhysicalAddress, buf: &[u8]) -> Result<(), VmemError> {
        let offset = self.offset(address, buf.len())?;
        for (dst, src) in self.bytes[offset..].iter_mut().zip(buf) {
            unsafe { ptr::write_volatile(dst, *src) };
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::PhysicalWindow;
    use crate::{PhysicalAddress, PhysicalMemory, VmemError};

    #[test]
    fn window_is_offset_by_base() {
        let mut backing = [0u8; 0x100];
        let mut window = PhysicalWindow::new(PhysicalAddress(0x5000), &mut backing);
        assert_eq!(window.base(), PhysicalAddress(0x5000));
        assert_eq!(window.len(), 0x100);
        assert!(!window.is_empty());

        window.phys_write(PhysicalAddress(0x50f0), &[1, 2, 3]).unwrap();
        let mut buf = [0u8; 3];
        window.phys_read(PhysicalAddress(0x50f0), &mut buf).unwrap();
        assert_eq!(buf, [1, 2, 3]);
        assert_eq!(backing[0xf0..0xf3], [1, 2, 3]);
    }

    #[test]
    fn accesses_outside_window_fail() {
        let mut backing = [0u8; 0x100];
        let mut window = PhysicalWindow::new(PhysicalAddress(0x5000), &mut backing);
        let mut buf = [0u8; 2];

        for below_or_past in [0x4fff, 0x50ff] {
            let address = PhysicalAddress(below_or_past);
            assert_eq!(window.phys_read(address, &mut buf), Err(VmemError::Access(address)));
        }
        assert!(window.phys_read(PhysicalAddress(0x50fe), &mut buf).is_ok());
    }

    #[test]
    fn empty_window_only_takes_empty_transfers() {
        let mut backing = [0u8; 0];
        let mut window = PhysicalWindow::new(PhysicalAddress(0x1000), &mut backing);
        assert!(window.is_empty());
        assert!(window.phys_write(PhysicalAddress(0x1000), &[0]).is_err());
        assert!(window.phys_read(PhysicalAddress(0x1000), &mut []).is_ok());
    }
}
