// SPDX-License-Identifier: MIT

use log::{LevelFilter, Log, Metadata, Record};
use std::ffi::CString;
use std::{env, io, ptr};
use x86_vmem::{Mapper, PhysicalAddress, VmemError};

/// Physical memory mapped out of a `/dev/mem` style device
pub struct DevMem {
    fd: libc::c_int,
    prot: libc::c_int,
    page_size: usize,
}

impl DevMem {
    pub fn open(path: &str, writable: bool) -> io::Result<DevMem> {
        let path = CString::new(path)
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidInput, err))?;
        let (flags, prot) = if writable {
            (libc::O_RDWR | libc::O_SYNC, libc::PROT_READ | libc::PROT_WRITE)
        } else {
            (libc::O_RDONLY | libc::O_SYNC, libc::PROT_READ)
        };

        let fd = unsafe { libc::open(path.as_ptr(), flags) };
        if fd < 0 {
            return Err(io::Error::last_os_error());
        }

        let page_size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
        Ok(DevMem {
            fd,
            prot,
            page_size: if page_size > 0 { page_size as usize } else { 4096 },
        })
    }
}

impl Mapper for DevMem {
    unsafe fn map_aligned(
        &mut self,
        address: PhysicalAddress,
        size: usize,
    ) -> Result<*mut u8, VmemError> {
        let offset = libc::off_t::try_from(address.0).map_err(|_| VmemError::Range)?;
        let p = libc::mmap(
            ptr::null_mut(),
            size,
            self.prot,
            libc::MAP_SHARED,
            self.fd,
            offset
        );
        if p == libc::MAP_FAILED {
            log::debug!("mmap {:#x}+{:#x}: {}", address.0, size, io::Error::last_os_error());
            return Err(VmemError::Map);
        }
        Ok(p as *mut u8)
    }

    unsafe fn unmap_aligned(&mut self, pointer: *mut u8, size: usize) -> Result<(), VmemError> {
        if libc::munmap(pointer as *mut libc::c_void, size) != 0 {
            return Err(VmemError::Map);
        }
        Ok(())
    }

    fn page_size(&self) -> usize {
        self.page_size
    }
}

impl Drop for DevMem {
    fn drop(&mut self) {
        unsafe { libc::close(self.fd); }
    }
}

struct StderrLogger;

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            eprintln!("[{:>5}] {}", record.level(), record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER: StderrLogger = StderrLogger;

/// Log to stderr at the level named by `VMEM_LOG`, `warn` if unset
pub fn init_logging() {
    let level = env::var("VMEM_LOG")
        .ok()
        .and_then(|level| level.parse::<LevelFilter>().ok())
        .unwrap_or(LevelFilter::Warn);
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(level);
    }
}

/// Parse `0x` prefixed hex or plain decimal
pub fn parse_number(value: &str) -> Result<u64, String> {
    let parsed = match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(&hex.replace('_', ""), 16),
        None => value.replace('_', "").parse::<u64>(),
    };
    parsed.map_err(|err| format!("invalid number {:?}: {}", value, err))
}
