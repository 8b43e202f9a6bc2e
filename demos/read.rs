// SPDX-License-Identifier: MIT

use std::{env, fs, process};
use x86_vmem::{DirectoryBase, MappedMemory, VirtualAddress, VirtualMemory};

mod util;

/// Bytes per read, so progress can be shown for large ranges
const CHUNK: usize = 65536;

fn main() {
    util::init_logging();

    let args: Vec<String> = env::args().skip(1).collect();
    if args.len() != 3 {
        eprintln!("read [dtb] [address] [length]");
        process::exit(1);
    }
    let numbers: Result<Vec<u64>, String> =
        args.iter().map(|arg| util::parse_number(arg)).collect();
    let (dtb, address, len) = match numbers.as_deref() {
        Ok(&[dtb, address, len]) => (dtb, address, len as usize),
        Ok(_) => unreachable!(),
        Err(err) => {
            eprintln!("{}", err);
            process::exit(1);
        }
    };

    let dev = match util::DevMem::open("/dev/mem", false) {
        Ok(dev) => dev,
        Err(err) => {
            eprintln!("failed to open /dev/mem: {}", err);
            process::exit(1);
        }
    };
    let mut vm = VirtualMemory::new(MappedMemory::new(dev), DirectoryBase::new(dtb));

    let mut data = Vec::with_capacity(len);
    while data.len() < len {
        let mut buf = vec![0; CHUNK.min(len - data.len())];
        let at = VirtualAddress(address + data.len() as u64);
        if let Err(err) = vm.read(at, &mut buf) {
            eprintln!("\nread at {:#x} failed: {}", at.0, err);
            process::exit(1);
        }
        data.extend_from_slice(&buf);
        eprint!("\rVMEM READ: {} KB", data.len() / 1024);
    }

    eprintln!("");

    fs::write("read.bin", &data).unwrap();
}
