// SPDX-License-Identifier: MIT

use clap::{App, AppSettings, Arg, ArgMatches, SubCommand};
use std::io::{self, Write};
use std::process;
use x86_vmem::{DirectoryBase, MappedMemory, VirtualAddress, VirtualMemory};

#[path = "../demos/util/mod.rs"]
mod util;

/// Bytes printed per hexdump line
const LINE: usize = 16;

type AddressSpace = VirtualMemory<MappedMemory<util::DevMem>>;

fn address_space(
    matches: &ArgMatches,
    sub: &ArgMatches,
    writable: bool,
) -> Result<AddressSpace, String> {
    let path = matches.value_of("mem").unwrap_or("/dev/mem");
    let dtb = util::parse_number(sub.value_of("dtb").unwrap_or_default())?;
    let dev = util::DevMem::open(path, writable)
        .map_err(|err| format!("failed to open {}: {}", path, err))?;
    Ok(VirtualMemory::new(MappedMemory::new(dev), DirectoryBase::new(dtb)))
}

fn address(sub: &ArgMatches) -> Result<VirtualAddress, String> {
    util::parse_number(sub.value_of("address").unwrap_or_default()).map(VirtualAddress)
}

fn parse_hex(data: &str) -> Result<Vec<u8>, String> {
    let digits: Vec<char> = data.chars().filter(|c| !c.is_whitespace()).collect();
    if digits.len() % 2 != 0 {
        return Err(format!("hex data has an odd number of digits: {}", digits.len()));
    }
    digits
        .chunks(2)
        .map(|pair| {
            let byte: String = pair.iter().collect();
            u8::from_str_radix(&byte, 16)
                .map_err(|err| format!("invalid hex byte {:?}: {}", byte, err))
        })
        .collect()
}

fn hexdump(start: u64, data: &[u8]) -> io::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    for (i, line) in data.chunks(LINE).enumerate() {
        write!(out, "{:016x}:", start + (i * LINE) as u64)?;
        for byte in line {
            write!(out, " {:02x}", byte)?;
        }
        for _ in line.len()..LINE {
            write!(out, "   ")?;
        }
        let ascii: String = line
            .iter()
            .map(|&b| if b.is_ascii_graphic() || b == b' ' { b as char } else { '.' })
            .collect();
        writeln!(out, "  {}", ascii)?;
    }
    Ok(())
}

fn run(matches: &ArgMatches) -> Result<(), String> {
    match matches.subcommand() {
        ("translate", Some(sub)) => {
            let mut vm = address_space(matches, sub, false)?;
            let address = address(sub)?;
            let mapping = vm.walk(address).map_err(|err| err.to_string())?;
            println!(
                "{:#x} -> {:#x} ({} KB page)",
                address.0,
                mapping.physical.0,
                mapping.page_size.bytes() / 1024
            );
        }
        ("read", Some(sub)) => {
            let mut vm = address_space(matches, sub, false)?;
            let address = address(sub)?;
            let len = util::parse_number(sub.value_of("length").unwrap_or_default())?;
            let len = usize::try_from(len).map_err(|_| format!("length {:#x} too large", len))?;

            let mut data = vec![0; len];
            vm.read(address, &mut data).map_err(|err| err.to_string())?;
            hexdump(address.0, &data).map_err(|err| err.to_string())?;
        }
        ("write", Some(sub)) => {
            let mut vm = address_space(matches, sub, true)?;
            let address = address(sub)?;
            let data = parse_hex(sub.value_of("data").unwrap_or_default())?;

            vm.write(address, &data).map_err(|err| err.to_string())?;
            eprintln!("wrote {} bytes at {:#x}", data.len(), address.0);
        }
        (other, _) => return Err(format!("unknown command {:?}", other)),
    }
    Ok(())
}

fn main() {
    util::init_logging();

    let dtb = Arg::with_name("dtb")
        .required(true)
        .help("Page table base register value of the target process");
    let address = Arg::with_name("address")
        .required(true)
        .help("Virtual address in the target process");

    let matches = App::new("x86-vmem")
        .about("Translate and access another process's virtual memory through physical memory")
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .arg(
            Arg::with_name("mem")
                .long("mem")
                .takes_value(true)
                .default_value("/dev/mem")
                .help("Physical memory device to map"),
        )
        .subcommand(
            SubCommand::with_name("translate")
                .about("Walk the page tables for one address")
                .arg(dtb.clone())
                .arg(address.clone()),
        )
        .subcommand(
            SubCommand::with_name("read")
                .about("Hexdump a virtual range")
                .arg(dtb.clone())
                .arg(address.clone())
                .arg(Arg::with_name("length").required(true).help("Number of bytes")),
        )
        .subcommand(
            SubCommand::with_name("write")
                .about("Write hex bytes to a virtual range")
                .arg(dtb)
                .arg(address)
                .arg(Arg::with_name("data").required(true).help("Bytes as hex, e.g. deadbeef")),
        )
        .get_matches();

    if let Err(err) = run(&matches) {
        eprintln!("x86-vmem: {}", err);
        process::exit(1);
    }
}
