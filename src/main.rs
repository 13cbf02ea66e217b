mod addressing;
mod cpu;
mod error;
mod hexfile;
mod memory;
mod opcodes;
mod registers;

use cpu::Cpu;
use error::EmuError;
use memory::{Memory, DEFAULT_MEMORY_SIZE};
use opcodes::InstructionTable;
use registers::{CpuFlags, Registers, PROGRAM_START};

use std::env;
use std::path::Path;
use std::process;

const USAGE: &str = "\
Usage: emu6502 -f <hexfile> [-l <loadloc>] [-s <memsize>] [-t] [-h]

  -f <hexfile>   program to run, as whitespace-separated ascii hex
                 bytes (e.g. \"A9 05 69 03 8D 00 04 0D\")
  -l <loadloc>   load/start address in hex (default 0200)
  -s <memsize>   memory size in bytes, decimal (default 4096)
  -t             trace each executed instruction to stderr
  -h             print this help

The program is loaded at <loadloc>, the program counter starts
there, and the run continues until a BRK (0x0D). The final
register and flag state is printed on stdout.";

struct Options {
    hexfile: Option<String>,
    loadloc: u16,
    size: usize,
    trace: bool,
    help: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            hexfile: None,
            loadloc: PROGRAM_START,
            size: DEFAULT_MEMORY_SIZE,
            trace: false,
            help: false,
        }
    }
}

// Scan the command line, pairing each '-<?>' switch with the
// word that follows it when it takes one.
fn parse_args(args: &[String]) -> Result<Options, String> {
    let mut options = Options::default();
    let mut iter = args.iter();

    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-f" => {
                let file = iter.next().ok_or("-f expects a file name")?;
                options.hexfile = Some(file.clone());
            }
            "-l" => {
                let loc = iter.next().ok_or("-l expects a hex address")?;
                options.loadloc = u16::from_str_radix(loc, 16)
                    .map_err(|_| format!("invalid load address: {loc}"))?;
            }
            "-s" => {
                let size = iter.next().ok_or("-s expects a size in bytes")?;
                options.size = size
                    .parse()
                    .map_err(|_| format!("invalid memory size: {size}"))?;
            }
            "-t" => options.trace = true,
            "-h" => options.help = true,
            other => return Err(format!("unknown option: {other}")),
        }
    }

    Ok(options)
}

// Print the final register and flag state, one line per
// register, then the status flags bit by bit (the lone '-' line
// stands for the unused always-1 bit).
fn dump(regs: &Registers) {
    println!("A={:02X}", regs.a);
    println!("X={:02X}", regs.x);
    println!("Y={:02X}", regs.y);
    println!("S={:02X}", regs.s);
    println!("PC={:04X}", regs.pc);
    println!("P={:02X}", regs.p.bits());

    println!("N={}", regs.p.contains(CpuFlags::NEGATIVE) as u8);
    println!("V={}", regs.p.contains(CpuFlags::OVERFLOW) as u8);
    println!("-");
    println!("B={}", regs.p.contains(CpuFlags::BREAK) as u8);
    println!("D={}", regs.p.contains(CpuFlags::DECIMAL_MODE) as u8);
    println!("I={}", regs.p.contains(CpuFlags::INTERRUPT_DISABLE) as u8);
    println!("Z={}", regs.p.contains(CpuFlags::ZERO) as u8);
    println!("C={}", regs.p.contains(CpuFlags::CARRY) as u8);
}

fn emulate(hexfile: &str, options: &Options) -> Result<Registers, EmuError> {
    let program = hexfile::load(Path::new(hexfile))?;

    let mut memory = Memory::new(options.size);
    memory.load(&program, options.loadloc)?;

    // The table is built (and validated) once, before the run.
    let table = InstructionTable::new()?;

    let registers = Registers {
        pc: options.loadloc,
        ..Registers::default()
    };
    let mut cpu = Cpu::with_registers(memory, registers);

    if options.trace {
        // Stepping by hand instead of `run` so each dispatched
        // instruction can be reported as it goes by.
        while !cpu.registers.halted {
            let at = cpu.registers.pc;
            let opcode = cpu.step(&table)?;
            eprintln!("{:04X}  {}", at, opcode.name);
        }
        Ok(cpu.registers)
    } else {
        cpu.run(&table)
    }
}

fn main() {
    let args: Vec<String> = env::args().skip(1).collect();

    let options = match parse_args(&args) {
        Ok(options) => options,
        Err(message) => {
            eprintln!("error: {message}");
            eprintln!("{USAGE}");
            process::exit(1);
        }
    };

    if options.help {
        println!("{USAGE}");
        return;
    }

    let Some(hexfile) = options.hexfile.clone() else {
        eprintln!("{USAGE}");
        process::exit(1);
    };

    match emulate(&hexfile, &options) {
        Ok(registers) => dump(&registers),
        Err(err) => {
            eprintln!("error: {err}");
            process::exit(1);
        }
    }
}
