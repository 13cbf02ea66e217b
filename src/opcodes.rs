use crate::addressing::AddressingMode;
use crate::error::EmuError;
use crate::memory::Memory;
use crate::registers::{CpuFlags, Registers};

use lazy_static::lazy_static;
use std::collections::HashMap;

/// An instruction handler: given exclusive access to the
/// register file and the memory for the duration of one
/// dispatch, it performs the instruction's effect and advances
/// the program counter by the instruction's length as its final
/// step. Advancement is part of the handler contract (rather
/// than a separate run-loop step) so that control-flow
/// instructions added later can override it.
pub type Handler = fn(&mut Registers, &mut Memory, &Opcode) -> Result<(), EmuError>;

// Instructions are executed by the CPU by reading opcodes. Each
// opcode corresponds to a byte in memory, to which we add a
// name (for diagnostics), a total length in bytes (opcode
// included), an addressing mode, and the handler function that
// carries out the instruction.
pub struct Opcode {
    pub code: u8,
    pub name: &'static str,
    pub bytes: u16,
    pub mode: AddressingMode,
    pub handler: Handler,
}

impl Opcode {
    fn new(code: u8, name: &'static str, bytes: u16, mode: AddressingMode, handler: Handler) -> Self {
        Opcode {
            code,
            name,
            bytes,
            mode,
            handler,
        }
    }
}

/// Load a byte into the accumulator
fn lda(regs: &mut Registers, mem: &mut Memory, opcode: &Opcode) -> Result<(), EmuError> {
    // The accumulator is loaded with the resolved operand, and
    // the zero/negative flags are updated from the new value.
    regs.a = opcode.mode.operand(regs, mem)?.value(mem)?;
    regs.p.update_zn(regs.a);

    regs.pc = regs.pc.wrapping_add(opcode.bytes);
    Ok(())
}

/// Add the operand and the carry bit to the accumulator
fn adc(regs: &mut Registers, mem: &mut Memory, opcode: &Opcode) -> Result<(), EmuError> {
    let value = opcode.mode.operand(regs, mem)?.value(mem)?;

    // Add the operand to the accumulator, together with the
    // incoming carry bit, in 16-bit space so the carry out of
    // bit 7 is visible.
    let carry_in = regs.p.contains(CpuFlags::CARRY) as u16;
    let sum = regs.a as u16 + value as u16 + carry_in;

    // The carry flag records whether the result is larger than
    // 255, the largest value an unsigned byte can hold. It is
    // cleared when no carry occurred, so no stale carry from a
    // previous instruction survives.
    if sum > 0xff {
        regs.p.insert(CpuFlags::CARRY);
    } else {
        regs.p.remove(CpuFlags::CARRY);
    }

    // Overflow occurs when the result of a signed operation
    // does not fit into a signed byte: two positive inputs give
    // a negative output, or two negative inputs a positive one.
    // That is the case exactly when both inputs have the same
    // sign bit and the output's sign bit differs from it. Like
    // the carry, the flag is cleared whenever the condition
    // does not hold.
    let result = sum as u8;
    if (result ^ regs.a) & (result ^ value) & 0x80 != 0 {
        regs.p.insert(CpuFlags::OVERFLOW);
    } else {
        regs.p.remove(CpuFlags::OVERFLOW);
    }

    regs.a = result;
    regs.p.update_zn(regs.a);

    regs.pc = regs.pc.wrapping_add(opcode.bytes);
    Ok(())
}

/// Store the accumulator in memory
fn sta(regs: &mut Registers, mem: &mut Memory, opcode: &Opcode) -> Result<(), EmuError> {
    let address = opcode.mode.operand(regs, mem)?.address();
    mem.write(address, regs.a)?;

    // No flags are affected by a store.
    regs.pc = regs.pc.wrapping_add(opcode.bytes);
    Ok(())
}

/// Logical AND of the accumulator and the operand
fn and(regs: &mut Registers, mem: &mut Memory, opcode: &Opcode) -> Result<(), EmuError> {
    let value = opcode.mode.operand(regs, mem)?.value(mem)?;
    regs.a &= value;
    regs.p.update_zn(regs.a);

    regs.pc = regs.pc.wrapping_add(opcode.bytes);
    Ok(())
}

/// Copy the accumulator to the X register
fn tax(regs: &mut Registers, _mem: &mut Memory, opcode: &Opcode) -> Result<(), EmuError> {
    regs.x = regs.a;
    regs.p.update_zn(regs.x);

    regs.pc = regs.pc.wrapping_add(opcode.bytes);
    Ok(())
}

/// Increment the X register
fn inx(regs: &mut Registers, _mem: &mut Memory, opcode: &Opcode) -> Result<(), EmuError> {
    regs.x = regs.x.wrapping_add(1);
    regs.p.update_zn(regs.x);

    regs.pc = regs.pc.wrapping_add(opcode.bytes);
    Ok(())
}

/// Clear the carry flag
fn clc(regs: &mut Registers, _mem: &mut Memory, opcode: &Opcode) -> Result<(), EmuError> {
    regs.p.remove(CpuFlags::CARRY);

    regs.pc = regs.pc.wrapping_add(opcode.bytes);
    Ok(())
}

/// Set the carry flag
fn sec(regs: &mut Registers, _mem: &mut Memory, opcode: &Opcode) -> Result<(), EmuError> {
    regs.p.insert(CpuFlags::CARRY);

    regs.pc = regs.pc.wrapping_add(opcode.bytes);
    Ok(())
}

/// No operation
fn nop(regs: &mut Registers, _mem: &mut Memory, opcode: &Opcode) -> Result<(), EmuError> {
    regs.pc = regs.pc.wrapping_add(opcode.bytes);
    Ok(())
}

/// Halt the emulator. On the real chip BRK forces a software
/// interrupt (stack push, vector fetch); in this minimal
/// interrupt model it simply raises the run flag, and the run
/// loop stops fetching once the handler returns.
fn brk(regs: &mut Registers, _mem: &mut Memory, opcode: &Opcode) -> Result<(), EmuError> {
    regs.halted = true;

    regs.pc = regs.pc.wrapping_add(opcode.bytes);
    Ok(())
}

lazy_static! {
    pub static ref OPCODES: Vec<Opcode> = vec![
        // Special. Note that BRK lives at 0x0D in this
        // instruction set, not at the real chip's 0x00.
        Opcode::new(0x0d, "BRK", 1, AddressingMode::Implied, brk),
        Opcode::new(0xea, "NOP", 1, AddressingMode::Implied, nop),

        // Arithmetic and logic
        Opcode::new(0x69, "ADC", 2, AddressingMode::Immediate, adc),
        Opcode::new(0x6d, "ADC", 3, AddressingMode::Absolute, adc),
        Opcode::new(0x29, "AND", 2, AddressingMode::Immediate, and),
        Opcode::new(0x2d, "AND", 3, AddressingMode::Absolute, and),

        // Loads and stores
        Opcode::new(0xa9, "LDA", 2, AddressingMode::Immediate, lda),
        Opcode::new(0xad, "LDA", 3, AddressingMode::Absolute, lda),
        Opcode::new(0x8d, "STA", 3, AddressingMode::Absolute, sta),

        // Register transfers
        Opcode::new(0xaa, "TAX", 1, AddressingMode::Implied, tax),
        Opcode::new(0xe8, "INX", 1, AddressingMode::Implied, inx),

        // Flag manipulation
        Opcode::new(0x18, "CLC", 1, AddressingMode::Implied, clc),
        Opcode::new(0x38, "SEC", 1, AddressingMode::Implied, sec),
    ];
}

// The decode table, keyed by opcode byte. It is validated when
// built: a descriptor whose declared length disagrees with its
// addressing mode would silently desynchronize the program
// counter at run time, so that mismatch (and any duplicated
// opcode byte) is rejected here, before any instruction ever
// executes.
pub struct InstructionTable {
    map: HashMap<u8, &'static Opcode>,
}

impl InstructionTable {
    /// Build and validate the table over the full instruction set
    pub fn new() -> Result<Self, EmuError> {
        Self::from_opcodes(&OPCODES)
    }

    /// Build and validate a table over the given descriptors
    pub fn from_opcodes(opcodes: &'static [Opcode]) -> Result<Self, EmuError> {
        let mut map: HashMap<u8, &'static Opcode> = HashMap::new();

        for opcode in opcodes {
            if opcode.bytes != opcode.mode.length() {
                return Err(EmuError::TableInconsistency {
                    opcode: opcode.code,
                    detail: format!(
                        "{} declares {} bytes but {:?} addressing takes {}",
                        opcode.name,
                        opcode.bytes,
                        opcode.mode,
                        opcode.mode.length()
                    ),
                });
            }

            if map.insert(opcode.code, opcode).is_some() {
                return Err(EmuError::TableInconsistency {
                    opcode: opcode.code,
                    detail: format!("duplicate entry for {}", opcode.name),
                });
            }
        }

        Ok(Self { map })
    }

    /// Decode an opcode byte into its descriptor
    pub fn lookup(&self, code: u8) -> Result<&'static Opcode, EmuError> {
        self.map
            .get(&code)
            .copied()
            .ok_or(EmuError::IllegalOpcode(code))
    }
}
