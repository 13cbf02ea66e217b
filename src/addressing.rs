use crate::error::EmuError;
use crate::memory::Memory;
use crate::registers::Registers;

// An instruction's operand can be located in a number of
// different ways, called "addressing modes", which vary
// depending on the instruction (with many instructions having
// several addressing modes). The representative subset here
// supports three of them:
//  - Immediate (#$c0): the operand byte is given directly in
//    the instruction stream, right after the opcode (for
//    example, LDA #$c0 loads the *value* 0xc0 into the
//    accumulator, not the contents of address 0xc0). The
//    instruction is 2 bytes long: opcode + operand.
//  - Absolute ($c000): the two bytes after the opcode form a
//    full 16-bit memory location, stored low byte first
//    (little-endian): effective address = low + 256 * high.
//    The operand is the byte stored there. The instruction is
//    3 bytes long: opcode + pointer low + pointer high.
//  - Implied: instructions that don't deal with memory
//    locations at all -- the argument is implied by the
//    instruction itself, and the instruction is the opcode
//    byte alone.
//
// The resolver is a pure computation from (mode, registers,
// memory) to an operand, so handlers never re-derive byte
// layout themselves, and new modes can be added here without
// the run loop ever noticing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressingMode {
    Immediate,
    Absolute,
    Implied,
}

/// A resolved operand: either a literal value carried by the
/// instruction itself, the address of the byte to operate on,
/// or nothing at all for implied instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    Value(u8),
    Address(u16),
    None,
}

impl AddressingMode {
    /// Total instruction length in bytes, opcode included
    pub fn length(&self) -> u16 {
        match self {
            AddressingMode::Implied => 1,
            AddressingMode::Immediate => 2,
            AddressingMode::Absolute => 3,
        }
    }

    /// Resolve the operand of the instruction at the current
    /// program counter
    pub fn operand(&self, regs: &Registers, mem: &Memory) -> Result<Operand, EmuError> {
        match self {
            // The immediate operand is the byte right after the
            // opcode, taken as-is: no memory dereference.
            AddressingMode::Immediate => Ok(Operand::Value(mem.read(regs.pc.wrapping_add(1))?)),

            // The two bytes after the opcode are a little-endian
            // pointer to the operand.
            AddressingMode::Absolute => Ok(Operand::Address(mem.read_u16(regs.pc.wrapping_add(1))?)),

            AddressingMode::Implied => Ok(Operand::None),
        }
    }
}

impl Operand {
    /// The operand as a value, reading memory when the operand
    /// is an address
    pub fn value(&self, mem: &Memory) -> Result<u8, EmuError> {
        match self {
            Operand::Value(value) => Ok(*value),
            Operand::Address(address) => mem.read(*address),
            Operand::None => panic!("value requested for an implied-mode instruction"),
        }
    }

    /// The operand as a destination address
    pub fn address(&self) -> u16 {
        match self {
            Operand::Address(address) => *address,
            _ => panic!("address requested for an operand that is not a memory location"),
        }
    }
}
