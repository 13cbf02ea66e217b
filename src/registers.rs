use bitflags::bitflags;

/// Default program counter start address.
pub const PROGRAM_START: u16 = 0x0200;

// The 6502 has 6 registers:
//  1) Program Counter (PC): holds the 16-bit address of the
//     next machine language instruction to be executed.
//  2) Stack Pointer (S): holds the offset of the top of the
//     stack page. The representative instruction subset never
//     touches the stack, but the register is part of the
//     machine state and of the final dump.
//  3) Accumulator (A): stores the results of arithmetic, logic,
//     and memory access operations.
//  4-5) Index Registers X/Y: general purpose registers,
//     commonly used to hold counters or offsets for accessing
//     memory.
//  6) Processor Status (P): holds the current status of
//     operations; each bit is one of 7 flags that are set or
//     cleared depending on the result of the last executed
//     instruction.
//
// On top of the architectural registers the file carries the
// run flag, `halted`: BRK sets it, and the run loop stops
// fetching as soon as it is true.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Registers {
    pub a: u8,
    pub x: u8,
    pub y: u8,
    pub s: u8,
    pub pc: u16,
    pub p: CpuFlags,
    pub halted: bool,
}

bitflags! {
    // - Carry Flag (C): set if the last arithmetic operation
    //  carried out of bit 7 (or borrowed, for subtraction).
    // - Zero Flag (Z): set if the last result was zero.
    // - Interrupt Disable (I): while set, the processor ignores
    //  interrupt requests from devices.
    // - Decimal Mode (D): while set, arithmetic obeys Binary
    //  Coded Decimal rules instead of plain binary.
    // - Break Command (B): set when a BRK instruction has
    //  forced an interrupt request.
    // - Unused: the bit between B and V, always 1 by
    //  convention on the real chip.
    // - Overflow Flag (V): set when an arithmetic result is
    //  invalid as a signed (2's complement) byte, e.g. adding
    //  two positive numbers and getting a negative one.
    // - Negative Flag (N): set if the result of the last
    //  operation had bit 7 set (i.e. was negative as a signed
    //  byte).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CpuFlags: u8 {
        const CARRY = 0b0000_0001;
        const ZERO = 0b0000_0010;
        const INTERRUPT_DISABLE = 0b0000_0100;
        const DECIMAL_MODE = 0b0000_1000;
        const BREAK = 0b0001_0000;
        const UNUSED = 0b0010_0000;
        const OVERFLOW = 0b0100_0000;
        const NEGATIVE = 0b1000_0000;
    }
}

impl CpuFlags {
    /// Update the zero and negative flags from a result byte,
    /// leaving every other flag alone
    pub fn update_zn(&mut self, value: u8) {
        // If the result is 0, set the zero flag, otherwise
        // clear it
        if value == 0 {
            self.insert(CpuFlags::ZERO);
        } else {
            self.remove(CpuFlags::ZERO);
        }

        // Set the negative flag if the sign bit of the result
        // is set, clear it otherwise
        if value & 0b1000_0000 != 0 {
            self.insert(CpuFlags::NEGATIVE);
        } else {
            self.remove(CpuFlags::NEGATIVE);
        }
    }
}

impl Default for Registers {
    fn default() -> Self {
        // Everything starts at zero except the program counter,
        // which points at the conventional program start, and
        // the always-1 status bit.
        Self {
            a: 0,
            x: 0,
            y: 0,
            s: 0,
            pc: PROGRAM_START,
            p: CpuFlags::UNUSED,
            halted: false,
        }
    }
}
