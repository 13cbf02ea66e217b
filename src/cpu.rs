use crate::error::EmuError;
use crate::memory::Memory;
use crate::opcodes::{InstructionTable, Opcode};
use crate::registers::Registers;

// The CPU ties the register file and the memory together and
// runs the fetch-decode-execute cycle over them:
//
//  1) fetch: read the byte at the program counter. If the
//     counter has run off the end of memory this is a fault,
//     and the run ends with `OutOfRange`.
//  2) decode: look the byte up in the instruction table. An
//     unknown byte ends the run with `IllegalOpcode`.
//  3) execute: invoke the descriptor's handler, which mutates
//     the registers (and possibly the memory) and advances the
//     program counter past the instruction.
//
// The cycle repeats until a handler raises the halt flag (the
// BRK instruction), at which point `run` returns the final
// register file as a snapshot. Halting is the normal way out,
// not an error; errors are fatal to the run and never retried.
//
// Execution is fully synchronous and single-threaded: the CPU
// owns its registers and memory exclusively while running, and
// the only safe preemption point is between two instructions.
// `step` exposes exactly that boundary, for callers that want
// to trace execution or interleave their own checks; a program
// with no BRK and no faulting fetch runs forever, just like the
// real chip.
pub struct Cpu {
    pub registers: Registers,
    memory: Memory,
}

impl Cpu {
    /// Create a CPU over the given memory, with default
    /// register state
    pub fn new(memory: Memory) -> Self {
        Self {
            registers: Registers::default(),
            memory,
        }
    }

    /// Create a CPU with a caller-supplied starting register
    /// state
    pub fn with_registers(memory: Memory, registers: Registers) -> Self {
        let mut cpu = Self::new(memory);
        cpu.registers = registers;
        cpu
    }

    /// The CPU's memory
    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    /// Fetch, decode and execute a single instruction,
    /// returning its descriptor
    pub fn step(&mut self, table: &InstructionTable) -> Result<&'static Opcode, EmuError> {
        let code = self.memory.read(self.registers.pc)?;
        let opcode = table.lookup(code)?;

        (opcode.handler)(&mut self.registers, &mut self.memory, opcode)?;
        Ok(opcode)
    }

    /// Run the fetch-decode-execute cycle until halted,
    /// returning the final register state
    pub fn run(&mut self, table: &InstructionTable) -> Result<Registers, EmuError> {
        while !self.registers.halted {
            self.step(table)?;
        }

        Ok(self.registers)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::registers::{CpuFlags, PROGRAM_START};

    // Load the program at the default start address and run it
    // to completion.
    fn run_program(program: &[u8]) -> Result<(Registers, Cpu), EmuError> {
        let mut memory = Memory::default();
        memory.load(program, PROGRAM_START)?;

        let table = InstructionTable::new()?;
        let mut cpu = Cpu::new(memory);
        let registers = cpu.run(&table)?;

        Ok((registers, cpu))
    }

    #[test]
    fn test_lda_immediate_loads_value() {
        let (regs, _) = run_program(&[0xa9, 0x05, 0x0d]).unwrap();

        assert_eq!(regs.a, 0x05);
        assert!(!regs.p.contains(CpuFlags::ZERO));
        assert!(!regs.p.contains(CpuFlags::NEGATIVE));
    }

    #[test]
    fn test_lda_zero_sets_z() {
        let (regs, _) = run_program(&[0xa9, 0x00, 0x0d]).unwrap();

        assert!(regs.p.contains(CpuFlags::ZERO));
        assert!(!regs.p.contains(CpuFlags::NEGATIVE));
    }

    #[test]
    fn test_lda_negative_sets_n() {
        let (regs, _) = run_program(&[0xa9, 0x80, 0x0d]).unwrap();

        assert!(!regs.p.contains(CpuFlags::ZERO));
        assert!(regs.p.contains(CpuFlags::NEGATIVE));
    }

    #[test]
    fn test_lda_positive_clears_both() {
        let (regs, _) = run_program(&[0xa9, 0x7f, 0x0d]).unwrap();

        assert!(!regs.p.contains(CpuFlags::ZERO));
        assert!(!regs.p.contains(CpuFlags::NEGATIVE));
    }

    #[test]
    fn test_lda_absolute_dereferences_pointer() {
        let mut memory = Memory::default();
        memory.load(&[0xad, 0x00, 0x03, 0x0d], PROGRAM_START).unwrap();
        memory.write(0x0300, 0x55).unwrap();

        let table = InstructionTable::new().unwrap();
        let mut cpu = Cpu::new(memory);
        let regs = cpu.run(&table).unwrap();

        assert_eq!(regs.a, 0x55);
    }

    #[test]
    fn test_adc_carry_propagation() {
        // 0xFF + 0x01 with no incoming carry wraps to 0x00 and
        // carries out.
        let (regs, _) = run_program(&[0xa9, 0xff, 0x69, 0x01, 0x0d]).unwrap();

        assert_eq!(regs.a, 0x00);
        assert!(regs.p.contains(CpuFlags::CARRY));
        assert!(regs.p.contains(CpuFlags::ZERO));
        assert!(!regs.p.contains(CpuFlags::NEGATIVE));
    }

    #[test]
    fn test_adc_signed_overflow() {
        // 0x7F + 0x01: two positive operands, negative result,
        // so the overflow flag must be raised -- and no carry
        // out of bit 7 occurred.
        let (regs, _) = run_program(&[0xa9, 0x7f, 0x69, 0x01, 0x0d]).unwrap();

        assert_eq!(regs.a, 0x80);
        assert!(regs.p.contains(CpuFlags::OVERFLOW));
        assert!(regs.p.contains(CpuFlags::NEGATIVE));
        assert!(!regs.p.contains(CpuFlags::CARRY));
    }

    #[test]
    fn test_adc_uses_incoming_carry() {
        // SEC, then 0x02 + 0x03 + carry = 0x06.
        let (regs, _) = run_program(&[0xa9, 0x02, 0x38, 0x69, 0x03, 0x0d]).unwrap();

        assert_eq!(regs.a, 0x06);
        assert!(!regs.p.contains(CpuFlags::CARRY));
    }

    #[test]
    fn test_adc_clears_stale_carry_and_overflow() {
        // A carrying, overflowing add followed by a small one:
        // the second add consumes the carry (0x00 + 0x01 + 1)
        // and must clear both flags rather than let them stick.
        let (regs, _) =
            run_program(&[0xa9, 0x80, 0x69, 0x80, 0x69, 0x01, 0x0d]).unwrap();

        assert_eq!(regs.a, 0x02);
        assert!(!regs.p.contains(CpuFlags::CARRY));
        assert!(!regs.p.contains(CpuFlags::OVERFLOW));
    }

    #[test]
    fn test_sta_absolute_writes_memory() {
        let (regs, cpu) = run_program(&[0xa9, 0x42, 0x8d, 0x00, 0x03, 0x0d]).unwrap();

        assert_eq!(cpu.memory().read(0x0300).unwrap(), 0x42);
        // A store leaves every flag exactly as LDA left it.
        assert!(!regs.p.contains(CpuFlags::ZERO));
        assert!(!regs.p.contains(CpuFlags::NEGATIVE));
        assert!(!regs.p.contains(CpuFlags::CARRY));
        assert!(!regs.p.contains(CpuFlags::OVERFLOW));
    }

    #[test]
    fn test_and_masks_accumulator() {
        let (regs, _) = run_program(&[0xa9, 0b1100_1100, 0x29, 0b1010_1010, 0x0d]).unwrap();

        assert_eq!(regs.a, 0b1000_1000);
        assert!(regs.p.contains(CpuFlags::NEGATIVE));
    }

    #[test]
    fn test_tax_and_inx() {
        let (regs, _) = run_program(&[0xa9, 0xc0, 0xaa, 0xe8, 0x0d]).unwrap();

        assert_eq!(regs.x, 0xc1);
    }

    #[test]
    fn test_inx_wraps() {
        let (regs, _) = run_program(&[0xa9, 0xff, 0xaa, 0xe8, 0x0d]).unwrap();

        assert_eq!(regs.x, 0);
        assert!(regs.p.contains(CpuFlags::ZERO));
    }

    #[test]
    fn test_brk_halts_without_another_fetch() {
        // The byte after BRK is an illegal opcode; a run that
        // kept fetching past the halt would trip over it.
        let (regs, _) = run_program(&[0x0d, 0xff]).unwrap();

        assert!(regs.halted);
        assert_eq!(regs.pc, PROGRAM_START + 1);
    }

    #[test]
    fn test_illegal_opcode_terminates_the_run() {
        let mut memory = Memory::default();
        memory.load(&[0xa9, 0x05, 0xff], PROGRAM_START).unwrap();

        let table = InstructionTable::new().unwrap();
        let mut cpu = Cpu::new(memory);
        let err = cpu.run(&table).unwrap_err();

        assert!(matches!(err, EmuError::IllegalOpcode(0xff)));
        // The failed fetch mutated nothing: the accumulator
        // still holds the last completed instruction's result
        // and the counter still points at the bad byte.
        assert_eq!(cpu.registers.a, 0x05);
        assert_eq!(cpu.registers.pc, PROGRAM_START + 2);
        assert!(!cpu.registers.halted);
    }

    #[test]
    fn test_pc_running_off_memory_faults() {
        // NOPs all the way to the last byte and no BRK: the
        // next fetch lands past the end.
        let mut memory = Memory::new(0x0202);
        memory.load(&[0xea, 0xea], PROGRAM_START).unwrap();

        let table = InstructionTable::new().unwrap();
        let mut cpu = Cpu::new(memory);

        assert!(matches!(
            cpu.run(&table),
            Err(EmuError::OutOfRange { address: 0x0202, .. })
        ));
    }

    #[test]
    fn test_step_executes_exactly_one_instruction() {
        let mut memory = Memory::default();
        memory.load(&[0xa9, 0x05, 0x69, 0x03, 0x0d], PROGRAM_START).unwrap();

        let table = InstructionTable::new().unwrap();
        let mut cpu = Cpu::new(memory);

        let opcode = cpu.step(&table).unwrap();
        assert_eq!(opcode.name, "LDA");
        assert_eq!(cpu.registers.a, 0x05);
        assert_eq!(cpu.registers.pc, PROGRAM_START + 2);
        assert!(!cpu.registers.halted);
    }

    #[test]
    fn test_caller_supplied_registers() {
        let mut memory = Memory::default();
        memory.load(&[0x69, 0x01, 0x0d], 0x0300).unwrap();

        let registers = Registers {
            a: 0x10,
            pc: 0x0300,
            ..Registers::default()
        };

        let table = InstructionTable::new().unwrap();
        let mut cpu = Cpu::with_registers(memory, registers);
        let regs = cpu.run(&table).unwrap();

        assert_eq!(regs.a, 0x11);
        assert_eq!(regs.pc, 0x0303);
    }

    #[test]
    fn test_end_to_end_scenario() {
        // LDA #$05; ADC #$03; STA $0400; BRK -- the whole
        // pipeline: immediate load, carry-free add, absolute
        // store, halt.
        let (regs, cpu) =
            run_program(&[0xa9, 0x05, 0x69, 0x03, 0x8d, 0x00, 0x04, 0x0d]).unwrap();

        assert_eq!(regs.a, 0x08);
        assert_eq!(cpu.memory().read(0x0400).unwrap(), 0x08);
        assert!(regs.halted);
        assert_eq!(regs.pc, 0x0208);
        assert!(!regs.p.contains(CpuFlags::CARRY));
        assert!(!regs.p.contains(CpuFlags::OVERFLOW));
        assert!(!regs.p.contains(CpuFlags::ZERO));
        assert!(!regs.p.contains(CpuFlags::NEGATIVE));
    }
}
