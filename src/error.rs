use thiserror::Error;

// Everything that can go wrong inside the emulator is
// represented by one of these variants, surfaced to the caller
// as an explicit Result. Note that halting is *not* an error:
// reaching BRK is the normal way for a run to end, and the run
// loop returns Ok in that case. Errors are fatal to the current
// run and are never retried by the core; if a supervisor wants
// to retry, that is its business.
#[derive(Error, Debug)]
pub enum EmuError {
    // An address fell outside the memory, on a read, a write, a
    // bulk load, or an opcode fetch (the program counter ran off
    // the end). Addresses are never clamped or wrapped to fit.
    #[error("address 0x{address:04X} out of range for {size}-byte memory")]
    OutOfRange { address: u16, size: usize },

    // The fetched byte has no entry in the instruction table.
    #[error("illegal opcode 0x{0:02X}")]
    IllegalOpcode(u8),

    // A descriptor in the instruction table disagrees with its
    // own addressing mode (or collides with another entry). This
    // is a defect in the table itself, caught when the table is
    // built, before any instruction executes.
    #[error("inconsistent table entry for opcode 0x{opcode:02X}: {detail}")]
    TableInconsistency { opcode: u8, detail: String },

    // A token in a hexfile was not a valid two-digit hex byte.
    #[error("invalid hex byte {token:?} in hexfile")]
    HexParse { token: String },

    #[error("hexfile i/o error: {0}")]
    Io(#[from] std::io::Error),
}
