use crate::error::EmuError;

use std::fs;
use std::path::Path;

// Programs are fed to the emulator as plain-text hexfiles:
// whitespace-separated ASCII hexadecimal bytes, one token per
// byte, e.g.
//
//     A9 05 69 03 8D 00 04 0D
//
// The loader only turns the text into the ordered byte sequence
// that `Memory::load` consumes; where in memory the bytes land
// is the caller's choice.

/// Parse hexfile text into its byte sequence
pub fn parse(text: &str) -> Result<Vec<u8>, EmuError> {
    text.split_whitespace()
        .map(|token| {
            u8::from_str_radix(token, 16).map_err(|_| EmuError::HexParse {
                token: token.to_string(),
            })
        })
        .collect()
}

/// Read and parse a hexfile from disk
pub fn load(path: &Path) -> Result<Vec<u8>, EmuError> {
    let text = fs::read_to_string(path)?;
    parse(&text)
}
