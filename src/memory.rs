use crate::error::EmuError;

/// Default memory capacity, in bytes.
pub const DEFAULT_MEMORY_SIZE: usize = 4096;

// The 6502 sees memory as a flat, contiguous array of 1-byte
// cells addressed with 16-bit pointers. The emulated memory is
// created once with a fixed capacity and never resized; programs
// and data are placed into it with `load` before execution
// starts, and instructions read and write it one byte at a time
// while the CPU runs.
//
// Every access is bounds-checked: an address at or past the end
// of the memory is a fault (`OutOfRange`), never a silent wrap
// or truncation. Real hardware would happily mirror or alias
// out-of-range addresses, but for an emulator it is far more
// useful to know immediately that a program walked off the end.
pub struct Memory {
    bytes: Vec<u8>,
}

impl Memory {
    /// Create a zero-filled memory with the given capacity
    pub fn new(size: usize) -> Self {
        Self {
            bytes: vec![0; size],
        }
    }

    /// Capacity of the memory, in bytes
    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    // Turn an address into a checked index into the byte store.
    fn index(&self, address: u16) -> Result<usize, EmuError> {
        let index = address as usize;
        if index < self.size() {
            Ok(index)
        } else {
            Err(EmuError::OutOfRange {
                address,
                size: self.size(),
            })
        }
    }

    /// Read the byte stored at `address`
    pub fn read(&self, address: u16) -> Result<u8, EmuError> {
        Ok(self.bytes[self.index(address)?])
    }

    /// Write a byte at `address`
    pub fn write(&mut self, address: u16, value: u8) -> Result<(), EmuError> {
        let index = self.index(address)?;
        self.bytes[index] = value;
        Ok(())
    }

    /// Read a 16-bit word stored at `address`
    pub fn read_u16(&self, address: u16) -> Result<u16, EmuError> {
        // The 6502 stores words in little-endian order, so the
        // two 8-bit halves are read low byte first and assembled
        // back into a word.
        let lo = self.read(address)? as u16;
        let hi = self.read(address.wrapping_add(1))? as u16;

        Ok((hi << 8) | lo)
    }

    /// Copy `data` into memory, contiguously, starting at `start`
    pub fn load(&mut self, data: &[u8], start: u16) -> Result<(), EmuError> {
        // The whole load is checked up front so that a program
        // too big for the remaining space fails without writing
        // anything at all: no partial loads.
        let begin = start as usize;
        let end = begin + data.len();
        if end > self.size() {
            return Err(EmuError::OutOfRange {
                address: start,
                size: self.size(),
            });
        }

        self.bytes[begin..end].copy_from_slice(data);
        Ok(())
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new(DEFAULT_MEMORY_SIZE)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_write_read_roundtrip() {
        let mut mem = Memory::default();
        mem.write(0x0200, 0xa0).unwrap();

        assert_eq!(mem.read(0x0200).unwrap(), 0xa0);
    }

    #[test]
    fn test_fresh_memory_is_zeroed() {
        let mem = Memory::default();
        assert_eq!(mem.read(0x0200).unwrap(), 0);
    }

    #[test]
    fn test_bounds() {
        let mut mem = Memory::new(4096);

        // The last valid address is size-1; size itself faults.
        assert!(mem.read(4095).is_ok());
        assert!(matches!(
            mem.read(4096),
            Err(EmuError::OutOfRange { address: 4096, .. })
        ));
        assert!(matches!(
            mem.write(4096, 0xff),
            Err(EmuError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_read_u16_little_endian() {
        let mut mem = Memory::default();
        mem.write(0x0300, 0xcd).unwrap();
        mem.write(0x0301, 0x0a).unwrap();

        assert_eq!(mem.read_u16(0x0300).unwrap(), 0x0acd);
    }

    #[test]
    fn test_load_places_bytes_contiguously() {
        let mut mem = Memory::default();
        mem.load(&[0xa9, 0x05, 0x0d], 0x0200).unwrap();

        assert_eq!(mem.read(0x0200).unwrap(), 0xa9);
        assert_eq!(mem.read(0x0201).unwrap(), 0x05);
        assert_eq!(mem.read(0x0202).unwrap(), 0x0d);
    }

    #[test]
    fn test_load_is_all_or_nothing() {
        let mut mem = Memory::new(4096);

        // Three bytes starting two cells from the end: the load
        // must fail and leave the memory untouched.
        assert!(mem.load(&[1, 2, 3], 4094).is_err());
        assert_eq!(mem.read(4094).unwrap(), 0);
        assert_eq!(mem.read(4095).unwrap(), 0);
    }

    #[test]
    fn test_load_up_to_the_last_byte() {
        let mut mem = Memory::new(4096);
        mem.load(&[1, 2, 3], 4093).unwrap();

        assert_eq!(mem.read(4095).unwrap(), 3);
    }
}
