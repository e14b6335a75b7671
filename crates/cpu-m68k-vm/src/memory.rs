//! Plain RAM and ROM.

use crate::bus::{BusFault, BusResult, Direction, FunctionCode, Mappable};

/// A flat block of big-endian memory starting at `base`.
///
/// Accesses outside the block, and writes to a read-only block, are bus
/// errors.
#[derive(Debug, Clone)]
pub struct Memory {
    base: u32,
    data: Vec<u8>,
    read_only: bool,
}

impl Memory {
    /// Zero-filled RAM of `size` bytes.
    #[must_use]
    pub fn ram(base: u32, size: usize) -> Self {
        Self {
            base,
            data: vec![0; size],
            read_only: false,
        }
    }

    /// ROM holding `image`.
    #[must_use]
    pub fn rom(base: u32, image: Vec<u8>) -> Self {
        Self {
            base,
            data: image,
            read_only: true,
        }
    }

    #[must_use]
    pub fn base(&self) -> u32 {
        self.base
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Host-side copy into the block, ignoring the read-only flag.
    /// Bytes past the end are dropped.
    pub fn load(&mut self, addr: u32, bytes: &[u8]) {
        let Some(start) = self.offset(addr, 1) else {
            return;
        };
        let n = bytes.len().min(self.data.len() - start);
        self.data[start..start + n].copy_from_slice(&bytes[..n]);
    }

    /// Host-side byte read, `None` outside the block.
    #[must_use]
    pub fn peek(&self, addr: u32) -> Option<u8> {
        self.offset(addr, 1).map(|i| self.data[i])
    }

    /// Host-side byte write, ignoring the read-only flag.
    pub fn poke(&mut self, addr: u32, value: u8) {
        if let Some(i) = self.offset(addr, 1) {
            self.data[i] = value;
        }
    }

    fn offset(&self, addr: u32, len: usize) -> Option<usize> {
        let start = addr.wrapping_sub(self.base) as usize;
        (start < self.data.len() && self.data.len() - start >= len).then_some(start)
    }

    fn checked(&self, dir: Direction, fc: FunctionCode, addr: u32, len: usize) -> BusResult<usize> {
        if dir == Direction::Write && self.read_only {
            return Err(BusFault::bus_error(dir, fc, addr));
        }
        self.offset(addr, len)
            .ok_or(BusFault::bus_error(dir, fc, addr))
    }
}

impl Mappable for Memory {
    fn read8(&mut self, fc: FunctionCode, addr: u32) -> BusResult<u8> {
        let i = self.checked(Direction::Read, fc, addr, 1)?;
        Ok(self.data[i])
    }

    fn read16(&mut self, fc: FunctionCode, addr: u32) -> BusResult<u16> {
        let i = self.checked(Direction::Read, fc, addr, 2)?;
        Ok(u16::from_be_bytes([self.data[i], self.data[i + 1]]))
    }

    fn read32(&mut self, fc: FunctionCode, addr: u32) -> BusResult<u32> {
        let i = self.checked(Direction::Read, fc, addr, 4)?;
        Ok(u32::from_be_bytes([
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ]))
    }

    fn write8(&mut self, fc: FunctionCode, addr: u32, value: u8) -> BusResult<()> {
        let i = self.checked(Direction::Write, fc, addr, 1)?;
        self.data[i] = value;
        Ok(())
    }

    fn write16(&mut self, fc: FunctionCode, addr: u32, value: u16) -> BusResult<()> {
        let i = self.checked(Direction::Write, fc, addr, 2)?;
        self.data[i..i + 2].copy_from_slice(&value.to_be_bytes());
        Ok(())
    }

    fn write32(&mut self, fc: FunctionCode, addr: u32, value: u32) -> BusResult<()> {
        let i = self.checked(Direction::Write, fc, addr, 4)?;
        self.data[i..i + 4].copy_from_slice(&value.to_be_bytes());
        Ok(())
    }
}
