//! Operand sizes.

use std::fmt;

/// Operation size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Size {
    /// 8-bit byte.
    Byte,
    /// 16-bit word.
    Word,
    /// 32-bit long.
    Long,
}

impl Size {
    /// Get size from the standard 2-bit encoding (00=byte, 01=word, 10=long).
    #[must_use]
    pub fn from_bits(bits: u16) -> Option<Self> {
        match bits & 0x03 {
            0 => Some(Self::Byte),
            1 => Some(Self::Word),
            2 => Some(Self::Long),
            _ => None,
        }
    }

    /// Get size from the MOVE encoding (01=byte, 11=word, 10=long).
    #[must_use]
    pub fn from_move_bits(bits: u16) -> Option<Self> {
        match bits & 0x03 {
            1 => Some(Self::Byte),
            3 => Some(Self::Word),
            2 => Some(Self::Long),
            _ => None,
        }
    }

    /// Word or long from a single size bit (0=word, 1=long), as used by
    /// MOVEM, EXT, ADDA/SUBA/CMPA and MOVEP.
    #[must_use]
    pub const fn word_or_long(long: bool) -> Self {
        if long { Self::Long } else { Self::Word }
    }

    /// Number of bytes for this size.
    #[must_use]
    pub const fn bytes(self) -> u32 {
        match self {
            Self::Byte => 1,
            Self::Word => 2,
            Self::Long => 4,
        }
    }

    /// Number of bits for this size.
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.bytes() * 8
    }

    /// MSB mask for this size.
    #[must_use]
    pub const fn msb_mask(self) -> u32 {
        match self {
            Self::Byte => 0x80,
            Self::Word => 0x8000,
            Self::Long => 0x8000_0000,
        }
    }

    /// Value mask for this size.
    #[must_use]
    pub const fn mask(self) -> u32 {
        match self {
            Self::Byte => 0xFF,
            Self::Word => 0xFFFF,
            Self::Long => 0xFFFF_FFFF,
        }
    }

    /// Sign-extend the low `self` bits of `value` to 32 bits.
    #[must_use]
    pub const fn sign_extend(self, value: u32) -> i32 {
        match self {
            Self::Byte => value as u8 as i8 as i32,
            Self::Word => value as u16 as i16 as i32,
            Self::Long => value as i32,
        }
    }

    /// Replace the low `self` bits of `old` with `value`, keeping the rest.
    #[must_use]
    pub const fn merge(self, old: u32, value: u32) -> u32 {
        (old & !self.mask()) | (value & self.mask())
    }

    /// Assembler suffix (`.b`, `.w`, `.l`).
    #[must_use]
    pub const fn suffix(self) -> &'static str {
        match self {
            Self::Byte => ".b",
            Self::Word => ".w",
            Self::Long => ".l",
        }
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_extension_per_size() {
        assert_eq!(Size::Byte.sign_extend(0x1234_5680), -128);
        assert_eq!(Size::Word.sign_extend(0x0000_7FFF), 0x7FFF);
        assert_eq!(Size::Word.sign_extend(0x0001_8000), -32768);
        assert_eq!(Size::Long.sign_extend(0xFFFF_FFFF), -1);
    }

    #[test]
    fn merge_keeps_upper_bits() {
        assert_eq!(Size::Byte.merge(0x1234_5678, 0xAB), 0x1234_56AB);
        assert_eq!(Size::Word.merge(0x1234_5678, 0xFFFF_ABCD), 0x1234_ABCD);
        assert_eq!(Size::Long.merge(0x1234_5678, 0xCAFE_F00D), 0xCAFE_F00D);
    }

    #[test]
    fn move_encoding_differs_from_standard() {
        assert_eq!(Size::from_move_bits(1), Some(Size::Byte));
        assert_eq!(Size::from_move_bits(3), Some(Size::Word));
        assert_eq!(Size::from_move_bits(0), None);
        assert_eq!(Size::from_bits(3), None);
    }
}
