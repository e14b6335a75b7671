//! Status register bits and lazily evaluated condition codes.
//!
//! The status register is 16 bits:
//! - Bits 0-4: Condition code register (CCR)
//!   - C (bit 0): Carry
//!   - V (bit 1): Overflow
//!   - Z (bit 2): Zero
//!   - N (bit 3): Negative
//!   - X (bit 4): Extend (copy of C for multi-precision arithmetic)
//! - Bits 8-10: Interrupt mask
//! - Bit 13: Supervisor mode (S)
//! - Bit 15: Trace mode (T)
//!
//! Most instructions set the flags, few read them. Instead of computing
//! all five bits after every operation, [`ConditionCodes`] records which
//! kind of operation ran last along with its sign-extended result and
//! operands, and derives a flag only when something asks for it. X is kept
//! apart from the other four because many instructions that set N/Z/V/C
//! leave X alone.

use std::fmt;

/// Carry flag.
pub const C: u16 = 0x0001;
/// Overflow flag.
pub const V: u16 = 0x0002;
/// Zero flag.
pub const Z: u16 = 0x0004;
/// Negative flag.
pub const N: u16 = 0x0008;
/// Extend flag.
pub const X: u16 = 0x0010;

/// Interrupt mask field (bits 8-10).
pub const INTERRUPT_MASK: u16 = 0x0700;
/// Supervisor mode flag.
pub const S: u16 = 0x2000;
/// Trace mode flag.
pub const T: u16 = 0x8000;

/// Mask for condition codes only (bits 0-4).
pub const CCR_MASK: u16 = 0x001F;
/// Mask for the system byte (bits 8-15).
pub const SYSTEM_MASK: u16 = 0xFF00;
/// Mask for valid SR bits (excluding reserved bits).
pub const SR_MASK: u16 = 0xA71F;

/// How N, Z, V and C are derived from the saved values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Eval {
    /// `values[0]` holds the four flag bits literally.
    Bits,
    /// N and Z from the result; V and C clear.
    Logical,
    /// Result, destination and source of an addition.
    Add,
    /// Result, destination and source of a subtraction.
    Sub,
}

/// How X is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Extend {
    Bit(bool),
    Add,
    Sub,
}

/// The X, N, Z, V and C flags.
///
/// Values are stored sign-extended from the operation size to 32 bits, so
/// the sign bit of every size ends up in bit 31 and one carry/overflow
/// formula serves bytes, words and longs alike.
#[derive(Debug, Clone, Copy)]
pub struct ConditionCodes {
    eval: Eval,
    values: [i32; 3],
    extend: Extend,
    x_values: [i32; 3],
}

impl Default for ConditionCodes {
    fn default() -> Self {
        Self {
            eval: Eval::Bits,
            values: [0; 3],
            extend: Extend::Bit(false),
            x_values: [0; 3],
        }
    }
}

impl PartialEq for ConditionCodes {
    fn eq(&self, other: &Self) -> bool {
        self.bits() == other.bits()
    }
}

impl Eq for ConditionCodes {}

fn add_carry([r, d, s]: [i32; 3]) -> bool {
    ((s & d) | ((s | d) & !r)) < 0
}

fn sub_borrow([r, d, s]: [i32; 3]) -> bool {
    ((s & !d) | ((s | !d) & r)) < 0
}

impl ConditionCodes {
    #[must_use]
    pub fn new(ccr: u8) -> Self {
        let mut cc = Self::default();
        cc.set_bits(ccr);
        cc
    }

    /// Carry.
    #[must_use]
    pub fn c(&self) -> bool {
        match self.eval {
            Eval::Bits => self.values[0] as u16 & C != 0,
            Eval::Logical => false,
            Eval::Add => add_carry(self.values),
            Eval::Sub => sub_borrow(self.values),
        }
    }

    /// Overflow.
    #[must_use]
    pub fn v(&self) -> bool {
        let [r, d, s] = self.values;
        match self.eval {
            Eval::Bits => self.values[0] as u16 & V != 0,
            Eval::Logical => false,
            Eval::Add => ((s ^ r) & (d ^ r)) < 0,
            Eval::Sub => ((s ^ d) & (r ^ d)) < 0,
        }
    }

    /// Zero.
    #[must_use]
    pub fn z(&self) -> bool {
        match self.eval {
            Eval::Bits => self.values[0] as u16 & Z != 0,
            _ => self.values[0] == 0,
        }
    }

    /// Negative.
    #[must_use]
    pub fn n(&self) -> bool {
        match self.eval {
            Eval::Bits => self.values[0] as u16 & N != 0,
            _ => self.values[0] < 0,
        }
    }

    /// Extend.
    #[must_use]
    pub fn x(&self) -> bool {
        match self.extend {
            Extend::Bit(x) => x,
            Extend::Add => add_carry(self.x_values),
            Extend::Sub => sub_borrow(self.x_values),
        }
    }

    /// The CCR byte (`---XNZVC`).
    #[must_use]
    pub fn bits(&self) -> u8 {
        let mut ccr = 0;
        for (set, bit) in [
            (self.c(), C),
            (self.v(), V),
            (self.z(), Z),
            (self.n(), N),
            (self.x(), X),
        ] {
            if set {
                ccr |= bit;
            }
        }
        ccr as u8
    }

    /// Load all five flags from a CCR byte.
    pub fn set_bits(&mut self, ccr: u8) {
        self.eval = Eval::Bits;
        self.values = [i32::from(ccr) & 0x0F, 0, 0];
        self.extend = Extend::Bit(u16::from(ccr) & X != 0);
    }

    /// Set N, Z, V and C literally, leaving X.
    pub fn set_nzvc(&mut self, n: bool, z: bool, v: bool, c: bool) {
        let mut bits = 0;
        for (set, bit) in [(n, N), (z, Z), (v, V), (c, C)] {
            if set {
                bits |= i32::from(bit);
            }
        }
        self.eval = Eval::Bits;
        self.values = [bits, 0, 0];
    }

    pub fn set_x(&mut self, x: bool) {
        self.extend = Extend::Bit(x);
    }

    /// MOVE, AND, OR, EOR, NOT, TST, CLR and friends: N and Z from the
    /// sign-extended result, V and C clear, X unaffected.
    pub fn set_logical(&mut self, result: i32) {
        self.eval = Eval::Logical;
        self.values = [result, 0, 0];
    }

    /// `result = dest + src`; C and X take the carry.
    pub fn set_add(&mut self, result: i32, dest: i32, src: i32) {
        self.eval = Eval::Add;
        self.values = [result, dest, src];
        self.extend = Extend::Add;
        self.x_values = self.values;
    }

    /// `result = dest - src`; C and X take the borrow.
    pub fn set_sub(&mut self, result: i32, dest: i32, src: i32) {
        self.eval = Eval::Sub;
        self.values = [result, dest, src];
        self.extend = Extend::Sub;
        self.x_values = self.values;
    }

    /// Comparison: flags as for subtraction, X unaffected.
    pub fn set_cmp(&mut self, result: i32, dest: i32, src: i32) {
        self.eval = Eval::Sub;
        self.values = [result, dest, src];
    }

    /// Evaluate one of the 16 condition tests (bits 11-8 of Bcc, DBcc, Scc).
    #[must_use]
    pub fn test(&self, cc: u16) -> bool {
        match cc & 0x0F {
            0x0 => true,                                // T
            0x1 => false,                               // F
            0x2 => !self.c() && !self.z(),              // HI
            0x3 => self.c() || self.z(),                // LS
            0x4 => !self.c(),                           // CC/HS
            0x5 => self.c(),                            // CS/LO
            0x6 => !self.z(),                           // NE
            0x7 => self.z(),                            // EQ
            0x8 => !self.v(),                           // VC
            0x9 => self.v(),                            // VS
            0xA => !self.n(),                           // PL
            0xB => self.n(),                            // MI
            0xC => self.n() == self.v(),                // GE
            0xD => self.n() != self.v(),                // LT
            0xE => !self.z() && self.n() == self.v(),   // GT
            _ => self.z() || self.n() != self.v(),      // LE
        }
    }
}

impl fmt::Display for ConditionCodes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ccr = u16::from(self.bits());
        for (bit, ch) in [(X, 'X'), (N, 'N'), (Z, 'Z'), (V, 'V'), (C, 'C')] {
            let ch = if ccr & bit != 0 { ch } else { '-' };
            write!(f, "{ch}")?;
        }
        Ok(())
    }
}

/// Assembler name of a condition test.
#[must_use]
pub fn condition_name(cc: u16) -> &'static str {
    const NAMES: [&str; 16] = [
        "t", "f", "hi", "ls", "cc", "cs", "ne", "eq", "vc", "vs", "pl", "mi", "ge", "lt", "gt",
        "le",
    ];
    NAMES[(cc & 0x0F) as usize]
}
