//! Motorola 68000 programmer-visible registers.
//!
//! - D0-D7: 8 data registers (32-bit)
//! - A0-A7: 8 address registers (32-bit, A7 is the active stack pointer)
//! - The inactive stack pointer (USP in supervisor mode, SSP in user mode)
//! - SR: system byte plus lazily evaluated condition codes
//!
//! The program counter is not here: it is threaded through instruction
//! handlers as a value and returned by each one.

use crate::flags::{CCR_MASK, ConditionCodes, INTERRUPT_MASK, S, SR_MASK, SYSTEM_MASK, T};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Registers {
    /// Data registers D0-D7.
    pub d: [u32; 8],
    /// Address registers A0-A7. A7 is whichever stack pointer is active.
    pub a: [u32; 8],
    /// The stack pointer not currently in A7.
    inactive_sp: u32,
    /// SR bits 8-15. The S bit here is the only record of the mode.
    system: u16,
    /// X, N, Z, V and C.
    pub ccr: ConditionCodes,
}

impl Default for Registers {
    fn default() -> Self {
        Self::new()
    }
}

impl Registers {
    /// Registers in reset state: supervisor mode, interrupt mask level 7.
    #[must_use]
    pub fn new() -> Self {
        Self {
            d: [0; 8],
            a: [0; 8],
            inactive_sp: 0,
            system: S | INTERRUPT_MASK,
            ccr: ConditionCodes::default(),
        }
    }

    #[must_use]
    pub const fn is_supervisor(&self) -> bool {
        self.system & S != 0
    }

    /// Switch privilege level, exchanging A7 with the shadow stack pointer
    /// when the level actually changes.
    pub fn set_supervisor(&mut self, supervisor: bool) {
        if supervisor == self.is_supervisor() {
            return;
        }
        std::mem::swap(&mut self.a[7], &mut self.inactive_sp);
        if supervisor {
            self.system |= S;
        } else {
            self.system &= !S;
        }
    }

    /// Full 16-bit status register.
    #[must_use]
    pub fn sr(&self) -> u16 {
        self.system | u16::from(self.ccr.bits())
    }

    /// Load SR. Reserved bits read back as zero; the stack pointers are
    /// exchanged first if the S bit changes.
    pub fn set_sr(&mut self, value: u16) {
        let value = value & SR_MASK;
        self.set_supervisor(value & S != 0);
        self.system = value & SYSTEM_MASK;
        self.ccr.set_bits((value & CCR_MASK) as u8);
    }

    /// Condition code register (low byte of SR).
    #[must_use]
    pub fn ccr_byte(&self) -> u8 {
        self.ccr.bits()
    }

    #[must_use]
    pub const fn is_trace(&self) -> bool {
        self.system & T != 0
    }

    pub fn set_trace(&mut self, trace: bool) {
        if trace {
            self.system |= T;
        } else {
            self.system &= !T;
        }
    }

    /// Get the interrupt mask level (0-7).
    #[must_use]
    pub const fn interrupt_mask(&self) -> u8 {
        ((self.system >> 8) & 0x07) as u8
    }

    /// Set the interrupt mask level (0-7).
    pub fn set_interrupt_mask(&mut self, level: u8) {
        self.system = (self.system & !INTERRUPT_MASK) | (u16::from(level & 0x07) << 8);
    }

    /// User stack pointer, wherever it currently lives.
    #[must_use]
    pub const fn usp(&self) -> u32 {
        if self.is_supervisor() {
            self.inactive_sp
        } else {
            self.a[7]
        }
    }

    pub fn set_usp(&mut self, value: u32) {
        if self.is_supervisor() {
            self.inactive_sp = value;
        } else {
            self.a[7] = value;
        }
    }

    /// Supervisor stack pointer, wherever it currently lives.
    #[must_use]
    pub const fn ssp(&self) -> u32 {
        if self.is_supervisor() {
            self.a[7]
        } else {
            self.inactive_sp
        }
    }

    pub fn set_ssp(&mut self, value: u32) {
        if self.is_supervisor() {
            self.a[7] = value;
        } else {
            self.inactive_sp = value;
        }
    }

    /// Index register value for the brief extension word format:
    /// bit 15 selects D/A, bits 14-12 the register, bit 11 word/long.
    #[must_use]
    pub fn index(&self, ext: u16) -> i32 {
        let reg = usize::from((ext >> 12) & 7);
        let value = if ext & 0x8000 != 0 {
            self.a[reg]
        } else {
            self.d[reg]
        };
        if ext & 0x0800 != 0 {
            value as i32
        } else {
            i32::from(value as u16 as i16)
        }
    }
}
