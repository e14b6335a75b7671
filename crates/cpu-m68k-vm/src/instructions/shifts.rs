//! Shifts and rotates: ASL, ASR, LSL, LSR, ROXL, ROXR, ROL and ROR, in
//! register and memory forms.

use super::{SIZES, install_ea, operand, reg0, size_field};
use crate::addressing::Modes;
use crate::context::Context;
use crate::processor::{ExecResult, Processor};
use crate::size::Size;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ShiftKind {
    Arithmetic,
    Logical,
    RotateExtend,
    Rotate,
}

impl ShiftKind {
    fn from_bits(bits: u16) -> Self {
        match bits & 3 {
            0 => Self::Arithmetic,
            1 => Self::Logical,
            2 => Self::RotateExtend,
            _ => Self::Rotate,
        }
    }
}

const MNEMONICS: [[&str; 2]; 4] = [
    ["asr", "asl"],
    ["lsr", "lsl"],
    ["roxr", "roxl"],
    ["ror", "rol"],
];

pub(super) fn install(p: &mut Processor) {
    for (kind, names) in (0u16..).zip(MNEMONICS) {
        for (left, mnemonic) in (0u16..).zip(names) {
            for (bits, _) in SIZES {
                p.insert(
                    0xE000 | left << 8 | bits << 6 | kind << 3,
                    0x0E27,
                    mnemonic,
                    shift_register,
                );
            }
            install_ea(
                p,
                0xE0C0 | kind << 9 | left << 8,
                0,
                Modes::MEMORY_ALTERABLE,
                mnemonic,
                shift_memory,
            );
        }
    }
}

/// Outcome of a shift.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Shifted {
    value: u32,
    /// Last bit shifted out; `None` when the count was zero.
    carry: Option<bool>,
    /// ASL only: the sign bit changed at some point during the shift.
    overflow: bool,
    extend: bool,
}

/// Shift `value` by `count` bit positions, one at a time. A zero count
/// shifts nothing out and keeps X.
fn shift(kind: ShiftKind, left: bool, size: Size, value: u32, count: u32, x: bool) -> Shifted {
    let msb = size.msb_mask();
    let mut value = value & size.mask();
    let mut carry = None;
    let mut overflow = false;
    let mut extend = x;
    for _ in 0..count {
        let out = if left { value & msb != 0 } else { value & 1 != 0 };
        let fill = match kind {
            ShiftKind::Arithmetic if !left => value & msb != 0,
            ShiftKind::Arithmetic | ShiftKind::Logical => false,
            ShiftKind::RotateExtend => extend,
            ShiftKind::Rotate => out,
        };
        value = if left {
            (value << 1 | u32::from(fill)) & size.mask()
        } else {
            value >> 1 | if fill { msb } else { 0 }
        };
        if kind == ShiftKind::Arithmetic && left && (value & msb != 0) != out {
            overflow = true;
        }
        carry = Some(out);
        if kind != ShiftKind::Rotate {
            extend = out;
        }
    }
    Shifted {
        value,
        carry,
        overflow,
        extend,
    }
}

fn apply(ctx: &mut Context, size: Size, shifted: Shifted) {
    let cc = &mut ctx.regs.ccr;
    let result = size.sign_extend(shifted.value);
    let carry = shifted.carry.unwrap_or_else(|| cc.c());
    cc.set_nzvc(result < 0, result == 0, shifted.overflow, carry);
    cc.set_x(shifted.extend);
}

/// Dn shifted by an immediate 1-8 (bit 5 clear) or by another data
/// register modulo 64 (bit 5 set).
fn shift_register(pc: u32, opcode: u16, ctx: &mut Context) -> ExecResult {
    let size = size_field(opcode, pc)?;
    let field = usize::from((opcode >> 9) & 7);
    let count = if opcode & 0x0020 != 0 {
        ctx.regs.d[field] % 64
    } else if field == 0 {
        8
    } else {
        field as u32
    };
    let r = reg0(opcode);
    let kind = ShiftKind::from_bits(opcode >> 3);
    let left = opcode & 0x0100 != 0;
    let shifted = shift(kind, left, size, ctx.regs.d[r], count, ctx.regs.ccr.x());
    ctx.regs.d[r] = size.merge(ctx.regs.d[r], shifted.value);
    apply(ctx, size, shifted);
    Ok(pc.wrapping_add(2))
}

/// A memory word shifted by one.
fn shift_memory(pc: u32, opcode: u16, ctx: &mut Context) -> ExecResult {
    let dst = operand(opcode, Size::Word, pc.wrapping_add(2), pc)?;
    let kind = ShiftKind::from_bits(opcode >> 9);
    let left = opcode & 0x0100 != 0;
    let value = dst.get_unsigned(ctx)?;
    let shifted = shift(kind, left, Size::Word, value, 1, ctx.regs.ccr.x());
    dst.put(ctx, shifted.value)?;
    apply(ctx, Size::Word, shifted);
    dst.finish(ctx);
    Ok(dst.end())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(kind: ShiftKind, left: bool, size: Size, value: u32, count: u32) -> Shifted {
        shift(kind, left, size, value, count, false)
    }

    #[test]
    fn arithmetic_right_keeps_sign() {
        let s = run(ShiftKind::Arithmetic, false, Size::Byte, 0x81, 1);
        assert_eq!(s.value, 0xC0);
        assert!(s.carry == Some(true) && s.extend);
    }

    #[test]
    fn arithmetic_left_overflow_on_any_sign_change() {
        let s = run(ShiftKind::Arithmetic, true, Size::Byte, 0x40, 1);
        assert_eq!(s.value, 0x80);
        assert!(s.overflow);
        // The sign flips twice and ends where it started.
        let s = run(ShiftKind::Arithmetic, true, Size::Byte, 0x60, 3);
        assert_eq!(s.value, 0x00);
        assert!(s.overflow && s.carry == Some(true));
        let s = run(ShiftKind::Logical, true, Size::Byte, 0x40, 1);
        assert!(!s.overflow);
    }

    #[test]
    fn logical_shifts_drain_to_zero() {
        let s = run(ShiftKind::Logical, false, Size::Word, 0x8000, 16);
        assert_eq!(s.value, 0);
        assert_eq!(s.carry, Some(true));
        let s = run(ShiftKind::Logical, true, Size::Long, 1, 40);
        assert_eq!(s.value, 0);
        assert_eq!(s.carry, Some(false));
    }

    #[test]
    fn rotates_wrap_and_leave_x() {
        let s = shift(ShiftKind::Rotate, true, Size::Byte, 0x81, 1, true);
        assert_eq!(s.value, 0x03);
        assert!(s.carry == Some(true) && s.extend);
        let s = shift(ShiftKind::Rotate, false, Size::Word, 0x0001, 1, false);
        assert_eq!(s.value, 0x8000);
        assert!(s.carry == Some(true) && !s.extend);
    }

    #[test]
    fn rotate_through_extend() {
        let s = shift(ShiftKind::RotateExtend, true, Size::Byte, 0x80, 1, true);
        assert_eq!(s.value, 0x01);
        assert!(s.carry == Some(true) && s.extend);
        // Nine steps bring a byte back through X.
        let s = shift(ShiftKind::RotateExtend, false, Size::Byte, 0x5A, 9, false);
        assert_eq!(s.value, 0x5A);
        assert!(!s.extend);
    }

    #[test]
    fn zero_count_shifts_nothing_out() {
        let s = shift(ShiftKind::Logical, true, Size::Long, 0x8000_0000, 0, true);
        assert_eq!(s.value, 0x8000_0000);
        assert_eq!(s.carry, None);
        assert!(s.extend && !s.overflow);
        let s = shift(ShiftKind::RotateExtend, true, Size::Long, 0, 0, true);
        assert_eq!(s.carry, None);
        assert!(s.extend);
    }
}
