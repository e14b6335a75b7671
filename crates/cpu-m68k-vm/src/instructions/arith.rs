//! Integer and BCD arithmetic: ADD, SUB, CMP and their A/Q/X/M forms,
//! NEG, NEGX, MULU, MULS, DIVU, DIVS, CHK, ABCD, SBCD and NBCD.

use super::{
    BinaryOp, SIZES, ea_to_reg, install_ea, install_sized, operand, reg_to_ea, reg0, reg9,
    size_field, unary,
};
use crate::addressing::{AddrMode, Modes, Operand};
use crate::context::Context;
use crate::exception::{Exception, ExceptionKind, Fault};
use crate::flags::ConditionCodes;
use crate::processor::{ExecResult, Processor};
use crate::size::Size;

pub(super) fn install(p: &mut Processor) {
    install_sized(p, 0xD000, 0x0E00, Modes::ALL, "add", add_ea_to_reg);
    install_sized(p, 0xD100, 0x0E00, Modes::MEMORY_ALTERABLE, "add", add_reg_to_ea);
    install_ea(p, 0xD0C0, 0x0F00, Modes::ALL, "adda", adda);
    install_sized(p, 0x9000, 0x0E00, Modes::ALL, "sub", sub_ea_to_reg);
    install_sized(p, 0x9100, 0x0E00, Modes::MEMORY_ALTERABLE, "sub", sub_reg_to_ea);
    install_ea(p, 0x90C0, 0x0F00, Modes::ALL, "suba", suba);
    install_sized(p, 0xB000, 0x0E00, Modes::ALL, "cmp", cmp);
    install_ea(p, 0xB0C0, 0x0F00, Modes::ALL, "cmpa", cmpa);

    for (bits, _) in SIZES {
        let size = bits << 6;
        // Register and -(An) forms in bit 3.
        p.insert(0xD100 | size, 0x0E0F, "addx", addx);
        p.insert(0x9100 | size, 0x0E0F, "subx", subx);
        p.insert(0xB108 | size, 0x0E07, "cmpm", cmpm);
        // ADDQ/SUBQ: byte forms cannot address An.
        let modes = if bits == 0 {
            Modes::DATA_ALTERABLE
        } else {
            Modes::ALTERABLE
        };
        install_ea(p, 0x5000 | size, 0x0E00, modes, "addq", addq);
        install_ea(p, 0x5100 | size, 0x0E00, modes, "subq", subq);
    }

    install_sized(p, 0x4400, 0x0000, Modes::DATA_ALTERABLE, "neg", neg);
    install_sized(p, 0x4000, 0x0000, Modes::DATA_ALTERABLE, "negx", negx);

    install_ea(p, 0xC0C0, 0x0E00, Modes::DATA, "mulu", mulu);
    install_ea(p, 0xC1C0, 0x0E00, Modes::DATA, "muls", muls);
    install_ea(p, 0x80C0, 0x0E00, Modes::DATA, "divu", divu);
    install_ea(p, 0x81C0, 0x0E00, Modes::DATA, "divs", divs);
    install_ea(p, 0x4180, 0x0E00, Modes::DATA, "chk", chk);

    p.insert(0xC100, 0x0E0F, "abcd", abcd);
    p.insert(0x8100, 0x0E0F, "sbcd", sbcd);
    install_ea(p, 0x4800, 0x0000, Modes::DATA_ALTERABLE, "nbcd", nbcd);
}

pub(super) fn add(cc: &mut ConditionCodes, size: Size, d: u32, s: u32) -> u32 {
    let r = d.wrapping_add(s) & size.mask();
    cc.set_add(size.sign_extend(r), size.sign_extend(d), size.sign_extend(s));
    r
}

pub(super) fn sub(cc: &mut ConditionCodes, size: Size, d: u32, s: u32) -> u32 {
    let r = d.wrapping_sub(s) & size.mask();
    cc.set_sub(size.sign_extend(r), size.sign_extend(d), size.sign_extend(s));
    r
}

/// Flags of `d - s` without X; returns `d` so callers never write back.
pub(super) fn compare(cc: &mut ConditionCodes, size: Size, d: u32, s: u32) -> u32 {
    let r = d.wrapping_sub(s) & size.mask();
    cc.set_cmp(size.sign_extend(r), size.sign_extend(d), size.sign_extend(s));
    d
}

/// `d + s + X`. Z is only ever cleared, so a multi-precision chain
/// reports zero only if every part was zero.
fn add_extended(cc: &mut ConditionCodes, size: Size, d: u32, s: u32) -> u32 {
    let r = d
        .wrapping_add(s)
        .wrapping_add(u32::from(cc.x()))
        & size.mask();
    let (rs, ds, ss) = (size.sign_extend(r), size.sign_extend(d), size.sign_extend(s));
    let carry = ((ss & ds) | ((ss | ds) & !rs)) < 0;
    let overflow = ((ss ^ rs) & (ds ^ rs)) < 0;
    let zero = cc.z() && r == 0;
    cc.set_nzvc(rs < 0, zero, overflow, carry);
    cc.set_x(carry);
    r
}

/// `d - s - X`, Z as for [`add_extended`].
fn sub_extended(cc: &mut ConditionCodes, size: Size, d: u32, s: u32) -> u32 {
    let r = d
        .wrapping_sub(s)
        .wrapping_sub(u32::from(cc.x()))
        & size.mask();
    let (rs, ds, ss) = (size.sign_extend(r), size.sign_extend(d), size.sign_extend(s));
    let borrow = ((ss & !ds) | ((ss | !ds) & rs)) < 0;
    let overflow = ((ss ^ ds) & (rs ^ ds)) < 0;
    let zero = cc.z() && r == 0;
    cc.set_nzvc(rs < 0, zero, overflow, borrow);
    cc.set_x(borrow);
    r
}

fn add_ea_to_reg(pc: u32, opcode: u16, ctx: &mut Context) -> ExecResult {
    ea_to_reg(pc, opcode, ctx, add)
}

fn add_reg_to_ea(pc: u32, opcode: u16, ctx: &mut Context) -> ExecResult {
    reg_to_ea(pc, opcode, ctx, add)
}

fn sub_ea_to_reg(pc: u32, opcode: u16, ctx: &mut Context) -> ExecResult {
    ea_to_reg(pc, opcode, ctx, sub)
}

fn sub_reg_to_ea(pc: u32, opcode: u16, ctx: &mut Context) -> ExecResult {
    reg_to_ea(pc, opcode, ctx, sub)
}

fn cmp(pc: u32, opcode: u16, ctx: &mut Context) -> ExecResult {
    ea_to_reg(pc, opcode, ctx, compare)
}

/// ADDA, SUBA and CMPA: word sources are sign-extended and the operation
/// is always 32 bits wide.
fn address_source(pc: u32, opcode: u16, ctx: &Context) -> Result<(Operand, u32), Fault> {
    let size = Size::word_or_long(opcode & 0x0100 != 0);
    let src = operand(opcode, size, pc.wrapping_add(2), pc)?;
    let value = src.get(ctx)? as u32;
    Ok((src, value))
}

fn adda(pc: u32, opcode: u16, ctx: &mut Context) -> ExecResult {
    let (src, s) = address_source(pc, opcode, ctx)?;
    let r = reg9(opcode);
    ctx.regs.a[r] = ctx.regs.a[r].wrapping_add(s);
    src.finish(ctx);
    Ok(src.end())
}

fn suba(pc: u32, opcode: u16, ctx: &mut Context) -> ExecResult {
    let (src, s) = address_source(pc, opcode, ctx)?;
    let r = reg9(opcode);
    ctx.regs.a[r] = ctx.regs.a[r].wrapping_sub(s);
    src.finish(ctx);
    Ok(src.end())
}

fn cmpa(pc: u32, opcode: u16, ctx: &mut Context) -> ExecResult {
    let (src, s) = address_source(pc, opcode, ctx)?;
    let a = ctx.regs.a[reg9(opcode)];
    compare(&mut ctx.regs.ccr, Size::Long, a, s);
    src.finish(ctx);
    Ok(src.end())
}

/// ADDQ/SUBQ: 3-bit data in bits 11-9, 0 meaning 8. An destinations take
/// the full 32 bits and leave the flags alone.
fn quick(pc: u32, opcode: u16, ctx: &mut Context, op: BinaryOp, subtract: bool) -> ExecResult {
    let size = size_field(opcode, pc)?;
    let data = match (opcode >> 9) & 7 {
        0 => 8,
        n => u32::from(n),
    };
    let dst = operand(opcode, size, pc.wrapping_add(2), pc)?;
    if let AddrMode::AddrReg(r) = dst.mode() {
        let a = &mut ctx.regs.a[usize::from(r)];
        *a = if subtract {
            a.wrapping_sub(data)
        } else {
            a.wrapping_add(data)
        };
        return Ok(dst.end());
    }
    let d = dst.get_unsigned(ctx)?;
    let result = op(&mut ctx.regs.ccr, size, d, data);
    dst.put(ctx, result)?;
    dst.finish(ctx);
    Ok(dst.end())
}

fn addq(pc: u32, opcode: u16, ctx: &mut Context) -> ExecResult {
    quick(pc, opcode, ctx, add, false)
}

fn subq(pc: u32, opcode: u16, ctx: &mut Context) -> ExecResult {
    quick(pc, opcode, ctx, sub, true)
}

/// Step for -(An) in the two-register memory forms.
fn predec_step(reg: usize, size: Size) -> u32 {
    if reg == 7 && size == Size::Byte {
        2
    } else {
        size.bytes()
    }
}

/// `Dx = Dx op Dy` (bit 3 clear) or `-(Ax) = -(Ax) op -(Ay)` (bit 3 set).
/// The memory form decrements Ay, reads, then decrements Ax, as the
/// hardware does, so `-(A0),-(A0)` touches two consecutive elements.
fn register_or_predec(
    pc: u32,
    opcode: u16,
    ctx: &mut Context,
    size: Size,
    op: BinaryOp,
) -> ExecResult {
    let (x, y) = (reg9(opcode), reg0(opcode));
    if opcode & 0x0008 == 0 {
        let s = ctx.regs.d[y] & size.mask();
        let d = ctx.regs.d[x] & size.mask();
        let result = op(&mut ctx.regs.ccr, size, d, s);
        ctx.regs.d[x] = size.merge(ctx.regs.d[x], result);
        return Ok(pc.wrapping_add(2));
    }
    let src_addr = ctx.regs.a[y].wrapping_sub(predec_step(y, size));
    let s = ctx.read(size, src_addr)?;
    ctx.regs.a[y] = src_addr;
    let dst_addr = ctx.regs.a[x].wrapping_sub(predec_step(x, size));
    let d = ctx.read(size, dst_addr)?;
    ctx.regs.a[x] = dst_addr;
    let result = op(&mut ctx.regs.ccr, size, d, s);
    ctx.write(size, dst_addr, result)?;
    Ok(pc.wrapping_add(2))
}

fn addx(pc: u32, opcode: u16, ctx: &mut Context) -> ExecResult {
    let size = size_field(opcode, pc)?;
    register_or_predec(pc, opcode, ctx, size, add_extended)
}

fn subx(pc: u32, opcode: u16, ctx: &mut Context) -> ExecResult {
    let size = size_field(opcode, pc)?;
    register_or_predec(pc, opcode, ctx, size, sub_extended)
}

/// CMPM (Ay)+,(Ax)+.
fn cmpm(pc: u32, opcode: u16, ctx: &mut Context) -> ExecResult {
    let size = size_field(opcode, pc)?;
    let (x, y) = (reg9(opcode), reg0(opcode));
    let s = ctx.read(size, ctx.regs.a[y])?;
    ctx.regs.a[y] = ctx.regs.a[y].wrapping_add(predec_step(y, size));
    let d = ctx.read(size, ctx.regs.a[x])?;
    ctx.regs.a[x] = ctx.regs.a[x].wrapping_add(predec_step(x, size));
    compare(&mut ctx.regs.ccr, size, d, s);
    Ok(pc.wrapping_add(2))
}

fn neg(pc: u32, opcode: u16, ctx: &mut Context) -> ExecResult {
    unary(pc, opcode, ctx, |cc, size, d| sub(cc, size, 0, d))
}

fn negx(pc: u32, opcode: u16, ctx: &mut Context) -> ExecResult {
    unary(pc, opcode, ctx, |cc, size, d| sub_extended(cc, size, 0, d))
}

fn mulu(pc: u32, opcode: u16, ctx: &mut Context) -> ExecResult {
    let src = operand(opcode, Size::Word, pc.wrapping_add(2), pc)?;
    let s = src.get_unsigned(ctx)?;
    let r = reg9(opcode);
    let product = (ctx.regs.d[r] & 0xFFFF) * s;
    ctx.regs.d[r] = product;
    ctx.regs.ccr.set_logical(product as i32);
    src.finish(ctx);
    Ok(src.end())
}

fn muls(pc: u32, opcode: u16, ctx: &mut Context) -> ExecResult {
    let src = operand(opcode, Size::Word, pc.wrapping_add(2), pc)?;
    let s = src.get(ctx)?;
    let r = reg9(opcode);
    let product = i32::from(ctx.regs.d[r] as u16 as i16) * s;
    ctx.regs.d[r] = product as u32;
    ctx.regs.ccr.set_logical(product);
    src.finish(ctx);
    Ok(src.end())
}

/// Overflowed division: V set, C clear, destination and N/Z untouched.
fn division_overflow(cc: &mut ConditionCodes) {
    let (n, z) = (cc.n(), cc.z());
    cc.set_nzvc(n, z, true, false);
}

fn divu(pc: u32, opcode: u16, ctx: &mut Context) -> ExecResult {
    let src = operand(opcode, Size::Word, pc.wrapping_add(2), pc)?;
    let divisor = src.get_unsigned(ctx)?;
    if divisor == 0 {
        return Err(Exception::after(ExceptionKind::ZeroDivide, pc, src.end()).into());
    }
    let r = reg9(opcode);
    let dividend = ctx.regs.d[r];
    let quotient = dividend / divisor;
    if quotient > 0xFFFF {
        division_overflow(&mut ctx.regs.ccr);
    } else {
        let remainder = dividend % divisor;
        ctx.regs.d[r] = remainder << 16 | quotient;
        ctx.regs.ccr.set_logical(Size::Word.sign_extend(quotient));
    }
    src.finish(ctx);
    Ok(src.end())
}

fn divs(pc: u32, opcode: u16, ctx: &mut Context) -> ExecResult {
    let src = operand(opcode, Size::Word, pc.wrapping_add(2), pc)?;
    let divisor = i64::from(src.get(ctx)?);
    if divisor == 0 {
        return Err(Exception::after(ExceptionKind::ZeroDivide, pc, src.end()).into());
    }
    let r = reg9(opcode);
    let dividend = i64::from(ctx.regs.d[r] as i32);
    let quotient = dividend / divisor;
    if i16::try_from(quotient).is_err() {
        division_overflow(&mut ctx.regs.ccr);
    } else {
        let remainder = dividend % divisor;
        ctx.regs.d[r] = u32::from(remainder as u16) << 16 | u32::from(quotient as u16);
        ctx.regs.ccr.set_logical(quotient as i32);
    }
    src.finish(ctx);
    Ok(src.end())
}

/// CHK <ea>,Dn: trap unless `0 <= Dn.w <= bound`. N tells which side was
/// exceeded; Z, V and C are left as they were.
fn chk(pc: u32, opcode: u16, ctx: &mut Context) -> ExecResult {
    let src = operand(opcode, Size::Word, pc.wrapping_add(2), pc)?;
    let bound = src.get(ctx)?;
    src.finish(ctx);
    let value = i32::from(ctx.regs.d[reg9(opcode)] as u16 as i16);
    let cc = &mut ctx.regs.ccr;
    let (z, v, c) = (cc.z(), cc.v(), cc.c());
    if value < 0 {
        cc.set_nzvc(true, z, v, c);
    } else if value > bound {
        cc.set_nzvc(false, z, v, c);
    } else {
        return Ok(src.end());
    }
    Err(Exception::after(ExceptionKind::Chk, pc, src.end()).into())
}

/// Packed BCD `dst + src + extend`. Returns (result, carry, overflow).
fn bcd_add(src: u8, dst: u8, extend: u8) -> (u8, bool, bool) {
    let low = (dst & 0x0F) + (src & 0x0F) + extend;
    let low_fix: u16 = if low > 9 { 6 } else { 0 };
    let binary = u16::from(dst) + u16::from(src) + u16::from(extend);

    let low_carry = (u16::from(low) + low_fix) >> 4;
    let carry = u16::from(dst >> 4) + u16::from(src >> 4) + low_carry > 9;
    let result = binary + low_fix + if carry { 0x60 } else { 0 };

    // V: bit 7 went from clear to set during correction
    let overflow = (!binary & result & 0x80) != 0;
    (result as u8, carry, overflow)
}

/// Packed BCD `dst - src - extend`. Returns (result, borrow, overflow).
fn bcd_sub(dst: u8, src: u8, extend: u8) -> (u8, bool, bool) {
    let binary = dst.wrapping_sub(src).wrapping_sub(extend);
    let mut result = binary;

    let low_borrow = (dst & 0x0F) < (src & 0x0F).saturating_add(extend);
    if low_borrow {
        result = result.wrapping_sub(6);
    }
    let high_borrow = (dst >> 4) < (src >> 4) + u8::from(low_borrow);
    if high_borrow {
        result = result.wrapping_sub(0x60);
    }
    let borrow = high_borrow || (low_borrow && binary < 6);

    // V: bit 7 went from set to clear during correction
    let overflow = (binary & !result & 0x80) != 0;
    (result, borrow, overflow)
}

/// Flags common to the BCD instructions: C and X from the decimal carry,
/// Z cleared by a non-zero result and otherwise kept.
fn bcd_flags(cc: &mut ConditionCodes, result: u8, carry: bool, overflow: bool) {
    let zero = cc.z() && result == 0;
    cc.set_nzvc(result & 0x80 != 0, zero, overflow, carry);
    cc.set_x(carry);
}

fn abcd_op(cc: &mut ConditionCodes, _size: Size, d: u32, s: u32) -> u32 {
    let (result, carry, overflow) = bcd_add(s as u8, d as u8, u8::from(cc.x()));
    bcd_flags(cc, result, carry, overflow);
    u32::from(result)
}

fn sbcd_op(cc: &mut ConditionCodes, _size: Size, d: u32, s: u32) -> u32 {
    let (result, borrow, overflow) = bcd_sub(d as u8, s as u8, u8::from(cc.x()));
    bcd_flags(cc, result, borrow, overflow);
    u32::from(result)
}

fn abcd(pc: u32, opcode: u16, ctx: &mut Context) -> ExecResult {
    register_or_predec(pc, opcode, ctx, Size::Byte, abcd_op)
}

fn sbcd(pc: u32, opcode: u16, ctx: &mut Context) -> ExecResult {
    register_or_predec(pc, opcode, ctx, Size::Byte, sbcd_op)
}

fn nbcd(pc: u32, opcode: u16, ctx: &mut Context) -> ExecResult {
    let dst = operand(opcode, Size::Byte, pc.wrapping_add(2), pc)?;
    let d = dst.get_unsigned(ctx)?;
    let result = sbcd_op(&mut ctx.regs.ccr, Size::Byte, 0, d);
    dst.put(ctx, result)?;
    dst.finish(ctx);
    Ok(dst.end())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bcd_addition() {
        assert_eq!(bcd_add(0x15, 0x27, 0), (0x42, false, false));
        assert_eq!(bcd_add(0x01, 0x99, 0), (0x00, true, false));
        assert_eq!(bcd_add(0x00, 0x09, 1), (0x10, false, false));
    }

    #[test]
    fn bcd_subtraction() {
        assert_eq!(bcd_sub(0x42, 0x15, 0).0, 0x27);
        assert_eq!(bcd_sub(0x00, 0x01, 0), (0x99, true, false));
        assert_eq!(bcd_sub(0x10, 0x00, 1).0, 0x09);
    }

    #[test]
    fn extended_add_keeps_zero_only_across_zero_parts() {
        let mut cc = ConditionCodes::new(0x04);
        assert_eq!(add_extended(&mut cc, Size::Long, 0, 0), 0);
        assert!(cc.z());
        add_extended(&mut cc, Size::Byte, 0x01, 0x00);
        assert!(!cc.z());
        assert_eq!(add_extended(&mut cc, Size::Byte, 0xFF, 0x01), 0);
        assert!(!cc.z());
        assert!(cc.c() && cc.x());
    }

    #[test]
    fn extended_sub_borrows_through_x() {
        let mut cc = ConditionCodes::new(0x14);
        assert_eq!(sub_extended(&mut cc, Size::Word, 0, 0), 0xFFFF);
        assert!(cc.c() && cc.x() && cc.n() && !cc.z());
    }
}
