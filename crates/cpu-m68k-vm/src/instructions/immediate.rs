//! Line 0: immediate arithmetic and logic, bit manipulation and MOVEP.

use super::{BinaryOp, SIZES, install_ea, operand, privileged, reg0, reg9, set_z, size_field};
use crate::addressing::{AddrMode, Modes, Operand};
use crate::context::Context;
use crate::processor::{ExecResult, Handler, Processor};
use crate::size::Size;

use super::arith::{add, compare, sub};
use super::logic::{and, eor, or};

pub(super) fn install(p: &mut Processor) {
    let ops: [(u16, &'static str, Handler); 6] = [
        (0x0000, "ori", ori),
        (0x0200, "andi", andi),
        (0x0400, "subi", subi),
        (0x0600, "addi", addi),
        (0x0A00, "eori", eori),
        (0x0C00, "cmpi", cmpi),
    ];
    for (code, mnemonic, handler) in ops {
        for (bits, _) in SIZES {
            install_ea(p, code | bits << 6, 0, Modes::DATA_ALTERABLE, mnemonic, handler);
        }
    }

    p.insert(0x003C, 0, "ori", ori_ccr);
    p.insert(0x023C, 0, "andi", andi_ccr);
    p.insert(0x0A3C, 0, "eori", eori_ccr);
    p.insert(0x007C, 0, "ori", ori_sr);
    p.insert(0x027C, 0, "andi", andi_sr);
    p.insert(0x0A7C, 0, "eori", eori_sr);

    for (kind, mnemonic) in (0u16..).zip(["btst", "bchg", "bclr", "bset"]) {
        let (dynamic, fixed) = if kind == 0 {
            (Modes::DATA, Modes::DATA_NO_IMMEDIATE)
        } else {
            (Modes::DATA_ALTERABLE, Modes::DATA_ALTERABLE)
        };
        install_ea(p, 0x0100 | kind << 6, 0x0E00, dynamic, mnemonic, bit_dynamic);
        install_ea(p, 0x0800 | kind << 6, 0, fixed, mnemonic, bit_static);
    }

    p.insert(0x0108, 0x0EC7, "movep", movep);
}

fn immediate(pc: u32, opcode: u16, ctx: &mut Context, op: BinaryOp) -> ExecResult {
    let size = size_field(opcode, pc)?;
    let src = Operand::new(AddrMode::Immediate, size, pc.wrapping_add(2));
    let dst = operand(opcode, size, src.end(), pc)?;
    let s = src.get_unsigned(ctx)?;
    let d = dst.get_unsigned(ctx)?;
    let result = op(&mut ctx.regs.ccr, size, d, s);
    dst.put(ctx, result)?;
    dst.finish(ctx);
    Ok(dst.end())
}

fn ori(pc: u32, opcode: u16, ctx: &mut Context) -> ExecResult {
    immediate(pc, opcode, ctx, or)
}

fn andi(pc: u32, opcode: u16, ctx: &mut Context) -> ExecResult {
    immediate(pc, opcode, ctx, and)
}

fn subi(pc: u32, opcode: u16, ctx: &mut Context) -> ExecResult {
    immediate(pc, opcode, ctx, sub)
}

fn addi(pc: u32, opcode: u16, ctx: &mut Context) -> ExecResult {
    immediate(pc, opcode, ctx, add)
}

fn eori(pc: u32, opcode: u16, ctx: &mut Context) -> ExecResult {
    immediate(pc, opcode, ctx, eor)
}

/// CMPI never writes, so the destination is only read.
fn cmpi(pc: u32, opcode: u16, ctx: &mut Context) -> ExecResult {
    let size = size_field(opcode, pc)?;
    let src = Operand::new(AddrMode::Immediate, size, pc.wrapping_add(2));
    let dst = operand(opcode, size, src.end(), pc)?;
    let s = src.get_unsigned(ctx)?;
    let d = dst.get_unsigned(ctx)?;
    compare(&mut ctx.regs.ccr, size, d, s);
    dst.finish(ctx);
    Ok(dst.end())
}

fn to_ccr(pc: u32, ctx: &mut Context, op: fn(u8, u8) -> u8) -> ExecResult {
    let imm = ctx.fetch16(pc.wrapping_add(2))? as u8;
    let ccr = op(ctx.regs.ccr.bits(), imm);
    ctx.regs.ccr.set_bits(ccr);
    Ok(pc.wrapping_add(4))
}

fn ori_ccr(pc: u32, _opcode: u16, ctx: &mut Context) -> ExecResult {
    to_ccr(pc, ctx, |c, i| c | i)
}

fn andi_ccr(pc: u32, _opcode: u16, ctx: &mut Context) -> ExecResult {
    to_ccr(pc, ctx, |c, i| c & i)
}

fn eori_ccr(pc: u32, _opcode: u16, ctx: &mut Context) -> ExecResult {
    to_ccr(pc, ctx, |c, i| c ^ i)
}

fn to_sr(pc: u32, ctx: &mut Context, op: fn(u16, u16) -> u16) -> ExecResult {
    privileged(ctx, pc)?;
    let imm = ctx.fetch16(pc.wrapping_add(2))?;
    let sr = op(ctx.sr(), imm);
    ctx.set_sr(sr);
    Ok(pc.wrapping_add(4))
}

fn ori_sr(pc: u32, _opcode: u16, ctx: &mut Context) -> ExecResult {
    to_sr(pc, ctx, |s, i| s | i)
}

fn andi_sr(pc: u32, _opcode: u16, ctx: &mut Context) -> ExecResult {
    to_sr(pc, ctx, |s, i| s & i)
}

fn eori_sr(pc: u32, _opcode: u16, ctx: &mut Context) -> ExecResult {
    to_sr(pc, ctx, |s, i| s ^ i)
}

/// `(value, bit) -> new value` for one of BTST, BCHG, BCLR and BSET.
type BitOp = fn(u32, u32) -> u32;

fn bit_op(opcode: u16) -> Option<BitOp> {
    match (opcode >> 6) & 3 {
        0 => None,
        1 => Some(|v, bit| v ^ bit),
        2 => Some(|v, bit| v & !bit),
        _ => Some(|v, bit| v | bit),
    }
}

/// Test bit `number` of the operand and apply the update, if any. Data
/// registers are 32 bits wide; memory operands are single bytes.
fn bit(pc: u32, opcode: u16, ctx: &mut Context, number: u32, ext: u32) -> ExecResult {
    let mode = AddrMode::from_ea(opcode).ok_or_else(|| super::illegal(pc))?;
    let (size, number) = match mode {
        AddrMode::DataReg(_) => (Size::Long, number % 32),
        _ => (Size::Byte, number % 8),
    };
    let dst = Operand::new(mode, size, ext);
    let value = dst.get_unsigned(ctx)?;
    let mask = 1 << number;
    set_z(&mut ctx.regs.ccr, value & mask == 0);
    if let Some(update) = bit_op(opcode) {
        dst.put(ctx, update(value, mask))?;
    }
    dst.finish(ctx);
    Ok(dst.end())
}

/// Bit number in Dn, bits 11-9.
fn bit_dynamic(pc: u32, opcode: u16, ctx: &mut Context) -> ExecResult {
    let number = ctx.regs.d[reg9(opcode)];
    bit(pc, opcode, ctx, number, pc.wrapping_add(2))
}

/// Bit number in the low byte of the first extension word.
fn bit_static(pc: u32, opcode: u16, ctx: &mut Context) -> ExecResult {
    let number = u32::from(ctx.fetch16(pc.wrapping_add(2))? & 0xFF);
    bit(pc, opcode, ctx, number, pc.wrapping_add(4))
}

/// MOVEP: transfer between Dn and alternate bytes of memory starting at
/// `d16(An)`, high byte first. Bit 7 selects register to memory, bit 6
/// long.
fn movep(pc: u32, opcode: u16, ctx: &mut Context) -> ExecResult {
    let disp = ctx.fetch16(pc.wrapping_add(2))? as i16;
    let addr = ctx.regs.a[reg0(opcode)].wrapping_add(disp as u32);
    let d = reg9(opcode);
    let count = if opcode & 0x0040 != 0 { 4 } else { 2 };
    if opcode & 0x0080 != 0 {
        let value = ctx.regs.d[d];
        for i in 0..count {
            let byte = value >> (8 * (count - 1 - i));
            ctx.write(Size::Byte, addr.wrapping_add(2 * i), byte)?;
        }
    } else {
        let mut value = 0;
        for i in 0..count {
            value = value << 8 | ctx.read(Size::Byte, addr.wrapping_add(2 * i))?;
        }
        let size = Size::word_or_long(count == 4);
        ctx.regs.d[d] = size.merge(ctx.regs.d[d], value);
    }
    Ok(pc.wrapping_add(4))
}
