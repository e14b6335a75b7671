//! Logical operations: AND, OR, EOR, NOT, CLR, TST, TAS and Scc.

use log::trace;

use super::{ea_to_reg, install_ea, install_sized, operand, reg_to_ea, size_field, unary};
use crate::addressing::Modes;
use crate::context::Context;
use crate::flags::{ConditionCodes, condition_name};
use crate::processor::{ExecResult, Processor};
use crate::size::Size;

pub(super) fn install(p: &mut Processor) {
    install_sized(p, 0xC000, 0x0E00, Modes::DATA, "and", and_ea_to_reg);
    install_sized(p, 0xC100, 0x0E00, Modes::MEMORY_ALTERABLE, "and", and_reg_to_ea);
    install_sized(p, 0x8000, 0x0E00, Modes::DATA, "or", or_ea_to_reg);
    install_sized(p, 0x8100, 0x0E00, Modes::MEMORY_ALTERABLE, "or", or_reg_to_ea);
    install_sized(p, 0xB100, 0x0E00, Modes::DATA_ALTERABLE, "eor", eor_reg_to_ea);

    install_sized(p, 0x4600, 0x0000, Modes::DATA_ALTERABLE, "not", not);
    install_sized(p, 0x4200, 0x0000, Modes::DATA_ALTERABLE, "clr", clr);
    install_sized(p, 0x4A00, 0x0000, Modes::DATA_ALTERABLE, "tst", tst);
    install_ea(p, 0x4AC0, 0x0000, Modes::DATA_ALTERABLE, "tas", tas);
    install_ea(p, 0x50C0, 0x0F00, Modes::DATA_ALTERABLE, "scc", scc);
}

fn logical(cc: &mut ConditionCodes, size: Size, result: u32) -> u32 {
    let result = result & size.mask();
    cc.set_logical(size.sign_extend(result));
    result
}

pub(super) fn and(cc: &mut ConditionCodes, size: Size, d: u32, s: u32) -> u32 {
    logical(cc, size, d & s)
}

pub(super) fn or(cc: &mut ConditionCodes, size: Size, d: u32, s: u32) -> u32 {
    logical(cc, size, d | s)
}

pub(super) fn eor(cc: &mut ConditionCodes, size: Size, d: u32, s: u32) -> u32 {
    logical(cc, size, d ^ s)
}

fn and_ea_to_reg(pc: u32, opcode: u16, ctx: &mut Context) -> ExecResult {
    ea_to_reg(pc, opcode, ctx, and)
}

fn and_reg_to_ea(pc: u32, opcode: u16, ctx: &mut Context) -> ExecResult {
    reg_to_ea(pc, opcode, ctx, and)
}

fn or_ea_to_reg(pc: u32, opcode: u16, ctx: &mut Context) -> ExecResult {
    ea_to_reg(pc, opcode, ctx, or)
}

fn or_reg_to_ea(pc: u32, opcode: u16, ctx: &mut Context) -> ExecResult {
    reg_to_ea(pc, opcode, ctx, or)
}

fn eor_reg_to_ea(pc: u32, opcode: u16, ctx: &mut Context) -> ExecResult {
    reg_to_ea(pc, opcode, ctx, eor)
}

fn not(pc: u32, opcode: u16, ctx: &mut Context) -> ExecResult {
    unary(pc, opcode, ctx, |cc, size, d| logical(cc, size, !d))
}

fn clr(pc: u32, opcode: u16, ctx: &mut Context) -> ExecResult {
    let size = size_field(opcode, pc)?;
    let dst = operand(opcode, size, pc.wrapping_add(2), pc)?;
    dst.put(ctx, 0)?;
    ctx.regs.ccr.set_logical(0);
    dst.finish(ctx);
    Ok(dst.end())
}

fn tst(pc: u32, opcode: u16, ctx: &mut Context) -> ExecResult {
    let size = size_field(opcode, pc)?;
    let src = operand(opcode, size, pc.wrapping_add(2), pc)?;
    let value = src.get(ctx)?;
    ctx.regs.ccr.set_logical(value);
    src.finish(ctx);
    Ok(src.end())
}

/// Test and set: flags from the byte as read, then bit 7 set.
fn tas(pc: u32, opcode: u16, ctx: &mut Context) -> ExecResult {
    let dst = operand(opcode, Size::Byte, pc.wrapping_add(2), pc)?;
    let value = dst.get_unsigned(ctx)?;
    ctx.regs.ccr.set_logical(Size::Byte.sign_extend(value));
    dst.put(ctx, value | 0x80)?;
    dst.finish(ctx);
    Ok(dst.end())
}

/// Scc: all ones if the condition in bits 11-8 holds, zero otherwise.
fn scc(pc: u32, opcode: u16, ctx: &mut Context) -> ExecResult {
    let dst = operand(opcode, Size::Byte, pc.wrapping_add(2), pc)?;
    trace!("s{} {}", condition_name(opcode >> 8), dst.text(ctx));
    let value = if ctx.regs.ccr.test(opcode >> 8) { 0xFF } else { 0 };
    dst.put(ctx, value)?;
    dst.finish(ctx);
    Ok(dst.end())
}
