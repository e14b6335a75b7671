//! Instruction handlers, grouped roughly by opcode line.
//!
//! Each group exposes an `install` that registers its patterns. Handlers
//! decode the fields they need from the operation word themselves; the
//! dispatch patterns guarantee the addressing modes are legal for the
//! instruction, so a decode failure here can only mean a hand-inserted
//! pattern was too broad, and it is reported as an illegal instruction.

mod arith;
mod control;
mod immediate;
mod logic;
mod shifts;
mod transfer;

use crate::addressing::{AddrMode, Modes, Operand};
use crate::context::Context;
use crate::exception::{Exception, Fault};
use crate::flags::{ConditionCodes, Z};
use crate::processor::{ExecResult, Handler, Processor};
use crate::size::Size;

pub(crate) fn install(p: &mut Processor) {
    immediate::install(p);
    transfer::install(p);
    arith::install(p);
    logic::install(p);
    shifts::install(p);
    control::install(p);
}

/// A flag-setting two-operand operation: `(flags, size, dest, src) -> result`.
type BinaryOp = fn(&mut ConditionCodes, Size, u32, u32) -> u32;

const SIZES: [(u16, Size); 3] = [(0, Size::Byte), (1, Size::Word), (2, Size::Long)];

/// Register `handler` for every EA encoding in `modes`, with the EA field in
/// bits 5-0.
fn install_ea(
    p: &mut Processor,
    code: u16,
    mask: u16,
    modes: Modes,
    mnemonic: &'static str,
    handler: Handler,
) {
    for (bits, free) in modes.encodings() {
        p.insert(code | bits, mask | free, mnemonic, handler);
    }
}

/// As [`install_ea`] for each size in bits 7-6. Byte forms never take An.
fn install_sized(
    p: &mut Processor,
    code: u16,
    mask: u16,
    modes: Modes,
    mnemonic: &'static str,
    handler: Handler,
) {
    for (bits, size) in SIZES {
        let modes = if size == Size::Byte {
            modes.without(Modes::ADDR_REG)
        } else {
            modes
        };
        install_ea(p, code | (bits << 6), mask, modes, mnemonic, handler);
    }
}

fn illegal(pc: u32) -> Fault {
    Exception::illegal(pc).into()
}

/// Supervisor check for privileged instructions.
fn privileged(ctx: &Context, pc: u32) -> Result<(), Fault> {
    if ctx.is_supervisor() {
        Ok(())
    } else {
        Err(Exception::privilege(pc).into())
    }
}

/// The operand in EA bits 5-0, extension words starting at `ext`.
fn operand(opcode: u16, size: Size, ext: u32, pc: u32) -> Result<Operand, Fault> {
    AddrMode::from_ea(opcode)
        .map(|mode| Operand::new(mode, size, ext))
        .ok_or_else(|| illegal(pc))
}

/// Size in bits 7-6.
fn size_field(opcode: u16, pc: u32) -> Result<Size, Fault> {
    Size::from_bits(opcode >> 6).ok_or_else(|| illegal(pc))
}

/// Register number in bits 11-9.
fn reg9(opcode: u16) -> usize {
    usize::from((opcode >> 9) & 7)
}

/// Register number in bits 2-0.
fn reg0(opcode: u16) -> usize {
    usize::from(opcode & 7)
}

/// Update Z alone.
fn set_z(cc: &mut ConditionCodes, zero: bool) {
    let ccr = u16::from(cc.bits());
    let ccr = if zero { ccr | Z } else { ccr & !Z };
    cc.set_bits(ccr as u8);
}

/// `Dn = Dn op <ea>`, size in bits 7-6, Dn in bits 11-9.
fn ea_to_reg(pc: u32, opcode: u16, ctx: &mut Context, op: BinaryOp) -> ExecResult {
    let size = size_field(opcode, pc)?;
    let src = operand(opcode, size, pc.wrapping_add(2), pc)?;
    let r = reg9(opcode);
    let s = src.get_unsigned(ctx)?;
    let d = ctx.regs.d[r] & size.mask();
    let result = op(&mut ctx.regs.ccr, size, d, s);
    ctx.regs.d[r] = size.merge(ctx.regs.d[r], result);
    src.finish(ctx);
    Ok(src.end())
}

/// `<ea> = <ea> op Dn`, size in bits 7-6, Dn in bits 11-9.
fn reg_to_ea(pc: u32, opcode: u16, ctx: &mut Context, op: BinaryOp) -> ExecResult {
    let size = size_field(opcode, pc)?;
    let dst = operand(opcode, size, pc.wrapping_add(2), pc)?;
    let s = ctx.regs.d[reg9(opcode)] & size.mask();
    let d = dst.get_unsigned(ctx)?;
    let result = op(&mut ctx.regs.ccr, size, d, s);
    dst.put(ctx, result)?;
    dst.finish(ctx);
    Ok(dst.end())
}

/// `<ea> = op <ea>` for single-operand forms, size in bits 7-6.
fn unary(
    pc: u32,
    opcode: u16,
    ctx: &mut Context,
    op: fn(&mut ConditionCodes, Size, u32) -> u32,
) -> ExecResult {
    let size = size_field(opcode, pc)?;
    let dst = operand(opcode, size, pc.wrapping_add(2), pc)?;
    let d = dst.get_unsigned(ctx)?;
    let result = op(&mut ctx.regs.ccr, size, d);
    dst.put(ctx, result)?;
    dst.finish(ctx);
    Ok(dst.end())
}
