//! Program control: branches, jumps, subroutine calls and returns, traps
//! and the system control instructions.

use log::trace;

use super::{install_ea, operand, privileged, reg0};
use crate::addressing::Modes;
use crate::context::{Context, State};
use crate::exception::{Exception, ExceptionKind, Fault};
use crate::flags::condition_name;
use crate::processor::{ExecResult, ILLEGAL, Processor};
use crate::size::Size;

pub(super) fn install(p: &mut Processor) {
    p.insert(0x6000, 0x0FFF, "bcc", bcc);
    p.insert(0x6000, 0x00FF, "bra", bra);
    p.insert(0x6100, 0x00FF, "bsr", bsr);
    p.insert(0x50C8, 0x0F07, "dbcc", dbcc);

    install_ea(p, 0x4EC0, 0x0000, Modes::CONTROL, "jmp", jmp);
    install_ea(p, 0x4E80, 0x0000, Modes::CONTROL, "jsr", jsr);
    p.insert(0x4E75, 0x0000, "rts", rts);
    p.insert(0x4E77, 0x0000, "rtr", rtr);
    p.insert(0x4E73, 0x0000, "rte", rte);

    p.insert(0x4E40, 0x000F, "trap", trap);
    p.insert(0x4E76, 0x0000, "trapv", trapv);
    p.insert(0x4E71, 0x0000, "nop", nop);
    p.insert(0x4E70, 0x0000, "reset", reset);
    p.insert(0x4E72, 0x0000, "stop", stop);

    p.insert(0x4AFC, 0x0000, ILLEGAL, illegal);
    p.insert(0xA000, 0x0FFF, "line a", line_a);
    p.insert(0xF000, 0x0FFF, "line f", line_f);
}

/// Branch target and fall-through PC. A zero 8-bit displacement means a
/// 16-bit one follows the operation word.
fn branch(pc: u32, opcode: u16, ctx: &Context) -> Result<(u32, u32), Fault> {
    let base = pc.wrapping_add(2);
    match opcode as u8 {
        0 => {
            let disp = ctx.fetch16(base)? as i16;
            Ok((base.wrapping_add(disp as u32), pc.wrapping_add(4)))
        }
        disp => Ok((base.wrapping_add(disp as i8 as u32), pc.wrapping_add(2))),
    }
}

fn bcc(pc: u32, opcode: u16, ctx: &mut Context) -> ExecResult {
    let (target, next) = branch(pc, opcode, ctx)?;
    trace!("b{} ${target:08X}", condition_name(opcode >> 8));
    Ok(if ctx.regs.ccr.test(opcode >> 8) { target } else { next })
}

fn bra(pc: u32, opcode: u16, ctx: &mut Context) -> ExecResult {
    branch(pc, opcode, ctx).map(|(target, _)| target)
}

fn bsr(pc: u32, opcode: u16, ctx: &mut Context) -> ExecResult {
    let (target, next) = branch(pc, opcode, ctx)?;
    ctx.push(Size::Long, next)?;
    Ok(target)
}

/// DBcc Dn,<label>: fall through if the condition holds; otherwise count
/// the low word of Dn down and loop unless it has just gone to -1.
fn dbcc(pc: u32, opcode: u16, ctx: &mut Context) -> ExecResult {
    let disp = ctx.fetch16(pc.wrapping_add(2))? as i16;
    trace!("db{} d{},{disp}", condition_name(opcode >> 8), reg0(opcode));
    if ctx.regs.ccr.test(opcode >> 8) {
        return Ok(pc.wrapping_add(4));
    }
    let r = reg0(opcode);
    let count = (ctx.regs.d[r] as u16).wrapping_sub(1);
    ctx.regs.d[r] = Size::Word.merge(ctx.regs.d[r], u32::from(count));
    if count == 0xFFFF {
        Ok(pc.wrapping_add(4))
    } else {
        Ok(pc.wrapping_add(2).wrapping_add(disp as u32))
    }
}

fn jmp(pc: u32, opcode: u16, ctx: &mut Context) -> ExecResult {
    let dst = operand(opcode, Size::Long, pc.wrapping_add(2), pc)?;
    dst.address(ctx)?.ok_or_else(|| super::illegal(pc))
}

fn jsr(pc: u32, opcode: u16, ctx: &mut Context) -> ExecResult {
    let dst = operand(opcode, Size::Long, pc.wrapping_add(2), pc)?;
    let target = dst.address(ctx)?.ok_or_else(|| super::illegal(pc))?;
    ctx.push(Size::Long, dst.end())?;
    Ok(target)
}

fn rts(_pc: u32, _opcode: u16, ctx: &mut Context) -> ExecResult {
    Ok(ctx.pop(Size::Long)?)
}

fn rtr(_pc: u32, _opcode: u16, ctx: &mut Context) -> ExecResult {
    let ccr = ctx.pop(Size::Word)?;
    let target = ctx.pop(Size::Long)?;
    ctx.regs.ccr.set_bits(ccr as u8);
    Ok(target)
}

/// RTE: both words come off the supervisor stack before SR is replaced.
fn rte(pc: u32, _opcode: u16, ctx: &mut Context) -> ExecResult {
    privileged(ctx, pc)?;
    let sr = ctx.pop(Size::Word)?;
    let target = ctx.pop(Size::Long)?;
    ctx.set_sr(sr as u16);
    Ok(target)
}

fn trap(pc: u32, opcode: u16, _ctx: &mut Context) -> ExecResult {
    let kind = ExceptionKind::Trap((opcode & 0x0F) as u8);
    Err(Exception::after(kind, pc, pc.wrapping_add(2)).into())
}

fn trapv(pc: u32, _opcode: u16, ctx: &mut Context) -> ExecResult {
    if ctx.regs.ccr.v() {
        Err(Exception::after(ExceptionKind::Trapv, pc, pc.wrapping_add(2)).into())
    } else {
        Ok(pc.wrapping_add(2))
    }
}

fn nop(pc: u32, _opcode: u16, _ctx: &mut Context) -> ExecResult {
    Ok(pc.wrapping_add(2))
}

/// RESET asserts the reset line for every device on the bus; the
/// processor's own state is untouched.
fn reset(pc: u32, _opcode: u16, ctx: &mut Context) -> ExecResult {
    privileged(ctx, pc)?;
    ctx.bus().reset_devices();
    Ok(pc.wrapping_add(2))
}

/// STOP #sr: load SR and wait for an interrupt.
fn stop(pc: u32, _opcode: u16, ctx: &mut Context) -> ExecResult {
    privileged(ctx, pc)?;
    let sr = ctx.fetch16(pc.wrapping_add(2))?;
    ctx.set_sr(sr);
    ctx.set_state(State::Stopped);
    Ok(pc.wrapping_add(4))
}

fn illegal(pc: u32, _opcode: u16, _ctx: &mut Context) -> ExecResult {
    Err(super::illegal(pc))
}

fn line_a(pc: u32, _opcode: u16, _ctx: &mut Context) -> ExecResult {
    Err(Exception::new(ExceptionKind::LineA, pc).into())
}

fn line_f(pc: u32, _opcode: u16, _ctx: &mut Context) -> ExecResult {
    Err(Exception::new(ExceptionKind::LineF, pc).into())
}
