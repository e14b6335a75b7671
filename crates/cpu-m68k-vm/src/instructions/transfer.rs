//! Data movement: MOVE, MOVEA, MOVEQ, MOVEM, LEA, PEA, EXG, SWAP, EXT,
//! LINK, UNLK and the status register moves.

use log::trace;

use super::{illegal, install_ea, operand, privileged, reg0, reg9};
use crate::addressing::{AddrMode, Modes, Operand};
use crate::context::Context;
use crate::exception::Fault;
use crate::processor::{ExecResult, Processor};
use crate::size::Size;

pub(super) fn install(p: &mut Processor) {
    for (code, size) in [(0x1000, Size::Byte), (0x3000, Size::Word), (0x2000, Size::Long)] {
        let sources = if size == Size::Byte {
            Modes::ALL.without(Modes::ADDR_REG)
        } else {
            Modes::ALL
        };
        // Destination field is register then mode, in bits 11-6.
        for (dest, dest_free) in Modes::DATA_ALTERABLE.encodings() {
            let dest_bits = (dest & 7) << 9 | (dest >> 3) << 6;
            let dest_mask = dest_free << 9;
            install_ea(p, code | dest_bits, dest_mask, sources, "move", mov);
        }
        if size != Size::Byte {
            install_ea(p, code | 0x0040, 0x0E00, Modes::ALL, "movea", movea);
        }
    }

    p.insert(0x7000, 0x0EFF, "moveq", moveq);
    install_ea(p, 0x41C0, 0x0E00, Modes::CONTROL, "lea", lea);
    install_ea(p, 0x4840, 0x0000, Modes::CONTROL, "pea", pea);

    install_ea(p, 0x4880, 0x0040, Modes::MOVEM_STORE, "movem", movem_store);
    install_ea(p, 0x4C80, 0x0040, Modes::MOVEM_LOAD, "movem", movem_load);

    p.insert(0xC140, 0x0E07, "exg", exg);
    p.insert(0xC148, 0x0E07, "exg", exg);
    p.insert(0xC188, 0x0E07, "exg", exg);
    p.insert(0x4840, 0x0007, "swap", swap);
    p.insert(0x4880, 0x0047, "ext", ext);

    install_ea(p, 0x40C0, 0x0000, Modes::DATA_ALTERABLE, "move", move_from_sr);
    install_ea(p, 0x44C0, 0x0000, Modes::DATA, "move", move_to_ccr);
    install_ea(p, 0x46C0, 0x0000, Modes::DATA, "move", move_to_sr);
    p.insert(0x4E60, 0x000F, "move", move_usp);

    p.insert(0x4E50, 0x0007, "link", link);
    p.insert(0x4E58, 0x0007, "unlk", unlk);
}

/// MOVE: both operands decoded up front. The destination's extension
/// words follow the source's.
fn mov(pc: u32, opcode: u16, ctx: &mut Context) -> ExecResult {
    let size = Size::from_move_bits(opcode >> 12).ok_or_else(|| illegal(pc))?;
    let src = operand(opcode, size, pc.wrapping_add(2), pc)?;
    let mode = AddrMode::from_move_dest(opcode).ok_or_else(|| illegal(pc))?;
    let dst = Operand::new(mode, size, src.end());
    trace!("move{size} {},{}", src.text(ctx), dst.text(ctx));
    let value = src.get_unsigned(ctx)?;
    // Both addresses are formed before either side commits An.
    dst.put(ctx, value)?;
    src.finish(ctx);
    dst.finish(ctx);
    ctx.regs.ccr.set_logical(size.sign_extend(value));
    Ok(dst.end())
}

fn movea(pc: u32, opcode: u16, ctx: &mut Context) -> ExecResult {
    let size = Size::from_move_bits(opcode >> 12).ok_or_else(|| illegal(pc))?;
    let src = operand(opcode, size, pc.wrapping_add(2), pc)?;
    let value = src.get(ctx)?;
    ctx.regs.a[reg9(opcode)] = value as u32;
    src.finish(ctx);
    Ok(src.end())
}

fn moveq(pc: u32, opcode: u16, ctx: &mut Context) -> ExecResult {
    let value = i32::from(opcode as u8 as i8);
    ctx.regs.d[reg9(opcode)] = value as u32;
    ctx.regs.ccr.set_logical(value);
    Ok(pc.wrapping_add(2))
}

/// Effective address of a control-mode operand.
fn control_address(pc: u32, ctx: &Context, src: &Operand) -> Result<u32, Fault> {
    src.address(ctx)?.ok_or_else(|| illegal(pc))
}

fn lea(pc: u32, opcode: u16, ctx: &mut Context) -> ExecResult {
    let src = operand(opcode, Size::Long, pc.wrapping_add(2), pc)?;
    ctx.regs.a[reg9(opcode)] = control_address(pc, ctx, &src)?;
    Ok(src.end())
}

fn pea(pc: u32, opcode: u16, ctx: &mut Context) -> ExecResult {
    let src = operand(opcode, Size::Long, pc.wrapping_add(2), pc)?;
    let addr = control_address(pc, ctx, &src)?;
    ctx.push(Size::Long, addr)?;
    Ok(src.end())
}

/// Register `n` of the MOVEM numbering: D0-D7 are 0-7, A0-A7 are 8-15.
fn movem_reg(ctx: &Context, n: usize) -> u32 {
    if n < 8 { ctx.regs.d[n] } else { ctx.regs.a[n - 8] }
}

fn set_movem_reg(ctx: &mut Context, n: usize, value: u32) {
    if n < 8 {
        ctx.regs.d[n] = value;
    } else {
        ctx.regs.a[n - 8] = value;
    }
}

/// MOVEM registers to memory. The register mask follows the operation
/// word; in the -(An) form its bits run A7 down to D0 and the registers
/// are stored from the top down.
fn movem_store(pc: u32, opcode: u16, ctx: &mut Context) -> ExecResult {
    let size = Size::word_or_long(opcode & 0x0040 != 0);
    let mask = ctx.fetch16(pc.wrapping_add(2))?;
    let dst = operand(opcode, size, pc.wrapping_add(4), pc)?;
    if let AddrMode::AddrIndPreDec(r) = dst.mode() {
        let r = usize::from(r);
        // Every register is stored as it was before the instruction,
        // including An itself.
        let mut addr = ctx.regs.a[r];
        for i in (0..16).filter(|&i| mask & (1 << i) != 0) {
            addr = addr.wrapping_sub(size.bytes());
            ctx.write(size, addr, movem_reg(ctx, 15 - i))?;
        }
        ctx.regs.a[r] = addr;
        return Ok(dst.end());
    }
    let mut addr = control_address(pc, ctx, &dst)?;
    for i in (0..16).filter(|&i| mask & (1 << i) != 0) {
        ctx.write(size, addr, movem_reg(ctx, i))?;
        addr = addr.wrapping_add(size.bytes());
    }
    Ok(dst.end())
}

/// MOVEM memory to registers, D0 first. Words are sign-extended to the
/// whole register. In the (An)+ form An ends up past the last word read,
/// whatever was loaded into it.
fn movem_load(pc: u32, opcode: u16, ctx: &mut Context) -> ExecResult {
    let size = Size::word_or_long(opcode & 0x0040 != 0);
    let mask = ctx.fetch16(pc.wrapping_add(2))?;
    let src = operand(opcode, size, pc.wrapping_add(4), pc)?;
    let program = matches!(src.mode(), AddrMode::PcDisp | AddrMode::PcIndex);
    let mut addr = control_address(pc, ctx, &src)?;
    for i in (0..16).filter(|&i| mask & (1 << i) != 0) {
        let value = if program {
            ctx.fetch(size, addr)?
        } else {
            ctx.read(size, addr)?
        };
        set_movem_reg(ctx, i, size.sign_extend(value) as u32);
        addr = addr.wrapping_add(size.bytes());
    }
    if let AddrMode::AddrIndPostInc(r) = src.mode() {
        ctx.regs.a[usize::from(r)] = addr;
    }
    Ok(src.end())
}

/// EXG: opmode in bits 7-3 picks data, address or mixed registers.
fn exg(pc: u32, opcode: u16, ctx: &mut Context) -> ExecResult {
    let (x, y) = (reg9(opcode), reg0(opcode));
    let regs = &mut ctx.regs;
    match (opcode >> 3) & 0x1F {
        0x08 => regs.d.swap(x, y),
        0x09 => regs.a.swap(x, y),
        0x11 => std::mem::swap(&mut regs.d[x], &mut regs.a[y]),
        _ => return Err(illegal(pc)),
    }
    Ok(pc.wrapping_add(2))
}

fn swap(pc: u32, opcode: u16, ctx: &mut Context) -> ExecResult {
    let r = reg0(opcode);
    let value = ctx.regs.d[r].rotate_left(16);
    ctx.regs.d[r] = value;
    ctx.regs.ccr.set_logical(value as i32);
    Ok(pc.wrapping_add(2))
}

/// EXT.W (bit 6 clear) sign-extends a byte to a word, EXT.L a word to a
/// long.
fn ext(pc: u32, opcode: u16, ctx: &mut Context) -> ExecResult {
    let r = reg0(opcode);
    let (from, to) = if opcode & 0x0040 == 0 {
        (Size::Byte, Size::Word)
    } else {
        (Size::Word, Size::Long)
    };
    let value = from.sign_extend(ctx.regs.d[r]);
    ctx.regs.d[r] = to.merge(ctx.regs.d[r], value as u32);
    ctx.regs.ccr.set_logical(value);
    Ok(pc.wrapping_add(2))
}

/// MOVE from SR is not privileged on the 68000.
fn move_from_sr(pc: u32, opcode: u16, ctx: &mut Context) -> ExecResult {
    let dst = operand(opcode, Size::Word, pc.wrapping_add(2), pc)?;
    let sr = ctx.sr();
    dst.put(ctx, u32::from(sr))?;
    dst.finish(ctx);
    Ok(dst.end())
}

fn move_to_ccr(pc: u32, opcode: u16, ctx: &mut Context) -> ExecResult {
    let src = operand(opcode, Size::Word, pc.wrapping_add(2), pc)?;
    let value = src.get_unsigned(ctx)?;
    ctx.regs.ccr.set_bits(value as u8);
    src.finish(ctx);
    Ok(src.end())
}

fn move_to_sr(pc: u32, opcode: u16, ctx: &mut Context) -> ExecResult {
    privileged(ctx, pc)?;
    let src = operand(opcode, Size::Word, pc.wrapping_add(2), pc)?;
    let value = src.get_unsigned(ctx)?;
    src.finish(ctx);
    ctx.set_sr(value as u16);
    Ok(src.end())
}

/// MOVE An,USP (bit 3 clear) or MOVE USP,An (bit 3 set).
fn move_usp(pc: u32, opcode: u16, ctx: &mut Context) -> ExecResult {
    privileged(ctx, pc)?;
    let r = reg0(opcode);
    if opcode & 0x0008 == 0 {
        ctx.regs.set_usp(ctx.regs.a[r]);
    } else {
        ctx.regs.a[r] = ctx.regs.usp();
    }
    Ok(pc.wrapping_add(2))
}

/// LINK An,#d16: push An, point An at it, then move SP by d16.
fn link(pc: u32, opcode: u16, ctx: &mut Context) -> ExecResult {
    let disp = ctx.fetch16(pc.wrapping_add(2))? as i16;
    let r = reg0(opcode);
    // LINK A7 stores the already decremented stack pointer.
    let value = if r == 7 {
        ctx.regs.a[7].wrapping_sub(4)
    } else {
        ctx.regs.a[r]
    };
    ctx.push(Size::Long, value)?;
    ctx.regs.a[r] = ctx.regs.a[7];
    ctx.regs.a[7] = ctx.regs.a[7].wrapping_add(disp as u32);
    Ok(pc.wrapping_add(4))
}

/// UNLK An: SP from An, then An popped.
fn unlk(pc: u32, opcode: u16, ctx: &mut Context) -> ExecResult {
    let r = reg0(opcode);
    let sp = ctx.regs.a[7];
    ctx.regs.a[7] = ctx.regs.a[r];
    match ctx.pop(Size::Long) {
        Ok(value) => {
            ctx.regs.a[r] = value;
            Ok(pc.wrapping_add(2))
        }
        Err(fault) => {
            ctx.regs.a[7] = sp;
            Err(fault.into())
        }
    }
}
