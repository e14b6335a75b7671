//! Dispatch table and the fetch-decode-execute loop.
//!
//! The table has one entry per 16-bit operation word. It is filled from
//! `(code, mask)` patterns: an entry goes to every opcode that agrees with
//! `code` outside the don't-care bits in `mask`. Patterns inserted later
//! win, which lets a broad pattern be laid down first and narrower forms
//! over it. Anything never covered raises an illegal-instruction exception.

use log::{debug, trace, warn};

use crate::context::{Context, State};
use crate::exception::{Exception, ExceptionKind, Fault};
use crate::instructions;
use crate::size::Size;

/// Handler result: the next PC, or why there is none.
pub type ExecResult = Result<u32, Fault>;

/// An instruction handler. Receives the PC of the operation word, the word
/// itself and the context; returns the PC of the next instruction.
pub type Handler = fn(pc: u32, opcode: u16, ctx: &mut Context) -> ExecResult;

/// One dispatch table entry.
#[derive(Debug, Clone, Copy)]
pub struct Instruction {
    pub mnemonic: &'static str,
    pub handler: Handler,
}

/// Mnemonic of the default entry.
pub const ILLEGAL: &str = "illegal";

fn illegal_instruction(pc: u32, _opcode: u16, _ctx: &mut Context) -> ExecResult {
    Err(Exception::illegal(pc).into())
}

/// The instruction decoder and executor.
pub struct Processor {
    table: Box<[Instruction]>,
}

impl Default for Processor {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Processor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let installed = self.table.iter().filter(|i| i.mnemonic != ILLEGAL).count();
        f.debug_struct("Processor")
            .field("installed", &installed)
            .finish()
    }
}

impl Processor {
    /// A processor with the full 68000 instruction set installed.
    #[must_use]
    pub fn new() -> Self {
        let mut processor = Self::empty();
        instructions::install(&mut processor);
        processor
    }

    /// A processor on which every opcode is illegal.
    #[must_use]
    pub fn empty() -> Self {
        let entry = Instruction {
            mnemonic: ILLEGAL,
            handler: illegal_instruction,
        };
        Self {
            table: vec![entry; 0x1_0000].into_boxed_slice(),
        }
    }

    /// Install `handler` at every opcode `v` with `v & !mask == code & !mask`.
    pub fn insert(&mut self, code: u16, mask: u16, mnemonic: &'static str, handler: Handler) {
        let base = code & !mask;
        let mut replaced = 0u32;
        // Walk every subset of the don't-care bits.
        let mut free = mask;
        loop {
            let slot = &mut self.table[usize::from(base | free)];
            if slot.mnemonic != ILLEGAL && slot.mnemonic != mnemonic {
                replaced += 1;
            }
            *slot = Instruction { mnemonic, handler };
            if free == 0 {
                break;
            }
            free = (free - 1) & mask;
        }
        if replaced > 0 {
            debug!("{mnemonic} ${code:04X}/${mask:04X} replaced {replaced} entries");
        }
    }

    /// The entry for `opcode`.
    #[must_use]
    pub fn instruction(&self, opcode: u16) -> Instruction {
        self.table[usize::from(opcode)]
    }

    /// Execute the instruction at `pc` and return the next PC.
    ///
    /// Bus and address errors become exceptions carrying `pc`. With the
    /// trace bit set at the start of the instruction, a completed
    /// instruction reports a trace exception that resumes at the next PC.
    pub fn step(&self, pc: u32, ctx: &mut Context) -> Result<u32, Exception> {
        let opcode = ctx.fetch16(pc).map_err(|f| Fault::from(f).at(pc, 0))?;
        let entry = self.instruction(opcode);
        trace!("{pc:08X}  {opcode:04X}  {}", entry.mnemonic);
        let tracing = ctx.regs.is_trace();
        let next = (entry.handler)(pc, opcode, ctx).map_err(|f| f.at(pc, opcode))?;
        if tracing {
            return Err(Exception {
                opcode,
                ..Exception::after(ExceptionKind::Trace, pc, next)
            });
        }
        Ok(next)
    }

    /// Run from `pc` until an exception, a STOP with nothing to wake it,
    /// or a halt. Interrupts are polled before every instruction.
    ///
    /// Returns `Ok(pc)` with the PC to resume at when the context stops or
    /// halts, and `Err` with the exception otherwise; the host decides
    /// whether to [`deliver`](Self::deliver) it.
    pub fn run(&self, mut pc: u32, ctx: &mut Context) -> Result<u32, Exception> {
        loop {
            if ctx.state() == State::Halted {
                return Ok(pc);
            }
            if ctx.interrupted() {
                pc = ctx
                    .handle_interrupts(pc)
                    .map_err(|f| Fault::from(f).at(pc, 0))?;
            }
            if ctx.state() != State::Running {
                return Ok(pc);
            }
            pc = self.step(pc, ctx)?;
        }
    }

    /// Take `exception` the way the processor would: build its stack frame
    /// on the supervisor stack and return the handler address from its
    /// vector. Bus and address errors get the long frame with the access
    /// word, fault address and instruction register.
    ///
    /// A fault while building the frame halts the context and is returned.
    pub fn deliver(ctx: &mut Context, exception: &Exception) -> Result<u32, Exception> {
        let vector = exception.vector();
        let frame = |ctx: &mut Context| -> Result<u32, Fault> {
            let target = ctx.enter_exception(vector, exception.return_pc)?;
            if let Some(access) = exception.kind.access() {
                ctx.push(Size::Word, u32::from(exception.opcode))?;
                ctx.push(Size::Long, access.address)?;
                ctx.push(Size::Word, u32::from(access.status_word()))?;
            }
            Ok(target)
        };
        match frame(ctx) {
            Ok(target) => {
                if ctx.state() == State::Stopped {
                    ctx.set_state(State::Running);
                }
                debug!("{exception}: vector {vector} -> ${target:08X}");
                Ok(target)
            }
            Err(fault) => {
                warn!("double fault delivering {exception}: {fault}");
                ctx.halt();
                Err(fault.at(exception.pc, exception.opcode))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::{Bus, FC_ALL, shared};
    use crate::memory::Memory;

    fn nop(pc: u32, _opcode: u16, _ctx: &mut Context) -> ExecResult {
        Ok(pc + 2)
    }

    fn skip(pc: u32, _opcode: u16, _ctx: &mut Context) -> ExecResult {
        Ok(pc + 4)
    }

    #[test]
    fn insert_covers_exactly_the_pattern() {
        let mut p = Processor::empty();
        p.insert(0x1230, 0x000F, "x", nop);
        let hits = (0..=0xFFFFu16)
            .filter(|&op| p.instruction(op).mnemonic == "x")
            .count();
        assert_eq!(hits, 16);
        assert_eq!(p.instruction(0x123F).mnemonic, "x");
        assert_eq!(p.instruction(0x1240).mnemonic, ILLEGAL);
    }

    #[test]
    fn later_insert_wins() {
        let mut p = Processor::empty();
        p.insert(0x6000, 0x0FFF, "bcc", nop);
        p.insert(0x6000, 0x00FF, "bra", skip);
        assert_eq!(p.instruction(0x6012).mnemonic, "bra");
        assert_eq!(p.instruction(0x6712).mnemonic, "bcc");
    }

    #[test]
    fn every_opcode_has_an_entry() {
        let p = Processor::new();
        let mut ctx = Context::new(Bus::new());
        let mut illegal = 0;
        for op in 0..=0xFFFFu16 {
            let entry = p.instruction(op);
            assert!(!entry.mnemonic.is_empty());
            if entry.mnemonic == ILLEGAL {
                illegal += 1;
                assert_eq!(
                    (entry.handler)(0x100, op, &mut ctx),
                    Err(Exception::illegal(0x100).into())
                );
            }
        }
        assert!(illegal > 0 && illegal < 0x8000, "{illegal} illegal opcodes");
    }

    #[test]
    fn known_encodings_decode() {
        let p = Processor::new();
        for (op, name) in [
            (0x4E71, "nop"),
            (0x4E75, "rts"),
            (0x7001, "moveq"),
            (0x2040, "movea"),
            (0x2001, "move"),
            (0x41D0, "lea"),
            (0x51C8, "dbcc"),
            (0x6000, "bra"),
            (0x6100, "bsr"),
            (0x6700, "bcc"),
            (0xC141, "exg"),
            (0xC300, "abcd"),
            (0x4AFC, ILLEGAL),
            (0xA000, "line a"),
            (0xF123, "line f"),
            (0x0108, "movep"),
            (0x4840, "swap"),
            (0x4850, "pea"),
            (0x4880, "ext"),
            (0x4890, "movem"),
            (0xE348, "lsl"),
            (0xE7D0, "rol"),
        ] {
            assert_eq!(p.instruction(op).mnemonic, name, "${op:04X}");
        }
    }

    #[test]
    fn run_stops_at_exception_with_instruction_pc() {
        let mut bus = Bus::new();
        let ram = shared(Memory::ram(0, 0x1000));
        ram.borrow_mut().load(0x100, &[0x4E, 0x71, 0x4E, 0x71, 0xFF, 0xFF]);
        bus.map(FC_ALL, 0, 0x1000, ram);
        let mut ctx = Context::new(bus);
        let p = Processor::new();
        let e = p.run(0x100, &mut ctx).unwrap_err();
        assert_eq!(e.kind, ExceptionKind::LineF);
        assert_eq!(e.pc, 0x104);
        assert_eq!(e.opcode, 0xFFFF);
    }

    #[test]
    fn fetch_from_unmapped_space_is_a_bus_error() {
        let mut ctx = Context::new(Bus::new());
        let e = Processor::new().step(0x2000, &mut ctx).unwrap_err();
        assert!(matches!(e.kind, ExceptionKind::BusError(info) if info.address == 0x2000));
        assert_eq!(e.pc, 0x2000);
    }
}
