//! Execution context: everything an instruction can touch.

use log::{debug, warn};

use crate::bus::{Bus, BusResult, FunctionCode};
use crate::interrupt::InterruptQueue;
use crate::registers::Registers;
use crate::size::Size;

/// Run state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Executing instructions.
    Running,
    /// STOP executed; waiting for an interrupt.
    Stopped,
    /// Double fault or host request; only a reset recovers.
    Halted,
}

/// Registers, bus and interrupt state of one emulated processor.
#[derive(Debug)]
pub struct Context {
    pub regs: Registers,
    bus: Bus,
    interrupts: InterruptQueue,
    state: State,
}

impl Context {
    /// A context in reset state (supervisor, mask 7) driving `bus`.
    #[must_use]
    pub fn new(bus: Bus) -> Self {
        Self {
            regs: Registers::new(),
            bus,
            interrupts: InterruptQueue::new(),
            state: State::Running,
        }
    }

    #[must_use]
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut Bus {
        &mut self.bus
    }

    #[must_use]
    pub fn state(&self) -> State {
        self.state
    }

    pub fn set_state(&mut self, state: State) {
        self.state = state;
    }

    /// Stop executing until the next reset.
    pub fn halt(&mut self) {
        self.state = State::Halted;
    }

    /// Power-on reset: supervisor mode, mask 7, trace off, interrupts
    /// flushed, SSP from vector 0 and PC from vector 1.
    /// Returns the initial PC.
    pub fn reset(&mut self) -> BusResult<u32> {
        self.regs.set_sr(0x2700);
        self.interrupts.clear();
        self.state = State::Running;
        let ssp = self.bus.read32(FunctionCode::SupervisorProgram, 0)?;
        let pc = self.bus.read32(FunctionCode::SupervisorProgram, 4)?;
        self.regs.a[7] = ssp;
        Ok(pc)
    }

    #[must_use]
    pub fn is_supervisor(&self) -> bool {
        self.regs.is_supervisor()
    }

    pub fn set_supervisor(&mut self, supervisor: bool) {
        if supervisor != self.regs.is_supervisor() {
            debug!(
                "entering {} mode",
                if supervisor { "supervisor" } else { "user" }
            );
        }
        self.regs.set_supervisor(supervisor);
    }

    #[must_use]
    pub fn sr(&self) -> u16 {
        self.regs.sr()
    }

    /// Load SR, switching stacks if the S bit changes.
    pub fn set_sr(&mut self, value: u16) {
        self.set_supervisor(value & crate::flags::S != 0);
        self.regs.set_sr(value);
    }

    /// Function code for operand accesses in the current mode.
    #[must_use]
    pub fn data_fc(&self) -> FunctionCode {
        FunctionCode::from_flags(self.regs.is_supervisor(), false)
    }

    /// Function code for instruction-stream accesses in the current mode.
    #[must_use]
    pub fn program_fc(&self) -> FunctionCode {
        FunctionCode::from_flags(self.regs.is_supervisor(), true)
    }

    pub fn fetch16(&self, addr: u32) -> BusResult<u16> {
        self.bus.read16(self.program_fc(), addr)
    }

    pub fn fetch32(&self, addr: u32) -> BusResult<u32> {
        self.bus.read32(self.program_fc(), addr)
    }

    /// Read from program space, zero-extended.
    pub fn fetch(&self, size: Size, addr: u32) -> BusResult<u32> {
        let fc = self.program_fc();
        match size {
            Size::Byte => self.bus.read8(fc, addr).map(u32::from),
            Size::Word => self.bus.read16(fc, addr).map(u32::from),
            Size::Long => self.bus.read32(fc, addr),
        }
    }

    /// Read from data space, zero-extended.
    pub fn read(&self, size: Size, addr: u32) -> BusResult<u32> {
        let fc = self.data_fc();
        match size {
            Size::Byte => self.bus.read8(fc, addr).map(u32::from),
            Size::Word => self.bus.read16(fc, addr).map(u32::from),
            Size::Long => self.bus.read32(fc, addr),
        }
    }

    /// Write the low `size` bits of `value` to data space.
    pub fn write(&mut self, size: Size, addr: u32, value: u32) -> BusResult<()> {
        let fc = self.data_fc();
        match size {
            Size::Byte => self.bus.write8(fc, addr, value as u8),
            Size::Word => self.bus.write16(fc, addr, value as u16),
            Size::Long => self.bus.write32(fc, addr, value),
        }
    }

    /// Write to A7 only after the memory write succeeds.
    pub fn push(&mut self, size: Size, value: u32) -> BusResult<()> {
        let sp = self.regs.a[7].wrapping_sub(size.bytes());
        self.write(size, sp, value)?;
        self.regs.a[7] = sp;
        Ok(())
    }

    pub fn pop(&mut self, size: Size) -> BusResult<u32> {
        let sp = self.regs.a[7];
        let value = self.read(size, sp)?;
        self.regs.a[7] = sp.wrapping_add(size.bytes());
        Ok(value)
    }

    /// Queue an interrupt request. Priorities outside 1-7 are dropped.
    pub fn interrupt(&mut self, priority: u8, vector: u8) {
        if !self.interrupts.request(priority, vector) {
            warn!("dropping interrupt request with priority {priority} (vector {vector})");
        }
    }

    /// Whether an interrupt would be accepted at the next instruction
    /// boundary.
    #[must_use]
    pub fn interrupted(&self) -> bool {
        self.interrupts.is_pending(self.regs.interrupt_mask())
    }

    #[must_use]
    pub fn interrupts(&self) -> &InterruptQueue {
        &self.interrupts
    }

    /// Accept the highest pending interrupt if it beats the mask: stack PC
    /// and SR on the supervisor stack, raise the mask to the request's
    /// level and return the handler address. Returns `pc` unchanged when
    /// nothing is deliverable.
    pub fn handle_interrupts(&mut self, pc: u32) -> BusResult<u32> {
        let Some((priority, vector)) = self.interrupts.accept(self.regs.interrupt_mask()) else {
            return Ok(pc);
        };
        debug!("interrupt level {priority} vector {vector} at ${pc:08X}");
        let target = self.enter_exception(vector, pc)?;
        self.regs.set_interrupt_mask(priority);
        self.state = State::Running;
        Ok(target)
    }

    /// Common exception entry: save SR, go supervisor with trace off, stack
    /// PC and the saved SR, and read the handler address for `vector`.
    pub(crate) fn enter_exception(&mut self, vector: u8, pc: u32) -> BusResult<u32> {
        let sr = self.regs.sr();
        self.set_supervisor(true);
        self.regs.set_trace(false);
        self.push(Size::Long, pc)?;
        self.push(Size::Word, u32::from(sr))?;
        self.bus
            .read32(FunctionCode::SupervisorData, u32::from(vector) * 4)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::{FC_ALL, shared};
    use crate::memory::Memory;

    fn context() -> Context {
        let mut bus = Bus::new();
        bus.map(FC_ALL, 0, 0x1_0000, shared(Memory::ram(0, 0x1_0000)));
        Context::new(bus)
    }

    #[test]
    fn reset_loads_stack_and_pc() {
        let mut ctx = context();
        ctx.bus_mut()
            .write32(FunctionCode::SupervisorData, 0, 0x8000)
            .unwrap();
        ctx.bus_mut()
            .write32(FunctionCode::SupervisorData, 4, 0x0400)
            .unwrap();
        ctx.set_sr(0x0000);
        assert_eq!(ctx.reset(), Ok(0x0400));
        assert_eq!(ctx.regs.a[7], 0x8000);
        assert_eq!(ctx.sr(), 0x2700);
    }

    #[test]
    fn function_codes_follow_mode() {
        let mut ctx = context();
        assert_eq!(ctx.data_fc(), FunctionCode::SupervisorData);
        assert_eq!(ctx.program_fc(), FunctionCode::SupervisorProgram);
        ctx.set_sr(0);
        assert_eq!(ctx.data_fc(), FunctionCode::UserData);
        assert_eq!(ctx.program_fc(), FunctionCode::UserProgram);
    }

    #[test]
    fn interrupt_frame_and_mask() {
        let mut ctx = context();
        ctx.regs.a[7] = 0x2000;
        ctx.regs.set_usp(0x3000);
        ctx.bus_mut()
            .write32(FunctionCode::SupervisorData, 26 * 4, 0x0900)
            .unwrap();
        ctx.set_sr(0x0004);

        ctx.interrupt(2, 26);
        assert!(ctx.interrupted());
        assert_eq!(ctx.handle_interrupts(0x0456), Ok(0x0900));

        assert!(ctx.is_supervisor());
        assert_eq!(ctx.regs.interrupt_mask(), 2);
        assert_eq!(ctx.regs.a[7], 0x2000 - 6);
        assert_eq!(ctx.regs.usp(), 0x3000);
        assert_eq!(ctx.read(Size::Word, 0x1FFA), Ok(0x0004));
        assert_eq!(ctx.read(Size::Long, 0x1FFC), Ok(0x0456));
        assert!(!ctx.interrupted());
    }

    #[test]
    fn masked_interrupt_waits() {
        let mut ctx = context();
        ctx.regs.set_interrupt_mask(4);
        ctx.interrupt(4, 28);
        assert!(!ctx.interrupted());
        assert_eq!(ctx.handle_interrupts(0x100), Ok(0x100));
        ctx.regs.set_interrupt_mask(3);
        assert!(ctx.interrupted());
    }

    #[test]
    fn push_and_pop() {
        let mut ctx = context();
        ctx.regs.a[7] = 0x1000;
        ctx.push(Size::Long, 0xCAFE_BABE).unwrap();
        ctx.push(Size::Word, 0x1234).unwrap();
        assert_eq!(ctx.regs.a[7], 0x0FFA);
        assert_eq!(ctx.pop(Size::Word), Ok(0x1234));
        assert_eq!(ctx.pop(Size::Long), Ok(0xCAFE_BABE));
        assert_eq!(ctx.regs.a[7], 0x1000);
    }
}
