//! Instruction-level Motorola 68000 core.
//!
//! The processor works against a [`Bus`] that maps 4 KiB pages of a 24-bit
//! address space to [`Mappable`] devices, separately for each function
//! code. A 64K-entry dispatch table maps every operation word to its
//! handler; the [`Context`] holds the registers, the bus and pending
//! interrupts. Exceptions come back to the host as values, and the host
//! decides whether to [`Processor::deliver`] them.
//!
//! ```
//! use cpu_m68k_vm::{Bus, Context, FC_ALL, Memory, Processor, shared};
//!
//! let ram = shared(Memory::ram(0, 0x1_0000));
//! // moveq #5,d0 ; stop #$2700
//! ram.borrow_mut().load(0x400, &[0x70, 0x05, 0x4E, 0x72, 0x27, 0x00]);
//! let mut bus = Bus::new();
//! bus.map(FC_ALL, 0, 0x1_0000, ram);
//!
//! let mut ctx = Context::new(bus);
//! let pc = Processor::new().run(0x400, &mut ctx).unwrap();
//! assert_eq!(ctx.regs.d[0], 5);
//! assert_eq!(pc, 0x406);
//! ```

pub mod addressing;
pub mod bus;
pub mod context;
pub mod exception;
pub mod flags;
mod instructions;
pub mod interrupt;
pub mod memory;
pub mod observable;
pub mod processor;
pub mod registers;
pub mod size;

pub use addressing::{AddrMode, Modes, Operand};
pub use bus::{
    AccessInfo, Bus, BusConfig, BusFault, BusResult, ConfigError, Direction, FC_ALL, FC_SUPERVISOR,
    FC_SUPERVISOR_DATA, FC_SUPERVISOR_PROGRAM, FC_USER, FC_USER_DATA, FC_USER_PROGRAM,
    FunctionCode, Mappable, SharedDevice, Unmapped, shared,
};
pub use context::{Context, State};
pub use exception::{Exception, ExceptionKind, Fault};
pub use flags::ConditionCodes;
pub use interrupt::InterruptQueue;
pub use memory::Memory;
pub use observable::{Observable, Value};
pub use processor::{ExecResult, Handler, Instruction, Processor};
pub use registers::Registers;
pub use size::Size;
