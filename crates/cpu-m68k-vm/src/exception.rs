//! Processor exceptions.
//!
//! Handlers never unwind. A bus cycle that faults yields a [`BusFault`];
//! an instruction that traps yields an [`Exception`]. Both travel up as a
//! [`Fault`], and the processor turns the former into the latter once it
//! knows where the instruction started.

use std::fmt;

use crate::bus::{AccessInfo, BusFault};

/// What went wrong, with the vector it is taken through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExceptionKind {
    /// Vector 2.
    BusError(AccessInfo),
    /// Vector 3.
    AddressError(AccessInfo),
    /// Vector 4: no handler for the opcode, or ILLEGAL.
    IllegalInstruction,
    /// Vector 5: DIVU/DIVS by zero.
    ZeroDivide,
    /// Vector 6: CHK bound exceeded.
    Chk,
    /// Vector 7: TRAPV with V set.
    Trapv,
    /// Vector 8: supervisor-only instruction in user mode.
    PrivilegeViolation,
    /// Vector 9: an instruction completed with T set in SR.
    Trace,
    /// Vector 10: opcode $Axxx.
    LineA,
    /// Vector 11: opcode $Fxxx.
    LineF,
    /// Vectors 32-47: TRAP #n.
    Trap(u8),
}

impl ExceptionKind {
    #[must_use]
    pub const fn vector(&self) -> u8 {
        match self {
            Self::BusError(_) => 2,
            Self::AddressError(_) => 3,
            Self::IllegalInstruction => 4,
            Self::ZeroDivide => 5,
            Self::Chk => 6,
            Self::Trapv => 7,
            Self::PrivilegeViolation => 8,
            Self::Trace => 9,
            Self::LineA => 10,
            Self::LineF => 11,
            Self::Trap(n) => 32 + (*n & 0x0F),
        }
    }

    /// Bus and address errors stack the long group 0 frame.
    #[must_use]
    pub const fn access(&self) -> Option<AccessInfo> {
        match self {
            Self::BusError(info) | Self::AddressError(info) => Some(*info),
            _ => None,
        }
    }
}

impl From<BusFault> for ExceptionKind {
    fn from(fault: BusFault) -> Self {
        match fault {
            BusFault::BusError(info) => Self::BusError(info),
            BusFault::AddressError(info) => Self::AddressError(info),
        }
    }
}

impl fmt::Display for ExceptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BusError(info) => write!(f, "bus error ({info})"),
            Self::AddressError(info) => write!(f, "address error ({info})"),
            Self::IllegalInstruction => f.write_str("illegal instruction"),
            Self::ZeroDivide => f.write_str("zero divide"),
            Self::Chk => f.write_str("CHK out of bounds"),
            Self::Trapv => f.write_str("TRAPV overflow"),
            Self::PrivilegeViolation => f.write_str("privilege violation"),
            Self::Trace => f.write_str("trace"),
            Self::LineA => f.write_str("line A emulator"),
            Self::LineF => f.write_str("line F emulator"),
            Self::Trap(n) => write!(f, "TRAP #{n}"),
        }
    }
}

/// A processor exception raised by an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Exception {
    pub kind: ExceptionKind,
    /// Address of the instruction that raised it.
    pub pc: u32,
    /// PC to stack: the faulting instruction itself for faults, the next
    /// instruction for traps.
    pub return_pc: u32,
    /// Operation word of the instruction, zero if the fetch itself failed.
    pub opcode: u16,
}

impl Exception {
    /// A fault that restarts at `pc`.
    #[must_use]
    pub const fn new(kind: ExceptionKind, pc: u32) -> Self {
        Self {
            kind,
            pc,
            return_pc: pc,
            opcode: 0,
        }
    }

    /// A trap that resumes at `next_pc`.
    #[must_use]
    pub const fn after(kind: ExceptionKind, pc: u32, next_pc: u32) -> Self {
        Self {
            kind,
            pc,
            return_pc: next_pc,
            opcode: 0,
        }
    }

    #[must_use]
    pub const fn illegal(pc: u32) -> Self {
        Self::new(ExceptionKind::IllegalInstruction, pc)
    }

    #[must_use]
    pub const fn privilege(pc: u32) -> Self {
        Self::new(ExceptionKind::PrivilegeViolation, pc)
    }

    #[must_use]
    pub const fn vector(&self) -> u8 {
        self.kind.vector()
    }
}

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at ${:08X}", self.kind, self.pc)
    }
}

impl std::error::Error for Exception {}

/// Error half of an instruction handler's result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    Bus(BusFault),
    Exception(Exception),
}

impl From<BusFault> for Fault {
    fn from(fault: BusFault) -> Self {
        Self::Bus(fault)
    }
}

impl From<Exception> for Fault {
    fn from(exception: Exception) -> Self {
        Self::Exception(exception)
    }
}

impl Fault {
    /// Resolve to an exception for the instruction at `pc`.
    #[must_use]
    pub fn at(self, pc: u32, opcode: u16) -> Exception {
        match self {
            Self::Bus(fault) => Exception {
                opcode,
                ..Exception::new(fault.into(), pc)
            },
            Self::Exception(e) => Exception { opcode, ..e },
        }
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bus(fault) => fault.fmt(f),
            Self::Exception(e) => e.fmt(f),
        }
    }
}

impl std::error::Error for Fault {}
