//! Read-only inspection of processor state by path, for debuggers and
//! test harnesses. Queries never change emulation state.

use std::fmt;

use crate::context::{Context, State};
use crate::flags::{C, N, S, T, V, X, Z};

/// A dynamically-typed value for state queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Bool(bool),
    U8(u8),
    U16(u16),
    U32(u32),
    String(String),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(v) => write!(f, "{v}"),
            Value::U8(v) => write!(f, "{v:#04X}"),
            Value::U16(v) => write!(f, "{v:#06X}"),
            Value::U32(v) => write!(f, "{v:#010X}"),
            Value::String(v) => write!(f, "{v}"),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<u8> for Value {
    fn from(v: u8) -> Self {
        Value::U8(v)
    }
}

impl From<u16> for Value {
    fn from(v: u16) -> Self {
        Value::U16(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::U32(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

/// A component whose state can be inspected.
pub trait Observable {
    /// Query a property by dotted path, e.g. `d3` or `flags.z`.
    /// Returns `None` if the path is not recognised.
    fn query(&self, path: &str) -> Option<Value>;

    /// Every path `query` answers.
    fn query_paths(&self) -> &'static [&'static str];
}

const PATHS: &[&str] = &[
    "d0", "d1", "d2", "d3", "d4", "d5", "d6", "d7", "a0", "a1", "a2", "a3", "a4", "a5", "a6",
    "a7", "usp", "ssp", "sr", "ccr", "flags.x", "flags.n", "flags.z", "flags.v", "flags.c",
    "flags.s", "flags.t", "ipl", "pending", "state",
];

/// Register number from the digit after `d` or `a`.
fn register(digits: &str) -> Option<usize> {
    match digits.parse::<usize>() {
        Ok(n) if n < 8 && digits.len() == 1 => Some(n),
        _ => None,
    }
}

impl Observable for Context {
    fn query(&self, path: &str) -> Option<Value> {
        let regs = &self.regs;
        if let Some(flag) = path.strip_prefix("flags.") {
            let bit = match flag {
                "x" => X,
                "n" => N,
                "z" => Z,
                "v" => V,
                "c" => C,
                "s" => S,
                "t" => T,
                _ => return None,
            };
            return Some((regs.sr() & bit != 0).into());
        }
        if let Some(n) = path.strip_prefix('d').and_then(register) {
            return Some(regs.d[n].into());
        }
        if let Some(n) = path.strip_prefix('a').and_then(register) {
            return Some(regs.a[n].into());
        }
        match path {
            "usp" => Some(regs.usp().into()),
            "ssp" => Some(regs.ssp().into()),
            "sr" => Some(regs.sr().into()),
            "ccr" => Some(regs.ccr_byte().into()),
            "ipl" => Some(regs.interrupt_mask().into()),
            "pending" => Some((self.interrupts().len() as u32).into()),
            "state" => Some(
                match self.state() {
                    State::Running => "running",
                    State::Stopped => "stopped",
                    State::Halted => "halted",
                }
                .into(),
            ),
            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        PATHS
    }
}
