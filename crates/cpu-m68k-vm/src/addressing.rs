//! Effective addressing modes.
//!
//! [`AddrMode`] is the decoded 6-bit mode/register field. [`Operand`] binds
//! a mode to an operand size and to the address of its first extension
//! word, and does the actual work: computing the effective address,
//! reading, writing, and applying the deferred post-increment or
//! pre-decrement once the instruction is done with the operand.

use std::fmt;

use crate::bus::{BusFault, BusResult, Direction};
use crate::context::Context;
use crate::size::Size;

/// 68000 addressing modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddrMode {
    /// Data register direct: Dn
    DataReg(u8),
    /// Address register direct: An
    AddrReg(u8),
    /// Address register indirect: (An)
    AddrInd(u8),
    /// Address register indirect with postincrement: (An)+
    AddrIndPostInc(u8),
    /// Address register indirect with predecrement: -(An)
    AddrIndPreDec(u8),
    /// Address register indirect with displacement: d16(An)
    AddrIndDisp(u8),
    /// Address register indirect with index: d8(An,Xn)
    AddrIndIndex(u8),
    /// Absolute short: (xxx).W
    AbsShort,
    /// Absolute long: (xxx).L
    AbsLong,
    /// Program counter with displacement: d16(PC)
    PcDisp,
    /// Program counter with index: d8(PC,Xn)
    PcIndex,
    /// Immediate: #<data>
    Immediate,
}

impl AddrMode {
    /// Decode addressing mode from mode/register fields.
    #[must_use]
    pub fn decode(mode: u8, reg: u8) -> Option<Self> {
        match mode & 0x07 {
            0 => Some(Self::DataReg(reg & 0x07)),
            1 => Some(Self::AddrReg(reg & 0x07)),
            2 => Some(Self::AddrInd(reg & 0x07)),
            3 => Some(Self::AddrIndPostInc(reg & 0x07)),
            4 => Some(Self::AddrIndPreDec(reg & 0x07)),
            5 => Some(Self::AddrIndDisp(reg & 0x07)),
            6 => Some(Self::AddrIndIndex(reg & 0x07)),
            _ => match reg & 0x07 {
                0 => Some(Self::AbsShort),
                1 => Some(Self::AbsLong),
                2 => Some(Self::PcDisp),
                3 => Some(Self::PcIndex),
                4 => Some(Self::Immediate),
                _ => None,
            },
        }
    }

    /// Decode the source EA field in bits 5-0.
    #[must_use]
    pub fn from_ea(opcode: u16) -> Option<Self> {
        Self::decode(((opcode >> 3) & 7) as u8, (opcode & 7) as u8)
    }

    /// Decode MOVE's destination field: register in bits 11-9, mode in 8-6.
    #[must_use]
    pub fn from_move_dest(opcode: u16) -> Option<Self> {
        Self::decode(((opcode >> 6) & 7) as u8, ((opcode >> 9) & 7) as u8)
    }

    /// Position of this mode in a [`Modes`] set.
    const fn kind(self) -> u16 {
        match self {
            Self::DataReg(_) => 0,
            Self::AddrReg(_) => 1,
            Self::AddrInd(_) => 2,
            Self::AddrIndPostInc(_) => 3,
            Self::AddrIndPreDec(_) => 4,
            Self::AddrIndDisp(_) => 5,
            Self::AddrIndIndex(_) => 6,
            Self::AbsShort => 7,
            Self::AbsLong => 8,
            Self::PcDisp => 9,
            Self::PcIndex => 10,
            Self::Immediate => 11,
        }
    }

    /// Extension words consumed for an operand of `size`.
    #[must_use]
    pub const fn extension_words(&self, size: Size) -> u32 {
        match self {
            Self::AddrIndDisp(_)
            | Self::AddrIndIndex(_)
            | Self::AbsShort
            | Self::PcDisp
            | Self::PcIndex => 1,
            Self::AbsLong => 2,
            Self::Immediate => {
                if matches!(size, Size::Long) {
                    2
                } else {
                    1
                }
            }
            _ => 0,
        }
    }
}

impl fmt::Display for AddrMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DataReg(r) => write!(f, "d{r}"),
            Self::AddrReg(r) => write!(f, "a{r}"),
            Self::AddrInd(r) => write!(f, "(a{r})"),
            Self::AddrIndPostInc(r) => write!(f, "(a{r})+"),
            Self::AddrIndPreDec(r) => write!(f, "-(a{r})"),
            Self::AddrIndDisp(r) => write!(f, "(d16,a{r})"),
            Self::AddrIndIndex(r) => write!(f, "(d8,a{r},xn)"),
            Self::AbsShort => f.write_str("(xxx).w"),
            Self::AbsLong => f.write_str("(xxx).l"),
            Self::PcDisp => f.write_str("(d16,pc)"),
            Self::PcIndex => f.write_str("(d8,pc,xn)"),
            Self::Immediate => f.write_str("#imm"),
        }
    }
}

/// A set of addressing modes, as used to describe which EA encodings an
/// instruction accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Modes(u16);

impl Modes {
    /// Every mode.
    pub const ALL: Self = Self(0x0FFF);
    /// Everything except An.
    pub const DATA: Self = Self(0x0FFD);
    /// (An), d16(An), d8(An,Xn), absolute and PC-relative.
    pub const CONTROL: Self = Self(0x07E4);
    /// Everything except PC-relative and immediate.
    pub const ALTERABLE: Self = Self(0x01FF);
    pub const DATA_ALTERABLE: Self = Self(0x01FD);
    pub const MEMORY_ALTERABLE: Self = Self(0x01FC);
    pub const CONTROL_ALTERABLE: Self = Self(0x01E4);
    /// Data modes other than immediate (static bit test).
    pub const DATA_NO_IMMEDIATE: Self = Self(0x07FD);
    /// MOVEM register-to-memory destinations.
    pub const MOVEM_STORE: Self = Self(0x01F4);
    /// MOVEM memory-to-register sources.
    pub const MOVEM_LOAD: Self = Self(0x07EC);

    #[must_use]
    pub const fn contains(self, mode: AddrMode) -> bool {
        self.0 & (1 << mode.kind()) != 0
    }

    #[must_use]
    pub const fn without(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    /// Modes matching An alone, for `without`.
    pub const ADDR_REG: Self = Self(0x0002);

    /// The EA field encodings in this set, as `(bits, don't-care mask)`
    /// pairs for bits 5-0 of an opcode. Register-based modes leave the
    /// register number free; mode 7 forms pin it.
    pub fn encodings(self) -> impl Iterator<Item = (u16, u16)> {
        (0..12u16)
            .filter(move |kind| self.0 & (1 << kind) != 0)
            .map(|kind| {
                if kind < 7 {
                    (kind << 3, 0x0007)
                } else {
                    (0x38 | (kind - 7), 0x0000)
                }
            })
    }
}

/// Where an operand lives once its extension words have been read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Location {
    Data(usize),
    Addr(usize),
    /// Data space.
    Memory(u32),
    /// Program space: PC-relative operands.
    Program(u32),
    Immediate(u32),
}

/// One operand of an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Operand {
    mode: AddrMode,
    size: Size,
    /// Address of this operand's first extension word.
    ext: u32,
}

impl Operand {
    #[must_use]
    pub const fn new(mode: AddrMode, size: Size, ext: u32) -> Self {
        Self { mode, size, ext }
    }

    #[must_use]
    pub const fn mode(&self) -> AddrMode {
        self.mode
    }

    #[must_use]
    pub const fn size(&self) -> Size {
        self.size
    }

    #[must_use]
    pub const fn extension_words(&self) -> u32 {
        self.mode.extension_words(self.size)
    }

    /// Bytes of instruction stream this operand occupies.
    #[must_use]
    pub const fn extension_size(&self) -> u32 {
        self.extension_words() * 2
    }

    /// Address of whatever follows this operand's extension words.
    #[must_use]
    pub const fn end(&self) -> u32 {
        self.ext.wrapping_add(self.extension_size())
    }

    /// Increment or decrement step for (An)+ and -(An). A7 never moves by
    /// an odd amount.
    fn step(&self, reg: u8) -> u32 {
        if reg == 7 && self.size == Size::Byte {
            2
        } else {
            self.size.bytes()
        }
    }

    fn brief_index(ctx: &Context, base: u32, ext: u16) -> u32 {
        let disp = i32::from(ext as u8 as i8);
        base.wrapping_add(ctx.regs.index(ext) as u32)
            .wrapping_add(disp as u32)
    }

    fn locate(&self, ctx: &Context) -> BusResult<Location> {
        let regs = &ctx.regs;
        Ok(match self.mode {
            AddrMode::DataReg(r) => Location::Data(usize::from(r)),
            AddrMode::AddrReg(r) => Location::Addr(usize::from(r)),
            AddrMode::AddrInd(r) | AddrMode::AddrIndPostInc(r) => {
                Location::Memory(regs.a[usize::from(r)])
            }
            AddrMode::AddrIndPreDec(r) => {
                Location::Memory(regs.a[usize::from(r)].wrapping_sub(self.step(r)))
            }
            AddrMode::AddrIndDisp(r) => {
                let disp = ctx.fetch16(self.ext)? as i16;
                Location::Memory(regs.a[usize::from(r)].wrapping_add(disp as u32))
            }
            AddrMode::AddrIndIndex(r) => {
                let ext = ctx.fetch16(self.ext)?;
                Location::Memory(Self::brief_index(ctx, regs.a[usize::from(r)], ext))
            }
            AddrMode::AbsShort => Location::Memory(ctx.fetch16(self.ext)? as i16 as u32),
            AddrMode::AbsLong => Location::Memory(ctx.fetch32(self.ext)?),
            AddrMode::PcDisp => {
                let disp = ctx.fetch16(self.ext)? as i16;
                Location::Program(self.ext.wrapping_add(disp as u32))
            }
            AddrMode::PcIndex => {
                let ext = ctx.fetch16(self.ext)?;
                Location::Program(Self::brief_index(ctx, self.ext, ext))
            }
            AddrMode::Immediate => Location::Immediate(match self.size {
                Size::Byte => ctx.fetch16(self.ext)? as u32 & 0xFF,
                Size::Word => u32::from(ctx.fetch16(self.ext)?),
                Size::Long => ctx.fetch32(self.ext)?,
            }),
        })
    }

    /// Effective address, or `None` for register direct and immediate.
    pub fn address(&self, ctx: &Context) -> BusResult<Option<u32>> {
        Ok(match self.locate(ctx)? {
            Location::Memory(addr) | Location::Program(addr) => Some(addr),
            _ => None,
        })
    }

    /// Read the operand, zero-extended.
    pub fn get_unsigned(&self, ctx: &Context) -> BusResult<u32> {
        let mask = self.size.mask();
        match self.locate(ctx)? {
            Location::Data(r) => Ok(ctx.regs.d[r] & mask),
            Location::Addr(r) => Ok(ctx.regs.a[r] & mask),
            Location::Memory(addr) => ctx.read(self.size, addr),
            Location::Program(addr) => ctx.fetch(self.size, addr),
            Location::Immediate(value) => Ok(value & mask),
        }
    }

    /// Read the operand, sign-extended.
    pub fn get(&self, ctx: &Context) -> BusResult<i32> {
        Ok(self.size.sign_extend(self.get_unsigned(ctx)?))
    }

    /// Write the low `size` bits of `value`. Data registers keep their
    /// upper bits; address registers take the value sign-extended to 32
    /// bits. Program-space and immediate operands cannot be written and
    /// answer with a bus error.
    pub fn put(&self, ctx: &mut Context, value: u32) -> BusResult<()> {
        match self.locate(ctx)? {
            Location::Data(r) => {
                ctx.regs.d[r] = self.size.merge(ctx.regs.d[r], value);
                Ok(())
            }
            Location::Addr(r) => {
                ctx.regs.a[r] = self.size.sign_extend(value) as u32;
                Ok(())
            }
            Location::Memory(addr) => ctx.write(self.size, addr, value),
            Location::Program(addr) => Err(BusFault::bus_error(
                Direction::Write,
                ctx.program_fc(),
                addr,
            )),
            Location::Immediate(_) => Err(BusFault::bus_error(
                Direction::Write,
                ctx.program_fc(),
                self.ext,
            )),
        }
    }

    /// Apply the deferred register update of (An)+ or -(An).
    pub fn finish(&self, ctx: &mut Context) {
        match self.mode {
            AddrMode::AddrIndPostInc(r) => {
                let a = &mut ctx.regs.a[usize::from(r)];
                *a = a.wrapping_add(self.step(r));
            }
            AddrMode::AddrIndPreDec(r) => {
                let a = &mut ctx.regs.a[usize::from(r)];
                *a = a.wrapping_sub(self.step(r));
            }
            _ => {}
        }
    }

    /// Motorola-syntax text with extension words resolved, for tracing.
    #[must_use]
    pub fn text(&self, ctx: &Context) -> String {
        let word = |at: u32| ctx.fetch16(at).ok();
        let index = |ext: u16| {
            let kind = if ext & 0x8000 != 0 { 'a' } else { 'd' };
            let size = if ext & 0x0800 != 0 { 'l' } else { 'w' };
            format!("{kind}{}.{size}", (ext >> 12) & 7)
        };
        let text = match self.mode {
            AddrMode::AddrIndDisp(r) => word(self.ext).map(|d| format!("{}(a{r})", d as i16)),
            AddrMode::AddrIndIndex(r) => {
                word(self.ext).map(|e| format!("{}(a{r},{})", e as u8 as i8, index(e)))
            }
            AddrMode::AbsShort => word(self.ext).map(|w| format!("${w:04x}.w")),
            AddrMode::AbsLong => ctx.fetch32(self.ext).ok().map(|l| format!("${l:08x}.l")),
            AddrMode::PcDisp => word(self.ext).map(|d| format!("{}(pc)", d as i16)),
            AddrMode::PcIndex => {
                word(self.ext).map(|e| format!("{}(pc,{})", e as u8 as i8, index(e)))
            }
            AddrMode::Immediate => match self.locate(ctx) {
                Ok(Location::Immediate(v)) => Some(format!("#${v:x}")),
                _ => None,
            },
            _ => None,
        };
        text.unwrap_or_else(|| self.mode.to_string())
    }
}
