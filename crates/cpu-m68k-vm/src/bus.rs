//! Paged address bus with function codes and fault reporting.
//!
//! The address space is split into fixed-size pages. Each function code has
//! its own page table, so the same address can reach different devices for
//! user and supervisor, or program and data, accesses. Every slot always
//! points at a device: pages nobody mapped resolve to [`Unmapped`], which
//! answers every access with a bus error.
//!
//! Alignment is checked here, before any device sees the access. A long
//! access at an address that is word- but not long-aligned is issued as two
//! word cycles; a long-aligned one goes to the device's native 32-bit path.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Function code values from the 68000's FC0-FC2 pins.
///
/// Codes 0, 3 and 4 are reserved and code 7 is CPU space; none of them is
/// ever produced by instruction execution, so their page tables stay
/// unmapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FunctionCode {
    /// User data access (FC=1).
    UserData = 1,
    /// User program access (FC=2).
    UserProgram = 2,
    /// Supervisor data access (FC=5).
    SupervisorData = 5,
    /// Supervisor program access (FC=6).
    SupervisorProgram = 6,
}

impl FunctionCode {
    /// Build a function code from supervisor flag and program/data flag.
    #[must_use]
    pub fn from_flags(supervisor: bool, program: bool) -> Self {
        match (supervisor, program) {
            (false, false) => Self::UserData,
            (false, true) => Self::UserProgram,
            (true, false) => Self::SupervisorData,
            (true, true) => Self::SupervisorProgram,
        }
    }

    /// Decode a 3-bit function code. Reserved codes yield `None`.
    #[must_use]
    pub fn from_bits(bits: u8) -> Option<Self> {
        match bits & 0x07 {
            1 => Some(Self::UserData),
            2 => Some(Self::UserProgram),
            5 => Some(Self::SupervisorData),
            6 => Some(Self::SupervisorProgram),
            _ => None,
        }
    }

    /// Returns the 3-bit value for the function code.
    #[must_use]
    pub fn bits(self) -> u8 {
        self as u8
    }

    /// The bit this code occupies in a mapping mask.
    #[must_use]
    pub fn mask(self) -> u8 {
        1 << self.bits()
    }

    #[must_use]
    pub fn is_supervisor(self) -> bool {
        matches!(self, Self::SupervisorData | Self::SupervisorProgram)
    }

    #[must_use]
    pub fn is_program(self) -> bool {
        matches!(self, Self::UserProgram | Self::SupervisorProgram)
    }
}

/// Mapping mask selecting user data space.
pub const FC_USER_DATA: u8 = 1 << 1;
/// Mapping mask selecting user program space.
pub const FC_USER_PROGRAM: u8 = 1 << 2;
/// Mapping mask selecting supervisor data space.
pub const FC_SUPERVISOR_DATA: u8 = 1 << 5;
/// Mapping mask selecting supervisor program space.
pub const FC_SUPERVISOR_PROGRAM: u8 = 1 << 6;
/// Both user spaces.
pub const FC_USER: u8 = FC_USER_DATA | FC_USER_PROGRAM;
/// Both supervisor spaces.
pub const FC_SUPERVISOR: u8 = FC_SUPERVISOR_DATA | FC_SUPERVISOR_PROGRAM;
/// Every mappable function code.
pub const FC_ALL: u8 = FC_USER | FC_SUPERVISOR;

/// Direction of a bus cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Read,
    Write,
}

/// Description of the access that faulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AccessInfo {
    pub direction: Direction,
    pub fc: FunctionCode,
    pub address: u32,
}

impl AccessInfo {
    #[must_use]
    pub const fn new(direction: Direction, fc: FunctionCode, address: u32) -> Self {
        Self {
            direction,
            fc,
            address,
        }
    }

    /// The special status word stacked by a group 0 exception:
    /// bit 4 R/W (1 = read), bit 3 I/N (1 = not an instruction fetch),
    /// bits 2-0 function code.
    #[must_use]
    pub fn status_word(&self) -> u16 {
        let rw = if self.direction == Direction::Read { 0x10 } else { 0 };
        let not_instruction = if self.fc.is_program() { 0 } else { 0x08 };
        rw | not_instruction | u16::from(self.fc.bits())
    }
}

impl fmt::Display for AccessInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dir = match self.direction {
            Direction::Read => "read",
            Direction::Write => "write",
        };
        write!(f, "{dir} at ${:08X} (fc {})", self.address, self.fc.bits())
    }
}

/// A fault raised by a bus cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusFault {
    /// The device at the address refused the access.
    BusError(AccessInfo),
    /// A word or long access at an odd address.
    AddressError(AccessInfo),
}

impl BusFault {
    #[must_use]
    pub const fn bus_error(direction: Direction, fc: FunctionCode, address: u32) -> Self {
        Self::BusError(AccessInfo::new(direction, fc, address))
    }

    #[must_use]
    pub const fn address_error(direction: Direction, fc: FunctionCode, address: u32) -> Self {
        Self::AddressError(AccessInfo::new(direction, fc, address))
    }

    #[must_use]
    pub const fn access(&self) -> AccessInfo {
        match self {
            Self::BusError(info) | Self::AddressError(info) => *info,
        }
    }
}

impl fmt::Display for BusFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BusError(info) => write!(f, "bus error: {info}"),
            Self::AddressError(info) => write!(f, "address error: {info}"),
        }
    }
}

impl std::error::Error for BusFault {}

/// Result of a bus cycle.
pub type BusResult<T> = Result<T, BusFault>;

/// A device that can be mapped into the address space.
///
/// Byte and word accesses refuse by default; a device overrides what it
/// supports. Long accesses default to two word accesses, high word first.
/// Addresses arrive already masked to the bus width and, for word and long
/// accesses, already checked for alignment.
pub trait Mappable {
    fn read8(&mut self, fc: FunctionCode, addr: u32) -> BusResult<u8> {
        Err(BusFault::bus_error(Direction::Read, fc, addr))
    }

    fn read16(&mut self, fc: FunctionCode, addr: u32) -> BusResult<u16> {
        Err(BusFault::bus_error(Direction::Read, fc, addr))
    }

    fn read32(&mut self, fc: FunctionCode, addr: u32) -> BusResult<u32> {
        let hi = self.read16(fc, addr)?;
        let lo = self.read16(fc, addr.wrapping_add(2))?;
        Ok(u32::from(hi) << 16 | u32::from(lo))
    }

    fn write8(&mut self, fc: FunctionCode, addr: u32, _value: u8) -> BusResult<()> {
        Err(BusFault::bus_error(Direction::Write, fc, addr))
    }

    fn write16(&mut self, fc: FunctionCode, addr: u32, _value: u16) -> BusResult<()> {
        Err(BusFault::bus_error(Direction::Write, fc, addr))
    }

    fn write32(&mut self, fc: FunctionCode, addr: u32, value: u32) -> BusResult<()> {
        self.write16(fc, addr, (value >> 16) as u16)?;
        self.write16(fc, addr.wrapping_add(2), value as u16)
    }

    /// The RESET line was asserted.
    fn reset(&mut self) {}
}

/// The device behind every page nobody mapped.
#[derive(Debug, Default, Clone, Copy)]
pub struct Unmapped;

impl Mappable for Unmapped {}

/// A device shared between the bus and the host that owns it.
pub type SharedDevice = Rc<RefCell<dyn Mappable>>;

/// Wrap a device for mapping.
pub fn shared<D: Mappable + 'static>(device: D) -> Rc<RefCell<D>> {
    Rc::new(RefCell::new(device))
}

/// Bus geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusConfig {
    /// Width of the external address bus (24 on the 68000).
    pub address_bits: u32,
    /// log2 of the page size.
    pub page_shift: u32,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            address_bits: 24,
            page_shift: 12,
        }
    }
}

/// Largest page table the bus will build, per function code.
pub const MAX_PAGE_BITS: u32 = 20;

impl BusConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.address_bits == 0 || self.address_bits > 32 {
            return Err(ConfigError::AddressBits(self.address_bits));
        }
        if self.page_shift >= self.address_bits {
            return Err(ConfigError::PageShift {
                page_shift: self.page_shift,
                address_bits: self.address_bits,
            });
        }
        if self.address_bits - self.page_shift > MAX_PAGE_BITS {
            return Err(ConfigError::TooManyPages(self.address_bits - self.page_shift));
        }
        Ok(())
    }

    #[must_use]
    pub fn page_size(&self) -> u32 {
        1 << self.page_shift
    }

    #[must_use]
    pub fn page_count(&self) -> usize {
        1 << (self.address_bits - self.page_shift)
    }

    #[must_use]
    pub fn address_mask(&self) -> u32 {
        if self.address_bits >= 32 {
            u32::MAX
        } else {
            (1 << self.address_bits) - 1
        }
    }
}

/// Rejected bus geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    AddressBits(u32),
    PageShift { page_shift: u32, address_bits: u32 },
    TooManyPages(u32),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AddressBits(bits) => {
                write!(f, "address width must be 1 to 32 bits, got {bits}")
            }
            Self::PageShift {
                page_shift,
                address_bits,
            } => write!(
                f,
                "page shift {page_shift} leaves no page index in a {address_bits}-bit address"
            ),
            Self::TooManyPages(bits) => write!(
                f,
                "2^{bits} pages per function code exceeds the limit of 2^{MAX_PAGE_BITS}"
            ),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Number of page tables: one per 3-bit function code below CPU space.
const TABLES: usize = 7;

/// Index into `Bus::devices`. Slot 0 is always [`Unmapped`]. A slot whose
/// device is no longer mapped anywhere is released back to the sentinel and
/// reused by the next new device.
type DeviceId = u32;

const UNMAPPED: DeviceId = 0;

/// The paged address bus.
pub struct Bus {
    config: BusConfig,
    address_mask: u32,
    devices: Vec<SharedDevice>,
    /// Table entries naming each slot, across all function codes.
    refs: Vec<usize>,
    free: Vec<DeviceId>,
    tables: [Vec<DeviceId>; TABLES],
}

impl Default for Bus {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Bus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bus")
            .field("config", &self.config)
            .field("devices", &self.device_count())
            .finish_non_exhaustive()
    }
}

impl Bus {
    /// A 24-bit bus with 4 KiB pages, everything unmapped.
    #[must_use]
    pub fn new() -> Self {
        Self::build(BusConfig::default())
    }

    pub fn with_config(config: BusConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: BusConfig) -> Self {
        let pages = config.page_count();
        let unmapped: SharedDevice = Rc::new(RefCell::new(Unmapped));
        Self {
            config,
            address_mask: config.address_mask(),
            devices: vec![unmapped],
            refs: vec![pages * TABLES],
            free: Vec::new(),
            tables: std::array::from_fn(|_| vec![UNMAPPED; pages]),
        }
    }

    #[must_use]
    pub fn config(&self) -> BusConfig {
        self.config
    }

    /// Map `device` over `[base, base + size)` for every function code
    /// selected in `fc_mask`. Partially covered pages are mapped whole.
    /// Bits for reserved function codes are ignored.
    pub fn map(&mut self, fc_mask: u8, base: u32, size: u32, device: SharedDevice) {
        let id = self.intern(device);
        self.fill(fc_mask, base, size, id);
        self.release_unused();
    }

    /// Return `[base, base + size)` to the unmapped state. A device left
    /// with no mapped pages is dropped from the bus.
    pub fn unmap(&mut self, fc_mask: u8, base: u32, size: u32) {
        self.fill(fc_mask, base, size, UNMAPPED);
        self.release_unused();
    }

    /// Number of distinct devices currently mapped.
    #[must_use]
    pub fn device_count(&self) -> usize {
        self.refs.iter().skip(1).filter(|&&n| n > 0).count()
    }

    fn intern(&mut self, device: SharedDevice) -> DeviceId {
        let live = |id: &usize| *id != 0 && self.refs[*id] > 0;
        if let Some(id) = (0..self.devices.len())
            .filter(live)
            .find(|&id| Rc::ptr_eq(&self.devices[id], &device))
        {
            return id as DeviceId;
        }
        if let Some(id) = self.free.pop() {
            self.devices[id as usize] = device;
            return id;
        }
        self.devices.push(device);
        self.refs.push(0);
        (self.devices.len() - 1) as DeviceId
    }

    /// Point every slot nobody references back at the sentinel so the bus
    /// stops holding its device.
    fn release_unused(&mut self) {
        for id in 1..self.devices.len() {
            let sentinel = Rc::ptr_eq(&self.devices[id], &self.devices[0]);
            if self.refs[id] == 0 && !sentinel {
                self.devices[id] = Rc::clone(&self.devices[0]);
                self.free.push(id as DeviceId);
            }
        }
    }

    fn fill(&mut self, fc_mask: u8, base: u32, size: u32, id: DeviceId) {
        if size == 0 {
            return;
        }
        let shift = self.config.page_shift;
        let pages = self.config.page_count() as u64;
        let start = u64::from(base & self.address_mask);
        let first = start >> shift;
        let last = (start + u64::from(size) - 1) >> shift;
        let count = (last - first + 1).min(pages);

        for fc in (0..TABLES as u8).filter_map(FunctionCode::from_bits) {
            if fc_mask & fc.mask() == 0 {
                continue;
            }
            let table = &mut self.tables[fc.bits() as usize];
            for page in first..first + count {
                let slot = &mut table[(page % pages) as usize];
                self.refs[*slot as usize] -= 1;
                self.refs[id as usize] += 1;
                *slot = id;
            }
        }
    }

    fn page(&self, addr: u32) -> usize {
        (addr >> self.config.page_shift) as usize % self.config.page_count()
    }

    fn device(&self, fc: FunctionCode, addr: u32) -> &SharedDevice {
        let id = self.tables[fc.bits() as usize][self.page(addr)];
        &self.devices[id as usize]
    }

    /// Whether a real device (not the unmapped sentinel) answers at `addr`.
    #[must_use]
    pub fn is_mapped(&self, fc: FunctionCode, addr: u32) -> bool {
        self.tables[fc.bits() as usize][self.page(addr & self.address_mask)] != UNMAPPED
    }

    pub fn read8(&self, fc: FunctionCode, addr: u32) -> BusResult<u8> {
        let addr = addr & self.address_mask;
        self.device(fc, addr).borrow_mut().read8(fc, addr)
    }

    pub fn read16(&self, fc: FunctionCode, addr: u32) -> BusResult<u16> {
        let addr = addr & self.address_mask;
        if addr & 1 != 0 {
            return Err(BusFault::address_error(Direction::Read, fc, addr));
        }
        self.device(fc, addr).borrow_mut().read16(fc, addr)
    }

    pub fn read32(&self, fc: FunctionCode, addr: u32) -> BusResult<u32> {
        let addr = addr & self.address_mask;
        if addr & 1 != 0 {
            return Err(BusFault::address_error(Direction::Read, fc, addr));
        }
        if addr & 2 != 0 {
            let lo_addr = addr.wrapping_add(2) & self.address_mask;
            let hi = self.device(fc, addr).borrow_mut().read16(fc, addr)?;
            let lo = self.device(fc, lo_addr).borrow_mut().read16(fc, lo_addr)?;
            return Ok(u32::from(hi) << 16 | u32::from(lo));
        }
        self.device(fc, addr).borrow_mut().read32(fc, addr)
    }

    pub fn write8(&mut self, fc: FunctionCode, addr: u32, value: u8) -> BusResult<()> {
        let addr = addr & self.address_mask;
        self.device(fc, addr).borrow_mut().write8(fc, addr, value)
    }

    pub fn write16(&mut self, fc: FunctionCode, addr: u32, value: u16) -> BusResult<()> {
        let addr = addr & self.address_mask;
        if addr & 1 != 0 {
            return Err(BusFault::address_error(Direction::Write, fc, addr));
        }
        self.device(fc, addr).borrow_mut().write16(fc, addr, value)
    }

    pub fn write32(&mut self, fc: FunctionCode, addr: u32, value: u32) -> BusResult<()> {
        let addr = addr & self.address_mask;
        if addr & 1 != 0 {
            return Err(BusFault::address_error(Direction::Write, fc, addr));
        }
        if addr & 2 != 0 {
            let lo_addr = addr.wrapping_add(2) & self.address_mask;
            self.device(fc, addr)
                .borrow_mut()
                .write16(fc, addr, (value >> 16) as u16)?;
            return self
                .device(fc, lo_addr)
                .borrow_mut()
                .write16(fc, lo_addr, value as u16);
        }
        self.device(fc, addr).borrow_mut().write32(fc, addr, value)
    }

    /// Fill `buf` from consecutive byte reads starting at `addr`.
    pub fn read_bytes(&self, fc: FunctionCode, addr: u32, buf: &mut [u8]) -> BusResult<()> {
        let mut a = addr;
        for byte in buf.iter_mut() {
            *byte = self.read8(fc, a)?;
            a = a.wrapping_add(1);
        }
        Ok(())
    }

    /// Store `data` with consecutive byte writes starting at `addr`.
    pub fn write_bytes(&mut self, fc: FunctionCode, addr: u32, data: &[u8]) -> BusResult<()> {
        let mut a = addr;
        for &byte in data {
            self.write8(fc, a, byte)?;
            a = a.wrapping_add(1);
        }
        Ok(())
    }

    /// Read a NUL-terminated string. Bytes are taken as Latin-1.
    ///
    /// Reading stops after one full pass over the address space if no NUL
    /// turns up.
    pub fn read_string(&self, fc: FunctionCode, addr: u32) -> BusResult<String> {
        let mut out = String::new();
        let mut a = addr;
        for _ in 0..=u64::from(self.address_mask) {
            let byte = self.read8(fc, a)?;
            if byte == 0 {
                break;
            }
            out.push(char::from(byte));
            a = a.wrapping_add(1);
        }
        Ok(out)
    }

    /// Write `s` followed by a NUL. Characters outside Latin-1 become `?`.
    pub fn write_string(&mut self, fc: FunctionCode, addr: u32, s: &str) -> BusResult<()> {
        let mut a = addr;
        for c in s.chars() {
            let byte = u8::try_from(u32::from(c)).unwrap_or(b'?');
            self.write8(fc, a, byte)?;
            a = a.wrapping_add(1);
        }
        self.write8(fc, a, 0)
    }

    /// Assert RESET on every device that is currently mapped somewhere.
    pub fn reset_devices(&self) {
        let slots = self.devices.iter().zip(&self.refs).skip(1);
        for (device, _) in slots.filter(|(_, n)| **n > 0) {
            device.borrow_mut().reset();
        }
    }
}
