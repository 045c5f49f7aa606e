// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Cycle-counting Motorola 68000 interpreter core.
//!
//! This crate executes machine-encoded 68000 instructions fetched from a
//! host-supplied address bus, with architecturally faithful register, flag,
//! stack and exception behaviour, and reports elapsed bus cycles so the host
//! can drive peripherals from the same clock.
//!
//! The memory map is application-dependent, so the host implements
//! [AddressBus] (or assembles one from [BusDevice]s behind the provided
//! [Bus] multiplexer) and hands it to [M68000::new]. The returned core has
//! already performed a reset: SSP loaded from address 0, PC from address 4,
//! SR set to `0x2700`.
//!
//! # Basic usage
//!
//! ```
//! use m68k_emu::{Bus, BusDevice, M68000, Ram, Size};
//!
//! let mut ram = Ram::new(0, 0x10000);
//! ram.write(Size::Long, 0, 0x1000).unwrap(); // initial SSP
//! ram.write(Size::Long, 4, 0x2000).unwrap(); // initial PC
//! ram.write(Size::Word, 0x2000, 0x4E71).unwrap(); // NOP
//!
//! let mut bus = Bus::new();
//! bus.add_device(ram);
//!
//! let mut cpu = M68000::new(bus).unwrap();
//! cpu.step().unwrap();
//! assert_eq!(cpu.cycles(), 4);
//! ```
//!
//! Architectural exceptions (bus error, address error, illegal instruction,
//! privilege violation, zero divide, traps, interrupts) are absorbed into
//! the CPU's visible state: the core stacks a format-0 frame and vectors to
//! the handler installed in low memory. Only host-level conditions come back
//! from [M68000::step] as [Error] values, breakpoint hits among them.

mod arithmetic;
mod bcd;
mod bits;
mod branch;
mod data_movement;
mod decoder;
pub mod exception;
mod interpreter;
mod interrupts;
mod logical;
pub mod memory;
pub mod operands;
mod shift_rotate;
pub mod status_register;
mod system;

pub use exception::Vector;
pub use memory::{AddressBus, Bus, BusDevice, Ram, WaitHook};
pub use operands::Size;
pub use status_register::StatusRegister;

use interrupts::InterruptController;

use std::cell::Cell;
use std::collections::HashMap;
use std::rc::Rc;

/// Host-level results of driving the core.
///
/// Bus and address errors appear here only when they cannot be folded into
/// an architectural exception: during instruction fetch or while stacking an
/// exception frame. Everything else is absorbed into CPU state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// No device answered at the given address.
    #[error("bus error at {0:#010X}")]
    BusError(u32),
    /// Word or long access at an odd address.
    #[error("address error at {0:#010X}")]
    AddressError(u32),
    /// A halting breakpoint fired. The host may resume with another `step`.
    #[error("breakpoint hit at {address:#010X} ({kind})")]
    BreakpointHit { address: u32, kind: BreakpointKind },
    /// `request_interrupt` was called with a level above 7.
    #[error("invalid interrupt level {0}")]
    InvalidInterruptLevel(u8),
    /// A step inside `run_cycles` did not advance the cycle counter.
    #[error("execution stalled at {0:#010X}: cycles not advancing")]
    Stalled(u32),
}

/// The programmer-visible registers of the 68000.
///
/// `a[7]` is the active stack pointer; `ssp` and `usp` shadow the inactive
/// one. Writes to SR that flip the supervisor bit swap `a[7]` with the
/// matching shadow (see [M68000::set_sr]).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Registers {
    /// Data registers.
    pub d: [u32; 8],
    /// Address registers. `a[7]` is the active stack pointer.
    pub a: [u32; 8],
    /// Program counter.
    pub pc: u32,
    /// Status register.
    pub sr: StatusRegister,
    /// Supervisor stack pointer shadow.
    pub ssp: u32,
    /// User stack pointer shadow.
    pub usp: u32,
    /// Instruction register: the opcode currently executing.
    pub ir: u16,
}

impl Registers {
    /// Sets the low 8 bits of a data register, preserving the upper 24.
    pub fn d_byte(&mut self, reg: usize, value: u8) {
        self.d[reg] = self.d[reg] & 0xFFFF_FF00 | value as u32;
    }

    /// Sets the low 16 bits of a data register, preserving the upper 16.
    pub fn d_word(&mut self, reg: usize, value: u16) {
        self.d[reg] = self.d[reg] & 0xFFFF_0000 | value as u32;
    }
}

impl std::fmt::Display for Registers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sr: u16 = self.sr.into();
        writeln!(
            f,
            "SR {:04X} PC {:08X} USP {:08X} SSP {:08X} SP {:08X}",
            sr, self.pc, self.usp, self.ssp, self.a[7]
        )?;
        for (i, d) in self.d.iter().enumerate() {
            write!(f, "D{i} {d:08X} ")?;
        }
        writeln!(f)?;
        for (i, a) in self.a.iter().enumerate() {
            write!(f, "A{i} {a:08X} ")?;
        }
        writeln!(f)
    }
}

/// What a breakpoint was watching when it fired.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BreakpointKind {
    Execute,
    Read,
    Write,
}

impl std::fmt::Display for BreakpointKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Execute => write!(f, "execute"),
            Self::Read => write!(f, "read"),
            Self::Write => write!(f, "write"),
        }
    }
}

/// Snapshot handed to a breakpoint callback.
#[derive(Clone, Copy)]
pub struct BreakpointEvent {
    pub kind: BreakpointKind,
    pub address: u32,
    pub registers: Registers,
}

/// A breakpoint on one address, observing execution and/or data accesses.
///
/// `halt` makes the triggering `step` return [Error::BreakpointHit]; a
/// halted write leaves memory untouched. The callback, if any, runs on
/// every hit regardless of `halt`.
#[derive(Default)]
pub struct Breakpoint {
    pub address: u32,
    pub on_execute: bool,
    pub on_read: bool,
    pub on_write: bool,
    pub halt: bool,
    pub callback: Option<Box<dyn FnMut(BreakpointEvent)>>,
}

/// Per-instruction trace record.
#[derive(Clone, Copy)]
pub struct TraceInfo {
    /// PC at the time the opcode was fetched.
    pub pc: u32,
    /// SR after the instruction completed.
    pub sr: u16,
    /// Full register file after the instruction completed.
    pub registers: Registers,
}

/// Callback invoked after every executed instruction.
pub type TraceCallback = Box<dyn FnMut(TraceInfo)>;

/// A M68000 core attached to an address bus.
pub struct M68000 {
    /// The registers of the CPU.
    pub regs: Registers,

    bus: Box<dyn AddressBus>,
    cycles: u64,
    /// Wait states reported by the bus since the last drain.
    pending_waits: Rc<Cell<u64>>,
    /// True after a STOP instruction, until an interrupt or reset.
    pub(crate) stopped: bool,
    pub(crate) interrupts: InterruptController,
    breakpoints: HashMap<u32, Breakpoint>,
    tracer: Option<TraceCallback>,
}

impl M68000 {
    /// Creates a core on the given bus and runs the reset sequence.
    ///
    /// The core registers its cycle counter with the bus's wait-state hook,
    /// composing with any hook the host installed before.
    pub fn new(bus: impl AddressBus + 'static) -> Result<Self, Error> {
        let pending_waits = Rc::new(Cell::new(0));
        let counter = Rc::clone(&pending_waits);

        let mut bus: Box<dyn AddressBus> = Box::new(bus);
        bus.install_wait_hook(Box::new(move |states| {
            counter.set(counter.get() + states as u64);
        }));

        let mut cpu = Self {
            regs: Registers::default(),
            bus,
            cycles: 0,
            pending_waits,
            stopped: false,
            interrupts: InterruptController::new(),
            breakpoints: HashMap::new(),
            tracer: None,
        };
        cpu.reset()?;
        Ok(cpu)
    }

    /// Returns a snapshot of the register file.
    pub fn registers(&self) -> Registers {
        self.regs
    }

    /// Total bus cycles elapsed since the last reset.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// The bus this core is attached to.
    pub fn bus_mut(&mut self) -> &mut dyn AddressBus {
        &mut *self.bus
    }

    /// Records an interrupt request at the given level.
    ///
    /// `vector` carries the explicit vector number for vectored devices;
    /// `None` requests autovectored delivery (vector `24 + level`). At most
    /// one request is outstanding per level; a new request replaces it.
    /// Level 0 is ignored, levels above 7 are rejected.
    pub fn request_interrupt(&mut self, level: u8, vector: Option<u8>) -> Result<(), Error> {
        self.interrupts.request(level, vector)
    }

    /// Installs or replaces the breakpoint at `breakpoint.address`.
    pub fn add_breakpoint(&mut self, breakpoint: Breakpoint) {
        self.breakpoints.insert(breakpoint.address, breakpoint);
    }

    /// Installs the per-instruction trace observer.
    pub fn set_tracer(&mut self, tracer: TraceCallback) {
        self.tracer = Some(tracer);
    }

    pub(crate) fn send_trace(&mut self, pc: u32) {
        if let Some(tracer) = &mut self.tracer {
            tracer(TraceInfo {
                pc,
                sr: self.regs.sr.into(),
                registers: self.regs,
            });
        }
    }

    pub(crate) fn check_execute_breakpoint(&mut self, pc: u32) -> Result<(), Error> {
        let registers = self.regs;
        match self.breakpoints.get_mut(&pc) {
            Some(bp) if bp.on_execute => Self::handle_breakpoint(bp, BreakpointKind::Execute, pc, registers),
            _ => Ok(()),
        }
    }

    pub(crate) fn check_access_breakpoint(&mut self, address: u32, kind: BreakpointKind) -> Result<(), Error> {
        let registers = self.regs;
        let Some(bp) = self.breakpoints.get_mut(&address) else {
            return Ok(());
        };

        match kind {
            BreakpointKind::Read if !bp.on_read => return Ok(()),
            BreakpointKind::Write if !bp.on_write => return Ok(()),
            _ => {},
        }

        Self::handle_breakpoint(bp, kind, address, registers)
    }

    fn handle_breakpoint(bp: &mut Breakpoint, kind: BreakpointKind, address: u32, registers: Registers) -> Result<(), Error> {
        if let Some(callback) = &mut bp.callback {
            callback(BreakpointEvent { kind, address, registers });
        }

        if bp.halt {
            Err(Error::BreakpointHit { address, kind })
        } else {
            Ok(())
        }
    }

    pub(crate) fn add_cycles(&mut self, cycles: u32) {
        self.cycles += cycles as u64;
    }

    pub(crate) fn drain_wait_states(&mut self) {
        self.cycles += self.pending_waits.take();
    }

    pub(crate) fn clear_wait_states(&mut self) {
        self.pending_waits.set(0);
    }

    pub(crate) fn reg_x(&self) -> usize {
        (self.regs.ir >> 9 & 0x7) as usize
    }

    pub(crate) fn reg_y(&self) -> usize {
        (self.regs.ir & 0x7) as usize
    }
}
