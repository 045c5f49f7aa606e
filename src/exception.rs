// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Exception and interrupt processing.
//!
//! Every architectural exception goes through the same sequence: compute
//! the vector offset, switch to supervisor mode (swapping stacks if the
//! mode changed), stack a format-0 frame, and load the handler address
//! from the vector table. Faults during the sequence itself surface to the
//! caller as ordinary errors; double faults are not modelled.

use crate::interrupts::InterruptController;
use crate::operands::Size;
use crate::status_register::{SR_INTERRUPT_MASK, SR_SUPERVISOR};
use crate::{Error, M68000, Registers, StatusRegister};

use log::{debug, trace};

/// First autovector; level `n` resolves to vector `24 + n`.
pub const AUTOVECTOR_BASE: u8 = 24;
/// First TRAP vector; `TRAP #n` raises vector `32 + n`.
pub const TRAP_BASE: u8 = 32;

/// Exception vectors raised by this core.
///
/// Cast to `u8` for the vector number; the handler address lives at
/// `vector * 4` in the table at the bottom of memory.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Vector {
    /// Initial supervisor stack pointer, read on reset.
    InitialSsp = 0,
    /// Initial program counter, read on reset.
    InitialPc = 1,
    /// The accessed address is not mapped by any device.
    BusError = 2,
    /// Word or long access at an odd address.
    AddressError = 3,
    IllegalInstruction = 4,
    ZeroDivide = 5,
    ChkInstruction = 6,
    TrapVInstruction = 7,
    PrivilegeViolation = 8,
    /// Read in place of a vector whose table entry is zero.
    UninitializedInterrupt = 15,
}

/// Cycles consumed by exception processing itself, on top of whatever the
/// faulting instruction already cost.
const fn exception_cycles(vector: u8) -> u32 {
    match vector {
        2 | 3 => 50,
        5 => 38,
        6 => 40,
        24..=31 => 44,
        _ => 34,
    }
}

impl M68000 {
    /// Writes the status register, swapping `A7` with the matching shadow
    /// pointer when the supervisor bit changes.
    pub fn set_sr(&mut self, value: u16) {
        let new: StatusRegister = value.into();

        if new.s != self.regs.sr.s {
            if new.s {
                self.regs.usp = self.regs.a[7];
                self.regs.a[7] = self.regs.ssp;
            } else {
                self.regs.ssp = self.regs.a[7];
                self.regs.a[7] = self.regs.usp;
            }
        }

        self.regs.sr = new;
    }

    /// Raises an exception from the current context: supervisor bit set,
    /// everything else in SR preserved.
    pub(crate) fn raise(&mut self, vector: u8) -> Result<(), Error> {
        let sr: u16 = self.regs.sr.into();
        self.raise_with_sr(vector, sr | SR_SUPERVISOR)
    }

    /// Delivers an interrupt: supervisor bit set and the priority mask
    /// raised to the incoming level.
    fn deliver_interrupt(&mut self, level: u8, vector: u8) -> Result<(), Error> {
        let sr: u16 = self.regs.sr.into();
        let new_sr = sr & !SR_INTERRUPT_MASK | SR_SUPERVISOR | (level as u16) << 8;
        self.raise_with_sr(vector, new_sr)
    }

    fn raise_with_sr(&mut self, vector: u8, new_sr: u16) -> Result<(), Error> {
        let vector_offset = (vector as u32) << 2;
        let old_sr: u16 = self.regs.sr.into();

        trace!("exception vector {vector} at pc {:#010X}", self.regs.pc);

        self.set_sr(new_sr);

        // Format-0 frame: the SR lands at the lowest address.
        self.push(Size::Word, vector_offset)?;
        self.push(Size::Long, self.regs.pc)?;
        self.push(Size::Word, old_sr as u32)?;

        self.regs.pc = self.read_vector(vector_offset)?;
        self.add_cycles(exception_cycles(vector));
        self.stopped = false;
        Ok(())
    }

    /// Reads a handler address from the vector table, falling back to the
    /// uninitialised-interrupt vector when the entry is zero.
    fn read_vector(&mut self, vector_offset: u32) -> Result<u32, Error> {
        let handler = self.read(Size::Long, vector_offset)?;
        if handler == 0 {
            return self.read(Size::Long, (Vector::UninitializedInterrupt as u32) << 2);
        }
        Ok(handler)
    }

    /// Delivers the highest pending unmasked interrupt, if any.
    pub(crate) fn check_interrupts(&mut self) -> Result<(), Error> {
        let Some((level, vector)) = self.interrupts.pending(self.regs.sr.interrupt_mask) else {
            return Ok(());
        };

        trace!("interrupt level {level} vector {vector}");
        self.stopped = false;
        self.deliver_interrupt(level, vector)
    }

    /// Returns the CPU to its power-on configuration.
    ///
    /// Reloads SSP from address 0 and PC from address 4, clears the data
    /// and address registers, sets SR to `0x2700`, forgets pending
    /// interrupt requests and zeroes the cycle counter. Memory contents
    /// are left alone.
    pub fn reset(&mut self) -> Result<(), Error> {
        self.regs = Registers {
            sr: 0x2700u16.into(),
            ..Registers::default()
        };
        self.interrupts = InterruptController::new();
        self.stopped = false;

        let ssp = self.bus_mut().read(Size::Long, 0)?;
        self.regs.a[7] = ssp;
        self.regs.ssp = ssp;
        self.regs.pc = self.bus_mut().read(Size::Long, 4)?;

        self.cycles = 0;
        self.clear_wait_states();
        debug!("reset: ssp {ssp:#010X} pc {:#010X}", self.regs.pc);
        Ok(())
    }
}
