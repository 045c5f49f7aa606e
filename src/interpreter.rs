// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The fetch/dispatch loop.

use crate::decoder::DECODE;
use crate::exception::Vector;
use crate::operands::Size;
use crate::{Error, M68000};

impl M68000 {
    /// Executes one instruction at PC, then delivers any pending unmasked
    /// interrupt and emits a trace record.
    ///
    /// While the CPU is stopped (after STOP) no instruction executes; the
    /// step only polls for interrupts and returns. Architectural faults
    /// raised by the instruction are folded into exceptions and reported
    /// as `Ok`; breakpoint hits and faults during exception stacking come
    /// back as errors.
    pub fn step(&mut self) -> Result<(), Error> {
        if self.stopped {
            self.check_interrupts()?;
            return Ok(());
        }

        self.check_execute_breakpoint(self.regs.pc)?;

        let pc = self.regs.pc;
        let opcode = self.fetch_opcode()?;
        self.execute(opcode)?;
        self.check_interrupts()?;
        self.send_trace(pc);
        Ok(())
    }

    /// Steps until at least `budget` cycles have elapsed.
    ///
    /// The run may overshoot when the final instruction's cost crosses the
    /// budget. A step that leaves the cycle counter unchanged fails with
    /// [Error::Stalled]; this guards against misregistered zero-cost
    /// opcodes and against idling forever in the stopped state.
    pub fn run_cycles(&mut self, budget: u64) -> Result<(), Error> {
        let start = self.cycles();
        while self.cycles() - start < budget {
            let before = self.cycles();
            self.step()?;

            if self.cycles() == before {
                return Err(Error::Stalled(self.regs.pc));
            }
        }
        Ok(())
    }

    fn fetch_opcode(&mut self) -> Result<u16, Error> {
        let opcode = self.read(Size::Word, self.regs.pc)?;
        self.regs.pc = self.regs.pc.wrapping_add(2);
        Ok(opcode as u16)
    }

    /// Dispatches one opcode without fetching it from memory, charging its
    /// pre-computed base cycle count first.
    pub(crate) fn execute(&mut self, opcode: u16) -> Result<(), Error> {
        self.regs.ir = opcode;
        self.add_cycles(DECODE.base_cycles(opcode));

        let Some(handler) = DECODE.handler(opcode) else {
            return self.raise(Vector::IllegalInstruction as u8);
        };

        match handler(self) {
            Ok(()) => Ok(()),
            Err(Error::BusError(_)) => self.raise(Vector::BusError as u8),
            Err(Error::AddressError(_)) => self.raise(Vector::AddressError as u8),
            Err(other) => Err(other),
        }
    }
}
