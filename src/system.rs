// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Status-register transfers, privileged control instructions, traps and
//! the bound check.

use crate::decoder::{constant_cycles, ea_cycles, DecodeTable, EA_DATA_ALTERABLE, EA_DATA_SOURCE};
use crate::exception::{Vector, TRAP_BASE};
use crate::interrupts::InterruptController;
use crate::operands::{Operand, Size};
use crate::status_register::CCR_MASK;
use crate::{Error, M68000};

use log::debug;

pub(crate) fn register(table: &mut DecodeTable) {
    table.register(M68000::execute_nop, 0x4E71, 0xFFFF, 0, constant_cycles(4));

    // SR and CCR transfers. MOVE from SR is unprivileged on the 68000.
    table.register(M68000::execute_move_from_sr, 0x40C0, 0xFFC0, EA_DATA_ALTERABLE, |op| {
        12 + ea_cycles(op, Size::Word)
    });
    table.register(M68000::execute_move_to_ccr, 0x44C0, 0xFFC0, EA_DATA_SOURCE, |op| {
        12 + ea_cycles(op, Size::Byte)
    });
    table.register(M68000::execute_move_to_sr, 0x46C0, 0xFFC0, EA_DATA_SOURCE, |op| {
        12 + ea_cycles(op, Size::Word)
    });

    table.register(M68000::execute_ori_to_ccr, 0x003C, 0xFFFF, 0, constant_cycles(20));
    table.register(M68000::execute_ori_to_sr, 0x007C, 0xFFFF, 0, constant_cycles(20));
    table.register(M68000::execute_andi_to_ccr, 0x023C, 0xFFFF, 0, constant_cycles(20));
    table.register(M68000::execute_andi_to_sr, 0x027C, 0xFFFF, 0, constant_cycles(20));
    table.register(M68000::execute_eori_to_ccr, 0x0A3C, 0xFFFF, 0, constant_cycles(20));
    table.register(M68000::execute_eori_to_sr, 0x0A7C, 0xFFFF, 0, constant_cycles(20));

    table.register(M68000::execute_move_to_usp, 0x4E60, 0xFFF8, 0, constant_cycles(4));
    table.register(M68000::execute_move_from_usp, 0x4E68, 0xFFF8, 0, constant_cycles(4));

    table.register(M68000::execute_rte, 0x4E73, 0xFFFF, 0, constant_cycles(20));
    table.register(M68000::execute_rtr, 0x4E77, 0xFFFF, 0, constant_cycles(20));

    // The exception-processing cost of a trap is charged on delivery, so
    // the entries carry the fetch cost only.
    table.register(M68000::execute_trap, 0x4E40, 0xFFF0, 0, constant_cycles(4));
    table.register(M68000::execute_trapv, 0x4E76, 0xFFFF, 0, constant_cycles(4));
    table.register(M68000::execute_illegal, 0x4AFC, 0xFFFF, 0, constant_cycles(4));

    table.register(M68000::execute_chk, 0x4180, 0xF1C0, EA_DATA_SOURCE, |op| {
        10 + ea_cycles(op, Size::Word)
    });

    table.register(M68000::execute_reset, 0x4E70, 0xFFFF, 0, constant_cycles(132));
    table.register(M68000::execute_stop, 0x4E72, 0xFFFF, 0, constant_cycles(4));
}

impl M68000 {
    pub(super) fn execute_nop(&mut self) -> Result<(), Error> {
        Ok(())
    }

    fn privilege_violation(&mut self) -> Result<(), Error> {
        self.raise(Vector::PrivilegeViolation as u8)
    }

    pub(super) fn execute_move_from_sr(&mut self) -> Result<(), Error> {
        let value = self.operand_read(Operand::StatusReg, Size::Word)?;
        let dst = self.src_operand(Size::Word)?;
        self.operand_write(dst, Size::Word, value)
    }

    /// MOVE to CCR reads a full extension word but only the low byte of
    /// the operand reaches the flags.
    pub(super) fn execute_move_to_ccr(&mut self) -> Result<(), Error> {
        let src = self.src_operand(Size::Byte)?;
        let value = self.operand_read(src, Size::Byte)?;
        self.operand_write(Operand::StatusReg, Size::Byte, value)
    }

    pub(super) fn execute_move_to_sr(&mut self) -> Result<(), Error> {
        if !self.regs.sr.s {
            return self.privilege_violation();
        }

        let src = self.src_operand(Size::Word)?;
        let value = self.operand_read(src, Size::Word)?;
        self.operand_write(Operand::StatusReg, Size::Word, value)
    }

    fn immediate_to_ccr(&mut self, op: fn(u16, u16) -> u16) -> Result<(), Error> {
        let imm = self.fetch_word()?;
        let ccr = self.operand_read(Operand::StatusReg, Size::Byte)? as u16;
        self.operand_write(Operand::StatusReg, Size::Byte, op(ccr, imm) as u32 & CCR_MASK as u32)
    }

    fn immediate_to_sr(&mut self, op: fn(u16, u16) -> u16) -> Result<(), Error> {
        if !self.regs.sr.s {
            return self.privilege_violation();
        }

        let imm = self.fetch_word()?;
        let sr: u16 = self.regs.sr.into();
        self.set_sr(op(sr, imm));
        Ok(())
    }

    pub(super) fn execute_ori_to_ccr(&mut self) -> Result<(), Error> {
        self.immediate_to_ccr(|a, b| a | b)
    }

    pub(super) fn execute_andi_to_ccr(&mut self) -> Result<(), Error> {
        self.immediate_to_ccr(|a, b| a & b)
    }

    pub(super) fn execute_eori_to_ccr(&mut self) -> Result<(), Error> {
        self.immediate_to_ccr(|a, b| a ^ b)
    }

    pub(super) fn execute_ori_to_sr(&mut self) -> Result<(), Error> {
        self.immediate_to_sr(|a, b| a | b)
    }

    pub(super) fn execute_andi_to_sr(&mut self) -> Result<(), Error> {
        self.immediate_to_sr(|a, b| a & b)
    }

    pub(super) fn execute_eori_to_sr(&mut self) -> Result<(), Error> {
        self.immediate_to_sr(|a, b| a ^ b)
    }

    pub(super) fn execute_move_to_usp(&mut self) -> Result<(), Error> {
        if !self.regs.sr.s {
            return self.privilege_violation();
        }

        self.regs.usp = self.regs.a[self.reg_y()];
        Ok(())
    }

    pub(super) fn execute_move_from_usp(&mut self) -> Result<(), Error> {
        if !self.regs.sr.s {
            return self.privilege_violation();
        }

        self.regs.a[self.reg_y()] = self.regs.usp;
        Ok(())
    }

    /// RTE: pop SR and PC from the supervisor stack, discard the frame's
    /// vector-offset word, then adopt the SR.
    pub(super) fn execute_rte(&mut self) -> Result<(), Error> {
        if !self.regs.sr.s {
            return self.privilege_violation();
        }

        let sr = self.pop(Size::Word)?;
        self.regs.pc = self.pop(Size::Long)?;
        self.regs.a[7] = self.regs.a[7].wrapping_add(2);
        self.set_sr(sr as u16);
        Ok(())
    }

    /// RTR: like RTS but the condition codes come off the stack first.
    pub(super) fn execute_rtr(&mut self) -> Result<(), Error> {
        let ccr = self.pop(Size::Word)?;
        self.regs.pc = self.pop(Size::Long)?;

        let sr: u16 = self.regs.sr.into();
        self.set_sr(sr & !CCR_MASK | ccr as u16 & CCR_MASK);
        Ok(())
    }

    pub(super) fn execute_trap(&mut self) -> Result<(), Error> {
        let vector = TRAP_BASE + (self.regs.ir & 0xF) as u8;
        self.raise(vector)
    }

    pub(super) fn execute_trapv(&mut self) -> Result<(), Error> {
        if self.regs.sr.v {
            self.raise(Vector::TrapVInstruction as u8)
        } else {
            Ok(())
        }
    }

    pub(super) fn execute_illegal(&mut self) -> Result<(), Error> {
        self.raise(Vector::IllegalInstruction as u8)
    }

    /// CHK: trap when the word in Dn is negative or above the bound from
    /// the effective address. N and C record which side failed.
    pub(super) fn execute_chk(&mut self) -> Result<(), Error> {
        let src = self.src_operand(Size::Word)?;
        let bound = self.operand_read(src, Size::Word)? as u16 as i16;
        let value = self.regs.d[self.reg_x()] as u16 as i16;

        self.regs.sr.n = false;
        self.regs.sr.z = false;
        self.regs.sr.v = false;
        self.regs.sr.c = false;

        if value < 0 {
            self.regs.sr.n = true;
            return self.raise(Vector::ChkInstruction as u8);
        }
        if value > bound {
            self.regs.sr.c = true;
            return self.raise(Vector::ChkInstruction as u8);
        }

        self.regs.sr.z = value == bound;
        Ok(())
    }

    /// RESET: pulse the reset line of the bus and forget pending interrupt
    /// requests; the CPU itself keeps running.
    pub(super) fn execute_reset(&mut self) -> Result<(), Error> {
        if !self.regs.sr.s {
            return self.privilege_violation();
        }

        debug!("reset instruction at pc {:#010X}", self.regs.pc);
        self.bus_mut().reset();
        self.interrupts = InterruptController::new();
        Ok(())
    }

    /// STOP: load SR from the following word and halt instruction
    /// processing until an interrupt arrives.
    pub(super) fn execute_stop(&mut self) -> Result<(), Error> {
        if !self.regs.sr.s {
            return self.privilege_violation();
        }

        let sr = self.fetch_word()?;
        self.set_sr(sr);
        self.stopped = true;
        debug!("stopped with sr {sr:#06X}");
        Ok(())
    }
}
