// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Bitwise logic: AND/OR/EOR, their immediate forms and NOT.
//!
//! The CCR/SR-targeted immediate forms live with the other status-control
//! instructions in the `system` module.

use crate::arithmetic::{immediate_cycles, single_operand_cycles};
use crate::decoder::{ea_cycles, DecodeTable, EA_DATA_ALTERABLE, EA_MEMORY_ALTERABLE};
use crate::decoder::{EA_DATA_REG, EA_PC_DISPLACEMENT, EA_PC_INDEX};
use crate::operands::Size;
use crate::{Error, M68000};

/// Readable sources of AND/OR: immediates go through ANDI/ORI instead.
const EA_LOGICAL_SOURCE: u16 =
    EA_DATA_REG | EA_MEMORY_ALTERABLE | EA_PC_DISPLACEMENT | EA_PC_INDEX;

pub(crate) fn register(table: &mut DecodeTable) {
    for opmode in 0..=2u16 {
        let size = Size::from_opmode(opmode);
        table.register(M68000::execute_and, 0xC000 | opmode << 6, 0xF1C0, EA_LOGICAL_SOURCE, move |op| {
            4 + ea_cycles(op, size)
        });
        table.register(M68000::execute_or, 0x8000 | opmode << 6, 0xF1C0, EA_LOGICAL_SOURCE, move |op| {
            4 + ea_cycles(op, size)
        });
    }
    for opmode in 4..=6u16 {
        let size = Size::from_opmode(opmode);
        table.register(M68000::execute_and, 0xC000 | opmode << 6, 0xF1C0, EA_MEMORY_ALTERABLE, move |op| {
            8 + ea_cycles(op, size)
        });
        table.register(M68000::execute_or, 0x8000 | opmode << 6, 0xF1C0, EA_MEMORY_ALTERABLE, move |op| {
            8 + ea_cycles(op, size)
        });
    }

    for size_bits in 0..3u16 {
        // EOR only exists Dn-to-destination; the mode-1 slots of its range
        // encode CMPM.
        table.register(M68000::execute_eor, 0xB100 | size_bits << 6, 0xF1C0, EA_DATA_ALTERABLE, move |op| {
            let size = Size::from_opcode(op);
            if op >> 3 & 0x7 == 0 { 4 } else { 8 + ea_cycles(op, size) }
        });

        table.register(M68000::execute_ori, 0x0000 | size_bits << 6, 0xFFC0, EA_DATA_ALTERABLE, immediate_cycles);
        table.register(M68000::execute_andi, 0x0200 | size_bits << 6, 0xFFC0, EA_DATA_ALTERABLE, immediate_cycles);
        table.register(M68000::execute_eori, 0x0A00 | size_bits << 6, 0xFFC0, EA_DATA_ALTERABLE, immediate_cycles);

        table.register(M68000::execute_not, 0x4600 | size_bits << 6, 0xFFC0, EA_DATA_ALTERABLE, single_operand_cycles);
    }
}

impl M68000 {
    /// Flag policy shared by the whole family: N and Z from the result,
    /// V and C cleared, X untouched.
    pub(crate) fn logic_flags(&mut self, result: u32, size: Size) {
        self.regs.sr.n = size.is_negative(result);
        self.regs.sr.z = size.is_zero(result);
        self.regs.sr.v = false;
        self.regs.sr.c = false;
    }

    fn binary_logic(&mut self, op: fn(u32, u32) -> u32) -> Result<(), Error> {
        let opmode = self.regs.ir >> 6 & 0x7;
        let size = Size::from_opmode(opmode);

        if opmode >= 4 {
            let dst = self.src_operand(size)?;
            let dst_val = self.operand_read(dst, size)?;
            let src = self.regs.d[self.reg_x()] & size.mask();

            let res = op(src, dst_val) & size.mask();
            self.logic_flags(res, size);
            self.operand_write(dst, size, res)
        } else {
            let src = self.src_operand(size)?;
            let src_val = self.operand_read(src, size)?;
            let x = self.reg_x();

            let res = op(src_val, self.regs.d[x]) & size.mask();
            self.logic_flags(res, size);
            self.regs.d[x] = self.regs.d[x] & !size.mask() | res;
            Ok(())
        }
    }

    fn immediate_logic(&mut self, op: fn(u32, u32) -> u32) -> Result<(), Error> {
        let size = Size::from_opcode(self.regs.ir);
        let imm = if size == Size::Long {
            self.fetch_long()?
        } else {
            self.fetch_word()? as u32 & size.mask()
        };

        let dst = self.src_operand(size)?;
        let dst_val = self.operand_read(dst, size)?;
        let res = op(imm, dst_val) & size.mask();
        self.logic_flags(res, size);
        self.operand_write(dst, size, res)
    }

    pub(super) fn execute_and(&mut self) -> Result<(), Error> {
        self.binary_logic(|a, b| a & b)
    }

    pub(super) fn execute_or(&mut self) -> Result<(), Error> {
        self.binary_logic(|a, b| a | b)
    }

    /// EOR Dn,<ea>: only the register-to-destination direction exists.
    pub(super) fn execute_eor(&mut self) -> Result<(), Error> {
        let size = Size::from_opcode(self.regs.ir);
        let dst = self.src_operand(size)?;
        let dst_val = self.operand_read(dst, size)?;
        let src = self.regs.d[self.reg_x()] & size.mask();

        let res = (src ^ dst_val) & size.mask();
        self.logic_flags(res, size);
        self.operand_write(dst, size, res)
    }

    pub(super) fn execute_ori(&mut self) -> Result<(), Error> {
        self.immediate_logic(|a, b| a | b)
    }

    pub(super) fn execute_andi(&mut self) -> Result<(), Error> {
        self.immediate_logic(|a, b| a & b)
    }

    pub(super) fn execute_eori(&mut self) -> Result<(), Error> {
        self.immediate_logic(|a, b| a ^ b)
    }

    pub(super) fn execute_not(&mut self) -> Result<(), Error> {
        let size = Size::from_opcode(self.regs.ir);
        let dst = self.src_operand(size)?;
        let value = self.operand_read(dst, size)?;

        let res = !value & size.mask();
        self.logic_flags(res, size);
        self.operand_write(dst, size, res)
    }
}

#[cfg(test)]
mod tests {
    use crate::memory::{AddressBus, Ram};
    use crate::operands::Size;
    use crate::M68000;

    fn core() -> M68000 {
        let mut ram = Ram::new(0, 0x1000);
        AddressBus::write(&mut ram, Size::Long, 0, 0x800).unwrap();
        AddressBus::write(&mut ram, Size::Long, 4, 0x400).unwrap();
        M68000::new(ram).unwrap()
    }

    #[test]
    fn and_word_flags() {
        let mut cpu = core();
        cpu.regs.d[0] = 0xFFFF_F0F0;
        cpu.regs.d[1] = 0x0000_8F0F;
        cpu.regs.sr.c = true;
        cpu.regs.sr.v = true;

        // AND.W D1,D0
        cpu.execute(0xC041).unwrap();
        assert_eq!(cpu.regs.d[0], 0xFFFF_8000);
        assert!(cpu.regs.sr.n);
        assert!(!cpu.regs.sr.z);
        assert!(!cpu.regs.sr.v);
        assert!(!cpu.regs.sr.c);
    }

    #[test]
    fn eor_to_register() {
        let mut cpu = core();
        cpu.regs.d[0] = 0xFF;
        cpu.regs.d[1] = 0xFF;

        // EOR.B D0,D1
        cpu.execute(0xB101).unwrap();
        assert_eq!(cpu.regs.d[1], 0);
        assert!(cpu.regs.sr.z);
    }

    #[test]
    fn not_inverts_in_place() {
        let mut cpu = core();
        cpu.regs.d[3] = 0x1234_5678;

        // NOT.W D3
        cpu.execute(0x4643).unwrap();
        assert_eq!(cpu.regs.d[3], 0x1234_A987);
        assert!(cpu.regs.sr.n);
    }
}
