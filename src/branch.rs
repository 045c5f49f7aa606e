// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Control flow: Bcc/BRA/BSR, DBcc, Scc, JMP/JSR/RTS and LINK/UNLK.

use crate::decoder::{constant_cycles, ea_cycles, DecodeTable, EA_CONTROL, EA_DATA_ALTERABLE};
use crate::operands::Size;
use crate::{Error, M68000};

pub(crate) fn register(table: &mut DecodeTable) {
    // One slot block for all sixteen conditions; BRA and BSR sit in the
    // codes where T and F would be useless.
    table.register(M68000::execute_branch, 0x6000, 0xF000, 0, constant_cycles(10));

    // DBcc occupies the mode-1 column of the Scc range.
    table.register(M68000::execute_dbcc, 0x50C8, 0xF0F8, 0, constant_cycles(10));
    table.register(M68000::execute_scc, 0x50C0, 0xF0C0, EA_DATA_ALTERABLE, |op| {
        if op >> 3 & 0x7 == 0 { 4 } else { 8 + ea_cycles(op, Size::Byte) }
    });

    table.register(M68000::execute_jmp, 0x4EC0, 0xFFC0, EA_CONTROL, |op| 4 + ea_cycles(op, Size::Long));
    table.register(M68000::execute_jsr, 0x4E80, 0xFFC0, EA_CONTROL, |op| 16 + ea_cycles(op, Size::Long));
    table.register(M68000::execute_rts, 0x4E75, 0xFFFF, 0, constant_cycles(16));

    table.register(M68000::execute_link, 0x4E50, 0xFFF8, 0, constant_cycles(16));
    table.register(M68000::execute_unlk, 0x4E58, 0xFFF8, 0, constant_cycles(12));
}

impl M68000 {
    /// Bcc/BRA/BSR: an 8-bit displacement in the low opcode byte, or a
    /// 16-bit extension word when that byte is zero. Displacements are
    /// relative to the end of the opcode word.
    pub(super) fn execute_branch(&mut self) -> Result<(), Error> {
        let condition = (self.regs.ir >> 8 & 0xF) as u8;
        let base = self.regs.pc;

        let mut displacement = self.regs.ir as i8 as i32;
        if displacement == 0 {
            displacement = self.fetch_word()? as i16 as i32;
        }

        // Condition 1 encodes BSR, not "branch never".
        let taken = match condition {
            1 => {
                self.push(Size::Long, self.regs.pc)?;
                true
            },
            cc => self.regs.sr.condition(cc),
        };

        if taken {
            self.regs.pc = base.wrapping_add(displacement as u32);
        }
        Ok(())
    }

    /// DBcc: when the condition fails, decrement the low word of Dn and
    /// branch unless the counter ran off the end at -1.
    pub(super) fn execute_dbcc(&mut self) -> Result<(), Error> {
        let condition = (self.regs.ir >> 8 & 0xF) as u8;
        let reg = self.reg_y();

        if self.regs.sr.condition(condition) {
            self.regs.pc = self.regs.pc.wrapping_add(2);
            self.add_cycles(2);
            return Ok(());
        }

        let counter = (self.regs.d[reg] as u16).wrapping_sub(1);
        self.regs.d_word(reg, counter);

        if counter == 0xFFFF {
            self.regs.pc = self.regs.pc.wrapping_add(2);
            self.add_cycles(4);
        } else {
            let base = self.regs.pc;
            let displacement = self.fetch_word()? as i16;
            self.regs.pc = base.wrapping_add(displacement as u32);
        }
        Ok(())
    }

    /// Scc: byte destination becomes 0xFF or 0x00.
    pub(super) fn execute_scc(&mut self) -> Result<(), Error> {
        let condition = (self.regs.ir >> 8 & 0xF) as u8;
        let satisfied = self.regs.sr.condition(condition);

        if satisfied && self.regs.ir >> 3 & 0x7 == 0 {
            self.add_cycles(2);
        }

        let dst = self.src_operand(Size::Byte)?;
        self.operand_write(dst, Size::Byte, if satisfied { 0xFF } else { 0x00 })
    }

    pub(super) fn execute_jmp(&mut self) -> Result<(), Error> {
        let target = self.src_operand(Size::Long)?;
        self.regs.pc = target.address();
        Ok(())
    }

    /// JSR: the return address is the PC after the effective address has
    /// consumed its extension words.
    pub(super) fn execute_jsr(&mut self) -> Result<(), Error> {
        let target = self.src_operand(Size::Long)?;
        self.push(Size::Long, self.regs.pc)?;
        self.regs.pc = target.address();
        Ok(())
    }

    pub(super) fn execute_rts(&mut self) -> Result<(), Error> {
        self.regs.pc = self.pop(Size::Long)?;
        Ok(())
    }

    /// LINK: push An, point it at the new frame, then move SP by the
    /// (usually negative) displacement.
    pub(super) fn execute_link(&mut self) -> Result<(), Error> {
        let reg = self.reg_y();
        let displacement = self.fetch_word()? as i16;

        self.push(Size::Long, self.regs.a[reg])?;
        self.regs.a[reg] = self.regs.a[7];
        self.regs.a[7] = self.regs.a[7].wrapping_add(displacement as u32);
        Ok(())
    }

    pub(super) fn execute_unlk(&mut self) -> Result<(), Error> {
        let reg = self.reg_y();
        self.regs.a[7] = self.regs.a[reg];
        self.regs.a[reg] = self.pop(Size::Long)?;
        Ok(())
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
    fn branch_byte_displacement() {
        let mut cpu = core();
        cpu.regs.pc = 0x402; // as if the opcode at 0x400 was just fetched

        // BRA.S +0x10
        cpu.execute(0x6010).unwrap();
        assert_eq!(cpu.regs.pc, 0x412);
    }

    #[test]
    fn branch_word_displacement_is_relative_to_extension() {
        let mut cpu = core();
        cpu.regs.pc = 0x402;
        cpu.bus_mut().write(Size::Word, 0x402, 0x0100).unwrap();

        // BRA with zero low byte takes the extension word.
        cpu.execute(0x6000).unwrap();
        assert_eq!(cpu.regs.pc, 0x502);
    }

    #[test]
    fn conditional_falls_through() {
        let mut cpu = core();
        cpu.regs.pc = 0x402;
        cpu.regs.sr.z = false;

        // BEQ.S +0x10 not taken.
        cpu.execute(0x6710).unwrap();
        assert_eq!(cpu.regs.pc, 0x402);

        // BNE.S backwards.
        cpu.execute(0x66F0).unwrap();
        assert_eq!(cpu.regs.pc, 0x3F2);
    }

    #[test]
    fn bsr_pushes_past_displacement_word() {
        let mut cpu = core();
        cpu.regs.pc = 0x402;
        cpu.regs.a[7] = 0x800;
        cpu.bus_mut().write(Size::Word, 0x402, 0x0040).unwrap();

        // BSR with a word displacement: return address is after the word.
        cpu.execute(0x6100).unwrap();
        assert_eq!(cpu.regs.pc, 0x442);
        assert_eq!(cpu.regs.a[7], 0x7FC);
        assert_eq!(cpu.bus_mut().read(Size::Long, 0x7FC).unwrap(), 0x404);
    }

    #[test]
    fn dbcc_counts_the_low_word_down() {
        let mut cpu = core();
        cpu.regs.d[2] = 0xABCD_0002;

        // DBF D2,-2 (displacement word at PC).
        cpu.regs.pc = 0x402;
        cpu.bus_mut().write(Size::Word, 0x402, 0xFFFE).unwrap();
        cpu.execute(0x51CA).unwrap();
        assert_eq!(cpu.regs.d[2], 0xABCD_0001, "upper word preserved");
        assert_eq!(cpu.regs.pc, 0x400);

        // Counter exhausts: fall through past the displacement.
        cpu.regs.d[2] = 0xABCD_0000;
        cpu.regs.pc = 0x402;
        cpu.execute(0x51CA).unwrap();
        assert_eq!(cpu.regs.d[2], 0xABCD_FFFF);
        assert_eq!(cpu.regs.pc, 0x404);

        // True condition does nothing but skip the displacement.
        cpu.regs.d[2] = 5;
        cpu.regs.pc = 0x402;
        cpu.execute(0x50CA).unwrap();
        assert_eq!(cpu.regs.d[2], 5);
        assert_eq!(cpu.regs.pc, 0x404);
    }

    #[test]
    fn scc_writes_all_ones_or_zero() {
        let mut cpu = core();
        cpu.regs.sr.z = true;

        // SEQ D0
        cpu.execute(0x57C0).unwrap();
        assert_eq!(cpu.regs.d[0] & 0xFF, 0xFF);

        // SNE D0
        cpu.execute(0x56C0).unwrap();
        assert_eq!(cpu.regs.d[0] & 0xFF, 0x00);
    }

    #[test]
    fn jsr_and_rts_round_trip() {
        let mut cpu = core();
        cpu.regs.pc = 0x402;
        cpu.regs.a[0] = 0x600;
        cpu.regs.a[7] = 0x800;

        // JSR (A0)
        cpu.execute(0x4E90).unwrap();
        assert_eq!(cpu.regs.pc, 0x600);
        assert_eq!(cpu.bus_mut().read(Size::Long, 0x7FC).unwrap(), 0x402);

        cpu.execute(0x4E75).unwrap(); // RTS
        assert_eq!(cpu.regs.pc, 0x402);
        assert_eq!(cpu.regs.a[7], 0x800);
    }

    #[test]
    fn link_and_unlk_frame() {
        let mut cpu = core();
        cpu.regs.a[6] = 0x1234_5678;
        cpu.regs.a[7] = 0x800;
        cpu.regs.pc = 0x402;
        cpu.bus_mut().write(Size::Word, 0x402, 0xFFF0).unwrap(); // -16

        // LINK A6,#-16
        cpu.execute(0x4E56).unwrap();
        assert_eq!(cpu.regs.a[6], 0x7FC);
        assert_eq!(cpu.regs.a[7], 0x7EC);
        assert_eq!(cpu.bus_mut().read(Size::Long, 0x7FC).unwrap(), 0x1234_5678);

        // UNLK A6
        cpu.execute(0x4E5E).unwrap();
        assert_eq!(cpu.regs.a[7], 0x800);
        assert_eq!(cpu.regs.a[6], 0x1234_5678);
    }
}
