// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Data movement: MOVE and its friends, MOVEM/MOVEP, LEA/PEA, the
//! register-shuffling EXG/SWAP/EXT and the store-flavoured CLR/TST/TAS.

use crate::arithmetic::single_operand_cycles;
use crate::decoder::{
    constant_cycles, ea_access_cycles, ea_cycles, DecodeTable, EA_ADDR_REG, EA_CONTROL,
    EA_DATA_ALTERABLE, EA_DATA_SOURCE, EA_DISPLACEMENT, EA_INDEX, EA_INDIRECT,
    EA_POST_INCREMENT, EA_PRE_DECREMENT,
};
use crate::operands::{Operand, Size};
use crate::{Error, M68000};

pub(crate) fn register(table: &mut DecodeTable) {
    register_move(table);

    // MOVEQ: sign-extended 8-bit immediate into Dn.
    table.register(M68000::execute_moveq, 0x7000, 0xF100, 0, constant_cycles(4));

    // MOVEM, word and long. Loads also take the PC-relative modes.
    for size_bits in [2u16, 3] {
        let store_ea = EA_INDIRECT | EA_PRE_DECREMENT | EA_DISPLACEMENT | EA_INDEX
            | crate::decoder::EA_ABSOLUTE_SHORT | crate::decoder::EA_ABSOLUTE_LONG;
        let load_ea = EA_INDIRECT | EA_POST_INCREMENT | EA_DISPLACEMENT | EA_INDEX
            | crate::decoder::EA_ABSOLUTE_SHORT | crate::decoder::EA_ABSOLUTE_LONG
            | crate::decoder::EA_PC_DISPLACEMENT | crate::decoder::EA_PC_INDEX;
        table.register(M68000::execute_movem_store, 0x4800 | size_bits << 6, 0xFFC0, store_ea, constant_cycles(0));
        table.register(M68000::execute_movem_load, 0x4C00 | size_bits << 6, 0xFFC0, load_ea, constant_cycles(0));
    }

    // MOVEP: the four direction/size combinations.
    for base in [0x0108u16, 0x0148, 0x0188, 0x01C8] {
        table.register(M68000::execute_movep, base, 0xF1F8, 0, move |_| {
            if base & 0x0040 != 0 { 24 } else { 16 }
        });
    }

    table.register(M68000::execute_lea, 0x41C0, 0xF1C0, EA_CONTROL, |op| 4 + ea_cycles(op, Size::Long));
    table.register(M68000::execute_pea, 0x4840, 0xFFC0, EA_CONTROL, |op| 8 + ea_cycles(op, Size::Long));

    // EXG data/data, address/address, data/address.
    table.register(M68000::execute_exg, 0xC140, 0xF1F8, 0, constant_cycles(6));
    table.register(M68000::execute_exg, 0xC148, 0xF1F8, 0, constant_cycles(6));
    table.register(M68000::execute_exg, 0xC188, 0xF1F8, 0, constant_cycles(8));

    table.register(M68000::execute_swap, 0x4840, 0xFFF8, 0, constant_cycles(4));
    table.register(M68000::execute_ext, 0x4880, 0xFFF8, 0, constant_cycles(4));
    table.register(M68000::execute_ext, 0x48C0, 0xFFF8, 0, constant_cycles(4));

    for size_bits in 0..3u16 {
        table.register(M68000::execute_clr, 0x4200 | size_bits << 6, 0xFFC0, EA_DATA_ALTERABLE, single_operand_cycles);
        table.register(M68000::execute_tst, 0x4A00 | size_bits << 6, 0xFFC0, EA_DATA_SOURCE, single_operand_cycles);
    }
    table.register(M68000::execute_tas, 0x4AC0, 0xFFC0, EA_DATA_ALTERABLE, single_operand_cycles);
}

/// MOVE and MOVEA share the size encoding in bits 13..12; the destination
/// field walks every alterable mode, with mode 1 meaning MOVEA.
fn register_move(table: &mut DecodeTable) {
    for base in [0x1000u16, 0x3000, 0x2000] {
        let size = Size::from_move(base);
        // Byte moves cannot read an address register.
        let src_ea = if size == Size::Byte { EA_DATA_SOURCE } else { EA_DATA_SOURCE | EA_ADDR_REG };

        for dst_mode in 0..8u16 {
            for dst_reg in 0..8u16 {
                if dst_mode == 7 && dst_reg > 1 {
                    continue; // destination must be alterable
                }

                let matching = base | dst_reg << 9 | dst_mode << 6;
                if dst_mode == 1 {
                    if size != Size::Byte {
                        table.register(M68000::execute_movea, matching, 0xFFC0, src_ea, move |op| {
                            4 + ea_cycles(op, size)
                        });
                    }
                } else {
                    table.register(M68000::execute_move, matching, 0xFFC0, src_ea, move |op| {
                        4 + ea_cycles(op, size) + ea_access_cycles(dst_mode, dst_reg, size)
                    });
                }
            }
        }
    }
}

impl M68000 {
    pub(super) fn execute_move(&mut self) -> Result<(), Error> {
        let size = Size::from_move(self.regs.ir);

        let src = self.src_operand(size)?;
        let value = self.operand_read(src, size)?;

        let dst = self.dst_operand(size)?;
        self.operand_write(dst, size, value)?;

        self.logic_flags(value, size);
        Ok(())
    }

    /// MOVEA: word sources sign-extend, flags stay put.
    pub(super) fn execute_movea(&mut self) -> Result<(), Error> {
        let size = Size::from_move(self.regs.ir);

        let src = self.src_operand(size)?;
        let value = self.operand_read(src, size)?;

        self.regs.a[self.reg_x()] = size.sign_extend(value);
        Ok(())
    }

    pub(super) fn execute_moveq(&mut self) -> Result<(), Error> {
        let value = self.regs.ir as i8 as i32;
        self.regs.d[self.reg_x()] = value as u32;
        self.logic_flags(value as u32, Size::Long);
        Ok(())
    }

    /// Base address of a MOVEM transfer. Post-increment and pre-decrement
    /// leave their address register to the handler, which commits the
    /// final address itself.
    fn movem_address(&mut self) -> Result<u32, Error> {
        let mode = self.regs.ir >> 3 & 0x7;
        let reg = self.reg_y();

        Ok(match mode {
            2..=4 => self.regs.a[reg],
            5 => {
                let disp = self.fetch_word()? as i16;
                self.regs.a[reg].wrapping_add(disp as u32)
            },
            6 => {
                let base = self.regs.a[reg];
                self.indexed_address(base)?
            },
            _ => match self.regs.ir & 0x7 {
                0 => self.fetch_word()? as i16 as u32,
                1 => self.fetch_long()?,
                2 => {
                    let base = self.regs.pc;
                    let disp = self.fetch_word()? as i16;
                    base.wrapping_add(disp as u32)
                },
                _ => {
                    let base = self.regs.pc;
                    self.indexed_address(base)?
                },
            },
        })
    }

    fn movem_size(&self) -> Size {
        if self.regs.ir & 0x40 != 0 { Size::Long } else { Size::Word }
    }

    /// MOVEM registers-to-memory. For the pre-decrement mode the mask is
    /// bit-reversed and the registers go out A7 first.
    pub(super) fn execute_movem_store(&mut self) -> Result<(), Error> {
        let size = self.movem_size();
        let mask = self.fetch_word()?;

        let mode = self.regs.ir >> 3 & 0x7;
        let reg = self.reg_y();
        let mut addr = self.movem_address()?;

        self.add_cycles(8 + 4 * mask.count_ones());

        if mode == 4 {
            for bit in 0..16u32 {
                if mask & 1 << bit == 0 {
                    continue;
                }
                // Bit 0 is A7, bit 15 is D0.
                let value = if bit < 8 { self.regs.a[7 - bit as usize] } else { self.regs.d[15 - bit as usize] };
                addr = addr.wrapping_sub(size.bytes());
                self.write(size, addr, value)?;
            }
            self.regs.a[reg] = addr;
        } else {
            for bit in 0..16u32 {
                if mask & 1 << bit == 0 {
                    continue;
                }
                // Bit 0 is D0, bit 15 is A7.
                let value = if bit < 8 { self.regs.d[bit as usize] } else { self.regs.a[bit as usize - 8] };
                self.write(size, addr, value)?;
                addr = addr.wrapping_add(size.bytes());
            }
        }

        Ok(())
    }

    /// MOVEM memory-to-registers. Word transfers sign-extend into the full
    /// register. A post-increment base register keeps its loaded value if
    /// it appears in the mask.
    pub(super) fn execute_movem_load(&mut self) -> Result<(), Error> {
        let size = self.movem_size();
        let mask = self.fetch_word()?;

        let mode = self.regs.ir >> 3 & 0x7;
        let reg = self.reg_y();
        let mut addr = self.movem_address()?;

        self.add_cycles(12 + 4 * mask.count_ones());

        for bit in 0..16u32 {
            if mask & 1 << bit == 0 {
                continue;
            }

            let value = size.sign_extend(self.read(size, addr)?);
            if bit < 8 {
                self.regs.d[bit as usize] = value;
            } else {
                self.regs.a[bit as usize - 8] = value;
            }
            addr = addr.wrapping_add(size.bytes());
        }

        if mode == 3 && mask & 1 << (8 + reg) == 0 {
            self.regs.a[reg] = addr;
        }
        Ok(())
    }

    /// MOVEP: a data register spread over every other byte of memory,
    /// high byte first.
    pub(super) fn execute_movep(&mut self) -> Result<(), Error> {
        let size = if self.regs.ir & 0x40 != 0 { Size::Long } else { Size::Word };
        let to_register = self.regs.ir & 0x80 == 0;
        let reg = self.reg_x();

        let disp = self.fetch_word()? as i16;
        let mut addr = self.regs.a[self.reg_y()].wrapping_add(disp as u32);

        let mut shift = size.bytes() as i32 * 8 - 8;
        let value = if to_register {
            let mut value = 0u32;
            while shift >= 0 {
                value |= self.read(Size::Byte, addr)? << shift;
                shift -= 8;
                addr = addr.wrapping_add(2);
            }
            let x = self.reg_x();
            self.regs.d[x] = self.regs.d[x] & !size.mask() | value;
            value
        } else {
            let value = self.regs.d[reg] & size.mask();
            while shift >= 0 {
                self.write(Size::Byte, addr, value >> shift & 0xFF)?;
                shift -= 8;
                addr = addr.wrapping_add(2);
            }
            value
        };

        self.logic_flags(value, size);
        Ok(())
    }

    pub(super) fn execute_lea(&mut self) -> Result<(), Error> {
        let target = self.src_operand(Size::Long)?;
        self.regs.a[self.reg_x()] = target.address();
        Ok(())
    }

    pub(super) fn execute_pea(&mut self) -> Result<(), Error> {
        let target = self.src_operand(Size::Long)?;
        self.push(Size::Long, target.address())
    }

    /// EXG swaps two full 32-bit registers; the opmode picks the banks.
    pub(super) fn execute_exg(&mut self) -> Result<(), Error> {
        let x = self.reg_x();
        let y = self.reg_y();

        match self.regs.ir >> 3 & 0x1F {
            0b01000 => self.regs.d.swap(x, y),
            0b01001 => self.regs.a.swap(x, y),
            _ => std::mem::swap(&mut self.regs.d[x], &mut self.regs.a[y]),
        }
        Ok(())
    }

    pub(super) fn execute_swap(&mut self) -> Result<(), Error> {
        let reg = self.reg_y();
        let value = self.regs.d[reg].rotate_left(16);
        self.regs.d[reg] = value;
        self.logic_flags(value, Size::Long);
        Ok(())
    }

    /// EXT: sign-extend byte to word (opmode 2) or word to long (3).
    pub(super) fn execute_ext(&mut self) -> Result<(), Error> {
        let reg = self.reg_y();

        if self.regs.ir & 0x40 == 0 {
            let value = self.regs.d[reg] as i8 as u16;
            self.regs.d_word(reg, value);
            self.logic_flags(value as u32, Size::Word);
        } else {
            let value = self.regs.d[reg] as i16 as u32;
            self.regs.d[reg] = value;
            self.logic_flags(value, Size::Long);
        }
        Ok(())
    }

    pub(super) fn execute_clr(&mut self) -> Result<(), Error> {
        let size = Size::from_opcode(self.regs.ir);
        let dst = self.src_operand(size)?;
        self.operand_write(dst, size, 0)?;

        self.regs.sr.n = false;
        self.regs.sr.z = true;
        self.regs.sr.v = false;
        self.regs.sr.c = false;
        Ok(())
    }

    /// TST: a compare against zero with no writeback.
    pub(super) fn execute_tst(&mut self) -> Result<(), Error> {
        let size = Size::from_opcode(self.regs.ir);
        let src = self.src_operand(size)?;
        let value = self.operand_read(src, size)?;

        self.logic_flags(value, size);
        Ok(())
    }

    /// TAS: test the byte, then write it back with the high bit set.
    pub(super) fn execute_tas(&mut self) -> Result<(), Error> {
        let dst = self.src_operand(Size::Byte)?;
        let value = self.operand_read(dst, Size::Byte)?;

        self.logic_flags(value, Size::Byte);
        self.operand_write(dst, Size::Byte, value | 0x80)
    }
}
