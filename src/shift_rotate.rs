// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Shifts and rotates: ASL/ASR, LSL/LSR, ROL/ROR, ROXL/ROXR.
//!
//! Register forms shift a data register by an immediate count 1..8 or by
//! the low six bits of another data register; memory forms shift a word
//! operand by one. A register count of zero clears C and V, preserves X,
//! and recomputes N and Z from the unchanged operand.

use crate::decoder::{ea_cycles, DecodeTable, EA_MEMORY_ALTERABLE};
use crate::operands::Size;
use crate::{Error, M68000};

pub(crate) fn register(table: &mut DecodeTable) {
    // Register forms: all four operations, both directions, both count
    // kinds live in the free bits.
    for size_bits in 0..3u16 {
        table.register(M68000::execute_shift_register, 0xE000 | size_bits << 6, 0xF0C0, 0, |op| {
            // Immediate counts are known at registration; register counts
            // pay 2 cycles per bit at execution time.
            if op & 0x20 != 0 {
                6
            } else {
                let count = match op >> 9 & 0x7 {
                    0 => 8,
                    n => n as u32,
                };
                6 + 2 * count
            }
        });
    }

    // Memory forms: one-bit word shifts.
    let memory_cycles = |op: u16| 8 + ea_cycles(op, Size::Word);
    table.register(M68000::execute_asm, 0xE0C0, 0xFEC0, EA_MEMORY_ALTERABLE, memory_cycles);
    table.register(M68000::execute_lsm, 0xE2C0, 0xFEC0, EA_MEMORY_ALTERABLE, memory_cycles);
    table.register(M68000::execute_roxm, 0xE4C0, 0xFEC0, EA_MEMORY_ALTERABLE, memory_cycles);
    table.register(M68000::execute_rom, 0xE6C0, 0xFEC0, EA_MEMORY_ALTERABLE, memory_cycles);
}

/// Flag outcome of one shift/rotate. `None` leaves the flag alone.
struct ShiftFlags {
    carry: Option<bool>,
    extend: Option<bool>,
    overflow: bool,
}

fn asl(mut value: u32, count: u32, size: Size) -> (u32, ShiftFlags) {
    let mask = size.mask();
    let sign = size.sign_bit();
    let mut carry = false;
    let mut overflow = false;

    for _ in 0..count {
        carry = value & sign != 0;
        value = value << 1 & mask;
        // V accumulates: any step that changes the sign bit sets it.
        if carry != (value & sign != 0) {
            overflow = true;
        }
    }

    (value, ShiftFlags { carry: Some(carry), extend: Some(carry), overflow })
}

fn asr(mut value: u32, count: u32, size: Size) -> (u32, ShiftFlags) {
    let sign = value & size.sign_bit();
    let mut carry = false;

    for _ in 0..count {
        carry = value & 1 != 0;
        value = value >> 1 | sign;
    }

    (value, ShiftFlags { carry: Some(carry), extend: Some(carry), overflow: false })
}

fn lsl(mut value: u32, count: u32, size: Size) -> (u32, ShiftFlags) {
    let mask = size.mask();
    let sign = size.sign_bit();
    let mut carry = false;

    for _ in 0..count {
        carry = value & sign != 0;
        value = value << 1 & mask;
    }

    (value, ShiftFlags { carry: Some(carry), extend: Some(carry), overflow: false })
}

fn lsr(mut value: u32, count: u32) -> (u32, ShiftFlags) {
    let mut carry = false;

    for _ in 0..count {
        carry = value & 1 != 0;
        value >>= 1;
    }

    (value, ShiftFlags { carry: Some(carry), extend: Some(carry), overflow: false })
}

/// 9-bit (17-, 33-bit) rotation left through X.
fn roxl(mut value: u32, count: u32, size: Size, mut extend: bool) -> (u32, ShiftFlags) {
    let mask = size.mask();
    let sign = size.sign_bit();

    for _ in 0..count % (size.bytes() * 8 + 1) {
        let msb = value & sign != 0;
        value = (value << 1 | extend as u32) & mask;
        extend = msb;
    }

    (value, ShiftFlags { carry: Some(extend), extend: Some(extend), overflow: false })
}

fn roxr(mut value: u32, count: u32, size: Size, mut extend: bool) -> (u32, ShiftFlags) {
    let sign = size.sign_bit();

    for _ in 0..count % (size.bytes() * 8 + 1) {
        let lsb = value & 1 != 0;
        value = value >> 1 | if extend { sign } else { 0 };
        extend = lsb;
    }

    (value, ShiftFlags { carry: Some(extend), extend: Some(extend), overflow: false })
}

/// Pure rotation: C takes the last bit that wrapped, X is untouched.
fn rol(value: u32, count: u32, size: Size) -> (u32, ShiftFlags) {
    let bits = size.bytes() * 8;
    let shift = count % bits;
    if shift == 0 {
        return (value, ShiftFlags { carry: Some(false), extend: None, overflow: false });
    }

    let mask = size.mask();
    let result = (value << shift | value >> (bits - shift)) & mask;
    let carry = result & 1 != 0;
    (result, ShiftFlags { carry: Some(carry), extend: None, overflow: false })
}

fn ror(value: u32, count: u32, size: Size) -> (u32, ShiftFlags) {
    let bits = size.bytes() * 8;
    let shift = count % bits;
    if shift == 0 {
        return (value, ShiftFlags { carry: Some(false), extend: None, overflow: false });
    }

    let mask = size.mask();
    let result = (value >> shift | value << (bits - shift)) & mask;
    let carry = result & size.sign_bit() != 0;
    (result, ShiftFlags { carry: Some(carry), extend: None, overflow: false })
}

impl M68000 {
    fn shift_flags(&mut self, result: u32, size: Size, flags: ShiftFlags) {
        self.regs.sr.n = size.is_negative(result);
        self.regs.sr.z = size.is_zero(result);
        self.regs.sr.v = flags.overflow;
        if let Some(carry) = flags.carry {
            self.regs.sr.c = carry;
        }
        if let Some(extend) = flags.extend {
            self.regs.sr.x = extend;
        }
    }

    fn apply(&mut self, operation: u16, left: bool, value: u32, count: u32, size: Size) -> (u32, ShiftFlags) {
        match (operation, left) {
            (0, true) => asl(value, count, size),
            (0, false) => asr(value, count, size),
            (1, true) => lsl(value, count, size),
            (1, false) => lsr(value, count),
            (2, true) => roxl(value, count, size, self.regs.sr.x),
            (2, false) => roxr(value, count, size, self.regs.sr.x),
            (3, true) => rol(value, count, size),
            _ => ror(value, count, size),
        }
    }

    pub(super) fn execute_shift_register(&mut self) -> Result<(), Error> {
        let ir = self.regs.ir;
        let size = Size::from_opcode(ir);
        let left = ir & 0x100 != 0;
        let operation = ir >> 3 & 0x3;
        let register_count = ir & 0x20 != 0;
        let reg = self.reg_y();

        let count = if register_count {
            let count = self.regs.d[self.reg_x()] & 0x3F;
            self.add_cycles(2 * count);
            count
        } else {
            match ir >> 9 & 0x7 {
                0 => 8,
                n => n as u32,
            }
        };

        let value = self.regs.d[reg] & size.mask();

        if count == 0 {
            // Count 0 touches no data: C and V clear, X preserved, N and Z
            // from the operand.
            self.regs.sr.n = size.is_negative(value);
            self.regs.sr.z = size.is_zero(value);
            self.regs.sr.v = false;
            self.regs.sr.c = false;
            return Ok(());
        }

        let (result, flags) = self.apply(operation, left, value, count, size);
        self.regs.d[reg] = self.regs.d[reg] & !size.mask() | result;
        self.shift_flags(result, size, flags);
        Ok(())
    }

    fn shift_memory(&mut self, operation: u16) -> Result<(), Error> {
        let left = self.regs.ir & 0x100 != 0;

        let dst = self.src_operand(Size::Word)?;
        let value = self.operand_read(dst, Size::Word)?;

        let (result, flags) = self.apply(operation, left, value, 1, Size::Word);
        self.shift_flags(result, Size::Word, flags);
        self.operand_write(dst, Size::Word, result)
    }

    pub(super) fn execute_asm(&mut self) -> Result<(), Error> {
        self.shift_memory(0)
    }

    pub(super) fn execute_lsm(&mut self) -> Result<(), Error> {
        self.shift_memory(1)
    }

    pub(super) fn execute_roxm(&mut self) -> Result<(), Error> {
        self.shift_memory(2)
    }

    pub(super) fn execute_rom(&mut self) -> Result<(), Error> {
        self.shift_memory(3)
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
    fn asl_sets_overflow_on_any_sign_change() {
        let mut cpu = core();
        cpu.regs.d[0] = 0x40;

        // ASL.B #2,D0: 0x40 -> 0x80 -> 0x00; the sign changed twice.
        cpu.execute(0xE500).unwrap();
        assert_eq!(cpu.regs.d[0] & 0xFF, 0);
        assert!(cpu.regs.sr.v);
        assert!(cpu.regs.sr.c, "last bit out was the 0x80 sign");
        assert!(cpu.regs.sr.x);
        assert!(cpu.regs.sr.z);
    }

    #[test]
    fn asr_replicates_sign() {
        let mut cpu = core();
        cpu.regs.d[0] = 0x81;

        // ASR.B #1,D0
        cpu.execute(0xE200).unwrap();
        assert_eq!(cpu.regs.d[0] & 0xFF, 0xC0);
        assert!(cpu.regs.sr.c);
        assert!(cpu.regs.sr.x);
        assert!(cpu.regs.sr.n);
        assert!(!cpu.regs.sr.v);
    }

    #[test]
    fn lsr_fills_with_zero() {
        let mut cpu = core();
        cpu.regs.d[1] = 0x8001;

        // LSR.W #1,D1
        cpu.execute(0xE249).unwrap();
        assert_eq!(cpu.regs.d[1] & 0xFFFF, 0x4000);
        assert!(cpu.regs.sr.c);
        assert!(!cpu.regs.sr.n);
    }

    #[test]
    fn register_count_zero_clears_carry_keeps_extend() {
        let mut cpu = core();
        cpu.regs.d[0] = 0x8000_0000;
        cpu.regs.d[1] = 0;
        cpu.regs.sr.x = true;
        cpu.regs.sr.c = true;

        // LSL.L D1,D0 with D1 = 0.
        cpu.execute(0xE3A8).unwrap();
        assert_eq!(cpu.regs.d[0], 0x8000_0000);
        assert!(!cpu.regs.sr.c);
        assert!(cpu.regs.sr.x, "X preserved on zero count");
        assert!(cpu.regs.sr.n);
        assert!(!cpu.regs.sr.v);
    }

    #[test]
    fn roxr_rotates_through_extend() {
        let mut cpu = core();
        cpu.regs.d[0] = 0x01;
        cpu.regs.sr.x = true;

        // ROXR.B #1,D0: X enters the msb, the old lsb becomes X and C.
        cpu.execute(0xE210).unwrap();
        assert_eq!(cpu.regs.d[0] & 0xFF, 0x80);
        assert!(cpu.regs.sr.x);
        assert!(cpu.regs.sr.c);
    }

    #[test]
    fn rol_wraps_and_spares_extend() {
        let mut cpu = core();
        cpu.regs.d[0] = 0x80;
        cpu.regs.sr.x = true;

        // ROL.B #1,D0
        cpu.execute(0xE318).unwrap();
        assert_eq!(cpu.regs.d[0] & 0xFF, 0x01);
        assert!(cpu.regs.sr.c);
        assert!(cpu.regs.sr.x, "plain rotate leaves X alone");
    }

    #[test]
    fn memory_shift_is_one_word_bit() {
        let mut cpu = core();
        cpu.regs.a[0] = 0x200;
        cpu.bus_mut().write(Size::Word, 0x200, 0x8000).unwrap();

        // ASL.W (A0): 1110 000 1 11 010 000
        cpu.execute(0xE1D0).unwrap();
        assert_eq!(cpu.bus_mut().read(Size::Word, 0x200).unwrap(), 0);
        assert!(cpu.regs.sr.c);
        assert!(cpu.regs.sr.x);
        assert!(cpu.regs.sr.v);
        assert!(cpu.regs.sr.z);
    }
}
