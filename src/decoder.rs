// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The decode table: 65 536 slots mapping opcode words to handlers and
//! pre-computed base cycle counts.
//!
//! The table is built once, on first use, from per-family registration
//! calls. A registration names a match/mask pair enumerating the opcode
//! words of one encoding, an effective-address class filter applied to
//! bits 5..0, and a cycle calculator evaluated per opcode word. Claiming a
//! slot twice is a programming error and panics during bring-up.

use crate::operands::Size;
use crate::{Error, M68000};

use once_cell::sync::Lazy;

/// One instruction handler. Architectural faults come back as
/// [Error::BusError]/[Error::AddressError] and are folded by the
/// dispatcher.
pub(crate) type Handler = fn(&mut M68000) -> Result<(), Error>;

// Effective-address classes for registration filters, one bit per class.
pub(crate) const EA_DATA_REG: u16 = 0x0800;
pub(crate) const EA_ADDR_REG: u16 = 0x0400;
pub(crate) const EA_INDIRECT: u16 = 0x0200;
pub(crate) const EA_POST_INCREMENT: u16 = 0x0100;
pub(crate) const EA_PRE_DECREMENT: u16 = 0x0080;
pub(crate) const EA_DISPLACEMENT: u16 = 0x0040;
pub(crate) const EA_INDEX: u16 = 0x0020;
pub(crate) const EA_ABSOLUTE_SHORT: u16 = 0x0010;
pub(crate) const EA_ABSOLUTE_LONG: u16 = 0x0008;
pub(crate) const EA_IMMEDIATE: u16 = 0x0004;
pub(crate) const EA_PC_DISPLACEMENT: u16 = 0x0002;
pub(crate) const EA_PC_INDEX: u16 = 0x0001;

/// Every memory mode that can be stored to: (An) through (xxx).L.
pub(crate) const EA_MEMORY_ALTERABLE: u16 = EA_INDIRECT
    | EA_POST_INCREMENT
    | EA_PRE_DECREMENT
    | EA_DISPLACEMENT
    | EA_INDEX
    | EA_ABSOLUTE_SHORT
    | EA_ABSOLUTE_LONG;

/// Memory alterable plus data register direct.
pub(crate) const EA_DATA_ALTERABLE: u16 = EA_DATA_REG | EA_MEMORY_ALTERABLE;

/// All readable data modes: data alterable plus immediate and PC-relative.
pub(crate) const EA_DATA_SOURCE: u16 =
    EA_DATA_ALTERABLE | EA_IMMEDIATE | EA_PC_DISPLACEMENT | EA_PC_INDEX;

/// Control modes: the ones with a computed address and no side effect.
pub(crate) const EA_CONTROL: u16 = EA_INDIRECT
    | EA_DISPLACEMENT
    | EA_INDEX
    | EA_ABSOLUTE_SHORT
    | EA_ABSOLUTE_LONG
    | EA_PC_DISPLACEMENT
    | EA_PC_INDEX;

/// Checks the mode/register field in bits 5..0 against a class filter.
/// A zero filter admits every opcode (for encodings without an EA field).
pub(crate) const fn valid_ea(opcode: u16, ea_classes: u16) -> bool {
    if ea_classes == 0 {
        return true;
    }

    let class = match opcode >> 3 & 0x7 {
        0 => EA_DATA_REG,
        1 => EA_ADDR_REG,
        2 => EA_INDIRECT,
        3 => EA_POST_INCREMENT,
        4 => EA_PRE_DECREMENT,
        5 => EA_DISPLACEMENT,
        6 => EA_INDEX,
        _ => match opcode & 0x7 {
            0 => EA_ABSOLUTE_SHORT,
            1 => EA_ABSOLUTE_LONG,
            2 => EA_PC_DISPLACEMENT,
            3 => EA_PC_INDEX,
            4 => EA_IMMEDIATE,
            _ => return false,
        },
    };

    ea_classes & class != 0
}

/// Effective-address calculation cost in cycles, folded into the base
/// cycle count at registration time.
pub(crate) fn ea_access_cycles(mode: u16, reg: u16, size: Size) -> u32 {
    const TABLE: [[u32; 8]; 8] = [
        [0, 0, 0, 0, 0, 0, 0, 0],         // Dn
        [0, 0, 0, 0, 0, 0, 0, 0],         // An
        [4, 4, 4, 4, 4, 4, 4, 4],         // (An)
        [4, 4, 4, 4, 4, 4, 4, 4],         // (An)+
        [6, 6, 6, 6, 6, 6, 6, 6],         // -(An)
        [8, 8, 8, 8, 8, 8, 8, 8],         // (d16,An)
        [10, 10, 10, 10, 10, 10, 10, 10], // (d8,An,Xn)
        [8, 12, 8, 10, 0, 0, 0, 0],       // (xxx).W, (xxx).L, (d16,PC), (d8,PC,Xn), #imm
    ];

    if mode == 7 && reg == 4 {
        return if size == Size::Long { 8 } else { 4 };
    }
    TABLE[mode as usize][reg as usize]
}

/// EA cost for the mode/register field of an opcode's low six bits.
pub(crate) fn ea_cycles(opcode: u16, size: Size) -> u32 {
    ea_access_cycles(opcode >> 3 & 0x7, opcode & 0x7, size)
}

pub(crate) struct DecodeTable {
    handlers: Vec<Option<Handler>>,
    cycles: Vec<u32>,
}

impl DecodeTable {
    fn new() -> Self {
        Self {
            handlers: vec![None; 0x10000],
            cycles: vec![0; 0x10000],
        }
    }

    pub(crate) fn handler(&self, opcode: u16) -> Option<Handler> {
        self.handlers[opcode as usize]
    }

    pub(crate) fn base_cycles(&self, opcode: u16) -> u32 {
        self.cycles[opcode as usize]
    }

    /// Installs `handler` in every slot where `opcode & !mask == matching`
    /// and the EA filter admits bits 5..0. `mask` has a bit set for every
    /// fixed opcode bit.
    pub(crate) fn register(
        &mut self,
        handler: Handler,
        matching: u16,
        mask: u16,
        ea_classes: u16,
        cycle_count: impl Fn(u16) -> u32,
    ) {
        let mut value = 0u16;
        loop {
            let opcode = matching | value;
            if valid_ea(opcode, ea_classes) {
                assert!(
                    self.handlers[opcode as usize].is_none(),
                    "opcode {opcode:#06X} registered twice"
                );
                self.handlers[opcode as usize] = Some(handler);
                self.cycles[opcode as usize] = cycle_count(opcode);
            }

            value = (value | mask).wrapping_add(1) & !mask;
            if value == 0 {
                break;
            }
        }
    }
}

/// Fixed cycle count, independent of the addressing mode.
pub(crate) fn constant_cycles(count: u32) -> impl Fn(u16) -> u32 {
    move |_| count
}

/// The process-wide decode table, built on first use and immutable after.
pub(crate) static DECODE: Lazy<DecodeTable> = Lazy::new(|| {
    let mut table = DecodeTable::new();

    crate::arithmetic::register(&mut table);
    crate::bcd::register(&mut table);
    crate::bits::register(&mut table);
    crate::branch::register(&mut table);
    crate::data_movement::register(&mut table);
    crate::logical::register(&mut table);
    crate::shift_rotate::register(&mut table);
    crate::system::register(&mut table);

    table
});
