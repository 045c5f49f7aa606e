// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! End-to-end programs running through the full fetch/dispatch loop.
//!
//! Every test machine has RAM over `0..0x10000`, the supervisor stack
//! seeded to `0x1000` and the program counter to `0x2000`.

use m68k_emu::{AddressBus, Bus, Error, M68000, Ram, Size};

fn environment() -> M68000 {
    let mut ram = Ram::new(0, 0x10000);
    AddressBus::write(&mut ram, Size::Long, 0, 0x1000).unwrap();
    AddressBus::write(&mut ram, Size::Long, 4, 0x2000).unwrap();

    let mut bus = Bus::new();
    bus.add_device(ram);
    M68000::new(bus).unwrap()
}

fn load_words(cpu: &mut M68000, mut address: u32, words: &[u16]) {
    for &word in words {
        cpu.bus_mut().write(Size::Word, address, word as u32).unwrap();
        address += 2;
    }
}

#[test]
fn reset_state() {
    let mut cpu = environment();

    let regs = cpu.registers();
    assert_eq!(regs.a[7], 0x1000);
    assert_eq!(regs.ssp, 0x1000);
    assert_eq!(regs.pc, 0x2000);
    assert_eq!(u16::from(regs.sr), 0x2700);
    assert_eq!(regs.d, [0; 8]);
    assert_eq!(cpu.cycles(), 0);

    cpu.regs.d[3] = 55;
    cpu.reset().unwrap();
    assert_eq!(cpu.registers().d[3], 0);
}

#[test]
fn moveq_and_nop_cycle_counts() {
    let mut cpu = environment();
    load_words(&mut cpu, 0x2000, &[0x7001, 0x4E71]); // MOVEQ #1,D0 ; NOP

    cpu.step().unwrap();
    assert_eq!(cpu.registers().d[0], 1);
    assert_eq!(cpu.cycles(), 4);

    cpu.step().unwrap();
    assert_eq!(cpu.cycles(), 8);
    assert_eq!(cpu.registers().pc, 0x2004);
}

#[test]
fn move_to_memory_cycle_count() {
    let mut cpu = environment();
    cpu.regs.a[0] = 0x3000;
    load_words(&mut cpu, 0x2000, &[0x2080]); // MOVE.L D0,(A0)

    cpu.step().unwrap();
    assert_eq!(cpu.cycles(), 8);
}

#[test]
fn wait_states_count_into_cycles() {
    let mut ram = Ram::new(0, 0x10000);
    AddressBus::write(&mut ram, Size::Long, 0, 0x1000).unwrap();
    AddressBus::write(&mut ram, Size::Long, 4, 0x2000).unwrap();
    AddressBus::write(&mut ram, Size::Word, 0x2000, 0x4E71).unwrap(); // NOP

    let mut bus = Bus::new();
    bus.add_device(ram);
    bus.set_wait_states(2);

    let mut cpu = M68000::new(bus).unwrap();
    cpu.step().unwrap();

    // 4 base cycles plus 2 wait states for the opcode fetch.
    assert_eq!(cpu.cycles(), 6);
}

#[test]
fn run_cycles_overshoots_to_instruction_boundary() {
    let mut cpu = environment();
    load_words(&mut cpu, 0x2000, &[0x7001, 0x4E71, 0x4E71]);

    cpu.run_cycles(6).unwrap();
    assert_eq!(cpu.cycles(), 8);
    assert_eq!(cpu.registers().pc, 0x2004);
}

#[test]
fn run_cycles_reports_stall_when_stopped() {
    let mut cpu = environment();
    load_words(&mut cpu, 0x2000, &[0x4E72, 0x2700]); // STOP #$2700

    cpu.step().unwrap();
    assert_eq!(cpu.run_cycles(100), Err(Error::Stalled(0x2004)));
}

#[test]
fn iterative_fibonacci() {
    let mut cpu = environment();

    // LEA $3000,A0; the classic ADDQ/SUBQ/BNE store loop.
    load_words(&mut cpu, 0x2000, &[
        0x41F8, 0x3000, // LEA ($3000).W,A0
        0x7000,         // MOVEQ #0,D0
        0x7201,         // MOVEQ #1,D1
        0x7408,         // MOVEQ #8,D2
        0x20C0,         // MOVE.L D0,(A0)+
        0x20C1,         // MOVE.L D1,(A0)+
        0x2601,         // loop: MOVE.L D1,D3
        0xD280,         // ADD.L D0,D1
        0x20C1,         // MOVE.L D1,(A0)+
        0x2003,         // MOVE.L D3,D0
        0x5342,         // SUBQ.W #1,D2
        0x66F4,         // BNE.S loop
        0x4E71,         // NOP
    ]);

    let end = 0x2000 + 13 * 2;
    for _ in 0..200 {
        cpu.step().unwrap();
        if cpu.registers().pc >= end {
            break;
        }
    }

    let expected = [0u32, 1, 1, 2, 3, 5, 8, 13, 21, 34];
    for (i, want) in expected.into_iter().enumerate() {
        let got = cpu.bus_mut().read(Size::Long, 0x3000 + 4 * i as u32).unwrap();
        assert_eq!(got, want, "fib({i})");
    }
}

#[test]
fn recursive_fibonacci_via_bsr_rts() {
    let mut cpu = environment();

    load_words(&mut cpu, 0x2000, &[
        0x601E,         //         BRA.S main
        0x2200,         // fib:    MOVE.L D0,D1
        0x5381,         //         SUBQ.L #1,D1
        0x6F16,         //         BLE.S return
        0x2F00,         //         MOVE.L D0,-(A7)
        0x5380,         //         SUBQ.L #1,D0
        0x61F4,         //         BSR.S fib
        0x2F00,         //         MOVE.L D0,-(A7)
        0x202F, 0x0004, //         MOVE.L (4,A7),D0
        0x5580,         //         SUBQ.L #2,D0
        0x61EA,         //         BSR.S fib
        0x241F,         //         MOVE.L (A7)+,D2
        0x221F,         //         MOVE.L (A7)+,D1
        0xD082,         //         ADD.L D2,D0
        0x4E75,         // return: RTS
        0x41F8, 0x4000, // main:   LEA ($4000).W,A0
        0x7007,         //         MOVEQ #7,D0
        0x61DA,         //         BSR.S fib
        0x2080,         //         MOVE.L D0,(A0)
        0x4E71,         //         NOP
    ]);

    let end = 0x2000 + 22 * 2;
    for _ in 0..500 {
        cpu.step().unwrap();
        if cpu.registers().pc >= end {
            break;
        }
    }

    assert_eq!(cpu.bus_mut().read(Size::Long, 0x4000).unwrap(), 13);
    assert_eq!(cpu.registers().a[7], 0x1000, "stack balanced");
}

#[test]
fn predecrement_through_a7_keeps_byte_pushes_aligned() {
    let mut cpu = environment();
    cpu.regs.d[0] = 0xAB;
    load_words(&mut cpu, 0x2000, &[0x1F00]); // MOVE.B D0,-(A7)

    cpu.step().unwrap();
    assert_eq!(cpu.registers().a[7], 0x0FFE, "A7 moves by 2 for bytes");
    assert_eq!(cpu.bus_mut().read(Size::Byte, 0x0FFE).unwrap(), 0xAB);
}

#[test]
fn mutate_then_compare_matches_direct_test() {
    let mut cpu = environment();
    cpu.regs.d[0] = 0x7FFF;
    cpu.regs.d[1] = 1;
    load_words(&mut cpu, 0x2000, &[
        0xD240, // ADD.W D0,D1
        0x4A41, // TST.W D1
    ]);

    cpu.step().unwrap();
    let after_add = cpu.registers();
    assert!(after_add.sr.v, "0x7FFF + 1 overflows a word");

    cpu.step().unwrap();
    let after_tst = cpu.registers();
    assert_eq!(after_tst.d[1] & 0xFFFF, 0x8000);
    assert!(after_tst.sr.n, "TST agrees with the stored result");
    assert!(!after_tst.sr.v, "TST clears V");
}

#[test]
fn tracer_sees_every_instruction() {
    use std::cell::RefCell;
    use std::rc::Rc;

    let mut cpu = environment();
    load_words(&mut cpu, 0x2000, &[0x7001, 0x4E71]);

    let traces = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&traces);
    cpu.set_tracer(Box::new(move |info| {
        sink.borrow_mut().push((info.pc, info.registers.d[0]));
    }));

    cpu.step().unwrap();
    cpu.step().unwrap();

    let traces = traces.borrow();
    assert_eq!(traces.len(), 2);
    assert_eq!(traces[0], (0x2000, 1), "snapshot is post-instruction");
    assert_eq!(traces[1], (0x2002, 1));
}

#[test]
fn pc_stays_even_across_a_program() {
    let mut cpu = environment();
    load_words(&mut cpu, 0x2000, &[
        0x7001, // MOVEQ #1,D0
        0x6002, // BRA.S +2
        0x4E71, // (skipped)
        0x4E71, // NOP
    ]);

    for _ in 0..3 {
        cpu.step().unwrap();
        assert_eq!(cpu.registers().pc & 1, 0);
    }
    assert_eq!(cpu.registers().pc, 0x2008);
}
