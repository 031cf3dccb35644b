// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use imx23_core::peripherals::icoll::{Icoll, LineCtrl, Route, NO_VECTOR};
use imx23_core::rap::RegisterLayout;
use imx23_core::{AccessWidth, Peripheral};

const SET: u64 = 0x4;
const CLR: u64 = 0x8;
const TOG: u64 = 0xC;

const HW_ICOLL_VECTOR: u64 = 0x00;
const HW_ICOLL_LEVELACK: u64 = 0x10;
const HW_ICOLL_STAT: u64 = 0x70;
const HW_ICOLL_RAW0: u64 = 0xA0;

fn interrupt_reg(line: u64) -> u64 {
    0x120 + line * 0x10
}

fn enable(icoll: &mut Icoll, line: u64, ctrl: LineCtrl) {
    icoll.write_register(interrupt_reg(line), ctrl.bits() as u32, AccessWidth::Word);
}

#[test]
fn test_alias_laws_on_every_window() {
    let layout = RegisterLayout::MXS;
    let seeds = [0u32, 0xFFFF_FFFF, 0xA5A5_0F0F, 0x8000_0001];
    let values = [0u32, 0x1, 0xFFFF_0000, 0x1234_5678];

    for base in [0x00u64, 0x20, 0x130] {
        for &seed in &seeds {
            for &v in &values {
                let mut reg = seed;
                assert_eq!(layout.apply(&mut reg, base, v, AccessWidth::Word), seed);
                assert_eq!(reg, v);

                let mut reg = seed;
                assert_eq!(layout.apply(&mut reg, base + SET, v, AccessWidth::Word), seed);
                assert_eq!(reg, seed | v);

                let mut reg = seed;
                layout.apply(&mut reg, base + CLR, v, AccessWidth::Word);
                assert_eq!(reg, seed & !v);

                let mut reg = seed;
                layout.apply(&mut reg, base + TOG, v, AccessWidth::Word);
                assert_eq!(reg, seed ^ v);
            }
        }
    }
}

#[test]
fn test_byte_write_leaves_other_lanes() {
    let layout = RegisterLayout::MXS;
    for lane in 0..4u64 {
        for alias in [0, SET, CLR, TOG] {
            let seed = 0x1122_3344u32;
            let mut reg = seed;
            layout.apply(&mut reg, 0x40 + alias + lane, 0xFF, AccessWidth::Byte);
            let keep = !(0xFFu32 << (lane * 8));
            assert_eq!(reg & keep, seed & keep, "lane {} alias {:#x}", lane, alias);
        }
    }
}

#[test]
fn test_fiq_beats_lower_irq_line() {
    let mut icoll = Icoll::new();
    let irq = icoll.irq_output();
    let fiq = icoll.fiq_output();
    enable(&mut icoll, 5, LineCtrl::ENABLE);
    enable(&mut icoll, 70, LineCtrl::ENFIQ);

    icoll.set_line(5, true);
    icoll.set_line(70, true);

    assert_eq!(icoll.read_register(HW_ICOLL_STAT, AccessWidth::Word), 70);
    assert_eq!(icoll.route(), Some(Route::Fiq));
    assert!(fiq.is_high());
    assert!(!irq.is_high());
}

#[test]
fn test_lowest_irq_line_wins() {
    let mut icoll = Icoll::new();
    enable(&mut icoll, 40, LineCtrl::ENABLE);
    enable(&mut icoll, 12, LineCtrl::ENABLE);
    icoll.set_line(40, true);
    icoll.set_line(12, true);
    assert_eq!(icoll.read_register(HW_ICOLL_VECTOR, AccessWidth::Word), 12);
}

#[test]
fn test_level_ack_clears_selected_line() {
    let mut icoll = Icoll::new();
    let irq = icoll.irq_output();
    enable(&mut icoll, 9, LineCtrl::ENABLE);
    icoll.set_line(9, true);
    assert!(irq.is_high());

    icoll.write_register(HW_ICOLL_LEVELACK, 0x1, AccessWidth::Word);
    assert!(!icoll.is_raised(9));
    assert_eq!(icoll.read_register(HW_ICOLL_STAT, AccessWidth::Word), NO_VECTOR);
    assert!(!irq.is_high());
    assert!(!icoll.fiq_output().is_high());
}

#[test]
fn test_softirq_asserts_within_write() {
    let mut icoll = Icoll::new();
    let irq = icoll.irq_output();
    enable(&mut icoll, 20, LineCtrl::ENABLE);
    assert!(!icoll.is_raised(20));

    icoll.write_register(
        interrupt_reg(20) + SET,
        LineCtrl::SOFTIRQ.bits() as u32,
        AccessWidth::Word,
    );
    assert!(icoll.is_raised(20));
    assert!(irq.is_high());
    assert_eq!(icoll.read_register(HW_ICOLL_RAW0, AccessWidth::Word), 1 << 20);
    assert_eq!(icoll.line_control(20), LineCtrl::ENABLE);
}

#[test]
fn test_repeated_assert_is_idempotent() {
    let mut once = Icoll::new();
    let mut twice = Icoll::new();
    for icoll in [&mut once, &mut twice] {
        enable(icoll, 33, LineCtrl::ENABLE);
    }
    once.set_line(33, true);
    twice.set_line(33, true);
    twice.set_line(33, true);

    assert_eq!(once.snapshot(), twice.snapshot());
}

#[test]
fn test_undecoded_read_is_zero_and_inert() {
    let mut icoll = Icoll::new();
    enable(&mut icoll, 1, LineCtrl::ENABLE);
    icoll.set_line(1, true);
    let before = icoll.snapshot();

    assert_eq!(icoll.read_register(0x1000, AccessWidth::Word), 0);
    assert_eq!(icoll.read_register(0x920, AccessWidth::Word), 0);
    assert_eq!(icoll.snapshot(), before);
}

#[test]
fn test_vbase_is_stored_apart_from_raw_bank() {
    let mut icoll = Icoll::new();
    enable(&mut icoll, 3, LineCtrl::ENABLE);
    icoll.set_line(3, true);

    icoll.write_register(0x40, 0x4000_0000, AccessWidth::Word);
    icoll.write_register(0x40 + SET, 0x100, AccessWidth::Word);
    assert_eq!(icoll.read_register(0x40, AccessWidth::Word), 0x4000_0100);
    assert_eq!(icoll.read_register(HW_ICOLL_RAW0, AccessWidth::Word), 1 << 3);
}
