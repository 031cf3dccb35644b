// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! i.MX23 interrupt collector (ICOLL).
//!
//! 128 input lines in four banks of 32. Each line can be routed to IRQ, FIQ
//! or both through its `HW_ICOLL_INTERRUPTn` control byte. Priorities are
//! stored but not used: the lowest pending line wins, and any pending FIQ
//! line wins over every IRQ line.

use crate::interrupt::{ControllerInput, InterruptController};
use crate::peripherals::BlockControl;
use crate::rap::{AccessWidth, RegisterLayout};
use crate::signals::{DigitalLevel, SignalLine};
use crate::{Peripheral, SimResult, SimulationError};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::sync::{Arc, Mutex};

pub const LINE_COUNT: usize = 128;
pub const BANK_COUNT: usize = LINE_COUNT / 32;

/// Width mask of the vector number in `HW_ICOLL_STAT`.
pub const VECTOR_MASK: u32 = 0x7F;
/// Status value meaning "no vector selected".
pub const NO_VECTOR: u32 = VECTOR_MASK;

// Register fields, in units of the 16-byte register stride.
const HW_ICOLL_VECTOR: u64 = 0x0;
const HW_ICOLL_LEVELACK: u64 = 0x1;
const HW_ICOLL_CTRL: u64 = 0x2;
// Field 4 is the vector base; the raised bitmaps live only in RAW0..3.
const HW_ICOLL_VBASE: u64 = 0x4;
const HW_ICOLL_STAT: u64 = 0x7;
const HW_ICOLL_RAW0: u64 = 0xA;
const HW_ICOLL_RAW3: u64 = 0xD;
const HW_ICOLL_INTERRUPT0: u64 = 0x12;
const HW_ICOLL_INTERRUPT127: u64 = 0x91;

bitflags::bitflags! {
    /// Per-line `HW_ICOLL_INTERRUPTn` control byte.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct LineCtrl: u8 {
        const PRIORITY = 0x03;
        const ENABLE = 0x04;
        const SOFTIRQ = 0x08;
        const ENFIQ = 0x10;
    }
}

/// Upstream output a vector was selected for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Route {
    Irq,
    Fiq,
}

#[derive(Debug)]
pub struct Icoll {
    layout: RegisterLayout,
    levelack: u32,
    ctrl: BlockControl,
    vbase: u32,
    reserved: [u32; 3],
    /// Selected vector, `HW_ICOLL_STAT`.
    status: u32,
    raised: [u32; BANK_COUNT],
    irq_enabled: [u32; BANK_COUNT],
    fiq_enabled: [u32; BANK_COUNT],
    interrupt: [u8; LINE_COUNT],
    route: Option<Route>,
    irq: SignalLine,
    fiq: SignalLine,
}

impl Default for Icoll {
    fn default() -> Self {
        Self::new()
    }
}

impl Icoll {
    pub fn new() -> Self {
        Self {
            layout: RegisterLayout::MXS,
            levelack: 0,
            ctrl: BlockControl::default(),
            vbase: 0,
            reserved: [0; 3],
            status: NO_VECTOR,
            raised: [0; BANK_COUNT],
            irq_enabled: [0; BANK_COUNT],
            fiq_enabled: [0; BANK_COUNT],
            interrupt: [0; LINE_COUNT],
            route: None,
            irq: SignalLine::new(),
            fiq: SignalLine::new(),
        }
    }

    /// Aggregate IRQ output towards the CPU.
    pub fn irq_output(&self) -> SignalLine {
        self.irq.clone()
    }

    /// Aggregate FIQ output towards the CPU.
    pub fn fiq_output(&self) -> SignalLine {
        self.fiq.clone()
    }

    /// Raises or lowers input `line` and re-arbitrates.
    ///
    /// # Panics
    ///
    /// If `line` is not below [`LINE_COUNT`]; board wiring validates line
    /// numbers before handing out inputs.
    pub fn set_line(&mut self, line: usize, level: bool) {
        assert!(line < LINE_COUNT, "icoll: input line {line} out of range");
        let (bank, bit) = split(line);
        if level {
            self.raised[bank] |= bit;
        } else {
            self.raised[bank] &= !bit;
        }
        self.arbitrate();
    }

    pub fn is_raised(&self, line: usize) -> bool {
        test_bit(&self.raised, line)
    }

    pub fn is_irq_enabled(&self, line: usize) -> bool {
        test_bit(&self.irq_enabled, line)
    }

    pub fn is_fiq_enabled(&self, line: usize) -> bool {
        test_bit(&self.fiq_enabled, line)
    }

    pub fn line_control(&self, line: usize) -> LineCtrl {
        LineCtrl::from_bits_retain(self.interrupt[line])
    }

    /// Raw `HW_ICOLL_STAT` value.
    pub fn status(&self) -> u32 {
        self.status
    }

    /// Output the last arbitration pass asserted, if any.
    pub fn route(&self) -> Option<Route> {
        self.route
    }

    pub fn control(&self) -> &BlockControl {
        &self.ctrl
    }

    pub fn read_register(&self, offset: u64, width: AccessWidth) -> u32 {
        let field = self.layout.field(offset);
        let word = match field {
            HW_ICOLL_VECTOR..=HW_ICOLL_STAT => self.core_word(field),
            HW_ICOLL_RAW0..=HW_ICOLL_RAW3 => self.raised[(field - HW_ICOLL_RAW0) as usize],
            HW_ICOLL_INTERRUPT0..=HW_ICOLL_INTERRUPT127 => {
                self.interrupt[(field - HW_ICOLL_INTERRUPT0) as usize] as u32
            }
            _ => {
                tracing::warn!("icoll: bad read offset {:#x}", offset);
                return 0;
            }
        };
        self.layout.extract(word, offset, width)
    }

    pub fn write_register(&mut self, offset: u64, value: u32, width: AccessWidth) {
        let field = self.layout.field(offset);
        match field {
            HW_ICOLL_CTRL => {
                self.ctrl.write(&self.layout, offset, value, width);
            }
            HW_ICOLL_LEVELACK => {
                self.layout.apply(&mut self.levelack, offset, value, width);
                self.level_acknowledge();
            }
            HW_ICOLL_VECTOR..=HW_ICOLL_STAT => {
                let layout = self.layout;
                layout.apply(self.core_word_mut(field), offset, value, width);
            }
            HW_ICOLL_INTERRUPT0..=HW_ICOLL_INTERRUPT127 => {
                let line = (field - HW_ICOLL_INTERRUPT0) as usize;
                self.write_line_control(line, offset, value, width);
            }
            _ => {
                tracing::warn!("icoll: bad write offset {:#x} = {:#x}", offset, value);
                return;
            }
        }
        self.arbitrate();
    }

    fn core_word(&self, field: u64) -> u32 {
        match field {
            HW_ICOLL_VECTOR | HW_ICOLL_STAT => self.status,
            HW_ICOLL_LEVELACK => self.levelack,
            HW_ICOLL_CTRL => self.ctrl.value,
            HW_ICOLL_VBASE => self.vbase,
            3 => self.reserved[0],
            5 => self.reserved[1],
            _ => self.reserved[2],
        }
    }

    fn core_word_mut(&mut self, field: u64) -> &mut u32 {
        match field {
            HW_ICOLL_VECTOR | HW_ICOLL_STAT => &mut self.status,
            HW_ICOLL_LEVELACK => &mut self.levelack,
            HW_ICOLL_CTRL => &mut self.ctrl.value,
            HW_ICOLL_VBASE => &mut self.vbase,
            3 => &mut self.reserved[0],
            5 => &mut self.reserved[1],
            _ => &mut self.reserved[2],
        }
    }

    /// Retires the vector in `HW_ICOLL_STAT`.
    fn level_acknowledge(&mut self) {
        let line = (self.status & VECTOR_MASK) as usize;
        let (bank, bit) = split(line);
        self.raised[bank] &= !bit;
        self.status = NO_VECTOR;
        tracing::debug!("icoll: acknowledged vector {}", line);
    }

    fn write_line_control(&mut self, line: usize, offset: u64, value: u32, width: AccessWidth) {
        let mut decoded = self.interrupt[line] as u32;
        self.layout.apply(&mut decoded, offset, value, width);
        let ctrl = LineCtrl::from_bits_retain(decoded as u8);

        // SOFTIRQ only triggers; it never reads back.
        self.interrupt[line] = (ctrl - LineCtrl::SOFTIRQ).bits();

        let (bank, bit) = split(line);
        if ctrl.contains(LineCtrl::ENABLE) {
            self.irq_enabled[bank] |= bit;
        } else {
            self.irq_enabled[bank] &= !bit;
        }
        if ctrl.contains(LineCtrl::ENFIQ) {
            self.fiq_enabled[bank] |= bit;
        } else {
            self.fiq_enabled[bank] &= !bit;
        }
        if ctrl.contains(LineCtrl::SOFTIRQ) {
            tracing::debug!("icoll: soft irq on line {}", line);
            self.set_line(line, true);
        }
    }

    /// Selects the vector to present and drives the upstream outputs.
    ///
    /// All banks are scanned for a FIQ candidate before any IRQ candidate is
    /// considered. Within a pass the lowest line number wins. With nothing
    /// pending both outputs drop and `HW_ICOLL_STAT` keeps its value.
    fn arbitrate(&mut self) {
        let selected = first_candidate(&self.raised, &self.fiq_enabled)
            .map(|vector| (vector, Route::Fiq))
            .or_else(|| {
                first_candidate(&self.raised, &self.irq_enabled).map(|vector| (vector, Route::Irq))
            });

        if let Some((vector, route)) = selected {
            if self.status != vector || self.route != Some(route) {
                tracing::debug!("icoll: vector {} on {:?}", vector, route);
            }
            self.status = vector;
        }
        self.route = selected.map(|(_, route)| route);

        self.irq
            .drive(DigitalLevel::from(self.route == Some(Route::Irq)));
        self.fiq
            .drive(DigitalLevel::from(self.route == Some(Route::Fiq)));
    }
}

fn split(line: usize) -> (usize, u32) {
    (line / 32, 1 << (line % 32))
}

fn test_bit(words: &[u32; BANK_COUNT], line: usize) -> bool {
    let (bank, bit) = split(line);
    words[bank] & bit != 0
}

fn first_candidate(raised: &[u32; BANK_COUNT], enabled: &[u32; BANK_COUNT]) -> Option<u32> {
    raised
        .iter()
        .zip(enabled)
        .enumerate()
        .find_map(|(bank, (raised, enabled))| {
            let candidates = raised & enabled;
            (candidates != 0).then(|| bank as u32 * 32 + candidates.trailing_zeros())
        })
}

#[derive(Debug, Serialize, Deserialize)]
struct IcollSnapshot {
    ctrl: BlockControl,
    levelack: u32,
    vbase: u32,
    reserved: [u32; 3],
    status: u32,
    raised: [u32; BANK_COUNT],
    interrupt: Vec<u8>,
    #[serde(default)]
    route: Option<Route>,
}

impl InterruptController for Icoll {
    fn line_count(&self) -> usize {
        LINE_COUNT
    }

    fn set_line(&mut self, line: usize, level: bool) {
        Icoll::set_line(self, line, level);
    }

    fn is_line_raised(&self, line: usize) -> bool {
        self.is_raised(line)
    }

    fn selected_vector(&self) -> u32 {
        self.status & VECTOR_MASK
    }

    fn acknowledge(&mut self) {
        self.level_acknowledge();
        self.arbitrate();
    }
}

impl Peripheral for Icoll {
    fn read(&self, offset: u64, width: AccessWidth) -> SimResult<u32> {
        Ok(self.read_register(offset, width))
    }

    fn write(&mut self, offset: u64, value: u32, width: AccessWidth) -> SimResult<()> {
        self.write_register(offset, value, width);
        Ok(())
    }

    fn as_any(&self) -> Option<&dyn Any> {
        Some(self)
    }

    fn as_any_mut(&mut self) -> Option<&mut dyn Any> {
        Some(self)
    }

    fn snapshot(&self) -> serde_json::Value {
        let snapshot = IcollSnapshot {
            ctrl: self.ctrl,
            levelack: self.levelack,
            vbase: self.vbase,
            reserved: self.reserved,
            status: self.status,
            raised: self.raised,
            interrupt: self.interrupt.to_vec(),
            route: self.route,
        };
        serde_json::to_value(snapshot).unwrap_or(serde_json::Value::Null)
    }

    fn restore(&mut self, state: serde_json::Value) -> SimResult<()> {
        let snapshot: IcollSnapshot = serde_json::from_value(state)?;
        let interrupt: [u8; LINE_COUNT] = snapshot.interrupt.as_slice().try_into().map_err(|_| {
            <serde_json::Error as serde::de::Error>::invalid_length(
                snapshot.interrupt.len(),
                &"128 interrupt control bytes",
            )
        })?;

        self.ctrl = snapshot.ctrl;
        self.levelack = snapshot.levelack;
        self.vbase = snapshot.vbase;
        self.reserved = snapshot.reserved;
        self.status = snapshot.status;
        self.raised = snapshot.raised;
        self.interrupt = interrupt;
        self.irq_enabled = [0; BANK_COUNT];
        self.fiq_enabled = [0; BANK_COUNT];
        for (line, byte) in interrupt.iter().enumerate() {
            let ctrl = LineCtrl::from_bits_retain(*byte);
            let (bank, bit) = split(line);
            if ctrl.contains(LineCtrl::ENABLE) {
                self.irq_enabled[bank] |= bit;
            }
            if ctrl.contains(LineCtrl::ENFIQ) {
                self.fiq_enabled[bank] |= bit;
            }
        }
        self.arbitrate();
        Ok(())
    }
}

/// Collector shared between the bus and the peripherals wired to it.
pub type SharedIcoll = Arc<Mutex<Icoll>>;

/// One collector input, handed to a peripheral by board wiring.
pub type IcollInput = ControllerInput<Icoll>;

/// Bus-facing handle of a [`SharedIcoll`].
#[derive(Debug, Clone)]
pub struct IcollPort {
    icoll: SharedIcoll,
}

impl IcollPort {
    pub fn new(icoll: SharedIcoll) -> Self {
        Self { icoll }
    }

    pub fn shared(&self) -> &SharedIcoll {
        &self.icoll
    }

    /// Binds collector input `line` for a peripheral interrupt output.
    pub fn input(&self, line: usize) -> SimResult<IcollInput> {
        ControllerInput::new(Arc::clone(&self.icoll), line).ok_or(SimulationError::InvalidLine(line))
    }

    fn lock(&self) -> SimResult<std::sync::MutexGuard<'_, Icoll>> {
        self.icoll
            .lock()
            .map_err(|_| SimulationError::Poisoned("icoll"))
    }
}

impl Peripheral for IcollPort {
    fn read(&self, offset: u64, width: AccessWidth) -> SimResult<u32> {
        Ok(self.lock()?.read_register(offset, width))
    }

    fn write(&mut self, offset: u64, value: u32, width: AccessWidth) -> SimResult<()> {
        self.lock()?.write_register(offset, value, width);
        Ok(())
    }

    fn as_any(&self) -> Option<&dyn Any> {
        Some(self)
    }

    fn as_any_mut(&mut self) -> Option<&mut dyn Any> {
        Some(self)
    }

    fn snapshot(&self) -> serde_json::Value {
        match self.lock() {
            Ok(icoll) => icoll.snapshot(),
            Err(_) => serde_json::Value::Null,
        }
    }

    fn restore(&mut self, state: serde_json::Value) -> SimResult<()> {
        self.lock()?.restore(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LEVELACK: u64 = 0x10;
    const CTRL: u64 = 0x20;
    const STAT: u64 = 0x70;
    const RAW0: u64 = 0xA0;
    const SET: u64 = 0x4;
    const CLR: u64 = 0x8;

    fn interrupt_reg(line: usize) -> u64 {
        0x120 + (line as u64) * 0x10
    }

    fn enable(icoll: &mut Icoll, line: usize, ctrl: LineCtrl) {
        icoll.write_register(interrupt_reg(line), ctrl.bits() as u32, AccessWidth::Word);
    }

    #[test]
    fn test_reset_state() {
        let icoll = Icoll::new();
        assert_eq!(icoll.read_register(STAT, AccessWidth::Word), NO_VECTOR);
        assert_eq!(icoll.read_register(CTRL, AccessWidth::Word), 0);
        assert!(!icoll.irq_output().is_high());
        assert!(!icoll.fiq_output().is_high());
    }

    #[test]
    fn test_fiq_beats_lower_irq() {
        let mut icoll = Icoll::new();
        enable(&mut icoll, 5, LineCtrl::ENABLE);
        enable(&mut icoll, 70, LineCtrl::ENFIQ);
        icoll.set_line(5, true);
        icoll.set_line(70, true);

        assert_eq!(icoll.status(), 70);
        assert_eq!(icoll.route(), Some(Route::Fiq));
        assert!(icoll.fiq_output().is_high());
        assert!(!icoll.irq_output().is_high());
    }

    #[test]
    fn test_lowest_irq_line_wins() {
        let mut icoll = Icoll::new();
        enable(&mut icoll, 40, LineCtrl::ENABLE);
        enable(&mut icoll, 12, LineCtrl::ENABLE);
        icoll.set_line(40, true);
        icoll.set_line(12, true);

        assert_eq!(icoll.read_register(0x0, AccessWidth::Word), 12);
        assert!(icoll.irq_output().is_high());
    }

    #[test]
    fn test_unrouted_line_does_not_assert() {
        let mut icoll = Icoll::new();
        icoll.set_line(3, true);
        assert!(icoll.is_raised(3));
        assert_eq!(icoll.route(), None);
        assert_eq!(icoll.status(), NO_VECTOR);
        assert!(!icoll.irq_output().is_high());
    }

    #[test]
    fn test_level_acknowledge() {
        let mut icoll = Icoll::new();
        enable(&mut icoll, 33, LineCtrl::ENABLE);
        icoll.set_line(33, true);
        assert_eq!(icoll.status(), 33);

        icoll.write_register(LEVELACK, 0x1, AccessWidth::Word);
        assert!(!icoll.is_raised(33));
        assert_eq!(icoll.status(), NO_VECTOR);
        assert!(!icoll.irq_output().is_high());
        assert!(!icoll.fiq_output().is_high());
    }

    #[test]
    fn test_level_acknowledge_presents_next_vector() {
        let mut icoll = Icoll::new();
        enable(&mut icoll, 2, LineCtrl::ENABLE);
        enable(&mut icoll, 9, LineCtrl::ENABLE);
        icoll.set_line(9, true);
        icoll.set_line(2, true);
        assert_eq!(icoll.status(), 2);

        icoll.write_register(LEVELACK, 0, AccessWidth::Word);
        assert_eq!(icoll.status(), 9);
        assert!(icoll.irq_output().is_high());
    }

    #[test]
    fn test_deassert_keeps_status() {
        let mut icoll = Icoll::new();
        enable(&mut icoll, 20, LineCtrl::ENABLE);
        icoll.set_line(20, true);
        icoll.set_line(20, false);
        assert_eq!(icoll.status(), 20);
        assert!(!icoll.irq_output().is_high());
    }

    #[test]
    fn test_softirq_injection() {
        let mut icoll = Icoll::new();
        enable(&mut icoll, 17, LineCtrl::ENABLE | LineCtrl::SOFTIRQ);

        assert!(icoll.is_raised(17));
        assert_eq!(icoll.status(), 17);
        assert!(icoll.irq_output().is_high());
        // The trigger bit is not stored.
        assert_eq!(
            icoll.read_register(interrupt_reg(17), AccessWidth::Word),
            LineCtrl::ENABLE.bits() as u32
        );
    }

    #[test]
    fn test_line_control_aliases() {
        let mut icoll = Icoll::new();
        icoll.write_register(interrupt_reg(100) + SET, LineCtrl::ENFIQ.bits() as u32, AccessWidth::Byte);
        assert!(icoll.is_fiq_enabled(100));
        assert!(!icoll.is_irq_enabled(100));

        icoll.write_register(interrupt_reg(100) + SET, LineCtrl::ENABLE.bits() as u32, AccessWidth::Byte);
        assert!(icoll.is_fiq_enabled(100));
        assert!(icoll.is_irq_enabled(100));

        icoll.write_register(interrupt_reg(100) + CLR, LineCtrl::ENFIQ.bits() as u32, AccessWidth::Byte);
        assert!(!icoll.is_fiq_enabled(100));
        assert_eq!(icoll.line_control(100), LineCtrl::ENABLE);
    }

    #[test]
    fn test_ctrl_soft_reset_gates_clock() {
        let mut icoll = Icoll::new();
        icoll.write_register(CTRL + SET, 0x8000_0000, AccessWidth::Word);
        assert_eq!(icoll.read_register(CTRL, AccessWidth::Word), 0xC000_0000);
        assert!(icoll.control().clock_gate_forced);

        icoll.write_register(CTRL + CLR, 0xC000_0000, AccessWidth::Word);
        assert_eq!(icoll.read_register(CTRL, AccessWidth::Word), 0);
    }

    #[test]
    fn test_raw_window_mirrors_raised() {
        let mut icoll = Icoll::new();
        icoll.set_line(1, true);
        icoll.set_line(127, true);
        assert_eq!(icoll.read_register(RAW0, AccessWidth::Word), 0x2);
        assert_eq!(icoll.read_register(RAW0 + 0x30, AccessWidth::Word), 0x8000_0000);
    }

    #[test]
    fn test_raw_window_is_read_only() {
        let mut icoll = Icoll::new();
        icoll.write_register(RAW0, 0xFFFF_FFFF, AccessWidth::Word);
        assert_eq!(icoll.read_register(RAW0, AccessWidth::Word), 0);
    }

    #[test]
    fn test_out_of_range_access() {
        let mut icoll = Icoll::new();
        enable(&mut icoll, 4, LineCtrl::ENABLE);
        icoll.set_line(4, true);
        let before = icoll.snapshot();

        assert_eq!(icoll.read_register(0x0E0, AccessWidth::Word), 0);
        assert_eq!(icoll.read_register(0x1F00, AccessWidth::Word), 0);
        icoll.write_register(0x1F00, 0xFFFF_FFFF, AccessWidth::Word);
        assert_eq!(icoll.snapshot(), before);
    }

    #[test]
    fn test_snapshot_restore() {
        let mut icoll = Icoll::new();
        enable(&mut icoll, 64, LineCtrl::ENFIQ);
        icoll.set_line(64, true);
        let state = icoll.snapshot();

        let mut restored = Icoll::new();
        restored.restore(state).unwrap();
        assert!(restored.is_fiq_enabled(64));
        assert_eq!(restored.status(), 64);
        assert!(restored.fiq_output().is_high());
    }

    #[test]
    fn test_restore_rejects_short_control_table() {
        let mut icoll = Icoll::new();
        let mut state = icoll.snapshot();
        state["interrupt"] = serde_json::json!([0, 0, 0]);
        assert!(icoll.restore(state).is_err());
    }

    #[test]
    #[should_panic]
    fn test_line_out_of_range_panics() {
        Icoll::new().set_line(LINE_COUNT, true);
    }

    #[test]
    fn test_port_input_binding() {
        let port = IcollPort::new(Arc::new(Mutex::new(Icoll::new())));
        assert!(port.input(127).is_ok());
        assert!(matches!(
            port.input(128),
            Err(SimulationError::InvalidLine(128))
        ));
    }
}
