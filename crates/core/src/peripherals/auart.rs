// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::interrupt::LineTarget;
use crate::peripherals::BlockControl;
use crate::rap::{AccessWidth, RegisterLayout};
use crate::{Peripheral, SimResult};

const HW_UARTAPP_CTRL0: u64 = 0x0;
const HW_UARTAPP_INTR: u64 = 0x5;
const HW_UARTAPP_STAT: u64 = 0x7;
const HW_UARTAPP_VERSION: u64 = 0x9;
const HW_UARTAPP_CTRL2: u64 = 0x2;
const FIELD_COUNT: u64 = 0xB;

/// Interrupt status bits live in `INTR[10:0]`, their enables in `INTR[26:16]`.
const INTR_STATUS_MASK: u32 = 0x7FF;
const INTR_ENABLE_SHIFT: u32 = 16;

/// i.MX23 application UART register shell.
///
/// Holds the register file with its reset values so the Linux driver probes
/// successfully. Nothing is transmitted or received.
#[derive(Debug, serde::Serialize)]
pub struct Auart {
    #[serde(skip)]
    layout: RegisterLayout,
    ctrl0: BlockControl,
    /// Fields 1..=10.
    regs: [u32; FIELD_COUNT as usize - 1],
    irq_level: bool,
    #[serde(skip)]
    irq: Option<Box<dyn LineTarget>>,
}

impl Default for Auart {
    fn default() -> Self {
        Self::new()
    }
}

impl Auart {
    pub fn new() -> Self {
        let mut regs = [0; FIELD_COUNT as usize - 1];
        regs[HW_UARTAPP_CTRL2 as usize - 1] = 0x0022_0180;
        regs[HW_UARTAPP_STAT as usize - 1] = 0x89F0_0000;
        regs[HW_UARTAPP_VERSION as usize - 1] = 0x0300_0000;
        Self {
            layout: RegisterLayout::MXS,
            ctrl0: BlockControl::new(0xC003_0000),
            regs,
            irq_level: false,
            irq: None,
        }
    }

    /// Wires the interrupt output.
    pub fn connect_irq(&mut self, target: Box<dyn LineTarget>) {
        target.set_level(self.irq_level);
        self.irq = Some(target);
    }

    pub fn control(&self) -> &BlockControl {
        &self.ctrl0
    }

    pub fn irq_level(&self) -> bool {
        self.irq_level
    }

    fn word(&self, field: u64) -> u32 {
        match field {
            HW_UARTAPP_CTRL0 => self.ctrl0.value,
            _ => self.regs[field as usize - 1],
        }
    }

    fn pending_irq(&self) -> bool {
        let intr = self.regs[HW_UARTAPP_INTR as usize - 1];
        (intr >> INTR_ENABLE_SHIFT) & intr & INTR_STATUS_MASK != 0
    }

    fn update_irq(&mut self) {
        let level = self.pending_irq();
        if level != self.irq_level {
            tracing::debug!("auart: irq {}", level);
            self.irq_level = level;
            if let Some(irq) = &self.irq {
                irq.set_level(level);
            }
        }
    }
}

impl Peripheral for Auart {
    fn read(&self, offset: u64, width: AccessWidth) -> SimResult<u32> {
        let field = self.layout.field(offset);
        if field >= FIELD_COUNT {
            tracing::warn!("auart: bad read offset {:#x}", offset);
            return Ok(0);
        }
        Ok(self.layout.extract(self.word(field), offset, width))
    }

    fn write(&mut self, offset: u64, value: u32, width: AccessWidth) -> SimResult<()> {
        let field = self.layout.field(offset);
        match field {
            HW_UARTAPP_CTRL0 => {
                self.ctrl0.write(&self.layout, offset, value, width);
            }
            f if f < FIELD_COUNT => {
                let layout = self.layout;
                layout.apply(&mut self.regs[f as usize - 1], offset, value, width);
                if f == HW_UARTAPP_INTR {
                    self.update_irq();
                }
            }
            _ => tracing::warn!("auart: bad write offset {:#x} = {:#x}", offset, value),
        }
        Ok(())
    }

    fn as_any(&self) -> Option<&dyn std::any::Any> {
        Some(self)
    }

    fn as_any_mut(&mut self) -> Option<&mut dyn std::any::Any> {
        Some(self)
    }

    fn snapshot(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    fn restore(&mut self, state: serde_json::Value) -> SimResult<()> {
        let state: AuartState = serde_json::from_value(state)?;
        self.ctrl0 = state.ctrl0;
        self.regs = state.regs;
        // The wired input still carries the pre-restore level.
        self.irq_level = self.pending_irq();
        if let Some(irq) = &self.irq {
            irq.set_level(self.irq_level);
        }
        Ok(())
    }
}

#[derive(serde::Deserialize)]
struct AuartState {
    ctrl0: BlockControl,
    regs: [u32; FIELD_COUNT as usize - 1],
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signals::SignalLine;

    const INTR: u64 = 0x50;
    const SET: u64 = 0x4;
    const CLR: u64 = 0x8;

    #[test]
    fn test_reset_values() {
        let uart = Auart::new();
        assert_eq!(uart.read(0x00, AccessWidth::Word).unwrap(), 0xC003_0000);
        assert_eq!(uart.read(0x20, AccessWidth::Word).unwrap(), 0x0022_0180);
        assert_eq!(uart.read(0x70, AccessWidth::Word).unwrap(), 0x89F0_0000);
        assert_eq!(uart.read(0x90, AccessWidth::Word).unwrap(), 0x0300_0000);
        assert_eq!(uart.read(0xB0, AccessWidth::Word).unwrap(), 0);
    }

    #[test]
    fn test_driver_reset_sequence() {
        let mut uart = Auart::new();
        // Leave reset: clear SFTRST, then CLKGATE.
        uart.write(CLR, 0x8000_0000, AccessWidth::Word).unwrap();
        uart.write(CLR, 0x4000_0000, AccessWidth::Word).unwrap();
        assert_eq!(uart.read(0x0, AccessWidth::Word).unwrap(), 0x0003_0000);

        // Assert reset and expect the clock gate to follow.
        uart.write(SET, 0x8000_0000, AccessWidth::Word).unwrap();
        assert_eq!(uart.read(0x0, AccessWidth::Word).unwrap(), 0xC003_0000);
        assert!(uart.control().clock_gate_forced);
    }

    #[test]
    fn test_irq_follows_enabled_status() {
        let mut uart = Auart::new();
        let line = SignalLine::new();
        uart.connect_irq(Box::new(line.clone()));

        // Status without enable.
        uart.write(INTR + SET, 0x0000_0010, AccessWidth::Word).unwrap();
        assert!(!line.is_high());

        uart.write(INTR + SET, 0x0010_0000, AccessWidth::Word).unwrap();
        assert!(line.is_high());
        assert!(uart.irq_level());

        uart.write(INTR + CLR, 0x0000_0010, AccessWidth::Word).unwrap();
        assert!(!line.is_high());
    }

    #[test]
    fn test_restore_redrives_irq() {
        let mut uart = Auart::new();
        uart.write(INTR + SET, 0x0010_0010, AccessWidth::Word).unwrap();
        let state = uart.snapshot();

        let mut restored = Auart::new();
        let line = SignalLine::new();
        restored.connect_irq(Box::new(line.clone()));
        restored.restore(state).unwrap();
        assert_eq!(restored.read(INTR, AccessWidth::Word).unwrap(), 0x0010_0010);
        assert!(restored.irq_level());
        assert!(line.is_high());

        restored.write(INTR + CLR, 0x0000_0010, AccessWidth::Word).unwrap();
        assert!(!line.is_high());
    }

    #[test]
    fn test_restore_rejects_garbage() {
        let mut uart = Auart::new();
        assert!(uart.restore(serde_json::json!({ "regs": [1, 2] })).is_err());
        assert_eq!(uart.read(0x00, AccessWidth::Word).unwrap(), 0xC003_0000);
    }

    #[test]
    fn test_bad_offset_is_ignored() {
        let mut uart = Auart::new();
        uart.write(0x1000, 0xFFFF_FFFF, AccessWidth::Word).unwrap();
        assert_eq!(uart.read(0x1000, AccessWidth::Word).unwrap(), 0);
    }
}
