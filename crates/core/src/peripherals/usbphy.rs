// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::peripherals::BlockControl;
use crate::rap::{AccessWidth, RegisterLayout};
use crate::{Peripheral, SimResult};

const HW_USBPHY_PWD: u64 = 0x0;
const HW_USBPHY_CTRL: u64 = 0x3;
const FIELD_COUNT: usize = 10;

/// i.MX23 USB PHY register shell.
#[derive(Debug, serde::Serialize)]
pub struct UsbPhy {
    #[serde(skip)]
    layout: RegisterLayout,
    regs: [u32; FIELD_COUNT],
    ctrl: BlockControl,
}

impl Default for UsbPhy {
    fn default() -> Self {
        Self::new()
    }
}

impl UsbPhy {
    pub fn new() -> Self {
        let mut regs = [0; FIELD_COUNT];
        regs[HW_USBPHY_PWD as usize] = 0x0086_0607;
        Self {
            layout: RegisterLayout::MXS,
            regs,
            ctrl: BlockControl::new(0xC000_0000),
        }
    }

    pub fn control(&self) -> &BlockControl {
        &self.ctrl
    }
}

impl Peripheral for UsbPhy {
    fn read(&self, offset: u64, width: AccessWidth) -> SimResult<u32> {
        let word = match self.layout.field(offset) {
            HW_USBPHY_CTRL => self.ctrl.value,
            field if (field as usize) < FIELD_COUNT => self.regs[field as usize],
            _ => {
                tracing::warn!("usbphy: bad read offset {:#x}", offset);
                return Ok(0);
            }
        };
        Ok(self.layout.extract(word, offset, width))
    }

    fn write(&mut self, offset: u64, value: u32, width: AccessWidth) -> SimResult<()> {
        let layout = self.layout;
        match layout.field(offset) {
            HW_USBPHY_CTRL => {
                self.ctrl.write(&layout, offset, value, width);
            }
            field if (field as usize) < FIELD_COUNT => {
                layout.apply(&mut self.regs[field as usize], offset, value, width);
            }
            _ => tracing::warn!("usbphy: bad write offset {:#x} = {:#x}", offset, value),
        }
        Ok(())
    }

    fn as_any(&self) -> Option<&dyn std::any::Any> {
        Some(self)
    }

    fn snapshot(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    fn restore(&mut self, state: serde_json::Value) -> SimResult<()> {
        let state: UsbPhyState = serde_json::from_value(state)?;
        self.regs = state.regs;
        self.ctrl = state.ctrl;
        Ok(())
    }
}

#[derive(serde::Deserialize)]
struct UsbPhyState {
    regs: [u32; FIELD_COUNT],
    ctrl: BlockControl,
}
