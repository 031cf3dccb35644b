// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::rap::{AccessWidth, RegisterLayout};
use crate::{Peripheral, SimResult};

const USB_WORDS: usize = 0x100 / 4;

/// Identification and capability words of the USB controller.
///
/// Only the first 0x100 bytes are modelled; there is no host controller
/// behind them.
#[derive(Debug, serde::Serialize)]
pub struct Usb {
    #[serde(skip)]
    layout: RegisterLayout,
    regs: Vec<u32>,
}

impl Default for Usb {
    fn default() -> Self {
        Self::new()
    }
}

impl Usb {
    pub fn new() -> Self {
        let mut regs = vec![0; USB_WORDS];
        regs[0x00 >> 2] = 0xE241_FA05; // ID
        regs[0x04 >> 2] = 0x0000_0015; // HWGENERAL
        regs[0x08 >> 2] = 0x1002_0001; // HWHOST
        regs[0x0C >> 2] = 0x0000_000B; // HWDEVICE
        regs[0x10 >> 2] = 0x4006_0910; // HWTXBUF
        regs[0x14 >> 2] = 0x0000_0710; // HWRXBUF
        Self {
            layout: RegisterLayout::PLAIN_WORDS,
            regs,
        }
    }
}

impl Peripheral for Usb {
    fn read(&self, offset: u64, width: AccessWidth) -> SimResult<u32> {
        let field = self.layout.field(offset) as usize;
        match self.regs.get(field) {
            Some(word) => Ok(self.layout.extract(*word, offset, width)),
            None => {
                tracing::warn!("usb: bad read offset {:#x}", offset);
                Ok(0)
            }
        }
    }

    fn write(&mut self, offset: u64, value: u32, width: AccessWidth) -> SimResult<()> {
        let field = self.layout.field(offset) as usize;
        let layout = self.layout;
        match self.regs.get_mut(field) {
            Some(word) => {
                layout.apply(word, offset, value, width);
            }
            None => tracing::warn!("usb: bad write offset {:#x} = {:#x}", offset, value),
        }
        Ok(())
    }

    fn snapshot(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    fn restore(&mut self, state: serde_json::Value) -> SimResult<()> {
        let state: UsbState = serde_json::from_value(state)?;
        if state.regs.len() != USB_WORDS {
            return Err(<serde_json::Error as serde::de::Error>::invalid_length(
                state.regs.len(),
                &"64 USB register words",
            )
            .into());
        }
        self.regs = state.regs;
        Ok(())
    }
}

#[derive(serde::Deserialize)]
struct UsbState {
    regs: Vec<u32>,
}
