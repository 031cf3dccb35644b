// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

pub mod auart;
pub mod icoll;
pub mod usb;
pub mod usbphy;

use crate::rap::{AccessWidth, RegisterLayout};

bitflags::bitflags! {
    /// Soft-reset bits at the top of every i.MX23 block control register.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct BlockCtrl: u32 {
        const SFTRST = 1 << 31;
        const CLKGATE = 1 << 30;
    }
}

/// Returns true when a control write moved SFTRST from 0 to 1 and changed
/// nothing else.
pub fn soft_reset_edge(previous: u32, current: u32) -> bool {
    (previous ^ current) == BlockCtrl::SFTRST.bits() && previous & BlockCtrl::SFTRST.bits() == 0
}

/// Block control register with the SFTRST/CLKGATE handshake.
///
/// Drivers reset a block by setting SFTRST and then polling until CLKGATE
/// reads back as set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct BlockControl {
    pub value: u32,
    /// Set by the last write if it forced CLKGATE.
    pub clock_gate_forced: bool,
}

impl BlockControl {
    pub const fn new(value: u32) -> Self {
        Self {
            value,
            clock_gate_forced: false,
        }
    }

    /// Decodes a write through `layout` and applies the soft-reset side effect.
    /// Returns the value from before the write.
    pub fn write(
        &mut self,
        layout: &RegisterLayout,
        offset: u64,
        value: u32,
        width: AccessWidth,
    ) -> u32 {
        let previous = layout.apply(&mut self.value, offset, value, width);
        self.clock_gate_forced = soft_reset_edge(previous, self.value);
        if self.clock_gate_forced {
            tracing::debug!("soft reset requested, gating clock");
            self.value |= BlockCtrl::CLKGATE.bits();
        }
        previous
    }

    pub fn flags(&self) -> BlockCtrl {
        BlockCtrl::from_bits_truncate(self.value)
    }
}
