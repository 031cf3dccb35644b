// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Register-access protocol shared by every i.MX23 peripheral.
//!
//! Each logical register is visible through several address windows. Which
//! window was hit decides the read-modify-write applied on a write: plain
//! replace, set bits, clear bits or toggle bits. The decode returns the
//! register value from before the write so that handlers can look for edges
//! without a second read.

use serde::{Deserialize, Serialize};

/// Width of a single bus access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessWidth {
    Byte,
    Half,
    Word,
}

impl AccessWidth {
    /// Maps an access size in bytes (1, 2 or 4) to a width.
    pub fn from_bytes(size: u32) -> Option<Self> {
        match size {
            1 => Some(Self::Byte),
            2 => Some(Self::Half),
            4 => Some(Self::Word),
            _ => None,
        }
    }

    pub const fn bytes(self) -> u32 {
        match self {
            Self::Byte => 1,
            Self::Half => 2,
            Self::Word => 4,
        }
    }

    pub const fn mask(self) -> u32 {
        match self {
            Self::Byte => 0xFF,
            Self::Half => 0xFFFF,
            Self::Word => 0xFFFF_FFFF,
        }
    }
}

/// Operation selected by the alias window of an access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AliasOp {
    Write,
    Set,
    Clear,
    Toggle,
}

impl AliasOp {
    /// Decodes an alias region number.
    ///
    /// Regions past the four defined windows only exist in layouts with a
    /// wider selector; they behave as a plain write.
    pub fn from_region(region: u64) -> Self {
        match region {
            1 => Self::Set,
            2 => Self::Clear,
            3 => Self::Toggle,
            _ => Self::Write,
        }
    }

    pub fn apply(self, old: u32, value: u32) -> u32 {
        match self {
            Self::Write => value,
            Self::Set => old | value,
            Self::Clear => old & !value,
            Self::Toggle => old ^ value,
        }
    }
}

/// Address decoding constants of a register bank.
///
/// `field_shift` gives the byte stride between logical registers,
/// `alias_shift` the stride between alias windows of one register and
/// `alias_bits` the width of the window selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterLayout {
    pub field_shift: u32,
    pub alias_shift: u32,
    pub alias_bits: u32,
}

impl RegisterLayout {
    /// The SCT layout used by the i.MX23 blocks: one register every 16 bytes,
    /// with `+0x4` set, `+0x8` clear and `+0xc` toggle windows.
    pub const MXS: Self = Self {
        field_shift: 4,
        alias_shift: 2,
        alias_bits: 2,
    };

    /// Plain word array without alias windows.
    pub const PLAIN_WORDS: Self = Self {
        field_shift: 2,
        alias_shift: 2,
        alias_bits: 0,
    };

    /// Index of the logical register addressed by `offset`.
    pub const fn field(&self, offset: u64) -> u64 {
        offset >> self.field_shift
    }

    pub fn alias(&self, offset: u64) -> AliasOp {
        let selector_mask = (1u64 << self.alias_bits) - 1;
        AliasOp::from_region((offset >> self.alias_shift) & selector_mask)
    }

    /// Applies a write through the alias window selected by `offset` and
    /// returns the register value from before the write.
    ///
    /// Only the byte lanes covered by `width` at `offset & 3` change. An
    /// access that straddles the word end is clipped to the lanes inside it.
    pub fn apply(&self, register: &mut u32, offset: u64, value: u32, width: AccessWidth) -> u32 {
        warn_if_straddling(offset, width);
        let previous = *register;
        let op = self.alias(offset);
        let (mask, lane_value) = lane(offset, value, width);
        *register = (previous & !mask) | (op.apply(previous, lane_value) & mask);
        tracing::trace!(
            "rap {:?} @{:#x}: {:#010x} -> {:#010x}",
            op,
            offset,
            previous,
            *register
        );
        previous
    }

    /// Returns the lane of `word` covered by a read of `width` at `offset`,
    /// clipped at the word end like [`RegisterLayout::apply`].
    pub fn extract(&self, word: u32, offset: u64, width: AccessWidth) -> u32 {
        warn_if_straddling(offset, width);
        let shift = lane_shift(offset);
        (((word as u64) >> shift) as u32) & width.mask()
    }
}

fn warn_if_straddling(offset: u64, width: AccessWidth) {
    if (offset & 3) as u32 + width.bytes() > 4 {
        tracing::warn!(
            "rap: misaligned {:?} access at {:#x} clipped to the register word",
            width,
            offset
        );
    }
}

fn lane_shift(offset: u64) -> u32 {
    ((offset & 3) as u32) * 8
}

fn lane(offset: u64, value: u32, width: AccessWidth) -> (u32, u32) {
    let shift = lane_shift(offset);
    let mask = ((width.mask() as u64) << shift) as u32;
    let lane_value = (((value & width.mask()) as u64) << shift) as u32;
    (mask, lane_value)
}
