// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

pub mod bus;
pub mod interrupt;
pub mod peripherals;
pub mod rap;
pub mod signals;
pub mod system;

use std::any::Any;

pub use rap::AccessWidth;


#[derive(Debug, thiserror::Error)]
pub enum SimulationError {
    #[error("Memory access violation at {0:#x}")]
    MemoryViolation(u64),
    #[error("Unsupported access size {size} at {addr:#x}")]
    BadAccessSize { addr: u64, size: u32 },
    #[error("Interrupt line {0} is not wired to any collector input")]
    InvalidLine(usize),
    #[error("State of {0} is poisoned by an earlier panic")]
    Poisoned(&'static str),
    #[error("Invalid snapshot: {0}")]
    Snapshot(#[from] serde_json::Error),
}

pub type SimResult<T> = Result<T, SimulationError>;

/// Trait representing a memory-mapped peripheral.
///
/// Offsets are relative to the peripheral's base address. Accesses to
/// offsets the device does not decode are reported and read as zero; they
/// never fail.
pub trait Peripheral: std::fmt::Debug + Send {
    fn read(&self, offset: u64, width: AccessWidth) -> SimResult<u32>;
    fn write(&mut self, offset: u64, value: u32, width: AccessWidth) -> SimResult<()>;
    fn as_any(&self) -> Option<&dyn Any> {
        None
    }
    fn as_any_mut(&mut self) -> Option<&mut dyn Any> {
        None
    }
    fn snapshot(&self) -> serde_json::Value {
        serde_json::Value::Null
    }
    fn restore(&mut self, _state: serde_json::Value) -> SimResult<()> {
        Ok(())
    }
}
