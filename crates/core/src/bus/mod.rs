// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::rap::AccessWidth;
use crate::{Peripheral, SimResult, SimulationError};
use std::collections::HashMap;

pub struct PeripheralEntry {
    pub name: String,
    pub base: u64,
    pub size: u64,
    /// Collector input the peripheral's interrupt output is wired to.
    pub irq: Option<u32>,
    pub dev: Box<dyn Peripheral>,
}

impl PeripheralEntry {
    fn contains(&self, addr: u64) -> bool {
        addr >= self.base && addr - self.base < self.size
    }

    /// One past the last byte of the window, if it fits the address space.
    fn end(&self) -> Option<u64> {
        self.base.checked_add(self.size)
    }
}

/// Routes physical addresses to peripheral register windows.
#[derive(Default)]
pub struct SystemBus {
    pub peripherals: Vec<PeripheralEntry>,
}

impl SystemBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Maps a peripheral. Fails if its window wraps past the end of the
    /// address space or overlaps an existing one.
    pub fn map(&mut self, entry: PeripheralEntry) -> anyhow::Result<()> {
        let end = entry.end().ok_or_else(|| {
            anyhow::anyhow!(
                "Peripheral '{}' at {:#x} with size {:#x} runs past the end of the address space",
                entry.name,
                entry.base,
                entry.size
            )
        })?;
        if let Some(other) = self
            .peripherals
            .iter()
            .find(|p| p.end().is_some_and(|p_end| entry.base < p_end && p.base < end))
        {
            anyhow::bail!(
                "Peripheral '{}' at {:#x} overlaps '{}' at {:#x}",
                entry.name,
                entry.base,
                other.name,
                other.base
            );
        }
        tracing::info!(
            "Mapped {} at {:#x}..{:#x}",
            entry.name,
            entry.base,
            end
        );
        self.peripherals.push(entry);
        Ok(())
    }

    fn entry(&self, addr: u64) -> SimResult<&PeripheralEntry> {
        self.peripherals
            .iter()
            .find(|p| p.contains(addr))
            .ok_or(SimulationError::MemoryViolation(addr))
    }

    pub fn read(&self, addr: u64, width: AccessWidth) -> SimResult<u32> {
        let p = self.entry(addr)?;
        let value = p.dev.read(addr - p.base, width)?;
        tracing::trace!("{} read {:#x} ({:?}) = {:#x}", p.name, addr, width, value);
        Ok(value)
    }

    pub fn write(&mut self, addr: u64, value: u32, width: AccessWidth) -> SimResult<()> {
        let p = self
            .peripherals
            .iter_mut()
            .find(|p| p.contains(addr))
            .ok_or(SimulationError::MemoryViolation(addr))?;
        tracing::trace!("{} write {:#x} ({:?}) = {:#x}", p.name, addr, width, value);
        p.dev.write(addr - p.base, value, width)
    }

    /// Access with a size in bytes, as handed over by a CPU model.
    pub fn read_sized(&self, addr: u64, size: u32) -> SimResult<u32> {
        let width =
            AccessWidth::from_bytes(size).ok_or(SimulationError::BadAccessSize { addr, size })?;
        self.read(addr, width)
    }

    pub fn write_sized(&mut self, addr: u64, value: u32, size: u32) -> SimResult<()> {
        let width =
            AccessWidth::from_bytes(size).ok_or(SimulationError::BadAccessSize { addr, size })?;
        self.write(addr, value, width)
    }

    pub fn read_u32(&self, addr: u64) -> SimResult<u32> {
        self.read(addr, AccessWidth::Word)
    }

    pub fn write_u32(&mut self, addr: u64, value: u32) -> SimResult<()> {
        self.write(addr, value, AccessWidth::Word)
    }

    pub fn peek_peripheral(&self, name: &str) -> Option<serde_json::Value> {
        self.peripherals
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.dev.snapshot())
    }

    pub fn snapshot(&self) -> HashMap<String, serde_json::Value> {
        self.peripherals
            .iter()
            .map(|p| (p.name.clone(), p.dev.snapshot()))
            .collect()
    }

    pub fn restore(&mut self, snapshot: &HashMap<String, serde_json::Value>) -> SimResult<()> {
        for p in &mut self.peripherals {
            if let Some(state) = snapshot.get(&p.name) {
                p.dev.restore(state.clone())?;
            }
        }
        Ok(())
    }
}
