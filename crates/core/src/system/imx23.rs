// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! i.MX23 board assembly: one factory per peripheral kind plus the wiring of
//! peripheral interrupt outputs to collector inputs.

use crate::bus::{PeripheralEntry, SystemBus};
use crate::interrupt::LineTarget;
use crate::peripherals::auart::Auart;
use crate::peripherals::icoll::{Icoll, IcollPort, SharedIcoll};
use crate::peripherals::usb::Usb;
use crate::peripherals::usbphy::UsbPhy;
use crate::signals::SignalLine;
use crate::{Peripheral, SimResult, SimulationError};
use imx23_config::{parse_size, ChipDescriptor, PeripheralConfig};
use std::sync::{Arc, Mutex, MutexGuard};

pub const ICOLL_BASE: u64 = 0x8000_0000;
pub const AUART0_BASE: u64 = 0x8006_C000;
pub const AUART1_BASE: u64 = 0x8006_E000;
pub const USBPHY_BASE: u64 = 0x8007_C000;
pub const USB_BASE: u64 = 0x8008_0000;

pub const AUART0_IRQ: u32 = 112;
pub const AUART1_IRQ: u32 = 115;

const DEFAULT_WINDOW: u64 = 0x2000;

pub fn create_icoll() -> IcollPort {
    IcollPort::new(Arc::new(Mutex::new(Icoll::new())))
}

/// Application UART with its interrupt output wired to `irq`, if any.
pub fn create_auart(irq: Option<Box<dyn LineTarget>>) -> Auart {
    let mut uart = Auart::new();
    if let Some(irq) = irq {
        uart.connect_irq(irq);
    }
    uart
}

pub fn create_usb() -> Usb {
    Usb::new()
}

pub fn create_usbphy() -> UsbPhy {
    UsbPhy::new()
}

fn peripheral(id: &str, kind: &str, base: u64, size: &str, irq: Option<u32>) -> PeripheralConfig {
    PeripheralConfig {
        id: id.to_string(),
        r#type: kind.to_string(),
        base_address: base,
        size: Some(size.to_string()),
        irq,
        config: Default::default(),
    }
}

/// The i.MX23 peripherals this crate models, at their reference-manual
/// addresses.
pub fn default_chip() -> ChipDescriptor {
    ChipDescriptor {
        schema_version: "1.0".to_string(),
        name: "imx23".to_string(),
        peripherals: vec![
            peripheral("icoll", "icoll", ICOLL_BASE, "8 KiB", None),
            peripheral("auart0", "auart", AUART0_BASE, "8 KiB", Some(AUART0_IRQ)),
            peripheral("auart1", "auart", AUART1_BASE, "8 KiB", Some(AUART1_IRQ)),
            peripheral("usbphy", "usbphy", USBPHY_BASE, "8 KiB", None),
            peripheral("usb", "usb", USB_BASE, "256 B", None),
        ],
    }
}

/// Peripherals on the system bus, the collector they signal and its two
/// outputs towards the CPU.
pub struct Imx23Board {
    pub bus: SystemBus,
    pub icoll: SharedIcoll,
    pub irq: SignalLine,
    pub fiq: SignalLine,
}

impl Imx23Board {
    pub fn new() -> anyhow::Result<Self> {
        Self::from_config(&default_chip())
    }

    pub fn from_config(chip: &ChipDescriptor) -> anyhow::Result<Self> {
        let mut collectors = chip.peripherals.iter().filter(|p| p.r#type == "icoll");
        let icoll_cfg = collectors
            .next()
            .ok_or_else(|| anyhow::anyhow!("Chip '{}' has no icoll peripheral", chip.name))?;
        if let Some(extra) = collectors.next() {
            anyhow::bail!(
                "Chip '{}' declares a second icoll '{}'; only one collector is supported",
                chip.name,
                extra.id
            );
        }

        let port = create_icoll();
        let icoll = Arc::clone(port.shared());
        let (irq, fiq) = {
            let guard = port.shared().lock().map_err(|_| SimulationError::Poisoned("icoll"))?;
            (guard.irq_output(), guard.fiq_output())
        };

        let mut bus = SystemBus::new();
        bus.map(PeripheralEntry {
            name: icoll_cfg.id.clone(),
            base: icoll_cfg.base_address,
            size: window_size(icoll_cfg)?,
            irq: None,
            dev: Box::new(port.clone()),
        })?;

        for p_cfg in chip.peripherals.iter().filter(|p| p.r#type != "icoll") {
            let input = match p_cfg.irq {
                Some(line) => Some(port.input(line as usize)?),
                None => None,
            };
            let dev: Box<dyn Peripheral> = match p_cfg.r#type.as_str() {
                "auart" => Box::new(create_auart(
                    input.map(|i| Box::new(i) as Box<dyn LineTarget>),
                )),
                "usb" => Box::new(create_usb()),
                "usbphy" => Box::new(create_usbphy()),
                other => {
                    tracing::warn!(
                        "Unsupported peripheral type '{}' for id '{}'; skipping",
                        other,
                        p_cfg.id
                    );
                    continue;
                }
            };
            if p_cfg.irq.is_some() && p_cfg.r#type != "auart" {
                tracing::warn!("'{}' has no interrupt source; irq not wired", p_cfg.id);
            }

            bus.map(PeripheralEntry {
                name: p_cfg.id.clone(),
                base: p_cfg.base_address,
                size: window_size(p_cfg)?,
                irq: p_cfg.irq,
                dev,
            })?;
        }

        tracing::info!(
            "Built board '{}' with {} peripherals",
            chip.name,
            bus.peripherals.len()
        );
        Ok(Self {
            bus,
            icoll,
            irq,
            fiq,
        })
    }

    pub fn icoll(&self) -> SimResult<MutexGuard<'_, Icoll>> {
        self.icoll
            .lock()
            .map_err(|_| SimulationError::Poisoned("icoll"))
    }

    /// Drives collector input `line` directly, as an external source would.
    pub fn set_line(&self, line: usize, level: bool) -> SimResult<()> {
        if line >= crate::peripherals::icoll::LINE_COUNT {
            return Err(SimulationError::InvalidLine(line));
        }
        self.icoll()?.set_line(line, level);
        Ok(())
    }
}

fn window_size(p_cfg: &PeripheralConfig) -> anyhow::Result<u64> {
    match &p_cfg.size {
        Some(size) => parse_size(size),
        None => Ok(DEFAULT_WINDOW),
    }
}
