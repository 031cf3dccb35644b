// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Default schema version for YAML configs
fn default_schema_version() -> String {
    "1.0".to_string()
}

/// Number of input lines on the interrupt collector.
pub const ICOLL_LINES: u32 = 128;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PeripheralConfig {
    pub id: String,
    pub r#type: String, // "icoll", "auart", "usb", "usbphy"
    pub base_address: u64,
    #[serde(default)]
    pub size: Option<String>,
    /// Collector input line the peripheral interrupt is wired to.
    #[serde(default)]
    pub irq: Option<u32>,
    #[serde(default)]
    pub config: HashMap<String, serde_yaml::Value>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ChipDescriptor {
    #[serde(default = "default_schema_version")]
    pub schema_version: String,
    pub name: String,
    pub peripherals: Vec<PeripheralConfig>,
}

impl ChipDescriptor {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read chip descriptor at {:?}", path))?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let chip: Self =
            serde_yaml::from_str(yaml).context("Failed to parse Chip Descriptor YAML")?;
        chip.validate()?;
        Ok(chip)
    }

    pub fn validate(&self) -> Result<()> {
        for p in &self.peripherals {
            if let Some(irq) = p.irq {
                if irq >= ICOLL_LINES {
                    anyhow::bail!(
                        "Peripheral '{}' is wired to collector line {} (valid: 0..{})",
                        p.id,
                        irq,
                        ICOLL_LINES
                    );
                }
            }
            if let Some(size) = &p.size {
                let bytes = parse_size(size).with_context(|| format!("Peripheral '{}'", p.id))?;
                if p.base_address.checked_add(bytes).is_none() {
                    anyhow::bail!(
                        "Peripheral '{}' at {:#x} with size {} runs past the end of the address space",
                        p.id,
                        p.base_address,
                        size
                    );
                }
            }
            if !p.config.is_empty() {
                let mut keys: Vec<&str> = p.config.keys().map(String::as_str).collect();
                keys.sort_unstable();
                tracing::warn!("Peripheral '{}': ignoring config keys {:?}", p.id, keys);
            }
        }
        if let Some(dup) = self
            .peripherals
            .iter()
            .enumerate()
            .find(|(i, p)| self.peripherals[..*i].iter().any(|q| q.id == p.id))
            .map(|(_, p)| p)
        {
            anyhow::bail!("Duplicate peripheral id '{}'", dup.id);
        }
        Ok(())
    }

    pub fn peripheral(&self, id: &str) -> Option<&PeripheralConfig> {
        self.peripherals.iter().find(|p| p.id == id)
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ScriptError {
    #[error("Unsupported schema_version '{0}'. Supported versions: '1.0'")]
    UnsupportedVersion(String),
    #[error("Script has no steps")]
    Empty,
    #[error("Step {step}: access size {size} is not one of 1, 2, 4")]
    BadAccessSize { step: usize, size: u32 },
    #[error("Step {step}: collector line {line} out of range")]
    LineOutOfRange { step: usize, line: u32 },
}

fn default_access_size() -> u32 {
    4
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct RegisterWrite {
    pub address: u64,
    pub value: u32,
    #[serde(default = "default_access_size")]
    pub size: u32,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct RegisterRead {
    pub address: u64,
    #[serde(default = "default_access_size")]
    pub size: u32,
    #[serde(default)]
    pub expect: Option<u32>,
    #[serde(default)]
    pub mask: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LineLevel {
    pub line: u32,
    pub level: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct WriteStep {
    pub write: RegisterWrite,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct ReadStep {
    pub read: RegisterRead,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct SetLineStep {
    pub set_line: LineLevel,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct ExpectIrqStep {
    pub expect_irq: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct ExpectFiqStep {
    pub expect_fiq: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(untagged)]
pub enum ScriptStep {
    Write(WriteStep),
    Read(ReadStep),
    SetLine(SetLineStep),
    ExpectIrq(ExpectIrqStep),
    ExpectFiq(ExpectFiqStep),
}

/// Ordered register accesses and checks run against a board.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct RegisterScript {
    pub schema_version: String,
    /// Chip descriptor, relative to the script. The built-in i.MX23 map is
    /// used when absent.
    #[serde(default)]
    pub chip: Option<String>,
    pub steps: Vec<ScriptStep>,
}

impl RegisterScript {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read register script at {:?}", path.as_ref()))?;
        Self::from_yaml(&contents)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let script: Self =
            serde_yaml::from_str(yaml).context("Failed to parse Register Script YAML")?;
        script.validate()?;
        Ok(script)
    }

    pub fn validate(&self) -> std::result::Result<(), ScriptError> {
        if self.schema_version != "1.0" {
            return Err(ScriptError::UnsupportedVersion(self.schema_version.clone()));
        }
        if self.steps.is_empty() {
            return Err(ScriptError::Empty);
        }
        for (step, s) in self.steps.iter().enumerate() {
            let size = match s {
                ScriptStep::Write(w) => Some(w.write.size),
                ScriptStep::Read(r) => Some(r.read.size),
                ScriptStep::SetLine(l) => {
                    if l.set_line.line >= ICOLL_LINES {
                        return Err(ScriptError::LineOutOfRange {
                            step,
                            line: l.set_line.line,
                        });
                    }
                    None
                }
                ScriptStep::ExpectIrq(_) | ScriptStep::ExpectFiq(_) => None,
            };
            if let Some(size) = size {
                if !matches!(size, 1 | 2 | 4) {
                    return Err(ScriptError::BadAccessSize { step, size });
                }
            }
        }
        Ok(())
    }
}

pub fn parse_size(size_str: &str) -> Result<u64> {
    use human_size::{Byte, Size, SpecificSize};
    let s: Size = size_str
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid size format: {}", e))?;
    let bytes: SpecificSize<Byte> = s.into();
    Ok(bytes.value() as u64)
}
