// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Represents a digital signal level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DigitalLevel {
    #[default]
    Low,
    High,
}

impl From<bool> for DigitalLevel {
    fn from(b: bool) -> Self {
        if b {
            DigitalLevel::High
        } else {
            DigitalLevel::Low
        }
    }
}

impl From<DigitalLevel> for bool {
    fn from(level: DigitalLevel) -> Self {
        match level {
            DigitalLevel::High => true,
            DigitalLevel::Low => false,
        }
    }
}

/// A level-driven output shared between its driver and any number of readers.
///
/// Clones observe the same level. Only the owning model is expected to call
/// [`SignalLine::drive`]; consumers such as the CPU interrupt input just read.
#[derive(Debug, Clone, Default)]
pub struct SignalLine {
    level: Arc<AtomicBool>,
}

impl SignalLine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the level and returns true if it changed.
    pub fn drive(&self, level: DigitalLevel) -> bool {
        let high: bool = level.into();
        self.level.swap(high, Ordering::SeqCst) != high
    }

    pub fn level(&self) -> DigitalLevel {
        self.level.load(Ordering::SeqCst).into()
    }

    pub fn is_high(&self) -> bool {
        self.level.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digital_level_conversion() {
        assert_eq!(DigitalLevel::from(true), DigitalLevel::High);
        let b: bool = DigitalLevel::Low.into();
        assert!(!b);
    }

    #[test]
    fn test_signal_line_is_shared() {
        let line = SignalLine::new();
        let reader = line.clone();
        assert_eq!(reader.level(), DigitalLevel::Low);

        assert!(line.drive(DigitalLevel::High));
        assert!(reader.is_high());
        assert!(!line.drive(DigitalLevel::High));

        assert!(line.drive(DigitalLevel::Low));
        assert!(!reader.is_high());
    }
}
