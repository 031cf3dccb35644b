// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::signals::SignalLine;
use std::fmt::Debug;
use std::sync::{Arc, Mutex};

/// Anything a peripheral interrupt output can be wired to.
pub trait LineTarget: Debug + Send + Sync {
    fn set_level(&self, level: bool);
}

impl LineTarget for SignalLine {
    fn set_level(&self, level: bool) {
        self.drive(level.into());
    }
}

/// Trait representing a vectored interrupt controller with numbered input lines.
pub trait InterruptController: Debug + Send {
    /// Number of input lines.
    fn line_count(&self) -> usize;

    /// Signal the controller that an input line has changed level.
    fn set_line(&mut self, line: usize, level: bool);

    /// Check whether an input line is currently pending.
    fn is_line_raised(&self, line: usize) -> bool;

    /// The vector currently presented to software.
    fn selected_vector(&self) -> u32;

    /// Complete service of the selected vector.
    fn acknowledge(&mut self);
}

/// One input line of a shared interrupt controller.
///
/// This is what board wiring hands to a peripheral so it can drive a
/// controller input without knowing the controller type.
#[derive(Debug)]
pub struct ControllerInput<C: InterruptController> {
    controller: Arc<Mutex<C>>,
    line: usize,
}

impl<C: InterruptController> ControllerInput<C> {
    /// Binds `line` of `controller`. Returns `None` if the controller has no
    /// such input.
    pub fn new(controller: Arc<Mutex<C>>, line: usize) -> Option<Self> {
        let count = match controller.lock() {
            Ok(guard) => guard.line_count(),
            Err(poisoned) => poisoned.get_ref().line_count(),
        };
        (line < count).then_some(Self { controller, line })
    }

    pub fn line(&self) -> usize {
        self.line
    }
}

impl<C: InterruptController> Clone for ControllerInput<C> {
    fn clone(&self) -> Self {
        Self {
            controller: Arc::clone(&self.controller),
            line: self.line,
        }
    }
}

impl<C: InterruptController + 'static> LineTarget for ControllerInput<C> {
    fn set_level(&self, level: bool) {
        match self.controller.lock() {
            Ok(mut controller) => controller.set_line(self.line, level),
            Err(_) => tracing::error!(
                "interrupt controller lock poisoned; dropping level {} on line {}",
                level,
                self.line
            ),
        }
    }
}
