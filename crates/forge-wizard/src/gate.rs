//! Step navigation
//!
//! Moving forward with [`StepGate::next`] runs the current step's validator.
//! Moving back and jumping with [`GotoMode::BypassValidation`] never do.
//! A failed validation is reported as [`Advance::Blocked`], not as an error.

use std::sync::Arc;

use forge_entity::Entity;
use serde::{Deserialize, Serialize};

use crate::step::{Phase, StepCatalog, StepDef};

/// Errors raised by navigation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GateError {
    /// Target step does not exist
    #[error("step {step} is outside 1..={last}")]
    OutOfRange {
        /// Requested step
        step: usize,
        /// Last step of the catalog
        last: usize,
    },

    /// Commit attempted before the last step
    #[error("commit is only available at step {last} (currently at {current})")]
    NotAtFinalStep {
        /// Current step
        current: usize,
        /// Last step of the catalog
        last: usize,
    },
}

/// Outcome of a forward move
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Advance {
    /// Now at this step
    Moved(usize),
    /// This step's validator refused; position unchanged
    Blocked(usize),
    /// Already at the last step
    AtEnd,
}

/// How [`StepGate::goto`] treats validators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GotoMode {
    /// Jump unconditionally
    #[default]
    BypassValidation,
    /// Jump only if every step before the target passes
    Validated,
}

/// Position of a phase relative to the current step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PhaseStatus {
    /// All steps behind
    Past,
    /// Contains the current step
    Active,
    /// All steps ahead
    Upcoming,
}

/// Current step over a [`StepCatalog`]
#[derive(Debug, Clone)]
pub struct StepGate {
    catalog: Arc<StepCatalog>,
    current: usize,
}

impl StepGate {
    /// Gate positioned at step 1
    #[must_use]
    pub fn new(catalog: Arc<StepCatalog>) -> Self {
        Self {
            catalog,
            current: 1,
        }
    }

    /// Steps being navigated
    #[inline]
    #[must_use]
    pub fn catalog(&self) -> &StepCatalog {
        &self.catalog
    }

    /// Current 1-based step
    #[inline]
    #[must_use]
    pub fn current(&self) -> usize {
        self.current
    }

    /// Definition of the current step
    #[must_use]
    pub fn current_step(&self) -> Option<&StepDef> {
        self.catalog.get(self.current)
    }

    /// Last step number
    #[inline]
    #[must_use]
    pub fn last(&self) -> usize {
        self.catalog.len()
    }

    /// Whether the current step is the last one
    #[inline]
    #[must_use]
    pub fn is_final(&self) -> bool {
        self.current >= self.last()
    }

    /// Whether `entity` may move past the current step
    #[must_use]
    pub fn can_advance(&self, entity: &Entity) -> bool {
        self.catalog.can_advance(self.current, entity)
    }

    /// Validated forward move
    pub fn next(&mut self, entity: &Entity) -> Advance {
        if self.is_final() {
            return Advance::AtEnd;
        }
        if !self.can_advance(entity) {
            tracing::debug!(step = self.current, "advance blocked by validator");
            return Advance::Blocked(self.current);
        }
        self.current += 1;
        Advance::Moved(self.current)
    }

    /// Step back, stopping at 1
    pub fn prev(&mut self) -> usize {
        self.current = self.current.saturating_sub(1).max(1);
        self.current
    }

    /// Jump to `step`
    ///
    /// With [`GotoMode::Validated`] the jump is refused with
    /// [`Advance::Blocked`] naming the first step before `step` whose
    /// validator fails.
    ///
    /// # Errors
    /// [`GateError::OutOfRange`] if `step` is not in the catalog
    pub fn goto(&mut self, step: usize, mode: GotoMode, entity: &Entity) -> Result<Advance, GateError> {
        if step == 0 || step > self.last() {
            return Err(GateError::OutOfRange {
                step,
                last: self.last(),
            });
        }
        if mode == GotoMode::Validated {
            if let Some(blocker) = (1..step).find(|&s| !self.catalog.can_advance(s, entity)) {
                return Ok(Advance::Blocked(blocker));
            }
        }
        self.current = step;
        Ok(Advance::Moved(step))
    }

    /// Check that a commit is allowed from here
    ///
    /// # Errors
    /// [`GateError::NotAtFinalStep`] before the last step
    pub fn ensure_final(&self) -> Result<(), GateError> {
        if self.is_final() {
            Ok(())
        } else {
            Err(GateError::NotAtFinalStep {
                current: self.current,
                last: self.last(),
            })
        }
    }

    /// Where `phase` sits relative to the current step
    ///
    /// Phases without steps count as upcoming.
    #[must_use]
    pub fn phase_status(&self, phase: Phase) -> PhaseStatus {
        match self.catalog.phase_range(phase) {
            Some(range) if range.contains(&self.current) => PhaseStatus::Active,
            Some(range) if *range.end() < self.current => PhaseStatus::Past,
            _ => PhaseStatus::Upcoming,
        }
    }

    /// Status of every phase in display order
    #[must_use]
    pub fn phase_statuses(&self) -> Vec<(Phase, PhaseStatus)> {
        Phase::ALL
            .iter()
            .map(|&phase| (phase, self.phase_status(phase)))
            .collect()
    }

    /// Completion percentage, `current / last` rounded to the nearest integer
    #[must_use]
    pub fn progress(&self) -> u8 {
        let last = self.last();
        if last == 0 {
            return 0;
        }
        let percent = (self.current * 100 + last / 2) / last;
        u8::try_from(percent.min(100)).unwrap_or(100)
    }
}
