//! Post-hoc phase budget checks.

use std::time::Duration;

use crate::violation::Violation;

/// Flags phases that ran longer than the configured budget.
///
/// Checks happen after a phase completes; nothing is ever cancelled.
#[derive(Debug, Clone, Copy)]
pub struct TimingBudgetEnforcer {
    budget: Duration,
}

impl TimingBudgetEnforcer {
    /// Creates an enforcer with the given per-phase budget.
    pub const fn new(budget: Duration) -> Self {
        Self { budget }
    }

    /// Violation if the write phase exceeded the budget.
    pub fn check_write(&self, elapsed: Duration) -> Option<Violation> {
        self.exceeded(elapsed).then(|| Violation::WritingTimeExceeded {
            elapsed_ms: elapsed.as_millis() as u64,
            budget_ms: self.budget.as_millis() as u64,
        })
    }

    /// Violation if the read phase exceeded the budget.
    pub fn check_read(&self, elapsed: Duration) -> Option<Violation> {
        self.exceeded(elapsed).then(|| Violation::ReadingTimeExceeded {
            elapsed_ms: elapsed.as_millis() as u64,
            budget_ms: self.budget.as_millis() as u64,
        })
    }

    fn exceeded(&self, elapsed: Duration) -> bool {
        elapsed > self.budget
    }
}
