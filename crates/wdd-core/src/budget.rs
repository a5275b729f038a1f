use crate::error::AppError;

/// Capture-failure counter scoped to a single job execution.
///
/// Created fresh at the start of every job and owned by that job's call
/// frame; it is never stored on a worker or shared between jobs.
#[derive(Debug)]
pub struct ErrorBudget {
    failures: u32,
    max_errors: u32,
}

impl ErrorBudget {
    pub fn new(max_errors: u32) -> Self {
        Self {
            failures: 0,
            max_errors: max_errors.max(1),
        }
    }

    /// Record one capture failure.
    ///
    /// Returns [`AppError::BudgetExceeded`] once the failure count reaches
    /// the maximum.
    pub fn record_failure(&mut self) -> Result<(), AppError> {
        self.failures += 1;
        if self.failures >= self.max_errors {
            Err(AppError::BudgetExceeded {
                failures: self.failures,
                max_errors: self.max_errors,
            })
        } else {
            Ok(())
        }
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }

    pub fn remaining(&self) -> u32 {
        self.max_errors.saturating_sub(self.failures)
    }
}
