use crate::error::{Result, StepStreamError};

/// Per-run tool-call ceiling.
///
/// Every detected tool call is counted. The count is checked after the
/// increment, so with a limit of 5 the first five calls pass and the sixth
/// fails the run.
#[derive(Debug, Clone, Copy)]
pub struct ToolCallGuard {
    count: usize,
    limit: usize,
}

impl ToolCallGuard {
    pub fn new(limit: usize) -> Self {
        Self { count: 0, limit }
    }

    /// Count one tool call, returning the new count.
    pub fn record(&mut self) -> Result<usize> {
        self.count += 1;
        if self.count > self.limit {
            return Err(StepStreamError::ToolCallLimitExceeded { limit: self.limit });
        }
        Ok(self.count)
    }

    pub fn reset(&mut self) {
        self.count = 0;
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn limit(&self) -> usize {
        self.limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sixth_call_trips_a_limit_of_five() {
        let mut guard = ToolCallGuard::new(5);
        for expected in 1..=5 {
            assert_eq!(guard.record().unwrap(), expected);
        }
        let err = guard.record().unwrap_err();
        assert!(matches!(err, StepStreamError::ToolCallLimitExceeded { limit: 5 }));
    }

    #[test]
    fn reset_starts_a_fresh_budget() {
        let mut guard = ToolCallGuard::new(1);
        guard.record().unwrap();
        guard.reset();
        assert_eq!(guard.count(), 0);
        assert_eq!(guard.record().unwrap(), 1);
    }
}
