use crate::surface::SurfaceError;

/// What the crawl loop should do about a surface failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Transient interaction failure; retry against the shared budget.
    Retryable,
    /// The session is unusable; abort the crawl with partial results.
    Fatal,
    /// Absence or per-candidate failure; skip and move on.
    Ignorable,
}

/// Pure classification of a surface failure.
///
/// Timeouts classify as Ignorable: an expired bounded wait means the
/// thing never appeared, which at field and candidate level is absence.
/// The one fatal timeout, the initial results container never
/// materializing, is special-cased by the controller before this
/// classifier is ever consulted.
pub fn classify(err: &SurfaceError) -> FailureClass {
    match err {
        SurfaceError::Obstructed(_) | SurfaceError::StaleHandle => FailureClass::Retryable,
        SurfaceError::Timeout { .. } => FailureClass::Ignorable,
        SurfaceError::SessionLost(_) => FailureClass::Fatal,
    }
}

/// Shared per-crawl budget for Retryable failures.
///
/// Exhaustion does not abort the crawl; the controller downgrades the
/// failure to Ignorable (candidate work) or counts a stall (pagination).
#[derive(Debug)]
pub struct RetryBudget {
    remaining: u32,
}

impl RetryBudget {
    pub const DEFAULT_BUDGET: u32 = 3;

    pub fn new(budget: u32) -> Self {
        Self { remaining: budget }
    }

    /// Take one retry from the budget; false when exhausted.
    pub fn consume(&mut self) -> bool {
        if self.remaining == 0 {
            return false;
        }
        self.remaining -= 1;
        true
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }
}

impl Default for RetryBudget {
    fn default() -> Self {
        Self::new(Self::DEFAULT_BUDGET)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_classification() {
        assert_eq!(
            classify(&SurfaceError::Obstructed("overlay".into())),
            FailureClass::Retryable
        );
        assert_eq!(classify(&SurfaceError::StaleHandle), FailureClass::Retryable);
        assert_eq!(
            classify(&SurfaceError::Timeout {
                selector: "h1".into(),
                waited: Duration::from_secs(5),
            }),
            FailureClass::Ignorable
        );
        assert_eq!(
            classify(&SurfaceError::SessionLost("browser exited".into())),
            FailureClass::Fatal
        );
    }

    #[test]
    fn test_budget_exhaustion() {
        let mut budget = RetryBudget::default();
        assert!(budget.consume());
        assert!(budget.consume());
        assert!(budget.consume());
        assert!(!budget.consume());
        assert!(!budget.consume());
        assert_eq!(budget.remaining(), 0);
    }
}
