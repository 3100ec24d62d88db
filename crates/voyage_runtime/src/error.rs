use thiserror::Error;
use voyage_core::{FailureKind, StageError};

/// Failure of a single collaborator call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CollaboratorError {
    #[error("{service} service timed out after {budget_ms} ms")]
    Timeout { service: &'static str, budget_ms: u64 },
    #[error("{service} service unavailable: {reason}")]
    Unavailable { service: &'static str, reason: String },
    #[error("{0}")]
    NotFound(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("{service} call cancelled")]
    Cancelled { service: &'static str },
}

impl CollaboratorError {
    /// Worth retrying on a later scheduler pass.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Unavailable { .. })
    }

    pub fn kind(&self) -> FailureKind {
        if self.is_transient() {
            FailureKind::Transient
        } else {
            FailureKind::Permanent
        }
    }

    pub fn to_stage_error(&self) -> StageError {
        StageError::new(self.to_string(), self.kind())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeouts_and_outages_are_transient() {
        let timeout = CollaboratorError::Timeout {
            service: "weather",
            budget_ms: 30_000,
        };
        assert!(timeout.is_transient());
        assert_eq!(timeout.to_string(), "weather service timed out after 30000 ms");
        assert!(CollaboratorError::Unavailable {
            service: "ports",
            reason: "503".to_string(),
        }
        .is_transient());
    }

    #[test]
    fn test_cancellation_is_permanent() {
        let error = CollaboratorError::Cancelled { service: "route" };
        assert_eq!(error.kind(), FailureKind::Permanent);
        assert_eq!(error.to_stage_error().kind, FailureKind::Permanent);
        assert!(!CollaboratorError::NotFound("no route".to_string()).is_transient());
    }
}
