use thiserror::Error;
use uuid::Uuid;

use crate::domain::{ArtifactKey, RunStatus};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    #[error("Artifact already recorded: {0}")]
    DuplicateArtifact(ArtifactKey),

    #[error("Run {0} is terminal and can no longer be modified")]
    RunTerminal(Uuid),

    #[error("Invalid run status transition from {from} to {to}")]
    InvalidStatusTransition { from: RunStatus, to: RunStatus },

    #[error("Validation error: {0}")]
    Validation(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let id = Uuid::new_v4();
        let error = CoreError::RunTerminal(id);
        assert!(error.to_string().contains(&id.to_string()));

        let error = CoreError::InvalidStatusTransition {
            from: RunStatus::Succeeded,
            to: RunStatus::Running,
        };
        assert_eq!(
            error.to_string(),
            "Invalid run status transition from succeeded to running"
        );
    }
}
