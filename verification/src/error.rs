use lifecert_liveness::LivenessError;
use lifecert_recognition::RecognitionError;
use lifecert_store::StoreError;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("participant {0} not found")]
    ParticipantNotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("liveness check unavailable: {0}")]
    Liveness(#[from] LivenessError),

    #[error("recognition engine failed: {0}")]
    Recognition(#[from] RecognitionError),

    /// A store write failed after the remote engine already accepted the
    /// request; the two sides now disagree.
    #[error("inconsistent state: {0}")]
    Inconsistent(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Coarse classification callers map to their own responses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    Dependency,
    Inconsistency,
    Store,
}

impl ServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::ParticipantNotFound(_) => ErrorKind::NotFound,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::Liveness(_) | Self::Recognition(_) => ErrorKind::Dependency,
            Self::Inconsistent(_) => ErrorKind::Inconsistency,
            Self::Store(_) => ErrorKind::Store,
        }
    }

    /// A collaborator failed; no attempt was recorded.
    pub fn is_dependency_failure(&self) -> bool {
        self.kind() == ErrorKind::Dependency
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds() {
        assert_eq!(
            ServiceError::Validation("x".into()).kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            ServiceError::from(StoreError::Backend("io".into())).kind(),
            ErrorKind::Store
        );
        let dep = ServiceError::from(RecognitionError::Timeout("slow".into()));
        assert!(dep.is_dependency_failure());
        assert!(ServiceError::from(LivenessError::Unavailable("down".into())).is_dependency_failure());
        assert!(!ServiceError::Conflict("x".into()).is_dependency_failure());
    }

    #[test]
    fn kind_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&ErrorKind::NotFound).unwrap(),
            "\"not_found\""
        );
    }
}
