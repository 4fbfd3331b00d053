use thiserror::Error;

/// The liveness check could not produce a verdict.
///
/// A failed check is a [`LivenessVerdict`](crate::LivenessVerdict) with
/// `passed == false`, not an error.
#[derive(Debug, Error)]
pub enum LivenessError {
    #[error("liveness detector unavailable: {0}")]
    Unavailable(String),
}
