//! The verification ledger: an append-only log of attempts per participant.

use crate::StoreError;
use lifecert_types::{AttemptId, AttemptStatus, ParticipantId, Timestamp};
use serde::{Deserialize, Serialize};

/// One recorded verification attempt. Never modified after it is appended.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VerificationAttempt {
    pub id: AttemptId,
    pub participant_id: ParticipantId,
    pub status: AttemptStatus,
    pub distance: Option<f64>,
    pub similarity: Option<f64>,
    pub verified_at: Timestamp,
    /// Liveness failure reason for `REVIEW` outcomes.
    pub notes: Option<String>,
}

pub trait AttemptLedger {
    fn append_attempt(&self, attempt: &VerificationAttempt) -> Result<(), StoreError>;

    /// Attempt with the greatest `verified_at`; among equal times, the last appended.
    fn latest_attempt(
        &self,
        participant: &ParticipantId,
    ) -> Result<Option<VerificationAttempt>, StoreError>;

    /// Full history ordered by `verified_at`, ties in append order.
    fn attempts_for(
        &self,
        participant: &ParticipantId,
    ) -> Result<Vec<VerificationAttempt>, StoreError>;
}
