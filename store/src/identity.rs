//! Label → participant mappings ("biometric identities").
//!
//! This indirection is what lets a participant be recognised under more than
//! one remote label: the label on the participant record is only the one bound
//! at registration, later aliases exist only here.

use crate::StoreError;
use lifecert_types::{BiometricLabel, ExternalRef, ParticipantId, Timestamp};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BiometricIdentity {
    /// Primary key.
    pub label: BiometricLabel,
    pub participant_id: ParticipantId,
    pub external_ref: ExternalRef,
    pub created_at: Timestamp,
}

pub trait IdentityStore {
    /// Insert a mapping unless its label already exists.
    ///
    /// Returns `true` if the mapping was written and `false` if the label was
    /// already bound (to anyone). An existing label is never overwritten and
    /// is not an error.
    fn bind_identity(&self, identity: &BiometricIdentity) -> Result<bool, StoreError>;

    fn get_identity(&self, label: &BiometricLabel) -> Result<Option<BiometricIdentity>, StoreError>;

    /// Every label bound to the participant.
    fn identities_for(
        &self,
        participant: &ParticipantId,
    ) -> Result<Vec<BiometricIdentity>, StoreError>;
}
