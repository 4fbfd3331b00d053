//! Participant records and their storage trait.

use crate::StoreError;
use lifecert_types::{BiometricLabel, ExternalRef, NationalId, ParticipantId, Timestamp};
use serde::{Deserialize, Serialize};

/// A person enrolled for periodic proof-of-life checks.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,
    /// Unique across participants.
    pub national_id: NationalId,
    pub display_name: String,
    /// Label the remote engine returned at registration. Unique.
    pub label: BiometricLabel,
    /// Reference sent to the remote engine at registration. Unique.
    pub external_ref: ExternalRef,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Trait for participant storage operations.
///
/// Creation and deletion go through [`Store`](crate::Store) because both
/// touch other records in the same unit of work.
pub trait ParticipantStore {
    fn get_participant(&self, id: &ParticipantId) -> Result<Option<Participant>, StoreError>;

    fn get_participant_by_national_id(
        &self,
        national_id: &NationalId,
    ) -> Result<Option<Participant>, StoreError>;

    /// All participants, newest first.
    fn list_participants(&self) -> Result<Vec<Participant>, StoreError>;

    /// Rewrite the mutable metadata (national id, display name, `updated_at`)
    /// of an existing participant. Label, external reference and creation
    /// time are never changed by this call.
    ///
    /// Fails with [`StoreError::NotFound`] if the participant is absent and
    /// with [`StoreError::Duplicate`] if the new national id belongs to
    /// someone else.
    fn update_participant(&self, participant: &Participant) -> Result<(), StoreError>;
}

/// Sort newest first, ties broken by id so listings are stable.
pub fn sort_newest_first(participants: &mut [Participant]) {
    participants.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
}
