//! Abstract storage traits for the proof-of-life verification engine.
//!
//! Every storage backend (LMDB, in-memory for testing) implements these
//! traits. The flows depend only on the traits.
//!
//! The identity side ([`ParticipantStore`], [`IdentityStore`]) and the
//! verification ledger ([`AttemptLedger`]) are separate concerns that only
//! reference each other by [`ParticipantId`](lifecert_types::ParticipantId).
//! Operations that must touch more than one of them at once live on [`Store`]
//! and are atomic: either every write is visible or none is.

pub mod error;
pub mod identity;
pub mod ledger;
pub mod participant;

pub use error::StoreError;
pub use identity::{BiometricIdentity, IdentityStore};
pub use ledger::{AttemptLedger, VerificationAttempt};
pub use participant::{Participant, ParticipantStore};

use lifecert_types::ParticipantId;

/// What a cascading participant delete removed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PurgeSummary {
    pub attempts_removed: u64,
    pub identities_removed: u64,
}

/// A complete backend: identity store plus verification ledger, with the
/// multi-record operations that have to commit as one unit.
pub trait Store: ParticipantStore + IdentityStore + AttemptLedger + Send + Sync {
    /// Persist a freshly registered participant together with its first label mapping.
    ///
    /// Fails with [`StoreError::Duplicate`] if the participant id, national id,
    /// bound label or external reference is already taken, or if the mapping's
    /// label already exists. Nothing is written in that case.
    fn enroll(
        &self,
        participant: &Participant,
        identity: &BiometricIdentity,
    ) -> Result<(), StoreError>;

    /// Delete a participant, its label mappings and its ledger entries.
    ///
    /// Fails with [`StoreError::NotFound`] if the participant does not exist.
    fn purge_participant(&self, id: &ParticipantId) -> Result<PurgeSummary, StoreError>;
}
