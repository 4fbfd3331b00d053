//! Nullable store: thread-safe in-memory storage for testing.
//!
//! All state sits behind one mutex, so `enroll` and `purge_participant` are
//! atomic the same way the LMDB backend's single write transaction is.

use std::collections::HashMap;
use std::sync::Mutex;

use lifecert_store::participant::sort_newest_first;
use lifecert_store::{
    AttemptLedger, BiometricIdentity, IdentityStore, Participant, ParticipantStore, PurgeSummary,
    Store, StoreError, VerificationAttempt,
};
use lifecert_types::{BiometricLabel, NationalId, ParticipantId};

#[derive(Default)]
struct Inner {
    participants: HashMap<ParticipantId, Participant>,
    by_national_id: HashMap<String, ParticipantId>,
    by_label: HashMap<String, ParticipantId>,
    by_external_ref: HashMap<String, ParticipantId>,
    identities: HashMap<String, BiometricIdentity>,
    /// Sorted by `verified_at`; equal timestamps keep append order.
    attempts: Vec<VerificationAttempt>,
    /// Mappings written by a simulated concurrent request just before the
    /// next `bind_identity` for the same label.
    racing_binds: Vec<BiometricIdentity>,
    fail_writes: Option<String>,
}

impl Inner {
    fn check_writable(&self) -> Result<(), StoreError> {
        match &self.fail_writes {
            Some(message) => Err(StoreError::Backend(message.clone())),
            None => Ok(()),
        }
    }

    fn require_participant(&self, id: &ParticipantId) -> Result<(), StoreError> {
        if self.participants.contains_key(id) {
            Ok(())
        } else {
            Err(StoreError::NotFound(format!("participant {id}")))
        }
    }
}

/// An in-memory participant, label-mapping and ledger store for testing.
/// Thread-safe for use with tokio's multi-threaded runtime.
#[derive(Default)]
pub struct NullStore {
    inner: Mutex<Inner>,
}

impl NullStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail with [`StoreError::Backend`].
    pub fn fail_writes(&self, message: &str) {
        self.inner.lock().unwrap().fail_writes = Some(message.to_string());
    }

    pub fn allow_writes(&self) {
        self.inner.lock().unwrap().fail_writes = None;
    }

    /// Simulate a concurrent request that binds `identity` between a
    /// caller's lookup of the label and its own `bind_identity`.
    pub fn race_bind(&self, identity: BiometricIdentity) {
        self.inner.lock().unwrap().racing_binds.push(identity);
    }

    pub fn identity_count(&self) -> usize {
        self.inner.lock().unwrap().identities.len()
    }

    pub fn total_attempts(&self) -> usize {
        self.inner.lock().unwrap().attempts.len()
    }
}

impl ParticipantStore for NullStore {
    fn get_participant(&self, id: &ParticipantId) -> Result<Option<Participant>, StoreError> {
        Ok(self.inner.lock().unwrap().participants.get(id).cloned())
    }

    fn get_participant_by_national_id(
        &self,
        national_id: &NationalId,
    ) -> Result<Option<Participant>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .by_national_id
            .get(national_id.as_str())
            .and_then(|id| inner.participants.get(id))
            .cloned())
    }

    fn list_participants(&self) -> Result<Vec<Participant>, StoreError> {
        let mut participants: Vec<Participant> = self
            .inner
            .lock()
            .unwrap()
            .participants
            .values()
            .cloned()
            .collect();
        sort_newest_first(&mut participants);
        Ok(participants)
    }

    fn update_participant(&self, updated: &Participant) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        inner.check_writable()?;
        let current = inner
            .participants
            .get(&updated.id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("participant {}", updated.id)))?;

        if current.national_id != updated.national_id {
            if let Some(owner) = inner.by_national_id.get(updated.national_id.as_str()) {
                if *owner != updated.id {
                    return Err(StoreError::Duplicate(format!(
                        "national id '{}'",
                        updated.national_id
                    )));
                }
            }
            inner.by_national_id.remove(current.national_id.as_str());
            inner
                .by_national_id
                .insert(updated.national_id.as_str().to_string(), updated.id);
        }

        let record = Participant {
            national_id: updated.national_id.clone(),
            display_name: updated.display_name.clone(),
            updated_at: updated.updated_at,
            ..current
        };
        inner.participants.insert(updated.id, record);
        Ok(())
    }
}

impl IdentityStore for NullStore {
    fn bind_identity(&self, identity: &BiometricIdentity) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        inner.check_writable()?;

        if let Some(pos) = inner
            .racing_binds
            .iter()
            .position(|r| r.label == identity.label)
        {
            let winner = inner.racing_binds.remove(pos);
            inner
                .identities
                .entry(winner.label.as_str().to_string())
                .or_insert(winner);
        }

        if inner.identities.contains_key(identity.label.as_str()) {
            return Ok(false);
        }
        inner.require_participant(&identity.participant_id)?;
        inner
            .identities
            .insert(identity.label.as_str().to_string(), identity.clone());
        Ok(true)
    }

    fn get_identity(&self, label: &BiometricLabel) -> Result<Option<BiometricIdentity>, StoreError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .identities
            .get(label.as_str())
            .cloned())
    }

    fn identities_for(
        &self,
        participant: &ParticipantId,
    ) -> Result<Vec<BiometricIdentity>, StoreError> {
        let mut identities: Vec<BiometricIdentity> = self
            .inner
            .lock()
            .unwrap()
            .identities
            .values()
            .filter(|i| i.participant_id == *participant)
            .cloned()
            .collect();
        identities.sort_by(|a, b| a.label.cmp(&b.label));
        Ok(identities)
    }
}

impl AttemptLedger for NullStore {
    fn append_attempt(&self, attempt: &VerificationAttempt) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        inner.check_writable()?;
        inner.require_participant(&attempt.participant_id)?;
        let at = inner
            .attempts
            .partition_point(|a| a.verified_at <= attempt.verified_at);
        inner.attempts.insert(at, attempt.clone());
        Ok(())
    }

    fn latest_attempt(
        &self,
        participant: &ParticipantId,
    ) -> Result<Option<VerificationAttempt>, StoreError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .attempts
            .iter()
            .rev()
            .find(|a| a.participant_id == *participant)
            .cloned())
    }

    fn attempts_for(
        &self,
        participant: &ParticipantId,
    ) -> Result<Vec<VerificationAttempt>, StoreError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .attempts
            .iter()
            .filter(|a| a.participant_id == *participant)
            .cloned()
            .collect())
    }
}

impl Store for NullStore {
    fn enroll(
        &self,
        participant: &Participant,
        identity: &BiometricIdentity,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        inner.check_writable()?;

        if inner.participants.contains_key(&participant.id) {
            return Err(StoreError::Duplicate(format!("participant {}", participant.id)));
        }
        let unique = [
            (&inner.by_national_id, participant.national_id.as_str(), "national id"),
            (&inner.by_label, participant.label.as_str(), "label"),
            (&inner.by_external_ref, participant.external_ref.as_str(), "external reference"),
        ];
        for (index, value, what) in unique {
            if index.contains_key(value) {
                return Err(StoreError::Duplicate(format!("{what} '{value}'")));
            }
        }
        if inner.identities.contains_key(identity.label.as_str()) {
            return Err(StoreError::Duplicate(format!(
                "label '{}' is already bound",
                identity.label
            )));
        }

        let id = participant.id;
        inner
            .by_national_id
            .insert(participant.national_id.as_str().to_string(), id);
        inner.by_label.insert(participant.label.as_str().to_string(), id);
        inner
            .by_external_ref
            .insert(participant.external_ref.as_str().to_string(), id);
        inner.participants.insert(id, participant.clone());
        inner
            .identities
            .insert(identity.label.as_str().to_string(), identity.clone());
        Ok(())
    }

    fn purge_participant(&self, id: &ParticipantId) -> Result<PurgeSummary, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        inner.check_writable()?;
        let participant = inner
            .participants
            .remove(id)
            .ok_or_else(|| StoreError::NotFound(format!("participant {id}")))?;

        inner.by_national_id.remove(participant.national_id.as_str());
        inner.by_label.remove(participant.label.as_str());
        inner.by_external_ref.remove(participant.external_ref.as_str());

        let identities_before = inner.identities.len();
        inner.identities.retain(|_, i| i.participant_id != *id);
        let attempts_before = inner.attempts.len();
        inner.attempts.retain(|a| a.participant_id != *id);

        Ok(PurgeSummary {
            attempts_removed: (attempts_before - inner.attempts.len()) as u64,
            identities_removed: (identities_before - inner.identities.len()) as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lifecert_types::{AttemptId, AttemptStatus, ExternalRef, Timestamp};

    fn participant(nid: &str, label: &str) -> Participant {
        let id = ParticipantId::generate();
        Participant {
            id,
            national_id: NationalId::parse(nid).unwrap(),
            display_name: "Test".to_string(),
            label: BiometricLabel::parse(label).unwrap(),
            external_ref: ExternalRef::from(id),
            created_at: Timestamp::from_millis(1),
            updated_at: Timestamp::from_millis(1),
        }
    }

    fn identity_of(p: &Participant) -> BiometricIdentity {
        BiometricIdentity {
            label: p.label.clone(),
            participant_id: p.id,
            external_ref: p.external_ref.clone(),
            created_at: p.created_at,
        }
    }

    #[test]
    fn enroll_is_all_or_nothing() {
        let store = NullStore::new();
        let a = participant("1", "L1");
        store.enroll(&a, &identity_of(&a)).unwrap();

        let b = participant("1", "L2");
        assert!(store.enroll(&b, &identity_of(&b)).unwrap_err().is_duplicate());
        assert_eq!(store.get_participant(&b.id).unwrap(), None);
        assert_eq!(store.get_identity(&b.label).unwrap(), None);
    }

    #[test]
    fn racing_bind_wins_before_ours() {
        let store = NullStore::new();
        let a = participant("1", "L1");
        let b = participant("2", "L2");
        store.enroll(&a, &identity_of(&a)).unwrap();
        store.enroll(&b, &identity_of(&b)).unwrap();

        let label = BiometricLabel::parse("L9").unwrap();
        store.race_bind(BiometricIdentity {
            label: label.clone(),
            ..identity_of(&b)
        });
        let ours = BiometricIdentity {
            label: label.clone(),
            ..identity_of(&a)
        };
        assert!(!store.bind_identity(&ours).unwrap());
        assert_eq!(store.get_identity(&label).unwrap().unwrap().participant_id, b.id);
    }

    #[test]
    fn purge_cascades() {
        let store = NullStore::new();
        let a = participant("1", "L1");
        store.enroll(&a, &identity_of(&a)).unwrap();
        store
            .append_attempt(&VerificationAttempt {
                id: AttemptId::generate(),
                participant_id: a.id,
                status: AttemptStatus::Valid,
                distance: None,
                similarity: Some(80.0),
                verified_at: Timestamp::from_millis(2),
                notes: None,
            })
            .unwrap();

        let summary = store.purge_participant(&a.id).unwrap();
        assert_eq!(summary.attempts_removed, 1);
        assert_eq!(summary.identities_removed, 1);
        assert_eq!(store.total_attempts(), 0);
        assert_eq!(store.identity_count(), 0);
        assert!(store.purge_participant(&a.id).unwrap_err().is_not_found());
    }

    #[test]
    fn ledger_orders_by_timestamp_then_append_order() {
        let store = NullStore::new();
        let a = participant("1", "L1");
        store.enroll(&a, &identity_of(&a)).unwrap();
        let at = |status, millis| VerificationAttempt {
            id: AttemptId::generate(),
            participant_id: a.id,
            status,
            distance: None,
            similarity: None,
            verified_at: Timestamp::from_millis(millis),
            notes: None,
        };
        store.append_attempt(&at(AttemptStatus::Valid, 2000)).unwrap();
        store.append_attempt(&at(AttemptStatus::Invalid, 1000)).unwrap();
        store.append_attempt(&at(AttemptStatus::Review, 2000)).unwrap();

        let history: Vec<(u64, AttemptStatus)> = store
            .attempts_for(&a.id)
            .unwrap()
            .iter()
            .map(|x| (x.verified_at.as_millis(), x.status))
            .collect();
        assert_eq!(
            history,
            vec![
                (1000, AttemptStatus::Invalid),
                (2000, AttemptStatus::Valid),
                (2000, AttemptStatus::Review),
            ]
        );
        let latest = store.latest_attempt(&a.id).unwrap().unwrap();
        assert_eq!(latest.status, AttemptStatus::Review);
    }

    #[test]
    fn failing_writes_leave_reads_working() {
        let store = NullStore::new();
        let a = participant("1", "L1");
        store.enroll(&a, &identity_of(&a)).unwrap();
        store.fail_writes("disk full");

        let b = participant("2", "L2");
        assert!(matches!(
            store.enroll(&b, &identity_of(&b)),
            Err(StoreError::Backend(_))
        ));
        assert_eq!(store.list_participants().unwrap().len(), 1);

        store.allow_writes();
        store.enroll(&b, &identity_of(&b)).unwrap();
    }
}
