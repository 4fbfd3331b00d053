//! Participant maintenance and audit reads.
//!
//! None of these operations talk to the liveness detector or the
//! recognition engine, so they only need the store.

use std::sync::Arc;

use lifecert_store::{Participant, PurgeSummary, Store, VerificationAttempt};
use lifecert_types::{Clock, NationalId, ParticipantId};

use crate::request::parse_participant_id;
use crate::{LatestStatus, ServiceError, UpdateRequest};

pub struct ParticipantService<S> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
}

impl<S: Store> ParticipantService<S> {
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub fn get(&self, participant_id: &str) -> Result<Participant, ServiceError> {
        let id = parse_participant_id(participant_id)?;
        require_participant(self.store.as_ref(), &id)
    }

    /// All participants, newest first.
    pub fn list(&self) -> Result<Vec<Participant>, ServiceError> {
        Ok(self.store.list_participants()?)
    }

    /// Change national id and/or display name. Label and external reference
    /// never change.
    pub fn update(
        &self,
        participant_id: &str,
        request: UpdateRequest<'_>,
    ) -> Result<Participant, ServiceError> {
        let mut participant = self.get(participant_id)?;

        if let Some(national_id) = request.national_id.and_then(|raw| NationalId::parse(raw).ok()) {
            if national_id != participant.national_id {
                if let Some(owner) = self.store.get_participant_by_national_id(&national_id)? {
                    if owner.id != participant.id {
                        return Err(ServiceError::Conflict(format!(
                            "national id '{national_id}' is already registered"
                        )));
                    }
                }
                participant.national_id = national_id;
            }
        }
        if let Some(name) = request.display_name.map(str::trim).filter(|n| !n.is_empty()) {
            participant.display_name = name.to_string();
        }
        participant.updated_at = self.clock.now();

        self.store.update_participant(&participant).map_err(|e| {
            if e.is_duplicate() {
                ServiceError::Conflict(e.to_string())
            } else if e.is_not_found() {
                ServiceError::ParticipantNotFound(participant.id.to_string())
            } else {
                ServiceError::Store(e)
            }
        })?;
        tracing::info!(participant = %participant.id, "participant updated");
        Ok(participant)
    }

    /// Remove a participant with its label mappings and attempt history.
    pub fn delete(&self, participant_id: &str) -> Result<PurgeSummary, ServiceError> {
        let id = parse_participant_id(participant_id)?;
        let summary = self.store.purge_participant(&id).map_err(|e| {
            if e.is_not_found() {
                ServiceError::ParticipantNotFound(id.to_string())
            } else {
                ServiceError::Store(e)
            }
        })?;
        tracing::info!(
            participant = %id,
            attempts = summary.attempts_removed,
            identities = summary.identities_removed,
            "participant deleted"
        );
        Ok(summary)
    }

    /// Full attempt history, oldest first.
    pub fn attempts(&self, participant_id: &str) -> Result<Vec<VerificationAttempt>, ServiceError> {
        let id = parse_participant_id(participant_id)?;
        require_participant(self.store.as_ref(), &id)?;
        Ok(self.store.attempts_for(&id)?)
    }

    pub fn latest_status(&self, participant_id: &str) -> Result<LatestStatus, ServiceError> {
        latest_status_of(self.store.as_ref(), participant_id)
    }
}

pub(crate) fn require_participant<S: Store>(
    store: &S,
    id: &ParticipantId,
) -> Result<Participant, ServiceError> {
    store
        .get_participant(id)?
        .ok_or_else(|| ServiceError::ParticipantNotFound(id.to_string()))
}

/// The most recent attempt, or all-absent when there is none. Pure read.
pub(crate) fn latest_status_of<S: Store>(
    store: &S,
    participant_id: &str,
) -> Result<LatestStatus, ServiceError> {
    let id = parse_participant_id(participant_id)?;
    require_participant(store, &id)?;
    Ok(match store.latest_attempt(&id)? {
        Some(attempt) => LatestStatus {
            status: Some(attempt.status),
            distance: attempt.distance,
            similarity: attempt.similarity,
            verified_at: Some(attempt.verified_at),
            notes: attempt.notes,
        },
        None => LatestStatus::default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use lifecert_nullables::{NullClock, NullStore};
    use lifecert_store::{AttemptLedger, BiometricIdentity, IdentityStore};
    use lifecert_types::{AttemptId, AttemptStatus, BiometricLabel, ExternalRef, Timestamp};

    struct Harness {
        store: Arc<NullStore>,
        clock: Arc<NullClock>,
        service: ParticipantService<NullStore>,
    }

    fn harness() -> Harness {
        let store = Arc::new(NullStore::new());
        let clock = Arc::new(NullClock::new(1_000));
        let service = ParticipantService::new(store.clone(), clock.clone());
        Harness {
            store,
            clock,
            service,
        }
    }

    impl Harness {
        fn enroll(&self, nid: &str, label: &str) -> Participant {
            let id = ParticipantId::generate();
            let now = self.clock.now();
            let participant = Participant {
                id,
                national_id: NationalId::parse(nid).unwrap(),
                display_name: format!("holder of {nid}"),
                label: BiometricLabel::parse(label).unwrap(),
                external_ref: ExternalRef::from(id),
                created_at: now,
                updated_at: now,
            };
            let identity = BiometricIdentity {
                label: participant.label.clone(),
                participant_id: id,
                external_ref: participant.external_ref.clone(),
                created_at: now,
            };
            self.store.enroll(&participant, &identity).unwrap();
            participant
        }

        fn record(&self, participant: &Participant, status: AttemptStatus) {
            self.store
                .append_attempt(&VerificationAttempt {
                    id: AttemptId::generate(),
                    participant_id: participant.id,
                    status,
                    distance: None,
                    similarity: Some(80.0),
                    verified_at: self.clock.now(),
                    notes: None,
                })
                .unwrap();
        }
    }

    #[test]
    fn update_changes_metadata_only() {
        let h = harness();
        let p = h.enroll("3201", "L1");
        h.clock.advance(500);

        let updated = h
            .service
            .update(
                &p.id.to_string(),
                UpdateRequest {
                    national_id: Some("4401"),
                    display_name: Some(" "),
                },
            )
            .unwrap();
        assert_eq!(updated.national_id.as_str(), "4401");
        assert_eq!(updated.display_name, p.display_name);
        assert_eq!(updated.label, p.label);
        assert_eq!(updated.external_ref, p.external_ref);
        assert_eq!(updated.updated_at.as_millis(), 1_500);
        assert_eq!(updated.created_at.as_millis(), 1_000);
        assert_eq!(h.service.get(&p.id.to_string()).unwrap(), updated);
    }

    #[test]
    fn update_keeping_own_national_id_is_fine() {
        let h = harness();
        let p = h.enroll("3201", "L1");
        let updated = h
            .service
            .update(
                &p.id.to_string(),
                UpdateRequest {
                    national_id: Some("3201"),
                    display_name: Some("New Name"),
                },
            )
            .unwrap();
        assert_eq!(updated.display_name, "New Name");
    }

    #[test]
    fn update_to_someone_elses_national_id_conflicts() {
        let h = harness();
        h.enroll("3201", "L1");
        let bo = h.enroll("3202", "L2");
        let err = h
            .service
            .update(
                &bo.id.to_string(),
                UpdateRequest {
                    national_id: Some("3201"),
                    display_name: None,
                },
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(h.service.get(&bo.id.to_string()).unwrap().national_id.as_str(), "3202");
    }

    #[test]
    fn update_unknown_is_not_found() {
        let h = harness();
        let err = h
            .service
            .update(&ParticipantId::generate().to_string(), UpdateRequest::default())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn list_is_newest_first() {
        let h = harness();
        let first = h.enroll("1", "A");
        h.clock.advance(10);
        let second = h.enroll("2", "B");
        let ids: Vec<ParticipantId> = h.service.list().unwrap().into_iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }

    #[test]
    fn delete_cascades_and_then_is_not_found() {
        let h = harness();
        let p = h.enroll("3201", "L1");
        h.record(&p, AttemptStatus::Valid);
        h.record(&p, AttemptStatus::Invalid);
        let id = p.id.to_string();

        let summary = h.service.delete(&id).unwrap();
        assert_eq!(summary.attempts_removed, 2);
        assert_eq!(summary.identities_removed, 1);
        assert_eq!(h.service.get(&id).unwrap_err().kind(), ErrorKind::NotFound);
        assert_eq!(h.service.delete(&id).unwrap_err().kind(), ErrorKind::NotFound);
        assert!(h.store.get_identity(&p.label).unwrap().is_none());
        assert_eq!(h.store.total_attempts(), 0);
    }

    #[test]
    fn attempts_and_latest_status() {
        let h = harness();
        let p = h.enroll("3201", "L1");
        let id = p.id.to_string();
        assert!(h.service.attempts(&id).unwrap().is_empty());
        assert_eq!(h.service.latest_status(&id).unwrap(), LatestStatus::default());

        h.record(&p, AttemptStatus::Invalid);
        h.clock.advance(1);
        h.record(&p, AttemptStatus::Valid);

        let history: Vec<AttemptStatus> =
            h.service.attempts(&id).unwrap().iter().map(|a| a.status).collect();
        assert_eq!(history, vec![AttemptStatus::Invalid, AttemptStatus::Valid]);
        assert_eq!(
            h.service.latest_status(&id).unwrap().status,
            Some(AttemptStatus::Valid)
        );
    }

    #[test]
    fn latest_status_follows_verification_time_after_clock_step_back() {
        let h = harness();
        let p = h.enroll("3201", "L1");
        let id = p.id.to_string();

        h.clock.set(2_000);
        h.record(&p, AttemptStatus::Valid);
        h.clock.set(1_500);
        h.record(&p, AttemptStatus::Invalid);

        let latest = h.service.latest_status(&id).unwrap();
        assert_eq!(latest.status, Some(AttemptStatus::Valid));
        assert_eq!(latest.verified_at, Some(Timestamp::from_millis(2_000)));
        let times: Vec<u64> = h
            .service
            .attempts(&id)
            .unwrap()
            .iter()
            .map(|a| a.verified_at.as_millis())
            .collect();
        assert_eq!(times, vec![1_500, 2_000]);
    }

    #[test]
    fn malformed_ids() {
        let h = harness();
        assert_eq!(h.service.get("").unwrap_err().kind(), ErrorKind::Validation);
        assert_eq!(h.service.attempts("xyz").unwrap_err().kind(), ErrorKind::NotFound);
    }
}
