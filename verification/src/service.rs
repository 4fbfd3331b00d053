//! The verification decision engine.

use std::sync::Arc;

use lifecert_liveness::LivenessChecker;
use lifecert_recognition::{RecognitionClient, RecognizeRequest};
use lifecert_store::{BiometricIdentity, Participant, Store, VerificationAttempt};
use lifecert_types::{AttemptId, AttemptStatus, BiometricLabel, Clock};

use crate::decision::{decide_status, evaluate_signals, Signals};
use crate::participants::{latest_status_of, require_participant};
use crate::request::{image_name, parse_participant_id, VERIFICATION_IMAGE_NAME};
use crate::{LatestStatus, ServiceError, VerificationConfig, VerificationOutcome, VerifyRequest};

pub struct VerificationService<S, L, R> {
    store: Arc<S>,
    liveness: Arc<L>,
    recognizer: Arc<R>,
    clock: Arc<dyn Clock>,
    config: VerificationConfig,
}

impl<S, L, R> VerificationService<S, L, R>
where
    S: Store,
    L: LivenessChecker,
    R: RecognitionClient,
{
    pub fn new(
        store: Arc<S>,
        liveness: Arc<L>,
        recognizer: Arc<R>,
        clock: Arc<dyn Clock>,
        config: VerificationConfig,
    ) -> Self {
        Self {
            store,
            liveness,
            recognizer,
            clock,
            config,
        }
    }

    pub fn config(&self) -> &VerificationConfig {
        &self.config
    }

    /// Run one proof-of-life attempt.
    ///
    /// Returns `REVIEW` when liveness does not pass, otherwise `VALID` or
    /// `INVALID` from the recognition result. Each of those outcomes appends
    /// exactly one attempt. Errors append nothing.
    pub async fn verify(
        &self,
        request: VerifyRequest<'_>,
    ) -> Result<VerificationOutcome, ServiceError> {
        if request.participant_id.trim().is_empty() {
            return Err(ServiceError::Validation("participant id is required".to_string()));
        }
        if request.image.is_empty() {
            return Err(ServiceError::Validation("image is required".to_string()));
        }
        let id = parse_participant_id(request.participant_id)?;
        let participant = require_participant(self.store.as_ref(), &id)?;

        let verdict = self.liveness.evaluate(request.image).await.map_err(|e| {
            tracing::warn!(participant = %id, error = %e, "liveness check unavailable");
            e
        })?;
        if !verdict.passed {
            let attempt = VerificationAttempt {
                id: AttemptId::generate(),
                participant_id: id,
                status: AttemptStatus::Review,
                distance: None,
                similarity: None,
                verified_at: self.clock.now(),
                notes: Some(verdict.reason),
            };
            self.store.append_attempt(&attempt)?;
            tracing::info!(
                participant = %id,
                status = %attempt.status,
                reason = attempt.notes.as_deref().unwrap_or_default(),
                "liveness did not pass; attempt sent to review"
            );
            return Ok(VerificationOutcome {
                status: attempt.status,
                distance: None,
                similarity: None,
                verified_at: attempt.verified_at,
            });
        }

        let recognition = self
            .recognizer
            .recognize(RecognizeRequest {
                image_name: image_name(request.image_name, VERIFICATION_IMAGE_NAME),
                image: request.image,
            })
            .await
            .map_err(|e| {
                tracing::warn!(participant = %id, error = %e, "recognition failed");
                e
            })?;

        let signals = evaluate_signals(&self.config, recognition.similarity, recognition.distance);
        let matched = self.resolve_identity(&participant, &recognition.label, &signals)?;
        let status = decide_status(matched, &signals);

        let attempt = VerificationAttempt {
            id: AttemptId::generate(),
            participant_id: id,
            status,
            distance: recognition.distance,
            similarity: Some(recognition.similarity),
            verified_at: self.clock.now(),
            notes: None,
        };
        self.store.append_attempt(&attempt)?;

        tracing::info!(
            participant = %id,
            status = %status,
            matched,
            label = recognition.label.trim(),
            similarity = recognition.similarity,
            distance = ?recognition.distance,
            "verification recorded"
        );
        Ok(VerificationOutcome {
            status,
            distance: attempt.distance,
            similarity: attempt.similarity,
            verified_at: attempt.verified_at,
        })
    }

    /// Decide whether the recognized label belongs to `participant`, binding
    /// it as a new alias when it is unseen and the scores allow it.
    fn resolve_identity(
        &self,
        participant: &Participant,
        raw_label: &str,
        signals: &Signals,
    ) -> Result<bool, ServiceError> {
        let Ok(label) = BiometricLabel::parse(raw_label) else {
            tracing::debug!(participant = %participant.id, "engine returned no label");
            return Ok(false);
        };

        if let Some(existing) = self.store.get_identity(&label)? {
            let matched = existing.participant_id == participant.id;
            if !matched {
                tracing::info!(
                    participant = %participant.id,
                    label = %label,
                    owner = %existing.participant_id,
                    "label belongs to another participant"
                );
            }
            return Ok(matched);
        }

        if !signals.alias_eligible() {
            tracing::debug!(participant = %participant.id, label = %label, "unseen label below alias thresholds");
            return Ok(false);
        }

        let alias = BiometricIdentity {
            label,
            participant_id: participant.id,
            external_ref: participant.external_ref.clone(),
            created_at: self.clock.now(),
        };
        if self.store.bind_identity(&alias)? {
            tracing::info!(participant = %participant.id, label = %alias.label, "bound new label alias");
            return Ok(true);
        }

        // Lost a race with a concurrent bind of the same label.
        let winner = self.store.get_identity(&alias.label)?;
        let matched = winner.is_some_and(|w| w.participant_id == participant.id);
        tracing::info!(
            participant = %participant.id,
            label = %alias.label,
            matched,
            "label was bound concurrently"
        );
        Ok(matched)
    }

    /// The most recent attempt for a participant. Pure read.
    pub fn latest_status(&self, participant_id: &str) -> Result<LatestStatus, ServiceError> {
        latest_status_of(self.store.as_ref(), participant_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use lifecert_nullables::{NullClock, NullLiveness, NullRecognizer, NullStore};
    use lifecert_store::{AttemptLedger, IdentityStore};
    use lifecert_types::{ExternalRef, NationalId, ParticipantId, Timestamp};

    struct Harness {
        store: Arc<NullStore>,
        liveness: Arc<NullLiveness>,
        recognizer: Arc<NullRecognizer>,
        clock: Arc<NullClock>,
        service: VerificationService<NullStore, NullLiveness, NullRecognizer>,
        p1: Participant,
    }

    fn enroll(store: &NullStore, nid: &str, label: &str) -> Participant {
        let id = ParticipantId::generate();
        let participant = Participant {
            id,
            national_id: NationalId::parse(nid).unwrap(),
            display_name: format!("participant {nid}"),
            label: BiometricLabel::parse(label).unwrap(),
            external_ref: ExternalRef::from(id),
            created_at: Timestamp::from_millis(1),
            updated_at: Timestamp::from_millis(1),
        };
        let identity = BiometricIdentity {
            label: participant.label.clone(),
            participant_id: id,
            external_ref: participant.external_ref.clone(),
            created_at: participant.created_at,
        };
        store.enroll(&participant, &identity).unwrap();
        participant
    }

    /// P1 registered and bound to label L1.
    fn harness(liveness: NullLiveness, recognizer: NullRecognizer) -> Harness {
        let store = Arc::new(NullStore::new());
        let p1 = enroll(&store, "3201", "L1");
        let liveness = Arc::new(liveness);
        let recognizer = Arc::new(recognizer);
        let clock = Arc::new(NullClock::new(5_000));
        let service = VerificationService::new(
            store.clone(),
            liveness.clone(),
            recognizer.clone(),
            clock.clone(),
            VerificationConfig::default(),
        );
        Harness {
            store,
            liveness,
            recognizer,
            clock,
            service,
            p1,
        }
    }

    fn recognizing(label: &str, similarity: f64, distance: Option<f64>) -> Harness {
        harness(
            NullLiveness::passing(),
            NullRecognizer::new().recognizing(label, similarity, distance),
        )
    }

    impl Harness {
        async fn verify(&self, participant: &Participant) -> Result<VerificationOutcome, ServiceError> {
            let id = participant.id.to_string();
            self.service
                .verify(VerifyRequest {
                    participant_id: &id,
                    image: b"selfie",
                    image_name: None,
                })
                .await
        }
    }

    #[tokio::test]
    async fn scenario_known_label_close_match_is_valid() {
        let h = recognizing("L1", 92.5, Some(0.3));
        let outcome = h.verify(&h.p1).await.unwrap();
        assert_eq!(outcome.status, AttemptStatus::Valid);
        assert_eq!(outcome.distance, Some(0.3));
        assert_eq!(outcome.similarity, Some(92.5));
        assert_eq!(outcome.verified_at, Timestamp::from_millis(5_000));
        assert_eq!(h.store.attempts_for(&h.p1.id).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn scenario_known_label_weak_match_is_invalid() {
        let h = recognizing("L1", 40.2, Some(0.9));
        let outcome = h.verify(&h.p1).await.unwrap();
        assert_eq!(outcome.status, AttemptStatus::Invalid);
        let latest = h.store.latest_attempt(&h.p1.id).unwrap().unwrap();
        assert_eq!(latest.distance, Some(0.9));
        assert_eq!(latest.similarity, Some(40.2));
    }

    #[tokio::test]
    async fn scenario_liveness_disabled_goes_to_review() {
        let h = harness(
            NullLiveness::failing("liveness_disabled"),
            NullRecognizer::new().recognizing("L1", 99.0, Some(0.1)),
        );
        let outcome = h.verify(&h.p1).await.unwrap();
        assert_eq!(outcome.status, AttemptStatus::Review);
        assert_eq!(outcome.distance, None);
        assert_eq!(outcome.similarity, None);
        assert_eq!(h.recognizer.recognize_calls(), 0);

        let attempts = h.store.attempts_for(&h.p1.id).unwrap();
        assert_eq!(attempts.len(), 1);
        assert_eq!(attempts[0].notes.as_deref(), Some("liveness_disabled"));
    }

    #[tokio::test]
    async fn scenario_unseen_label_without_distance_binds_alias() {
        let h = recognizing("L2", 80.0, None);
        let outcome = h.verify(&h.p1).await.unwrap();
        assert_eq!(outcome.status, AttemptStatus::Valid);
        assert_eq!(outcome.distance, None);

        let alias = h
            .store
            .get_identity(&BiometricLabel::parse("L2").unwrap())
            .unwrap()
            .unwrap();
        assert_eq!(alias.participant_id, h.p1.id);
        assert_eq!(alias.external_ref, h.p1.external_ref);
    }

    #[tokio::test]
    async fn alias_binding_is_idempotent_under_retry() {
        let h = recognizing("L2", 80.0, None);
        h.verify(&h.p1).await.unwrap();
        let before = h.store.identity_count();
        let outcome = h.verify(&h.p1).await.unwrap();
        assert_eq!(outcome.status, AttemptStatus::Valid);
        assert_eq!(h.store.identity_count(), before);
        assert_eq!(h.store.attempts_for(&h.p1.id).unwrap().len(), 2);
    }

    #[tokio::test]
    async fn foreign_label_is_invalid_regardless_of_scores() {
        let h = recognizing("L9", 100.0, Some(0.0));
        let p2 = enroll(&h.store, "3202", "L9");
        let outcome = h.verify(&h.p1).await.unwrap();
        assert_eq!(outcome.status, AttemptStatus::Invalid);
        assert_eq!(
            h.store
                .get_identity(&BiometricLabel::parse("L9").unwrap())
                .unwrap()
                .unwrap()
                .participant_id,
            p2.id
        );
    }

    #[tokio::test]
    async fn unseen_label_below_thresholds_writes_no_mapping() {
        let h = recognizing("L3", 70.0, None);
        let before = h.store.identity_count();
        let outcome = h.verify(&h.p1).await.unwrap();
        assert_eq!(outcome.status, AttemptStatus::Invalid);
        assert_eq!(h.store.identity_count(), before);
    }

    #[tokio::test]
    async fn unseen_label_with_far_distance_writes_no_mapping() {
        let h = recognizing("L3", 95.0, Some(0.8));
        let before = h.store.identity_count();
        assert_eq!(h.verify(&h.p1).await.unwrap().status, AttemptStatus::Invalid);
        assert_eq!(h.store.identity_count(), before);
    }

    #[tokio::test]
    async fn blank_label_is_not_matched() {
        let h = recognizing("   ", 99.0, None);
        let before = h.store.identity_count();
        assert_eq!(h.verify(&h.p1).await.unwrap().status, AttemptStatus::Invalid);
        assert_eq!(h.store.identity_count(), before);
    }

    #[tokio::test]
    async fn label_is_trimmed_before_lookup() {
        let h = recognizing(" L1 ", 92.5, Some(0.3));
        assert_eq!(h.verify(&h.p1).await.unwrap().status, AttemptStatus::Valid);
    }

    #[tokio::test]
    async fn lost_alias_race_to_another_participant_is_invalid() {
        let h = recognizing("L5", 90.0, None);
        let p2 = enroll(&h.store, "3202", "L2x");
        h.store.race_bind(BiometricIdentity {
            label: BiometricLabel::parse("L5").unwrap(),
            participant_id: p2.id,
            external_ref: p2.external_ref.clone(),
            created_at: Timestamp::from_millis(2),
        });
        assert_eq!(h.verify(&h.p1).await.unwrap().status, AttemptStatus::Invalid);
    }

    #[tokio::test]
    async fn lost_alias_race_to_ourselves_is_valid() {
        let h = recognizing("L5", 90.0, None);
        h.store.race_bind(BiometricIdentity {
            label: BiometricLabel::parse("L5").unwrap(),
            participant_id: h.p1.id,
            external_ref: h.p1.external_ref.clone(),
            created_at: Timestamp::from_millis(2),
        });
        assert_eq!(h.verify(&h.p1).await.unwrap().status, AttemptStatus::Valid);
    }

    #[tokio::test]
    async fn liveness_error_records_nothing() {
        let h = harness(
            NullLiveness::unavailable("detector offline"),
            NullRecognizer::new().recognizing("L1", 99.0, Some(0.1)),
        );
        let err = h.verify(&h.p1).await.unwrap_err();
        assert!(err.is_dependency_failure());
        assert_eq!(h.recognizer.recognize_calls(), 0);
        assert_eq!(h.store.total_attempts(), 0);
    }

    #[tokio::test]
    async fn recognition_error_records_nothing() {
        let h = harness(
            NullLiveness::passing(),
            NullRecognizer::new().failing_recognize("timeout"),
        );
        let err = h.verify(&h.p1).await.unwrap_err();
        assert!(err.is_dependency_failure());
        assert_eq!(h.store.total_attempts(), 0);
    }

    #[tokio::test]
    async fn preconditions_are_checked_before_any_call() {
        let h = recognizing("L1", 92.5, Some(0.3));
        let id = h.p1.id.to_string();
        let cases = [
            (VerifyRequest { participant_id: " ", image: b"x", image_name: None }, ErrorKind::Validation),
            (VerifyRequest { participant_id: &id, image: b"", image_name: None }, ErrorKind::Validation),
            (VerifyRequest { participant_id: "nope", image: b"x", image_name: None }, ErrorKind::NotFound),
        ];
        for (request, kind) in cases {
            assert_eq!(h.service.verify(request).await.unwrap_err().kind(), kind);
        }
        let unknown = ParticipantId::generate().to_string();
        let err = h
            .service
            .verify(VerifyRequest {
                participant_id: &unknown,
                image: b"x",
                image_name: None,
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(h.liveness.calls(), 0);
        assert_eq!(h.recognizer.recognize_calls(), 0);
    }

    #[tokio::test]
    async fn latest_status_is_a_stable_read() {
        let h = recognizing("L1", 92.5, Some(0.3));
        let id = h.p1.id.to_string();
        assert_eq!(h.service.latest_status(&id).unwrap(), LatestStatus::default());

        h.verify(&h.p1).await.unwrap();
        h.clock.advance(1_000);
        h.recognizer.set_recognition("L1", 40.2, Some(0.9));
        h.verify(&h.p1).await.unwrap();

        let first = h.service.latest_status(&id).unwrap();
        let second = h.service.latest_status(&id).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.status, Some(AttemptStatus::Invalid));
        assert_eq!(first.verified_at, Some(Timestamp::from_millis(6_000)));
        assert_eq!(h.store.attempts_for(&h.p1.id).unwrap().len(), 2);
    }

    #[tokio::test]
    async fn latest_status_of_unknown_participant_is_not_found() {
        let h = recognizing("L1", 92.5, Some(0.3));
        let err = h
            .service
            .latest_status(&ParticipantId::generate().to_string())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn review_notes_surface_in_latest_status() {
        let h = harness(NullLiveness::failing("eyes_closed"), NullRecognizer::new());
        h.verify(&h.p1).await.unwrap();
        let latest = h.service.latest_status(&h.p1.id.to_string()).unwrap();
        assert_eq!(latest.status, Some(AttemptStatus::Review));
        assert_eq!(latest.notes.as_deref(), Some("eyes_closed"));
        assert_eq!(latest.similarity, None);
    }
}
