//! Participant onboarding.

use std::sync::Arc;

use lifecert_recognition::{BindRequest, BoundFace, RecognitionClient};
use lifecert_store::{BiometricIdentity, Participant, Store};
use lifecert_types::{BiometricLabel, Clock, ExternalRef, NationalId, ParticipantId};

use crate::request::{image_name, REGISTRATION_IMAGE_NAME};
use crate::{RegisterRequest, Registration, ServiceError};

pub struct RegistrationService<S, R> {
    store: Arc<S>,
    recognizer: Arc<R>,
    clock: Arc<dyn Clock>,
}

impl<S: Store, R: RecognitionClient> RegistrationService<S, R> {
    pub fn new(store: Arc<S>, recognizer: Arc<R>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            recognizer,
            clock,
        }
    }

    /// Enroll a new participant.
    ///
    /// Input validation and the national id uniqueness check happen before
    /// the engine is contacted. On success exactly one bind call was made and
    /// the participant and its label mapping were stored together.
    pub async fn register(
        &self,
        request: RegisterRequest<'_>,
    ) -> Result<Registration, ServiceError> {
        let national_id = NationalId::parse(request.national_id)
            .map_err(|_| ServiceError::Validation("national id is required".to_string()))?;
        let display_name = request.display_name.trim();
        if display_name.is_empty() {
            return Err(ServiceError::Validation("display name is required".to_string()));
        }
        if request.image.is_empty() {
            return Err(ServiceError::Validation("image is required".to_string()));
        }
        if self
            .store
            .get_participant_by_national_id(&national_id)?
            .is_some()
        {
            return Err(ServiceError::Conflict(format!(
                "national id '{national_id}' is already registered"
            )));
        }

        let participant_id = ParticipantId::generate();
        let candidate = BiometricLabel::generate();
        let requested_ref = ExternalRef::from(participant_id);

        let bound = self
            .recognizer
            .bind(BindRequest {
                label: candidate.as_str(),
                external_ref: requested_ref.as_str(),
                image_name: image_name(request.image_name, REGISTRATION_IMAGE_NAME),
                image: request.image,
            })
            .await
            .map_err(|e| {
                tracing::warn!(participant = %participant_id, error = %e, "face bind failed");
                e
            })?;

        let label = bound_label(&bound, &candidate);
        let external_ref = ExternalRef::parse(&bound.external_ref).unwrap_or(requested_ref);
        let now = self.clock.now();

        let participant = Participant {
            id: participant_id,
            national_id,
            display_name: display_name.to_string(),
            label: label.clone(),
            external_ref: external_ref.clone(),
            created_at: now,
            updated_at: now,
        };
        let identity = BiometricIdentity {
            label: label.clone(),
            participant_id,
            external_ref: external_ref.clone(),
            created_at: now,
        };

        match self.store.enroll(&participant, &identity) {
            Ok(()) => {}
            Err(e) if e.is_duplicate() => {
                tracing::warn!(
                    participant = %participant_id,
                    label = %label,
                    error = %e,
                    "enroll rejected after remote bind; remote label is orphaned"
                );
                return Err(ServiceError::Conflict(e.to_string()));
            }
            Err(e) => {
                tracing::error!(
                    participant = %participant_id,
                    label = %label,
                    error = %e,
                    "enroll failed after remote bind; remote label is orphaned"
                );
                return Err(ServiceError::Inconsistent(format!(
                    "face bound as '{label}' but participant {participant_id} was not stored: {e}"
                )));
            }
        }

        tracing::info!(
            participant = %participant_id,
            label = %label,
            external_ref = %external_ref,
            "participant registered"
        );
        Ok(Registration {
            participant_id,
            label,
            external_ref,
        })
    }
}

/// The engine's answer is authoritative: returned label, else returned id,
/// else the candidate we offered.
fn bound_label(bound: &BoundFace, candidate: &BiometricLabel) -> BiometricLabel {
    BiometricLabel::parse(&bound.label)
        .or_else(|_| BiometricLabel::parse(&bound.id))
        .unwrap_or_else(|_| candidate.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lifecert_nullables::{NullClock, NullRecognizer, NullStore};
    use lifecert_store::{IdentityStore, ParticipantStore};
    use crate::ErrorKind;

    struct Harness {
        store: Arc<NullStore>,
        recognizer: Arc<NullRecognizer>,
        service: RegistrationService<NullStore, NullRecognizer>,
    }

    fn harness_with(recognizer: NullRecognizer) -> Harness {
        let store = Arc::new(NullStore::new());
        let recognizer = Arc::new(recognizer);
        let clock = Arc::new(NullClock::new(1_000));
        let service = RegistrationService::new(store.clone(), recognizer.clone(), clock);
        Harness {
            store,
            recognizer,
            service,
        }
    }

    fn harness() -> Harness {
        harness_with(NullRecognizer::new())
    }

    fn request<'a>(national_id: &'a str, name: &'a str) -> RegisterRequest<'a> {
        RegisterRequest {
            national_id,
            display_name: name,
            image: b"face-bytes",
            image_name: None,
        }
    }

    #[tokio::test]
    async fn register_persists_participant_and_mapping() {
        let h = harness();
        let reg = h.service.register(request(" 3201 ", " Ana ")).await.unwrap();

        let stored = h.store.get_participant(&reg.participant_id).unwrap().unwrap();
        assert_eq!(stored.national_id.as_str(), "3201");
        assert_eq!(stored.display_name, "Ana");
        assert_eq!(stored.label, reg.label);
        assert_eq!(stored.external_ref.as_str(), reg.participant_id.to_string());
        assert_eq!(stored.created_at.as_millis(), 1_000);

        let mapping = h.store.get_identity(&reg.label).unwrap().unwrap();
        assert_eq!(mapping.participant_id, reg.participant_id);

        let calls = h.recognizer.bind_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].image_name, "registration.jpg");
        assert_eq!(calls[0].external_ref, reg.participant_id.to_string());
    }

    #[tokio::test]
    async fn duplicate_national_id_conflicts_without_bind() {
        let h = harness();
        h.service.register(request("3201", "Ana")).await.unwrap();
        let err = h.service.register(request("3201", "Other")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(h.recognizer.bind_calls().len(), 1);
    }

    #[tokio::test]
    async fn blank_inputs_fail_validation_without_bind() {
        let h = harness();
        for req in [
            request(" ", "Ana"),
            request("3201", "  "),
            RegisterRequest {
                image: b"",
                ..request("3201", "Ana")
            },
        ] {
            let err = h.service.register(req).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation);
        }
        assert!(h.recognizer.bind_calls().is_empty());
    }

    #[tokio::test]
    async fn engine_values_are_authoritative() {
        let h = harness_with(NullRecognizer::new().with_bound_face(BoundFace {
            id: "enc-9".to_string(),
            label: " remote-label ".to_string(),
            external_ref: "remote-ref".to_string(),
            image_path: String::new(),
        }));
        let reg = h.service.register(request("3201", "Ana")).await.unwrap();
        assert_eq!(reg.label.as_str(), "remote-label");
        assert_eq!(reg.external_ref.as_str(), "remote-ref");
    }

    #[test]
    fn bound_label_fallbacks() {
        let candidate = BiometricLabel::parse("candidate").unwrap();
        let face = |id: &str, label: &str| BoundFace {
            id: id.to_string(),
            label: label.to_string(),
            ..BoundFace::default()
        };
        assert_eq!(bound_label(&face("id", "lbl"), &candidate).as_str(), "lbl");
        assert_eq!(bound_label(&face("id", " "), &candidate).as_str(), "id");
        assert_eq!(bound_label(&face("", ""), &candidate).as_str(), "candidate");
    }

    #[tokio::test]
    async fn empty_engine_reply_falls_back_to_request() {
        let h = harness_with(NullRecognizer::new().with_bound_face(BoundFace::default()));
        let reg = h.service.register(request("3201", "Ana")).await.unwrap();
        let call = &h.recognizer.bind_calls()[0];
        assert_eq!(reg.label.as_str(), call.label);
        assert_eq!(reg.external_ref.as_str(), call.external_ref);
    }

    #[tokio::test]
    async fn bind_failure_stores_nothing() {
        let h = harness_with(NullRecognizer::new().failing_bind("connection reset"));
        let err = h.service.register(request("3201", "Ana")).await.unwrap_err();
        assert!(err.is_dependency_failure());
        assert!(h.store.list_participants().unwrap().is_empty());
    }

    #[tokio::test]
    async fn taken_remote_label_is_a_conflict() {
        let h = harness_with(NullRecognizer::new().with_bound_face(BoundFace {
            label: "shared".to_string(),
            ..BoundFace::default()
        }));
        h.service.register(request("3201", "Ana")).await.unwrap();
        let err = h.service.register(request("3202", "Bo")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(h.store.list_participants().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn store_failure_after_bind_is_inconsistent() {
        let h = harness();
        h.store.fail_writes("disk full");
        let err = h.service.register(request("3201", "Ana")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Inconsistency);
        assert_eq!(h.recognizer.bind_calls().len(), 1);
    }
}
