//! Inputs and results of the service operations.

use lifecert_types::{
    AttemptStatus, BiometricLabel, ExternalRef, ParticipantId, Timestamp,
};
use serde::Serialize;

use crate::ServiceError;

pub(crate) const REGISTRATION_IMAGE_NAME: &str = "registration.jpg";
pub(crate) const VERIFICATION_IMAGE_NAME: &str = "verification.jpg";

#[derive(Clone, Copy, Debug)]
pub struct RegisterRequest<'a> {
    pub national_id: &'a str,
    pub display_name: &'a str,
    pub image: &'a [u8],
    pub image_name: Option<&'a str>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Registration {
    pub participant_id: ParticipantId,
    pub label: BiometricLabel,
    pub external_ref: ExternalRef,
}

/// Blank fields keep the current value.
#[derive(Clone, Copy, Debug, Default)]
pub struct UpdateRequest<'a> {
    pub national_id: Option<&'a str>,
    pub display_name: Option<&'a str>,
}

#[derive(Clone, Copy, Debug)]
pub struct VerifyRequest<'a> {
    pub participant_id: &'a str,
    pub image: &'a [u8],
    pub image_name: Option<&'a str>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct VerificationOutcome {
    pub status: AttemptStatus,
    pub distance: Option<f64>,
    pub similarity: Option<f64>,
    pub verified_at: Timestamp,
}

/// The most recent attempt, or all fields absent when there is none.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct LatestStatus {
    pub status: Option<AttemptStatus>,
    pub distance: Option<f64>,
    pub similarity: Option<f64>,
    pub verified_at: Option<Timestamp>,
    pub notes: Option<String>,
}

/// Blank ids are invalid input; anything that is not a participant id
/// cannot name a participant.
pub(crate) fn parse_participant_id(raw: &str) -> Result<ParticipantId, ServiceError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ServiceError::Validation("participant id is required".to_string()));
    }
    raw.parse()
        .map_err(|_| ServiceError::ParticipantNotFound(raw.to_string()))
}

/// The given file name, or `default` when absent or blank.
pub(crate) fn image_name<'a>(given: Option<&'a str>, default: &'a str) -> &'a str {
    match given.map(str::trim) {
        Some(name) if !name.is_empty() => name,
        _ => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn participant_id_parsing() {
        assert_eq!(parse_participant_id("  ").unwrap_err().kind(), ErrorKind::Validation);
        assert_eq!(
            parse_participant_id("not-a-uuid").unwrap_err().kind(),
            ErrorKind::NotFound
        );
        let id = ParticipantId::generate();
        assert_eq!(parse_participant_id(&format!(" {id} ")).unwrap(), id);
    }

    #[test]
    fn image_name_defaults_when_blank() {
        assert_eq!(image_name(None, "verification.jpg"), "verification.jpg");
        assert_eq!(image_name(Some("  "), "verification.jpg"), "verification.jpg");
        assert_eq!(image_name(Some(" me.png "), "verification.jpg"), "me.png");
    }
}
