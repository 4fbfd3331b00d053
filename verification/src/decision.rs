//! Pure decision rules: threshold evaluation, alias eligibility and the
//! final status. No I/O.

use lifecert_types::AttemptStatus;

use crate::VerificationConfig;

/// Threshold verdicts for one recognition result.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Signals {
    /// Distance was reported and is within the threshold.
    pub distance_ok: bool,
    pub similarity_ok: bool,
    pub distance_present: bool,
}

impl Signals {
    /// Whether an unseen label may be bound to the requesting participant.
    pub fn alias_eligible(&self) -> bool {
        self.similarity_ok && (self.distance_ok || !self.distance_present)
    }

    /// Whether the scores alone would confirm a match.
    ///
    /// A reported distance decides on its own; similarity is consulted only
    /// when the engine sent no distance.
    pub fn confirms_match(&self) -> bool {
        self.distance_ok || (!self.distance_present && self.similarity_ok)
    }
}

pub fn evaluate_signals(
    config: &VerificationConfig,
    similarity: f64,
    distance: Option<f64>,
) -> Signals {
    Signals {
        distance_ok: distance.is_some_and(|d| d <= config.distance_threshold),
        similarity_ok: similarity >= config.similarity_threshold,
        distance_present: distance.is_some(),
    }
}

/// `VALID` iff the label resolved to the requesting participant and the
/// scores confirm the match, else `INVALID`.
pub fn decide_status(matched: bool, signals: &Signals) -> AttemptStatus {
    if matched && signals.confirms_match() {
        AttemptStatus::Valid
    } else {
        AttemptStatus::Invalid
    }
}
