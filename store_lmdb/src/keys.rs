//! Key layouts.
//!
//! | database | key | value |
//! |---|---|---|
//! | `participants` | participant id (16) | bincode `Participant` |
//! | `participants_by_national_id` | national id | participant id |
//! | `participants_by_label` | bound label | participant id |
//! | `participants_by_external_ref` | external ref | participant id |
//! | `identities` | label | bincode `BiometricIdentity` |
//! | `identities_by_participant` | participant id ++ label | empty |
//! | `attempts` | participant id ++ verified_at ms (u64 BE) ++ sequence (u64 BE) | bincode `VerificationAttempt` |
//! | `meta` | name | little-endian integer |
//!
//! Attempt keys sort by participant, then by verification time, then by the
//! global append sequence, so a participant's history is one prefix range
//! and its latest attempt is the last key in that range.

use std::ops::Bound;

use lifecert_types::{BiometricLabel, ParticipantId, Timestamp};

pub const PARTICIPANT_ID_LEN: usize = 16;

/// `participant_id ++ label`
pub fn participant_label_key(participant: &ParticipantId, label: &BiometricLabel) -> Vec<u8> {
    let l = label.as_str().as_bytes();
    let mut key = Vec::with_capacity(PARTICIPANT_ID_LEN + l.len());
    key.extend_from_slice(participant.as_bytes());
    key.extend_from_slice(l);
    key
}

pub const ATTEMPT_KEY_LEN: usize = PARTICIPANT_ID_LEN + 16;

/// `participant_id ++ verified_at_be ++ seq_be`
pub fn attempt_key(
    participant: &ParticipantId,
    verified_at: Timestamp,
    seq: u64,
) -> [u8; ATTEMPT_KEY_LEN] {
    let mut key = [0u8; ATTEMPT_KEY_LEN];
    key[..PARTICIPANT_ID_LEN].copy_from_slice(participant.as_bytes());
    key[PARTICIPANT_ID_LEN..PARTICIPANT_ID_LEN + 8]
        .copy_from_slice(&verified_at.as_millis().to_be_bytes());
    key[PARTICIPANT_ID_LEN + 8..].copy_from_slice(&seq.to_be_bytes());
    key
}

/// Recover the participant id from the first 16 bytes of a composite key.
pub fn participant_prefix(key: &[u8]) -> Option<ParticipantId> {
    let bytes: [u8; PARTICIPANT_ID_LEN] = key.get(..PARTICIPANT_ID_LEN)?.try_into().ok()?;
    Some(ParticipantId::from_bytes(bytes))
}

/// Increment a byte prefix to produce the exclusive upper bound for a range scan.
/// Returns `false` when the prefix is all `0xFF` (no upper bound exists).
pub fn increment_prefix(prefix: &mut Vec<u8>) -> bool {
    while let Some(last) = prefix.last_mut() {
        if *last < 0xFF {
            *last += 1;
            return true;
        }
        prefix.pop();
    }
    false
}

/// Owned bounds covering every key that starts with `prefix`.
pub struct PrefixRange {
    lower: Vec<u8>,
    upper: Option<Vec<u8>>,
}

impl PrefixRange {
    pub fn new(prefix: &[u8]) -> Self {
        let mut upper = prefix.to_vec();
        let bounded = increment_prefix(&mut upper);
        Self {
            lower: prefix.to_vec(),
            upper: bounded.then_some(upper),
        }
    }

    pub fn bounds(&self) -> (Bound<&[u8]>, Bound<&[u8]>) {
        let upper = match &self.upper {
            Some(u) => Bound::Excluded(u.as_slice()),
            None => Bound::Unbounded,
        };
        (Bound::Included(self.lower.as_slice()), upper)
    }
}
