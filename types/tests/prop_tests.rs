use proptest::prelude::*;

use lifecert_types::{AttemptStatus, BiometricLabel, NationalId, ParticipantId, Timestamp};

proptest! {
    /// ParticipantId survives a bincode roundtrip as stored in LMDB values.
    #[test]
    fn participant_id_bincode_roundtrip(bytes in prop::array::uniform16(0u8..)) {
        let id = ParticipantId::from_bytes(bytes);
        let encoded = bincode::serialize(&id).unwrap();
        let decoded: ParticipantId = bincode::deserialize(&encoded).unwrap();
        prop_assert_eq!(decoded, id);
        prop_assert_eq!(decoded.as_bytes(), &bytes);
    }

    /// Parsing never yields a value with surrounding whitespace.
    #[test]
    fn label_parse_is_trimmed(raw in "\\PC{0,40}") {
        match BiometricLabel::parse(&raw) {
            Ok(label) => {
                prop_assert_eq!(label.as_str(), raw.trim());
                prop_assert!(!label.as_str().is_empty());
            }
            Err(_) => prop_assert!(raw.trim().is_empty()),
        }
    }

    /// NationalId parsing is idempotent.
    #[test]
    fn national_id_parse_idempotent(raw in "[ 0-9]{0,20}") {
        if let Ok(first) = NationalId::parse(&raw) {
            let second = NationalId::parse(first.as_str()).unwrap();
            prop_assert_eq!(first, second);
        }
    }

    /// Timestamp ordering follows the millisecond value.
    #[test]
    fn timestamp_ordering(a in 0u64..u64::MAX, b in 0u64..u64::MAX) {
        let ta = Timestamp::from_millis(a);
        let tb = Timestamp::from_millis(b);
        prop_assert_eq!(ta <= tb, a <= b);
        prop_assert_eq!(ta == tb, a == b);
    }
}

#[test]
fn status_display_roundtrips_through_from_str() {
    for status in [AttemptStatus::Valid, AttemptStatus::Invalid, AttemptStatus::Review] {
        assert_eq!(status.to_string().parse::<AttemptStatus>().unwrap(), status);
    }
}
