//! Cross-database consistency checks.
//!
//! Run by the `check` command to detect a damaged store. Findings are
//! reported, never repaired.

use heed::types::Bytes;
use heed::{Database, RoTxn};

use lifecert_store::{BiometricIdentity, Participant, VerificationAttempt};

use crate::codec::{decode, decode_participant_id};
use crate::environment::{LmdbEnvironment, DATABASE_NAMES};
use crate::keys::{participant_label_key, participant_prefix, ATTEMPT_KEY_LEN, PARTICIPANT_ID_LEN};
use crate::LmdbError;

/// Summary of an integrity check run.
#[derive(Debug, Default)]
pub struct IntegrityReport {
    pub databases_checked: u32,
    pub total_entries: u64,
    pub participants: u64,
    pub identities: u64,
    pub attempts: u64,
    pub errors: Vec<String>,
}

impl IntegrityReport {
    /// Returns `true` if no errors were detected.
    pub fn is_healthy(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Walk every database and verify that the indexes, label mappings and
/// ledger entries agree with the participant records.
///
/// Read failures of individual entries are recorded in the report; only a
/// failure to start the read transaction is a hard error.
pub fn check_integrity(env: &LmdbEnvironment) -> Result<IntegrityReport, LmdbError> {
    let mut report = IntegrityReport::default();
    let rtxn = env.env.read_txn()?;

    let databases = [
        &env.participants_db,
        &env.national_id_index_db,
        &env.label_index_db,
        &env.external_ref_index_db,
        &env.identities_db,
        &env.identities_by_participant_db,
        &env.attempts_db,
        &env.meta_db,
    ];
    for (name, db) in DATABASE_NAMES.iter().zip(databases) {
        report.databases_checked += 1;
        match db.len(&rtxn) {
            Ok(count) => report.total_entries += count,
            Err(e) => report
                .errors
                .push(format!("failed to read database '{name}': {e}")),
        }
    }

    check_participants(env, &rtxn, &mut report)?;
    check_index(env, &rtxn, &env.national_id_index_db, "national id", &mut report)?;
    check_index(env, &rtxn, &env.label_index_db, "label", &mut report)?;
    check_index(env, &rtxn, &env.external_ref_index_db, "external ref", &mut report)?;
    check_identities(env, &rtxn, &mut report)?;
    check_attempts(env, &rtxn, &mut report)?;

    if report.is_healthy() {
        tracing::debug!(entries = report.total_entries, "store integrity check passed");
    } else {
        tracing::warn!(errors = report.errors.len(), "store integrity check found problems");
    }
    Ok(report)
}

fn participant_exists(env: &LmdbEnvironment, rtxn: &RoTxn, id: &[u8]) -> Result<bool, LmdbError> {
    Ok(env.participants_db.get(rtxn, id)?.is_some())
}

/// Each participant's unique fields must point back at it.
fn check_participants(
    env: &LmdbEnvironment,
    rtxn: &RoTxn,
    report: &mut IntegrityReport,
) -> Result<(), LmdbError> {
    for result in env.participants_db.iter(rtxn)? {
        let (key, bytes) = result?;
        report.participants += 1;
        let participant: Participant = match decode(bytes) {
            Ok(p) => p,
            Err(e) => {
                report.errors.push(format!("undecodable participant record: {e}"));
                continue;
            }
        };
        if key != participant.id.as_bytes() {
            report
                .errors
                .push(format!("participant {} stored under a foreign key", participant.id));
        }
        let expected = [
            (&env.national_id_index_db, participant.national_id.as_str(), "national id"),
            (&env.label_index_db, participant.label.as_str(), "label"),
            (&env.external_ref_index_db, participant.external_ref.as_str(), "external ref"),
        ];
        for (db, value, what) in expected {
            match db.get(rtxn, value.as_bytes())? {
                Some(owner) if owner == participant.id.as_bytes() => {}
                Some(_) => report.errors.push(format!(
                    "{what} '{value}' of participant {} is indexed to someone else",
                    participant.id
                )),
                None => report.errors.push(format!(
                    "{what} '{value}' of participant {} is not indexed",
                    participant.id
                )),
            }
        }
    }
    Ok(())
}

/// Every index entry must reference an existing participant.
fn check_index(
    env: &LmdbEnvironment,
    rtxn: &RoTxn,
    index: &Database<Bytes, Bytes>,
    what: &str,
    report: &mut IntegrityReport,
) -> Result<(), LmdbError> {
    for result in index.iter(rtxn)? {
        let (key, value) = result?;
        let value_name = String::from_utf8_lossy(key);
        match decode_participant_id(value) {
            Ok(id) if participant_exists(env, rtxn, id.as_bytes())? => {}
            Ok(id) => report.errors.push(format!(
                "{what} '{value_name}' references missing participant {id}"
            )),
            Err(e) => report.errors.push(format!("{what} '{value_name}': {e}")),
        }
    }
    Ok(())
}

fn check_identities(
    env: &LmdbEnvironment,
    rtxn: &RoTxn,
    report: &mut IntegrityReport,
) -> Result<(), LmdbError> {
    for result in env.identities_db.iter(rtxn)? {
        let (key, bytes) = result?;
        report.identities += 1;
        let identity: BiometricIdentity = match decode(bytes) {
            Ok(i) => i,
            Err(e) => {
                report.errors.push(format!(
                    "undecodable mapping for label '{}': {e}",
                    String::from_utf8_lossy(key)
                ));
                continue;
            }
        };
        if !participant_exists(env, rtxn, identity.participant_id.as_bytes())? {
            report.errors.push(format!(
                "label '{}' maps to missing participant {}",
                identity.label, identity.participant_id
            ));
        }
        let reverse = participant_label_key(&identity.participant_id, &identity.label);
        if env.identities_by_participant_db.get(rtxn, &reverse)?.is_none() {
            report.errors.push(format!(
                "label '{}' is missing from the per-participant list",
                identity.label
            ));
        }
    }

    for result in env.identities_by_participant_db.iter(rtxn)? {
        let (key, _) = result?;
        let Some(owner) = participant_prefix(key) else {
            report
                .errors
                .push("short key in identities_by_participant".to_string());
            continue;
        };
        let label = &key[PARTICIPANT_ID_LEN..];
        let mapped = env.identities_db.get(rtxn, label)?;
        let owned = match mapped {
            Some(bytes) => decode::<BiometricIdentity>(bytes)
                .map(|i| i.participant_id == owner)
                .unwrap_or(false),
            None => false,
        };
        if !owned {
            report.errors.push(format!(
                "participant {owner} lists label '{}' that is not mapped to it",
                String::from_utf8_lossy(label)
            ));
        }
    }
    Ok(())
}

fn check_attempts(
    env: &LmdbEnvironment,
    rtxn: &RoTxn,
    report: &mut IntegrityReport,
) -> Result<(), LmdbError> {
    for result in env.attempts_db.iter(rtxn)? {
        let (key, bytes) = result?;
        report.attempts += 1;
        let Some(owner) = participant_prefix(key) else {
            report.errors.push("short key in attempts".to_string());
            continue;
        };
        match decode::<VerificationAttempt>(bytes) {
            Ok(attempt) => {
                if attempt.participant_id != owner {
                    report.errors.push(format!(
                        "attempt {} filed under participant {owner} but belongs to {}",
                        attempt.id, attempt.participant_id
                    ));
                }
                let time = &key[PARTICIPANT_ID_LEN..key.len().min(PARTICIPANT_ID_LEN + 8)];
                if key.len() != ATTEMPT_KEY_LEN
                    || time != &attempt.verified_at.as_millis().to_be_bytes()[..]
                {
                    report.errors.push(format!(
                        "attempt {} of participant {owner} is filed under the wrong time",
                        attempt.id
                    ));
                }
            }
            Err(e) => report
                .errors
                .push(format!("undecodable attempt of participant {owner}: {e}")),
        }
        if !participant_exists(env, rtxn, owner.as_bytes())? {
            report
                .errors
                .push(format!("attempt references missing participant {owner}"));
        }
    }
    Ok(())
}
