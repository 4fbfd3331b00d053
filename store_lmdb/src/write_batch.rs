//! Write batching: groups several store operations into a single LMDB write
//! transaction so that they commit or roll back together.
//!
//! # Usage
//!
//! ```ignore
//! let mut batch = env.write_batch()?;
//! batch.insert_participant(&participant)?;
//! batch.bind_identity(&identity)?;
//! batch.commit()?;
//! ```
//!
//! If the batch is dropped without calling [`WriteBatch::commit`], all
//! operations are rolled back (the underlying LMDB transaction is aborted).

use heed::RwTxn;

use lifecert_store::{BiometricIdentity, Participant, PurgeSummary, StoreError, VerificationAttempt};
use lifecert_types::ParticipantId;

use crate::codec::{encode, get_decoded, get_participant_id};
use crate::environment::LmdbEnvironment;
use crate::keys::{attempt_key, participant_label_key, PrefixRange, PARTICIPANT_ID_LEN};
use crate::{meta, LmdbError};

pub struct WriteBatch<'a> {
    txn: RwTxn<'a>,
    env: &'a LmdbEnvironment,
}

impl<'a> WriteBatch<'a> {
    pub(crate) fn new(env: &'a LmdbEnvironment) -> Result<Self, StoreError> {
        let txn = env.env().write_txn().map_err(LmdbError::from)?;
        Ok(Self { txn, env })
    }

    // ── Participants ────────────────────────────────────────────────────

    fn load_participant(&self, id: &ParticipantId) -> Result<Option<Participant>, StoreError> {
        Ok(get_decoded(&self.env.participants_db, &self.txn, id.as_bytes())?)
    }

    /// Insert a new participant and its three unique indexes.
    pub fn insert_participant(&mut self, participant: &Participant) -> Result<(), StoreError> {
        let env = self.env;
        if self.load_participant(&participant.id)?.is_some() {
            return Err(StoreError::Duplicate(format!("participant {}", participant.id)));
        }
        let unique = [
            (&env.national_id_index_db, participant.national_id.as_str(), "national id"),
            (&env.label_index_db, participant.label.as_str(), "label"),
            (&env.external_ref_index_db, participant.external_ref.as_str(), "external reference"),
        ];
        for (db, value, what) in unique {
            if db.get(&self.txn, value.as_bytes()).map_err(LmdbError::from)?.is_some() {
                return Err(StoreError::Duplicate(format!("{what} '{value}'")));
            }
        }

        let id = participant.id.as_bytes();
        env.participants_db
            .put(&mut self.txn, id, &encode(participant)?)
            .map_err(LmdbError::from)?;
        for (db, value, _) in unique {
            db.put(&mut self.txn, value.as_bytes(), id)
                .map_err(LmdbError::from)?;
        }
        Ok(())
    }

    /// Rewrite national id, display name and `updated_at` of an existing participant.
    pub fn update_participant(&mut self, updated: &Participant) -> Result<(), StoreError> {
        let env = self.env;
        let mut current = self
            .load_participant(&updated.id)?
            .ok_or_else(|| StoreError::NotFound(format!("participant {}", updated.id)))?;

        if current.national_id != updated.national_id {
            let new_nid = updated.national_id.as_str().as_bytes();
            if let Some(owner) = get_participant_id(&env.national_id_index_db, &self.txn, new_nid)? {
                if owner != updated.id {
                    return Err(StoreError::Duplicate(format!(
                        "national id '{}'",
                        updated.national_id
                    )));
                }
            }
            env.national_id_index_db
                .delete(&mut self.txn, current.national_id.as_str().as_bytes())
                .map_err(LmdbError::from)?;
            env.national_id_index_db
                .put(&mut self.txn, new_nid, updated.id.as_bytes())
                .map_err(LmdbError::from)?;
        }

        current.national_id = updated.national_id.clone();
        current.display_name = updated.display_name.clone();
        current.updated_at = updated.updated_at;
        env.participants_db
            .put(&mut self.txn, updated.id.as_bytes(), &encode(&current)?)
            .map_err(LmdbError::from)?;
        Ok(())
    }

    /// Remove a participant with its indexes, label mappings and attempts.
    pub fn delete_participant_cascade(
        &mut self,
        id: &ParticipantId,
    ) -> Result<PurgeSummary, StoreError> {
        let env = self.env;
        let participant = self
            .load_participant(id)?
            .ok_or_else(|| StoreError::NotFound(format!("participant {id}")))?;

        env.participants_db
            .delete(&mut self.txn, id.as_bytes())
            .map_err(LmdbError::from)?;
        env.national_id_index_db
            .delete(&mut self.txn, participant.national_id.as_str().as_bytes())
            .map_err(LmdbError::from)?;
        env.label_index_db
            .delete(&mut self.txn, participant.label.as_str().as_bytes())
            .map_err(LmdbError::from)?;
        env.external_ref_index_db
            .delete(&mut self.txn, participant.external_ref.as_str().as_bytes())
            .map_err(LmdbError::from)?;

        let range = PrefixRange::new(id.as_bytes());

        let identity_keys = self.collect_keys(&env.identities_by_participant_db, &range)?;
        for key in &identity_keys {
            env.identities_db
                .delete(&mut self.txn, &key[PARTICIPANT_ID_LEN..])
                .map_err(LmdbError::from)?;
            env.identities_by_participant_db
                .delete(&mut self.txn, key)
                .map_err(LmdbError::from)?;
        }

        let attempt_keys = self.collect_keys(&env.attempts_db, &range)?;
        for key in &attempt_keys {
            env.attempts_db
                .delete(&mut self.txn, key)
                .map_err(LmdbError::from)?;
        }

        Ok(PurgeSummary {
            attempts_removed: attempt_keys.len() as u64,
            identities_removed: identity_keys.len() as u64,
        })
    }

    // ── Label mappings ──────────────────────────────────────────────────

    /// Insert a mapping unless the label is already bound. Never overwrites.
    pub fn bind_identity(&mut self, identity: &BiometricIdentity) -> Result<bool, StoreError> {
        let env = self.env;
        let label = identity.label.as_str().as_bytes();
        if env
            .identities_db
            .get(&self.txn, label)
            .map_err(LmdbError::from)?
            .is_some()
        {
            return Ok(false);
        }
        if self.load_participant(&identity.participant_id)?.is_none() {
            return Err(StoreError::NotFound(format!(
                "participant {}",
                identity.participant_id
            )));
        }

        env.identities_db
            .put(&mut self.txn, label, &encode(identity)?)
            .map_err(LmdbError::from)?;
        env.identities_by_participant_db
            .put(
                &mut self.txn,
                &participant_label_key(&identity.participant_id, &identity.label),
                &[],
            )
            .map_err(LmdbError::from)?;
        Ok(true)
    }

    // ── Ledger ──────────────────────────────────────────────────────────

    /// Add an attempt to the participant's history, filed by `verified_at`.
    /// Attempts with equal timestamps keep their append order.
    pub fn append_attempt(&mut self, attempt: &VerificationAttempt) -> Result<(), StoreError> {
        let env = self.env;
        if self.load_participant(&attempt.participant_id)?.is_none() {
            return Err(StoreError::NotFound(format!(
                "participant {}",
                attempt.participant_id
            )));
        }
        let seq = meta::next_attempt_seq(&env.meta_db, &mut self.txn)?;
        env.attempts_db
            .put(
                &mut self.txn,
                &attempt_key(&attempt.participant_id, attempt.verified_at, seq),
                &encode(attempt)?,
            )
            .map_err(LmdbError::from)?;
        Ok(())
    }

    fn collect_keys(
        &self,
        db: &heed::Database<heed::types::Bytes, heed::types::Bytes>,
        range: &PrefixRange,
    ) -> Result<Vec<Vec<u8>>, StoreError> {
        let bounds = range.bounds();
        let iter = db.range(&self.txn, &bounds).map_err(LmdbError::from)?;
        let mut keys = Vec::new();
        for result in iter {
            let (key, _) = result.map_err(LmdbError::from)?;
            keys.push(key.to_vec());
        }
        Ok(keys)
    }

    /// Commit all batched operations atomically.
    pub fn commit(self) -> Result<(), StoreError> {
        self.txn.commit().map_err(LmdbError::from)?;
        Ok(())
    }
}
