//! LMDB implementation of AttemptLedger.

use lifecert_store::{AttemptLedger, StoreError, VerificationAttempt};
use lifecert_types::ParticipantId;

use crate::codec::decode;
use crate::environment::LmdbEnvironment;
use crate::keys::PrefixRange;
use crate::LmdbError;

impl AttemptLedger for LmdbEnvironment {
    fn append_attempt(&self, attempt: &VerificationAttempt) -> Result<(), StoreError> {
        let mut batch = self.write_batch()?;
        batch.append_attempt(attempt)?;
        batch.commit()
    }

    fn latest_attempt(
        &self,
        participant: &ParticipantId,
    ) -> Result<Option<VerificationAttempt>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let range = PrefixRange::new(participant.as_bytes());
        let bounds = range.bounds();
        let mut iter = self
            .attempts_db
            .rev_range(&rtxn, &bounds)
            .map_err(LmdbError::from)?;
        match iter.next() {
            Some(result) => {
                let (_key, bytes) = result.map_err(LmdbError::from)?;
                Ok(Some(decode(bytes)?))
            }
            None => Ok(None),
        }
    }

    fn attempts_for(
        &self,
        participant: &ParticipantId,
    ) -> Result<Vec<VerificationAttempt>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let range = PrefixRange::new(participant.as_bytes());
        let bounds = range.bounds();
        let mut attempts = Vec::new();
        for result in self
            .attempts_db
            .range(&rtxn, &bounds)
            .map_err(LmdbError::from)?
        {
            let (_key, bytes) = result.map_err(LmdbError::from)?;
            attempts.push(decode(bytes)?);
        }
        Ok(attempts)
    }
}
