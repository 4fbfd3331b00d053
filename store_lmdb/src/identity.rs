//! LMDB implementation of IdentityStore.
//!
//! Mappings are keyed by label in `identities`; `identities_by_participant`
//! holds `participant_id ++ label` keys so a participant's labels are one
//! prefix scan.

use lifecert_store::{BiometricIdentity, IdentityStore, StoreError};
use lifecert_types::{BiometricLabel, ParticipantId};

use crate::codec::get_decoded;
use crate::environment::LmdbEnvironment;
use crate::keys::{PrefixRange, PARTICIPANT_ID_LEN};
use crate::LmdbError;

impl IdentityStore for LmdbEnvironment {
    fn bind_identity(&self, identity: &BiometricIdentity) -> Result<bool, StoreError> {
        let mut batch = self.write_batch()?;
        let inserted = batch.bind_identity(identity)?;
        if inserted {
            batch.commit()?;
        }
        Ok(inserted)
    }

    fn get_identity(&self, label: &BiometricLabel) -> Result<Option<BiometricIdentity>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        Ok(get_decoded(&self.identities_db, &rtxn, label.as_str().as_bytes())?)
    }

    fn identities_for(
        &self,
        participant: &ParticipantId,
    ) -> Result<Vec<BiometricIdentity>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let range = PrefixRange::new(participant.as_bytes());
        let bounds = range.bounds();
        let mut identities = Vec::new();
        for result in self
            .identities_by_participant_db
            .range(&rtxn, &bounds)
            .map_err(LmdbError::from)?
        {
            let (key, _) = result.map_err(LmdbError::from)?;
            let label = &key[PARTICIPANT_ID_LEN..];
            match get_decoded(&self.identities_db, &rtxn, label)? {
                Some(identity) => identities.push(identity),
                None => {
                    return Err(StoreError::Corruption(format!(
                        "participant {participant} lists label '{}' with no mapping",
                        String::from_utf8_lossy(label)
                    )))
                }
            }
        }
        Ok(identities)
    }
}
