//! LMDB implementation of ParticipantStore.

use lifecert_store::participant::sort_newest_first;
use lifecert_store::{Participant, ParticipantStore, StoreError};
use lifecert_types::{NationalId, ParticipantId};

use crate::codec::{decode, get_decoded, get_participant_id};
use crate::environment::LmdbEnvironment;
use crate::LmdbError;

impl ParticipantStore for LmdbEnvironment {
    fn get_participant(&self, id: &ParticipantId) -> Result<Option<Participant>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        Ok(get_decoded(&self.participants_db, &rtxn, id.as_bytes())?)
    }

    fn get_participant_by_national_id(
        &self,
        national_id: &NationalId,
    ) -> Result<Option<Participant>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let Some(id) = get_participant_id(
            &self.national_id_index_db,
            &rtxn,
            national_id.as_str().as_bytes(),
        )?
        else {
            return Ok(None);
        };
        let participant = get_decoded(&self.participants_db, &rtxn, id.as_bytes())?;
        if participant.is_none() {
            return Err(StoreError::Corruption(format!(
                "national id index points at missing participant {id}"
            )));
        }
        Ok(participant)
    }

    fn list_participants(&self) -> Result<Vec<Participant>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let mut participants = Vec::new();
        for result in self.participants_db.iter(&rtxn).map_err(LmdbError::from)? {
            let (_key, bytes) = result.map_err(LmdbError::from)?;
            participants.push(decode::<Participant>(bytes)?);
        }
        sort_newest_first(&mut participants);
        Ok(participants)
    }

    fn update_participant(&self, participant: &Participant) -> Result<(), StoreError> {
        let mut batch = self.write_batch()?;
        batch.update_participant(participant)?;
        batch.commit()
    }
}
