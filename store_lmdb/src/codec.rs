use heed::types::Bytes;
use heed::{Database, RoTxn};
use serde::de::DeserializeOwned;
use serde::Serialize;

use lifecert_types::ParticipantId;

use crate::keys::PARTICIPANT_ID_LEN;
use crate::LmdbError;

pub(crate) fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, LmdbError> {
    Ok(bincode::serialize(value)?)
}

pub(crate) fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, LmdbError> {
    Ok(bincode::deserialize(bytes)?)
}

/// Read and decode one value.
pub(crate) fn get_decoded<T: DeserializeOwned>(
    db: &Database<Bytes, Bytes>,
    txn: &RoTxn,
    key: &[u8],
) -> Result<Option<T>, LmdbError> {
    match db.get(txn, key)? {
        Some(bytes) => decode(bytes).map(Some),
        None => Ok(None),
    }
}

/// Index values are raw 16-byte participant ids.
pub(crate) fn decode_participant_id(bytes: &[u8]) -> Result<ParticipantId, LmdbError> {
    let arr: [u8; PARTICIPANT_ID_LEN] = bytes.try_into().map_err(|_| {
        LmdbError::Corruption(format!(
            "index value has {} bytes, expected a {PARTICIPANT_ID_LEN}-byte participant id",
            bytes.len()
        ))
    })?;
    Ok(ParticipantId::from_bytes(arr))
}

pub(crate) fn get_participant_id(
    db: &Database<Bytes, Bytes>,
    txn: &RoTxn,
    key: &[u8],
) -> Result<Option<ParticipantId>, LmdbError> {
    match db.get(txn, key)? {
        Some(bytes) => decode_participant_id(bytes).map(Some),
        None => Ok(None),
    }
}
