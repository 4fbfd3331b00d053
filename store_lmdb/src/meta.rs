//! Bookkeeping values in the `meta` database: schema version and the
//! attempt append sequence.

use heed::types::Bytes;
use heed::{Database, RoTxn, RwTxn};

use crate::LmdbError;

/// The schema version that the current code writes.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

const SCHEMA_VERSION_KEY: &[u8] = b"schema_version";
const ATTEMPT_SEQ_KEY: &[u8] = b"attempt_seq";

/// Stored schema version, `0` for a store that was never stamped.
pub fn schema_version(meta_db: &Database<Bytes, Bytes>, txn: &RoTxn) -> Result<u32, LmdbError> {
    match meta_db.get(txn, SCHEMA_VERSION_KEY)? {
        Some(bytes) => {
            let arr: [u8; 4] = bytes.try_into().map_err(|_| {
                LmdbError::Corruption("schema_version has unexpected byte length".to_string())
            })?;
            Ok(u32::from_le_bytes(arr))
        }
        None => Ok(0),
    }
}

pub fn set_schema_version(
    meta_db: &Database<Bytes, Bytes>,
    txn: &mut RwTxn,
    version: u32,
) -> Result<(), LmdbError> {
    meta_db.put(txn, SCHEMA_VERSION_KEY, &version.to_le_bytes())?;
    Ok(())
}

/// Reserve the next attempt sequence number inside the caller's transaction.
///
/// Sequences start at 1 and are never reused, even after purges, so the
/// order of attempt keys is the order in which attempts were appended.
pub fn next_attempt_seq(
    meta_db: &Database<Bytes, Bytes>,
    txn: &mut RwTxn,
) -> Result<u64, LmdbError> {
    let current = match meta_db.get(txn, ATTEMPT_SEQ_KEY)? {
        Some(bytes) => {
            let arr: [u8; 8] = bytes.try_into().map_err(|_| {
                LmdbError::Corruption("attempt_seq has unexpected byte length".to_string())
            })?;
            u64::from_le_bytes(arr)
        }
        None => 0,
    };
    let next = current + 1;
    meta_db.put(txn, ATTEMPT_SEQ_KEY, &next.to_le_bytes())?;
    Ok(next)
}
