//! LMDB environment setup.

use std::path::Path;
use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};

use lifecert_store::{BiometricIdentity, Participant, PurgeSummary, Store, StoreError};
use lifecert_types::ParticipantId;

use crate::meta::{self, CURRENT_SCHEMA_VERSION};
use crate::write_batch::WriteBatch;
use crate::LmdbError;

/// Upper bound on named databases in the environment.
const MAX_DBS: u32 = 16;

/// Default map size: 1 GiB.
pub const DEFAULT_MAP_SIZE: usize = 1 << 30;

pub(crate) const DATABASE_NAMES: &[&str] = &[
    "participants",
    "participants_by_national_id",
    "participants_by_label",
    "participants_by_external_ref",
    "identities",
    "identities_by_participant",
    "attempts",
    "meta",
];

/// Wraps the LMDB environment and all database handles.
pub struct LmdbEnvironment {
    pub(crate) env: Arc<Env>,
    pub(crate) participants_db: Database<Bytes, Bytes>,
    pub(crate) national_id_index_db: Database<Bytes, Bytes>,
    pub(crate) label_index_db: Database<Bytes, Bytes>,
    pub(crate) external_ref_index_db: Database<Bytes, Bytes>,
    pub(crate) identities_db: Database<Bytes, Bytes>,
    pub(crate) identities_by_participant_db: Database<Bytes, Bytes>,
    pub(crate) attempts_db: Database<Bytes, Bytes>,
    pub(crate) meta_db: Database<Bytes, Bytes>,
}

impl LmdbEnvironment {
    /// Open or create an LMDB environment at the given directory.
    ///
    /// Creates the directory and every database if missing, stamps the schema
    /// version on a fresh store and refuses a store written by a newer schema.
    pub fn open(path: &Path, map_size: usize) -> Result<Self, LmdbError> {
        std::fs::create_dir_all(path)?;

        // SAFETY: the environment is opened once per process for this path and
        // the memory map is never accessed outside of heed transactions.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size)
                .max_dbs(MAX_DBS)
                .open(path)?
        };

        let mut wtxn = env.write_txn()?;
        let participants_db = env.create_database(&mut wtxn, Some("participants"))?;
        let national_id_index_db =
            env.create_database(&mut wtxn, Some("participants_by_national_id"))?;
        let label_index_db = env.create_database(&mut wtxn, Some("participants_by_label"))?;
        let external_ref_index_db =
            env.create_database(&mut wtxn, Some("participants_by_external_ref"))?;
        let identities_db = env.create_database(&mut wtxn, Some("identities"))?;
        let identities_by_participant_db =
            env.create_database(&mut wtxn, Some("identities_by_participant"))?;
        let attempts_db = env.create_database(&mut wtxn, Some("attempts"))?;
        let meta_db: Database<Bytes, Bytes> = env.create_database(&mut wtxn, Some("meta"))?;

        let found = meta::schema_version(&meta_db, &wtxn)?;
        if found > CURRENT_SCHEMA_VERSION {
            return Err(LmdbError::SchemaTooNew {
                found,
                supported: CURRENT_SCHEMA_VERSION,
            });
        }
        if found < CURRENT_SCHEMA_VERSION {
            meta::set_schema_version(&meta_db, &mut wtxn, CURRENT_SCHEMA_VERSION)?;
            tracing::info!(
                from = found,
                to = CURRENT_SCHEMA_VERSION,
                "stamped store schema version"
            );
        }
        wtxn.commit()?;

        tracing::debug!(path = %path.display(), map_size, "opened LMDB environment");

        Ok(Self {
            env: Arc::new(env),
            participants_db,
            national_id_index_db,
            label_index_db,
            external_ref_index_db,
            identities_db,
            identities_by_participant_db,
            attempts_db,
            meta_db,
        })
    }

    /// Begin a write batch. Dropping it without [`WriteBatch::commit`] rolls back.
    pub fn write_batch(&self) -> Result<WriteBatch<'_>, StoreError> {
        WriteBatch::new(self)
    }

    pub fn env(&self) -> &Env {
        &self.env
    }

    pub fn schema_version(&self) -> Result<u32, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        Ok(meta::schema_version(&self.meta_db, &rtxn)?)
    }
}

impl Store for LmdbEnvironment {
    fn enroll(
        &self,
        participant: &Participant,
        identity: &BiometricIdentity,
    ) -> Result<(), StoreError> {
        let mut batch = self.write_batch()?;
        batch.insert_participant(participant)?;
        if !batch.bind_identity(identity)? {
            return Err(StoreError::Duplicate(format!(
                "label '{}' is already bound",
                identity.label
            )));
        }
        batch.commit()
    }

    fn purge_participant(&self, id: &ParticipantId) -> Result<PurgeSummary, StoreError> {
        let mut batch = self.write_batch()?;
        let summary = batch.delete_participant_cascade(id)?;
        batch.commit()?;
        Ok(summary)
    }
}
