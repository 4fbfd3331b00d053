//! LMDB storage backend.
//!
//! Implements all storage traits from `lifecert-store` using the `heed` LMDB
//! bindings. Every logical store maps to one or more LMDB databases inside a
//! single environment, which is what makes [`Store::enroll`] and
//! [`Store::purge_participant`] atomic: they run in one write transaction.
//!
//! [`Store::enroll`]: lifecert_store::Store::enroll
//! [`Store::purge_participant`]: lifecert_store::Store::purge_participant

mod codec;
pub mod environment;
pub mod error;
pub mod identity;
pub mod integrity;
pub mod keys;
pub mod ledger;
pub mod meta;
pub mod participant;
pub mod write_batch;

pub use environment::LmdbEnvironment;
pub use error::LmdbError;
pub use integrity::{check_integrity, IntegrityReport};
pub use write_batch::WriteBatch;
