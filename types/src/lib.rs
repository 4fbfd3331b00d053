//! Fundamental types for the proof-of-life verification engine.
//!
//! This crate defines the vocabulary shared by every other crate in the workspace:
//! participant and attempt identifiers, biometric labels, national identity numbers,
//! timestamps and the attempt status enum.

pub mod error;
pub mod id;
pub mod label;
pub mod status;
pub mod time;

pub use error::TypesError;
pub use id::{AttemptId, ParticipantId};
pub use label::{BiometricLabel, ExternalRef, NationalId};
pub use status::AttemptStatus;
pub use time::{Clock, SystemClock, Timestamp};
