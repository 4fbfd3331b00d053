//! Proof-of-life verification.
//!
//! Two flows over the same store:
//! 1. **Registration**: enroll a face with the recognition engine, then
//!    persist the participant and its first label mapping in one unit.
//! 2. **Verification**: liveness gate, recognition, identity resolution
//!    (including first-seen alias binding), status decision, ledger write.
//!
//! Every attempt ends in one of three trust states: `VALID` (confirmed
//! match), `INVALID` (confirmed mismatch) or `REVIEW` (inconclusive, liveness
//! did not pass). Dependency failures record nothing.
//!
//! Maintenance and audit reads that need only the store live in
//! [`ParticipantService`].

pub mod config;
pub mod decision;
pub mod error;
pub mod participants;
pub mod registration;
pub mod request;
pub mod service;

pub use config::VerificationConfig;
pub use decision::{decide_status, evaluate_signals, Signals};
pub use error::{ErrorKind, ServiceError};
pub use participants::ParticipantService;
pub use registration::RegistrationService;
pub use request::{
    LatestStatus, RegisterRequest, Registration, UpdateRequest, VerificationOutcome,
    VerifyRequest,
};
pub use service::VerificationService;
