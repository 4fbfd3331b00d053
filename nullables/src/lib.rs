//! Nullable infrastructure for deterministic testing.
//!
//! Every external dependency of the flows (clock, storage, liveness
//! detector, recognition engine) sits behind a trait. This crate provides
//! test-friendly implementations that:
//! - Return deterministic, scriptable values
//! - Record how they were called
//! - Never touch the filesystem or network
//!
//! Usage: swap real implementations for nullables in tests.

pub mod clock;
pub mod liveness;
pub mod recognizer;
pub mod store;

pub use clock::NullClock;
pub use liveness::NullLiveness;
pub use recognizer::{BindCall, NullRecognizer};
pub use store::NullStore;
