//! Liveness port.
//!
//! The verification flow asks a [`LivenessChecker`] whether an image shows a
//! live subject before it spends a recognition call. Detection itself lives
//! outside this workspace; this crate defines the boundary and the
//! configuration-driven checker used when no detector is wired in.

pub mod checker;
pub mod error;

pub use checker::{LivenessChecker, LivenessConfig, LivenessVerdict, ToggleLivenessChecker};
pub use error::LivenessError;

/// Reason reported when the check is switched off in configuration.
pub const REASON_DISABLED: &str = "liveness_disabled";

/// Reason reported by a passing pass-through check.
pub const REASON_OK: &str = "ok";
