//! Shared utilities for the proof-of-life verification engine.

pub mod logging;
pub mod preview;

pub use logging::{init_logging, LogFormat};
pub use preview::{body_preview, MAX_PREVIEW_BYTES};
