//! Recognition port.
//!
//! [`RecognitionClient`] is the boundary between the flows and the remote
//! face-recognition engine: `bind` enrolls an image under a label, and
//! `recognize` returns the best-matching label with its scores.
//! [`FrCoreClient`] speaks the FR Core HTTP API.

pub mod client;
pub mod content_type;
pub mod error;
pub mod port;

pub use client::{FrCoreClient, FrCoreConfig};
pub use content_type::detect_content_type;
pub use error::RecognitionError;
pub use port::{BindRequest, BoundFace, Recognition, RecognitionClient, RecognizeRequest};
