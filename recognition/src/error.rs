use thiserror::Error;

/// Errors from the remote recognition engine.
///
/// Every variant is an opaque failure to the flows: no partial result is
/// ever inferred from a failed call.
#[derive(Debug, Error)]
pub enum RecognitionError {
    /// Rejected locally before anything was sent.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    /// HTTP status >= 400. `body` is the bounded preview of the response.
    #[error("engine returned HTTP {code}: {body}")]
    Status { code: u16, body: String },

    /// The envelope status was not "success".
    #[error("engine rejected the request: {0}")]
    Rejected(String),

    #[error("failed to decode engine response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for RecognitionError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            RecognitionError::Timeout(e.to_string())
        } else if e.is_connect() {
            RecognitionError::Transport(format!("connection failed: {e}"))
        } else {
            RecognitionError::Transport(e.to_string())
        }
    }
}
