//! Nullable liveness detector.

use std::sync::atomic::{AtomicUsize, Ordering};

use lifecert_liveness::{LivenessChecker, LivenessError, LivenessVerdict};

enum Script {
    Verdict(LivenessVerdict),
    Unavailable(String),
}

/// Returns the same scripted answer for every image and counts calls.
pub struct NullLiveness {
    script: Script,
    calls: AtomicUsize,
}

impl NullLiveness {
    pub fn passing() -> Self {
        Self::with(Script::Verdict(LivenessVerdict::pass("ok")))
    }

    pub fn failing(reason: &str) -> Self {
        Self::with(Script::Verdict(LivenessVerdict::fail(reason)))
    }

    /// Every evaluation fails with [`LivenessError::Unavailable`].
    pub fn unavailable(message: &str) -> Self {
        Self::with(Script::Unavailable(message.to_string()))
    }

    fn with(script: Script) -> Self {
        Self {
            script,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl LivenessChecker for NullLiveness {
    async fn evaluate(&self, _image: &[u8]) -> Result<LivenessVerdict, LivenessError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.script {
            Script::Verdict(verdict) => Ok(verdict.clone()),
            Script::Unavailable(message) => Err(LivenessError::Unavailable(message.clone())),
        }
    }
}
