use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::{LivenessError, REASON_DISABLED, REASON_OK};

/// Outcome of a liveness evaluation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LivenessVerdict {
    pub passed: bool,
    /// Short machine-readable reason, recorded as attempt notes on failure.
    pub reason: String,
}

impl LivenessVerdict {
    pub fn pass(reason: impl Into<String>) -> Self {
        Self {
            passed: true,
            reason: reason.into(),
        }
    }

    pub fn fail(reason: impl Into<String>) -> Self {
        Self {
            passed: false,
            reason: reason.into(),
        }
    }
}

pub trait LivenessChecker: Send + Sync {
    fn evaluate(
        &self,
        image: &[u8],
    ) -> impl Future<Output = Result<LivenessVerdict, LivenessError>> + Send;
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LivenessConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl Default for LivenessConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
        }
    }
}

/// Configuration switch standing in for a detector.
///
/// Enabled, every image passes with reason `"ok"`. Disabled, every image
/// fails with reason `"liveness_disabled"`, which routes all attempts to
/// manual review.
#[derive(Clone, Copy, Debug)]
pub struct ToggleLivenessChecker {
    enabled: bool,
}

impl ToggleLivenessChecker {
    pub fn new(config: &LivenessConfig) -> Self {
        Self {
            enabled: config.enabled,
        }
    }

    pub fn enabled() -> Self {
        Self { enabled: true }
    }

    pub fn disabled() -> Self {
        Self { enabled: false }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

impl LivenessChecker for ToggleLivenessChecker {
    async fn evaluate(&self, image: &[u8]) -> Result<LivenessVerdict, LivenessError> {
        let verdict = if self.enabled {
            LivenessVerdict::pass(REASON_OK)
        } else {
            LivenessVerdict::fail(REASON_DISABLED)
        };
        tracing::debug!(
            bytes = image.len(),
            passed = verdict.passed,
            reason = %verdict.reason,
            "liveness evaluated"
        );
        Ok(verdict)
    }
}
