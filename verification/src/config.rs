use serde::{Deserialize, Serialize};

/// Decision thresholds for the verification flow.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VerificationConfig {
    /// Largest distance that still counts as a match. Lower is closer.
    #[serde(default = "default_distance_threshold")]
    pub distance_threshold: f64,
    /// Smallest similarity (percent) that counts as a match.
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,
}

fn default_distance_threshold() -> f64 {
    0.6
}

fn default_similarity_threshold() -> f64 {
    75.0
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            distance_threshold: default_distance_threshold(),
            similarity_threshold: default_similarity_threshold(),
        }
    }
}
