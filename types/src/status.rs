//! Outcome of a recorded verification attempt.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::TypesError;

/// The trust state a verification attempt resolves to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AttemptStatus {
    /// Confirmed match: the submitted face belongs to the participant.
    Valid,
    /// Confirmed mismatch.
    Invalid,
    /// Inconclusive; a human has to look at it (liveness did not pass).
    Review,
}

impl AttemptStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Valid => "VALID",
            Self::Invalid => "INVALID",
            Self::Review => "REVIEW",
        }
    }

    /// Whether this outcome proves continued identity.
    pub fn is_confirmed(&self) -> bool {
        matches!(self, Self::Valid)
    }
}

impl fmt::Display for AttemptStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttemptStatus {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "VALID" => Ok(Self::Valid),
            "INVALID" => Ok(Self::Invalid),
            "REVIEW" => Ok(Self::Review),
            _ => Err(TypesError::UnknownStatus(s.to_string())),
        }
    }
}
