//! String-valued identity attributes: biometric labels, external references
//! and national identity numbers.
//!
//! All three are trimmed on construction through [`parse`](BiometricLabel::parse)
//! and can never be blank once built that way.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::TypesError;

macro_rules! trimmed_string {
    ($(#[$meta:meta])* $name:ident, $what:literal) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(String);

        impl $name {
            /// Trim `raw` and reject it if nothing is left.
            pub fn parse(raw: impl AsRef<str>) -> Result<Self, TypesError> {
                let trimmed = raw.as_ref().trim();
                if trimmed.is_empty() {
                    return Err(TypesError::Blank($what));
                }
                Ok(Self(trimmed.to_string()))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

trimmed_string!(
    /// Opaque identifier the remote recognition engine assigns to one enrolled face encoding.
    BiometricLabel,
    "biometric label"
);

trimmed_string!(
    /// Reference string sent to the remote engine alongside a face; the participant id by default.
    ExternalRef,
    "external reference"
);

trimmed_string!(
    /// National identity number. At most one participant per value.
    NationalId,
    "national id"
);

impl BiometricLabel {
    /// Fresh random candidate label, offered to the engine at registration.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl From<crate::ParticipantId> for ExternalRef {
    fn from(id: crate::ParticipantId) -> Self {
        Self(id.to_string())
    }
}
