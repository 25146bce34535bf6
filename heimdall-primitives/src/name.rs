//! Agent naming types.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Maximum accepted length for an agent name, in bytes.
const MAX_LEN: usize = 64;

/// Name of a logical agent under watch (e.g. `odin`, `thor`, `freya`).
///
/// Names are trimmed and lowercased on construction so lookups are
/// case-insensitive; the accepted alphabet is `a-z`, `0-9`, `-`, and `_`.
/// Deserialization goes through the same validation, so snapshots and config
/// files cannot smuggle in unnormalized names.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub struct AgentName(String);

impl AgentName {
    /// Creates a validated agent name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAgentName`] when the name is empty after
    /// trimming, exceeds 64 bytes, or contains characters outside the
    /// accepted alphabet.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let raw = name.into();
        let normalized = raw.trim().to_ascii_lowercase();

        if normalized.is_empty() {
            return Err(Error::InvalidAgentName {
                name: raw,
                reason: "name must not be empty",
            });
        }
        if normalized.len() > MAX_LEN {
            return Err(Error::InvalidAgentName {
                name: raw,
                reason: "name exceeds 64 bytes",
            });
        }
        if !normalized
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
        {
            return Err(Error::InvalidAgentName {
                name: raw,
                reason: "name may only contain a-z, 0-9, `-`, and `_`",
            });
        }

        Ok(Self(normalized))
    }

    /// Returns the normalized name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for AgentName {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl FromStr for AgentName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for AgentName {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl AsRef<str> for AgentName {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}
