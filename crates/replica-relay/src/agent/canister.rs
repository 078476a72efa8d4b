//! Canister id validation
//!
//! Canister ids end up in request paths, so they are restricted to the
//! textual principal alphabet: lowercase letters, digits and hyphens.

use thiserror::Error;

/// Maximum length for canister ids
const MAX_CANISTER_ID_LEN: usize = 63;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CanisterIdError {
    #[error("Canister id cannot be empty")]
    Empty,

    #[error("Canister id contains invalid characters: allowed are a-z, 0-9, -")]
    InvalidChars,

    #[error("Canister id exceeds maximum length of {MAX_CANISTER_ID_LEN} characters")]
    TooLong,
}

/// A validated canister endpoint id
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanisterId(String);

impl CanisterId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn validate(s: &str) -> Result<(), CanisterIdError> {
        if s.is_empty() {
            return Err(CanisterIdError::Empty);
        }

        if s.len() > MAX_CANISTER_ID_LEN {
            return Err(CanisterIdError::TooLong);
        }

        if !s
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        {
            return Err(CanisterIdError::InvalidChars);
        }

        Ok(())
    }
}

impl TryFrom<&str> for CanisterId {
    type Error = CanisterIdError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::validate(value)?;
        Ok(CanisterId(value.to_string()))
    }
}

impl TryFrom<String> for CanisterId {
    type Error = CanisterIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::validate(&value)?;
        Ok(CanisterId(value))
    }
}

impl std::str::FromStr for CanisterId {
    type Err = CanisterIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CanisterId::try_from(s)
    }
}

impl AsRef<str> for CanisterId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CanisterId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
