// ABOUTME: Validated execution pool name derived from an artifact directory.
// ABOUTME: Ensures names are safe for the registry and for filesystem paths.

use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PoolNameError {
    #[error("pool name cannot be empty")]
    Empty,

    #[error("pool name exceeds maximum length of 64 characters")]
    TooLong,

    #[error("pool name cannot start with a hyphen")]
    StartsWithHyphen,

    #[error("pool name cannot end with a hyphen")]
    EndsWithHyphen,

    #[error("invalid character in pool name: '{0}'")]
    InvalidChar(char),
}

/// Name of an isolated execution pool in the host registry.
///
/// The same string doubles as the virtual-path segment and the published
/// directory name, so the character set is restricted to ASCII alphanumerics
/// plus `-` and `_`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PoolName(String);

impl PoolName {
    pub fn new(value: &str) -> Result<Self, PoolNameError> {
        if value.is_empty() {
            return Err(PoolNameError::Empty);
        }

        if value.len() > 64 {
            return Err(PoolNameError::TooLong);
        }

        if value.starts_with('-') {
            return Err(PoolNameError::StartsWithHyphen);
        }

        if value.ends_with('-') {
            return Err(PoolNameError::EndsWithHyphen);
        }

        for c in value.chars() {
            if !c.is_ascii_alphanumeric() && c != '-' && c != '_' {
                return Err(PoolNameError::InvalidChar(c));
            }
        }

        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PoolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
