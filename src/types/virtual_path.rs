// ABOUTME: Single-segment virtual path under the shared site.
// ABOUTME: Always of the form "/segment" with the pool-name character set.

use super::pool_name::{PoolName, PoolNameError};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VirtualPathError {
    #[error("invalid virtual path segment: {0}")]
    InvalidSegment(#[from] PoolNameError),
}

/// Virtual path at which an application is registered under the shared site.
///
/// Always a single segment with a leading slash, e.g. `/run42`. The segment
/// character set matches [`PoolName`] since both are derived from the same
/// artifact directory name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VirtualPath(String);

impl VirtualPath {
    /// Build a virtual path from a bare segment (no leading slash).
    pub fn from_segment(segment: &str) -> Result<Self, VirtualPathError> {
        // Reuse the pool name validation; the constraints are identical.
        PoolName::new(segment)?;
        Ok(Self(format!("/{segment}")))
    }

    /// The full path including the leading slash.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The path segment without the leading slash.
    pub fn segment(&self) -> &str {
        self.0.trim_start_matches('/')
    }
}

impl fmt::Display for VirtualPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
