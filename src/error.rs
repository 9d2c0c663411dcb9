//! Merge errors.

use std::error::Error;
use std::fmt;
use std::fmt::{Debug, Display};

/// Merging error.
///
/// Every variant carries the error produced by the collaborator exactly as it was returned.
/// Exhaustion of a source is never an error.
#[derive(Debug, Clone, PartialEq)]
pub enum MergeError<S, K, C> {
    /// Source pull failure.
    Source(S),
    /// Key computation failure.
    Key(K),
    /// Key comparison failure.
    Compare(C),
}

impl<S, K, C> MergeError<S, K, C> {
    /// Returns the source error if the failure was caused by a source.
    pub fn into_source_error(self) -> Option<S> {
        match self {
            MergeError::Source(err) => Some(err),
            _ => None,
        }
    }
}

impl<S, K, C> Error for MergeError<S, K, C>
where
    S: Error + 'static,
    K: Error + 'static,
    C: Error + 'static,
{
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(match &self {
            MergeError::Source(err) => err,
            MergeError::Key(err) => err,
            MergeError::Compare(err) => err,
        })
    }
}

impl<S: Display, K: Display, C: Display> Display for MergeError<S, K, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self {
            MergeError::Source(err) => write!(f, "source pull failed: {}", err),
            MergeError::Key(err) => write!(f, "key computation failed: {}", err),
            MergeError::Compare(err) => write!(f, "key comparison failed: {}", err),
        }
    }
}
