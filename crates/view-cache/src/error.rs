//! Cache error types.

use thiserror::Error;

/// Errors that can occur when storing cache entries.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// The cache has a size limit but the entry declared no size.
    #[error("cache entry '{key}' has no size but the cache has a size limit")]
    SizeRequired { key: String },
}
