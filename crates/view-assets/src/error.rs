//! Asset error types.

use thiserror::Error;
use view_cache::CacheError;

/// Errors that can occur while versioning an asset path.
#[derive(Error, Debug)]
pub enum AssetError {
    /// The file exists but could not be read.
    #[error("failed to read asset '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The computed value could not be cached.
    #[error(transparent)]
    Cache(#[from] CacheError),
}
