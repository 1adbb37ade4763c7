//! Content-hash versioning of asset URLs.

use std::io::{self, Read};
use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use view_cache::{EntryOptions, MemoryCache, MemoryCacheOptions};

use crate::error::AssetError;
use crate::provider::FileProvider;

/// Configuration for `FileVersionProvider`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileVersionOptions {
    /// Size limit of the version cache, in bytes of cached paths.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_size_limit: Option<u64>,
    /// Query parameter that carries the hash.
    pub version_key: String,
}

impl Default for FileVersionOptions {
    fn default() -> Self {
        Self {
            cache_size_limit: Some(10 * 1024 * 1024),
            version_key: "v".to_string(),
        }
    }
}

/// Appends a content hash to asset URLs so browsers refetch changed files.
///
/// Results, including "file not found", are cached per requested path until
/// the file provider reports a change for that path.
pub struct FileVersionProvider {
    files: Arc<dyn FileProvider>,
    cache: MemoryCache<String>,
    version_key: String,
}

impl FileVersionProvider {
    /// Create a provider with its own cache.
    pub fn new(files: Arc<dyn FileProvider>, options: FileVersionOptions) -> Self {
        let cache = MemoryCache::new(MemoryCacheOptions {
            size_limit: options.cache_size_limit,
        });
        Self::with_cache(files, cache, options)
    }

    /// Create a provider over an existing cache.
    pub fn with_cache(
        files: Arc<dyn FileProvider>,
        cache: MemoryCache<String>,
        options: FileVersionOptions,
    ) -> Self {
        Self {
            files,
            cache,
            version_key: options.version_key,
        }
    }

    /// The version cache.
    pub fn cache(&self) -> &MemoryCache<String> {
        &self.cache
    }

    /// Add a `v=<hash>` query parameter to `path` if it names an existing file.
    ///
    /// `request_path_base` is the application's mount point; when `path` is
    /// not found as given, it is looked up again with that prefix removed.
    /// Query strings and fragments in `path` are preserved. Paths with a URL
    /// scheme are returned unchanged. Missing files are returned unchanged and
    /// that outcome is cached too.
    pub fn add_version(&self, request_path_base: &str, path: &str) -> Result<String, AssetError> {
        let resolved = path.find(['?', '#']).map_or(path, |i| &path[..i]);

        if is_absolute_url(resolved) {
            return Ok(path.to_string());
        }

        if let Some(cached) = self.cache.get(path) {
            tracing::trace!(path = %path, "asset version cache hit");
            return Ok(cached);
        }

        let mut options = EntryOptions::new().with_expiration_token(self.files.watch(resolved));
        let mut found = self.files.exists(resolved).then_some(resolved);

        if found.is_none() && !request_path_base.is_empty() {
            if let Some(relative) = strip_prefix_ignore_case(resolved, request_path_base) {
                options = options.with_expiration_token(self.files.watch(relative));
                if self.files.exists(relative) {
                    found = Some(relative);
                }
            }
        }

        let value = match found {
            Some(file) => {
                let hash = self.hash_file(file)?;
                tracing::debug!(path = %path, file = %file, hash = %hash, "computed asset version");
                append_query(path, &self.version_key, &hash)
            }
            None => {
                tracing::debug!(path = %path, "asset not found, leaving path unversioned");
                path.to_string()
            }
        };

        self.cache
            .set(path, value.clone(), options.with_size(value.len() as u64))?;
        Ok(value)
    }

    fn hash_file(&self, file: &str) -> Result<String, AssetError> {
        let read_error = |source| AssetError::Read {
            path: file.to_string(),
            source,
        };

        let mut reader = self.files.open_read(file).map_err(read_error)?;
        hash_content(&mut reader).map_err(read_error)
    }
}

impl std::fmt::Debug for FileVersionProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileVersionProvider")
            .field("cache", &self.cache)
            .field("version_key", &self.version_key)
            .finish()
    }
}

/// SHA-256 of everything `reader` yields, base64url encoded without padding.
pub fn hash_content<R>(reader: &mut R) -> io::Result<String>
where
    R: Read + ?Sized,
{
    let mut hasher = Sha256::new();
    io::copy(reader, &mut hasher)?;
    Ok(URL_SAFE_NO_PAD.encode(hasher.finalize()))
}

/// Whether `path` has a URL scheme (other than `file`) or is protocol-relative.
///
/// A single-letter scheme is a drive letter (`C:/site.css`), not a URL.
fn is_absolute_url(path: &str) -> bool {
    if path.starts_with("//") {
        return true;
    }

    let Some((scheme, _)) = path.split_once(':') else {
        return false;
    };

    if scheme.len() < 2 {
        return false;
    }

    let mut chars = scheme.chars();
    let valid = chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));

    valid && !scheme.eq_ignore_ascii_case("file")
}

fn strip_prefix_ignore_case<'a>(path: &'a str, prefix: &str) -> Option<&'a str> {
    path.get(..prefix.len())
        .filter(|head| head.eq_ignore_ascii_case(prefix))
        .map(|_| &path[prefix.len()..])
}

/// Insert `name=value` into the query string of `path`, before any fragment.
fn append_query(path: &str, name: &str, value: &str) -> String {
    let (base, fragment) = path.split_at(path.find('#').unwrap_or(path.len()));
    let separator = if base.contains('?') { '&' } else { '?' };
    format!("{base}{separator}{name}={value}{fragment}")
}
