//! Fragment caching for server-rendered views.
//!
//! This crate provides:
//! - `CacheKeyBuilder` / `CacheTagKey` - Deterministic fragment cache keys with vary-by dimensions
//! - `MemoryCache` - Thread-safe store with change-token, time and size based eviction
//! - `FragmentCache` - Rendered fragment caching with single-renderer protection
//!
//! # Example
//!
//! ```ignore
//! use view_cache::{CacheKeyBuilder, FragmentCache, FragmentCachePolicy};
//! use view_core::{RequestContext, RequestCulture};
//!
//! let request = RequestContext::new("/products").with_query("page", "2");
//! let key = CacheKeyBuilder::new("product-list")
//!     .vary_by_query("page")
//!     .build(&request, &RequestCulture::invariant());
//!
//! let cache = FragmentCache::default();
//! let (html, status) = cache
//!     .get_or_render(&key, &FragmentCachePolicy::new(), || render_products())
//!     .await?;
//! ```

mod error;
mod fragment;
mod key;
mod memory;

pub use error::*;
pub use fragment::*;
pub use key::*;
pub use memory::*;
