//! Static asset versioning for server-rendered views.
//!
//! This crate provides:
//! - `FileProvider` - Read and watch access to static files
//! - `PhysicalFileProvider` - File provider rooted at a directory, with notification or polling change tokens
//! - `FileVersionProvider` - Appends `v=<content hash>` to asset URLs, cached until the file changes
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use view_assets::{FileVersionOptions, FileVersionProvider, PhysicalFileProvider};
//!
//! let files = Arc::new(PhysicalFileProvider::new("wwwroot"));
//! let versions = FileVersionProvider::new(files, FileVersionOptions::default());
//!
//! // "/js/site.js?v=f4OxZX_x_FO5LcGBSKHWXfwtSx-j1ncoSt3SABJtkGk"
//! let src = versions.add_version("", "/js/site.js")?;
//! ```

mod error;
mod provider;
mod version;
mod watcher;

pub use error::*;
pub use provider::*;
pub use version::*;
