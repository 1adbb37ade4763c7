//! Core abstractions shared by the view caching crates.
//!
//! This crate provides:
//! - `RequestView` / `RequestContext` - Read-only request data used for cache variance
//! - `RouteValue` - Typed route values with culture-invariant formatting
//! - `RequestCulture` - Explicit culture names for a render
//! - `ChangeToken` - Change notification handles used for cache eviction
//! - `Clock` - Time source for expiration

mod change;
mod clock;
mod context;
mod culture;
mod route;

pub use change::*;
pub use clock::*;
pub use context::*;
pub use culture::*;
pub use route::*;
