//! # PMOResolver
//!
//! Turns library tracks into playable stream URLs. Sources are tried in
//! priority order (local files, streaming catalog, video host) behind a
//! stream cache, and the named operations are served over HTTP.

pub mod api;
pub mod context;
pub mod logging;

pub use context::ResolverContext;
