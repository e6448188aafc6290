//! # PMOSource
//!
//! Common traits and types for PMOResolver sources.
//!
//! A *source* is a backend able to turn a track into a playable stream URL
//! (local files, a video host, a streaming catalog...) and possibly to import
//! catalog metadata into the library. This crate provides:
//!
//! - **[`StreamSource`]**: the contract every backend implements, with
//!   explicit [`SourceCapabilities`].
//! - **[`SourceRegistry`]**: ordered dispatch, first capable source wins,
//!   fall-through on `None`.
//! - **[`StreamCache`]**: memoization with expiry parsed from signed URLs and
//!   de-duplication of concurrent fetches.
//! - **[`ImportCache`]**: idempotent aggregation of imported entities, written
//!   to a [`LibraryStore`] in foreign-key order.
//! - **[`LinkChecker`]**: HEAD reachability checks shared by remote sources.
//! - **[`Notifier`]**: transient user-facing notifications.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use pmosource::{SourceRegistry, StreamCache, TrackResource};
//! use std::sync::Arc;
//!
//! let mut registry = SourceRegistry::new();
//! registry.register(Arc::new(local_source)).await?;
//! registry.register(Arc::new(youtube_source)).await?;
//!
//! let cache = StreamCache::new(Arc::new(registry));
//! let resource = TrackResource::new("t1", "Song").with_artists(["Artist"]);
//! if let Some(stream) = cache.get_stream_info(&resource, false).await? {
//!     println!("play {}", stream.uri);
//! }
//! ```

pub mod cache;
pub mod error;
pub mod import;
pub mod library;
pub mod models;
pub mod notify;
pub mod reachability;
pub mod registry;
pub mod source;

pub use cache::{PlaybackControl, StreamCache, parse_expire};
pub use error::{Result, SourceError};
pub use import::{ImportCache, ImportCategory, ImportResult, namespaced_id};
pub use library::{LibraryStore, MemoryLibrary};
pub use models::{Album, Artist, Playlist, PlaylistEntry, Track, TrackResource, TrackStreamInfo};
pub use notify::{Notification, NotificationLevel, Notifier};
pub use reachability::LinkChecker;
pub use registry::{ImportReport, SourceRegistry};
pub use source::{SourceCapabilities, SourceInfo, StreamSource};

// Re-export commonly used types
pub use async_trait::async_trait;
