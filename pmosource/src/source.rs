//! The contract every stream source implements

use crate::error::{Result, SourceError};
use crate::import::ImportResult;
use crate::models::{TrackResource, TrackStreamInfo};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::path::PathBuf;

/// What a source can do
///
/// The registry only dispatches an operation to a source whose matching flag
/// is set; the trait's default methods answer `NotSupported` otherwise.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceCapabilities {
    /// Can turn a track into a playable URL
    pub supports_streaming: bool,
    /// Can import catalog references into the library
    pub supports_import: bool,
}

impl SourceCapabilities {
    pub const STREAMING: Self = Self {
        supports_streaming: true,
        supports_import: false,
    };

    pub const STREAMING_AND_IMPORT: Self = Self {
        supports_streaming: true,
        supports_import: true,
    };
}

/// Summary of a registered source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceInfo {
    pub id: String,
    pub capabilities: SourceCapabilities,
}

/// Main trait for stream sources
///
/// Only [`id`](StreamSource::id) is required. Every other method has a
/// default meaning "unsupported": `can_fetch_stream` answers `false` and the
/// operations return [`SourceError::NotSupported`].
///
/// `fetch_stream` returns `Ok(None)` when the source does not apply to a
/// resource (the registry then asks the next source) and an error only when
/// it tried and definitively failed.
///
/// # Examples
///
/// ```rust
/// use pmosource::{
///     async_trait, Result, SourceCapabilities, StreamSource, TrackResource, TrackStreamInfo,
/// };
///
/// #[derive(Debug)]
/// struct Radio;
///
/// #[async_trait]
/// impl StreamSource for Radio {
///     fn id(&self) -> &str {
///         "radio"
///     }
///
///     fn capabilities(&self) -> SourceCapabilities {
///         SourceCapabilities::STREAMING
///     }
///
///     fn can_fetch_stream(&self, resource: &TrackResource) -> bool {
///         resource.uri.starts_with("radio:")
///     }
///
///     async fn fetch_stream(&self, resource: &TrackResource) -> Result<Option<TrackStreamInfo>> {
///         Ok(Some(TrackStreamInfo {
///             uri: format!("https://radio.example/{}", &resource.uri[6..]),
///             duration: 0,
///             from: self.id().to_string(),
///         }))
///     }
/// }
/// ```
#[async_trait]
pub trait StreamSource: Debug + Send + Sync {
    /// Stable identifier, unique within a registry
    fn id(&self) -> &str;

    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities::default()
    }

    /// One-time asynchronous initialisation, awaited by the registry before
    /// the source receives any request
    async fn load(&self) -> Result<()> {
        Ok(())
    }

    /// Whether this source claims the resource
    fn can_fetch_stream(&self, _resource: &TrackResource) -> bool {
        false
    }

    async fn fetch_stream(&self, _resource: &TrackResource) -> Result<Option<TrackStreamInfo>> {
        Err(SourceError::not_supported(self.id(), "fetch_stream"))
    }

    /// Imports the recognised references among `items` into the library
    async fn import(&self, _items: &[String]) -> Result<ImportResult> {
        Err(SourceError::not_supported(self.id(), "import"))
    }

    /// Offline download hook. No source provides it yet.
    async fn download(&self, _resource: &TrackResource) -> Result<PathBuf> {
        Err(SourceError::not_supported(self.id(), "download"))
    }

    fn info(&self) -> SourceInfo {
        SourceInfo {
            id: self.id().to_string(),
            capabilities: self.capabilities(),
        }
    }
}
