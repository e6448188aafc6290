//! # pmoyoutube - Video host source for PMOResolver
//!
//! Client for an Invidious-compatible `/api/v1` instance (search and format
//! lookup) and [`VideoHostSource`], a stream source that resolves any track
//! to an audio stream of a matching video.
//!
//! ```no_run
//! use pmoyoutube::VideoHostSource;
//! use pmosource::{StreamSource, TrackResource};
//!
//! # async fn demo(config: &pmoconfig::Config) -> anyhow::Result<()> {
//! let source = VideoHostSource::from_config(config)?;
//! let track = TrackResource::new("t1", "Song").with_artists(["Artist"]);
//! if let Some(stream) = source.fetch_stream(&track).await? {
//!     println!("{} ({} ms)", stream.uri, stream.duration);
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod models;
pub mod source;

pub use client::{ClientBuilder, YoutubeClient};
pub use error::{Result, YoutubeError};
pub use models::{
    AdaptiveFormat, AudioStream, SearchItem, VideoInfo, WATCH_URL_PREFIX, is_watch_url, video_id,
    watch_url,
};
pub use source::{MAX_ATTEMPTS, VideoHostSource, YOUTUBE_SOURCE_ID};
