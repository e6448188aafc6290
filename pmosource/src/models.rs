//! Library and resolution data model

use serde::{Deserialize, Serialize};

/// A track to resolve into a playable stream
///
/// `uri` is the last known playable or source-identifying URI. An empty
/// `uri` means the track is unresolved and must be searched by metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackResource {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub album: String,
    #[serde(default)]
    pub artists: Vec<String>,
    #[serde(default)]
    pub uri: String,
}

impl TrackResource {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn with_album(mut self, album: impl Into<String>) -> Self {
        self.album = album.into();
        self
    }

    pub fn with_artists<I, S>(mut self, artists: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.artists = artists.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = uri.into();
        self
    }

    /// True when the track has no known URI yet
    pub fn is_unresolved(&self) -> bool {
        self.uri.trim().is_empty()
    }
}

/// Result of a successful resolution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackStreamInfo {
    /// Playable URL
    pub uri: String,
    /// Duration in milliseconds (0 when unknown)
    pub duration: u64,
    /// Provenance: originating source id, or the URI the stream was derived from
    pub from: String,
}

/// Artist row as stored in the library
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artist {
    pub id: String,
    pub name: String,
}

/// Album row as stored in the library
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Album {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub cover: String,
    /// Release year
    pub released: i32,
    /// Artist ids
    #[serde(default)]
    pub artists: Vec<String>,
    #[serde(default)]
    pub genre: String,
    /// Track ids, ordered by track position
    #[serde(default)]
    pub tracks: Vec<String>,
}

/// Track row as stored in the library
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub id: String,
    pub title: String,
    /// Album id
    pub album: String,
    pub uri: String,
    /// Artist ids
    #[serde(default)]
    pub artists: Vec<String>,
    /// Duration in milliseconds
    pub duration: u64,
    /// Position (track number) within the album
    pub position: u32,
}

/// One entry of a playlist
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistEntry {
    /// Track id
    pub track: String,
    /// When the track was added, in milliseconds since the Unix epoch
    pub timestamp: i64,
}

/// Playlist row as stored in the library
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Playlist {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub cover: String,
    pub position: u32,
    #[serde(default)]
    pub tracks: Vec<PlaylistEntry>,
}
