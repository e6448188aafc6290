//! Import aggregation
//!
//! [`ImportCache`] collects the entities discovered while importing catalog
//! references. Every entity is keyed by a namespaced id
//! (`{source_id}-{category}-{external_id}`) so two providers never collide,
//! and inserting an id that is already present is a no-op.
//!
//! An album known only through a track's embedded reference is flagged
//! partial: before persisting it is reconciled with the stored album so a
//! later track import never truncates a full album.

use crate::error::Result;
use crate::library::LibraryStore;
use crate::models::{Album, Artist, Playlist, Track};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use tracing::debug;

/// Kind of entity referenced by a namespaced id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportCategory {
    Track,
    Album,
    Artist,
    Playlist,
}

impl ImportCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportCategory::Track => "track",
            ImportCategory::Album => "album",
            ImportCategory::Artist => "artist",
            ImportCategory::Playlist => "playlist",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "track" => Some(ImportCategory::Track),
            "album" => Some(ImportCategory::Album),
            "artist" => Some(ImportCategory::Artist),
            "playlist" => Some(ImportCategory::Playlist),
            _ => None,
        }
    }
}

impl fmt::Display for ImportCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Builds the library id of an external entity
pub fn namespaced_id(source_id: &str, category: ImportCategory, external_id: &str) -> String {
    format!("{}-{}-{}", source_id, category.as_str(), external_id)
}

/// Entities gathered during one import, keyed by namespaced id
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportCache {
    pub tracks: IndexMap<String, Track>,
    pub albums: IndexMap<String, Album>,
    pub artists: IndexMap<String, Artist>,
    pub playlists: IndexMap<String, Playlist>,
    /// Albums built from an embedded reference only
    #[serde(skip)]
    partial_albums: HashSet<String>,
}

fn sort_by_position(list: &mut [String], tracks: &IndexMap<String, Track>) {
    list.sort_by_key(|id| tracks.get(id).map_or(u32::MAX, |t| t.position));
}

fn push_missing(list: &mut Vec<String>, ids: impl IntoIterator<Item = String>) {
    for id in ids {
        if !list.contains(&id) {
            list.push(id);
        }
    }
}

impl ImportCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
            && self.albums.is_empty()
            && self.artists.is_empty()
            && self.playlists.is_empty()
    }

    /// Returns `false` when the id was already known
    pub fn insert_artist(&mut self, artist: Artist) -> bool {
        if self.artists.contains_key(&artist.id) {
            return false;
        }
        self.artists.insert(artist.id.clone(), artist);
        true
    }

    /// Returns `false` when the id was already known
    ///
    /// A full row replaces a partial one, keeping the tracks already linked.
    pub fn insert_album(&mut self, mut album: Album) -> bool {
        if self.partial_albums.remove(&album.id) {
            if let Some(known) = self.albums.get_mut(&album.id) {
                push_missing(&mut album.tracks, std::mem::take(&mut known.tracks));
                sort_by_position(&mut album.tracks, &self.tracks);
                *known = album;
            }
            return true;
        }
        if self.albums.contains_key(&album.id) {
            return false;
        }
        self.albums.insert(album.id.clone(), album);
        true
    }

    /// Inserts an album known only through an embedded reference
    ///
    /// Such a row may lack the genre and most tracks. Returns `false` when
    /// the id was already known.
    pub fn insert_partial_album(&mut self, album: Album) -> bool {
        let id = album.id.clone();
        if !self.insert_album(album) {
            return false;
        }
        self.partial_albums.insert(id);
        true
    }

    pub fn is_partial_album(&self, id: &str) -> bool {
        self.partial_albums.contains(id)
    }

    /// Inserts a track and links it into its album
    ///
    /// When the album is known, the track id is appended to its track list
    /// and the list is re-sorted by track position. Returns `false` when the
    /// track id was already known.
    pub fn insert_track(&mut self, track: Track) -> bool {
        if self.tracks.contains_key(&track.id) {
            return false;
        }
        let track_id = track.id.clone();
        let album_id = track.album.clone();
        self.tracks.insert(track_id.clone(), track);

        if let Some(album) = self.albums.get_mut(&album_id) {
            if !album.tracks.contains(&track_id) {
                album.tracks.push(track_id);
                sort_by_position(&mut album.tracks, &self.tracks);
            }
        }
        true
    }

    /// Returns `false` when the id was already known
    pub fn insert_playlist(&mut self, playlist: Playlist) -> bool {
        if self.playlists.contains_key(&playlist.id) {
            return false;
        }
        self.playlists.insert(playlist.id.clone(), playlist);
        true
    }

    /// Folds `other` into `self`, keeping the first occurrence of every id
    pub fn merge(&mut self, other: ImportCache) {
        let ImportCache {
            tracks,
            albums,
            artists,
            playlists,
            partial_albums,
        } = other;
        for (_, artist) in artists {
            self.insert_artist(artist);
        }
        for (id, album) in albums {
            if partial_albums.contains(&id) {
                self.insert_partial_album(album);
            } else {
                self.insert_album(album);
            }
        }
        for (_, track) in tracks {
            self.insert_track(track);
        }
        for (_, playlist) in playlists {
            self.insert_playlist(playlist);
        }
    }

    /// Folds the stored version of every partial album into this cache
    ///
    /// The stored row keeps its metadata; its track list is extended with
    /// the tracks imported now and re-sorted by position.
    async fn reconcile_partial_albums(&mut self, store: &dyn LibraryStore) -> Result<()> {
        if self.partial_albums.is_empty() {
            return Ok(());
        }
        let ids: Vec<String> = self.partial_albums.drain().collect();

        for stored in store.get_albums(&ids).await? {
            let Some(imported) = self.albums.get(&stored.id) else {
                continue;
            };
            let mut tracks = stored.tracks.clone();
            push_missing(&mut tracks, imported.tracks.iter().cloned());

            let unknown: Vec<String> = tracks
                .iter()
                .filter(|id| !self.tracks.contains_key(*id))
                .cloned()
                .collect();
            let mut positions: HashMap<String, u32> = store
                .get_tracks(&unknown)
                .await?
                .into_iter()
                .map(|t| (t.id, t.position))
                .collect();
            positions.extend(self.tracks.values().map(|t| (t.id.clone(), t.position)));
            tracks.sort_by_key(|id| positions.get(id).copied().unwrap_or(u32::MAX));

            debug!(album = %stored.id, tracks = tracks.len(), "Partial album merged with stored row");
            self.albums
                .insert(stored.id.clone(), Album { tracks, ..stored });
        }
        Ok(())
    }

    /// Writes the cache to storage, one bulk call per category
    ///
    /// The order is fixed by foreign keys: artists, albums, tracks, playlists.
    /// Each call completes before the next category starts. Partial albums
    /// are first reconciled with their stored rows.
    pub async fn persist(&mut self, store: &dyn LibraryStore) -> Result<()> {
        self.reconcile_partial_albums(store).await?;
        debug!(
            artists = self.artists.len(),
            albums = self.albums.len(),
            tracks = self.tracks.len(),
            playlists = self.playlists.len(),
            "Persisting import"
        );
        store
            .create_artists(self.artists.values().cloned().collect())
            .await?;
        store
            .create_albums(self.albums.values().cloned().collect())
            .await?;
        store
            .create_tracks(self.tracks.values().cloned().collect())
            .await?;
        store
            .create_playlists(self.playlists.values().cloned().collect())
            .await?;
        Ok(())
    }
}

/// Outcome of `StreamSource::import`
///
/// `remaining` holds the input strings the source did not recognise, so the
/// caller can hand them to the next importer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportResult {
    #[serde(flatten)]
    pub cache: ImportCache,
    pub remaining: Vec<String>,
}

impl ImportResult {
    pub fn new(cache: ImportCache, remaining: Vec<String>) -> Self {
        Self { cache, remaining }
    }

    /// Nothing recognised: every item passes through
    pub fn passthrough(items: &[String]) -> Self {
        Self {
            cache: ImportCache::default(),
            remaining: items.to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::MemoryLibrary;

    fn track(id: &str, album: &str, position: u32) -> Track {
        Track {
            id: id.to_string(),
            title: id.to_string(),
            album: album.to_string(),
            uri: String::new(),
            artists: vec![],
            duration: 0,
            position,
        }
    }

    fn album(id: &str) -> Album {
        Album {
            id: id.to_string(),
            title: "Album".to_string(),
            cover: String::new(),
            released: 2000,
            artists: vec![],
            genre: String::new(),
            tracks: vec![],
        }
    }

    #[test]
    fn test_namespaced_id() {
        assert_eq!(
            namespaced_id("spotify", ImportCategory::Album, "XYZ"),
            "spotify-album-XYZ"
        );
        assert_eq!(ImportCategory::parse("playlist"), Some(ImportCategory::Playlist));
        assert_eq!(ImportCategory::parse("video"), None);
    }

    #[test]
    fn test_insert_is_idempotent() {
        let mut cache = ImportCache::new();
        assert!(cache.insert_artist(Artist {
            id: "a".into(),
            name: "First".into()
        }));
        assert!(!cache.insert_artist(Artist {
            id: "a".into(),
            name: "Second".into()
        }));
        assert_eq!(cache.artists.len(), 1);
        assert_eq!(cache.artists["a"].name, "First");
    }

    #[test]
    fn test_album_tracks_sorted_by_position() {
        let mut cache = ImportCache::new();
        cache.insert_album(album("al"));
        cache.insert_track(track("t3", "al", 3));
        cache.insert_track(track("t1", "al", 1));
        cache.insert_track(track("t2", "al", 2));
        // Doublon : ignoré
        assert!(!cache.insert_track(track("t1", "al", 1)));

        assert_eq!(cache.albums["al"].tracks, vec!["t1", "t2", "t3"]);
    }

    #[test]
    fn test_merge_keeps_first() {
        let mut first = ImportCache::new();
        first.insert_album(album("al"));
        first.insert_track(track("t2", "al", 2));

        let mut second = ImportCache::new();
        second.insert_track(track("t1", "al", 1));
        second.insert_track(track("t2", "al", 9));

        first.merge(second);
        assert_eq!(first.tracks.len(), 2);
        assert_eq!(first.tracks["t2"].position, 2);
        assert_eq!(first.albums["al"].tracks, vec!["t1", "t2"]);
    }

    #[test]
    fn test_full_album_replaces_partial_row() {
        let mut cache = ImportCache::new();
        assert!(cache.insert_partial_album(album("al")));
        cache.insert_track(track("t2", "al", 2));

        let mut full = album("al");
        full.genre = "jazz".to_string();
        full.tracks = vec!["t1".to_string()];
        assert!(cache.insert_album(full));
        assert!(!cache.is_partial_album("al"));
        assert!(!cache.insert_album(album("al")));

        assert_eq!(cache.albums["al"].genre, "jazz");
        assert_eq!(cache.albums["al"].tracks, vec!["t1", "t2"]);
    }

    #[tokio::test]
    async fn test_partial_album_keeps_stored_row() {
        let store = MemoryLibrary::new();
        let mut full = album("al");
        full.genre = "jazz".to_string();
        full.tracks = vec!["t1".to_string(), "t3".to_string()];
        store.create_albums(vec![full]).await.unwrap();
        store
            .create_tracks(vec![track("t1", "al", 1), track("t3", "al", 3)])
            .await
            .unwrap();

        let mut cache = ImportCache::new();
        cache.insert_partial_album(album("al"));
        cache.insert_track(track("t2", "al", 2));
        cache.persist(&store).await.unwrap();

        let stored = store.get_albums(&["al".to_string()]).await.unwrap();
        assert_eq!(stored[0].genre, "jazz");
        assert_eq!(stored[0].tracks, vec!["t1", "t2", "t3"]);
        assert_eq!(store.track_count().await, 3);
        assert!(!cache.is_partial_album("al"));
    }

    #[tokio::test]
    async fn test_partial_album_without_stored_row_is_created() {
        let store = MemoryLibrary::new();
        let mut cache = ImportCache::new();
        cache.insert_partial_album(album("al"));
        cache.insert_track(track("t2", "al", 2));
        cache.persist(&store).await.unwrap();

        let stored = store.get_albums(&["al".to_string()]).await.unwrap();
        assert_eq!(stored[0].tracks, vec!["t2"]);
    }
}
