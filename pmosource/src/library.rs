//! Library storage collaborator
//!
//! The relational storage layer is outside of this crate; sources only see it
//! through [`LibraryStore`]. Every `create_*` call is a bulk upsert expected to
//! run as a single transaction, so inserting an id twice never produces two
//! rows.
//!
//! [`MemoryLibrary`] is an in-process implementation used by the resolver
//! binary when no database is attached, and by tests.

use crate::error::Result;
use crate::models::{Album, Artist, Playlist, Track};
use async_trait::async_trait;
use indexmap::IndexMap;
use tokio::sync::RwLock;

#[async_trait]
pub trait LibraryStore: Send + Sync {
    /// Returns the tracks found among `ids`; unknown ids are skipped
    async fn get_tracks(&self, ids: &[String]) -> Result<Vec<Track>>;
    async fn get_albums(&self, ids: &[String]) -> Result<Vec<Album>>;
    async fn get_artists(&self, ids: &[String]) -> Result<Vec<Artist>>;
    async fn get_playlists(&self, ids: &[String]) -> Result<Vec<Playlist>>;

    async fn create_artists(&self, rows: Vec<Artist>) -> Result<()>;
    async fn create_albums(&self, rows: Vec<Album>) -> Result<()>;
    async fn create_tracks(&self, rows: Vec<Track>) -> Result<()>;
    async fn create_playlists(&self, rows: Vec<Playlist>) -> Result<()>;
}

/// In-memory [`LibraryStore`], insertion-ordered
#[derive(Debug, Default)]
pub struct MemoryLibrary {
    tracks: RwLock<IndexMap<String, Track>>,
    albums: RwLock<IndexMap<String, Album>>,
    artists: RwLock<IndexMap<String, Artist>>,
    playlists: RwLock<IndexMap<String, Playlist>>,
}

impl MemoryLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn track_count(&self) -> usize {
        self.tracks.read().await.len()
    }

    pub async fn album_count(&self) -> usize {
        self.albums.read().await.len()
    }

    pub async fn artist_count(&self) -> usize {
        self.artists.read().await.len()
    }

    pub async fn playlist_count(&self) -> usize {
        self.playlists.read().await.len()
    }
}

fn select<T: Clone>(map: &IndexMap<String, T>, ids: &[String]) -> Vec<T> {
    ids.iter().filter_map(|id| map.get(id).cloned()).collect()
}

#[async_trait]
impl LibraryStore for MemoryLibrary {
    async fn get_tracks(&self, ids: &[String]) -> Result<Vec<Track>> {
        Ok(select(&*self.tracks.read().await, ids))
    }

    async fn get_albums(&self, ids: &[String]) -> Result<Vec<Album>> {
        Ok(select(&*self.albums.read().await, ids))
    }

    async fn get_artists(&self, ids: &[String]) -> Result<Vec<Artist>> {
        Ok(select(&*self.artists.read().await, ids))
    }

    async fn get_playlists(&self, ids: &[String]) -> Result<Vec<Playlist>> {
        Ok(select(&*self.playlists.read().await, ids))
    }

    async fn create_artists(&self, rows: Vec<Artist>) -> Result<()> {
        let mut artists = self.artists.write().await;
        for row in rows {
            artists.insert(row.id.clone(), row);
        }
        Ok(())
    }

    async fn create_albums(&self, rows: Vec<Album>) -> Result<()> {
        let mut albums = self.albums.write().await;
        for row in rows {
            albums.insert(row.id.clone(), row);
        }
        Ok(())
    }

    async fn create_tracks(&self, rows: Vec<Track>) -> Result<()> {
        let mut tracks = self.tracks.write().await;
        for row in rows {
            tracks.insert(row.id.clone(), row);
        }
        Ok(())
    }

    async fn create_playlists(&self, rows: Vec<Playlist>) -> Result<()> {
        let mut playlists = self.playlists.write().await;
        for row in rows {
            playlists.insert(row.id.clone(), row);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn artist(id: &str, name: &str) -> Artist {
        Artist {
            id: id.to_string(),
            name: name.to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_is_upsert() {
        let library = MemoryLibrary::new();
        library
            .create_artists(vec![artist("a1", "First")])
            .await
            .unwrap();
        library
            .create_artists(vec![artist("a1", "Renamed"), artist("a2", "Second")])
            .await
            .unwrap();

        assert_eq!(library.artist_count().await, 2);
        let found = library
            .get_artists(&["a1".to_string(), "missing".to_string()])
            .await
            .unwrap();
        assert_eq!(found, vec![artist("a1", "Renamed")]);
    }
}
