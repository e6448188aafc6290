//! Conversion des réponses du catalogue en entités de bibliothèque
//!
//! Chaque entité reçoit un identifiant `spotify-<catégorie>-<id externe>`.
//! L'insertion passe par [`ImportCache`] : un artiste ou un album déjà vu
//! n'est pas dupliqué, et les pistes d'un album restent triées par numéro.

use crate::models::{FullAlbum, FullTrack, Image, PlaylistResponse, SimplifiedAlbum, SimplifiedArtist, SimplifiedTrack};
use pmosource::{Album, Artist, ImportCache, ImportCategory, Playlist, PlaylistEntry, Track, namespaced_id};

/// Identifiant de la source catalogue
pub const SPOTIFY_SOURCE_ID: &str = "spotify";

/// Année retenue quand la date de sortie est absente ou illisible
pub const FALLBACK_RELEASE_YEAR: i32 = 1970;

pub fn library_id(category: ImportCategory, external_id: &str) -> String {
    namespaced_id(SPOTIFY_SOURCE_ID, category, external_id)
}

/// Année de sortie à partir de `YYYY`, `YYYY-MM` ou `YYYY-MM-DD`
pub fn release_year(release_date: Option<&str>) -> i32 {
    release_date
        .and_then(|d| d.get(..4))
        .and_then(|y| y.parse().ok())
        .unwrap_or(FALLBACK_RELEASE_YEAR)
}

fn cover(images: &[Image]) -> String {
    images.first().map(|i| i.url.clone()).unwrap_or_default()
}

/// Date d'ajout RFC 3339 en millisecondes, 0 si absente
fn added_at_ms(added_at: Option<&str>) -> i64 {
    added_at
        .and_then(|d| chrono::DateTime::parse_from_rfc3339(d).ok())
        .map(|d| d.timestamp_millis())
        .unwrap_or(0)
}

/// Accumulateur d'un import
#[derive(Debug)]
pub struct CatalogImporter {
    web_domain: String,
    cache: ImportCache,
}

impl CatalogImporter {
    pub fn new(web_domain: impl Into<String>) -> Self {
        Self {
            web_domain: web_domain.into(),
            cache: ImportCache::new(),
        }
    }

    pub fn cache(&self) -> &ImportCache {
        &self.cache
    }

    pub fn finish(self) -> ImportCache {
        self.cache
    }

    fn track_url(&self, external_id: &str) -> String {
        format!("https://{}/track/{}", self.web_domain, external_id)
    }

    /// Insère les crédits de type `artist` et retourne leurs identifiants
    pub fn add_artists(&mut self, credits: &[SimplifiedArtist]) -> Vec<String> {
        credits
            .iter()
            .filter(|a| a.is_artist())
            .map(|a| {
                let id = library_id(ImportCategory::Artist, &a.id);
                self.cache.insert_artist(Artist {
                    id: id.clone(),
                    name: a.name.clone(),
                });
                id
            })
            .collect()
    }

    fn album_row(
        &mut self,
        external_id: &str,
        title: &str,
        images: &[Image],
        release_date: Option<&str>,
        credits: &[SimplifiedArtist],
        genres: &[String],
    ) -> Album {
        Album {
            id: library_id(ImportCategory::Album, external_id),
            title: title.to_string(),
            cover: cover(images),
            released: release_year(release_date),
            artists: self.add_artists(credits),
            genre: genres.first().cloned().unwrap_or_default(),
            tracks: Vec::new(),
        }
    }

    fn add_track_row(&mut self, track: &SimplifiedTrack, album_id: &str) -> String {
        let id = library_id(ImportCategory::Track, &track.id);
        let artists = self.add_artists(&track.artists);
        self.cache.insert_track(Track {
            id: id.clone(),
            title: track.name.clone(),
            album: album_id.to_string(),
            uri: self.track_url(&track.id),
            artists,
            duration: track.duration_ms,
            position: track.track_number,
        });
        id
    }

    /// Album complet et toutes ses pistes
    pub fn add_album(&mut self, album: &FullAlbum) -> String {
        let row = self.album_row(
            &album.id,
            &album.name,
            &album.images,
            album.release_date.as_deref(),
            &album.artists,
            &album.genres,
        );
        let album_id = row.id.clone();
        self.cache.insert_album(row);
        for track in &album.tracks.items {
            self.add_track_row(track, &album_id);
        }
        album_id
    }

    /// Album tel que décrit dans une piste : sans genre ni liste de pistes
    fn add_embedded_album(&mut self, album: &SimplifiedAlbum) -> String {
        let row = self.album_row(
            &album.id,
            &album.name,
            &album.images,
            album.release_date.as_deref(),
            &album.artists,
            &[],
        );
        let album_id = row.id.clone();
        self.cache.insert_partial_album(row);
        album_id
    }

    /// Piste isolée, avec son album
    pub fn add_track(&mut self, track: &FullTrack) -> String {
        let album_id = self.add_embedded_album(&track.album);
        let simplified = SimplifiedTrack {
            id: track.id.clone(),
            name: track.name.clone(),
            artists: track.artists.clone(),
            duration_ms: track.duration_ms,
            track_number: track.track_number,
        };
        self.add_track_row(&simplified, &album_id)
    }

    /// Playlist, ses pistes et leurs albums
    ///
    /// Les entrées retirées du catalogue sont ignorées.
    pub fn add_playlist(&mut self, playlist: &PlaylistResponse) -> String {
        let id = library_id(ImportCategory::Playlist, &playlist.id);
        let entries = playlist
            .tracks
            .items
            .iter()
            .filter_map(|item| {
                let track = item.track.as_ref()?;
                Some(PlaylistEntry {
                    track: self.add_track(track),
                    timestamp: added_at_ms(item.added_at.as_deref()),
                })
            })
            .collect();

        let position = self.cache.playlists.len() as u32;
        self.cache.insert_playlist(Playlist {
            id: id.clone(),
            title: playlist.name.clone(),
            cover: cover(&playlist.images),
            position,
            tracks: entries,
        });
        id
    }
}
