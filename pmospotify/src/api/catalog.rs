//! Module d'accès au catalogue (tracks, albums, playlists)

use super::SpotifyApi;
use crate::error::Result;
use crate::models::{AlbumsResponse, FullAlbum, FullTrack, Paging, PlaylistResponse, TracksResponse};
use serde::de::DeserializeOwned;
use std::collections::HashSet;
use tracing::{debug, warn};

/// Nombre maximal d'identifiants par requête `/tracks`
pub const MAX_TRACKS_PER_REQUEST: usize = 40;

/// Nombre maximal d'identifiants par requête `/albums`
pub const MAX_ALBUMS_PER_REQUEST: usize = 20;

impl SpotifyApi {
    /// Récupère des pistes par lots de [`MAX_TRACKS_PER_REQUEST`]
    ///
    /// Les identifiants inconnus du catalogue sont ignorés.
    pub async fn get_tracks(&self, ids: &[String]) -> Result<Vec<FullTrack>> {
        let mut tracks = Vec::with_capacity(ids.len());
        for chunk in ids.chunks(MAX_TRACKS_PER_REQUEST) {
            let joined = chunk.join(",");
            let response: TracksResponse = self.get("/tracks", &[("ids", joined.as_str())]).await?;
            debug!("Fetched {} tracks", chunk.len());
            tracks.extend(response.tracks.into_iter().flatten());
        }
        Ok(tracks)
    }

    /// Récupère des albums par lots de [`MAX_ALBUMS_PER_REQUEST`]
    ///
    /// La liste des pistes de chaque album est complétée page par page.
    pub async fn get_albums(&self, ids: &[String]) -> Result<Vec<FullAlbum>> {
        let mut albums = Vec::with_capacity(ids.len());
        for chunk in ids.chunks(MAX_ALBUMS_PER_REQUEST) {
            let joined = chunk.join(",");
            let response: AlbumsResponse = self.get("/albums", &[("ids", joined.as_str())]).await?;
            debug!("Fetched {} albums", chunk.len());
            for mut album in response.albums.into_iter().flatten() {
                self.follow(&mut album.tracks).await?;
                albums.push(album);
            }
        }
        Ok(albums)
    }

    /// Récupère une playlist avec toutes ses pistes
    pub async fn get_playlist(&self, id: &str) -> Result<PlaylistResponse> {
        let mut playlist: PlaylistResponse = self.get(&format!("/playlists/{}", id), &[]).await?;
        self.follow(&mut playlist.tracks).await?;
        debug!(
            "Fetched playlist {} with {} entries",
            id,
            playlist.tracks.items.len()
        );
        Ok(playlist)
    }

    /// Suit les liens de continuation jusqu'à la dernière page
    ///
    /// S'arrête si une page renvoie vers un lien déjà suivi.
    async fn follow<T: DeserializeOwned>(&self, paging: &mut Paging<T>) -> Result<()> {
        let mut visited = HashSet::new();
        while let Some(next) = paging.next.take() {
            if !visited.insert(next.clone()) {
                warn!(next = %next, "Pagination loops back, stopping");
                break;
            }
            let page: Paging<T> = self.get(&next, &[]).await?;
            paging.items.extend(page.items);
            paging.next = page.next;
        }
        Ok(())
    }
}
