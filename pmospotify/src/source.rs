//! Source catalogue : import de métadonnées et lecture via le service vidéo
//!
//! Le catalogue ne fournit pas l'audio. Pour lire une piste importée, la
//! source relit la piste, ses artistes et son album dans la bibliothèque,
//! cherche l'enregistrement officiel sur le service vidéo et vérifie l'URL
//! obtenue.
//!
//! ```text
//! import(items) ──► partition ──► albums (20/lot) ─┐
//!                             ├─► tracks (40/lot) ─┼─► ImportCache ──► persist ──► ImportResult
//!                             └─► playlists ───────┘      (artists → albums → tracks → playlists)
//! ```

use crate::api::SpotifyApi;
use crate::importer::{CatalogImporter, SPOTIFY_SOURCE_ID};
use crate::reference::ReferenceParser;
use async_trait::async_trait;
use pmoconfig::Config;
use pmosource::{
    ImportResult, LibraryStore, LinkChecker, Result, SourceCapabilities, SourceError,
    StreamSource, TrackResource, TrackStreamInfo,
};
use pmoyoutube::YoutubeClient;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Domaine web par défaut du catalogue
pub const DEFAULT_WEB_DOMAIN: &str = "open.spotify.com";

pub struct CatalogMetadataSource {
    api: SpotifyApi,
    library: Arc<dyn LibraryStore>,
    videos: YoutubeClient,
    checker: LinkChecker,
    references: ReferenceParser,
}

impl fmt::Debug for CatalogMetadataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CatalogMetadataSource")
            .field("api", &self.api)
            .field("web_domain", &self.references.web_domain())
            .finish_non_exhaustive()
    }
}

impl CatalogMetadataSource {
    pub fn new(
        api: SpotifyApi,
        library: Arc<dyn LibraryStore>,
        videos: YoutubeClient,
        checker: LinkChecker,
    ) -> Self {
        Self {
            api,
            library,
            videos,
            checker,
            references: ReferenceParser::new(DEFAULT_WEB_DOMAIN),
        }
    }

    /// Source construite depuis `sources.spotify.*` et `sources.youtube.api_base`
    pub fn from_config(config: &Config, library: Arc<dyn LibraryStore>) -> anyhow::Result<Self> {
        let api = SpotifyApi::from_config(config)?;
        let videos = YoutubeClient::from_config(config)?;
        let checker = LinkChecker::with_client(videos.http().clone());
        Ok(Self::new(api, library, videos, checker).with_web_domain(config.get_spotify_web_domain()?))
    }

    pub fn with_web_domain(mut self, domain: impl Into<String>) -> Self {
        self.references = ReferenceParser::new(domain);
        self
    }

    pub fn api(&self) -> &SpotifyApi {
        &self.api
    }

    pub fn references(&self) -> &ReferenceParser {
        &self.references
    }

    /// Requête de recherche de l'enregistrement officiel
    fn search_phrase(title: &str, artists: &[String]) -> String {
        format!("{} {} Official Audio", title, artists.join(" "))
    }
}

#[async_trait]
impl StreamSource for CatalogMetadataSource {
    fn id(&self) -> &str {
        SPOTIFY_SOURCE_ID
    }

    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities::STREAMING_AND_IMPORT
    }

    /// Ouvre la session : un token applicatif doit pouvoir être obtenu
    async fn load(&self) -> Result<()> {
        self.api.access_token().await?;
        Ok(())
    }

    fn can_fetch_stream(&self, resource: &TrackResource) -> bool {
        self.references.is_web_url(&resource.uri)
    }

    async fn fetch_stream(&self, resource: &TrackResource) -> Result<Option<TrackStreamInfo>> {
        let Some(track) = self.library.get_tracks(&[resource.id.clone()]).await?.pop() else {
            debug!(track = %resource.id, "Track not in library");
            return Ok(None);
        };
        let artists = self.library.get_artists(&track.artists).await?;
        if artists.is_empty() {
            debug!(track = %track.id, "Track artists not in library");
            return Ok(None);
        }
        let Some(album) = self.library.get_albums(&[track.album.clone()]).await?.pop() else {
            debug!(track = %track.id, "Track album not in library");
            return Ok(None);
        };

        let names: Vec<String> = artists.into_iter().map(|a| a.name).collect();
        let query = Self::search_phrase(&track.title, &names);
        debug!(track = %track.id, album = %album.title, query = %query, "Searching video");

        let video_id = self
            .videos
            .first_video_id(&query)
            .await?
            .ok_or_else(|| SourceError::NoMatch(format!("no video found for \"{}\"", query)))?;

        let stream = self.videos.audio_stream(&video_id).await?;
        if !self.checker.is_reachable(&stream.url).await {
            warn!(track = %track.id, video = %video_id, "Audio stream unreachable, giving up");
            return Ok(None);
        }

        info!(track = %track.id, video = %video_id, "Catalog track resolved");
        Ok(Some(TrackStreamInfo {
            uri: stream.url,
            duration: stream.length_seconds * 1000,
            from: SPOTIFY_SOURCE_ID.to_string(),
        }))
    }

    async fn import(&self, items: &[String]) -> Result<ImportResult> {
        let refs = self.references.partition(items);
        if refs.is_empty() {
            return Ok(ImportResult::passthrough(items));
        }

        info!(
            albums = refs.albums.len(),
            tracks = refs.tracks.len(),
            playlists = refs.playlists.len(),
            "Importing from catalog"
        );

        let mut importer = CatalogImporter::new(self.references.web_domain());

        // Les playlists peuvent référencer des albums et pistes des étapes précédentes
        if !refs.albums.is_empty() {
            for album in self.api.get_albums(&refs.albums).await? {
                importer.add_album(&album);
            }
        }
        if !refs.tracks.is_empty() {
            for track in self.api.get_tracks(&refs.tracks).await? {
                importer.add_track(&track);
            }
        }
        for id in &refs.playlists {
            let playlist = self.api.get_playlist(id).await?;
            importer.add_playlist(&playlist);
        }

        let mut cache = importer.finish();
        cache.persist(self.library.as_ref()).await?;

        info!(
            artists = cache.artists.len(),
            albums = cache.albums.len(),
            tracks = cache.tracks.len(),
            playlists = cache.playlists.len(),
            "Catalog import persisted"
        );
        Ok(ImportResult::new(cache, refs.remaining))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_phrase() {
        assert_eq!(
            CatalogMetadataSource::search_phrase("Song", &["A".to_string(), "B".to_string()]),
            "Song A B Official Audio"
        );
    }
}
