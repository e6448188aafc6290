//! Source de flux adossée au service vidéo
//!
//! Résout n'importe quelle piste, y compris celles sans URI connue, en
//! cherchant une vidéo correspondante. Les URLs signées du service sont
//! parfois invalides dès leur émission : chaque tentative relit les formats
//! et vérifie l'URL par une requête HEAD, dans la limite de
//! [`MAX_ATTEMPTS`] tentatives.

use crate::client::YoutubeClient;
use crate::models::{is_watch_url, video_id, watch_url};
use async_trait::async_trait;
use pmoconfig::Config;
use pmosource::{
    LinkChecker, Result, SourceCapabilities, StreamSource, TrackResource, TrackStreamInfo,
};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Identifiant de la source
pub const YOUTUBE_SOURCE_ID: &str = "youtube";

/// Nombre maximal de tentatives par résolution
pub const MAX_ATTEMPTS: usize = 10;

#[derive(Debug, Clone)]
pub struct VideoHostSource {
    client: YoutubeClient,
    checker: LinkChecker,
    max_attempts: usize,
    retry_delay: Duration,
}

impl VideoHostSource {
    pub fn new(client: YoutubeClient, checker: LinkChecker) -> Self {
        Self {
            client,
            checker,
            max_attempts: MAX_ATTEMPTS,
            retry_delay: Duration::ZERO,
        }
    }

    /// Source construite depuis `sources.youtube.*`
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let client = YoutubeClient::from_config(config)?;
        let checker = LinkChecker::with_client(client.http().clone());
        Ok(Self::new(client, checker)
            .with_max_attempts(config.get_youtube_max_attempts()?)
            .with_retry_delay(Duration::from_millis(config.get_youtube_retry_delay_ms()? as u64)))
    }

    /// Borné à `1..=MAX_ATTEMPTS`
    pub fn with_max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = attempts.clamp(1, MAX_ATTEMPTS);
        self
    }

    /// Pause entre deux tentatives (aucune par défaut)
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn client(&self) -> &YoutubeClient {
        &self.client
    }

    pub fn checker(&self) -> &LinkChecker {
        &self.checker
    }

    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    /// URL de lecture de la piste
    ///
    /// Sans URI, cherche `"{title} {artists}, {album}"` ; faute de résultat,
    /// l'URL se réduit au préfixe de lecture avec un identifiant vide.
    pub async fn watch_url_for(&self, resource: &TrackResource) -> Result<String> {
        if !resource.uri.is_empty() {
            return Ok(resource.uri.clone());
        }

        let query = format!(
            "{} {}, {}",
            resource.title,
            resource.artists.join(" "),
            resource.album
        );
        let id = self.client.first_video_id(&query).await?;
        Ok(watch_url(id.as_deref().unwrap_or_default()))
    }

    /// Une tentative : formats frais, sélection audio, vérification HEAD
    async fn attempt(&self, id: &str, attempt: usize) -> Option<(String, u64)> {
        let stream = match self.client.audio_stream(id).await {
            Ok(stream) => stream,
            Err(e) => {
                warn!(video = %id, attempt, "No usable format: {}", e);
                return None;
            }
        };

        if !self.checker.is_reachable(&stream.url).await {
            warn!(video = %id, attempt, "Stream URL not reachable, retrying");
            return None;
        }

        Some((stream.url, stream.approx_duration_ms))
    }
}

#[async_trait]
impl StreamSource for VideoHostSource {
    fn id(&self) -> &str {
        YOUTUBE_SOURCE_ID
    }

    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities::STREAMING
    }

    fn can_fetch_stream(&self, resource: &TrackResource) -> bool {
        resource.uri.is_empty() || is_watch_url(&resource.uri)
    }

    async fn fetch_stream(&self, resource: &TrackResource) -> Result<Option<TrackStreamInfo>> {
        let from = self.watch_url_for(resource).await?;
        let id = video_id(&from).unwrap_or_default().to_string();

        for attempt in 1..=self.max_attempts {
            if attempt > 1 && !self.retry_delay.is_zero() {
                tokio::time::sleep(self.retry_delay).await;
            }

            if let Some((uri, duration)) = self.attempt(&id, attempt).await {
                info!(video = %id, attempt, "Video stream resolved");
                return Ok(Some(TrackStreamInfo { uri, duration, from }));
            }
        }

        debug!(video = %id, attempts = self.max_attempts, "Giving up on video stream");
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> VideoHostSource {
        let client = YoutubeClient::builder().build().unwrap();
        let checker = LinkChecker::with_client(client.http().clone());
        VideoHostSource::new(client, checker)
    }

    #[test]
    fn test_can_fetch_stream() {
        let source = source();
        assert!(source.can_fetch_stream(&TrackResource::new("t1", "Song")));
        assert!(source.can_fetch_stream(
            &TrackResource::new("t1", "Song").with_uri("https://www.youtube.com/watch?v=abc")
        ));
        assert!(!source.can_fetch_stream(
            &TrackResource::new("t1", "Song").with_uri("https://open.spotify.com/track/abc")
        ));
    }

    #[test]
    fn test_attempts_are_bounded() {
        assert_eq!(source().with_max_attempts(50).max_attempts(), MAX_ATTEMPTS);
        assert_eq!(source().with_max_attempts(0).max_attempts(), 1);
        assert_eq!(source().with_max_attempts(3).max_attempts(), 3);
    }

    #[tokio::test]
    async fn test_known_uri_skips_search() {
        let resource = TrackResource::new("t1", "Song").with_uri("https://youtube.com/watch?v=xyz");
        assert_eq!(
            source().watch_url_for(&resource).await.unwrap(),
            "https://youtube.com/watch?v=xyz"
        );
    }
}
