//! Client HTTP du service vidéo

use crate::error::{Result, YoutubeError};
use crate::models::{AudioStream, SearchItem, VideoInfo};
use pmoconfig::Config;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

/// Instance utilisée par défaut
pub const DEFAULT_API_BASE: &str = "https://inv.nadeko.net";

pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

pub const DEFAULT_USER_AGENT: &str = "pmoyoutube/0.1.0";

/// Client de recherche et de consultation des formats
///
/// # Exemple
///
/// ```no_run
/// use pmoyoutube::YoutubeClient;
///
/// # async fn demo() -> pmoyoutube::Result<()> {
/// let client = YoutubeClient::builder().build()?;
/// if let Some(id) = client.first_video_id("Song Artist Official Audio").await? {
///     let stream = client.audio_stream(&id).await?;
///     println!("{}", stream.url);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct YoutubeClient {
    client: Client,
    api_base: String,
}

impl YoutubeClient {
    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    /// Client construit depuis `http.*` et `sources.youtube.api_base`
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Ok(Self::builder()
            .api_base(config.get_youtube_api_base()?)
            .timeout(config.get_http_timeout()?)
            .user_agent(config.get_http_user_agent()?)
            .build()?)
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// Le client HTTP sous-jacent, partageable avec un `LinkChecker`
    pub fn http(&self) -> &Client {
        &self.client
    }

    // ============ Recherche ============

    /// Recherche des vidéos par texte libre
    pub async fn search(&self, query: &str) -> Result<Vec<SearchItem>> {
        let items: Vec<SearchItem> = self
            .get("/api/v1/search", &[("q", query), ("type", "video")])
            .await?;
        Ok(items.into_iter().filter(SearchItem::is_video).collect())
    }

    /// Identifiant du premier résultat, s'il existe
    pub async fn first_video_id(&self, query: &str) -> Result<Option<String>> {
        let hit = self.search(query).await?.into_iter().next().map(|i| i.video_id);
        debug!(query, hit = ?hit, "Video search");
        Ok(hit)
    }

    // ============ Formats ============

    pub async fn video(&self, video_id: &str) -> Result<VideoInfo> {
        self.get(&format!("/api/v1/videos/{}", video_id), &[]).await
    }

    /// Récupère les formats d'une vidéo et retient le flux audio de qualité moyenne
    ///
    /// L'URL retournée est signée et éphémère ; elle n'est pas vérifiée ici.
    pub async fn audio_stream(&self, video_id: &str) -> Result<AudioStream> {
        let info = self.video(video_id).await?;
        let format = info
            .audio_format()
            .ok_or_else(|| YoutubeError::NoAudioFormat(video_id.to_string()))?;

        Ok(AudioStream {
            video_id: info.video_id.clone(),
            url: format.url.clone(),
            approx_duration_ms: format.duration_ms(),
            length_seconds: info.length_seconds,
        })
    }

    async fn get<T: DeserializeOwned>(&self, endpoint: &str, params: &[(&str, &str)]) -> Result<T> {
        let url = format!("{}{}", self.api_base.trim_end_matches('/'), endpoint);
        debug!("GET {} with {} params", url, params.len());

        let response = self.client.get(&url).query(params).send().await?;
        self.handle_response(response).await
    }

    async fn handle_response<T: DeserializeOwned>(&self, response: Response) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!("Video host API error ({}): {}", status.as_u16(), error_text);
            return Err(YoutubeError::from_status_code(status.as_u16(), error_text));
        }

        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| {
            warn!("Failed to parse response: {}", e);
            YoutubeError::JsonParse(e)
        })
    }
}

/// Builder pour [`YoutubeClient`]
#[derive(Debug, Clone)]
pub struct ClientBuilder {
    client: Option<Client>,
    api_base: String,
    timeout: Duration,
    user_agent: String,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self {
            client: None,
            api_base: DEFAULT_API_BASE.to_string(),
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl ClientBuilder {
    /// Utilise un client HTTP existant (timeout et user agent ignorés)
    pub fn client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    pub fn api_base(mut self, url: impl Into<String>) -> Self {
        self.api_base = url.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn build(self) -> Result<YoutubeClient> {
        let client = match self.client {
            Some(client) => client,
            None => Client::builder()
                .timeout(self.timeout)
                .user_agent(self.user_agent)
                .build()?,
        };

        Ok(YoutubeClient {
            client,
            api_base: self.api_base,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let builder = ClientBuilder::default();
        assert_eq!(builder.api_base, DEFAULT_API_BASE);
        assert_eq!(builder.timeout, Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS));
    }

    #[test]
    fn test_from_config() {
        let config = Config::from_yaml_str(
            "sources:\n  youtube:\n    api_base: http://127.0.0.1:9999\n",
        )
        .unwrap();
        let client = YoutubeClient::from_config(&config).unwrap();
        assert_eq!(client.api_base(), "http://127.0.0.1:9999");
    }
}
