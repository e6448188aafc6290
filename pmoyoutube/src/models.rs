//! Structures de données du service vidéo
//!
//! Le format suit l'API `/api/v1` des instances compatibles Invidious.

use regex::Regex;
use serde::Deserialize;
use std::sync::LazyLock;

/// Préfixe canonique des URLs de lecture
pub const WATCH_URL_PREFIX: &str = "https://youtube.com/watch?v=";

/// Qualité audio retenue pour la lecture
pub const PREFERRED_AUDIO_QUALITY: &str = "AUDIO_QUALITY_MEDIUM";

static WATCH_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https://(?:[A-Za-z0-9-]+\.)?youtube\.[a-z]{2,}(?:\.[a-z]{2})?/watch\?v=([A-Za-z0-9_-]*)")
        .expect("valid watch url pattern")
});

/// URL de lecture canonique d'une vidéo
///
/// Un identifiant vide donne le préfixe seul.
pub fn watch_url(video_id: &str) -> String {
    format!("{}{}", WATCH_URL_PREFIX, video_id)
}

/// Vrai si `uri` est une URL de lecture du service (`https://(sub.)youtube.<tld>/watch?v=`)
pub fn is_watch_url(uri: &str) -> bool {
    WATCH_URL.is_match(uri)
}

/// Identifiant de vidéo d'une URL de lecture, éventuellement vide
pub fn video_id(uri: &str) -> Option<&str> {
    WATCH_URL
        .captures(uri)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// Résultat de `/api/v1/search`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchItem {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub video_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub length_seconds: u64,
}

impl SearchItem {
    pub fn is_video(&self) -> bool {
        self.kind == "video" && !self.video_id.is_empty()
    }
}

/// Réponse de `/api/v1/videos/{id}`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoInfo {
    pub video_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub length_seconds: u64,
    #[serde(default)]
    pub adaptive_formats: Vec<AdaptiveFormat>,
}

impl VideoInfo {
    /// Premier format audio de qualité moyenne
    pub fn audio_format(&self) -> Option<&AdaptiveFormat> {
        self.adaptive_formats
            .iter()
            .find(|f| f.has_audio() && f.audio_quality.as_deref() == Some(PREFERRED_AUDIO_QUALITY))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdaptiveFormat {
    pub url: String,
    /// Type MIME, par exemple `audio/webm; codecs="opus"`
    #[serde(rename = "type", default)]
    pub mime_type: String,
    #[serde(default)]
    pub audio_quality: Option<String>,
    #[serde(default)]
    pub approx_duration_ms: Option<String>,
}

impl AdaptiveFormat {
    pub fn has_audio(&self) -> bool {
        self.mime_type.starts_with("audio/") || self.audio_quality.is_some()
    }

    /// Durée annoncée en millisecondes, 0 si absente ou illisible
    pub fn duration_ms(&self) -> u64 {
        self.approx_duration_ms
            .as_deref()
            .and_then(|d| d.trim().parse().ok())
            .unwrap_or(0)
    }
}

/// Flux audio retenu pour une vidéo
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioStream {
    pub video_id: String,
    pub url: String,
    pub approx_duration_ms: u64,
    pub length_seconds: u64,
}
