//! Gestion des erreurs pour le client du service vidéo

use pmosource::SourceError;
use thiserror::Error;

/// Type Result personnalisé pour pmoyoutube
pub type Result<T> = std::result::Result<T, YoutubeError>;

#[derive(Error, Debug)]
pub enum YoutubeError {
    /// Accès refusé par l'instance (401/403)
    #[error("Access denied: {0}")]
    Unauthorized(String),

    /// Vidéo introuvable
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parsing error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Erreur renvoyée par l'API
    #[error("Video host API error (code {code}): {message}")]
    ApiError { code: u16, message: String },

    #[error("Rate limit exceeded, please try again later")]
    RateLimitExceeded,

    /// Aucun format audio exploitable pour la vidéo
    #[error("No audio format available for video '{0}'")]
    NoAudioFormat(String),
}

impl YoutubeError {
    /// Crée une erreur API depuis un code de statut HTTP et un message
    pub fn from_status_code(code: u16, message: impl Into<String>) -> Self {
        match code {
            401 | 403 => Self::Unauthorized(message.into()),
            404 => Self::NotFound(message.into()),
            429 => Self::RateLimitExceeded,
            _ => Self::ApiError {
                code,
                message: message.into(),
            },
        }
    }

    pub fn is_rate_limit(&self) -> bool {
        matches!(self, Self::RateLimitExceeded)
    }
}

impl From<YoutubeError> for SourceError {
    fn from(e: YoutubeError) -> Self {
        match e {
            YoutubeError::Http(e) => SourceError::Http(e),
            YoutubeError::NoAudioFormat(id) => {
                SourceError::NoMatch(format!("no audio format for video {}", id))
            }
            other => SourceError::Provider(other.to_string()),
        }
    }
}
