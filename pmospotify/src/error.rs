//! Gestion des erreurs pour le client du catalogue

use pmosource::SourceError;
use thiserror::Error;

/// Type Result personnalisé pour pmospotify
pub type Result<T> = std::result::Result<T, SpotifyError>;

/// Erreurs possibles lors de l'utilisation du client du catalogue
#[derive(Error, Debug)]
pub enum SpotifyError {
    /// Erreur d'authentification (credentials invalides ou token refusé)
    #[error("Authentication failed: {0}")]
    Unauthorized(String),

    /// Ressource non trouvée (album, track, playlist)
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parsing error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Erreur de configuration (anyhow)
    #[error("Configuration error: {0}")]
    Config(#[from] anyhow::Error),

    /// Erreur de l'API du catalogue
    #[error("Catalog API error (code {code}): {message}")]
    ApiError { code: u16, message: String },

    /// Quota dépassé (rate limiting)
    #[error("Rate limit exceeded, please try again later")]
    RateLimitExceeded,

    /// Erreur de stockage de la bibliothèque
    #[error("Library error: {0}")]
    Library(#[from] SourceError),
}

impl SpotifyError {
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

    /// Vérifie si l'erreur est une erreur de credentials (401/403)
    pub fn is_auth_error(&self) -> bool {
        matches!(self, SpotifyError::Unauthorized(_))
    }

    pub fn is_rate_limit(&self) -> bool {
        matches!(self, SpotifyError::RateLimitExceeded)
    }
}

impl From<SpotifyError> for SourceError {
    fn from(e: SpotifyError) -> Self {
        match e {
            SpotifyError::Library(e) => e,
            SpotifyError::Http(e) => SourceError::Http(e),
            other => SourceError::Provider(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_code() {
        assert!(SpotifyError::from_status_code(401, "expired").is_auth_error());
        assert!(SpotifyError::from_status_code(403, "forbidden").is_auth_error());
        assert!(matches!(
            SpotifyError::from_status_code(404, "x"),
            SpotifyError::NotFound(_)
        ));
        assert!(SpotifyError::from_status_code(429, "").is_rate_limit());
        assert!(matches!(
            SpotifyError::from_status_code(500, "boom"),
            SpotifyError::ApiError { code: 500, .. }
        ));
    }

    #[test]
    fn test_library_errors_pass_through() {
        let err: SourceError = SpotifyError::Library(SourceError::storage("disk full")).into();
        assert!(matches!(err, SourceError::Storage(_)));
    }
}
