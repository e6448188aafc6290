//! Module d'authentification (flux client credentials)

use super::SpotifyApi;
use crate::error::Result;
use crate::models::TokenResponse;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Marge de sécurité avant l'expiration annoncée
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Token d'accès applicatif
#[derive(Debug, Clone)]
pub(crate) struct AccessToken {
    value: String,
    expires_at: Instant,
}

impl AccessToken {
    fn from_response(response: TokenResponse) -> Self {
        let lifetime = Duration::from_secs(response.expires_in).saturating_sub(EXPIRY_MARGIN);
        Self {
            value: response.access_token,
            expires_at: Instant::now() + lifetime,
        }
    }

    fn is_valid(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

impl SpotifyApi {
    /// Retourne un token valide, en demandant un nouveau si nécessaire
    ///
    /// # Errors
    ///
    /// * `SpotifyError::Unauthorized` - Client id ou secret refusés
    pub async fn access_token(&self) -> Result<String> {
        let mut token = self.token.lock().await;
        if let Some(current) = token.as_ref().filter(|t| t.is_valid()) {
            return Ok(current.value.clone());
        }

        let fresh = self.request_token().await?;
        let value = fresh.value.clone();
        *token = Some(fresh);
        Ok(value)
    }

    async fn request_token(&self) -> Result<AccessToken> {
        let url = format!("{}/api/token", self.accounts_base.trim_end_matches('/'));
        debug!("POST {}", url);

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;

        let response: TokenResponse = Self::handle_response(response).await?;
        info!(expires_in = response.expires_in, "Obtained catalog access token");
        Ok(AccessToken::from_response(response))
    }

    /// Oublie le token courant ; le prochain appel en demandera un nouveau
    pub async fn invalidate_token(&self) {
        *self.token.lock().await = None;
    }

    /// Vérifie si un token valide est disponible
    pub async fn is_authenticated(&self) -> bool {
        self.token
            .lock()
            .await
            .as_ref()
            .is_some_and(AccessToken::is_valid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_lifetime_keeps_margin() {
        let token = AccessToken::from_response(TokenResponse {
            access_token: "abc".into(),
            token_type: "Bearer".into(),
            expires_in: 3600,
        });
        assert!(token.is_valid());

        let short = AccessToken::from_response(TokenResponse {
            access_token: "abc".into(),
            token_type: "Bearer".into(),
            expires_in: 30,
        });
        assert!(!short.is_valid());
    }

    #[tokio::test]
    async fn test_not_authenticated_initially() {
        let api = SpotifyApi::builder("id", "secret").build().unwrap();
        assert!(!api.is_authenticated().await);
    }
}
