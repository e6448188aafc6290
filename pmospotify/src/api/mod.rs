//! Couche d'accès à l'API Web du catalogue
//!
//! Ce module fournit une interface bas-niveau : authentification par
//! client credentials ([`auth`]) et lectures du catalogue ([`catalog`]).

pub mod auth;
pub mod catalog;

use crate::error::{Result, SpotifyError};
use auth::AccessToken;
use pmoconfig::Config;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::fmt;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// URL de base de l'API Web
pub const DEFAULT_API_BASE: &str = "https://api.spotify.com/v1";

/// URL de base du service de comptes (émission des tokens)
pub const DEFAULT_ACCOUNTS_BASE: &str = "https://accounts.spotify.com";

pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

pub const DEFAULT_USER_AGENT: &str = "pmospotify/0.1.0";

/// Client API bas-niveau
pub struct SpotifyApi {
    client: Client,
    api_base: String,
    accounts_base: String,
    client_id: String,
    client_secret: String,
    /// Token courant, renouvelé à l'expiration
    token: Mutex<Option<AccessToken>>,
}

impl fmt::Debug for SpotifyApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpotifyApi")
            .field("api_base", &self.api_base)
            .field("accounts_base", &self.accounts_base)
            .field("client_id", &self.client_id)
            .finish_non_exhaustive()
    }
}

impl SpotifyApi {
    pub fn builder(client_id: impl Into<String>, client_secret: impl Into<String>) -> ApiBuilder {
        ApiBuilder::new(client_id, client_secret)
    }

    /// Client construit depuis `http.*` et `sources.spotify.*`
    pub fn from_config(config: &Config) -> Result<Self> {
        let (client_id, client_secret) = config.get_spotify_credentials()?;
        Self::builder(client_id, client_secret)
            .api_base(config.get_spotify_api_base()?)
            .accounts_base(config.get_spotify_accounts_base()?)
            .timeout(config.get_http_timeout()?)
            .user_agent(config.get_http_user_agent()?)
            .build()
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Le client HTTP sous-jacent
    pub fn http(&self) -> &Client {
        &self.client
    }

    /// URL absolue d'un endpoint ; les liens de continuation sont déjà absolus
    fn url_for(&self, endpoint: &str) -> String {
        if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            endpoint.to_string()
        } else {
            format!("{}{}", self.api_base.trim_end_matches('/'), endpoint)
        }
    }

    /// Effectue une requête GET authentifiée
    ///
    /// Un refus d'authentification invalide le token et la requête est
    /// rejouée une fois avec un token neuf.
    pub(crate) async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<T> {
        let url = self.url_for(endpoint);
        match self.send_get(&url, params).await {
            Err(e) if e.is_auth_error() => {
                warn!("Token rejected, requesting a new one");
                self.invalidate_token().await;
                self.send_get(&url, params).await
            }
            other => other,
        }
    }

    async fn send_get<T: DeserializeOwned>(&self, url: &str, params: &[(&str, &str)]) -> Result<T> {
        let token = self.access_token().await?;
        debug!("GET {} with {} params", url, params.len());

        let response = self
            .client
            .get(url)
            .bearer_auth(token)
            .query(params)
            .send()
            .await?;
        Self::handle_response(response).await
    }

    /// Traite la réponse HTTP
    async fn handle_response<T: DeserializeOwned>(response: Response) -> Result<T> {
        let status = response.status();
        let status_code = status.as_u16();

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!("API error ({}): {}", status_code, error_text);
            return Err(SpotifyError::from_status_code(status_code, error_text));
        }

        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| {
            warn!("Failed to parse response: {}", e);
            SpotifyError::JsonParse(e)
        })
    }
}

/// Builder pour [`SpotifyApi`]
#[derive(Debug, Clone)]
pub struct ApiBuilder {
    client: Option<Client>,
    api_base: String,
    accounts_base: String,
    client_id: String,
    client_secret: String,
    timeout: Duration,
    user_agent: String,
}

impl ApiBuilder {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client: None,
            api_base: DEFAULT_API_BASE.to_string(),
            accounts_base: DEFAULT_ACCOUNTS_BASE.to_string(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }

    pub fn client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    pub fn api_base(mut self, url: impl Into<String>) -> Self {
        self.api_base = url.into();
        self
    }

    pub fn accounts_base(mut self, url: impl Into<String>) -> Self {
        self.accounts_base = url.into();
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

    pub fn build(self) -> Result<SpotifyApi> {
        let client = match self.client {
            Some(client) => client,
            None => Client::builder()
                .timeout(self.timeout)
                .user_agent(self.user_agent)
                .build()?,
        };

        Ok(SpotifyApi {
            client,
            api_base: self.api_base,
            accounts_base: self.accounts_base,
            client_id: self.client_id,
            client_secret: self.client_secret,
            token: Mutex::new(None),
        })
    }
}
