//! Structures renvoyées par l'API Web du catalogue
//!
//! Seuls les champs utiles à l'import sont désérialisés ; tout le reste est
//! ignoré.

use serde::Deserialize;

/// Réponse de l'endpoint `/api/token`
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: String,
    /// Durée de validité en secondes
    pub expires_in: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Image {
    pub url: String,
}

/// Crédit d'un album ou d'une piste
#[derive(Debug, Clone, Deserialize)]
pub struct SimplifiedArtist {
    pub id: String,
    pub name: String,
    /// Type d'entité, `artist` pour les artistes au sens propre
    #[serde(rename = "type", default)]
    pub kind: String,
}

impl SimplifiedArtist {
    pub fn is_artist(&self) -> bool {
        self.kind == "artist"
    }
}

/// Page de résultats avec lien de continuation
#[derive(Debug, Clone, Deserialize)]
pub struct Paging<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub total: Option<u32>,
}

impl<T> Default for Paging<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            next: None,
            total: None,
        }
    }
}

/// Album tel qu'embarqué dans une piste
#[derive(Debug, Clone, Deserialize)]
pub struct SimplifiedAlbum {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub images: Vec<Image>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub artists: Vec<SimplifiedArtist>,
}

/// Réponse complète de `/albums`
#[derive(Debug, Clone, Deserialize)]
pub struct FullAlbum {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub images: Vec<Image>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub artists: Vec<SimplifiedArtist>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub tracks: Paging<SimplifiedTrack>,
}

/// Piste telle qu'embarquée dans un album
#[derive(Debug, Clone, Deserialize)]
pub struct SimplifiedTrack {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub artists: Vec<SimplifiedArtist>,
    #[serde(default)]
    pub duration_ms: u64,
    #[serde(default)]
    pub track_number: u32,
}

/// Réponse complète de `/tracks`
#[derive(Debug, Clone, Deserialize)]
pub struct FullTrack {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub artists: Vec<SimplifiedArtist>,
    pub album: SimplifiedAlbum,
    #[serde(default)]
    pub duration_ms: u64,
    #[serde(default)]
    pub track_number: u32,
}

/// Réponse de `/tracks?ids=`, `null` pour les identifiants inconnus
#[derive(Debug, Deserialize)]
pub(crate) struct TracksResponse {
    pub tracks: Vec<Option<FullTrack>>,
}

/// Réponse de `/albums?ids=`, `null` pour les identifiants inconnus
#[derive(Debug, Deserialize)]
pub(crate) struct AlbumsResponse {
    pub albums: Vec<Option<FullAlbum>>,
}

/// Réponse de `/playlists/{id}`
#[derive(Debug, Clone, Deserialize)]
pub struct PlaylistResponse {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub images: Vec<Image>,
    #[serde(default)]
    pub tracks: Paging<PlaylistItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlaylistItem {
    /// Date d'ajout, RFC 3339
    #[serde(default)]
    pub added_at: Option<String>,
    /// `null` pour les pistes retirées du catalogue
    #[serde(default)]
    pub track: Option<FullTrack>,
}
