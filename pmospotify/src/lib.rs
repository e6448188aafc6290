//! # pmospotify - Source catalogue pour PMOResolver
//!
//! Cette crate importe des métadonnées depuis l'API Web du catalogue
//! (albums, pistes, playlists) dans la bibliothèque, et sait lire les pistes
//! importées en s'appuyant sur le service vidéo de `pmoyoutube`.
//!
//! ## Architecture
//!
//! - `SpotifyApi` : client bas-niveau (token client credentials, lots, pagination)
//! - `reference` : reconnaissance des URLs et identifiants du catalogue
//! - `importer` : normalisation des réponses en entités de bibliothèque
//! - `CatalogMetadataSource` : implémentation de [`pmosource::StreamSource`]
//!
//! ```text
//! pmospotify/
//! ├── src/
//! │   ├── lib.rs          # Module principal (ce fichier)
//! │   ├── api/
//! │   │   ├── mod.rs      # Client API
//! │   │   ├── auth.rs     # Token applicatif
//! │   │   └── catalog.rs  # Tracks, albums, playlists
//! │   ├── importer.rs     # Normalisation
//! │   ├── models.rs       # Réponses de l'API
//! │   ├── reference.rs    # Références acceptées à l'import
//! │   ├── source.rs       # CatalogMetadataSource
//! │   └── error.rs        # Gestion des erreurs
//! ```
//!
//! ## Utilisation
//!
//! ```rust,no_run
//! use pmosource::{MemoryLibrary, StreamSource};
//! use pmospotify::CatalogMetadataSource;
//! use std::sync::Arc;
//!
//! # async fn demo(config: &pmoconfig::Config) -> anyhow::Result<()> {
//! let library = Arc::new(MemoryLibrary::new());
//! let source = CatalogMetadataSource::from_config(config, library)?;
//! source.load().await?;
//!
//! let result = source
//!     .import(&["https://open.spotify.com/album/4aawyAB9vmqN3uQ7FjRGTy".to_string()])
//!     .await?;
//! println!("{} tracks imported", result.cache.tracks.len());
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod error;
pub mod importer;
pub mod models;
pub mod reference;
pub mod source;

pub use api::catalog::{MAX_ALBUMS_PER_REQUEST, MAX_TRACKS_PER_REQUEST};
pub use api::{ApiBuilder, SpotifyApi};
pub use error::{Result, SpotifyError};
pub use importer::{CatalogImporter, FALLBACK_RELEASE_YEAR, SPOTIFY_SOURCE_ID, release_year};
pub use reference::{CatalogRef, PartitionedRefs, ReferenceParser};
pub use source::{CatalogMetadataSource, DEFAULT_WEB_DOMAIN};
