//! Contexte applicatif : configuration, bibliothèque, registre et cache
//!
//! Construit une seule fois au démarrage puis partagé par les handlers HTTP.

use anyhow::Context;
use pmoconfig::Config;
use pmolocal::LocalFileSource;
use pmosource::{LibraryStore, MemoryLibrary, SourceRegistry, StreamCache, StreamSource};
use pmospotify::CatalogMetadataSource;
use pmoyoutube::VideoHostSource;
use std::sync::Arc;
use tracing::{error, info};

pub struct ResolverContext {
    pub config: Arc<Config>,
    pub library: Arc<dyn LibraryStore>,
    pub cache: StreamCache,
}

impl ResolverContext {
    /// Enregistre les sources activées puis construit le cache
    ///
    /// L'ordre d'enregistrement fixe la priorité de résolution : fichiers
    /// locaux, catalogue, service vidéo. Une source activée mal configurée
    /// ou qui échoue à se charger interrompt le démarrage.
    pub async fn bootstrap(config: Config) -> anyhow::Result<Self> {
        let library: Arc<dyn LibraryStore> = Arc::new(MemoryLibrary::new());
        let mut registry = SourceRegistry::new();

        if config.get_local_enabled()? {
            info!("📁 Registering local files...");
            let source = LocalFileSource::from_config(&config)
                .context("Local file source misconfigured")?;
            register(&mut registry, Arc::new(source)).await?;
        }

        if config.get_spotify_enabled()? {
            info!("🎼 Registering catalog source...");
            let source = CatalogMetadataSource::from_config(&config, library.clone())
                .context("Catalog source misconfigured")?;
            register(&mut registry, Arc::new(source)).await?;
        }

        if config.get_youtube_enabled()? {
            info!("📺 Registering video host source...");
            let source = VideoHostSource::from_config(&config)
                .context("Video host source misconfigured")?;
            register(&mut registry, Arc::new(source)).await?;
        }

        info!("✅ {} stream source(s) registered", registry.len());
        for source in registry.list() {
            info!("  - {} ({:?})", source.id, source.capabilities);
        }

        Ok(Self::new(config, library, registry))
    }

    pub fn new(config: Config, library: Arc<dyn LibraryStore>, registry: SourceRegistry) -> Self {
        Self {
            config: Arc::new(config),
            library,
            cache: StreamCache::new(Arc::new(registry)),
        }
    }

    pub fn registry(&self) -> &SourceRegistry {
        self.cache.registry()
    }
}

async fn register(
    registry: &mut SourceRegistry,
    source: Arc<dyn StreamSource>,
) -> anyhow::Result<()> {
    let id = source.id().to_string();
    registry.register(source).await.map_err(|e| {
        error!("❌ Failed to register {}: {}", id, e);
        anyhow::Error::new(e).context(format!("Could not register source '{}'", id))
    })
}
