//! Ordered registry of stream sources
//!
//! Registration order is priority order: resolution asks sources one after
//! the other and the first non-empty answer wins. Import walks the
//! import-capable sources in the same order, each one receiving the items the
//! previous one left unrecognised.

use crate::error::{Result, SourceError};
use crate::import::{ImportCache, ImportResult};
use crate::models::{TrackResource, TrackStreamInfo};
use crate::notify::Notifier;
use crate::source::{SourceInfo, StreamSource};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Result of [`SourceRegistry::import`]
#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportReport {
    /// Per-source results, in the order the sources ran
    pub results: Vec<(String, ImportResult)>,
    /// Items no source recognised
    pub remaining: Vec<String>,
}

impl ImportReport {
    /// Every entity imported by every source
    pub fn merged(&self) -> ImportCache {
        let mut cache = ImportCache::new();
        for (_, result) in &self.results {
            cache.merge(result.cache.clone());
        }
        cache
    }
}

#[derive(Debug, Default)]
pub struct SourceRegistry {
    sources: Vec<Arc<dyn StreamSource>>,
    notifier: Notifier,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_notifier(notifier: Notifier) -> Self {
        Self {
            sources: Vec::new(),
            notifier,
        }
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    /// Loads a source and appends it to the registry
    ///
    /// The source is only accepted once `load()` has completed. A failing
    /// `load()` is returned to the caller and the source is not registered.
    pub async fn register(&mut self, source: Arc<dyn StreamSource>) -> Result<()> {
        let id = source.id().to_string();
        if self.get(&id).is_some() {
            return Err(SourceError::DuplicateSource(id));
        }

        source.load().await.map_err(|e| SourceError::Load {
            source_id: id.clone(),
            reason: e.to_string(),
        })?;

        info!(
            source = %id,
            streaming = source.capabilities().supports_streaming,
            import = source.capabilities().supports_import,
            "Registered stream source"
        );
        self.sources.push(source);
        Ok(())
    }

    pub fn sources(&self) -> &[Arc<dyn StreamSource>] {
        &self.sources
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn StreamSource>> {
        self.sources.iter().find(|s| s.id() == id).cloned()
    }

    pub fn list(&self) -> Vec<SourceInfo> {
        self.sources.iter().map(|s| s.info()).collect()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Resolves a playable stream for `resource`
    ///
    /// Sources are asked strictly in registration order. A source returning
    /// `Ok(None)` passes to the next capable one; an error is not caught and
    /// ends the resolution. `Ok(None)` means no source could resolve.
    pub async fn resolve_stream(&self, resource: &TrackResource) -> Result<Option<TrackStreamInfo>> {
        for source in &self.sources {
            if !source.capabilities().supports_streaming || !source.can_fetch_stream(resource) {
                continue;
            }

            debug!(source = %source.id(), track = %resource.id, "Trying source");
            if let Some(info) = source.fetch_stream(resource).await? {
                debug!(source = %source.id(), track = %resource.id, "Stream resolved");
                return Ok(Some(info));
            }
        }

        debug!(track = %resource.id, "No source resolved the track");
        Ok(None)
    }

    /// Runs every import-capable source over `items`, chaining `remaining`
    pub async fn import(&self, items: Vec<String>) -> Result<ImportReport> {
        let mut remaining = items;
        let mut results = Vec::new();

        for source in self.sources.iter().filter(|s| s.capabilities().supports_import) {
            if remaining.is_empty() {
                break;
            }

            self.notifier
                .info(format!("Importing {} item(s) with {}", remaining.len(), source.id()));

            let result = match source.import(&remaining).await {
                Ok(result) => result,
                Err(e) => {
                    warn!(source = %source.id(), "Import failed: {}", e);
                    self.notifier
                        .error(format!("Import with {} failed: {}", source.id(), e));
                    return Err(e);
                }
            };

            if !result.cache.is_empty() {
                self.notifier.success(format!(
                    "{} imported {} track(s), {} album(s), {} artist(s), {} playlist(s)",
                    source.id(),
                    result.cache.tracks.len(),
                    result.cache.albums.len(),
                    result.cache.artists.len(),
                    result.cache.playlists.len()
                ));
            }

            remaining = result.remaining.clone();
            results.push((source.id().to_string(), result));
        }

        Ok(ImportReport { results, remaining })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SourceCapabilities;
    use async_trait::async_trait;
    use std::sync::Mutex;

    type CallLog = Arc<Mutex<Vec<String>>>;

    #[derive(Debug)]
    enum Answer {
        Found,
        Nothing,
        Fail,
    }

    #[derive(Debug)]
    struct ScriptedSource {
        id: String,
        claims: bool,
        answer: Answer,
        log: CallLog,
    }

    impl ScriptedSource {
        fn new(id: &str, claims: bool, answer: Answer, log: &CallLog) -> Arc<Self> {
            Arc::new(Self {
                id: id.to_string(),
                claims,
                answer,
                log: log.clone(),
            })
        }
    }

    #[async_trait]
    impl StreamSource for ScriptedSource {
        fn id(&self) -> &str {
            &self.id
        }

        fn capabilities(&self) -> SourceCapabilities {
            SourceCapabilities::STREAMING
        }

        fn can_fetch_stream(&self, _resource: &TrackResource) -> bool {
            self.claims
        }

        async fn fetch_stream(&self, _resource: &TrackResource) -> Result<Option<TrackStreamInfo>> {
            self.log.lock().unwrap().push(self.id.clone());
            match self.answer {
                Answer::Found => Ok(Some(TrackStreamInfo {
                    uri: format!("https://{}/stream", self.id),
                    duration: 0,
                    from: self.id.clone(),
                })),
                Answer::Nothing => Ok(None),
                Answer::Fail => Err(SourceError::NoMatch(self.id.clone())),
            }
        }
    }

    #[derive(Debug)]
    struct BrokenSource;

    #[async_trait]
    impl StreamSource for BrokenSource {
        fn id(&self) -> &str {
            "broken"
        }

        async fn load(&self) -> Result<()> {
            Err(SourceError::Provider("session refused".into()))
        }
    }

    fn resource() -> TrackResource {
        TrackResource::new("t1", "Song")
    }

    #[tokio::test]
    async fn test_first_capable_source_wins() {
        let log = CallLog::default();
        let mut registry = SourceRegistry::new();
        registry.register(ScriptedSource::new("a", true, Answer::Found, &log)).await.unwrap();
        registry.register(ScriptedSource::new("b", true, Answer::Found, &log)).await.unwrap();

        let info = registry.resolve_stream(&resource()).await.unwrap().unwrap();
        assert_eq!(info.from, "a");
        assert_eq!(*log.lock().unwrap(), vec!["a"]);
    }

    #[tokio::test]
    async fn test_falls_through_on_none_and_skips_non_capable() {
        let log = CallLog::default();
        let mut registry = SourceRegistry::new();
        registry.register(ScriptedSource::new("a", true, Answer::Nothing, &log)).await.unwrap();
        registry.register(ScriptedSource::new("b", false, Answer::Found, &log)).await.unwrap();
        registry.register(ScriptedSource::new("c", true, Answer::Found, &log)).await.unwrap();

        let info = registry.resolve_stream(&resource()).await.unwrap().unwrap();
        assert_eq!(info.from, "c");
        assert_eq!(*log.lock().unwrap(), vec!["a", "c"]);
    }

    #[tokio::test]
    async fn test_exhausted_sources_resolve_to_none() {
        let log = CallLog::default();
        let mut registry = SourceRegistry::new();
        registry.register(ScriptedSource::new("a", true, Answer::Nothing, &log)).await.unwrap();
        registry.register(ScriptedSource::new("b", true, Answer::Nothing, &log)).await.unwrap();

        assert!(registry.resolve_stream(&resource()).await.unwrap().is_none());
        assert!(SourceRegistry::new().resolve_stream(&resource()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_errors_propagate_without_fallthrough() {
        let log = CallLog::default();
        let mut registry = SourceRegistry::new();
        registry.register(ScriptedSource::new("a", true, Answer::Fail, &log)).await.unwrap();
        registry.register(ScriptedSource::new("b", true, Answer::Found, &log)).await.unwrap();

        let err = registry.resolve_stream(&resource()).await.unwrap_err();
        assert!(matches!(err, SourceError::NoMatch(_)));
        assert_eq!(*log.lock().unwrap(), vec!["a"]);
    }

    #[tokio::test]
    async fn test_failed_load_is_not_registered() {
        let mut registry = SourceRegistry::new();
        let err = registry.register(Arc::new(BrokenSource)).await.unwrap_err();
        assert!(matches!(err, SourceError::Load { .. }));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_id_rejected() {
        let log = CallLog::default();
        let mut registry = SourceRegistry::new();
        registry.register(ScriptedSource::new("a", true, Answer::Found, &log)).await.unwrap();
        let err = registry
            .register(ScriptedSource::new("a", true, Answer::Found, &log))
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::DuplicateSource(_)));
        assert_eq!(registry.list().len(), 1);
    }

    #[tokio::test]
    async fn test_import_skips_sources_without_capability() {
        let log = CallLog::default();
        let mut registry = SourceRegistry::new();
        registry.register(ScriptedSource::new("a", true, Answer::Found, &log)).await.unwrap();

        let report = registry.import(vec!["x".to_string()]).await.unwrap();
        assert!(report.results.is_empty());
        assert_eq!(report.remaining, vec!["x"]);
    }
}
