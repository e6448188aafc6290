//! Stream cache
//!
//! [`StreamCache`] memoizes resolved streams per track id in front of a
//! [`SourceRegistry`]. Signed media URLs carry their expiry as an
//! `expire=<unix seconds>` query parameter; each entry lives in a moka cache
//! with a per-entry expiration derived from it. A stream whose URL has no
//! such marker is never cached and the fetch is reported as failed.
//!
//! Concurrent requests for the same track share one resolution: moka runs
//! the initialisation once and every caller receives its outcome, success
//! or failure.
//!
//! ```text
//! get_stream_info(t1) ──┐
//!                       ├── try_get_with(t1) ── registry.resolve_stream(t1) ── admission ── entry (expire_after_create)
//! get_stream_info(t1) ──┘        (one init)                                          └── shared outcome
//! ```

use crate::error::{Result, SourceError};
use crate::models::{TrackResource, TrackStreamInfo};
use crate::registry::SourceRegistry;
use moka::Expiry;
use moka::future::Cache as MokaCache;
use regex::Regex;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, LazyLock, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

static EXPIRE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[?&]expire=(\d+)").expect("valid expire pattern")
});

/// Nombre maximal de flux mémorisés
const DEFAULT_MAX_CAPACITY: u64 = 10_000;

/// Durée de vie maximale d'une entrée, quelle que soit l'expiration annoncée
pub const MAX_STREAM_LIFETIME: Duration = Duration::from_secs(24 * 3600);

/// Binding to whatever is currently playing
///
/// Consulted when an entry is removed: if the playing track is the removed
/// one, playback is asked to skip it.
pub trait PlaybackControl: Send + Sync {
    fn current_track_id(&self) -> Option<String>;
    fn skip(&self);
}

/// Extracts the `expire=<unix seconds>` marker of a signed URL
pub fn parse_expire(uri: &str) -> Option<i64> {
    EXPIRE_PATTERN
        .captures(uri)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Time left before an entry must be evicted, in milliseconds
///
/// The track duration is added twice on top of the URL expiry. Saturates
/// instead of overflowing on absurd markers.
pub fn expire_in_ms(expire_epoch_secs: i64, now_ms: i64, duration_ms: u64) -> i64 {
    let duration = i64::try_from(duration_ms).unwrap_or(i64::MAX);
    expire_epoch_secs
        .saturating_mul(1000)
        .saturating_sub(now_ms)
        .saturating_sub(duration.saturating_mul(-2))
}

/// Lifetime of a cache entry for `info`, bounded by [`MAX_STREAM_LIFETIME`]
///
/// `None` when the URL has no expiry marker or is already expired.
pub fn stream_lifetime(info: &TrackStreamInfo, now_ms: i64) -> Option<Duration> {
    let expire = parse_expire(&info.uri)?;
    let delay = expire_in_ms(expire, now_ms, info.duration);
    if delay <= 0 {
        return None;
    }
    Some(Duration::from_millis(delay as u64).min(MAX_STREAM_LIFETIME))
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Expiration par entrée, lue dans l'URL du flux
struct StreamExpiry;

impl Expiry<String, TrackStreamInfo> for StreamExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &TrackStreamInfo,
        _created_at: Instant,
    ) -> Option<Duration> {
        // Seuls les flux admis sont insérés ; zéro par sécurité
        Some(stream_lifetime(value, now_ms()).unwrap_or(Duration::ZERO))
    }

    fn expire_after_update(
        &self,
        key: &String,
        value: &TrackStreamInfo,
        updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        self.expire_after_create(key, value, updated_at)
    }
}

/// Outcome of a resolution that must not be stored
enum Miss {
    /// Handed to the callers without being cached (possibly nothing)
    Uncached(Option<TrackStreamInfo>),
    Failed(SourceError),
}

struct Inner {
    registry: Arc<SourceRegistry>,
    entries: MokaCache<String, TrackStreamInfo>,
    /// Track id → generation of the resolution in flight
    in_flight: Mutex<HashMap<String, u64>>,
    generation: AtomicU64,
    playback: Option<Arc<dyn PlaybackControl>>,
}

impl Inner {
    fn in_flight(&self) -> MutexGuard<'_, HashMap<String, u64>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Resolves through the registry and applies the admission policy
    ///
    /// A resolution whose id was removed meanwhile is handed out but not
    /// cached.
    async fn resolve(self: Arc<Self>, resource: TrackResource) -> std::result::Result<TrackStreamInfo, Miss> {
        let generation = self.generation.fetch_add(1, Ordering::Relaxed);
        self.in_flight().insert(resource.id.clone(), generation);

        let outcome = self.registry.resolve_stream(&resource).await;

        let current = {
            let mut in_flight = self.in_flight();
            if in_flight.get(&resource.id) == Some(&generation) {
                in_flight.remove(&resource.id);
                true
            } else {
                false
            }
        };

        match outcome {
            Ok(Some(info)) if !current => {
                debug!(track = %resource.id, "Removed while resolving, not caching");
                Err(Miss::Uncached(Some(info)))
            }
            Ok(Some(info)) => {
                if parse_expire(&info.uri).is_none() {
                    warn!(track = %resource.id, "Stream URL has no expiry marker, not caching");
                    return Err(Miss::Uncached(None));
                }
                match stream_lifetime(&info, now_ms()) {
                    Some(lifetime) => {
                        debug!(track = %resource.id, expire_in_ms = lifetime.as_millis() as u64, "Stream cached");
                        Ok(info)
                    }
                    None => {
                        debug!(track = %resource.id, "Stream already expired, handed out without caching");
                        Err(Miss::Uncached(Some(info)))
                    }
                }
            }
            Ok(None) => {
                debug!(track = %resource.id, "No stream resolved");
                Err(Miss::Uncached(None))
            }
            Err(e) => {
                warn!(track = %resource.id, "Stream resolution failed: {}", e);
                self.registry
                    .notifier()
                    .error(format!("Could not play \"{}\": {}", resource.title, e));
                Err(Miss::Failed(e))
            }
        }
    }
}

/// Memoizing front of a [`SourceRegistry`]
///
/// Cheap to clone; clones share the same entries.
#[derive(Clone)]
pub struct StreamCache {
    inner: Arc<Inner>,
}

impl fmt::Debug for StreamCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamCache")
            .field("entries", &self.inner.entries.entry_count())
            .field("fetching", &self.inner.in_flight().len())
            .finish()
    }
}

impl StreamCache {
    pub fn new(registry: Arc<SourceRegistry>) -> Self {
        Self::build(registry, None)
    }

    pub fn with_playback(registry: Arc<SourceRegistry>, playback: Arc<dyn PlaybackControl>) -> Self {
        Self::build(registry, Some(playback))
    }

    fn build(registry: Arc<SourceRegistry>, playback: Option<Arc<dyn PlaybackControl>>) -> Self {
        Self {
            inner: Arc::new(Inner {
                registry,
                entries: MokaCache::builder()
                    .max_capacity(DEFAULT_MAX_CAPACITY)
                    .expire_after(StreamExpiry)
                    .build(),
                in_flight: Mutex::new(HashMap::new()),
                generation: AtomicU64::new(0),
                playback,
            }),
        }
    }

    pub fn registry(&self) -> &Arc<SourceRegistry> {
        &self.inner.registry
    }

    /// Returns the stream for `resource`, resolving it when needed
    ///
    /// With `force_new`, a cached entry is dropped and replaced. A resolution
    /// already in flight for the same id is joined instead of duplicated.
    ///
    /// `Ok(None)` covers both "no source could resolve" and "resolved but not
    /// admitted" (no expiry marker). A hard failure from a source is returned
    /// to every caller sharing the resolution.
    pub async fn get_stream_info(
        &self,
        resource: &TrackResource,
        force_new: bool,
    ) -> Result<Option<TrackStreamInfo>> {
        if force_new {
            self.inner.entries.invalidate(&resource.id).await;
        }

        let inner = self.inner.clone();
        let owned = resource.clone();
        // La résolution tourne dans sa propre tâche : elle se termine même
        // si l'appelant abandonne.
        let init = async move {
            let id = owned.id.clone();
            match tokio::spawn(inner.clone().resolve(owned)).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    inner.in_flight().remove(&id);
                    Err(Miss::Failed(SourceError::Aborted(e.to_string())))
                }
            }
        };

        match self.inner.entries.try_get_with(resource.id.clone(), init).await {
            Ok(info) => Ok(Some(info)),
            Err(miss) => match Arc::try_unwrap(miss) {
                Ok(Miss::Uncached(info)) => Ok(info),
                Ok(Miss::Failed(e)) => Err(e),
                Err(shared) => match shared.as_ref() {
                    Miss::Uncached(info) => Ok(info.clone()),
                    Miss::Failed(e) => Err(e.replicate()),
                },
            },
        }
    }

    pub async fn has(&self, id: &str) -> bool {
        self.inner.entries.get(id).await.is_some()
    }

    pub fn fetching(&self, id: &str) -> bool {
        self.inner.in_flight().contains_key(id)
    }

    /// Evicts the entry and fetching state of `id`
    ///
    /// A resolution still in flight completes for its callers but its result
    /// is not cached. Skips playback when the removed track is the one
    /// playing.
    pub async fn remove(&self, id: &str) {
        self.inner.entries.invalidate(id).await;
        self.inner.in_flight().remove(id);

        if let Some(playback) = &self.inner.playback {
            if playback.current_track_id().as_deref() == Some(id) {
                debug!(track = %id, "Removed stream is playing, skipping");
                playback.skip();
            }
        }
    }

    pub async fn len(&self) -> usize {
        self.inner.entries.run_pending_tasks().await;
        self.inner.entries.entry_count() as usize
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stream(uri: &str, duration: u64) -> TrackStreamInfo {
        TrackStreamInfo {
            uri: uri.to_string(),
            duration,
            from: "test".to_string(),
        }
    }

    #[test]
    fn test_parse_expire() {
        assert_eq!(
            parse_expire("https://host/videoplayback?expire=1700000000&ei=abc"),
            Some(1_700_000_000)
        );
        assert_eq!(parse_expire("https://host/videoplayback?ei=abc&expire=42"), Some(42));
        assert_eq!(parse_expire("file:///music/a.flac"), None);
        assert_eq!(parse_expire("https://host/?notexpire=12"), None);
    }

    #[test]
    fn test_expire_in_ms_adds_twice_the_duration() {
        // 60 s before expiry, 1 s track
        assert_eq!(expire_in_ms(1_000, 940_000, 1_000), 62_000);
        assert_eq!(expire_in_ms(1_000, 1_000_000, 0), 0);
    }

    #[test]
    fn test_huge_expiry_marker_saturates() {
        assert_eq!(expire_in_ms(99_999_999_999_999_999, 0, 0), i64::MAX);
        assert_eq!(expire_in_ms(i64::MAX, i64::MIN, u64::MAX), i64::MAX);

        let far = stream("https://host/v?expire=99999999999999999", 1_000);
        assert_eq!(stream_lifetime(&far, now_ms()), Some(MAX_STREAM_LIFETIME));
    }

    #[test]
    fn test_stream_lifetime() {
        let now = 1_000_000;
        assert_eq!(
            stream_lifetime(&stream("https://host/v?expire=1060", 1_000), now),
            Some(Duration::from_millis(62_000))
        );
        assert_eq!(stream_lifetime(&stream("https://host/v?expire=900", 0), now), None);
        assert_eq!(stream_lifetime(&stream("https://host/v", 0), now), None);
    }
}
