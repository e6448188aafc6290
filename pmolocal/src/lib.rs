//! # pmolocal - Local file source
//!
//! Resolves tracks backed by files on disk. At load time the configured
//! library directories are walked and every audio file (by extension) is
//! indexed under a stable id, `local-track-<sha1 of the path>`. Files can also
//! be registered by hand with [`LocalFileSource::register_file_as`].
//!
//! Resolution never touches the network: the stream URI is the `file://` URL
//! of the indexed path, or nothing if the file has disappeared.

use async_trait::async_trait;
use pmoconfig::Config;
use pmosource::{
    ImportCategory, Result, SourceCapabilities, SourceError, StreamSource, TrackResource,
    TrackStreamInfo, namespaced_id,
};
use sha1::{Digest, Sha1};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};
use tracing::{debug, info, warn};
use url::Url;

/// Identifier of the local file source
pub const LOCAL_SOURCE_ID: &str = "local";

/// Maximum directory depth explored by the scan
const MAX_SCAN_DEPTH: usize = 32;

#[derive(Debug)]
pub struct LocalFileSource {
    directories: Vec<PathBuf>,
    extensions: Vec<String>,
    index: RwLock<HashMap<String, PathBuf>>,
}

impl LocalFileSource {
    pub fn new<P: Into<PathBuf>>(
        directories: impl IntoIterator<Item = P>,
        extensions: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            directories: directories.into_iter().map(Into::into).collect(),
            extensions: extensions
                .into_iter()
                .map(|e| e.trim_start_matches('.').to_lowercase())
                .collect(),
            index: RwLock::new(HashMap::new()),
        }
    }

    /// Builds the source from `sources.local.*`
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Ok(Self::new(
            config.get_local_directories()?,
            config.get_local_extensions()?,
        ))
    }

    /// Library id of a local file
    pub fn track_id(path: &Path) -> String {
        let digest = Sha1::digest(path.to_string_lossy().as_bytes());
        namespaced_id(LOCAL_SOURCE_ID, ImportCategory::Track, &hex::encode(digest))
    }

    /// Indexes `path` under its derived id and returns that id
    pub fn register_file(&self, path: impl Into<PathBuf>) -> String {
        let path = path.into();
        let id = Self::track_id(&path);
        self.register_file_as(id.clone(), path);
        id
    }

    /// Indexes `path` under an explicit id
    pub fn register_file_as(&self, id: impl Into<String>, path: impl Into<PathBuf>) {
        self.index
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.into(), path.into());
    }

    pub fn path_of(&self, id: &str) -> Option<PathBuf> {
        self.index
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.index.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_audio(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| self.extensions.iter().any(|x| x.eq_ignore_ascii_case(e)))
            .unwrap_or(false)
    }

    /// Walks the configured directories and indexes audio files
    ///
    /// Missing directories are skipped with a warning. Returns the number of
    /// files indexed by this scan.
    pub async fn scan(&self) -> Result<usize> {
        let mut found = 0;
        for root in &self.directories {
            match tokio::fs::metadata(root).await {
                Ok(meta) if meta.is_dir() => {}
                _ => {
                    warn!(directory = %root.display(), "Library directory not found, skipping");
                    continue;
                }
            }
            for path in self.walk(root).await {
                self.register_file(path);
                found += 1;
            }
        }
        info!(files = found, "Local library scanned");
        Ok(found)
    }

    /// Collects audio files under `root`
    ///
    /// Unreadable entries are logged and skipped; the scan goes on.
    async fn walk(&self, root: &Path) -> Vec<PathBuf> {
        let mut files = Vec::new();
        let mut visited = HashSet::new();
        let mut stack = vec![(root.to_path_buf(), 0usize)];

        while let Some((dir, depth)) = stack.pop() {
            // Les liens symboliques peuvent former des cycles
            let canonical = match tokio::fs::canonicalize(&dir).await {
                Ok(canonical) => canonical,
                Err(e) => {
                    warn!(directory = %dir.display(), "Cannot resolve directory: {}", e);
                    continue;
                }
            };
            if !visited.insert(canonical) {
                continue;
            }

            let mut entries = match tokio::fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) => {
                    warn!(directory = %dir.display(), "Cannot read directory: {}", e);
                    continue;
                }
            };

            loop {
                let entry = match entries.next_entry().await {
                    Ok(Some(entry)) => entry,
                    Ok(None) => break,
                    Err(e) => {
                        warn!(directory = %dir.display(), "Directory listing interrupted: {}", e);
                        break;
                    }
                };
                let path = entry.path();
                let meta = match tokio::fs::metadata(&path).await {
                    Ok(meta) => meta,
                    Err(_) => continue,
                };
                if meta.is_dir() {
                    if depth < MAX_SCAN_DEPTH {
                        stack.push((path, depth + 1));
                    }
                } else if meta.is_file() && self.is_audio(&path) {
                    files.push(path);
                }
            }
        }
        files
    }
}

#[async_trait]
impl StreamSource for LocalFileSource {
    fn id(&self) -> &str {
        LOCAL_SOURCE_ID
    }

    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities::STREAMING
    }

    async fn load(&self) -> Result<()> {
        self.scan().await.map(|_| ())
    }

    fn can_fetch_stream(&self, resource: &TrackResource) -> bool {
        self.index
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&resource.id)
    }

    async fn fetch_stream(&self, resource: &TrackResource) -> Result<Option<TrackStreamInfo>> {
        let Some(path) = self.path_of(&resource.id) else {
            return Ok(None);
        };

        let absolute = match tokio::fs::canonicalize(&path).await {
            Ok(p) => p,
            Err(_) => {
                debug!(path = %path.display(), "Local file missing");
                return Ok(None);
            }
        };

        let uri = Url::from_file_path(&absolute).map_err(|_| {
            SourceError::Provider(format!("Cannot build file URI for {}", absolute.display()))
        })?;

        Ok(Some(TrackStreamInfo {
            uri: uri.to_string(),
            duration: 0,
            from: String::new(),
        }))
    }
}
