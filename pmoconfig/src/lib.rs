//! # PMOResolver Configuration Module
//!
//! This module provides configuration management for PMOResolver, including:
//! - Loading configuration from YAML files
//! - Merging with embedded default configuration
//! - Environment variable overrides
//! - Type-safe getters and setters for configuration values
//!
//! Unlike a process-wide singleton, a [`Config`] is built once at startup and
//! handed to whatever needs it (source bootstrap, logging, HTTP surface).
//!
//! ## Usage
//!
//! ```no_run
//! use pmoconfig::Config;
//!
//! let config = Config::load_config("")?;
//!
//! let port = config.get_http_port()?;
//! let dirs = config.get_local_directories()?;
//!
//! config.set_http_port(9000)?;
//! # Ok::<(), anyhow::Error>(())
//! ```

use anyhow::{Result, anyhow};
use dirs::home_dir;
use serde_yaml::{Mapping, Number, Value};
use std::{
    env, fs,
    path::Path,
    sync::{Mutex, MutexGuard},
    time::Duration,
};
use tracing::info;

// Configuration par défaut intégrée
const DEFAULT_CONFIG: &str = include_str!("pmoresolver.yaml");

const ENV_CONFIG_DIR: &str = "PMORESOLVER_CONFIG";
const ENV_PREFIX: &str = "PMORESOLVER_CONFIG__";
const DEFAULT_CONFIG_DIR: &str = ".pmoresolver";

// Default values for configuration
const DEFAULT_HTTP_PORT: u16 = 8090;
const DEFAULT_LOG_MIN_LEVEL: &str = "INFO";
const DEFAULT_HTTP_TIMEOUT_SECS: usize = 30;
const DEFAULT_USER_AGENT: &str = "pmoresolver/0.1";
const DEFAULT_YOUTUBE_MAX_ATTEMPTS: usize = 10;
const DEFAULT_YOUTUBE_RETRY_DELAY_MS: usize = 0;
const DEFAULT_SPOTIFY_API_BASE: &str = "https://api.spotify.com/v1";
const DEFAULT_SPOTIFY_ACCOUNTS_BASE: &str = "https://accounts.spotify.com";
const DEFAULT_SPOTIFY_WEB_DOMAIN: &str = "open.spotify.com";
const DEFAULT_YOUTUBE_API_BASE: &str = "https://inv.nadeko.net";

/// Macro to generate getter/setter for usize values with default
macro_rules! impl_usize_config {
    ($getter:ident, $setter:ident, $path:expr, $default:expr) => {
        pub fn $getter(&self) -> Result<usize> {
            match self.get_value($path) {
                Ok(Value::Number(n)) => Ok(n
                    .as_u64()
                    .map(|v| v as usize)
                    .unwrap_or($default)),
                _ => Ok($default),
            }
        }

        pub fn $setter(&self, size: usize) -> Result<()> {
            let n = Number::from(size);
            self.set_value($path, Value::Number(n))
        }
    };
}

/// Macro to generate getter/setter for bool values with default
macro_rules! impl_bool_config {
    ($getter:ident, $setter:ident, $path:expr, $default:expr) => {
        pub fn $getter(&self) -> Result<bool> {
            match self.get_value($path) {
                Ok(Value::Bool(b)) => Ok(b),
                _ => Ok($default),
            }
        }

        pub fn $setter(&self, value: bool) -> Result<()> {
            self.set_value($path, Value::Bool(value))
        }
    };
}

/// Macro to generate getter/setter for string values with default
macro_rules! impl_string_config {
    ($getter:ident, $setter:ident, $path:expr, $default:expr) => {
        pub fn $getter(&self) -> Result<String> {
            match self.get_value($path) {
                Ok(Value::String(s)) if !s.is_empty() => Ok(s),
                _ => Ok($default.to_string()),
            }
        }

        pub fn $setter(&self, value: &str) -> Result<()> {
            self.set_value($path, Value::String(value.to_string()))
        }
    };
}

/// Configuration manager for PMOResolver
///
/// Holds a YAML tree behind a mutex. A configuration loaded from disk is
/// written back on every `set_value`; one built with [`Config::from_yaml_str`]
/// lives in memory only.
#[derive(Debug)]
pub struct Config {
    config_dir: Option<String>,
    path: Option<String>,
    data: Mutex<Value>,
}

impl Clone for Config {
    fn clone(&self) -> Self {
        let data = match self.data.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };
        Self {
            config_dir: self.config_dir.clone(),
            path: self.path.clone(),
            data: Mutex::new(data),
        }
    }
}

impl Config {
    /// Finds a config directory by trying different locations in order
    fn find_config_dir(directory: &str) -> String {
        // 1. Try provided directory
        if !directory.is_empty() {
            return directory.to_string();
        }

        // 2. Try environment variable
        if let Ok(env_path) = env::var(ENV_CONFIG_DIR) {
            info!(env_var=ENV_CONFIG_DIR, path=%env_path, "Trying to load config from env");
            return env_path;
        }

        // 3. Try current directory
        if Path::new(DEFAULT_CONFIG_DIR).exists() {
            return DEFAULT_CONFIG_DIR.to_string();
        }

        // 4. Try home directory
        if let Some(home) = home_dir() {
            let home_config = home.join(DEFAULT_CONFIG_DIR);
            if home_config.exists() {
                return home_config.to_string_lossy().to_string();
            }
        }

        DEFAULT_CONFIG_DIR.to_string()
    }

    /// Validates and prepares a config directory
    fn validate_config_dir(path: &Path) -> Result<()> {
        if !path.exists() {
            fs::create_dir_all(path)?;
        }

        if !path.is_dir() {
            return Err(anyhow!("{} is not a directory", path.display()));
        }

        fs::read_dir(path)?;
        Ok(())
    }

    /// Loads the configuration from the specified directory
    ///
    /// 1. Determines the configuration directory (argument, `PMORESOLVER_CONFIG`,
    ///    `./.pmoresolver`, `~/.pmoresolver`)
    /// 2. Loads the default embedded configuration
    /// 3. Merges it with the external config.yaml file if present
    /// 4. Applies environment variable overrides
    /// 5. Saves the merged configuration
    pub fn load_config(directory: &str) -> Result<Self> {
        let config_dir = Self::find_config_dir(directory);
        Self::validate_config_dir(Path::new(&config_dir))?;
        info!(config_dir=%config_dir, "Using config directory");

        let config_file_path = Path::new(&config_dir).join("config.yaml");
        let path = config_file_path.to_string_lossy().to_string();

        let external = match fs::read_to_string(&path) {
            Ok(data) => {
                info!(config_file=%path, "Loaded config file");
                Some(data)
            }
            Err(_) => {
                info!(config_file=%path, "Config file not found, using default embedded config");
                None
            }
        };

        let config_value = Self::build_value(external.as_deref())?;

        let config = Config {
            config_dir: Some(config_dir),
            path: Some(path),
            data: Mutex::new(config_value),
        };

        config.save()?;
        Ok(config)
    }

    /// Builds an in-memory configuration from a YAML document merged over the defaults
    ///
    /// Environment overrides are applied as well. Nothing is ever written to disk.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(Config {
            config_dir: None,
            path: None,
            data: Mutex::new(Self::build_value(Some(yaml))?),
        })
    }

    fn build_value(external: Option<&str>) -> Result<Value> {
        let mut default_value: Value = serde_yaml::from_str(DEFAULT_CONFIG)?;
        if let Some(yaml) = external {
            let external_value: Value = serde_yaml::from_str(yaml)?;
            // Un document vide se désérialise en Null
            if !external_value.is_null() {
                merge_yaml(&mut default_value, &Self::lower_keys_value(external_value));
            }
        }
        let mut config_value = Self::lower_keys_value(default_value);
        Self::apply_env_overrides(&mut config_value);
        Ok(config_value)
    }

    /// Directory the configuration was loaded from, if any
    pub fn directory(&self) -> Option<&str> {
        self.config_dir.as_deref()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Value>> {
        self.data
            .lock()
            .map_err(|_| anyhow!("Configuration lock poisoned"))
    }

    /// Saves the current configuration to the config.yaml file
    ///
    /// Does nothing for an in-memory configuration.
    pub fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let yaml = serde_yaml::to_string(&*self.lock()?)?;
        fs::write(path, yaml)?;
        Ok(())
    }

    /// Sets a configuration value at the specified path and saves it
    ///
    /// # Arguments
    ///
    /// * `path` - Array of keys representing the path (e.g., `&["host", "http_port"]`)
    /// * `value` - The YAML value to set
    pub fn set_value(&self, path: &[&str], value: Value) -> Result<()> {
        {
            let mut data = self.lock()?;
            Self::set_value_internal(&mut data, path, value)?;
        }
        self.save()
    }

    fn set_value_internal(data: &mut Value, path: &[&str], value: Value) -> Result<()> {
        if path.is_empty() {
            *data = value;
            return Ok(());
        }
        if let Value::Mapping(map) = data {
            let key_value = Value::String(path[0].to_lowercase());
            if path.len() == 1 {
                map.insert(key_value, value);
            } else {
                let entry = map
                    .entry(key_value)
                    .or_insert(Value::Mapping(Mapping::new()));
                Self::set_value_internal(entry, &path[1..], value)?;
            }
            Ok(())
        } else {
            Err(anyhow!("Current node is not a map"))
        }
    }

    /// Gets a configuration value at the specified path
    ///
    /// Returns an error if the path doesn't exist.
    pub fn get_value(&self, path: &[&str]) -> Result<Value> {
        let data = self.lock()?;
        Self::get_value_internal(&data, path)
    }

    fn get_value_internal(data: &Value, path: &[&str]) -> Result<Value> {
        let mut current = data;
        for (i, key) in path.iter().enumerate() {
            if let Value::Mapping(map) = current {
                match map.get(&Value::String(key.to_lowercase())) {
                    Some(next) => current = next,
                    None => {
                        return Err(anyhow!("Path {} does not exist", path[..=i].join(".")));
                    }
                }
            } else {
                return Err(anyhow!("Path {} is not a mapping", path[..i].join(".")));
            }
        }
        Ok(current.clone())
    }

    fn apply_env_overrides(config: &mut Value) {
        for (key, value) in env::vars() {
            if let Some(stripped) = key.strip_prefix(ENV_PREFIX) {
                let key_path = stripped.split("__").collect::<Vec<_>>();
                let yaml_value = Self::convert_env_value(&value);
                let _ = Self::set_value_internal(config, &key_path, yaml_value);
            }
        }
    }

    fn convert_env_value(value: &str) -> Value {
        if let Ok(parsed) = serde_yaml::from_str::<Value>(value) {
            return parsed;
        }
        Value::String(value.to_string())
    }

    fn lower_keys_value(value: Value) -> Value {
        match value {
            Value::Mapping(map) => {
                let mut new_map = Mapping::new();
                for (k, v) in map {
                    let new_key = match k {
                        Value::String(s) => Value::String(s.to_lowercase()),
                        other => other,
                    };
                    new_map.insert(new_key, Self::lower_keys_value(v));
                }
                Value::Mapping(new_map)
            }
            Value::Sequence(seq) => {
                Value::Sequence(seq.into_iter().map(Self::lower_keys_value).collect())
            }
            _ => value,
        }
    }

    fn get_string_list(&self, path: &[&str]) -> Result<Vec<String>> {
        match self.get_value(path) {
            Ok(Value::Sequence(seq)) => Ok(seq
                .into_iter()
                .filter_map(|v| match v {
                    Value::String(s) => Some(s),
                    _ => None,
                })
                .collect()),
            _ => Ok(Vec::new()),
        }
    }

    // ============ Host ============

    /// Port of the RPC HTTP surface
    pub fn get_http_port(&self) -> Result<u16> {
        match self.get_value(&["host", "http_port"]) {
            Ok(Value::Number(n)) => Ok(n
                .as_u64()
                .and_then(|p| u16::try_from(p).ok())
                .unwrap_or(DEFAULT_HTTP_PORT)),
            _ => Ok(DEFAULT_HTTP_PORT),
        }
    }

    pub fn set_http_port(&self, port: u16) -> Result<()> {
        self.set_value(&["host", "http_port"], Value::Number(Number::from(port)))
    }

    impl_string_config!(
        get_log_min_level,
        set_log_min_level,
        &["host", "logger", "min_level"],
        DEFAULT_LOG_MIN_LEVEL
    );

    // ============ HTTP client ============

    impl_usize_config!(
        get_http_timeout_secs,
        set_http_timeout_secs,
        &["http", "timeout_secs"],
        DEFAULT_HTTP_TIMEOUT_SECS
    );

    impl_string_config!(
        get_http_user_agent,
        set_http_user_agent,
        &["http", "user_agent"],
        DEFAULT_USER_AGENT
    );

    /// Timeout applied to every outgoing HTTP request
    pub fn get_http_timeout(&self) -> Result<Duration> {
        Ok(Duration::from_secs(self.get_http_timeout_secs()? as u64))
    }

    // ============ Local files ============

    impl_bool_config!(
        get_local_enabled,
        set_local_enabled,
        &["sources", "local", "enabled"],
        true
    );

    /// Directories scanned by the local file source
    pub fn get_local_directories(&self) -> Result<Vec<String>> {
        self.get_string_list(&["sources", "local", "directories"])
    }

    /// File extensions (lower case, without dot) indexed by the local file source
    pub fn get_local_extensions(&self) -> Result<Vec<String>> {
        Ok(self
            .get_string_list(&["sources", "local", "extensions"])?
            .into_iter()
            .map(|e| e.trim_start_matches('.').to_lowercase())
            .collect())
    }

    // ============ Spotify ============

    impl_bool_config!(
        get_spotify_enabled,
        set_spotify_enabled,
        &["sources", "spotify", "enabled"],
        false
    );

    impl_string_config!(
        get_spotify_api_base,
        set_spotify_api_base,
        &["sources", "spotify", "api_base"],
        DEFAULT_SPOTIFY_API_BASE
    );

    impl_string_config!(
        get_spotify_accounts_base,
        set_spotify_accounts_base,
        &["sources", "spotify", "accounts_base"],
        DEFAULT_SPOTIFY_ACCOUNTS_BASE
    );

    impl_string_config!(
        get_spotify_web_domain,
        set_spotify_web_domain,
        &["sources", "spotify", "web_domain"],
        DEFAULT_SPOTIFY_WEB_DOMAIN
    );

    /// Client credentials of the catalog application, `(client_id, client_secret)`
    ///
    /// Both must be non-empty.
    pub fn get_spotify_credentials(&self) -> Result<(String, String)> {
        let read = |key: &str| -> Result<String> {
            match self.get_value(&["sources", "spotify", key]) {
                Ok(Value::String(s)) if !s.is_empty() => Ok(s),
                _ => Err(anyhow!("sources.spotify.{} is not configured", key)),
            }
        };
        Ok((read("client_id")?, read("client_secret")?))
    }

    // ============ YouTube ============

    impl_bool_config!(
        get_youtube_enabled,
        set_youtube_enabled,
        &["sources", "youtube", "enabled"],
        true
    );

    impl_string_config!(
        get_youtube_api_base,
        set_youtube_api_base,
        &["sources", "youtube", "api_base"],
        DEFAULT_YOUTUBE_API_BASE
    );

    impl_usize_config!(
        get_youtube_max_attempts,
        set_youtube_max_attempts,
        &["sources", "youtube", "max_attempts"],
        DEFAULT_YOUTUBE_MAX_ATTEMPTS
    );

    impl_usize_config!(
        get_youtube_retry_delay_ms,
        set_youtube_retry_delay_ms,
        &["sources", "youtube", "retry_delay_ms"],
        DEFAULT_YOUTUBE_RETRY_DELAY_MS
    );
}

/// Merges external YAML configuration into default configuration
///
/// Mappings are merged key by key; scalars and sequences from `external`
/// replace the default value.
fn merge_yaml(default: &mut Value, external: &Value) {
    match (default, external) {
        (Value::Mapping(dmap), Value::Mapping(emap)) => {
            for (k, v) in emap {
                match dmap.get_mut(k) {
                    Some(dv) => merge_yaml(dv, v),
                    None => {
                        dmap.insert(k.clone(), v.clone());
                    }
                }
            }
        }
        (d, e) => *d = e.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::from_yaml_str("").unwrap();
        assert_eq!(config.get_http_port().unwrap(), 8090);
        assert_eq!(config.get_youtube_max_attempts().unwrap(), 10);
        assert_eq!(config.get_youtube_retry_delay_ms().unwrap(), 0);
        assert_eq!(config.get_spotify_web_domain().unwrap(), "open.spotify.com");
        assert!(!config.get_spotify_enabled().unwrap());
        assert!(config.get_local_directories().unwrap().is_empty());
        assert!(config.get_local_extensions().unwrap().contains(&"flac".to_string()));
    }

    #[test]
    fn test_merge_overrides_defaults() {
        let yaml = r#"
host:
  HTTP_PORT: 9999
sources:
  local:
    directories: ["/music", "/more"]
  youtube:
    max_attempts: 3
"#;
        let config = Config::from_yaml_str(yaml).unwrap();
        assert_eq!(config.get_http_port().unwrap(), 9999);
        assert_eq!(
            config.get_local_directories().unwrap(),
            vec!["/music".to_string(), "/more".to_string()]
        );
        assert_eq!(config.get_youtube_max_attempts().unwrap(), 3);
        // Les clés non surchargées gardent leur valeur par défaut
        assert_eq!(config.get_log_min_level().unwrap(), "INFO");
    }

    #[test]
    fn test_spotify_credentials_required() {
        let config = Config::from_yaml_str("").unwrap();
        assert!(config.get_spotify_credentials().is_err());

        config.set_value(&["sources", "spotify", "client_id"], Value::String("id".into())).unwrap();
        config
            .set_value(&["sources", "spotify", "client_secret"], Value::String("secret".into()))
            .unwrap();
        assert_eq!(
            config.get_spotify_credentials().unwrap(),
            ("id".to_string(), "secret".to_string())
        );
    }

    #[test]
    fn test_get_value_missing_path() {
        let config = Config::from_yaml_str("").unwrap();
        assert!(config.get_value(&["nope", "missing"]).is_err());
    }

    #[test]
    fn test_load_config_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let dir_str = dir.path().to_string_lossy().to_string();

        let config = Config::load_config(&dir_str).unwrap();
        config.set_http_port(7000).unwrap();

        let reloaded = Config::load_config(&dir_str).unwrap();
        assert_eq!(reloaded.get_http_port().unwrap(), 7000);
        assert!(dir.path().join("config.yaml").exists());
    }
}
