//! Configuration types for social-dl

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Names of the platforms this crate ships adapters for
pub const KNOWN_PLATFORMS: &[&str] = &["instagram", "weibo"];

/// Download behavior configuration (output directory, concurrency, HTTP)
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Root directory media is written to, as `<root>/<platform>/<user>/<file>` (default: "downloads")
    #[serde(default = "default_download_root")]
    pub download_root: PathBuf,

    /// Maximum number of in-flight transfers across all posts and platforms (default: 5)
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_downloads: usize,

    /// Write buffer size in bytes used while streaming a body to disk (default: 8192)
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Per-request timeout (default: 120 seconds)
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    pub request_timeout: Duration,

    /// Proxy used by platforms that ask for one (None = always connect directly)
    #[serde(default)]
    pub proxy_url: Option<String>,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            download_root: default_download_root(),
            max_concurrent_downloads: default_max_concurrent(),
            chunk_size: default_chunk_size(),
            request_timeout: default_request_timeout(),
            proxy_url: None,
        }
    }
}

/// Where scraped post JSON files are read from
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InputConfig {
    /// Root of the scraper output; each platform reads `<root>/<platform>/json` (default: "data")
    #[serde(default = "default_input_root")]
    pub input_root: PathBuf,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            input_root: default_input_root(),
        }
    }
}

impl InputConfig {
    /// Directory holding the JSON files of one platform
    pub fn json_dir(&self, platform: &str) -> PathBuf {
        self.input_root.join(platform).join("json")
    }
}

/// Data storage settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Path of the download history file (default: "data/download_history.json")
    #[serde(default = "default_history_path")]
    pub history_path: PathBuf,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            history_path: default_history_path(),
        }
    }
}

/// What happens to the leftovers of failed posts
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CleanupConfig {
    /// Delete the source JSON file of a post whose media could not all be fetched (default: true)
    #[serde(default = "default_true")]
    pub delete_failed_inputs: bool,

    /// Also delete media that a failed post downloaded during this run (default: false)
    ///
    /// Pre-existing files are never touched. With the default, media of a failed
    /// post stay on disk so a later run can reuse them through the existence check.
    #[serde(default)]
    pub remove_orphaned_media: bool,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            delete_failed_inputs: true,
            remove_orphaned_media: false,
        }
    }
}

/// Which platform adapters take part in a run
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlatformsConfig {
    /// Enabled platform names, in the order they are scanned and reported
    #[serde(default = "default_enabled_platforms")]
    pub enabled: Vec<String>,
}

impl Default for PlatformsConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled_platforms(),
        }
    }
}

/// Main configuration for [`MediaDownloader`](crate::MediaDownloader)
///
/// Fields are organized into logical sub-configs:
/// - [`download`](DownloadConfig) — output directory, concurrency, HTTP settings
/// - [`input`](InputConfig) — scraper output location
/// - [`persistence`](PersistenceConfig) — history file
/// - [`cleanup`](CleanupConfig) — handling of failed posts
/// - [`platforms`](PlatformsConfig) — enabled adapters
///
/// Every field has a default, so an empty JSON object is a valid config file.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Download behavior settings
    #[serde(default)]
    pub download: DownloadConfig,

    /// Input discovery settings
    #[serde(default)]
    pub input: InputConfig,

    /// History storage
    #[serde(default)]
    pub persistence: PersistenceConfig,

    /// Failed-post cleanup
    #[serde(default)]
    pub cleanup: CleanupConfig,

    /// Enabled platforms
    #[serde(default)]
    pub platforms: PlatformsConfig,
}

impl Config {
    /// Load a configuration from a JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to read config file '{}': {}", path.display(), e),
            ))
        })?;
        let config: Config = serde_json::from_str(&content).map_err(|e| Error::Config {
            message: format!("invalid config file '{}': {}", path.display(), e),
            key: None,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the configuration can drive a run
    pub fn validate(&self) -> Result<()> {
        if self.download.max_concurrent_downloads == 0 {
            return Err(Error::config(
                "download.max_concurrent_downloads",
                "max_concurrent_downloads must be at least 1",
            ));
        }
        if self.download.chunk_size == 0 {
            return Err(Error::config(
                "download.chunk_size",
                "chunk_size must be at least 1 byte",
            ));
        }
        if let Some(proxy) = &self.download.proxy_url
            && let Err(e) = url::Url::parse(proxy)
        {
            return Err(Error::config(
                "download.proxy_url",
                format!("invalid proxy URL '{}': {}", proxy, e),
            ));
        }
        if self.platforms.enabled.is_empty() {
            return Err(Error::config(
                "platforms.enabled",
                "at least one platform must be enabled",
            ));
        }
        for name in &self.platforms.enabled {
            if !KNOWN_PLATFORMS.contains(&name.as_str()) {
                return Err(Error::config(
                    "platforms.enabled",
                    format!(
                        "unknown platform '{}' (known: {})",
                        name,
                        KNOWN_PLATFORMS.join(", ")
                    ),
                ));
            }
        }
        Ok(())
    }
}

fn default_download_root() -> PathBuf {
    PathBuf::from("downloads")
}

fn default_input_root() -> PathBuf {
    PathBuf::from("data")
}

fn default_history_path() -> PathBuf {
    PathBuf::from("data").join("download_history.json")
}

fn default_max_concurrent() -> usize {
    5
}

fn default_chunk_size() -> usize {
    8192
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(120)
}

fn default_true() -> bool {
    true
}

fn default_enabled_platforms() -> Vec<String> {
    KNOWN_PLATFORMS.iter().map(|s| s.to_string()).collect()
}

// Duration serialization helper (whole seconds)
pub(crate) mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
