//! Platform adapters
//!
//! Each supported site implements [`Platform`]: it lists the JSON files the
//! scraper left behind, turns one file into a normalized [`PostItem`], and
//! says which headers and whether a proxy its media CDN needs.
//!
//! Implementations:
//!
//! - [`InstagramPlatform`]: post objects from the Instagram web API
//! - [`WeiboPlatform`]: status objects from the Weibo web API

mod instagram;
mod weibo;

pub use instagram::InstagramPlatform;
pub use weibo::WeiboPlatform;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::types::{PostItem, unique_id};
use async_trait::async_trait;
use reqwest::header::HeaderMap;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Browser user agent sent with media requests
pub(crate) const DESKTOP_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/139.0.0.0 Safari/537.36";

/// Capabilities every platform adapter provides
#[async_trait]
pub trait Platform: Send + Sync {
    /// Short lowercase name, used in unique ids, stats and download paths
    fn name(&self) -> &str;

    /// Directory scanned for input files
    fn json_dir(&self) -> &Path;

    /// Whether media requests should go through the configured proxy
    fn use_proxy(&self) -> bool {
        true
    }

    /// Static request headers for media downloads
    fn headers(&self) -> HeaderMap;

    /// Request headers for the media of one post
    fn headers_for(&self, _post: &PostItem) -> HeaderMap {
        self.headers()
    }

    /// List candidate input files
    async fn scan_files(&self) -> Vec<PathBuf> {
        scan_json_files(self.json_dir()).await
    }

    /// Unique id of the post stored in `path`, derived from the file name alone
    ///
    /// Scrapers store each post as `<post_id>.json`, so this lets known posts be
    /// skipped without reading the file.
    fn unique_id_hint(&self, path: &Path) -> Option<String> {
        let stem = path.file_stem()?.to_str()?;
        if stem.is_empty() {
            return None;
        }
        Some(unique_id(self.name(), stem))
    }

    /// Turn a decoded input document into a post
    ///
    /// Returns `None` for documents that are not downloadable posts (profile
    /// dumps, reposts, posts without media).
    fn parse_value(&self, path: &Path, value: &Value) -> Option<PostItem>;

    /// Read and parse one input file
    ///
    /// Fails with [`Error::InvalidPost`] when the file is readable JSON but not
    /// a downloadable post.
    async fn read_post(&self, path: &Path) -> Result<PostItem> {
        let value = read_json(path).await?;
        self.parse_value(path, &value)
            .ok_or_else(|| Error::InvalidPost {
                path: path.to_path_buf(),
                reason: format!("not a downloadable {} post", self.name()),
            })
    }

    /// Like [`read_post`](Platform::read_post), with every failure logged and mapped to `None`
    async fn parse_file(&self, path: &Path) -> Option<PostItem> {
        match self.read_post(path).await {
            Ok(post) => Some(post),
            Err(e) => {
                tracing::debug!(platform = self.name(), error = %e, "Skipping input file");
                None
            }
        }
    }
}

/// Build the adapters enabled in the configuration, in configured order
pub fn build_platforms(config: &Config) -> Result<Vec<Arc<dyn Platform>>> {
    config
        .platforms
        .enabled
        .iter()
        .map(|name| -> Result<Arc<dyn Platform>> {
            let json_dir = config.input.json_dir(name);
            match name.as_str() {
                "instagram" => Ok(Arc::new(InstagramPlatform::new(json_dir))),
                "weibo" => Ok(Arc::new(WeiboPlatform::new(json_dir))),
                other => Err(Error::config(
                    "platforms.enabled",
                    format!("unknown platform '{}'", other),
                )),
            }
        })
        .collect()
}

/// Recursively list `*.json` files below `dir`, sorted by path
///
/// A missing directory is logged and yields an empty list.
pub async fn scan_json_files(dir: &Path) -> Vec<PathBuf> {
    if !tokio::fs::try_exists(dir).await.unwrap_or(false) {
        tracing::warn!(dir = %dir.display(), "Input directory does not exist");
        return Vec::new();
    }

    let root = dir.to_path_buf();
    let walked = tokio::task::spawn_blocking(move || {
        let mut files: Vec<PathBuf> = walkdir::WalkDir::new(&root)
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping unreadable directory entry");
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
            .collect();
        files.sort();
        files
    })
    .await;

    match walked {
        Ok(files) => files,
        Err(e) => {
            tracing::error!(dir = %dir.display(), error = %e, "Input scan task failed");
            Vec::new()
        }
    }
}

async fn read_json(path: &Path) -> Result<Value> {
    let content = tokio::fs::read(path).await?;
    Ok(serde_json::from_slice(&content)?)
}

/// Name of the directory containing `path`, used as the author name by scrapers
/// that store posts as `<user>/<post_id>.json`
pub(crate) fn parent_dir_name(path: &Path) -> Option<String> {
    path.parent()?
        .file_name()?
        .to_str()
        .map(|s| s.to_string())
}

pub(crate) fn str_field<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(Value::as_str)
}

pub(crate) fn u32_field(value: &Value, key: &str) -> u32 {
    value
        .get(key)
        .and_then(Value::as_u64)
        .and_then(|v| u32::try_from(v).ok())
        .unwrap_or(0)
}
