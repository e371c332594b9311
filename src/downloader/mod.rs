//! Core downloader implementation split into focused submodules.
//!
//! The `MediaDownloader` struct and its methods are organized by stage:
//! - [`fetch`] - Single media transfer with existence check and throttling
//! - [`reconcile`] - All-or-nothing handling of one post
//! - [`run`] - Scanning, filtering, fan-out, cleanup and persistence
//! - [`summary`] - Run report and summary table

mod fetch;
mod reconcile;
mod run;
mod summary;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

pub use summary::RunReport;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::history::{HistoryMap, HistoryStore};
use crate::platforms::Platform;
use crate::progress::{NoOpProgress, ProgressReporter};
use crate::types::RunStats;
use std::path::PathBuf;
use std::sync::Arc;

/// HTTP clients used for media requests
///
/// The proxy is a client-level setting in reqwest, so platforms that want it
/// get a second client instead of a per-request option.
#[derive(Clone)]
pub(crate) struct HttpClients {
    /// Client connecting directly
    pub(crate) direct: reqwest::Client,
    /// Client routed through `download.proxy_url`, when one is configured
    pub(crate) proxied: Option<reqwest::Client>,
}

impl HttpClients {
    fn new(config: &Config) -> Result<Self> {
        let timeout = config.download.request_timeout;
        let direct = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Other(format!("Failed to create HTTP client: {}", e)))?;

        let proxied = match &config.download.proxy_url {
            Some(proxy_url) => {
                let proxy = reqwest::Proxy::all(proxy_url).map_err(|e| {
                    Error::config(
                        "download.proxy_url",
                        format!("invalid proxy URL '{}': {}", proxy_url, e),
                    )
                })?;
                let client = reqwest::Client::builder()
                    .timeout(timeout)
                    .proxy(proxy)
                    .build()
                    .map_err(|e| {
                        Error::Other(format!("Failed to create proxied HTTP client: {}", e))
                    })?;
                Some(client)
            }
            None => None,
        };

        Ok(Self { direct, proxied })
    }

    /// Client for a request; falls back to the direct one when no proxy is configured
    pub(crate) fn client(&self, use_proxy: bool) -> &reqwest::Client {
        match (&self.proxied, use_proxy) {
            (Some(proxied), true) => proxied,
            _ => &self.direct,
        }
    }
}

/// Shared state of one run: history, counters and the cleanup queue
///
/// Post futures are polled concurrently, so everything here sits behind a
/// `tokio::sync::Mutex`. Locks are never held across an await point.
#[derive(Clone)]
pub(crate) struct RunState {
    /// Committed posts, keyed by unique id
    pub(crate) history: Arc<tokio::sync::Mutex<HistoryMap>>,
    /// Per-platform and aggregate counters
    pub(crate) stats: Arc<tokio::sync::Mutex<RunStats>>,
    /// Files to delete in the cleanup phase
    pub(crate) cleanup_queue: Arc<tokio::sync::Mutex<Vec<PathBuf>>>,
}

/// Main downloader instance (cloneable - all fields are Arc-wrapped)
#[derive(Clone)]
pub struct MediaDownloader {
    /// Configuration (wrapped in Arc for sharing across tasks)
    pub(crate) config: Arc<Config>,
    /// Enabled platform adapters, in configured order
    pub(crate) platforms: Arc<Vec<Arc<dyn Platform>>>,
    /// Direct and proxied HTTP clients
    pub(crate) http: HttpClients,
    /// Global limit on in-flight transfers (respects max_concurrent_downloads config)
    pub(crate) fetch_limit: Arc<tokio::sync::Semaphore>,
    /// Backing file of the history
    pub(crate) store: HistoryStore,
    /// History, counters and cleanup queue
    pub(crate) state: RunState,
    /// Progress observer
    pub(crate) progress: Arc<dyn ProgressReporter>,
}

impl MediaDownloader {
    /// Create a new MediaDownloader instance
    ///
    /// Validates the configuration, builds the HTTP clients and loads the
    /// history file. A missing or corrupt history starts the run empty.
    pub async fn new(config: Config, platforms: Vec<Arc<dyn Platform>>) -> Result<Self> {
        config.validate()?;
        if platforms.is_empty() {
            return Err(Error::config(
                "platforms.enabled",
                "at least one platform adapter is required",
            ));
        }

        let http = HttpClients::new(&config)?;
        let fetch_limit = Arc::new(tokio::sync::Semaphore::new(
            config.download.max_concurrent_downloads,
        ));

        let store = HistoryStore::new(&config.persistence.history_path);
        let history = store.load().await;
        let stats = RunStats::new(platforms.iter().map(|p| p.name().to_string()));

        tracing::info!(
            platforms = platforms.len(),
            max_concurrent = config.download.max_concurrent_downloads,
            proxy = http.proxied.is_some(),
            known_posts = history.len(),
            "Media downloader initialized"
        );

        Ok(Self {
            config: Arc::new(config),
            platforms: Arc::new(platforms),
            http,
            fetch_limit,
            store,
            state: RunState {
                history: Arc::new(tokio::sync::Mutex::new(history)),
                stats: Arc::new(tokio::sync::Mutex::new(stats)),
                cleanup_queue: Arc::new(tokio::sync::Mutex::new(Vec::new())),
            },
            progress: Arc::new(NoOpProgress::default()),
        })
    }

    /// Replace the progress observer (the default discards every event)
    pub fn with_progress(mut self, progress: Arc<dyn ProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    /// Configuration this downloader was built with
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Copy of the current history
    pub async fn history(&self) -> HistoryMap {
        self.state.history.lock().await.clone()
    }

    /// Copy of the counters of the current (or last) run
    pub async fn stats(&self) -> RunStats {
        self.state.stats.lock().await.clone()
    }

    /// Paths queued for deletion and not yet cleaned up
    pub async fn pending_cleanup(&self) -> Vec<PathBuf> {
        self.state.cleanup_queue.lock().await.clone()
    }

    /// Write the current history to its file
    ///
    /// The map is cloned first so the lock is not held while writing.
    pub async fn save_history(&self) -> Result<()> {
        let snapshot = self.history().await;
        self.store.save(&snapshot).await
    }
}
