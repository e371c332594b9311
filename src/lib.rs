//! # social-dl
//!
//! Concurrent media downloader for scraped social-media posts.
//!
//! ## Design Philosophy
//!
//! social-dl is designed to be:
//! - **Idempotent** - A post is recorded only once all of its media are on disk,
//!   and recorded posts are never fetched again
//! - **Resumable** - Files already on disk are reused without a request
//! - **Bounded** - One global semaphore caps in-flight transfers across all
//!   posts and platforms
//! - **Observer-driven** - Progress goes to a pluggable [`ProgressReporter`]
//!
//! A run scans each platform's scraper output (`<input_root>/<platform>/json`),
//! skips posts already in the history file, downloads the media of the rest
//! to `<download_root>/<platform>/<user>/`, deletes the input files of posts
//! that could not be completed and saves the history.
//!
//! ## Quick Start
//!
//! ```no_run
//! use social_dl::{Config, MediaDownloader, build_platforms};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default();
//!     let platforms = build_platforms(&config)?;
//!     let downloader = MediaDownloader::new(config, platforms).await?;
//!
//!     let report = downloader.run().await;
//!     println!("{}", report);
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Configuration types
pub mod config;
/// Downloader implementation (fetch, reconcile, run)
pub mod downloader;
/// Error types
pub mod error;
/// Persistent download history
pub mod history;
/// Platform adapters
pub mod platforms;
/// Progress observers
pub mod progress;
/// Core types
pub mod types;
/// Utility functions
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use downloader::{MediaDownloader, RunReport};
pub use error::{Error, Result};
pub use history::{HistoryMap, HistoryStore};
pub use platforms::{InstagramPlatform, Platform, WeiboPlatform, build_platforms};
pub use progress::{LogProgress, NoOpProgress, ProgressReporter, TaskId, TerminalProgress};
pub use types::{
    FetchOutcome, FileType, HistoryRecord, MediaItem, MediaSnapshot, PostItem, PostOutcome,
    PostStats, RunPhase, RunStats,
};

/// Helper function to run the downloader with graceful signal handling.
///
/// Runs one pass and stops early when a termination signal arrives. On
/// interruption the history committed so far is saved and
/// [`Error::Interrupted`] is returned.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use social_dl::{Config, MediaDownloader, build_platforms, run_with_shutdown};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = Config::default();
///     let platforms = build_platforms(&config)?;
///     let downloader = MediaDownloader::new(config, platforms).await?;
///
///     // Run with automatic signal handling
///     let report = run_with_shutdown(&downloader).await?;
///     println!("{}", report);
///
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(downloader: &MediaDownloader) -> Result<RunReport> {
    let token = tokio_util::sync::CancellationToken::new();
    let signal_token = token.clone();
    let watcher = tokio::spawn(async move {
        wait_for_signal().await;
        signal_token.cancel();
    });

    let result = downloader.run_until_cancelled(token).await;
    watcher.abort();
    result
}

/// Resolves once the process is asked to stop
#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Registration can fail in sandboxes; a missing stream never resolves
    let mut terminate = signal(SignalKind::terminate())
        .inspect_err(|e| tracing::warn!(error = %e, "SIGTERM unavailable, stop with Ctrl+C"))
        .ok();
    let mut interrupt = signal(SignalKind::interrupt())
        .inspect_err(|e| tracing::warn!(error = %e, "SIGINT unavailable, stop with SIGTERM"))
        .ok();

    if terminate.is_none() && interrupt.is_none() {
        tracing::warn!("No signal streams registered, falling back to ctrl_c");
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Cannot listen for Ctrl+C, run will not stop early");
            std::future::pending::<()>().await;
        }
        tracing::info!("Stop requested (Ctrl+C)");
        return;
    }

    tokio::select! {
        Some(()) = recv_or_pending(terminate.as_mut()) => tracing::info!("Stop requested (SIGTERM)"),
        Some(()) = recv_or_pending(interrupt.as_mut()) => tracing::info!("Stop requested (SIGINT)"),
        else => std::future::pending::<()>().await,
    }
}

#[cfg(unix)]
async fn recv_or_pending(stream: Option<&mut tokio::signal::unix::Signal>) -> Option<()> {
    match stream {
        Some(stream) => stream.recv().await,
        None => std::future::pending().await,
    }
}

/// Resolves once the process is asked to stop
#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Stop requested (Ctrl+C)"),
        Err(e) => {
            tracing::error!(error = %e, "Cannot listen for Ctrl+C, run will not stop early");
            std::future::pending::<()>().await;
        }
    }
}
