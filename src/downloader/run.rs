//! Run orchestration: scan, filter, reconcile, clean up, persist.

use crate::error::{Error, Result};
use crate::platforms::Platform;
use crate::types::{PostItem, PostOutcome, RunPhase, RunStats};
use futures::StreamExt;
use futures::stream::FuturesUnordered;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

use super::{MediaDownloader, RunReport};

impl MediaDownloader {
    /// Run one full pass over every enabled platform
    ///
    /// Counters and the cleanup queue are reset at the start, so the returned
    /// report covers this pass only. Individual failures never abort the run;
    /// a failed history save is logged and reflected in the report.
    pub async fn run(&self) -> RunReport {
        let started = Instant::now();
        self.reset_run_state().await;

        self.enter_phase(RunPhase::Scanning);
        let mut scanned = Vec::with_capacity(self.platforms.len());
        for platform in self.platforms.iter() {
            let files = platform.scan_files().await;
            tracing::info!(platform = platform.name(), files = files.len(), "Scanned input files");
            scanned.push((Arc::clone(platform), files));
        }

        self.enter_phase(RunPhase::Filtering);
        let mut pending = Vec::new();
        let mut queued = HashSet::new();
        for (platform, files) in scanned {
            pending.extend(self.filter_pending(&platform, files, &mut queued).await);
        }
        tracing::info!(pending = pending.len(), "Posts to reconcile");

        self.enter_phase(RunPhase::Downloading);
        self.progress.posts_started(pending.len());
        let mut posts: FuturesUnordered<_> = pending
            .into_iter()
            .map(|(platform, post)| async move { self.reconcile(platform.as_ref(), post).await })
            .collect();
        let (mut committed, mut failed) = (0usize, 0usize);
        while let Some(outcome) = posts.next().await {
            match outcome {
                PostOutcome::Committed => committed += 1,
                PostOutcome::Failed => failed += 1,
                PostOutcome::Skipped => {}
            }
            self.progress.post_finished();
        }
        tracing::info!(committed, failed, "Reconciliation finished");

        self.enter_phase(RunPhase::Cleanup);
        let cleaned_files = self.cleanup().await;

        self.enter_phase(RunPhase::Persisting);
        let history_saved = match self.save_history().await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(error = %e, path = %self.store.path().display(), "Failed to save download history");
                false
            }
        };

        self.enter_phase(RunPhase::Done);
        RunReport {
            stats: self.stats().await,
            elapsed: started.elapsed(),
            cleaned_files,
            history_saved,
        }
    }

    /// Run until the pass finishes or `token` is cancelled
    ///
    /// On cancellation the in-flight transfers are dropped, the history
    /// committed so far is saved (best effort) and [`Error::Interrupted`] is
    /// returned, telling whether that save succeeded. Partially written files only exist under their `.part` name,
    /// so the next run starts them over.
    pub async fn run_until_cancelled(&self, token: CancellationToken) -> Result<RunReport> {
        tokio::select! {
            report = self.run() => Ok(report),
            _ = token.cancelled() => {
                tracing::warn!("Run interrupted, saving download history");
                let history_saved = match self.save_history().await {
                    Ok(()) => {
                        tracing::info!(path = %self.store.path().display(), "Download history saved");
                        true
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to save download history after interruption");
                        false
                    }
                };
                Err(Error::Interrupted { history_saved })
            }
        }
    }

    async fn reset_run_state(&self) {
        *self.state.stats.lock().await =
            RunStats::new(self.platforms.iter().map(|p| p.name().to_string()));
        self.state.cleanup_queue.lock().await.clear();
    }

    fn enter_phase(&self, phase: RunPhase) {
        tracing::debug!(%phase, "Entering run phase");
        self.progress.phase_changed(phase);
    }

    /// Drop files whose post is already known, parse the rest
    ///
    /// The known-id check uses the file name only, so known posts cost no read.
    /// Files that do not parse into a post are left out silently. A post whose
    /// unique id is already in `queued` (the same post stored twice) is counted
    /// as skipped, so each post is reconciled at most once per run.
    async fn filter_pending(
        &self,
        platform: &Arc<dyn Platform>,
        files: Vec<PathBuf>,
        queued: &mut HashSet<String>,
    ) -> Vec<(Arc<dyn Platform>, PostItem)> {
        let (known, candidates): (Vec<PathBuf>, Vec<PathBuf>) = {
            let history = self.state.history.lock().await;
            files.into_iter().partition(|path| {
                platform
                    .unique_id_hint(path)
                    .is_some_and(|id| history.contains_key(&id))
            })
        };
        if !known.is_empty() {
            let skipped = known.len() as u64;
            self.state
                .stats
                .lock()
                .await
                .update(platform.name(), |s| s.skip_post += skipped);
        }

        let mut pending = Vec::with_capacity(candidates.len());
        let mut duplicates = 0u64;
        for path in candidates {
            let Some(post) = platform.parse_file(&path).await else {
                continue;
            };
            if !queued.insert(post.unique_id()) {
                tracing::debug!(
                    unique_id = %post.unique_id(),
                    path = %path.display(),
                    "Post already queued from another input file"
                );
                duplicates += 1;
                continue;
            }
            pending.push((Arc::clone(platform), post));
        }
        if duplicates > 0 {
            self.state
                .stats
                .lock()
                .await
                .update(platform.name(), |s| s.skip_post += duplicates);
        }
        tracing::debug!(
            platform = platform.name(),
            known = known.len(),
            duplicates,
            pending = pending.len(),
            "Filtered input files"
        );
        pending
    }

    /// Delete every queued path; returns how many were removed
    async fn cleanup(&self) -> usize {
        let queued: Vec<PathBuf> = std::mem::take(&mut *self.state.cleanup_queue.lock().await);
        let mut removed = 0;
        for path in queued {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => {
                    removed += 1;
                    tracing::info!(path = %path.display(), "Removed file of failed post");
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    tracing::debug!(path = %path.display(), "File of failed post already gone");
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Failed to remove file of failed post");
                }
            }
        }
        removed
    }
}
