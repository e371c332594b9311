//! Progress reporting.
//!
//! The engine pushes progress events to a [`ProgressReporter`] and never
//! renders anything itself. Three implementations are provided:
//!
//! - [`TerminalProgress`]: interactive bars (one per transfer plus an overall bar)
//! - [`LogProgress`]: `tracing` log lines, for non-interactive runs
//! - [`NoOpProgress`]: discards everything

use crate::types::RunPhase;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Identifier of one progress task (one media transfer)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TaskId(pub u64);

/// Observer of run and transfer progress
///
/// Every task returned by [`add_task`](ProgressReporter::add_task) is later
/// passed to [`remove_task`](ProgressReporter::remove_task) exactly once,
/// whether the transfer succeeded, failed or was cancelled.
pub trait ProgressReporter: Send + Sync {
    /// The run entered a new phase
    fn phase_changed(&self, _phase: RunPhase) {}

    /// Reconciliation of `total` posts is about to start
    fn posts_started(&self, _total: usize) {}

    /// One post finished reconciling, whatever its outcome
    fn post_finished(&self) {}

    /// A transfer started; `label` is `<user>/<filename>`
    fn add_task(&self, label: &str) -> TaskId;

    /// The expected size of a transfer became known
    fn set_total(&self, _task: TaskId, _total: Option<u64>) {}

    /// `bytes` more bytes of a transfer were written
    fn advance(&self, task: TaskId, bytes: u64);

    /// A transfer ended
    fn remove_task(&self, task: TaskId);
}

/// Removes its task from the reporter when dropped
pub(crate) struct ProgressTask<'a> {
    reporter: &'a dyn ProgressReporter,
    id: TaskId,
}

impl<'a> ProgressTask<'a> {
    pub(crate) fn start(reporter: &'a dyn ProgressReporter, label: &str) -> Self {
        let id = reporter.add_task(label);
        Self { reporter, id }
    }

    pub(crate) fn set_total(&self, total: Option<u64>) {
        self.reporter.set_total(self.id, total);
    }

    pub(crate) fn advance(&self, bytes: u64) {
        self.reporter.advance(self.id, bytes);
    }
}

impl Drop for ProgressTask<'_> {
    fn drop(&mut self) {
        self.reporter.remove_task(self.id);
    }
}

/// Reporter that ignores every event
#[derive(Debug, Default)]
pub struct NoOpProgress {
    next_id: AtomicU64,
}

impl ProgressReporter for NoOpProgress {
    fn add_task(&self, _label: &str) -> TaskId {
        TaskId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    fn advance(&self, _task: TaskId, _bytes: u64) {}

    fn remove_task(&self, _task: TaskId) {}
}

/// Reporter that writes `tracing` events instead of drawing bars
#[derive(Debug, Default)]
pub struct LogProgress {
    next_id: AtomicU64,
    total_posts: AtomicUsize,
    finished_posts: AtomicUsize,
}

impl ProgressReporter for LogProgress {
    fn phase_changed(&self, phase: RunPhase) {
        tracing::info!(%phase, "Run phase changed");
    }

    fn posts_started(&self, total: usize) {
        self.total_posts.store(total, Ordering::Relaxed);
        self.finished_posts.store(0, Ordering::Relaxed);
        tracing::info!(total, "Reconciling posts");
    }

    fn post_finished(&self) {
        let done = self.finished_posts.fetch_add(1, Ordering::Relaxed) + 1;
        let total = self.total_posts.load(Ordering::Relaxed);
        tracing::info!(done, total, "Post finished");
    }

    fn add_task(&self, label: &str) -> TaskId {
        let id = TaskId(self.next_id.fetch_add(1, Ordering::Relaxed));
        tracing::debug!(task = id.0, label, "Transfer started");
        id
    }

    fn advance(&self, _task: TaskId, _bytes: u64) {}

    fn remove_task(&self, task: TaskId) {
        tracing::debug!(task = task.0, "Transfer ended");
    }
}

/// Interactive terminal bars
///
/// One overall bar counts finished posts; each transfer gets a transient byte
/// bar that disappears when the task is removed.
pub struct TerminalProgress {
    multi: MultiProgress,
    overall: Mutex<Option<ProgressBar>>,
    bars: Mutex<HashMap<TaskId, ProgressBar>>,
    next_id: AtomicU64,
}

impl Default for TerminalProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl TerminalProgress {
    /// Create a reporter drawing to stderr
    pub fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
            overall: Mutex::new(None),
            bars: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(0),
        }
    }

    fn byte_style() -> ProgressStyle {
        ProgressStyle::with_template(
            "{msg:40!} [{bar:30.cyan/blue}] {bytes}/{total_bytes} {bytes_per_sec} {eta}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ")
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner} {msg:40!} {bytes} {bytes_per_sec}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
    }

    fn overall_style() -> ProgressStyle {
        ProgressStyle::with_template("[{elapsed_precise}] [{bar:40}] {pos}/{len} posts")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ")
    }
}

impl ProgressReporter for TerminalProgress {
    fn phase_changed(&self, phase: RunPhase) {
        if matches!(phase, RunPhase::Cleanup | RunPhase::Done)
            && let Ok(mut overall) = self.overall.lock()
            && let Some(bar) = overall.take()
        {
            bar.finish_and_clear();
        }
    }

    fn posts_started(&self, total: usize) {
        let bar = self.multi.add(ProgressBar::new(total as u64));
        bar.set_style(Self::overall_style());
        if let Ok(mut overall) = self.overall.lock() {
            *overall = Some(bar);
        }
    }

    fn post_finished(&self) {
        if let Ok(overall) = self.overall.lock()
            && let Some(bar) = overall.as_ref()
        {
            bar.inc(1);
        }
    }

    fn add_task(&self, label: &str) -> TaskId {
        let id = TaskId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let bar = self.multi.add(ProgressBar::new_spinner());
        bar.set_style(Self::spinner_style());
        bar.set_message(label.to_string());
        if let Ok(mut bars) = self.bars.lock() {
            bars.insert(id, bar);
        }
        id
    }

    fn set_total(&self, task: TaskId, total: Option<u64>) {
        if let Some(total) = total
            && let Ok(bars) = self.bars.lock()
            && let Some(bar) = bars.get(&task)
        {
            bar.set_length(total);
            bar.set_style(Self::byte_style());
        }
    }

    fn advance(&self, task: TaskId, bytes: u64) {
        if let Ok(bars) = self.bars.lock()
            && let Some(bar) = bars.get(&task)
        {
            bar.inc(bytes);
        }
    }

    fn remove_task(&self, task: TaskId) {
        let bar = match self.bars.lock() {
            Ok(mut bars) => bars.remove(&task),
            Err(_) => None,
        };
        if let Some(bar) = bar {
            bar.finish_and_clear();
            self.multi.remove(&bar);
        }
    }
}
