//! Run report and its summary table.

use crate::types::{PostStats, RunStats};
use crate::utils::human_readable_size;
use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// Outcome of one completed run
#[derive(Clone, Debug, Serialize)]
pub struct RunReport {
    /// Per-platform and aggregate counters
    pub stats: RunStats,
    /// Wall-clock duration of the run
    #[serde(with = "crate::config::duration_serde")]
    pub elapsed: Duration,
    /// Files deleted during cleanup (inputs and, optionally, orphaned media)
    pub cleaned_files: usize,
    /// Whether the history file was written successfully
    pub history_saved: bool,
}

impl RunReport {
    /// Whether every attempted post was committed
    pub fn is_clean(&self) -> bool {
        self.stats.total.fail_post == 0 && self.history_saved
    }
}

const HEADER: [&str; 8] = [
    "Platform", "Success", "Skipped", "Failed", "Files", "Images", "Videos", "Size",
];

fn row(name: &str, stats: &PostStats) -> [String; 8] {
    [
        name.to_string(),
        stats.success_post.to_string(),
        stats.skip_post.to_string(),
        stats.fail_post.to_string(),
        stats.files.to_string(),
        stats.images.to_string(),
        stats.videos.to_string(),
        human_readable_size(stats.size),
    ]
}

impl fmt::Display for RunReport {
    /// Plain-text table, one row per platform plus a total row
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rows: Vec<[String; 8]> = self
            .stats
            .platforms
            .iter()
            .map(|(name, stats)| row(name, stats))
            .collect();
        let total = row("Total", &self.stats.total);

        let mut widths = HEADER.map(str::len);
        for cells in rows.iter().chain(std::iter::once(&total)) {
            for (width, cell) in widths.iter_mut().zip(cells) {
                *width = (*width).max(cell.chars().count());
            }
        }

        let write_row = |f: &mut fmt::Formatter<'_>, cells: &[String]| -> fmt::Result {
            for (i, (cell, width)) in cells.iter().zip(widths).enumerate() {
                if i == 0 {
                    write!(f, "{:<width$}", cell, width = width)?;
                } else {
                    write!(f, "  {:>width$}", cell, width = width)?;
                }
            }
            writeln!(f)
        };

        writeln!(f, "Run finished in {:.1}s", self.elapsed.as_secs_f64())?;
        write_row(f, &HEADER.map(String::from))?;
        let rule_len = widths.iter().sum::<usize>() + 2 * (widths.len() - 1);
        writeln!(f, "{}", "-".repeat(rule_len))?;
        for cells in &rows {
            write_row(f, cells)?;
        }
        writeln!(f, "{}", "-".repeat(rule_len))?;
        write_row(f, &total)?;

        if self.cleaned_files > 0 {
            writeln!(f, "Removed {} file(s) of failed posts", self.cleaned_files)?;
        }
        if !self.history_saved {
            writeln!(f, "WARNING: download history could not be saved")?;
        }
        Ok(())
    }
}
