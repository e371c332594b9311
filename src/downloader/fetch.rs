//! Single media transfer.

use crate::error::{Error, Result};
use crate::progress::ProgressTask;
use crate::types::{FetchOutcome, MediaItem};
use crate::utils::{format_system_time, human_readable_size, now_formatted};
use reqwest::header::HeaderMap;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio::io::AsyncWriteExt;

use super::MediaDownloader;

impl MediaDownloader {
    /// Make sure one media file is on disk at `target_dir/<filename>`
    ///
    /// An existing file is reused without any request. Otherwise the body is
    /// streamed to `<filename>.part` and renamed into place once complete, so
    /// an interrupted transfer never leaves a file the existence check would
    /// accept. Failures are logged and reported as [`FetchOutcome::Failed`].
    ///
    /// `label` names the progress task, conventionally `<user>/<filename>`.
    pub async fn fetch(
        &self,
        media: &mut MediaItem,
        target_dir: &Path,
        headers: &HeaderMap,
        use_proxy: bool,
        label: &str,
    ) -> FetchOutcome {
        let path = target_dir.join(&media.filename);
        media.filepath = Some(path.clone());

        if let Ok(metadata) = tokio::fs::metadata(&path).await
            && metadata.is_file()
        {
            let save_time = metadata
                .modified()
                .map(format_system_time)
                .unwrap_or_else(|_| now_formatted());
            media.mark_present(metadata.len(), save_time);
            tracing::debug!(path = %path.display(), "Media already on disk, skipping request");
            return FetchOutcome::Existing;
        }

        // Held until the transfer ends, however it ends
        let _permit = match self.fetch_limit.acquire().await {
            Ok(permit) => permit,
            Err(e) => {
                tracing::error!(error = %e, "Fetch semaphore closed");
                return FetchOutcome::Failed;
            }
        };
        let task = ProgressTask::start(self.progress.as_ref(), label);

        let started = Instant::now();
        match self.transfer(&media.url, &path, headers, use_proxy, &task).await {
            Ok(written) => {
                media.mark_present(written, now_formatted());
                let elapsed = started.elapsed().as_secs_f64();
                let speed = if elapsed > 0.0 {
                    (written as f64 / elapsed) as u64
                } else {
                    written
                };
                tracing::info!(
                    file = label,
                    size = %human_readable_size(written),
                    speed = %format!("{}/s", human_readable_size(speed)),
                    elapsed_secs = %format!("{:.2}", elapsed),
                    "Downloaded media"
                );
                FetchOutcome::Downloaded
            }
            Err(e) if e.is_network() => {
                tracing::warn!(file = label, url = %media.url, error = %e, "Media download failed");
                FetchOutcome::Failed
            }
            Err(e) => {
                tracing::error!(file = label, path = %path.display(), error = %e, "Failed to write media file");
                FetchOutcome::Failed
            }
        }
    }

    async fn transfer(
        &self,
        url: &str,
        path: &Path,
        headers: &HeaderMap,
        use_proxy: bool,
        task: &ProgressTask<'_>,
    ) -> Result<u64> {
        let mut response = self
            .http
            .client(use_proxy)
            .get(url)
            .headers(headers.clone())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        task.set_total(response.content_length());

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let part_path = part_path(path);

        let written = match self.stream_to_file(&mut response, &part_path, task).await {
            Ok(written) => written,
            Err(e) => {
                remove_partial(&part_path).await;
                return Err(e);
            }
        };
        if let Err(e) = tokio::fs::rename(&part_path, path).await {
            remove_partial(&part_path).await;
            return Err(Error::Io(e));
        }
        Ok(written)
    }

    async fn stream_to_file(
        &self,
        response: &mut reqwest::Response,
        part_path: &Path,
        task: &ProgressTask<'_>,
    ) -> Result<u64> {
        let file = tokio::fs::File::create(part_path).await?;
        let mut writer = tokio::io::BufWriter::with_capacity(self.config.download.chunk_size, file);

        let mut written: u64 = 0;
        while let Some(chunk) = response.chunk().await? {
            writer.write_all(&chunk).await?;
            written += chunk.len() as u64;
            task.advance(chunk.len() as u64);
        }
        writer.flush().await?;
        Ok(written)
    }
}

/// Temporary name used while a transfer is in progress
pub(crate) fn part_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".part");
    path.with_file_name(name)
}

async fn remove_partial(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => tracing::debug!(path = %path.display(), "Removed partial download"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Failed to remove partial download")
        }
    }
}
