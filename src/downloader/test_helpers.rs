//! Shared test helpers for creating MediaDownloader instances in tests.

use crate::config::Config;
use crate::downloader::MediaDownloader;
use crate::platforms::{WeiboPlatform, build_platforms};
use crate::progress::{ProgressReporter, TaskId};
use crate::types::{FileType, MediaItem, PostItem};
use serde_json::json;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::tempdir;

/// Creation time used by every generated weibo input
pub(crate) const CREATED_AT: &str = "Sat Mar 01 12:00:00 +0800 2025";
/// Date prefix weibo filenames get for [`CREATED_AT`]
pub(crate) const DATE_PREFIX: &str = "20250301";

/// Config with every path inside `root` and only weibo enabled
pub(crate) fn test_config(root: &Path) -> Config {
    let mut config = Config::default();
    config.download.download_root = root.join("downloads");
    config.download.max_concurrent_downloads = 3;
    config.input.input_root = root.join("data");
    config.persistence.history_path = root.join("data").join("download_history.json");
    config.platforms.enabled = vec!["weibo".to_string()];
    config
}

/// Helper to create a test MediaDownloader instance rooted in a fresh tempdir.
/// Returns the downloader and the tempdir (which must be kept alive).
pub(crate) async fn create_test_downloader() -> (MediaDownloader, tempfile::TempDir) {
    let temp_dir = tempdir().unwrap();
    let downloader = downloader_for(test_config(temp_dir.path())).await;
    (downloader, temp_dir)
}

/// Downloader for an explicit config, with the adapters it enables
pub(crate) async fn downloader_for(config: Config) -> MediaDownloader {
    let platforms = build_platforms(&config).unwrap();
    MediaDownloader::new(config, platforms).await.unwrap()
}

/// Weibo adapter reading from the downloader's input directory
pub(crate) fn weibo(downloader: &MediaDownloader) -> WeiboPlatform {
    WeiboPlatform::new(downloader.config().input.json_dir("weibo"))
}

/// Weibo post with the given `(url, filename)` media
pub(crate) fn weibo_post(post_id: &str, user: &str, media: &[(&str, &str)]) -> PostItem {
    PostItem {
        platform: "weibo".to_string(),
        post_id: post_id.to_string(),
        user: user.to_string(),
        desc: "test post".to_string(),
        create_time: "2025-03-01 12:00:00".to_string(),
        source_url: format!("https://weibo.com/1/{}", post_id),
        source_file_path: None,
        media_list: media
            .iter()
            .map(|(url, filename)| {
                let file_type = if filename.ends_with(".mp4") || filename.ends_with(".mov") {
                    FileType::Video
                } else {
                    FileType::Image
                };
                MediaItem::new(*url, *filename, file_type)
            })
            .collect(),
    }
}

/// Write a weibo status with one picture per URL to the input tree
///
/// Returns the file path. Picture `n` (1-based) is saved as
/// `<DATE_PREFIX>_<post_id>_<n>.<ext>`.
pub(crate) fn write_weibo_input(config: &Config, user: &str, post_id: &str, urls: &[String]) -> PathBuf {
    let pic_ids: Vec<String> = (1..=urls.len()).map(|i| format!("pic{}", i)).collect();
    let pic_infos: serde_json::Map<String, serde_json::Value> = pic_ids
        .iter()
        .zip(urls)
        .map(|(id, url)| (id.clone(), json!({"largest": {"url": url, "width": 100, "height": 100}})))
        .collect();
    let status = json!({
        "idstr": post_id,
        "created_at": CREATED_AT,
        "text_raw": format!("post {}", post_id),
        "user": {"screen_name": user, "idstr": "42"},
        "pic_ids": pic_ids,
        "pic_infos": pic_infos,
    });

    let dir = config.input.json_dir("weibo").join(user);
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join(format!("{}.json", post_id));
    std::fs::write(&path, serde_json::to_vec_pretty(&status).unwrap()).unwrap();
    path
}

/// Where a picture of a generated weibo input ends up
pub(crate) fn weibo_media_path(config: &Config, user: &str, post_id: &str, index: usize, ext: &str) -> PathBuf {
    config
        .download
        .download_root
        .join("weibo")
        .join(user)
        .join(format!("{}_{}_{}.{}", DATE_PREFIX, post_id, index, ext))
}

/// Progress observer that tracks live tasks
#[derive(Default)]
pub(crate) struct RecordingProgress {
    next_id: AtomicU64,
    active: Mutex<HashSet<TaskId>>,
    max_active: AtomicUsize,
    added: AtomicUsize,
    bytes: AtomicU64,
    posts_finished: AtomicUsize,
}

impl RecordingProgress {
    pub(crate) fn active(&self) -> usize {
        self.active.lock().unwrap().len()
    }

    pub(crate) fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    pub(crate) fn added(&self) -> usize {
        self.added.load(Ordering::SeqCst)
    }

    pub(crate) fn bytes(&self) -> u64 {
        self.bytes.load(Ordering::SeqCst)
    }

    pub(crate) fn posts_finished(&self) -> usize {
        self.posts_finished.load(Ordering::SeqCst)
    }
}

impl ProgressReporter for RecordingProgress {
    fn post_finished(&self) {
        self.posts_finished.fetch_add(1, Ordering::SeqCst);
    }

    fn add_task(&self, _label: &str) -> TaskId {
        let id = TaskId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let mut active = self.active.lock().unwrap();
        active.insert(id);
        self.max_active.fetch_max(active.len(), Ordering::SeqCst);
        self.added.fetch_add(1, Ordering::SeqCst);
        id
    }

    fn advance(&self, _task: TaskId, bytes: u64) {
        self.bytes.fetch_add(bytes, Ordering::SeqCst);
    }

    fn remove_task(&self, task: TaskId) {
        self.active.lock().unwrap().remove(&task);
    }
}

/// Attach a fresh [`RecordingProgress`] to a downloader
pub(crate) fn with_recorder(downloader: MediaDownloader) -> (MediaDownloader, Arc<RecordingProgress>) {
    let recorder = Arc::new(RecordingProgress::default());
    let downloader = downloader.with_progress(recorder.clone());
    (downloader, recorder)
}
