//! Core types for social-dl

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::utils::human_readable_size;

/// Kind of a downloadable media file
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    /// Still image (jpg, png, webp, ...)
    Image,
    /// Video (mp4, mov, ...)
    Video,
}

impl FileType {
    /// Lowercase name as stored in the history file
    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::Image => "image",
            FileType::Video => "video",
        }
    }
}

impl std::fmt::Display for FileType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One downloadable file attached to a post
///
/// Created by a platform parser with only the remote description filled in.
/// The fetcher fills `size`, `human_readable_size`, `save_time` and `filepath`
/// once the file is confirmed on disk.
#[derive(Clone, Debug, PartialEq)]
pub struct MediaItem {
    /// Remote URL
    pub url: String,
    /// File name inside the user's download directory
    pub filename: String,
    /// Image or video
    pub file_type: FileType,
    /// Width in pixels (0 when unknown)
    pub width: u32,
    /// Height in pixels (0 when unknown)
    pub height: u32,
    /// Duration in seconds for videos, when the platform reports it
    pub duration: Option<f64>,
    /// Size on disk in bytes
    pub size: u64,
    /// `size` formatted for humans, e.g. "1.50 MB"
    pub human_readable_size: String,
    /// When the file was written, `%Y-%m-%d %H:%M:%S` local time
    pub save_time: String,
    /// Full path on disk
    pub filepath: Option<PathBuf>,
}

impl MediaItem {
    /// Create a media item with unknown dimensions
    pub fn new(url: impl Into<String>, filename: impl Into<String>, file_type: FileType) -> Self {
        Self {
            url: url.into(),
            filename: filename.into(),
            file_type,
            width: 0,
            height: 0,
            duration: None,
            size: 0,
            human_readable_size: String::new(),
            save_time: String::new(),
            filepath: None,
        }
    }

    /// Set the pixel dimensions
    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Set the video duration in seconds
    pub fn with_duration(mut self, duration: Option<f64>) -> Self {
        self.duration = duration;
        self
    }

    /// Record the on-disk state of the file
    pub(crate) fn mark_present(&mut self, size: u64, save_time: String) {
        self.size = size;
        self.human_readable_size = human_readable_size(size);
        self.save_time = save_time;
    }

    /// Snapshot stored in the history record
    pub fn to_snapshot(&self) -> MediaSnapshot {
        MediaSnapshot {
            filename: self.filename.clone(),
            filepath: self
                .filepath
                .as_ref()
                .map(|p| p.to_string_lossy().into_owned())
                .unwrap_or_default(),
            url: self.url.clone(),
            resolution: format!("{}x{}", self.width, self.height),
            file_type: self.file_type,
            duration: self.duration,
            size: self.size,
            human_readable_size: self.human_readable_size.clone(),
            save_time: self.save_time.clone(),
        }
    }
}

/// One scraped post with its media, normalized across platforms
#[derive(Clone, Debug, PartialEq)]
pub struct PostItem {
    /// Platform name ("instagram", "weibo")
    pub platform: String,
    /// Platform-specific post id (Instagram short code, Weibo idstr)
    pub post_id: String,
    /// Author name, also the download sub-directory
    pub user: String,
    /// Caption / text
    pub desc: String,
    /// Creation time, `%Y-%m-%d %H:%M:%S`
    pub create_time: String,
    /// Public URL of the post
    pub source_url: String,
    /// JSON file the post was parsed from
    pub source_file_path: Option<PathBuf>,
    /// Attached media, in display order; never empty for a parsed post
    pub media_list: Vec<MediaItem>,
}

impl PostItem {
    /// Global identity key: `<platform>_<post_id>`
    pub fn unique_id(&self) -> String {
        unique_id(&self.platform, &self.post_id)
    }

    /// History record for a post whose media are all on disk
    pub fn to_history_record(&self) -> HistoryRecord {
        HistoryRecord {
            platform: self.platform.clone(),
            username: self.user.clone(),
            desc: self.desc.clone(),
            create_time: self.create_time.clone(),
            url: self.source_url.clone(),
            file_num: self.media_list.len(),
            files: self.media_list.iter().map(MediaItem::to_snapshot).collect(),
        }
    }
}

/// Build a unique id from its parts
pub fn unique_id(platform: &str, post_id: &str) -> String {
    format!("{}_{}", platform, post_id)
}

/// Persisted record of a fully downloaded post
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    /// Platform name
    pub platform: String,
    /// Author name
    pub username: String,
    /// Caption / text
    #[serde(default)]
    pub desc: String,
    /// Creation time
    #[serde(default)]
    pub create_time: String,
    /// Public URL of the post
    #[serde(default)]
    pub url: String,
    /// Number of media files
    pub file_num: usize,
    /// Snapshot of every media file
    #[serde(default)]
    pub files: Vec<MediaSnapshot>,
}

/// Persisted snapshot of one media file
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MediaSnapshot {
    /// File name
    pub filename: String,
    /// Full path on disk at commit time
    #[serde(default)]
    pub filepath: String,
    /// Remote URL
    #[serde(default)]
    pub url: String,
    /// "WxH"
    #[serde(default)]
    pub resolution: String,
    /// Image or video
    pub file_type: FileType,
    /// Video duration in seconds
    #[serde(default)]
    pub duration: Option<f64>,
    /// Size in bytes
    #[serde(default)]
    pub size: u64,
    /// Size formatted for humans
    #[serde(default)]
    pub human_readable_size: String,
    /// Save time
    #[serde(default)]
    pub save_time: String,
}

/// Counters for one platform (or the aggregate) during a run
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PostStats {
    /// Posts committed to history this run
    pub success_post: u64,
    /// Posts already in history
    pub skip_post: u64,
    /// Posts with at least one failed media item
    pub fail_post: u64,
    /// Media files newly downloaded by committed posts
    pub files: u64,
    /// Bytes newly downloaded by committed posts
    pub size: u64,
    /// Newly downloaded images
    pub images: u64,
    /// Newly downloaded videos
    pub videos: u64,
}

/// Per-platform and aggregate counters for one run
///
/// Platforms keep the order they were registered in, which is also the order
/// of the summary table.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct RunStats {
    /// Sum over all platforms
    pub total: PostStats,
    /// One entry per platform
    pub platforms: Vec<(String, PostStats)>,
}

impl RunStats {
    /// Zeroed counters for the given platforms
    pub fn new<I, S>(platforms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            total: PostStats::default(),
            platforms: platforms
                .into_iter()
                .map(|name| (name.into(), PostStats::default()))
                .collect(),
        }
    }

    /// Apply the same additive update to a platform and to the aggregate
    pub fn update(&mut self, platform: &str, apply: impl Fn(&mut PostStats)) {
        apply(&mut self.total);
        match self.platforms.iter_mut().find(|(name, _)| name == platform) {
            Some((_, stats)) => apply(stats),
            None => {
                let mut stats = PostStats::default();
                apply(&mut stats);
                self.platforms.push((platform.to_string(), stats));
            }
        }
    }

    /// Counters of one platform
    pub fn platform(&self, platform: &str) -> Option<&PostStats> {
        self.platforms
            .iter()
            .find(|(name, _)| name == platform)
            .map(|(_, stats)| stats)
    }
}

/// Result of fetching one media item
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The file was already on disk; nothing was requested
    Existing,
    /// The file was downloaded during this call
    Downloaded,
    /// The file could not be downloaded
    Failed,
}

impl FetchOutcome {
    /// The file is on disk
    pub fn is_success(&self) -> bool {
        !matches!(self, FetchOutcome::Failed)
    }

    /// The file was transferred by this call
    pub fn is_new(&self) -> bool {
        matches!(self, FetchOutcome::Downloaded)
    }
}

/// Result of reconciling one post
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PostOutcome {
    /// Already in history; nothing was done
    Skipped,
    /// Every media item is on disk and the post was added to history
    Committed,
    /// At least one media item failed; the post was not recorded
    Failed,
}

/// Phase of a run
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunPhase {
    /// Listing input files
    Scanning,
    /// Dropping known posts and parsing the rest
    Filtering,
    /// Reconciling pending posts
    Downloading,
    /// Deleting inputs (and optionally media) of failed posts
    Cleanup,
    /// Saving history
    Persisting,
    /// Finished
    Done,
}

impl std::fmt::Display for RunPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RunPhase::Scanning => "scanning",
            RunPhase::Filtering => "filtering",
            RunPhase::Downloading => "downloading",
            RunPhase::Cleanup => "cleanup",
            RunPhase::Persisting => "persisting",
            RunPhase::Done => "done",
        };
        f.write_str(name)
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn sample_post() -> PostItem {
        let mut image = MediaItem::new("https://img.example/a.jpg", "a.jpg", FileType::Image)
            .with_dimensions(1080, 1350);
        image.filepath = Some(PathBuf::from("downloads/weibo/alice/a.jpg"));
        image.mark_present(1536, "2025-01-02 03:04:05".into());
        let video = MediaItem::new("https://img.example/b.mp4", "b.mp4", FileType::Video)
            .with_duration(Some(12.5));

        PostItem {
            platform: "weibo".into(),
            post_id: "123".into(),
            user: "alice".into(),
            desc: "你好".into(),
            create_time: "2025-01-01 00:00:00".into(),
            source_url: "https://weibo.com/1/123".into(),
            source_file_path: Some(PathBuf::from("data/weibo/json/alice/123.json")),
            media_list: vec![image, video],
        }
    }

    #[test]
    fn unique_id_joins_platform_and_post_id() {
        assert_eq!(sample_post().unique_id(), "weibo_123");
        assert_eq!(unique_id("instagram", "C0de_x"), "instagram_C0de_x");
    }

    #[test]
    fn history_record_snapshot_matches_schema() {
        let record = sample_post().to_history_record();
        assert_eq!(record.file_num, 2);
        assert_eq!(record.username, "alice");

        let json = serde_json::to_value(&record).unwrap();
        let first = &json["files"][0];
        assert_eq!(first["resolution"], "1080x1350");
        assert_eq!(first["file_type"], "image");
        assert_eq!(first["size"], 1536);
        assert_eq!(first["human_readable_size"], "1.50 KB");
        assert_eq!(first["filepath"], "downloads/weibo/alice/a.jpg");
        assert!(first["duration"].is_null());

        let second = &json["files"][1];
        assert_eq!(second["resolution"], "0x0");
        assert_eq!(second["file_type"], "video");
        assert_eq!(second["duration"], 12.5);
        assert_eq!(second["filepath"], "");
    }

    #[test]
    fn fetch_outcome_flags() {
        assert!(FetchOutcome::Existing.is_success());
        assert!(!FetchOutcome::Existing.is_new());
        assert!(FetchOutcome::Downloaded.is_success());
        assert!(FetchOutcome::Downloaded.is_new());
        assert!(!FetchOutcome::Failed.is_success());
        assert!(!FetchOutcome::Failed.is_new());
    }

    #[test]
    fn run_stats_update_hits_platform_and_total() {
        let mut stats = RunStats::new(["instagram", "weibo"]);
        stats.update("weibo", |s| s.success_post += 1);
        stats.update("weibo", |s| s.files += 2);
        stats.update("instagram", |s| s.fail_post += 1);

        assert_eq!(stats.total.success_post, 1);
        assert_eq!(stats.total.files, 2);
        assert_eq!(stats.total.fail_post, 1);
        assert_eq!(stats.platform("weibo").unwrap().files, 2);
        assert_eq!(stats.platform("instagram").unwrap().success_post, 0);
    }

    #[test]
    fn run_stats_adds_unregistered_platform_at_the_end() {
        let mut stats = RunStats::new(["weibo"]);
        stats.update("x", |s| s.skip_post += 1);
        assert_eq!(stats.platforms.len(), 2);
        assert_eq!(stats.platforms[1].0, "x");
        assert_eq!(stats.total.skip_post, 1);
    }

    #[test]
    fn history_record_tolerates_missing_optional_fields() {
        let record: HistoryRecord = serde_json::from_str(
            r#"{"platform":"weibo","username":"alice","file_num":1,
                "files":[{"filename":"a.jpg","file_type":"image"}]}"#,
        )
        .unwrap();
        assert_eq!(record.files[0].size, 0);
        assert_eq!(record.desc, "");
    }
}
