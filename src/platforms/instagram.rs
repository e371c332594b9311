//! Instagram adapter.
//!
//! Input files are media objects from the Instagram web API, stored by the
//! scraper as `<json_dir>/<following>/<author>/<code>.json`. A post is either
//! a single image/video or a carousel of them; each node lists several
//! candidate renditions and the largest one is downloaded.

use super::{
    DESKTOP_USER_AGENT, Platform, parent_dir_name, scan_json_files, str_field, u32_field,
};
use crate::types::{FileType, MediaItem, PostItem};
use crate::utils::{TIME_FORMAT, url_file_stem};
use async_trait::async_trait;
use chrono::{DateTime, Local};
use reqwest::header::{HeaderMap, HeaderValue, REFERER, USER_AGENT};
use serde_json::Value;
use std::path::{Path, PathBuf};

const NAME: &str = "instagram";

/// Adapter for Instagram posts
#[derive(Clone, Debug)]
pub struct InstagramPlatform {
    json_dir: PathBuf,
}

impl InstagramPlatform {
    /// Create an adapter reading from `json_dir`
    pub fn new(json_dir: impl Into<PathBuf>) -> Self {
        Self {
            json_dir: json_dir.into(),
        }
    }
}

#[async_trait]
impl Platform for InstagramPlatform {
    fn name(&self) -> &str {
        NAME
    }

    fn json_dir(&self) -> &Path {
        &self.json_dir
    }

    fn use_proxy(&self) -> bool {
        true
    }

    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(DESKTOP_USER_AGENT));
        headers.insert(
            REFERER,
            HeaderValue::from_static("https://www.instagram.com/"),
        );
        headers
    }

    /// The CDN checks that the referer is the post page itself
    fn headers_for(&self, post: &PostItem) -> HeaderMap {
        let mut headers = self.headers();
        if let Ok(referer) = HeaderValue::from_str(&post.source_url) {
            headers.insert(REFERER, referer);
        }
        headers
    }

    /// Post files minus the per-user profile dumps stored next to them
    async fn scan_files(&self) -> Vec<PathBuf> {
        let mut files = scan_json_files(&self.json_dir).await;
        files.retain(|path| !is_profile_dump(path));
        files
    }

    fn parse_value(&self, path: &Path, item: &Value) -> Option<PostItem> {
        let code = str_field(item, "code")?;
        if code.is_empty() {
            return None;
        }

        let user = parent_dir_name(path).unwrap_or_else(|| "unknown".to_string());
        let desc = item
            .get("caption")
            .and_then(|caption| str_field(caption, "text"))
            .unwrap_or_default()
            .to_string();
        let create_time = item
            .get("taken_at")
            .and_then(Value::as_i64)
            .and_then(|ts| DateTime::from_timestamp(ts, 0))
            .map(|dt| dt.with_timezone(&Local).format(TIME_FORMAT).to_string())
            .unwrap_or_default();

        let mut post = PostItem {
            platform: NAME.to_string(),
            post_id: code.to_string(),
            user,
            desc,
            create_time,
            source_url: format!("https://www.instagram.com/p/{}", code),
            source_file_path: Some(path.to_path_buf()),
            media_list: Vec::new(),
        };

        let carousel = item
            .get("carousel_media")
            .and_then(Value::as_array)
            .filter(|nodes| !nodes.is_empty());
        let nodes: Vec<&Value> = match carousel {
            Some(nodes) => nodes.iter().collect(),
            None => vec![item],
        };

        for (index, node) in nodes.into_iter().enumerate() {
            let image = node
                .get("image_versions2")
                .and_then(|versions| versions.get("candidates"))
                .and_then(best_candidate);
            let video = node.get("video_versions").and_then(best_candidate);

            let base = image
                .or(video)
                .and_then(|c| str_field(c, "url"))
                .and_then(url_file_stem)
                .unwrap_or_else(|| format!("{}_{}", code, index + 1));

            if let Some(candidate) = image
                && let Some(url) = str_field(candidate, "url")
            {
                post.media_list.push(
                    MediaItem::new(url, format!("{}.jpg", base), FileType::Image).with_dimensions(
                        u32_field(candidate, "width"),
                        u32_field(candidate, "height"),
                    ),
                );
            }
            if let Some(candidate) = video
                && let Some(url) = str_field(candidate, "url")
            {
                post.media_list.push(
                    MediaItem::new(url, format!("{}.mp4", base), FileType::Video)
                        .with_dimensions(
                            u32_field(candidate, "width"),
                            u32_field(candidate, "height"),
                        )
                        .with_duration(node.get("video_duration").and_then(Value::as_f64)),
                );
            }
        }

        if post.media_list.is_empty() {
            return None;
        }
        Some(post)
    }
}

/// Profile dumps are named after the user folder they sit in (`alice/alice.json`)
fn is_profile_dump(path: &Path) -> bool {
    match (
        parent_dir_name(path),
        path.file_name().and_then(|name| name.to_str()),
    ) {
        (Some(user), Some(name)) => name.starts_with(&user),
        _ => false,
    }
}

/// Largest rendition (by pixel count) of a candidate list
fn best_candidate(candidates: &Value) -> Option<&Value> {
    candidates
        .as_array()?
        .iter()
        .max_by_key(|c| u64::from(u32_field(c, "width")) * u64::from(u32_field(c, "height")))
}
