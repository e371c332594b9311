//! Weibo adapter.
//!
//! Input files are status objects from the Weibo web API, stored as
//! `<json_dir>/<author>/<idstr>.json`. Media come from one of three places,
//! checked in order: `mix_media_info` (mixed images and videos), `pic_ids` /
//! `pic_infos` (images, possibly live photos) or a video `page_info`.

use super::{DESKTOP_USER_AGENT, Platform, str_field, u32_field};
use crate::types::{FileType, MediaItem, PostItem};
use crate::utils::{TIME_FORMAT, url_extension};
use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveDateTime};
use reqwest::header::{HeaderMap, HeaderValue, REFERER, USER_AGENT};
use serde_json::Value;
use std::path::{Path, PathBuf};

const NAME: &str = "weibo";

/// `created_at` format, e.g. "Sat Mar 01 12:00:00 +0800 2025"
const CREATED_AT_FORMAT: &str = "%a %b %d %H:%M:%S %z %Y";

/// `media_info` keys holding a video URL, best quality first
const VIDEO_URL_KEYS: &[&str] = &[
    "mp4_720p_mp4",
    "stream_url",
    "mp4_hd_url",
    "hevc_mp4_hd",
    "mp4_sd_url",
    "mp4_ld_mp4",
    "h265_mp4_hd",
    "h265_mp4_ld",
    "inch_4_mp4_hd",
    "inch_5_5_mp4_hd",
    "inch_5_mp4_hd",
    "stream_url_hd",
];

/// Adapter for Weibo statuses
#[derive(Clone, Debug)]
pub struct WeiboPlatform {
    json_dir: PathBuf,
}

impl WeiboPlatform {
    /// Create an adapter reading from `json_dir`
    pub fn new(json_dir: impl Into<PathBuf>) -> Self {
        Self {
            json_dir: json_dir.into(),
        }
    }
}

#[async_trait]
impl Platform for WeiboPlatform {
    fn name(&self) -> &str {
        NAME
    }

    fn json_dir(&self) -> &Path {
        &self.json_dir
    }

    fn use_proxy(&self) -> bool {
        false
    }

    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(DESKTOP_USER_AGENT));
        headers.insert(REFERER, HeaderValue::from_static("https://weibo.com/"));
        headers
    }

    fn parse_value(&self, path: &Path, data: &Value) -> Option<PostItem> {
        let post_id = str_field(data, "idstr")?;
        if post_id.is_empty() {
            return None;
        }
        // Paid-only posts and reposts carry no media of their own
        if data.get("mblog_vip_type").and_then(Value::as_i64) == Some(1) {
            return None;
        }
        if data.get("retweeted_status").is_some_and(Value::is_object) {
            return None;
        }

        let author = data.get("user");
        let user = author
            .and_then(|u| str_field(u, "screen_name"))
            .unwrap_or("unknown")
            .to_string();
        let author_id = author.and_then(author_id).unwrap_or_default();

        let created = parse_created_at(str_field(data, "created_at").unwrap_or_default());
        let date_prefix = created.format("%Y%m%d").to_string();

        let mut post = PostItem {
            platform: NAME.to_string(),
            post_id: post_id.to_string(),
            user,
            desc: str_field(data, "text_raw").unwrap_or_default().to_string(),
            create_time: created.format(TIME_FORMAT).to_string(),
            source_url: format!("https://weibo.com/{}/{}", author_id, post_id),
            source_file_path: Some(path.to_path_buf()),
            media_list: Vec::new(),
        };

        let mix_items = data
            .get("mix_media_info")
            .and_then(|info| info.get("items"))
            .and_then(Value::as_array)
            .filter(|items| !items.is_empty());
        let pic_ids = data
            .get("pic_ids")
            .and_then(Value::as_array)
            .filter(|ids| !ids.is_empty());
        let page_info = data
            .get("page_info")
            .filter(|info| str_field(info, "type") == Some("video"));

        if let Some(items) = mix_items {
            post.media_list = mixed_media(items, &date_prefix, post_id);
        } else if let Some(ids) = pic_ids {
            let infos = data.get("pic_infos");
            post.media_list = pictures(ids, infos, &date_prefix, post_id);
        } else if let Some(info) = page_info
            && let Some(url) = video_url(info.get("media_info"))
        {
            post.media_list.push(MediaItem::new(
                url,
                format!("{}_{}.mp4", date_prefix, post_id),
                FileType::Video,
            ));
        }

        if post.media_list.is_empty() {
            return None;
        }
        Some(post)
    }
}

/// Wall-clock creation time in the post's own offset; falls back to now
fn parse_created_at(created_at: &str) -> NaiveDateTime {
    DateTime::parse_from_str(created_at, CREATED_AT_FORMAT)
        .map(|dt| dt.naive_local())
        .unwrap_or_else(|_| Local::now().naive_local())
}

fn author_id(user: &Value) -> Option<String> {
    str_field(user, "idstr")
        .map(str::to_string)
        .or_else(|| user.get("id").and_then(Value::as_i64).map(|id| id.to_string()))
}

/// First non-empty video URL of a `media_info` object
fn video_url(media_info: Option<&Value>) -> Option<&str> {
    let media_info = media_info?;
    VIDEO_URL_KEYS
        .iter()
        .filter_map(|key| str_field(media_info, key))
        .find(|url| !url.is_empty())
}

fn mixed_media(items: &[Value], date_prefix: &str, post_id: &str) -> Vec<MediaItem> {
    let mut media = Vec::new();
    let mut index = 1;
    for item in items {
        let Some(data) = item.get("data") else {
            continue;
        };
        match str_field(item, "type") {
            Some("pic") => {
                let Some(largest) = data.get("largest") else {
                    continue;
                };
                if let Some(url) = str_field(largest, "url") {
                    let ext = url_extension(url).unwrap_or_else(|| "jpg".to_string());
                    media.push(
                        MediaItem::new(
                            url,
                            format!("{}_{}_{}.{}", date_prefix, post_id, index, ext),
                            FileType::Image,
                        )
                        .with_dimensions(u32_field(largest, "width"), u32_field(largest, "height")),
                    );
                    index += 1;
                }
            }
            Some("video") => {
                if let Some(url) = video_url(data.get("media_info")) {
                    media.push(MediaItem::new(
                        url,
                        format!("{}_{}_{}.mp4", date_prefix, post_id, index),
                        FileType::Video,
                    ));
                    index += 1;
                }
            }
            _ => {}
        }
    }
    media
}

fn pictures(
    ids: &[Value],
    infos: Option<&Value>,
    date_prefix: &str,
    post_id: &str,
) -> Vec<MediaItem> {
    let mut media = Vec::new();
    let mut index = 1;
    for pic_id in ids.iter().filter_map(Value::as_str) {
        let Some(info) = infos.and_then(|infos| infos.get(pic_id)) else {
            continue;
        };
        let largest = info.get("largest");
        let url = largest
            .and_then(|l| str_field(l, "url"))
            .map(str::to_string)
            .unwrap_or_else(|| format!("https://wx4.sinaimg.cn/large/{}.jpg", pic_id));
        let ext = url_extension(&url).unwrap_or_else(|| "jpg".to_string());
        let (width, height) = largest
            .map(|l| (u32_field(l, "width"), u32_field(l, "height")))
            .unwrap_or((0, 0));
        media.push(
            MediaItem::new(
                url,
                format!("{}_{}_{}.{}", date_prefix, post_id, index, ext),
                FileType::Image,
            )
            .with_dimensions(width, height),
        );

        // Live photos carry a short clip next to the still image
        if str_field(info, "type") == Some("livephoto")
            && let Some(video) = str_field(info, "video").filter(|v| !v.is_empty())
        {
            media.push(MediaItem::new(
                video,
                format!("{}_{}_{}.mov", date_prefix, post_id, index),
                FileType::Video,
            ));
        }
        index += 1;
    }
    media
}
