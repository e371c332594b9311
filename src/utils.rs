//! Utility functions for sizes, timestamps, URLs and path components

use chrono::{DateTime, Local};
use std::time::SystemTime;

/// Timestamp format used in post and history records
pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Format a byte count with two decimals and a binary unit
///
/// # Examples
///
/// ```
/// use social_dl::utils::human_readable_size;
///
/// assert_eq!(human_readable_size(512), "512.00 B");
/// assert_eq!(human_readable_size(1536), "1.50 KB");
/// ```
#[must_use]
pub fn human_readable_size(size_in_bytes: u64) -> String {
    let mut size = size_in_bytes as f64;
    for unit in ["B", "KB", "MB", "GB"] {
        if size < 1024.0 {
            return format!("{:.2} {}", size, unit);
        }
        size /= 1024.0;
    }
    format!("{:.2} TB", size)
}

/// Format a filesystem timestamp in local time
#[must_use]
pub fn format_system_time(time: SystemTime) -> String {
    DateTime::<Local>::from(time).format(TIME_FORMAT).to_string()
}

/// Current local time, formatted like every other timestamp in the history
#[must_use]
pub fn now_formatted() -> String {
    Local::now().format(TIME_FORMAT).to_string()
}

/// Last path segment of a URL without its extension
///
/// Query strings and fragments are ignored.
///
/// ```
/// use social_dl::utils::url_file_stem;
///
/// assert_eq!(
///     url_file_stem("https://cdn.example/v/t51/12345_n.jpg?stp=dst").as_deref(),
///     Some("12345_n")
/// );
/// ```
#[must_use]
pub fn url_file_stem(url: &str) -> Option<String> {
    let name = url_last_segment(url)?;
    let stem = std::path::Path::new(&name).file_stem()?.to_str()?;
    if stem.is_empty() {
        return None;
    }
    Some(stem.to_string())
}

/// Extension of the last path segment of a URL, if any
#[must_use]
pub fn url_extension(url: &str) -> Option<String> {
    let name = url_last_segment(url)?;
    let ext = std::path::Path::new(&name).extension()?.to_str()?;
    if ext.is_empty() {
        return None;
    }
    Some(ext.to_string())
}

fn url_last_segment(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let last = parsed.path_segments()?.next_back()?;
    if last.is_empty() {
        return None;
    }
    Some(last.to_string())
}

/// Make a user name safe to use as a single directory name
///
/// Path separators and characters rejected by common filesystems are replaced
/// with `_`; an empty or dot-only name becomes "unknown".
#[must_use]
pub fn safe_path_component(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    if cleaned.is_empty() || cleaned.chars().all(|c| c == '.') {
        return "unknown".to_string();
    }
    cleaned
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn human_readable_size_units() {
        assert_eq!(human_readable_size(0), "0.00 B");
        assert_eq!(human_readable_size(1023), "1023.00 B");
        assert_eq!(human_readable_size(1024), "1.00 KB");
        assert_eq!(human_readable_size(5 * 1024 * 1024), "5.00 MB");
        assert_eq!(human_readable_size(3 * 1024 * 1024 * 1024), "3.00 GB");
        assert_eq!(human_readable_size(2 * 1024_u64.pow(4)), "2.00 TB");
    }

    #[test]
    fn url_stem_and_extension() {
        let url = "https://wx1.sinaimg.cn/large/abc123.jpg";
        assert_eq!(url_file_stem(url).as_deref(), Some("abc123"));
        assert_eq!(url_extension(url).as_deref(), Some("jpg"));

        let with_query = "https://scontent.cdninstagram.com/o1/v/t16/f2/m86/AQN.mp4?efg=x&oh=y";
        assert_eq!(url_file_stem(with_query).as_deref(), Some("AQN"));
        assert_eq!(url_extension(with_query).as_deref(), Some("mp4"));
    }

    #[test]
    fn url_without_file_segment() {
        assert_eq!(url_file_stem("https://example.com/"), None);
        assert_eq!(url_extension("https://example.com/video"), None);
        assert_eq!(url_file_stem("not a url"), None);
    }

    #[test]
    fn safe_path_component_replaces_separators() {
        assert_eq!(safe_path_component("alice"), "alice");
        assert_eq!(safe_path_component("a/b\\c"), "a_b_c");
        assert_eq!(safe_path_component("  "), "unknown");
        assert_eq!(safe_path_component(".."), "unknown");
        assert_eq!(safe_path_component("用户名"), "用户名");
    }

    #[test]
    fn system_time_formatting_shape() {
        let formatted = format_system_time(SystemTime::now());
        assert_eq!(formatted.len(), 19);
        assert!(chrono::NaiveDateTime::parse_from_str(&formatted, TIME_FORMAT).is_ok());
    }
}
