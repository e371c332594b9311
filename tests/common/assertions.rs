//! Assertions on the files a run leaves behind

use social_dl::{Config, HistoryMap, HistoryStore};
use std::path::{Path, PathBuf};

/// History as persisted on disk
pub async fn saved_history(config: &Config) -> HistoryMap {
    HistoryStore::new(&config.persistence.history_path).load().await
}

/// Path of a downloaded media file
pub fn media_path(config: &Config, platform: &str, user: &str, filename: &str) -> PathBuf {
    config
        .download
        .download_root
        .join(platform)
        .join(user)
        .join(filename)
}

/// Assert that `path` holds exactly `expected`
pub fn assert_file_bytes(path: &Path, expected: &[u8]) {
    let actual = std::fs::read(path)
        .unwrap_or_else(|e| panic!("expected {} to exist: {}", path.display(), e));
    assert_eq!(actual, expected, "unexpected content in {}", path.display());
}

/// Assert that no `.part` file is left anywhere below `dir`
pub fn assert_no_partial_files(dir: &Path) {
    for entry in walkdir::WalkDir::new(dir).into_iter().flatten() {
        let path = entry.path();
        assert!(
            path.extension().is_none_or(|ext| ext != "part"),
            "partial file left behind: {}",
            path.display()
        );
    }
}
