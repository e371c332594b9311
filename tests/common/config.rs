//! Configurations rooted in a scratch directory

use social_dl::Config;
use std::path::Path;

/// Config with every path inside `root` and both platforms enabled
pub fn scratch_config(root: &Path) -> Config {
    let mut config = Config::default();
    config.download.download_root = root.join("downloads");
    config.download.max_concurrent_downloads = 4;
    config.input.input_root = root.join("data");
    config.persistence.history_path = root.join("data").join("download_history.json");
    config
}
