use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use social_dl::{
    Config, Error, LogProgress, MediaDownloader, NoOpProgress, ProgressReporter, TerminalProgress,
    build_platforms, run_with_shutdown,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "social-dl",
    version,
    about = "Download the media of scraped Instagram and Weibo posts"
)]
struct Cli {
    /// JSON configuration file (every field optional)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory media are saved to
    #[arg(long)]
    download_root: Option<PathBuf>,

    /// Root of the scraper output (<root>/<platform>/json)
    #[arg(long)]
    input_root: Option<PathBuf>,

    /// Download history file
    #[arg(long)]
    history: Option<PathBuf>,

    /// Maximum number of simultaneous transfers
    #[arg(long)]
    max_concurrent: Option<usize>,

    /// Proxy for platforms that need one, e.g. http://127.0.0.1:7890
    #[arg(long)]
    proxy: Option<String>,

    /// Only process this platform (repeatable)
    #[arg(long = "platform")]
    platforms: Vec<String>,

    /// How progress is shown
    #[arg(long, value_enum, default_value_t = ProgressMode::Terminal)]
    progress: ProgressMode,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ProgressMode {
    /// Interactive progress bars
    Terminal,
    /// Progress as log lines
    Log,
    /// No progress output
    None,
}

impl Cli {
    fn into_config(self) -> anyhow::Result<(Config, ProgressMode)> {
        let mut config = match &self.config {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };

        if let Some(root) = self.download_root {
            config.download.download_root = root;
        }
        if let Some(root) = self.input_root {
            config.input.input_root = root;
        }
        if let Some(history) = self.history {
            config.persistence.history_path = history;
        }
        if let Some(max) = self.max_concurrent {
            config.download.max_concurrent_downloads = max;
        }
        if self.proxy.is_some() {
            config.download.proxy_url = self.proxy;
        }
        if !self.platforms.is_empty() {
            config.platforms.enabled = self.platforms;
        }

        config.validate()?;
        Ok((config, self.progress))
    }
}

/// `RUST_LOG` when it is set and valid, `social_dl=info` otherwise
fn log_filter(rust_log: Option<&str>) -> EnvFilter {
    rust_log
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER))
}

const DEFAULT_LOG_FILTER: &str = "social_dl=info";

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(std::env::var("RUST_LOG").ok().as_deref()))
        .with_writer(std::io::stderr)
        .init();

    let (config, mode) = Cli::parse().into_config()?;
    let platforms = build_platforms(&config)?;

    let progress: Arc<dyn ProgressReporter> = match mode {
        ProgressMode::Terminal => Arc::new(TerminalProgress::new()),
        ProgressMode::Log => Arc::new(LogProgress::default()),
        ProgressMode::None => Arc::new(NoOpProgress::default()),
    };
    let downloader = MediaDownloader::new(config, platforms)
        .await?
        .with_progress(progress);

    match run_with_shutdown(&downloader).await {
        Ok(report) => {
            println!("{}", report);
            Ok(ExitCode::SUCCESS)
        }
        Err(Error::Interrupted { history_saved }) => {
            if history_saved {
                eprintln!("Interrupted, download history saved");
            } else {
                eprintln!("Interrupted, WARNING: download history could not be saved");
            }
            Ok(ExitCode::from(130))
        }
        Err(e) => Err(e.into()),
    }
}
