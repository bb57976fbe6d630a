#![forbid(unsafe_code)]

//! Downloads every channel from the channel list, skipping media that the
//! download archive already records.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use ytarchive_tools::channels::read_channels;
use ytarchive_tools::config::{RuntimeOverrides, resolve_runtime_paths};
use ytarchive_tools::cookies::install_cookies;
use ytarchive_tools::downloader::{DEFAULT_YT_DLP, ProgressWriter, YtDlp, run_pass};
use ytarchive_tools::logging;
use ytarchive_tools::security::ensure_not_root;
use ytarchive_tools::workspace::{WorkspacePaths, initialize};

#[derive(Parser, Debug)]
#[command(
    name = "archive_channels",
    version,
    about = "Archive YouTube channels with yt-dlp, skipping already downloaded videos"
)]
struct Cli {
    /// `.env` file with YTARCHIVE_* settings.
    #[arg(long)]
    env_file: Option<PathBuf>,
    #[arg(long)]
    download_root: Option<PathBuf>,
    #[arg(long)]
    metadata_root: Option<PathBuf>,
    #[arg(long)]
    archive_file: Option<PathBuf>,
    #[arg(long)]
    channels_file: Option<PathBuf>,
    #[arg(long)]
    cookies_file: Option<PathBuf>,
    /// Copies this Netscape cookie jar over the configured cookies file.
    #[arg(long, value_name = "PATH")]
    install_cookies: Option<PathBuf>,
    /// Writes JSON progress reports to this path.
    #[arg(long)]
    progress_file: Option<PathBuf>,
    #[arg(long, default_value = DEFAULT_YT_DLP)]
    yt_dlp: PathBuf,
    /// Prepare directories and load the archive, then exit.
    #[arg(long)]
    load_only: bool,
}

impl Cli {
    fn overrides(&self) -> RuntimeOverrides {
        RuntimeOverrides {
            download_root: self.download_root.clone(),
            metadata_root: self.metadata_root.clone(),
            archive_file: self.archive_file.clone(),
            channels_file: self.channels_file.clone(),
            cookies_file: self.cookies_file.clone(),
            env_path: self.env_file.clone(),
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init();
    ensure_not_root("archive_channels")?;

    let paths = WorkspacePaths::from(resolve_runtime_paths(cli.overrides())?);

    println!("===================================");
    println!("YouTube Channel Archiver");
    println!("===================================");
    println!("Downloads: {}", paths.download_root.display());
    println!("Metadata: {}", paths.metadata_root.display());
    println!("Archive: {}", paths.archive.display());
    println!();

    let mut archive = initialize(&paths).context("preparing workspace")?;
    println!("Loaded {} video IDs from archive.", archive.len());
    println!();

    if let Some(source) = &cli.install_cookies {
        install_cookies(source, &paths.cookies)?;
    }

    if cli.load_only {
        return Ok(());
    }

    let channels = read_channels(&paths.channels)?;
    if channels.is_empty() {
        println!("No channels listed in {}", paths.channels.display());
        return Ok(());
    }

    let yt_dlp = YtDlp::new(&cli.yt_dlp);
    yt_dlp.ensure_available()?;
    let progress = cli.progress_file.clone().map(ProgressWriter::new);

    let summary = run_pass(&yt_dlp, &channels, &paths, &mut archive, progress.as_ref())?;

    println!();
    println!("===================================");
    println!("Download pass complete!");
    println!("===================================");
    println!("Channels: {}", summary.channels);
    println!("Downloaded: {}", summary.downloaded);
    println!("Already archived: {}", summary.skipped);
    println!("Failed downloads: {}", summary.failed);
    println!("Unreachable channels: {}", summary.failed_channels);
    println!("Archive now holds {} video IDs.", archive.len());

    Ok(())
}
