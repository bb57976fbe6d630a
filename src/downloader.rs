#![forbid(unsafe_code)]

//! Sequential download pass driven by the external `yt-dlp` binary.
//!
//! Each channel is listed, ids already present in the archive are skipped and
//! everything else is downloaded one video at a time. Failures are logged and
//! the pass moves on; there is no retry.

use crate::archive::DownloadArchive;
use crate::cookies::cookie_args;
use crate::workspace::WorkspacePaths;
use anyhow::{Context, Result, bail};
use chrono::Utc;
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use tracing::{debug, info, warn};

pub const DEFAULT_YT_DLP: &str = "yt-dlp";

/// Handle to the yt-dlp executable. Tests point `program` at a stub script.
#[derive(Debug, Clone)]
pub struct YtDlp {
    program: PathBuf,
}

impl Default for YtDlp {
    fn default() -> Self {
        Self::new(DEFAULT_YT_DLP)
    }
}

impl YtDlp {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn command(&self) -> Command {
        Command::new(&self.program)
    }

    /// Runs `<program> --version` to fail loudly when yt-dlp is missing.
    pub fn ensure_available(&self) -> Result<()> {
        let status = self
            .command()
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        match status {
            Ok(status) if status.success() => Ok(()),
            Ok(_) => bail!(
                "{} is installed but returned a failure status",
                self.program.display()
            ),
            Err(err) => bail!(
                "{} is not installed or not in PATH: {}",
                self.program.display(),
                err
            ),
        }
    }

    /// Lists every video id of a channel without downloading anything.
    pub fn list_video_ids(&self, channel: &str) -> Result<Vec<String>> {
        let list_url = channel_videos_url(channel);
        let output = self
            .command()
            .arg("--flat-playlist")
            .arg("--get-id")
            .arg("--ignore-errors")
            .arg(&list_url)
            .stderr(Stdio::inherit())
            .output()
            .with_context(|| format!("retrieving playlist from {list_url}"))?;

        if !output.status.success() {
            bail!(
                "failed to list videos for {} (status: {})",
                list_url,
                output.status
            );
        }

        let content = String::from_utf8_lossy(&output.stdout);
        Ok(content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_owned)
            .collect())
    }

    /// Downloads a single video into the download root and its info json
    /// into the metadata root.
    pub fn download_video(&self, video_id: &str, paths: &WorkspacePaths) -> Result<()> {
        let media_template = paths
            .download_root
            .join("%(uploader)s")
            .join("%(title)s [%(id)s].%(ext)s");
        let info_template = paths.metadata_root.join("%(id)s");

        let mut command = self.command();
        command
            .arg("--no-progress")
            .arg("--write-info-json")
            .arg("--output")
            .arg(media_template)
            .arg("--output")
            .arg(format!("infojson:{}", info_template.display()))
            .args(cookie_args(&paths.cookies))
            .arg(video_url(video_id));

        let status = command
            .status()
            .with_context(|| format!("running {} for {video_id}", self.program.display()))?;
        if !status.success() {
            bail!("download of {video_id} exited with status {status}");
        }
        Ok(())
    }
}

pub fn video_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={video_id}")
}

/// Expands a bare `@handle` into its channel URL; anything else is handed to
/// yt-dlp unchanged.
pub fn channel_videos_url(channel: &str) -> String {
    let channel = channel.trim();
    if channel.starts_with('@') {
        format!("https://www.youtube.com/{channel}/videos")
    } else {
        channel.to_string()
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProgressReport {
    progress: u8,
    message: String,
    updated_at: String,
}

/// Writes a small JSON progress document that other tools can poll.
#[derive(Debug, Clone)]
pub struct ProgressWriter {
    path: PathBuf,
}

impl ProgressWriter {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn write(&self, progress: u8, message: &str) {
        let report = ProgressReport {
            progress: progress.min(100),
            message: message.to_string(),
            updated_at: Utc::now().to_rfc3339(),
        };

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
            && let Err(err) = fs::create_dir_all(parent)
        {
            warn!("could not create progress dir: {err}");
            return;
        }

        let tmp_path = self.path.with_extension("tmp");
        match serde_json::to_vec(&report) {
            Ok(payload) => {
                if let Err(err) = fs::write(&tmp_path, payload) {
                    warn!("could not write progress file: {err}");
                    return;
                }
                if let Err(err) = fs::rename(&tmp_path, &self.path) {
                    warn!("could not finalize progress file: {err}");
                }
            }
            Err(err) => {
                warn!("could not serialize progress report: {err}");
            }
        }
    }
}

fn update_progress(progress: Option<&ProgressWriter>, percent: u8, message: &str) {
    if let Some(writer) = progress {
        writer.write(percent, message);
    }
}

/// Counters reported once a pass finishes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassSummary {
    pub channels: usize,
    pub downloaded: usize,
    pub skipped: usize,
    /// Videos whose download exited with an error.
    pub failed: usize,
    /// Channels that could not be listed at all.
    pub failed_channels: usize,
}

/// Walks every channel in order and downloads whatever the archive does not
/// know about yet. Only archive write failures abort the pass.
pub fn run_pass(
    yt_dlp: &YtDlp,
    channels: &[String],
    paths: &WorkspacePaths,
    archive: &mut DownloadArchive,
    progress: Option<&ProgressWriter>,
) -> Result<PassSummary> {
    let mut summary = PassSummary::default();
    let total = channels.len();

    for (index, channel) in channels.iter().enumerate() {
        let current = index + 1;
        let percent = ((index * 100) / total.max(1)) as u8;
        update_progress(
            progress,
            percent,
            &format!("Listing channel {current}/{total}"),
        );
        info!(channel = %channel, "[{current}/{total}] listing channel");

        let ids = match yt_dlp.list_video_ids(channel) {
            Ok(ids) => ids,
            Err(err) => {
                warn!(channel = %channel, "skipping channel: {err:#}");
                summary.failed_channels += 1;
                continue;
            }
        };
        summary.channels += 1;

        for video_id in &ids {
            if archive.contains(video_id) {
                debug!(video_id = %video_id, "already archived");
                summary.skipped += 1;
                continue;
            }

            info!(video_id = %video_id, "downloading");
            update_progress(
                progress,
                percent,
                &format!("Channel {current}/{total}: downloading {video_id}"),
            );
            match yt_dlp.download_video(video_id, paths) {
                Ok(()) => {
                    archive.record(video_id)?;
                    summary.downloaded += 1;
                }
                Err(err) => {
                    warn!(video_id = %video_id, "download failed: {err:#}");
                    summary.failed += 1;
                }
            }
        }
    }

    update_progress(progress, 100, "Download pass complete");
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use std::path::Path;
    use tempfile::tempdir;

    fn temp_paths(base: &Path) -> WorkspacePaths {
        let mut paths =
            WorkspacePaths::with_roots(&base.join("yt-dlp"), &base.join("tmp_metadata"));
        paths.channels = base.join("channels.txt");
        paths.cookies = base.join("cookies.txt");
        paths
    }

    #[cfg(unix)]
    fn install_ytdlp_stub(dir: &Path) -> Result<PathBuf> {
        use std::os::unix::fs::PermissionsExt;

        let bin_dir = dir.join("bin");
        fs::create_dir_all(&bin_dir)?;
        let script_path = bin_dir.join("yt-dlp");
        let log_path = dir.join("calls.log");
        let script = format!(
            r#"#!/usr/bin/env bash
set -eu
echo "$*" >> "{log}"
for arg in "$@"; do
  case "$arg" in
    --version)
      echo "2024.01.01"
      exit 0
      ;;
    --flat-playlist)
      last="${{@: -1}}"
      if [[ "$last" == *broken* ]]; then
        exit 2
      fi
      printf 'alpha\n\nbeta\ngamma\n'
      exit 0
      ;;
    *watch?v=beta)
      exit 1
      ;;
  esac
done
exit 0
"#,
            log = log_path.display()
        );
        fs::write(&script_path, script)?;
        let mut perms = fs::metadata(&script_path)?.permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&script_path, perms)?;
        Ok(script_path)
    }

    #[test]
    fn channel_videos_url_expands_handles() {
        assert_eq!(
            channel_videos_url(" @someone "),
            "https://www.youtube.com/@someone/videos"
        );
        assert_eq!(
            channel_videos_url("https://www.youtube.com/c/Example"),
            "https://www.youtube.com/c/Example"
        );
    }

    #[test]
    fn progress_writer_writes_json() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("nested").join("progress.json");
        ProgressWriter::new(path.clone()).write(150, "almost");

        let value: Value = serde_json::from_str(&fs::read_to_string(&path)?)?;
        assert_eq!(value["progress"], 100);
        assert_eq!(value["message"], "almost");
        assert!(value["updatedAt"].as_str().is_some());
        Ok(())
    }

    #[test]
    fn ensure_available_reports_missing_program() -> Result<()> {
        let dir = tempdir()?;
        let err = YtDlp::new(dir.path().join("missing-yt-dlp"))
            .ensure_available()
            .unwrap_err();
        assert!(err.to_string().contains("not installed"));
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn list_video_ids_drops_blank_lines() -> Result<()> {
        let dir = tempdir()?;
        let yt_dlp = YtDlp::new(install_ytdlp_stub(dir.path())?);
        yt_dlp.ensure_available()?;
        let ids = yt_dlp.list_video_ids("@someone")?;
        assert_eq!(ids, vec!["alpha", "beta", "gamma"]);
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn run_pass_skips_archived_and_records_new_ids() -> Result<()> {
        let dir = tempdir()?;
        let yt_dlp = YtDlp::new(install_ytdlp_stub(dir.path())?);
        let paths = temp_paths(dir.path());
        paths.prepare()?;
        fs::write(&paths.archive, "youtube alpha\n")?;
        fs::write(&paths.cookies, "# Netscape HTTP Cookie File\n")?;

        let mut archive = DownloadArchive::load(&paths.archive)?;
        let progress_path = dir.path().join("progress.json");
        let progress = ProgressWriter::new(progress_path.clone());
        let channels = vec![
            "@someone".to_string(),
            "https://example.com/broken".to_string(),
        ];

        let summary = run_pass(&yt_dlp, &channels, &paths, &mut archive, Some(&progress))?;
        assert_eq!(
            summary,
            PassSummary {
                channels: 1,
                downloaded: 1,
                skipped: 1,
                failed: 1,
                failed_channels: 1,
            }
        );

        assert!(archive.contains("gamma"));
        assert!(!archive.contains("beta"));
        assert_eq!(
            fs::read_to_string(&paths.archive)?,
            "youtube alpha\nyoutube gamma\n"
        );

        let calls = fs::read_to_string(dir.path().join("calls.log"))?;
        let gamma_call = calls
            .lines()
            .find(|line| line.ends_with("watch?v=gamma"))
            .expect("gamma download invoked");
        assert!(gamma_call.contains("--cookies"));
        assert!(gamma_call.contains("infojson:"));
        assert!(!calls.contains("watch?v=alpha"));

        let report: Value = serde_json::from_str(&fs::read_to_string(&progress_path)?)?;
        assert_eq!(report["progress"], 100);
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn run_pass_with_full_archive_downloads_nothing() -> Result<()> {
        let dir = tempdir()?;
        let yt_dlp = YtDlp::new(install_ytdlp_stub(dir.path())?);
        let paths = temp_paths(dir.path());
        paths.prepare()?;
        fs::write(
            &paths.archive,
            "youtube alpha\nyoutube beta\nyoutube gamma\n",
        )?;

        let mut archive = DownloadArchive::load(&paths.archive)?;
        let summary = run_pass(
            &yt_dlp,
            &["@someone".to_string()],
            &paths,
            &mut archive,
            None,
        )?;
        assert_eq!(summary.downloaded, 0);
        assert_eq!(summary.skipped, 3);
        assert_eq!(summary.failed, 0);
        let calls = fs::read_to_string(dir.path().join("calls.log"))?;
        assert!(!calls.contains("watch?v="));
        assert_eq!(archive.len(), 3);
        Ok(())
    }
}
