#![forbid(unsafe_code)]

//! Reader and writer for the yt-dlp download archive.
//!
//! The archive is the plain text file yt-dlp maintains with
//! `--download-archive`: one `<extractor> <identifier>` pair per line, e.g.
//! `youtube abc123`. Loading it up front lets a download pass skip media
//! that was already fetched by an earlier run.

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Extractor name written in front of every identifier we append.
pub const DEFAULT_EXTRACTOR: &str = "youtube";

/// Extracts the identifier from a single archive line.
///
/// Lines are `<extractor> <identifier>` separated by any run of whitespace;
/// when more fields are present the last one wins. Blank lines, `#` comments
/// and single-field lines return `None`.
pub fn parse_identifier(line: &str) -> Option<&str> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return None;
    }

    let mut fields = trimmed.split_whitespace();
    fields.next()?;
    fields.last()
}

/// Reads every identifier from the archive at `path`.
///
/// A missing file is not an error: the caller simply starts with an empty
/// set. Every other I/O failure is returned with the path attached.
pub fn load_known_ids(path: &Path) -> Result<HashSet<String>> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            info!(path = %path.display(), "archive file not found, starting fresh");
            return Ok(HashSet::new());
        }
        Err(err) => {
            return Err(err).with_context(|| format!("opening archive {}", path.display()));
        }
    };

    info!(path = %path.display(), "loading archive file");
    let reader = BufReader::new(file);
    let mut ids = HashSet::new();
    let mut skipped = 0usize;

    for (line, line_no) in reader.lines().zip(1usize..) {
        let line = line.with_context(|| format!("reading {} line {line_no}", path.display()))?;
        match parse_identifier(&line) {
            Some(id) => {
                ids.insert(id.to_owned());
            }
            None => skipped += 1,
        }
    }

    if skipped > 0 {
        debug!(path = %path.display(), skipped, "ignored archive lines without an identifier");
    }
    debug!(count = ids.len(), "loaded video ids from archive");
    Ok(ids)
}

/// Appends a single `<extractor> <identifier>` line, creating the file when
/// needed. A last line without a trailing newline is terminated first so the
/// new entry never merges into it.
pub fn append_to_archive(path: &Path, extractor: &str, video_id: &str) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .read(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening archive {}", path.display()))?;

    let unterminated = ends_without_newline(&mut file)
        .with_context(|| format!("inspecting archive {}", path.display()))?;
    if unterminated {
        writeln!(file).with_context(|| format!("terminating last line of {}", path.display()))?;
    }
    writeln!(file, "{extractor} {video_id}")
        .with_context(|| format!("writing archive entry for {video_id}"))?;
    Ok(())
}

fn ends_without_newline(file: &mut File) -> io::Result<bool> {
    if file.metadata()?.len() == 0 {
        return Ok(false);
    }
    file.seek(SeekFrom::End(-1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] != b'\n')
}

/// In-memory view of the archive paired with the file that backs it.
#[derive(Debug, Clone)]
pub struct DownloadArchive {
    path: PathBuf,
    ids: HashSet<String>,
}

impl DownloadArchive {
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let ids = load_known_ids(&path)?;
        Ok(Self { path, ids })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn contains(&self, video_id: &str) -> bool {
        self.ids.contains(video_id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ids(&self) -> &HashSet<String> {
        &self.ids
    }

    pub fn into_ids(self) -> HashSet<String> {
        self.ids
    }

    /// Persists a freshly downloaded id. Returns `false` when the id was
    /// already known, in which case the file is left untouched.
    pub fn record(&mut self, video_id: &str) -> Result<bool> {
        if self.ids.contains(video_id) {
            return Ok(false);
        }
        append_to_archive(&self.path, DEFAULT_EXTRACTOR, video_id)?;
        self.ids.insert(video_id.to_owned());
        Ok(true)
    }
}
