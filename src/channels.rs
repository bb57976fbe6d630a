#![forbid(unsafe_code)]

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::Path;
use tracing::info;

/// Reads the channel list: one URL or handle per line, `#` comments allowed.
/// Duplicates are dropped while keeping the first occurrence's position.
pub fn read_channels(path: &Path) -> Result<Vec<String>> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            return Err(err).with_context(|| {
                format!(
                    "channel list {} not found; add one channel URL per line",
                    path.display()
                )
            });
        }
        Err(err) => {
            return Err(err).with_context(|| format!("reading {}", path.display()));
        }
    };

    let channels = parse_channels(&content);
    info!(path = %path.display(), count = channels.len(), "loaded channel list");
    Ok(channels)
}

fn parse_channels(content: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter(|line| seen.insert(line.to_string()))
        .map(str::to_owned)
        .collect()
}
