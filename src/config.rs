#![forbid(unsafe_code)]

use anyhow::{Context, Result};
use std::{
    collections::HashMap,
    env, fs,
    path::{Path, PathBuf},
};

pub const DEFAULT_ENV_PATH: &str = ".env";
pub const DEFAULT_DOWNLOAD_ROOT: &str = "yt-dlp";
pub const DEFAULT_METADATA_ROOT: &str = "tmp_metadata";
pub const DEFAULT_ARCHIVE_NAME: &str = "downloaded_archive.txt";
pub const DEFAULT_CHANNELS_FILE: &str = "channels.txt";
pub const DEFAULT_COOKIES_FILE: &str = "cookies.txt";

const DOWNLOAD_ROOT_KEY: &str = "YTARCHIVE_DOWNLOAD_ROOT";
const METADATA_ROOT_KEY: &str = "YTARCHIVE_METADATA_ROOT";
const ARCHIVE_FILE_KEY: &str = "YTARCHIVE_ARCHIVE_FILE";
const CHANNELS_FILE_KEY: &str = "YTARCHIVE_CHANNELS_FILE";
const COOKIES_FILE_KEY: &str = "YTARCHIVE_COOKIES_FILE";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimePaths {
    pub download_root: PathBuf,
    pub metadata_root: PathBuf,
    pub archive_file: PathBuf,
    pub channels_file: PathBuf,
    pub cookies_file: PathBuf,
}

#[derive(Debug, Clone, Default)]
pub struct RuntimeOverrides {
    pub download_root: Option<PathBuf>,
    pub metadata_root: Option<PathBuf>,
    pub archive_file: Option<PathBuf>,
    pub channels_file: Option<PathBuf>,
    pub cookies_file: Option<PathBuf>,
    pub env_path: Option<PathBuf>,
}

/// Resolves every path from CLI overrides, then the process environment,
/// then the `.env` file, and finally the built-in defaults.
pub fn resolve_runtime_paths(overrides: RuntimeOverrides) -> Result<RuntimePaths> {
    let env_path = overrides
        .env_path
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_ENV_PATH));
    let file_vars = read_env_file(&env_path)?;
    Ok(build_runtime_paths_with_overrides(
        &file_vars,
        env_var_string,
        overrides,
    ))
}

#[cfg(test)]
fn build_runtime_paths(
    file_vars: &HashMap<String, String>,
    env_lookup: impl Fn(&str) -> Option<String>,
) -> RuntimePaths {
    build_runtime_paths_with_overrides(file_vars, env_lookup, RuntimeOverrides::default())
}

fn build_runtime_paths_with_overrides(
    file_vars: &HashMap<String, String>,
    env_lookup: impl Fn(&str) -> Option<String>,
    overrides: RuntimeOverrides,
) -> RuntimePaths {
    let resolve = |value: Option<PathBuf>, key: &str| {
        value
            .filter(|path| !path.as_os_str().is_empty())
            .or_else(|| lookup_value(key, file_vars, &env_lookup).map(PathBuf::from))
    };

    let download_root = resolve(overrides.download_root, DOWNLOAD_ROOT_KEY)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DOWNLOAD_ROOT));
    let metadata_root = resolve(overrides.metadata_root, METADATA_ROOT_KEY)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_METADATA_ROOT));
    // The archive lives inside the download root unless pointed elsewhere.
    let archive_file = resolve(overrides.archive_file, ARCHIVE_FILE_KEY)
        .unwrap_or_else(|| download_root.join(DEFAULT_ARCHIVE_NAME));
    let channels_file = resolve(overrides.channels_file, CHANNELS_FILE_KEY)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CHANNELS_FILE));
    let cookies_file = resolve(overrides.cookies_file, COOKIES_FILE_KEY)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_COOKIES_FILE));

    RuntimePaths {
        download_root,
        metadata_root,
        archive_file,
        channels_file,
        cookies_file,
    }
}

fn env_var_string(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|value| non_blank(&value))
}

fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn lookup_value(
    key: &str,
    file_vars: &HashMap<String, String>,
    env_lookup: &impl Fn(&str) -> Option<String>,
) -> Option<String> {
    env_lookup(key).or_else(|| file_vars.get(key).and_then(|value| non_blank(value)))
}

pub fn read_env_file(path: &Path) -> Result<HashMap<String, String>> {
    let mut vars = HashMap::new();
    if !path.exists() {
        return Ok(vars);
    }
    let content =
        fs::read_to_string(path).with_context(|| format!("Reading {}", path.display()))?;
    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let line = trimmed.strip_prefix("export ").unwrap_or(trimmed);
        let Some((key, value_raw)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        let value = value_raw.trim();
        let value = value
            .strip_prefix('"')
            .and_then(|value| value.strip_suffix('"'))
            .or_else(|| {
                value
                    .strip_prefix('\'')
                    .and_then(|value| value.strip_suffix('\''))
            })
            .unwrap_or(value);
        vars.insert(key.to_string(), value.to_string());
    }
    Ok(vars)
}
