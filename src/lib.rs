#![forbid(unsafe_code)]

//! Shared building blocks for the yt-dlp archive helper binaries.

pub mod archive;
pub mod channels;
pub mod config;
pub mod cookies;
pub mod downloader;
pub mod logging;
pub mod security;
pub mod workspace;
