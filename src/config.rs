use std::path::PathBuf;

use crate::schedule::DEFAULT_SCHEDULE_URL;

pub const DEFAULT_BUFFER_SECONDS: i64 = 60;
pub const DEFAULT_BITRATE: &str = "48k";
pub const DEFAULT_FETCH_ATTEMPTS: u32 = 3;

/// Settings for one rip, built once at startup and handed down.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Where the recording is written while it is in progress.
    pub scratch_dir: PathBuf,
    /// Padding added to the remaining slot time, also folded into the program id.
    pub buffer_seconds: i64,
    /// Where finished recordings are published.
    pub out_dir: PathBuf,
    /// Target encode bitrate, in ffmpeg notation (`48k`).
    pub bitrate: String,
    pub schedule_url: String,
    pub fetch_attempts: u32,
}

impl Config {
    pub fn default_out_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("Music")
            .join("Radiru")
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            scratch_dir: std::env::temp_dir(),
            buffer_seconds: DEFAULT_BUFFER_SECONDS,
            out_dir: Self::default_out_dir(),
            bitrate: DEFAULT_BITRATE.to_string(),
            schedule_url: DEFAULT_SCHEDULE_URL.to_string(),
            fetch_attempts: DEFAULT_FETCH_ATTEMPTS,
        }
    }
}
