use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

/// Everything that can stop a rip from producing a published file.
#[derive(Debug, Error)]
pub enum Error {
    #[error("unknown station {0:?}")]
    UnknownStation(String),

    #[error("failed to fetch schedule: {0}")]
    FetchFailed(#[from] FetchError),

    #[error("failed to parse schedule: {0}")]
    ParseFailed(String),

    #[error("nothing on air for channel {match_id:?}")]
    NotFound { match_id: String },

    #[error("recording failed: {0}")]
    RecordingFailed(#[from] RecordingError),

    #[error("failed to publish {} to {}: {source}", .temp.display(), .dest.display())]
    PublishFailed {
        temp: PathBuf,
        dest: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Exit code reported by the binary for this failure.
    pub fn exit_code(&self) -> u8 {
        match self {
            Error::UnknownStation(_) => 2,
            Error::RecordingFailed(RecordingError::Cancelled) => 130,
            _ => 1,
        }
    }
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} answered with status {status}")]
    Status { url: String, status: u16 },

    #[error("async runtime unavailable: {0}")]
    Runtime(String),
}

#[derive(Debug, Error)]
pub enum RecordingError {
    #[error("schedule slot already over (computed duration {duration}s)")]
    Expired { duration: i64 },

    #[error("recording interrupted by user")]
    Cancelled,

    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to connect capture output to transcoder: {0}")]
    Pipe(#[source] std::io::Error),

    #[error("failed waiting for {program}: {source}")]
    Wait {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {status}")]
    Exited { program: String, status: ExitStatus },

    #[error("no output produced at {}", .0.display())]
    MissingOutput(PathBuf),
}

pub type Result<T> = std::result::Result<T, Error>;
