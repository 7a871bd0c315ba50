use std::fmt;
use std::path::Path;

use chrono::Datelike;

use crate::program::Program;
use crate::station::StationProfile;

pub const CAPTURE_PROGRAM: &str = "rtmpdump";
pub const TRANSCODE_PROGRAM: &str = "ffmpeg";

const PLAYER_URL: &str = "http://www3.nhk.or.jp/netradio/files/swf/rtmpe.swf";
const AUTHOR: &str = "NHK";
const GENRE: &str = "Radio";
const SAMPLE_RATE: u32 = 44100;
const CHANNELS: u32 = 2;

/// A program name and its argument list, ready to spawn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
}

impl Invocation {
    fn new(program: &str) -> Self {
        Self {
            program: program.to_string(),
            args: Vec::new(),
        }
    }

    fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    fn metadata(self, key: &str, value: impl fmt::Display) -> Self {
        self.arg("-metadata").arg(format!("{key}={value}"))
    }
}

impl fmt::Display for Invocation {
    /// Shell-ish rendering for logs and dry runs.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(|c: char| c.is_whitespace() || c == '\'') {
                write!(f, " '{}'", arg.replace('\'', r"'\''"))?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}

pub fn stream_url(profile: &StationProfile) -> String {
    format!("rtmpe://netradio-{}-flash.nhk.jp", profile.stream_channel)
}

/// Live capture of the station stream to stdout, stopping after `duration` seconds.
pub fn capture(profile: &StationProfile, duration: i64) -> Invocation {
    Invocation::new(CAPTURE_PROGRAM)
        .arg("--live")
        .arg("--quiet")
        .arg("-r")
        .arg(stream_url(profile))
        .arg("--playpath")
        .arg(profile.stream_application_path)
        .arg("--app")
        .arg("live")
        .arg("-W")
        .arg(PLAYER_URL)
        .arg("--stop")
        .arg(duration.to_string())
        .arg("-o")
        .arg("-")
}

/// Transcode stdin to a tagged mp3 at `output`, stopping after `duration` seconds.
pub fn transcode(program: &Program, bitrate: &str, duration: i64, output: &Path) -> Invocation {
    let date = program.effective_date();

    Invocation::new(TRANSCODE_PROGRAM)
        .arg("-y")
        .arg("-i")
        .arg("-")
        .arg("-vn")
        .arg("-loglevel")
        .arg("error")
        .metadata("author", AUTHOR)
        .metadata("artist", &program.station)
        .metadata("title", format!("{} {}", program.title, date.format("%Y-%m-%d")))
        .metadata("album", &program.title)
        .metadata("genre", GENRE)
        .metadata("year", date.year())
        .arg("-acodec")
        .arg("libmp3lame")
        .arg("-ar")
        .arg(SAMPLE_RATE.to_string())
        .arg("-ab")
        .arg(bitrate)
        .arg("-ac")
        .arg(CHANNELS.to_string())
        .arg("-id3v2_version")
        .arg("3")
        .arg("-t")
        .arg(duration.to_string())
        .arg(output.to_string_lossy())
}

/// `sh -c <script>`, for driving the pipeline with stand-in processes.
#[cfg(test)]
pub(crate) fn shell(script: impl Into<String>) -> Invocation {
    Invocation::new("sh").arg("-c").arg(script)
}
