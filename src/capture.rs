use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::cache::CacheDir;
use crate::capture::command::Invocation;
use crate::capture::interrupt::InterruptGuard;
use crate::config::Config;
use crate::error::{Error, RecordingError, Result};
use crate::program::Program;
use crate::station::StationProfile;

pub mod command;
pub mod interrupt;
pub mod process;

pub const OUTPUT_EXTENSION: &str = "mp3";

/// Something that can turn a [CapturePlan] into a file at `plan.temp_path`.
pub trait Recorder {
    /// Block until the recording is complete, or until `cancel` fires.
    fn record(
        &self,
        plan: &CapturePlan,
        cancel: &CancellationToken,
    ) -> std::result::Result<(), RecordingError>;
}

/// Everything needed to record one program.
#[derive(Debug, Clone, PartialEq)]
pub struct CapturePlan {
    /// Seconds to record, buffer included. Always positive.
    pub duration: i64,
    pub temp_path: PathBuf,
    pub capture: Invocation,
    pub transcode: Invocation,
}

/// Drives a single recording from plan to published file.
pub struct Session<R: Recorder> {
    recorder: R,
    scratch: CacheDir,
    out: CacheDir,
    buffer_seconds: i64,
    bitrate: String,
}

impl<R: Recorder> Session<R> {
    pub fn new(recorder: R, config: &Config) -> Self {
        Self {
            recorder,
            scratch: CacheDir::new(&config.scratch_dir),
            out: CacheDir::new(&config.out_dir),
            buffer_seconds: config.buffer_seconds,
            bitrate: config.bitrate.clone(),
        }
    }

    /// Work out what would be run for `program` without running anything.
    pub fn plan(&mut self, profile: &StationProfile, program: &Program) -> Result<CapturePlan> {
        let duration = program.recording_duration() + self.buffer_seconds;
        if duration <= 0 {
            return Err(RecordingError::Expired { duration }.into());
        }

        let temp_path = self.scratch.path(&file_name(program)).to_path_buf();

        Ok(CapturePlan {
            duration,
            capture: command::capture(profile, duration),
            transcode: command::transcode(program, &self.bitrate, duration, &temp_path),
            temp_path,
        })
    }

    /// Destination a finished recording of `program` is published to.
    pub fn destination(&mut self, program: &Program) -> PathBuf {
        self.out.path(&file_name(program)).to_path_buf()
    }

    /// Record `program` and publish it. Ctrl-C during the recording cancels it.
    pub fn run(&mut self, profile: &StationProfile, program: &Program) -> Result<PathBuf> {
        let plan = self.plan(profile, program)?;
        self.run_planned(plan, program)
    }

    /// Run an already built plan, treating Ctrl-C during the recording as a
    /// cancellation. The interrupt handler only lives while the recording does.
    pub fn run_planned(&mut self, plan: CapturePlan, program: &Program) -> Result<PathBuf> {
        let cancel = CancellationToken::new();
        let interrupts = InterruptGuard::install(cancel.clone());

        let recorded = self.record(&plan, program, &cancel);
        // The children may have died from the same Ctrl-C before the watcher ran.
        interrupts.settle();
        drop(interrupts);

        self.finish(plan, program, recorded, &cancel)
    }

    /// Record `program` and publish it, giving up if `cancel` fires.
    ///
    /// A cancelled recording is never published. Whatever was written so far
    /// stays in the scratch directory.
    pub fn run_until(
        &mut self,
        profile: &StationProfile,
        program: &Program,
        cancel: &CancellationToken,
    ) -> Result<PathBuf> {
        let plan = self.plan(profile, program)?;
        let recorded = self.record(&plan, program, cancel);
        self.finish(plan, program, recorded, cancel)
    }

    #[instrument(skip_all, fields(id = %program.id))]
    fn record(
        &self,
        plan: &CapturePlan,
        program: &Program,
        cancel: &CancellationToken,
    ) -> std::result::Result<(), RecordingError> {
        println!(
            "Streaming {} ~ {} ({}s)",
            program.title,
            program.to.format("%H:%M"),
            plan.duration
        );
        println!("Ripping audio file to {}", plan.temp_path.display());
        info!(capture = %plan.capture, transcode = %plan.transcode, "starting recording");

        self.recorder.record(plan, cancel)
    }

    fn finish(
        &mut self,
        plan: CapturePlan,
        program: &Program,
        recorded: std::result::Result<(), RecordingError>,
        cancel: &CancellationToken,
    ) -> Result<PathBuf> {
        let failure = if cancel.is_cancelled() {
            Some(RecordingError::Cancelled)
        } else {
            recorded.err()
        };
        if let Some(e) = failure {
            if plan.temp_path.exists() {
                warn!(path = %plan.temp_path.display(), "partial recording left in scratch directory");
            }
            return Err(e.into());
        }
        if !plan.temp_path.is_file() {
            return Err(RecordingError::MissingOutput(plan.temp_path).into());
        }

        let dest = self.destination(program);
        publish(&plan.temp_path, &dest)?;
        info!(path = %dest.display(), "published recording");

        Ok(dest)
    }
}

fn file_name(program: &Program) -> String {
    format!("{}.{}", program.id, OUTPUT_EXTENSION)
}

/// Move `temp` to `dest` so that `dest` only ever names a complete file.
///
/// The temp file stays put if anything fails.
pub fn publish(temp: &Path, dest: &Path) -> Result<()> {
    let publish_error = |source| Error::PublishFailed {
        temp: temp.to_path_buf(),
        dest: dest.to_path_buf(),
        source,
    };

    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(publish_error)?;
    }

    match fs::rename(temp, dest) {
        Ok(()) => Ok(()),
        Err(e) => {
            // Most likely scratch and destination are on different filesystems.
            warn!(error = %e, "rename failed, staging a copy next to the destination");
            stage_and_rename(temp, dest).map_err(publish_error)?;
            if let Err(e) = fs::remove_file(temp) {
                warn!(error = %e, path = %temp.display(), "could not remove scratch file");
            }
            Ok(())
        }
    }
}

fn stage_and_rename(temp: &Path, dest: &Path) -> io::Result<()> {
    let name = dest
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "destination has no file name"))?;
    let staging = dest.with_file_name(format!(".{}.part", name.to_string_lossy()));

    let result = fs::copy(temp, &staging).and_then(|_| fs::rename(&staging, dest));
    if result.is_err() {
        let _ = fs::remove_file(&staging);
    }
    result
}
