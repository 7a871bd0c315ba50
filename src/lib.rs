pub mod cache;
pub mod capture;
pub mod config;
pub mod error;
pub mod program;
pub mod schedule;
pub mod station;

mod sync;

use std::path::PathBuf;

use chrono::Utc;

use crate::capture::process::ProcessRecorder;
use crate::capture::{Recorder, Session};
use crate::config::Config;
use crate::error::Result;
use crate::program::Program;
use crate::schedule::fetch::{Fetch, HttpFetcher};
use crate::schedule::ScheduleLookup;
use crate::station::StationProfile;

/// Find what is on air for `station` right now, using the live schedule feed.
pub fn now_playing(config: &Config, station: &str) -> Result<(&'static StationProfile, Program)> {
    let fetcher = HttpFetcher::new(config.fetch_attempts);
    now_playing_with(fetcher, config, station)
}

pub fn now_playing_with<F: Fetch>(
    fetcher: F,
    config: &Config,
    station: &str,
) -> Result<(&'static StationProfile, Program)> {
    let profile = station::resolve(station)?;
    let lookup = ScheduleLookup::new(fetcher, config.schedule_url.as_str(), config.buffer_seconds);
    let program = lookup.find_current_program(profile, Utc::now())?;

    Ok((profile, program))
}

/// Record whatever is on air for `station` until the slot ends and publish it.
pub fn rip(config: &Config, station: &str) -> Result<PathBuf> {
    let (profile, program) = now_playing(config, station)?;
    let mut session = Session::new(ProcessRecorder, config);
    session.run(profile, &program)
}

/// [rip] with caller-supplied collaborators.
pub fn rip_with<F: Fetch, R: Recorder>(
    fetcher: F,
    recorder: R,
    config: &Config,
    station: &str,
) -> Result<PathBuf> {
    let (profile, program) = now_playing_with(fetcher, config, station)?;
    let mut session = Session::new(recorder, config);
    session.run(profile, &program)
}
