use std::fmt;

use crate::error::{Error, Result};

/// Addressing data for one station: how to find it in the schedule feed and how
/// to reach its live stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StationProfile {
    /// Station code given on the command line.
    pub code: &'static str,
    /// Value of the feed's `ch` field for this station.
    pub match_id: &'static str,
    /// Channel segment of the stream host name.
    pub stream_channel: &'static str,
    /// Play path passed to the stream server.
    pub stream_application_path: &'static str,
}

pub static STATIONS: [StationProfile; 3] = [
    StationProfile {
        code: "NHK1",
        match_id: "netr1",
        stream_channel: "r1",
        stream_application_path: "NetRadio_R1_flash@63346",
    },
    StationProfile {
        code: "NHK2",
        match_id: "netr2",
        stream_channel: "r2",
        stream_application_path: "NetRadio_R2_flash@63342",
    },
    StationProfile {
        code: "FM",
        match_id: "netfm",
        stream_channel: "fm",
        stream_application_path: "NetRadio_FM_flash@63343",
    },
];

/// Look up the profile for a station code. Matching is exact and case-sensitive.
pub fn resolve(code: &str) -> Result<&'static StationProfile> {
    STATIONS
        .iter()
        .find(|profile| profile.code == code)
        .ok_or_else(|| Error::UnknownStation(code.to_string()))
}

impl fmt::Display for StationProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code)
    }
}
