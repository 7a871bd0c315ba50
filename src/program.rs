use chrono::{DateTime, FixedOffset, NaiveDate, TimeDelta, Timelike, Utc};

/// Broadcasts starting before this hour belong to the previous programming day.
const DAY_ROLLOVER_HOUR: u32 = 5;

/// The schedule entry that is on air right now, resolved against the feed.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    /// Base name of the recorded file, `<capture start>-<station>`.
    pub id: String,
    pub station: String,
    pub title: String,
    pub from: DateTime<FixedOffset>,
    pub to: DateTime<FixedOffset>,
    /// Nominal slot length in seconds.
    pub duration: i64,
    pub info: String,
}

impl Program {
    pub fn new(
        id: String,
        station: String,
        title: String,
        from: DateTime<FixedOffset>,
        to: DateTime<FixedOffset>,
        info: String,
    ) -> Self {
        let duration = (to - from).num_seconds();

        Self {
            id,
            station,
            title,
            from,
            to,
            duration,
            info,
        }
    }

    /// Calendar day the broadcast is attributed to. Slots starting in the small
    /// hours count towards the day before.
    pub fn effective_date(&self) -> NaiveDate {
        let start = if self.from.hour() < DAY_ROLLOVER_HOUR {
            self.from - TimeDelta::days(1)
        } else {
            self.from
        };

        start.date_naive()
    }

    /// Seconds left until the slot ends, measured now.
    pub fn recording_duration(&self) -> i64 {
        self.recording_duration_at(Utc::now())
    }

    /// Seconds left until the slot ends, measured at `now`. Negative once the slot is over.
    pub fn recording_duration_at(&self, now: DateTime<Utc>) -> i64 {
        self.to.signed_duration_since(now).num_seconds()
    }
}
