use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeDelta, TimeZone, Utc};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::program::Program;
use crate::schedule::feed::{FeedItem, Items};
use crate::schedule::fetch::Fetch;
use crate::station::StationProfile;

pub mod feed;
pub mod fetch;

pub const DEFAULT_SCHEDULE_URL: &str = "http://www2.nhk.or.jp/hensei/api/noa.cgi?c=3&wide=1&mode=json";

/// Index value the feed uses for the slot that is currently on air.
const ON_AIR_INDEX: &str = "0";

const FEED_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const ID_TIME_FORMAT: &str = "%Y%m%d%H%M%S";

/// Offset of the wall-clock times in the feed, in seconds east of UTC (JST).
const FEED_OFFSET_SECONDS: i32 = 9 * 3600;

pub fn feed_offset() -> Result<FixedOffset> {
    FixedOffset::east_opt(FEED_OFFSET_SECONDS)
        .ok_or_else(|| Error::ParseFailed(format!("invalid feed offset {FEED_OFFSET_SECONDS}s")))
}

/// Finds the program currently on air for a station.
pub struct ScheduleLookup<F: Fetch> {
    fetcher: F,
    url: String,
    buffer_seconds: i64,
}

impl<F: Fetch> ScheduleLookup<F> {
    pub fn new(fetcher: F, url: impl Into<String>, buffer_seconds: i64) -> Self {
        Self {
            fetcher,
            url: url.into(),
            buffer_seconds,
        }
    }

    pub fn find_current_program(
        &self,
        profile: &StationProfile,
        now: DateTime<Utc>,
    ) -> Result<Program> {
        let document = self.fetcher.fetch(&self.url)?;
        debug!(bytes = document.len(), url = %self.url, "fetched schedule");

        let item = find_on_air(&document, profile.match_id)?;
        let program = build_program(item, profile, now, self.buffer_seconds)?;

        info!(
            id = %program.id,
            title = %program.title,
            from = %program.from,
            to = %program.to,
            "found program on air"
        );

        Ok(program)
    }
}

/// First item, in document order, for `match_id` with the on-air index.
fn find_on_air(document: &[u8], match_id: &str) -> Result<FeedItem> {
    for item in Items::new(document) {
        let item = item?;
        if item.ch.as_deref() == Some(match_id) && item.index.as_deref() == Some(ON_AIR_INDEX) {
            return Ok(item);
        }
    }

    Err(Error::NotFound {
        match_id: match_id.to_string(),
    })
}

fn build_program(
    item: FeedItem,
    profile: &StationProfile,
    now: DateTime<Utc>,
    buffer_seconds: i64,
) -> Result<Program> {
    let from = parse_feed_time(&required(item.starttime, "starttime")?)?;
    let to = parse_feed_time(&required(item.endtime, "endtime")?)?;
    let title = required(item.title, "title")?;
    let info = item.link.unwrap_or_default();

    let start_time = (now + TimeDelta::seconds(buffer_seconds)).with_timezone(&feed_offset()?);
    let id = format!("{}-{}", start_time.format(ID_TIME_FORMAT), profile.code);

    Ok(Program::new(
        id,
        profile.code.to_string(),
        title,
        from,
        to,
        info,
    ))
}

fn required(value: Option<String>, name: &str) -> Result<String> {
    value.ok_or_else(|| Error::ParseFailed(format!("on-air item is missing <{name}>")))
}

/// Parse a feed timestamp (`YYYY-MM-DD HH:MM:SS`, implicitly +09:00).
pub fn parse_feed_time(value: &str) -> Result<DateTime<FixedOffset>> {
    let naive = NaiveDateTime::parse_from_str(value.trim(), FEED_TIME_FORMAT)
        .map_err(|e| Error::ParseFailed(format!("bad time {value:?}: {e}")))?;

    feed_offset()?
        .from_local_datetime(&naive)
        .single()
        .ok_or_else(|| Error::ParseFailed(format!("bad time {value:?}")))
}

#[cfg(test)]
mod test {
    use std::cell::Cell;

    use bytes::Bytes;
    use chrono::{DateTime, Utc};

    use crate::error::{Error, FetchError};
    use crate::schedule::fetch::Fetch;
    use crate::schedule::{feed_offset, parse_feed_time, ScheduleLookup};
    use crate::station::resolve;

    struct StaticFeed {
        body: &'static str,
        calls: Cell<usize>,
    }

    impl StaticFeed {
        fn new(body: &'static str) -> Self {
            Self {
                body,
                calls: Cell::new(0),
            }
        }
    }

    impl Fetch for StaticFeed {
        fn fetch(&self, url: &str) -> Result<Bytes, FetchError> {
            assert_eq!(url, "http://feed.test/noa");
            self.calls.set(self.calls.get() + 1);
            Ok(Bytes::from_static(self.body.as_bytes()))
        }
    }

    struct DownFeed;

    impl Fetch for DownFeed {
        fn fetch(&self, url: &str) -> Result<Bytes, FetchError> {
            Err(FetchError::Status {
                url: url.to_string(),
                status: 503,
            })
        }
    }

    fn lookup<F: Fetch>(fetcher: F) -> ScheduleLookup<F> {
        ScheduleLookup::new(fetcher, "http://feed.test/noa", 60)
    }

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-03-01T10:30:00+09:00")
            .unwrap()
            .with_timezone(&Utc)
    }

    const MORNING: &str = r#"<list>
        <item>
          <ch>netr2</ch><index>0</index>
          <starttime>2024-03-01 10:00:00</starttime><endtime>2024-03-01 11:00:00</endtime>
          <title>Language Course</title><link>http://example.com/lang</link>
        </item>
        <item>
          <ch>netr1</ch><index>0</index>
          <starttime>2024-03-01 10:00:00</starttime><endtime>2024-03-01 12:00:00</endtime>
          <title>Morning Show</title><link>http://example.com/morning</link>
        </item>
        <item>
          <ch>netr1</ch><index>1</index>
          <starttime>2024-03-01 12:00:00</starttime><endtime>2024-03-01 12:15:00</endtime>
          <title>News</title><link>http://example.com/news</link>
        </item>
    </list>"#;

    #[test]
    pub fn test_find_current_program() {
        let feed = StaticFeed::new(MORNING);
        let profile = resolve("NHK1").unwrap();
        let program = lookup(feed).find_current_program(profile, now()).unwrap();

        assert_eq!(
            program.from,
            DateTime::parse_from_rfc3339("2024-03-01T10:00:00+09:00").unwrap()
        );
        assert_eq!(
            program.to,
            DateTime::parse_from_rfc3339("2024-03-01T12:00:00+09:00").unwrap()
        );
        assert_eq!(program.duration, 7200);
        assert_eq!(program.title, "Morning Show");
        assert_eq!(program.station, "NHK1");
        assert_eq!(program.info, "http://example.com/morning");
        // id carries the capture start (now + 60s buffer) in +09:00
        assert_eq!(program.id, "20240301103100-NHK1");
    }

    #[test]
    pub fn test_first_on_air_match_wins() {
        const FEED: &str = r#"<list>
            <item><ch>netfm</ch><index>1</index><title>Later</title>
              <starttime>2024-03-01 12:00:00</starttime><endtime>2024-03-01 13:00:00</endtime></item>
            <item><ch>netfm</ch><index>0</index><title>Now</title>
              <starttime>2024-03-01 10:00:00</starttime><endtime>2024-03-01 12:00:00</endtime></item>
            <item><ch>netfm</ch><index>0</index><title>Duplicate</title>
              <starttime>2024-03-01 10:00:00</starttime><endtime>2024-03-01 12:00:00</endtime></item>
        </list>"#;

        let profile = resolve("FM").unwrap();
        let program = lookup(StaticFeed::new(FEED))
            .find_current_program(profile, now())
            .unwrap();
        assert_eq!(program.title, "Now");
        assert_eq!(program.info, "");
    }

    #[test]
    pub fn test_short_circuit_ignores_trailing_garbage() {
        const FEED: &str = r#"<list>
            <item><ch>netr1</ch><index>0</index><title>Now</title>
              <starttime>2024-03-01 10:00:00</starttime><endtime>2024-03-01 12:00:00</endtime></item>
            <item><ch>broken</index>"#;

        let profile = resolve("NHK1").unwrap();
        let program = lookup(StaticFeed::new(FEED))
            .find_current_program(profile, now())
            .unwrap();
        assert_eq!(program.title, "Now");
    }

    #[test]
    pub fn test_not_found() {
        let feed = StaticFeed::new(MORNING);
        let profile = resolve("FM").unwrap();
        match lookup(feed).find_current_program(profile, now()) {
            Err(Error::NotFound { match_id }) => assert_eq!(match_id, "netfm"),
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[test]
    pub fn test_fetch_failed() {
        let profile = resolve("NHK1").unwrap();
        assert!(matches!(
            lookup(DownFeed).find_current_program(profile, now()),
            Err(Error::FetchFailed(FetchError::Status { status: 503, .. }))
        ));
    }

    #[test]
    pub fn test_parse_failed() {
        let profile = resolve("NHK1").unwrap();

        let broken = StaticFeed::new("<list><item><ch>netr1</ch></list>");
        assert!(matches!(
            lookup(broken).find_current_program(profile, now()),
            Err(Error::ParseFailed(_))
        ));

        let bad_time = StaticFeed::new(
            "<list><item><ch>netr1</ch><index>0</index><title>x</title>\
             <starttime>yesterday</starttime><endtime>2024-03-01 12:00:00</endtime></item></list>",
        );
        assert!(matches!(
            lookup(bad_time).find_current_program(profile, now()),
            Err(Error::ParseFailed(_))
        ));

        let no_end = StaticFeed::new(
            "<list><item><ch>netr1</ch><index>0</index><title>x</title>\
             <starttime>2024-03-01 10:00:00</starttime></item></list>",
        );
        assert!(matches!(
            lookup(no_end).find_current_program(profile, now()),
            Err(Error::ParseFailed(_))
        ));
    }

    #[test]
    pub fn test_fetches_once() {
        let feed = StaticFeed::new(MORNING);
        let profile = resolve("NHK2").unwrap();
        let lookup = lookup(feed);
        let program = lookup.find_current_program(profile, now()).unwrap();
        assert_eq!(program.title, "Language Course");
        assert_eq!(lookup.fetcher.calls.get(), 1);
    }

    #[test]
    pub fn test_feed_offset() {
        assert_eq!(feed_offset().unwrap().local_minus_utc(), 9 * 3600);
    }

    #[test]
    pub fn test_parse_feed_time() {
        let t = parse_feed_time("2024-03-01 02:00:00").unwrap();
        assert_eq!(t.to_rfc3339(), "2024-03-01T02:00:00+09:00");
        assert!(parse_feed_time("2024-03-01T02:00:00").is_err());
    }
}
