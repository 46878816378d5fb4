//! Feed records and the typed events derived from them.
//!
//! An [`Event`] is built once per feed record and never mutated afterwards.
//! Rendering it into a timezone goes through [`Event::localize`], which
//! returns fresh values so the same event can be placed in any number of
//! calendars without one conversion leaking into another.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone};
use chrono_tz::Tz;
use serde::Deserialize;

use crate::category::Category;
use crate::error::{GoCalError, GoCalResult};
use crate::timezone::REFERENCE_TIMEZONE;

/// One record of the feed, exactly as delivered.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEvent {
    #[serde(rename = "eventID")]
    pub event_id: String,
    pub name: String,
    pub heading: String,
    pub event_type: String,
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
    pub link: String,
    pub image: String,
    #[serde(default)]
    pub extra_data: Option<serde_json::Value>,
}

/// A feed timestamp. Values without an offset are wall-clock times that
/// apply in whichever zone the event is viewed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timestamp {
    Fixed(DateTime<FixedOffset>),
    WallClock(NaiveDateTime),
}

const WALL_CLOCK_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

impl Timestamp {
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();

        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Some(Timestamp::Fixed(dt));
        }

        for format in WALL_CLOCK_FORMATS {
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
                return Some(Timestamp::WallClock(dt));
            }
        }

        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(Timestamp::WallClock)
    }

    /// This instant as seen in `tz`.
    pub fn in_timezone(&self, tz: Tz) -> DateTime<Tz> {
        match self {
            Timestamp::Fixed(dt) => dt.with_timezone(&tz),
            Timestamp::WallClock(naive) => wall_clock_in(tz, *naive),
        }
    }
}

/// Resolve a wall-clock time in `tz`. Ambiguous times take the earlier
/// instant; times skipped by a DST gap are pushed forward past the gap.
fn wall_clock_in(tz: Tz, naive: NaiveDateTime) -> DateTime<Tz> {
    let mut candidate = naive;
    loop {
        if let Some(dt) = tz.from_local_datetime(&candidate).earliest() {
            return dt;
        }
        candidate += chrono::Duration::minutes(30);
    }
}

/// An event's start and end in one specific timezone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalizedSpan {
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
}

/// A validated, classified feed event.
#[derive(Debug, Clone)]
pub struct Event {
    pub id: String,
    pub name: String,
    /// `[<acronym>] <name>`
    pub title: String,
    pub description: String,
    pub category: Category,
    pub link: String,
    pub image_url: String,
    /// Original feed strings, kept so the event can be re-localized.
    pub start_raw: String,
    pub end_raw: String,
    pub start: Timestamp,
    pub end: Timestamp,
    /// Whole days between start and end in the reference timezone.
    pub duration_days: i64,
    pub is_full_day: bool,
    pub extra_data: Option<serde_json::Value>,
}

impl Event {
    /// Build an event from a raw record. Returns `Ok(None)` when the
    /// record has no start or end date; the feed is known to omit them.
    pub fn from_raw(raw: RawEvent, index: usize) -> GoCalResult<Option<Self>> {
        let (Some(start_raw), Some(end_raw)) = (non_empty(raw.start), non_empty(raw.end)) else {
            return Ok(None);
        };

        let start = parse_timestamp(&start_raw, "start", index)?;
        let end = parse_timestamp(&end_raw, "end", index)?;

        let category = Category::new(&raw.event_type, &raw.heading);

        let reference_start = start.in_timezone(REFERENCE_TIMEZONE);
        let reference_end = end.in_timezone(REFERENCE_TIMEZONE);
        let duration_days = (reference_end - reference_start).num_days().abs();

        let title = format!("[{}] {}", category.acronym, raw.name);
        let description = format!(
            "Starts at {}, ends at {}.\n\n{}",
            reference_start.format("%H:%M"),
            reference_end.format("%H:%M"),
            raw.link
        );

        Ok(Some(Event {
            id: raw.event_id,
            name: raw.name,
            title,
            description,
            category,
            link: raw.link,
            image_url: raw.image,
            start_raw,
            end_raw,
            start,
            end,
            duration_days,
            is_full_day: duration_days > 1,
            extra_data: raw.extra_data,
        }))
    }

    /// Start and end of this event in `tz`. Pure: calling it for one zone
    /// has no effect on any other zone's result.
    pub fn localize(&self, tz: Tz) -> LocalizedSpan {
        LocalizedSpan {
            start: self.start.in_timezone(tz),
            end: self.end.in_timezone(tz),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

fn parse_timestamp(value: &str, field: &str, index: usize) -> GoCalResult<Timestamp> {
    Timestamp::parse(value).ok_or_else(|| GoCalError::InvalidRecord {
        index,
        reason: format!("unparseable {} timestamp '{}'", field, value),
    })
}

/// Result of parsing a whole feed.
#[derive(Debug, Clone, Default)]
pub struct ParsedFeed {
    pub events: Vec<Event>,
    /// Records dropped for lacking a start or end date, as (index, eventID).
    pub skipped: Vec<(usize, String)>,
}

/// Parse the feed body: a JSON array of records.
///
/// Malformed JSON or a record missing a required non-date field aborts the
/// whole parse; records without dates are skipped.
pub fn parse_feed(bytes: &[u8]) -> GoCalResult<ParsedFeed> {
    let records: Vec<serde_json::Value> = serde_json::from_slice(bytes)?;
    let mut parsed = ParsedFeed::default();

    for (index, record) in records.into_iter().enumerate() {
        let raw: RawEvent = serde_json::from_value(record).map_err(|e| GoCalError::InvalidRecord {
            index,
            reason: e.to_string(),
        })?;
        let event_id = raw.event_id.clone();

        match Event::from_raw(raw, index)? {
            Some(event) => parsed.events.push(event),
            None => {
                tracing::warn!(index, event_id = %event_id, "skipping event without start/end date");
                parsed.skipped.push((index, event_id));
            }
        }
    }

    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    fn make_raw_event(start: Option<&str>, end: Option<&str>) -> RawEvent {
        RawEvent {
            event_id: "raid-hour-20250305".to_string(),
            name: "Raid Hour".to_string(),
            heading: "Raid Battles".to_string(),
            event_type: "raid-battles".to_string(),
            start: start.map(String::from),
            end: end.map(String::from),
            link: "https://leekduck.com/events/raid-hour-20250305/".to_string(),
            image: "https://cdn.leekduck.com/raid-hour.jpg".to_string(),
            extra_data: None,
        }
    }

    #[test]
    fn test_from_raw_builds_title_and_description() {
        let raw = make_raw_event(Some("2025-03-05T18:00:00.000"), Some("2025-03-05T19:00:00.000"));
        let event = Event::from_raw(raw, 0).unwrap().unwrap();

        assert_eq!(event.title, "[RB] Raid Hour");
        assert_eq!(event.category.key, "raid_battles");
        assert_eq!(
            event.description,
            "Starts at 18:00, ends at 19:00.\n\nhttps://leekduck.com/events/raid-hour-20250305/"
        );
        assert_eq!(event.duration_days, 0);
        assert!(!event.is_full_day);
    }

    #[test]
    fn test_missing_dates_are_skipped_not_fatal() {
        for (start, end) in [
            (None, Some("2025-03-05T19:00:00.000")),
            (Some("2025-03-05T18:00:00.000"), None),
            (Some(""), Some("2025-03-05T19:00:00.000")),
            (None, None),
        ] {
            let raw = make_raw_event(start, end);
            assert!(Event::from_raw(raw, 0).unwrap().is_none());
        }
    }

    #[test]
    fn test_unparseable_date_is_a_record_error() {
        let raw = make_raw_event(Some("next tuesday"), Some("2025-03-05T19:00:00.000"));
        let result = Event::from_raw(raw, 4);
        assert!(matches!(result, Err(GoCalError::InvalidRecord { index: 4, .. })));
    }

    #[test]
    fn test_exactly_one_day_is_not_full_day() {
        let raw = make_raw_event(Some("2025-03-05T10:00:00.000"), Some("2025-03-06T10:00:00.000"));
        let event = Event::from_raw(raw, 0).unwrap().unwrap();
        assert_eq!(event.duration_days, 1);
        assert!(!event.is_full_day);
    }

    #[test]
    fn test_more_than_one_day_is_full_day() {
        let raw = make_raw_event(Some("2025-03-05T10:00:00.000"), Some("2025-03-07T20:00:00.000"));
        let event = Event::from_raw(raw, 0).unwrap().unwrap();
        assert_eq!(event.duration_days, 2);
        assert!(event.is_full_day);
    }

    #[test]
    fn test_timestamp_parses_feed_formats() {
        assert!(matches!(
            Timestamp::parse("2025-03-05T18:00:00.000"),
            Some(Timestamp::WallClock(_))
        ));
        assert!(matches!(
            Timestamp::parse("2025-03-05T18:00:00.000Z"),
            Some(Timestamp::Fixed(_))
        ));
        assert!(matches!(
            Timestamp::parse("2025-03-05T18:00:00+09:00"),
            Some(Timestamp::Fixed(_))
        ));
        assert!(matches!(Timestamp::parse("2025-03-05"), Some(Timestamp::WallClock(_))));
        assert_eq!(Timestamp::parse("soon"), None);
    }

    #[test]
    fn test_wall_clock_time_is_kept_in_every_zone() {
        let raw = make_raw_event(Some("2025-03-05T18:00:00.000"), Some("2025-03-05T19:00:00.000"));
        let event = Event::from_raw(raw, 0).unwrap().unwrap();

        for tz in [Tz::Europe__London, Tz::Asia__Tokyo, Tz::America__Los_Angeles] {
            let span = event.localize(tz);
            assert_eq!(span.start.hour(), 18, "wrong start hour in {}", tz.name());
            assert_eq!(span.end.hour(), 19, "wrong end hour in {}", tz.name());
        }
    }

    #[test]
    fn test_localizing_into_two_zones_does_not_leak_state() {
        let raw = make_raw_event(Some("2025-03-05T18:00:00.000Z"), Some("2025-03-05T19:00:00.000Z"));
        let event = Event::from_raw(raw, 0).unwrap().unwrap();

        let tokyo = event.localize(Tz::Asia__Tokyo);
        let london = event.localize(Tz::Europe__London);
        let tokyo_again = event.localize(Tz::Asia__Tokyo);

        assert_eq!(tokyo.start.hour(), 3);
        assert_eq!(london.start.hour(), 18);
        assert_eq!(tokyo, tokyo_again);
        assert_eq!(tokyo.start, london.start, "same instant, different wall clocks");
        assert_eq!(event.start_raw, "2025-03-05T18:00:00.000Z");
    }

    #[test]
    fn test_wall_clock_in_dst_gap_moves_forward() {
        // 01:30 does not exist in London on 2025-03-30
        let ts = Timestamp::parse("2025-03-30T01:30:00").unwrap();
        let dt = ts.in_timezone(Tz::Europe__London);
        assert_eq!(dt.hour(), 2);
    }

    #[test]
    fn test_parse_feed_skips_dateless_records() {
        let feed = br#"[
            {"eventID": "a", "name": "A", "heading": "Raid Battles", "eventType": "raid-battles",
             "start": "2025-03-05T18:00:00.000", "end": "2025-03-05T19:00:00.000",
             "link": "https://example.com/a", "image": "https://example.com/a.jpg", "extraData": null},
            {"eventID": "b", "name": "B", "heading": "Raid Battles", "eventType": "raid-battles",
             "start": null, "end": null,
             "link": "https://example.com/b", "image": "https://example.com/b.jpg"}
        ]"#;

        let parsed = parse_feed(feed).unwrap();
        assert_eq!(parsed.events.len(), 1);
        assert_eq!(parsed.skipped, vec![(1, "b".to_string())]);
    }

    #[test]
    fn test_parse_feed_rejects_missing_required_field() {
        let feed = br#"[{"eventID": "a", "name": "A", "eventType": "raid-battles",
            "start": "2025-03-05T18:00:00.000", "end": "2025-03-05T19:00:00.000",
            "link": "https://example.com/a", "image": "https://example.com/a.jpg"}]"#;

        assert!(matches!(
            parse_feed(feed),
            Err(GoCalError::InvalidRecord { index: 0, .. })
        ));
    }

    #[test]
    fn test_parse_feed_rejects_malformed_json() {
        assert!(matches!(parse_feed(b"{not json"), Err(GoCalError::FeedJson(_))));
    }
}
