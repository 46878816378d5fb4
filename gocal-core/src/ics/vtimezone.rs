//! VTIMEZONE blocks for calendars rendered in a named zone.
//!
//! Offsets come from chrono-tz. Each offset change inside the covered span
//! becomes its own STANDARD or DAYLIGHT component with a one-off DTSTART,
//! preceded by one component describing the offset at the span's start.

use chrono::{DateTime, Duration, NaiveDate, Offset, TimeZone, Utc};
use chrono_tz::{OffsetComponents, Tz};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ZoneState {
    /// Seconds east of UTC.
    offset: i32,
    daylight: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Transition {
    at: DateTime<Utc>,
    from: ZoneState,
    to: ZoneState,
}

/// Build the VTIMEZONE for `tz`, covering the days `from..=to`.
pub fn build_vtimezone(tz: Tz, from: NaiveDate, to: NaiveDate) -> String {
    let mut lines = vec![
        "BEGIN:VTIMEZONE".to_string(),
        format!("TZID:{}", tz.name()),
        format!("X-LIC-LOCATION:{}", tz.name()),
    ];

    for transition in transitions(tz, from, to) {
        let kind = if transition.to.daylight { "DAYLIGHT" } else { "STANDARD" };
        let local_start = transition.at.naive_utc() + Duration::seconds(i64::from(transition.from.offset));

        lines.push(format!("BEGIN:{}", kind));
        lines.push(format!("DTSTART:{}", local_start.format("%Y%m%dT%H%M%S")));
        lines.push(format!("TZOFFSETFROM:{}", format_utc_offset(transition.from.offset)));
        lines.push(format!("TZOFFSETTO:{}", format_utc_offset(transition.to.offset)));
        lines.push(format!("END:{}", kind));
    }

    lines.push("END:VTIMEZONE".to_string());

    let mut block = lines.join("\r\n");
    block.push_str("\r\n");
    block
}

/// Insert `block` before the first event, or before the end of the
/// calendar when it has no events.
pub fn insert_timezone_block(ics: &str, block: &str) -> String {
    let position = ics
        .find("\r\nBEGIN:VEVENT\r\n")
        .or_else(|| ics.find("\r\nEND:VCALENDAR"))
        .map(|index| index + 2);

    match position {
        Some(index) => format!("{}{}{}", &ics[..index], block, &ics[index..]),
        None => format!("{}{}", ics, block),
    }
}

fn state_at(tz: Tz, at: DateTime<Utc>) -> ZoneState {
    let offset = tz.offset_from_utc_datetime(&at.naive_utc());
    ZoneState {
        offset: offset.fix().local_minus_utc(),
        daylight: offset.dst_offset() != Duration::zero(),
    }
}

fn transitions(tz: Tz, from: NaiveDate, to: NaiveDate) -> Vec<Transition> {
    let (Some(start), Some(end)) = (from.and_hms_opt(0, 0, 0), to.and_hms_opt(0, 0, 0)) else {
        return Vec::new();
    };
    let start = Utc.from_utc_datetime(&start);
    let end = Utc.from_utc_datetime(&end) + Duration::days(1);

    let initial = state_at(tz, start);
    let mut found = vec![Transition {
        at: start,
        from: initial,
        to: initial,
    }];

    let mut day = start;
    let mut current = initial;
    while day < end {
        let next_day = day + Duration::days(1);
        let next = state_at(tz, next_day);
        if next != current {
            found.push(Transition {
                at: first_instant_of(tz, day, next_day),
                from: current,
                to: next,
            });
            current = next;
        }
        day = next_day;
    }

    found
}

/// Bisect `(lo, hi]` down to the second where the zone state changes.
fn first_instant_of(tz: Tz, mut lo: DateTime<Utc>, mut hi: DateTime<Utc>) -> DateTime<Utc> {
    let before = state_at(tz, lo);
    while (hi - lo).num_seconds() > 1 {
        let mid = lo + Duration::seconds((hi - lo).num_seconds() / 2);
        if state_at(tz, mid) == before {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    hi
}

/// `+HHMM`, or `+HHMMSS` for offsets with leftover seconds.
fn format_utc_offset(seconds: i32) -> String {
    let sign = if seconds < 0 { '-' } else { '+' };
    let seconds = seconds.unsigned_abs();
    let (hours, minutes, secs) = (seconds / 3600, (seconds % 3600) / 60, seconds % 60);

    if secs == 0 {
        format!("{}{:02}{:02}", sign, hours, minutes)
    } else {
        format!("{}{:02}{:02}{:02}", sign, hours, minutes, secs)
    }
}
