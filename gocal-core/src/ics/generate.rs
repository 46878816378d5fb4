//! ICS generation for calendar containers.

use super::vtimezone::{build_vtimezone, insert_timezone_block};
use crate::builder::{CalendarContainer, CalendarEntry, EntryTime};
use crate::error::GoCalResult;
use crate::timezone::CalendarTimezone;
use chrono::NaiveDate;
use icalendar::{Alarm, Calendar, Component, EventLike, Property, Trigger, ValueType};

/// PRODID written into every generated calendar.
pub const PRODUCT_ID: &str = "-//gocal//GO Calendar//EN";

/// Serialize a whole calendar container, metadata and entries.
pub fn generate_calendar_ics(container: &CalendarContainer) -> GoCalResult<String> {
    let mut cal = Calendar::new();

    cal.append_property(Property::new("NAME", &container.name));
    cal.append_property(Property::new("X-WR-CALNAME", &container.name));
    cal.append_property(Property::new("DESCRIPTION", &container.description));
    cal.append_property(Property::new("X-WR-CALDESC", &container.description));

    let refresh = refresh_duration(container.refresh_interval);
    let mut refresh_interval = Property::new("REFRESH-INTERVAL", &refresh);
    refresh_interval.add_parameter("VALUE", "DURATION");
    cal.append_property(refresh_interval);
    cal.append_property(Property::new("X-PUBLISHED-TTL", &refresh));

    // Local calendars stay floating so subscribers see their own wall clock
    if !container.timezone.is_local() {
        cal.append_property(Property::new("X-WR-TIMEZONE", container.timezone.name()));
    }

    for entry in container.entries() {
        cal.push(build_event(entry));
    }

    let cal = cal.done();
    let ics = strip_ics_bloat(&cal.to_string());

    match container.timezone {
        CalendarTimezone::Local => Ok(ics),
        CalendarTimezone::Named(tz) => {
            let (from, to) = entry_span(container);
            Ok(insert_timezone_block(&ics, &build_vtimezone(tz, from, to)))
        }
    }
}

/// First and last day touched by the container's entries, padded by a day
/// on each side. Empty calendars cover today.
fn entry_span(container: &CalendarContainer) -> (NaiveDate, NaiveDate) {
    let dates = container
        .entries()
        .iter()
        .flat_map(|entry| [entry.start.date(), entry.end.date()]);

    let (from, to) = match (dates.clone().min(), dates.max()) {
        (Some(from), Some(to)) => (from, to),
        _ => {
            let today = chrono::Utc::now().date_naive();
            (today, today)
        }
    };

    (
        from.pred_opt().unwrap_or(from),
        to.succ_opt().unwrap_or(to),
    )
}

fn build_event(entry: &CalendarEntry) -> icalendar::Event {
    let mut ics_event = icalendar::Event::new();
    ics_event.uid(&entry.uid);
    ics_event.summary(&entry.summary);
    ics_event.description(&entry.description);
    ics_event.add_property("URL", &entry.url);

    let mut image = Property::new("IMAGE", &entry.image_url);
    image.add_parameter("VALUE", "URI");
    ics_event.append_property(image);

    add_datetime_property(&mut ics_event, "DTSTART", &entry.start);
    add_datetime_property(&mut ics_event, "DTEND", &entry.end);

    let trigger = Trigger::before_start(chrono::Duration::minutes(entry.alarm_minutes_before));
    ics_event.alarm(Alarm::display(&entry.summary, trigger));

    ics_event.done()
}

/// Format a duration as an ISO 8601 `PT..H..M` value.
fn refresh_duration(interval: chrono::Duration) -> String {
    let minutes = interval.num_minutes();
    match (minutes / 60, minutes % 60) {
        (hours, 0) => format!("PT{}H", hours),
        (0, mins) => format!("PT{}M", mins),
        (hours, mins) => format!("PT{}H{}M", hours, mins),
    }
}

/// Clean up ICS output from the icalendar crate
/// - Replace PRODID with ours
/// - Remove CALSCALE:GREGORIAN (it's the default)
/// - Remove DTSTAMP and UID inside VALARM sections (not required by RFC 5545)
fn strip_ics_bloat(ics: &str) -> String {
    let mut result = String::with_capacity(ics.len());
    let mut in_valarm = false;

    for line in ics.lines() {
        if line.starts_with("PRODID:") {
            result.push_str("PRODID:");
            result.push_str(PRODUCT_ID);
            result.push_str("\r\n");
            continue;
        }

        if line == "CALSCALE:GREGORIAN" {
            continue;
        }

        if line == "BEGIN:VALARM" {
            in_valarm = true;
        } else if line == "END:VALARM" {
            in_valarm = false;
        }

        if in_valarm && (line.starts_with("DTSTAMP:") || line.starts_with("UID:")) {
            continue;
        }

        result.push_str(line);
        result.push_str("\r\n");
    }

    result
}

/// Add a datetime property with proper formatting based on EntryTime variant
fn add_datetime_property(ics_event: &mut icalendar::Event, name: &str, time: &EntryTime) {
    match time {
        EntryTime::Date(d) => {
            let mut prop = Property::new(name, d.format("%Y%m%d").to_string());
            prop.append_parameter(ValueType::Date);
            ics_event.append_property(prop);
        }
        EntryTime::Floating(dt) => {
            // Floating datetime (no Z, no TZID)
            ics_event.add_property(name, dt.format("%Y%m%dT%H%M%S").to_string());
        }
        EntryTime::Zoned { datetime, tzid } => {
            let mut prop = Property::new(name, datetime.format("%Y%m%dT%H%M%S").to_string());
            prop.add_parameter("TZID", tzid);
            ics_event.append_property(prop);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::CalendarMetadata;
    use crate::category::Category;
    use crate::timezone::CalendarTimezone;
    use chrono::NaiveDate;
    use chrono_tz::Tz;

    fn make_container(timezone: CalendarTimezone) -> CalendarContainer {
        let metadata = CalendarMetadata {
            product_name: "GO Calendar".to_string(),
            source_name: "Leek Duck".to_string(),
        };
        CalendarContainer::new(&Category::new("raid-battles", "Raid Battles"), timezone, &metadata)
    }

    fn make_entry(start: EntryTime, end: EntryTime) -> CalendarEntry {
        CalendarEntry {
            uid: "raid-hour-20250305".to_string(),
            summary: "[RB] Raid Hour".to_string(),
            description: "Starts at 18:00, ends at 19:00.".to_string(),
            url: "https://leekduck.com/events/raid-hour/".to_string(),
            image_url: "https://cdn.leekduck.com/raid.jpg".to_string(),
            alarm_minutes_before: 15,
            start,
            end,
            all_day: false,
        }
    }

    fn at(h: u32) -> chrono::NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 5).unwrap().and_hms_opt(h, 0, 0).unwrap()
    }

    #[test]
    fn test_calendar_metadata_is_written() {
        let container = make_container(CalendarTimezone::Local);
        let ics = generate_calendar_ics(&container).unwrap();

        assert!(ics.contains("X-WR-CALNAME:GO Calendar - Raid Battles"), "ICS:\n{}", ics);
        assert!(ics.contains("REFRESH-INTERVAL;VALUE=DURATION:PT24H"), "ICS:\n{}", ics);
        assert!(ics.contains("X-PUBLISHED-TTL:PT24H"), "ICS:\n{}", ics);
        assert!(ics.contains(&format!("PRODID:{}", PRODUCT_ID)), "ICS:\n{}", ics);
        assert!(!ics.contains("CALSCALE:GREGORIAN"));
        assert!(!ics.contains("X-WR-TIMEZONE"), "local calendars carry no timezone");
    }

    #[test]
    fn test_named_timezone_calendar_embeds_zone() {
        let tokyo = CalendarTimezone::Named(Tz::Asia__Tokyo);
        let mut container = make_container(tokyo);
        container.add_entry(make_entry(
            EntryTime::Zoned { datetime: at(18), tzid: "Asia/Tokyo".to_string() },
            EntryTime::Zoned { datetime: at(19), tzid: "Asia/Tokyo".to_string() },
        ));

        let ics = generate_calendar_ics(&container).unwrap();

        assert!(ics.contains("X-WR-TIMEZONE:Asia/Tokyo"), "ICS:\n{}", ics);
        assert!(ics.contains("DTSTART;TZID=Asia/Tokyo:20250305T180000"), "ICS:\n{}", ics);
        assert!(ics.contains("DTEND;TZID=Asia/Tokyo:20250305T190000"), "ICS:\n{}", ics);
    }

    #[test]
    fn test_named_timezone_calendar_has_matching_vtimezone() {
        let tokyo = CalendarTimezone::Named(Tz::Asia__Tokyo);
        let mut container = make_container(tokyo);
        container.add_entry(make_entry(
            EntryTime::Zoned { datetime: at(18), tzid: "Asia/Tokyo".to_string() },
            EntryTime::Zoned { datetime: at(19), tzid: "Asia/Tokyo".to_string() },
        ));

        let ics = generate_calendar_ics(&container).unwrap();

        assert_eq!(ics.matches("BEGIN:VTIMEZONE").count(), 1, "ICS:\n{}", ics);
        assert!(ics.contains("BEGIN:VTIMEZONE\r\nTZID:Asia/Tokyo\r\n"), "ICS:\n{}", ics);
        assert!(ics.contains("TZOFFSETTO:+0900"), "ICS:\n{}", ics);

        let vtimezone = ics.find("BEGIN:VTIMEZONE").unwrap();
        let first_event = ics.find("BEGIN:VEVENT").unwrap();
        assert!(vtimezone < first_event, "VTIMEZONE should precede events:\n{}", ics);
    }

    #[test]
    fn test_empty_named_calendar_still_defines_its_zone() {
        let london = CalendarTimezone::Named(Tz::Europe__London);
        let ics = generate_calendar_ics(&make_container(london)).unwrap();

        assert!(ics.contains("TZID:Europe/London"), "ICS:\n{}", ics);
        assert!(ics.trim_end().ends_with("END:VTIMEZONE\r\nEND:VCALENDAR"), "ICS:\n{}", ics);
    }

    #[test]
    fn test_local_calendar_has_no_vtimezone() {
        let mut container = make_container(CalendarTimezone::Local);
        container.add_entry(make_entry(EntryTime::Floating(at(18)), EntryTime::Floating(at(19))));

        let ics = generate_calendar_ics(&container).unwrap();
        assert!(!ics.contains("BEGIN:VTIMEZONE"), "ICS:\n{}", ics);
    }

    #[test]
    fn test_floating_entry_has_no_zone_suffix() {
        let mut container = make_container(CalendarTimezone::Local);
        container.add_entry(make_entry(EntryTime::Floating(at(18)), EntryTime::Floating(at(19))));

        let ics = generate_calendar_ics(&container).unwrap();

        assert!(ics.contains("DTSTART:20250305T180000\r\n"), "ICS:\n{}", ics);
        assert!(ics.contains("UID:raid-hour-20250305"), "ICS:\n{}", ics);
        assert!(ics.contains("URL:https://leekduck.com/events/raid-hour/"), "ICS:\n{}", ics);
        assert!(ics.contains("IMAGE;VALUE=URI:https://cdn.leekduck.com/raid.jpg"), "ICS:\n{}", ics);
    }

    #[test]
    fn test_all_day_entry_has_value_date() {
        let mut container = make_container(CalendarTimezone::Local);
        let mut entry = make_entry(
            EntryTime::Date(NaiveDate::from_ymd_opt(2025, 3, 5).unwrap()),
            EntryTime::Date(NaiveDate::from_ymd_opt(2025, 3, 9).unwrap()),
        );
        entry.all_day = true;
        container.add_entry(entry);

        let ics = generate_calendar_ics(&container).unwrap();

        assert!(ics.contains("DTSTART;VALUE=DATE:20250305"), "ICS:\n{}", ics);
        assert!(ics.contains("DTEND;VALUE=DATE:20250309"), "ICS:\n{}", ics);
    }

    #[test]
    fn test_alarm_fires_fifteen_minutes_before_and_is_minimal() {
        let mut container = make_container(CalendarTimezone::Local);
        container.add_entry(make_entry(EntryTime::Floating(at(18)), EntryTime::Floating(at(19))));

        let ics = generate_calendar_ics(&container).unwrap();

        assert!(ics.contains("BEGIN:VALARM"), "Should have VALARM");
        assert!(ics.contains("ACTION:DISPLAY"), "Should have ACTION:DISPLAY");
        assert!(
            ics.contains("-PT15M") || ics.contains("-PT900S"),
            "Trigger should be 15 minutes before. ICS:\n{}",
            ics
        );

        let valarm_section: String = ics
            .split("BEGIN:VALARM")
            .nth(1)
            .unwrap()
            .split("END:VALARM")
            .next()
            .unwrap()
            .to_string();
        assert!(!valarm_section.contains("UID:"), "VALARM should not have UID");
        assert!(!valarm_section.contains("DTSTAMP:"), "VALARM should not have DTSTAMP");
    }

    #[test]
    fn test_one_vevent_per_entry() {
        let mut container = make_container(CalendarTimezone::Local);
        let first = make_entry(EntryTime::Floating(at(18)), EntryTime::Floating(at(19)));
        let mut second = first.clone();
        second.uid = "raid-hour-20250312".to_string();
        container.add_entry(first);
        container.add_entry(second);

        let ics = generate_calendar_ics(&container).unwrap();
        assert_eq!(ics.matches("BEGIN:VEVENT").count(), 2);
    }

    #[test]
    fn test_refresh_duration_formatting() {
        assert_eq!(refresh_duration(chrono::Duration::hours(24)), "PT24H");
        assert_eq!(refresh_duration(chrono::Duration::minutes(90)), "PT1H30M");
        assert_eq!(refresh_duration(chrono::Duration::minutes(45)), "PT45M");
    }
}
