//! Calendar containers for every (category, timezone) pair.

use std::collections::{BTreeMap, HashMap};

use chrono::{Duration, NaiveDate, NaiveDateTime, Timelike};

use crate::category::{Category, CategoryRegistry, EVERYTHING_CALENDAR_KEY};
use crate::error::{GoCalError, GoCalResult};
use crate::event::Event;
use crate::timezone::CalendarTimezone;

/// Minutes before start at which every entry's alarm fires.
pub const ALARM_MINUTES_BEFORE: i64 = 15;

/// Refresh hint embedded in every calendar.
pub const REFRESH_INTERVAL_HOURS: i64 = 24;

const GAME_NAME: &str = "Pokémon GO";

/// Naming shared by every calendar of a run.
#[derive(Debug, Clone)]
pub struct CalendarMetadata {
    pub product_name: String,
    pub source_name: String,
}

impl CalendarMetadata {
    pub fn calendar_name(&self, category: &Category) -> String {
        format!("{} - {}", self.product_name, category.heading)
    }

    pub fn calendar_description(&self, category: &Category, timezone: &CalendarTimezone) -> String {
        let heading = if category.is_everything() {
            String::new()
        } else {
            format!("{} ", category.heading)
        };
        let zone = match timezone {
            CalendarTimezone::Local => "your local time".to_string(),
            CalendarTimezone::Named(tz) => format!("{} time", tz.name()),
        };

        format!(
            "All {} {}events, in {}, auto-updated and sourced from {}.",
            GAME_NAME, heading, zone, self.source_name
        )
    }
}

/// Time value of a calendar entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryTime {
    /// All-day value (VALUE=DATE)
    Date(NaiveDate),
    /// No zone attached (local mode)
    Floating(NaiveDateTime),
    /// Wall-clock time in an IANA zone (TZID=...)
    Zoned { datetime: NaiveDateTime, tzid: String },
}

impl EntryTime {
    /// Calendar day of this value, in whatever zone it is expressed in.
    pub fn date(&self) -> NaiveDate {
        match self {
            EntryTime::Date(date) => *date,
            EntryTime::Floating(datetime) | EntryTime::Zoned { datetime, .. } => datetime.date(),
        }
    }
}

/// One event's representation inside a calendar container.
#[derive(Debug, Clone, PartialEq)]
pub struct CalendarEntry {
    pub uid: String,
    pub summary: String,
    pub description: String,
    pub url: String,
    pub image_url: String,
    pub alarm_minutes_before: i64,
    pub start: EntryTime,
    pub end: EntryTime,
    pub all_day: bool,
}

impl CalendarEntry {
    /// Convert `event` for a calendar rendered in `timezone`. Always builds
    /// a fresh entry from the event's original timestamps.
    pub fn from_event(event: &Event, timezone: &CalendarTimezone) -> Self {
        let span = event.localize(timezone.zone());
        let start_local = span.start.naive_local();
        let end_local = span.end.naive_local();

        let (start, end) = if event.is_full_day {
            let start_date = start_local.date();
            let mut end_date = end_local.date();
            // DTEND of a date value is exclusive
            if end_local.num_seconds_from_midnight() != 0 {
                end_date += Duration::days(1);
            }
            if end_date <= start_date {
                end_date = start_date + Duration::days(1);
            }
            (EntryTime::Date(start_date), EntryTime::Date(end_date))
        } else {
            match timezone {
                CalendarTimezone::Local => (
                    EntryTime::Floating(start_local),
                    EntryTime::Floating(end_local),
                ),
                CalendarTimezone::Named(tz) => (
                    EntryTime::Zoned {
                        datetime: start_local,
                        tzid: tz.name().to_string(),
                    },
                    EntryTime::Zoned {
                        datetime: end_local,
                        tzid: tz.name().to_string(),
                    },
                ),
            }
        };

        CalendarEntry {
            uid: event.id.clone(),
            summary: event.title.clone(),
            description: event.description.clone(),
            url: event.link.clone(),
            image_url: event.image_url.clone(),
            alarm_minutes_before: ALARM_MINUTES_BEFORE,
            start,
            end,
            all_day: event.is_full_day,
        }
    }
}

/// One subscribable calendar: a category rendered in one timezone.
#[derive(Debug, Clone)]
pub struct CalendarContainer {
    pub category: Category,
    pub timezone: CalendarTimezone,
    pub name: String,
    pub description: String,
    pub refresh_interval: Duration,
    entries: Vec<CalendarEntry>,
    by_uid: HashMap<String, usize>,
}

impl CalendarContainer {
    pub fn new(category: &Category, timezone: CalendarTimezone, metadata: &CalendarMetadata) -> Self {
        CalendarContainer {
            category: category.clone(),
            timezone,
            name: metadata.calendar_name(category),
            description: metadata.calendar_description(category, &timezone),
            refresh_interval: Duration::hours(REFRESH_INTERVAL_HOURS),
            entries: Vec::new(),
            by_uid: HashMap::new(),
        }
    }

    /// Add an entry, replacing any earlier entry with the same uid.
    /// Returns false when it replaced one.
    pub fn add_entry(&mut self, entry: CalendarEntry) -> bool {
        match self.by_uid.get(&entry.uid) {
            Some(&position) => {
                self.entries[position] = entry;
                false
            }
            None => {
                self.by_uid.insert(entry.uid.clone(), self.entries.len());
                self.entries.push(entry);
                true
            }
        }
    }

    pub fn entries(&self) -> &[CalendarEntry] {
        &self.entries
    }

    pub fn filename(&self) -> String {
        self.category.filename(&self.timezone)
    }

    pub fn download_url(&self, base_url: &str) -> String {
        self.category.download_url(base_url, &self.timezone)
    }
}

/// Sort key for containers: category key first, then timezone name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct ContainerKey {
    category: String,
    timezone: String,
}

impl ContainerKey {
    fn new(category_key: &str, timezone: &CalendarTimezone) -> Self {
        ContainerKey {
            category: category_key.to_string(),
            timezone: timezone.name().to_string(),
        }
    }
}

/// Every calendar container of one run.
///
/// Built once per run from the category registry and passed through the
/// remaining pipeline stages.
#[derive(Debug, Clone)]
pub struct CalendarSet {
    timezones: Vec<CalendarTimezone>,
    containers: BTreeMap<ContainerKey, CalendarContainer>,
}

impl CalendarSet {
    /// Create an empty container for each timezone × category.
    pub fn build(
        registry: &CategoryRegistry,
        timezones: &[CalendarTimezone],
        metadata: &CalendarMetadata,
    ) -> Self {
        let mut containers = BTreeMap::new();

        for timezone in timezones {
            for category in registry.iter() {
                containers.insert(
                    ContainerKey::new(&category.key, timezone),
                    CalendarContainer::new(category, *timezone, metadata),
                );
            }
        }

        tracing::info!(
            calendars = containers.len(),
            timezones = timezones.len(),
            categories = registry.len(),
            "created calendars"
        );

        CalendarSet {
            timezones: timezones.to_vec(),
            containers,
        }
    }

    /// Add `event` to the everything calendar and to its own category's
    /// calendar for `timezone`. Re-adding the same event is a no-op.
    pub fn add_event(&mut self, event: &Event, timezone: &CalendarTimezone) -> GoCalResult<CalendarEntry> {
        let category_key = ContainerKey::new(&event.category.key, timezone);
        if !self.containers.contains_key(&category_key) {
            return Err(GoCalError::UnknownCategory(format!(
                "{} ({})",
                event.category.key, timezone
            )));
        }

        let entry = CalendarEntry::from_event(event, timezone);

        for key in [ContainerKey::new(EVERYTHING_CALENDAR_KEY, timezone), category_key] {
            let container = self
                .containers
                .get_mut(&key)
                .ok_or_else(|| GoCalError::UnknownCategory(key.category.clone()))?;
            if !container.add_entry(entry.clone()) {
                tracing::debug!(uid = %entry.uid, calendar = %container.filename(), "replaced duplicate entry");
            }
        }

        Ok(entry)
    }

    /// Add `event` in every timezone of the set.
    pub fn add_event_everywhere(&mut self, event: &Event) -> GoCalResult<()> {
        for timezone in self.timezones.clone() {
            self.add_event(event, &timezone)?;
        }
        Ok(())
    }

    pub fn get(&self, category_key: &str, timezone: &CalendarTimezone) -> Option<&CalendarContainer> {
        self.containers.get(&ContainerKey::new(category_key, timezone))
    }

    /// Containers ordered by category key, then timezone name.
    pub fn containers(&self) -> impl Iterator<Item = &CalendarContainer> {
        self.containers.values()
    }

    pub fn timezones(&self) -> &[CalendarTimezone] {
        &self.timezones
    }

    pub fn len(&self) -> usize {
        self.containers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.containers.is_empty()
    }
}
