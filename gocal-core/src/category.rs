//! Event categories and the registry derived from a feed.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::event::Event;
use crate::timezone::CalendarTimezone;

/// Raw name and heading of the synthetic calendar that holds every event.
pub const EVERYTHING_CALENDAR_NAME: &str = "Everything";

/// Key of the synthetic calendar that holds every event.
pub const EVERYTHING_CALENDAR_KEY: &str = "everything";

/// Base name shared by every generated calendar file.
pub const CALENDAR_FILE_BASE: &str = "gocal";

pub const CALENDAR_FILE_EXTENSION: &str = "ics";

/// A classification bucket events are grouped into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Category {
    /// `eventType` as it appears in the feed, e.g. "raid-battles".
    pub raw_name: String,
    /// Human heading, e.g. "Raid Battles".
    pub heading: String,
    /// Filesystem/URL safe identifier, e.g. "raid_battles".
    pub key: String,
    /// Short tag prefixed to event titles, e.g. "RB".
    pub acronym: String,
}

impl Category {
    pub fn new(raw_name: &str, heading: &str) -> Self {
        Category {
            raw_name: raw_name.to_string(),
            heading: heading.to_string(),
            key: category_key(raw_name),
            acronym: acronym_for_heading(heading),
        }
    }

    pub fn everything() -> Self {
        Category {
            raw_name: EVERYTHING_CALENDAR_NAME.to_string(),
            heading: EVERYTHING_CALENDAR_NAME.to_string(),
            key: EVERYTHING_CALENDAR_KEY.to_string(),
            acronym: acronym(EVERYTHING_CALENDAR_NAME),
        }
    }

    pub fn is_everything(&self) -> bool {
        self.key == EVERYTHING_CALENDAR_KEY
    }

    /// Calendar filename for this category rendered in `timezone`:
    /// `gocal[__<tz-slug>][__<key>].ics`.
    pub fn filename(&self, timezone: &CalendarTimezone) -> String {
        let mut name = CALENDAR_FILE_BASE.to_string();

        if let Some(slug) = timezone.slug() {
            name.push_str("__");
            name.push_str(&slug);
        }

        if !self.is_everything() {
            name.push_str("__");
            name.push_str(&self.key);
        }

        format!("{}.{}", name, CALENDAR_FILE_EXTENSION)
    }

    /// Public download URL of this category's calendar in `timezone`.
    pub fn download_url(&self, base_url: &str, timezone: &CalendarTimezone) -> String {
        let filename = self.filename(timezone);
        if base_url.ends_with('/') {
            format!("{}{}", base_url, filename)
        } else {
            format!("{}/{}", base_url, filename)
        }
    }
}

/// Normalize a raw category name into a key: lowercase, every run of
/// non-alphanumeric characters collapsed into a single `_`.
pub fn category_key(raw: &str) -> String {
    raw.to_lowercase()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

/// First letter of every word, where words are runs of letters.
pub fn acronym(text: &str) -> String {
    text.split(|c: char| !c.is_alphabetic())
        .filter_map(|word| word.chars().next())
        .collect()
}

/// Acronym for a category heading. "Research Breakthrough" is spelled out
/// as three words so it doesn't clash with "Raid Battles" (RB).
pub fn acronym_for_heading(heading: &str) -> String {
    if heading == "Research Breakthrough" {
        acronym("Research Break Through")
    } else {
        acronym(heading)
    }
}

/// The categories of one run, keyed (and therefore ordered) by key.
///
/// Always contains the "Everything" category.
#[derive(Debug, Clone)]
pub struct CategoryRegistry {
    categories: BTreeMap<String, Category>,
}

impl CategoryRegistry {
    pub fn new() -> Self {
        let everything = Category::everything();
        let mut categories = BTreeMap::new();
        categories.insert(everything.key.clone(), everything);
        CategoryRegistry { categories }
    }

    /// Register every distinct category observed in `events`.
    pub fn from_events(events: &[Event]) -> Self {
        let mut registry = Self::new();
        for event in events {
            registry.register(event.category.clone());
        }
        registry
    }

    /// Add a category. Distinct raw names that normalize to the same key
    /// are a data-quality defect: the last one registered wins. The
    /// synthetic Everything category is never replaced.
    pub fn register(&mut self, category: Category) {
        match self.categories.get(&category.key) {
            Some(existing) if existing.raw_name == category.raw_name => {}
            Some(existing) if existing.is_everything() => {
                tracing::warn!(
                    key = %category.key,
                    raw_name = %category.raw_name,
                    heading = %category.heading,
                    "feed category uses the reserved everything key, keeping the built-in calendar"
                );
            }
            Some(existing) => {
                tracing::warn!(
                    key = %category.key,
                    previous = %existing.raw_name,
                    replacement = %category.raw_name,
                    "category key collision, keeping the latest"
                );
                self.categories.insert(category.key.clone(), category);
            }
            None => {
                tracing::debug!(key = %category.key, heading = %category.heading, "registered category");
                self.categories.insert(category.key.clone(), category);
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&Category> {
        self.categories.get(key)
    }

    /// Categories sorted by key.
    pub fn iter(&self) -> impl Iterator<Item = &Category> {
        self.categories.values()
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

impl Default for CategoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}
