//! Writing calendar files and the download manifest.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::builder::{CalendarContainer, CalendarSet};
use crate::category::EVERYTHING_CALENDAR_KEY;
use crate::error::{GoCalError, GoCalResult};
use crate::ics::generate_calendar_ics;
use crate::sink::OutputSink;
use crate::timezone::LOCAL_TIMEZONE_NAME;

/// Well-known manifest filename, next to the calendar files.
pub const MANIFEST_FILENAME: &str = "manifest.json";

/// Display name and download location of one calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub name: String,
    pub url: String,
}

/// Category key → entry, sorted by key.
pub type CategoryManifest = BTreeMap<String, ManifestEntry>;

/// The manifest document. Multi-timezone runs nest one level by timezone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Manifest {
    SingleTimezone(CategoryManifest),
    PerTimezone(BTreeMap<String, CategoryManifest>),
}

impl Manifest {
    /// Describe every container of `set`.
    pub fn from_calendars(set: &CalendarSet, download_base_url: &str, multi_timezone: bool) -> Self {
        let mut per_timezone: BTreeMap<String, CategoryManifest> = BTreeMap::new();

        for container in set.containers() {
            per_timezone
                .entry(container.timezone.name().to_string())
                .or_default()
                .insert(
                    container.category.key.clone(),
                    ManifestEntry {
                        name: container.category.heading.clone(),
                        url: container.download_url(download_base_url),
                    },
                );
        }

        if multi_timezone {
            Manifest::PerTimezone(per_timezone)
        } else {
            Manifest::SingleTimezone(per_timezone.remove(LOCAL_TIMEZONE_NAME).unwrap_or_default())
        }
    }

    pub fn from_json(bytes: &[u8]) -> GoCalResult<Self> {
        serde_json::from_slice(bytes).map_err(|e| GoCalError::Serialization(e.to_string()))
    }

    /// Pretty-printed JSON; non-ASCII is written as-is.
    pub fn to_json_pretty(&self) -> GoCalResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| GoCalError::Serialization(e.to_string()))
    }

    /// The local-time section, which is what the static site lists.
    pub fn local(&self) -> Option<&CategoryManifest> {
        match self {
            Manifest::SingleTimezone(entries) => Some(entries),
            Manifest::PerTimezone(zones) => zones.get(LOCAL_TIMEZONE_NAME),
        }
    }

    /// Download URL of the local everything calendar.
    pub fn default_calendar_url(&self) -> Option<&str> {
        self.local()
            .and_then(|entries| entries.get(EVERYTHING_CALENDAR_KEY))
            .map(|entry| entry.url.as_str())
    }
}

/// One serialized calendar, ready to be written.
#[derive(Debug, Clone)]
pub struct CalendarFile {
    pub path: PathBuf,
    pub url: String,
    pub contents: String,
}

/// Everything an export produces.
#[derive(Debug, Clone)]
pub struct Export {
    pub files: Vec<CalendarFile>,
    pub manifest: Manifest,
}

/// Serialize every container and build the manifest, without writing.
pub fn export_calendars(
    set: &CalendarSet,
    download_base_url: &str,
    multi_timezone: bool,
) -> GoCalResult<Export> {
    let files = set
        .containers()
        .map(|container| render_file(container, download_base_url))
        .collect::<GoCalResult<Vec<_>>>()?;

    Ok(Export {
        files,
        manifest: Manifest::from_calendars(set, download_base_url, multi_timezone),
    })
}

fn render_file(container: &CalendarContainer, download_base_url: &str) -> GoCalResult<CalendarFile> {
    let contents = generate_calendar_ics(container)?;
    tracing::debug!(
        calendar = %container.filename(),
        entries = container.entries().len(),
        "serialized calendar"
    );

    Ok(CalendarFile {
        path: PathBuf::from(container.filename()),
        url: container.download_url(download_base_url),
        contents,
    })
}

impl Export {
    /// Write every calendar file, then the manifest, through `sink`.
    pub fn write_to(&self, sink: &mut impl OutputSink) -> GoCalResult<()> {
        for file in &self.files {
            sink.write(&file.path, file.contents.as_bytes())?;
        }

        let manifest = self.manifest.to_json_pretty()?;
        sink.write(Path::new(MANIFEST_FILENAME), manifest.as_bytes())?;

        tracing::info!(calendars = self.files.len(), "exported calendars and manifest");
        Ok(())
    }
}
