//! The calendar generation pipeline: parse → classify → build → export.
//!
//! State is created once per run and handed from stage to stage; nothing
//! is cached between runs.

use crate::builder::{CalendarMetadata, CalendarSet};
use crate::category::CategoryRegistry;
use crate::config::GoCalConfig;
use crate::error::GoCalResult;
use crate::event::{ParsedFeed, parse_feed};
use crate::feed::FeedSource;
use crate::manifest::{Export, export_calendars};
use crate::sink::OutputSink;
use crate::timezone::{CalendarTimezone, resolve_timezones};

/// Stage functions for one generation run.
#[derive(Debug, Clone)]
pub struct Generator {
    timezones: Vec<CalendarTimezone>,
    metadata: CalendarMetadata,
    download_base_url: String,
    multi_timezone: bool,
}

/// Summary of a finished run.
#[derive(Debug, Clone)]
pub struct GenerateReport {
    pub events: usize,
    pub skipped: usize,
    pub categories: usize,
    pub export: Export,
}

impl Generator {
    pub fn new(config: &GoCalConfig) -> GoCalResult<Self> {
        Ok(Generator {
            timezones: resolve_timezones(config.output.multi_timezone, &config.output.timezones)?,
            metadata: CalendarMetadata {
                product_name: config.product_name.clone(),
                source_name: config.source_name.clone(),
            },
            download_base_url: config.output.download_base_url.clone(),
            multi_timezone: config.output.multi_timezone,
        })
    }

    pub fn timezones(&self) -> &[CalendarTimezone] {
        &self.timezones
    }

    pub fn parse(&self, bytes: &[u8]) -> GoCalResult<ParsedFeed> {
        let parsed = parse_feed(bytes)?;
        tracing::info!(
            events = parsed.events.len(),
            skipped = parsed.skipped.len(),
            "parsed feed"
        );
        Ok(parsed)
    }

    pub fn classify(&self, feed: &ParsedFeed) -> CategoryRegistry {
        CategoryRegistry::from_events(&feed.events)
    }

    /// Empty calendars for every timezone × category.
    pub fn create_calendars(&self, registry: &CategoryRegistry) -> CalendarSet {
        CalendarSet::build(registry, &self.timezones, &self.metadata)
    }

    pub fn export(&self, set: &CalendarSet) -> GoCalResult<Export> {
        export_calendars(set, &self.download_base_url, self.multi_timezone)
    }

    /// Run every stage from an already fetched feed body.
    pub fn generate(&self, bytes: &[u8], sink: &mut impl OutputSink) -> GoCalResult<GenerateReport> {
        let feed = self.parse(bytes)?;
        let registry = self.classify(&feed);
        let mut set = self.create_calendars(&registry);

        for event in &feed.events {
            set.add_event_everywhere(event)?;
        }

        let export = self.export(&set)?;
        export.write_to(sink)?;

        Ok(GenerateReport {
            events: feed.events.len(),
            skipped: feed.skipped.len(),
            categories: registry.len(),
            export,
        })
    }

    /// Fetch the feed, then run every stage.
    pub async fn fetch_and_generate(
        &self,
        feed: &impl FeedSource,
        sink: &mut impl OutputSink,
    ) -> GoCalResult<GenerateReport> {
        let bytes = feed.fetch().await?;
        self.generate(&bytes, sink)
    }
}
