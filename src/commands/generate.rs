use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use gocal_core::GoCalConfig;
use gocal_core::Generator;
use gocal_core::feed::{FeedSource, FileFeed, HttpFeed};
use gocal_core::manifest::MANIFEST_FILENAME;
use gocal_core::sink::FsSink;
use owo_colors::OwoColorize;

use super::{Phase, Render, create_spinner};

pub async fn run(config: &GoCalConfig, feed_file: Option<PathBuf>) -> Result<()> {
    let generator = Generator::new(config).context("[CALENDAR] Invalid timezone settings")?;
    let dist = config.dist_path();
    tracing::debug!(
        feed = %config.feed.url,
        dist = %dist.display(),
        timezones = generator.timezones().len(),
        "starting generation"
    );

    Phase::Start.print(&format!("Generating {}", config.product_name.bold()));

    let bytes = match feed_file {
        Some(path) => fetch(&FileFeed::new(path)).await?,
        None => {
            let timeout = Duration::from_secs(config.feed.timeout_secs);
            let feed = HttpFeed::new(&config.feed.url, timeout).context("[SOURCE] Failed to create HTTP client")?;
            fetch(&feed).await?
        }
    };

    let feed = generator.parse(&bytes).context("[SOURCE] Failed to parse event feed")?;
    Phase::Source.print(&format!("{} events", feed.events.len()));
    for (index, event_id) in &feed.skipped {
        println!(
            "{}",
            Phase::detail(&format!("skipped #{} {} (no dates)", index, event_id).yellow().to_string())
        );
    }

    let registry = generator.classify(&feed);
    let mut calendars = generator.create_calendars(&registry);
    Phase::Calendar.print(&format!(
        "{} categories × {} timezones = {} calendars",
        registry.len(),
        generator.timezones().len(),
        calendars.len()
    ));
    for category in registry.iter() {
        println!("{}", Phase::detail(&format!("{} {}", category.heading, category.key.dimmed())));
    }

    Phase::Events.print("Adding events");
    for event in &feed.events {
        calendars
            .add_event_everywhere(event)
            .with_context(|| format!("[EVENTS] Failed to add {}", event.id))?;
        println!("{}", Phase::detail(&event.render()));
    }

    let export = generator.export(&calendars).context("[EXPORT] Failed to serialize calendars")?;
    let mut sink = FsSink::new(&dist);
    export
        .write_to(&mut sink)
        .with_context(|| format!("[EXPORT] Failed to write to {}", dist.display()))?;

    Phase::Export.print(&format!("{} calendars → {}", export.files.len(), dist.display()));
    if config.output.multi_timezone {
        println!(
            "{}",
            Phase::detail(&format!("{} files", export.files.len()).dimmed().to_string())
        );
    } else {
        for file in &export.files {
            println!("{}", Phase::detail(&file.render()));
        }
    }
    println!("{}", Phase::detail(&dist.join(MANIFEST_FILENAME).display().to_string()));

    Phase::End.print(&"Done".green().to_string());
    Ok(())
}

async fn fetch(feed: &impl FeedSource) -> Result<Vec<u8>> {
    let description = feed.describe();
    let spinner = create_spinner(Phase::Source.line(&format!("Fetching {}", description)));
    let result = feed.fetch().await;
    spinner.finish_and_clear();

    result.with_context(|| format!("[SOURCE] Failed to fetch {}", description))
}
