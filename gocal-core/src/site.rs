//! Rendering the static download site from the calendar manifest.

use std::path::Path;

use serde_json::{Value, json};

use crate::category::EVERYTHING_CALENDAR_KEY;
use crate::config::SiteConfig;
use crate::error::{GoCalError, GoCalResult};
use crate::manifest::{CategoryManifest, Manifest};
use crate::sink::OutputSink;
use crate::template::{Context, View, ViewSet};

/// Data the site templates are rendered against.
pub fn site_context(site: &SiteConfig, manifest: &Manifest) -> GoCalResult<Context> {
    let calendars = manifest
        .local()
        .ok_or_else(|| GoCalError::Config("manifest has no local-time calendars".into()))?;
    let default_calendar_url = manifest
        .default_calendar_url()
        .ok_or_else(|| GoCalError::Config("manifest has no everything calendar".into()))?;

    let mut context = Context::new();
    context.insert("app_url".into(), Value::String(site.app_url.clone()));
    context.insert("logo_url".into(), Value::String(site.logo_url.clone()));
    context.insert(
        "calendars".into(),
        serde_json::to_value(calendars).map_err(|e| GoCalError::Serialization(e.to_string()))?,
    );
    context.insert("calendar_list".into(), Value::Array(calendar_list(calendars)));
    context.insert(
        "default_calendar_url".into(),
        Value::String(default_calendar_url.to_string()),
    );

    Ok(context)
}

/// Calendars as `{key, name, url}` records, Everything first and the rest
/// by key. `calendars` is a map and can't carry that order itself.
fn calendar_list(calendars: &CategoryManifest) -> Vec<Value> {
    let (everything, rest): (Vec<_>, Vec<_>) = calendars
        .iter()
        .partition(|(key, _)| key.as_str() == EVERYTHING_CALENDAR_KEY);

    everything
        .into_iter()
        .chain(rest)
        .map(|(key, entry)| json!({ "key": key, "name": entry.name, "url": entry.url }))
        .collect()
}

/// Load the templates in `templates_dir` and render the exported views.
pub fn render_site(site: &SiteConfig, templates_dir: &Path, manifest: &Manifest) -> GoCalResult<Vec<View>> {
    let views = ViewSet::load(templates_dir, &site.export_views)?;
    let context = site_context(site, manifest)?;
    views.render(&context)
}

/// Write rendered views as `<name>.html`.
pub fn write_views(views: &[View], sink: &mut impl OutputSink) -> GoCalResult<()> {
    for view in views {
        sink.write(Path::new(&view.output_filename()), view.contents.as_bytes())?;
    }
    Ok(())
}
