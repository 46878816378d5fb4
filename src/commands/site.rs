use anyhow::{Context, Result};
use gocal_core::GoCalConfig;
use gocal_core::manifest::{MANIFEST_FILENAME, Manifest};
use gocal_core::sink::FsSink;
use gocal_core::site::{render_site, write_views};
use owo_colors::OwoColorize;

use super::Phase;

pub fn run(config: &GoCalConfig) -> Result<()> {
    let manifest_path = config.dist_path().join(MANIFEST_FILENAME);
    let templates = config.templates_path();
    let out = config.site_dist_path();
    tracing::debug!(
        manifest = %manifest_path.display(),
        templates = %templates.display(),
        out = %out.display(),
        "rendering site"
    );

    Phase::Start.print(&format!("Rendering site from {}", templates.display()));

    let bytes = std::fs::read(&manifest_path).with_context(|| {
        format!(
            "[SOURCE] Failed to read {} (run `gocal generate` first)",
            manifest_path.display()
        )
    })?;
    let manifest = Manifest::from_json(&bytes).context("[SOURCE] Invalid manifest")?;
    Phase::Source.print(&manifest_path.display().to_string());

    let views = render_site(&config.site, &templates, &manifest).context("[VIEWS] Failed to render templates")?;

    let mut sink = FsSink::new(&out);
    write_views(&views, &mut sink).with_context(|| format!("[VIEWS] Failed to write to {}", out.display()))?;

    Phase::Views.print(&format!("{} pages → {}", views.len(), out.display()));
    for view in &views {
        println!("{}", Phase::detail(&view.output_filename()));
    }

    Phase::End.print(&"Done".green().to_string());
    Ok(())
}
