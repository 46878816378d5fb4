use std::path::Path;

use anyhow::Result;
use gocal_core::GoCalConfig;
use owo_colors::OwoColorize;

pub fn run(config: &GoCalConfig, explicit: Option<&Path>) -> Result<()> {
    let source = GoCalConfig::resolve_path(explicit)?
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "built-in defaults".to_string());

    println!("{}", format!("# Loaded from {}", source).dimmed());
    print!("{}", config.to_toml()?);

    Ok(())
}
