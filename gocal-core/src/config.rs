//! Pipeline configuration.
//!
//! Values are layered with the `config` crate: built-in defaults, then an
//! optional TOML file, then `GOCAL_*` environment variables
//! (e.g. `GOCAL_OUTPUT__MULTI_TIMEZONE=true`).

use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::error::{GoCalError, GoCalResult};

static DEFAULT_FEED_URL: &str =
    "https://raw.githubusercontent.com/bigfoott/ScrapedDuck/data/events.min.json";
static DEFAULT_DOWNLOAD_BASE_URL: &str =
    "https://github.com/othyn/go-calendar/releases/latest/download/";

/// Name of the config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "gocal.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GoCalConfig {
    /// Prefix for every calendar display name.
    pub product_name: String,
    /// Credited as the event source in calendar descriptions.
    pub source_name: String,
    pub feed: FeedConfig,
    pub output: OutputConfig,
    pub site: SiteConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Where .ics files and manifest.json are written.
    pub dist_dir: PathBuf,
    /// Public URL the .ics files are served from; filenames are appended.
    pub download_base_url: String,
    /// Also generate one calendar set per IANA timezone.
    pub multi_timezone: bool,
    /// Restricts multi-timezone output to these zones. Empty means all of them.
    pub timezones: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    pub templates_dir: PathBuf,
    pub dist_dir: PathBuf,
    /// Views written to disk; every other template is only an include/loop source.
    pub export_views: Vec<String>,
    pub app_url: String,
    pub logo_url: String,
}

impl Default for GoCalConfig {
    fn default() -> Self {
        GoCalConfig {
            product_name: "GO Calendar".to_string(),
            source_name: "Leek Duck".to_string(),
            feed: FeedConfig::default(),
            output: OutputConfig::default(),
            site: SiteConfig::default(),
        }
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        FeedConfig {
            url: DEFAULT_FEED_URL.to_string(),
            timeout_secs: 30,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            dist_dir: PathBuf::from("dist"),
            download_base_url: DEFAULT_DOWNLOAD_BASE_URL.to_string(),
            multi_timezone: false,
            timezones: Vec::new(),
        }
    }
}

impl Default for SiteConfig {
    fn default() -> Self {
        SiteConfig {
            templates_dir: PathBuf::from("pages/templates"),
            dist_dir: PathBuf::from("pages/dist"),
            export_views: vec!["index".to_string()],
            app_url: "https://gocalendar.info/".to_string(),
            logo_url: "art/icon.svg".to_string(),
        }
    }
}

impl GoCalConfig {
    /// Path of the per-user config file (~/.config/gocal/config.toml on Linux).
    pub fn user_config_path() -> GoCalResult<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| GoCalError::Config("Could not determine config directory".into()))?
            .join("gocal");

        Ok(config_dir.join("config.toml"))
    }

    /// Pick the config file to read: an explicit path, then ./gocal.toml,
    /// then the per-user config file. Returns None when nothing exists.
    pub fn resolve_path(explicit: Option<&Path>) -> GoCalResult<Option<PathBuf>> {
        if let Some(path) = explicit {
            if !path.exists() {
                return Err(GoCalError::Config(format!(
                    "Config file not found at {}",
                    path.display()
                )));
            }
            return Ok(Some(path.to_path_buf()));
        }

        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            return Ok(Some(local));
        }

        let user = Self::user_config_path()?;
        Ok(user.exists().then_some(user))
    }

    /// Load the layered configuration.
    pub fn load(explicit: Option<&Path>) -> GoCalResult<Self> {
        let mut builder = Config::builder();

        if let Some(path) = Self::resolve_path(explicit)? {
            tracing::debug!(path = %path.display(), "loading config file");
            builder = builder.add_source(File::from(path).required(false));
        }

        let config: GoCalConfig = builder
            .add_source(
                Environment::with_prefix("GOCAL")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| GoCalError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| GoCalError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Parse a config from TOML text, without consulting files or environment.
    pub fn from_toml(contents: &str) -> GoCalResult<Self> {
        let config: GoCalConfig =
            toml::from_str(contents).map_err(|e| GoCalError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> GoCalResult<String> {
        toml::to_string_pretty(self).map_err(|e| GoCalError::Serialization(e.to_string()))
    }

    fn validate(&self) -> GoCalResult<()> {
        if self.feed.url.trim().is_empty() {
            return Err(GoCalError::Config("feed.url must not be empty".into()));
        }
        if self.site.export_views.is_empty() {
            return Err(GoCalError::Config(
                "site.export_views must name at least one view".into(),
            ));
        }
        Ok(())
    }

    /// Output directory with `~` expanded.
    pub fn dist_path(&self) -> PathBuf {
        expand(&self.output.dist_dir)
    }

    pub fn templates_path(&self) -> PathBuf {
        expand(&self.site.templates_dir)
    }

    pub fn site_dist_path(&self) -> PathBuf {
        expand(&self.site.dist_dir)
    }
}

fn expand(path: &Path) -> PathBuf {
    PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).into_owned())
}
