//! Error types for the gocal pipeline.

use thiserror::Error;

/// Errors that can occur while generating calendars or rendering the site.
#[derive(Error, Debug)]
pub enum GoCalError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to fetch feed: {0}")]
    Fetch(String),

    #[error("Feed is not a valid JSON array of events: {0}")]
    FeedJson(#[from] serde_json::Error),

    #[error("Invalid feed record #{index}: {reason}")]
    InvalidRecord { index: usize, reason: String },

    #[error("No calendar registered for category '{0}'")]
    UnknownCategory(String),

    #[error("Unknown timezone '{0}'")]
    UnknownTimezone(String),

    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    #[error("ICS generation error: {0}")]
    Ics(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Template/data mismatches found while rendering views.
#[derive(Error, Debug, PartialEq)]
pub enum TemplateError {
    #[error("view '{view}' loops over '{source_name}', which is not in the render context")]
    MissingLoopSource { view: String, source_name: String },

    #[error("view '{view}' loops over '{source_name}', which is not a list or map")]
    InvalidLoopSource { view: String, source_name: String },

    #[error("view '{view}' loops over '{source_name}', but item #{position} is not a map")]
    InvalidLoopRecord {
        view: String,
        source_name: String,
        position: usize,
    },

    #[error("view '{view}' includes unknown view '{include}'")]
    UnknownInclude { view: String, include: String },

    #[error("include cycle detected: {}", chain.join(" -> "))]
    IncludeCycle { chain: Vec<String> },
}

/// Result type alias for gocal operations.
pub type GoCalResult<T> = Result<T, GoCalError>;
