//! Core library for gocal.
//!
//! Turns the ScrapedDuck event feed into subscribable calendars:
//! - `event`: feed records → typed, classified events
//! - `category`: category keys, acronyms and the per-run registry
//! - `builder`: one calendar per timezone × category
//! - `manifest` / `ics`: calendar files and the download manifest
//! - `template` / `site`: the static download site

pub mod builder;
pub mod category;
pub mod config;
pub mod error;
pub mod event;
pub mod feed;
pub mod ics;
pub mod manifest;
pub mod pipeline;
pub mod sink;
pub mod site;
pub mod template;
pub mod timezone;

pub use config::GoCalConfig;
pub use error::{GoCalError, GoCalResult, TemplateError};
pub use pipeline::{GenerateReport, Generator};
