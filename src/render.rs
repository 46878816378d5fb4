//! Colored console output for the generation run.
//!
//! Progress is grouped into phases drawn as a tree:
//! `┌<[START]`, `├─[SOURCE]`, ... `└<[END]`, with detail lines hanging off
//! the phase they belong to.

use gocal_core::event::Event;
use gocal_core::manifest::CalendarFile;
use gocal_core::timezone::REFERENCE_TIMEZONE;
use owo_colors::OwoColorize;

/// Extension trait for TUI rendering with colors.
pub trait Render {
    fn render(&self) -> String;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Start,
    Source,
    Calendar,
    Events,
    Export,
    Views,
    End,
}

impl Phase {
    fn label(self) -> &'static str {
        match self {
            Phase::Start => "START",
            Phase::Source => "SOURCE",
            Phase::Calendar => "CALENDAR",
            Phase::Events => "EVENTS",
            Phase::Export => "EXPORT",
            Phase::Views => "VIEWS",
            Phase::End => "END",
        }
    }

    fn branch(self) -> &'static str {
        match self {
            Phase::Start => "┌<",
            Phase::End => "└<",
            _ => "├─",
        }
    }

    /// The phase header followed by `message`.
    pub fn line(self, message: &str) -> String {
        let tag = format!("[{}]", self.label());
        let tag = match self {
            Phase::Start | Phase::End => tag.bold().to_string(),
            Phase::Source => tag.cyan().to_string(),
            Phase::Calendar => tag.blue().to_string(),
            Phase::Events => tag.magenta().to_string(),
            Phase::Export | Phase::Views => tag.green().to_string(),
        };
        format!("{}{} {}", self.branch().dimmed(), tag, message)
    }

    /// A detail line under the current phase.
    pub fn detail(message: &str) -> String {
        format!("{}  {}", "│".dimmed(), message)
    }

    pub fn print(self, message: &str) {
        println!("{}", self.line(message));
    }
}

impl Render for Event {
    fn render(&self) -> String {
        let span = self.localize(REFERENCE_TIMEZONE);
        let dates = if self.is_full_day {
            format!(
                "{} → {} (all day)",
                span.start.format("%Y-%m-%d"),
                span.end.format("%Y-%m-%d")
            )
        } else {
            format!(
                "{} → {}",
                span.start.format("%Y-%m-%d %H:%M"),
                span.end.format("%Y-%m-%d %H:%M")
            )
        };
        format!("{} {}", self.title, dates.dimmed())
    }
}

impl Render for CalendarFile {
    fn render(&self) -> String {
        format!("{} {}", self.path.display(), self.url.dimmed())
    }
}
