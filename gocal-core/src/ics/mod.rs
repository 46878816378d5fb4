//! ICS calendar file generation.
//!
//! Turns calendar containers into RFC 5545 documents via the `icalendar` crate.

mod generate;
mod vtimezone;

pub use generate::{PRODUCT_ID, generate_calendar_ics};
pub use vtimezone::build_vtimezone;
