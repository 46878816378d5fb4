//! Timezones a calendar set can be rendered in.

use std::fmt;

use chrono_tz::Tz;

use crate::error::{GoCalError, GoCalResult};

/// Zone used to localize "local time" calendars and to measure event
/// durations. It has no daylight-saving transitions, so re-localizing an
/// event never changes its length.
pub const REFERENCE_TIMEZONE: Tz = chrono_tz::Atlantic::Reykjavik;

/// Manifest name of the neutral, local-time calendars.
pub const LOCAL_TIMEZONE_NAME: &str = "Local Time";

/// The timezone a calendar container is rendered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalendarTimezone {
    /// Floating times with no embedded zone; each subscriber sees the
    /// event's wall-clock time in their own zone.
    Local,
    /// Explicit IANA zone embedded in the calendar.
    Named(Tz),
}

impl CalendarTimezone {
    pub fn parse(name: &str) -> GoCalResult<Self> {
        if name == LOCAL_TIMEZONE_NAME {
            return Ok(CalendarTimezone::Local);
        }
        name.parse::<Tz>()
            .map(CalendarTimezone::Named)
            .map_err(|_| GoCalError::UnknownTimezone(name.to_string()))
    }

    /// Name used as the manifest key.
    pub fn name(&self) -> &'static str {
        match self {
            CalendarTimezone::Local => LOCAL_TIMEZONE_NAME,
            CalendarTimezone::Named(tz) => tz.name(),
        }
    }

    /// Zone used for wall-clock conversion.
    pub fn zone(&self) -> Tz {
        match self {
            CalendarTimezone::Local => REFERENCE_TIMEZONE,
            CalendarTimezone::Named(tz) => *tz,
        }
    }

    /// Filename fragment, or None for the local calendars which carry no suffix.
    pub fn slug(&self) -> Option<String> {
        match self {
            CalendarTimezone::Local => None,
            CalendarTimezone::Named(tz) => Some(tz.name().to_lowercase().replace('/', "-")),
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, CalendarTimezone::Local)
    }
}

impl fmt::Display for CalendarTimezone {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// The timezones to render: always the local set first, then either the
/// requested zones or every zone `chrono-tz` knows about.
pub fn resolve_timezones(
    multi_timezone: bool,
    requested: &[String],
) -> GoCalResult<Vec<CalendarTimezone>> {
    let mut timezones = vec![CalendarTimezone::Local];

    if !multi_timezone {
        return Ok(timezones);
    }

    if requested.is_empty() {
        timezones.extend(chrono_tz::TZ_VARIANTS.iter().copied().map(CalendarTimezone::Named));
    } else {
        for name in requested {
            let tz = CalendarTimezone::parse(name)?;
            if !timezones.contains(&tz) {
                timezones.push(tz);
            }
        }
    }

    Ok(timezones)
}
