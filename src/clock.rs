//! Wall-clock time of day in the 12-hour form operators type and read.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{NaiveTime, TimeDelta, Timelike};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::warn;

use crate::error::ClockError;

static TIME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+):(\d+)\s*(AM|PM)?").expect("time pattern compiles"));

/// A time of day. Arithmetic wraps past midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeOfDay(NaiveTime);

impl TimeOfDay {
    pub fn from_hm(hour: u32, minute: u32) -> Option<Self> {
        NaiveTime::from_hms_opt(hour, minute, 0).map(Self)
    }

    /// Parses operator input, falling back to 08:00 when it is unusable.
    pub fn parse_or_default(input: Option<&str>) -> Self {
        match input.map(str::parse::<TimeOfDay>) {
            Some(Ok(time)) => time,
            Some(Err(err)) => {
                warn!(%err, "falling back to default start time");
                Self::default()
            }
            None => Self::default(),
        }
    }

    pub fn hour(&self) -> u32 {
        self.0.hour()
    }

    pub fn minute(&self) -> u32 {
        self.0.minute()
    }

    pub fn plus_millis(&self, millis: i64) -> Self {
        Self(self.0 + TimeDelta::milliseconds(millis))
    }
}

impl Default for TimeOfDay {
    fn default() -> Self {
        Self(NaiveTime::from_hms_opt(8, 0, 0).unwrap_or(NaiveTime::MIN))
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (is_pm, hour) = self.0.hour12();
        let marker = if is_pm { "PM" } else { "AM" };
        write!(f, "{}:{:02} {}", hour, self.0.minute(), marker)
    }
}

/// Accepts the first `H:MM` found in the input, optionally followed by an
/// `AM`/`PM` marker. Without a marker the hour is taken as 24-hour.
impl FromStr for TimeOfDay {
    type Err = ClockError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let err = || ClockError(input.to_string());
        let caps = TIME_PATTERN.captures(input).ok_or_else(err)?;

        let mut hour: u32 = caps[1].parse().map_err(|_| err())?;
        let minute: u32 = caps[2].parse().map_err(|_| err())?;
        match caps.get(3).map(|m| m.as_str().to_ascii_uppercase()).as_deref() {
            Some("PM") if hour < 12 => hour += 12,
            Some("AM") if hour == 12 => hour = 0,
            _ => {}
        }

        Self::from_hm(hour, minute).ok_or_else(err)
    }
}

impl Serialize for TimeOfDay {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TimeOfDay {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
