//! Parser for the permit feed's `dayshours` column.
//!
//! The column looks like `Mo-We:7AM-8PM;Th/Fr:9AM-3PM/5PM-9PM`: `;` separates
//! segments, each segment is `DAYS:TIMES`, days are a range, a `/` list or a
//! single two-letter abbreviation, and times are `/`-separated `START-END`.

use std::collections::BTreeMap;

use chrono::Weekday;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Weekday name (`Monday` .. `Sunday`) to opening slots in input order.
pub type OpenHours = BTreeMap<String, Vec<TimeSlot>>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    pub start_time: String,
    pub end_time: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OpenHoursError {
    #[error("segment \"{0}\" has no ':' between days and times")]
    MissingSeparator(String),
    #[error("unknown day abbreviation \"{0}\"")]
    UnknownDay(String),
    #[error("time range \"{0}\" is not START-END")]
    BadTimeRange(String),
}

/// Parses a `dayshours` string. Blank input yields an empty map.
///
/// # Errors
///
/// Returns [`OpenHoursError`] on the first malformed segment.
pub fn parse_open_hours(raw: &str) -> Result<OpenHours, OpenHoursError> {
    let mut hours = OpenHours::new();

    for segment in raw.split(';').map(str::trim).filter(|s| !s.is_empty()) {
        let (days, times) = segment
            .split_once(':')
            .ok_or_else(|| OpenHoursError::MissingSeparator(segment.to_string()))?;

        let days = parse_days(days.trim())?;
        let slots = times
            .split('/')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(parse_slot)
            .collect::<Result<Vec<_>, _>>()?;

        for day in days {
            hours
                .entry(weekday_name(day).to_string())
                .or_default()
                .extend(slots.iter().cloned());
        }
    }

    Ok(hours)
}

fn parse_days(days: &str) -> Result<Vec<Weekday>, OpenHoursError> {
    if let Some((start, end)) = days.split_once('-') {
        let start = parse_day(start)?;
        let end = parse_day(end)?;
        let mut out = vec![start];
        let mut day = start;
        while day != end {
            day = day.succ();
            out.push(day);
        }
        return Ok(out);
    }

    days.split('/').map(parse_day).collect()
}

fn parse_day(abbr: &str) -> Result<Weekday, OpenHoursError> {
    match abbr.trim().to_ascii_lowercase().as_str() {
        "mo" => Ok(Weekday::Mon),
        "tu" => Ok(Weekday::Tue),
        "we" => Ok(Weekday::Wed),
        "th" => Ok(Weekday::Thu),
        "fr" => Ok(Weekday::Fri),
        "sa" => Ok(Weekday::Sat),
        "su" => Ok(Weekday::Sun),
        _ => Err(OpenHoursError::UnknownDay(abbr.to_string())),
    }
}

fn parse_slot(range: &str) -> Result<TimeSlot, OpenHoursError> {
    let bad = || OpenHoursError::BadTimeRange(range.to_string());
    let (start, end) = range.split_once('-').ok_or_else(bad)?;
    let (start, end) = (start.trim(), end.trim());
    let looks_like_time = |t: &str| t.chars().next().is_some_and(|c| c.is_ascii_digit());
    if !looks_like_time(start) || !looks_like_time(end) {
        return Err(bad());
    }
    Ok(TimeSlot {
        start_time: start.to_string(),
        end_time: end.to_string(),
    })
}

fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}
