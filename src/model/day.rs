use anyhow::{Result, anyhow};
use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Weekday tag used by tracker schedules. Variant order is the display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Day {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Day {
    pub const ALL: [Day; 7] = [
        Day::Monday,
        Day::Tuesday,
        Day::Wednesday,
        Day::Thursday,
        Day::Friday,
        Day::Saturday,
        Day::Sunday,
    ];

    /// ISO weekday of a calendar date. Independent of locale and first-weekday settings.
    pub fn of(date: NaiveDate) -> Self {
        Self::from(date.weekday())
    }

    pub fn full_name(self) -> &'static str {
        match self {
            Day::Monday => "Monday",
            Day::Tuesday => "Tuesday",
            Day::Wednesday => "Wednesday",
            Day::Thursday => "Thursday",
            Day::Friday => "Friday",
            Day::Saturday => "Saturday",
            Day::Sunday => "Sunday",
        }
    }

    pub fn short_name(self) -> &'static str {
        match self {
            Day::Monday => "Mon",
            Day::Tuesday => "Tue",
            Day::Wednesday => "Wed",
            Day::Thursday => "Thu",
            Day::Friday => "Fri",
            Day::Saturday => "Sat",
            Day::Sunday => "Sun",
        }
    }
}

impl From<Weekday> for Day {
    fn from(weekday: Weekday) -> Self {
        match weekday {
            Weekday::Mon => Day::Monday,
            Weekday::Tue => Day::Tuesday,
            Weekday::Wed => Day::Wednesday,
            Weekday::Thu => Day::Thursday,
            Weekday::Fri => Day::Friday,
            Weekday::Sat => Day::Saturday,
            Weekday::Sun => Day::Sunday,
        }
    }
}

impl FromStr for Day {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Self> {
        let normalized = raw.trim().to_lowercase();

        Day::ALL
            .into_iter()
            .find(|day| {
                normalized == day.full_name().to_lowercase()
                    || normalized == day.short_name().to_lowercase()
            })
            .ok_or_else(|| anyhow!("Invalid weekday: {raw}. Example: mon, Tuesday"))
    }
}

impl fmt::Display for Day {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.full_name())
    }
}

/// Parses a comma separated weekday list. `daily` expands to the whole week and
/// an empty string yields the empty schedule of a one-off event.
pub fn parse_schedule(raw: &str) -> Result<BTreeSet<Day>> {
    let trimmed = raw.trim();

    if trimmed.eq_ignore_ascii_case("daily") {
        return Ok(Day::ALL.into_iter().collect());
    }

    trimmed
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(Day::from_str)
        .collect()
}

pub fn format_schedule(schedule: &BTreeSet<Day>) -> String {
    match schedule.len() {
        0 => "event".to_string(),
        7 => "every day".to_string(),
        _ => schedule
            .iter()
            .map(|day| day.short_name())
            .collect::<Vec<_>>()
            .join(", "),
    }
}

#[cfg(test)]
mod tests {
    use super::{Day, format_schedule, parse_schedule};
    use chrono::NaiveDate;

    #[test]
    fn weekday_of_known_dates() {
        let monday = NaiveDate::from_ymd_opt(2024, 1, 1).expect("valid date");
        let sunday = NaiveDate::from_ymd_opt(2024, 1, 7).expect("valid date");

        assert_eq!(Day::of(monday), Day::Monday);
        assert_eq!(Day::of(sunday), Day::Sunday);
    }

    #[test]
    fn parses_short_and_full_names() {
        assert_eq!("mon".parse::<Day>().expect("short name"), Day::Monday);
        assert_eq!("  Friday ".parse::<Day>().expect("full name"), Day::Friday);
        assert!("funday".parse::<Day>().is_err());
    }

    #[test]
    fn schedule_is_sorted_and_deduplicated() {
        let schedule = parse_schedule("fri, mon,Friday").expect("schedule");

        assert_eq!(schedule.into_iter().collect::<Vec<_>>(), vec![Day::Monday, Day::Friday]);
    }

    #[test]
    fn empty_schedule_is_event() {
        let schedule = parse_schedule("").expect("schedule");

        assert!(schedule.is_empty());
        assert_eq!(format_schedule(&schedule), "event");
        assert_eq!(format_schedule(&parse_schedule("daily").expect("daily")), "every day");
    }
}
