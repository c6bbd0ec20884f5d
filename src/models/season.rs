//! NBA season identifiers (`2024-25`).

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Regular seasons start in October; earlier months belong to the season
/// that started the previous calendar year.
const SEASON_START_MONTH: u32 = 10;

/// One NBA season, identified by the calendar year it starts in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Season {
    start_year: i32,
}

impl Season {
    pub fn new(start_year: i32) -> Self {
        Self { start_year }
    }

    pub fn start_year(&self) -> i32 {
        self.start_year
    }

    /// Season in progress (or most recently finished) on `date`.
    pub fn containing(date: NaiveDate) -> Self {
        if date.month() >= SEASON_START_MONTH {
            Self::new(date.year())
        } else {
            Self::new(date.year() - 1)
        }
    }

    pub fn current() -> Self {
        Self::containing(chrono::Utc::now().date_naive())
    }

    pub fn previous(&self) -> Self {
        Self::new(self.start_year - 1)
    }

    /// The `count` seasons ending at `self`, oldest first.
    pub fn recent(&self, count: usize) -> Vec<Season> {
        let count = count.max(1) as i32;
        (0..count)
            .rev()
            .map(|back| Self::new(self.start_year - back))
            .collect()
    }

    /// Whether a career spanning `from_year..=to_year` (start years) overlaps this season.
    pub fn overlaps(&self, from_year: i32, to_year: i32) -> bool {
        from_year <= self.start_year && self.start_year <= to_year
    }
}

impl std::fmt::Display for Season {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}-{:02}",
            self.start_year,
            (self.start_year + 1).rem_euclid(100)
        )
    }
}

impl std::str::FromStr for Season {
    type Err = String;

    /// Accepts `2024-25` or a bare start year `2024`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (start, end) = match s.split_once('-') {
            Some((start, end)) => (start, Some(end)),
            None => (s, None),
        };

        let start_year: i32 = start
            .parse()
            .map_err(|_| format!("Invalid season '{}'. Expected format: 2024-25", s))?;

        if let Some(end) = end {
            let expected = format!("{:02}", (start_year + 1).rem_euclid(100));
            if end != expected {
                return Err(format!(
                    "Invalid season '{}'. Season {} should end in -{}",
                    s, start_year, expected
                ));
            }
        }

        Ok(Self::new(start_year))
    }
}

impl Serialize for Season {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Season {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
