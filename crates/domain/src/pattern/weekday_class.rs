//! Weekday classes used to group time-based observations.

use std::fmt;

use chrono::Weekday;
use serde::{Deserialize, Serialize};

/// A single weekday or one of the derived `weekdays` / `weekend` classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeekdayClass {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
    /// Monday through Friday.
    Weekdays,
    /// Saturday and Sunday.
    Weekend,
}

impl WeekdayClass {
    /// The class holding exactly `day`.
    #[must_use]
    pub fn of_day(day: Weekday) -> Self {
        match day {
            Weekday::Mon => Self::Monday,
            Weekday::Tue => Self::Tuesday,
            Weekday::Wed => Self::Wednesday,
            Weekday::Thu => Self::Thursday,
            Weekday::Fri => Self::Friday,
            Weekday::Sat => Self::Saturday,
            Weekday::Sun => Self::Sunday,
        }
    }

    /// The derived class (`weekdays` or `weekend`) holding `day`.
    #[must_use]
    pub fn derived_of(day: Weekday) -> Self {
        match day {
            Weekday::Sat | Weekday::Sun => Self::Weekend,
            _ => Self::Weekdays,
        }
    }

    /// Whether `day` belongs to this class.
    #[must_use]
    pub fn contains(self, day: Weekday) -> bool {
        match self {
            Self::Weekdays => Self::derived_of(day) == Self::Weekdays,
            Self::Weekend => Self::derived_of(day) == Self::Weekend,
            single => Self::of_day(day) == single,
        }
    }

    /// Whether this is one of the derived multi-day classes.
    #[must_use]
    pub fn is_derived(self) -> bool {
        matches!(self, Self::Weekdays | Self::Weekend)
    }
}

impl fmt::Display for WeekdayClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Monday => "monday",
            Self::Tuesday => "tuesday",
            Self::Wednesday => "wednesday",
            Self::Thursday => "thursday",
            Self::Friday => "friday",
            Self::Saturday => "saturday",
            Self::Sunday => "sunday",
            Self::Weekdays => "weekdays",
            Self::Weekend => "weekend",
        };
        f.write_str(name)
    }
}
