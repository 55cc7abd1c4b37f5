use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Pickup site identifier, e.g. `"Albufeira"`.
pub type Location = String;

/// Vehicle class code, e.g. `"B1"`. Compared for equality only.
pub type Group = String;

/// Rental duration in days.
pub type DayOffset = u32;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

// ---------------------------------------------------------------------------
// Month
// ---------------------------------------------------------------------------

/// Calendar month bucket (1-12).
///
/// There is no year component: November 2025 and November 2026 share the
/// same rules. This is a known modelling limitation of the rule table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Month(u8);

impl Month {
    pub fn new(value: u8) -> Result<Self, CoreError> {
        if (1..=12).contains(&value) {
            Ok(Self(value))
        } else {
            Err(CoreError::Validation(format!(
                "Month must be between 1 and 12, got {value}"
            )))
        }
    }

    /// Month bucket of a calendar date.
    pub fn of(date: NaiveDate) -> Self {
        // chrono guarantees 1..=12.
        Self(date.month() as u8)
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Month {
    type Error = CoreError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Month> for u8 {
    fn from(month: Month) -> Self {
        month.0
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// SlotKey
// ---------------------------------------------------------------------------

/// Fully qualified address of one leaf in the rule table.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SlotKey {
    pub location: Location,
    pub group: Group,
    pub month: Month,
    pub day: DayOffset,
}

impl SlotKey {
    pub fn new(
        location: impl Into<Location>,
        group: impl Into<Group>,
        month: Month,
        day: DayOffset,
    ) -> Self {
        Self {
            location: location.into(),
            group: group.into(),
            month,
            day,
        }
    }

    /// Key for a rental picked up on `pickup` and lasting `rental_days`.
    ///
    /// The month bucket is taken from the pickup date.
    pub fn for_pickup(
        location: impl Into<Location>,
        group: impl Into<Group>,
        pickup: NaiveDate,
        rental_days: DayOffset,
    ) -> Self {
        Self::new(location, group, Month::of(pickup), rental_days)
    }
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/month {}/{}d",
            self.location, self.group, self.month, self.day
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn month_accepts_calendar_range() {
        assert_eq!(Month::new(1).unwrap().get(), 1);
        assert_eq!(Month::new(12).unwrap().get(), 12);
    }

    #[test]
    fn month_rejects_out_of_range() {
        assert!(Month::new(0).is_err());
        assert!(Month::new(13).is_err());
    }

    #[test]
    fn pickup_date_selects_month_bucket() {
        let pickup = NaiveDate::from_ymd_opt(2025, 11, 28).unwrap();
        let key = SlotKey::for_pickup("Albufeira", "B1", pickup, 7);
        assert_eq!(key.month, Month::new(11).unwrap());
        assert_eq!(key.day, 7);
    }

    #[test]
    fn slot_key_display() {
        let key = SlotKey::new("Albufeira", "B1", Month::new(11).unwrap(), 7);
        assert_eq!(key.to_string(), "Albufeira/B1/month 11/7d");
    }
}
