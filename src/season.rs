// 📅 Season Calculator
// Seasons break on July 1: 2018-07-01 .. 2019-06-30 is season "2018/2019".
//
// Class brackets for a season:
//   age_to   = season end year - birth year
//   age_from = age_to when age_to > 8, else 0   (everyone 8 and younger races together)

use crate::classes::{ClassFormatter, CompetitionClass};
use crate::model::Gender;
use chrono::{Datelike, Local, NaiveDate, NaiveDateTime};

/// Age up to which all children share one bracket
pub const YOUTH_BRACKET_MAX_AGE: i32 = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Season {
    pub from_year: i32,
    pub to_year: i32,
    /// "{from}/{to}"
    pub label: String,
}

impl Season {
    /// Season containing the given instant
    pub fn containing(instant: NaiveDateTime) -> Self {
        let year = instant.year();
        let next_season = instant.month() >= 7;
        let to_year = if next_season { year + 1 } else { year };
        Season::ending(to_year)
    }

    /// Season containing the given day
    pub fn containing_date(date: NaiveDate) -> Self {
        Season::containing(date.and_time(chrono::NaiveTime::MIN))
    }

    /// Season of the local clock
    pub fn current() -> Self {
        Season::containing(Local::now().naive_local())
    }

    /// Season that ends in `to_year`
    pub fn ending(to_year: i32) -> Self {
        let from_year = to_year - 1;
        Season {
            from_year,
            to_year,
            label: format!("{}/{}", from_year, to_year),
        }
    }

    /// A bare four-digit year ("2019") means January 1 of that year;
    /// anything else is `None`
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if text.len() != 4 || !text.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let year: i32 = text.parse().ok()?;
        NaiveDate::from_ymd_opt(year, 1, 1).map(Season::containing_date)
    }

    pub fn class_for(
        &self,
        gender: Gender,
        date_of_birth: NaiveDate,
        formatter: ClassFormatter,
    ) -> CompetitionClass {
        let age_to = self.to_year - date_of_birth.year();
        let age_from = if age_to > YOUTH_BRACKET_MAX_AGE { age_to } else { 0 };
        CompetitionClass::new(gender, age_from, age_to, formatter)
    }

    pub fn class_name(
        &self,
        gender: Gender,
        date_of_birth: NaiveDate,
        formatter: ClassFormatter,
    ) -> String {
        self.class_for(gender, date_of_birth, formatter).name()
    }
}
