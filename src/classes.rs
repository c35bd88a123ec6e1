// 🔤 Class & Gender Formatting
// Reversible text form of competition classes: "D 0-8", "H 12", "L 10-11"
//
//   name:  {gender token}{delimiter}{age}       age = "min" or "min{range}max"
//   parse: restart per gender, token → delimiter → greedy digits → [range → digits]

use crate::model::Gender;
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// CONVENTIONS
// ============================================================================

/// Named token sets used in configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Convention {
    /// Herr / Dam: `H`, `D`
    Swedish,
    /// Ski federation: `M`, `L`
    #[default]
    Federation,
}

impl Convention {
    pub fn genders(&self) -> GenderFormatter {
        match self {
            Convention::Swedish => GenderFormatter::SWEDISH,
            Convention::Federation => GenderFormatter::FEDERATION,
        }
    }

    pub fn classes(&self) -> ClassFormatter {
        match self {
            Convention::Swedish => ClassFormatter::SWEDISH,
            Convention::Federation => ClassFormatter::FEDERATION,
        }
    }
}

// ============================================================================
// GENDER FORMATTER
// ============================================================================

/// Gender ↔ token mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenderFormatter {
    male: &'static str,
    female: &'static str,
}

impl Default for GenderFormatter {
    fn default() -> Self {
        GenderFormatter::SWEDISH
    }
}

impl GenderFormatter {
    pub const SWEDISH: GenderFormatter = GenderFormatter::new("H", "D");
    pub const FEDERATION: GenderFormatter = GenderFormatter::new("M", "L");
    /// No tokens at all; `parse` always yields `None`
    pub const NONE: GenderFormatter = GenderFormatter::new("", "");

    pub const fn new(male: &'static str, female: &'static str) -> Self {
        GenderFormatter { male, female }
    }

    /// Token for a gender; unspecified is `""`
    pub fn name(&self, gender: Gender) -> &'static str {
        match gender {
            Gender::Male => self.male,
            Gender::Female => self.female,
            Gender::Unspecified => "",
        }
    }

    /// Left-anchored, case-insensitive token match.
    ///
    /// Trailing characters are tolerated ("Dam" → female with `D`);
    /// empty tokens never match.
    pub fn parse(&self, text: &str) -> Option<Gender> {
        let input: Vec<char> = text.to_lowercase().chars().collect();
        Gender::KNOWN
            .into_iter()
            .find(|g| self.match_token(&input, *g).is_some())
    }

    /// Position after the gender's token, scanning from the start of `input`
    fn match_token(&self, input: &[char], gender: Gender) -> Option<usize> {
        let token: Vec<char> = self.name(gender).to_lowercase().chars().collect();
        if token.is_empty() {
            return None;
        }
        match_at(input, 0, &token)
    }
}

fn match_at(input: &[char], pos: usize, expected: &[char]) -> Option<usize> {
    let end = pos + expected.len();
    if end <= input.len() && input[pos..end] == *expected {
        Some(end)
    } else {
        None
    }
}

// ============================================================================
// CLASS FORMATTER
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassFormatter {
    genders: GenderFormatter,
    delimiter: &'static str,
    range_delimiter: &'static str,
}

impl Default for ClassFormatter {
    fn default() -> Self {
        ClassFormatter::SWEDISH
    }
}

impl ClassFormatter {
    pub const SWEDISH: ClassFormatter = ClassFormatter::new(GenderFormatter::SWEDISH, " ", "-");
    pub const FEDERATION: ClassFormatter =
        ClassFormatter::new(GenderFormatter::FEDERATION, " ", "-");

    pub const fn new(
        genders: GenderFormatter,
        delimiter: &'static str,
        range_delimiter: &'static str,
    ) -> Self {
        ClassFormatter {
            genders,
            delimiter,
            range_delimiter,
        }
    }

    pub fn genders(&self) -> GenderFormatter {
        self.genders
    }

    /// Format a class; the age range is normalized to `min..max`
    pub fn name(&self, class: &CompetitionClass) -> String {
        let min = class.age_from.min(class.age_to);
        let max = class.age_from.max(class.age_to);
        let age = if min == max {
            min.to_string()
        } else {
            format!("{}{}{}", min, self.range_delimiter, max)
        };
        format!("{}{}{}", self.genders.name(class.gender), self.delimiter, age)
    }

    /// Parse a class label.
    ///
    /// Each gender candidate scans from the start of the input. A candidate
    /// whose first age is followed by something other than the range
    /// delimiter is abandoned; a missing or non-numeric age aborts the whole
    /// parse. Never panics.
    ///
    /// # Examples:
    /// ```
    /// use orgdb::classes::ClassFormatter;
    /// use orgdb::model::Gender;
    ///
    /// let class = ClassFormatter::SWEDISH.parse("D 0-8").unwrap();
    /// assert_eq!(class.gender, Gender::Female);
    /// assert_eq!((class.age_from, class.age_to), (0, 8));
    /// ```
    pub fn parse(&self, text: &str) -> Option<CompetitionClass> {
        let input: Vec<char> = text.trim().to_lowercase().chars().collect();
        let delimiter: Vec<char> = self.delimiter.to_lowercase().chars().collect();
        let range: Vec<char> = self.range_delimiter.to_lowercase().chars().collect();

        for gender in Gender::KNOWN {
            let Some(pos) = self.genders.match_token(&input, gender) else {
                continue;
            };
            let Some(start) = match_at(&input, pos, &delimiter) else {
                continue;
            };

            let digits = input[start..]
                .iter()
                .take_while(|c| c.is_ascii_digit())
                .count();
            let end = start + digits;

            if end == input.len() {
                let age = parse_age(&input[start..end])?;
                return Some(CompetitionClass::new(gender, age, age, *self));
            }

            if range.is_empty() {
                continue;
            }
            let Some(second) = match_at(&input, end, &range) else {
                continue;
            };

            let age_from = parse_age(&input[start..end])?;
            let age_to = parse_age(&input[second..])?;
            return Some(CompetitionClass::new(gender, age_from, age_to, *self));
        }

        log::debug!("Not a class label: {:?}", text);
        None
    }
}

fn parse_age(digits: &[char]) -> Option<i32> {
    if digits.is_empty() || !digits.iter().all(|c| c.is_ascii_digit()) {
        return None;
    }
    digits.iter().collect::<String>().parse().ok()
}

// ============================================================================
// COMPETITION CLASS
// ============================================================================

/// Gender plus inclusive age bracket; `age_from <= age_to` is not required
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompetitionClass {
    pub gender: Gender,
    pub age_from: i32,
    pub age_to: i32,
    formatter: ClassFormatter,
}

impl CompetitionClass {
    pub fn new(gender: Gender, age_from: i32, age_to: i32, formatter: ClassFormatter) -> Self {
        CompetitionClass {
            gender,
            age_from,
            age_to,
            formatter,
        }
    }

    pub fn name(&self) -> String {
        self.formatter.name(self)
    }

    pub fn formatter(&self) -> ClassFormatter {
        self.formatter
    }

    /// Bracket ordered low to high
    pub fn normalized(&self) -> Self {
        CompetitionClass {
            age_from: self.age_from.min(self.age_to),
            age_to: self.age_from.max(self.age_to),
            ..*self
        }
    }
}

impl fmt::Display for CompetitionClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gender_names() {
        assert_eq!(GenderFormatter::SWEDISH.name(Gender::Male), "H");
        assert_eq!(GenderFormatter::SWEDISH.name(Gender::Female), "D");
        assert_eq!(GenderFormatter::FEDERATION.name(Gender::Female), "L");
        assert_eq!(GenderFormatter::FEDERATION.name(Gender::Unspecified), "");
    }

    #[test]
    fn test_gender_parse_prefix() {
        let swedish = GenderFormatter::SWEDISH;
        assert_eq!(swedish.parse("H"), Some(Gender::Male));
        assert_eq!(swedish.parse("d"), Some(Gender::Female));
        assert_eq!(swedish.parse("Dam"), Some(Gender::Female));
        assert_eq!(swedish.parse("X"), None);
        assert_eq!(swedish.parse(""), None);
        assert_eq!(GenderFormatter::FEDERATION.parse("L"), Some(Gender::Female));
        assert_eq!(GenderFormatter::NONE.parse("anything"), None);
    }

    #[test]
    fn test_gender_parse_restarts_per_candidate() {
        // multi-character tokens sharing no prefix with the first candidate
        let formatter = GenderFormatter::new("Herr", "Dam");
        assert_eq!(formatter.parse("Dam"), Some(Gender::Female));
        assert_eq!(formatter.parse("Herr"), Some(Gender::Male));
        assert_eq!(formatter.parse("He"), None);
    }

    #[test]
    fn test_class_name() {
        let f = ClassFormatter::SWEDISH;
        assert_eq!(CompetitionClass::new(Gender::Female, 0, 8, f).name(), "D 0-8");
        assert_eq!(CompetitionClass::new(Gender::Male, 12, 12, f).name(), "H 12");
        assert_eq!(CompetitionClass::new(Gender::Male, 10, 8, f).name(), "H 8-10");
        assert_eq!(
            CompetitionClass::new(Gender::Female, 0, 8, ClassFormatter::FEDERATION).name(),
            "L 0-8"
        );
    }

    #[test]
    fn test_class_parse() {
        let f = ClassFormatter::SWEDISH;
        assert_eq!(f.parse("D 0-8"), Some(CompetitionClass::new(Gender::Female, 0, 8, f)));
        assert_eq!(f.parse("h 12"), Some(CompetitionClass::new(Gender::Male, 12, 12, f)));
        assert_eq!(f.parse("D 8-0"), Some(CompetitionClass::new(Gender::Female, 8, 0, f)));
    }

    #[test]
    fn test_class_parse_malformed() {
        let f = ClassFormatter::SWEDISH;
        assert_eq!(f.parse(""), None);
        assert_eq!(f.parse("D"), None);
        assert_eq!(f.parse("D "), None);
        assert_eq!(f.parse("D x"), None);
        assert_eq!(f.parse("D 0-"), None);
        assert_eq!(f.parse("D 0-8x"), None);
        assert_eq!(f.parse("D 0/8"), None);
        assert_eq!(f.parse("X 0-8"), None);
        assert_eq!(f.parse("D99999999999"), None);
        assert_eq!(f.parse("D 99999999999"), None);
    }

    #[test]
    fn test_class_parse_custom_delimiters() {
        let f = ClassFormatter::new(GenderFormatter::SWEDISH, "", "/");
        assert_eq!(f.parse("D10/11"), Some(CompetitionClass::new(Gender::Female, 10, 11, f)));
        assert_eq!(f.parse("D10-11"), None);
    }

    #[test]
    fn test_class_round_trip() {
        for formatter in [ClassFormatter::SWEDISH, ClassFormatter::FEDERATION] {
            for gender in Gender::KNOWN {
                for from in 0..=120 {
                    for to in [from, from + 1, 120] {
                        let class = CompetitionClass::new(gender, from, to, formatter);
                        assert_eq!(formatter.parse(&class.name()), Some(class));
                    }
                }
            }
        }
    }

    #[test]
    fn test_convention_presets() {
        assert_eq!(Convention::Swedish.classes(), ClassFormatter::SWEDISH);
        assert_eq!(Convention::Federation.genders(), GenderFormatter::FEDERATION);
        assert_eq!(Convention::default(), Convention::Federation);
    }
}
