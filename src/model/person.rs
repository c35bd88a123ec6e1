// 🧍 Person Record - canonical in-memory entrant
//
// Every source (sheet row, XML element, store row) is first collected into a
// per-column value bag, then coerced into a PersonRecord here. Absence is
// always represented by omission: no empty strings, no "unknown" sex, no
// placeholder dates ever leave `project()`.

use crate::classes::GenderFormatter;
use crate::model::LogicalColumn;
use chrono::{Datelike, Local, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;

// ============================================================================
// GENDER
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Gender {
    #[default]
    Unspecified,
    Male,
    Female,
}

impl Gender {
    /// Genders that have a textual token, in parse priority order
    pub const KNOWN: [Gender; 2] = [Gender::Male, Gender::Female];

    pub fn name(&self) -> &'static str {
        match self {
            Gender::Unspecified => "Unspecified",
            Gender::Male => "Male",
            Gender::Female => "Female",
        }
    }

    pub fn is_unspecified(&self) -> bool {
        *self == Gender::Unspecified
    }

    /// Parse the enum name itself ("male", "Female", ...)
    pub fn from_name(text: &str) -> Option<Gender> {
        let key = text.trim();
        Gender::KNOWN
            .into_iter()
            .find(|g| g.name().eq_ignore_ascii_case(key))
    }

    /// Best-effort coercion of a sex cell: enum name first, then the
    /// convention's gender tokens. Unparsable text is `Unspecified`.
    pub fn from_text(text: &str, genders: &GenderFormatter) -> Gender {
        Gender::from_name(text)
            .or_else(|| genders.parse(text.trim()))
            .unwrap_or_default()
    }
}

// ============================================================================
// DATE OF BIRTH
// ============================================================================

/// Either a concrete calendar date or undefined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DateOfBirth {
    #[default]
    Undefined,
    Date(NaiveDate),
}

/// Plain date layouts accepted for birth dates
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d.%m.%Y", "%d/%m/%Y"];

/// Date-time layouts whose date part is taken
const DATE_TIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

impl DateOfBirth {
    pub fn date(&self) -> Option<NaiveDate> {
        match self {
            DateOfBirth::Undefined => None,
            DateOfBirth::Date(d) => Some(*d),
        }
    }

    pub fn is_defined(&self) -> bool {
        matches!(self, DateOfBirth::Date(_))
    }

    /// Parse a birth date cell; anything unrecognized is `Undefined`
    pub fn parse(text: &str) -> Self {
        Self::parse_relative_to(text, Local::now().date_naive())
    }

    /// Same as [`DateOfBirth::parse`], resolving two-digit personal number
    /// years against `today`
    pub fn parse_relative_to(text: &str, today: NaiveDate) -> Self {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return DateOfBirth::Undefined;
        }

        if let Some(date) = parse_digit_date(trimmed, today) {
            return DateOfBirth::Date(date);
        }

        for format in DATE_FORMATS {
            if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
                return DateOfBirth::Date(date);
            }
        }

        for format in DATE_TIME_FORMATS {
            if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, format) {
                return DateOfBirth::Date(dt.date());
            }
        }

        if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(trimmed) {
            return DateOfBirth::Date(dt.date_naive());
        }

        DateOfBirth::Undefined
    }
}

impl From<NaiveDate> for DateOfBirth {
    fn from(date: NaiveDate) -> Self {
        DateOfBirth::Date(date)
    }
}

impl Serialize for DateOfBirth {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.date().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for DateOfBirth {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let date = Option::<NaiveDate>::deserialize(deserializer)?;
        Ok(date.map(DateOfBirth::Date).unwrap_or_default())
    }
}

/// Compact digit forms: `YYYYMMDD` and Swedish personal numbers
/// (`YYYYMMDD-NNNN`, `YYYYMMDDNNNN`, `YYMMDD-NNNN`, `YYMMDD+NNNN`, `YYMMDDNNNN`).
fn parse_digit_date(text: &str, today: NaiveDate) -> Option<NaiveDate> {
    let (digits, centenarian) = match text.find(['-', '+']) {
        Some(pos) if text[pos + 1..].len() == 4 && pos >= 6 => {
            let (head, tail) = text.split_at(pos);
            if !tail[1..].chars().all(|c| c.is_ascii_digit()) {
                return None;
            }
            (head, tail.starts_with('+'))
        }
        Some(_) => return None,
        None => (text, false),
    };

    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    let date_part = match digits.len() {
        8 | 12 => &digits[..8],
        6 | 10 => &digits[..6],
        _ => return None,
    };

    if date_part.len() == 8 {
        let year: i32 = date_part[..4].parse().ok()?;
        let month: u32 = date_part[4..6].parse().ok()?;
        let day: u32 = date_part[6..8].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }

    let yy: i32 = date_part[..2].parse().ok()?;
    let month: u32 = date_part[2..4].parse().ok()?;
    let day: u32 = date_part[4..6].parse().ok()?;

    // latest century that does not put the birth date in the future
    let mut year = today.year() - today.year().rem_euclid(100) + yy;
    if year > today.year() {
        year -= 100;
    }
    if centenarian {
        year -= 100;
    }
    NaiveDate::from_ymd_opt(year, month, day).filter(|d| *d <= today)
}

// ============================================================================
// ENTITY REFERENCE
// ============================================================================

/// (name, id) reference to a nation or organization.
///
/// Equality is null-safe on both sides: equal name AND equal id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct EntityRef {
    #[serde(rename = "Name", default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "ID", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl EntityRef {
    pub fn new(name: Option<String>, id: Option<String>) -> Self {
        EntityRef {
            name: non_blank(name),
            id: non_blank(id),
        }
    }

    pub fn named(name: impl Into<String>) -> Self {
        EntityRef::new(Some(name.into()), None)
    }

    pub fn with_id(id: impl Into<String>) -> Self {
        EntityRef::new(None, Some(id.into()))
    }

    /// Bare text becomes the name when it is letters only, otherwise the id
    /// ("SWE" → name, "12563" → id).
    pub fn parse(text: &str) -> Option<EntityRef> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return None;
        }
        if trimmed.chars().all(char::is_alphabetic) {
            Some(EntityRef::named(trimmed))
        } else {
            Some(EntityRef::with_id(trimmed))
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.id.is_none()
    }

    /// Id when known, else name (tabular exports)
    pub fn id_or_name(&self) -> Option<&str> {
        self.id.as_deref().or(self.name.as_deref())
    }

    /// Name when known, else id
    pub fn name_or_id(&self) -> Option<&str> {
        self.name.as_deref().or(self.id.as_deref())
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

// ============================================================================
// FIELD VALUES
// ============================================================================

/// A single column value as delivered by a reader
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Sex(Gender),
    Date(NaiveDate),
    Entity(EntityRef),
}

impl FieldValue {
    pub fn text(value: impl Into<String>) -> Self {
        FieldValue::Text(value.into())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Flat text form for tabular sinks
    pub fn to_text(&self) -> String {
        match self {
            FieldValue::Text(s) => s.clone(),
            FieldValue::Sex(g) => g.name().to_string(),
            FieldValue::Date(d) => d.format("%Y-%m-%d").to_string(),
            FieldValue::Entity(e) => e.id_or_name().unwrap_or_default().to_string(),
        }
    }
}

/// Per-column values of one source item, ordered canonically
pub type ValueBag = BTreeMap<LogicalColumn, FieldValue>;

// ============================================================================
// PERSON RECORD
// ============================================================================

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PersonRecord {
    #[serde(rename = "ID", default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,

    #[serde(rename = "FirstName", default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,

    #[serde(rename = "Surname", default, skip_serializing_if = "Option::is_none")]
    pub surname: Option<String>,

    #[serde(rename = "Sex", default, skip_serializing_if = "Gender::is_unspecified")]
    pub sex: Gender,

    #[serde(rename = "DateOfBirth", default, skip_serializing_if = "is_undefined")]
    pub date_of_birth: DateOfBirth,

    #[serde(rename = "Phone", default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,

    #[serde(rename = "Email", default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(rename = "Nation", default, skip_serializing_if = "Option::is_none")]
    pub nation: Option<EntityRef>,

    #[serde(rename = "Organization", default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<EntityRef>,

    #[serde(rename = "Class", default, skip_serializing_if = "Option::is_none")]
    pub class_label: Option<String>,
}

fn is_undefined(dob: &DateOfBirth) -> bool {
    !dob.is_defined()
}

impl PersonRecord {
    pub fn new(first_name: impl Into<String>, surname: impl Into<String>) -> Self {
        PersonRecord {
            first_name: non_blank(Some(first_name.into())),
            surname: non_blank(Some(surname.into())),
            ..Default::default()
        }
    }

    /// Build a record from a raw value bag.
    ///
    /// Values of the wrong shape are coerced: text into a gender (enum name,
    /// then `genders` tokens), a birth date or an entity reference. Values
    /// that cannot be coerced leave the field absent.
    pub fn from_values(values: &ValueBag, genders: &GenderFormatter) -> Self {
        let mut person = PersonRecord::default();
        for (column, value) in values {
            if let Some(coerced) = coerce(*column, value, genders) {
                person.apply(*column, coerced);
            }
        }
        person
    }

    /// Populated value of a column, or `None` when absent
    pub fn get(&self, column: LogicalColumn) -> Option<FieldValue> {
        match column {
            LogicalColumn::Identifier => text_value(&self.identifier),
            LogicalColumn::FirstName => text_value(&self.first_name),
            LogicalColumn::Surname => text_value(&self.surname),
            LogicalColumn::Sex => match self.sex {
                Gender::Unspecified => None,
                g => Some(FieldValue::Sex(g)),
            },
            LogicalColumn::DateOfBirth => self.date_of_birth.date().map(FieldValue::Date),
            LogicalColumn::Phone => text_value(&self.phone),
            LogicalColumn::Email => text_value(&self.email),
            LogicalColumn::Nation => entity_value(&self.nation),
            LogicalColumn::Organization => entity_value(&self.organization),
            LogicalColumn::ClassLabel => text_value(&self.class_label),
        }
    }

    /// Set a column, coercing text the same way `from_values` does
    /// (sex text only by enum name). Uncoercible values clear the field.
    pub fn set(&mut self, column: LogicalColumn, value: FieldValue) {
        match coerce(column, &value, &GenderFormatter::NONE) {
            Some(coerced) => self.apply(column, coerced),
            None => self.clear(column),
        }
    }

    /// Populated columns in canonical order
    pub fn project(&self) -> ValueBag {
        LogicalColumn::ALL
            .iter()
            .filter_map(|c| self.get(*c).map(|v| (*c, v)))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        LogicalColumn::ALL.iter().all(|c| self.get(*c).is_none())
    }

    /// "id, first surname" for log lines
    pub fn describe(&self) -> String {
        format!(
            "{}, {} {}",
            self.identifier.as_deref().unwrap_or("-"),
            self.first_name.as_deref().unwrap_or(""),
            self.surname.as_deref().unwrap_or("")
        )
    }

    /// Store an already-coerced value
    fn apply(&mut self, column: LogicalColumn, value: FieldValue) {
        match (column, value) {
            (LogicalColumn::Identifier, FieldValue::Text(s)) => self.identifier = Some(s),
            (LogicalColumn::FirstName, FieldValue::Text(s)) => self.first_name = Some(s),
            (LogicalColumn::Surname, FieldValue::Text(s)) => self.surname = Some(s),
            (LogicalColumn::Phone, FieldValue::Text(s)) => self.phone = Some(s),
            (LogicalColumn::Email, FieldValue::Text(s)) => self.email = Some(s),
            (LogicalColumn::ClassLabel, FieldValue::Text(s)) => self.class_label = Some(s),
            (LogicalColumn::Sex, FieldValue::Sex(g)) => self.sex = g,
            (LogicalColumn::DateOfBirth, FieldValue::Date(d)) => {
                self.date_of_birth = DateOfBirth::Date(d)
            }
            (LogicalColumn::Nation, FieldValue::Entity(e)) => self.nation = Some(e),
            (LogicalColumn::Organization, FieldValue::Entity(e)) => self.organization = Some(e),
            (column, value) => {
                log::debug!("Ignoring {:?} for column {}", value, column);
            }
        }
    }

    fn clear(&mut self, column: LogicalColumn) {
        match column {
            LogicalColumn::Identifier => self.identifier = None,
            LogicalColumn::FirstName => self.first_name = None,
            LogicalColumn::Surname => self.surname = None,
            LogicalColumn::Sex => self.sex = Gender::Unspecified,
            LogicalColumn::DateOfBirth => self.date_of_birth = DateOfBirth::Undefined,
            LogicalColumn::Phone => self.phone = None,
            LogicalColumn::Email => self.email = None,
            LogicalColumn::Nation => self.nation = None,
            LogicalColumn::Organization => self.organization = None,
            LogicalColumn::ClassLabel => self.class_label = None,
        }
    }
}

fn text_value(value: &Option<String>) -> Option<FieldValue> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(FieldValue::text)
}

fn entity_value(value: &Option<EntityRef>) -> Option<FieldValue> {
    value
        .as_ref()
        .filter(|e| !e.is_empty())
        .cloned()
        .map(FieldValue::Entity)
}

/// Best-effort typed accessor: bring `value` into the shape `column` expects
fn coerce(column: LogicalColumn, value: &FieldValue, genders: &GenderFormatter) -> Option<FieldValue> {
    match column {
        c if c.is_text() => match value {
            FieldValue::Text(s) => Some(s.trim())
                .filter(|s| !s.is_empty())
                .map(FieldValue::text),
            FieldValue::Date(d) => Some(FieldValue::Text(d.format("%Y-%m-%d").to_string())),
            FieldValue::Entity(e) => e.name_or_id().map(FieldValue::text),
            FieldValue::Sex(_) => None,
        },
        LogicalColumn::Sex => match value {
            FieldValue::Sex(Gender::Unspecified) => None,
            FieldValue::Sex(g) => Some(FieldValue::Sex(*g)),
            FieldValue::Text(s) => match Gender::from_text(s, genders) {
                Gender::Unspecified => None,
                g => Some(FieldValue::Sex(g)),
            },
            _ => None,
        },
        LogicalColumn::DateOfBirth => match value {
            FieldValue::Date(d) => Some(FieldValue::Date(*d)),
            FieldValue::Text(s) => DateOfBirth::parse(s).date().map(FieldValue::Date),
            _ => None,
        },
        LogicalColumn::Nation | LogicalColumn::Organization => match value {
            FieldValue::Entity(e) if !e.is_empty() => Some(FieldValue::Entity(e.clone())),
            FieldValue::Text(s) => EntityRef::parse(s).map(FieldValue::Entity),
            _ => None,
        },
        _ => None,
    }
}
