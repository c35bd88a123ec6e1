// 🏷️ Logical Columns - canonical person schema
// Header text from any source (spreadsheet, XML element, SQL) resolves here.

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// LOGICAL COLUMN
// ============================================================================

/// One named field of the canonical person schema.
///
/// Declaration order is the serialization order used for spreadsheet
/// headers and SQL columns. `Ord` follows it, so a `BTreeMap` keyed by
/// column iterates in canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LogicalColumn {
    #[serde(rename = "ID")]
    Identifier,
    FirstName,
    Surname,
    Sex,
    DateOfBirth,
    Phone,
    Email,
    Nation,
    Organization,
    #[serde(rename = "Class")]
    ClassLabel,
}

impl LogicalColumn {
    /// All columns in canonical order
    pub const ALL: [LogicalColumn; 10] = [
        LogicalColumn::Identifier,
        LogicalColumn::FirstName,
        LogicalColumn::Surname,
        LogicalColumn::Sex,
        LogicalColumn::DateOfBirth,
        LogicalColumn::Phone,
        LogicalColumn::Email,
        LogicalColumn::Nation,
        LogicalColumn::Organization,
        LogicalColumn::ClassLabel,
    ];

    /// Canonical name: header text, XML element name and SQL column name
    pub fn name(&self) -> &'static str {
        match self {
            LogicalColumn::Identifier => "ID",
            LogicalColumn::FirstName => "FirstName",
            LogicalColumn::Surname => "Surname",
            LogicalColumn::Sex => "Sex",
            LogicalColumn::DateOfBirth => "DateOfBirth",
            LogicalColumn::Phone => "Phone",
            LogicalColumn::Email => "Email",
            LogicalColumn::Nation => "Nation",
            LogicalColumn::Organization => "Organization",
            LogicalColumn::ClassLabel => "Class",
        }
    }

    /// Columns compared as plain text during reconciliation
    pub fn is_text(&self) -> bool {
        matches!(
            self,
            LogicalColumn::Identifier
                | LogicalColumn::FirstName
                | LogicalColumn::Surname
                | LogicalColumn::Phone
                | LogicalColumn::Email
                | LogicalColumn::ClassLabel
        )
    }
}

impl fmt::Display for LogicalColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// HEADER RESOLUTION
// ============================================================================

/// Swedish/English header variants seen in club registers and federation exports
const SYNONYMS: &[(&str, LogicalColumn)] = &[
    ("förnamn", LogicalColumn::FirstName),
    ("name", LogicalColumn::FirstName),
    ("firstname", LogicalColumn::FirstName),
    ("efternamn", LogicalColumn::Surname),
    ("lastname", LogicalColumn::Surname),
    ("födelsedat./personnr.", LogicalColumn::DateOfBirth),
    ("födelsedat", LogicalColumn::DateOfBirth),
    ("personnr", LogicalColumn::DateOfBirth),
    ("birthdate", LogicalColumn::DateOfBirth),
    ("socialsecuritynumber", LogicalColumn::DateOfBirth),
    ("telefon mobil", LogicalColumn::Phone),
    ("telefon", LogicalColumn::Phone),
    ("mobil", LogicalColumn::Phone),
    ("cell", LogicalColumn::Phone),
    ("e-post kontakt", LogicalColumn::Email),
    ("e-post", LogicalColumn::Email),
    ("epost", LogicalColumn::Email),
    ("mail", LogicalColumn::Email),
];

/// Resolve a header (or element name) to a logical column.
///
/// Canonical names match case-insensitively first, then the synonym table.
/// Unknown headers resolve to `None` and are ignored by ingestion.
///
/// # Examples:
/// ```
/// use orgdb::model::{resolve_column, LogicalColumn};
///
/// assert_eq!(resolve_column("Efternamn"), Some(LogicalColumn::Surname));
/// assert_eq!(resolve_column("Unknown Header"), None);
/// ```
pub fn resolve_column(header: &str) -> Option<LogicalColumn> {
    let key = header.trim().to_lowercase();
    if key.is_empty() {
        return None;
    }

    if let Some(column) = LogicalColumn::ALL
        .iter()
        .find(|c| c.name().to_lowercase() == key)
    {
        return Some(*column);
    }

    SYNONYMS
        .iter()
        .find(|(synonym, _)| *synonym == key)
        .map(|(_, column)| *column)
}
