// 📋 Tabular layout shared by the spreadsheet and CSV formats
// Row 0 is the header, data rows follow. Unknown headers are ignored.

use crate::classes::GenderFormatter;
use crate::model::{resolve_column, FieldValue, LogicalColumn, PersonRecord, ValueBag};

/// Column sets that identify a person, tried in order
pub const REQUIRED_COLUMN_SETS: &[&[LogicalColumn]] = &[
    &[LogicalColumn::FirstName, LogicalColumn::Surname],
    &[LogicalColumn::Identifier],
];

/// Header positions resolved to logical columns
#[derive(Debug, Clone, PartialEq)]
pub struct TableLayout {
    columns: Vec<Option<LogicalColumn>>,
    required: &'static [LogicalColumn],
}

impl TableLayout {
    /// Resolve a header row; `None` when no required column set is present
    pub fn from_headers<I, S>(headers: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let columns: Vec<Option<LogicalColumn>> = headers
            .into_iter()
            .map(|h| resolve_column(h.as_ref()))
            .collect();

        for (i, column) in columns.iter().enumerate() {
            if let Some(column) = column {
                log::debug!("Col{} = {}", i, column);
            }
        }

        let required = REQUIRED_COLUMN_SETS
            .iter()
            .find(|set| set.iter().all(|c| columns.contains(&Some(*c))))
            .copied()?;

        Some(TableLayout {
            columns,
            required,
        })
    }

    pub fn required(&self) -> &'static [LogicalColumn] {
        self.required
    }

    /// Logical column under header position `index`
    pub fn column(&self, index: usize) -> Option<LogicalColumn> {
        self.columns.get(index).copied().flatten()
    }

    /// Collect one row. Cells beyond the header and unresolved headers are
    /// dropped; a column seen twice keeps its first populated value.
    pub fn values<I>(&self, cells: I) -> ValueBag
    where
        I: IntoIterator<Item = Option<FieldValue>>,
    {
        let mut values = ValueBag::new();
        for (column, cell) in self.columns.iter().zip(cells) {
            if let (Some(column), Some(value)) = (column, cell) {
                values.entry(*column).or_insert(value);
            }
        }
        values
    }

    /// First required column the built record lacks
    pub fn missing_required(&self, person: &PersonRecord) -> Option<LogicalColumn> {
        self.required
            .iter()
            .copied()
            .find(|c| person.get(*c).is_none())
    }

    /// Build the record of data row `row_no`. Blank rows and rows missing a
    /// required value are logged and skipped.
    pub fn record(
        &self,
        row_no: usize,
        values: &ValueBag,
        genders: &GenderFormatter,
    ) -> Option<PersonRecord> {
        if values.is_empty() {
            log::debug!("Row{} is blank", row_no);
            return None;
        }

        let person = PersonRecord::from_values(values, genders);
        if let Some(column) = self.missing_required(&person) {
            log::error!("Row{}: Missing required {}", row_no, column);
            return None;
        }

        log::info!("Row{} = {}", row_no, person.describe());
        Some(person)
    }
}

/// Header row written by tabular sinks
pub fn header_row() -> Vec<&'static str> {
    LogicalColumn::ALL.iter().map(|c| c.name()).collect()
}

/// Cell text of one person in header order; absent values are empty
pub fn text_row(person: &PersonRecord) -> Vec<String> {
    LogicalColumn::ALL
        .iter()
        .map(|c| person.get(*c).map(|v| v.to_text()).unwrap_or_default())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Gender;

    #[test]
    fn test_layout_prefers_name_columns() {
        let layout = TableLayout::from_headers(["ID", "Förnamn", "Efternamn"]).unwrap();
        assert_eq!(
            layout.required(),
            &[LogicalColumn::FirstName, LogicalColumn::Surname]
        );
    }

    #[test]
    fn test_layout_falls_back_to_identifier() {
        let layout = TableLayout::from_headers(["ID", "Telefon"]).unwrap();
        assert_eq!(layout.required(), &[LogicalColumn::Identifier]);
    }

    #[test]
    fn test_layout_without_required_columns() {
        assert!(TableLayout::from_headers(["FirstName", "Telefon"]).is_none());
        assert!(TableLayout::from_headers(Vec::<String>::new()).is_none());
    }

    #[test]
    fn test_values_skip_unknown_headers() {
        let layout = TableLayout::from_headers(["FirstName", "Notes", "Surname"]).unwrap();
        let values = layout.values(vec![
            Some(FieldValue::text("Tyra")),
            Some(FieldValue::text("likes snow")),
            Some(FieldValue::text("Kallur")),
            Some(FieldValue::text("overflow")),
        ]);

        assert_eq!(values.len(), 2);
        assert_eq!(values[&LogicalColumn::Surname], FieldValue::text("Kallur"));
    }

    #[test]
    fn test_missing_required() {
        let layout = TableLayout::from_headers(["FirstName", "Surname"]).unwrap();
        let person = PersonRecord::new("Tyra", "");
        assert_eq!(layout.missing_required(&person), Some(LogicalColumn::Surname));
        assert_eq!(layout.missing_required(&PersonRecord::new("Tyra", "Kallur")), None);
    }

    #[test]
    fn test_record_skips_incomplete_rows() {
        let layout = TableLayout::from_headers(["FirstName", "Surname", "Sex"]).unwrap();
        let genders = GenderFormatter::FEDERATION;

        let mut values = ValueBag::new();
        assert!(layout.record(1, &values, &genders).is_none());

        values.insert(LogicalColumn::FirstName, FieldValue::text("Tyra"));
        values.insert(LogicalColumn::Sex, FieldValue::text("L"));
        assert!(layout.record(2, &values, &genders).is_none());

        values.insert(LogicalColumn::Surname, FieldValue::text("Kallur"));
        let person = layout.record(3, &values, &genders).unwrap();
        assert_eq!(person.sex, Gender::Female);
        assert_eq!(layout.column(2), Some(LogicalColumn::Sex));
        assert_eq!(layout.column(7), None);
    }

    #[test]
    fn test_text_row() {
        let mut person = PersonRecord::new("Tyra", "Kallur");
        person.sex = Gender::Female;
        let row = text_row(&person);

        assert_eq!(row.len(), header_row().len());
        assert_eq!(row[0], "");
        assert_eq!(row[1], "Tyra");
        assert_eq!(row[3], "Female");
    }
}
