// 📊 Spreadsheet persons (.xls, .xlsx, .xlsm, .xlsb)
// Reader: first worksheet, header row 0, data from row 1.
// Writer: one "Medlemsregister" sheet in canonical column order.

use crate::classes::GenderFormatter;
use crate::error::{OrgDbError, Result};
use crate::formats::table::{header_row, TableLayout};
use crate::formats::{PersonReader, PersonWriter};
use crate::model::{FieldValue, LogicalColumn, PersonRecord};
use crate::reconciliation::WriteSummary;
use calamine::{open_workbook_auto, Data, Range, Reader, Sheets};
use chrono::NaiveDate;
use rust_xlsxwriter::{Format, FormatBorder, Workbook};
use std::fs;
use std::path::{Path, PathBuf};

pub const SHEET_NAME: &str = "Medlemsregister";

const DATE_FORMAT: &str = "yyyy-mm-dd";

// ============================================================================
// SERIAL DATES
// ============================================================================

/// Day zero of the 1900 date system (as seen after the 1900 leap-year bug)
fn serial_epoch() -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(1899, 12, 30)
}

pub fn date_from_serial(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 1.0 {
        return None;
    }
    serial_epoch()?.checked_add_signed(chrono::Duration::days(serial.floor() as i64))
}

pub fn serial_from_date(date: NaiveDate) -> f64 {
    serial_epoch()
        .map(|epoch| (date - epoch).num_days() as f64)
        .unwrap_or_default()
}

/// Numbers without a trailing ".0"
fn number_text(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// Coerce one cell for the column it sits in
fn cell_value(cell: &Data, column: Option<LogicalColumn>) -> Option<FieldValue> {
    let is_date_column = column == Some(LogicalColumn::DateOfBirth);
    match cell {
        Data::Empty => None,
        Data::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| FieldValue::text(trimmed))
        }
        Data::Float(n) if is_date_column => date_from_serial(*n).map(FieldValue::Date),
        Data::Float(n) => Some(FieldValue::Text(number_text(*n))),
        Data::Int(n) if is_date_column => date_from_serial(*n as f64).map(FieldValue::Date),
        Data::Int(n) => Some(FieldValue::Text(n.to_string())),
        Data::Bool(b) => Some(FieldValue::text(if *b { "TRUE" } else { "FALSE" })),
        Data::DateTime(dt) => date_from_serial(dt.as_f64()).map(FieldValue::Date),
        Data::DateTimeIso(s) => Some(FieldValue::text(s.trim())),
        Data::Error(e) => {
            log::debug!("Cell error {:?}", e);
            None
        }
        Data::DurationIso(_) => None,
    }
}

fn header_text(cell: &Data) -> String {
    match cell {
        Data::String(s) => s.trim().to_string(),
        Data::Empty => String::new(),
        other => other.to_string(),
    }
}

// ============================================================================
// READER
// ============================================================================

pub struct SpreadsheetPersonReader {
    path: PathBuf,
    range: Range<Data>,
    genders: GenderFormatter,
}

impl SpreadsheetPersonReader {
    /// Load the first worksheet
    pub fn open(path: &Path, genders: GenderFormatter) -> Result<Self> {
        let mut workbook: Sheets<_> = open_workbook_auto(path)?;
        let first = workbook.sheet_names().first().cloned();
        let range = match first {
            Some(name) => workbook.worksheet_range(&name)?,
            None => Range::empty(),
        };
        log::debug!("Opened: {}", path.display());

        Ok(SpreadsheetPersonReader {
            path: path.to_path_buf(),
            range,
            genders,
        })
    }
}

impl PersonReader for SpreadsheetPersonReader {
    fn persons(&mut self) -> Result<Box<dyn Iterator<Item = Result<PersonRecord>> + '_>> {
        let mut rows = self.range.rows();
        let headers: Vec<String> = match rows.next() {
            Some(header) => header.iter().map(header_text).collect(),
            None => Vec::new(),
        };

        let Some(layout) = TableLayout::from_headers(&headers) else {
            log::error!("{}: Missing required columns", self.path.display());
            return Ok(Box::new(std::iter::empty()));
        };

        log::info!("Rows: {}", self.range.height().saturating_sub(1));
        let genders = self.genders;

        Ok(Box::new(rows.enumerate().filter_map(move |(i, row)| {
            let cells = row
                .iter()
                .enumerate()
                .map(|(col, cell)| cell_value(cell, layout.column(col)));
            let values = layout.values(cells);
            layout.record(i + 1, &values, &genders).map(Ok)
        })))
    }
}

// ============================================================================
// WRITER
// ============================================================================

pub struct SpreadsheetPersonWriter {
    path: PathBuf,
}

impl SpreadsheetPersonWriter {
    /// Nothing touches the disk until `write`
    pub fn create(path: &Path) -> Self {
        SpreadsheetPersonWriter {
            path: path.to_path_buf(),
        }
    }

    fn write_workbook(
        &self,
        persons: &mut dyn Iterator<Item = Result<PersonRecord>>,
    ) -> Result<WriteSummary> {
        let mut workbook = Workbook::new();
        let header_format = Format::new().set_bold().set_border(FormatBorder::Thin);
        let date_format = Format::new().set_num_format(DATE_FORMAT);

        let worksheet = workbook.add_worksheet().set_name(SHEET_NAME)?;
        for (col, name) in header_row().iter().enumerate() {
            worksheet.write_string_with_format(0, col as u16, *name, &header_format)?;
        }

        let mut summary = WriteSummary::default();
        let mut row: u32 = 1;
        for person in persons {
            let person = person?;
            let values = person.project();
            if values.is_empty() {
                summary.record_skipped();
                continue;
            }

            for (col, column) in LogicalColumn::ALL.iter().enumerate() {
                let col = col as u16;
                match values.get(column) {
                    Some(FieldValue::Date(date)) => {
                        worksheet.write_number_with_format(
                            row,
                            col,
                            serial_from_date(*date),
                            &date_format,
                        )?;
                    }
                    Some(value) => {
                        worksheet.write_string(row, col, value.to_text())?;
                    }
                    None => {}
                }
            }
            row += 1;
            summary.record_written();
        }

        worksheet.autofit();

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        workbook.save(&self.path)?;
        Ok(summary)
    }
}

impl PersonWriter for SpreadsheetPersonWriter {
    fn write(
        &mut self,
        persons: &mut dyn Iterator<Item = Result<PersonRecord>>,
    ) -> Result<WriteSummary> {
        log::debug!("Writing: {}", self.path.display());
        self.write_workbook(persons).map_err(|e| {
            log::error!("Write failed: {}", self.path.display());
            OrgDbError::write(&self.path, e)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DateOfBirth, EntityRef, Gender};

    fn tyra() -> PersonRecord {
        let mut person = PersonRecord::new("Tyra", "Kallur");
        person.identifier = Some("IID3262187".to_string());
        person.sex = Gender::Female;
        person.date_of_birth = DateOfBirth::Date(NaiveDate::from_ymd_opt(2011, 9, 3).unwrap());
        person.nation = Some(EntityRef::named("SWE"));
        person.phone = Some("0701234567".to_string());
        person
    }

    #[test]
    fn test_serial_dates() {
        let date = NaiveDate::from_ymd_opt(2011, 9, 3).unwrap();
        assert_eq!(serial_from_date(date), 40789.0);
        assert_eq!(date_from_serial(40789.0), Some(date));
        assert_eq!(date_from_serial(40789.75), Some(date));
        assert_eq!(date_from_serial(0.0), None);
        assert_eq!(date_from_serial(f64::NAN), None);
    }

    #[test]
    fn test_cell_coercion() {
        assert_eq!(cell_value(&Data::String("  Tyra ".into()), None), Some(FieldValue::text("Tyra")));
        assert_eq!(cell_value(&Data::String("   ".into()), None), None);
        assert_eq!(
            cell_value(&Data::Float(701234567.0), Some(LogicalColumn::Phone)),
            Some(FieldValue::text("701234567"))
        );
        assert_eq!(
            cell_value(&Data::Float(40789.0), Some(LogicalColumn::DateOfBirth)),
            Some(FieldValue::Date(NaiveDate::from_ymd_opt(2011, 9, 3).unwrap()))
        );
        assert_eq!(cell_value(&Data::Empty, Some(LogicalColumn::Email)), None);
    }

    #[test]
    fn test_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("members.xlsx");

        let mut writer = SpreadsheetPersonWriter::create(&path);
        let mut persons = vec![Ok(tyra()), Ok(PersonRecord::default())].into_iter();
        let summary = writer.write(&mut persons).unwrap();
        assert_eq!(summary.inserted, 1);
        assert_eq!(summary.skipped, 1);

        let mut reader = SpreadsheetPersonReader::open(&path, GenderFormatter::FEDERATION).unwrap();
        let read: Vec<PersonRecord> = reader
            .persons()
            .unwrap()
            .collect::<Result<Vec<_>>>()
            .unwrap();

        assert_eq!(read, vec![tyra()]);
    }

    #[test]
    fn test_missing_required_columns_yield_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.xlsx");
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 0, "Telefon").unwrap();
        sheet.write_string(1, 0, "070-111").unwrap();
        workbook.save(&path).unwrap();

        let mut reader = SpreadsheetPersonReader::open(&path, GenderFormatter::FEDERATION).unwrap();
        assert_eq!(reader.persons().unwrap().count(), 0);
    }

    #[test]
    fn test_federation_sheet_row() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("club.xlsx");
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        for (col, header) in ["Förnamn", "Efternamn", "Sex", "Födelsedat./Personnr.", "Okänd"]
            .iter()
            .enumerate()
        {
            sheet.write_string(0, col as u16, *header).unwrap();
        }
        sheet.write_string(1, 0, "Tyra").unwrap();
        sheet.write_string(1, 1, "Kallur").unwrap();
        sheet.write_string(1, 2, "L").unwrap();
        sheet.write_string(1, 3, "2011-09-03").unwrap();
        sheet.write_string(1, 4, "ignored").unwrap();
        sheet.write_string(2, 0, "Utan").unwrap();
        workbook.save(&path).unwrap();

        let mut reader = SpreadsheetPersonReader::open(&path, GenderFormatter::FEDERATION).unwrap();
        let read: Vec<PersonRecord> = reader
            .persons()
            .unwrap()
            .collect::<Result<Vec<_>>>()
            .unwrap();

        assert_eq!(read.len(), 1);
        assert_eq!(read[0].sex, Gender::Female);
        assert_eq!(
            read[0].date_of_birth.date(),
            NaiveDate::from_ymd_opt(2011, 9, 3)
        );
    }
}
