// 🧾 CSV persons
// Same column rules as the spreadsheet: header row, then one person per line.
// Semicolon-separated files (common in Swedish club exports) are detected
// from the header line.

use crate::classes::GenderFormatter;
use crate::error::{OrgDbError, Result};
use crate::formats::table::{header_row, text_row, TableLayout};
use crate::formats::{PersonReader, PersonWriter};
use crate::model::{FieldValue, PersonRecord};
use crate::reconciliation::WriteSummary;
use csv::{Reader, ReaderBuilder, Trim, Writer};
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// `;` when the header line has semicolons and no commas, else `,`
fn sniff_delimiter(path: &Path) -> Result<u8> {
    let mut first_line = Vec::new();
    BufReader::new(File::open(path)?).read_until(b'\n', &mut first_line)?;
    let delimiter = if first_line.contains(&b';') && !first_line.contains(&b',') {
        b';'
    } else {
        b','
    };
    Ok(delimiter)
}

pub struct CsvPersonReader {
    path: PathBuf,
    reader: Reader<File>,
    genders: GenderFormatter,
}

impl CsvPersonReader {
    pub fn open(path: &Path, genders: GenderFormatter) -> Result<Self> {
        let reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(Trim::All)
            .delimiter(sniff_delimiter(path)?)
            .from_path(path)?;
        log::debug!("Opened: {}", path.display());

        Ok(CsvPersonReader {
            path: path.to_path_buf(),
            reader,
            genders,
        })
    }
}

impl PersonReader for CsvPersonReader {
    fn persons(&mut self) -> Result<Box<dyn Iterator<Item = Result<PersonRecord>> + '_>> {
        let headers: Vec<String> = self
            .reader
            .byte_headers()?
            .iter()
            .enumerate()
            .map(|(i, header)| {
                let header = decode_cell(header);
                if i == 0 {
                    header.trim_start_matches(BOM).trim().to_string()
                } else {
                    header
                }
            })
            .collect();
        let Some(layout) = TableLayout::from_headers(&headers) else {
            log::error!("{}: Missing required columns", self.path.display());
            return Ok(Box::new(std::iter::empty()));
        };
        let genders = self.genders;

        Ok(Box::new(self.reader.byte_records().enumerate().filter_map(
            move |(i, record)| match record {
                Ok(record) => {
                    let cells = record
                        .iter()
                        .map(decode_cell)
                        .map(|cell| (!cell.is_empty()).then(|| FieldValue::text(cell)));
                    let values = layout.values(cells);
                    layout.record(i + 1, &values, &genders).map(Ok)
                }
                Err(e) => Some(Err(OrgDbError::from(e))),
            },
        )))
    }
}

const BOM: char = '\u{feff}';

/// Cells that are not UTF-8 (Windows-1252 exports) are decoded lossily
fn decode_cell(cell: &[u8]) -> String {
    match std::str::from_utf8(cell) {
        Ok(text) => text.to_string(),
        Err(_) => {
            log::warn!("Invalid UTF-8 in cell, decoded lossily");
            String::from_utf8_lossy(cell).into_owned()
        }
    }
}

pub struct CsvPersonWriter {
    path: PathBuf,
    writer: Writer<File>,
}

impl CsvPersonWriter {
    /// Creates (truncates) the file immediately
    pub fn create(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        Ok(CsvPersonWriter {
            path: path.to_path_buf(),
            writer: Writer::from_path(path)?,
        })
    }

    fn write_rows(
        &mut self,
        persons: &mut dyn Iterator<Item = Result<PersonRecord>>,
    ) -> Result<WriteSummary> {
        self.writer.write_record(header_row())?;

        let mut summary = WriteSummary::default();
        for person in persons {
            let person = person?;
            if person.is_empty() {
                summary.record_skipped();
                continue;
            }
            self.writer.write_record(text_row(&person))?;
            summary.record_written();
        }

        self.writer.flush()?;
        Ok(summary)
    }
}

impl PersonWriter for CsvPersonWriter {
    fn write(
        &mut self,
        persons: &mut dyn Iterator<Item = Result<PersonRecord>>,
    ) -> Result<WriteSummary> {
        log::debug!("Writing: {}", self.path.display());
        self.write_rows(persons).map_err(|e| {
            log::error!("Write failed: {}", self.path.display());
            OrgDbError::write(&self.path, e)
        })
    }
}
