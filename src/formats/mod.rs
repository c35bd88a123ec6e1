// 🏗️ Format Registry
// Readers and writers self-select by inspecting a file path.
//
// Each registry is an ordered list of closed format variants; the first
// variant that accepts a path opens it. Registration order is priority.
//
//   person readers:        spreadsheet → csv → participant xml → sqlite
//   person writers:        sqlite → spreadsheet → csv
//   competition readers:   person sheet
//   competition writers:   json → entry xml

pub mod competition_json;
pub mod competition_sheet;
pub mod delimited;
pub mod entry_xml;
pub mod participant_xml;
pub mod spreadsheet;
pub mod sqlite;
pub mod table;

use crate::classes::Convention;
use crate::config::{CompetitionDefaults, EntryDefaults, Settings};
use crate::error::{OrgDbError, Result};
use crate::model::{CompetitionRecord, PersonRecord};
use crate::reconciliation::WriteSummary;
use std::path::Path;

// ============================================================================
// TRAITS
// ============================================================================

/// Stream of person records; a reader owns its file handle or connection
pub trait PersonReader {
    fn persons(&mut self) -> Result<Box<dyn Iterator<Item = Result<PersonRecord>> + '_>>;
}

/// Sink for person records; the first error aborts the write
pub trait PersonWriter {
    fn write(
        &mut self,
        persons: &mut dyn Iterator<Item = Result<PersonRecord>>,
    ) -> Result<WriteSummary>;
}

pub trait CompetitionReader {
    fn competition(&mut self) -> Result<CompetitionRecord>;
}

pub trait CompetitionWriter {
    fn write(&mut self, competition: &CompetitionRecord) -> Result<()>;
}

/// Settings that readers and writers act on
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FormatOptions {
    /// SQLite writer: update known persons only
    pub no_insert: bool,
    /// Tokens accepted in sex cells
    pub sex_convention: Convention,
    pub competition: CompetitionDefaults,
}

impl FormatOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        FormatOptions {
            no_insert: false,
            sex_convention: settings.sex_convention,
            competition: settings.competition.clone(),
        }
    }

    pub fn with_no_insert(mut self, no_insert: bool) -> Self {
        self.no_insert = no_insert;
        self
    }

    pub fn entry(&self) -> &EntryDefaults {
        &self.competition.entry
    }
}

// ============================================================================
// PATH INSPECTION
// ============================================================================

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default()
}

fn file_name(path: &Path) -> &str {
    path.file_name().and_then(|n| n.to_str()).unwrap_or("")
}

fn is_spreadsheet(path: &Path) -> bool {
    extension(path).starts_with("xls")
}

fn is_csv(path: &Path) -> bool {
    extension(path) == "csv"
}

fn is_xml(path: &Path) -> bool {
    extension(path) == "xml"
}

fn is_sqlite(path: &Path) -> bool {
    extension(path) == "sqlite"
}

// ============================================================================
// PERSON FORMATS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersonReaderFormat {
    Spreadsheet,
    Csv,
    ParticipantXml,
    Sqlite,
}

impl PersonReaderFormat {
    pub const DEFAULT_ORDER: [PersonReaderFormat; 4] = [
        PersonReaderFormat::Spreadsheet,
        PersonReaderFormat::Csv,
        PersonReaderFormat::ParticipantXml,
        PersonReaderFormat::Sqlite,
    ];

    /// Inspects the path only; never touches the file
    pub fn accepts(&self, path: &Path) -> bool {
        match self {
            PersonReaderFormat::Spreadsheet => is_spreadsheet(path),
            PersonReaderFormat::Csv => is_csv(path),
            PersonReaderFormat::ParticipantXml => {
                is_xml(path) && file_name(path).contains(participant_xml::FILE_MARKER)
            }
            PersonReaderFormat::Sqlite => is_sqlite(path),
        }
    }

    pub fn open(&self, path: &Path, options: &FormatOptions) -> Result<Box<dyn PersonReader>> {
        let genders = options.sex_convention.genders();
        Ok(match self {
            PersonReaderFormat::Spreadsheet => {
                Box::new(spreadsheet::SpreadsheetPersonReader::open(path, genders)?)
            }
            PersonReaderFormat::Csv => Box::new(delimited::CsvPersonReader::open(path, genders)?),
            PersonReaderFormat::ParticipantXml => {
                Box::new(participant_xml::ParticipantXmlReader::open(path)?)
            }
            PersonReaderFormat::Sqlite => Box::new(sqlite::SqlitePersonReader::open(path)?),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersonWriterFormat {
    Sqlite,
    Spreadsheet,
    Csv,
}

impl PersonWriterFormat {
    pub const DEFAULT_ORDER: [PersonWriterFormat; 3] = [
        PersonWriterFormat::Sqlite,
        PersonWriterFormat::Spreadsheet,
        PersonWriterFormat::Csv,
    ];

    pub fn accepts(&self, path: &Path) -> bool {
        match self {
            PersonWriterFormat::Sqlite => is_sqlite(path),
            PersonWriterFormat::Spreadsheet => is_spreadsheet(path),
            PersonWriterFormat::Csv => is_csv(path),
        }
    }

    pub fn open(&self, path: &Path, options: &FormatOptions) -> Result<Box<dyn PersonWriter>> {
        Ok(match self {
            PersonWriterFormat::Sqlite => {
                Box::new(sqlite::SqlitePersonWriter::open(path, options.no_insert)?)
            }
            PersonWriterFormat::Spreadsheet => {
                Box::new(spreadsheet::SpreadsheetPersonWriter::create(path))
            }
            PersonWriterFormat::Csv => Box::new(delimited::CsvPersonWriter::create(path)?),
        })
    }
}

/// Person readers and writers in priority order
#[derive(Debug, Clone, PartialEq)]
pub struct PersonRegistry {
    readers: Vec<PersonReaderFormat>,
    writers: Vec<PersonWriterFormat>,
    options: FormatOptions,
}

impl PersonRegistry {
    pub fn new(options: FormatOptions) -> Self {
        PersonRegistry {
            readers: PersonReaderFormat::DEFAULT_ORDER.to_vec(),
            writers: PersonWriterFormat::DEFAULT_ORDER.to_vec(),
            options,
        }
    }

    pub fn options(&self) -> &FormatOptions {
        &self.options
    }

    pub fn readers(&self) -> &[PersonReaderFormat] {
        &self.readers
    }

    pub fn writers(&self) -> &[PersonWriterFormat] {
        &self.writers
    }

    pub fn reader_format(&self, path: &Path) -> Option<PersonReaderFormat> {
        self.readers.iter().copied().find(|f| f.accepts(path))
    }

    pub fn writer_format(&self, path: &Path) -> Option<PersonWriterFormat> {
        self.writers.iter().copied().find(|f| f.accepts(path))
    }

    /// First accepting reader, opened. `Ok(None)` when no format accepts the path.
    pub fn try_get_reader(&self, path: &Path) -> Result<Option<Box<dyn PersonReader>>> {
        match self.reader_format(path) {
            Some(format) => {
                log::debug!("{:?} reader for {}", format, path.display());
                format.open(path, &self.options).map(Some)
            }
            None => Ok(None),
        }
    }

    pub fn try_get_writer(&self, path: &Path) -> Result<Option<Box<dyn PersonWriter>>> {
        match self.writer_format(path) {
            Some(format) => {
                log::debug!("{:?} writer for {}", format, path.display());
                format.open(path, &self.options).map(Some)
            }
            None => Ok(None),
        }
    }

    pub fn reader(&self, path: &Path) -> Result<Box<dyn PersonReader>> {
        self.try_get_reader(path)?
            .ok_or_else(|| OrgDbError::UnsupportedFormat(path.to_path_buf()))
    }

    pub fn writer(&self, path: &Path) -> Result<Box<dyn PersonWriter>> {
        self.try_get_writer(path)?
            .ok_or_else(|| OrgDbError::UnsupportedFormat(path.to_path_buf()))
    }
}

// ============================================================================
// COMPETITION FORMATS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompetitionReaderFormat {
    PersonSheet,
}

impl CompetitionReaderFormat {
    pub const DEFAULT_ORDER: [CompetitionReaderFormat; 1] = [CompetitionReaderFormat::PersonSheet];

    pub fn accepts(&self, path: &Path) -> bool {
        match self {
            CompetitionReaderFormat::PersonSheet => is_spreadsheet(path) || is_csv(path),
        }
    }

    pub fn open(
        &self,
        path: &Path,
        persons: &PersonRegistry,
    ) -> Result<Option<Box<dyn CompetitionReader>>> {
        match self {
            CompetitionReaderFormat::PersonSheet => {
                let reader = competition_sheet::PersonSheetCompetitionReader::open(path, persons)?;
                Ok(reader.map(|r| Box::new(r) as Box<dyn CompetitionReader>))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompetitionWriterFormat {
    Json,
    EntryXml,
}

impl CompetitionWriterFormat {
    pub const DEFAULT_ORDER: [CompetitionWriterFormat; 2] = [
        CompetitionWriterFormat::Json,
        CompetitionWriterFormat::EntryXml,
    ];

    pub fn accepts(&self, path: &Path) -> bool {
        match self {
            CompetitionWriterFormat::Json => extension(path) == "json",
            CompetitionWriterFormat::EntryXml => {
                is_xml(path) && file_name(path).starts_with(entry_xml::FILE_PREFIX)
            }
        }
    }

    pub fn open(&self, path: &Path, options: &FormatOptions) -> Box<dyn CompetitionWriter> {
        match self {
            CompetitionWriterFormat::Json => {
                Box::new(competition_json::JsonCompetitionWriter::create(path))
            }
            CompetitionWriterFormat::EntryXml => Box::new(entry_xml::EntryXmlWriter::create(
                path,
                options.entry().clone(),
            )),
        }
    }
}

/// Competition readers and writers; persons are read through `persons`
#[derive(Debug, Clone, PartialEq)]
pub struct CompetitionRegistry {
    readers: Vec<CompetitionReaderFormat>,
    writers: Vec<CompetitionWriterFormat>,
    persons: PersonRegistry,
}

impl CompetitionRegistry {
    pub fn new(persons: PersonRegistry) -> Self {
        CompetitionRegistry {
            readers: CompetitionReaderFormat::DEFAULT_ORDER.to_vec(),
            writers: CompetitionWriterFormat::DEFAULT_ORDER.to_vec(),
            persons,
        }
    }

    pub fn readers(&self) -> &[CompetitionReaderFormat] {
        &self.readers
    }

    pub fn writers(&self) -> &[CompetitionWriterFormat] {
        &self.writers
    }

    pub fn try_get_reader(&self, path: &Path) -> Result<Option<Box<dyn CompetitionReader>>> {
        for format in self.readers.iter().filter(|f| f.accepts(path)) {
            if let Some(reader) = format.open(path, &self.persons)? {
                log::debug!("{:?} competition reader for {}", format, path.display());
                return Ok(Some(reader));
            }
        }
        Ok(None)
    }

    pub fn try_get_writer(&self, path: &Path) -> Result<Option<Box<dyn CompetitionWriter>>> {
        Ok(self
            .writers
            .iter()
            .find(|f| f.accepts(path))
            .map(|f| f.open(path, self.persons.options())))
    }

    pub fn reader(&self, path: &Path) -> Result<Box<dyn CompetitionReader>> {
        self.try_get_reader(path)?
            .ok_or_else(|| OrgDbError::UnsupportedFormat(path.to_path_buf()))
    }

    pub fn writer(&self, path: &Path) -> Result<Box<dyn CompetitionWriter>> {
        self.try_get_writer(path)?
            .ok_or_else(|| OrgDbError::UnsupportedFormat(path.to_path_buf()))
    }
}

/// Both registries, built once per run
#[derive(Debug, Clone, PartialEq)]
pub struct Registries {
    pub persons: PersonRegistry,
    pub competitions: CompetitionRegistry,
}

impl Registries {
    pub fn new(options: FormatOptions) -> Self {
        let persons = PersonRegistry::new(options);
        Registries {
            competitions: CompetitionRegistry::new(persons.clone()),
            persons,
        }
    }
}
