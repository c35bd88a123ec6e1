// ⚠️ Error taxonomy
// One error type for the library; commands add context with anyhow.

use std::path::{Path, PathBuf};

/// Errors raised while reading, reconciling or writing records.
///
/// Malformed class labels and gender tokens are NOT errors: those parsers
/// return `None`. Rows missing a required column are logged and skipped by
/// the reader, so they never surface here either.
#[derive(Debug, thiserror::Error)]
pub enum OrgDbError {
    /// No registered reader/writer accepts the file
    #[error("format not supported: {}", .0.display())]
    UnsupportedFormat(PathBuf),

    /// Any failure of the relational store (lookup, insert, update)
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// Serialization to a target file failed
    #[error("write to {} failed: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: Box<OrgDbError>,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("spreadsheet error: {0}")]
    Spreadsheet(#[from] calamine::Error),

    #[error("xlsx error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("xml error: {0}")]
    Xml(String),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Config(String),

    /// A value that has to be well-formed for the target format is not
    #[error("invalid {column}: {value:?}")]
    InvalidValue { column: String, value: String },
}

impl OrgDbError {
    /// Wrap an error raised while writing `path`
    pub fn write(path: &Path, source: OrgDbError) -> Self {
        OrgDbError::Write {
            path: path.to_path_buf(),
            source: Box::new(source),
        }
    }

    pub fn xml(err: impl std::fmt::Display) -> Self {
        OrgDbError::Xml(err.to_string())
    }

    pub fn invalid(column: &str, value: impl Into<String>) -> Self {
        OrgDbError::InvalidValue {
            column: column.to_string(),
            value: value.into(),
        }
    }
}

/// Alias for Result with `OrgDbError`
pub type Result<T> = std::result::Result<T, OrgDbError>;
