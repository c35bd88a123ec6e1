// 🗄️ SQLite persons - the store as a reader and as a reconciling writer

use crate::db::SqliteStore;
use crate::error::Result;
use crate::formats::{PersonReader, PersonWriter};
use crate::model::PersonRecord;
use crate::reconciliation::{ReconciliationEngine, WriteSummary};
use std::path::{Path, PathBuf};

pub struct SqlitePersonReader {
    store: SqliteStore,
}

impl SqlitePersonReader {
    pub fn open(path: &Path) -> Result<Self> {
        Ok(SqlitePersonReader {
            store: SqliteStore::open(path)?,
        })
    }
}

impl PersonReader for SqlitePersonReader {
    fn persons(&mut self) -> Result<Box<dyn Iterator<Item = Result<PersonRecord>> + '_>> {
        let persons = self.store.all_persons()?;
        log::info!("Rows: {}", persons.len());
        Ok(Box::new(persons.into_iter().map(Ok)))
    }
}

/// Merges incoming persons into the store instead of overwriting it
pub struct SqlitePersonWriter {
    path: PathBuf,
    store: SqliteStore,
    engine: ReconciliationEngine,
}

impl SqlitePersonWriter {
    pub fn open(path: &Path, no_insert: bool) -> Result<Self> {
        Ok(SqlitePersonWriter {
            path: path.to_path_buf(),
            store: SqliteStore::open(path)?,
            engine: ReconciliationEngine::new(no_insert),
        })
    }
}

impl PersonWriter for SqlitePersonWriter {
    fn write(
        &mut self,
        persons: &mut dyn Iterator<Item = Result<PersonRecord>>,
    ) -> Result<WriteSummary> {
        log::debug!("Writing: {}", self.path.display());
        let result = self
            .store
            .ensure_person_table()
            .and_then(|_| self.engine.reconcile_all(&mut self.store, persons));

        match result {
            Ok(summary) => {
                log::info!("{}: {}", self.path.display(), summary);
                Ok(summary)
            }
            Err(e) => {
                log::error!("Write failed: {}: {}", self.path.display(), e);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Gender;

    fn person(id: &str, phone: &str) -> PersonRecord {
        let mut person = PersonRecord::new("Tyra", "Kallur");
        person.identifier = Some(id.to_string());
        person.sex = Gender::Female;
        person.phone = Some(phone.to_string());
        person
    }

    #[test]
    fn test_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("person.sqlite");

        let mut writer = SqlitePersonWriter::open(&path, false).unwrap();
        let summary = writer
            .write(&mut vec![Ok(person("IID1", "070-1")), Ok(person("IID1", "070-2"))].into_iter())
            .unwrap();
        drop(writer);

        assert_eq!(summary.inserted, 1);
        assert_eq!(summary.updated, 1);

        let mut reader = SqlitePersonReader::open(&path).unwrap();
        let persons: Vec<PersonRecord> = reader
            .persons()
            .unwrap()
            .collect::<Result<Vec<_>>>()
            .unwrap();
        assert_eq!(persons, vec![person("IID1", "070-2")]);
    }

    #[test]
    fn test_no_insert_leaves_store_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("person.sqlite");

        let mut writer = SqlitePersonWriter::open(&path, true).unwrap();
        let summary = writer.write(&mut vec![Ok(person("IID1", "070-1"))].into_iter()).unwrap();
        drop(writer);

        assert_eq!(summary.skipped, 1);
        assert_eq!(SqliteStore::open(&path).unwrap().count().unwrap(), 0);
    }

    #[test]
    fn test_reading_store_without_table_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let mut reader = SqlitePersonReader::open(&dir.path().join("empty.sqlite")).unwrap();
        assert_eq!(reader.persons().unwrap().count(), 0);
    }

    #[test]
    fn test_read_error_aborts_write() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = SqlitePersonWriter::open(&dir.path().join("person.sqlite"), false).unwrap();
        let mut persons = vec![
            Ok(person("IID1", "070-1")),
            Err(crate::error::OrgDbError::xml("broken")),
        ]
        .into_iter();

        assert!(writer.write(&mut persons).is_err());
    }
}
