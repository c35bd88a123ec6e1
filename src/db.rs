// 🗄️ Person Store - SQLite persistence for reconciled persons
//
// Table `Person`: one TEXT column per logical column, ID as primary key,
// plus SQLite's implicit rowid used as the update key.
//
// Encodings (lossless, so re-importing the same data is a no-op):
//   Sex          "Male" | "Female"
//   DateOfBirth  "YYYY-MM-DD"
//   Nation/Org   {"Name":"…","ID":"…"}

use crate::error::Result;
use crate::model::{
    DateOfBirth, EntityRef, FieldValue, Gender, LogicalColumn, PersonRecord, ValueBag,
};
use crate::reconciliation::{PersonStore, StoredPerson};
use chrono::NaiveDate;
use rusqlite::types::{Value, ValueRef};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::path::Path;

pub const PERSON_TABLE: &str = "Person";

/// .NET ticks per day; early stores kept birth dates as tick counts
const TICKS_PER_DAY: i64 = 864_000_000_000;

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (or create) a store file
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        // Enable WAL mode for crash recovery
        conn.pragma_update(None, "journal_mode", "WAL")?;
        log::debug!("Opened store {}", path.display());
        Ok(SqliteStore { conn })
    }

    pub fn in_memory() -> Result<Self> {
        Ok(SqliteStore {
            conn: Connection::open_in_memory()?,
        })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn has_person_table(&self) -> Result<bool> {
        let found = self
            .conn
            .query_row(
                "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?1",
                params![PERSON_TABLE],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Create the `Person` table on first write
    pub fn ensure_person_table(&mut self) -> Result<()> {
        let columns: Vec<String> = LogicalColumn::ALL
            .iter()
            .map(|c| match c {
                LogicalColumn::Identifier => format!("\"{}\" TEXT PRIMARY KEY", c.name()),
                _ => format!("\"{}\" TEXT", c.name()),
            })
            .collect();

        self.conn.execute(
            &format!(
                "CREATE TABLE IF NOT EXISTS {} ({})",
                PERSON_TABLE,
                columns.join(", ")
            ),
            [],
        )?;
        Ok(())
    }

    pub fn count(&self) -> Result<i64> {
        let count = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", PERSON_TABLE),
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Every stored person in rowid order; a store without the table is empty
    pub fn all_persons(&self) -> Result<Vec<PersonRecord>> {
        if !self.has_person_table()? {
            log::error!("No {} table in store", PERSON_TABLE);
            return Ok(Vec::new());
        }

        let mut stmt = self
            .conn
            .prepare(&format!("{} ORDER BY rowid", select_clause()))?;
        let persons = stmt
            .query_map([], read_row)?
            .map(|row| row.map(|stored| stored.person))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(persons)
    }

    fn find_one(&self, sql: &str, args: &[&str]) -> Result<Option<StoredPerson>> {
        let found = self
            .conn
            .query_row(sql, params_from_iter(args.iter()), read_row)
            .optional()?;
        Ok(found)
    }
}

impl PersonStore for SqliteStore {
    fn find_by_identifier(&mut self, identifier: &str) -> Result<Option<StoredPerson>> {
        let sql = format!("{} WHERE \"ID\" = ?1", select_clause());
        self.find_one(&sql, &[identifier])
    }

    fn find_by_name(&mut self, first_name: &str, surname: &str) -> Result<Option<StoredPerson>> {
        let sql = format!(
            "{} WHERE IFNULL(\"FirstName\", '') = ?1 AND IFNULL(\"Surname\", '') = ?2 ORDER BY rowid",
            select_clause()
        );
        self.find_one(&sql, &[first_name, surname])
    }

    fn insert(&mut self, values: &ValueBag) -> Result<()> {
        let columns: Vec<String> = values.keys().map(|c| format!("\"{}\"", c.name())).collect();
        let placeholders: Vec<String> = (1..=values.len()).map(|i| format!("?{}", i)).collect();
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            PERSON_TABLE,
            columns.join(", "),
            placeholders.join(", ")
        );

        let args: Vec<Value> = values
            .iter()
            .map(|(c, v)| Value::Text(encode(*c, v)))
            .collect();
        self.conn.execute(&sql, params_from_iter(args))?;
        Ok(())
    }

    fn update(&mut self, row_id: i64, changes: &ValueBag) -> Result<()> {
        let assignments: Vec<String> = changes
            .keys()
            .enumerate()
            .map(|(i, c)| format!("\"{}\" = ?{}", c.name(), i + 1))
            .collect();
        let sql = format!(
            "UPDATE {} SET {} WHERE rowid = ?{}",
            PERSON_TABLE,
            assignments.join(", "),
            changes.len() + 1
        );

        let mut args: Vec<Value> = changes
            .iter()
            .map(|(c, v)| Value::Text(encode(*c, v)))
            .collect();
        args.push(Value::Integer(row_id));
        self.conn.execute(&sql, params_from_iter(args))?;
        Ok(())
    }
}

// ============================================================================
// ROW MAPPING
// ============================================================================

fn select_clause() -> String {
    let columns: Vec<String> = LogicalColumn::ALL
        .iter()
        .map(|c| format!("\"{}\"", c.name()))
        .collect();
    format!("SELECT rowid, {} FROM {}", columns.join(", "), PERSON_TABLE)
}

fn read_row(row: &Row<'_>) -> rusqlite::Result<StoredPerson> {
    let row_id: i64 = row.get(0)?;
    let mut person = PersonRecord::default();

    for (i, column) in LogicalColumn::ALL.iter().enumerate() {
        if let Some(value) = decode(*column, row.get_ref(i + 1)?) {
            person.set(*column, value);
        }
    }

    Ok(StoredPerson { row_id, person })
}

/// Column value → stored text
pub fn encode(column: LogicalColumn, value: &FieldValue) -> String {
    match (column, value) {
        (LogicalColumn::Nation | LogicalColumn::Organization, FieldValue::Entity(entity)) => {
            serde_json::to_string(entity).unwrap_or_default()
        }
        _ => value.to_text(),
    }
}

/// Stored cell → column value; anything unreadable is absent
pub fn decode(column: LogicalColumn, cell: ValueRef<'_>) -> Option<FieldValue> {
    let text = match cell {
        ValueRef::Null => return None,
        ValueRef::Integer(ticks) if column == LogicalColumn::DateOfBirth => {
            return date_from_ticks(ticks).map(FieldValue::Date);
        }
        ValueRef::Integer(n) => n.to_string(),
        ValueRef::Real(f) => f.to_string(),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            String::from_utf8_lossy(bytes).trim().to_string()
        }
    };
    if text.is_empty() {
        return None;
    }

    match column {
        LogicalColumn::Sex => Gender::from_name(&text).map(FieldValue::Sex),
        LogicalColumn::DateOfBirth => DateOfBirth::parse(&text).date().map(FieldValue::Date),
        LogicalColumn::Nation | LogicalColumn::Organization => decode_entity(&text),
        _ => Some(FieldValue::Text(text)),
    }
}

fn decode_entity(text: &str) -> Option<FieldValue> {
    let entity = if text.starts_with('{') {
        serde_json::from_str::<EntityRef>(text).ok()
    } else {
        EntityRef::parse(text)
    };
    entity.filter(|e| !e.is_empty()).map(FieldValue::Entity)
}

fn date_from_ticks(ticks: i64) -> Option<NaiveDate> {
    let epoch = NaiveDate::from_ymd_opt(1, 1, 1)?;
    epoch.checked_add_signed(chrono::Duration::days(ticks / TICKS_PER_DAY))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SqliteStore {
        let mut store = SqliteStore::in_memory().unwrap();
        store.ensure_person_table().unwrap();
        store
    }

    #[test]
    fn test_ensure_person_table_is_idempotent() {
        let mut store = SqliteStore::in_memory().unwrap();
        assert!(!store.has_person_table().unwrap());

        store.ensure_person_table().unwrap();
        store.ensure_person_table().unwrap();

        assert!(store.has_person_table().unwrap());
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_all_persons_without_table_is_empty() {
        let store = SqliteStore::in_memory().unwrap();
        assert!(store.all_persons().unwrap().is_empty());
    }

    #[test]
    fn test_insert_and_find() {
        let mut store = store();
        let mut person = PersonRecord::new("Tyra", "Kallur");
        person.identifier = Some("IID3262187".to_string());
        store.insert(&person.project()).unwrap();

        let by_id = store.find_by_identifier("IID3262187").unwrap().unwrap();
        let by_name = store.find_by_name("Tyra", "Kallur").unwrap().unwrap();

        assert_eq!(by_id.person, person);
        assert_eq!(by_id.row_id, by_name.row_id);
        assert!(store.find_by_identifier("nobody").unwrap().is_none());
        assert!(store.find_by_name("Tyra", "").unwrap().is_none());
    }

    #[test]
    fn test_name_lookup_matches_absent_part() {
        let mut store = store();
        store.insert(&PersonRecord::new("Tyra", "").project()).unwrap();

        assert!(store.find_by_name("Tyra", "").unwrap().is_some());
    }

    #[test]
    fn test_values_are_parameterized() {
        let mut store = store();
        let person = PersonRecord::new("O'Brien", "D'Arcy");
        store.insert(&person.project()).unwrap();

        let found = store.find_by_name("O'Brien", "D'Arcy").unwrap().unwrap();
        assert_eq!(found.person, person);
    }

    #[test]
    fn test_update_touches_only_given_columns() {
        let mut store = store();
        let mut person = PersonRecord::new("Tyra", "Kallur");
        person.phone = Some("070-111".to_string());
        person.email = Some("tyra@example.se".to_string());
        store.insert(&person.project()).unwrap();
        let row = store.find_by_name("Tyra", "Kallur").unwrap().unwrap();

        let mut changes = ValueBag::new();
        changes.insert(LogicalColumn::Phone, FieldValue::text("070-222"));
        store.update(row.row_id, &changes).unwrap();

        let updated = store.find_by_name("Tyra", "Kallur").unwrap().unwrap();
        assert_eq!(updated.person.phone.as_deref(), Some("070-222"));
        assert_eq!(updated.person.email.as_deref(), Some("tyra@example.se"));
    }

    #[test]
    fn test_entity_encoding() {
        let entity = FieldValue::Entity(EntityRef::new(Some("Korsnäs IF SK".into()), Some("12563".into())));
        let encoded = encode(LogicalColumn::Organization, &entity);

        assert_eq!(encoded, r#"{"Name":"Korsnäs IF SK","ID":"12563"}"#);
        assert_eq!(
            decode(LogicalColumn::Organization, ValueRef::Text(encoded.as_bytes())),
            Some(entity)
        );
    }

    #[test]
    fn test_decode_legacy_values() {
        assert_eq!(
            decode(LogicalColumn::Nation, ValueRef::Text(b"SWE")),
            Some(FieldValue::Entity(EntityRef::named("SWE")))
        );
        assert_eq!(
            decode(LogicalColumn::DateOfBirth, ValueRef::Integer(634_506_048_000_000_000)),
            Some(FieldValue::Date(NaiveDate::from_ymd_opt(2011, 9, 3).unwrap()))
        );
        assert_eq!(decode(LogicalColumn::Sex, ValueRef::Text(b"NotDefined")), None);
        assert_eq!(decode(LogicalColumn::Phone, ValueRef::Null), None);
        assert_eq!(decode(LogicalColumn::Phone, ValueRef::Text(b"  ")), None);
    }
}
