// ⚖️ Reconciliation Engine - merge incoming persons into the store
//
// Per incoming record:
//   1. lookup: by ID when present, then by exact (FirstName, Surname)
//   2. found   → field-level diff against the stored projection
//                non-empty change-set → one UPDATE of only those columns
//   3. missing → INSERT every populated column (unless no-insert)
//
// A field only ever moves towards "more information": blanks never erase
// stored text and a known birth date is never overwritten.

use crate::error::Result;
use crate::model::{FieldValue, LogicalColumn, PersonRecord, ValueBag};
use serde::Serialize;
use std::fmt;

// ============================================================================
// STORE SEAM
// ============================================================================

/// A person row as found in the store
#[derive(Debug, Clone, PartialEq)]
pub struct StoredPerson {
    pub row_id: i64,
    pub person: PersonRecord,
}

/// Lookup and write primitives the engine needs from a store
pub trait PersonStore {
    fn find_by_identifier(&mut self, identifier: &str) -> Result<Option<StoredPerson>>;

    /// Exact match on both name parts; an absent part matches only an absent part
    fn find_by_name(&mut self, first_name: &str, surname: &str) -> Result<Option<StoredPerson>>;

    fn insert(&mut self, values: &ValueBag) -> Result<()>;

    /// Overwrite only the given columns of one row
    fn update(&mut self, row_id: i64, changes: &ValueBag) -> Result<()>;
}

// ============================================================================
// OUTCOMES
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Inserted,
    Updated(Vec<LogicalColumn>),
    Unchanged,
    /// Not found and inserting is disabled, or nothing to insert
    Skipped,
}

/// Aggregate of one write pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WriteSummary {
    pub read: usize,
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub skipped: usize,
}

impl WriteSummary {
    pub fn record(&mut self, outcome: &Outcome) {
        self.read += 1;
        match outcome {
            Outcome::Inserted => self.inserted += 1,
            Outcome::Updated(_) => self.updated += 1,
            Outcome::Unchanged => self.unchanged += 1,
            Outcome::Skipped => self.skipped += 1,
        }
    }

    /// Count a record that was written without reconciliation (file sinks)
    pub fn record_written(&mut self) {
        self.record(&Outcome::Inserted);
    }

    pub fn record_skipped(&mut self) {
        self.record(&Outcome::Skipped);
    }
}

impl fmt::Display for WriteSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} read: {} inserted, {} updated, {} unchanged, {} skipped",
            self.read, self.inserted, self.updated, self.unchanged, self.skipped
        )
    }
}

// ============================================================================
// IMPROVEMENT RULES
// ============================================================================

/// Whether `incoming` should replace `stored` for one column.
///
/// | Column                                  | Replace when                       |
/// |-----------------------------------------|------------------------------------|
/// | ID, FirstName, Surname, Phone, Email, Class | incoming non-blank and different |
/// | Sex                                     | different                          |
/// | DateOfBirth                             | stored undefined, incoming defined |
/// | Nation, Organization                    | incoming present and different     |
pub fn is_improvement(
    column: LogicalColumn,
    incoming: Option<&FieldValue>,
    stored: Option<&FieldValue>,
) -> bool {
    match column {
        LogicalColumn::Identifier
        | LogicalColumn::FirstName
        | LogicalColumn::Surname
        | LogicalColumn::Phone
        | LogicalColumn::Email
        | LogicalColumn::ClassLabel => match incoming {
            Some(FieldValue::Text(text)) if !text.trim().is_empty() => incoming != stored,
            _ => false,
        },
        LogicalColumn::Sex => incoming != stored,
        LogicalColumn::DateOfBirth => stored.is_none() && incoming.is_some(),
        LogicalColumn::Nation | LogicalColumn::Organization => {
            incoming.is_some() && incoming != stored
        }
    }
}

/// Columns of `incoming` that improve on `stored`, with the incoming values.
///
/// Only populated values can be written, so a Sex change towards
/// unspecified never reaches the change-set.
pub fn diff(incoming: &PersonRecord, stored: &PersonRecord) -> ValueBag {
    let new_values = incoming.project();
    let old_values = stored.project();

    LogicalColumn::ALL
        .iter()
        .filter(|c| is_improvement(**c, new_values.get(c), old_values.get(c)))
        .filter_map(|c| new_values.get(c).map(|v| (*c, v.clone())))
        .collect()
}

// ============================================================================
// ENGINE
// ============================================================================

#[derive(Debug, Clone, Copy, Default)]
pub struct ReconciliationEngine {
    no_insert: bool,
}

impl ReconciliationEngine {
    pub fn new(no_insert: bool) -> Self {
        ReconciliationEngine { no_insert }
    }

    pub fn no_insert(&self) -> bool {
        self.no_insert
    }

    /// Find the stored counterpart: by ID first, then by name
    pub fn lookup<S: PersonStore + ?Sized>(
        &self,
        store: &mut S,
        incoming: &PersonRecord,
    ) -> Result<Option<StoredPerson>> {
        if let Some(id) = incoming.identifier.as_deref().filter(|id| !id.trim().is_empty()) {
            if let Some(found) = store.find_by_identifier(id)? {
                return Ok(Some(found));
            }
        }

        let first_name = incoming.first_name.as_deref().unwrap_or_default();
        let surname = incoming.surname.as_deref().unwrap_or_default();
        if first_name.is_empty() && surname.is_empty() {
            return Ok(None);
        }
        store.find_by_name(first_name, surname)
    }

    /// Merge one record into the store
    pub fn reconcile<S: PersonStore + ?Sized>(
        &self,
        store: &mut S,
        incoming: &PersonRecord,
    ) -> Result<Outcome> {
        log::debug!("Write: {}", incoming.describe());

        match self.lookup(store, incoming)? {
            Some(stored) => {
                let changes = diff(incoming, &stored.person);
                if changes.is_empty() {
                    log::debug!("Unchanged: row {}", stored.row_id);
                    return Ok(Outcome::Unchanged);
                }
                let columns: Vec<LogicalColumn> = changes.keys().copied().collect();
                log::debug!("Update row {}: {:?}", stored.row_id, columns);
                store.update(stored.row_id, &changes)?;
                Ok(Outcome::Updated(columns))
            }
            None if self.no_insert => {
                log::debug!("No insert: {}", incoming.describe());
                Ok(Outcome::Skipped)
            }
            None => {
                let values = incoming.project();
                if values.is_empty() {
                    log::debug!("Nothing to insert");
                    return Ok(Outcome::Skipped);
                }
                log::debug!("Insert: {}", incoming.describe());
                store.insert(&values)?;
                Ok(Outcome::Inserted)
            }
        }
    }

    /// Reconcile a whole stream; the first error aborts the pass
    pub fn reconcile_all<S, I>(&self, store: &mut S, persons: I) -> Result<WriteSummary>
    where
        S: PersonStore + ?Sized,
        I: IntoIterator<Item = Result<PersonRecord>>,
    {
        let mut summary = WriteSummary::default();
        for person in persons {
            let outcome = self.reconcile(store, &person?)?;
            summary.record(&outcome);
        }
        Ok(summary)
    }
}
