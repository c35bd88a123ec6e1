// 📦 Canonical Record Model
// Persons, competitions and the logical column schema shared by every format.

pub mod column;
pub mod competition;
pub mod person;

pub use column::{resolve_column, LogicalColumn};
pub use competition::{CompetitionRecord, GroupRecord, StartType};
pub use person::{DateOfBirth, EntityRef, FieldValue, Gender, PersonRecord, ValueBag};
