// orgdb - Core Library
// Participant records, class/season rules, store reconciliation and the
// file formats the commands move records between.

pub mod classes;
pub mod commands;
pub mod config;
pub mod db;
pub mod error;
pub mod formats;
pub mod model;
pub mod reconciliation;
pub mod season;

// Re-export commonly used types
pub use classes::{ClassFormatter, CompetitionClass, Convention, GenderFormatter};
pub use commands::{Commands, OutputKind};
pub use config::{CompetitionDefaults, EntryDefaults, Settings};
pub use db::SqliteStore;
pub use error::{OrgDbError, Result};
pub use formats::{
    CompetitionReader, CompetitionRegistry, CompetitionWriter, FormatOptions, PersonReader,
    PersonRegistry, PersonWriter, Registries,
};
pub use model::{
    resolve_column, CompetitionRecord, DateOfBirth, EntityRef, FieldValue, Gender, GroupRecord,
    LogicalColumn, PersonRecord, StartType, ValueBag,
};
pub use reconciliation::{Outcome, PersonStore, ReconciliationEngine, WriteSummary};
pub use season::Season;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
