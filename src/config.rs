// ⚙️ Settings - TOML configuration with built-in defaults
//
// Lookup order: --config <file>, then ./orgdb.toml, then defaults.
// Every key is optional; missing keys keep their default.

use crate::classes::Convention;
use crate::error::{OrgDbError, Result};
use crate::model::{EntityRef, StartType};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Config file picked up from the working directory
pub const DEFAULT_CONFIG_FILE: &str = "orgdb.toml";

/// Store used by import and export
pub const DEFAULT_STORE_FILE: &str = "person.sqlite";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// SQLite store path
    pub store: PathBuf,
    /// Gender tokens accepted in sex cells (besides "Male"/"Female")
    pub sex_convention: Convention,
    /// Class labels written by `export`
    pub export_class_convention: Convention,
    pub competition: CompetitionDefaults,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            store: PathBuf::from(DEFAULT_STORE_FILE),
            sex_convention: Convention::Federation,
            export_class_convention: Convention::Federation,
            competition: CompetitionDefaults::default(),
        }
    }
}

impl Settings {
    /// Load `path` if given, else `orgdb.toml` when present, else defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Settings::load_from_path(path),
            None if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
                Settings::load_from_path(Path::new(DEFAULT_CONFIG_FILE))
            }
            None => Ok(Settings::default()),
        }
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let settings = Settings::from_toml(&contents)
            .map_err(|e| OrgDbError::Config(format!("{}: {}", path.display(), e)))?;
        log::debug!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| OrgDbError::Config(e.to_string()))
    }
}

/// Header values for competitions built from a person sheet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompetitionDefaults {
    pub name: String,
    pub event_type: String,
    pub sector: String,
    pub geographical_scope: String,
    pub organizer: EntityRef,
    pub place: String,
    pub website: String,
    pub category: EntityRef,
    pub discipline: EntityRef,
    pub start_type: StartType,
    pub entry: EntryDefaults,
}

impl Default for CompetitionDefaults {
    fn default() -> Self {
        CompetitionDefaults {
            name: "Serietävling".to_string(),
            event_type: "Tävling".to_string(),
            sector: "CC".to_string(),
            geographical_scope: "Klubb (Lokalt)".to_string(),
            organizer: EntityRef::new(Some("Korsnäs IF SK".into()), Some("12563".into())),
            place: "Pumpen, Hosjö, Falun".to_string(),
            website: "http://www.korsnasifsk.se".to_string(),
            category: EntityRef::new(Some("Ungdom".into()), Some("Ung".into())),
            discipline: EntityRef::named("Längdåkning"),
            start_type: StartType::Interval,
            entry: EntryDefaults::default(),
        }
    }
}

/// Federation entry file values that have no counterpart in the record model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntryDefaults {
    /// `<District Id>` of every entered person
    pub district: EntityRef,
    /// `<Discipline Id Code>` of every entry
    pub discipline: EntityRef,
    pub discipline_code: String,
    /// Entry deadline, days before the race
    pub deadline_days: i64,
    pub fee: u32,
}

impl Default for EntryDefaults {
    fn default() -> Self {
        EntryDefaults {
            district: EntityRef::new(Some("Dalarnas Skidförbund".into()), Some("536".into())),
            discipline: EntityRef::new(
                Some("Intervallstart klassisk stil".into()),
                Some("29".into()),
            ),
            discipline_code: "L".to_string(),
            deadline_days: 5,
            fee: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.store, PathBuf::from("person.sqlite"));
        assert_eq!(settings.sex_convention, Convention::Federation);
        assert_eq!(settings.competition.name, "Serietävling");
        assert_eq!(settings.competition.organizer.id.as_deref(), Some("12563"));
        assert_eq!(settings.competition.entry.deadline_days, 5);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let settings = Settings::from_toml(
            r#"
            store = "club.sqlite"
            export_class_convention = "swedish"

            [competition]
            name = "Klubbmästerskap"

            [competition.organizer]
            Name = "Falu IK"
            ID = "100"
            "#,
        )
        .unwrap();

        assert_eq!(settings.store, PathBuf::from("club.sqlite"));
        assert_eq!(settings.export_class_convention, Convention::Swedish);
        assert_eq!(settings.sex_convention, Convention::Federation);
        assert_eq!(settings.competition.name, "Klubbmästerskap");
        assert_eq!(settings.competition.organizer.name.as_deref(), Some("Falu IK"));
        assert_eq!(settings.competition.sector, "CC");
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = Settings::from_toml("sex_convention = \"klingon\"").unwrap_err();
        assert!(matches!(err, OrgDbError::Config(_)));
    }

    #[test]
    fn test_load_from_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "store = \"other.sqlite\"").unwrap();

        let settings = Settings::load(Some(file.path())).unwrap();

        assert_eq!(settings.store, PathBuf::from("other.sqlite"));
    }

    #[test]
    fn test_load_missing_explicit_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Settings::load(Some(&dir.path().join("missing.toml"))).is_err());
    }
}
