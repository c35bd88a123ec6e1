// 🧭 Commands - import, export and create_competition
//
//   import <file>              file → person reader → SQLite store (reconciled)
//   export <file>              store → person writer, class labels added
//   create_competition <file>  person sheet → competition → json / entry xml

use crate::classes::ClassFormatter;
use crate::config::Settings;
use crate::formats::Registries;
use crate::model::{CompetitionRecord, PersonRecord};
use crate::reconciliation::WriteSummary;
use crate::season::Season;
use anyhow::{ensure, Context, Result};
use std::path::{Path, PathBuf};

/// Target of `create_competition`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    /// `<dir>/SSFEntry_<stem>.xml`
    Ssf,
    /// `<dir>/<stem>.json`
    Json,
    /// `<dir>/<stem>.xlsx`
    Excel,
}

impl OutputKind {
    /// Output file next to `source`
    pub fn target(&self, source: &Path) -> PathBuf {
        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let dir = source.parent().unwrap_or_else(|| Path::new(""));
        let file_name = match self {
            OutputKind::Ssf => format!("{}{}.xml", crate::formats::entry_xml::FILE_PREFIX, stem),
            OutputKind::Json => format!("{}.json", stem),
            OutputKind::Excel => format!("{}.xlsx", stem),
        };
        dir.join(file_name)
    }
}

pub struct Commands {
    registries: Registries,
    store: PathBuf,
    export_classes: ClassFormatter,
}

impl Commands {
    pub fn new(settings: &Settings, registries: Registries) -> Self {
        Commands {
            registries,
            store: settings.store.clone(),
            export_classes: settings.export_class_convention.classes(),
        }
    }

    pub fn store(&self) -> &Path {
        &self.store
    }

    /// Merge a person file into the store. With `no_insert` in the registry
    /// options only persons already stored are updated.
    pub fn import(&self, path: &Path) -> Result<WriteSummary> {
        ensure!(path.is_file(), "file not found: {}", path.display());
        log::info!("Import {} → {}", path.display(), self.store.display());

        let persons = &self.registries.persons;
        let mut reader = persons
            .reader(path)
            .with_context(|| format!("cannot read {}", path.display()))?;
        let mut writer = persons
            .writer(&self.store)
            .with_context(|| format!("cannot open store {}", self.store.display()))?;

        let mut records = reader.persons()?;
        let summary = writer
            .write(&mut records)
            .with_context(|| format!("import of {} failed", path.display()))?;

        log::info!("Import done: {}", summary);
        Ok(summary)
    }

    /// Write every stored person to `path`, class labels from the current season
    pub fn export(&self, path: &Path) -> Result<WriteSummary> {
        let persons = &self.registries.persons;
        let mut writer = persons
            .writer(path)
            .with_context(|| format!("cannot write {}", path.display()))?;
        log::debug!("{} → {}", self.store.display(), path.display());

        let mut reader = persons
            .reader(&self.store)
            .with_context(|| format!("cannot open store {}", self.store.display()))?;

        let season = Season::current();
        let classes = self.export_classes;
        let mut records = reader
            .persons()?
            .map(move |person| person.map(|p| with_class(p, &season, classes)));

        let summary = writer
            .write(&mut records)
            .with_context(|| format!("export to {} failed", path.display()))?;

        log::info!("Export done: {}", summary);
        Ok(summary)
    }

    /// Build a competition from a person file. Without an output kind the
    /// competition is logged as JSON.
    pub fn create_competition(
        &self,
        path: &Path,
        output: Option<OutputKind>,
    ) -> Result<CompetitionRecord> {
        ensure!(path.is_file(), "file not found: {}", path.display());

        let competitions = &self.registries.competitions;
        let mut reader = competitions
            .reader(path)
            .with_context(|| format!("cannot read competition from {}", path.display()))?;
        let competition = reader.competition()?;

        match output {
            Some(kind) => {
                let target = kind.target(path);
                let mut writer = competitions.writer(&target).map_err(|e| {
                    log::error!("Write failed: {}", target.display());
                    e
                })?;
                writer
                    .write(&competition)
                    .with_context(|| format!("cannot write {}", target.display()))?;
                log::info!("Wrote {}", target.display());
            }
            None => {
                let json = serde_json::to_string_pretty(&competition)
                    .context("cannot serialize competition")?;
                log::info!("{}", json);
            }
        }
        Ok(competition)
    }
}

/// Class label for persons with a known birth date
fn with_class(mut person: PersonRecord, season: &Season, classes: ClassFormatter) -> PersonRecord {
    if let Some(date_of_birth) = person.date_of_birth.date() {
        person.class_label = Some(season.class_name(person.sex, date_of_birth, classes));
    }
    person
}
