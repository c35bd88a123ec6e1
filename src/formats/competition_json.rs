// 🧾 Competition as pretty JSON

use crate::error::{OrgDbError, Result};
use crate::formats::CompetitionWriter;
use crate::model::CompetitionRecord;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

pub struct JsonCompetitionWriter {
    path: PathBuf,
}

impl JsonCompetitionWriter {
    pub fn create(path: &Path) -> Self {
        JsonCompetitionWriter {
            path: path.to_path_buf(),
        }
    }

    fn write_file(&self, competition: &CompetitionRecord) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let mut writer = BufWriter::new(File::create(&self.path)?);
        serde_json::to_writer_pretty(&mut writer, competition)?;
        writer.flush()?;
        Ok(())
    }
}

impl CompetitionWriter for JsonCompetitionWriter {
    fn write(&mut self, competition: &CompetitionRecord) -> Result<()> {
        log::debug!("Writing: {}", self.path.display());
        self.write_file(competition).map_err(|e| {
            log::error!("Write failed: {}", self.path.display());
            OrgDbError::write(&self.path, e)
        })
    }
}
