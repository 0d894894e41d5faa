use super::backend::ScheduleBackend;
use crate::document::ScheduleDocument;
use crate::error::{AgendaError, Result};
use std::fs;
use std::path::PathBuf;
use uuid::Uuid;

/// One JSON document per owner: `<root>/schedule-<owner>.json`.
pub struct FsBackend {
    root: PathBuf,
}

impl FsBackend {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    fn ensure_dir(&self) -> Result<()> {
        if !self.root.exists() {
            fs::create_dir_all(&self.root).map_err(AgendaError::Io)?;
        }
        Ok(())
    }
}

/// Owner ids become file names, so they must not be able to name other paths.
pub(crate) fn checked_owner(owner: &str) -> Result<&str> {
    let valid = !owner.is_empty()
        && owner
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(owner)
    } else {
        Err(AgendaError::Store(format!(
            "Owner id '{}' may only contain letters, digits, '-' and '_'",
            owner
        )))
    }
}

impl ScheduleBackend for FsBackend {
    fn load_document(&self, owner: &str) -> Result<Option<ScheduleDocument>> {
        let path = self.document_path(owner)?;
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(path).map_err(AgendaError::Io)?;
        let document: ScheduleDocument =
            serde_json::from_str(&content).map_err(AgendaError::Serialization)?;
        Ok(Some(document))
    }

    fn save_document(&self, owner: &str, document: &ScheduleDocument) -> Result<()> {
        let target = self.document_path(owner)?;
        self.ensure_dir()?;

        let content = serde_json::to_string_pretty(document).map_err(AgendaError::Serialization)?;

        // Atomic write
        let tmp = self
            .root
            .join(format!(".schedule-{}.tmp", Uuid::new_v4()));
        if let Err(e) = fs::write(&tmp, content).and_then(|_| fs::rename(&tmp, &target)) {
            let _ = fs::remove_file(&tmp);
            tracing::warn!(owner, path = %target.display(), error = %e, "schedule write failed");
            return Err(AgendaError::Io(e));
        }

        Ok(())
    }

    fn document_path(&self, owner: &str) -> Result<PathBuf> {
        let owner = checked_owner(owner)?;
        Ok(self.root.join(format!("schedule-{}.json", owner)))
    }
}
