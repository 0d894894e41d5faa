//! # Storage Layer
//!
//! One [`ScheduleDocument`] per practitioner, replaced whole on every save.
//!
//! The split follows two concerns:
//! - [`backend::ScheduleBackend`]: raw I/O ("how"). Loading and atomically
//!   replacing one document. [`fs_backend::FsBackend`] writes JSON files,
//!   [`mem_backend::MemBackend`] keeps documents in memory for tests.
//! - [`ScheduleStore`]: the rules ("what"). Missing documents load as empty,
//!   and saves are optimistic: a save whose revision no longer matches the
//!   persisted one is rejected with `StaleState` instead of overwriting.
//!
//! ## Storage Layout
//!
//! ```text
//! <data_dir>/
//! ├── agenda.toml              # Configuration
//! ├── schedule-{owner}.json    # Schedule document (read-write)
//! └── blackouts-{owner}.json   # Blackout intervals (read-only)
//! ```

use crate::document::ScheduleDocument;
use crate::error::{AgendaError, Result};
use std::path::PathBuf;

pub mod backend;
pub mod fs_backend;
pub mod mem_backend;

use backend::ScheduleBackend;

pub struct ScheduleStore<B: ScheduleBackend> {
    pub(crate) backend: B,
}

impl<B: ScheduleBackend> ScheduleStore<B> {
    pub fn with_backend(backend: B) -> Self {
        Self { backend }
    }

    /// The persisted document, or an empty one at revision 0.
    pub fn load(&self, owner: &str) -> Result<ScheduleDocument> {
        let document = self.backend.load_document(owner)?.unwrap_or_default();
        tracing::debug!(owner, revision = document.revision, "loaded schedule");
        Ok(document)
    }

    /// Replace the owner's document.
    ///
    /// `document.revision` must equal the persisted revision; the returned
    /// document carries the bumped revision that is now stored.
    pub fn save(&self, owner: &str, document: &ScheduleDocument) -> Result<ScheduleDocument> {
        let persisted = self
            .backend
            .load_document(owner)?
            .map(|doc| doc.revision)
            .unwrap_or(0);
        if persisted != document.revision {
            tracing::warn!(
                owner,
                expected = document.revision,
                found = persisted,
                "rejected save of stale schedule"
            );
            return Err(AgendaError::stale(
                format!("schedule of {}", owner),
                format!(
                    "it was saved at revision {} but this edit started from revision {}",
                    persisted, document.revision
                ),
            ));
        }

        let mut next = document.clone();
        next.revision = persisted + 1;
        self.backend.save_document(owner, &next)?;
        tracing::info!(owner, revision = next.revision, "saved schedule");
        Ok(next)
    }

    pub fn document_path(&self, owner: &str) -> Result<PathBuf> {
        self.backend.document_path(owner)
    }
}
