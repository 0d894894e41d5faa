use crate::document::ScheduleDocument;
use crate::error::Result;
use std::path::PathBuf;

/// Abstract interface for raw schedule I/O.
/// This trait handles the "how" of storage (filesystem vs memory),
/// while ScheduleStore handles the "what" (revision checks, logging).
pub trait ScheduleBackend {
    /// Load the stored document for an owner.
    /// Returns Ok(None) when nothing has been saved yet.
    fn load_document(&self, owner: &str) -> Result<Option<ScheduleDocument>>;

    /// Replace the owner's whole document.
    /// MUST be atomic (e.g. write to tmp then rename): readers see the old
    /// document or the new one, never a mix.
    fn save_document(&self, owner: &str, document: &ScheduleDocument) -> Result<()>;

    /// Where the owner's document lives.
    /// For FsBackend, this is the real path. For MemBackend, a virtual path.
    fn document_path(&self, owner: &str) -> Result<PathBuf>;
}
