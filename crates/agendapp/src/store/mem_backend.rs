use super::backend::ScheduleBackend;
use crate::document::ScheduleDocument;
use crate::error::{AgendaError, Result};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::path::PathBuf;
use std::rc::Rc;

/// In-memory storage backend for testing.
///
/// Uses `RefCell` for interior mutability since editing is single-threaded.
/// Clones share the same storage, which is how tests model a second session
/// writing to the same practitioner's schedule.
#[derive(Clone, Default)]
pub struct MemBackend {
    documents: Rc<RefCell<HashMap<String, ScheduleDocument>>>,
    simulate_write_error: Rc<Cell<bool>>,
}

impl MemBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable write error simulation for testing error handling.
    pub fn set_simulate_write_error(&self, simulate: bool) {
        self.simulate_write_error.set(simulate);
    }
}

impl ScheduleBackend for MemBackend {
    fn load_document(&self, owner: &str) -> Result<Option<ScheduleDocument>> {
        Ok(self.documents.borrow().get(owner).cloned())
    }

    fn save_document(&self, owner: &str, document: &ScheduleDocument) -> Result<()> {
        if self.simulate_write_error.get() {
            return Err(AgendaError::Store("Simulated write error".to_string()));
        }
        self.documents
            .borrow_mut()
            .insert(owner.to_string(), document.clone());
        Ok(())
    }

    fn document_path(&self, owner: &str) -> Result<PathBuf> {
        Ok(PathBuf::from(format!("memory://schedule-{}", owner)))
    }
}
