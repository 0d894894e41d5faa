//! Read-only access to externally managed blackout periods.
//!
//! Blackouts are created and removed by a separate leave workflow. This crate
//! only lists them, fresh, before every projection or conflict check.

use crate::error::{AgendaError, Result};
use crate::model::BlackoutInterval;
use crate::store::fs_backend::checked_owner;
use chrono::NaiveDate;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::rc::Rc;

pub trait BlackoutSource {
    /// Every interval whose inclusive date range intersects `from..=to`,
    /// active or not. Callers decide what is effective.
    fn list_blackouts(
        &self,
        owner: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<BlackoutInterval>>;
}

/// In-memory blackouts for tests. Clones share the same intervals, so a test
/// can play the leave workflow adding a blackout behind a session's back.
#[derive(Clone, Default)]
pub struct MemBlackouts {
    intervals: Rc<RefCell<HashMap<String, Vec<BlackoutInterval>>>>,
}

impl MemBlackouts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, owner: &str, interval: BlackoutInterval) {
        self.intervals
            .borrow_mut()
            .entry(owner.to_string())
            .or_default()
            .push(interval);
    }
}

impl BlackoutSource for MemBlackouts {
    fn list_blackouts(
        &self,
        owner: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<BlackoutInterval>> {
        Ok(self
            .intervals
            .borrow()
            .get(owner)
            .map(|list| {
                list.iter()
                    .filter(|b| b.intersects(from, to))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

/// Reads `<root>/blackouts-<owner>.json`, a JSON array of intervals.
/// A missing file means the owner has no blackouts.
pub struct FsBlackouts {
    root: PathBuf,
}

impl FsBlackouts {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn path(&self, owner: &str) -> Result<PathBuf> {
        let owner = checked_owner(owner)?;
        Ok(self.root.join(format!("blackouts-{}.json", owner)))
    }
}

impl BlackoutSource for FsBlackouts {
    fn list_blackouts(
        &self,
        owner: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<BlackoutInterval>> {
        let path = self.path(owner)?;
        if !path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&path).map_err(AgendaError::Io)?;
        let all: Vec<BlackoutInterval> =
            serde_json::from_str(&content).map_err(AgendaError::Serialization)?;
        let listed: Vec<_> = all.into_iter().filter(|b| b.intersects(from, to)).collect();
        tracing::debug!(owner, %from, %to, count = listed.len(), "listed blackouts");
        Ok(listed)
    }
}
