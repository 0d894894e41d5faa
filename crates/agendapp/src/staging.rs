//! # Pending Block Staging Area
//!
//! New blocks are not written one at a time. They are staged as
//! [`CandidateBlock`]s, validated as they arrive, and committed as one batch.
//!
//! ## Adding a Candidate
//!
//! A candidate is checked in a fixed order and rejected on the first failure,
//! with the offending interval attached:
//!
//! 1. the range itself (`start < end`, inside operating hours),
//! 2. effective blackouts on its date,
//! 3. availability already materialized on its date,
//! 4. other staged candidates on its date.
//!
//! ## Committing
//!
//! [`StagingArea::prepare_commit`] re-validates every candidate against a
//! freshly loaded document and fresh blackouts, since the schedule may have
//! changed since staging. It either yields the complete new document or a
//! `StaleState` error naming the first candidate that no longer fits; nothing
//! is written in the failing case and the staged set stays as it was. The
//! caller persists the plan and only then clears the staging area.
//!
//! - `WeeklyTemplate`: each candidate becomes a rule for its date's weekday.
//!   Overrides keep shadowing it wherever they exist.
//! - `SpecificDate`: each candidate becomes an override for its date. If that
//!   date was showing template blocks, it now shows only its overrides.

use crate::conflict;
use crate::document::ScheduleDocument;
use crate::error::{AgendaError, Result};
use crate::lifecycle::{BlockScope, BlockState, Transition};
use crate::model::{
    BlockId, CandidateBlock, CommitMode, DayOfWeek, MaterializedEvent, TimeOfDay, TimeRange,
};
use crate::projector::{blackouts_on, Snapshot};
use chrono::NaiveDate;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct StagingArea {
    operating_hours: TimeRange,
    candidates: Vec<CandidateBlock>,
}

/// The outcome of a successful re-validation: the document to persist and the
/// blocks it commits, in staging order.
#[derive(Debug, Clone)]
pub struct CommitPlan {
    pub document: ScheduleDocument,
    pub committed: Vec<(BlockId, BlockState)>,
}

impl StagingArea {
    pub fn new(operating_hours: TimeRange) -> Self {
        Self {
            operating_hours,
            candidates: Vec::new(),
        }
    }

    pub fn operating_hours(&self) -> TimeRange {
        self.operating_hours
    }

    pub fn candidates(&self) -> &[CandidateBlock] {
        &self.candidates
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn add_candidate(
        &mut self,
        snapshot: &Snapshot<'_>,
        date: NaiveDate,
        start: TimeOfDay,
        end: TimeOfDay,
    ) -> Result<CandidateBlock> {
        let range = TimeRange::new(start, end)?;
        range.ensure_within(&self.operating_hours)?;

        let candidate = CandidateBlock::new(date, range);
        let probe = MaterializedEvent::pending(&candidate);

        let mut existing = snapshot.events_on(date);
        existing.extend(
            self.candidates
                .iter()
                .filter(|c| c.date == date)
                .map(MaterializedEvent::pending),
        );
        conflict::check(&probe, &existing, None)?;

        tracing::debug!(draft = %candidate.id, %date, %range, "staged candidate");
        self.candidates.push(candidate.clone());
        Ok(candidate)
    }

    pub fn remove_candidate(&mut self, id: Uuid) -> Result<CandidateBlock> {
        let pos = self
            .candidates
            .iter()
            .position(|c| c.id == id)
            .ok_or(AgendaError::BlockNotFound(BlockId::Draft(id)))?;
        Ok(self.candidates.remove(pos))
    }

    pub fn clear_all(&mut self) {
        self.candidates.clear();
    }

    /// Re-validate the whole batch against `fresh` and build the document to save.
    pub fn prepare_commit(&self, fresh: &Snapshot<'_>, mode: CommitMode) -> Result<CommitPlan> {
        let mut document = fresh.document.clone();
        let mut committed = Vec::with_capacity(self.candidates.len());
        let scope = BlockScope::from(mode);

        for candidate in &self.candidates {
            let placed = revalidate(&document, fresh, candidate, mode, &self.operating_hours)
                .map_err(|cause| {
                    tracing::warn!(draft = %candidate.id, error = %cause, "commit rejected");
                    AgendaError::StaleState {
                        subject: candidate.block_id().to_string(),
                        reason: format!(
                            "{} on {} no longer fits the current schedule: {}",
                            candidate.range, candidate.date, cause
                        ),
                        conflict: Some(Box::new(cause)),
                    }
                })?;
            let id = match placed {
                BlockScope::Template => {
                    document.upsert_template(DayOfWeek::from_date(candidate.date), candidate.range)
                }
                BlockScope::Override => document.upsert_override(candidate.date, candidate.range),
            };
            committed.push((id, BlockState::Draft.apply(Transition::Commit(scope))?));
        }

        Ok(CommitPlan {
            document,
            committed,
        })
    }
}

/// Checks one candidate against the document as built so far, which already
/// holds the earlier candidates of the batch.
fn revalidate(
    document: &ScheduleDocument,
    fresh: &Snapshot<'_>,
    candidate: &CandidateBlock,
    mode: CommitMode,
    operating_hours: &TimeRange,
) -> Result<BlockScope> {
    candidate.range.ensure_within(operating_hours)?;
    let probe = MaterializedEvent::pending(candidate);

    match mode {
        CommitMode::WeeklyTemplate => {
            let weekday = DayOfWeek::from_date(candidate.date);
            for date in recurrence_dates(document, fresh, weekday, candidate.date) {
                let on_date = MaterializedEvent {
                    date,
                    ..probe.clone()
                };
                conflict::check(&on_date, &blackouts_on(fresh.blackouts, date), None)?;
            }
            let rules: Vec<_> = document
                .template_blocks(weekday)
                .iter()
                .map(|r| MaterializedEvent::template(candidate.date, *r))
                .collect();
            conflict::check(&probe, &rules, None)?;
            Ok(BlockScope::Template)
        }
        CommitMode::SpecificDate => {
            let mut events = blackouts_on(fresh.blackouts, candidate.date);
            events.extend(
                document
                    .override_blocks(candidate.date)
                    .iter()
                    .map(|r| MaterializedEvent::date_override(candidate.date, *r)),
            );
            conflict::check(&probe, &events, None)?;
            Ok(BlockScope::Override)
        }
    }
}

/// Dates on which a template rule for `weekday` becomes visible: the unshadowed
/// matching dates of the fetched week, plus the date the block was drawn on.
pub(crate) fn recurrence_dates(
    document: &ScheduleDocument,
    snapshot: &Snapshot<'_>,
    weekday: DayOfWeek,
    drawn_on: NaiveDate,
) -> Vec<NaiveDate> {
    let mut dates: Vec<NaiveDate> = snapshot
        .week
        .dates()
        .filter(|d| DayOfWeek::from_date(*d) == weekday && !document.has_overrides(*d))
        .collect();
    if !dates.contains(&drawn_on) {
        dates.push(drawn_on);
    }
    dates
}
