//! # Edit Session
//!
//! The state one editor holds while working on one practitioner's week: the
//! selected week, the blackouts fetched for it and the staged candidates. A
//! session is a plain value owned by its caller, so an admin can keep one per
//! practitioner side by side.
//!
//! ## Superseded Fetches
//!
//! Fetching blackouts is the only step that may wait on a collaborator. Each
//! fetch is started with a [`FetchTicket`] recording the week it was issued for.
//! When the result arrives it is accepted only if that week is still selected
//! and no newer fetch was accepted in the meantime; otherwise it is dropped.
//! Conflict checks refuse to run until blackouts for the selected week are in.

use crate::document::ScheduleDocument;
use crate::error::{AgendaError, Result};
use crate::model::{BlackoutInterval, CandidateBlock, MaterializedEvent, TimeRange, Week, WeekStart};
use crate::projector::{with_pending, Snapshot};
use crate::staging::StagingArea;
use chrono::NaiveDate;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    week: Week,
    serial: u64,
}

impl FetchTicket {
    pub fn week(&self) -> Week {
        self.week
    }

    /// The inclusive date range to list blackouts for.
    pub fn range(&self) -> (NaiveDate, NaiveDate) {
        (self.week.start(), self.week.end())
    }
}

#[derive(Debug, Clone)]
struct FetchedBlackouts {
    week: Week,
    serial: u64,
    intervals: Vec<BlackoutInterval>,
}

#[derive(Debug, Clone)]
pub struct EditSession {
    owner: String,
    first_day: WeekStart,
    week: Week,
    issued: u64,
    blackouts: Option<FetchedBlackouts>,
    staging: StagingArea,
}

impl EditSession {
    pub fn new(
        owner: impl Into<String>,
        today: NaiveDate,
        first_day: WeekStart,
        operating_hours: TimeRange,
    ) -> Self {
        Self {
            owner: owner.into(),
            first_day,
            week: Week::containing(today, first_day),
            issued: 0,
            blackouts: None,
            staging: StagingArea::new(operating_hours),
        }
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn week(&self) -> Week {
        self.week
    }

    /// Switch to the week containing `date` and start fetching its blackouts.
    pub fn select_week(&mut self, date: NaiveDate) -> FetchTicket {
        self.week = Week::containing(date, self.first_day);
        self.begin_fetch()
    }

    /// Start a (re)fetch of blackouts for the selected week.
    pub fn begin_fetch(&mut self) -> FetchTicket {
        self.issued += 1;
        FetchTicket {
            week: self.week,
            serial: self.issued,
        }
    }

    /// Returns false, keeping the current data, when the ticket was superseded.
    pub fn accept_blackouts(
        &mut self,
        ticket: FetchTicket,
        intervals: Vec<BlackoutInterval>,
    ) -> bool {
        let newer_accepted = self
            .blackouts
            .as_ref()
            .is_some_and(|b| b.week == ticket.week && b.serial > ticket.serial);
        if ticket.week != self.week || newer_accepted {
            tracing::warn!(
                owner = %self.owner,
                fetched_for = %ticket.week,
                selected = %self.week,
                "discarded superseded blackout fetch"
            );
            return false;
        }
        tracing::debug!(owner = %self.owner, week = %ticket.week, count = intervals.len(), "accepted blackouts");
        self.blackouts = Some(FetchedBlackouts {
            week: ticket.week,
            serial: ticket.serial,
            intervals,
        });
        true
    }

    /// Blackouts of the selected week. Stale or missing data is an error, never
    /// an empty list.
    pub fn blackouts(&self) -> Result<&[BlackoutInterval]> {
        fetched_for(&self.blackouts, self.week)
    }

    pub fn snapshot<'a>(&'a self, document: &'a ScheduleDocument) -> Result<Snapshot<'a>> {
        Ok(Snapshot::new(document, self.week, self.blackouts()?))
    }

    /// The selected week with staged candidates shown as pending events.
    pub fn project(&self, document: &ScheduleDocument) -> Result<Vec<MaterializedEvent>> {
        let events = self.snapshot(document)?.project();
        Ok(with_pending(events, &self.week, self.staging.candidates()))
    }

    pub fn staging(&self) -> &StagingArea {
        &self.staging
    }

    pub fn staging_mut(&mut self) -> &mut StagingArea {
        &mut self.staging
    }

    /// Stage a candidate against `document` and the selected week's blackouts.
    pub fn stage(
        &mut self,
        document: &ScheduleDocument,
        date: NaiveDate,
        range: TimeRange,
    ) -> Result<CandidateBlock> {
        if !self.week.contains(date) {
            return Err(AgendaError::stale(
                format!("week {}", self.week),
                format!("{} is outside the selected week", date),
            ));
        }
        let blackouts = fetched_for(&self.blackouts, self.week)?;
        let snapshot = Snapshot::new(document, self.week, blackouts);
        self.staging
            .add_candidate(&snapshot, date, range.start(), range.end())
    }
}

fn fetched_for(fetched: &Option<FetchedBlackouts>, week: Week) -> Result<&[BlackoutInterval]> {
    match fetched {
        Some(fetched) if fetched.week == week => Ok(&fetched.intervals),
        _ => Err(AgendaError::stale(
            format!("week {}", week),
            "blackouts for this week have not been fetched",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{parse_date, Provenance};

    fn date(s: &str) -> NaiveDate {
        parse_date(s).unwrap()
    }

    fn session() -> EditSession {
        EditSession::new(
            "dr-house",
            date("2024-05-06"),
            WeekStart::Sunday,
            "06:00-22:00".parse().unwrap(),
        )
    }

    #[test]
    fn checks_refuse_to_run_without_blackouts() {
        let s = session();
        assert!(matches!(s.blackouts(), Err(AgendaError::StaleState { .. })));
        assert!(s.project(&ScheduleDocument::new()).is_err());
    }

    #[test]
    fn fetch_for_previous_week_is_discarded() {
        let mut s = session();
        let old = s.begin_fetch();
        let new = s.select_week(date("2024-05-13"));

        let leave =
            BlackoutInterval::full_days("l", date("2024-05-06"), date("2024-05-06"), "Leave");
        assert!(!s.accept_blackouts(old, vec![leave]));
        assert!(s.blackouts().is_err());

        assert!(s.accept_blackouts(new, vec![]));
        assert!(s.blackouts().unwrap().is_empty());
    }

    #[test]
    fn older_fetch_for_same_week_does_not_replace_newer() {
        let mut s = session();
        let first = s.begin_fetch();
        let second = s.begin_fetch();
        assert!(s.accept_blackouts(second, vec![]));

        let leave =
            BlackoutInterval::full_days("l", date("2024-05-06"), date("2024-05-06"), "Leave");
        assert!(!s.accept_blackouts(first, vec![leave]));
        assert!(s.blackouts().unwrap().is_empty());
    }

    #[test]
    fn changing_week_invalidates_cached_blackouts() {
        let mut s = session();
        let ticket = s.begin_fetch();
        s.accept_blackouts(ticket, vec![]);
        s.select_week(date("2024-05-20"));
        assert!(s.blackouts().is_err());
    }

    #[test]
    fn projection_includes_staged_candidates() {
        let mut s = session();
        let ticket = s.begin_fetch();
        s.accept_blackouts(ticket, vec![]);
        let doc = ScheduleDocument::new();
        let staged = s
            .stage(&doc, date("2024-05-07"), "09:00-10:00".parse().unwrap())
            .unwrap();

        let events = s.project(&doc).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].provenance, Provenance::Pending);
        assert_eq!(events[0].id, staged.block_id());
    }

    #[test]
    fn sessions_do_not_share_staging() {
        let mut a = session();
        let b = session();
        let ticket = a.begin_fetch();
        a.accept_blackouts(ticket, vec![]);
        a.stage(
            &ScheduleDocument::new(),
            date("2024-05-07"),
            "09:00-10:00".parse().unwrap(),
        )
        .unwrap();
        assert_eq!(a.staging().candidates().len(), 1);
        assert!(b.staging().is_empty());
    }
}
