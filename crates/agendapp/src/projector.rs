//! # Calendar Projection
//!
//! Turns the canonical document plus the week's blackouts into concrete,
//! date-bound [`MaterializedEvent`]s. Projection is a pure function of its
//! inputs; nothing here reads storage or mutates the document.
//!
//! ## Shadow Rule
//!
//! For each date of the week:
//! - if the document holds override blocks for that exact date, those are
//!   emitted (`override` provenance) and the weekday template is **not**,
//!   even where the two would not overlap;
//! - otherwise the weekday's template blocks are emitted on that date
//!   (`template` provenance).
//!
//! Every effective blackout covering the date is then emitted for that date
//! alone (a multi-day interval becomes one event per visible day), spanning
//! its time window or the whole day.
//!
//! Events come out by date, then by start time. Ties keep emission order:
//! availability, then blackouts in listing order, then pending drafts.

use crate::document::ScheduleDocument;
use crate::model::{BlackoutInterval, CandidateBlock, DayOfWeek, MaterializedEvent, TimeRange, Week};
use chrono::NaiveDate;
use serde::Serialize;

/// A document plus the blackouts fetched for `week`: everything a conflict
/// check is allowed to look at.
#[derive(Debug, Clone, Copy)]
pub struct Snapshot<'a> {
    pub document: &'a ScheduleDocument,
    pub week: Week,
    pub blackouts: &'a [BlackoutInterval],
}

impl<'a> Snapshot<'a> {
    pub fn new(document: &'a ScheduleDocument, week: Week, blackouts: &'a [BlackoutInterval]) -> Self {
        Self {
            document,
            week,
            blackouts,
        }
    }

    pub fn events_on(&self, date: NaiveDate) -> Vec<MaterializedEvent> {
        project_day(self.document, date, self.blackouts)
    }

    pub fn project(&self) -> Vec<MaterializedEvent> {
        project_week(self.document, &self.week, self.blackouts)
    }
}

/// Availability blocks that apply on `date`, after the shadow rule.
pub fn availability_on(document: &ScheduleDocument, date: NaiveDate) -> Vec<MaterializedEvent> {
    if document.has_overrides(date) {
        document
            .override_blocks(date)
            .iter()
            .map(|range| MaterializedEvent::date_override(date, *range))
            .collect()
    } else {
        document
            .template_blocks(DayOfWeek::from_date(date))
            .iter()
            .map(|range| MaterializedEvent::template(date, *range))
            .collect()
    }
}

/// Effective blackouts covering `date`, as events on that date.
pub fn blackouts_on(blackouts: &[BlackoutInterval], date: NaiveDate) -> Vec<MaterializedEvent> {
    blackouts
        .iter()
        .filter(|b| b.is_effective() && b.covers(date))
        .map(|b| MaterializedEvent::blackout(b, date))
        .collect()
}

pub fn project_day(
    document: &ScheduleDocument,
    date: NaiveDate,
    blackouts: &[BlackoutInterval],
) -> Vec<MaterializedEvent> {
    let mut events = availability_on(document, date);
    events.extend(blackouts_on(blackouts, date));
    events.sort_by_key(|e| e.range.start());
    events
}

pub fn project_week(
    document: &ScheduleDocument,
    week: &Week,
    blackouts: &[BlackoutInterval],
) -> Vec<MaterializedEvent> {
    let events: Vec<_> = week
        .dates()
        .flat_map(|date| project_day(document, date, blackouts))
        .collect();
    tracing::debug!(week = %week, events = events.len(), "projected week");
    events
}

/// Adds staged candidates that fall inside `week` as `pending` events.
pub fn with_pending(
    mut events: Vec<MaterializedEvent>,
    week: &Week,
    candidates: &[CandidateBlock],
) -> Vec<MaterializedEvent> {
    events.extend(
        candidates
            .iter()
            .filter(|c| week.contains(c.date))
            .map(MaterializedEvent::pending),
    );
    events.sort_by_key(|e| (e.date, e.range.start()));
    events
}

/// Which rule decided a date's availability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DaySource {
    Override,
    Template,
    None,
}

/// Effective availability for one date, resolved the way a booking backend
/// would read it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayView {
    pub date: NaiveDate,
    pub source: DaySource,
    pub availability: Vec<MaterializedEvent>,
    pub blackouts: Vec<MaterializedEvent>,
}

impl DayView {
    pub fn resolve(
        document: &ScheduleDocument,
        date: NaiveDate,
        blackouts: &[BlackoutInterval],
    ) -> Self {
        let availability = availability_on(document, date);
        let source = if document.has_overrides(date) {
            DaySource::Override
        } else if availability.is_empty() {
            DaySource::None
        } else {
            DaySource::Template
        };
        Self {
            date,
            source,
            availability,
            blackouts: blackouts_on(blackouts, date),
        }
    }

    /// No availability, or a blackout covering the whole day.
    pub fn is_closed(&self) -> bool {
        self.availability.is_empty()
            || self
                .blackouts
                .iter()
                .any(|b| b.range == TimeRange::FULL_DAY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{parse_date, Provenance, WeekStart};

    fn date(s: &str) -> NaiveDate {
        parse_date(s).unwrap()
    }

    fn range(s: &str) -> TimeRange {
        s.parse().unwrap()
    }

    fn week_of(s: &str) -> Week {
        Week::containing(date(s), WeekStart::Sunday)
    }

    fn monday_template() -> ScheduleDocument {
        let mut doc = ScheduleDocument::new();
        doc.upsert_template(DayOfWeek::new(1).unwrap(), range("08:00-12:00"));
        doc
    }

    #[test]
    fn template_is_positioned_on_its_weekday() {
        let events = project_week(&monday_template(), &week_of("2024-05-06"), &[]);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].date, date("2024-05-06"));
        assert_eq!(events[0].range, range("08:00-12:00"));
        assert_eq!(events[0].provenance, Provenance::Template);
        assert_eq!(events[0].id.to_string(), "tpl/1/08:00-12:00");
    }

    #[test]
    fn override_shadows_the_whole_day() {
        let mut doc = monday_template();
        doc.upsert_template(DayOfWeek::new(1).unwrap(), range("14:00-16:00"));
        doc.upsert_override(date("2024-05-06"), range("09:00-11:00"));

        let events = project_week(&doc, &week_of("2024-05-06"), &[]);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].provenance, Provenance::Override);

        let next = project_week(&doc, &week_of("2024-05-13"), &[]);
        assert_eq!(next.len(), 2);
        assert!(next.iter().all(|e| e.provenance == Provenance::Template));
    }

    #[test]
    fn multi_day_blackout_is_clipped_to_the_week() {
        let blackouts = vec![BlackoutInterval::full_days(
            "leave",
            date("2024-05-01"),
            date("2024-05-06"),
            "Leave",
        )];
        let events = project_week(&ScheduleDocument::new(), &week_of("2024-05-06"), &blackouts);
        let dates: Vec<_> = events.iter().map(|e| e.date).collect();
        assert_eq!(dates, vec![date("2024-05-05"), date("2024-05-06")]);
        assert!(events.iter().all(|e| e.range == TimeRange::FULL_DAY));
        assert_eq!(events[0].label, "Leave");
    }

    #[test]
    fn inactive_blackouts_are_not_projected() {
        let mut interval =
            BlackoutInterval::full_days("old", date("2024-05-06"), date("2024-05-06"), "Old");
        interval.active = false;
        let events = project_week(&monday_template(), &week_of("2024-05-06"), &[interval]);
        assert_eq!(events.len(), 1);
        assert!(events[0].is_availability());
    }

    #[test]
    fn events_are_ordered_by_start_with_stable_ties() {
        let mut doc = ScheduleDocument::new();
        doc.upsert_override(date("2024-05-06"), range("13:00-15:00"));
        doc.upsert_override(date("2024-05-06"), range("08:00-10:00"));
        let blackouts = vec![BlackoutInterval::partial(
            "meeting",
            date("2024-05-06"),
            date("2024-05-06"),
            range("13:00-14:00"),
            "Meeting",
        )];

        let events = project_day(&doc, date("2024-05-06"), &blackouts);
        let order: Vec<_> = events
            .iter()
            .map(|e| (e.range.to_string(), e.provenance))
            .collect();
        assert_eq!(
            order,
            vec![
                ("08:00-10:00".to_string(), Provenance::Override),
                ("13:00-15:00".to_string(), Provenance::Override),
                ("13:00-14:00".to_string(), Provenance::Blackout),
            ]
        );
    }

    #[test]
    fn pending_candidates_join_the_projection() {
        let week = week_of("2024-05-06");
        let events = project_week(&monday_template(), &week, &[]);
        let inside = CandidateBlock::new(date("2024-05-07"), range("09:00-10:00"));
        let outside = CandidateBlock::new(date("2024-05-20"), range("09:00-10:00"));

        let events = with_pending(events, &week, &[inside.clone(), outside]);
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].id, inside.block_id());
        assert_eq!(events[1].provenance, Provenance::Pending);
    }

    #[test]
    fn day_view_reports_winning_source() {
        let mut doc = monday_template();
        doc.upsert_override(date("2024-05-13"), range("10:00-11:00"));

        let templated = DayView::resolve(&doc, date("2024-05-06"), &[]);
        assert_eq!(templated.source, DaySource::Template);
        let overridden = DayView::resolve(&doc, date("2024-05-13"), &[]);
        assert_eq!(overridden.source, DaySource::Override);
        assert_eq!(overridden.availability[0].range, range("10:00-11:00"));
        let empty = DayView::resolve(&doc, date("2024-05-07"), &[]);
        assert_eq!(empty.source, DaySource::None);
        assert!(empty.is_closed());
    }
}
