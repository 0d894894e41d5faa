//! # Reconciler
//!
//! Direct edits of an already projected event (move, resize, delete) come back
//! here and are turned into updates of the canonical document. The rendered
//! event list is never written back as is.
//!
//! Scope follows provenance:
//! - a **template** event stands for its weekday rule, so moving, resizing or
//!   deleting it changes that rule in every week;
//! - an **override** event stands for one block on one date only. Deleting the
//!   last override of a date lets the template show there again.
//!
//! Every move and resize is re-validated against the fresh document and
//! blackouts before anything changes. Mutations work on a copy; on rejection the
//! caller's document is untouched.
//!
//! [`serialize`] is the inverse of projection: it rebuilds the template/override
//! partition from a list of materialized events.

use crate::conflict;
use crate::document::ScheduleDocument;
use crate::error::{AgendaError, Result};
use crate::lifecycle::{BlockScope, BlockState, Transition};
use crate::model::{BlockId, DayOfWeek, MaterializedEvent, Provenance, TimeOfDay, TimeRange};
use crate::projector::{blackouts_on, Snapshot};
use crate::staging::recurrence_dates;
use chrono::NaiveDate;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    /// Same duration, new date and start.
    Move { date: NaiveDate, start: TimeOfDay },
    /// Same date, new bounds.
    Resize { range: TimeRange },
    Delete,
}

impl Mutation {
    fn transition(&self) -> Transition {
        match self {
            Mutation::Move { .. } => Transition::Move,
            Mutation::Resize { .. } => Transition::Resize,
            Mutation::Delete => Transition::Delete,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MutationOutcome {
    #[serde(skip)]
    pub document: ScheduleDocument,
    pub previous: BlockId,
    /// Id of the block after the change; `None` once deleted.
    pub current: Option<BlockId>,
    pub state: BlockState,
}

pub fn apply(
    snapshot: &Snapshot<'_>,
    event: &MaterializedEvent,
    mutation: Mutation,
    operating_hours: &TimeRange,
) -> Result<MutationOutcome> {
    let scope = match event.provenance {
        Provenance::Template => BlockScope::Template,
        Provenance::Override => BlockScope::Override,
        Provenance::Blackout | Provenance::Pending => {
            return Err(AgendaError::ReadOnlyEvent(event.id.clone()))
        }
    };
    locate(snapshot.document, event)?;
    let state = BlockState::Committed(scope).apply(mutation.transition())?;

    let mut document = snapshot.document.clone();
    let (date, range) = match mutation {
        Mutation::Delete => {
            document.remove(&event.id)?;
            tracing::info!(block = %event.id, "deleted block");
            return Ok(MutationOutcome {
                document,
                previous: event.id.clone(),
                current: None,
                state,
            });
        }
        Mutation::Move { date, start } => (date, event.range.starting_at(start)?),
        Mutation::Resize { range } => (event.date, range),
    };
    range.ensure_within(operating_hours)?;

    let probe = MaterializedEvent {
        date,
        range,
        ..event.clone()
    };
    match scope {
        BlockScope::Template => validate_template_move(snapshot, &probe)?,
        BlockScope::Override => validate_override_move(snapshot, &probe)?,
    }

    document.remove(&event.id)?;
    let current = match scope {
        BlockScope::Template => document.upsert_template(DayOfWeek::from_date(date), range),
        BlockScope::Override => document.upsert_override(date, range),
    };
    tracing::info!(from = %event.id, to = %current, "reconciled block");

    Ok(MutationOutcome {
        document,
        previous: event.id.clone(),
        current: Some(current),
        state,
    })
}

/// The event must still be what the fresh document would project.
fn locate(document: &ScheduleDocument, event: &MaterializedEvent) -> Result<()> {
    let positioned = match &event.id {
        BlockId::Template { weekday, range } => {
            *weekday == DayOfWeek::from_date(event.date)
                && *range == event.range
                && !document.has_overrides(event.date)
        }
        BlockId::Override { date, range } => *date == event.date && *range == event.range,
        BlockId::Draft(_) | BlockId::Blackout { .. } => false,
    };
    if positioned && document.contains(&event.id) {
        Ok(())
    } else {
        Err(AgendaError::stale(
            event.id.to_string(),
            format!(
                "{} on {} is no longer in the schedule",
                event.range, event.date
            ),
        ))
    }
}

/// A weekday rule shows on every unshadowed date with that weekday, so
/// blackouts are checked on each of them and overlaps against the rule's siblings.
fn validate_template_move(snapshot: &Snapshot<'_>, probe: &MaterializedEvent) -> Result<()> {
    let weekday = DayOfWeek::from_date(probe.date);
    for date in recurrence_dates(snapshot.document, snapshot, weekday, probe.date) {
        let on_date = MaterializedEvent {
            date,
            ..probe.clone()
        };
        conflict::check(&on_date, &blackouts_on(snapshot.blackouts, date), None)?;
    }
    let siblings: Vec<_> = snapshot
        .document
        .template_blocks(weekday)
        .iter()
        .map(|r| MaterializedEvent::template(probe.date, *r))
        .collect();
    conflict::check(probe, &siblings, Some(&probe.id))
}

fn validate_override_move(snapshot: &Snapshot<'_>, probe: &MaterializedEvent) -> Result<()> {
    let mut events = blackouts_on(snapshot.blackouts, probe.date);
    events.extend(
        snapshot
            .document
            .override_blocks(probe.date)
            .iter()
            .map(|r| MaterializedEvent::date_override(probe.date, *r)),
    );
    conflict::check(probe, &events, Some(&probe.id))
}

/// Rebuild a document from projected events. Blackout and pending events are
/// not part of the schedule and are skipped.
pub fn serialize(events: &[MaterializedEvent]) -> Result<ScheduleDocument> {
    let mut document = ScheduleDocument::new();
    for event in events {
        match (&event.provenance, &event.id) {
            (Provenance::Template, BlockId::Template { weekday, range })
                if *weekday == DayOfWeek::from_date(event.date) && *range == event.range =>
            {
                document.upsert_template(*weekday, *range);
            }
            (Provenance::Override, BlockId::Override { date, range })
                if *date == event.date && *range == event.range =>
            {
                document.upsert_override(*date, *range);
            }
            (Provenance::Blackout, _) | (Provenance::Pending, _) => {}
            _ => return Err(AgendaError::InvalidBlockId(event.id.to_string())),
        }
    }
    Ok(document)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{parse_date, BlackoutInterval, Week, WeekStart};
    use crate::projector::project_week;

    fn date(s: &str) -> NaiveDate {
        parse_date(s).unwrap()
    }

    fn range(s: &str) -> TimeRange {
        s.parse().unwrap()
    }

    fn hours() -> TimeRange {
        range("06:00-22:00")
    }

    fn week() -> Week {
        Week::containing(date("2024-05-06"), WeekStart::Sunday)
    }

    fn monday() -> DayOfWeek {
        DayOfWeek::new(1).unwrap()
    }

    fn sample() -> ScheduleDocument {
        let mut doc = ScheduleDocument::new();
        doc.upsert_template(monday(), range("08:00-10:00"));
        doc.upsert_template(monday(), range("14:00-16:00"));
        doc.upsert_override(date("2024-05-08"), range("09:00-11:00"));
        doc
    }

    #[test]
    fn resize_template_changes_rule_for_all_weeks() {
        let doc = sample();
        let snapshot = Snapshot::new(&doc, week(), &[]);
        let event = MaterializedEvent::template(date("2024-05-06"), range("08:00-10:00"));

        let outcome = apply(
            &snapshot,
            &event,
            Mutation::Resize {
                range: range("08:00-11:00"),
            },
            &hours(),
        )
        .unwrap();
        assert_eq!(
            outcome.document.template_blocks(monday()),
            &[range("08:00-11:00"), range("14:00-16:00")]
        );
        assert_eq!(outcome.state, BlockState::Resized(BlockScope::Template));
        assert_eq!(
            outcome.current.unwrap().to_string(),
            "tpl/1/08:00-11:00"
        );
    }

    #[test]
    fn move_template_to_another_weekday() {
        let doc = sample();
        let snapshot = Snapshot::new(&doc, week(), &[]);
        let event = MaterializedEvent::template(date("2024-05-06"), range("14:00-16:00"));

        let outcome = apply(
            &snapshot,
            &event,
            Mutation::Move {
                date: date("2024-05-07"),
                start: "15:00".parse().unwrap(),
            },
            &hours(),
        )
        .unwrap();
        let tuesday = DayOfWeek::new(2).unwrap();
        assert_eq!(outcome.document.template_blocks(tuesday), &[range("15:00-17:00")]);
        assert_eq!(outcome.document.template_blocks(monday()), &[range("08:00-10:00")]);
    }

    #[test]
    fn overlapping_resize_is_rejected_and_document_untouched() {
        let doc = sample();
        let snapshot = Snapshot::new(&doc, week(), &[]);
        let event = MaterializedEvent::template(date("2024-05-06"), range("08:00-10:00"));

        let err = apply(
            &snapshot,
            &event,
            Mutation::Resize {
                range: range("08:00-15:00"),
            },
            &hours(),
        )
        .unwrap_err();
        assert_eq!(
            err.conflicting_interval(),
            Some((date("2024-05-06"), range("14:00-16:00")))
        );
        assert_eq!(doc, sample());
    }

    #[test]
    fn moving_onto_an_identical_block_is_an_overlap() {
        let doc = sample();
        let snapshot = Snapshot::new(&doc, week(), &[]);
        let event = MaterializedEvent::template(date("2024-05-06"), range("08:00-10:00"));
        let err = apply(
            &snapshot,
            &event,
            Mutation::Move {
                date: date("2024-05-06"),
                start: "14:00".parse().unwrap(),
            },
            &hours(),
        )
        .unwrap_err();
        assert!(matches!(err, AgendaError::BlockOverlap { .. }));
    }

    #[test]
    fn template_move_checks_blackouts_on_every_visible_instance() {
        let doc = sample();
        let blackouts = vec![BlackoutInterval::partial(
            "clinic",
            date("2024-05-06"),
            date("2024-05-06"),
            range("10:00-12:00"),
            "Clinic session",
        )];
        let snapshot = Snapshot::new(&doc, week(), &blackouts);
        let event = MaterializedEvent::template(date("2024-05-06"), range("14:00-16:00"));

        let err = apply(
            &snapshot,
            &event,
            Mutation::Move {
                date: date("2024-05-06"),
                start: "11:00".parse().unwrap(),
            },
            &hours(),
        )
        .unwrap_err();
        assert!(
            matches!(err, AgendaError::BlackoutConflict { ref label, date: d, .. } if label == "Clinic session" && d == date("2024-05-06"))
        );
    }

    #[test]
    fn override_move_is_scoped_to_its_date() {
        let doc = sample();
        let snapshot = Snapshot::new(&doc, week(), &[]);
        let event = MaterializedEvent::date_override(date("2024-05-08"), range("09:00-11:00"));

        let outcome = apply(
            &snapshot,
            &event,
            Mutation::Move {
                date: date("2024-05-09"),
                start: "09:00".parse().unwrap(),
            },
            &hours(),
        )
        .unwrap();
        assert!(!outcome.document.has_overrides(date("2024-05-08")));
        assert_eq!(
            outcome.document.override_blocks(date("2024-05-09")),
            &[range("09:00-11:00")]
        );
        assert_eq!(outcome.document.template_blocks(monday()).len(), 2);
    }

    #[test]
    fn delete_scope_follows_provenance() {
        let doc = sample();
        let snapshot = Snapshot::new(&doc, week(), &[]);

        let template = MaterializedEvent::template(date("2024-05-06"), range("08:00-10:00"));
        let outcome = apply(&snapshot, &template, Mutation::Delete, &hours()).unwrap();
        assert_eq!(outcome.document.template_blocks(monday()), &[range("14:00-16:00")]);
        assert_eq!(outcome.state, BlockState::Deleted);
        assert!(outcome.current.is_none());

        let ovr = MaterializedEvent::date_override(date("2024-05-08"), range("09:00-11:00"));
        let outcome = apply(&snapshot, &ovr, Mutation::Delete, &hours()).unwrap();
        assert!(!outcome.document.has_overrides(date("2024-05-08")));
    }

    #[test]
    fn blackout_and_pending_events_are_read_only() {
        let doc = sample();
        let snapshot = Snapshot::new(&doc, week(), &[]);
        let leave =
            BlackoutInterval::full_days("leave", date("2024-05-06"), date("2024-05-06"), "Leave");
        let event = MaterializedEvent::blackout(&leave, date("2024-05-06"));
        assert!(matches!(
            apply(&snapshot, &event, Mutation::Delete, &hours()),
            Err(AgendaError::ReadOnlyEvent(_))
        ));
    }

    #[test]
    fn vanished_block_is_stale() {
        let doc = sample();
        let snapshot = Snapshot::new(&doc, week(), &[]);
        let event = MaterializedEvent::template(date("2024-05-06"), range("18:00-19:00"));
        assert!(matches!(
            apply(&snapshot, &event, Mutation::Delete, &hours()),
            Err(AgendaError::StaleState { .. })
        ));
    }

    #[test]
    fn serialize_inverts_projection() {
        let doc = sample();
        let events = project_week(&doc, &week(), &[]);
        let rebuilt = serialize(&events).unwrap();
        assert!(rebuilt.same_partition(&doc.restrict_to(&week())));
    }

    #[test]
    fn serialize_rejects_mispositioned_ids() {
        let mut event = MaterializedEvent::template(date("2024-05-06"), range("08:00-10:00"));
        event.date = date("2024-05-07");
        assert!(matches!(
            serialize(&[event]),
            Err(AgendaError::InvalidBlockId(_))
        ));
    }
}
