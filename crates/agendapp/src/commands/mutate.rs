use crate::blackout::BlackoutSource;
use crate::commands::{refresh_blackouts, AffectedBlock, CmdMessage, CmdResult};
use crate::document::ScheduleDocument;
use crate::error::{AgendaError, Result};
use crate::model::{BlockId, DayOfWeek, MaterializedEvent, Week};
use crate::reconcile::{self, Mutation};
use crate::session::EditSession;
use crate::store::backend::ScheduleBackend;
use crate::store::ScheduleStore;

/// Apply a move, resize or delete to the block `id` as shown in the session's week.
pub fn run<B: ScheduleBackend, S: BlackoutSource>(
    store: &ScheduleStore<B>,
    source: &S,
    session: &mut EditSession,
    id: &BlockId,
    mutation: Mutation,
) -> Result<CmdResult> {
    let document = store.load(session.owner())?;
    let event = event_for(&document, id, session.week())?;
    let target = match mutation {
        Mutation::Move { date, .. } => date,
        Mutation::Resize { .. } | Mutation::Delete => event.date,
    };
    refresh_blackouts(source, session, &[target])?;

    let snapshot = session.snapshot(&document)?;
    let hours = session.staging().operating_hours();
    let outcome = reconcile::apply(&snapshot, &event, mutation, &hours)?;
    store.save(session.owner(), &outcome.document)?;

    let mut result = CmdResult::default();
    let message = match &outcome.current {
        Some(current) => format!("{} is now {}", outcome.previous, current),
        None => match id {
            BlockId::Template { weekday, .. } => format!(
                "Deleted {} from every {}",
                outcome.previous,
                weekday.name()
            ),
            _ => format!("Deleted {}", outcome.previous),
        },
    };
    result.add_message(CmdMessage::success(message));
    let affected = AffectedBlock {
        id: outcome.current.clone().unwrap_or(outcome.previous.clone()),
        state: outcome.state,
    };
    Ok(result.with_affected_blocks(vec![affected]))
}

/// The event `id` stands for in `week`.
fn event_for(document: &ScheduleDocument, id: &BlockId, week: Week) -> Result<MaterializedEvent> {
    match id {
        BlockId::Template { weekday, range } => {
            let date = week
                .dates()
                .find(|d| DayOfWeek::from_date(*d) == *weekday)
                .ok_or_else(|| AgendaError::BlockNotFound(id.clone()))?;
            if document.has_overrides(date) {
                return Err(AgendaError::stale(
                    id.to_string(),
                    format!(
                        "the template is hidden by date-specific blocks on {}; select another week",
                        date
                    ),
                ));
            }
            Ok(MaterializedEvent::template(date, *range))
        }
        BlockId::Override { date, range } => Ok(MaterializedEvent::date_override(*date, *range)),
        BlockId::Draft(_) | BlockId::Blackout { .. } => Err(AgendaError::ReadOnlyEvent(id.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::*;
    use crate::lifecycle::{BlockScope, BlockState};
    use crate::model::BlackoutInterval;
    use crate::store::mem_backend::MemBackend;

    fn seed(store: &ScheduleStore<MemBackend>) {
        let mut doc = store.load(OWNER).unwrap();
        doc.upsert_template(DayOfWeek::new(1).unwrap(), range("08:00-12:00"));
        doc.upsert_override(date("2024-05-08"), range("09:00-11:00"));
        store.save(OWNER, &doc).unwrap();
    }

    #[test]
    fn resize_is_persisted() {
        let (store, source, mut session) = fixtures();
        seed(&store);
        let id: BlockId = "tpl/1/08:00-12:00".parse().unwrap();

        let result = run(
            &store,
            &source,
            &mut session,
            &id,
            Mutation::Resize {
                range: range("08:00-13:00"),
            },
        )
        .unwrap();
        assert_eq!(
            result.affected_blocks[0].state,
            BlockState::Resized(BlockScope::Template)
        );
        let doc = store.load(OWNER).unwrap();
        assert_eq!(
            doc.template_blocks(DayOfWeek::new(1).unwrap()),
            &[range("08:00-13:00")]
        );
        assert_eq!(doc.revision, 2);
    }

    #[test]
    fn move_onto_blackout_outside_week_is_rejected() {
        let (store, source, mut session) = fixtures();
        seed(&store);
        source.insert(
            OWNER,
            BlackoutInterval::full_days("c", date("2024-05-20"), date("2024-05-20"), "Congress"),
        );
        let id: BlockId = "ovr/2024-05-08/09:00-11:00".parse().unwrap();

        let err = run(
            &store,
            &source,
            &mut session,
            &id,
            Mutation::Move {
                date: date("2024-05-20"),
                start: "09:00".parse().unwrap(),
            },
        )
        .unwrap_err();
        assert!(matches!(err, AgendaError::BlackoutConflict { .. }));
        assert_eq!(store.load(OWNER).unwrap().revision, 1);
    }

    #[test]
    fn deleting_override_restores_template_on_that_date() {
        let (store, source, mut session) = fixtures();
        let mut doc = store.load(OWNER).unwrap();
        doc.upsert_template(DayOfWeek::new(1).unwrap(), range("08:00-12:00"));
        doc.upsert_override(date("2024-05-06"), range("09:00-11:00"));
        store.save(OWNER, &doc).unwrap();

        let template: BlockId = "tpl/1/08:00-12:00".parse().unwrap();
        assert!(matches!(
            run(&store, &source, &mut session, &template, Mutation::Delete),
            Err(AgendaError::StaleState { .. })
        ));

        let id: BlockId = "ovr/2024-05-06/09:00-11:00".parse().unwrap();
        run(&store, &source, &mut session, &id, Mutation::Delete).unwrap();
        let events = crate::commands::week::run(&store, &source, &mut session)
            .unwrap()
            .listed_events;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id, template);
    }

    #[test]
    fn blackout_ids_are_read_only() {
        let (store, source, mut session) = fixtures();
        let id: BlockId = "blk/leave/2024-05-06".parse().unwrap();
        assert!(matches!(
            run(&store, &source, &mut session, &id, Mutation::Delete),
            Err(AgendaError::ReadOnlyEvent(_))
        ));
    }
}
