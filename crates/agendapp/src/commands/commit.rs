use crate::blackout::BlackoutSource;
use crate::commands::{refresh_blackouts, AffectedBlock, CmdMessage, CmdResult};
use crate::error::Result;
use crate::model::CommitMode;
use crate::session::EditSession;
use crate::store::backend::ScheduleBackend;
use crate::store::ScheduleStore;

/// Commit every staged candidate, or none of them.
///
/// The batch is re-validated against the document and blackouts as they are
/// now. The staging area is cleared only after the new document is saved.
pub fn run<B: ScheduleBackend, S: BlackoutSource>(
    store: &ScheduleStore<B>,
    source: &S,
    session: &mut EditSession,
    mode: CommitMode,
) -> Result<CmdResult> {
    let mut result = CmdResult::default();
    if session.staging().is_empty() {
        result.add_message(CmdMessage::info("Nothing to commit"));
        return Ok(result);
    }

    let fresh = store.load(session.owner())?;
    // Candidates may have been staged in a week the session has since left.
    let staged_dates: Vec<_> = session.staging().candidates().iter().map(|c| c.date).collect();
    refresh_blackouts(source, session, &staged_dates)?;
    let plan = session
        .staging()
        .prepare_commit(&session.snapshot(&fresh)?, mode)?;
    store.save(session.owner(), &plan.document)?;
    session.staging_mut().clear_all();

    result.add_message(CmdMessage::success(format!(
        "Committed {} block(s) as {} rules",
        plan.committed.len(),
        mode
    )));
    let affected = plan
        .committed
        .into_iter()
        .map(|(id, state)| AffectedBlock { id, state })
        .collect();
    Ok(result.with_affected_blocks(affected))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{stage, test_support::*};
    use crate::error::AgendaError;
    use crate::lifecycle::{BlockScope, BlockState};
    use crate::model::{BlackoutInterval, DayOfWeek, TimeRange};

    #[test]
    fn specific_date_commit_writes_overrides() {
        let (store, source, mut session) = fixtures();
        stage::run(&store, &source, &mut session, date("2024-05-06"), range("08:00-09:00")).unwrap();
        stage::run(&store, &source, &mut session, date("2024-05-08"), range("10:00-11:00")).unwrap();

        let result = run(&store, &source, &mut session, CommitMode::SpecificDate).unwrap();
        assert_eq!(result.affected_blocks.len(), 2);
        assert!(result
            .affected_blocks
            .iter()
            .all(|b| b.state == BlockState::Committed(BlockScope::Override)));

        let doc = store.load(OWNER).unwrap();
        assert_eq!(doc.override_blocks(date("2024-05-06")), &[range("08:00-09:00")]);
        assert_eq!(doc.override_blocks(date("2024-05-08")), &[range("10:00-11:00")]);
        assert!(doc.template().next().is_none());
        assert!(session.staging().is_empty());
    }

    #[test]
    fn concurrent_change_rejects_whole_batch() {
        let (store, source, mut session) = fixtures();
        stage::run(&store, &source, &mut session, date("2024-05-06"), range("08:00-09:00")).unwrap();
        stage::run(&store, &source, &mut session, date("2024-05-08"), range("10:00-11:00")).unwrap();

        // Another editor adds a Wednesday rule in the meantime.
        let other = ScheduleStore::with_backend(store.backend.clone());
        let mut doc = other.load(OWNER).unwrap();
        doc.upsert_template(DayOfWeek::new(3).unwrap(), range("09:00-12:00"));
        other.save(OWNER, &doc).unwrap();

        let err = run(&store, &source, &mut session, CommitMode::WeeklyTemplate).unwrap_err();
        assert!(matches!(err, AgendaError::StaleState { .. }));
        assert_eq!(
            err.conflicting_interval(),
            Some((date("2024-05-08"), range("09:00-12:00")))
        );

        let stored = store.load(OWNER).unwrap();
        assert!(stored.template_blocks(DayOfWeek::new(1).unwrap()).is_empty());
        assert_eq!(session.staging().candidates().len(), 2);
    }

    #[test]
    fn blackout_on_a_week_left_behind_still_rejects() {
        let (store, source, mut session) = fixtures();
        stage::run(&store, &source, &mut session, date("2024-05-06"), range("10:00-10:30")).unwrap();
        source.insert(
            OWNER,
            BlackoutInterval::full_days("bo-1", date("2024-05-06"), date("2024-05-06"), "Leave"),
        );
        session.select_week(date("2024-05-20"));

        let err = run(&store, &source, &mut session, CommitMode::SpecificDate).unwrap_err();
        assert!(matches!(err, AgendaError::StaleState { .. }));
        assert_eq!(
            err.conflicting_interval(),
            Some((date("2024-05-06"), TimeRange::FULL_DAY))
        );
        assert!(store
            .load(OWNER)
            .unwrap()
            .override_blocks(date("2024-05-06"))
            .is_empty());
        assert_eq!(session.staging().candidates().len(), 1);
    }

    #[test]
    fn failed_save_keeps_staging() {
        let (store, source, mut session) = fixtures();
        stage::run(&store, &source, &mut session, date("2024-05-06"), range("08:00-09:00")).unwrap();
        store.backend.set_simulate_write_error(true);

        assert!(run(&store, &source, &mut session, CommitMode::SpecificDate).is_err());
        assert_eq!(session.staging().candidates().len(), 1);
    }

    #[test]
    fn empty_batch_commits_nothing() {
        let (store, source, mut session) = fixtures();
        let result = run(&store, &source, &mut session, CommitMode::WeeklyTemplate).unwrap();
        assert!(result.affected_blocks.is_empty());
        assert_eq!(store.load(OWNER).unwrap().revision, 0);
    }
}
