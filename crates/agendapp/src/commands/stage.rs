use crate::blackout::BlackoutSource;
use crate::commands::{refresh_blackouts, CmdMessage, CmdResult};
use crate::error::Result;
use crate::model::TimeRange;
use crate::session::EditSession;
use crate::store::backend::ScheduleBackend;
use crate::store::ScheduleStore;
use chrono::NaiveDate;
use uuid::Uuid;

/// Stage one candidate. On rejection the staged set is unchanged.
pub fn run<B: ScheduleBackend, S: BlackoutSource>(
    store: &ScheduleStore<B>,
    source: &S,
    session: &mut EditSession,
    date: NaiveDate,
    range: TimeRange,
) -> Result<CmdResult> {
    let document = store.load(session.owner())?;
    refresh_blackouts(source, session, &[])?;
    let candidate = session.stage(&document, date, range)?;

    let mut result = CmdResult::default();
    result.add_message(CmdMessage::info(format!(
        "Staged {} {} ({} pending)",
        candidate.date,
        candidate.range,
        session.staging().candidates().len()
    )));
    result.staged = session.staging().candidates().to_vec();
    Ok(result)
}

pub fn discard(session: &mut EditSession, id: Uuid) -> Result<CmdResult> {
    let removed = session.staging_mut().remove_candidate(id)?;
    let mut result = CmdResult::default();
    result.add_message(CmdMessage::info(format!(
        "Discarded {} {}",
        removed.date, removed.range
    )));
    result.staged = session.staging().candidates().to_vec();
    Ok(result)
}

pub fn discard_all(session: &mut EditSession) -> CmdResult {
    let count = session.staging().candidates().len();
    session.staging_mut().clear_all();
    let mut result = CmdResult::default();
    result.add_message(CmdMessage::info(format!("Discarded {} pending blocks", count)));
    result
}
