use crate::blackout::BlackoutSource;
use crate::commands::{refresh_blackouts, CmdMessage, CmdResult};
use crate::error::Result;
use crate::session::EditSession;
use crate::store::backend::ScheduleBackend;
use crate::store::ScheduleStore;

pub fn run<B: ScheduleBackend, S: BlackoutSource>(
    store: &ScheduleStore<B>,
    source: &S,
    session: &mut EditSession,
) -> Result<CmdResult> {
    let document = store.load(session.owner())?;
    refresh_blackouts(source, session, &[])?;
    let events = session.project(&document)?;

    let mut result = CmdResult::default();
    if events.is_empty() {
        result.add_message(CmdMessage::info(format!(
            "No availability in week {}",
            session.week()
        )));
    }
    Ok(result.with_listed_events(session.week(), events))
}
