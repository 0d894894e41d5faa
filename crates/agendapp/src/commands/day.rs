use crate::blackout::BlackoutSource;
use crate::commands::{CmdMessage, CmdResult};
use crate::error::Result;
use crate::projector::{DaySource, DayView};
use crate::store::backend::ScheduleBackend;
use crate::store::ScheduleStore;
use chrono::NaiveDate;

pub fn run<B: ScheduleBackend, S: BlackoutSource>(
    store: &ScheduleStore<B>,
    source: &S,
    owner: &str,
    date: NaiveDate,
) -> Result<CmdResult> {
    let document = store.load(owner)?;
    let blackouts = source.list_blackouts(owner, date, date)?;
    let view = DayView::resolve(&document, date, &blackouts);

    let mut result = CmdResult::default();
    match view.source {
        DaySource::Override => {
            result.add_message(CmdMessage::info("Date-specific schedule replaces the weekly template"))
        }
        DaySource::Template => result.add_message(CmdMessage::info("Weekly template applies")),
        DaySource::None => result.add_message(CmdMessage::info("No availability")),
    }
    if let Some(blocked) = view.blackouts.first() {
        result.add_message(CmdMessage::warning(format!(
            "Blocked {}: {}",
            blocked.range, blocked.label
        )));
    }
    result.day = Some(view);
    Ok(result)
}
