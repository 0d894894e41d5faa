use crate::commands::{CmdMessage, CmdResult};
use crate::error::Result;
use crate::store::backend::ScheduleBackend;
use crate::store::ScheduleStore;

pub fn run<B: ScheduleBackend>(store: &ScheduleStore<B>, owner: &str) -> Result<CmdResult> {
    let document = store.load(owner)?;
    let mut result = CmdResult::default();
    if document.is_empty() {
        result.add_message(CmdMessage::info(format!("No schedule stored for {}", owner)));
    }
    result.document = Some(document);
    Ok(result)
}
