//! # Command Layer
//!
//! Each user operation lives in its own submodule as a plain `run` function
//! over the store, the blackout source and (for editing) an [`EditSession`].
//!
//! Commands:
//! - load the schedule and fetch blackouts fresh every time, so every check
//!   runs against the latest persisted state;
//! - return a structured [`CmdResult`] with events, affected blocks and
//!   messages, never strings meant for a terminal;
//! - leave argument parsing, rendering and exit codes to the client.
//!
//! Tests here use [`MemBackend`](crate::store::mem_backend::MemBackend) and
//! [`MemBlackouts`](crate::blackout::MemBlackouts).
//!
//! ## Command Modules
//!
//! - [`week`]: Project the selected week
//! - [`day`]: Effective availability of one date
//! - [`stage`]: Stage or discard candidate blocks
//! - [`commit`]: Commit the staged batch
//! - [`mutate`]: Move, resize or delete an existing block
//! - [`show`]: The canonical document

use crate::blackout::BlackoutSource;
use crate::document::ScheduleDocument;
use crate::error::Result;
use crate::lifecycle::BlockState;
use crate::model::{BlockId, CandidateBlock, MaterializedEvent, Week};
use crate::projector::DayView;
use crate::session::EditSession;
use chrono::NaiveDate;
use serde::Serialize;

pub mod commit;
pub mod day;
pub mod mutate;
pub mod show;
pub mod stage;
pub mod week;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, Serialize)]
pub struct CmdMessage {
    pub level: MessageLevel,
    pub content: String,
}

impl CmdMessage {
    pub fn info(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Info,
            content: content.into(),
        }
    }

    pub fn success(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Success,
            content: content.into(),
        }
    }

    pub fn warning(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Warning,
            content: content.into(),
        }
    }
}

/// A block touched by a command, with the state it ended up in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AffectedBlock {
    pub id: BlockId,
    pub state: BlockState,
}

#[derive(Debug, Default)]
pub struct CmdResult {
    pub week: Option<Week>,
    pub listed_events: Vec<MaterializedEvent>,
    pub affected_blocks: Vec<AffectedBlock>,
    pub staged: Vec<CandidateBlock>,
    pub day: Option<DayView>,
    pub document: Option<ScheduleDocument>,
    pub messages: Vec<CmdMessage>,
}

impl CmdResult {
    pub fn add_message(&mut self, message: CmdMessage) {
        self.messages.push(message);
    }

    pub fn with_listed_events(mut self, week: Week, events: Vec<MaterializedEvent>) -> Self {
        self.week = Some(week);
        self.listed_events = events;
        self
    }

    pub fn with_affected_blocks(mut self, blocks: Vec<AffectedBlock>) -> Self {
        self.affected_blocks = blocks;
        self
    }
}

/// Fetch blackouts for the session's week, widened to cover every date in
/// `also` when an edit or a staged batch reaches outside it.
pub(crate) fn refresh_blackouts<S: BlackoutSource>(
    source: &S,
    session: &mut EditSession,
    also: &[NaiveDate],
) -> Result<()> {
    let ticket = session.begin_fetch();
    let (mut from, mut to) = ticket.range();
    for date in also {
        from = from.min(*date);
        to = to.max(*date);
    }
    let intervals = source.list_blackouts(session.owner(), from, to)?;
    session.accept_blackouts(ticket, intervals);
    Ok(())
}
