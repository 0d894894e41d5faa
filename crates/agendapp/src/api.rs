//! # API Facade
//!
//! The API layer is a **thin facade** over the command layer and the single
//! entry point for clients.
//!
//! It:
//! - **Dispatches** to the matching `commands::*::run`
//! - **Normalizes inputs**: block ids, `DATE@HH:MM-HH:MM` slots and
//!   `DATE@HH:MM` targets arrive as text and are parsed here
//! - **Returns structured types** (`Result<CmdResult>`)
//!
//! Business rules stay in `commands/` and the algorithm modules.
//!
//! ## Generic Over Storage
//!
//! `AgendaApi<B, S>` is generic over the schedule backend and the blackout
//! source:
//! - Production: `AgendaApi<FsBackend, FsBlackouts>`
//! - Testing: `AgendaApi<MemBackend, MemBlackouts>`

use crate::blackout::BlackoutSource;
use crate::commands::{self, CmdResult};
use crate::config::AgendaConfig;
use crate::error::{AgendaError, Result};
use crate::model::{parse_date, BlockId, CommitMode, TimeOfDay, TimeRange};
use crate::reconcile::Mutation;
use crate::session::EditSession;
use crate::store::backend::ScheduleBackend;
use crate::store::ScheduleStore;
use chrono::NaiveDate;
use uuid::Uuid;

pub struct AgendaApi<B: ScheduleBackend, S: BlackoutSource> {
    store: ScheduleStore<B>,
    blackouts: S,
    config: AgendaConfig,
}

impl<B: ScheduleBackend, S: BlackoutSource> AgendaApi<B, S> {
    pub fn new(store: ScheduleStore<B>, blackouts: S, config: AgendaConfig) -> Self {
        Self {
            store,
            blackouts,
            config,
        }
    }

    /// A date whose week shows block `id`: an override's own date, or the next
    /// date on or after `from` where a template rule is not shadowed.
    pub fn anchor_for(&self, owner: &str, id: &str, from: NaiveDate) -> Result<NaiveDate> {
        match id.parse::<BlockId>()? {
            BlockId::Override { date, .. } => Ok(date),
            BlockId::Template { weekday, .. } => Ok(self
                .store
                .load(owner)?
                .next_unshadowed(weekday, from)
                .unwrap_or(from)),
            BlockId::Draft(_) | BlockId::Blackout { .. } => Ok(from),
        }
    }

    /// A fresh session on the week containing `anchor`.
    pub fn open_session(&self, owner: &str, anchor: NaiveDate) -> Result<EditSession> {
        Ok(EditSession::new(
            owner,
            anchor,
            self.config.week_starts_on,
            self.config.operating_hours()?,
        ))
    }

    pub fn week(&self, session: &mut EditSession) -> Result<CmdResult> {
        commands::week::run(&self.store, &self.blackouts, session)
    }

    pub fn day(&self, owner: &str, date: &str) -> Result<CmdResult> {
        commands::day::run(&self.store, &self.blackouts, owner, parse_date(date)?)
    }

    pub fn stage(&self, session: &mut EditSession, slot: &str) -> Result<CmdResult> {
        let (date, range) = parse_slot(slot)?;
        commands::stage::run(&self.store, &self.blackouts, session, date, range)
    }

    pub fn discard(&self, session: &mut EditSession, draft: &str) -> Result<CmdResult> {
        let id = match draft.parse::<BlockId>() {
            Ok(BlockId::Draft(id)) => id,
            _ => Uuid::parse_str(draft).map_err(|_| AgendaError::InvalidBlockId(draft.to_string()))?,
        };
        commands::stage::discard(session, id)
    }

    pub fn commit(&self, session: &mut EditSession, mode: CommitMode) -> Result<CmdResult> {
        commands::commit::run(&self.store, &self.blackouts, session, mode)
    }

    /// Stage every slot in order, then commit them as one batch. The first
    /// rejected slot aborts the whole call and nothing is written.
    pub fn add_blocks<I: AsRef<str>>(
        &self,
        session: &mut EditSession,
        slots: &[I],
        mode: CommitMode,
    ) -> Result<CmdResult> {
        for slot in slots {
            if let Err(e) = self.stage(session, slot.as_ref()) {
                commands::stage::discard_all(session);
                return Err(e);
            }
        }
        self.commit(session, mode)
    }

    pub fn move_block(&self, session: &mut EditSession, id: &str, target: &str) -> Result<CmdResult> {
        let (date, start) = parse_target(target)?;
        self.mutate(session, id, Mutation::Move { date, start })
    }

    pub fn resize_block(&self, session: &mut EditSession, id: &str, range: &str) -> Result<CmdResult> {
        let range: TimeRange = range.parse()?;
        self.mutate(session, id, Mutation::Resize { range })
    }

    pub fn delete_block(&self, session: &mut EditSession, id: &str) -> Result<CmdResult> {
        self.mutate(session, id, Mutation::Delete)
    }

    pub fn show(&self, owner: &str) -> Result<CmdResult> {
        commands::show::run(&self.store, owner)
    }

    fn mutate(&self, session: &mut EditSession, id: &str, mutation: Mutation) -> Result<CmdResult> {
        let id: BlockId = id.parse()?;
        commands::mutate::run(&self.store, &self.blackouts, session, &id, mutation)
    }
}

/// `2024-05-06@08:00-12:00`
pub fn parse_slot(s: &str) -> Result<(NaiveDate, TimeRange)> {
    let (date, range) = s
        .split_once('@')
        .ok_or_else(|| AgendaError::InvalidTime(format!("'{}' is not a DATE@HH:MM-HH:MM slot", s)))?;
    Ok((parse_date(date)?, range.parse()?))
}

/// `2024-05-06@08:00`
pub fn parse_target(s: &str) -> Result<(NaiveDate, TimeOfDay)> {
    let (date, start) = s
        .split_once('@')
        .ok_or_else(|| AgendaError::InvalidTime(format!("'{}' is not a DATE@HH:MM target", s)))?;
    Ok((parse_date(date)?, start.parse()?))
}
