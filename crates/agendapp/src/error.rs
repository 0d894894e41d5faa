use crate::lifecycle::{BlockState, Transition};
use crate::model::{BlockId, TimeOfDay, TimeRange};
use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AgendaError {
    #[error("Invalid time: {0}")]
    InvalidTime(String),

    #[error("Invalid range {start}-{end}: {reason}")]
    InvalidRange {
        start: TimeOfDay,
        end: TimeOfDay,
        reason: String,
    },

    #[error("Invalid weekday {0}: expected 0 (Sunday) through 6 (Saturday)")]
    InvalidWeekday(u8),

    #[error("Blocked by \"{label}\" on {date} {range}")]
    BlackoutConflict {
        label: String,
        date: NaiveDate,
        range: TimeRange,
    },

    #[error("Overlaps block {id} on {date} {range}")]
    BlockOverlap {
        id: BlockId,
        date: NaiveDate,
        range: TimeRange,
    },

    /// The stored schedule moved on since the caller's snapshot or staging.
    /// `conflict` holds the rejection found during re-validation, if any.
    #[error("Stale state for {subject}: {reason}")]
    StaleState {
        subject: String,
        reason: String,
        conflict: Option<Box<AgendaError>>,
    },

    #[error("Block not found: {0}")]
    BlockNotFound(BlockId),

    #[error("Invalid block id: {0}")]
    InvalidBlockId(String),

    #[error("Invalid schedule key: {0}")]
    InvalidScheduleKey(String),

    #[error("Cannot {transition} a block that is {state}")]
    InvalidTransition {
        state: BlockState,
        transition: Transition,
    },

    #[error("Event {0} is read-only")]
    ReadOnlyEvent(BlockId),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Store error: {0}")]
    Store(String),
}

impl AgendaError {
    pub fn stale(subject: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::StaleState {
            subject: subject.into(),
            reason: reason.into(),
            conflict: None,
        }
    }

    /// The interval a caller has to fix, for rejections that carry one.
    pub fn conflicting_interval(&self) -> Option<(NaiveDate, TimeRange)> {
        match self {
            Self::BlackoutConflict { date, range, .. } | Self::BlockOverlap { date, range, .. } => {
                Some((*date, *range))
            }
            Self::StaleState {
                conflict: Some(inner),
                ..
            } => inner.conflicting_interval(),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, AgendaError>;
