//! Per-block lifecycle.
//!
//! ```text
//! Draft ──commit──▶ Committed(scope) ──move/resize──▶ Moved/Resized(scope) ─┐
//!                        │                                 ▲    │            │
//!                        │                                 └────┘            │
//!                        └───────────────delete──────────────────────▶ Deleted
//! ```
//!
//! `Deleted` is terminal. A draft is only ever committed; discarding it from the
//! staging area is not a block transition.

use crate::error::{AgendaError, Result};
use crate::model::CommitMode;
use serde::Serialize;
use std::fmt;

/// Which map of the schedule a committed block lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockScope {
    Template,
    Override,
}

impl From<CommitMode> for BlockScope {
    fn from(mode: CommitMode) -> Self {
        match mode {
            CommitMode::WeeklyTemplate => BlockScope::Template,
            CommitMode::SpecificDate => BlockScope::Override,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "scope", rename_all = "lowercase")]
pub enum BlockState {
    Draft,
    Committed(BlockScope),
    Moved(BlockScope),
    Resized(BlockScope),
    Deleted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Commit(BlockScope),
    Move,
    Resize,
    Delete,
}

impl BlockState {
    pub fn scope(&self) -> Option<BlockScope> {
        match self {
            BlockState::Committed(scope) | BlockState::Moved(scope) | BlockState::Resized(scope) => {
                Some(*scope)
            }
            BlockState::Draft | BlockState::Deleted => None,
        }
    }

    pub fn apply(self, transition: Transition) -> Result<BlockState> {
        let next = match (self, transition) {
            (BlockState::Draft, Transition::Commit(scope)) => Some(BlockState::Committed(scope)),
            (BlockState::Deleted, _) | (BlockState::Draft, _) | (_, Transition::Commit(_)) => None,
            (state, Transition::Move) => state.scope().map(BlockState::Moved),
            (state, Transition::Resize) => state.scope().map(BlockState::Resized),
            (_, Transition::Delete) => Some(BlockState::Deleted),
        };
        next.ok_or(AgendaError::InvalidTransition {
            state: self,
            transition,
        })
    }
}

impl fmt::Display for BlockScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockScope::Template => write!(f, "template"),
            BlockScope::Override => write!(f, "override"),
        }
    }
}

impl fmt::Display for BlockState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockState::Draft => write!(f, "a draft"),
            BlockState::Committed(scope) => write!(f, "committed ({})", scope),
            BlockState::Moved(scope) => write!(f, "moved ({})", scope),
            BlockState::Resized(scope) => write!(f, "resized ({})", scope),
            BlockState::Deleted => write!(f, "deleted"),
        }
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transition::Commit(_) => write!(f, "commit"),
            Transition::Move => write!(f, "move"),
            Transition::Resize => write!(f, "resize"),
            Transition::Delete => write!(f, "delete"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draft_commits_into_scope() {
        let state = BlockState::Draft
            .apply(Transition::Commit(BlockScope::Override))
            .unwrap();
        assert_eq!(state, BlockState::Committed(BlockScope::Override));
    }

    #[test]
    fn committed_block_can_move_resize_and_delete() {
        let committed = BlockState::Committed(BlockScope::Template);
        let moved = committed.apply(Transition::Move).unwrap();
        assert_eq!(moved, BlockState::Moved(BlockScope::Template));
        let resized = moved.apply(Transition::Resize).unwrap();
        assert_eq!(resized, BlockState::Resized(BlockScope::Template));
        assert_eq!(
            resized.apply(Transition::Move).unwrap(),
            BlockState::Moved(BlockScope::Template)
        );
        assert_eq!(
            resized.apply(Transition::Delete).unwrap(),
            BlockState::Deleted
        );
    }

    #[test]
    fn deleted_is_terminal() {
        for transition in [
            Transition::Move,
            Transition::Resize,
            Transition::Delete,
            Transition::Commit(BlockScope::Template),
        ] {
            assert!(matches!(
                BlockState::Deleted.apply(transition),
                Err(AgendaError::InvalidTransition { .. })
            ));
        }
    }

    #[test]
    fn drafts_cannot_skip_commit() {
        assert!(BlockState::Draft.apply(Transition::Move).is_err());
        assert!(BlockState::Draft.apply(Transition::Delete).is_err());
    }

    #[test]
    fn committed_blocks_cannot_be_recommitted() {
        let committed = BlockState::Committed(BlockScope::Override);
        assert!(committed
            .apply(Transition::Commit(BlockScope::Template))
            .is_err());
    }
}
