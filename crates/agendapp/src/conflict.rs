//! Overlap tests shared by staging and reconciliation.
//!
//! Intervals are half-open, so blocks that only touch do not conflict. Blackout
//! conflicts are always looked for, and reported, before block-block ones.
//! Checks are pairwise; a day holds tens of blocks at most.

use crate::error::{AgendaError, Result};
use crate::model::{BlockId, MaterializedEvent, Provenance};

/// Same date, intersecting ranges, different identity.
pub fn overlaps(a: &MaterializedEvent, b: &MaterializedEvent) -> bool {
    a.id != b.id && a.date == b.date && a.range.overlaps(&b.range)
}

pub fn blackout_conflict<'a>(
    candidate: &MaterializedEvent,
    events: &'a [MaterializedEvent],
) -> Option<&'a MaterializedEvent> {
    events
        .iter()
        .find(|e| e.provenance == Provenance::Blackout && overlaps(candidate, e))
}

/// First overlapping non-blackout event, skipping `exclude` (the block being moved).
pub fn block_conflict<'a>(
    candidate: &MaterializedEvent,
    events: &'a [MaterializedEvent],
    exclude: Option<&BlockId>,
) -> Option<&'a MaterializedEvent> {
    events.iter().find(|e| {
        e.provenance != Provenance::Blackout
            && Some(&e.id) != exclude
            && overlaps(candidate, e)
    })
}

/// Rejects `candidate` on the first conflict, blackouts first.
pub fn check(
    candidate: &MaterializedEvent,
    events: &[MaterializedEvent],
    exclude: Option<&BlockId>,
) -> Result<()> {
    if let Some(blackout) = blackout_conflict(candidate, events) {
        tracing::debug!(candidate = %candidate.id, blackout = %blackout.id, "blackout conflict");
        return Err(AgendaError::BlackoutConflict {
            label: blackout.label.clone(),
            date: blackout.date,
            range: blackout.range,
        });
    }
    if let Some(block) = block_conflict(candidate, events, exclude) {
        tracing::debug!(candidate = %candidate.id, block = %block.id, "block overlap");
        return Err(AgendaError::BlockOverlap {
            id: block.id.clone(),
            date: block.date,
            range: block.range,
        });
    }
    Ok(())
}

/// The first pair of availability events that overlap, if any.
pub fn overlapping_pair(
    events: &[MaterializedEvent],
) -> Option<(&MaterializedEvent, &MaterializedEvent)> {
    let availability: Vec<_> = events.iter().filter(|e| e.is_availability()).collect();
    availability.iter().enumerate().find_map(|(i, a)| {
        availability[i + 1..]
            .iter()
            .find(|b| overlaps(a, b))
            .map(|b| (*a, *b))
    })
}
