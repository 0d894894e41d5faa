//! # The Schedule Document
//!
//! A practitioner's availability is one document with two maps:
//!
//! - **template**: weekday → blocks, recurring every week indefinitely.
//! - **overrides**: date → blocks, applying to that exact date only.
//!
//! The document is the single source of truth. Projections are computed from it
//! and edits come back to it; nothing else is ever persisted.
//!
//! ## Canonical Form
//!
//! Every block list is sorted by start and free of duplicates; a key with no
//! blocks is not stored at all. On the wire both maps share one object, keyed by
//! weekday digit or ISO date, which is how the clinic backend stores schedules:
//!
//! ```json
//! {
//!   "revision": 4,
//!   "schedule": {
//!     "1": [{ "start": "08:00", "end": "12:00" }],
//!     "2024-05-06": [{ "start": "09:00", "end": "11:00" }]
//!   }
//! }
//! ```
//!
//! Loading rejects overlapping blocks under one key, so a document read from
//! storage always satisfies the no-overlap invariant.
//!
//! ## Revision
//!
//! `revision` is the optimistic concurrency token. It is bumped by the store on
//! every successful save and compared against the persisted value before writing.

use crate::error::{AgendaError, Result};
use crate::model::{parse_date, BlockId, DayOfWeek, TimeRange, Week, DATE_FORMAT};
use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawDocument", into = "RawDocument")]
pub struct ScheduleDocument {
    pub revision: u64,
    template: BTreeMap<DayOfWeek, Vec<TimeRange>>,
    overrides: BTreeMap<NaiveDate, Vec<TimeRange>>,
}

#[derive(Serialize, Deserialize)]
struct RawDocument {
    #[serde(default)]
    revision: u64,
    #[serde(default)]
    schedule: BTreeMap<String, Vec<TimeRange>>,
}

#[derive(Clone, Copy)]
enum ScheduleKey {
    Weekday(DayOfWeek),
    Date(NaiveDate),
}

fn parse_key(key: &str) -> Result<ScheduleKey> {
    if key.len() == 1 {
        let index: u8 = key
            .parse()
            .map_err(|_| AgendaError::InvalidScheduleKey(key.to_string()))?;
        return Ok(ScheduleKey::Weekday(DayOfWeek::new(index)?));
    }
    parse_date(key)
        .map(ScheduleKey::Date)
        .map_err(|_| AgendaError::InvalidScheduleKey(key.to_string()))
}

impl TryFrom<RawDocument> for ScheduleDocument {
    type Error = AgendaError;

    fn try_from(raw: RawDocument) -> Result<Self> {
        let mut doc = ScheduleDocument {
            revision: raw.revision,
            ..Default::default()
        };
        for (key, blocks) in raw.schedule {
            let parsed = parse_key(&key)?;
            for range in blocks {
                match parsed {
                    ScheduleKey::Weekday(weekday) => {
                        ensure_disjoint(&key, doc.template_blocks(weekday), &range)?;
                        doc.upsert_template(weekday, range);
                    }
                    ScheduleKey::Date(date) => {
                        ensure_disjoint(&key, doc.override_blocks(date), &range)?;
                        doc.upsert_override(date, range);
                    }
                }
            }
        }
        Ok(doc)
    }
}

/// Exact duplicates are tolerated (they collapse on insert); partial overlaps are not.
fn ensure_disjoint(key: &str, existing: &[TimeRange], range: &TimeRange) -> Result<()> {
    match existing.iter().find(|r| *r != range && r.overlaps(range)) {
        Some(other) => Err(AgendaError::Store(format!(
            "schedule key {} holds overlapping blocks {} and {}",
            key, other, range
        ))),
        None => Ok(()),
    }
}

impl From<ScheduleDocument> for RawDocument {
    fn from(doc: ScheduleDocument) -> Self {
        let mut schedule = BTreeMap::new();
        for (weekday, blocks) in doc.template {
            schedule.insert(weekday.to_string(), blocks);
        }
        for (date, blocks) in doc.overrides {
            schedule.insert(date.format(DATE_FORMAT).to_string(), blocks);
        }
        RawDocument {
            revision: doc.revision,
            schedule,
        }
    }
}

fn insert_sorted(blocks: &mut Vec<TimeRange>, range: TimeRange) -> bool {
    match blocks.binary_search(&range) {
        Ok(_) => false,
        Err(pos) => {
            blocks.insert(pos, range);
            true
        }
    }
}

impl ScheduleDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.template.is_empty() && self.overrides.is_empty()
    }

    pub fn template_blocks(&self, weekday: DayOfWeek) -> &[TimeRange] {
        self.template.get(&weekday).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn override_blocks(&self, date: NaiveDate) -> &[TimeRange] {
        self.overrides.get(&date).map(Vec::as_slice).unwrap_or(&[])
    }

    /// True when `date` is shadowed: its own blocks replace the weekday template.
    pub fn has_overrides(&self, date: NaiveDate) -> bool {
        self.overrides.contains_key(&date)
    }

    /// First date on or after `from` where the `weekday` rule shows, skipping
    /// dates shadowed by overrides.
    pub fn next_unshadowed(&self, weekday: DayOfWeek, from: NaiveDate) -> Option<NaiveDate> {
        let ahead = (7 + weekday.index() - DayOfWeek::from_date(from).index()) % 7;
        let mut date = from.checked_add_days(Days::new(ahead.into()))?;
        while self.has_overrides(date) {
            date = date.checked_add_days(Days::new(7))?;
        }
        Some(date)
    }

    pub fn template(&self) -> impl Iterator<Item = (DayOfWeek, &[TimeRange])> {
        self.template.iter().map(|(k, v)| (*k, v.as_slice()))
    }

    pub fn overrides(&self) -> impl Iterator<Item = (NaiveDate, &[TimeRange])> {
        self.overrides.iter().map(|(k, v)| (*k, v.as_slice()))
    }

    /// Insert a weekday rule. Re-inserting an existing block is a no-op.
    pub fn upsert_template(&mut self, weekday: DayOfWeek, range: TimeRange) -> BlockId {
        insert_sorted(self.template.entry(weekday).or_default(), range);
        BlockId::Template { weekday, range }
    }

    /// Insert a rule for one date. Re-inserting an existing block is a no-op.
    pub fn upsert_override(&mut self, date: NaiveDate, range: TimeRange) -> BlockId {
        insert_sorted(self.overrides.entry(date).or_default(), range);
        BlockId::Override { date, range }
    }

    pub fn contains(&self, id: &BlockId) -> bool {
        match id {
            BlockId::Template { weekday, range } => {
                self.template_blocks(*weekday).binary_search(range).is_ok()
            }
            BlockId::Override { date, range } => {
                self.override_blocks(*date).binary_search(range).is_ok()
            }
            BlockId::Draft(_) | BlockId::Blackout { .. } => false,
        }
    }

    /// Remove a block, with scope decided by the id's namespace: a template id
    /// drops the rule from every week, an override id only from its date. Removing
    /// the last override of a date lets the template show there again.
    pub fn remove(&mut self, id: &BlockId) -> Result<()> {
        let removed = match id {
            BlockId::Template { weekday, range } => remove_from(&mut self.template, weekday, range),
            BlockId::Override { date, range } => remove_from(&mut self.overrides, date, range),
            BlockId::Draft(_) | BlockId::Blackout { .. } => {
                return Err(AgendaError::ReadOnlyEvent(id.clone()))
            }
        };
        if removed {
            Ok(())
        } else {
            Err(AgendaError::BlockNotFound(id.clone()))
        }
    }

    /// The part of the schedule visible in `week`: overrides dated inside it, and
    /// the template rules of every weekday that is not shadowed there.
    pub fn restrict_to(&self, week: &Week) -> ScheduleDocument {
        let mut visible = ScheduleDocument::new();
        for date in week.dates() {
            if self.has_overrides(date) {
                for range in self.override_blocks(date) {
                    visible.upsert_override(date, *range);
                }
            } else {
                let weekday = DayOfWeek::from_date(date);
                for range in self.template_blocks(weekday) {
                    visible.upsert_template(weekday, *range);
                }
            }
        }
        visible
    }

    /// Same blocks, ignoring revision.
    pub fn same_partition(&self, other: &ScheduleDocument) -> bool {
        self.template == other.template && self.overrides == other.overrides
    }
}

fn remove_from<K: Ord + Copy>(
    map: &mut BTreeMap<K, Vec<TimeRange>>,
    key: &K,
    range: &TimeRange,
) -> bool {
    let Some(blocks) = map.get_mut(key) else {
        return false;
    };
    let Ok(pos) = blocks.binary_search(range) else {
        return false;
    };
    blocks.remove(pos);
    if blocks.is_empty() {
        map.remove(key);
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::WeekStart;

    fn date(s: &str) -> NaiveDate {
        parse_date(s).unwrap()
    }

    fn range(s: &str) -> TimeRange {
        s.parse().unwrap()
    }

    fn monday() -> DayOfWeek {
        DayOfWeek::new(1).unwrap()
    }

    #[test]
    fn upsert_keeps_blocks_sorted_and_unique() {
        let mut doc = ScheduleDocument::new();
        doc.upsert_template(monday(), range("14:00-16:00"));
        doc.upsert_template(monday(), range("08:00-12:00"));
        doc.upsert_template(monday(), range("14:00-16:00"));
        assert_eq!(
            doc.template_blocks(monday()),
            &[range("08:00-12:00"), range("14:00-16:00")]
        );
    }

    #[test]
    fn remove_template_drops_weekday_rule() {
        let mut doc = ScheduleDocument::new();
        let id = doc.upsert_template(monday(), range("08:00-12:00"));
        doc.remove(&id).unwrap();
        assert!(doc.template_blocks(monday()).is_empty());
        assert!(doc.is_empty());
        assert!(matches!(
            doc.remove(&id),
            Err(AgendaError::BlockNotFound(_))
        ));
    }

    #[test]
    fn removing_last_override_unshadows_the_date() {
        let mut doc = ScheduleDocument::new();
        let id = doc.upsert_override(date("2024-05-06"), range("09:00-11:00"));
        assert!(doc.has_overrides(date("2024-05-06")));
        doc.remove(&id).unwrap();
        assert!(!doc.has_overrides(date("2024-05-06")));
    }

    #[test]
    fn remove_rejects_non_schedule_ids() {
        let mut doc = ScheduleDocument::new();
        let id: BlockId = "blk/leave-1/2024-05-06".parse().unwrap();
        assert!(matches!(doc.remove(&id), Err(AgendaError::ReadOnlyEvent(_))));
    }

    #[test]
    fn serializes_to_single_keyed_map() {
        let mut doc = ScheduleDocument::new();
        doc.revision = 2;
        doc.upsert_template(monday(), range("08:00-12:00"));
        doc.upsert_override(date("2024-05-06"), range("09:00-11:00"));

        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["revision"], 2);
        assert_eq!(json["schedule"]["1"][0]["start"], "08:00");
        assert_eq!(json["schedule"]["2024-05-06"][0]["end"], "11:00");

        let back: ScheduleDocument = serde_json::from_value(json).unwrap();
        assert_eq!(back, doc);
    }

    #[test]
    fn loads_legacy_unsorted_schedule() {
        let json = r#"{"schedule": {"3": [{"inicio": "14:00", "fin": "18:00"}, {"inicio": "08:00", "fin": "12:00"}]}}"#;
        let doc: ScheduleDocument = serde_json::from_str(json).unwrap();
        let wednesday = DayOfWeek::new(3).unwrap();
        assert_eq!(
            doc.template_blocks(wednesday),
            &[range("08:00-12:00"), range("14:00-18:00")]
        );
        assert_eq!(doc.revision, 0);
    }

    #[test]
    fn rejects_bad_keys_and_overlaps_on_load() {
        assert!(serde_json::from_str::<ScheduleDocument>(
            r#"{"schedule": {"7": [{"start": "08:00", "end": "09:00"}]}}"#
        )
        .is_err());
        assert!(serde_json::from_str::<ScheduleDocument>(
            r#"{"schedule": {"monday": [{"start": "08:00", "end": "09:00"}]}}"#
        )
        .is_err());
        assert!(serde_json::from_str::<ScheduleDocument>(
            r#"{"schedule": {"1": [{"start": "08:00", "end": "10:00"}, {"start": "09:00", "end": "11:00"}]}}"#
        )
        .is_err());
        assert!(serde_json::from_str::<ScheduleDocument>(
            r#"{"schedule": {"1": [{"start": "10:00", "end": "09:00"}]}}"#
        )
        .is_err());
    }

    #[test]
    fn empty_lists_are_not_kept() {
        let doc: ScheduleDocument =
            serde_json::from_str(r#"{"schedule": {"1": [], "2024-05-06": []}}"#).unwrap();
        assert!(doc.is_empty());
        assert!(!doc.has_overrides(date("2024-05-06")));
    }

    #[test]
    fn restriction_hides_shadowed_weekdays_and_foreign_dates() {
        let mut doc = ScheduleDocument::new();
        doc.upsert_template(monday(), range("08:00-12:00"));
        doc.upsert_template(DayOfWeek::new(2).unwrap(), range("08:00-12:00"));
        doc.upsert_override(date("2024-05-06"), range("09:00-11:00"));
        doc.upsert_override(date("2024-06-01"), range("09:00-11:00"));

        let week = Week::containing(date("2024-05-06"), WeekStart::Sunday);
        let visible = doc.restrict_to(&week);

        assert!(visible.template_blocks(monday()).is_empty());
        assert_eq!(visible.template_blocks(DayOfWeek::new(2).unwrap()).len(), 1);
        assert!(visible.has_overrides(date("2024-05-06")));
        assert!(!visible.has_overrides(date("2024-06-01")));
    }

    #[test]
    fn next_unshadowed_skips_overridden_dates() {
        let mut doc = ScheduleDocument::new();
        doc.upsert_template(monday(), range("08:00-12:00"));
        assert_eq!(
            doc.next_unshadowed(monday(), date("2024-05-08")),
            Some(date("2024-05-13"))
        );

        doc.upsert_override(date("2024-05-13"), range("10:00-11:00"));
        doc.upsert_override(date("2024-05-20"), range("10:00-11:00"));
        assert_eq!(
            doc.next_unshadowed(monday(), date("2024-05-13")),
            Some(date("2024-05-27"))
        );
        assert_eq!(
            doc.next_unshadowed(monday(), date("2024-05-06")),
            Some(date("2024-05-06"))
        );
    }
}
