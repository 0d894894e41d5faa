//! # Domain Model: Times, Weeks, Block Identity and Events
//!
//! This module defines the value types every other layer speaks in. Nothing here
//! touches storage; the schedule document itself lives in [`crate::document`].
//!
//! ## Time of Day and Ranges
//!
//! Availability is expressed in whole minutes since midnight ([`TimeOfDay`]),
//! written `HH:MM`. `24:00` exists so a full-day blackout can be expressed as the
//! half-open range `00:00-24:00`.
//!
//! A [`TimeRange`] is always half-open (`[start, end)`) and can only be built
//! with `start < end`. Two ranges that merely touch (`08:00-10:00` and
//! `10:00-12:00`) do not overlap.
//!
//! ## Weekdays and Weeks
//!
//! Weekdays are numbered `0` (Sunday) through `6` (Saturday), the numbering the
//! stored schedules use as map keys. A [`Week`] is seven consecutive dates
//! starting on the configured [`WeekStart`]; the start date doubles as the week key.
//!
//! ## Block Identity
//!
//! Block ids are derived from where a block lives in the canonical document, so
//! the same block gets the same id on every projection:
//!
//! ```text
//! tpl/1/08:00-12:00              weekday template block (Monday)
//! ovr/2024-05-06/09:00-11:00     date override block
//! draft/<uuid>                   staged candidate, not yet committed
//! blk/<blackout-id>/2024-05-06   one day of an external blackout
//! ```
//!
//! The namespace prefix is what resolves provenance for removal and mutation.

use crate::error::{AgendaError, Result};
use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

pub const MINUTES_PER_DAY: u16 = 24 * 60;

/// Label given to availability events when rendered.
pub const AVAILABLE_LABEL: &str = "Available";

pub(crate) const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
        .map_err(|_| AgendaError::InvalidTime(format!("'{}' is not a YYYY-MM-DD date", s)))
}

/// Minutes since midnight, `00:00 ..= 24:00`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeOfDay(u16);

impl TimeOfDay {
    pub const MIDNIGHT: TimeOfDay = TimeOfDay(0);
    pub const END_OF_DAY: TimeOfDay = TimeOfDay(MINUTES_PER_DAY);

    pub fn from_hm(hours: u16, minutes: u16) -> Result<Self> {
        if minutes >= 60 || hours > 24 || hours * 60 + minutes > MINUTES_PER_DAY {
            return Err(AgendaError::InvalidTime(format!(
                "{:02}:{:02} is not a time of day",
                hours, minutes
            )));
        }
        Ok(Self(hours * 60 + minutes))
    }

    pub fn from_minutes(minutes: u16) -> Result<Self> {
        if minutes > MINUTES_PER_DAY {
            return Err(AgendaError::InvalidTime(format!(
                "{} minutes is past the end of the day",
                minutes
            )));
        }
        Ok(Self(minutes))
    }

    pub fn minutes(self) -> u16 {
        self.0
    }

    /// Shift by a signed number of minutes, staying within the day.
    pub fn checked_add_minutes(self, delta: i32) -> Option<Self> {
        let shifted = i32::from(self.0) + delta;
        if (0..=i32::from(MINUTES_PER_DAY)).contains(&shifted) {
            Some(Self(shifted as u16))
        } else {
            None
        }
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.0 / 60, self.0 % 60)
    }
}

impl FromStr for TimeOfDay {
    type Err = AgendaError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || AgendaError::InvalidTime(format!("'{}' is not an HH:MM time", s));
        let (h, m) = s.trim().split_once(':').ok_or_else(invalid)?;
        if m.len() != 2 {
            return Err(invalid());
        }
        let hours: u16 = h.parse().map_err(|_| invalid())?;
        let minutes: u16 = m.parse().map_err(|_| invalid())?;
        Self::from_hm(hours, minutes)
    }
}

impl TryFrom<String> for TimeOfDay {
    type Error = AgendaError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<TimeOfDay> for String {
    fn from(value: TimeOfDay) -> Self {
        value.to_string()
    }
}

/// Half-open interval `[start, end)` within one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawRange")]
pub struct TimeRange {
    start: TimeOfDay,
    end: TimeOfDay,
}

/// Wire shape of a range. `inicio`/`fin` are the field names older clinic
/// schedules were saved with.
#[derive(Deserialize)]
struct RawRange {
    #[serde(alias = "inicio")]
    start: TimeOfDay,
    #[serde(alias = "fin")]
    end: TimeOfDay,
}

impl TryFrom<RawRange> for TimeRange {
    type Error = AgendaError;

    fn try_from(raw: RawRange) -> Result<Self> {
        TimeRange::new(raw.start, raw.end)
    }
}

impl TimeRange {
    pub const FULL_DAY: TimeRange = TimeRange {
        start: TimeOfDay::MIDNIGHT,
        end: TimeOfDay::END_OF_DAY,
    };

    pub fn new(start: TimeOfDay, end: TimeOfDay) -> Result<Self> {
        if start >= end {
            return Err(AgendaError::InvalidRange {
                start,
                end,
                reason: "start must be before end".to_string(),
            });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> TimeOfDay {
        self.start
    }

    pub fn end(&self) -> TimeOfDay {
        self.end
    }

    pub fn duration_minutes(&self) -> u16 {
        self.end.minutes() - self.start.minutes()
    }

    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn contains(&self, other: &TimeRange) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// The same duration starting at `start`.
    pub fn starting_at(&self, start: TimeOfDay) -> Result<Self> {
        let end = start
            .checked_add_minutes(i32::from(self.duration_minutes()))
            .ok_or_else(|| AgendaError::InvalidRange {
                start,
                end: TimeOfDay::END_OF_DAY,
                reason: format!(
                    "a {} minute block starting at {} runs past midnight",
                    self.duration_minutes(),
                    start
                ),
            })?;
        Self::new(start, end)
    }

    /// Rejects ranges that fall outside the allowed operating hours.
    pub fn ensure_within(&self, hours: &TimeRange) -> Result<()> {
        if hours.contains(self) {
            Ok(())
        } else {
            Err(AgendaError::InvalidRange {
                start: self.start,
                end: self.end,
                reason: format!("outside operating hours {}", hours),
            })
        }
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

impl FromStr for TimeRange {
    type Err = AgendaError;

    fn from_str(s: &str) -> Result<Self> {
        let (start, end) = s.trim().split_once('-').ok_or_else(|| {
            AgendaError::InvalidTime(format!("'{}' is not an HH:MM-HH:MM range", s))
        })?;
        Self::new(start.parse()?, end.parse()?)
    }
}

/// Weekday index, `0` (Sunday) through `6` (Saturday).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DayOfWeek(u8);

const DAY_NAMES: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

impl DayOfWeek {
    pub fn new(index: u8) -> Result<Self> {
        if index > 6 {
            return Err(AgendaError::InvalidWeekday(index));
        }
        Ok(Self(index))
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self(date.weekday().num_days_from_sunday() as u8)
    }

    pub fn index(self) -> u8 {
        self.0
    }

    pub fn name(self) -> &'static str {
        DAY_NAMES[usize::from(self.0)]
    }
}

impl fmt::Display for DayOfWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// First day of a visible week.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum WeekStart {
    Sunday,
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
}

impl WeekStart {
    fn offset(self) -> u32 {
        self as u32
    }
}

impl fmt::Display for WeekStart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", DAY_NAMES[self.offset() as usize].to_lowercase())
    }
}

impl FromStr for WeekStart {
    type Err = AgendaError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "sunday" | "sun" => Ok(Self::Sunday),
            "monday" | "mon" => Ok(Self::Monday),
            "tuesday" | "tue" => Ok(Self::Tuesday),
            "wednesday" | "wed" => Ok(Self::Wednesday),
            "thursday" | "thu" => Ok(Self::Thursday),
            "friday" | "fri" => Ok(Self::Friday),
            "saturday" | "sat" => Ok(Self::Saturday),
            other => Err(AgendaError::Config(format!(
                "'{}' is not a day of the week",
                other
            ))),
        }
    }
}

impl TryFrom<String> for WeekStart {
    type Error = AgendaError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<WeekStart> for String {
    fn from(value: WeekStart) -> Self {
        value.to_string()
    }
}

/// Seven consecutive dates. The start date is the week key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Week {
    start: NaiveDate,
}

impl Week {
    pub fn containing(date: NaiveDate, first_day: WeekStart) -> Self {
        let weekday = date.weekday().num_days_from_sunday();
        let back = (weekday + 7 - first_day.offset()) % 7;
        Self {
            start: date - Duration::days(i64::from(back)),
        }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.start + Duration::days(6)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end()
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> {
        let start = self.start;
        (0..7).map(move |offset| start + Duration::days(offset))
    }
}

impl fmt::Display for Week {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}..{}",
            self.start.format(DATE_FORMAT),
            self.end().format(DATE_FORMAT)
        )
    }
}

/// Where a materialized event came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    Template,
    Override,
    Blackout,
    Pending,
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Provenance::Template => "template",
            Provenance::Override => "override",
            Provenance::Blackout => "blackout",
            Provenance::Pending => "pending",
        };
        write!(f, "{}", s)
    }
}

/// Identity of a block or event, namespaced by provenance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub enum BlockId {
    Template { weekday: DayOfWeek, range: TimeRange },
    Override { date: NaiveDate, range: TimeRange },
    Draft(Uuid),
    Blackout { source: String, date: NaiveDate },
}

impl BlockId {
    pub fn provenance(&self) -> Provenance {
        match self {
            BlockId::Template { .. } => Provenance::Template,
            BlockId::Override { .. } => Provenance::Override,
            BlockId::Draft(_) => Provenance::Pending,
            BlockId::Blackout { .. } => Provenance::Blackout,
        }
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockId::Template { weekday, range } => write!(f, "tpl/{}/{}", weekday, range),
            BlockId::Override { date, range } => {
                write!(f, "ovr/{}/{}", date.format(DATE_FORMAT), range)
            }
            BlockId::Draft(id) => write!(f, "draft/{}", id),
            BlockId::Blackout { source, date } => {
                write!(f, "blk/{}/{}", source, date.format(DATE_FORMAT))
            }
        }
    }
}

impl FromStr for BlockId {
    type Err = AgendaError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || AgendaError::InvalidBlockId(s.to_string());
        let parts: Vec<&str> = s.trim().split('/').collect();
        match parts.as_slice() {
            ["tpl", weekday, range] => {
                let index: u8 = weekday.parse().map_err(|_| invalid())?;
                Ok(BlockId::Template {
                    weekday: DayOfWeek::new(index)?,
                    range: range.parse().map_err(|_| invalid())?,
                })
            }
            ["ovr", date, range] => Ok(BlockId::Override {
                date: parse_date(date).map_err(|_| invalid())?,
                range: range.parse().map_err(|_| invalid())?,
            }),
            ["draft", id] => Ok(BlockId::Draft(
                Uuid::parse_str(id).map_err(|_| invalid())?,
            )),
            ["blk", source, date] if !source.is_empty() => Ok(BlockId::Blackout {
                source: source.to_string(),
                date: parse_date(date).map_err(|_| invalid())?,
            }),
            _ => Err(invalid()),
        }
    }
}

impl TryFrom<String> for BlockId {
    type Error = AgendaError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl Serialize for BlockId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A concrete, date-bound instance produced by projection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterializedEvent {
    pub id: BlockId,
    pub date: NaiveDate,
    pub range: TimeRange,
    pub provenance: Provenance,
    pub label: String,
}

impl MaterializedEvent {
    pub fn template(date: NaiveDate, range: TimeRange) -> Self {
        Self {
            id: BlockId::Template {
                weekday: DayOfWeek::from_date(date),
                range,
            },
            date,
            range,
            provenance: Provenance::Template,
            label: AVAILABLE_LABEL.to_string(),
        }
    }

    pub fn date_override(date: NaiveDate, range: TimeRange) -> Self {
        Self {
            id: BlockId::Override { date, range },
            date,
            range,
            provenance: Provenance::Override,
            label: AVAILABLE_LABEL.to_string(),
        }
    }

    pub fn blackout(interval: &BlackoutInterval, date: NaiveDate) -> Self {
        Self {
            id: BlockId::Blackout {
                source: interval.id.clone(),
                date,
            },
            date,
            range: interval.window(),
            provenance: Provenance::Blackout,
            label: interval.label.clone(),
        }
    }

    pub fn pending(candidate: &CandidateBlock) -> Self {
        Self {
            id: candidate.block_id(),
            date: candidate.date,
            range: candidate.range,
            provenance: Provenance::Pending,
            label: AVAILABLE_LABEL.to_string(),
        }
    }

    /// Template and override events are availability; blackouts and drafts are not.
    pub fn is_availability(&self) -> bool {
        matches!(self.provenance, Provenance::Template | Provenance::Override)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BlackoutKind {
    #[default]
    Block,
    Vacation,
    Conference,
    Personal,
    EmergencyOnly,
}

fn default_active() -> bool {
    true
}

/// Externally managed period during which no availability may exist.
///
/// Read-only to this crate. Without both time bounds the interval blocks whole
/// days; with them it blocks that window on every date in its (inclusive) range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlackoutInterval {
    pub id: String,
    pub date_start: NaiveDate,
    pub date_end: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<TimeOfDay>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<TimeOfDay>,
    pub label: String,
    #[serde(default)]
    pub kind: BlackoutKind,
    #[serde(default = "default_active")]
    pub active: bool,
}

impl BlackoutInterval {
    pub fn full_days(
        id: impl Into<String>,
        date_start: NaiveDate,
        date_end: NaiveDate,
        label: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            date_start,
            date_end,
            start: None,
            end: None,
            label: label.into(),
            kind: BlackoutKind::Block,
            active: true,
        }
    }

    pub fn partial(
        id: impl Into<String>,
        date_start: NaiveDate,
        date_end: NaiveDate,
        range: TimeRange,
        label: impl Into<String>,
    ) -> Self {
        Self {
            start: Some(range.start()),
            end: Some(range.end()),
            ..Self::full_days(id, date_start, date_end, label)
        }
    }

    pub fn is_effective(&self) -> bool {
        self.active
    }

    pub fn covers(&self, date: NaiveDate) -> bool {
        self.date_start <= date && date <= self.date_end
    }

    pub fn intersects(&self, from: NaiveDate, to: NaiveDate) -> bool {
        self.date_start <= to && from <= self.date_end
    }

    /// Bounds that do not form a valid range block the whole day.
    pub fn window(&self) -> TimeRange {
        match (self.start, self.end) {
            (None, None) => TimeRange::FULL_DAY,
            (Some(start), Some(end)) => TimeRange::new(start, end).unwrap_or_else(|_| {
                tracing::warn!(blackout = %self.id, %start, %end, "inverted blackout window, blocking whole days");
                TimeRange::FULL_DAY
            }),
            (start, end) => {
                tracing::warn!(blackout = %self.id, ?start, ?end, "blackout has a single time bound, blocking whole days");
                TimeRange::FULL_DAY
            }
        }
    }
}

/// A staged block, not yet written to the schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CandidateBlock {
    pub id: Uuid,
    pub date: NaiveDate,
    pub range: TimeRange,
}

impl CandidateBlock {
    pub fn new(date: NaiveDate, range: TimeRange) -> Self {
        Self {
            id: Uuid::new_v4(),
            date,
            range,
        }
    }

    pub fn block_id(&self) -> BlockId {
        BlockId::Draft(self.id)
    }
}

/// How a staged batch is written back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommitMode {
    /// Every candidate becomes a rule for its weekday, in all weeks.
    WeeklyTemplate,
    /// Every candidate becomes an override for its exact date.
    SpecificDate,
}

impl fmt::Display for CommitMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommitMode::WeeklyTemplate => write!(f, "weekly"),
            CommitMode::SpecificDate => write!(f, "date"),
        }
    }
}

impl FromStr for CommitMode {
    type Err = AgendaError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "weekly" | "template" | "weekly_template" => Ok(CommitMode::WeeklyTemplate),
            "date" | "specific" | "specific_date" => Ok(CommitMode::SpecificDate),
            other => Err(AgendaError::Config(format!(
                "unknown commit mode '{}' (expected weekly or date)",
                other
            ))),
        }
    }
}
