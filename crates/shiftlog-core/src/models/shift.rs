//! Shift and break records

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

/// An opaque, non-empty shift identifier
///
/// Identifiers are minted by whichever replica creates the record so that
/// creating a shift never needs a round-trip. Locally minted ids are UUID v7
/// strings; ids received from other replicas are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ShiftId(String);

impl ShiftId {
    /// Create a new unique shift ID using UUID v7
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ShiftId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ShiftId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ShiftId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        if value.trim().is_empty() {
            return Err(Error::Validation("shift id cannot be empty".to_string()));
        }
        Ok(Self(value))
    }
}

impl From<ShiftId> for String {
    fn from(id: ShiftId) -> Self {
        id.0
    }
}

impl FromStr for ShiftId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::try_from(s.to_string())
    }
}

/// Whether an interval is still running.
///
/// Serialized as a nullable timestamp: `null` while ongoing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "Option<DateTime<Utc>>", into = "Option<DateTime<Utc>>")]
pub enum EndState {
    /// Interval has not ended yet
    #[default]
    Ongoing,
    /// Interval ended at the given instant
    Ended(DateTime<Utc>),
}

impl EndState {
    pub const fn is_ongoing(&self) -> bool {
        matches!(self, Self::Ongoing)
    }

    pub const fn ended_at(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Ongoing => None,
            Self::Ended(at) => Some(*at),
        }
    }

    /// End instant, or `now` while the interval is still running
    pub const fn end_or(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            Self::Ongoing => now,
            Self::Ended(at) => *at,
        }
    }
}

impl From<Option<DateTime<Utc>>> for EndState {
    fn from(value: Option<DateTime<Utc>>) -> Self {
        value.map_or(Self::Ongoing, Self::Ended)
    }
}

impl From<EndState> for Option<DateTime<Utc>> {
    fn from(value: EndState) -> Self {
        value.ended_at()
    }
}

/// A break taken during a shift
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakInterval {
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub ended_at: EndState,
}

impl BreakInterval {
    /// Start a new ongoing break
    #[must_use]
    pub const fn starting_at(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            ended_at: EndState::Ongoing,
        }
    }

    /// Elapsed break time, measured up to `now` while ongoing
    pub fn elapsed(&self, now: DateTime<Utc>) -> Duration {
        self.ended_at.end_or(now) - self.started_at
    }
}

/// A logged shift
///
/// `updated_at` is the logical clock used by reconciliation and is bumped on
/// every mutation. Mutating methods return a new value and leave `self`
/// untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shift {
    pub id: ShiftId,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub ended_at: EndState,
    #[serde(default)]
    pub breaks: Vec<BreakInterval>,
    pub updated_at: DateTime<Utc>,
}

impl Shift {
    /// Start a new shift at `now`
    #[must_use]
    pub fn start(now: DateTime<Utc>) -> Self {
        Self {
            id: ShiftId::new(),
            started_at: now,
            ended_at: EndState::Ongoing,
            breaks: Vec::new(),
            updated_at: now,
        }
    }

    pub const fn is_ongoing(&self) -> bool {
        self.ended_at.is_ongoing()
    }

    /// Index of the running break, if any
    pub fn ongoing_break_index(&self) -> Option<usize> {
        self.breaks
            .iter()
            .position(|interval| interval.ended_at.is_ongoing())
    }

    pub fn has_ongoing_break(&self) -> bool {
        self.ongoing_break_index().is_some()
    }

    /// Wall-clock span from start to end (or `now`)
    pub fn elapsed(&self, now: DateTime<Utc>) -> Duration {
        self.ended_at.end_or(now) - self.started_at
    }

    /// Sum of all break spans, open breaks measured up to `now`
    pub fn total_break(&self, now: DateTime<Utc>) -> Duration {
        self.breaks
            .iter()
            .fold(Duration::zero(), |acc, interval| acc + interval.elapsed(now))
    }

    /// End the shift at `now`
    pub fn end(&self, now: DateTime<Utc>) -> Result<Self> {
        if !self.is_ongoing() {
            return Err(Error::NoOpenShift);
        }
        Ok(Self {
            ended_at: EndState::Ended(now),
            updated_at: now,
            ..self.clone()
        })
    }

    /// Append a new ongoing break starting at `now`
    pub fn start_break(&self, now: DateTime<Utc>) -> Result<Self> {
        if !self.is_ongoing() {
            return Err(Error::NoOpenShift);
        }
        if self.has_ongoing_break() {
            return Err(Error::BreakAlreadyOpen);
        }
        let mut breaks = self.breaks.clone();
        breaks.push(BreakInterval::starting_at(now));
        Ok(Self {
            breaks,
            updated_at: now,
            ..self.clone()
        })
    }

    /// Close the running break at `now`
    pub fn end_break(&self, now: DateTime<Utc>) -> Result<Self> {
        let index = self.ongoing_break_index().ok_or(Error::NoOngoingBreak)?;
        let breaks = replace_at(&self.breaks, index, |interval| BreakInterval {
            ended_at: EndState::Ended(now),
            ..*interval
        });
        Ok(Self {
            breaks,
            updated_at: now,
            ..self.clone()
        })
    }
}

/// Build a new sequence with the element at `index` replaced by `update(element)`.
fn replace_at<T: Clone>(items: &[T], index: usize, update: impl FnOnce(&T) -> T) -> Vec<T> {
    let mut next = Vec::with_capacity(items.len());
    next.extend_from_slice(&items[..index]);
    next.push(update(&items[index]));
    next.extend_from_slice(&items[index + 1..]);
    next
}
