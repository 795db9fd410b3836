//! Per-asset download watermark.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// Resume point for downloads: the first minute not yet persisted.
///
/// A cursor is always one minute past the last stored sample, so a fetch
/// starting at the cursor never re-requests data that is already on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cursor(DateTime<Utc>);

impl Cursor {
    /// Creates a cursor pointing at `time`.
    #[must_use]
    pub const fn at(time: DateTime<Utc>) -> Self {
        Self(time)
    }

    /// Creates the cursor that follows a stored sample at `last`.
    #[must_use]
    pub fn after(last: DateTime<Utc>) -> Self {
        Self(last + TimeDelta::minutes(1))
    }

    /// Returns the first minute to request.
    #[must_use]
    pub const fn time(&self) -> DateTime<Utc> {
        self.0
    }

    /// Moves the cursor past `last` if that is further ahead.
    pub fn advance_past(&mut self, last: DateTime<Utc>) {
        let next = Self::after(last);
        if next > *self {
            *self = next;
        }
    }
}

impl std::fmt::Display for Cursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%dT%H:%MZ"))
    }
}
