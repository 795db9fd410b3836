//! Aggregation level definitions.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// One of the eight bar granularities maintained per asset.
///
/// Levels are ordered from finest to coarsest. Every level is derived from
/// [`Level::M1`] samples; coarser levels never feed each other.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    /// 1-minute bars (the base resolution).
    #[default]
    M1,
    /// 5-minute bars.
    M5,
    /// 15-minute bars.
    M15,
    /// 30-minute bars.
    M30,
    /// 1-hour bars.
    H1,
    /// Trading-day bars.
    D1,
    /// Trading-week bars.
    W1,
    /// Calendar-month bars.
    Mo1,
}

impl Level {
    /// Number of levels.
    pub const COUNT: usize = 8;

    /// All levels, finest first.
    pub const ALL: [Self; Self::COUNT] = [
        Self::M1,
        Self::M5,
        Self::M15,
        Self::M30,
        Self::H1,
        Self::D1,
        Self::W1,
        Self::Mo1,
    ];

    /// Returns the position of this level in [`Level::ALL`].
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Returns the fixed bucket length in seconds, or `None` for levels
    /// whose buckets follow the trading calendar.
    #[must_use]
    pub const fn seconds(&self) -> Option<i64> {
        match self {
            Self::M1 => Some(60),
            Self::M5 => Some(300),
            Self::M15 => Some(900),
            Self::M30 => Some(1800),
            Self::H1 => Some(3600),
            Self::D1 | Self::W1 | Self::Mo1 => None,
        }
    }

    /// Returns true for levels whose buckets follow the trading calendar.
    #[must_use]
    pub const fn is_calendar(&self) -> bool {
        self.seconds().is_none()
    }

    /// Returns the level as a string identifier.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::M1 => "m1",
            Self::M5 => "m5",
            Self::M15 => "m15",
            Self::M30 => "m30",
            Self::H1 => "h1",
            Self::D1 => "d1",
            Self::W1 => "w1",
            Self::Mo1 => "mo1",
        }
    }

    /// Iterates all levels from coarsest to finest.
    pub fn coarsest_first() -> impl Iterator<Item = Self> {
        Self::ALL.into_iter().rev()
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Level {
    type Err = LevelParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "m1" | "1m" | "minute" => Ok(Self::M1),
            "m5" | "5m" => Ok(Self::M5),
            "m15" | "15m" => Ok(Self::M15),
            "m30" | "30m" => Ok(Self::M30),
            "h1" | "1h" | "60m" | "hour" => Ok(Self::H1),
            "d1" | "1d" | "day" | "daily" => Ok(Self::D1),
            "w1" | "1w" | "week" | "weekly" => Ok(Self::W1),
            "mo1" | "1mo" | "month" | "monthly" => Ok(Self::Mo1),
            _ => Err(LevelParseError(s.to_string())),
        }
    }
}

/// Error returned when parsing an invalid level string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelParseError(String);

impl std::fmt::Display for LevelParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "invalid level '{}', expected one of: m1, m5, m15, m30, h1, d1, w1, mo1",
            self.0
        )
    }
}

impl std::error::Error for LevelParseError {}
