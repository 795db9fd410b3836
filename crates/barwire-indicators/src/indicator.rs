//! Bar indicators.

use std::collections::VecDeque;

use barwire_aggregate::Bar;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Output value used while an indicator has not seen enough bars.
pub const WARMING_UP: f64 = -1.0;

/// Indicator parameters as written in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum IndicatorConfig {
    /// Decay-weighted moving average trend.
    Ema {
        /// Window length in bars.
        period: usize,
        /// Per-bar weight decay in `[0, 1)`.
        rate_of_decay: f64,
    },
    /// Relative strength index.
    Rsi {
        /// Number of up and down moves averaged.
        period: usize,
    },
    /// Absolute and relative volume.
    Volume {
        /// Window length for the mean volume.
        period: usize,
    },
    /// Bollinger bands.
    Bollinger {
        /// Window length in bars.
        period: usize,
        /// Band width in standard deviations.
        width: f64,
    },
}

impl IndicatorConfig {
    /// The indicator set used when configuration names none.
    #[must_use]
    pub const fn defaults() -> [Self; 4] {
        [
            Self::Ema {
                period: 20,
                rate_of_decay: 0.1,
            },
            Self::Rsi { period: 14 },
            Self::Volume { period: 20 },
            Self::Bollinger {
                period: 20,
                width: 2.0,
            },
        ]
    }

    /// Checks the parameters, returning a description of the first problem.
    ///
    /// # Errors
    ///
    /// Returns a message if a period is zero or a factor is out of range.
    pub fn validate(&self) -> Result<(), String> {
        match *self {
            Self::Ema {
                period,
                rate_of_decay,
            } => {
                if period == 0 {
                    return Err("ema period must be positive".into());
                }
                if !(0.0..1.0).contains(&rate_of_decay) {
                    return Err(format!("ema rate_of_decay {rate_of_decay} outside [0, 1)"));
                }
            }
            Self::Rsi { period } | Self::Volume { period } if period == 0 => {
                return Err(format!("{} period must be positive", self.build().name()));
            }
            Self::Bollinger { period, width } => {
                if period == 0 {
                    return Err("bollinger period must be positive".into());
                }
                if !(width.is_finite() && width > 0.0) {
                    return Err(format!("bollinger width {width} must be positive"));
                }
            }
            Self::Rsi { .. } | Self::Volume { .. } => {}
        }
        Ok(())
    }

    /// Builds a fresh indicator.
    #[must_use]
    pub fn build(&self) -> Indicator {
        match *self {
            Self::Ema {
                period,
                rate_of_decay,
            } => Indicator::Ema(Ema::new(period, rate_of_decay)),
            Self::Rsi { period } => Indicator::Rsi(Rsi::new(period)),
            Self::Volume { period } => Indicator::Volume(Volume::new(period)),
            Self::Bollinger { period, width } => {
                Indicator::Bollinger(Bollinger::new(period, width))
            }
        }
    }
}

/// A stateful indicator over one level's bars.
///
/// `feed` consumes a bar and returns the new output; `fillna` repeats the
/// previous output without touching state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Indicator {
    /// See [`Ema`].
    Ema(Ema),
    /// See [`Rsi`].
    Rsi(Rsi),
    /// See [`Volume`].
    Volume(Volume),
    /// See [`Bollinger`].
    Bollinger(Bollinger),
}

impl Indicator {
    /// Short name used as column prefix.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Ema(_) => "ema",
            Self::Rsi(_) => "rsi",
            Self::Volume(_) => "volume",
            Self::Bollinger(_) => "bollinger",
        }
    }

    /// Output column names, in output order.
    #[must_use]
    pub fn columns(&self) -> Vec<String> {
        let suffixes: &[&str] = match self {
            Self::Ema(_) => &["trend"],
            Self::Rsi(_) => &["value"],
            Self::Volume(_) => &["abs", "rel"],
            Self::Bollinger(_) => &["sma", "upper", "lower"],
        };
        suffixes
            .iter()
            .map(|suffix| format!("{}_{suffix}", self.name()))
            .collect()
    }

    /// Returns true if the indicator also consumes bars that are still open.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        matches!(self, Self::Volume(_))
    }

    /// Consumes `bar` and returns the updated output.
    pub fn feed(&mut self, bar: &Bar) -> &[f64] {
        match self {
            Self::Ema(ind) => ind.feed(bar),
            Self::Rsi(ind) => ind.feed(bar),
            Self::Volume(ind) => ind.feed(bar),
            Self::Bollinger(ind) => ind.feed(bar),
        }
        self.last_output()
    }

    /// Returns the previous output unchanged.
    #[must_use]
    pub fn fillna(&self) -> &[f64] {
        self.last_output()
    }

    /// Returns the most recent output.
    #[must_use]
    pub fn last_output(&self) -> &[f64] {
        match self {
            Self::Ema(ind) => std::slice::from_ref(&ind.last),
            Self::Rsi(ind) => std::slice::from_ref(&ind.last),
            Self::Volume(ind) => &ind.last,
            Self::Bollinger(ind) => &ind.last,
        }
    }
}

/// Trend of the close against a decay-weighted average of recent closes.
///
/// Outputs 1 when the close is above the average, 0 when below and 2 when
/// equal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ema {
    period: usize,
    rate_of_decay: f64,
    closes: VecDeque<f64>,
    last: f64,
}

impl Ema {
    /// Creates the indicator.
    #[must_use]
    pub fn new(period: usize, rate_of_decay: f64) -> Self {
        Self {
            period,
            rate_of_decay,
            closes: VecDeque::with_capacity(period),
            last: WARMING_UP,
        }
    }

    /// Returns the weighted average, once the window is full.
    #[must_use]
    pub fn average(&self) -> Option<f64> {
        if self.closes.len() < self.period {
            return None;
        }
        let keep = 1.0 - self.rate_of_decay;
        let (sum, divider) = self
            .closes
            .iter()
            .rev()
            .zip(std::iter::successors(Some(1.0), |w| Some(w * keep)))
            .fold((0.0, 0.0), |(sum, divider), (close, weight)| {
                (sum + close * weight, divider + weight)
            });
        Some(sum / divider)
    }

    fn feed(&mut self, bar: &Bar) {
        push_window(&mut self.closes, self.period, bar.close);
        if let Some(avg) = self.average() {
            self.last = trend(bar.close, avg);
        }
    }
}

fn trend(close: f64, reference: f64) -> f64 {
    if close > reference {
        1.0
    } else if close < reference {
        0.0
    } else {
        2.0
    }
}

/// Relative strength index with Wilder smoothing.
///
/// The first `period` close-to-close changes seed the average gain and
/// loss; each later change is blended in with weight `1 / period`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rsi {
    period: usize,
    changes: usize,
    avg_gain: f64,
    avg_loss: f64,
    last_close: Option<f64>,
    last: f64,
}

impl Rsi {
    /// Creates the indicator.
    #[must_use]
    pub const fn new(period: usize) -> Self {
        Self {
            period,
            changes: 0,
            avg_gain: 0.0,
            avg_loss: 0.0,
            last_close: None,
            last: WARMING_UP,
        }
    }

    fn feed(&mut self, bar: &Bar) {
        let previous = self.last_close.replace(bar.close);
        let Some(previous) = previous else {
            return;
        };
        let change = bar.close - previous;
        let (gain, loss) = (change.max(0.0), (-change).max(0.0));
        let period = self.period as f64;

        self.changes += 1;
        if self.changes <= self.period {
            self.avg_gain += gain / period;
            self.avg_loss += loss / period;
            if self.changes < self.period {
                return;
            }
        } else {
            self.avg_gain = (self.avg_gain * (period - 1.0) + gain) / period;
            self.avg_loss = (self.avg_loss * (period - 1.0) + loss) / period;
        }
        self.last = rsi(self.avg_gain, self.avg_loss);
    }
}

fn rsi(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        return if avg_gain == 0.0 { 50.0 } else { 100.0 };
    }
    100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
}

/// Absolute tick volume and volume relative to the recent mean.
///
/// Consumes open bars too: repeated updates of the same bucket replace
/// its entry in the window instead of adding a new one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Volume {
    period: usize,
    volumes: VecDeque<u64>,
    bucket: Option<DateTime<Utc>>,
    last: [f64; 2],
}

impl Volume {
    /// Creates the indicator.
    #[must_use]
    pub fn new(period: usize) -> Self {
        Self {
            period,
            volumes: VecDeque::with_capacity(period),
            bucket: None,
            last: [0.0, WARMING_UP],
        }
    }

    fn feed(&mut self, bar: &Bar) {
        if self.bucket == Some(bar.open_time) {
            if let Some(current) = self.volumes.back_mut() {
                *current = bar.volume;
            }
        } else {
            push_window(&mut self.volumes, self.period, bar.volume);
            self.bucket = Some(bar.open_time);
        }

        let absolute = bar.volume as f64;
        let relative = if self.volumes.len() == self.period {
            let mean = self.volumes.iter().sum::<u64>() as f64 / self.period as f64;
            if mean > 0.0 { absolute / mean } else { WARMING_UP }
        } else {
            WARMING_UP
        };
        self.last = [absolute, relative];
    }
}

/// Simple moving average of closes with bands `width` standard deviations
/// away.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bollinger {
    period: usize,
    width: f64,
    closes: VecDeque<f64>,
    last: [f64; 3],
}

impl Bollinger {
    /// Creates the indicator.
    #[must_use]
    pub fn new(period: usize, width: f64) -> Self {
        Self {
            period,
            width,
            closes: VecDeque::with_capacity(period),
            last: [WARMING_UP; 3],
        }
    }

    fn feed(&mut self, bar: &Bar) {
        push_window(&mut self.closes, self.period, bar.close);
        if self.closes.len() < self.period {
            return;
        }
        let n = self.period as f64;
        let sma = self.closes.iter().sum::<f64>() / n;
        let variance = self.closes.iter().map(|c| (c - sma).powi(2)).sum::<f64>() / n;
        let band = self.width * variance.sqrt();
        self.last = [sma, sma + band, sma - band];
    }
}

fn push_window<T>(window: &mut VecDeque<T>, period: usize, value: T) {
    if window.len() == period {
        window.pop_front();
    }
    window.push_back(value);
}
