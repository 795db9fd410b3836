//! Streaming M1-to-all-levels aggregation.

use std::sync::Arc;

use barwire_calendar::TradingCalendar;
use barwire_types::{AssetId, Level, Sample};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{AggregateError, Bar, Sink};

/// Schema version written into [`AggregatorSnapshot`].
pub const SNAPSHOT_VERSION: u32 = 1;

type Bars = [Bar; Level::COUNT];

/// Versioned record of an aggregator's state between two samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatorSnapshot {
    /// Schema version, see [`SNAPSHOT_VERSION`].
    pub schema_version: u32,
    /// Asset the aggregator serves.
    pub asset: AssetId,
    /// Timestamp of the last fed sample.
    pub last_time: Option<DateTime<Utc>>,
    /// Samples fed so far.
    pub samples_fed: u64,
    /// Boundary repairs performed so far.
    pub repairs: u64,
    /// One bar per level, finest first; absent before the first sample.
    pub bars: Option<Bars>,
}

/// Streaming aggregator for one asset.
///
/// Consumes strictly ordered M1 samples and maintains one [`Bar`] per
/// [`Level`], notifying its [`Sink`] once per level per sample. Boundaries
/// whose exact closing sample was skipped by a data gap are detected and
/// the affected bars are force-closed before the new sample is applied.
#[derive(Debug)]
pub struct Aggregator<S> {
    asset: AssetId,
    calendar: Arc<dyn TradingCalendar>,
    bars: Option<Bars>,
    last_time: Option<DateTime<Utc>>,
    samples_fed: u64,
    repairs: u64,
    sink: S,
}

impl<S: Sink> Aggregator<S> {
    /// Creates an aggregator for `asset` that reports to `sink`.
    pub fn new(asset: AssetId, calendar: Arc<dyn TradingCalendar>, sink: S) -> Self {
        Self {
            asset,
            calendar,
            bars: None,
            last_time: None,
            samples_fed: 0,
            repairs: 0,
            sink,
        }
    }

    /// Rebuilds an aggregator from a snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot schema is unsupported or its bars
    /// are not in level order.
    pub fn restore(
        snapshot: AggregatorSnapshot,
        calendar: Arc<dyn TradingCalendar>,
        sink: S,
    ) -> Result<Self, AggregateError> {
        if snapshot.schema_version != SNAPSHOT_VERSION {
            return Err(AggregateError::SnapshotVersion {
                found: snapshot.schema_version,
                expected: SNAPSHOT_VERSION,
            });
        }
        if let Some(bars) = &snapshot.bars {
            let ordered = bars.iter().zip(Level::ALL).all(|(bar, level)| bar.level == level);
            if !ordered || snapshot.last_time.is_none() {
                return Err(AggregateError::CorruptSnapshot(
                    "bars out of level order or missing last time".to_string(),
                ));
            }
        }
        Ok(Self {
            asset: snapshot.asset,
            calendar,
            bars: snapshot.bars,
            last_time: snapshot.last_time,
            samples_fed: snapshot.samples_fed,
            repairs: snapshot.repairs,
            sink,
        })
    }

    /// Feeds the next sample.
    ///
    /// # Errors
    ///
    /// Fails fast, without touching any state, if the sample is not
    /// strictly after the previous one, belongs to another asset, is not
    /// minute-aligned, or would mutate a completed bar.
    pub fn feed(&mut self, sample: &Sample) -> Result<(), AggregateError> {
        self.validate(sample)?;

        let Self {
            calendar,
            bars,
            sink,
            ..
        } = self;
        let calendar: &dyn TradingCalendar = &**calendar;
        let bars = bars.get_or_insert_with(|| {
            Level::ALL.map(|level| Bar::primed(level, sample, calendar))
        });

        let crossed = Level::ALL.map(|level| sample.time > bars[level.index()].close_time);
        for level in Level::ALL {
            let bar = &bars[level.index()];
            if bar.complete && !crossed[level.index()] {
                return Err(AggregateError::ClosedBar {
                    level,
                    close_time: bar.close_time,
                });
            }
        }

        let repaired = repair_missed(bars, &crossed, sink);

        for level in Level::coarsest_first() {
            let bar = &mut bars[level.index()];
            if crossed[level.index()] {
                *bar = Bar::open(level, sample, calendar);
                sink.on_close(level, bar);
            } else {
                let relevant = bar.absorb(sample);
                if relevant || bar.is_closing_tick(sample.time) {
                    sink.on_close(level, bar);
                } else {
                    sink.on_unchanged(level, bar);
                }
            }
        }

        self.last_time = Some(sample.time);
        self.samples_fed += 1;
        if repaired.is_some() {
            self.repairs += 1;
        }
        Ok(())
    }

    /// Feeds every sample in order, stopping at the first error.
    ///
    /// # Errors
    ///
    /// Returns the first error from [`Aggregator::feed`].
    pub fn feed_all<'a, I>(&mut self, samples: I) -> Result<u64, AggregateError>
    where
        I: IntoIterator<Item = &'a Sample>,
    {
        let mut fed = 0;
        for sample in samples {
            self.feed(sample)?;
            fed += 1;
        }
        Ok(fed)
    }

    /// Checkpoints the sink and returns a snapshot of the aggregator.
    ///
    /// # Errors
    ///
    /// Returns an error if the sink fails to checkpoint.
    pub fn checkpoint(&mut self) -> Result<AggregatorSnapshot, AggregateError> {
        self.sink.checkpoint()?;
        Ok(self.snapshot())
    }

    fn validate(&self, sample: &Sample) -> Result<(), AggregateError> {
        if sample.asset != self.asset {
            return Err(AggregateError::AssetMismatch {
                expected: self.asset,
                got: sample.asset,
            });
        }
        if !sample.is_aligned() {
            return Err(AggregateError::Unaligned(sample.time));
        }
        match self.last_time {
            Some(last) if sample.time <= last => Err(AggregateError::OutOfOrder {
                last,
                got: sample.time,
            }),
            _ => Ok(()),
        }
    }
}

impl<S> Aggregator<S> {
    /// Returns a snapshot of the current state.
    #[must_use]
    pub fn snapshot(&self) -> AggregatorSnapshot {
        AggregatorSnapshot {
            schema_version: SNAPSHOT_VERSION,
            asset: self.asset,
            last_time: self.last_time,
            samples_fed: self.samples_fed,
            repairs: self.repairs,
            bars: self.bars,
        }
    }

    /// Returns the asset this aggregator serves.
    #[must_use]
    pub const fn asset(&self) -> AssetId {
        self.asset
    }

    /// Returns the current bar for `level`, if any sample has been fed.
    #[must_use]
    pub fn bar(&self, level: Level) -> Option<&Bar> {
        self.bars.as_ref().map(|bars| &bars[level.index()])
    }

    /// Returns the timestamp of the last fed sample.
    #[must_use]
    pub const fn last_time(&self) -> Option<DateTime<Utc>> {
        self.last_time
    }

    /// Returns the number of samples fed.
    #[must_use]
    pub const fn samples_fed(&self) -> u64 {
        self.samples_fed
    }

    /// Returns the number of feeds that repaired a missed boundary.
    #[must_use]
    pub const fn repairs(&self) -> u64 {
        self.repairs
    }

    /// Returns the sink.
    #[must_use]
    pub const fn sink(&self) -> &S {
        &self.sink
    }

    /// Returns the sink mutably.
    pub const fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Consumes the aggregator, returning its sink.
    #[must_use]
    pub fn into_sink(self) -> S {
        self.sink
    }
}

/// Force-closes bars whose boundary was crossed without a closing tick.
///
/// All missed bars take the latest of their close times as `as_of` and
/// the last M1 close as `close`. Returns the repair instant, if any.
fn repair_missed<S: Sink + ?Sized>(
    bars: &mut Bars,
    crossed: &[bool; Level::COUNT],
    sink: &mut S,
) -> Option<DateTime<Utc>> {
    let missed = Level::ALL.map(|level| crossed[level.index()] && !bars[level.index()].complete);
    let repair_time = Level::ALL
        .into_iter()
        .filter(|level| missed[level.index()])
        .map(|level| bars[level.index()].close_time)
        .max()?;

    let close = bars[Level::M1.index()].close;
    for level in Level::ALL {
        if missed[level.index()] {
            bars[level.index()].force_close(repair_time, close);
        }
    }

    // M1 only ever reports genuine samples.
    sink.on_unchanged(Level::M1, &bars[Level::M1.index()]);
    for level in Level::coarsest_first().filter(|level| *level != Level::M1) {
        let bar = &bars[level.index()];
        if missed[level.index()] {
            sink.on_close(level, bar);
        } else {
            sink.on_unchanged(level, bar);
        }
    }
    Some(repair_time)
}
