//! Synthetic market data for barwire benchmarks.

use barwire_lib::{AssetId, FxCalendar, RawPage, RawRow, Sample, TradingCalendar};
use chrono::{DateTime, TimeDelta, TimeZone, Utc};

/// Monday 2024-01-08 00:00 UTC, inside FX trading hours.
pub fn bench_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 8, 0, 0, 0)
        .single()
        .unwrap_or_default()
}

/// Deterministic price path; the same seed yields the same series.
#[derive(Debug, Clone)]
pub struct RandomWalk {
    state: u64,
    price: f64,
}

impl RandomWalk {
    /// Creates a walk starting at `price`.
    pub const fn new(seed: u64, price: f64) -> Self {
        Self { state: seed, price }
    }

    fn next_unit(&mut self) -> f64 {
        // 64-bit LCG (Knuth MMIX constants)
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        (self.state >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Returns the next OHLC quadruple and tick volume.
    pub fn step(&mut self) -> (f64, f64, f64, f64, u64) {
        let open = self.price;
        let close = open * (1.0 + (self.next_unit() - 0.5) * 4e-4);
        let high = open.max(close) * (1.0 + self.next_unit() * 1e-4);
        let low = open.min(close) * (1.0 - self.next_unit() * 1e-4);
        let volume = 1 + (self.next_unit() * 200.0) as u64;
        self.price = close;
        (open, high, low, close, volume)
    }
}

/// Generates `count` consecutive trading minutes of samples from `start`,
/// skipping minutes the FX calendar considers closed.
pub fn synthetic_samples(asset: AssetId, start: DateTime<Utc>, count: usize) -> Vec<Sample> {
    let calendar = FxCalendar::default();
    let mut walk = RandomWalk::new(42, 1.1);
    let mut samples = Vec::with_capacity(count);
    let mut time = start;
    while samples.len() < count {
        if calendar.is_trading_instant(time) {
            let (open, high, low, close, volume) = walk.step();
            samples.push(Sample::new(asset, time, open, high, low, close, volume));
        }
        time += TimeDelta::minutes(1);
    }
    samples
}

/// Builds a raw page from samples with the ends of every four-row chunk
/// swapped and every tenth row repeated.
pub fn noisy_page(symbol: &str, samples: &[Sample]) -> RawPage {
    let mut rows: Vec<RawRow> = samples
        .iter()
        .map(|s| RawRow {
            time: s.time,
            complete: s.complete,
            volume: s.volume,
            open: s.open,
            high: s.high,
            low: s.low,
            close: s.close,
        })
        .collect();
    for chunk in rows.chunks_mut(4) {
        chunk.swap(0, chunk.len() - 1);
    }
    let repeats: Vec<RawRow> = rows.iter().step_by(10).copied().collect();
    rows.extend(repeats);
    RawPage::new(symbol, rows)
}
