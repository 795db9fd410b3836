//! Period command implementation.

use crate::context::calendar_or_default;
use anyhow::{Context, Result};
use barwire_lib::{Level, floor_minute, period};
use chrono::{DateTime, NaiveDateTime, Utc};
use std::path::Path;

/// Print the bucket of `level` containing `time`.
pub(crate) fn show_period(config: &Path, level: &str, time: Option<&str>) -> Result<()> {
    let level: Level = level.parse()?;
    let time = match time {
        Some(s) => parse_time(s)?,
        None => floor_minute(Utc::now()),
    };
    let calendar = calendar_or_default(config)?;
    let bucket = period(level, time, &calendar);

    println!("Level:   {level}");
    println!("Time:    {}", time.format("%Y-%m-%d %H:%M UTC"));
    println!("Open:    {}", bucket.open_time.format("%Y-%m-%d %H:%M UTC"));
    println!("Close:   {}", bucket.close_time.format("%Y-%m-%d %H:%M UTC"));
    if bucket.is_closing(time) {
        println!("(closing minute)");
    }
    Ok(())
}

fn parse_time(s: &str) -> Result<DateTime<Utc>> {
    if let Ok(time) = DateTime::parse_from_rfc3339(s) {
        return Ok(time.with_timezone(&Utc));
    }
    let naive = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M")
        .with_context(|| format!("Invalid timestamp: {s}"))?;
    Ok(naive.and_utc())
}
