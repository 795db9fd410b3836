//! Sanitize command implementation.

use crate::context::Runtime;
use anyhow::{Context, Result};
use std::path::Path;

/// Sanitize the stored series of each asset.
pub(crate) async fn sanitize(config: &Path, symbols: &[String]) -> Result<()> {
    let runtime = Runtime::load(config)?;
    let storage = runtime.storage();

    println!(
        "{:<12} {:>12} {:>12} {:>10} {:>10}",
        "ASSET", "BEFORE", "AFTER", "DUPES", "INVALID"
    );
    println!("{}", "-".repeat(60));
    for asset in runtime.select(symbols)? {
        let report = storage
            .sanitize(&asset)
            .await
            .with_context(|| format!("Failed to sanitize {asset}"))?;
        println!(
            "{:<12} {:>12} {:>12} {:>10} {:>10}",
            asset.symbol(),
            report.before,
            report.after,
            report.duplicates,
            report.invalid
        );
    }
    Ok(())
}
