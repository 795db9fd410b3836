//! Levels command implementation.

use barwire_lib::Level;

/// List aggregation levels and their bucket lengths.
pub(crate) fn list_levels() {
    println!("{:<6} {:<12}", "LEVEL", "BUCKET");
    println!("{}", "-".repeat(20));
    for level in Level::ALL {
        let bucket = match level.seconds() {
            Some(secs) if secs < 3600 => format!("{} minutes", secs / 60),
            Some(secs) => format!("{} hour", secs / 3600),
            None => "calendar".to_string(),
        };
        println!("{:<6} {bucket:<12}", level.as_str());
    }
}
