//! Module containing some utility functions that didn't fit anywhere else.

use time::{format_description, OffsetDateTime};

/// Produces a timestamp `String` of the current time in YYYY-MM-DD_HH-mm-SS format, suitable to be
/// used inside a filename.
pub fn file_timestamp() -> Result<String, time::error::Error> {
    let format = format_description::parse("[year]-[month]-[day]_[hour]-[minute]-[second]")?;
    Ok(OffsetDateTime::now_local()
        .unwrap_or_else(|_| OffsetDateTime::now_utc())
        .format(&format)?)
}
