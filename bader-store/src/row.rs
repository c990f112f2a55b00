//! Row conversion helpers shared by the store modules.

use chrono::{DateTime, Utc};
use rusqlite::types::Type;

/// Parses a UUID-backed id column, mapping failures into rusqlite's
/// conversion error so they surface through the normal query path.
pub(crate) fn uuid_col<T>(
    idx: usize,
    raw: &str,
    parse: impl FnOnce(&str) -> Result<T, uuid::Error>,
) -> rusqlite::Result<T> {
    parse(raw).map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Converts a Unix-seconds column into a UTC timestamp.
pub(crate) fn timestamp_col(idx: usize, secs: i64) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0).ok_or(rusqlite::Error::IntegralValueOutOfRange(idx, secs))
}
