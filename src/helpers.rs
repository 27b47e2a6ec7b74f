//! Dialect-independent helpers shared by drivers and result sets.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use lazy_static::lazy_static;
use regex::Regex;

use crate::types::{ColumnType, RowValues};

lazy_static! {
    // Order matters: first match wins.
    static ref TYPE_PATTERNS: Vec<(Regex, ColumnType)> = [
        ("^_", ColumnType::Text),
        ("RANGE$", ColumnType::Text),
        ("BYTEA|BLOB|BIN", ColumnType::Binary),
        ("TEXT|CHAR|POINT|INTERVAL|STRING", ColumnType::Text),
        ("YEAR|BYTE|COUNTER|SERIAL|INT|LONG|SHORT|^TINY$", ColumnType::Integer),
        ("CURRENCY|REAL|MONEY|FLOAT|DOUBLE|DECIMAL|NUMERIC|NUMBER", ColumnType::Float),
        ("^TIME$", ColumnType::Time),
        ("TIME", ColumnType::DateTime),
        ("DATE", ColumnType::Date),
        ("BOOL", ColumnType::Bool),
        ("JSON", ColumnType::Json),
    ]
    .into_iter()
    .filter_map(|(pattern, ty)| Regex::new(&format!("(?i){pattern}")).ok().map(|re| (re, ty)))
    .collect();
}

const DATE_TIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
];

/// Map a native declared type (e.g. `VARCHAR(20)`) to a semantic column type.
#[must_use]
pub fn detect_type(native_type: &str) -> Option<ColumnType> {
    let base = native_type.split('(').next().unwrap_or(native_type).trim();
    TYPE_PATTERNS
        .iter()
        .find(|(re, _)| re.is_match(base))
        .map(|(_, ty)| *ty)
}

/// Parse the textual date/time shapes engines commonly hand back.
#[must_use]
pub fn parse_date_time(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    DATE_TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

fn from_unix(seconds: i64) -> Option<NaiveDateTime> {
    DateTime::from_timestamp(seconds, 0).map(|dt| dt.naive_utc())
}

/// Coerce a fetched value to the shape its column type promises.
///
/// Values that cannot be coerced are returned unchanged; NULL always passes through.
#[must_use]
pub fn normalize_value(value: RowValues, column_type: ColumnType) -> RowValues {
    match (column_type, value) {
        (_, RowValues::Null) => RowValues::Null,
        (ColumnType::Integer, RowValues::Text(s)) => match s.trim().parse::<i64>() {
            Ok(i) => RowValues::Int(i),
            Err(_) => RowValues::Text(s),
        },
        #[allow(clippy::cast_precision_loss)]
        (ColumnType::Float, RowValues::Int(i)) => RowValues::Float(i as f64),
        (ColumnType::Float, RowValues::Text(s)) => match s.trim().parse::<f64>() {
            Ok(f) => RowValues::Float(f),
            Err(_) => RowValues::Text(s),
        },
        (ColumnType::Bool, RowValues::Int(i)) => RowValues::Bool(i != 0),
        (ColumnType::Bool, RowValues::Text(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "1" | "t" | "true" => RowValues::Bool(true),
            "0" | "f" | "false" => RowValues::Bool(false),
            _ => RowValues::Text(s),
        },
        (
            ColumnType::DateTime | ColumnType::Date | ColumnType::UnixTimestamp,
            RowValues::Int(i),
        ) => from_unix(i).map_or(RowValues::Int(i), RowValues::Timestamp),
        (
            ColumnType::DateTime | ColumnType::Date | ColumnType::UnixTimestamp,
            RowValues::Text(s),
        ) => parse_date_time(&s).map_or(RowValues::Text(s), RowValues::Timestamp),
        (ColumnType::Json, RowValues::Text(s)) => match serde_json::from_str(&s) {
            Ok(json) => RowValues::JSON(json),
            Err(_) => RowValues::Text(s),
        },
        (ColumnType::Binary, RowValues::Text(s)) => RowValues::Blob(s.into_bytes()),
        (ColumnType::Text, RowValues::Int(i)) => RowValues::Text(i.to_string()),
        (ColumnType::Text, RowValues::Float(f)) => RowValues::Text(f.to_string()),
        (_, other) => other,
    }
}
