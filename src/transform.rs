use chrono::{DateTime, NaiveDate, NaiveDateTime};
use std::cmp::Ordering;

use crate::data::{Dataset, Value};

/// Date-time layouts accepted when coercing text cells
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d.%m.%Y", "%Y%m%d"];

/// Copy of `data` with rows ordered by `column` descending.
///
/// The sort is stable; nulls go last.
pub fn sort_descending(data: &Dataset, column: &str) -> Dataset {
    let Some(col) = data.column(column) else {
        return data.clone();
    };

    let mut order: Vec<usize> = (0..col.values.len()).collect();
    order.sort_by(|&a, &b| nulls_last(&col.values[a], &col.values[b], |x, y| compare_values(y, x)));
    data.take_rows(&order)
}

/// Try to reorder `data` chronologically by `column`.
///
/// On success returns a copy sorted ascending by the parsed instant, with the
/// column's cells replaced by date-times. If any non-null cell cannot be read
/// as a date, returns that cell untouched as the error.
pub fn sort_chronological(data: &Dataset, column: &str) -> Result<Dataset, Value> {
    let Some(col) = data.column(column) else {
        return Ok(data.clone());
    };

    let coerced = col
        .values
        .iter()
        .map(|value| match value {
            Value::Null => Ok(Value::Null),
            other => coerce_datetime(other).map(Value::DateTime).ok_or_else(|| other.clone()),
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut order: Vec<usize> = (0..coerced.len()).collect();
    order.sort_by(|&a, &b| nulls_last(&coerced[a], &coerced[b], compare_values));

    let converted = data.with_column_values(column, coerced);
    Ok(converted.take_rows(&order))
}

/// Interpret a cell as a date-time. Numbers are never treated as timestamps.
pub fn coerce_datetime(value: &Value) -> Option<NaiveDateTime> {
    match value {
        Value::DateTime(dt) => Some(*dt),
        Value::Text(s) => parse_datetime(s.trim()),
        Value::Number(_) | Value::Null => None,
    }
}

fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_utc());
    }
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Some(dt);
        }
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            return date.and_hms_opt(0, 0, 0);
        }
    }
    // Year-month, e.g. "2024-03"
    NaiveDate::parse_from_str(&format!("{}-01", text), "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

fn nulls_last(a: &Value, b: &Value, cmp: impl Fn(&Value, &Value) -> Ordering) -> Ordering {
    match (a.is_null(), b.is_null()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => cmp(a, b),
    }
}

/// Ascending order between two non-null cells.
/// Numbers sort before dates, dates before text.
fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.partial_cmp(y).unwrap_or(Ordering::Equal),
        (Value::DateTime(x), Value::DateTime(y)) => x.cmp(y),
        (Value::Text(x), Value::Text(y)) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

fn rank(value: &Value) -> u8 {
    match value {
        Value::Number(_) => 0,
        Value::DateTime(_) => 1,
        Value::Text(_) => 2,
        Value::Null => 3,
    }
}
