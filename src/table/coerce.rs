//! Lenient conversions used when cleaning raw tables.
//!
//! Each coercion maps an arbitrary cell to the target type or to `Null`
//! when the cell cannot be interpreted. None of them fail.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use super::Value;

const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%d.%m.%Y %H:%M:%S",
    "%d.%m.%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d.%m.%Y", "%Y/%m/%d"];

pub fn parse_number(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.naive_utc());
    }
    for fmt in TIMESTAMP_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Some(ts);
        }
    }
    parse_date_only(trimmed).and_then(|d| d.and_hms_opt(0, 0, 0))
}

fn parse_date_only(s: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Some(d) = parse_date_only(trimmed) {
        return Some(d);
    }
    // Full timestamps are accepted and truncated to their calendar date.
    if trimmed.len() > 10 {
        return parse_timestamp(trimmed).map(|ts| ts.date());
    }
    None
}

pub fn to_numeric(v: &Value) -> Value {
    match v {
        Value::Int(i) => Value::Float(*i as f64),
        Value::Float(f) => Value::float(*f),
        Value::Bool(b) => Value::Float(if *b { 1.0 } else { 0.0 }),
        Value::Text(s) => parse_number(s).map(Value::Float).unwrap_or(Value::Null),
        _ => Value::Null,
    }
}

pub fn to_timestamp(v: &Value) -> Value {
    match v {
        Value::Timestamp(_) | Value::Date(_) => v.as_timestamp().into(),
        Value::Text(s) => parse_timestamp(s).into(),
        _ => Value::Null,
    }
}

pub fn to_date(v: &Value) -> Value {
    match v {
        Value::Date(_) | Value::Timestamp(_) => v.as_date().into(),
        Value::Text(s) => parse_date(s).into(),
        _ => Value::Null,
    }
}
