//! Cleaning and merging of raw delay and weather tables.
//!
//! Null handling is an explicit per-field policy:
//!
//! | table   | field                         | on null / unparsable         |
//! |---------|-------------------------------|------------------------------|
//! | delays  | `delay_minutes`               | filled with `0`              |
//! | delays  | `scheduled_time`, `actual_time`, `date` | kept as null, row kept |
//! | weather | any column (default)          | row dropped                  |
//! | weather | coerced columns only (opt-in) | row dropped                  |

use chrono::{Datelike, Timelike};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info, warn};

use crate::error::{DataError, DataResult};
use crate::table::{DataType, Field, Schema, Table, Value, coerce};

pub const DEFAULT_MERGE_KEY: &str = "date";

const DELAY_TIMESTAMP_COLUMNS: &[&str] = &["scheduled_time", "actual_time"];
const WEATHER_NUMERIC_COLUMNS: &[&str] = &["temperature", "humidity", "wind_speed", "precipitation"];

/// Which weather rows are discarded after type coercion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeatherNullPolicy {
    /// Drop a row holding a null in any column.
    #[default]
    AnyColumn,
    /// Drop a row only when a coerced column (`date` or a numeric field)
    /// is null.
    CoercedColumns,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinKind {
    Inner,
    #[default]
    Left,
    Right,
    Outer,
}

/// Cleans raw train delay rows.
///
/// Coerces `delay_minutes` to numbers (unparsable → 0), the two time columns
/// to timestamps and `date` to a date, removes exact duplicates, then
/// derives `day_of_week` (Monday = 0) and `hour_of_day` from
/// `scheduled_time`. Missing columns are logged and skipped.
#[tracing::instrument(skip(raw), fields(rows = raw.len()))]
pub fn clean_train_delays(raw: &Table) -> Table {
    let mut df = raw.clone();

    if df.has_column("delay_minutes") {
        coerce_column(&mut df, "delay_minutes", DataType::Float, coerce::to_numeric);
        coerce_column(&mut df, "delay_minutes", DataType::Float, |v| {
            if v.is_null() { Value::Float(0.0) } else { v.clone() }
        });
    } else {
        warn!(column = "delay_minutes", "Column not found for type conversion in train delays");
    }
    for name in DELAY_TIMESTAMP_COLUMNS {
        if df.has_column(name) {
            coerce_column(&mut df, name, DataType::Timestamp, coerce::to_timestamp);
        } else {
            warn!(column = name, "Column not found for type conversion in train delays");
        }
    }
    if df.has_column("date") {
        coerce_column(&mut df, "date", DataType::Date, coerce::to_date);
    } else {
        warn!(column = "date", "Column not found for type conversion in train delays");
    }

    let removed = df.drop_duplicates();
    if removed > 0 {
        debug!(removed, "Duplicate delay rows removed");
    }

    if let Ok(times) = df.timestamps("scheduled_time") {
        let dow = times
            .iter()
            .map(|t| Value::from(t.map(|t| t.weekday().num_days_from_monday() as i64)))
            .collect();
        let hour = times
            .iter()
            .map(|t| Value::from(t.map(|t| t.hour() as i64)))
            .collect();
        // lengths match the table, so these cannot fail
        let _ = df.set_column("day_of_week", DataType::Int, dow);
        let _ = df.set_column("hour_of_day", DataType::Int, hour);
    }

    info!(input = raw.len(), output = df.len(), "Train delays cleaned");
    df
}

/// Cleans raw weather rows using the default [`WeatherNullPolicy::AnyColumn`].
pub fn clean_weather_data(raw: &Table) -> Table {
    clean_weather_data_with(raw, WeatherNullPolicy::default())
}

/// Cleans raw weather rows: numeric fields and `date` are coerced
/// (unparsable → null), then rows are dropped according to `policy`.
#[tracing::instrument(skip(raw), fields(rows = raw.len()))]
pub fn clean_weather_data_with(raw: &Table, policy: WeatherNullPolicy) -> Table {
    let mut df = raw.clone();

    for name in WEATHER_NUMERIC_COLUMNS {
        if df.has_column(name) {
            coerce_column(&mut df, name, DataType::Float, coerce::to_numeric);
        } else {
            warn!(column = name, "Column not found for type conversion in weather data");
        }
    }
    if df.has_column("date") {
        coerce_column(&mut df, "date", DataType::Date, coerce::to_date);
    } else {
        warn!(column = "date", "Column not found for type conversion in weather data");
    }

    let dropped = match policy {
        WeatherNullPolicy::AnyColumn => df.drop_nulls(None),
        WeatherNullPolicy::CoercedColumns => {
            let mut cols: Vec<&str> = WEATHER_NUMERIC_COLUMNS.to_vec();
            cols.push("date");
            df.drop_nulls(Some(&cols))
        }
    };
    if dropped > 0 {
        warn!(dropped, ?policy, "Weather rows with missing values dropped");
    }

    info!(input = raw.len(), output = df.len(), "Weather data cleaned");
    df
}

fn coerce_column<F>(df: &mut Table, name: &str, dtype: DataType, f: F)
where
    F: Fn(&Value) -> Value,
{
    if let Err(e) = df.map_column(name, dtype, f) {
        warn!(column = name, error = %e, "Type conversion failed");
    }
}

/// Joins `left` and `right` on `key`.
///
/// Overlapping non-key columns are suffixed `_x` (left) and `_y` (right).
/// Null keys never match. Row order follows the driving side: left rows
/// for inner/left/outer (outer then appends unmatched right rows), right
/// rows for a right join.
#[tracing::instrument(skip(left, right), fields(left_rows = left.len(), right_rows = right.len()))]
pub fn merge_data(left: &Table, right: &Table, key: &str, how: JoinKind) -> DataResult<Table> {
    let lk = left.require_column(key)?;
    let rk = right.require_column(key)?;

    let left_type = left.schema().field(lk).dtype;
    let right_type = right.schema().field(rk).dtype;
    let key_type = if left_type == right_type {
        left_type
    } else if left_type.is_temporal() && right_type.is_temporal() {
        DataType::Timestamp
    } else if left_type.is_numeric() && right_type.is_numeric() {
        DataType::Float
    } else {
        return Err(DataError::InvalidArgument(format!(
            "cannot join '{key}' of type {left_type} with {right_type}"
        )));
    };

    // output schema: key, left non-key, right non-key
    let right_cols: Vec<usize> = (0..right.width()).filter(|&i| i != rk).collect();
    let left_cols: Vec<usize> = (0..left.width()).filter(|&i| i != lk).collect();
    let left_names: Vec<&str> = left_cols.iter().map(|&i| left.schema().field(i).name.as_str()).collect();
    let right_names: Vec<&str> = right_cols.iter().map(|&i| right.schema().field(i).name.as_str()).collect();

    let mut fields = vec![Field::new(key, key_type)];
    for &i in &left_cols {
        let f = left.schema().field(i);
        let name = if right_names.contains(&f.name.as_str()) {
            format!("{}_x", f.name)
        } else {
            f.name.clone()
        };
        fields.push(Field::new(name, f.dtype));
    }
    for &i in &right_cols {
        let f = right.schema().field(i);
        let name = if left_names.contains(&f.name.as_str()) {
            format!("{}_y", f.name)
        } else {
            f.name.clone()
        };
        fields.push(Field::new(name, f.dtype));
    }
    let mut out = Table::new(Schema::new(fields)?);

    let index = |t: &Table, k: usize| {
        let mut map: HashMap<String, Vec<usize>> = HashMap::new();
        for (i, row) in t.rows().iter().enumerate() {
            if let Some(jk) = row[k].join_key() {
                map.entry(jk).or_default().push(i);
            }
        }
        map
    };

    let build = |key_value: &Value, l: Option<usize>, r: Option<usize>| -> Vec<Value> {
        let mut row = Vec::with_capacity(1 + left_cols.len() + right_cols.len());
        row.push(key_value.clone());
        for &i in &left_cols {
            row.push(l.map(|l| left.get(l, i).clone()).unwrap_or_default());
        }
        for &i in &right_cols {
            row.push(r.map(|r| right.get(r, i).clone()).unwrap_or_default());
        }
        row
    };

    match how {
        JoinKind::Right => {
            let left_index = index(left, lk);
            for (ri, row) in right.rows().iter().enumerate() {
                let matches = row[rk].join_key().and_then(|jk| left_index.get(&jk));
                match matches {
                    Some(ls) => {
                        for &li in ls {
                            out.push_row(build(&row[rk], Some(li), Some(ri)))?;
                        }
                    }
                    None => out.push_row(build(&row[rk], None, Some(ri)))?,
                }
            }
        }
        JoinKind::Inner | JoinKind::Left | JoinKind::Outer => {
            let right_index = index(right, rk);
            let mut right_used = vec![false; right.len()];
            for (li, row) in left.rows().iter().enumerate() {
                let matches = row[lk].join_key().and_then(|jk| right_index.get(&jk));
                match matches {
                    Some(rs) => {
                        for &ri in rs {
                            right_used[ri] = true;
                            out.push_row(build(&row[lk], Some(li), Some(ri)))?;
                        }
                    }
                    None if how != JoinKind::Inner => {
                        out.push_row(build(&row[lk], Some(li), None))?;
                    }
                    None => {}
                }
            }
            if how == JoinKind::Outer {
                for (ri, used) in right_used.iter().enumerate() {
                    if !used {
                        out.push_row(build(right.get(ri, rk), None, Some(ri)))?;
                    }
                }
            }
        }
    }

    info!(?how, key, rows = out.len(), "Tables merged");
    Ok(out)
}

/// Number of rows in a merged table whose weather columns are all null.
pub fn unmatched_rows(merged: &Table, weather_columns: &[&str]) -> usize {
    let idxs: Vec<usize> = weather_columns
        .iter()
        .filter_map(|c| merged.column_index(c))
        .collect();
    if idxs.is_empty() {
        return merged.len();
    }
    merged
        .rows()
        .iter()
        .filter(|row| idxs.iter().all(|&i| row[i].is_null()))
        .count()
}
