use std::cmp::Ordering;
use std::collections::HashMap;

use super::types::AggregateResult;
use crate::error::DataResult;
use crate::table::{Table, Value};

/// Mean of `value_column` for each distinct non-null `key_column` value.
/// Rows with a null value are skipped; groups come back sorted by key.
pub fn group_mean(table: &Table, key_column: &str, value_column: &str) -> DataResult<AggregateResult> {
    let k = table.require_column(key_column)?;
    let v = table.require_numeric(value_column)?;

    let mut order: Vec<Value> = Vec::new();
    let mut sums: HashMap<String, (f64, usize)> = HashMap::new();
    for row in table.rows() {
        let (Some(jk), Some(value)) = (row[k].join_key(), row[v].as_f64()) else {
            continue;
        };
        let entry = sums.entry(jk).or_insert_with(|| {
            order.push(row[k].clone());
            (0.0, 0)
        });
        entry.0 += value;
        entry.1 += 1;
    }

    let mut groups: Vec<(Value, f64)> = order
        .into_iter()
        .filter_map(|key| {
            let (sum, n) = sums.get(&key.join_key()?)?;
            Some((key, sum / *n as f64))
        })
        .collect();
    groups.sort_by(|(a, _), (b, _)| compare_values(a, b));

    Ok(AggregateResult {
        key_column: key_column.to_string(),
        value_column: value_column.to_string(),
        groups,
    })
}

/// Orders numbers numerically, temporals chronologically, anything else by
/// its text form.
pub(crate) fn compare_values(a: &Value, b: &Value) -> Ordering {
    if let (Some(x), Some(y)) = (a.as_f64(), b.as_f64()) {
        return x.partial_cmp(&y).unwrap_or(Ordering::Equal);
    }
    if let (Some(x), Some(y)) = (a.as_timestamp(), b.as_timestamp()) {
        return x.cmp(&y);
    }
    a.to_string().cmp(&b.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::fixtures::six_rows;
    use crate::error::DataError;

    #[test]
    fn test_group_mean_by_condition() {
        let r = group_mean(&six_rows(), "weather_condition", "delay_minutes").unwrap();
        let keys: Vec<String> = r.groups().iter().map(|(k, _)| k.to_string()).collect();
        assert_eq!(keys, vec!["cloudy", "rainy", "snowy", "sunny"]);
        assert_eq!(r.get(&Value::text("snowy")), Some(7.5));
        assert_eq!(r.get(&Value::text("rainy")), Some(7.5));
        assert_eq!(r.get(&Value::text("sunny")), Some(0.0));
    }

    #[test]
    fn test_group_mean_by_route() {
        let r = group_mean(&six_rows(), "route", "delay_minutes").unwrap();
        assert_eq!(r.len(), 2);
        assert_eq!(r.get(&Value::text("Ostrava-Frenstat")), Some(5.0));
        assert_eq!(r.get(&Value::text("Ostrava-Frydlant")), Some(20.0 / 3.0));
    }

    #[test]
    fn test_group_mean_missing_columns() {
        assert_eq!(
            group_mean(&six_rows(), "station", "delay_minutes"),
            Err(DataError::MissingColumn("station".to_string()))
        );
    }
}
