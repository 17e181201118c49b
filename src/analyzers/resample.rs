use chrono::NaiveDateTime;
use std::collections::BTreeMap;
use tracing::debug;

use super::types::{AggSpec, Aggregation, Frequency};
use super::utility::{mean, median, sample_std};
use crate::error::{DataError, DataResult};
use crate::table::{DataType, Field, Schema, Table, Value};

/// Buckets `value_column` by fixed-width intervals of `time_column` and
/// reduces each bucket.
///
/// Buckets are anchored at midnight of the earliest timestamp and run
/// contiguously up to the last populated one. The output holds the bucket
/// start in `time_column` followed by either `value_column` (single
/// aggregation) or one column per named aggregation. Empty buckets give
/// null for mean, min, max, median and std, and 0 for sum and count.
#[tracing::instrument(skip(table, aggregation))]
pub fn aggregate_by_time(
    table: &Table,
    time_column: &str,
    value_column: &str,
    frequency: Frequency,
    aggregation: impl Into<AggSpec>,
) -> DataResult<Table> {
    let step = frequency.validate()?.seconds();
    let t = table.require_temporal(time_column)?;
    let v = table.require_numeric(value_column)?;

    let outputs: Vec<(String, Aggregation)> = match aggregation.into() {
        AggSpec::Single(agg) => vec![(value_column.to_string(), agg)],
        AggSpec::Named(list) if list.is_empty() => {
            return Err(DataError::InvalidArgument(
                "at least one aggregation is required".to_string(),
            ));
        }
        AggSpec::Named(list) => list,
    };

    let mut fields = vec![Field::new(time_column, DataType::Timestamp)];
    fields.extend(outputs.iter().map(|(name, agg)| Field::new(name.clone(), agg.output_type())));
    let mut out = Table::new(Schema::new(fields)?);

    let observations: Vec<(NaiveDateTime, Option<f64>)> = table
        .rows()
        .iter()
        .filter_map(|row| Some((row[t].as_timestamp()?, row[v].as_f64())))
        .collect();
    let Some(first) = observations.iter().map(|(ts, _)| *ts).min() else {
        return Ok(out);
    };

    let origin = first.date().and_time(chrono::NaiveTime::MIN);
    let bucket_of = |ts: NaiveDateTime| (ts - origin).num_seconds().div_euclid(step);

    let mut buckets: BTreeMap<i64, Vec<f64>> = BTreeMap::new();
    for (ts, value) in &observations {
        let entry = buckets.entry(bucket_of(*ts)).or_default();
        if let Some(value) = value {
            entry.push(*value);
        }
    }
    let (Some(&lo), Some(&hi)) = (buckets.keys().next(), buckets.keys().next_back()) else {
        return Ok(out);
    };

    for idx in lo..=hi {
        let values = buckets.get(&idx).map(Vec::as_slice).unwrap_or(&[]);
        let start = origin + chrono::Duration::seconds(idx * step);
        let mut row = vec![Value::Timestamp(start)];
        row.extend(outputs.iter().map(|(_, agg)| reduce(values, *agg)));
        out.push_row(row)?;
    }

    debug!(buckets = out.len(), "Time aggregation complete");
    Ok(out)
}

fn reduce(values: &[f64], agg: Aggregation) -> Value {
    match agg {
        Aggregation::Count => Value::Int(values.len() as i64),
        Aggregation::Sum => Value::float(values.iter().sum()),
        Aggregation::Mean => mean(values).into(),
        Aggregation::Median => median(values).into(),
        Aggregation::Std => sample_std(values).into(),
        Aggregation::Min => values.iter().copied().reduce(f64::min).into(),
        Aggregation::Max => values.iter().copied().reduce(f64::max).into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::fixtures::six_rows;
    use crate::table::coerce::parse_timestamp;

    fn ts(s: &str) -> Value {
        Value::Timestamp(parse_timestamp(s).unwrap())
    }

    #[test]
    fn test_daily_mean_one_row_per_date() {
        let out = aggregate_by_time(
            &six_rows(),
            "scheduled_time",
            "delay_minutes",
            "D".parse().unwrap(),
            Aggregation::Mean,
        )
        .unwrap();

        assert_eq!(out.column_names(), vec!["scheduled_time", "delay_minutes"]);
        assert_eq!(out.len(), 3);
        assert_eq!(out.value(0, "scheduled_time"), Some(&ts("2023-01-15")));
        assert_eq!(out.value(0, "delay_minutes"), Some(&Value::Float(2.5)));
        assert_eq!(out.value(1, "delay_minutes"), Some(&Value::Float(7.5)));
        assert_eq!(out.value(2, "delay_minutes"), Some(&Value::Float(7.5)));
    }

    #[test]
    fn test_hourly_buckets_are_contiguous() {
        let out = aggregate_by_time(
            &six_rows().head(2),
            "scheduled_time",
            "delay_minutes",
            Frequency::hours(1),
            AggSpec::Named(vec![
                ("n".to_string(), Aggregation::Count),
                ("total".to_string(), Aggregation::Sum),
                ("avg".to_string(), Aggregation::Mean),
            ]),
        )
        .unwrap();

        // 08:00, 09:00, 10:00
        assert_eq!(out.len(), 3);
        assert_eq!(out.value(0, "scheduled_time"), Some(&ts("2023-01-15 08:00:00")));
        assert_eq!(out.value(1, "n"), Some(&Value::Int(0)));
        assert_eq!(out.value(1, "total"), Some(&Value::Float(0.0)));
        assert_eq!(out.value(1, "avg"), Some(&Value::Null));
        assert_eq!(out.value(2, "scheduled_time"), Some(&ts("2023-01-15 10:00:00")));
        assert_eq!(out.value(2, "n"), Some(&Value::Int(1)));
    }

    #[test]
    fn test_aggregate_rejects_wrong_types() {
        let t = six_rows();
        assert!(matches!(
            aggregate_by_time(&t, "delay_minutes", "delay_minutes", Frequency::days(1), Aggregation::Mean),
            Err(DataError::WrongType { .. })
        ));
        assert!(matches!(
            aggregate_by_time(&t, "scheduled_time", "route", Frequency::days(1), Aggregation::Mean),
            Err(DataError::WrongType { .. })
        ));
        assert_eq!(
            aggregate_by_time(&t, "date", "delay_minutes", Frequency::days(1), Aggregation::Mean),
            Err(DataError::MissingColumn("date".to_string()))
        );
    }

    #[test]
    fn test_non_positive_frequency_is_rejected() {
        for frequency in [Frequency::hours(0), Frequency::days(-1)] {
            assert!(matches!(
                aggregate_by_time(&six_rows(), "scheduled_time", "delay_minutes", frequency, Aggregation::Mean),
                Err(DataError::InvalidArgument(_))
            ));
        }
    }

    #[test]
    fn test_empty_table_gives_empty_result() {
        let out = aggregate_by_time(
            &six_rows().head(0),
            "scheduled_time",
            "delay_minutes",
            Frequency::days(1),
            Aggregation::Max,
        )
        .unwrap();
        assert!(out.is_empty());
        assert_eq!(out.width(), 2);
    }
}
