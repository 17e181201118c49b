use tracing::debug;

use super::numeric_values;
use super::types::Summary;
use super::utility::{mean, quantile_sorted, sample_std, sorted};
use crate::error::DataResult;
use crate::table::Table;

/// Count, mean, sample std, min, quartiles and max of the non-null values of
/// a numeric column. A column without values gives a zero count and NaN
/// statistics.
pub fn descriptive_statistics(table: &Table, column: &str) -> DataResult<Summary> {
    let values = sorted(&numeric_values(table, column)?);
    let quartile = |q| quantile_sorted(&values, q).unwrap_or(f64::NAN);
    let summary = Summary {
        column: column.to_string(),
        count: values.len(),
        mean: mean(&values).unwrap_or(f64::NAN),
        std: sample_std(&values),
        min: values.first().copied().unwrap_or(f64::NAN),
        q25: quartile(0.25),
        median: quartile(0.5),
        q75: quartile(0.75),
        max: values.last().copied().unwrap_or(f64::NAN),
    };
    debug!(column, count = summary.count, mean = summary.mean, "Descriptive statistics");
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::fixtures::six_rows;
    use crate::error::DataError;
    use serde_json::json;

    #[test]
    fn test_describe_delays() {
        let s = descriptive_statistics(&six_rows(), "delay_minutes").unwrap();
        assert_eq!(s.count(), 6);
        assert!((s.mean() - 35.0 / 6.0).abs() < 1e-12);
        assert_eq!(s.min(), 0.0);
        assert_eq!(s.median(), 5.0);
        assert_eq!(s.max(), 15.0);
        assert_eq!(s.q25, 1.25);
        assert_eq!(s.q75, 8.75);
        assert!((s.std().unwrap() - 5.845_226).abs() < 1e-5);
    }

    #[test]
    fn test_describe_missing_or_text_column() {
        let t = six_rows();
        assert_eq!(
            descriptive_statistics(&t, "wind_speed"),
            Err(DataError::MissingColumn("wind_speed".to_string()))
        );
        assert!(matches!(
            descriptive_statistics(&t, "route"),
            Err(DataError::WrongType { .. })
        ));
    }

    #[test]
    fn test_describe_single_and_all_null() {
        let t = Table::from_json_rows(&[json!({"x": 4.0}), json!({"x": null})]).unwrap();
        let s = descriptive_statistics(&t, "x").unwrap();
        assert_eq!(s.count(), 1);
        assert_eq!(s.std(), None);

        let nulls = Table::from_json_rows(&[json!({"x": 1.0}), json!({"x": null})])
            .unwrap()
            .take_rows(&[1]);
        let s = descriptive_statistics(&nulls, "x").unwrap();
        assert_eq!(s.count(), 0);
        assert!(s.mean().is_nan() && s.min().is_nan() && s.max().is_nan());
        assert_eq!(s.std(), None);
        assert_eq!(s.rows()[0], ("count", Some(0.0)));
        assert!(s.rows()[1..].iter().all(|(_, v)| v.is_none()));
    }
}
