//! Statistical analysis of merged delay/weather tables.
//!
//! Every function validates its columns first and reports problems as a
//! [`DataError`](crate::error::DataError); none of them panic on missing or
//! mistyped columns.

pub mod correlation;
pub mod describe;
pub mod group;
pub mod resample;
pub mod ttest;
pub mod types;
pub mod utility;

pub use correlation::{correlation, correlation_matrix};
pub use describe::descriptive_statistics;
pub use group::group_mean;
pub use resample::aggregate_by_time;
pub use ttest::t_test;
pub use types::{
    AggSpec, AggregateResult, Aggregation, CorrelationMatrix, CorrelationMethod, Frequency,
    Summary, TTestResult, Variance,
};

use crate::error::DataResult;
use crate::table::Table;

/// Non-null values of a numeric column.
pub(crate) fn numeric_values(table: &Table, column: &str) -> DataResult<Vec<f64>> {
    Ok(table.floats(column)?.into_iter().flatten().collect())
}

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::table::Table;
    use serde_json::json;

    /// Six merged rows over three days, two of them snowy.
    pub fn six_rows() -> Table {
        let mut table = Table::from_json_rows(&[
            json!({"scheduled_time": "2023-01-15 08:00:00", "delay_minutes": 5.0, "weather_condition": "cloudy", "temperature": 2.5, "humidity": 85.0, "route": "Ostrava-Frenstat"}),
            json!({"scheduled_time": "2023-01-15 10:30:00", "delay_minutes": 0.0, "weather_condition": "sunny", "temperature": 3.0, "humidity": 80.0, "route": "Ostrava-Frydlant"}),
            json!({"scheduled_time": "2023-01-16 08:00:00", "delay_minutes": 10.0, "weather_condition": "snowy", "temperature": -1.0, "humidity": 90.0, "route": "Ostrava-Frenstat"}),
            json!({"scheduled_time": "2023-01-16 10:30:00", "delay_minutes": 5.0, "weather_condition": "snowy", "temperature": 0.0, "humidity": 92.0, "route": "Ostrava-Frydlant"}),
            json!({"scheduled_time": "2023-01-17 08:00:00", "delay_minutes": 0.0, "weather_condition": "rainy", "temperature": 5.0, "humidity": 70.0, "route": "Ostrava-Frenstat"}),
            json!({"scheduled_time": "2023-01-17 12:00:00", "delay_minutes": 15.0, "weather_condition": "rainy", "temperature": 6.0, "humidity": 75.0, "route": "Ostrava-Frydlant"}),
        ])
        .unwrap();
        table
            .map_column(
                "scheduled_time",
                crate::table::DataType::Timestamp,
                crate::table::coerce::to_timestamp,
            )
            .unwrap();
        table
    }
}
