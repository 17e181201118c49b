//! Fixed delay and weather rows for line 323, used when live acquisition is
//! disabled or returns nothing.

use serde_json::json;

use crate::config::Station;
use crate::error::DataResult;
use crate::table::{DataType, Schema, Table, Value};

/// Eight raw delay rows over 15-18 January 2023.
pub fn sample_delays() -> DataResult<Table> {
    let rows = [
        ("R123", "2023-01-15 08:00:00", "2023-01-15 08:05:00", 5, "Ostrava-Frenstat"),
        ("EC456", "2023-01-15 10:30:00", "2023-01-15 10:30:00", 0, "Ostrava-Frydlant"),
        ("R123", "2023-01-16 08:00:00", "2023-01-16 08:10:00", 10, "Ostrava-Frenstat"),
        ("EC456", "2023-01-16 10:30:00", "2023-01-16 10:35:00", 5, "Ostrava-Frydlant"),
        ("R123", "2023-01-17 08:00:00", "2023-01-17 08:00:00", 0, "Ostrava-Frenstat"),
        ("R123", "2023-01-17 12:00:00", "2023-01-17 12:15:00", 15, "Ostrava-Frenstat"),
        ("EC456", "2023-01-18 09:00:00", "2023-01-18 09:02:00", 2, "Ostrava-Frydlant"),
        ("R123", "2023-01-18 14:00:00", "2023-01-18 14:20:00", 20, "Ostrava-Frenstat"),
    ];
    let rows: Vec<serde_json::Value> = rows
        .iter()
        .map(|(train, scheduled, actual, delay, route)| {
            json!({
                "train_id": train,
                "scheduled_time": scheduled,
                "actual_time": actual,
                "delay_minutes": delay,
                "route": route,
                "date": &scheduled[..10],
            })
        })
        .collect();
    Table::from_json_rows(&rows)
}

/// One raw weather row per day of [`sample_delays`].
pub fn sample_weather() -> DataResult<Table> {
    Table::from_json_rows(&[
        json!({"date": "2023-01-15", "temperature": 2.5, "humidity": 85, "wind_speed": 15, "precipitation": 0.5, "weather_condition": "cloudy"}),
        json!({"date": "2023-01-16", "temperature": -1.0, "humidity": 90, "wind_speed": 20, "precipitation": 2.0, "weather_condition": "snowy"}),
        json!({"date": "2023-01-17", "temperature": 5.0, "humidity": 70, "wind_speed": 10, "precipitation": 0.0, "weather_condition": "rainy"}),
        json!({"date": "2023-01-18", "temperature": 3.0, "humidity": 75, "wind_speed": 12, "precipitation": 0.0, "weather_condition": "partly cloudy"}),
    ])
}

/// Station rows with coordinates and the mean delay of their route.
///
/// `avg_delay` is the mean of `delay_minutes` over merged rows whose
/// `route` equals the station's route, and 0 when the route has no rows.
pub fn station_table(stations: &[Station], route_means: &[(Value, f64)]) -> DataResult<Table> {
    let mut table = Table::new(Schema::of(&[
        ("station_name", DataType::Text),
        ("latitude", DataType::Float),
        ("longitude", DataType::Float),
        ("route", DataType::Text),
        ("avg_delay", DataType::Float),
    ])?);
    for station in stations {
        let avg = route_means
            .iter()
            .find(|(route, _)| route.as_str() == Some(station.route.as_str()))
            .map(|(_, mean)| *mean)
            .unwrap_or(0.0);
        table.push_row(vec![
            Value::text(&station.name),
            Value::float(station.latitude),
            Value::float(station.longitude),
            Value::text(&station.route),
            Value::float(avg),
        ])?;
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;

    #[test]
    fn test_sample_shapes() {
        let delays = sample_delays().unwrap();
        assert_eq!(delays.len(), 8);
        assert_eq!(delays.dtype("delay_minutes"), Some(DataType::Int));
        assert_eq!(delays.value(7, "date"), Some(&Value::text("2023-01-18")));

        let weather = sample_weather().unwrap();
        assert_eq!(weather.len(), 4);
        assert_eq!(weather.value(1, "weather_condition"), Some(&Value::text("snowy")));
    }

    #[test]
    fn test_station_table_uses_route_means() {
        let config = PipelineConfig::default();
        let means = vec![(Value::text("Ostrava-Frenstat"), 10.0)];
        let table = station_table(&config.stations, &means).unwrap();

        assert_eq!(table.len(), 4);
        assert_eq!(table.value(0, "avg_delay"), Some(&Value::Float(10.0)));
        // no rows for the Frydlant route
        assert_eq!(table.value(1, "avg_delay"), Some(&Value::Float(0.0)));
    }
}
