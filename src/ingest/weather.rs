use anyhow::Result;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::config::{PipelineConfig, WeatherAuth};
use crate::fetch::auth::{ApiKey, UrlParam};
use crate::fetch::{BasicClient, HttpClient, fetch_json};

/// One day of weather as reported by the weather service.
///
/// Field names follow the cleaned weather table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeatherObservation {
    pub date: Option<String>,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub wind_speed: Option<f64>,
    pub precipitation: Option<f64>,
    pub weather_condition: Option<String>,
}

impl WeatherObservation {
    /// Flattens a weather response into an observation.
    ///
    /// Fields are read from the top-level object or from a nested `data`
    /// object. `date` falls back to the requested date when the response
    /// does not carry one.
    pub fn from_json(value: &serde_json::Value, requested: NaiveDate) -> Self {
        let body = match value.get("data") {
            Some(inner) if inner.is_object() => inner,
            _ => value,
        };
        WeatherObservation {
            date: pick_str(body, &["date"])
                .or_else(|| Some(requested.format("%Y-%m-%d").to_string())),
            temperature: pick_f64(body, &["temperature", "temp", "temp_c", "avgtemp_c"]),
            humidity: pick_f64(body, &["humidity", "avghumidity", "relative_humidity"]),
            wind_speed: pick_f64(body, &["wind_speed", "wind", "wind_kph", "maxwind_kph"]),
            precipitation: pick_f64(
                body,
                &["precipitation", "precip", "precip_mm", "totalprecip_mm"],
            ),
            weather_condition: pick_str(
                body,
                &["weather_condition", "condition", "weather", "summary"],
            ),
        }
    }

    /// Raw weather row suitable for [`Table::from_json_rows`](crate::table::Table::from_json_rows).
    pub fn to_json_row(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

fn pick_f64(body: &serde_json::Value, keys: &[&str]) -> Option<f64> {
    keys.iter().find_map(|k| match body.get(*k)? {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

/// Strings are taken as-is; objects such as `{"text": "Light snow"}`
/// contribute their `text` member.
fn pick_str(body: &serde_json::Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| match body.get(*k)? {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Object(o) => o.get("text")?.as_str().map(str::to_string),
        _ => None,
    })
}

/// Builds an HTTP client that attaches the configured API key.
pub fn weather_client(config: &PipelineConfig) -> Result<Box<dyn HttpClient>> {
    let base = BasicClient::with_timeout(Duration::from_secs(config.http_timeout_secs))?;
    let client: Box<dyn HttpClient> = match &config.weather_auth {
        WeatherAuth::UrlParam { param_name } => Box::new(UrlParam::new(base, param_name, &config.weather_api_key)),
        WeatherAuth::Header { header_name } => {
            Box::new(ApiKey::new(base, header_name, &config.weather_api_key)?)
        }
    };
    Ok(client)
}

/// Fetches historical weather for the configured region on `date`.
#[tracing::instrument(skip(client, config), fields(lat = config.region_latitude, lon = config.region_longitude))]
pub async fn fetch_weather<C: HttpClient + ?Sized>(
    client: &C,
    config: &PipelineConfig,
    date: NaiveDate,
) -> Result<serde_json::Value> {
    let query = [
        ("lat", config.region_latitude.to_string()),
        ("lon", config.region_longitude.to_string()),
        ("date", date.format("%Y-%m-%d").to_string()),
        ("units", "metric".to_string()),
    ];
    let json = fetch_json(client, &config.weather_base_url, &query).await?;
    debug!("Weather response decoded");
    Ok(json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, 1, 16).unwrap()
    }

    #[test]
    fn test_from_json_top_level_with_aliases() {
        let obs = WeatherObservation::from_json(
            &json!({"temp": -1.0, "humidity": 90, "wind": 20, "precip": 2.0, "condition": "snowy"}),
            day(),
        );
        assert_eq!(obs.temperature, Some(-1.0));
        assert_eq!(obs.humidity, Some(90.0));
        assert_eq!(obs.wind_speed, Some(20.0));
        assert_eq!(obs.precipitation, Some(2.0));
        assert_eq!(obs.weather_condition.as_deref(), Some("snowy"));
        assert_eq!(obs.date.as_deref(), Some("2023-01-16"));
    }

    #[test]
    fn test_from_json_nested_data_and_condition_text() {
        let obs = WeatherObservation::from_json(
            &json!({"data": {"date": "2023-01-15", "temperature": 2.5,
                             "condition": {"text": "cloudy"}}}),
            day(),
        );
        assert_eq!(obs.date.as_deref(), Some("2023-01-15"));
        assert_eq!(obs.temperature, Some(2.5));
        assert_eq!(obs.weather_condition.as_deref(), Some("cloudy"));
        assert_eq!(obs.humidity, None);
    }

    #[test]
    fn test_to_json_row_has_weather_columns() {
        let row = WeatherObservation::from_json(&json!({}), day()).to_json_row();
        let obj = row.as_object().unwrap();
        for key in ["date", "temperature", "humidity", "wind_speed", "precipitation", "weather_condition"] {
            assert!(obj.contains_key(key), "missing {key}");
        }
    }

    #[test]
    fn test_weather_client_header_auth() {
        let config = PipelineConfig {
            weather_auth: WeatherAuth::Header {
                header_name: "X-Api-Key".to_string(),
            },
            weather_api_key: "abc".to_string(),
            ..PipelineConfig::default()
        };
        assert!(weather_client(&config).is_ok());
    }
}
