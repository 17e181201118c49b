//! Pipeline configuration.
//!
//! Every field has a default matching the Ostrava region study setup, so an empty
//! JSON object `{}` is a valid configuration. A config file only needs the
//! fields it overrides:
//! ```json
//! {
//!   "weather_api_key": "abc123",
//!   "live_acquisition": true,
//!   "lookback_days": 7
//! }
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const API_KEY_PLACEHOLDER: &str = "YOUR_WEATHER_API_KEY";

/// How the weather service expects its API key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WeatherAuth {
    /// API key appended as a URL query parameter with the given name.
    UrlParam { param_name: String },
    /// API key sent as an HTTP header with the given name.
    Header { header_name: String },
}

impl Default for WeatherAuth {
    fn default() -> Self {
        WeatherAuth::UrlParam {
            param_name: "key".to_string(),
        }
    }
}

/// One origin/destination pair queried on the timetable site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteSegment {
    pub from: String,
    pub to: String,
}

/// A station plotted on the map, linked to the route whose mean delay it
/// displays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Station {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub route: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub weather_api_key: String,
    pub weather_base_url: String,
    pub weather_auth: WeatherAuth,
    pub scrape_url: String,
    pub region_latitude: f64,
    pub region_longitude: f64,
    pub routes: Vec<RouteSegment>,
    pub stations: Vec<Station>,
    pub lookback_days: u32,
    /// Run the scraper and weather client instead of the fixed sample data.
    pub live_acquisition: bool,
    pub http_timeout_secs: u64,
    pub processed_dir: PathBuf,
    pub chart_dir: PathBuf,
    pub layer_dir: PathBuf,
    pub run_history: PathBuf,
    /// Polygon layer (shapefile or GeoJSON) used for the station spatial
    /// join. Built-in sample districts are used when unset.
    pub boundary_path: Option<PathBuf>,
    pub gzip_outputs: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            weather_api_key: API_KEY_PLACEHOLDER.to_string(),
            weather_base_url: "http://api.weather-service.com/history".to_string(),
            weather_auth: WeatherAuth::default(),
            scrape_url: "https://www.idos.cz/vlaky/spojeni/".to_string(),
            region_latitude: 49.8209,
            region_longitude: 18.2625,
            routes: vec![
                route("Ostrava hl.n.", "Frýdlant n.O."),
                route("Frýdlant n.O.", "Čeladná"),
                route("Čeladná", "Frenštát p.R."),
            ],
            stations: vec![
                station("Ostrava hl.n.", 49.8465, 18.2917, "Ostrava-Frenstat"),
                station("Frydlant n.O.", 49.6645, 18.3582, "Ostrava-Frydlant"),
                station("Celadna", 49.5760, 18.3615, "Ostrava-Frenstat"),
                station("Frenstat p.R.", 49.5601, 18.2140, "Ostrava-Frenstat"),
            ],
            lookback_days: 3,
            live_acquisition: false,
            http_timeout_secs: 30,
            processed_dir: PathBuf::from("data/processed"),
            chart_dir: PathBuf::from("data/charts"),
            layer_dir: PathBuf::from("docs/leaflet_layers"),
            run_history: PathBuf::from("data/run_history.csv"),
            boundary_path: None,
            gzip_outputs: false,
        }
    }
}

fn route(from: &str, to: &str) -> RouteSegment {
    RouteSegment {
        from: from.to_string(),
        to: to.to_string(),
    }
}

fn station(name: &str, latitude: f64, longitude: f64, route: &str) -> Station {
    Station {
        name: name.to_string(),
        latitude,
        longitude,
        route: route.to_string(),
    }
}

impl PipelineConfig {
    /// Loads the config from a JSON file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config: PipelineConfig = serde_json::from_str(&content)
            .with_context(|| format!("invalid config {}", path.display()))?;
        Ok(config)
    }

    /// Loads `path` when given, otherwise the defaults; then applies
    /// `WEATHER_API_KEY` from the environment if set.
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::load(p)?,
            None => Self::default(),
        };
        if let Ok(key) = std::env::var("WEATHER_API_KEY") {
            if !key.trim().is_empty() {
                config.weather_api_key = key;
            }
        }
        Ok(config)
    }

    pub fn has_weather_key(&self) -> bool {
        let key = self.weather_api_key.trim();
        !key.is_empty() && key != API_KEY_PLACEHOLDER
    }

    pub fn merged_csv_path(&self) -> PathBuf {
        self.processed_dir.join("final_merged_data.csv")
    }
}
