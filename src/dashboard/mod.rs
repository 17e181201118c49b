//! HTTP dashboard over the results of a pipeline run.
//!
//! Routes: `/` overview, `/analysis`, `/map`, `/config` (GET form, POST
//! stores the weather API key in memory), `/api/merged`,
//! `/api/stations.geojson` and `/health`.

pub mod pages;

use anyhow::Result;
use axum::extract::{Form, State};
use axum::http::{StatusCode, header};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::RwLock;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::config::PipelineConfig;
use crate::pipeline::PipelineReport;
use crate::spatial::to_geojson;

/// What the dashboard serves: the latest report and the live config.
#[derive(Debug, Clone)]
pub struct DashboardData {
    pub report: Option<PipelineReport>,
    pub config: PipelineConfig,
}

#[derive(Clone)]
pub struct DashboardState {
    pub data: Arc<RwLock<DashboardData>>,
}

impl DashboardState {
    pub fn new(config: PipelineConfig, report: Option<PipelineReport>) -> Self {
        DashboardState {
            data: Arc::new(RwLock::new(DashboardData { report, config })),
        }
    }
}

pub fn router(state: DashboardState) -> Router {
    Router::new()
        .route("/", get(overview))
        .route("/analysis", get(analysis))
        .route("/map", get(map))
        .route("/config", get(config_form).post(save_config))
        .route("/api/merged", get(api_merged))
        .route("/api/stations.geojson", get(api_stations))
        .route("/health", get(|| async { "ok" }))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(CompressionLayer::new())
}

/// Serves the dashboard on `bind` until Ctrl+C.
pub async fn serve(state: DashboardState, bind: &str) -> Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!(bind, "Dashboard listening");
    let server = axum::serve(listener, app);
    tokio::select! {
        r = server => { r?; },
        _ = signal::ctrl_c() => { info!("Shutdown signal received"); }
    }
    Ok(())
}

async fn overview(State(st): State<DashboardState>) -> Html<String> {
    let d = st.data.read().await;
    Html(pages::overview_page(d.report.as_ref()))
}

async fn analysis(State(st): State<DashboardState>) -> Html<String> {
    let d = st.data.read().await;
    Html(pages::analysis_page(d.report.as_ref()))
}

async fn map(State(st): State<DashboardState>) -> Html<String> {
    let d = st.data.read().await;
    let center = (d.config.region_latitude, d.config.region_longitude);
    Html(pages::map_page(d.report.as_ref(), center))
}

async fn config_form(State(st): State<DashboardState>) -> Html<String> {
    let d = st.data.read().await;
    Html(pages::config_page(&d.config, None))
}

#[derive(Debug, Deserialize)]
pub struct ConfigForm {
    pub weather_api_key: String,
}

async fn save_config(State(st): State<DashboardState>, Form(form): Form<ConfigForm>) -> Html<String> {
    let mut d = st.data.write().await;
    let key = form.weather_api_key.trim();
    let notice = if key.is_empty() {
        "No key entered, configuration unchanged."
    } else {
        d.config.weather_api_key = key.to_string();
        info!("Weather API key updated from dashboard");
        "Weather API key saved for this session."
    };
    Html(pages::config_page(&d.config, Some(notice)))
}

async fn api_merged(State(st): State<DashboardState>) -> Response {
    let d = st.data.read().await;
    match d.report.as_ref().and_then(|r| r.merged.as_ref()) {
        Some(merged) => Json(merged.to_json_rows()).into_response(),
        None => (StatusCode::NOT_FOUND, "no merged data").into_response(),
    }
}

async fn api_stations(State(st): State<DashboardState>) -> Response {
    let d = st.data.read().await;
    match d.report.as_ref().and_then(|r| r.stations.as_ref()) {
        Some(layer) => (
            [(header::CONTENT_TYPE, "application/geo+json")],
            to_geojson(layer).to_string(),
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "no station layer").into_response(),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::cleaner::{self, JoinKind};
    use crate::pipeline::{self, DataSource};
    use crate::sample;
    use crate::spatial::{self, Crs, SpatialJoinKind};
    use crate::table::Value;

    /// Report built from the sample rows without touching the filesystem.
    pub(crate) fn sample_report() -> PipelineReport {
        let delays = cleaner::clean_train_delays(&sample::sample_delays().unwrap());
        let weather = cleaner::clean_weather_data(&sample::sample_weather().unwrap());
        let mut merged = cleaner::merge_data(&delays, &weather, "date", JoinKind::Left).unwrap();
        let analysis = pipeline::analyze(&mut merged);

        let means: Vec<(Value, f64)> = analysis
            .route_means
            .iter()
            .map(|(r, m)| (Value::text(r), *m))
            .collect();
        let stations = sample::station_table(&PipelineConfig::default().stations, &means).unwrap();
        let stations = spatial::points_from_table(&stations, "latitude", "longitude", Crs::Wgs84).unwrap();
        let joined = spatial::spatial_join(
            &stations,
            &spatial::sample_districts().unwrap(),
            SpatialJoinKind::Inner,
        )
        .unwrap();

        PipelineReport {
            source: Some(DataSource::Sample),
            merged: Some(merged),
            analysis: Some(analysis),
            stations: Some(stations),
            joined: Some(joined),
            ..PipelineReport::new()
        }
    }

    fn state() -> DashboardState {
        DashboardState::new(PipelineConfig::default(), Some(sample_report()))
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_overview_handler() {
        let Html(html) = overview(State(state())).await;
        assert!(html.contains("Total records: 8"));
    }

    #[tokio::test]
    async fn test_api_merged_returns_rows() {
        let response = api_merged(State(state())).await;
        assert_eq!(response.status(), StatusCode::OK);
        let rows: Vec<serde_json::Value> = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(rows.len(), 8);
        assert_eq!(rows[1]["weather_condition"], "cloudy");
    }

    #[tokio::test]
    async fn test_api_without_report_is_not_found() {
        let empty = DashboardState::new(PipelineConfig::default(), None);
        assert_eq!(api_merged(State(empty.clone())).await.status(), StatusCode::NOT_FOUND);
        assert_eq!(api_stations(State(empty)).await.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_api_stations_geojson() {
        let response = api_stations(State(state())).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/geo+json"
        );
        let body: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(body["type"], "FeatureCollection");
        assert_eq!(body["features"].as_array().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_save_config_stores_key_in_memory() {
        let st = state();
        let Html(html) = save_config(
            State(st.clone()),
            Form(ConfigForm {
                weather_api_key: "  abc123 ".to_string(),
            }),
        )
        .await;
        assert!(html.contains("Weather API key saved"));
        assert!(!html.contains("abc123"));
        assert_eq!(st.data.read().await.config.weather_api_key, "abc123");

        let Html(html) = save_config(
            State(st.clone()),
            Form(ConfigForm {
                weather_api_key: "   ".to_string(),
            }),
        )
        .await;
        assert!(html.contains("configuration unchanged"));
        assert_eq!(st.data.read().await.config.weather_api_key, "abc123");
    }

    #[tokio::test]
    async fn test_map_handler_uses_region_center() {
        let Html(html) = map(State(state())).await;
        assert!(html.contains("setView([49.8209, 18.2625], 10)"));
    }
}
