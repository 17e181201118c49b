//! End-to-end run: acquire, clean and merge, analyze, chart, export layers.
//!
//! Phases run in order. A failing phase is logged and recorded in the
//! [`PipelineReport`], and the run moves on; the only hard stop is an empty
//! merged table, since every later phase reads it.

use anyhow::{Result, bail};
use chrono::{Duration, NaiveDate, Utc};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use tracing::{debug, error, info, warn};

use crate::analyzers::{
    self, Aggregation, CorrelationMatrix, CorrelationMethod, Frequency, Summary, TTestResult,
    Variance,
};
use crate::charts;
use crate::cleaner::{self, DEFAULT_MERGE_KEY, JoinKind};
use crate::config::PipelineConfig;
use crate::fetch::BasicClient;
use crate::ingest::{self, ScrapedTable, WeatherObservation};
use crate::output::{append_record, gzip_copy, log_preview, write_table_csv};
use crate::sample;
use crate::spatial::{self, Crs, GeoFormat, GeoTable, SpatialJoinKind};
use crate::stats::RunSummary;
use crate::table::{DataType, Table, Value};

const WEATHER_COLUMNS: &[&str] = &[
    "temperature",
    "humidity",
    "wind_speed",
    "precipitation",
    "weather_condition",
];
const HEATMAP_COLUMNS: &[&str] = &["delay_minutes", "temperature", "humidity"];
const SNOWY: &str = "snowy";
const SIGNIFICANCE: f64 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Acquire,
    CleanMerge,
    Analyze,
    Visualize,
    ExportGeo,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Phase::Acquire => "acquire",
            Phase::CleanMerge => "clean_merge",
            Phase::Analyze => "analyze",
            Phase::Visualize => "visualize",
            Phase::ExportGeo => "export_geo",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum PhaseOutcome {
    Completed,
    /// Ran, but some steps failed; the messages say which.
    Partial(Vec<String>),
    Failed(String),
    Skipped,
}

/// Where the raw tables came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    Sample,
    Live,
    /// Scraped delays with sample weather, or the reverse.
    Mixed,
}

impl DataSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataSource::Sample => "sample",
            DataSource::Live => "live",
            DataSource::Mixed => "mixed",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Acquired {
    pub delays: Table,
    pub weather: Table,
    pub source: DataSource,
}

/// Results of the analysis phase. Each field is `None` when its step failed.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Analysis {
    pub delay_summary: Option<Summary>,
    pub snowy_t_test: Option<TTestResult>,
    pub delay_temperature_corr: Option<f64>,
    #[serde(skip)]
    pub daily_mean: Option<Table>,
    #[serde(skip)]
    pub correlations: Option<CorrelationMatrix>,
    pub route_means: Vec<(String, f64)>,
    pub condition_means: Vec<(String, f64)>,
    pub problems: Vec<String>,
}

impl Analysis {
    /// Whether snowy days differ significantly at p < 0.05.
    pub fn snow_effect_significant(&self) -> Option<bool> {
        self.snowy_t_test
            .as_ref()
            .map(|t| t.is_significant(SIGNIFICANCE))
    }
}

/// A rendered chart, kept in memory for the dashboard.
#[derive(Debug, Clone, PartialEq)]
pub struct Chart {
    pub name: String,
    pub title: String,
    pub svg: String,
}

#[derive(Debug, Clone, Default)]
pub struct PipelineReport {
    pub phases: Vec<(Phase, PhaseOutcome)>,
    pub summary: RunSummary,
    pub source: Option<DataSource>,
    pub merged: Option<Table>,
    pub analysis: Option<Analysis>,
    pub charts: Vec<Chart>,
    pub stations: Option<GeoTable>,
    pub joined: Option<GeoTable>,
    pub written: Vec<PathBuf>,
}

impl PipelineReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn outcome(&self, phase: Phase) -> Option<&PhaseOutcome> {
        self.phases.iter().find(|(p, _)| *p == phase).map(|(_, o)| o)
    }

    /// True when the run stopped before the analysis phase.
    pub fn halted(&self) -> bool {
        self.summary.is_error()
    }

    pub fn chart(&self, name: &str) -> Option<&Chart> {
        self.charts.iter().find(|c| c.name == name)
    }

    fn record(&mut self, phase: Phase, outcome: PhaseOutcome) {
        match &outcome {
            PhaseOutcome::Completed => info!(%phase, "Phase completed"),
            PhaseOutcome::Partial(problems) => warn!(%phase, ?problems, "Phase completed with problems"),
            PhaseOutcome::Failed(e) => error!(%phase, error = %e, "Phase failed"),
            PhaseOutcome::Skipped => debug!(%phase, "Phase skipped"),
        }
        self.phases.push((phase, outcome));
    }
}

fn outcome_of(problems: Vec<String>) -> PhaseOutcome {
    if problems.is_empty() {
        PhaseOutcome::Completed
    } else {
        PhaseOutcome::Partial(problems)
    }
}

pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Pipeline { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Runs every phase and appends a row to the run history.
    ///
    /// Only failures to write the run history itself are returned as errors;
    /// phase failures end up in the report.
    #[tracing::instrument(skip(self), fields(live = self.config.live_acquisition))]
    pub async fn run(&self) -> Result<PipelineReport> {
        let mut report = PipelineReport::new();

        let acquired = self.acquire().await;
        report.source = Some(acquired.source);
        report.summary = RunSummary::new(acquired.source.as_str());
        report.summary.raw_delay_rows = acquired.delays.len();
        report.summary.raw_weather_rows = acquired.weather.len();
        report.record(Phase::Acquire, PhaseOutcome::Completed);

        match self.clean_and_merge(&acquired, &mut report) {
            Ok(merged) => {
                report.record(Phase::CleanMerge, PhaseOutcome::Completed);
                let mut merged = merged;

                let analysis = analyze(&mut merged);
                report.summary.mean_delay = analysis
                    .delay_summary
                    .as_ref()
                    .map(Summary::mean)
                    .filter(|m| !m.is_nan());
                report.summary.t_statistic = analysis.snowy_t_test.as_ref().map(TTestResult::t_statistic);
                report.summary.p_value = analysis.snowy_t_test.as_ref().map(TTestResult::p_value);
                report.summary.delay_temperature_corr = analysis.delay_temperature_corr;
                report.record(Phase::Analyze, outcome_of(analysis.problems.clone()));

                let (charts, problems) = self.visualize(&merged, &analysis, &mut report.written);
                report.summary.charts_written = charts.len();
                report.charts = charts;
                report.record(Phase::Visualize, outcome_of(problems));

                match self.export_geo(&analysis, &mut report) {
                    Ok(problems) => report.record(Phase::ExportGeo, outcome_of(problems)),
                    Err(e) => report.record(Phase::ExportGeo, PhaseOutcome::Failed(format!("{e:#}"))),
                }

                report.analysis = Some(analysis);
                report.merged = Some(merged);
            }
            Err(e) => {
                report.record(Phase::CleanMerge, PhaseOutcome::Failed(format!("{e:#}")));
                for phase in [Phase::Analyze, Phase::Visualize, Phase::ExportGeo] {
                    report.record(phase, PhaseOutcome::Skipped);
                }
                report.summary = report.summary.clone().with_error("empty_merge", &e.to_string());
            }
        }

        append_record(&self.config.run_history, &report.summary)?;
        if self.config.gzip_outputs {
            let csvs: Vec<PathBuf> = report
                .written
                .iter()
                .filter(|p| p.extension().is_some_and(|e| e == "csv"))
                .cloned()
                .collect();
            for path in csvs {
                match gzip_copy(&path) {
                    Ok(gz) => report.written.push(gz),
                    Err(e) => warn!(path = %path.display(), error = %e, "Failed to gzip output"),
                }
            }
        }

        info!(
            source = report.summary.source.as_deref().unwrap_or("unknown"),
            merged_rows = report.summary.merged_rows,
            weather_coverage_pct = report.summary.weather_coverage_pct(),
            charts = report.summary.charts_written,
            layers = report.summary.layers_written,
            halted = report.halted(),
            "Pipeline finished"
        );
        Ok(report)
    }

    /// Gathers raw delay and weather tables. Live sources are used only when
    /// enabled and fall back to the sample rows when they yield nothing.
    #[tracing::instrument(skip(self))]
    pub async fn acquire(&self) -> Acquired {
        let (mut delays, mut weather) = (None, None);
        if self.config.live_acquisition {
            let today = Utc::now().date_naive();
            let days: Vec<NaiveDate> = (0..=self.config.lookback_days as i64)
                .rev()
                .map(|back| today - Duration::days(back))
                .collect();
            delays = self.scrape_window(&days).await;
            weather = self.weather_window(&days).await;
        } else {
            info!("Live acquisition disabled, using sample data");
        }

        let source = match (&delays, &weather) {
            (Some(_), Some(_)) => DataSource::Live,
            (None, None) => DataSource::Sample,
            _ => DataSource::Mixed,
        };
        let delays = delays.unwrap_or_else(|| sample_or_empty(sample::sample_delays()));
        let weather = weather.unwrap_or_else(|| sample_or_empty(sample::sample_weather()));
        log_preview("raw_delays", &delays, 5);
        log_preview("raw_weather", &weather, 5);
        Acquired { delays, weather, source }
    }

    async fn scrape_window(&self, days: &[NaiveDate]) -> Option<Table> {
        let client = match BasicClient::with_timeout(std::time::Duration::from_secs(
            self.config.http_timeout_secs,
        )) {
            Ok(c) => c,
            Err(e) => {
                error!(error = %e, "Failed to build HTTP client, skipping scrape");
                return None;
            }
        };

        let mut scraped = ScrapedTable::default();
        for day in days {
            for route in &self.config.routes {
                let params = [
                    ("f", route.from.clone()),
                    ("t", route.to.clone()),
                    ("date", day.format("%d.%m.%Y").to_string()),
                    ("time", "00:00".to_string()),
                ];
                match ingest::scrape_delays(&client, &self.config.scrape_url, &params).await {
                    Ok(table) => {
                        debug!(%day, from = %route.from, to = %route.to, rows = table.rows.len(), "Route scraped");
                        scraped.extend(table);
                    }
                    Err(e) => warn!(%day, from = %route.from, to = %route.to, error = %e, "Scrape failed"),
                }
            }
        }
        if scraped.is_empty() {
            warn!("Scraping produced no delay rows, falling back to sample data");
            return None;
        }
        match scraped.into_table() {
            Ok(t) => Some(t),
            Err(e) => {
                error!(error = %e, "Scraped rows could not be tabulated");
                None
            }
        }
    }

    async fn weather_window(&self, days: &[NaiveDate]) -> Option<Table> {
        if !self.config.has_weather_key() {
            info!("Weather API key not configured, skipping weather fetch");
            return None;
        }
        let client = match ingest::weather::weather_client(&self.config) {
            Ok(c) => c,
            Err(e) => {
                error!(error = %e, "Failed to build weather client");
                return None;
            }
        };

        let mut rows = Vec::with_capacity(days.len());
        for day in days {
            match ingest::fetch_weather(client.as_ref(), &self.config, *day).await {
                Ok(json) => rows.push(WeatherObservation::from_json(&json, *day).to_json_row()),
                Err(e) => warn!(%day, error = %e, "Weather fetch failed"),
            }
        }
        if rows.is_empty() {
            warn!("No weather observations fetched, falling back to sample data");
            return None;
        }
        match Table::from_json_rows(&rows) {
            Ok(t) => Some(t),
            Err(e) => {
                error!(error = %e, "Weather rows could not be tabulated");
                None
            }
        }
    }

    /// Cleans both tables, left-joins weather onto delays by `date` and
    /// writes `final_merged_data.csv`. An empty merge is an error.
    #[tracing::instrument(skip(self, acquired, report))]
    pub fn clean_and_merge(&self, acquired: &Acquired, report: &mut PipelineReport) -> Result<Table> {
        let delays = cleaner::clean_train_delays(&acquired.delays);
        let weather = cleaner::clean_weather_data(&acquired.weather);
        report.summary.clean_delay_rows = delays.len();
        report.summary.clean_weather_rows = weather.len();

        let merged = cleaner::merge_data(&delays, &weather, DEFAULT_MERGE_KEY, JoinKind::Left)?;
        if merged.is_empty() {
            bail!("merged table is empty, nothing to analyze");
        }
        let present: Vec<&str> = WEATHER_COLUMNS
            .iter()
            .copied()
            .filter(|c| merged.has_column(c))
            .collect();
        report.summary.merged_rows = merged.len();
        report.summary.unmatched_weather_rows = cleaner::unmatched_rows(&merged, &present);
        log_preview("merged", &merged, 5);

        let path = self.config.merged_csv_path();
        write_table_csv(&path, &merged)?;
        report.written.push(path);
        Ok(merged)
    }

    /// Renders every chart, saving each SVG under the chart directory.
    #[tracing::instrument(skip_all)]
    pub fn visualize(
        &self,
        merged: &Table,
        analysis: &Analysis,
        written: &mut Vec<PathBuf>,
    ) -> (Vec<Chart>, Vec<String>) {
        let mut rendered: Vec<(&str, &str, Result<String>)> = vec![
            (
                "delay_distribution",
                "Distribution of Train Delay Minutes",
                charts::delay_distribution(merged, "delay_minutes", "Distribution of Train Delay Minutes"),
            ),
            (
                "correlation_heatmap",
                "Correlation Heatmap",
                analyzers::correlation_matrix(merged, HEATMAP_COLUMNS, CorrelationMethod::Pearson)
                    .map_err(anyhow::Error::from)
                    .and_then(|m| charts::correlation_heatmap(&m, "Correlation Heatmap")),
            ),
            (
                "delay_by_weather",
                "Average Delay by Weather Condition",
                charts::category_vs_delay(
                    merged,
                    "weather_condition",
                    "delay_minutes",
                    "Average Delay by Weather Condition",
                ),
            ),
            (
                "delay_by_route",
                "Average Delay by Route",
                charts::category_vs_delay(merged, "route", "delay_minutes", "Average Delay by Route"),
            ),
        ];
        let daily = match &analysis.daily_mean {
            Some(daily) => charts::time_series(
                daily,
                "scheduled_time",
                "delay_minutes",
                "Daily Average Train Delay Minutes",
            ),
            None => Err(anyhow::anyhow!("no daily mean to plot")),
        };
        rendered.insert(1, ("daily_delay", "Daily Average Train Delay Minutes", daily));

        let mut out = Vec::new();
        let mut problems = Vec::new();
        for (name, title, svg) in rendered {
            let svg = match svg {
                Ok(svg) => svg,
                Err(e) => {
                    warn!(chart = name, error = %e, "Chart not rendered");
                    problems.push(format!("{name}: {e}"));
                    continue;
                }
            };
            match charts::save_chart(&svg, &self.config.chart_dir, name) {
                Ok(path) => written.push(path),
                Err(e) => {
                    warn!(chart = name, error = %e, "Chart not saved");
                    problems.push(format!("{name}: {e}"));
                }
            }
            out.push(Chart {
                name: name.to_string(),
                title: title.to_string(),
                svg,
            });
        }
        (out, problems)
    }

    /// Builds the station layer, writes it as shapefile and GeoJSON, then
    /// joins it against the district boundaries and writes the result.
    #[tracing::instrument(skip_all)]
    pub fn export_geo(&self, analysis: &Analysis, report: &mut PipelineReport) -> Result<Vec<String>> {
        let route_means: Vec<(Value, f64)> = analysis
            .route_means
            .iter()
            .map(|(r, m)| (Value::text(r), *m))
            .collect();
        let table = sample::station_table(&self.config.stations, &route_means)?;
        let stations = spatial::points_from_table(&table, "latitude", "longitude", Crs::Wgs84)?;

        let mut problems = Vec::new();
        let targets = [
            (
                self.config.processed_dir.join("train_stations_delays.shp"),
                GeoFormat::Shapefile,
            ),
            (
                self.config.layer_dir.join("train_stations_delays.geojson"),
                GeoFormat::GeoJson,
            ),
        ];
        for (path, format) in targets {
            match spatial::export(&stations, &path, format) {
                Ok(()) => {
                    report.summary.layers_written += 1;
                    report.written.push(path);
                }
                Err(e) => {
                    error!(path = %path.display(), error = %e, "Layer export failed");
                    problems.push(format!("{}: {e}", path.display()));
                }
            }
        }

        let districts = match &self.config.boundary_path {
            Some(path) => spatial::load_layer(path).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "Boundary layer unreadable, using sample districts");
                problems.push(format!("{}: {e}", path.display()));
                sample_districts_or_empty()
            }),
            None => sample_districts_or_empty(),
        };
        let joined = spatial::spatial_join(&stations, &districts, SpatialJoinKind::Inner)?;
        let path = self.config.processed_dir.join("stations_districts.shp");
        match spatial::export(&joined, &path, GeoFormat::Shapefile) {
            Ok(()) => {
                report.summary.layers_written += 1;
                report.written.push(path);
            }
            Err(e) => {
                error!(path = %path.display(), error = %e, "Joined layer export failed");
                problems.push(format!("{}: {e}", path.display()));
            }
        }

        report.stations = Some(stations);
        report.joined = Some(joined);
        Ok(problems)
    }
}

fn sample_or_empty(table: crate::error::DataResult<Table>) -> Table {
    table.unwrap_or_else(|e| {
        error!(error = %e, "Sample table could not be built");
        Table::default()
    })
}

fn sample_districts_or_empty() -> GeoTable {
    spatial::sample_districts().unwrap_or_else(|e| {
        error!(error = %e, "Sample districts could not be built");
        GeoTable::empty(Crs::Wgs84)
    })
}

/// Adds the `is_snowy` flag and computes the headline statistics. Failed
/// steps are logged and listed in [`Analysis::problems`].
#[tracing::instrument(skip_all, fields(rows = merged.len()))]
pub fn analyze(merged: &mut Table) -> Analysis {
    let mut analysis = Analysis::default();

    match analyzers::descriptive_statistics(merged, "delay_minutes") {
        Ok(summary) => {
            for (label, value) in summary.rows() {
                debug!(statistic = label, value = ?value, "delay_minutes");
            }
            analysis.delay_summary = Some(summary);
        }
        Err(e) => analysis.problems.push(format!("descriptive statistics: {e}")),
    }

    match add_snowy_flag(merged) {
        Ok(()) => match analyzers::t_test(
            merged,
            "is_snowy",
            "delay_minutes",
            &Value::Int(1),
            &Value::Int(0),
            Variance::Pooled,
        ) {
            Ok(t) => {
                info!(
                    t_statistic = %format!("{:.2}", t.t_statistic()),
                    p_value = %format!("{:.3}", t.p_value()),
                    significant = t.is_significant(SIGNIFICANCE),
                    "T-test snowy vs non-snowy"
                );
                analysis.snowy_t_test = Some(t);
            }
            Err(e) => analysis.problems.push(format!("t-test: {e}")),
        },
        Err(e) => analysis.problems.push(format!("is_snowy: {e}")),
    }

    match analyzers::correlation(merged, "delay_minutes", "temperature", CorrelationMethod::Pearson) {
        Ok(r) => {
            info!(correlation = %format!("{r:.2}"), "Delay vs temperature");
            analysis.delay_temperature_corr = Some(r).filter(|r| !r.is_nan());
        }
        Err(e) => analysis.problems.push(format!("correlation: {e}")),
    }

    match analyzers::correlation_matrix(merged, HEATMAP_COLUMNS, CorrelationMethod::Pearson) {
        Ok(m) => analysis.correlations = Some(m),
        Err(e) => analysis.problems.push(format!("correlation matrix: {e}")),
    }

    match analyzers::aggregate_by_time(
        merged,
        "scheduled_time",
        "delay_minutes",
        Frequency::days(1),
        Aggregation::Mean,
    ) {
        Ok(daily) => analysis.daily_mean = Some(daily),
        Err(e) => analysis.problems.push(format!("daily mean: {e}")),
    }

    match analyzers::group_mean(merged, "route", "delay_minutes") {
        Ok(g) => analysis.route_means = labelled(g.groups()),
        Err(e) => analysis.problems.push(format!("route means: {e}")),
    }
    match analyzers::group_mean(merged, "weather_condition", "delay_minutes") {
        Ok(g) => analysis.condition_means = labelled(g.groups()),
        Err(e) => analysis.problems.push(format!("condition means: {e}")),
    }

    for problem in &analysis.problems {
        warn!(problem = %problem, "Analysis step failed");
    }
    analysis
}

fn labelled(groups: &[(Value, f64)]) -> Vec<(String, f64)> {
    groups.iter().map(|(k, m)| (k.label(), *m)).collect()
}

/// `is_snowy` is 1 where `weather_condition` is exactly "snowy", else 0.
fn add_snowy_flag(merged: &mut Table) -> crate::error::DataResult<()> {
    let flags = merged
        .column("weather_condition")?
        .map(|v| Value::Int(i64::from(v.as_str() == Some(SNOWY))))
        .collect();
    merged.set_column("is_snowy", DataType::Int, flags)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::fixtures::six_rows;

    fn test_config(dir: &std::path::Path) -> PipelineConfig {
        PipelineConfig {
            processed_dir: dir.join("processed"),
            chart_dir: dir.join("charts"),
            layer_dir: dir.join("layers"),
            run_history: dir.join("run_history.csv"),
            ..PipelineConfig::default()
        }
    }

    #[test]
    fn test_analyze_six_rows() {
        let mut table = six_rows();
        let analysis = analyze(&mut table);

        assert!(table.has_column("is_snowy"));
        let t = analysis.snowy_t_test.as_ref().unwrap();
        assert!(t.t_statistic().is_finite());
        assert!(t.p_value().is_finite());
        assert_eq!(analysis.snow_effect_significant(), Some(false));

        let daily = analysis.daily_mean.as_ref().unwrap();
        assert_eq!(daily.len(), 3);
        assert!(analysis.delay_summary.is_some());
        assert_eq!(analysis.route_means.len(), 2);
    }

    #[test]
    fn test_analyze_reports_missing_columns() {
        let mut table = Table::from_json_rows(&[serde_json::json!({"delay_minutes": 5.0})]).unwrap();
        let analysis = analyze(&mut table);

        assert!(analysis.snowy_t_test.is_none());
        assert!(analysis.delay_temperature_corr.is_none());
        assert!(analysis.problems.iter().any(|p| p.starts_with("is_snowy")));
        assert!(analysis.delay_summary.is_some());
    }

    #[test]
    fn test_snowy_flag() {
        let mut table = six_rows();
        add_snowy_flag(&mut table).unwrap();
        let flags: Vec<_> = table.column("is_snowy").unwrap().cloned().collect();
        let snowy = flags.iter().filter(|v| **v == Value::Int(1)).count();
        assert_eq!(snowy, 2);
        assert_eq!(flags.len(), 6);
    }

    #[tokio::test]
    async fn test_acquire_uses_sample_when_live_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = Pipeline::new(test_config(dir.path()));
        let acquired = pipeline.acquire().await;
        assert_eq!(acquired.source, DataSource::Sample);
        assert_eq!(acquired.delays.len(), 8);
        assert_eq!(acquired.weather.len(), 4);
    }

    #[test]
    fn test_clean_and_merge_rejects_empty_merge() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = Pipeline::new(test_config(dir.path()));
        let acquired = Acquired {
            delays: Table::default(),
            weather: sample::sample_weather().unwrap(),
            source: DataSource::Sample,
        };
        let mut report = PipelineReport::new();
        assert!(pipeline.clean_and_merge(&acquired, &mut report).is_err());
        assert!(!pipeline.config().merged_csv_path().exists());
    }
}
