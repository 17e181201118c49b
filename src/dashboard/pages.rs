//! HTML for the dashboard pages. Every builder is a pure function of the
//! pipeline results so pages can be rendered without a server.

use std::fmt::Write;

use crate::config::PipelineConfig;
use crate::pipeline::{Analysis, PhaseOutcome, PipelineReport};
use crate::table::Table;

const TITLE: &str = "Train Delay Analysis on Line 323";
const PREVIEW_ROWS: usize = 200;

const STYLE: &str = "body{font-family:sans-serif;margin:0}\
nav{background:#223;padding:.6em 1em}nav a{color:#fff;margin-right:1.2em;text-decoration:none}\
nav a.active{font-weight:bold;text-decoration:underline}main{padding:1em 2em}\
table{border-collapse:collapse;margin:.5em 0}td,th{border:1px solid #ccc;padding:.2em .6em;text-align:left}\
.banner{padding:.6em 1em;margin:.6em 0;border-radius:4px}.warning{background:#fff3cd}\
.error{background:#f8d7da}.success{background:#d4edda}.info{background:#d1ecf1}\
.chart{margin:1em 0}#map{height:520px}";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Overview,
    Analysis,
    Map,
    Config,
}

impl Page {
    fn path(&self) -> &'static str {
        match self {
            Page::Overview => "/",
            Page::Analysis => "/analysis",
            Page::Map => "/map",
            Page::Config => "/config",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Page::Overview => "Data Overview",
            Page::Analysis => "Analysis & Visualizations",
            Page::Map => "GIS Outputs",
            Page::Config => "Configuration",
        }
    }
}

/// Escapes text for use in HTML content and attribute values.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

pub fn banner(kind: &str, message: &str) -> String {
    format!(r#"<div class="banner {kind}">{}</div>"#, escape(message))
}

fn layout(active: Page, head: &str, body: &str) -> String {
    let mut nav = String::new();
    for page in [Page::Overview, Page::Analysis, Page::Map, Page::Config] {
        let class = if page == active { r#" class="active""# } else { "" };
        let _ = write!(nav, r#"<a href="{}"{class}>{}</a>"#, page.path(), page.label());
    }
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\"><head><meta charset=\"utf-8\">\
         <title>{title} - {label}</title><style>{STYLE}</style>{head}</head>\
         <body><nav>{nav}</nav><main><h1>{title}</h1>{body}</main></body></html>",
        title = escape(TITLE),
        label = escape(active.label()),
    )
}

/// Renders up to `limit` rows of `table` as an HTML table.
pub fn table_html(table: &Table, limit: usize) -> String {
    let mut html = String::from("<table><thead><tr>");
    for name in table.column_names() {
        let _ = write!(html, "<th>{}</th>", escape(name));
    }
    html.push_str("</tr></thead><tbody>");
    for row in table.rows().iter().take(limit) {
        html.push_str("<tr>");
        for value in row {
            let _ = write!(html, "<td>{}</td>", escape(&value.to_string()));
        }
        html.push_str("</tr>");
    }
    html.push_str("</tbody></table>");
    if table.len() > limit {
        let _ = write!(html, "<p>Showing {limit} of {} rows.</p>", table.len());
    }
    html
}

fn phase_list(report: &PipelineReport) -> String {
    let mut html = String::from("<ul>");
    for (phase, outcome) in &report.phases {
        let status = match outcome {
            PhaseOutcome::Completed => "completed".to_string(),
            PhaseOutcome::Partial(problems) => format!("completed with {} problem(s)", problems.len()),
            PhaseOutcome::Failed(e) => format!("failed: {e}"),
            PhaseOutcome::Skipped => "skipped".to_string(),
        };
        let _ = write!(html, "<li>{}: {}</li>", escape(&phase.to_string()), escape(&status));
    }
    html.push_str("</ul>");
    html
}

fn no_data() -> String {
    banner("error", "No data available for analysis. Please check data loading steps.")
}

/// Merged table, record count and column list.
pub fn overview_page(report: Option<&PipelineReport>) -> String {
    let mut body = String::new();
    match report.and_then(|r| r.merged.as_ref().map(|m| (r, m))) {
        Some((report, merged)) if !merged.is_empty() => {
            if let Some(source) = report.source {
                body.push_str(&banner("info", &format!("Data source: {}", source.as_str())));
            }
            body.push_str("<h2>Processed and Merged Data Overview</h2>");
            body.push_str(&table_html(merged, PREVIEW_ROWS));
            let _ = write!(body, "<p>Total records: {}</p>", merged.len());
            let columns: Vec<String> = merged.column_names().iter().map(|c| escape(c)).collect();
            let _ = write!(body, "<p>Columns: {}</p>", columns.join(", "));
            body.push_str("<h2>Pipeline phases</h2>");
            body.push_str(&phase_list(report));
        }
        _ => {
            body.push_str(&no_data());
            if let Some(report) = report {
                body.push_str(&phase_list(report));
            }
        }
    }
    layout(Page::Overview, "", &body)
}

fn snow_conclusion(significant: bool) -> &'static str {
    if significant {
        "Conclusion: There is a statistically significant difference in delay minutes between snowy and non-snowy conditions."
    } else {
        "Conclusion: No statistically significant difference found in delay minutes between snowy and non-snowy conditions."
    }
}

fn analysis_sections(analysis: &Analysis) -> String {
    let mut body = String::new();

    body.push_str("<h2>Descriptive Statistics for Train Delays</h2>");
    match &analysis.delay_summary {
        Some(summary) => {
            body.push_str("<table><tbody>");
            for (label, value) in summary.rows() {
                let value = value.map(|v| format!("{v:.3}")).unwrap_or_else(|| "n/a".to_string());
                let _ = write!(body, "<tr><th>{label}</th><td>{value}</td></tr>");
            }
            body.push_str("</tbody></table>");
        }
        None => body.push_str(&banner("error", "Failed to calculate descriptive statistics.")),
    }

    body.push_str("<h2>T-test: Delays in Snowy vs. Non-Snowy Conditions</h2>");
    match &analysis.snowy_t_test {
        Some(t) => {
            let _ = write!(
                body,
                "<p>T-statistic: {:.2}, P-value: {:.3}</p><p>{}</p>",
                t.t_statistic(),
                t.p_value(),
                snow_conclusion(analysis.snow_effect_significant().unwrap_or(false))
            );
        }
        None => body.push_str(&banner(
            "warning",
            "Could not perform t-test. Check data for 'is_snowy' and 'delay_minutes'.",
        )),
    }

    body.push_str("<h2>Correlation (Delay vs. Temperature)</h2>");
    match analysis.delay_temperature_corr {
        Some(r) => {
            let _ = write!(body, "<p>Pearson r = {r:.2}</p>");
        }
        None => body.push_str(&banner("warning", "Correlation could not be computed.")),
    }

    if !analysis.problems.is_empty() {
        body.push_str("<h2>Problems</h2><ul>");
        for problem in &analysis.problems {
            let _ = write!(body, "<li>{}</li>", escape(problem));
        }
        body.push_str("</ul>");
    }
    body
}

/// Statistics, t-test conclusion and inline charts.
pub fn analysis_page(report: Option<&PipelineReport>) -> String {
    let Some(report) = report.filter(|r| r.merged.as_ref().is_some_and(|m| !m.is_empty())) else {
        return layout(Page::Analysis, "", &no_data());
    };

    let mut body = String::from("<h2>Statistical Analysis &amp; Visualizations</h2>");
    match &report.analysis {
        Some(analysis) => body.push_str(&analysis_sections(analysis)),
        None => body.push_str(&banner("warning", "Analysis has not been run.")),
    }

    if report.charts.is_empty() {
        body.push_str(&banner("warning", "No charts were rendered."));
    }
    for chart in &report.charts {
        // SVG comes from our own renderer and is inlined as-is
        let _ = write!(
            body,
            r#"<div class="chart"><h3>{}</h3>{}</div>"#,
            escape(&chart.title),
            chart.svg
        );
    }
    layout(Page::Analysis, "", &body)
}

const LEAFLET_HEAD: &str = r#"<link rel="stylesheet" href="https://unpkg.com/leaflet@1.9.4/dist/leaflet.css">
<script src="https://unpkg.com/leaflet@1.9.4/dist/leaflet.js"></script>"#;

/// Leaflet map of the station layer plus the station/district join table.
pub fn map_page(report: Option<&PipelineReport>, center: (f64, f64)) -> String {
    let mut body = String::from("<h2>Train Stations</h2>");
    let stations = report.and_then(|r| r.stations.as_ref());
    match stations {
        Some(layer) if !layer.is_empty() => {
            let _ = write!(
                body,
                r#"<div id="map"></div><script>
const map = L.map('map').setView([{lat}, {lon}], 10);
L.tileLayer('https://tile.openstreetmap.org/{{z}}/{{x}}/{{y}}.png', {{
  maxZoom: 18, attribution: '&copy; OpenStreetMap contributors'
}}).addTo(map);
fetch('/api/stations.geojson').then(r => r.json()).then(data => {{
  L.geoJSON(data, {{
    pointToLayer: (f, latlng) => L.circleMarker(latlng, {{radius: 6 + (f.properties.avg_delay || 0)}}),
    onEachFeature: (f, layer) => layer.bindPopup(
      `<b>${{f.properties.station_name}}</b><br>Average delay: ${{Number(f.properties.avg_delay).toFixed(1)}} min`)
  }}).addTo(map);
}});
</script>"#,
                lat = center.0,
                lon = center.1,
            );
            body.push_str(&table_html(layer.attributes(), PREVIEW_ROWS));
        }
        _ => body.push_str(&banner("error", "Failed to create station layer.")),
    }

    body.push_str("<h2>Spatial Join: Stations in Districts</h2>");
    match report.and_then(|r| r.joined.as_ref()) {
        Some(joined) => body.push_str(&table_html(joined.attributes(), PREVIEW_ROWS)),
        None => body.push_str(&banner("warning", "Failed to perform spatial join.")),
    }
    layout(Page::Map, LEAFLET_HEAD, &body)
}

/// API key form. The stored key is never echoed back.
pub fn config_page(config: &PipelineConfig, notice: Option<&str>) -> String {
    let mut body = String::from("<h2>Configuration</h2>");
    if let Some(notice) = notice {
        body.push_str(&banner("success", notice));
    }
    if config.has_weather_key() {
        body.push_str(&banner("info", "A weather API key is configured."));
    } else {
        body.push_str(&banner(
            "warning",
            "No weather API key configured. Weather data falls back to the built-in sample.",
        ));
    }
    body.push_str(
        r#"<form method="post" action="/config">
<label for="weather_api_key">Weather API Key</label>
<input type="password" id="weather_api_key" name="weather_api_key" autocomplete="off">
<button type="submit">Save</button>
</form>"#,
    );
    let mode = if config.live_acquisition {
        "Live scraping and weather requests are enabled."
    } else {
        "Data fetching is simulated with sample data. Enable live acquisition in the config file to scrape and call the weather service."
    };
    body.push_str(&banner("info", mode));
    layout(Page::Config, "", &body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashboard::tests::sample_report;

    #[test]
    fn test_escape() {
        assert_eq!(escape(r#"<b a="1">&'</b>"#), "&lt;b a=&quot;1&quot;&gt;&amp;&#39;&lt;/b&gt;");
    }

    #[test]
    fn test_overview_without_data_shows_error() {
        let html = overview_page(None);
        assert!(html.contains("No data available for analysis"));
        assert!(html.contains(r#"<a href="/" class="active">"#));
    }

    #[test]
    fn test_overview_lists_records_and_columns() {
        let report = sample_report();
        let html = overview_page(Some(&report));
        assert!(html.contains("Total records: 8"));
        assert!(html.contains("delay_minutes"));
        assert!(html.contains("weather_condition"));
        assert!(html.contains("Ostrava-Frenstat"));
    }

    #[test]
    fn test_analysis_page_has_conclusion() {
        let report = sample_report();
        let html = analysis_page(Some(&report));
        assert!(html.contains("T-statistic:"));
        assert!(html.contains("Conclusion:"));
        assert!(html.contains("Descriptive Statistics"));
        // no charts in the fixture
        assert!(html.contains("No charts were rendered."));
    }

    #[test]
    fn test_analysis_page_without_analysis_warns() {
        let mut report = sample_report();
        report.analysis = None;
        let html = analysis_page(Some(&report));
        assert!(html.contains("Analysis has not been run."));
    }

    #[test]
    fn test_map_page() {
        let report = sample_report();
        let html = map_page(Some(&report), (49.8209, 18.2625));
        assert!(html.contains("leaflet.js"));
        assert!(html.contains("/api/stations.geojson"));
        assert!(html.contains("setView([49.8209, 18.2625], 10)"));
        assert!(html.contains("index_right"));

        let empty = map_page(None, (0.0, 0.0));
        assert!(empty.contains("Failed to create station layer."));
        assert!(empty.contains("Failed to perform spatial join."));
    }

    #[test]
    fn test_config_page_never_echoes_key() {
        let config = PipelineConfig {
            weather_api_key: "s3cret".to_string(),
            ..PipelineConfig::default()
        };
        let html = config_page(&config, Some("Saved"));
        assert!(html.contains(r#"type="password""#));
        assert!(html.contains("A weather API key is configured."));
        assert!(!html.contains("s3cret"));

        let html = config_page(&PipelineConfig::default(), None);
        assert!(html.contains("No weather API key configured"));
    }

    #[test]
    fn test_table_html_truncates() {
        let report = sample_report();
        let merged = report.merged.as_ref().unwrap();
        let html = table_html(merged, 3);
        assert_eq!(html.matches("<tr>").count(), 4);
        assert!(html.contains("Showing 3 of 8 rows."));
    }
}
