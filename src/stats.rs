use chrono::{DateTime, Utc};
use serde::Serialize;

/// One row of the run-history CSV, appended after every pipeline run.
#[derive(Debug, Default, Clone, Serialize)]
pub struct RunSummary {
    pub timestamp: DateTime<Utc>,
    pub source: Option<String>,

    // row counts per stage
    pub raw_delay_rows: usize,
    pub raw_weather_rows: usize,
    pub clean_delay_rows: usize,
    pub clean_weather_rows: usize,
    pub merged_rows: usize,
    pub unmatched_weather_rows: usize,

    // headline statistics
    pub mean_delay: Option<f64>,
    pub t_statistic: Option<f64>,
    pub p_value: Option<f64>,
    pub delay_temperature_corr: Option<f64>,

    // outputs
    pub charts_written: usize,
    pub layers_written: usize,

    // error tracking
    pub error_type: Option<String>,
    pub error_message: Option<String>,
}

impl RunSummary {
    pub fn new(source: &str) -> Self {
        RunSummary {
            timestamp: Utc::now(),
            source: Some(source.to_string()),
            ..Default::default()
        }
    }

    pub fn pct(part: usize, total: usize) -> f64 {
        if total == 0 {
            0.0
        } else {
            (part as f64 / total as f64) * 100.0
        }
    }

    /// Share of merged rows that found a weather observation.
    pub fn weather_coverage_pct(&self) -> f64 {
        Self::pct(
            self.merged_rows.saturating_sub(self.unmatched_weather_rows),
            self.merged_rows,
        )
    }

    /// Marks an existing summary as halted, keeping the counts gathered so far.
    pub fn with_error(mut self, error_type: &str, error_message: &str) -> Self {
        self.error_type = Some(error_type.to_string());
        self.error_message = Some(error_message.to_string());
        self
    }

    pub fn is_error(&self) -> bool {
        self.error_type.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pct_with_zero_total() {
        assert_eq!(RunSummary::pct(10, 0), 0.0);
    }

    #[test]
    fn test_pct_normal_values() {
        assert_eq!(RunSummary::pct(50, 100), 50.0);
        assert_eq!(RunSummary::pct(1, 4), 25.0);
    }

    #[test]
    fn test_weather_coverage_pct() {
        let mut s = RunSummary::new("sample");
        s.merged_rows = 8;
        s.unmatched_weather_rows = 2;
        assert_eq!(s.weather_coverage_pct(), 75.0);
    }

    #[test]
    fn test_with_error() {
        assert!(!RunSummary::new("sample").is_error());
        let halted = RunSummary::new("sample").with_error("empty_merge", "no rows");
        assert_eq!(halted.source.as_deref(), Some("sample"));
        assert!(halted.is_error());
    }
}
