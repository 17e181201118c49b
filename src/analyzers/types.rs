//! Result and parameter types used by the analysis functions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{DataError, DataResult};
use crate::table::{DataType, Field, Schema, Table, Value};

/// Count, moments and quartiles of one numeric column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub(crate) column: String,
    pub(crate) count: usize,
    pub(crate) mean: f64,
    /// Sample standard deviation; undefined for a single value.
    pub(crate) std: Option<f64>,
    pub(crate) min: f64,
    pub(crate) q25: f64,
    pub(crate) median: f64,
    pub(crate) q75: f64,
    pub(crate) max: f64,
}

impl Summary {
    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    pub fn std(&self) -> Option<f64> {
        self.std
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn median(&self) -> f64 {
        self.median
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    /// `(label, value)` pairs in display order. NaN statistics are `None`.
    pub fn rows(&self) -> Vec<(&'static str, Option<f64>)> {
        let defined = |v: f64| (!v.is_nan()).then_some(v);
        vec![
            ("count", Some(self.count as f64)),
            ("mean", defined(self.mean)),
            ("std", self.std),
            ("min", defined(self.min)),
            ("25%", defined(self.q25)),
            ("50%", defined(self.median)),
            ("75%", defined(self.q75)),
            ("max", defined(self.max)),
        ]
    }
}

/// Variance assumption of the two-sample t-test.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Variance {
    /// Student's test with pooled variance.
    #[default]
    Pooled,
    /// Welch's test with Welch–Satterthwaite degrees of freedom.
    Welch,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TTestResult {
    pub(crate) t_statistic: f64,
    pub(crate) p_value: f64,
    pub(crate) degrees_of_freedom: f64,
    pub(crate) n_a: usize,
    pub(crate) n_b: usize,
    pub(crate) mean_a: f64,
    pub(crate) mean_b: f64,
    pub(crate) variance: Variance,
}

impl TTestResult {
    pub fn t_statistic(&self) -> f64 {
        self.t_statistic
    }

    pub fn p_value(&self) -> f64 {
        self.p_value
    }

    pub fn degrees_of_freedom(&self) -> f64 {
        self.degrees_of_freedom
    }

    pub fn sizes(&self) -> (usize, usize) {
        (self.n_a, self.n_b)
    }

    pub fn means(&self) -> (f64, f64) {
        (self.mean_a, self.mean_b)
    }

    pub fn is_significant(&self, alpha: f64) -> bool {
        self.p_value < alpha
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CorrelationMethod {
    #[default]
    Pearson,
    Spearman,
    Kendall,
}

impl FromStr for CorrelationMethod {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pearson" => Ok(CorrelationMethod::Pearson),
            "spearman" => Ok(CorrelationMethod::Spearman),
            "kendall" => Ok(CorrelationMethod::Kendall),
            other => Err(DataError::InvalidArgument(format!(
                "unknown correlation method '{other}'"
            ))),
        }
    }
}

/// Square matrix of pairwise coefficients; `NaN` where undefined.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationMatrix {
    pub(crate) columns: Vec<String>,
    pub(crate) values: Vec<Vec<f64>>,
}

impl CorrelationMatrix {
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.values[row][col]
    }

    pub fn values(&self) -> &[Vec<f64>] {
        &self.values
    }
}

/// Fixed bucket width for time resampling.
///
/// Parsed from offset aliases such as `D`, `H`, `2H`, `15min` or `30T`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frequency {
    seconds: i64,
}

impl Frequency {
    /// Widths of zero or less are rejected by [`Frequency::validate`] and by
    /// the resampler.
    pub fn minutes(n: i64) -> Self {
        Self { seconds: n.saturating_mul(60) }
    }

    pub fn hours(n: i64) -> Self {
        Self { seconds: n.saturating_mul(3_600) }
    }

    pub fn days(n: i64) -> Self {
        Self { seconds: n.saturating_mul(86_400) }
    }

    pub fn validate(self) -> DataResult<Self> {
        if self.seconds <= 0 {
            return Err(DataError::InvalidArgument(format!(
                "frequency must be positive, got {} seconds",
                self.seconds
            )));
        }
        Ok(self)
    }

    pub fn seconds(&self) -> i64 {
        self.seconds
    }
}

impl FromStr for Frequency {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let split = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
        let (count, unit) = s.split_at(split);
        let count: i64 = if count.is_empty() {
            1
        } else {
            count
                .parse()
                .map_err(|_| DataError::InvalidArgument(format!("invalid frequency '{s}'")))?
        };
        if count <= 0 {
            return Err(DataError::InvalidArgument(format!(
                "frequency must be positive: '{s}'"
            )));
        }
        let unit_seconds = match unit {
            "S" | "s" => 1,
            "T" | "min" => 60,
            "H" | "h" => 3_600,
            "D" | "d" => 86_400,
            _ => {
                return Err(DataError::InvalidArgument(format!(
                    "unsupported frequency '{s}'"
                )));
            }
        };
        let seconds = count
            .checked_mul(unit_seconds)
            .ok_or_else(|| DataError::InvalidArgument(format!("frequency too large: '{s}'")))?;
        Ok(Self { seconds })
    }
}

/// Reduction applied to the values of one bucket or group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregation {
    Mean,
    Sum,
    Count,
    Min,
    Max,
    Median,
    Std,
}

impl Aggregation {
    pub fn name(&self) -> &'static str {
        match self {
            Aggregation::Mean => "mean",
            Aggregation::Sum => "sum",
            Aggregation::Count => "count",
            Aggregation::Min => "min",
            Aggregation::Max => "max",
            Aggregation::Median => "median",
            Aggregation::Std => "std",
        }
    }

    /// Type of the produced column.
    pub fn output_type(&self) -> DataType {
        match self {
            Aggregation::Count => DataType::Int,
            _ => DataType::Float,
        }
    }
}

impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Aggregation {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mean" | "avg" => Ok(Aggregation::Mean),
            "sum" => Ok(Aggregation::Sum),
            "count" | "size" => Ok(Aggregation::Count),
            "min" => Ok(Aggregation::Min),
            "max" => Ok(Aggregation::Max),
            "median" => Ok(Aggregation::Median),
            "std" => Ok(Aggregation::Std),
            other => Err(DataError::InvalidArgument(format!(
                "unknown aggregation '{other}'"
            ))),
        }
    }
}

/// One aggregation applied to the value column, or several, each written to
/// its own named output column.
#[derive(Debug, Clone, PartialEq)]
pub enum AggSpec {
    Single(Aggregation),
    Named(Vec<(String, Aggregation)>),
}

impl From<Aggregation> for AggSpec {
    fn from(agg: Aggregation) -> Self {
        AggSpec::Single(agg)
    }
}

/// Mean of a value column per distinct key, keys in sorted order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateResult {
    pub(crate) key_column: String,
    pub(crate) value_column: String,
    pub(crate) groups: Vec<(Value, f64)>,
}

impl AggregateResult {
    pub fn key_column(&self) -> &str {
        &self.key_column
    }

    pub fn value_column(&self) -> &str {
        &self.value_column
    }

    pub fn groups(&self) -> &[(Value, f64)] {
        &self.groups
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn get(&self, key: &Value) -> Option<f64> {
        let wanted = key.join_key()?;
        self.groups
            .iter()
            .find(|(k, _)| k.join_key().as_deref() == Some(wanted.as_str()))
            .map(|(_, v)| *v)
    }

    /// Two-column table `key_column`, `value_column`.
    pub fn to_table(&self) -> Table {
        let key_type = self
            .groups
            .iter()
            .find_map(|(k, _)| k.data_type())
            .unwrap_or(DataType::Text);
        let fields = vec![
            Field::new(self.key_column.clone(), key_type),
            Field::new(self.value_column.clone(), DataType::Float),
        ];
        // key and value names differ by construction
        let mut table = Schema::new(fields).map(Table::new).unwrap_or_default();
        for (k, v) in &self.groups {
            let _ = table.push_row(vec![k.clone(), Value::float(*v)]);
        }
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frequency_aliases() {
        assert_eq!("D".parse::<Frequency>().unwrap(), Frequency::days(1));
        assert_eq!("H".parse::<Frequency>().unwrap(), Frequency::hours(1));
        assert_eq!("2H".parse::<Frequency>().unwrap(), Frequency::hours(2));
        assert_eq!("15min".parse::<Frequency>().unwrap(), Frequency::minutes(15));
        assert_eq!("30T".parse::<Frequency>().unwrap(), Frequency::minutes(30));
    }

    #[test]
    fn test_frequency_rejects_unknown() {
        assert!("W".parse::<Frequency>().is_err());
        assert!("0D".parse::<Frequency>().is_err());
        assert!("".parse::<Frequency>().is_err());
        assert!("0H".parse::<Frequency>().is_err());
        assert!(matches!(
            "999999999999999D".parse::<Frequency>(),
            Err(DataError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_frequency_validate() {
        assert!(Frequency::hours(0).validate().is_err());
        assert!(Frequency::minutes(-5).validate().is_err());
        assert_eq!(Frequency::days(2).validate().unwrap().seconds(), 172_800);
        assert!(Frequency::days(i64::MAX).validate().is_ok());
    }

    #[test]
    fn test_parse_method_and_aggregation() {
        assert_eq!(
            "Kendall".parse::<CorrelationMethod>().unwrap(),
            CorrelationMethod::Kendall
        );
        assert!("cosine".parse::<CorrelationMethod>().is_err());
        assert_eq!("median".parse::<Aggregation>().unwrap(), Aggregation::Median);
        assert_eq!(Aggregation::Count.output_type(), DataType::Int);
    }

    #[test]
    fn test_aggregate_result_lookup_and_table() {
        let result = AggregateResult {
            key_column: "route".to_string(),
            value_column: "delay_minutes".to_string(),
            groups: vec![(Value::text("A"), 2.5), (Value::text("B"), 7.0)],
        };
        assert_eq!(result.get(&Value::text("B")), Some(7.0));
        assert_eq!(result.get(&Value::text("C")), None);

        let table = result.to_table();
        assert_eq!(table.column_names(), vec!["route", "delay_minutes"]);
        assert_eq!(table.len(), 2);
    }
}
