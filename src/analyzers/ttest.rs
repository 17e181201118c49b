use statrs::distribution::{ContinuousCDF, StudentsT};
use tracing::{debug, warn};

use super::types::{TTestResult, Variance};
use super::utility::{mean, sample_variance};
use crate::error::{DataError, DataResult};
use crate::table::{Table, Value};

/// Independent two-sample t-test of `value_column` between the rows whose
/// `group_column` equals `group_a` and those equal to `group_b`.
///
/// Group cells compare by value with numeric widening, so `Int(1)` matches
/// `Float(1.0)`. Null values are ignored. Each sample needs at least two
/// observations and the two group values must differ. The p-value is
/// two-sided.
#[tracing::instrument(skip(table))]
pub fn t_test(
    table: &Table,
    group_column: &str,
    value_column: &str,
    group_a: &Value,
    group_b: &Value,
    variance: Variance,
) -> DataResult<TTestResult> {
    let g = table.require_column(group_column)?;
    let v = table.require_numeric(value_column)?;

    let key_a = group_a.join_key();
    let key_b = group_b.join_key();
    if key_a == key_b {
        return Err(DataError::InvalidArgument(format!(
            "t-test groups must differ, got {group_a:?} twice"
        )));
    }
    let (mut a, mut b) = (Vec::new(), Vec::new());
    for row in table.rows() {
        let Some(value) = row[v].as_f64() else {
            continue;
        };
        let key = row[g].join_key();
        if key.is_some() && key == key_a {
            a.push(value);
        } else if key.is_some() && key == key_b {
            b.push(value);
        }
    }

    if a.len() < 2 || b.len() < 2 {
        warn!(n_a = a.len(), n_b = b.len(), "Not enough observations for t-test");
        return Err(DataError::InsufficientData(format!(
            "t-test needs at least 2 values per group, got {} and {}",
            a.len(),
            b.len()
        )));
    }

    let (na, nb) = (a.len() as f64, b.len() as f64);
    // both samples hold at least two values here
    let (ma, mb) = (mean(&a).unwrap_or(f64::NAN), mean(&b).unwrap_or(f64::NAN));
    let (va, vb) = (
        sample_variance(&a).unwrap_or(f64::NAN),
        sample_variance(&b).unwrap_or(f64::NAN),
    );

    let (se, df) = match variance {
        Variance::Pooled => {
            let df = na + nb - 2.0;
            let pooled = ((na - 1.0) * va + (nb - 1.0) * vb) / df;
            ((pooled * (1.0 / na + 1.0 / nb)).sqrt(), df)
        }
        Variance::Welch => {
            let (sa, sb) = (va / na, vb / nb);
            let df = (sa + sb).powi(2) / (sa.powi(2) / (na - 1.0) + sb.powi(2) / (nb - 1.0));
            ((sa + sb).sqrt(), df)
        }
    };

    let t = if se > 0.0 { (ma - mb) / se } else { f64::NAN };
    let p = two_sided_p(t, df);

    debug!(t, p, df, ?variance, "t-test computed");
    Ok(TTestResult {
        t_statistic: t,
        p_value: p,
        degrees_of_freedom: df,
        n_a: a.len(),
        n_b: b.len(),
        mean_a: ma,
        mean_b: mb,
        variance,
    })
}

fn two_sided_p(t: f64, df: f64) -> f64 {
    if !t.is_finite() || !df.is_finite() || df <= 0.0 {
        return f64::NAN;
    }
    match StudentsT::new(0.0, 1.0, df) {
        Ok(dist) => (2.0 * (1.0 - dist.cdf(t.abs()))).clamp(0.0, 1.0),
        Err(_) => f64::NAN,
    }
}
