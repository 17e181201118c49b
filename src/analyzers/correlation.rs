use std::cmp::Ordering;
use tracing::debug;

use super::types::{CorrelationMatrix, CorrelationMethod};
use super::utility::{average_ranks, mean};
use crate::error::{DataError, DataResult};
use crate::table::Table;

/// Correlation between two numeric columns over the rows where both are
/// non-null. Fewer than two such rows is an error; a constant column gives
/// `NaN`.
pub fn correlation(
    table: &Table,
    column_a: &str,
    column_b: &str,
    method: CorrelationMethod,
) -> DataResult<f64> {
    let (x, y) = paired(table, column_a, column_b)?;
    if x.len() < 2 {
        return Err(DataError::InsufficientData(format!(
            "correlation of '{column_a}' and '{column_b}' needs at least 2 complete rows, got {}",
            x.len()
        )));
    }
    let r = coefficient(&x, &y, method);
    debug!(column_a, column_b, ?method, r, "Correlation computed");
    Ok(r)
}

/// Pairwise correlation of every column pair. Pairs with fewer than two
/// complete rows are `NaN`.
pub fn correlation_matrix(
    table: &Table,
    columns: &[&str],
    method: CorrelationMethod,
) -> DataResult<CorrelationMatrix> {
    for c in columns {
        table.require_numeric(c)?;
    }
    let mut values = vec![vec![f64::NAN; columns.len()]; columns.len()];
    for (i, a) in columns.iter().enumerate() {
        for (j, b) in columns.iter().enumerate().skip(i) {
            let (x, y) = paired(table, a, b)?;
            let r = if x.len() < 2 {
                f64::NAN
            } else {
                coefficient(&x, &y, method)
            };
            values[i][j] = r;
            values[j][i] = r;
        }
    }
    Ok(CorrelationMatrix {
        columns: columns.iter().map(|c| c.to_string()).collect(),
        values,
    })
}

fn paired(table: &Table, a: &str, b: &str) -> DataResult<(Vec<f64>, Vec<f64>)> {
    let xs = table.floats(a)?;
    let ys = table.floats(b)?;
    Ok(xs
        .into_iter()
        .zip(ys)
        .filter_map(|(x, y)| Some((x?, y?)))
        .unzip())
}

fn coefficient(x: &[f64], y: &[f64], method: CorrelationMethod) -> f64 {
    match method {
        CorrelationMethod::Pearson => pearson(x, y),
        CorrelationMethod::Spearman => pearson(&average_ranks(x), &average_ranks(y)),
        CorrelationMethod::Kendall => kendall_tau_b(x, y),
    }
}

fn pearson(x: &[f64], y: &[f64]) -> f64 {
    let (Some(mx), Some(my)) = (mean(x), mean(y)) else {
        return f64::NAN;
    };
    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (a, b) in x.iter().zip(y) {
        let (dx, dy) = (a - mx, b - my);
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    if sxx == 0.0 || syy == 0.0 {
        return f64::NAN;
    }
    (sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0)
}

/// Kendall's tau-b, adjusting for ties in either variable.
fn kendall_tau_b(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len();
    if n < 2 {
        return f64::NAN;
    }
    let (mut concordant, mut discordant) = (0i64, 0i64);
    let (mut ties_x, mut ties_y) = (0i64, 0i64);
    for i in 0..n {
        for j in (i + 1)..n {
            let dx = x[i].partial_cmp(&x[j]).unwrap_or(Ordering::Equal);
            let dy = y[i].partial_cmp(&y[j]).unwrap_or(Ordering::Equal);
            match (dx, dy) {
                (Ordering::Equal, Ordering::Equal) => {
                    ties_x += 1;
                    ties_y += 1;
                }
                (Ordering::Equal, _) => ties_x += 1,
                (_, Ordering::Equal) => ties_y += 1,
                _ if dx == dy => concordant += 1,
                _ => discordant += 1,
            }
        }
    }
    let total = (n * (n - 1) / 2) as i64;
    let denom = (((total - ties_x) * (total - ties_y)) as f64).sqrt();
    if denom == 0.0 {
        return f64::NAN;
    }
    (concordant - discordant) as f64 / denom
}
