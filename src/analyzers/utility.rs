use std::cmp::Ordering;

/// Computes the arithmetic mean of a slice of values. Returns `None` for empty input.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample variance (n - 1 denominator). Needs at least two values.
pub fn sample_variance(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let ss = values.iter().map(|v| (v - m).powi(2)).sum::<f64>();
    Some(ss / (values.len() - 1) as f64)
}

pub fn sample_std(values: &[f64]) -> Option<f64> {
    sample_variance(values).map(f64::sqrt)
}

pub fn sorted(values: &[f64]) -> Vec<f64> {
    let mut v = values.to_vec();
    v.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    v
}

/// Quantile `q` of already sorted values, interpolating linearly between
/// the two closest ranks.
pub fn quantile_sorted(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

pub fn median(values: &[f64]) -> Option<f64> {
    quantile_sorted(&sorted(values), 0.5)
}

/// 1-based ranks, ties sharing the average of their positions.
pub fn average_ranks(values: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].partial_cmp(&values[b]).unwrap_or(Ordering::Equal));

    let mut ranks = vec![0.0; values.len()];
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && values[order[j + 1]] == values[order[i]] {
            j += 1;
        }
        let rank = (i + j) as f64 / 2.0 + 1.0;
        for &idx in &order[i..=j] {
            ranks[idx] = rank;
        }
        i = j + 1;
    }
    ranks
}

/// Gaussian kernel density estimate evaluated at `points`, using Scott's
/// rule for the bandwidth. Empty when the bandwidth is undefined or zero.
pub fn gaussian_kde(values: &[f64], points: &[f64]) -> Vec<f64> {
    let n = values.len() as f64;
    let bandwidth = match sample_std(values) {
        Some(std) if std > 0.0 => std * n.powf(-0.2),
        _ => return Vec::new(),
    };
    let norm = 1.0 / (n * bandwidth * (2.0 * std::f64::consts::PI).sqrt());
    points
        .iter()
        .map(|x| {
            values
                .iter()
                .map(|v| (-0.5 * ((x - v) / bandwidth).powi(2)).exp())
                .sum::<f64>()
                * norm
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_and_variance() {
        assert_eq!(mean(&[]), None);
        assert_eq!(mean(&[1.0, 2.0, 3.0]), Some(2.0));
        assert_eq!(sample_variance(&[4.0]), None);
        assert_eq!(sample_variance(&[5.0, 0.0, 0.0, 15.0]), Some(50.0));
    }

    #[test]
    fn test_quantile_linear() {
        let v = sorted(&[5.0, 0.0, 10.0, 5.0, 0.0, 15.0]);
        assert_eq!(quantile_sorted(&v, 0.25), Some(0.0 + (5.0 - 0.0) * 0.25));
        assert_eq!(quantile_sorted(&v, 0.5), Some(5.0));
        assert_eq!(quantile_sorted(&v, 0.75), Some(8.75));
        assert_eq!(quantile_sorted(&[], 0.5), None);
    }

    #[test]
    fn test_average_ranks_ties() {
        assert_eq!(average_ranks(&[10.0, 20.0, 10.0, 30.0]), vec![1.5, 3.0, 1.5, 4.0]);
    }

    #[test]
    fn test_kde_integrates_to_about_one() {
        let values = [5.0, 0.0, 10.0, 5.0, 0.0, 15.0];
        let step = 0.1;
        let grid: Vec<f64> = (0..600).map(|i| -15.0 + i as f64 * step).collect();
        let area: f64 = gaussian_kde(&values, &grid).iter().sum::<f64>() * step;
        assert!((area - 1.0).abs() < 0.01, "area = {area}");
        assert!(gaussian_kde(&[3.0, 3.0], &grid).is_empty());
    }
}
