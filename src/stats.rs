//! Small numeric helpers shared by the indices.
//!
//! Reductions whose name starts with `nan_` skip NaN inputs, which is how
//! undefined correlations flow through aggregates without poisoning them.

use statrs::statistics::Statistics;

/// Pearson product-moment correlation. NaN when either side has zero variance
/// or fewer than two observations.
pub fn pearson(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len();
    if n < 2 || y.len() != n {
        return f64::NAN;
    }
    let mx = x.iter().sum::<f64>() / n as f64;
    let my = y.iter().sum::<f64>() / n as f64;
    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for (a, b) in x.iter().zip(y.iter()) {
        let dx = a - mx;
        let dy = b - my;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    if sxx <= 0.0 || syy <= 0.0 {
        return f64::NAN;
    }
    (sxy / (sxx.sqrt() * syy.sqrt())).clamp(-1.0, 1.0)
}

/// Fisher's z-transform. `|r| = 1` maps to an infinity of the same sign.
pub fn fisher_z(r: f64) -> f64 {
    r.atanh()
}

/// Mean over the non-NaN values; NaN if there are none.
pub fn nan_mean(values: &[f64]) -> f64 {
    values.iter().copied().filter(|v| !v.is_nan()).mean()
}

/// Sum over the non-NaN values, or `None` if every value is NaN.
pub fn nan_sum(values: impl IntoIterator<Item = f64>) -> Option<f64> {
    let mut seen = false;
    let mut acc = 0.0;
    for v in values {
        if !v.is_nan() {
            seen = true;
            acc += v;
        }
    }
    seen.then_some(acc)
}

/// Sample standard deviation (n − 1) over the non-NaN values.
pub fn nan_std_dev(values: &[f64]) -> f64 {
    values.iter().copied().filter(|v| !v.is_nan()).std_dev()
}

pub fn round_to(value: f64, digits: u32) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let factor = 10f64.powi(digits as i32);
    (value * factor).round() / factor
}

/// Round only when a digit count is given.
pub fn maybe_round(value: f64, digits: Option<u32>) -> f64 {
    match digits {
        Some(d) => round_to(value, d),
        None => value,
    }
}

pub fn choose(n: usize, k: usize) -> usize {
    if k > n {
        return 0;
    }
    let k = k.min(n - k);
    let mut acc: usize = 1;
    for i in 0..k {
        acc = acc * (n - i) / (i + 1);
    }
    acc
}

/// All 3-combinations of `0..n` in lexicographic order.
pub fn triads(n: usize) -> Vec<[usize; 3]> {
    let mut out = Vec::with_capacity(choose(n, 3));
    for a in 0..n {
        for b in (a + 1)..n {
            for c in (b + 1)..n {
                out.push([a, b, c]);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() <= 1e-12
    }

    #[test]
    fn pearson_matches_hand_computation() {
        assert!(approx(pearson(&[1.0, 2.0, 3.0], &[2.0, 4.0, 6.0]), 1.0));
        assert!(approx(pearson(&[1.0, 2.0, 3.0], &[3.0, 2.0, 1.0]), -1.0));
        // sxy = 1, sxx = syy = 2
        assert!(approx(pearson(&[1.0, 2.0, 3.0], &[1.0, 3.0, 2.0]), 0.5));
    }

    #[test]
    fn pearson_is_nan_for_constant_input() {
        assert!(pearson(&[2.0, 2.0, 2.0], &[1.0, 2.0, 3.0]).is_nan());
        assert!(pearson(&[1.0], &[1.0]).is_nan());
    }

    #[test]
    fn nan_reductions_skip_missing_values() {
        assert!(approx(nan_mean(&[1.0, f64::NAN, 3.0]), 2.0));
        assert!(nan_mean(&[f64::NAN]).is_nan());
        assert_eq!(nan_sum([1.0, f64::NAN, 2.0]), Some(3.0));
        assert_eq!(nan_sum([f64::NAN]), None);
        assert!(approx(nan_std_dev(&[1.0, 3.0, f64::NAN]), 2f64.sqrt()));
    }

    #[test]
    fn triads_enumerate_all_combinations_in_order() {
        let t = triads(5);
        assert_eq!(t.len(), 10);
        assert_eq!(t[0], [0, 1, 2]);
        assert_eq!(t[9], [2, 3, 4]);
        assert_eq!(choose(6, 2), 15);
        assert_eq!(choose(2, 3), 0);
        assert!(triads(2).is_empty());
    }

    #[test]
    fn rounding_and_fisher_z() {
        assert_eq!(round_to(0.12345, 2), 0.12);
        assert!(round_to(f64::NAN, 2).is_nan());
        assert_eq!(maybe_round(0.126, None), 0.126);
        assert!(approx(fisher_z(0.0), 0.0));
        assert!(fisher_z(1.0).is_infinite() && fisher_z(1.0) > 0.0);
        assert!(approx(fisher_z(0.5), 0.5493061443340549));
    }
}
