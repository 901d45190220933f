//! Descriptive statistics over price samples.
//!
//! Every function skips missing (non-finite) values and returns `None` when
//! the statistic is undefined. Callers decide the fallback explicitly, using
//! the named defaults below.

/// Reported volatility when the sample standard deviation is undefined (n < 2).
pub const UNDEFINED_VOLATILITY: f64 = 0.0;

/// Reported mean price when there is nothing to average.
pub const EMPTY_MEAN_PRICE: f64 = 0.0;

/// Finite values only.
pub fn present(values: &[f64]) -> Vec<f64> {
    values.iter().copied().filter(|v| v.is_finite()).collect()
}

/// Arithmetic mean of the present values.
pub fn mean(values: &[f64]) -> Option<f64> {
    let mut sum = 0.0;
    let mut n = 0usize;
    for v in values.iter().filter(|v| v.is_finite()) {
        sum += v;
        n += 1;
    }
    if n == 0 {
        None
    } else {
        Some(sum / n as f64)
    }
}

/// Sample standard deviation (denominator n - 1) of the present values.
///
/// Undefined for fewer than two values.
pub fn sample_std_dev(values: &[f64]) -> Option<f64> {
    let xs = present(values);
    if xs.len() < 2 {
        return None;
    }
    let n = xs.len() as f64;
    let m = xs.iter().sum::<f64>() / n;
    let ss: f64 = xs.iter().map(|x| (x - m).powi(2)).sum();
    Some((ss / (n - 1.0)).sqrt())
}

/// Minimum of the present values.
pub fn min(values: &[f64]) -> Option<f64> {
    values
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .reduce(f64::min)
}

/// Maximum of the present values.
pub fn max(values: &[f64]) -> Option<f64> {
    values
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .reduce(f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::precision::price_eq;

    #[test]
    fn test_mean_skips_missing() {
        assert_eq!(mean(&[1.0, f64::NAN, 3.0]), Some(2.0));
        assert_eq!(mean(&[]), None);
        assert_eq!(mean(&[f64::NAN]), None);
    }

    #[test]
    fn test_sample_std_dev() {
        // values 2,4,4,4,5,5,7,9: population sd 2, sample sd sqrt(32/7)
        let xs = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let sd = sample_std_dev(&xs).unwrap();
        assert!(price_eq(sd, (32.0f64 / 7.0).sqrt()));
    }

    #[test]
    fn test_single_observation_std_dev_is_undefined() {
        assert_eq!(sample_std_dev(&[100.0]), None);
        assert_eq!(sample_std_dev(&[100.0, f64::NAN]), None);
        assert_eq!(
            sample_std_dev(&[100.0]).unwrap_or(UNDEFINED_VOLATILITY),
            0.0
        );
    }

    #[test]
    fn test_min_max() {
        assert_eq!(min(&[3.0, f64::NAN, 1.0]), Some(1.0));
        assert_eq!(max(&[3.0, f64::NAN, 1.0]), Some(3.0));
        assert_eq!(max(&[]), None);
    }
}
