//! Shared series helpers for indicator calculations.
//!
//! Every helper returns one entry per input value; warm-up positions are
//! `None` rather than a sentinel.

/// Exponential moving average.
///
/// k = 2/(n+1), seeded with the SMA of the first n values, then
/// EMA[i] = EMA[i-1] + k * (x[i] - EMA[i-1]). First (n-1) values are `None`.
pub fn ema(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if period == 0 || values.len() < period {
        return out;
    }

    let k = 2.0 / (period as f64 + 1.0);
    let mut ema = values[..period].iter().sum::<f64>() / period as f64;
    out[period - 1] = Some(ema);
    for i in period..values.len() {
        ema += k * (values[i] - ema);
        out[i] = Some(ema);
    }
    out
}

/// EMA over a series that itself has a warm-up prefix.
pub fn ema_of_optional(values: &[Option<f64>], period: usize) -> Vec<Option<f64>> {
    let start = match values.iter().position(Option::is_some) {
        Some(s) => s,
        None => return vec![None; values.len()],
    };
    let tail: Option<Vec<f64>> = values[start..].iter().copied().collect();
    let mut out = vec![None; start];
    match tail {
        Some(tail) => out.extend(ema(&tail, period)),
        None => out.resize(values.len(), None),
    }
    out
}

/// Simple moving average over a trailing window.
pub fn sma(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if period == 0 {
        return out;
    }
    for i in (period - 1)..values.len() {
        let window = &values[i + 1 - period..=i];
        out[i] = Some(window.iter().sum::<f64>() / period as f64);
    }
    out
}

/// Wilder smoothing: seed with the mean of the first n values, then
/// avg = (prev * (n-1) + x) / n.
pub fn wilder(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if period == 0 || values.len() < period {
        return out;
    }
    let mut avg = values[..period].iter().sum::<f64>() / period as f64;
    out[period - 1] = Some(avg);
    for i in period..values.len() {
        avg = (avg * (period - 1) as f64 + values[i]) / period as f64;
        out[i] = Some(avg);
    }
    out
}

/// Average true range with Wilder smoothing.
pub fn atr(true_ranges: &[f64], period: usize) -> Vec<Option<f64>> {
    wilder(true_ranges, period)
}

/// Latest available value.
pub fn last(values: &[Option<f64>]) -> Option<f64> {
    values.last().copied().flatten()
}

/// Lift a complete series so it can be compared against warm-up series.
pub fn lift(values: &[f64]) -> Vec<Option<f64>> {
    values.iter().copied().map(Some).collect()
}

/// Clamp a score into [-1, 1]; non-finite values are neutral.
pub fn clamp_score(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(-1.0, 1.0)
    } else {
        0.0
    }
}

/// Percentage change from `from` to `to`; `None` when `from` is zero.
pub fn pct_change(from: f64, to: f64) -> Option<f64> {
    if from == 0.0 {
        None
    } else {
        Some((to - from) / from * 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn ema_warmup() {
        let out = ema(&[10.0, 20.0, 30.0, 40.0, 50.0], 3);
        assert!(out[0].is_none());
        assert!(out[1].is_none());
        assert!(out[2..].iter().all(Option::is_some));
    }

    #[test]
    fn ema_seed_is_sma() {
        let out = ema(&[10.0, 20.0, 30.0], 3);
        assert_relative_eq!(out[2].unwrap(), 20.0);
    }

    #[test]
    fn ema_recursive_calculation() {
        let out = ema(&[10.0, 20.0, 30.0, 40.0, 50.0], 3);
        let k = 2.0 / 4.0;
        let ema_3 = 40.0 * k + 20.0 * (1.0 - k);
        let ema_4 = 50.0 * k + ema_3 * (1.0 - k);
        assert_relative_eq!(out[3].unwrap(), ema_3, epsilon = 1e-12);
        assert_relative_eq!(out[4].unwrap(), ema_4, epsilon = 1e-12);
    }

    #[test]
    fn ema_constant_input_is_exact() {
        let out = ema(&[100.0; 60], 20);
        for v in out.iter().skip(19) {
            assert_eq!(v.unwrap(), 100.0);
        }
    }

    #[test]
    fn ema_period_1_tracks_input() {
        let out = ema(&[10.0, 20.0, 30.0], 1);
        assert_eq!(out, vec![Some(10.0), Some(20.0), Some(30.0)]);
    }

    #[test]
    fn ema_short_or_zero_period() {
        assert!(ema(&[1.0, 2.0], 3).iter().all(Option::is_none));
        assert!(ema(&[1.0, 2.0], 0).iter().all(Option::is_none));
        assert!(ema(&[], 3).is_empty());
    }

    #[test]
    fn ema_of_optional_skips_warmup() {
        let input = vec![None, None, Some(1.0), Some(2.0), Some(3.0)];
        let out = ema_of_optional(&input, 2);
        assert_eq!(out.len(), 5);
        assert!(out[..3].iter().all(Option::is_none));
        assert_relative_eq!(out[3].unwrap(), 1.5);
    }

    #[test]
    fn sma_basic() {
        let out = sma(&[1.0, 2.0, 3.0, 4.0], 2);
        assert_eq!(out, vec![None, Some(1.5), Some(2.5), Some(3.5)]);
    }

    #[test]
    fn wilder_seed_and_smoothing() {
        let out = wilder(&[10.0, 10.0, 10.0, 13.0], 3);
        assert_relative_eq!(out[2].unwrap(), 10.0);
        assert_relative_eq!(out[3].unwrap(), (10.0 * 2.0 + 13.0) / 3.0);
    }

    #[test]
    fn clamp_score_bounds() {
        assert_eq!(clamp_score(2.0), 1.0);
        assert_eq!(clamp_score(-2.0), -1.0);
        assert_eq!(clamp_score(0.25), 0.25);
        assert_eq!(clamp_score(f64::INFINITY), 0.0);
    }

    #[test]
    fn pct_change_from_zero() {
        assert_eq!(pct_change(0.0, 1.0), None);
        assert_relative_eq!(pct_change(100.0, 110.0).unwrap(), 10.0);
    }
}
