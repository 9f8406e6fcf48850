//! Crossing detection.
//!
//! A cross fires on the single bar where the relationship flips:
//! `a[t-1] <= b[t-1] && a[t] > b[t]` for above, mirrored for below.
//! Bar 0 never crosses, a missing value on either bar never crosses, and
//! nothing after `t` is inspected.

fn pair(a: &[Option<f64>], b: &[Option<f64>], t: usize) -> Option<(f64, f64, f64, f64)> {
    if t == 0 || t >= a.len() || t >= b.len() {
        return None;
    }
    Some((a[t - 1]?, b[t - 1]?, a[t]?, b[t]?))
}

pub fn crossed_above(a: &[Option<f64>], b: &[Option<f64>], t: usize) -> bool {
    match pair(a, b, t) {
        Some((a_prev, b_prev, a_curr, b_curr)) => a_prev <= b_prev && a_curr > b_curr,
        None => false,
    }
}

pub fn crossed_below(a: &[Option<f64>], b: &[Option<f64>], t: usize) -> bool {
    match pair(a, b, t) {
        Some((a_prev, b_prev, a_curr, b_curr)) => a_prev >= b_prev && a_curr < b_curr,
        None => false,
    }
}

/// Cross above on the latest bar.
pub fn crossed_above_last(a: &[Option<f64>], b: &[Option<f64>]) -> bool {
    a.len().checked_sub(1).is_some_and(|t| crossed_above(a, b, t))
}

/// Cross below on the latest bar.
pub fn crossed_below_last(a: &[Option<f64>], b: &[Option<f64>]) -> bool {
    a.len().checked_sub(1).is_some_and(|t| crossed_below(a, b, t))
}
