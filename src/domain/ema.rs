//! Exponential moving averages.
//!
//! Standard recursive exponential smoothing with `α = 2 / (span + 1)`,
//! seeded by the first observation and propagated forward. This matches
//! span-parameterized EMA conventions (pandas `ewm(span, adjust=False)`)
//! and is NOT a simple or centered moving average.

/// Compute the full EMA series for `values` with the given span.
///
/// `out[0]` equals `values[0]` (the seed); each later point is
/// `α·x + (1-α)·prev`. Returns an empty vector for empty input.
///
/// # Panics
/// Panics if `span` is zero.
pub fn ema_series(values: &[f64], span: usize) -> Vec<f64> {
    assert!(span > 0, "EMA span must be positive");

    let alpha = 2.0 / (span as f64 + 1.0);
    let mut out = Vec::with_capacity(values.len());
    let mut prev = match values.first() {
        Some(&v) => v,
        None => return out,
    };
    out.push(prev);

    for &v in &values[1..] {
        prev = alpha * v + (1.0 - alpha) * prev;
        out.push(prev);
    }
    out
}

/// The final EMA value for `values`, or `None` for empty input.
pub fn ema_last(values: &[f64], span: usize) -> Option<f64> {
    ema_series(values, span).last().copied()
}
