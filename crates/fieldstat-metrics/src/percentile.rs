// Percentile ranking against a peer distribution.

/// Inclusive "less-or-equal" percentile of `value` within `pool`, 0..=100.
///
/// `round(100 * |{x <= value}| / |pool|)`. With `invert` the result is
/// `100 - rank`, for metrics where lower is better. Non-finite pool values
/// are skipped. An empty pool (after skipping) ranks 0 in both directions.
pub fn rank(pool: &[f64], value: f64, invert: bool) -> u8 {
    let mut size = 0usize;
    let mut at_or_below = 0usize;
    for &x in pool.iter().filter(|x| x.is_finite()) {
        size += 1;
        if x <= value {
            at_or_below += 1;
        }
    }
    if size == 0 {
        return 0;
    }

    let pct = (100.0 * at_or_below as f64 / size as f64).round() as u8;
    if invert {
        100 - pct
    } else {
        pct
    }
}

/// Rank an optional subject value against optional pool values.
///
/// Undefined pool entries are left out of the distribution. An undefined
/// subject value ranks 0.
pub fn rank_opt(pool: &[Option<f64>], value: Option<f64>, invert: bool) -> u8 {
    let Some(value) = value.filter(|v| v.is_finite()) else {
        return 0;
    };
    let defined: Vec<f64> = pool.iter().flatten().copied().collect();
    rank(&defined, value, invert)
}
