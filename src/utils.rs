use rand::Rng;

/// Rounds half-way cases to the nearest even integer.
///
/// Interval bounds and cipher widths use this rule, so a dataset such as
/// `[[64.5]]` gets the message-space maximum `65`.
pub fn round_half_even(x: f64) -> f64 {
    x.round_ties_even()
}

/// Rounds to `decimals` places, half-way cases to even.
pub fn round_to_decimals(x: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (x * factor).round_ties_even() / factor
}

/// Samples uniformly from `[0, bound)`, or returns zero for an empty range.
pub fn uniform_below<R: Rng + ?Sized>(rng: &mut R, bound: f64) -> f64 {
    if bound > 0.0 {
        rng.random_range(0.0..bound)
    } else {
        0.0
    }
}
