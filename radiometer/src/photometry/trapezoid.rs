//! Trapezoidal-rule integration over sampled data

/// Integrate `ys` over the abscissae `xs` with the trapezoidal rule
///
/// Spacing may be uneven. Fewer than two points integrate to zero.
///
/// # Panics
/// If `xs` and `ys` have different lengths.
pub fn trap_integrate(xs: &[f64], ys: &[f64]) -> f64 {
    assert_eq!(xs.len(), ys.len(), "X and Y vectors must have same length");

    xs.windows(2)
        .zip(ys.windows(2))
        .map(|(x, y)| (x[1] - x[0]) * (y[0] + y[1]) / 2.0)
        .sum()
}

/// Trapezoidal rule on an evenly spaced grid with step `dx`
///
/// Used by the hot path, where the grid is fixed and the spacing is known.
pub fn trap_integrate_uniform<I>(ys: I, dx: f64) -> f64
where
    I: IntoIterator<Item = f64>,
{
    let mut iter = ys.into_iter();
    let Some(first) = iter.next() else {
        return 0.0;
    };

    let mut interior = 0.0;
    let mut last = first;
    let mut count = 1usize;
    for y in iter {
        interior += last;
        last = y;
        count += 1;
    }

    if count < 2 {
        return 0.0;
    }

    // interior holds every sample but the last; drop the first from it too
    dx * ((interior - first) + (first + last) / 2.0)
}
