/// Shape-preserving piecewise cubic Hermite interpolation (PCHIP)
///
/// Interpolates a set of data points with piecewise cubic polynomials whose
/// slopes are chosen by the Fritsch–Carlson rule, so the interpolant is
/// monotone wherever the data is monotone and never overshoots the local
/// data range between two samples. This matters for sensor response curves:
/// a natural cubic spline through noisy, sparse samples can swing below zero,
/// which is not a physical sensitivity.
///
/// # Mathematical Background
///
/// With h_k = x_{k+1} - x_k and secant slopes δ_k = (y_{k+1} - y_k) / h_k,
/// interior derivatives are the weighted harmonic mean
///
/// 1/d_k = (w1/δ_{k-1} + w2/δ_k) / (w1 + w2),  w1 = 2h_k + h_{k-1},  w2 = h_k + 2h_{k-1}
///
/// and d_k = 0 whenever the neighbouring secants differ in sign or either is
/// zero. End derivatives use the three-point non-centered formula, clipped so
/// they keep the sign of the end secant and stay within 3δ.
///
/// Each segment is stored as S(x) = a + b(x-xi) + c(x-xi)² + d(x-xi)³.
///
/// # Examples
///
/// ```rust
/// use radiometer::algo::spline::PchipSpline;
///
/// let x = vec![0.0, 1.0, 2.0, 3.0];
/// let y = vec![0.0, 0.1, 0.9, 1.0];
/// let spline = PchipSpline::new(x, y);
///
/// let value = spline.evaluate(1.5);
/// assert!(value > 0.1 && value < 0.9);
/// ```
#[derive(Debug, Clone)]
pub struct PchipSpline {
    x: Vec<f64>,
    coeffs: Vec<[f64; 4]>, // a, b, c, d coefficients for each segment
}

impl PchipSpline {
    /// Create a new PCHIP interpolant from input points
    ///
    /// # Arguments
    /// * `x` - X coordinates (must be sorted in ascending order, no duplicates)
    /// * `y` - Y coordinates corresponding to x values
    ///
    /// # Panics
    /// - If x and y vectors have different lengths
    /// - If fewer than 2 points are provided
    /// - If x values are not sorted in strictly ascending order
    ///
    /// Callers loading external data validate it first; these are programming errors.
    pub fn new(x: Vec<f64>, y: Vec<f64>) -> Self {
        assert_eq!(x.len(), y.len(), "X and Y vectors must have same length");
        assert!(x.len() >= 2, "Need at least 2 points for interpolation");

        for i in 1..x.len() {
            assert!(
                x[i] > x[i - 1],
                "X values must be sorted in ascending order"
            );
        }

        let derivatives = Self::derivatives(&x, &y);
        let coeffs = Self::hermite_coefficients(&x, &y, &derivatives);

        PchipSpline { x, coeffs }
    }

    /// Fritsch–Carlson slopes at every knot
    fn derivatives(x: &[f64], y: &[f64]) -> Vec<f64> {
        let n = x.len();
        let h: Vec<f64> = x.windows(2).map(|w| w[1] - w[0]).collect();
        let delta: Vec<f64> = (0..n - 1).map(|k| (y[k + 1] - y[k]) / h[k]).collect();

        if n == 2 {
            return vec![delta[0], delta[0]];
        }

        let mut d = vec![0.0; n];
        for k in 1..n - 1 {
            let (m0, m1) = (delta[k - 1], delta[k]);
            if m0 == 0.0 || m1 == 0.0 || m0.signum() != m1.signum() {
                d[k] = 0.0;
            } else {
                let w1 = 2.0 * h[k] + h[k - 1];
                let w2 = h[k] + 2.0 * h[k - 1];
                d[k] = (w1 + w2) / (w1 / m0 + w2 / m1);
            }
        }

        d[0] = Self::edge_derivative(h[0], h[1], delta[0], delta[1]);
        d[n - 1] = Self::edge_derivative(h[n - 2], h[n - 3], delta[n - 2], delta[n - 3]);

        d
    }

    /// Three-point end slope, clipped to preserve shape
    fn edge_derivative(h0: f64, h1: f64, m0: f64, m1: f64) -> f64 {
        let d = ((2.0 * h0 + h1) * m0 - h0 * m1) / (h0 + h1);

        if sign(d) != sign(m0) {
            0.0
        } else if sign(m0) != sign(m1) && d.abs() > 3.0 * m0.abs() {
            3.0 * m0
        } else {
            d
        }
    }

    fn hermite_coefficients(x: &[f64], y: &[f64], d: &[f64]) -> Vec<[f64; 4]> {
        (0..x.len() - 1)
            .map(|k| {
                let h = x[k + 1] - x[k];
                let delta = (y[k + 1] - y[k]) / h;
                let c = (3.0 * delta - 2.0 * d[k] - d[k + 1]) / h;
                let cubic = (d[k] + d[k + 1] - 2.0 * delta) / (h * h);
                [y[k], d[k], c, cubic]
            })
            .collect()
    }

    /// Evaluate the interpolant at a given x value
    ///
    /// Outside the knot range the boundary segment's cubic is extended, which
    /// matches what callers of calibrated tables get from the usual numerical
    /// libraries. Extrapolated values carry no monotonicity or bound guarantee.
    ///
    /// # Performance
    /// Evaluation time is O(log n) due to binary search for segment location.
    pub fn evaluate(&self, x: f64) -> f64 {
        let segment = self.find_segment(x);
        let dx = x - self.x[segment];
        let [a, b, c, d] = self.coeffs[segment];

        // Evaluate cubic polynomial: a + b*dx + c*dx^2 + d*dx^3
        a + dx * (b + dx * (c + dx * d))
    }

    /// Lowest and highest knot
    pub fn domain(&self) -> (f64, f64) {
        (self.x[0], self.x[self.x.len() - 1])
    }

    /// Find which segment contains the given x value
    ///
    /// Values left of the first knot map to the first segment and values right
    /// of the last knot map to the last segment.
    fn find_segment(&self, x: f64) -> usize {
        let last_segment = self.x.len() - 2;
        if x <= self.x[0] {
            return 0;
        }
        if x >= self.x[last_segment + 1] {
            return last_segment;
        }

        let mut left = 0;
        let mut right = self.x.len() - 1;

        while left < right - 1 {
            let mid = (left + right) / 2;
            if x < self.x[mid] {
                right = mid;
            } else {
                left = mid;
            }
        }
        left
    }
}

/// numpy-style sign: zero maps to zero
fn sign(v: f64) -> i8 {
    if v > 0.0 {
        1
    } else if v < 0.0 {
        -1
    } else {
        0
    }
}
