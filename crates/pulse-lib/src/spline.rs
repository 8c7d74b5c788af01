use crate::error::{PulseError, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterpolationKind {
    Linear,
    #[default]
    Cubic,
}

/// 1-D interpolant over strictly increasing knots. Evaluation outside the knot
/// range is an error; there is no extrapolation.
#[derive(Debug, Clone)]
pub struct Interpolator {
    x: Vec<f64>,
    y: Vec<f64>,
    /// Second derivatives at the knots (natural cubic spline). Empty for linear.
    m: Vec<f64>,
}

impl Interpolator {
    pub fn new(kind: InterpolationKind, x: Vec<f64>, y: Vec<f64>) -> Result<Self> {
        if x.len() != y.len() {
            return Err(PulseError::InvalidInput(format!(
                "knot count mismatch: {} x vs {} y",
                x.len(),
                y.len()
            )));
        }
        if x.len() < 2 {
            return Err(PulseError::InvalidInput(
                "interpolation needs at least two samples".into(),
            ));
        }
        if x.windows(2).any(|w| w[1] <= w[0]) {
            return Err(PulseError::InvalidInput(
                "interpolation knots must be strictly increasing".into(),
            ));
        }
        let m = match kind {
            InterpolationKind::Linear => Vec::new(),
            InterpolationKind::Cubic => natural_second_derivatives(&x, &y),
        };
        Ok(Self { x, y, m })
    }

    pub fn domain(&self) -> (f64, f64) {
        (self.x[0], self.x[self.x.len() - 1])
    }

    pub fn eval(&self, t: f64) -> Result<f64> {
        let (lo, hi) = self.domain();
        if !(t >= lo && t <= hi) {
            return Err(PulseError::InvalidInput(format!(
                "{} is outside the interpolation range [{}, {}]",
                t, lo, hi
            )));
        }
        let seg = self
            .x
            .partition_point(|&k| k <= t)
            .saturating_sub(1)
            .min(self.x.len() - 2);
        let (x0, x1) = (self.x[seg], self.x[seg + 1]);
        let (y0, y1) = (self.y[seg], self.y[seg + 1]);
        let h = x1 - x0;
        if self.m.is_empty() {
            return Ok(y0 + (y1 - y0) * (t - x0) / h);
        }
        let (m0, m1) = (self.m[seg], self.m[seg + 1]);
        let a = (x1 - t) / h;
        let b = (t - x0) / h;
        Ok(a * y0 + b * y1 + ((a.powi(3) - a) * m0 + (b.powi(3) - b) * m1) * h * h / 6.0)
    }

    pub fn eval_many(&self, ts: &[f64]) -> Result<Vec<f64>> {
        ts.iter().map(|&t| self.eval(t)).collect()
    }
}

/// Solve the tridiagonal system for a natural spline (zero curvature at both ends).
fn natural_second_derivatives(x: &[f64], y: &[f64]) -> Vec<f64> {
    let n = x.len();
    let mut m = vec![0.0; n];
    if n < 3 {
        return m;
    }
    // Thomas algorithm over the interior knots 1..n-1
    let mut c_prime = vec![0.0; n];
    let mut d_prime = vec![0.0; n];
    for i in 1..n - 1 {
        let h0 = x[i] - x[i - 1];
        let h1 = x[i + 1] - x[i];
        let a = h0;
        let b = 2.0 * (h0 + h1);
        let c = h1;
        let d = 6.0 * ((y[i + 1] - y[i]) / h1 - (y[i] - y[i - 1]) / h0);
        let denom = b - a * c_prime[i - 1];
        c_prime[i] = c / denom;
        d_prime[i] = (d - a * d_prime[i - 1]) / denom;
    }
    for i in (1..n - 1).rev() {
        m[i] = d_prime[i] - c_prime[i] * m[i + 1];
    }
    m
}
