//! Centered rolling-window statistics.
//!
//! Every statistic returns one `Option<f64>` per input position. A position is
//! `None` when fewer than `min_periods` present values fall inside its window,
//! so callers decide explicitly what to do with the margins. Missing input
//! values (`None`) are skipped and do not count towards `min_periods`.

/// Centered window of `size` samples. For position `i` the window covers
/// `[i - size / 2, i + (size - 1) - size / 2]`, clipped to the series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RollingWindow {
    pub size: usize,
    pub min_periods: usize,
}

impl RollingWindow {
    /// Window that requires every slot to be filled (edges come back as `None`).
    pub fn full(size: usize) -> Self {
        let size = size.max(1);
        Self {
            size,
            min_periods: size,
        }
    }

    /// Window that reports a value as soon as one sample is available.
    pub fn lenient(size: usize) -> Self {
        Self {
            size: size.max(1),
            min_periods: 1,
        }
    }

    fn bounds(&self, i: usize, len: usize) -> (usize, usize) {
        let half = self.size / 2;
        let lo = i.saturating_sub(half);
        let hi = (i + (self.size - 1) - half).min(len - 1);
        (lo, hi)
    }

    pub fn mean(&self, data: &[Option<f64>]) -> Vec<Option<f64>> {
        self.moments(data)
            .into_iter()
            .map(|m| m.map(|(mean, _)| mean))
            .collect()
    }

    /// Sample standard deviation (one degree of freedom).
    pub fn std(&self, data: &[Option<f64>]) -> Vec<Option<f64>> {
        self.moments(data)
            .into_iter()
            .map(|m| m.and_then(|(_, sd)| sd))
            .collect()
    }

    pub fn median(&self, data: &[Option<f64>]) -> Vec<Option<f64>> {
        self.quantile(data, 0.5)
    }

    /// Quantile with linear interpolation between order statistics.
    pub fn quantile(&self, data: &[Option<f64>], q: f64) -> Vec<Option<f64>> {
        let len = data.len();
        let mut out = Vec::with_capacity(len);
        if len == 0 {
            return out;
        }
        let mut sorted: Vec<f64> = Vec::with_capacity(self.size);
        let mut next_in = 0usize;
        let mut next_out = 0usize;
        for i in 0..len {
            let (lo, hi) = self.bounds(i, len);
            while next_in <= hi {
                if let Some(v) = data[next_in] {
                    let pos = sorted.partition_point(|&x| x < v);
                    sorted.insert(pos, v);
                }
                next_in += 1;
            }
            while next_out < lo {
                if let Some(v) = data[next_out] {
                    let pos = sorted.partition_point(|&x| x < v);
                    sorted.remove(pos);
                }
                next_out += 1;
            }
            if sorted.len() < self.min_periods || sorted.is_empty() {
                out.push(None);
            } else {
                out.push(Some(interpolated_quantile(&sorted, q)));
            }
        }
        out
    }

    /// Sliding mean and sample standard deviation using Welford updates.
    fn moments(&self, data: &[Option<f64>]) -> Vec<Option<(f64, Option<f64>)>> {
        let len = data.len();
        let mut out = Vec::with_capacity(len);
        if len == 0 {
            return out;
        }
        let mut n = 0usize;
        let mut mean = 0.0;
        let mut m2 = 0.0;
        let mut next_in = 0usize;
        let mut next_out = 0usize;
        for i in 0..len {
            let (lo, hi) = self.bounds(i, len);
            while next_in <= hi {
                if let Some(x) = data[next_in] {
                    n += 1;
                    let delta = x - mean;
                    mean += delta / n as f64;
                    m2 += delta * (x - mean);
                }
                next_in += 1;
            }
            while next_out < lo {
                if let Some(x) = data[next_out] {
                    n -= 1;
                    if n == 0 {
                        mean = 0.0;
                        m2 = 0.0;
                    } else {
                        let delta = x - mean;
                        mean -= delta / n as f64;
                        m2 -= delta * (x - mean);
                    }
                }
                next_out += 1;
            }
            if n < self.min_periods || n == 0 {
                out.push(None);
            } else {
                let sd = (n > 1).then(|| (m2.max(0.0) / (n - 1) as f64).sqrt());
                out.push(Some((mean, sd)));
            }
        }
        out
    }
}

/// Linear-interpolated quantile of an ascending, non-empty slice.
pub fn interpolated_quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

/// Median of an unordered slice, ignoring NaN. `None` for empty input.
pub fn median(data: &[f64]) -> Option<f64> {
    let mut sorted: Vec<f64> = data.iter().copied().filter(|x| !x.is_nan()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(f64::total_cmp);
    Some(interpolated_quantile(&sorted, 0.5))
}

/// Treat NaN samples as missing.
pub fn present(data: &[f64]) -> Vec<Option<f64>> {
    data.iter()
        .map(|&x| if x.is_nan() { None } else { Some(x) })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: f64, b: f64, tol: f64) {
        assert!((a - b).abs() <= tol, "{} vs {} (tol {})", a, b, tol);
    }

    #[test]
    fn full_window_leaves_margins_empty() {
        let data = present(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        let mean = RollingWindow::full(3).mean(&data);
        assert_eq!(mean, vec![None, Some(2.0), Some(3.0), Some(4.0), None]);
    }

    #[test]
    fn even_window_is_shifted_left() {
        // size 4 at i covers [i - 2, i + 1]
        let data = present(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let mean = RollingWindow::full(4).mean(&data);
        assert_eq!(mean[0], None);
        assert_eq!(mean[1], None);
        assert_eq!(mean[2], Some(2.5));
        assert_eq!(mean[4], Some(4.5));
        assert_eq!(mean[5], None);
    }

    #[test]
    fn std_matches_direct_computation() {
        let raw: Vec<f64> = (0..50).map(|i| ((i * 7) % 11) as f64 * 0.3).collect();
        let std = RollingWindow::full(5).std(&present(&raw));
        for i in 2..48 {
            let w = &raw[i - 2..=i + 2];
            let m = w.iter().sum::<f64>() / 5.0;
            let var = w.iter().map(|x| (x - m).powi(2)).sum::<f64>() / 4.0;
            assert_close(std[i].unwrap(), var.sqrt(), 1e-9);
        }
    }

    #[test]
    fn lenient_quantiles_cover_edges() {
        let data = present(&[5.0, 1.0, 4.0, 2.0, 3.0]);
        let med = RollingWindow::lenient(3).median(&data);
        assert_eq!(
            med,
            vec![Some(3.0), Some(4.0), Some(2.0), Some(3.0), Some(2.5)]
        );
        let q1 = RollingWindow::lenient(5).quantile(&data, 0.25);
        // position 0 sees [5, 1, 4] -> sorted [1, 4, 5], pos 0.5
        assert_close(q1[0].unwrap(), 2.5, 1e-12);
        assert_close(q1[2].unwrap(), 2.0, 1e-12);
    }

    #[test]
    fn missing_values_do_not_count() {
        let data = vec![None, Some(1.0), Some(3.0), None, Some(5.0)];
        let mean = RollingWindow::full(3).mean(&data);
        assert_eq!(mean, vec![None, None, None, None, None]);
        let lenient = RollingWindow::lenient(3).mean(&data);
        assert_eq!(
            lenient,
            vec![Some(1.0), Some(2.0), Some(2.0), Some(4.0), Some(5.0)]
        );
    }

    #[test]
    fn median_ignores_nan() {
        assert_eq!(median(&[3.0, f64::NAN, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&[]), None);
    }
}
