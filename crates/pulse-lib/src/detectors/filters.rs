//! Causal building blocks for the R-peak detectors.

use std::f64::consts::PI;

fn time_constant(cutoff: f64) -> f64 {
    1.0 / (2.0 * PI * cutoff.max(0.01))
}

/// First-order RC high-pass, starting from rest: a constant input maps to zero.
pub fn highpass(data: &[f64], fs: f64, cutoff: f64) -> Vec<f64> {
    let rc = time_constant(cutoff);
    let k = rc / (rc + 1.0 / fs);
    let mut y = 0.0;
    let mut prev = data.first().copied().unwrap_or(0.0);
    data.iter()
        .map(|&x| {
            y = k * (y + x - prev);
            prev = x;
            y
        })
        .collect()
}

/// First-order RC low-pass, primed with the first sample.
pub fn lowpass(data: &[f64], fs: f64, cutoff: f64) -> Vec<f64> {
    let rc = time_constant(cutoff);
    let dt = 1.0 / fs;
    let k = dt / (rc + dt);
    let mut y = data.first().copied().unwrap_or(0.0);
    data.iter()
        .map(|&x| {
            y += k * (x - y);
            y
        })
        .collect()
}

/// `highpass` at `low` followed by `lowpass` at `high`. A non-positive `low`
/// skips the first stage, a `high` outside `(0, fs / 2)` the second.
pub fn bandpass(data: &[f64], fs: f64, low: f64, high: f64) -> Vec<f64> {
    let passed = if low > 0.0 {
        highpass(data, fs, low)
    } else {
        data.to_vec()
    };
    if high > 0.0 && high < 0.5 * fs {
        lowpass(&passed, fs, high)
    } else {
        passed
    }
}

/// Backward difference over `lag` samples; the first `lag` outputs are zero.
pub fn difference(data: &[f64], lag: usize) -> Vec<f64> {
    let mut out = vec![0.0; data.len()];
    for i in lag.max(1)..data.len() {
        out[i] = data[i] - data[i - lag.max(1)];
    }
    out
}

pub fn square(data: &[f64]) -> Vec<f64> {
    data.iter().map(|x| x * x).collect()
}

/// Trailing mean over `win` samples, with a zero-padded history.
pub fn moving_average(data: &[f64], win: usize) -> Vec<f64> {
    if win <= 1 {
        return data.to_vec();
    }
    let scale = win as f64;
    let mut sum = 0.0;
    (0..data.len())
        .map(|i| {
            sum += data[i];
            if let Some(old) = i.checked_sub(win) {
                sum -= data[old];
            }
            sum / scale
        })
        .collect()
}

/// Index of the largest sample in `data[lo..=hi]` (clipped to the data).
pub fn argmax_in(data: &[f64], lo: usize, hi: usize) -> usize {
    let hi = hi.min(data.len().saturating_sub(1));
    let mut idx = lo.min(hi);
    let mut best = f64::NEG_INFINITY;
    for (j, &v) in data.iter().enumerate().take(hi + 1).skip(lo) {
        if v > best {
            best = v;
            idx = j;
        }
    }
    idx
}

/// Samples in `seconds` at `fs`, at least one.
pub fn samples(seconds: f64, fs: f64) -> usize {
    ((seconds * fs).round() as usize).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn highpass_removes_offset() {
        let out = highpass(&[5.0; 500], 250.0, 1.0);
        assert!(out.iter().all(|x| x.abs() < 1e-12));
    }

    #[test]
    fn highpass_step_decays() {
        let mut data = vec![0.0; 10];
        data.extend(vec![1.0; 2000]);
        let out = highpass(&data, 250.0, 1.0);
        assert!(out[10] > 0.9);
        assert!(out[out.len() - 1].abs() < 1e-6);
    }

    #[test]
    fn lowpass_settles_on_constant() {
        let mut data = vec![0.0; 10];
        data.extend(vec![1.0; 500]);
        let out = lowpass(&data, 250.0, 10.0);
        assert!((out[out.len() - 1] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn bandpass_stages_can_be_skipped() {
        let data = [0.0, 1.0, 0.0, -1.0, 0.0];
        assert_eq!(bandpass(&data, 100.0, 0.0, 80.0), data.to_vec());
        assert_eq!(bandpass(&data, 100.0, 0.0, 10.0), lowpass(&data, 100.0, 10.0));
        assert!(bandpass(&[], 100.0, 5.0, 15.0).is_empty());
    }

    #[test]
    fn difference_and_average() {
        let data = [1.0, 2.0, 4.0, 7.0, 11.0];
        assert_eq!(difference(&data, 1), vec![0.0, 1.0, 2.0, 3.0, 4.0]);
        assert_eq!(difference(&data, 2), vec![0.0, 0.0, 3.0, 5.0, 7.0]);
        assert_eq!(moving_average(&[2.0, 4.0, 6.0, 8.0], 2), vec![1.0, 3.0, 5.0, 7.0]);
    }

    #[test]
    fn argmax_clips_range() {
        let data = [1.0, 5.0, 2.0, 9.0];
        assert_eq!(argmax_in(&data, 0, 2), 1);
        assert_eq!(argmax_in(&data, 2, 100), 3);
    }
}
