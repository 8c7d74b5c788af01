use crate::{
    error::{PulseError, Result},
    signal::{validate_rate, validate_signal},
};
use log::{debug, warn};

/// Linearly interpolate NaN samples. Runs touching either end of the signal are
/// filled with the nearest valid sample.
pub fn nan_cleaning(data: &[f64]) -> Result<Vec<f64>> {
    if data.is_empty() {
        return Err(PulseError::InvalidInput("signal is empty".into()));
    }
    let valid: Vec<usize> = data
        .iter()
        .enumerate()
        .filter_map(|(i, x)| (!x.is_nan()).then_some(i))
        .collect();
    let (first, last) = match (valid.first(), valid.last()) {
        (Some(&f), Some(&l)) => (f, l),
        _ => {
            return Err(PulseError::InvalidInput(
                "signal contains only NaN values".into(),
            ))
        }
    };
    let missing = data.len() - valid.len();
    if missing > 0 {
        debug!("interpolating {} NaN sample(s)", missing);
    }

    let mut out = data.to_vec();
    for x in out.iter_mut().take(first) {
        *x = data[first];
    }
    for x in out.iter_mut().skip(last + 1) {
        *x = data[last];
    }
    for w in valid.windows(2) {
        let (a, b) = (w[0], w[1]);
        if b - a < 2 {
            continue;
        }
        let step = (data[b] - data[a]) / (b - a) as f64;
        for (k, x) in out[a + 1..b].iter_mut().enumerate() {
            *x = data[a] + step * (k + 1) as f64;
        }
    }
    Ok(out)
}

/// Resample `data` from `fs` to `new_fs` by linear interpolation over evenly
/// spaced time points spanning `[0, duration)`.
pub fn resample(data: &[f64], fs: f64, new_fs: f64) -> Result<Vec<f64>> {
    validate_signal(data, fs)?;
    validate_rate(new_fs, "target sampling rate")?;
    if fs == new_fs {
        return Ok(data.to_vec());
    }
    let duration = data.len() as f64 / fs;
    // guard against `n / fs * new_fs` landing a hair above an integer
    let count = ((duration * new_fs) - 1e-9).ceil().max(1.0) as usize;
    let last = data.len() - 1;
    let ratio = fs / new_fs;
    let out = (0..count)
        .map(|j| {
            let pos = j as f64 * ratio;
            let i = pos.floor() as usize;
            if i >= last {
                data[last]
            } else {
                let frac = pos - i as f64;
                data[i] + (data[i + 1] - data[i]) * frac
            }
        })
        .collect::<Vec<_>>();
    debug!(
        "resampled {} samples at {} Hz to {} samples at {} Hz",
        data.len(),
        fs,
        out.len(),
        new_fs
    );
    Ok(out)
}

/// Shared front half of every detector: optional NaN cleaning, then resampling.
pub fn prepare(data: &[f64], fs: f64, new_fs: f64, clean_nan: bool) -> Result<Vec<f64>> {
    validate_signal(data, fs)?;
    let cleaned;
    let source = if clean_nan && data.iter().any(|x| x.is_nan()) {
        cleaned = nan_cleaning(data)?;
        &cleaned[..]
    } else {
        if data.iter().any(|x| x.is_nan()) {
            warn!("signal contains NaN values and NaN cleaning is disabled");
        }
        data
    };
    resample(source, fs, new_fs)
}
