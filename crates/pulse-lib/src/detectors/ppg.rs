use crate::{
    artefacts::{rr_artefacts, ArtefactConfig},
    clipping::{interpolate_clipping, ClippingThresholds},
    convert::indices_to_rr_ms,
    error::{PulseError, Result},
    peaks::{find_peaks, FindPeaks},
    resample::prepare,
    rolling::{present, RollingWindow},
    signal::{Detection, PeakVector, TimeSeries},
    spline::InterpolationKind,
};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

/// Configurable parameters for the PPG systolic peak finder.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PpgConfig {
    /// Sampling frequency the detector runs at (Hz).
    pub new_sfreq: f64,
    /// Adaptive threshold window (seconds).
    pub win: f64,
    /// Repair saturated segments before anything else.
    pub clipping: bool,
    pub clipping_thresholds: ClippingThresholds,
    /// Smooth high-frequency noise with a centered moving average.
    pub moving_average: bool,
    /// Smoothing window (seconds).
    pub moving_average_length: f64,
    /// Replace the signal with `x² · sign(x)`.
    pub peak_enhancement: bool,
    /// Minimum delay between two peaks (seconds).
    pub distance: f64,
    /// Drop peaks the interval classifier labels as extra.
    pub clean_extra: bool,
    pub clean_nan: bool,
}

impl Default for PpgConfig {
    fn default() -> Self {
        Self {
            new_sfreq: 1000.0,
            win: 0.75,
            clipping: true,
            clipping_thresholds: ClippingThresholds::Auto,
            moving_average: true,
            moving_average_length: 0.05,
            peak_enhancement: true,
            distance: 0.3,
            clean_extra: false,
            clean_nan: false,
        }
    }
}

impl PpgConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.new_sfreq.is_finite() && self.new_sfreq > 0.0) {
            return Err(PulseError::InvalidConfiguration(format!(
                "new_sfreq must be positive, got {}",
                self.new_sfreq
            )));
        }
        if self.threshold_window() < 2 {
            return Err(PulseError::InvalidConfiguration(format!(
                "win of {} s spans fewer than two samples at {} Hz",
                self.win, self.new_sfreq
            )));
        }
        if self.moving_average && !(self.moving_average_length > 0.0) {
            return Err(PulseError::InvalidConfiguration(format!(
                "moving_average_length must be positive, got {}",
                self.moving_average_length
            )));
        }
        if !(self.distance >= 0.0) {
            return Err(PulseError::InvalidConfiguration(format!(
                "distance must not be negative, got {}",
                self.distance
            )));
        }
        Ok(())
    }

    fn threshold_window(&self) -> usize {
        (self.new_sfreq * self.win) as usize
    }

    fn smoothing_window(&self) -> usize {
        ((self.new_sfreq * self.moving_average_length) as usize).max(1)
    }
}

/// Systolic peak detection with a rolling mean plus one standard deviation as
/// the adaptive threshold.
///
/// The returned signal is the resampled input, before clipping repair and
/// enhancement, so peak indices address it directly.
pub fn ppg_peaks(ts: &TimeSeries, cfg: &PpgConfig) -> Result<Detection> {
    ppg_peaks_with(ts, cfg, &ArtefactConfig::default())
}

/// [`ppg_peaks`] with the classifier settings used by `clean_extra`.
pub fn ppg_peaks_with(
    ts: &TimeSeries,
    cfg: &PpgConfig,
    artefacts: &ArtefactConfig,
) -> Result<Detection> {
    cfg.validate()?;
    if cfg.clean_extra {
        artefacts.validate()?;
    }
    let resampled = prepare(&ts.data, ts.fs, cfg.new_sfreq, cfg.clean_nan)?;

    let repaired = if cfg.clipping {
        let bounds = cfg.clipping_thresholds.resolve(&resampled);
        if bounds.is_empty() {
            debug!("no clipping to repair");
        }
        interpolate_clipping(&resampled, bounds, InterpolationKind::Cubic)?
    } else {
        resampled.clone()
    };

    let mut x = present(&repaired);
    if cfg.moving_average {
        x = RollingWindow::full(cfg.smoothing_window()).mean(&x);
    }
    if cfg.peak_enhancement {
        debug!("enhancing peaks");
        x = x
            .into_iter()
            .map(|v| v.map(|v| v * v * sign(v)))
            .collect();
    }

    let window = RollingWindow::full(cfg.threshold_window());
    let mean = window.mean(&x);
    let std = window.std(&x);
    let thresholded: Vec<Option<f64>> = x
        .iter()
        .zip(mean.iter().zip(&std))
        .map(|(v, (m, s))| match (v, m, s) {
            (Some(v), Some(m), Some(s)) => Some(v - (m + s)),
            _ => None,
        })
        .collect();
    if thresholded.iter().all(Option::is_none) {
        warn!(
            "signal of {} samples is shorter than the {} sample threshold window",
            thresholded.len(),
            window.size
        );
    }

    let mut indices = find_peaks(
        &thresholded,
        FindPeaks {
            height: Some(0.0),
            distance: Some((cfg.new_sfreq * cfg.distance) as usize),
        },
    );
    debug!("{} systolic peak candidate(s)", indices.len());

    if cfg.clean_extra {
        indices = prune_extra(&indices, cfg.new_sfreq, artefacts)?;
    }

    let peaks = PeakVector::from_indices(resampled.len(), &indices);
    Ok(Detection {
        signal: TimeSeries {
            fs: cfg.new_sfreq,
            data: resampled,
        },
        peaks,
    })
}

/// Remove every peak that closes an interval labelled as extra.
///
/// The first peak never closes an interval, so it is never removed.
pub fn prune_extra(indices: &[usize], sfreq: f64, cfg: &ArtefactConfig) -> Result<Vec<usize>> {
    if indices.len() < 3 {
        return Ok(indices.to_vec());
    }
    let rr = indices_to_rr_ms(indices, sfreq);
    let report = rr_artefacts(&rr, cfg)?;
    let kept: Vec<usize> = indices
        .iter()
        .enumerate()
        .filter(|&(i, _)| i == 0 || !report.extra[i - 1])
        .map(|(_, &p)| p)
        .collect();
    if kept.len() < indices.len() {
        debug!("removed {} extra peak(s)", indices.len() - kept.len());
    }
    Ok(kept)
}

fn sign(v: f64) -> f64 {
    if v > 0.0 {
        1.0
    } else if v < 0.0 {
        -1.0
    } else {
        0.0
    }
}
