use crate::{
    error::{PulseError, Result},
    peaks::{find_peaks_dense, FindPeaks},
    resample::prepare,
    rolling::{present, RollingWindow},
    signal::{PeakVector, RespirationDetection, TimeSeries},
};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Which respiratory events to report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RspKind {
    /// End of inspiration.
    Peaks,
    /// End of expiration.
    Troughs,
    #[default]
    PeaksTroughs,
}

impl RspKind {
    fn peaks(&self) -> bool {
        matches!(self, RspKind::Peaks | RspKind::PeaksTroughs)
    }

    fn troughs(&self) -> bool {
        matches!(self, RspKind::Troughs | RspKind::PeaksTroughs)
    }
}

impl FromStr for RspKind {
    type Err = PulseError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "peaks" => Ok(RspKind::Peaks),
            "troughs" => Ok(RspKind::Troughs),
            "peaks-troughs" => Ok(RspKind::PeaksTroughs),
            other => Err(PulseError::InvalidConfiguration(format!(
                "invalid respiration kind '{}', expected peaks, troughs or peaks-troughs",
                other
            ))),
        }
    }
}

impl fmt::Display for RspKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RspKind::Peaks => "peaks",
            RspKind::Troughs => "troughs",
            RspKind::PeaksTroughs => "peaks-troughs",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RspConfig {
    pub new_sfreq: f64,
    /// Smoothing window (seconds).
    pub win: f64,
    pub kind: RspKind,
    /// Minimum delay between two events of the same kind (seconds).
    pub distance: f64,
    pub clean_nan: bool,
}

impl Default for RspConfig {
    fn default() -> Self {
        Self {
            new_sfreq: 1000.0,
            win: 0.025,
            kind: RspKind::default(),
            distance: 2.0,
            clean_nan: false,
        }
    }
}

impl RspConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.new_sfreq.is_finite() && self.new_sfreq > 0.0) {
            return Err(PulseError::InvalidConfiguration(format!(
                "new_sfreq must be positive, got {}",
                self.new_sfreq
            )));
        }
        if !(self.win > 0.0) {
            return Err(PulseError::InvalidConfiguration(format!(
                "win must be positive, got {}",
                self.win
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
}

/// Respiratory peaks and troughs on a smoothed, z-scored and cubed signal.
pub fn rsp_peaks(ts: &TimeSeries, cfg: &RspConfig) -> Result<RespirationDetection> {
    cfg.validate()?;
    let resampled = prepare(&ts.data, ts.fs, cfg.new_sfreq, cfg.clean_nan)?;

    let window = RollingWindow::full((cfg.new_sfreq * cfg.win) as usize);
    let smoothed = fill_edges(&window.mean(&present(&resampled)));
    let enhanced: Vec<f64> = match smoothed.as_deref().and_then(zscore) {
        Some(z) => z.into_iter().map(|v| v.powi(3)).collect(),
        None => {
            warn!("respiration signal is flat or too short, no events found");
            vec![f64::NAN; resampled.len()]
        }
    };

    let opts = FindPeaks {
        height: Some(0.0),
        distance: Some((cfg.distance * cfg.new_sfreq) as usize),
    };
    let len = resampled.len();
    let peaks = cfg.kind.peaks().then(|| {
        let idx = find_peaks_dense(&enhanced, opts);
        debug!("{} respiratory peak(s)", idx.len());
        PeakVector::from_indices(len, &idx)
    });
    let troughs = cfg.kind.troughs().then(|| {
        let negated: Vec<f64> = enhanced.iter().map(|v| -v).collect();
        let idx = find_peaks_dense(&negated, opts);
        debug!("{} respiratory trough(s)", idx.len());
        PeakVector::from_indices(len, &idx)
    });

    Ok(RespirationDetection {
        signal: TimeSeries {
            fs: cfg.new_sfreq,
            data: resampled,
        },
        peaks,
        troughs,
    })
}

/// Back-fill then forward-fill missing values. `None` when nothing is present.
fn fill_edges(values: &[Option<f64>]) -> Option<Vec<f64>> {
    let mut out = vec![f64::NAN; values.len()];
    let mut next = None;
    for (o, v) in out.iter_mut().zip(values).rev() {
        next = v.or(next);
        *o = next.unwrap_or(f64::NAN);
    }
    let mut prev = None;
    for o in out.iter_mut() {
        if o.is_nan() {
            *o = prev?;
        }
        prev = Some(*o);
    }
    Some(out)
}

/// Standardise with the population standard deviation.
fn zscore(values: &[f64]) -> Option<Vec<f64>> {
    if values.is_empty() {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let sd = (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt();
    (sd > 0.0).then(|| values.iter().map(|v| (v - mean) / sd).collect())
}
