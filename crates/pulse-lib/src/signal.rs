use crate::error::{PulseError, Result};
use serde::{Deserialize, Serialize};

/// Basic typed time series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    /// Uniform sampling frequency in Hz
    pub fs: f64,
    /// Samples
    pub data: Vec<f64>,
}

impl TimeSeries {
    /// Build a series, rejecting empty data and non-positive sampling rates.
    pub fn new(fs: f64, data: Vec<f64>) -> Result<Self> {
        validate_signal(&data, fs)?;
        Ok(Self { fs, data })
    }
    pub fn len(&self) -> usize {
        self.data.len()
    }
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
    pub fn duration(&self) -> f64 {
        self.data.len() as f64 / self.fs
    }
}

pub(crate) fn validate_signal(data: &[f64], fs: f64) -> Result<()> {
    if data.is_empty() {
        return Err(PulseError::InvalidInput("signal is empty".into()));
    }
    validate_rate(fs, "sampling rate")
}

pub(crate) fn validate_rate(fs: f64, what: &str) -> Result<()> {
    if !(fs.is_finite() && fs > 0.0) {
        return Err(PulseError::InvalidInput(format!(
            "{} must be positive, got {}",
            what, fs
        )));
    }
    Ok(())
}

/// Boolean event vector aligned sample-for-sample with its source signal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeakVector {
    pub peaks: Vec<bool>,
}

impl PeakVector {
    pub fn new(peaks: Vec<bool>) -> Self {
        Self { peaks }
    }

    /// Mark `indices` in a vector of length `len`. Out-of-range indices are dropped.
    pub fn from_indices(len: usize, indices: &[usize]) -> Self {
        let mut peaks = vec![false; len];
        for &idx in indices {
            if idx < len {
                peaks[idx] = true;
            }
        }
        Self { peaks }
    }

    pub fn len(&self) -> usize {
        self.peaks.len()
    }
    pub fn is_empty(&self) -> bool {
        self.peaks.is_empty()
    }
    pub fn count(&self) -> usize {
        self.peaks.iter().filter(|&&p| p).count()
    }
    pub fn indices(&self) -> Vec<usize> {
        self.peaks
            .iter()
            .enumerate()
            .filter_map(|(i, &p)| p.then_some(i))
            .collect()
    }
}

/// Output of a detection pipeline: the exact signal that was thresholded and its events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Detection {
    pub signal: TimeSeries,
    pub peaks: PeakVector,
}

/// Respiration output, where troughs are reported alongside peaks when requested.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RespirationDetection {
    pub signal: TimeSeries,
    pub peaks: Option<PeakVector>,
    pub troughs: Option<PeakVector>,
}
