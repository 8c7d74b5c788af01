//! Conversions between the four beat representations: boolean peak vector,
//! peak indices, and intervals in milliseconds or seconds.
//!
//! Going from intervals back to peaks cannot recover where the first peak sat,
//! so reconstructed peak vectors always start with an event at sample 0.

use crate::error::{PulseError, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RrKind {
    Peaks,
    PeaksIdx,
    RrMs,
    RrS,
}

impl FromStr for RrKind {
    type Err = PulseError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "peaks" => Ok(Self::Peaks),
            "peaks_idx" => Ok(Self::PeaksIdx),
            "rr_ms" => Ok(Self::RrMs),
            "rr_s" => Ok(Self::RrS),
            other => Err(PulseError::UnknownMethod(format!(
                "'{}' is not one of peaks, peaks_idx, rr_ms, rr_s",
                other
            ))),
        }
    }
}

/// A beat sequence in one of the four representations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "values", rename_all = "snake_case")]
pub enum RrData {
    Peaks(Vec<bool>),
    PeaksIdx(Vec<usize>),
    RrMs(Vec<f64>),
    RrS(Vec<f64>),
}

impl RrData {
    pub fn kind(&self) -> RrKind {
        match self {
            Self::Peaks(_) => RrKind::Peaks,
            Self::PeaksIdx(_) => RrKind::PeaksIdx,
            Self::RrMs(_) => RrKind::RrMs,
            Self::RrS(_) => RrKind::RrS,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Peaks(v) => v.len(),
            Self::PeaksIdx(v) => v.len(),
            Self::RrMs(v) | Self::RrS(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Interpret a parsed table as a one-column series of `kind`.
    pub fn from_rows(rows: &[Vec<f64>], kind: RrKind) -> Result<Self> {
        let values = flatten_rows(rows)?;
        match kind {
            RrKind::Peaks => Ok(Self::Peaks(values.iter().map(|&v| v != 0.0).collect())),
            RrKind::PeaksIdx => values
                .iter()
                .map(|&v| {
                    if v >= 0.0 && v.fract() == 0.0 {
                        Ok(v as usize)
                    } else {
                        Err(PulseError::InvalidInput(format!(
                            "{} is not a sample index",
                            v
                        )))
                    }
                })
                .collect::<Result<Vec<_>>>()
                .map(Self::PeaksIdx),
            RrKind::RrMs => Ok(Self::RrMs(values)),
            RrKind::RrS => Ok(Self::RrS(values)),
        }
    }

    /// Convert to `target`. `sfreq` is the sampling rate peak indices refer to.
    pub fn convert(&self, target: RrKind, sfreq: f64) -> Result<RrData> {
        validate_sfreq(sfreq)?;
        if self.kind() == target {
            return Ok(self.clone());
        }
        let indices = match self {
            Self::Peaks(p) => peaks_to_indices(p),
            Self::PeaksIdx(idx) => {
                check_ascending(idx)?;
                idx.clone()
            }
            Self::RrMs(rr) => rr_ms_to_indices(rr, sfreq)?,
            Self::RrS(rr) => rr_ms_to_indices(&rr_s_to_rr_ms(rr), sfreq)?,
        };
        Ok(match target {
            RrKind::Peaks => Self::Peaks(indices_to_peaks(&indices)?),
            RrKind::PeaksIdx => Self::PeaksIdx(indices),
            // interval-to-interval conversions skip the index grid to stay exact
            RrKind::RrMs => match self {
                Self::RrS(rr) => Self::RrMs(rr_s_to_rr_ms(rr)),
                _ => Self::RrMs(indices_to_rr_ms(&indices, sfreq)),
            },
            RrKind::RrS => match self {
                Self::RrMs(rr) => Self::RrS(rr_ms_to_rr_s(rr)),
                _ => Self::RrS(rr_ms_to_rr_s(&indices_to_rr_ms(&indices, sfreq))),
            },
        })
    }

    /// Intervals in milliseconds, whatever the representation.
    pub fn to_rr_ms(&self, sfreq: f64) -> Result<Vec<f64>> {
        validate_sfreq(sfreq)?;
        Ok(match self {
            Self::RrMs(rr) => rr.clone(),
            Self::RrS(rr) => rr_s_to_rr_ms(rr),
            Self::Peaks(p) => indices_to_rr_ms(&peaks_to_indices(p), sfreq),
            Self::PeaksIdx(idx) => {
                check_ascending(idx)?;
                indices_to_rr_ms(idx, sfreq)
            }
        })
    }
}

fn validate_sfreq(sfreq: f64) -> Result<()> {
    if !(sfreq.is_finite() && sfreq > 0.0) {
        return Err(PulseError::InvalidInput(format!(
            "sampling rate must be positive, got {}",
            sfreq
        )));
    }
    Ok(())
}

/// Reject anything that is not a single column.
pub fn flatten_rows(rows: &[Vec<f64>]) -> Result<Vec<f64>> {
    rows.iter()
        .enumerate()
        .map(|(i, row)| match row.as_slice() {
            [v] => Ok(*v),
            _ => Err(PulseError::InvalidShape(format!(
                "expected a one-dimensional series, row {} has {} values",
                i + 1,
                row.len()
            ))),
        })
        .collect()
}

pub fn peaks_to_indices(peaks: &[bool]) -> Vec<usize> {
    peaks
        .iter()
        .enumerate()
        .filter_map(|(i, &p)| p.then_some(i))
        .collect()
}

/// Boolean vector ending on the last peak.
pub fn indices_to_peaks(indices: &[usize]) -> Result<Vec<bool>> {
    check_ascending(indices)?;
    let len = indices.last().map_or(0, |&last| last + 1);
    let mut peaks = vec![false; len];
    for &i in indices {
        peaks[i] = true;
    }
    Ok(peaks)
}

pub fn indices_to_rr_ms(indices: &[usize], sfreq: f64) -> Vec<f64> {
    indices
        .windows(2)
        .map(|w| (w[1] - w[0]) as f64 * 1000.0 / sfreq)
        .collect()
}

/// Cumulative sum of intervals on the sample grid, starting with a peak at 0.
pub fn rr_ms_to_indices(rr_ms: &[f64], sfreq: f64) -> Result<Vec<usize>> {
    if let Some(bad) = rr_ms.iter().find(|x| !(x.is_finite() && **x > 0.0)) {
        return Err(PulseError::InvalidInput(format!(
            "intervals must be positive, got {}",
            bad
        )));
    }
    let mut indices = Vec::with_capacity(rr_ms.len() + 1);
    indices.push(0);
    let mut elapsed = 0.0;
    for &rr in rr_ms {
        elapsed += rr;
        indices.push((elapsed * sfreq / 1000.0).round() as usize);
    }
    check_ascending(&indices)?;
    Ok(indices)
}

pub fn rr_ms_to_rr_s(rr_ms: &[f64]) -> Vec<f64> {
    rr_ms.iter().map(|x| x / 1000.0).collect()
}

pub fn rr_s_to_rr_ms(rr_s: &[f64]) -> Vec<f64> {
    rr_s.iter().map(|x| x * 1000.0).collect()
}

fn check_ascending(indices: &[usize]) -> Result<()> {
    match indices.windows(2).position(|w| w[1] <= w[0]) {
        Some(pos) => Err(PulseError::InvalidInput(format!(
            "peak indices must be strictly ascending (collision at position {})",
            pos + 1
        ))),
        None => Ok(()),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeartRateUnit {
    #[default]
    Bpm,
    RrMs,
}

/// One heart-rate value per interval between consecutive peaks.
pub fn instantaneous_heart_rate(peaks: &[bool], sfreq: f64, unit: HeartRateUnit) -> Vec<f64> {
    let rr = indices_to_rr_ms(&peaks_to_indices(peaks), sfreq);
    match unit {
        HeartRateUnit::RrMs => rr,
        HeartRateUnit::Bpm => rr.into_iter().map(|x| 60_000.0 / x).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: f64, b: f64, tol: f64) {
        assert!((a - b).abs() <= tol, "{} vs {} (tol {})", a, b, tol);
    }

    #[test]
    fn indices_peaks_round_trip() {
        let idx = vec![3, 10, 250, 999];
        let peaks = indices_to_peaks(&idx).unwrap();
        assert_eq!(peaks.len(), 1000);
        assert_eq!(peaks_to_indices(&peaks), idx);
    }

    #[test]
    fn colliding_indices_are_rejected() {
        assert!(matches!(
            indices_to_peaks(&[1, 5, 5]),
            Err(PulseError::InvalidInput(_))
        ));
        assert!(RrData::PeaksIdx(vec![4, 2]).convert(RrKind::Peaks, 1000.0).is_err());
    }

    #[test]
    fn ms_seconds_round_trip() {
        let rr_ms = vec![812.0, 795.5, 1003.25, 640.0];
        let back = rr_s_to_rr_ms(&rr_ms_to_rr_s(&rr_ms));
        for (a, b) in rr_ms.iter().zip(&back) {
            assert_close(*a, *b, 1e-9);
        }
    }

    #[test]
    fn intervals_rebuild_relative_positions() {
        let rr = RrData::RrMs(vec![800.0, 900.0, 700.0]);
        let idx = rr.convert(RrKind::PeaksIdx, 1000.0).unwrap();
        assert_eq!(idx, RrData::PeaksIdx(vec![0, 800, 1700, 2400]));
        let peaks = rr.convert(RrKind::Peaks, 1000.0).unwrap();
        assert_eq!(peaks.len(), 2401);
        let again = peaks.convert(RrKind::RrMs, 1000.0).unwrap();
        assert_eq!(again, rr);
    }

    #[test]
    fn sampling_rate_scales_indices() {
        let idx = RrData::PeaksIdx(vec![0, 250, 500]);
        assert_eq!(idx.to_rr_ms(250.0).unwrap(), vec![1000.0, 1000.0]);
        let s = idx.convert(RrKind::RrS, 250.0).unwrap();
        assert_eq!(s, RrData::RrS(vec![1.0, 1.0]));
    }

    #[test]
    fn non_positive_intervals_are_invalid() {
        assert!(rr_ms_to_indices(&[800.0, 0.0], 1000.0).is_err());
        assert!(rr_ms_to_indices(&[800.0, -3.0], 1000.0).is_err());
    }

    #[test]
    fn rows_must_be_one_dimensional() {
        let rows = vec![vec![800.0], vec![810.0, 1.0]];
        assert!(matches!(
            RrData::from_rows(&rows, RrKind::RrMs),
            Err(PulseError::InvalidShape(_))
        ));
        let rows = vec![vec![0.0], vec![1.0], vec![0.0]];
        assert_eq!(
            RrData::from_rows(&rows, RrKind::Peaks).unwrap(),
            RrData::Peaks(vec![false, true, false])
        );
        assert!(RrData::from_rows(&[vec![1.5]], RrKind::PeaksIdx).is_err());
    }

    #[test]
    fn heart_rate_per_interval() {
        let peaks = indices_to_peaks(&[0, 1000, 1500]).unwrap();
        assert_eq!(
            instantaneous_heart_rate(&peaks, 1000.0, HeartRateUnit::Bpm),
            vec![60.0, 120.0]
        );
        assert_eq!(
            instantaneous_heart_rate(&peaks, 1000.0, HeartRateUnit::RrMs),
            vec![1000.0, 500.0]
        );
    }

    #[test]
    fn parses_kinds() {
        assert_eq!("peaks-idx".parse::<RrKind>().unwrap(), RrKind::PeaksIdx);
        assert_eq!("rr_s".parse::<RrKind>().unwrap(), RrKind::RrS);
        assert!("bpm".parse::<RrKind>().is_err());
    }
}
