//! RR-interval artefact classification (Lipponen & Tarvainen, 2019).
//!
//! Each interval is projected onto a few normalized subspaces derived from
//! the first differences and the deviation from a local median. Ectopic,
//! long, short, missed and extra intervals are then decided by fixed rules on
//! those subspaces. Everything is computed in one batch over the whole series.
//!
//! Lipponen, J. A., & Tarvainen, M. P. (2019). A robust algorithm for heart
//! rate variability time series artefact correction using novel beat
//! classification. Journal of Medical Engineering & Technology, 43(3), 173-181.

use crate::{
    convert::RrData,
    error::{PulseError, Result},
    rolling::{self, RollingWindow},
};
use log::debug;
use serde::{Deserialize, Serialize};

/// Window for the quartile-based thresholds.
pub const THRESHOLD_WINDOW: usize = 91;
/// Window for the local median interval.
pub const MEDIAN_WINDOW: usize = 11;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtefactConfig {
    /// Slope of the ectopic decision lines.
    pub c1: f64,
    /// Intercept of the ectopic decision lines.
    pub c2: f64,
    /// Scale applied to the quartile deviation thresholds.
    pub alpha: f64,
}

impl Default for ArtefactConfig {
    fn default() -> Self {
        Self {
            c1: 0.13,
            c2: 0.17,
            alpha: 5.2,
        }
    }
}

impl ArtefactConfig {
    pub fn validate(&self) -> Result<()> {
        let finite = [self.c1, self.c2, self.alpha].iter().all(|v| v.is_finite());
        if !finite || self.alpha <= 0.0 {
            return Err(PulseError::InvalidConfiguration(format!(
                "artefact parameters must be finite with alpha > 0, got {:?}",
                self
            )));
        }
        Ok(())
    }
}

/// Per-interval diagnostics and labels. Every vector has the length of the
/// interval series it was computed from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtefactReport {
    /// Normalized first difference of the intervals.
    pub subspace1: Vec<f64>,
    /// Neighbouring first differences, one step back and forward.
    pub subspace2: Vec<f64>,
    /// Neighbouring first differences, one and two steps forward.
    pub subspace3: Vec<f64>,
    /// Normalized deviation from the local median.
    #[serde(rename = "mRR")]
    pub mrr: Vec<f64>,
    pub ectopic: Vec<bool>,
    pub long: Vec<bool>,
    pub short: Vec<bool>,
    pub missed: Vec<bool>,
    pub extra: Vec<bool>,
    pub threshold1: Vec<f64>,
    pub threshold2: Vec<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ArtefactSummary {
    pub intervals: usize,
    pub ectopic: usize,
    pub long: usize,
    pub short: usize,
    pub missed: usize,
    pub extra: usize,
}

impl ArtefactReport {
    pub fn len(&self) -> usize {
        self.subspace1.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subspace1.is_empty()
    }

    pub fn summary(&self) -> ArtefactSummary {
        let count = |v: &[bool]| v.iter().filter(|&&b| b).count();
        ArtefactSummary {
            intervals: self.len(),
            ectopic: count(&self.ectopic),
            long: count(&self.long),
            short: count(&self.short),
            missed: count(&self.missed),
            extra: count(&self.extra),
        }
    }

    /// Whether interval `i` carries any artefact label. `None` past the end.
    pub fn is_artefact(&self, i: usize) -> Option<bool> {
        let labels = [
            &self.ectopic,
            &self.long,
            &self.short,
            &self.missed,
            &self.extra,
        ];
        labels
            .iter()
            .map(|l| l.get(i).copied())
            .try_fold(false, |any, flag| Some(any || flag?))
    }
}

/// Classify an interval series given in milliseconds.
pub fn rr_artefacts(rr_ms: &[f64], cfg: &ArtefactConfig) -> Result<ArtefactReport> {
    cfg.validate()?;
    if rr_ms.len() < 2 {
        return Err(PulseError::InvalidInput(format!(
            "artefact detection needs at least two intervals, got {}",
            rr_ms.len()
        )));
    }
    if let Some(bad) = rr_ms.iter().find(|x| !x.is_finite()) {
        return Err(PulseError::InvalidInput(format!(
            "intervals must be finite, got {}",
            bad
        )));
    }

    let sub = Subspaces::compute(rr_ms, cfg.alpha);
    let labels = Labels::empty(rr_ms.len())
        .with_ectopic(&sub, cfg)
        .with_long_short(&sub, rr_ms)
        .with_missed(&sub, rr_ms)
        .with_extra(&sub, rr_ms)
        .without_edge_long_short();

    let report = ArtefactReport {
        subspace1: sub.s11,
        subspace2: sub.s12,
        subspace3: sub.s22,
        mrr: sub.mrr,
        ectopic: labels.ectopic,
        long: labels.long,
        short: labels.short,
        missed: labels.missed,
        extra: labels.extra,
        threshold1: sub.th1,
        threshold2: sub.th2,
    };
    debug!("rr artefacts: {:?}", report.summary());
    Ok(report)
}

/// Classify any beat representation. `sfreq` applies to peak vectors/indices.
pub fn rr_artefacts_from(
    data: &RrData,
    sfreq: f64,
    cfg: &ArtefactConfig,
) -> Result<ArtefactReport> {
    rr_artefacts(&data.to_rr_ms(sfreq)?, cfg)
}

struct Subspaces {
    s11: Vec<f64>,
    s12: Vec<f64>,
    s22: Vec<f64>,
    mrr: Vec<f64>,
    th1: Vec<f64>,
    th2: Vec<f64>,
    /// Local median interval (unnormalized).
    med_rr: Vec<f64>,
}

impl Subspaces {
    fn compute(rr: &[f64], alpha: f64) -> Self {
        let n = rr.len();

        // first differences, leading slot set to the mean of the others
        let mut drr = vec![0.0; n];
        for i in 1..n {
            drr[i] = rr[i] - rr[i - 1];
        }
        drr[0] = drr[1..].iter().sum::<f64>() / (n - 1) as f64;

        let th1 = quartile_threshold(&drr, alpha);
        let s11: Vec<f64> = drr.iter().zip(&th1).map(|(d, t)| d / t).collect();

        let med_rr: Vec<f64> = RollingWindow::lenient(MEDIAN_WINDOW)
            .median(&rolling::present(rr))
            .into_iter()
            .zip(rr)
            .map(|(m, &x)| m.unwrap_or(x))
            .collect();
        let deviation: Vec<f64> = rr
            .iter()
            .zip(&med_rr)
            .map(|(x, m)| {
                let d = x - m;
                if d < 0.0 {
                    2.0 * d
                } else {
                    d
                }
            })
            .collect();
        let th2 = quartile_threshold(&deviation, alpha);
        let mrr: Vec<f64> = deviation.iter().zip(&th2).map(|(d, t)| d / t).collect();

        let s12 = (0..n)
            .map(|i| {
                if i == 0 || i + 1 >= n {
                    0.0
                } else if s11[i] < 0.0 {
                    s11[i - 1].min(s11[i + 1])
                } else {
                    s11[i - 1].max(s11[i + 1])
                }
            })
            .collect();
        let s22 = (0..n)
            .map(|i| {
                if i + 2 >= n {
                    0.0
                } else if s11[i] >= 0.0 {
                    s11[i + 1].min(s11[i + 2])
                } else {
                    s11[i + 1].max(s11[i + 2])
                }
            })
            .collect();

        Self {
            s11,
            s12,
            s22,
            mrr,
            th1,
            th2,
            med_rr,
        }
    }
}

/// `alpha * (Q3 - Q1) / 2` of `|values|` over a centered window.
fn quartile_threshold(values: &[f64], alpha: f64) -> Vec<f64> {
    let magnitude: Vec<Option<f64>> = values.iter().map(|v| Some(v.abs())).collect();
    let window = RollingWindow::lenient(THRESHOLD_WINDOW);
    let q1 = window.quantile(&magnitude, 0.25);
    let q3 = window.quantile(&magnitude, 0.75);
    q1.into_iter()
        .zip(q3)
        .map(|(lo, hi)| match (lo, hi) {
            (Some(lo), Some(hi)) => alpha * (hi - lo) / 2.0,
            _ => f64::NAN,
        })
        .collect()
}

/// Label record. Each stage consumes the record and returns the next one.
#[derive(Debug, Clone, PartialEq)]
struct Labels {
    ectopic: Vec<bool>,
    long: Vec<bool>,
    short: Vec<bool>,
    missed: Vec<bool>,
    extra: Vec<bool>,
}

impl Labels {
    fn empty(n: usize) -> Self {
        Self {
            ectopic: vec![false; n],
            long: vec![false; n],
            short: vec![false; n],
            missed: vec![false; n],
            extra: vec![false; n],
        }
    }

    fn with_ectopic(self, sub: &Subspaces, cfg: &ArtefactConfig) -> Self {
        let n = sub.s11.len();
        let ectopic = (0..n)
            .map(|i| {
                // two samples of context on each side
                if i < 2 || i + 2 >= n {
                    return false;
                }
                let (s11, s12) = (sub.s11[i], sub.s12[i]);
                (s11 > 1.0 && s12 < -cfg.c1 * s11 - cfg.c2)
                    || (s11 < -1.0 && s12 > -cfg.c1 * s11 + cfg.c2)
            })
            .collect();
        Self { ectopic, ..self }
    }

    fn with_long_short(self, sub: &Subspaces, rr: &[f64]) -> Self {
        let median = rolling::median(rr).unwrap_or(f64::NAN);
        let raw_long: Vec<bool> = (0..rr.len())
            .map(|i| {
                (sub.s11[i] > 1.0 && sub.s22[i] < -1.0) || (sub.mrr[i].abs() > 3.0 && rr[i] > median)
            })
            .collect();
        let raw_short: Vec<bool> = (0..rr.len())
            .map(|i| {
                (sub.s11[i] < -1.0 && sub.s22[i] > 1.0)
                    || (sub.mrr[i].abs() > 3.0 && rr[i] <= median)
            })
            .collect();
        let keep = |flags: Vec<bool>| -> Vec<bool> {
            propagate(&flags, &sub.s11)
                .into_iter()
                .zip(&self.ectopic)
                .map(|(f, &e)| f && !e)
                .collect()
        };
        let long = keep(raw_long);
        let short = keep(raw_short);
        Self {
            long,
            short,
            ..self
        }
    }

    fn with_missed(self, sub: &Subspaces, rr: &[f64]) -> Self {
        let missed: Vec<bool> = (0..rr.len())
            .map(|i| self.long[i] && (rr[i] / 2.0 - sub.med_rr[i]).abs() < sub.th2[i])
            .collect();
        let long = self
            .long
            .iter()
            .zip(&missed)
            .map(|(&l, &m)| l && !m)
            .collect();
        Self {
            missed,
            long,
            ..self
        }
    }

    fn with_extra(self, sub: &Subspaces, rr: &[f64]) -> Self {
        let extra: Vec<bool> = (0..rr.len())
            .map(|i| {
                let next = rr.get(i + 1).copied().unwrap_or(0.0);
                self.short[i] && (rr[i] + next - sub.med_rr[i]).abs() < sub.th2[i]
            })
            .collect();
        let short = self
            .short
            .iter()
            .zip(&extra)
            .map(|(&s, &x)| s && !x)
            .collect();
        Self {
            extra,
            short,
            ..self
        }
    }

    fn without_edge_long_short(self) -> Self {
        let clear_edges = |mut v: Vec<bool>| {
            if let Some(first) = v.first_mut() {
                *first = false;
            }
            if let Some(last) = v.last_mut() {
                *last = false;
            }
            v
        };
        Self {
            long: clear_edges(self.long),
            short: clear_edges(self.short),
            ..self
        }
    }
}

/// Extend each flagged interval onto the next one when the anomaly appears to
/// continue there. Only labels present in `flags` propagate, once.
fn propagate(flags: &[bool], s11: &[f64]) -> Vec<bool> {
    let mut out = flags.to_vec();
    for i in 0..flags.len().saturating_sub(2) {
        if flags[i] && s11[i + 1].abs() < s11[i + 2].abs() {
            out[i + 1] = true;
        }
    }
    out
}
