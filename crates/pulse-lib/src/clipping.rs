//! Saturation (clipping) repair for pulse oximeter signals.
//!
//! Samples pinned at a floor or ceiling are dropped and rebuilt by
//! interpolating over the surviving samples. The ceiling is handled first and
//! the floor is then corrected on the result.

use crate::{
    error::{PulseError, Result},
    spline::{InterpolationKind, Interpolator},
};
use log::debug;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Minimum run of identical extreme samples treated as a saturation plateau.
pub const MIN_CLIPPING_RUN: usize = 3;

/// Floor and ceiling of a clipped signal. Either side may be absent.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ClippingBounds {
    pub min_threshold: Option<f64>,
    pub max_threshold: Option<f64>,
}

impl ClippingBounds {
    pub fn new(min_threshold: Option<f64>, max_threshold: Option<f64>) -> Self {
        Self {
            min_threshold,
            max_threshold,
        }
    }

    /// Build from a bound pair. Anything but exactly two entries is rejected.
    pub fn from_pair(values: &[Option<f64>]) -> Result<Self> {
        match values {
            [min, max] => Ok(Self::new(*min, *max)),
            other => Err(PulseError::InvalidThresholdSpec(format!(
                "expected a (min, max) pair, got {} value(s)",
                other.len()
            ))),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.min_threshold.is_none() && self.max_threshold.is_none()
    }
}

/// How the PPG pipeline obtains its clipping bounds.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ClippingThresholds {
    /// Infer bounds from the signal with [`find_clipping`].
    #[default]
    Auto,
    /// No correction.
    Disabled,
    Bounds(ClippingBounds),
}

impl ClippingThresholds {
    pub fn resolve(&self, signal: &[f64]) -> ClippingBounds {
        match self {
            Self::Auto => find_clipping(signal),
            Self::Disabled => ClippingBounds::default(),
            Self::Bounds(bounds) => *bounds,
        }
    }
}

impl FromStr for ClippingThresholds {
    type Err = PulseError;

    /// Accepts `auto`, `none`, or a `min,max` pair where either side may be `none`.
    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("auto") {
            return Ok(Self::Auto);
        }
        if trimmed.eq_ignore_ascii_case("none") {
            return Ok(Self::Disabled);
        }
        let parts = trimmed
            .trim_start_matches(['(', '['])
            .trim_end_matches([')', ']'])
            .split(',')
            .map(|part| {
                let part = part.trim();
                if part.is_empty() || part.eq_ignore_ascii_case("none") {
                    Ok(None)
                } else {
                    part.parse::<f64>().map(Some).map_err(|_| {
                        PulseError::InvalidThresholdSpec(format!("'{}' is not a number", part))
                    })
                }
            })
            .collect::<Result<Vec<_>>>()?;
        if parts.len() != 2 {
            return Err(PulseError::InvalidThresholdSpec(format!(
                "'{}' should be 'auto', 'none' or a 'min,max' pair",
                s
            )));
        }
        ClippingBounds::from_pair(&parts).map(Self::Bounds)
    }
}

impl TryFrom<String> for ClippingThresholds {
    type Error = PulseError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<ClippingThresholds> for String {
    fn from(value: ClippingThresholds) -> Self {
        value.to_string()
    }
}

impl fmt::Display for ClippingThresholds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let side = |v: Option<f64>| v.map_or_else(|| "none".to_string(), |v| v.to_string());
        match self {
            Self::Auto => write!(f, "auto"),
            Self::Disabled => write!(f, "none"),
            Self::Bounds(b) => write!(f, "{},{}", side(b.min_threshold), side(b.max_threshold)),
        }
    }
}

/// Infer saturation bounds from the value counts at the signal extremes.
///
/// An extreme is reported only when the signal sits on it for at least
/// [`MIN_CLIPPING_RUN`] consecutive samples.
pub fn find_clipping(signal: &[f64]) -> ClippingBounds {
    let finite = signal.iter().copied().filter(|x| x.is_finite());
    let (lo, hi) = finite.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), x| {
        (lo.min(x), hi.max(x))
    });
    if !(lo < hi) {
        return ClippingBounds::default();
    }
    let bound = |level: f64| (longest_run(signal, level) >= MIN_CLIPPING_RUN).then_some(level);
    let bounds = ClippingBounds::new(bound(lo), bound(hi));
    if bounds.is_empty() {
        debug!("no clipping plateau found (range {} .. {})", lo, hi);
    } else {
        debug!("clipping bounds found: {:?}", bounds);
    }
    bounds
}

fn longest_run(signal: &[f64], level: f64) -> usize {
    let mut best = 0;
    let mut current = 0;
    for &x in signal {
        if x == level {
            current += 1;
            best = best.max(current);
        } else {
            current = 0;
        }
    }
    best
}

/// Remove samples at or beyond each bound and rebuild them by interpolation.
///
/// A first or last sample sitting exactly on a bound is nudged one unit inside
/// the valid range so the interpolation domain always spans the whole signal.
pub fn interpolate_clipping(
    signal: &[f64],
    bounds: ClippingBounds,
    kind: InterpolationKind,
) -> Result<Vec<f64>> {
    let mut clean = signal.to_vec();
    if let Some(max) = bounds.max_threshold {
        clean = rebuild(clean, kind, max, -1.0, |x| x < max)?;
    }
    if let Some(min) = bounds.min_threshold {
        clean = rebuild(clean, kind, min, 1.0, |x| x > min)?;
    }
    Ok(clean)
}

fn rebuild(
    mut signal: Vec<f64>,
    kind: InterpolationKind,
    threshold: f64,
    nudge: f64,
    keep: impl Fn(f64) -> bool,
) -> Result<Vec<f64>> {
    if signal.is_empty() {
        return Ok(signal);
    }
    let last = signal.len() - 1;
    if signal[0] == threshold {
        signal[0] = threshold + nudge;
    }
    if signal[last] == threshold {
        signal[last] = threshold + nudge;
    }
    let (x, y): (Vec<f64>, Vec<f64>) = signal
        .iter()
        .enumerate()
        .filter(|(_, &v)| keep(v))
        .map(|(i, &v)| (i as f64, v))
        .unzip();
    if x.len() == signal.len() {
        return Ok(signal);
    }
    debug!(
        "rebuilding {} clipped sample(s) at {}",
        signal.len() - x.len(),
        threshold
    );
    let f = Interpolator::new(kind, x, y)?;
    let time: Vec<f64> = (0..signal.len()).map(|i| i as f64).collect();
    f.eval_many(&time)
}
