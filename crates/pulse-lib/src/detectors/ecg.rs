use crate::{
    detectors::{
        filters::{argmax_in, bandpass, difference, moving_average, samples, square},
        qrs,
    },
    error::{PulseError, Result},
    peaks::{to_neighbour, Extremum},
    resample::prepare,
    signal::{Detection, PeakVector, TimeSeries},
};
use log::debug;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// R-peak locator: `(signal, fs) -> ascending sample indices`.
pub type QrsDetector = fn(&[f64], f64) -> Vec<usize>;

/// The available R-peak detectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EcgMethod {
    #[default]
    PanTompkins,
    MovingAverage,
    Hamilton,
    EngelseZeelenberg,
}

impl EcgMethod {
    pub const ALL: [EcgMethod; 4] = [
        EcgMethod::PanTompkins,
        EcgMethod::MovingAverage,
        EcgMethod::Hamilton,
        EcgMethod::EngelseZeelenberg,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            EcgMethod::PanTompkins => "pan-tompkins",
            EcgMethod::MovingAverage => "moving-average",
            EcgMethod::Hamilton => "hamilton",
            EcgMethod::EngelseZeelenberg => "engelse-zeelenberg",
        }
    }

    pub fn detector(&self) -> QrsDetector {
        match self {
            EcgMethod::PanTompkins => pan_tompkins,
            EcgMethod::MovingAverage => qrs::two_average,
            EcgMethod::Hamilton => qrs::hamilton,
            EcgMethod::EngelseZeelenberg => qrs::engelse_zeelenberg,
        }
    }
}

impl FromStr for EcgMethod {
    type Err = PulseError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase().replace('_', "-");
        EcgMethod::ALL
            .into_iter()
            .find(|m| m.name() == wanted)
            .ok_or_else(|| {
                let names: Vec<&str> = EcgMethod::ALL.iter().map(|m| m.name()).collect();
                PulseError::UnknownMethod(format!(
                    "'{}' is not an ECG detector, expected one of: {}",
                    s,
                    names.join(", ")
                ))
            })
    }
}

impl fmt::Display for EcgMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Configurable parameters for the ECG pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EcgConfig {
    /// Sampling frequency the detector runs at (Hz).
    pub new_sfreq: f64,
    pub method: EcgMethod,
    /// Move each detection to the signal maximum within `win_size`.
    pub find_local: bool,
    /// Half-width of the local search window (seconds).
    pub win_size: f64,
    /// Interpolate NaN samples before anything else.
    pub clean_nan: bool,
}

impl Default for EcgConfig {
    fn default() -> Self {
        Self {
            new_sfreq: 1000.0,
            method: EcgMethod::default(),
            find_local: false,
            win_size: 0.1,
            clean_nan: false,
        }
    }
}

impl EcgConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.new_sfreq.is_finite() && self.new_sfreq > 0.0) {
            return Err(PulseError::InvalidConfiguration(format!(
                "new_sfreq must be positive, got {}",
                self.new_sfreq
            )));
        }
        if self.find_local && !(self.win_size > 0.0) {
            return Err(PulseError::InvalidConfiguration(format!(
                "find_local needs a positive win_size, got {}",
                self.win_size
            )));
        }
        Ok(())
    }
}

/// Resample, run the selected R-peak detector and optionally snap every
/// detection to the true local maximum.
pub fn ecg_peaks(ts: &TimeSeries, cfg: &EcgConfig) -> Result<Detection> {
    cfg.validate()?;
    let resampled = prepare(&ts.data, ts.fs, cfg.new_sfreq, cfg.clean_nan)?;
    let mut indices = (cfg.method.detector())(&resampled, cfg.new_sfreq);
    debug!("{} found {} R peak(s)", cfg.method, indices.len());

    if cfg.find_local {
        let size = (cfg.win_size * cfg.new_sfreq) as usize;
        indices = to_neighbour(&resampled, &indices, size, Extremum::Max);
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

/// Pan–Tompkins tuning. Frequencies in Hz, durations in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PanTompkinsParams {
    pub lowcut_hz: f64,
    pub highcut_hz: f64,
    /// Length of the integrating window over the squared slope.
    pub integration_window_s: f64,
    /// Refractory period between two beats.
    pub min_rr_s: f64,
    /// Position of the threshold between the noise and beat levels.
    pub threshold_scale: f64,
    /// Lookback for the filtered maximum once the envelope crosses.
    pub search_back_s: f64,
}

impl Default for PanTompkinsParams {
    fn default() -> Self {
        Self {
            lowcut_hz: 5.0,
            highcut_hz: 15.0,
            integration_window_s: 0.150,
            min_rr_s: 0.250,
            threshold_scale: 0.6,
            search_back_s: 0.150,
        }
    }
}

/// Pan–Tompkins detector with the default parameters.
pub fn pan_tompkins(data: &[f64], fs: f64) -> Vec<usize> {
    pan_tompkins_with_params(data, fs, &PanTompkinsParams::default())
}

/// Band-pass, differentiate, square and integrate, then walk the envelope with
/// adaptive signal and noise levels. Short or beatless recordings that yield
/// fewer than two beats are handed to [`excess_over_mean`].
pub fn pan_tompkins_with_params(data: &[f64], fs: f64, params: &PanTompkinsParams) -> Vec<usize> {
    if data.is_empty() {
        return Vec::new();
    }
    let fs = fs.max(1.0);
    let filtered = bandpass(data, fs, params.lowcut_hz, params.highcut_hz);
    let envelope = moving_average(
        &square(&difference(&filtered, 1)),
        samples(params.integration_window_s, fs),
    );

    let beats = walk_envelope(&filtered, &envelope, fs, params);
    if beats.len() < 2 {
        debug!("envelope walk found {} beat(s), using the raw maxima", beats.len());
        return excess_over_mean(data, fs, params);
    }
    beats
}

/// Running estimates of the envelope height on beats and between them.
struct Levels {
    signal: f64,
    noise: f64,
    scale: f64,
}

impl Levels {
    fn threshold(&self) -> f64 {
        self.noise + self.scale * (self.signal - self.noise).max(0.0)
    }

    fn on_beat(&mut self, v: f64) {
        self.signal = 0.125 * v + 0.875 * self.signal;
    }

    fn on_noise(&mut self, v: f64) {
        self.noise = 0.125 * v + 0.875 * self.noise;
    }
}

fn walk_envelope(
    filtered: &[f64],
    envelope: &[f64],
    fs: f64,
    params: &PanTompkinsParams,
) -> Vec<usize> {
    // levels start from the mean of the first second
    let warmup = envelope.len().min((fs as usize).max(1));
    if warmup == 0 {
        return Vec::new();
    }
    let start = envelope[..warmup].iter().sum::<f64>() / warmup as f64;
    let mut levels = Levels {
        signal: start,
        noise: 0.5 * start,
        scale: params.threshold_scale,
    };
    let refractory = samples(params.min_rr_s, fs);
    let lookback = samples(params.search_back_s, fs);

    let mut beats = Vec::new();
    let mut last: Option<usize> = None;
    for (i, &v) in envelope.iter().enumerate() {
        let rested = last.map_or(true, |l| i - l >= refractory);
        if rested && v >= levels.threshold() {
            beats.push(argmax_in(filtered, i.saturating_sub(lookback), i));
            last = Some(i);
            levels.on_beat(v);
        } else {
            levels.on_noise(v);
        }
    }
    beats.sort_unstable();
    beats.dedup();
    beats
}

/// Local maxima of the signal above its 150 ms trailing mean, at least one
/// refractory period apart.
fn excess_over_mean(data: &[f64], fs: f64, params: &PanTompkinsParams) -> Vec<usize> {
    if data.len() < 3 {
        return Vec::new();
    }
    let min_gap = (params.min_rr_s * fs).max(1.0) as usize;
    let excess: Vec<f64> = data
        .iter()
        .zip(moving_average(data, samples(0.150, fs)))
        .map(|(x, m)| x - m)
        .collect();
    let mut beats: Vec<usize> = Vec::new();
    for i in 1..excess.len() - 1 {
        let e = excess[i];
        let apart = beats.last().map_or(true, |&b| i - b >= min_gap);
        if apart && e > 0.0 && e > excess[i - 1] && e > excess[i + 1] {
            beats.push(i);
        }
    }
    beats
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Gaussian R waves (20 ms wide) on a slow 1 Hz baseline. The first beat
    /// is at 0.5 s and the recording ends one second after the last.
    pub(crate) fn synthetic_ecg(fs: f64, rr: &[f64]) -> TimeSeries {
        let beats: Vec<f64> = std::iter::once(0.5)
            .chain(rr.iter().scan(0.5, |t, interval| {
                *t += interval;
                Some(*t)
            }))
            .collect();
        let end = beats[beats.len() - 1] + 1.0;
        let data = (0..(end * fs) as usize)
            .map(|i| {
                let t = i as f64 / fs;
                let r_waves: f64 = beats
                    .iter()
                    .map(|b| 1.2 * (-0.5 * ((t - b) / 0.02).powi(2)).exp())
                    .sum();
                0.05 * (2.0 * std::f64::consts::PI * t).sin() + r_waves
            })
            .collect();
        TimeSeries { fs, data }
    }

    const RR: [f64; 8] = [0.82, 0.78, 0.8, 0.79, 0.81, 0.77, 0.84, 0.88];

    #[test]
    fn pan_tompkins_at_a_low_rate() {
        // 250 Hz, no resampling: every beat, in order, near its R wave
        let ts = synthetic_ecg(250.0, &RR);
        let beats = pan_tompkins(&ts.data, ts.fs);
        assert_eq!(beats.len(), RR.len() + 1);
        assert!(beats.windows(2).all(|w| w[0] < w[1]));
        let first_r = (0.5 * ts.fs) as usize;
        assert!(beats[0].abs_diff(first_r) <= (0.05 * ts.fs) as usize, "{:?}", beats);
    }

    #[test]
    fn beatless_input_uses_raw_maxima() {
        // flat line with two bumps far apart: the envelope walk alone is not trusted
        let mut data = vec![0.0; 400];
        data[100] = 1.0;
        data[300] = 1.0;
        let beats = excess_over_mean(&data, 250.0, &PanTompkinsParams::default());
        assert_eq!(beats, vec![100, 300]);
        assert!(excess_over_mean(&[1.0, 2.0], 250.0, &PanTompkinsParams::default()).is_empty());
    }

    #[test]
    fn every_method_keeps_signal_alignment() {
        let ts = synthetic_ecg(500.0, &RR);
        for method in EcgMethod::ALL {
            let cfg = EcgConfig {
                method,
                ..EcgConfig::default()
            };
            let det = ecg_peaks(&ts, &cfg).unwrap();
            assert_eq!(det.signal.fs, 1000.0);
            assert_eq!(
                det.peaks.len(),
                det.signal.len(),
                "{} returned a misaligned peak vector",
                method
            );
        }
    }

    #[test]
    fn find_local_snaps_to_r_waves() {
        let ts = synthetic_ecg(1000.0, &RR);
        let mut expected = vec![500usize];
        let mut t = 0.5;
        for &interval in &RR {
            t += interval;
            expected.push((t * 1000.0_f64).round() as usize);
        }
        for method in EcgMethod::ALL {
            let cfg = EcgConfig {
                method,
                find_local: true,
                ..EcgConfig::default()
            };
            let det = ecg_peaks(&ts, &cfg).unwrap();
            assert_eq!(det.peaks.indices(), expected, "{} missed or shifted beats", method);
        }
    }

    #[test]
    fn method_names_round_trip() {
        for method in EcgMethod::ALL {
            assert_eq!(method.name().parse::<EcgMethod>().unwrap(), method);
        }
        assert_eq!("Pan_Tompkins".parse::<EcgMethod>().unwrap(), EcgMethod::PanTompkins);
        assert!(matches!(
            "wavelet-transform".parse::<EcgMethod>(),
            Err(PulseError::UnknownMethod(_))
        ));
    }

    #[test]
    fn invalid_configuration_is_rejected() {
        let ts = synthetic_ecg(250.0, &RR);
        let cfg = EcgConfig {
            find_local: true,
            win_size: 0.0,
            ..EcgConfig::default()
        };
        assert!(matches!(
            ecg_peaks(&ts, &cfg),
            Err(PulseError::InvalidConfiguration(_))
        ));
    }
}
