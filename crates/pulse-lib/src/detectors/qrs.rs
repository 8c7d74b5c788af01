//! Alternative R-peak detectors selectable through [`EcgMethod`].
//!
//! Each detector takes the raw ECG at `fs` and returns ascending sample
//! indices located on the R wave of the input.
//!
//! [`EcgMethod`]: crate::detectors::ecg::EcgMethod

use crate::detectors::filters::{
    argmax_in, bandpass, difference, moving_average, samples, square,
};
use std::collections::VecDeque;

const REFRACTORY_S: f64 = 0.3;

/// Two moving averages over the squared band-passed signal: blocks where the
/// QRS-length average rises above the beat-length one contain one beat each.
pub fn two_average(data: &[f64], fs: f64) -> Vec<usize> {
    if data.len() < 3 {
        return Vec::new();
    }
    let energy = square(&bandpass(data, fs, 8.0, 20.0));
    let qrs_win = samples(0.12, fs);
    let ma_qrs = moving_average(&energy, qrs_win);
    let ma_beat = moving_average(&energy, samples(0.6, fs));
    let offset = 0.08 * energy.iter().sum::<f64>() / energy.len() as f64;
    let min_block = samples(0.08, fs);
    let refractory = samples(REFRACTORY_S, fs);

    let mut peaks: Vec<usize> = Vec::new();
    let mut start = None;
    for i in 0..=energy.len() {
        let inside = i < energy.len() && ma_qrs[i] > ma_beat[i] + offset;
        match (inside, start) {
            (true, None) => start = Some(i),
            (false, Some(s)) => {
                start = None;
                if i - s < min_block {
                    continue;
                }
                let r = argmax_in(data, s.saturating_sub(qrs_win), i - 1);
                match peaks.last_mut() {
                    Some(last) if r - *last < refractory => {
                        if data[r] > data[*last] {
                            *last = r;
                        }
                    }
                    _ => peaks.push(r),
                }
            }
            _ => {}
        }
    }
    peaks
}

/// Hamilton's adaptive threshold over the averaged absolute slope, with
/// search-back for beats missed during long intervals.
pub fn hamilton(data: &[f64], fs: f64) -> Vec<usize> {
    if data.len() < 3 {
        return Vec::new();
    }
    let slope: Vec<f64> = difference(&bandpass(data, fs, 8.0, 16.0), 1)
        .into_iter()
        .map(f64::abs)
        .collect();
    let avg_win = samples(0.08, fs);
    let mut ma = moving_average(&slope, avg_win);
    let warmup = (2 * avg_win).min(ma.len());
    ma[..warmup].iter_mut().for_each(|x| *x = 0.0);

    let refractory = samples(REFRACTORY_S, fs);
    let search_gap = samples(0.36, fs);

    let mut signal_peaks = Buffer::new(8);
    let mut noise_peaks = Buffer::new(8);
    let mut intervals = Buffer::new(8);
    let mut signal_level = learning_level(&ma, fs);
    let mut noise_level = 0.0;
    let mut threshold = noise_level + 0.45 * (signal_level - noise_level);

    let mut candidates: Vec<usize> = Vec::new();
    let mut qrs: Vec<usize> = Vec::new();
    let mut last_accepted_candidate = 0usize;

    for i in 1..ma.len() - 1 {
        if !(ma[i - 1] < ma[i] && ma[i + 1] < ma[i]) {
            continue;
        }
        candidates.push(i);
        let clear = qrs.last().map_or(true, |&last| i - last > refractory);
        if ma[i] > threshold && clear {
            if let (Some(&previous), Some(rr_ave)) = (qrs.last(), intervals.mean()) {
                if (i - previous) as f64 > 1.5 * rr_ave {
                    let missed = candidates[last_accepted_candidate + 1..candidates.len() - 1]
                        .iter()
                        .copied()
                        .find(|&c| c - previous > search_gap && ma[c] > 0.5 * threshold);
                    if let Some(m) = missed {
                        qrs.push(m);
                    }
                }
            }
            if let Some(&previous) = qrs.last() {
                intervals.push((i - previous) as f64);
            }
            qrs.push(i);
            last_accepted_candidate = candidates.len() - 1;
            signal_peaks.push(ma[i]);
            signal_level = signal_peaks.mean().unwrap_or(signal_level);
        } else {
            noise_peaks.push(ma[i]);
            noise_level = noise_peaks.mean().unwrap_or(noise_level);
        }
        threshold = noise_level + 0.45 * (signal_level - noise_level);
    }

    refine(data, &qrs, samples(0.15, fs), fs)
}

/// Engelse and Zeelenberg: a differentiated, smoothed signal must cross the
/// positive threshold and then stay below its negative for 10 ms.
pub fn engelse_zeelenberg(data: &[f64], fs: f64) -> Vec<usize> {
    if data.len() < 5 {
        return Vec::new();
    }
    let diff = difference(data, 4);
    let mut lp = fir(&diff, &[1.0, 4.0, 6.0, 4.0, 1.0]);
    let ms10 = (0.01 * fs) as usize;
    let ms160 = (0.16 * fs) as usize;
    let ms200 = (0.2 * fs) as usize;
    let ms1200 = (1.2 * fs) as usize;
    let learning = ((5.0 * fs) as usize).min(lp.len());
    let head = ms200.min(lp.len());
    lp[..head].iter_mut().for_each(|x| *x = 0.0);

    let initial = 0.6 * lp[..learning].iter().copied().fold(0.0, f64::max);
    let mut mm = Buffer::new(5);
    (0..5).for_each(|_| mm.push(initial));
    let decay = |k: usize| 1.0 - 0.4 * k as f64 / (ms1200 - ms200 - 1).max(1) as f64;

    let mut m = initial;
    let mut next_m = initial;
    let mut last_qrs: Option<usize> = None;
    let mut onset = 0usize;
    let mut rising = false;
    let mut falling = false;
    let mut below = 0usize;
    let mut peaks = Vec::new();

    for i in 0..lp.len() {
        if i >= learning {
            if let Some(q) = last_qrs {
                if i < q + ms200 {
                    next_m = 0.6 * lp[q..i.max(q + 1)].iter().copied().fold(f64::MIN, f64::max);
                    let recent = mm.last().unwrap_or(initial);
                    if next_m > 1.5 * recent {
                        next_m = 1.1 * recent;
                    }
                } else if i == q + ms200 {
                    mm.push(next_m);
                    m = mm.mean().unwrap_or(m);
                } else if i < q + ms1200 {
                    m = mm.mean().unwrap_or(m) * decay(i - q - ms200);
                } else {
                    m = 0.6 * mm.mean().unwrap_or(m);
                }
            }
        }

        let armed = last_qrs.map_or(true, |q| i > q + ms200);
        if armed && lp[i] > m {
            last_qrs = Some(i);
            onset = i;
            rising = true;
            falling = false;
            below = 0;
        }

        if rising && i < onset + ms160 {
            if i > 0 && lp[i] < -m && lp[i - 1] > -m {
                falling = true;
            }
            if falling && lp[i] < -m {
                below += 1;
            } else if falling && lp[i] > -m {
                below = 0;
                rising = false;
                falling = false;
            }
        } else if rising {
            below = 0;
            rising = false;
            falling = false;
        }

        if below > ms10 {
            peaks.push(argmax_in(data, onset.saturating_sub(ms10), i.saturating_sub(1)));
            below = 0;
            rising = false;
            falling = false;
        }
    }
    peaks.dedup();
    peaks
}

/// Mean of the per-second maxima over the first eight seconds.
fn learning_level(envelope: &[f64], fs: f64) -> f64 {
    let second = (fs as usize).max(1);
    let maxima: Vec<f64> = envelope
        .chunks(second)
        .take(8)
        .map(|c| c.iter().copied().fold(0.0, f64::max))
        .collect();
    if maxima.is_empty() {
        0.0
    } else {
        maxima.iter().sum::<f64>() / maxima.len() as f64
    }
}

/// Move envelope detections back onto the largest input sample preceding them.
fn refine(data: &[f64], detections: &[usize], lookback: usize, fs: f64) -> Vec<usize> {
    let refractory = samples(REFRACTORY_S, fs);
    let mut peaks: Vec<usize> = Vec::with_capacity(detections.len());
    for &d in detections {
        let r = argmax_in(data, d.saturating_sub(lookback), d);
        match peaks.last() {
            Some(&last) if r <= last || r - last < refractory => {}
            _ => peaks.push(r),
        }
    }
    peaks
}

fn fir(data: &[f64], taps: &[f64]) -> Vec<f64> {
    (0..data.len())
        .map(|i| {
            taps.iter()
                .enumerate()
                .take(i + 1)
                .map(|(k, &b)| b * data[i - k])
                .sum()
        })
        .collect()
}

/// Fixed-capacity FIFO of recent values.
struct Buffer {
    values: VecDeque<f64>,
    capacity: usize,
}

impl Buffer {
    fn new(capacity: usize) -> Self {
        Self {
            values: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    fn push(&mut self, value: f64) {
        if self.values.len() == self.capacity {
            self.values.pop_front();
        }
        self.values.push_back(value);
    }

    fn last(&self) -> Option<f64> {
        self.values.back().copied()
    }

    fn mean(&self) -> Option<f64> {
        (!self.values.is_empty())
            .then(|| self.values.iter().sum::<f64>() / self.values.len() as f64)
    }
}
