/// Local-maximum search parameters.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FindPeaks {
    /// Minimum peak value.
    pub height: Option<f64>,
    /// Minimum distance between peaks, in samples. Lower peaks lose.
    pub distance: Option<usize>,
}

/// Indices of local maxima in `x`.
///
/// Flat tops report their midpoint. Missing positions break the search: a
/// peak needs present values on both sides.
pub fn find_peaks(x: &[Option<f64>], opts: FindPeaks) -> Vec<usize> {
    let mut peaks = local_maxima(x);
    if let Some(height) = opts.height {
        peaks.retain(|&i| x[i].is_some_and(|v| v >= height));
    }
    match opts.distance {
        Some(distance) if distance > 1 && peaks.len() > 1 => {
            select_by_distance(&peaks, x, distance)
        }
        _ => peaks,
    }
}

/// [`find_peaks`] over a signal without missing values.
pub fn find_peaks_dense(x: &[f64], opts: FindPeaks) -> Vec<usize> {
    let lifted: Vec<Option<f64>> = x.iter().map(|&v| Some(v)).collect();
    find_peaks(&lifted, opts)
}

fn local_maxima(x: &[Option<f64>]) -> Vec<usize> {
    let mut peaks = Vec::new();
    if x.len() < 3 {
        return peaks;
    }
    let last = x.len() - 1;
    let mut i = 1;
    while i < last {
        if let (Some(prev), Some(cur)) = (x[i - 1], x[i]) {
            if prev < cur {
                let mut ahead = i + 1;
                while ahead < last && x[ahead] == Some(cur) {
                    ahead += 1;
                }
                if let Some(next) = x[ahead] {
                    if next < cur {
                        peaks.push((i + ahead - 1) / 2);
                        i = ahead;
                    }
                }
            }
        }
        i += 1;
    }
    peaks
}

fn select_by_distance(peaks: &[usize], x: &[Option<f64>], distance: usize) -> Vec<usize> {
    let mut keep = vec![true; peaks.len()];
    let mut order: Vec<usize> = (0..peaks.len()).collect();
    order.sort_by(|&a, &b| {
        let va = x[peaks[a]].unwrap_or(f64::NEG_INFINITY);
        let vb = x[peaks[b]].unwrap_or(f64::NEG_INFINITY);
        vb.total_cmp(&va).then(b.cmp(&a))
    });
    for &j in &order {
        if !keep[j] {
            continue;
        }
        let mut k = j;
        while k > 0 && peaks[j] - peaks[k - 1] < distance {
            keep[k - 1] = false;
            k -= 1;
        }
        let mut k = j + 1;
        while k < peaks.len() && peaks[k] - peaks[j] < distance {
            keep[k] = false;
            k += 1;
        }
    }
    peaks
        .iter()
        .zip(keep)
        .filter_map(|(&p, k)| k.then_some(p))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extremum {
    Max,
    Min,
}

/// Move every event to the extremum of `signal` within `[i - size, i + size)`.
pub fn to_neighbour(signal: &[f64], peaks: &[usize], size: usize, kind: Extremum) -> Vec<usize> {
    if signal.is_empty() {
        return Vec::new();
    }
    let mut out: Vec<usize> = peaks
        .iter()
        .filter(|&&p| p < signal.len())
        .map(|&p| {
            let lo = p.saturating_sub(size);
            let hi = (p + size).min(signal.len()).max(lo + 1);
            let window = &signal[lo..hi];
            let best = window
                .iter()
                .enumerate()
                .fold(None::<(usize, f64)>, |best, (i, &v)| match best {
                    Some((_, b)) if !better(v, b, kind) => best,
                    _ => Some((i, v)),
                });
            lo + best.map_or(0, |(i, _)| i)
        })
        .collect();
    out.sort_unstable();
    out.dedup();
    out
}

fn better(candidate: f64, current: f64, kind: Extremum) -> bool {
    match kind {
        Extremum::Max => candidate > current,
        Extremum::Min => candidate < current,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_simple_and_flat_peaks() {
        let x = [0.0, 2.0, 0.0, 1.0, 3.0, 3.0, 3.0, 1.0, 4.0];
        // trailing rise is not a peak, flat top reports its midpoint
        assert_eq!(find_peaks_dense(&x, FindPeaks::default()), vec![1, 5]);
    }

    #[test]
    fn height_filter() {
        let x = [0.0, -1.0, -2.0, 0.5, -1.0, 2.0, 0.0];
        let opts = FindPeaks {
            height: Some(0.0),
            distance: None,
        };
        assert_eq!(find_peaks_dense(&x, opts), vec![3, 5]);
    }

    #[test]
    fn distance_keeps_highest() {
        let x = [0.0, 1.0, 0.0, 5.0, 0.0, 2.0, 0.0, 0.0, 0.0, 3.0, 0.0];
        let opts = FindPeaks {
            height: None,
            distance: Some(3),
        };
        assert_eq!(find_peaks_dense(&x, opts), vec![3, 9]);
    }

    #[test]
    fn missing_values_are_never_peaks() {
        let x = [
            None,
            Some(1.0),
            Some(0.0),
            Some(2.0),
            None,
            Some(1.0),
            Some(3.0),
            Some(1.0),
        ];
        assert_eq!(find_peaks(&x, FindPeaks::default()), vec![6]);
    }

    #[test]
    fn neighbour_moves_to_local_extremum() {
        let signal = [0.0, 1.0, 4.0, 2.0, 0.0, -3.0, 0.0, 1.0];
        assert_eq!(to_neighbour(&signal, &[1], 2, Extremum::Max), vec![2]);
        assert_eq!(to_neighbour(&signal, &[6], 2, Extremum::Min), vec![5]);
        // windows are clipped at the edges
        assert_eq!(to_neighbour(&signal, &[0, 7], 1, Extremum::Max), vec![0, 7]);
    }
}
