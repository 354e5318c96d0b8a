//! Spectral periodicity signal.
//!
//! Video players fetch media in regular segments, which shows up as a
//! dominant peak in the spectrum of the byte-size series. The estimator
//! reduces that to one scalar:
//!
//! 1. Resample sizes into fixed-width buckets (sum, zero-filled)
//! 2. Welch PSD of the bucket series
//! 3. Square root of the PSD
//! 4. Local maxima
//! 5. Prominence of each maximum
//! 6. Largest prominence, or [`PeakProminence::NoPeak`]
//!
//! # Welch parameters
//!
//! | Parameter | Value |
//! |-----------|-------|
//! | Window | periodic Hann |
//! | Segment length | `min(256, n)` |
//! | Overlap | half a segment |
//! | Detrend | segment mean removed |
//! | Scaling | one-sided power spectral density |
//! | Averaging | mean over segments |

use rustfft::num_complex::Complex64;
use rustfft::FftPlanner;
use std::f64::consts::PI;

/// Default Welch segment length.
pub const DEFAULT_SEGMENT_LEN: usize = 256;

/// Outcome of the peak search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PeakProminence {
    /// Largest prominence among detected peaks
    Max(f64),
    /// No peak, or the spectrum was not finite
    NoPeak,
}

impl PeakProminence {
    /// Scalar feature value; `NoPeak` maps to 0.
    pub fn value(self) -> f64 {
        match self {
            PeakProminence::Max(p) => p,
            PeakProminence::NoPeak => 0.0,
        }
    }

    pub fn is_peak(self) -> bool {
        matches!(self, PeakProminence::Max(_))
    }
}

/// One-sided power spectral density.
#[derive(Debug, Clone, PartialEq)]
pub struct Psd {
    /// Bin frequencies (Hz)
    pub frequencies: Vec<f64>,
    /// Density per bin
    pub power: Vec<f64>,
}

/// Estimates the strongest spectral peak prominence of a size series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpectralProminenceEstimator {
    resample_rate_ms: i64,
    frequency: f64,
}

impl SpectralProminenceEstimator {
    /// # Panics
    ///
    /// Panics if `resample_rate_ms` is 0 or `frequency` is not a positive
    /// finite number.
    pub fn new(resample_rate_ms: u64, frequency: f64) -> Self {
        assert!(resample_rate_ms > 0, "resample_rate_ms must be > 0");
        assert!(
            frequency.is_finite() && frequency > 0.0,
            "frequency must be positive"
        );
        Self {
            resample_rate_ms: resample_rate_ms.min(i64::MAX as u64) as i64,
            frequency,
        }
    }

    pub fn resample_rate_ms(&self) -> i64 {
        self.resample_rate_ms
    }

    pub fn frequency(&self) -> f64 {
        self.frequency
    }

    /// Run the full estimate on `(time_ms, size)` observations.
    pub fn estimate<I>(&self, observations: I) -> PeakProminence
    where
        I: IntoIterator<Item = (i64, f64)>,
    {
        let series = resample_sum(observations, self.resample_rate_ms);
        if series.is_empty() {
            return PeakProminence::NoPeak;
        }

        let psd = welch(&series, self.frequency, DEFAULT_SEGMENT_LEN);
        let amplitude: Vec<f64> = psd.power.iter().map(|p| p.sqrt()).collect();
        max_peak_prominence(&amplitude)
    }
}

/// Sum values into buckets of `rate_ms`, anchored at the first observation.
///
/// Buckets without observations are 0. Observations must be time-ordered.
pub fn resample_sum<I>(observations: I, rate_ms: i64) -> Vec<f64>
where
    I: IntoIterator<Item = (i64, f64)>,
{
    let mut buckets: Vec<f64> = Vec::new();
    let mut origin: Option<i64> = None;

    for (time, value) in observations {
        let t0 = *origin.get_or_insert(time);
        let offset = time.saturating_sub(t0).max(0);
        let index = (offset / rate_ms) as usize;
        if index >= buckets.len() {
            buckets.resize(index + 1, 0.0);
        }
        buckets[index] += value;
    }

    buckets
}

/// Periodic Hann window of length `n`.
pub fn hann_periodic(n: usize) -> Vec<f64> {
    if n <= 1 {
        return vec![1.0; n];
    }
    (0..n)
        .map(|k| 0.5 - 0.5 * (2.0 * PI * k as f64 / n as f64).cos())
        .collect()
}

/// Welch power spectral density estimate.
///
/// `max_segment_len` is clamped to the signal length.
pub fn welch(signal: &[f64], fs: f64, max_segment_len: usize) -> Psd {
    let n = signal.len();
    if n == 0 {
        return Psd {
            frequencies: Vec::new(),
            power: Vec::new(),
        };
    }

    let nperseg = max_segment_len.clamp(1, n);
    let noverlap = nperseg / 2;
    let step = nperseg - noverlap;
    let n_segments = (n - noverlap) / step;

    let window = hann_periodic(nperseg);
    let window_power: f64 = window.iter().map(|w| w * w).sum();
    let scale = 1.0 / (fs * window_power);

    let n_bins = nperseg / 2 + 1;
    let mut power = vec![0.0; n_bins];

    let mut planner = FftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(nperseg);
    let mut buffer = vec![Complex64::new(0.0, 0.0); nperseg];

    for seg in 0..n_segments {
        let segment = &signal[seg * step..seg * step + nperseg];
        let mean = segment.iter().sum::<f64>() / nperseg as f64;

        for ((slot, &x), &w) in buffer.iter_mut().zip(segment).zip(&window) {
            *slot = Complex64::new((x - mean) * w, 0.0);
        }
        fft.process(&mut buffer);

        for (acc, c) in power.iter_mut().zip(&buffer) {
            *acc += c.norm_sqr() * scale;
        }
    }

    let segments = n_segments.max(1) as f64;
    for p in power.iter_mut() {
        *p /= segments;
    }

    // Fold negative frequencies; DC and (even length) Nyquist appear once
    let last_doubled = if nperseg % 2 == 0 { n_bins - 1 } else { n_bins };
    for p in power.iter_mut().take(last_doubled).skip(1) {
        *p *= 2.0;
    }

    let frequencies = (0..n_bins)
        .map(|k| k as f64 * fs / nperseg as f64)
        .collect();

    Psd { frequencies, power }
}

/// Indices of local maxima.
///
/// A flat top counts as one peak located at its middle sample (rounded
/// down). The first and last samples are never peaks.
pub fn find_peaks(x: &[f64]) -> Vec<usize> {
    let mut peaks = Vec::new();
    if x.len() < 3 {
        return peaks;
    }

    let i_max = x.len() - 1;
    let mut i = 1;
    while i < i_max {
        if x[i - 1] < x[i] {
            let mut ahead = i + 1;
            while ahead < i_max && x[ahead] == x[i] {
                ahead += 1;
            }
            if x[ahead] < x[i] {
                let left = i;
                let right = ahead - 1;
                peaks.push((left + right) / 2);
                i = ahead;
            }
        }
        i += 1;
    }

    peaks
}

/// Prominence of each peak in `peaks`.
///
/// The reference level on each side is the lowest sample reached before
/// the signal rises above the peak (or the signal ends). The prominence is
/// the peak height above the higher of the two reference levels.
pub fn peak_prominences(x: &[f64], peaks: &[usize]) -> Vec<f64> {
    peaks
        .iter()
        .map(|&peak| {
            let height = x[peak];

            let mut left_min = height;
            for &v in x[..=peak].iter().rev() {
                if v > height {
                    break;
                }
                left_min = left_min.min(v);
            }

            let mut right_min = height;
            for &v in &x[peak..] {
                if v > height {
                    break;
                }
                right_min = right_min.min(v);
            }

            height - left_min.max(right_min)
        })
        .collect()
}

/// Largest peak prominence of `x`.
pub fn max_peak_prominence(x: &[f64]) -> PeakProminence {
    if x.is_empty() || x.iter().any(|v| !v.is_finite()) {
        return PeakProminence::NoPeak;
    }

    let peaks = find_peaks(x);
    peak_prominences(x, &peaks)
        .into_iter()
        .fold(None, |best: Option<f64>, p| {
            Some(best.map_or(p, |b| b.max(p)))
        })
        .map_or(PeakProminence::NoPeak, PeakProminence::Max)
}
