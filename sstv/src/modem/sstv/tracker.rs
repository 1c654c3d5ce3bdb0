//! Frequency estimation for short windows of a single tone.

use std::ops::Range;

use crate::filter::GoertzelFilter;

#[derive(Clone, Copy, Debug, thiserror::Error)]
pub enum TrackerError {
    #[error("window of {len} samples is too short, need at least {required}")]
    InsufficientSamples { len: usize, required: usize },
}

pub trait FrequencyTracker {
    /// Shortest window [`estimate`](Self::estimate) accepts.
    fn min_window_len(&self, sample_rate: f32) -> usize;

    /// Dominant frequency of `window` in Hz.
    fn estimate(&self, window: &[f32], sample_rate: f32) -> Result<f32, TrackerError>;
}

impl<T> FrequencyTracker for &T
where
    T: FrequencyTracker,
{
    #[inline]
    fn min_window_len(&self, sample_rate: f32) -> usize {
        (&**self).min_window_len(sample_rate)
    }

    #[inline]
    fn estimate(&self, window: &[f32], sample_rate: f32) -> Result<f32, TrackerError> {
        (&**self).estimate(window, sample_rate)
    }
}

/// Least-squares single tone fit.
///
/// A bank of Goertzel filters spaced over `[low, high]` finds the coarse peak of
/// [`GoertzelFilter::tone_power`], which is then refined with a golden-section
/// search down to `resolution`. For a noiseless tone the fit is exact, even for
/// windows shorter than one period of the tone.
#[derive(Clone, Copy, Debug)]
pub struct GoertzelTracker {
    pub low: f32,
    pub high: f32,
    pub resolution: f32,
}

impl Default for GoertzelTracker {
    fn default() -> Self {
        Self {
            low: 1000.0,
            high: 2500.0,
            resolution: 0.1,
        }
    }
}

impl GoertzelTracker {
    pub fn new(low: f32, high: f32) -> Self {
        Self {
            low,
            high,
            ..Default::default()
        }
    }

    /// Spacing of the coarse filter bank. The main lobe of a window of `len`
    /// samples is `sample_rate / len` wide, so half of that can't skip a peak.
    fn coarse_step(&self, len: usize, sample_rate: f64) -> f64 {
        (sample_rate / (2.0 * len as f64)).clamp(5.0, 100.0)
    }
}

impl FrequencyTracker for GoertzelTracker {
    fn min_window_len(&self, sample_rate: f32) -> usize {
        // one period of the highest tracked frequency
        (sample_rate / self.high).ceil() as usize
    }

    fn estimate(&self, window: &[f32], sample_rate: f32) -> Result<f32, TrackerError> {
        let required = self.min_window_len(sample_rate);
        if window.len() < required {
            return Err(TrackerError::InsufficientSamples {
                len: window.len(),
                required,
            });
        }

        let sample_rate = f64::from(sample_rate);
        let low = f64::from(self.low);
        let high = f64::from(self.high);
        let power =
            |frequency: f64| GoertzelFilter::new(sample_rate, frequency).tone_power(window);

        let step = self.coarse_step(window.len(), sample_rate);
        let mut best = (low, power(low));
        let mut frequency = low + step;
        while frequency <= high {
            let p = power(frequency);
            if p > best.1 {
                best = (frequency, p);
            }
            frequency += step;
        }

        let peak = golden_section_max(
            (best.0 - step).max(low),
            (best.0 + step).min(high),
            f64::from(self.resolution),
            power,
        );

        Ok(peak as f32)
    }
}

/// Estimates the frequency of `window` with the default [`GoertzelTracker`].
pub fn estimate(window: &[f32], sample_rate: f32) -> Result<f32, TrackerError> {
    GoertzelTracker::default().estimate(window, sample_rate)
}

fn golden_section_max(mut a: f64, mut b: f64, tolerance: f64, f: impl Fn(f64) -> f64) -> f64 {
    let ratio = (5f64.sqrt() - 1.0) / 2.0;

    let mut c = b - ratio * (b - a);
    let mut d = a + ratio * (b - a);
    let mut fc = f(c);
    let mut fd = f(d);

    while b - a > tolerance {
        if fc > fd {
            b = d;
            d = c;
            fd = fc;
            c = b - ratio * (b - a);
            fc = f(c);
        }
        else {
            a = c;
            c = d;
            fc = fd;
            d = a + ratio * (b - a);
            fd = f(d);
        }
    }

    (a + b) / 2.0
}

/// Finds the sample at which one tone changes into another.
///
/// The edge is the sample where the tones meet. A phase-continuous change of
/// frequency takes effect after that sample, so it belongs to both the window
/// before and the window after the edge.
///
/// Candidates are first scored by how far the tracked frequencies of both
/// windows are from the expected tones, in Hz. Because the phase doesn't jump,
/// a window that reaches a few samples across the edge is tracked almost as
/// well as a clean one, so the best coarse candidate is then refined by
/// [`misfit`](Self::misfit).
#[derive(Clone, Copy, Debug)]
pub struct EdgeDetect<'a, T> {
    pub samples: &'a [f32],
    pub sample_rate: f32,
    pub tracker: T,
    pub before_tone: f32,
    pub after_tone: f32,
    pub before_len: usize,
    pub after_len: usize,
}

impl<T> EdgeDetect<'_, T>
where
    T: FrequencyTracker,
{
    fn windows(&self, edge: usize) -> Option<(&[f32], &[f32])> {
        let before = self
            .samples
            .get((edge + 1).checked_sub(self.before_len)?..edge + 1)?;
        let after = self.samples.get(edge..edge + self.after_len)?;
        Some((before, after))
    }

    /// Score of an edge at `edge` in Hz, or `None` if the windows around it
    /// don't fit into the signal.
    pub fn score(&self, edge: usize) -> Option<f32> {
        let (before, after) = self.windows(edge)?;

        let before = self.tracker.estimate(before, self.sample_rate).ok()?;
        let after = self.tracker.estimate(after, self.sample_rate).ok()?;

        Some((before - self.before_tone).abs() + (after - self.after_tone).abs())
    }

    /// Share of the energy of both windows that a single tone, fitted to each
    /// window, doesn't explain. Zero for an exact edge in a clean signal.
    pub fn misfit(&self, edge: usize) -> Option<f64> {
        let (before, after) = self.windows(edge)?;
        Some(self.residual(before)? + self.residual(after)?)
    }

    fn residual(&self, window: &[f32]) -> Option<f64> {
        let energy = window
            .iter()
            .map(|&sample| f64::from(sample).powi(2))
            .sum::<f64>();
        if energy <= 0.0 {
            return Some(1.0);
        }

        let frequency = self.tracker.estimate(window, self.sample_rate).ok()?;
        let fitted = GoertzelFilter::new(f64::from(self.sample_rate), f64::from(frequency))
            .tone_power(window);
        Some((1.0 - fitted / energy).max(0.0))
    }

    /// Best scoring edge in `range`, searched every `coarse_step` samples and
    /// then refined to the sample. Returns the edge and its score.
    pub fn search(&self, range: Range<usize>, coarse_step: usize) -> Option<(usize, f32)> {
        let coarse_step = coarse_step.max(1);

        let (coarse, coarse_score) = range
            .clone()
            .step_by(coarse_step)
            .filter_map(|edge| self.score(edge).map(|score| (edge, score)))
            .min_by(|(_, a), (_, b)| a.total_cmp(b))?;

        let start = coarse.saturating_sub(coarse_step).max(range.start);
        let end = (coarse + coarse_step + 1).min(range.end);
        let refined = (start..end)
            .filter_map(|edge| self.misfit(edge).map(|misfit| (edge, misfit)))
            .min_by(|(_, a), (_, b)| a.total_cmp(b))
            .and_then(|(edge, _)| Some((edge, self.score(edge)?)));

        Some(refined.unwrap_or((coarse, coarse_score)))
    }
}
