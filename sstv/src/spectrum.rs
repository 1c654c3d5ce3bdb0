//! Short-time spectrum of a signal, for diagnosing recordings.

use std::{
    f32::consts::PI,
    fmt::{
        self,
        Debug,
    },
    str::FromStr,
    sync::Arc,
};

use num_complex::Complex;
use rustfft::FftPlanner;

use crate::{
    AudioSignal,
    GetSampleRate,
};

pub const FRAME_SIZE: usize = 1024;

/// Frequencies in which SSTV puts its energy.
pub const SSTV_BAND: (f32, f32) = (1000.0, 2500.0);

#[derive(Clone, Debug, thiserror::Error)]
#[error("no such window: {0}")]
pub struct UnknownWindow(pub String);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Window {
    Boxcar,
    #[default]
    Hann,
}

impl FromStr for Window {
    type Err = UnknownWindow;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "boxcar" => Ok(Self::Boxcar),
            "hann" | "hanning" => Ok(Self::Hann),
            _ => Err(UnknownWindow(s.to_owned())),
        }
    }
}

fn hann_window(n: usize) -> impl Iterator<Item = f32> {
    let n_f32 = n as f32;
    (0..=n).map(move |i| (PI * i as f32 / n_f32).sin().powi(2))
}

impl Window {
    fn to_vec(&self, size: usize) -> Vec<f32> {
        match self {
            Window::Boxcar => std::iter::repeat_n(1.0, size).collect(),
            Window::Hann => hann_window(size - 1).collect(),
        }
    }
}

/// Forward FFT of real frames.
pub struct Fft {
    buffer: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
    window: Vec<f32>,
    fft: Arc<dyn rustfft::Fft<f32>>,
    size: usize,
}

impl Fft {
    pub fn new(size: usize, window: Window) -> Self {
        assert!(size > 1, "FFT size must be greater than 1: {size}");

        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(size);

        Self {
            buffer: vec![Default::default(); size],
            scratch: vec![Default::default(); fft.get_inplace_scratch_len()],
            window: window.to_vec(size),
            fft,
            size,
        }
    }

    /// Power of the non-negative frequency bins of `samples`. Missing samples
    /// at the end of a short frame are treated as zero.
    pub fn power(&mut self, samples: &[f32]) -> Vec<f32> {
        for (i, bin) in self.buffer.iter_mut().enumerate() {
            let sample = samples.get(i).copied().unwrap_or_default();
            *bin = Complex::new(self.window[i] * sample, 0.0);
        }

        self.fft
            .process_with_scratch(&mut self.buffer, &mut self.scratch);

        self.buffer[..=self.size / 2]
            .iter()
            .map(|bin| bin.norm_sqr())
            .collect()
    }
}

impl Debug for Fft {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fft")
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

#[derive(Clone, Debug)]
pub struct Spectrogram {
    pub sample_rate: f32,
    pub frame_size: usize,
    pub hop: usize,
    /// Power per bin, one entry per frame.
    pub frames: Vec<Vec<f32>>,
}

impl Spectrogram {
    /// Frames of `frame_size` samples overlapping by half.
    pub fn compute(samples: &[f32], sample_rate: f32, frame_size: usize, window: Window) -> Self {
        let hop = frame_size / 2;
        let mut fft = Fft::new(frame_size, window);

        let frames = (0..samples.len().saturating_sub(hop).max(1))
            .step_by(hop)
            .map(|start| fft.power(&samples[start.min(samples.len())..]))
            .collect();

        Self {
            sample_rate,
            frame_size,
            hop,
            frames,
        }
    }

    #[inline]
    pub fn bin_frequency(&self, bin: usize) -> f32 {
        bin as f32 * self.sample_rate / self.frame_size as f32
    }

    /// Frequency of the strongest bin of each frame, ignoring DC.
    pub fn dominant_frequencies(&self) -> Vec<f32> {
        self.frames
            .iter()
            .map(|frame| {
                let bin = frame
                    .iter()
                    .enumerate()
                    .skip(1)
                    .max_by(|(_, a), (_, b)| a.total_cmp(b))
                    .map_or(0, |(bin, _)| bin);
                self.bin_frequency(bin)
            })
            .collect()
    }

    /// Share of the total power that lies within `[low, high]`.
    pub fn band_energy_ratio(&self, low: f32, high: f32) -> f32 {
        let mut in_band = 0.0;
        let mut total = 0.0;
        for frame in &self.frames {
            for (bin, power) in frame.iter().enumerate() {
                let frequency = self.bin_frequency(bin);
                if (low..=high).contains(&frequency) {
                    in_band += f64::from(*power);
                }
                total += f64::from(*power);
            }
        }

        if total > 0.0 {
            (in_band / total) as f32
        }
        else {
            0.0
        }
    }
}

#[derive(Clone, Debug)]
pub struct SignalReport {
    pub sample_rate: f32,
    pub num_samples: usize,
    pub duration: f32,
    /// Peak absolute sample value relative to full scale.
    pub peak: f32,
    pub frame_size: usize,
    /// Time in seconds and dominant frequency of every frame.
    pub dominant_frequencies: Vec<(f32, f32)>,
    pub sstv_band_ratio: f32,
}

pub fn analyze(signal: &AudioSignal, window: Window) -> SignalReport {
    let samples = signal.to_f32();
    let sample_rate = signal.sample_rate();
    let spectrogram = Spectrogram::compute(&samples, sample_rate, FRAME_SIZE, window);

    let dominant_frequencies = spectrogram
        .dominant_frequencies()
        .into_iter()
        .enumerate()
        .map(|(i, frequency)| ((i * spectrogram.hop) as f32 / sample_rate, frequency))
        .collect();

    SignalReport {
        sample_rate,
        num_samples: samples.len(),
        duration: signal.duration(),
        peak: samples.iter().fold(0.0, |peak: f32, sample| peak.max(sample.abs())),
        frame_size: FRAME_SIZE,
        dominant_frequencies,
        sstv_band_ratio: spectrogram.band_energy_ratio(SSTV_BAND.0, SSTV_BAND.1),
    }
}

impl fmt::Display for SignalReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "sample rate: {} Hz", self.sample_rate)?;
        writeln!(f, "samples:     {}", self.num_samples)?;
        writeln!(f, "duration:    {:.3} s", self.duration)?;
        writeln!(f, "peak:        {:.3}", self.peak)?;
        writeln!(
            f,
            "energy in {}-{} Hz: {:.1} %",
            SSTV_BAND.0,
            SSTV_BAND.1,
            100.0 * self.sstv_band_ratio
        )?;
        write!(f, "frames:      {} x {} samples", self.dominant_frequencies.len(), self.frame_size)
    }
}
