use std::f64::consts::TAU;

use crate::{
    GetSampleRate,
    source::SignalGenerator,
};

/// Peak amplitude of synthesized tones, relative to full scale.
pub const AMPLITUDE: f32 = 0.8;

#[derive(Clone, Copy, Debug, thiserror::Error)]
pub enum SynthesisError {
    #[error("invalid segment: {frequency} Hz for {duration} s")]
    InvalidSegment { frequency: f32, duration: f32 },
    #[error("invalid sample rate: {sample_rate} Hz")]
    InvalidSampleRate { sample_rate: f32 },
}

#[inline]
fn step_from_frequency_and_sample_rate(frequency: f32, sample_rate: f32) -> f64 {
    (TAU * f64::from(frequency) / f64::from(sample_rate)).rem_euclid(TAU)
}

/// Phase-continuous sine oscillator.
///
/// The phase is kept in `f64`, since a single transmission runs for millions
/// of samples.
#[derive(Clone, Copy, Debug)]
pub struct SineWave {
    sample_rate: f32,
    phase: f64,
    step: f64,
}

impl SineWave {
    pub fn new(frequency: f32, sample_rate: f32) -> Self {
        Self {
            sample_rate,
            phase: 0.0,
            step: step_from_frequency_and_sample_rate(frequency, sample_rate),
        }
    }

    pub fn with_phase(mut self, phase: f64) -> Self {
        self.phase = phase.rem_euclid(TAU);
        self
    }

    /// Phase of the next sample, in `[0, TAU)`.
    #[inline]
    pub fn phase(&self) -> f64 {
        self.phase
    }
}

impl SignalGenerator for SineWave {
    type Sample = f32;

    fn next(&mut self) -> Self::Sample {
        let output = AMPLITUDE * self.phase.sin() as f32;
        self.phase += self.step;
        if self.phase >= TAU {
            self.phase -= TAU;
        }
        output
    }
}

impl GetSampleRate for SineWave {
    #[inline]
    fn sample_rate(&self) -> f32 {
        self.sample_rate
    }
}

/// Samples of one synthesized segment.
#[derive(Clone, Debug)]
pub struct Tone {
    pub samples: Vec<f32>,
    /// Phase at which the following segment has to start.
    pub end_phase: f64,
}

fn check_parameters(frequency: f32, duration: f32, sample_rate: f32) -> Result<(), SynthesisError> {
    if !(sample_rate.is_finite() && sample_rate > 0.0) {
        return Err(SynthesisError::InvalidSampleRate { sample_rate });
    }
    if !(frequency.is_finite() && frequency > 0.0 && duration.is_finite() && duration >= 0.0) {
        return Err(SynthesisError::InvalidSegment {
            frequency,
            duration,
        });
    }
    Ok(())
}

/// Synthesizes `duration` seconds of a sine wave at `frequency`, starting at
/// `start_phase`.
///
/// The number of samples is `duration * sample_rate` rounded to the nearest
/// integer.
pub fn synthesize(
    frequency: f32,
    duration: f32,
    sample_rate: f32,
    start_phase: f64,
) -> Result<Tone, SynthesisError> {
    check_parameters(frequency, duration, sample_rate)?;
    let num_samples = (f64::from(duration) * f64::from(sample_rate)).round() as usize;
    let mut samples = Vec::with_capacity(num_samples);
    let end_phase = synthesize_into(frequency, num_samples, sample_rate, start_phase, &mut samples)?;
    Ok(Tone { samples, end_phase })
}

/// Appends exactly `num_samples` samples to `output` and returns the end
/// phase.
pub fn synthesize_into(
    frequency: f32,
    num_samples: usize,
    sample_rate: f32,
    start_phase: f64,
    output: &mut Vec<f32>,
) -> Result<f64, SynthesisError> {
    check_parameters(frequency, 0.0, sample_rate)?;
    let mut sine = SineWave::new(frequency, sample_rate).with_phase(start_phase);
    output.extend((0..num_samples).map(|_| sine.next()));
    Ok(sine.phase())
}
