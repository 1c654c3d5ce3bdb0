use rand::{
    Rng,
    SeedableRng,
    distributions::{
        Distribution,
        Uniform,
    },
    rngs::SmallRng,
};

use crate::{
    AudioSignal,
    GetSampleRate,
    signal::{
        f32_to_i16,
        i16_to_f32,
    },
    source::SignalGenerator,
};

#[derive(Clone, Debug, Default)]
pub struct Noise<R, D> {
    rng: R,
    distribution: D,
}

impl<R, D> Noise<R, D> {
    #[inline]
    pub fn new(rng: R, distribution: D) -> Self {
        Self { rng, distribution }
    }
}

impl<R, D> SignalGenerator for Noise<R, D>
where
    R: Rng,
    D: Distribution<f32>,
{
    type Sample = f32;

    #[inline]
    fn next(&mut self) -> Self::Sample {
        self.rng.sample(&self.distribution)
    }
}

/// Uniform white noise in `[-amplitude, amplitude]`, reproducible from `seed`.
pub fn white_noise(amplitude: f32, seed: u64) -> Noise<SmallRng, Uniform<f32>> {
    let amplitude = amplitude.abs();
    Noise::new(
        SmallRng::seed_from_u64(seed),
        Uniform::new_inclusive(-amplitude, amplitude),
    )
}

/// Adds white noise to a signal, e.g. to simulate a noisy radio channel.
pub fn add_white_noise(signal: &AudioSignal, amplitude: f32, seed: u64) -> AudioSignal {
    if amplitude == 0.0 {
        return signal.clone();
    }

    let mut noise = white_noise(amplitude, seed);
    let samples = signal
        .samples()
        .iter()
        .map(|&sample| f32_to_i16(i16_to_f32(sample) + noise.next()))
        .collect();
    AudioSignal::new(samples, signal.sample_rate())
}
