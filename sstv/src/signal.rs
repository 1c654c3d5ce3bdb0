use crate::GetSampleRate;

/// Mono 16-bit PCM signal.
#[derive(Clone, Debug, PartialEq)]
pub struct AudioSignal {
    samples: Vec<i16>,
    sample_rate: f32,
}

impl AudioSignal {
    #[inline]
    pub fn new(samples: Vec<i16>, sample_rate: f32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Quantizes samples in `[-1.0, 1.0]`. Values outside that range are
    /// clipped.
    pub fn from_f32(samples: &[f32], sample_rate: f32) -> Self {
        Self {
            samples: samples.iter().copied().map(f32_to_i16).collect(),
            sample_rate,
        }
    }

    #[inline]
    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    #[inline]
    pub fn into_samples(self) -> Vec<i16> {
        self.samples
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration in seconds
    #[inline]
    pub fn duration(&self) -> f32 {
        (self.samples.len() as f64 / f64::from(self.sample_rate)) as f32
    }

    pub fn to_f32(&self) -> Vec<f32> {
        self.samples.iter().copied().map(i16_to_f32).collect()
    }

    /// Returns a copy holding only the first `len` samples.
    pub fn truncated(&self, len: usize) -> Self {
        Self {
            samples: self.samples[..len.min(self.samples.len())].to_vec(),
            sample_rate: self.sample_rate,
        }
    }
}

impl GetSampleRate for AudioSignal {
    #[inline]
    fn sample_rate(&self) -> f32 {
        self.sample_rate
    }
}

#[inline]
pub fn i16_to_f32(sample: i16) -> f32 {
    f32::from(sample) / f32::from(i16::MAX)
}

#[inline]
pub fn f32_to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * f32::from(i16::MAX)).round() as i16
}
