use std::{
    fs::File,
    io::{
        BufReader,
        Read,
    },
    path::Path,
};

use crate::{
    AudioSignal,
    GetSampleRate,
};

#[derive(Debug, thiserror::Error)]
#[error("wav source error")]
pub enum Error {
    Hound(#[from] hound::Error),
    UnsupportedFormat {
        sample_format: hound::SampleFormat,
        bits_per_sample: u16,
    },
    NoChannels,
}

/// Reads a WAV file into an [`AudioSignal`].
///
/// Integer (8 to 32 bits) and 32-bit float files are accepted. Files with more
/// than one channel are mixed down to mono.
#[derive(derive_more::Debug)]
pub struct WavSource<R> {
    #[debug(skip)]
    inner: hound::WavReader<R>,
    spec: hound::WavSpec,
}

impl<R> WavSource<R>
where
    R: Read,
{
    pub fn new(inner: hound::WavReader<R>) -> Result<Self, Error> {
        let spec = inner.spec();
        check_spec(&spec)?;
        Ok(Self { inner, spec })
    }

    #[inline]
    pub fn from_reader(reader: R) -> Result<Self, Error> {
        Self::new(hound::WavReader::new(reader)?)
    }

    #[inline]
    pub fn spec(&self) -> hound::WavSpec {
        self.spec
    }

    pub fn read_signal(mut self) -> Result<AudioSignal, Error> {
        let interleaved = match self.spec.sample_format {
            hound::SampleFormat::Int => {
                // full scale maps to 1.0, so 16-bit files read back unchanged
                let scale = 1.0 / ((1u64 << (self.spec.bits_per_sample - 1)) - 1) as f32;
                self.inner
                    .samples::<i32>()
                    .map(|sample| sample.map(|sample| sample as f32 * scale))
                    .collect::<Result<Vec<f32>, _>>()?
            }
            hound::SampleFormat::Float => {
                self.inner
                    .samples::<f32>()
                    .collect::<Result<Vec<f32>, _>>()?
            }
        };

        let channels = usize::from(self.spec.channels);
        let mono = if channels == 1 {
            interleaved
        }
        else {
            interleaved
                .chunks_exact(channels)
                .map(|frame| frame.iter().sum::<f32>() / channels as f32)
                .collect()
        };

        tracing::debug!(
            sample_rate = self.spec.sample_rate,
            channels,
            bits_per_sample = self.spec.bits_per_sample,
            num_samples = mono.len(),
            "read wav"
        );

        Ok(AudioSignal::from_f32(&mono, self.sample_rate()))
    }
}

impl WavSource<BufReader<File>> {
    #[inline]
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, Error> {
        Self::new(hound::WavReader::open(path)?)
    }
}

impl<R> GetSampleRate for WavSource<R> {
    #[inline]
    fn sample_rate(&self) -> f32 {
        self.spec.sample_rate as f32
    }
}

pub fn read_wav(path: impl AsRef<Path>) -> Result<AudioSignal, Error> {
    WavSource::from_path(path)?.read_signal()
}

fn check_spec(spec: &hound::WavSpec) -> Result<(), Error> {
    if spec.channels == 0 {
        return Err(Error::NoChannels);
    }
    match (spec.sample_format, spec.bits_per_sample) {
        (hound::SampleFormat::Int, 8..=32) | (hound::SampleFormat::Float, 32) => Ok(()),
        (sample_format, bits_per_sample) => {
            Err(Error::UnsupportedFormat {
                sample_format,
                bits_per_sample,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use crate::{
        GetSampleRate,
        source::file::WavSource,
    };

    fn stereo_wav() -> Vec<u8> {
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 22050,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut buffer = Cursor::new(Vec::new());
        let mut writer = hound::WavWriter::new(&mut buffer, spec).unwrap();
        for (left, right) in [(1000i16, 3000i16), (-2000, 0), (32767, 32767)] {
            writer.write_sample(left).unwrap();
            writer.write_sample(right).unwrap();
        }
        writer.finalize().unwrap();
        buffer.into_inner()
    }

    #[test]
    fn stereo_is_mixed_to_mono() {
        let source = WavSource::from_reader(Cursor::new(stereo_wav())).unwrap();
        assert_eq!(source.sample_rate(), 22050.0);

        let signal = source.read_signal().unwrap();
        assert_eq!(signal.len(), 3);
        assert!((signal.samples()[0] - 2000).abs() <= 1);
        assert!((signal.samples()[1] + 1000).abs() <= 1);
        assert!(signal.samples()[2] >= 32766);
    }
}
