use std::{
    fs::File,
    io::{
        BufWriter,
        Seek,
        Write,
    },
    path::Path,
};

use crate::{
    AudioSignal,
    GetSampleRate,
};

#[derive(Debug, thiserror::Error)]
#[error("wav sink error")]
pub enum Error {
    Hound(#[from] hound::Error),
    Closed,
}

/// Writes signals as 16-bit mono WAV.
#[derive(derive_more::Debug)]
pub struct WavSink<W>
where
    W: Write + Seek,
{
    #[debug(skip)]
    inner: Option<hound::WavWriter<W>>,
}

#[inline]
fn spec(sample_rate: f32) -> hound::WavSpec {
    hound::WavSpec {
        channels: 1,
        sample_rate: sample_rate.round() as u32,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    }
}

impl<W> WavSink<W>
where
    W: Write + Seek,
{
    #[inline]
    pub fn new(inner: hound::WavWriter<W>) -> Self {
        Self { inner: Some(inner) }
    }

    #[inline]
    pub fn from_writer(writer: W, sample_rate: f32) -> Result<Self, Error> {
        Ok(Self::new(hound::WavWriter::new(writer, spec(sample_rate))?))
    }

    #[inline]
    fn writer_mut(&mut self) -> Result<&mut hound::WavWriter<W>, Error> {
        self.inner.as_mut().ok_or(Error::Closed)
    }

    pub fn write_samples(&mut self, samples: &[i16]) -> Result<(), Error> {
        let writer = self.writer_mut()?;
        let mut writer = writer.get_i16_writer(samples.len() as u32);
        for &sample in samples {
            writer.write_sample(sample);
        }
        writer.flush()?;
        Ok(())
    }

    pub fn finalize(&mut self) -> Result<(), Error> {
        if let Some(writer) = self.inner.take() {
            writer.finalize()?;
        }
        Ok(())
    }
}

impl WavSink<BufWriter<File>> {
    #[inline]
    pub fn from_path(path: impl AsRef<Path>, sample_rate: f32) -> Result<Self, Error> {
        Ok(Self::new(hound::WavWriter::create(path, spec(sample_rate))?))
    }
}

pub fn write_wav(path: impl AsRef<Path>, signal: &AudioSignal) -> Result<(), Error> {
    let mut sink = WavSink::from_path(path, signal.sample_rate())?;
    sink.write_samples(signal.samples())?;
    sink.finalize()?;
    tracing::debug!(num_samples = signal.len(), "wrote wav");
    Ok(())
}
