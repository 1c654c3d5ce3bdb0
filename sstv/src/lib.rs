//! Slow-scan television codec for the Martin M1 scan format.
//!
//! [`modem::sstv::SstvEncoder`] turns a 320x256 RGB image into a mono PCM
//! signal, [`modem::sstv::SstvDecoder`] recovers the image from such a signal.
//! WAV files are read and written with [`source::file`] and [`sink::file`].

pub mod filter;
pub mod modem;
pub mod signal;
pub mod sink;
pub mod source;
pub mod spectrum;
pub mod util;

pub use crate::signal::AudioSignal;

pub trait GetSampleRate {
    fn sample_rate(&self) -> f32;
}

impl<T: GetSampleRate> GetSampleRate for &T {
    #[inline]
    fn sample_rate(&self) -> f32 {
        (&**self).sample_rate()
    }
}

impl<T: GetSampleRate> GetSampleRate for &mut T {
    #[inline]
    fn sample_rate(&self) -> f32 {
        (&**self).sample_rate()
    }
}
