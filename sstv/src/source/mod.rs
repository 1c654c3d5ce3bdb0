pub mod file;
pub mod noise;
pub mod sine;

pub use self::{
    noise::{
        Noise,
        add_white_noise,
        white_noise,
    },
    sine::{
        AMPLITUDE,
        SineWave,
        SynthesisError,
        Tone,
        synthesize,
        synthesize_into,
    },
};

pub trait SignalGenerator {
    type Sample;

    fn next(&mut self) -> Self::Sample;
}

impl<T> SignalGenerator for &mut T
where
    T: SignalGenerator + ?Sized,
{
    type Sample = T::Sample;

    #[inline]
    fn next(&mut self) -> Self::Sample {
        (&mut **self).next()
    }
}
