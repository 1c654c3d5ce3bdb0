use std::f64::consts::TAU;

use num_complex::Complex;

/// Single-bin DFT evaluated with the Goertzel recursion.
///
/// Unlike an FFT bin, the probed frequency doesn't have to be a multiple of
/// `sample_rate / N`, which is what makes it usable as a frequency estimator.
#[derive(Clone, Copy, Debug)]
pub struct GoertzelFilter {
    omega: f64,
    coefficient: f64,
}

impl GoertzelFilter {
    pub fn new(sample_rate: f64, frequency: f64) -> Self {
        let omega = TAU * frequency / sample_rate;
        Self {
            omega,
            coefficient: 2.0 * omega.cos(),
        }
    }

    /// Angular frequency in radians per sample.
    #[inline]
    pub fn omega(&self) -> f64 {
        self.omega
    }

    /// Correlation of `samples` with `exp(-i omega m)`, where `m` is measured
    /// from the centre of the window.
    pub fn response(&self, samples: &[f32]) -> Complex<f64> {
        let mut s1 = 0.0;
        let mut s2 = 0.0;
        for &sample in samples {
            let s = f64::from(sample) + self.coefficient * s1 - s2;
            s2 = s1;
            s1 = s;
        }

        let (sin, cos) = self.omega.sin_cos();
        let y = Complex::new(s1 - s2 * cos, s2 * sin);

        let n = samples.len() as f64;
        y * Complex::from_polar(1.0, -self.omega * (n - 1.0) / 2.0)
    }

    /// Energy of the best least-squares fit of a sinusoid at this frequency to
    /// `samples`.
    ///
    /// This removes the bias a plain `|response|^2` has from the image at
    /// `-omega`, which matters for short windows.
    pub fn tone_power(&self, samples: &[f32]) -> f64 {
        let response = self.response(samples);
        let n = samples.len() as f64;

        let sin = self.omega.sin();
        let dirichlet = if sin.abs() < 1e-12 {
            if self.omega.cos() > 0.0 || samples.len() % 2 == 1 {
                n
            }
            else {
                -n
            }
        }
        else {
            (n * self.omega).sin() / sin
        };

        let cc = (n + dirichlet) / 2.0;
        let ss = (n - dirichlet) / 2.0;

        let mut power = 0.0;
        if cc > 1e-9 {
            power += response.re * response.re / cc;
        }
        if ss > 1e-9 {
            power += response.im * response.im / ss;
        }
        power
    }
}
