#[inline(always)]
pub fn lerp(t: f32, a: f32, b: f32) -> f32 {
    (1.0 - t) * a + t * b
}

#[inline(always)]
pub fn unlerp(x: f32, a: f32, b: f32) -> f32 {
    (x - a) / (b - a)
}

/// Converts a duration in seconds into a (fractional) number of samples.
#[inline(always)]
pub fn seconds_to_samples(seconds: f32, sample_rate: f32) -> f64 {
    f64::from(seconds) * f64::from(sample_rate)
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use crate::util::{
        lerp,
        seconds_to_samples,
        unlerp,
    };

    #[test]
    fn unlerp_inverts_lerp() {
        for i in 0..=10 {
            let t = i as f32 / 10.0;
            assert_abs_diff_eq!(unlerp(lerp(t, 1500.0, 2300.0), 1500.0, 2300.0), t, epsilon = 1e-6);
        }
    }

    #[test]
    fn pixel_time_in_samples() {
        assert_abs_diff_eq!(seconds_to_samples(0.4576e-3, 44100.0), 20.18016, epsilon = 1e-4);
    }
}
