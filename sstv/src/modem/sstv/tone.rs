use crate::{
    modem::sstv::{
        CHANNEL_HIGH_TONE,
        CHANNEL_LOW_TONE,
    },
    util::{
        lerp,
        unlerp,
    },
};

/// A constant tone: the unit the synthesizer works in.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Segment {
    pub frequency: f32,
    pub duration: f32,
}

impl Segment {
    #[inline]
    pub const fn new(frequency: f32, duration: f32) -> Self {
        Self {
            frequency,
            duration,
        }
    }
}

/// Carrier frequency for a channel value. 0 maps to 1500 Hz, 255 to 2300 Hz.
#[inline]
pub fn channel_frequency(value: u8) -> f32 {
    lerp(f32::from(value) / 255.0, CHANNEL_LOW_TONE, CHANNEL_HIGH_TONE)
}

/// Inverse of [`channel_frequency`]. Frequencies outside the channel band are
/// clamped.
#[inline]
pub fn channel_value(frequency: f32) -> u8 {
    let value = (unlerp(frequency, CHANNEL_LOW_TONE, CHANNEL_HIGH_TONE) * 255.0).round();
    if value.is_nan() {
        0
    }
    else {
        value.clamp(0.0, 255.0) as u8
    }
}

#[cfg(test)]
mod tests {
    use crate::modem::sstv::tone::{
        channel_frequency,
        channel_value,
    };

    #[test]
    fn map_is_strictly_monotonic() {
        for value in 0..255u8 {
            assert!(channel_frequency(value) < channel_frequency(value + 1));
        }
        assert_eq!(channel_frequency(0), 1500.0);
        assert_eq!(channel_frequency(255), 2300.0);
    }

    #[test]
    fn map_inverts_exactly() {
        for value in 0..=255u8 {
            assert_eq!(channel_value(channel_frequency(value)), value);
        }
    }

    #[test]
    fn out_of_band_is_clamped() {
        assert_eq!(channel_value(1200.0), 0);
        assert_eq!(channel_value(2500.0), 255);
        assert_eq!(channel_value(f32::NAN), 0);
    }
}
