//! Mode specifications
//!
//! Timings from [here][1]. [Vis codes][2]
//!
//! [1]: https://github.com/windytan/slowrx/blob/master/modespec.c
//! [2]: https://web.archive.org/web/20050306193820/http://www.tima.com/~djones/vis.txt

use crate::modem::sstv::image::Channel;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct VisCode(u8);

impl VisCode {
    #[inline]
    pub const fn new(value: u8) -> Option<Self> {
        if value & 0x80 == 0 {
            Some(Self(value))
        }
        else {
            None
        }
    }

    #[inline]
    pub const fn new_unchecked(value: u8) -> Self {
        Self(value)
    }

    /// Assembles a code from its 7 data bits, least significant first.
    pub fn from_bits(bits: [bool; 7]) -> Self {
        Self(
            bits.iter()
                .enumerate()
                .fold(0, |code, (i, &bit)| code | (u8::from(bit) << i)),
        )
    }

    #[inline]
    pub fn get(&self) -> u8 {
        self.0
    }

    #[inline]
    pub fn get_bit(&self, bit: u8) -> bool {
        assert!(bit < 7);
        (self.0 >> bit) & 1 != 0
    }

    /// Even parity bit: the XOR of the 7 data bits.
    #[inline]
    pub fn parity(&self) -> bool {
        self.0.count_ones() % 2 == 1
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ModeSpecification {
    pub name: &'static str,
    pub sync_time: f32,
    pub porch_time: f32,
    /// Separator after each channel scan, including the last one.
    pub sep_time: f32,
    pub pixel_time: f32,
    pub pixels_per_line: usize,
    pub num_lines: usize,
    /// Transmission order of the color channels.
    pub channel_order: [Channel; 3],
    pub vis_code: VisCode,
}

impl ModeSpecification {
    // N7CXI, 2000
    pub const M1: Self = Self {
        name: "Martin M1",
        sync_time: 4.862e-3,
        porch_time: 0.572e-3,
        sep_time: 0.572e-3,
        pixel_time: 0.4576e-3,
        pixels_per_line: 320,
        num_lines: 256,
        channel_order: [Channel::Green, Channel::Blue, Channel::Red],
        vis_code: VisCode(0x2c),
    };

    #[inline]
    pub fn scan_time(&self) -> f32 {
        self.pixel_time * self.pixels_per_line as f32
    }

    /// Sync, porch and three scans, each followed by a separator.
    #[inline]
    pub fn line_time(&self) -> f32 {
        self.sync_time + self.porch_time + 3.0 * (self.scan_time() + self.sep_time)
    }

    /// Offset of the start of the channel scan at `index` from the end of the
    /// sync pulse.
    #[inline]
    pub fn channel_offset(&self, index: usize) -> f32 {
        self.porch_time + index as f32 * (self.scan_time() + self.sep_time)
    }
}

/// Names of the VIS codes in common use, for diagnostics.
pub const KNOWN_VIS_CODES: &[(u8, &str)] = &[
    (0x02, "Robot 8 B/W"),
    (0x04, "Robot 24"),
    (0x06, "Robot 12 B/W"),
    (0x08, "Robot 36"),
    (0x0a, "Robot 24 B/W"),
    (0x0c, "Robot 72"),
    (0x20, "Martin M4"),
    (0x24, "Martin M3"),
    (0x28, "Martin M2"),
    (0x2c, "Martin M1"),
    (0x37, "Wraase SC-2 180"),
    (0x38, "Scottie S2"),
    (0x3c, "Scottie S1"),
    (0x3f, "Wraase SC-2 120"),
    (0x4c, "Scottie DX"),
    (0x5d, "PD-50"),
    (0x5e, "PD-290"),
    (0x5f, "PD-120"),
    (0x60, "PD-180"),
    (0x61, "PD-240"),
    (0x62, "PD-160"),
    (0x63, "PD-90"),
    (0x71, "Pasokon P3"),
    (0x72, "Pasokon P5"),
    (0x73, "Pasokon P7"),
];

pub fn mode_name(vis_code: VisCode) -> Option<&'static str> {
    KNOWN_VIS_CODES
        .iter()
        .find(|(code, _)| *code == vis_code.get())
        .map(|(_, name)| *name)
}

const BUILTIN_MODES: &[ModeSpecification] = &[ModeSpecification::M1];

pub fn builtin_mode_specification(vis_code: VisCode) -> Option<&'static ModeSpecification> {
    BUILTIN_MODES.iter().find(|mode| mode.vis_code == vis_code)
}

#[derive(Clone, Copy, Debug, thiserror::Error)]
#[error("mode select error")]
pub enum ModeSelectError {
    UnknownMode { vis_code: VisCode },
}

pub trait SelectMode {
    fn mode_specification(&self, vis_code: VisCode) -> Result<ModeSpecification, ModeSelectError>;
}

impl<T> SelectMode for &T
where
    T: SelectMode,
{
    #[inline]
    fn mode_specification(&self, vis_code: VisCode) -> Result<ModeSpecification, ModeSelectError> {
        (&**self).mode_specification(vis_code)
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultModes;

impl SelectMode for DefaultModes {
    fn mode_specification(&self, vis_code: VisCode) -> Result<ModeSpecification, ModeSelectError> {
        builtin_mode_specification(vis_code)
            .copied()
            .ok_or(ModeSelectError::UnknownMode { vis_code })
    }
}

impl SelectMode for ModeSpecification {
    fn mode_specification(&self, vis_code: VisCode) -> Result<ModeSpecification, ModeSelectError> {
        if vis_code == self.vis_code {
            Ok(*self)
        }
        else {
            Err(ModeSelectError::UnknownMode { vis_code })
        }
    }
}
