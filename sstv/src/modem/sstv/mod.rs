//! # References
//!
//! - <http://lionel.cordesses.free.fr/gpages/sstv.html>
//! - <https://web.archive.org/web/20120505141047/http://www.cs.helsinki.fi/u/okraisan/slowrx/>
//! - <http://www.barberdsp.com/downloads/Dayton%20Paper.pdf>
//! - <https://web.archive.org/web/20120313215600/http://lionel.cordesses.free.fr/gpages/Cordesses.pdf>

mod decoder;
mod encoder;
pub mod image;
pub mod modes;
pub mod state;
pub mod timing;
pub mod tone;
pub mod tracker;
pub mod vis;

pub use decoder::{
    DecodeError,
    DecodedImage,
    DecodedLine,
    DecoderConfig,
    LineError,
    ScanLineDecoder,
    SstvDecoder,
};
pub use encoder::{
    EncodeError,
    SstvEncoder,
    scan_line_segments,
    synthesize_segments,
};

pub const LEADER_TONE: f32 = 1900.0;
pub const LEADER_TIME: f32 = 0.300;

pub const LEADER_BREAK_TIME: f32 = 0.010;

pub const VIS_BIT_TIME: f32 = 0.030;
pub const VIS_LOW_TONE: f32 = 1300.0;
pub const VIS_HIGH_TONE: f32 = 1100.0;

/// Number of 30 ms slots after the leader: start bit, 7 data bits, parity and
/// stop bit.
pub const VIS_NUM_BITS: usize = 10;

// sync, leader break, vis start/stop
pub const SYNC_TONE: f32 = 1200.0;

pub const PORCH_TONE: f32 = 1500.0;

pub const CHANNEL_LOW_TONE: f32 = 1500.0;
pub const CHANNEL_HIGH_TONE: f32 = 2300.0;

/// Tolerance used to classify tones while searching for the header.
pub const TONE_TOLERANCE: f32 = 50.0;

#[inline]
pub fn is_tone(frequency: f32, tone: f32, tolerance: f32) -> bool {
    (frequency - tone).abs() <= tolerance
}
