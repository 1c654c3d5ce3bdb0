//! Vertical interval signaling: the header naming the mode of a transmission.
//!
//! The header is a 1900 Hz leader, a short 1200 Hz break, a second leader,
//! and then ten 30 ms slots: a 1200 Hz start bit, 7 data bits least
//! significant first, an even parity bit and a 1200 Hz stop bit.

use crate::{
    modem::sstv::{
        LEADER_BREAK_TIME,
        LEADER_TIME,
        LEADER_TONE,
        SYNC_TONE,
        TONE_TOLERANCE,
        VIS_BIT_TIME,
        VIS_HIGH_TONE,
        VIS_LOW_TONE,
        VIS_NUM_BITS,
        is_tone,
        modes::VisCode,
        tone::Segment,
        tracker::{
            EdgeDetect,
            FrequencyTracker,
            TrackerError,
        },
    },
    util::seconds_to_samples,
};

/// Duration of the complete header.
pub const HEADER_TIME: f32 =
    2.0 * LEADER_TIME + LEADER_BREAK_TIME + VIS_NUM_BITS as f32 * VIS_BIT_TIME;

/// Step of the coarse tone classification while searching for the header.
const HOP_TIME: f32 = 0.005;

/// Hops of sync tone needed to accept a start bit.
const START_BIT_HOPS: usize = 5;

/// Hops before the start bit that are checked for the leader, and how many of
/// them have to be leader tone.
const LEADER_LOOKBACK_HOPS: usize = 130;
const LEADER_MIN_HOPS: usize = 40;

/// Share of each bit slot at either end that isn't used for decoding.
const BIT_GUARD: f64 = 0.1;

#[derive(Clone, Copy, Debug, thiserror::Error)]
pub enum VisError {
    #[error("no vis header found")]
    NotFound,
    #[error("invalid start bit: {frequency} Hz")]
    InvalidStartBit { frequency: f32 },
    #[error("invalid stop bit: {frequency} Hz")]
    InvalidStopBit { frequency: f32 },
    #[error("vis bit {bit} has invalid tone: {frequency} Hz")]
    InvalidBit { bit: usize, frequency: f32 },
    #[error("parity error: vis code {vis_code:?}, parity bit {parity}")]
    Parity { vis_code: VisCode, parity: bool },
    #[error("tracker error")]
    Tracker(#[from] TrackerError),
}

#[inline]
fn bit_tone(bit: bool) -> f32 {
    if bit { VIS_HIGH_TONE } else { VIS_LOW_TONE }
}

/// Leader, break and the ten bit slots announcing `vis_code`.
pub fn header_segments(vis_code: VisCode) -> Vec<Segment> {
    let mut segments = Vec::with_capacity(4 + VIS_NUM_BITS);
    segments.push(Segment::new(LEADER_TONE, LEADER_TIME));
    segments.push(Segment::new(SYNC_TONE, LEADER_BREAK_TIME));
    segments.push(Segment::new(LEADER_TONE, LEADER_TIME));
    segments.push(Segment::new(SYNC_TONE, VIS_BIT_TIME));
    for bit in 0..7 {
        segments.push(Segment::new(bit_tone(vis_code.get_bit(bit)), VIS_BIT_TIME));
    }
    segments.push(Segment::new(bit_tone(vis_code.parity()), VIS_BIT_TIME));
    segments.push(Segment::new(SYNC_TONE, VIS_BIT_TIME));
    segments
}

/// Decodes the ten bit slots of a header. `window` starts at the start bit.
pub fn decode_vis<T>(
    window: &[f32],
    sample_rate: f32,
    tolerance: f32,
    tracker: T,
) -> Result<VisCode, VisError>
where
    T: FrequencyTracker,
{
    let bit_len = seconds_to_samples(VIS_BIT_TIME, sample_rate);
    if (window.len() as f64) < VIS_NUM_BITS as f64 * bit_len {
        return Err(VisError::NotFound);
    }

    let slot_frequency = |slot: usize| {
        let start = ((slot as f64 + BIT_GUARD) * bit_len).round() as usize;
        let end = ((slot as f64 + 1.0 - BIT_GUARD) * bit_len).round() as usize;
        tracker.estimate(&window[start..end], sample_rate)
    };

    let frequency = slot_frequency(0)?;
    if !is_tone(frequency, SYNC_TONE, tolerance) {
        return Err(VisError::InvalidStartBit { frequency });
    }

    let mut bits = [false; 8];
    for (bit, value) in bits.iter_mut().enumerate() {
        let frequency = slot_frequency(bit + 1)?;
        *value = if is_tone(frequency, VIS_HIGH_TONE, tolerance) {
            true
        }
        else if is_tone(frequency, VIS_LOW_TONE, tolerance) {
            false
        }
        else {
            return Err(VisError::InvalidBit { bit, frequency });
        };
    }

    let frequency = slot_frequency(VIS_NUM_BITS - 1)?;
    if !is_tone(frequency, SYNC_TONE, tolerance) {
        return Err(VisError::InvalidStopBit { frequency });
    }

    let [b0, b1, b2, b3, b4, b5, b6, parity] = bits;
    let vis_code = VisCode::from_bits([b0, b1, b2, b3, b4, b5, b6]);
    if vis_code.parity() != parity {
        return Err(VisError::Parity { vis_code, parity });
    }

    Ok(vis_code)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum HopTone {
    Leader,
    Sync,
    Other,
}

/// Searches the first `search_span` seconds of `samples` for a header and
/// returns the sample index at which its start bit begins.
pub fn locate_header<T>(
    samples: &[f32],
    sample_rate: f32,
    search_span: f32,
    tracker: T,
) -> Option<usize>
where
    T: FrequencyTracker,
{
    let hop_len = (seconds_to_samples(HOP_TIME, sample_rate) as usize).max(1);
    let span = (seconds_to_samples(search_span + HEADER_TIME, sample_rate) as usize)
        .min(samples.len());

    let hops = samples[..span]
        .chunks_exact(hop_len)
        .map(|hop| {
            match tracker.estimate(hop, sample_rate) {
                Ok(frequency) if is_tone(frequency, LEADER_TONE, TONE_TOLERANCE) => HopTone::Leader,
                Ok(frequency) if is_tone(frequency, SYNC_TONE, TONE_TOLERANCE) => HopTone::Sync,
                _ => HopTone::Other,
            }
        })
        .collect::<Vec<_>>();

    let start_hop = (2..hops.len().saturating_sub(START_BIT_HOPS - 1)).find(|&j| {
        hops[j..j + START_BIT_HOPS]
            .iter()
            .all(|hop| *hop == HopTone::Sync)
            && (hops[j - 1] == HopTone::Leader || hops[j - 2] == HopTone::Leader)
            && hops[j.saturating_sub(LEADER_LOOKBACK_HOPS)..j]
                .iter()
                .filter(|hop| **hop == HopTone::Leader)
                .count()
                >= LEADER_MIN_HOPS
    })?;

    let edge_detect = EdgeDetect {
        samples,
        sample_rate,
        tracker: &tracker,
        before_tone: LEADER_TONE,
        after_tone: SYNC_TONE,
        before_len: hop_len,
        after_len: hop_len,
    };
    let range = (start_hop - 2) * hop_len..(start_hop + 1) * hop_len;
    let start_bit = edge_detect
        .search(range, 8)
        .map_or(start_hop * hop_len, |(edge, _)| edge);

    tracing::debug!(start_hop, start_bit, "located vis start bit");

    Some(start_bit)
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DecodedHeader {
    pub vis_code: VisCode,
    /// Sample index of the start of the start bit.
    pub start_bit: usize,
    /// Sample position of the end of the stop bit.
    pub end: f64,
}

/// Locates and decodes the header.
pub fn decode_header<T>(
    samples: &[f32],
    sample_rate: f32,
    tolerance: f32,
    search_span: f32,
    tracker: T,
) -> Result<DecodedHeader, VisError>
where
    T: FrequencyTracker,
{
    let start_bit =
        locate_header(samples, sample_rate, search_span, &tracker).ok_or(VisError::NotFound)?;
    let vis_code = decode_vis(&samples[start_bit..], sample_rate, tolerance, &tracker)?;
    let end =
        start_bit as f64 + VIS_NUM_BITS as f64 * seconds_to_samples(VIS_BIT_TIME, sample_rate);

    tracing::debug!(?vis_code, start_bit, end, "decoded vis header");

    Ok(DecodedHeader {
        vis_code,
        start_bit,
        end,
    })
}
