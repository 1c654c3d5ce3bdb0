use rayon::prelude::*;

use crate::{
    AudioSignal,
    GetSampleRate,
    modem::sstv::{
        PORCH_TONE,
        SYNC_TONE,
        image::{
            FrameBuffer,
            ScanLine,
        },
        modes::ModeSpecification,
        tone::{
            Segment,
            channel_frequency,
        },
        vis::header_segments,
    },
    source::{
        SynthesisError,
        synthesize_into,
    },
};

#[derive(Clone, Copy, Debug, thiserror::Error)]
pub enum EncodeError {
    #[error(
        "image is {width}x{height}, but {mode} needs {expected_width}x{expected_height}"
    )]
    ImageDimension {
        width: usize,
        height: usize,
        expected_width: usize,
        expected_height: usize,
        mode: &'static str,
    },
    #[error("synthesis error")]
    Synthesis(#[from] SynthesisError),
}

/// Segments of one scan line: sync, porch, and each channel followed by a
/// separator.
pub fn scan_line_segments(mode: &ModeSpecification, line: &ScanLine) -> Vec<Segment> {
    let mut segments = Vec::with_capacity(2 + 3 * (mode.pixels_per_line + 1));
    segments.push(Segment::new(SYNC_TONE, mode.sync_time));
    segments.push(Segment::new(PORCH_TONE, mode.porch_time));
    for channel in mode.channel_order {
        segments.extend(
            line.channel(channel)
                .iter()
                .map(|&value| Segment::new(channel_frequency(value), mode.pixel_time)),
        );
        segments.push(Segment::new(PORCH_TONE, mode.sep_time));
    }
    segments
}

/// Synthesizes consecutive segments without phase jumps.
///
/// Segment boundaries are placed at the sample closest to the accumulated
/// segment time, so the length of the output never drifts more than half a
/// sample from the total duration.
pub fn synthesize_segments<'a>(
    segments: impl IntoIterator<Item = &'a Segment>,
    sample_rate: f32,
) -> Result<Vec<f32>, SynthesisError> {
    let mut samples = Vec::new();
    let mut elapsed = 0.0;
    let mut phase = 0.0;

    for segment in segments {
        if !(segment.duration.is_finite() && segment.duration >= 0.0) {
            return Err(SynthesisError::InvalidSegment {
                frequency: segment.frequency,
                duration: segment.duration,
            });
        }
        elapsed += f64::from(segment.duration);
        let end = (elapsed * f64::from(sample_rate)).round() as usize;
        phase = synthesize_into(
            segment.frequency,
            end.saturating_sub(samples.len()),
            sample_rate,
            phase,
            &mut samples,
        )?;
    }

    Ok(samples)
}

#[derive(Clone, Copy, Debug)]
pub struct SstvEncoder {
    mode: ModeSpecification,
    sample_rate: f32,
}

impl Default for SstvEncoder {
    fn default() -> Self {
        Self::new(ModeSpecification::M1, 44100.0)
    }
}

impl SstvEncoder {
    pub fn new(mode: ModeSpecification, sample_rate: f32) -> Self {
        Self { mode, sample_rate }
    }

    #[inline]
    pub fn mode(&self) -> &ModeSpecification {
        &self.mode
    }

    /// All segments of a transmission: the header followed by every line.
    pub fn segments<F>(&self, frame_buffer: &F) -> Result<Vec<Segment>, EncodeError>
    where
        F: FrameBuffer + Sync,
    {
        let (width, height) = (frame_buffer.width(), frame_buffer.height());
        if (width, height) != (self.mode.pixels_per_line, self.mode.num_lines) {
            return Err(EncodeError::ImageDimension {
                width,
                height,
                expected_width: self.mode.pixels_per_line,
                expected_height: self.mode.num_lines,
                mode: self.mode.name,
            });
        }

        let lines = (0..height)
            .into_par_iter()
            .map(|y| scan_line_segments(&self.mode, &ScanLine::from_frame_buffer(frame_buffer, y)))
            .collect::<Vec<_>>();

        let mut segments = header_segments(self.mode.vis_code);
        segments.extend(lines.into_iter().flatten());
        Ok(segments)
    }

    pub fn encode<F>(&self, frame_buffer: &F) -> Result<AudioSignal, EncodeError>
    where
        F: FrameBuffer + Sync,
    {
        let segments = self.segments(frame_buffer)?;
        let samples = synthesize_segments(&segments, self.sample_rate)?;

        tracing::debug!(
            mode = self.mode.name,
            sample_rate = self.sample_rate,
            num_segments = segments.len(),
            num_samples = samples.len(),
            "encoded image"
        );

        Ok(AudioSignal::from_f32(&samples, self.sample_rate))
    }
}

impl GetSampleRate for SstvEncoder {
    #[inline]
    fn sample_rate(&self) -> f32 {
        self.sample_rate
    }
}
