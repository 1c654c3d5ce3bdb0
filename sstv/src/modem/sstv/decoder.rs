use image::{
    RgbImage,
    imageops,
};

use crate::{
    AudioSignal,
    GetSampleRate,
    modem::sstv::{
        PORCH_TONE,
        SYNC_TONE,
        image::ScanLine,
        modes::{
            DefaultModes,
            ModeSpecification,
            SelectMode,
            VisCode,
            mode_name,
        },
        state::{
            DecoderEvent,
            DecoderState,
        },
        timing::LineClock,
        tone::channel_value,
        tracker::{
            EdgeDetect,
            FrequencyTracker,
            GoertzelTracker,
        },
        vis::{
            VisError,
            decode_header,
        },
    },
    util::seconds_to_samples,
};

#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct DecoderConfig {
    /// Maximum deviation of a VIS bit tone, in Hz.
    pub tone_tolerance: f32,
    /// Seconds at the start of the signal in which the header may begin.
    pub header_search: f32,
    /// Seconds before and after the expected end of a sync pulse that are
    /// searched for it.
    pub sync_search: f32,
    /// Highest edge score, in Hz, that is accepted as a sync pulse.
    pub sync_threshold: f32,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            tone_tolerance: 10.0,
            header_search: 5.0,
            sync_search: 1.5e-3,
            sync_threshold: 60.0,
        }
    }
}

#[derive(Clone, Copy, Debug, thiserror::Error)]
pub enum LineError {
    #[error("end of stream")]
    EndOfStream,
}

#[derive(Clone, Debug)]
pub struct DecodedLine {
    pub line: ScanLine,
    /// Sample index of the end of the sync pulse.
    pub sync_end: f64,
    /// Measured minus expected end of the sync pulse, in samples.
    pub correction: f64,
    /// Samples from the start of this line to the start of the next.
    pub consumed: usize,
    /// Where the next line is expected to start.
    pub next_line_start: f64,
    /// `false` if no sync pulse was found and the expected position was used.
    pub sync_found: bool,
}

/// Decodes single scan lines of a signal.
#[derive(Clone, Copy, Debug)]
pub struct ScanLineDecoder<'a, T> {
    samples: &'a [f32],
    sample_rate: f32,
    mode: ModeSpecification,
    config: DecoderConfig,
    tracker: T,
}

impl<'a, T> ScanLineDecoder<'a, T>
where
    T: FrequencyTracker,
{
    pub fn new(
        samples: &'a [f32],
        sample_rate: f32,
        mode: ModeSpecification,
        config: DecoderConfig,
        tracker: T,
    ) -> Self {
        Self {
            samples,
            sample_rate,
            mode,
            config,
            tracker,
        }
    }

    #[inline]
    fn samples(&self, seconds: f32) -> f64 {
        seconds_to_samples(seconds, self.sample_rate)
    }

    /// End of the sync pulse near `expected`, if one scores below the sync
    /// threshold.
    pub fn find_sync(&self, expected: f64) -> Option<usize> {
        let min_len = self.tracker.min_window_len(self.sample_rate);
        let search = self.samples(self.config.sync_search);

        let edge_detect = EdgeDetect {
            samples: self.samples,
            sample_rate: self.sample_rate,
            tracker: &self.tracker,
            before_tone: SYNC_TONE,
            after_tone: PORCH_TONE,
            before_len: ((self.samples(self.mode.sync_time) / 2.0) as usize).max(min_len),
            after_len: (self.samples(self.mode.porch_time) as usize).max(min_len),
        };

        let start = (expected - search).round().max(0.0) as usize;
        let end = (expected + search).round().max(0.0) as usize + 1;

        match edge_detect.search(start..end, 4) {
            Some((edge, score)) if score <= self.config.sync_threshold => Some(edge),
            best => {
                tracing::debug!(expected, ?best, "no sync pulse");
                None
            }
        }
    }

    /// Follows the sync pulses of up to `num_lines` lines, the first of which
    /// starts at `line_start`.
    ///
    /// Each pulse is searched for one line length after the previous one, and
    /// the line length is updated from consecutive pulses, so a slowly
    /// drifting clock is followed. Lines whose search window would run past
    /// the end of the signal aren't included.
    pub fn track_syncs(&self, mut line_start: f64, num_lines: usize) -> Vec<Option<usize>> {
        let sync = self.samples(self.mode.sync_time);
        let nominal = self.samples(self.mode.line_time());
        let search = self.samples(self.config.sync_search);

        let mut line_len = nominal;
        let mut previous: Option<usize> = None;
        let mut syncs = Vec::with_capacity(num_lines);

        for _ in 0..num_lines {
            let expected = line_start + sync;
            if expected + search >= self.samples.len() as f64 {
                break;
            }

            let found = self.find_sync(expected);
            if let (Some(sync_end), Some(previous)) = (found, previous) {
                let spacing = sync_end as f64 - previous as f64;
                if (spacing - nominal).abs() <= search {
                    line_len = spacing;
                }
            }

            line_start = match found {
                Some(sync_end) => sync_end as f64 - sync + line_len,
                None => line_start + line_len,
            };
            previous = found;
            syncs.push(found);
        }

        syncs
    }

    /// Fits a [`LineClock`] to the pulses found by
    /// [`track_syncs`](Self::track_syncs).
    pub fn line_clock(&self, line_start: f64, syncs: &[Option<usize>]) -> LineClock {
        let nominal = LineClock::new(
            line_start + self.samples(self.mode.sync_time),
            self.samples(self.mode.line_time()),
        );
        let found = syncs
            .iter()
            .enumerate()
            .filter_map(|(y, sync_end)| Some((y, (*sync_end)? as f64)))
            .collect::<Vec<_>>();
        LineClock::fit(&found, nominal)
    }

    fn find_sync_end(&self, expected: f64) -> (f64, bool) {
        match self.find_sync(expected) {
            Some(sync_end) => (sync_end as f64, true),
            None => {
                tracing::warn!(expected, "no sync pulse found, using expected position");
                (expected, false)
            }
        }
    }

    /// Decodes the pixels of the line whose sync pulse ends at `sync_end`.
    /// Pixel positions are stretched so that the line is `line_len` samples
    /// long.
    pub fn decode_pixels(&self, sync_end: f64, line_len: f64) -> Result<ScanLine, LineError> {
        let scale = line_len / self.samples(self.mode.line_time());
        let pixel = self.samples(self.mode.pixel_time);

        // a sample of margin on either side of the pixel
        let window_len = (pixel as usize)
            .saturating_sub(2)
            .max(self.tracker.min_window_len(self.sample_rate));

        let mut line = ScanLine::new(self.mode.pixels_per_line);
        for (index, channel) in self.mode.channel_order.into_iter().enumerate() {
            let channel_start = sync_end + scale * self.samples(self.mode.channel_offset(index));
            let values = line.channel_mut(channel);

            for (x, value) in values.iter_mut().enumerate() {
                let centre = channel_start + scale * (x as f64 + 0.5) * pixel;
                let start = (centre - window_len as f64 / 2.0).round().max(0.0) as usize;
                let window = self
                    .samples
                    .get(start..start + window_len)
                    .ok_or(LineError::EndOfStream)?;

                *value = match self.tracker.estimate(window, self.sample_rate) {
                    Ok(frequency) => channel_value(frequency),
                    Err(error) => {
                        tracing::trace!(?error, ?channel, x, "no pixel estimate");
                        0
                    }
                };
            }
        }

        Ok(line)
    }

    /// Decodes the line starting at sample position `line_start`.
    pub fn decode_line(&self, line_start: f64) -> Result<DecodedLine, LineError> {
        let sync = self.samples(self.mode.sync_time);
        let line_len = self.samples(self.mode.line_time());
        let expected = line_start + sync;

        let (sync_end, sync_found) = self.find_sync_end(expected);
        let line = self.decode_pixels(sync_end, line_len)?;
        let next_line_start = sync_end - sync + line_len;

        Ok(DecodedLine {
            line,
            sync_end,
            correction: sync_end - expected,
            consumed: (next_line_start - line_start).round().max(0.0) as usize,
            next_line_start,
            sync_found,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("no sstv header found")]
    HeaderNotFound,
    #[error("corrupt vis header")]
    HeaderCorrupt(#[source] VisError),
    #[error("unsupported mode: vis code {vis_code:?} ({})", .name.unwrap_or("unknown"))]
    UnsupportedMode {
        vis_code: VisCode,
        name: Option<&'static str>,
    },
}

#[derive(Clone, Debug)]
pub struct DecodedImage {
    pub mode: ModeSpecification,
    /// The decoded rows. Shorter than the mode's height if the signal was
    /// truncated.
    pub image: RgbImage,
    pub lines_decoded: usize,
    pub truncated: bool,
    /// Lines for which no sync pulse was found.
    pub resync_failures: usize,
}

impl DecodedImage {
    #[inline]
    pub fn is_complete(&self) -> bool {
        !self.truncated
    }
}

/// Image being decoded, with the line timing it is decoded at.
#[derive(Debug)]
struct Frame<'a, T> {
    line_decoder: ScanLineDecoder<'a, T>,
    syncs: Vec<Option<usize>>,
    clock: LineClock,
    image: RgbImage,
}

#[derive(Clone, Debug, Default)]
pub struct SstvDecoder<M = DefaultModes, T = GoertzelTracker> {
    mode_select: M,
    config: DecoderConfig,
    tracker: T,
}

impl SstvDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: DecoderConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }
}

impl<M> SstvDecoder<M> {
    pub fn new_with_mode_select(mode_select: M, config: DecoderConfig) -> Self {
        Self {
            mode_select,
            config,
            tracker: GoertzelTracker::default(),
        }
    }
}

impl<M, T> SstvDecoder<M, T> {
    pub fn with_tracker<U>(self, tracker: U) -> SstvDecoder<M, U> {
        SstvDecoder {
            mode_select: self.mode_select,
            config: self.config,
            tracker,
        }
    }

    #[inline]
    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }
}

impl<M, T> SstvDecoder<M, T>
where
    M: SelectMode,
    T: FrequencyTracker,
{
    pub fn decode(&self, signal: &AudioSignal) -> Result<DecodedImage, DecodeError> {
        let samples = signal.to_f32();
        let sample_rate = signal.sample_rate();

        let mut state = DecoderState::default();
        let mut header_error = None;
        let mut frame: Option<Frame<'_, &T>> = None;
        let mut line_start = 0.0;
        let mut resync_failures = 0;

        while !state.is_terminal() {
            let event = match state {
                DecoderState::SearchingHeader => {
                    match decode_header(
                        &samples,
                        sample_rate,
                        self.config.tone_tolerance,
                        self.config.header_search,
                        &self.tracker,
                    ) {
                        Ok(header) => {
                            line_start = header.end;
                            DecoderEvent::HeaderDecoded {
                                vis_code: header.vis_code,
                            }
                        }
                        Err(VisError::NotFound) => DecoderEvent::HeaderMissing,
                        Err(error) => {
                            tracing::debug!(?error, "corrupt vis header");
                            header_error = Some(error);
                            DecoderEvent::HeaderMissing
                        }
                    }
                }
                DecoderState::HeaderFound { vis_code } => {
                    match self.mode_select.mode_specification(vis_code) {
                        Ok(mode) => {
                            tracing::debug!(mode = %mode.name);
                            let line_decoder = ScanLineDecoder::new(
                                &samples,
                                sample_rate,
                                mode,
                                self.config,
                                &self.tracker,
                            );
                            let syncs = line_decoder.track_syncs(line_start, mode.num_lines);
                            let clock = line_decoder.line_clock(line_start, &syncs);
                            frame = Some(Frame {
                                line_decoder,
                                syncs,
                                clock,
                                image: RgbImage::new(
                                    mode.pixels_per_line as u32,
                                    mode.num_lines as u32,
                                ),
                            });
                            DecoderEvent::ModeSelected {
                                num_lines: mode.num_lines,
                            }
                        }
                        Err(error) => {
                            tracing::debug!(?error, "mode rejected");
                            DecoderEvent::ModeRejected
                        }
                    }
                }
                DecoderState::DecodingLine { y, .. } => {
                    match &mut frame {
                        Some(frame) => {
                            let sync_end = frame.clock.sync_end(y);
                            match frame
                                .line_decoder
                                .decode_pixels(sync_end, frame.clock.line_len)
                            {
                                Ok(line) => {
                                    let measured = frame.syncs.get(y).copied().flatten();
                                    if measured.is_none() {
                                        tracing::warn!(
                                            y,
                                            sync_end,
                                            "no sync pulse found, using line clock"
                                        );
                                        resync_failures += 1;
                                    }
                                    tracing::trace!(y, sync_end, ?measured, "decoded line");
                                    line.write_to(&mut frame.image, y);
                                    DecoderEvent::LineDecoded
                                }
                                Err(LineError::EndOfStream) => DecoderEvent::EndOfStream,
                            }
                        }
                        None => DecoderEvent::EndOfStream,
                    }
                }
                DecoderState::Complete
                | DecoderState::Truncated { .. }
                | DecoderState::UnsupportedMode { .. }
                | DecoderState::HeaderNotFound => break,
            };

            state = state.next(event);
        }

        let truncated_at = match state {
            DecoderState::Complete => None,
            DecoderState::Truncated { lines } => Some(lines),
            DecoderState::UnsupportedMode { vis_code } => {
                return Err(DecodeError::UnsupportedMode {
                    vis_code,
                    name: mode_name(vis_code),
                });
            }
            _ => {
                return Err(
                    header_error.map_or(DecodeError::HeaderNotFound, DecodeError::HeaderCorrupt)
                );
            }
        };

        let Some(Frame {
            line_decoder,
            image,
            ..
        }) = frame
        else {
            return Err(DecodeError::HeaderNotFound);
        };
        let mode = line_decoder.mode;

        let truncated = truncated_at.is_some();
        let (image, lines_decoded) = match truncated_at {
            Some(lines) => {
                let cropped = imageops::crop_imm(&image, 0, 0, image.width(), lines as u32);
                (cropped.to_image(), lines)
            }
            None => (image, mode.num_lines),
        };

        tracing::debug!(lines_decoded, truncated, resync_failures, "decoded image");

        Ok(DecodedImage {
            mode,
            image,
            lines_decoded,
            truncated,
            resync_failures,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        AudioSignal,
        modem::sstv::{
            decoder::{
                DecodeError,
                DecoderConfig,
                LineError,
                ScanLineDecoder,
                SstvDecoder,
            },
            encoder::{
                scan_line_segments,
                synthesize_segments,
            },
            image::ScanLine,
            modes::ModeSpecification,
            tone::Segment,
            tracker::GoertzelTracker,
        },
    };

    const SAMPLE_RATE: f32 = 44100.0;

    fn gradient_line() -> ScanLine {
        ScanLine {
            green: (0..320).map(|x| (x * 255 / 319) as u8).collect(),
            blue: (0..320).map(|x| 255 - (x * 255 / 319) as u8).collect(),
            red: (0..320).map(|x| (x * 7 % 256) as u8).collect(),
        }
    }

    /// 50 ms of sync tone followed by a line, so the line starts at a
    /// non-zero position like it does after a header.
    fn line_signal(line: &ScanLine) -> (Vec<f32>, f64) {
        let mut segments = vec![Segment::new(1200.0, 0.050)];
        segments.extend(scan_line_segments(&ModeSpecification::M1, line));
        let samples = synthesize_segments(&segments, SAMPLE_RATE).unwrap();
        (samples, 0.050 * f64::from(SAMPLE_RATE))
    }

    #[test]
    fn decodes_single_line() {
        let line = gradient_line();
        let (samples, line_start) = line_signal(&line);
        let decoder = ScanLineDecoder::new(
            &samples,
            SAMPLE_RATE,
            ModeSpecification::M1,
            DecoderConfig::default(),
            GoertzelTracker::default(),
        );

        // start a bit late, the sync search has to correct this
        let decoded = decoder.decode_line(line_start + 20.0).unwrap();
        assert!(decoded.sync_found);
        assert!((decoded.correction + 20.0).abs() <= 1.0);

        assert_eq!(decoded.line, line);

        let line_len = 446.446e-3 * f64::from(SAMPLE_RATE);
        assert!((decoded.next_line_start - (line_start + line_len)).abs() <= 1.0);
        assert!(decoded.consumed.abs_diff((line_len - 20.0).round() as usize) <= 1);
    }

    #[test]
    fn sync_end_is_exact() {
        let line = gradient_line();
        let (samples, line_start) = line_signal(&line);
        let decoder = ScanLineDecoder::new(
            &samples,
            SAMPLE_RATE,
            ModeSpecification::M1,
            DecoderConfig::default(),
            GoertzelTracker::default(),
        );

        // first sample of the porch, as the encoder places it
        let expected = ((0.050 + 4.862e-3) * f64::from(SAMPLE_RATE)).round() as usize;
        let sync = 4.862e-3 * f64::from(SAMPLE_RATE);
        for offset in -40..=40 {
            let sync_end = decoder.find_sync(line_start + sync + f64::from(offset));
            assert_eq!(sync_end, Some(expected), "offset {offset}");
        }
    }

    #[test]
    fn full_contrast_lines() {
        let checkerboard = ScanLine {
            green: (0..320).map(|x| if x % 2 == 0 { 255 } else { 0 }).collect(),
            blue: (0..320).map(|x| if x % 2 == 0 { 0 } else { 255 }).collect(),
            red: (0..320).map(|x| if x % 3 == 0 { 255 } else { 0 }).collect(),
        };
        let white = ScanLine {
            green: vec![255; 320],
            blue: vec![255; 320],
            red: vec![255; 320],
        };

        for sample_rate in [22050.0, 44100.0, 48000.0] {
            for line in [&checkerboard, &white] {
                let mut segments = vec![Segment::new(1200.0, 0.050)];
                segments.extend(scan_line_segments(&ModeSpecification::M1, line));
                let samples = synthesize_segments(&segments, sample_rate).unwrap();

                let decoder = ScanLineDecoder::new(
                    &samples,
                    sample_rate,
                    ModeSpecification::M1,
                    DecoderConfig::default(),
                    GoertzelTracker::default(),
                );
                let decoded = decoder
                    .decode_line(0.050 * f64::from(sample_rate) - 7.0)
                    .unwrap();
                assert_eq!(&decoded.line, line, "{sample_rate} Hz");
            }
        }
    }

    #[test]
    fn tracks_drifting_line_clock() {
        let lines = (0..4)
            .map(|y| ScanLine {
                green: (0..320).map(|x| ((x * 13 + y * 50) % 256) as u8).collect(),
                blue: (0..320).map(|x| ((x * 29) % 256) as u8).collect(),
                red: (0..320).map(|x| if (x + y) % 2 == 0 { 255 } else { 0 }).collect(),
            })
            .collect::<Vec<_>>();

        // written at 44144 Hz, decoded as if it were 44100 Hz
        let mut segments = vec![Segment::new(1900.0, 0.050)];
        for line in &lines {
            segments.extend(scan_line_segments(&ModeSpecification::M1, line));
        }
        let samples = synthesize_segments(&segments, 44144.0).unwrap();

        let decoder = ScanLineDecoder::new(
            &samples,
            SAMPLE_RATE,
            ModeSpecification::M1,
            DecoderConfig::default(),
            GoertzelTracker::default(),
        );
        let line_start = 0.050 * f64::from(SAMPLE_RATE);
        let syncs = decoder.track_syncs(line_start, lines.len());
        assert_eq!(syncs.len(), lines.len());
        assert!(syncs.iter().all(Option::is_some));

        let clock = decoder.line_clock(line_start, &syncs);
        assert!((clock.line_len - 446.446e-3 * 44144.0).abs() < 1.0);

        for (y, line) in lines.iter().enumerate() {
            let decoded = decoder.decode_pixels(clock.sync_end(y), clock.line_len).unwrap();
            for (decoded, expected) in [
                (&decoded.green, &line.green),
                (&decoded.blue, &line.blue),
                (&decoded.red, &line.red),
            ] {
                for (a, b) in decoded.iter().zip(expected) {
                    assert!(a.abs_diff(*b) <= 4, "line {y}: {a} != {b}");
                }
            }
        }
    }

    #[test]
    fn missing_sync_falls_back_to_expected_position() {
        let (samples, line_start) = line_signal(&gradient_line());
        // no sync pulse within the search window
        let samples = samples
            .iter()
            .enumerate()
            .map(|(i, &sample)| if i < 2205 + 400 { 0.0 } else { sample })
            .collect::<Vec<_>>();

        let decoder = ScanLineDecoder::new(
            &samples,
            SAMPLE_RATE,
            ModeSpecification::M1,
            DecoderConfig::default(),
            GoertzelTracker::default(),
        );
        let decoded = decoder.decode_line(line_start).unwrap();
        assert!(!decoded.sync_found);
        assert_eq!(decoded.correction, 0.0);
    }

    #[test]
    fn short_line_is_end_of_stream() {
        let (mut samples, line_start) = line_signal(&gradient_line());
        samples.truncate(samples.len() / 2);
        let decoder = ScanLineDecoder::new(
            &samples,
            SAMPLE_RATE,
            ModeSpecification::M1,
            DecoderConfig::default(),
            GoertzelTracker::default(),
        );
        assert!(matches!(
            decoder.decode_line(line_start),
            Err(LineError::EndOfStream)
        ));
    }

    #[test]
    fn silence_has_no_header() {
        let signal = AudioSignal::new(vec![0; 44100], SAMPLE_RATE);
        assert!(matches!(
            SstvDecoder::new().decode(&signal),
            Err(DecodeError::HeaderNotFound)
        ));
    }
}
