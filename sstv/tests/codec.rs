use image::{
    Rgb,
    RgbImage,
};
use rand::{
    Rng,
    SeedableRng,
    rngs::SmallRng,
};
use sstv::{
    AudioSignal,
    GetSampleRate,
    modem::sstv::{
        DecodeError,
        DecoderConfig,
        PORCH_TONE,
        SstvDecoder,
        SstvEncoder,
        VIS_HIGH_TONE,
        VIS_LOW_TONE,
        modes::{
            ModeSpecification,
            VisCode,
        },
        synthesize_segments,
        tone::Segment,
        tracker::GoertzelTracker,
        vis::{
            VisError,
            header_segments,
        },
    },
    sink::file::write_wav,
    source::{
        add_white_noise,
        file::read_wav,
    },
};

fn gradient() -> RgbImage {
    RgbImage::from_fn(320, 256, |x, y| {
        Rgb([
            (x * 255 / 319) as u8,
            y as u8,
            ((x + 2 * y) % 256) as u8,
        ])
    })
}

fn random_image(seed: u64) -> RgbImage {
    let mut rng = SmallRng::seed_from_u64(seed);
    let mut pixels = vec![0u8; 320 * 256 * 3];
    rng.fill(&mut pixels[..]);
    RgbImage::from_raw(320, 256, pixels).unwrap()
}

fn checkerboard() -> RgbImage {
    RgbImage::from_fn(320, 256, |x, y| {
        if (x + y) % 2 == 0 {
            Rgb([0; 3])
        }
        else {
            Rgb([255; 3])
        }
    })
}

fn encode(image: &RgbImage) -> AudioSignal {
    SstvEncoder::default().encode(image).unwrap()
}

fn max_error(a: &RgbImage, b: &RgbImage) -> u8 {
    a.pixels()
        .zip(b.pixels())
        .flat_map(|(a, b)| a.0.into_iter().zip(b.0).map(|(a, b)| a.abs_diff(b)))
        .max()
        .unwrap_or_default()
}

fn mean_error(a: &RgbImage, b: &RgbImage) -> f64 {
    let (sum, count) = a
        .pixels()
        .zip(b.pixels())
        .flat_map(|(a, b)| a.0.into_iter().zip(b.0).map(|(a, b)| a.abs_diff(b)))
        .fold((0u64, 0u64), |(sum, count), error| (sum + u64::from(error), count + 1));
    sum as f64 / count as f64
}

#[test]
fn gradient_round_trip() {
    let image = gradient();
    let decoded = SstvDecoder::new().decode(&encode(&image)).unwrap();

    assert!(decoded.is_complete());
    assert_eq!(decoded.lines_decoded, 256);
    assert_eq!(decoded.resync_failures, 0);
    assert_eq!(decoded.mode, ModeSpecification::M1);
    assert_eq!(decoded.image.dimensions(), (320, 256));
    assert!(max_error(&image, &decoded.image) <= 4);
}

#[test]
fn black_and_white_images() {
    for value in [0u8, 255] {
        let image = RgbImage::from_pixel(320, 256, Rgb([value; 3]));
        let decoded = SstvDecoder::new().decode(&encode(&image)).unwrap();
        assert!(decoded.is_complete());
        assert!(decoded.image.pixels().all(|pixel| pixel.0 == [value; 3]));
    }
}

#[test]
fn truncated_signal_gives_partial_image() {
    let image = gradient();
    let signal = encode(&image);
    let half = signal.truncated(signal.len() / 2);

    let decoded = SstvDecoder::new().decode(&half).unwrap();
    assert!(decoded.truncated);
    assert!((125..=128).contains(&decoded.lines_decoded));
    assert_eq!(decoded.image.height() as usize, decoded.lines_decoded);

    let top = image::imageops::crop_imm(&image, 0, 0, 320, decoded.lines_decoded as u32).to_image();
    assert!(max_error(&top, &decoded.image) <= 4);
}

#[test]
fn noisy_signal() {
    let image = gradient();
    let signal = add_white_noise(&encode(&image), 0.05, 1234);

    let decoded = SstvDecoder::new().decode(&signal).unwrap();
    assert!(decoded.is_complete());
    assert!(mean_error(&image, &decoded.image) <= 8.0);
}

#[test]
fn leading_silence_is_skipped() {
    let image = gradient();
    let signal = encode(&image);

    let mut samples = vec![0; signal.sample_rate() as usize];
    samples.extend_from_slice(signal.samples());
    let signal = AudioSignal::new(samples, signal.sample_rate());

    let decoded = SstvDecoder::new().decode(&signal).unwrap();
    assert!(decoded.is_complete());
    assert!(max_error(&image, &decoded.image) <= 4);
}

#[test]
fn other_sample_rate() {
    let image = gradient();
    let signal = SstvEncoder::new(ModeSpecification::M1, 48000.0)
        .encode(&image)
        .unwrap();
    let decoded = SstvDecoder::new().decode(&signal).unwrap();
    assert!(decoded.is_complete());
    assert!(max_error(&image, &decoded.image) <= 4);
}

#[test]
fn unsupported_mode_is_reported() {
    // martin m1 timing announced as martin m2
    let mode = ModeSpecification {
        vis_code: VisCode::new_unchecked(0x28),
        ..ModeSpecification::M1
    };
    let signal = SstvEncoder::new(mode, 44100.0).encode(&gradient()).unwrap();

    match SstvDecoder::new().decode(&signal) {
        Err(DecodeError::UnsupportedMode { vis_code, name }) => {
            assert_eq!(vis_code.get(), 0x28);
            assert_eq!(name, Some("Martin M2"));
        }
        other => panic!("expected unsupported mode, got {other:?}"),
    }
}

#[test]
fn signal_shorter_than_header() {
    let signal = encode(&gradient());
    let short = signal.truncated((0.5 * signal.sample_rate()) as usize);
    assert!(matches!(
        SstvDecoder::new().decode(&short),
        Err(DecodeError::HeaderNotFound)
    ));
}

#[test]
fn wav_round_trip() {
    let image = gradient();
    let signal = encode(&image);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("m1.wav");
    write_wav(&path, &signal).unwrap();

    let read = read_wav(&path).unwrap();
    assert_eq!(read, signal);

    let decoded = SstvDecoder::new().decode(&read).unwrap();
    assert!(max_error(&image, &decoded.image) <= 4);
}

#[test]
fn high_contrast_round_trip() {
    for sample_rate in [44100.0, 48000.0] {
        let encoder = SstvEncoder::new(ModeSpecification::M1, sample_rate);
        for image in [checkerboard(), random_image(7)] {
            let decoded = SstvDecoder::new()
                .decode(&encoder.encode(&image).unwrap())
                .unwrap();
            assert!(decoded.is_complete());
            assert_eq!(decoded.resync_failures, 0);
            assert!(
                max_error(&image, &decoded.image) <= 4,
                "max error {} at {sample_rate} Hz",
                max_error(&image, &decoded.image)
            );
        }
    }
}

#[test]
fn sample_clock_mismatch() {
    let image = random_image(42);
    for (written, read) in [(44100.0, 44105.0), (44144.0, 44100.0)] {
        let signal = SstvEncoder::new(ModeSpecification::M1, written)
            .encode(&image)
            .unwrap();
        let signal = AudioSignal::new(signal.into_samples(), read);

        let decoded = SstvDecoder::new().decode(&signal).unwrap();
        assert!(decoded.is_complete());
        assert_eq!(decoded.resync_failures, 0);
        assert!(
            max_error(&image, &decoded.image) <= 4,
            "max error {} written at {written} Hz, read at {read} Hz",
            max_error(&image, &decoded.image)
        );
    }
}

#[test]
fn corrupt_header_is_reported() {
    let vis_code = ModeSpecification::M1.vis_code;
    let mut segments = header_segments(vis_code);
    let parity = &mut segments[11];
    parity.frequency = if parity.frequency == VIS_HIGH_TONE {
        VIS_LOW_TONE
    }
    else {
        VIS_HIGH_TONE
    };
    segments.push(Segment::new(PORCH_TONE, 1.0));

    let samples = synthesize_segments(&segments, 44100.0).unwrap();
    let signal = AudioSignal::from_f32(&samples, 44100.0);

    match SstvDecoder::new().decode(&signal) {
        Err(DecodeError::HeaderCorrupt(VisError::Parity {
            vis_code: decoded, ..
        })) => {
            assert_eq!(decoded, vis_code);
        }
        other => panic!("expected parity error, got {other:?}"),
    }
}

#[test]
fn custom_mode_select_and_tracker() {
    let decoder =
        SstvDecoder::new_with_mode_select(ModeSpecification::M1, DecoderConfig::default())
            .with_tracker(GoertzelTracker {
                resolution: 0.05,
                ..Default::default()
            });

    let image = gradient();
    let decoded = decoder.decode(&encode(&image)).unwrap();
    assert!(decoded.is_complete());
    assert!(max_error(&image, &decoded.image) <= 4);

    let other = ModeSpecification {
        vis_code: VisCode::new_unchecked(0x28),
        ..ModeSpecification::M1
    };
    let signal = SstvEncoder::new(other, 44100.0).encode(&image).unwrap();
    assert!(matches!(
        decoder.decode(&signal),
        Err(DecodeError::UnsupportedMode { .. })
    ));
}
