use std::hint::black_box;

use criterion::{
    Criterion,
    Throughput,
    criterion_group,
    criterion_main,
};
use image::{
    Rgb,
    RgbImage,
};
use sstv::{
    modem::sstv::{
        DecoderConfig,
        ScanLineDecoder,
        image::ScanLine,
        modes::ModeSpecification,
        scan_line_segments,
        synthesize_segments,
        tracker::{
            FrequencyTracker,
            GoertzelTracker,
        },
    },
    source::synthesize,
};

const SAMPLE_RATE: f32 = 44100.0;

fn test_line() -> ScanLine {
    let image = RgbImage::from_fn(320, 1, |x, _| Rgb([x as u8, 255 - x as u8, 128]));
    ScanLine::from_frame_buffer(&image, 0)
}

pub fn bench_tracker(c: &mut Criterion) {
    let mut group = c.benchmark_group("tracker");
    let tracker = GoertzelTracker::default();

    for len in [18, 107, 220, 1058] {
        let window = synthesize(1837.0, len as f32 / SAMPLE_RATE, SAMPLE_RATE, 0.3)
            .unwrap()
            .samples;
        group.throughput(Throughput::Elements(len as u64));
        group.bench_function(format!("estimate {len}"), |b| {
            b.iter(|| tracker.estimate(black_box(&window), SAMPLE_RATE))
        });
    }

    group.finish();
}

pub fn bench_line(c: &mut Criterion) {
    let mut group = c.benchmark_group("line");
    let mode = ModeSpecification::M1;
    let line = test_line();

    group.bench_function("encode", |b| {
        b.iter(|| {
            let segments = scan_line_segments(&mode, black_box(&line));
            synthesize_segments(&segments, SAMPLE_RATE)
        })
    });

    let samples = synthesize_segments(&scan_line_segments(&mode, &line), SAMPLE_RATE).unwrap();
    let decoder = ScanLineDecoder::new(
        &samples,
        SAMPLE_RATE,
        mode,
        DecoderConfig::default(),
        GoertzelTracker::default(),
    );
    group.bench_function("decode", |b| {
        b.iter(|| decoder.decode_line(black_box(0.0)))
    });

    group.finish();
}

criterion_group!(benches, bench_tracker, bench_line);
criterion_main!(benches);
