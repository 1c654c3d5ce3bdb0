mod args;
mod config;

use std::path::Path;

use clap::Parser;
use color_eyre::eyre::{
    Error,
    bail,
};
use image::ImageReader;
use sstv::{
    GetSampleRate,
    modem::sstv::{
        DecoderConfig,
        SstvDecoder,
        SstvEncoder,
        image::fit_to_mode,
        modes::ModeSpecification,
    },
    sink::file::write_wav,
    source::{
        add_white_noise,
        file::read_wav,
    },
    spectrum::analyze,
};
use tracing_subscriber::EnvFilter;

use crate::{
    args::{
        Args,
        Command,
    },
    config::Config,
};

fn main() -> Result<(), Error> {
    let _ = dotenvy::dotenv();
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    tracing::debug!(?args);

    let mut config = match &args.config {
        Some(path) => Config::from_path(path)?,
        None => Config::default(),
    };

    match args.command {
        Command::Encode {
            image,
            output,
            sample_rate,
            noise,
            seed,
        } => {
            if let Some(sample_rate) = sample_rate {
                config.encoder.sample_rate = sample_rate;
            }
            encode(&image, &output, config.encoder.sample_rate, noise, seed)?;
        }
        Command::Decode {
            input,
            output,
            tone_tolerance,
            header_search,
            sync_search,
            sync_threshold,
        } => {
            let decoder = &mut config.decoder;
            decoder.tone_tolerance = tone_tolerance.unwrap_or(decoder.tone_tolerance);
            decoder.header_search = header_search.unwrap_or(decoder.header_search);
            decoder.sync_search = sync_search.unwrap_or(decoder.sync_search);
            decoder.sync_threshold = sync_threshold.unwrap_or(decoder.sync_threshold);
            decode(&input, &output, config.decoder)?;
        }
        Command::Analyze {
            input,
            frames,
            window,
        } => {
            let report = analyze(&read_wav(&input)?, window);
            println!("{report}");
            if frames {
                for (time, frequency) in &report.dominant_frequencies {
                    println!("{time:>9.3} s  {frequency:>7.1} Hz");
                }
            }
        }
        Command::DefaultConfig => {
            print!("{}", Config::default().to_toml()?);
        }
    }

    Ok(())
}

fn encode(
    image: &Path,
    output: &Path,
    sample_rate: f32,
    noise: Option<f32>,
    seed: u64,
) -> Result<(), Error> {
    if !(sample_rate.is_finite() && sample_rate > 0.0) {
        bail!("invalid sample rate: {sample_rate}");
    }

    let mode = ModeSpecification::M1;
    let image = ImageReader::open(image)?.decode()?.into_rgb8();
    let image = fit_to_mode(&image, &mode);

    let mut signal = SstvEncoder::new(mode, sample_rate).encode(&image)?;
    if let Some(amplitude) = noise {
        if !(0.0..=1.0).contains(&amplitude) {
            bail!("noise amplitude must be between 0 and 1: {amplitude}");
        }
        signal = add_white_noise(&signal, amplitude, seed);
    }

    write_wav(output, &signal)?;
    println!(
        "{}: {:.3} s at {} Hz",
        output.display(),
        signal.duration(),
        signal.sample_rate()
    );

    Ok(())
}

fn decode(input: &Path, output: &Path, config: DecoderConfig) -> Result<(), Error> {
    let signal = read_wav(input)?;
    let decoded = SstvDecoder::with_config(config).decode(&signal)?;

    decoded.image.save(output)?;
    println!(
        "{}: {} ({}/{} lines)",
        output.display(),
        decoded.mode.name,
        decoded.lines_decoded,
        decoded.mode.num_lines
    );
    if decoded.truncated {
        tracing::warn!(
            lines = decoded.lines_decoded,
            "recording ended before the image was complete"
        );
    }
    if decoded.resync_failures > 0 {
        tracing::warn!(
            resync_failures = decoded.resync_failures,
            "sync pulses were missed"
        );
    }

    Ok(())
}
