use std::path::PathBuf;

use clap::{
    Parser,
    Subcommand,
};
use sstv::spectrum::Window;

#[derive(Debug, Parser)]
#[clap(version, about = "Encode and decode Martin M1 SSTV transmissions")]
pub struct Args {
    /// TOML file with encoder and decoder settings. Flags take precedence.
    #[clap(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Encode an image into a WAV file. The image is resized to 320x256.
    Encode {
        image: PathBuf,

        output: PathBuf,

        #[clap(short, long)]
        sample_rate: Option<f32>,

        /// Add white noise with this peak amplitude (0 to 1).
        #[clap(long)]
        noise: Option<f32>,

        /// Seed for the noise generator.
        #[clap(long, default_value = "0")]
        seed: u64,
    },

    /// Decode a WAV file into an image.
    Decode {
        input: PathBuf,

        output: PathBuf,

        /// Maximum deviation of a VIS bit tone, in Hz.
        #[clap(long)]
        tone_tolerance: Option<f32>,

        /// Seconds at the start of the recording searched for the header.
        #[clap(long)]
        header_search: Option<f32>,

        /// Seconds around the expected sync pulse searched for it.
        #[clap(long)]
        sync_search: Option<f32>,

        /// Highest edge score, in Hz, accepted as a sync pulse.
        #[clap(long)]
        sync_threshold: Option<f32>,
    },

    /// Print a short spectral report of a WAV file.
    Analyze {
        input: PathBuf,

        /// Also print the dominant frequency of every frame.
        #[clap(long)]
        frames: bool,

        /// Window applied to each frame: hann or boxcar.
        #[clap(long, default_value = "hann")]
        window: Window,
    },

    /// Print the default configuration as TOML.
    DefaultConfig,
}
