use std::path::Path;

use color_eyre::eyre::Error;
use serde::{
    Deserialize,
    Serialize,
};
use sstv::modem::sstv::DecoderConfig;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderConfig {
    pub sample_rate: f32,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100.0,
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub encoder: EncoderConfig,
    pub decoder: DecoderConfig,
}

impl Config {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        tracing::debug!(path = %path.display(), "Loading config from file");
        let toml = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&toml)?)
    }

    pub fn to_toml(&self) -> Result<String, Error> {
        Ok(toml::to_string_pretty(self)?)
    }
}
