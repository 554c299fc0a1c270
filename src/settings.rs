//! Runtime settings for the binary and the benches. Built from defaults, an
//! optional TOML file and `LINECOUNT_*` environment variables, later sources
//! winning. The counting functions themselves take explicit arguments.

use crate::error::Result;
use crate::estimate::{EstimateParams, DEFAULT_CHUNK_SIZE, DEFAULT_SAMPLES, DEFAULT_SAMPLE_LENGTH};
use config::{Config, ConfigBuilder, Environment, File, FileFormat};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const ENV_PREFIX: &str = "LINECOUNT";

/// Files at or above this size are estimated rather than counted when no
/// mode is forced.
pub const SMALL_FILE_THRESHOLD: u64 = 2 * 1024 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
    pub chunk_size: usize,
    pub sample_length: usize,
    pub samples: usize,
    pub small_file_threshold: u64,
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub bench_file: Option<PathBuf>,
    /// Drop the page cache between benchmark runs (needs sudo).
    pub drop_caches: bool,
}

impl Settings {
    pub fn load(config_file: Option<&Path>) -> Result<Self> {
        Self::load_with(config_file, Environment::with_prefix(ENV_PREFIX))
    }

    pub fn load_with(config_file: Option<&Path>, env: Environment) -> Result<Self> {
        let mut builder = defaults()?;
        if let Some(path) = config_file {
            builder = builder.add_source(File::from(path).format(FileFormat::Toml));
        }
        let settings = builder
            .add_source(env.try_parsing(true))
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }

    pub fn estimate_params(&self) -> EstimateParams {
        EstimateParams {
            n_samples: self.samples,
            chunk_size: self.chunk_size,
            sample_length: self.sample_length,
        }
    }
}

fn defaults() -> Result<ConfigBuilder<config::builder::DefaultState>> {
    Ok(Config::builder()
        .set_default("chunk_size", DEFAULT_CHUNK_SIZE as i64)?
        .set_default("sample_length", DEFAULT_SAMPLE_LENGTH as i64)?
        .set_default("samples", DEFAULT_SAMPLES as i64)?
        .set_default("small_file_threshold", SMALL_FILE_THRESHOLD as i64)?
        .set_default("drop_caches", false)?)
}
