//! Layered CLI settings
//!
//! Resolution order, later layers winning:
//! defaults → JSON config file (`--config`) → environment → flags.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use hibp_bloom::{BuildConfig, BuildConfigBuilder};
use serde::Deserialize;

/// File name used when no output path is given
pub const DEFAULT_OUTPUT_NAME: &str = "HIBPBloomFilter.bin";

pub const ENV_INPUT: &str = "HIBP_BLOOM_INPUT";
pub const ENV_OUTPUT: &str = "HIBP_BLOOM_OUTPUT";
pub const ENV_FPR: &str = "HIBP_BLOOM_FPR";

/// Contents of a `--config` JSON file; every field is optional
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub input: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub target_fpr: Option<f64>,
    pub count_check_interval: Option<u64>,
    pub estimated_total_minutes: Option<u64>,
}

/// Values given on the command line
#[derive(Debug, Default)]
pub struct Overrides {
    pub input: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub fpr: Option<f64>,
}

/// Fully resolved settings for one build
#[derive(Debug)]
pub struct Settings {
    pub input: PathBuf,
    pub output: PathBuf,
    pub build: BuildConfig,
}

pub fn load_file(path: &Path) -> Result<FileConfig> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse config file {}", path.display()))
}

/// Merge every layer into final settings
///
/// `env` looks up an environment variable by name.
pub fn resolve(
    file: Option<FileConfig>,
    env: impl Fn(&str) -> Option<String>,
    flags: Overrides,
) -> Result<Settings> {
    let file = file.unwrap_or_default();

    let input = flags
        .input
        .or_else(|| env(ENV_INPUT).map(PathBuf::from))
        .or(file.input)
        .ok_or_else(|| anyhow!("No input file given (use --input or {})", ENV_INPUT))?;

    let output = flags
        .output
        .or_else(|| env(ENV_OUTPUT).map(PathBuf::from))
        .or(file.output)
        .unwrap_or_else(|| input.with_file_name(DEFAULT_OUTPUT_NAME));

    let env_fpr = env(ENV_FPR)
        .map(|raw| {
            raw.trim()
                .parse::<f64>()
                .with_context(|| format!("{} is not a number: {:?}", ENV_FPR, raw))
        })
        .transpose()?;

    let mut builder = BuildConfigBuilder::new();
    if let Some(fpr) = flags.fpr.or(env_fpr).or(file.target_fpr) {
        builder = builder.target_fpr(fpr);
    }
    if let Some(lines) = file.count_check_interval {
        builder = builder.count_check_interval(lines);
    }
    if let Some(minutes) = file.estimated_total_minutes {
        builder = builder.estimated_total_minutes(minutes);
    }
    let build = builder.build().context("Invalid build configuration")?;

    Ok(Settings {
        input,
        output,
        build,
    })
}
