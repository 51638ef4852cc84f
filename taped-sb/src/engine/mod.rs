//! Audio engine capability interface
//!
//! Signal processing (resampling, silence trimming, normalization, padding,
//! transcoding) is delegated to an external engine. The pipeline only relies
//! on the four operations of [`AudioEngine`]; [`SoxEngine`] is the production
//! backend.

use crate::error::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use taped_common::config::EngineConfig;

pub mod sox;

pub use sox::SoxEngine;

/// Parameters for the normalize pass
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizeParams {
    /// Target sample rate in Hz
    pub sample_rate: u32,
    /// Minimum non-silence length that ends a trimmed region, in seconds
    pub silence_min_duration_secs: f64,
    /// Silence amplitude threshold, percent of full scale
    pub silence_threshold_percent: f64,
    /// Peak normalization target, dBFS
    pub norm_level_db: f64,
    /// Gain applied after normalization, dB
    pub gain_db: f64,
}

impl From<&EngineConfig> for NormalizeParams {
    fn from(config: &EngineConfig) -> Self {
        Self {
            sample_rate: config.sample_rate,
            silence_min_duration_secs: config.silence_min_duration_secs,
            silence_threshold_percent: config.silence_threshold_percent,
            norm_level_db: config.norm_level_db,
            gain_db: config.gain_db,
        }
    }
}

/// Parameters for the pad + trim pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FitParams {
    pub pad_head_ms: u64,
    pub pad_tail_ms: u64,
    /// Exact output length
    pub target_ms: u64,
}

/// External audio engine
#[async_trait]
pub trait AudioEngine: Send + Sync {
    /// Engine identifier for logs
    fn name(&self) -> &str;

    /// Resample, trim silence at both ends, normalize and apply gain
    async fn normalize(&self, input: &Path, output: &Path, params: &NormalizeParams) -> Result<()>;

    /// Measured duration of an audio file in seconds
    async fn duration_secs(&self, path: &Path) -> Result<f64>;

    /// Pad with silence, then trim to exactly `params.target_ms`
    async fn fit_duration(&self, input: &Path, output: &Path, params: &FitParams) -> Result<()>;

    /// Concatenate inputs in the given order; encoding follows the output extension
    async fn concat(&self, inputs: &[PathBuf], output: &Path) -> Result<()>;
}
