//! TOML configuration model and loading
//!
//! Settings resolve in priority order:
//! 1. Command-line arguments (highest priority)
//! 2. Environment variables
//! 3. TOML config file
//! 4. Built-in defaults (fallback)
//!
//! This module owns tiers 3 and 4. Command-line and environment overrides are
//! applied by the binaries on top of the loaded [`TomlConfig`].
//!
//! A missing config file at the default location is not an error: a warning
//! is logged and defaults are used. An explicitly requested file that is
//! missing or unparsable is a [`Error::Config`].

use crate::manifest::ManifestFormat;
use crate::timing::QUANTUM_MS;
use crate::{Error, Result};
use std::collections::HashSet;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "TAPED_CONFIG";

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub output: OutputConfig,
    pub engine: EngineConfig,
    pub run: RunConfig,
    pub logging: LoggingConfig,
}

/// Where and how sprite artifacts are written
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Output directory for sprites and manifest
    pub dir: PathBuf,
    /// Base file name shared by every artifact (`<name>.mp3`, `<name>.json`)
    pub name: String,
    /// One sprite is encoded per entry, by file extension
    pub formats: Vec<String>,
    pub manifest_format: ManifestFormat,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            name: "sprite".to_string(),
            formats: vec!["mp3".to_string(), "ogg".to_string()],
            manifest_format: ManifestFormat::Range,
        }
    }
}

/// External audio engine parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Engine executable (name on PATH or absolute path)
    pub sox_binary: String,
    /// Target sample rate in Hz
    pub sample_rate: u32,
    /// Minimum length of non-silence that ends a trimmed region
    pub silence_min_duration_secs: f64,
    /// Amplitude below which audio counts as silence
    pub silence_threshold_percent: f64,
    /// Peak normalization target in dBFS
    pub norm_level_db: f64,
    /// Gain applied after normalization in dB
    pub gain_db: f64,
    /// Silence inserted before the clip ahead of the final trim
    pub pad_head_ms: u64,
    /// Silence appended after the clip ahead of the final trim
    pub pad_tail_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sox_binary: "sox".to_string(),
            sample_rate: 24_000,
            silence_min_duration_secs: 0.01,
            silence_threshold_percent: 0.0,
            norm_level_db: -0.3,
            gain_db: -10.0,
            pad_head_ms: 0,
            pad_tail_ms: 100,
        }
    }
}

/// Run scheduling and integrity policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Maximum clips normalized concurrently
    pub jobs: usize,
    pub on_mismatch: IntegrityPolicy,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            jobs: 4,
            on_mismatch: IntegrityPolicy::Fatal,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log file path (optional, logs to stderr if not specified)
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

/// What to do when a clip's measured duration differs from its target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntegrityPolicy {
    /// Abort the run
    #[default]
    Fatal,
    /// Drop the clip from sprite and manifest, keep going
    Exclude,
    /// Log and keep the clip
    Warn,
}

impl FromStr for IntegrityPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "fatal" => Ok(Self::Fatal),
            "exclude" => Ok(Self::Exclude),
            "warn" => Ok(Self::Warn),
            other => Err(Error::InvalidInput(format!(
                "Unknown mismatch policy '{}' (expected 'fatal', 'exclude' or 'warn')",
                other
            ))),
        }
    }
}

impl fmt::Display for IntegrityPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fatal => f.write_str("fatal"),
            Self::Exclude => f.write_str("exclude"),
            Self::Warn => f.write_str("warn"),
        }
    }
}

impl TomlConfig {
    /// Reject values no run could use
    pub fn validate(&self) -> Result<()> {
        if self.output.name.trim().is_empty() {
            return Err(Error::Config("output.name must not be empty".to_string()));
        }
        let mut formats = HashSet::new();
        for format in &self.output.formats {
            let ext = format.trim().trim_start_matches('.').to_ascii_lowercase();
            if ext.is_empty() {
                return Err(Error::Config("output.formats must not contain empty entries".to_string()));
            }
            if ext == "json" {
                return Err(Error::Config(
                    "output.formats must not contain 'json', the manifest uses that name".to_string(),
                ));
            }
            if !formats.insert(ext) {
                return Err(Error::Config(format!("output.formats lists '{}' twice", format)));
            }
        }
        if self.run.jobs == 0 {
            return Err(Error::Config("run.jobs must be at least 1".to_string()));
        }
        if self.engine.sample_rate == 0 {
            return Err(Error::Config("engine.sample_rate must be positive".to_string()));
        }
        // Less padding than one quantum cannot fill a clip up to its target
        if self.engine.pad_head_ms + self.engine.pad_tail_ms < QUANTUM_MS {
            return Err(Error::Config(format!(
                "engine.pad_head_ms + engine.pad_tail_ms must be at least {}",
                QUANTUM_MS
            )));
        }
        if self.engine.sox_binary.trim().is_empty() {
            return Err(Error::Config("engine.sox_binary must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Default config file location: `<config_dir>/taped/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("taped").join("config.toml"))
}

/// Parse a config file
pub fn read_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
}

/// Load configuration from an explicit file, `TAPED_CONFIG`, or the default
/// location, in that order.
pub fn load_toml_config(explicit: Option<&Path>) -> Result<TomlConfig> {
    let env_path = std::env::var_os(CONFIG_ENV_VAR).map(PathBuf::from);

    if let Some(path) = explicit.map(Path::to_path_buf).or(env_path) {
        let config = read_toml_config(&path)?;
        info!("Loaded config from {}", path.display());
        return Ok(config);
    }

    match default_config_path() {
        Some(path) if path.exists() => {
            let config = read_toml_config(&path)?;
            info!("Loaded config from {}", path.display());
            Ok(config)
        }
        Some(path) => {
            warn!(
                "Config file not found at {}, using built-in defaults",
                path.display()
            );
            Ok(TomlConfig::default())
        }
        None => {
            warn!("Could not determine config directory, using built-in defaults");
            Ok(TomlConfig::default())
        }
    }
}

/// Write a config file (used to emit a starter config)
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize config failed: {}", e)))?;
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, content)?;
    Ok(())
}
