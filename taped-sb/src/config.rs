//! Configuration resolution for taped-sb
//!
//! **Priority:** command line → environment → TOML → built-in defaults
//!
//! Environment variables are read by clap alongside their flags, so by the
//! time [`CliOverrides`] exists the first two tiers are already merged. This
//! module lays them over the loaded [`TomlConfig`].
//!
//! The global subscriber is configured from the `[logging]` section, so the
//! file itself is loaded under a short-lived bootstrap subscriber
//! ([`load_config`]); otherwise "config not found" would be logged to nobody.

use std::path::{Path, PathBuf};
use taped_common::config::{load_toml_config, IntegrityPolicy, TomlConfig};
use taped_common::{ManifestFormat, Result};
use tracing::info;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

/// Load the TOML config, logging through a bootstrap subscriber
/// (`RUST_LOG`, default `info`) that writes to `writer`
pub fn load_config<W>(explicit: Option<&Path>, writer: W) -> Result<TomlConfig>
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let bootstrap = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(writer)
        .finish();
    tracing::subscriber::with_default(bootstrap, || load_toml_config(explicit))
}

/// Values given on the command line or through the environment
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CliOverrides {
    pub out_dir: Option<PathBuf>,
    pub name: Option<String>,
    pub formats: Vec<String>,
    pub manifest_format: Option<ManifestFormat>,
    pub jobs: Option<usize>,
    pub on_mismatch: Option<IntegrityPolicy>,
    pub sox_binary: Option<String>,
}

/// Apply overrides to a loaded config and validate the result
pub fn resolve(mut config: TomlConfig, overrides: CliOverrides) -> Result<TomlConfig> {
    if let Some(dir) = overrides.out_dir {
        config.output.dir = dir;
    }
    if let Some(name) = overrides.name {
        config.output.name = name;
    }
    if !overrides.formats.is_empty() {
        config.output.formats = overrides.formats;
    }
    if let Some(format) = overrides.manifest_format {
        config.output.manifest_format = format;
    }
    if let Some(jobs) = overrides.jobs {
        config.run.jobs = jobs;
    }
    if let Some(policy) = overrides.on_mismatch {
        config.run.on_mismatch = policy;
    }
    if let Some(binary) = overrides.sox_binary {
        config.engine.sox_binary = binary;
    }

    config.validate()?;
    Ok(config)
}

/// Log the settings a run will use
pub fn log_resolved(config: &TomlConfig) {
    info!(
        out_dir = %config.output.dir.display(),
        name = %config.output.name,
        formats = %config.output.formats.join(","),
        manifest_format = %config.output.manifest_format,
        "Output settings"
    );
    info!(
        sox = %config.engine.sox_binary,
        sample_rate = config.engine.sample_rate,
        jobs = config.run.jobs,
        on_mismatch = %config.run.on_mismatch,
        "Run settings"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use taped_common::Error;

    #[test]
    fn test_no_overrides_keeps_config() {
        let config = TomlConfig::default();
        let resolved = resolve(config.clone(), CliOverrides::default()).unwrap();
        assert_eq!(resolved, config);
    }

    #[test]
    fn test_overrides_win_over_toml() {
        let mut config = TomlConfig::default();
        config.output.name = "from_toml".to_string();
        config.run.jobs = 2;

        let resolved = resolve(
            config,
            CliOverrides {
                name: Some("from_cli".to_string()),
                formats: vec!["ogg".to_string()],
                on_mismatch: Some(IntegrityPolicy::Exclude),
                sox_binary: Some("/opt/sox/bin/sox".to_string()),
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(resolved.output.name, "from_cli");
        assert_eq!(resolved.output.formats, vec!["ogg"]);
        assert_eq!(resolved.run.jobs, 2);
        assert_eq!(resolved.run.on_mismatch, IntegrityPolicy::Exclude);
        assert_eq!(resolved.engine.sox_binary, "/opt/sox/bin/sox");
    }

    #[test]
    fn test_invalid_override_is_rejected() {
        let result = resolve(
            TomlConfig::default(),
            CliOverrides {
                jobs: Some(0),
                ..Default::default()
            },
        );
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
