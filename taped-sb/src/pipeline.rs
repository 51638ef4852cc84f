//! Sprite build pipeline
//!
//! ```text
//! RunWorkspace::create
//!     ↓
//! ClipScanner::scan          (input root → clips + identities)
//!     ↓
//! ClipNormalizer::normalize_all
//!     ↓
//! SpriteOrder::new           (the one and only sort)
//!     ├── manifest::build
//!     └── SpriteAssembler::assemble   (one track per format, staged in the workspace)
//!     ↓
//! assembler::publish         (or remove_stale when there are no clips)
//!     ↓
//! manifest::write            (only after every track succeeded)
//!     ↓
//! RunWorkspace::close
//! ```

use crate::assembler::{self, SpriteAssembler, SpriteTarget};
use crate::discovery::{ClipScanner, DiscoveredClip};
use crate::engine::AudioEngine;
use crate::error::{Result, SpriteError};
use crate::manifest;
use crate::normalizer::{ClipNormalizer, NormalizerSettings};
use crate::order::SpriteOrder;
use crate::workspace::RunWorkspace;
use serde::Serialize;
use std::path::{Path, PathBuf};
use taped_common::config::TomlConfig;
use taped_common::ManifestFormat;
use tracing::{info, warn};

/// Everything one run needs to know
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSettings {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Base name shared by sprite tracks and manifest
    pub sprite_name: String,
    pub formats: Vec<String>,
    pub manifest_format: ManifestFormat,
    pub normalizer: NormalizerSettings,
    /// Parent for the run workspace; system temp directory if unset
    pub workspace_parent: Option<PathBuf>,
}

impl PipelineSettings {
    pub fn from_config(input_dir: impl Into<PathBuf>, config: &TomlConfig) -> Self {
        Self {
            input_dir: input_dir.into(),
            output_dir: config.output.dir.clone(),
            sprite_name: config.output.name.clone(),
            formats: config.output.formats.clone(),
            manifest_format: config.output.manifest_format,
            normalizer: NormalizerSettings::from_config(config),
            workspace_parent: None,
        }
    }

    pub fn sprite_targets(&self) -> Vec<SpriteTarget> {
        SpriteTarget::for_formats(&self.output_dir, &self.sprite_name, &self.formats)
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.output_dir.join(format!("{}.json", self.sprite_name))
    }
}

/// What a successful run produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub clips: usize,
    /// Identities dropped for a duration mismatch
    pub excluded: Vec<String>,
    pub total_ms: u64,
    pub sprites: Vec<PathBuf>,
    pub manifest: PathBuf,
}

/// Sprite build pipeline over an audio engine
pub struct SpritePipeline<E> {
    engine: E,
    settings: PipelineSettings,
}

impl<E: AudioEngine> SpritePipeline<E> {
    pub fn new(engine: E, settings: PipelineSettings) -> Self {
        Self { engine, settings }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Run the whole pipeline. The run workspace is removed on every exit
    /// path; dropping this future mid-run removes it too.
    pub async fn run(&self) -> Result<RunSummary> {
        let workspace = match &self.settings.workspace_parent {
            Some(parent) => RunWorkspace::create_in(parent)?,
            None => RunWorkspace::create()?,
        };

        let result = self.run_in(&workspace).await;

        if let Err(e) = workspace.close() {
            warn!(error = %e, "Failed to remove run workspace");
        }
        result
    }

    async fn run_in(&self, workspace: &RunWorkspace) -> Result<RunSummary> {
        let settings = &self.settings;
        let targets = settings.sprite_targets();
        let manifest_path = settings.manifest_path();

        let clips = self.discover(&targets, &manifest_path).await?;
        info!(
            input = %settings.input_dir.display(),
            clips = clips.len(),
            "Discovery complete"
        );

        let normalizer = ClipNormalizer::new(&self.engine, workspace, settings.normalizer.clone());
        let report = normalizer.normalize_all(&clips).await?;

        let order = SpriteOrder::new(report.clips);
        let sprite_manifest = manifest::build(&order);

        tokio::fs::create_dir_all(&settings.output_dir).await?;

        let sprite_assembler = SpriteAssembler::new(&self.engine, workspace, settings.normalizer.policy);
        let artifacts = sprite_assembler.assemble(&order, &targets).await?;
        if order.is_empty() {
            assembler::remove_stale(&targets).await?;
        } else {
            assembler::publish(&artifacts).await?;
        }

        manifest::write(&sprite_manifest, settings.manifest_format, &manifest_path).await?;

        let summary = RunSummary {
            clips: order.len(),
            excluded: report.excluded.iter().map(|id| id.to_string()).collect(),
            total_ms: sprite_manifest.total_ms(),
            sprites: artifacts.into_iter().map(|a| a.path).collect(),
            manifest: manifest_path,
        };
        info!(
            clips = summary.clips,
            excluded = summary.excluded.len(),
            total_ms = summary.total_ms,
            "Sprite build complete"
        );
        Ok(summary)
    }

    /// Scan the input root, leaving out this run's own output files in case
    /// the output directory sits inside the input tree.
    async fn discover(&self, targets: &[SpriteTarget], manifest_path: &Path) -> Result<Vec<DiscoveredClip>> {
        let input_dir = self.settings.input_dir.clone();
        let clips = tokio::task::spawn_blocking(move || ClipScanner::new().scan(&input_dir))
            .await
            .map_err(|e| SpriteError::Discovery {
                path: self.settings.input_dir.clone(),
                message: e.to_string(),
            })??;

        let mut outputs: Vec<PathBuf> = targets.iter().map(|t| absolute(&t.path)).collect();
        outputs.push(absolute(manifest_path));

        Ok(clips
            .into_iter()
            .filter(|clip| {
                let is_output = outputs.iter().any(|o| *o == clip.path);
                if is_output {
                    warn!(path = %clip.path.display(), "Skipping previous sprite output found in input tree");
                }
                !is_output
            })
            .collect())
    }
}

fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
}
