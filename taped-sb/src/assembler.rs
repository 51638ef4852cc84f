//! Sprite assembler
//!
//! Concatenates the ordered clip artifacts once per output encoding and checks
//! that each combined track is as long as the manifest says it is.
//!
//! Tracks are written into the run workspace first. The output directory is
//! only touched by [`publish`] once every track exists, so a failed run leaves
//! the previous run's tracks and manifest together and untouched.

use crate::engine::AudioEngine;
use crate::error::{Result, SpriteError};
use crate::order::SpriteOrder;
use crate::workspace::RunWorkspace;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use taped_common::config::IntegrityPolicy;
use taped_common::timing::{secs_to_ms, QUANTUM_MS};
use tracing::{debug, info, warn};

/// One sprite track to produce; the engine picks the encoding from the extension
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpriteTarget {
    pub path: PathBuf,
}

impl SpriteTarget {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<dir>/<name>.<format>` for every format
    pub fn for_formats(dir: &Path, name: &str, formats: &[String]) -> Vec<Self> {
        formats
            .iter()
            .map(|format| Self::new(dir.join(format!("{}.{}", name, format.trim_start_matches('.')))))
            .collect()
    }
}

/// A sprite track written into the run workspace
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpriteArtifact {
    /// Final location in the output directory
    pub path: PathBuf,
    /// Where the track sits until it is published
    pub staged: PathBuf,
    pub measured_ms: u64,
}

/// Concatenation driver
pub struct SpriteAssembler<'a> {
    engine: &'a dyn AudioEngine,
    workspace: &'a RunWorkspace,
    policy: IntegrityPolicy,
}

impl<'a> SpriteAssembler<'a> {
    pub fn new(engine: &'a dyn AudioEngine, workspace: &'a RunWorkspace, policy: IntegrityPolicy) -> Self {
        Self {
            engine,
            workspace,
            policy,
        }
    }

    /// Write one staged sprite per target.
    ///
    /// An empty order writes nothing: there is no audio to encode.
    pub async fn assemble(&self, order: &SpriteOrder, targets: &[SpriteTarget]) -> Result<Vec<SpriteArtifact>> {
        if order.is_empty() {
            info!("No clips to concatenate, sprite tracks skipped");
            return Ok(Vec::new());
        }

        let inputs = order.paths();
        let expected_ms = order.total_ms();
        let mut artifacts = Vec::with_capacity(targets.len());

        for (index, target) in targets.iter().enumerate() {
            let staged = self.workspace.sprite_path(index, &target.path);
            info!(
                path = %target.path.display(),
                clips = inputs.len(),
                "Concatenating sprite"
            );
            self.engine.concat(&inputs, &staged).await?;

            let measured_ms = secs_to_ms(self.engine.duration_secs(&staged).await?)?;
            self.check_length(&target.path, expected_ms, measured_ms)?;

            artifacts.push(SpriteArtifact {
                path: target.path.clone(),
                staged,
                measured_ms,
            });
        }
        Ok(artifacts)
    }

    /// Encoders may add a little padding; more than one quantum means the
    /// manifest no longer describes the track.
    fn check_length(&self, path: &Path, expected_ms: u64, measured_ms: u64) -> Result<()> {
        if expected_ms.abs_diff(measured_ms) <= QUANTUM_MS {
            return Ok(());
        }
        match self.policy {
            IntegrityPolicy::Warn => {
                warn!(
                    path = %path.display(),
                    expected_ms,
                    measured_ms,
                    "Sprite length differs from manifest"
                );
                Ok(())
            }
            IntegrityPolicy::Fatal | IntegrityPolicy::Exclude => Err(SpriteError::SpriteDuration {
                path: path.to_path_buf(),
                expected_ms,
                actual_ms: measured_ms,
            }),
        }
    }
}

/// Move staged tracks into the output directory
pub async fn publish(artifacts: &[SpriteArtifact]) -> Result<()> {
    for artifact in artifacts {
        move_into_place(&artifact.staged, &artifact.path).await?;
        debug!(path = %artifact.path.display(), "Sprite track published");
    }
    Ok(())
}

/// Remove tracks a previous run left at the target paths, so an empty
/// manifest is never paired with an old sprite
pub async fn remove_stale(targets: &[SpriteTarget]) -> Result<()> {
    for target in targets {
        match tokio::fs::remove_file(&target.path).await {
            Ok(()) => info!(path = %target.path.display(), "Removed sprite track from previous run"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

/// Rename, or copy through a sibling temp file when the workspace lives on
/// another filesystem
async fn move_into_place(from: &Path, to: &Path) -> Result<()> {
    if tokio::fs::rename(from, to).await.is_ok() {
        return Ok(());
    }

    let mut tmp_name: OsString = to.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    tmp_name.push(".tmp");
    let tmp = to.with_file_name(tmp_name);

    tokio::fs::copy(from, &tmp).await?;
    if let Err(e) = tokio::fs::rename(&tmp, to).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(e.into());
    }
    Ok(())
}
