//! Clip normalizer
//!
//! Turns each discovered clip into a [`NormalizedClip`] whose duration is an
//! exact multiple of [`QUANTUM_MS`]:
//!
//! 1. normalize pass (resample, trim silence, normalize, gain) → scratch file
//! 2. measure the scratch file
//! 3. quantize: ceiling to the next 100 ms
//! 4. pad with silence and trim to exactly the quantized length → clip file
//! 5. re-measure and compare against the target
//!
//! Step 5 is what keeps the manifest honest: a clip that is even one
//! millisecond off shifts every later slot in the sprite. What happens on a
//! mismatch is decided by [`IntegrityPolicy`].
//!
//! Clips are independent, so up to `jobs` of them run concurrently. The first
//! fatal error ends the run; in-flight engine processes are dropped and killed.

use crate::discovery::DiscoveredClip;
use crate::engine::{AudioEngine, FitParams, NormalizeParams};
use crate::error::{Result, SpriteError, Stage};
use crate::workspace::{discard, RunWorkspace};
use futures::stream::{self, StreamExt, TryStreamExt};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use taped_common::config::{IntegrityPolicy, TomlConfig};
use taped_common::timing::{quantize_secs, secs_to_ms, QUANTUM_MS};
use taped_common::ClipIdentity;
use tracing::{debug, info, warn};

/// A clip ready for concatenation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedClip {
    /// Final artifact inside the run workspace
    pub path: PathBuf,
    /// Quantized duration; always a multiple of [`QUANTUM_MS`]
    pub duration_ms: u64,
    pub identity: ClipIdentity,
}

/// Result of normalizing one clip
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClipOutcome {
    Kept(NormalizedClip),
    /// Dropped under [`IntegrityPolicy::Exclude`]
    Excluded {
        identity: ClipIdentity,
        expected_ms: u64,
        actual_ms: u64,
    },
}

/// Result of normalizing a whole input set
#[derive(Debug, Clone, Default)]
pub struct NormalizeReport {
    pub clips: Vec<NormalizedClip>,
    /// Identities dropped for a duration mismatch, sorted
    pub excluded: Vec<ClipIdentity>,
}

/// Normalizer settings
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizerSettings {
    pub params: NormalizeParams,
    pub pad_head_ms: u64,
    pub pad_tail_ms: u64,
    pub policy: IntegrityPolicy,
    /// Maximum clips in flight
    pub jobs: usize,
}

impl NormalizerSettings {
    pub fn from_config(config: &TomlConfig) -> Self {
        Self {
            params: NormalizeParams::from(&config.engine),
            pad_head_ms: config.engine.pad_head_ms,
            pad_tail_ms: config.engine.pad_tail_ms,
            policy: config.run.on_mismatch,
            jobs: config.run.jobs,
        }
    }
}

impl Default for NormalizerSettings {
    fn default() -> Self {
        Self::from_config(&TomlConfig::default())
    }
}

/// Per-clip normalization driver
pub struct ClipNormalizer<'a> {
    engine: &'a dyn AudioEngine,
    workspace: &'a RunWorkspace,
    settings: NormalizerSettings,
}

impl<'a> ClipNormalizer<'a> {
    pub fn new(
        engine: &'a dyn AudioEngine,
        workspace: &'a RunWorkspace,
        settings: NormalizerSettings,
    ) -> Self {
        Self {
            engine,
            workspace,
            settings,
        }
    }

    /// Normalize every clip, up to `jobs` at a time
    pub async fn normalize_all(&self, clips: &[DiscoveredClip]) -> Result<NormalizeReport> {
        let total = clips.len();
        let processed = AtomicUsize::new(0);
        let processed = &processed;

        let outcomes: Vec<ClipOutcome> = stream::iter(clips)
            .map(|clip| async move {
                let outcome = self.normalize_clip(clip).await?;

                let current = processed.fetch_add(1, Ordering::Relaxed) + 1;
                if current % 10 == 0 || current == total {
                    info!(current, total, "Normalize progress");
                }
                Ok::<_, SpriteError>(outcome)
            })
            .buffer_unordered(self.settings.jobs.max(1))
            .try_collect()
            .await?;

        let mut report = NormalizeReport::default();
        for outcome in outcomes {
            match outcome {
                ClipOutcome::Kept(clip) => report.clips.push(clip),
                ClipOutcome::Excluded { identity, .. } => report.excluded.push(identity),
            }
        }
        report.excluded.sort();
        Ok(report)
    }

    /// Run the full normalize → measure → quantize → pad/trim → verify chain
    pub async fn normalize_clip(&self, clip: &DiscoveredClip) -> Result<ClipOutcome> {
        let identity = &clip.identity;
        let scratch = self.workspace.scratch_path(identity);
        let final_path = self.workspace.clip_path(identity);

        debug!(identity = %identity, source = %clip.path.display(), "Normalizing clip");

        self.engine
            .normalize(&clip.path, &scratch, &self.settings.params)
            .await
            .map_err(|e| e.for_clip(identity))?;

        let measured = self
            .engine
            .duration_secs(&scratch)
            .await
            .map_err(|e| e.for_clip(identity))?;

        // A clip trimmed down to nothing still occupies one quantum of silence
        let target_ms = quantize_secs(measured)
            .map_err(|e| SpriteError::engine(Stage::Measure, identity, e.to_string()))?
            .max(QUANTUM_MS);

        let fit = FitParams {
            pad_head_ms: self.settings.pad_head_ms,
            pad_tail_ms: self.settings.pad_tail_ms,
            target_ms,
        };
        self.engine
            .fit_duration(&scratch, &final_path, &fit)
            .await
            .map_err(|e| e.for_clip(identity))?;
        discard(&scratch).await;

        let actual_secs = self
            .engine
            .duration_secs(&final_path)
            .await
            .map_err(|e| e.for_clip(identity))?;
        let actual_ms = secs_to_ms(actual_secs)
            .map_err(|e| SpriteError::engine(Stage::Verify, identity, e.to_string()))?;

        debug!(
            identity = %identity,
            measured_secs = measured,
            duration_ms = target_ms,
            "Clip quantized"
        );

        if actual_ms == target_ms {
            return Ok(ClipOutcome::Kept(NormalizedClip {
                path: final_path,
                duration_ms: target_ms,
                identity: identity.clone(),
            }));
        }

        match self.settings.policy {
            IntegrityPolicy::Fatal => Err(SpriteError::DurationMismatch {
                identity: identity.clone(),
                expected_ms: target_ms,
                actual_ms,
            }),
            IntegrityPolicy::Exclude => {
                warn!(
                    identity = %identity,
                    expected_ms = target_ms,
                    actual_ms,
                    "Duration mismatch, clip excluded from sprite"
                );
                discard(&final_path).await;
                Ok(ClipOutcome::Excluded {
                    identity: identity.clone(),
                    expected_ms: target_ms,
                    actual_ms,
                })
            }
            IntegrityPolicy::Warn => {
                warn!(
                    identity = %identity,
                    expected_ms = target_ms,
                    actual_ms,
                    "Duration mismatch, later sprite offsets may drift"
                );
                Ok(ClipOutcome::Kept(NormalizedClip {
                    path: final_path,
                    duration_ms: target_ms,
                    identity: identity.clone(),
                }))
            }
        }
    }
}
