//! Run workspace
//!
//! One temporary directory per run, holding every intermediate artifact:
//!
//! ```text
//! taped_XXXXXX/
//!     scratch/<stem>.wav   normalize pass output, removed once the clip is fitted
//!     clips/<stem>.wav     final quantized clip, input to concatenation
//!     sprites/<n>_<file>   sprite track, moved to the output directory once
//!                          every track of the run is written
//! ```
//!
//! The directory is removed when the workspace is dropped, on success, error
//! and cancellation alike. File stems come from
//! [`taped_common::ClipIdentity::artifact_stem`], so concurrent clips never
//! share a file.

use crate::error::Result;
use std::path::{Path, PathBuf};
use taped_common::ClipIdentity;
use tempfile::TempDir;
use tracing::{debug, warn};

const PREFIX: &str = "taped_";
const SCRATCH_DIR: &str = "scratch";
const CLIPS_DIR: &str = "clips";
const SPRITES_DIR: &str = "sprites";

/// Intermediate artifact format; WAV keeps the pad/trim step sample-exact
const ARTIFACT_EXTENSION: &str = "wav";

/// Temporary directory owned by one pipeline run
#[derive(Debug)]
pub struct RunWorkspace {
    dir: TempDir,
}

impl RunWorkspace {
    /// Create the workspace under the system temp directory
    pub fn create() -> Result<Self> {
        let dir = tempfile::Builder::new().prefix(PREFIX).tempdir()?;
        Self::init(dir)
    }

    /// Create the workspace under `parent`
    pub fn create_in(parent: &Path) -> Result<Self> {
        let dir = tempfile::Builder::new().prefix(PREFIX).tempdir_in(parent)?;
        Self::init(dir)
    }

    fn init(dir: TempDir) -> Result<Self> {
        std::fs::create_dir(dir.path().join(SCRATCH_DIR))?;
        std::fs::create_dir(dir.path().join(CLIPS_DIR))?;
        std::fs::create_dir(dir.path().join(SPRITES_DIR))?;
        debug!(workspace = %dir.path().display(), "Run workspace created");
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Normalize-pass output for a clip
    pub fn scratch_path(&self, identity: &ClipIdentity) -> PathBuf {
        self.artifact(SCRATCH_DIR, identity)
    }

    /// Final quantized artifact for a clip
    pub fn clip_path(&self, identity: &ClipIdentity) -> PathBuf {
        self.artifact(CLIPS_DIR, identity)
    }

    /// Staging location for the `index`-th sprite track. Keeps the target's
    /// file name (and so its extension, which selects the encoding).
    pub fn sprite_path(&self, index: usize, target: &Path) -> PathBuf {
        let name = target
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "sprite".to_string());
        self.dir.path().join(SPRITES_DIR).join(format!("{}_{}", index, name))
    }

    fn artifact(&self, sub: &str, identity: &ClipIdentity) -> PathBuf {
        self.dir
            .path()
            .join(sub)
            .join(format!("{}.{}", identity.artifact_stem(), ARTIFACT_EXTENSION))
    }

    /// Remove the directory now, reporting failure instead of ignoring it
    pub fn close(self) -> Result<()> {
        let path = self.dir.path().to_path_buf();
        self.dir.close()?;
        debug!(workspace = %path.display(), "Run workspace removed");
        Ok(())
    }
}

/// Best-effort removal of an intermediate file
pub async fn discard(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        warn!(path = %path.display(), error = %e, "Failed to remove intermediate file");
    }
}
