//! Sprite order
//!
//! The order of clips inside the sprite is computed exactly once. Both the
//! assembler (which concatenates artifact paths) and the manifest builder
//! (which folds durations into offsets) take a [`SpriteOrder`], and there is no
//! other way to hand them a clip list, so the two can never disagree.

use crate::normalizer::NormalizedClip;
use std::path::PathBuf;

/// Normalized clips sorted by [`taped_common::ClipIdentity::collate`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpriteOrder {
    clips: Vec<NormalizedClip>,
}

impl SpriteOrder {
    /// Sort clips into sprite order
    pub fn new(mut clips: Vec<NormalizedClip>) -> Self {
        clips.sort_by(|a, b| a.identity.collate(&b.identity));
        Self { clips }
    }

    pub fn clips(&self) -> &[NormalizedClip] {
        &self.clips
    }

    pub fn len(&self) -> usize {
        self.clips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    /// Artifact paths in concatenation order
    pub fn paths(&self) -> Vec<PathBuf> {
        self.clips.iter().map(|c| c.path.clone()).collect()
    }

    /// Sum of clip durations, i.e. the expected sprite length
    pub fn total_ms(&self) -> u64 {
        self.clips.iter().map(|c| c.duration_ms).sum()
    }
}
