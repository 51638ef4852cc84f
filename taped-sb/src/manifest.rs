//! Manifest builder
//!
//! Folds the sprite order into a [`SpriteManifest`] and writes it next to the
//! sprite tracks.

use crate::error::{Result, SpriteError, Stage};
use crate::order::SpriteOrder;
use std::path::Path;
use taped_common::{ManifestFormat, SpriteManifest};
use tracing::info;

/// Build the manifest for a sprite order: cursor starts at 0 and advances by
/// each clip's duration.
pub fn build(order: &SpriteOrder) -> SpriteManifest {
    SpriteManifest::from_durations(
        order
            .clips()
            .iter()
            .map(|clip| (clip.identity.clone(), clip.duration_ms)),
    )
}

/// Write the manifest atomically (temp file in the same directory + rename)
pub async fn write(manifest: &SpriteManifest, format: ManifestFormat, path: &Path) -> Result<()> {
    manifest.validate()?;
    let json = manifest.to_json(format)?;

    let file_name = path
        .file_name()
        .ok_or_else(|| SpriteError::engine(Stage::Manifest, path.display(), "manifest path has no file name"))?;
    let mut tmp_name = file_name.to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    tokio::fs::write(&tmp_path, json.as_bytes()).await?;
    if let Err(e) = tokio::fs::rename(&tmp_path, path).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(e.into());
    }

    info!(
        path = %path.display(),
        clips = manifest.len(),
        total_ms = manifest.total_ms(),
        format = %format,
        "Manifest written"
    );
    Ok(())
}
