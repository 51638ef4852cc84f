//! Clip discovery
//!
//! Recursive enumeration of source clips under an input root. Symbolic links
//! are followed; any traversal error (unreadable directory, symlink loop,
//! non-UTF-8 name) aborts discovery, since a silently skipped clip would
//! change every later offset in the sprite.

use crate::error::{Result, SpriteError};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use taped_common::ClipIdentity;
use tracing::debug;
use walkdir::WalkDir;

/// File extensions accepted as clips (compared case-insensitively)
pub const ACCEPTED_EXTENSIONS: &[&str] = &["wav", "mp3"];

/// A source clip found under the input root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredClip {
    /// Absolute path to the source file
    pub path: PathBuf,
    /// Path relative to the input root
    pub relative: PathBuf,
    pub identity: ClipIdentity,
}

/// Clip scanner
#[derive(Debug, Clone)]
pub struct ClipScanner {
    extensions: Vec<String>,
}

impl ClipScanner {
    /// Scanner accepting [`ACCEPTED_EXTENSIONS`]
    pub fn new() -> Self {
        Self {
            extensions: ACCEPTED_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
        }
    }

    /// Scan the input root for clips.
    ///
    /// Results are sorted by path. Sprite order is decided later by
    /// [`crate::order::SpriteOrder`], never by this list.
    pub fn scan(&self, root: &Path) -> Result<Vec<DiscoveredClip>> {
        if !root.exists() {
            return Err(SpriteError::PathNotFound(root.to_path_buf()));
        }
        if !root.is_dir() {
            return Err(SpriteError::NotADirectory(root.to_path_buf()));
        }
        let root = absolute_root(root)?;

        let mut clips = Vec::new();
        let mut seen: HashMap<ClipIdentity, PathBuf> = HashMap::new();

        for entry in WalkDir::new(&root).follow_links(true) {
            let entry = entry.map_err(|e| SpriteError::Discovery {
                path: e.path().map(Path::to_path_buf).unwrap_or_else(|| root.clone()),
                message: e.to_string(),
            })?;

            if !entry.file_type().is_file() || !self.is_accepted(entry.path()) {
                continue;
            }

            let path = entry.path().to_path_buf();
            let relative = path
                .strip_prefix(&root)
                .map_err(|e| SpriteError::Discovery {
                    path: path.clone(),
                    message: e.to_string(),
                })?
                .to_path_buf();
            let identity =
                ClipIdentity::from_relative_path(&relative).map_err(|e| SpriteError::Discovery {
                    path: path.clone(),
                    message: e.to_string(),
                })?;

            if let Some(first) = seen.insert(identity.clone(), path.clone()) {
                return Err(SpriteError::DuplicateIdentity {
                    identity,
                    first,
                    second: path,
                });
            }

            debug!(identity = %identity, path = %path.display(), "Discovered clip");
            clips.push(DiscoveredClip {
                path,
                relative,
                identity,
            });
        }

        clips.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(clips)
    }

    fn is_accepted(&self, path: &Path) -> bool {
        path.extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .map(|ext| self.extensions.iter().any(|accepted| *accepted == ext))
            .unwrap_or(false)
    }
}

impl Default for ClipScanner {
    fn default() -> Self {
        Self::new()
    }
}

fn absolute_root(root: &Path) -> Result<PathBuf> {
    if root.is_absolute() {
        Ok(root.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(root))
    }
}
