//! Sprite manifest model
//!
//! The manifest maps each clip identity to its slot inside the combined sprite
//! track. Slots are built by folding over the sprite order with a running
//! cursor, so they are contiguous and start at zero:
//!
//! ```rust
//! use taped_common::{ClipIdentity, ManifestFormat, SpriteManifest};
//!
//! let clips = [("A", 300), ("B", 1000), ("C", 250)]
//!     .map(|(name, ms)| (ClipIdentity::parse(name).unwrap(), ms));
//! let manifest = SpriteManifest::from_durations(clips);
//!
//! assert_eq!(
//!     manifest.to_json(ManifestFormat::Range).unwrap(),
//!     r#"{"A":[0,300],"B":[300,1300],"C":[1300,1550]}"#
//! );
//! ```
//!
//! Serialization writes entries in sprite order, never re-sorted by key.

use crate::identity::ClipIdentity;
use crate::{Error, Result};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One clip's slot inside the sprite, `[start_ms, end_ms)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    pub identity: ClipIdentity,
    pub start_ms: u64,
    pub end_ms: u64,
}

impl ManifestEntry {
    pub fn duration_ms(&self) -> u64 {
        self.end_ms - self.start_ms
    }
}

/// Manifest value layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ManifestFormat {
    /// `[start_ms, end_ms]`
    #[default]
    Range,
    /// `[start_ms, duration_ms]`, the Howler.js sprite convention
    Howler,
}

impl FromStr for ManifestFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "range" => Ok(Self::Range),
            "howler" => Ok(Self::Howler),
            other => Err(Error::InvalidInput(format!(
                "Unknown manifest format '{}' (expected 'range' or 'howler')",
                other
            ))),
        }
    }
}

impl fmt::Display for ManifestFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Range => f.write_str("range"),
            Self::Howler => f.write_str("howler"),
        }
    }
}

/// Ordered mapping from clip identity to its sprite slot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpriteManifest {
    entries: Vec<ManifestEntry>,
}

impl SpriteManifest {
    /// Fold `(identity, duration_ms)` pairs, in sprite order, into slots
    pub fn from_durations<I>(clips: I) -> Self
    where
        I: IntoIterator<Item = (ClipIdentity, u64)>,
    {
        let mut cursor = 0u64;
        let entries = clips
            .into_iter()
            .map(|(identity, duration_ms)| {
                let entry = ManifestEntry {
                    identity,
                    start_ms: cursor,
                    end_ms: cursor + duration_ms,
                };
                cursor = entry.end_ms;
                entry
            })
            .collect();
        Self { entries }
    }

    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// End of the last slot, i.e. the expected sprite length
    pub fn total_ms(&self) -> u64 {
        self.entries.last().map(|e| e.end_ms).unwrap_or(0)
    }

    pub fn get(&self, identity: &ClipIdentity) -> Option<&ManifestEntry> {
        self.entries.iter().find(|e| &e.identity == identity)
    }

    /// Check contiguity: first slot starts at zero, each slot starts where
    /// the previous one ended, identities are unique.
    pub fn validate(&self) -> Result<()> {
        let mut expected_start = 0u64;
        let mut seen = std::collections::HashSet::new();

        for entry in &self.entries {
            if entry.start_ms != expected_start {
                return Err(Error::InvalidInput(format!(
                    "Manifest gap at '{}': starts at {}ms, expected {}ms",
                    entry.identity, entry.start_ms, expected_start
                )));
            }
            if entry.end_ms < entry.start_ms {
                return Err(Error::InvalidInput(format!(
                    "Manifest slot '{}' ends before it starts",
                    entry.identity
                )));
            }
            if !seen.insert(&entry.identity) {
                return Err(Error::InvalidInput(format!(
                    "Duplicate manifest identity '{}'",
                    entry.identity
                )));
            }
            expected_start = entry.end_ms;
        }
        Ok(())
    }

    /// Serialize as a compact JSON object in sprite order
    pub fn to_json(&self, format: ManifestFormat) -> Result<String> {
        Ok(serde_json::to_string(&ManifestJson {
            manifest: self,
            format,
        })?)
    }
}

struct ManifestJson<'a> {
    manifest: &'a SpriteManifest,
    format: ManifestFormat,
}

impl Serialize for ManifestJson<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.manifest.len()))?;
        for entry in &self.manifest.entries {
            let value = match self.format {
                ManifestFormat::Range => [entry.start_ms, entry.end_ms],
                ManifestFormat::Howler => [entry.start_ms, entry.duration_ms()],
            };
            map.serialize_entry(entry.identity.as_str(), &value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest(clips: &[(&str, u64)]) -> SpriteManifest {
        SpriteManifest::from_durations(
            clips
                .iter()
                .map(|(name, ms)| (ClipIdentity::parse(name).unwrap(), *ms)),
        )
    }

    #[test]
    fn test_three_clip_fold() {
        let m = manifest(&[("A", 300), ("B", 1000), ("C", 250)]);
        let slots: Vec<(u64, u64)> = m.entries().iter().map(|e| (e.start_ms, e.end_ms)).collect();
        assert_eq!(slots, vec![(0, 300), (300, 1300), (1300, 1550)]);
        assert_eq!(m.total_ms(), 1550);
        m.validate().unwrap();
    }

    #[test]
    fn test_empty_manifest() {
        let m = manifest(&[]);
        assert!(m.is_empty());
        assert_eq!(m.total_ms(), 0);
        assert_eq!(m.to_json(ManifestFormat::Range).unwrap(), "{}");
        m.validate().unwrap();
    }

    #[test]
    fn test_json_keeps_sprite_order_not_key_order() {
        let m = manifest(&[("zeta", 100), ("alpha", 200)]);
        assert_eq!(
            m.to_json(ManifestFormat::Range).unwrap(),
            r#"{"zeta":[0,100],"alpha":[100,300]}"#
        );
    }

    #[test]
    fn test_howler_format_uses_durations() {
        let m = manifest(&[("A", 300), ("B", 1000)]);
        assert_eq!(
            m.to_json(ManifestFormat::Howler).unwrap(),
            r#"{"A":[0,300],"B":[300,1000]}"#
        );
    }

    #[test]
    fn test_sum_of_slots_equals_sum_of_durations() {
        let durations = [100u64, 700, 2300, 400, 100];
        let clips: Vec<(String, u64)> = durations
            .iter()
            .enumerate()
            .map(|(i, ms)| (format!("clip{}", i), *ms))
            .collect();
        let m = SpriteManifest::from_durations(
            clips
                .iter()
                .map(|(n, ms)| (ClipIdentity::parse(n).unwrap(), *ms)),
        );
        let slot_sum: u64 = m.entries().iter().map(|e| e.duration_ms()).sum();
        assert_eq!(slot_sum, durations.iter().sum::<u64>());
        assert_eq!(slot_sum, m.total_ms());
    }

    #[test]
    fn test_validate_detects_duplicates() {
        let m = manifest(&[("A", 100), ("A", 100)]);
        assert!(m.validate().is_err());
    }

    #[test]
    fn test_manifest_format_parsing() {
        assert_eq!("range".parse::<ManifestFormat>().unwrap(), ManifestFormat::Range);
        assert_eq!("Howler".parse::<ManifestFormat>().unwrap(), ManifestFormat::Howler);
        assert!("csv".parse::<ManifestFormat>().is_err());
        assert_eq!(ManifestFormat::default().to_string(), "range");
    }
}
