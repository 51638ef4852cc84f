//! Clip identities
//!
//! A clip identity is the sprite key for one source clip: its path relative to
//! the input root, extension dropped, with directory components joined by
//! [`DELIMITER`]. Characters that would make the identity ambiguous are
//! percent-escaped inside each component before joining:
//!
//! | literal | escaped |
//! |---------|---------|
//! | `%`     | `%25`   |
//! | `/`     | `%2F`   |
//!
//! so an identity always decodes back to exactly one relative path, and clips
//! with the same base name in different directories never collide.
//!
//! Identities order by [`ClipIdentity::collate`], a locale-style comparison
//! (accents and case ignored at the first level, raw bytes breaking ties).
//! This order decides where each clip lands inside the sprite.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Separator between directory components inside an identity
pub const DELIMITER: char = '/';

/// Canonical sprite key for one clip
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ClipIdentity(String);

impl ClipIdentity {
    /// Derive the identity of a clip from its path relative to the input root.
    ///
    /// The extension of the final component is dropped. Fails for empty paths,
    /// paths that leave the root (`..`, absolute paths) and non-UTF-8 names.
    pub fn from_relative_path(relative: &Path) -> Result<Self> {
        let mut parts: Vec<String> = Vec::new();
        let mut components = relative.components().peekable();

        while let Some(component) = components.next() {
            let name = match component {
                Component::Normal(name) => name,
                Component::CurDir => continue,
                _ => {
                    return Err(Error::InvalidInput(format!(
                        "Clip path must be relative to the input root: {}",
                        relative.display()
                    )))
                }
            };

            let name = if components.peek().is_none() {
                Path::new(name).file_stem().unwrap_or(name)
            } else {
                name
            };

            let name = name.to_str().ok_or_else(|| {
                Error::InvalidInput(format!(
                    "Clip path is not valid UTF-8: {}",
                    relative.display()
                ))
            })?;
            parts.push(escape_component(name));
        }

        if parts.is_empty() {
            return Err(Error::InvalidInput("Clip path is empty".to_string()));
        }

        Ok(Self(parts.join(&DELIMITER.to_string())))
    }

    /// Parse an already-encoded identity (e.g. a manifest key)
    pub fn parse(encoded: &str) -> Result<Self> {
        if encoded.is_empty() {
            return Err(Error::InvalidInput("Clip identity is empty".to_string()));
        }
        for part in encoded.split(DELIMITER) {
            if part.is_empty() {
                return Err(Error::InvalidInput(format!(
                    "Clip identity has an empty component: {}",
                    encoded
                )));
            }
            unescape_component(part)?;
        }
        Ok(Self(encoded.to_string()))
    }

    /// Encoded identity string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Decoded path components (directories then base name)
    pub fn components(&self) -> Vec<String> {
        self.0
            .split(DELIMITER)
            .map(|part| unescape_component(part).unwrap_or_else(|_| part.to_string()))
            .collect()
    }

    /// Relative path this identity was derived from, without extension
    pub fn to_relative_path(&self) -> PathBuf {
        self.components().into_iter().collect()
    }

    /// Flat file name stem for per-clip artifacts.
    ///
    /// Injective: distinct identities always yield distinct stems.
    pub fn artifact_stem(&self) -> String {
        self.0.replace('%', "%25").replace(DELIMITER, "%2F")
    }

    /// Primary collation key: compatibility-decomposed, marks stripped, lowercased
    pub fn collation_key(&self) -> String {
        self.0
            .nfkd()
            .filter(|c| !is_combining_mark(*c))
            .flat_map(char::to_lowercase)
            .collect()
    }

    /// Locale-style comparison used to order clips inside a sprite.
    ///
    /// Identities equal under [`collation_key`](Self::collation_key) fall back
    /// to case, lowercase first (`click` before `Click`), then to raw bytes,
    /// so the order is total.
    pub fn collate(&self, other: &Self) -> Ordering {
        self.collation_key()
            .cmp(&other.collation_key())
            .then_with(|| case_key(&self.0).cmp(&case_key(&other.0)))
            .then_with(|| self.0.cmp(&other.0))
    }
}

impl Ord for ClipIdentity {
    fn cmp(&self, other: &Self) -> Ordering {
        self.collate(other)
    }
}

impl PartialOrd for ClipIdentity {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for ClipIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ClipIdentity {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<ClipIdentity> for String {
    fn from(value: ClipIdentity) -> Self {
        value.0
    }
}

/// Swap case so lowercase letters sort ahead of their uppercase forms
fn case_key(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if c.is_uppercase() {
            out.extend(c.to_lowercase());
        } else {
            out.extend(c.to_uppercase());
        }
    }
    out
}

fn escape_component(name: &str) -> String {
    name.replace('%', "%25").replace(DELIMITER, "%2F")
}

fn unescape_component(part: &str) -> Result<String> {
    let mut out = String::with_capacity(part.len());
    let mut rest = part;

    while let Some(pos) = rest.find('%') {
        out.push_str(&rest[..pos]);
        let escape = rest.get(pos..pos + 3);
        match escape {
            Some("%25") => out.push('%'),
            Some("%2F") => out.push(DELIMITER),
            _ => {
                return Err(Error::InvalidInput(format!(
                    "Invalid escape sequence in clip identity component: {}",
                    part
                )))
            }
        }
        rest = &rest[pos + 3..];
    }
    out.push_str(rest);
    Ok(out)
}
