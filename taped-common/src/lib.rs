//! # taped Common Library
//!
//! Shared code for the taped audio sprite tools including:
//! - Error types
//! - TOML configuration model
//! - Clip identities and their collation order
//! - Duration quantization
//! - Sprite manifest model and serialization

pub mod config;
pub mod error;
pub mod identity;
pub mod manifest;
pub mod timing;

pub use error::{Error, Result};
pub use identity::ClipIdentity;
pub use manifest::{ManifestFormat, SpriteManifest};
