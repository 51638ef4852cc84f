//! taped-sb library interface
//!
//! Builds an audio sprite: every clip under an input directory is normalized,
//! quantized to a 100 ms grid and concatenated into one track per encoding,
//! with a JSON manifest giving each clip's `[start, end)` offsets.
//!
//! Exposes the pipeline stages individually for integration testing.

pub mod assembler;
pub mod config;
pub mod discovery;
pub mod engine;
pub mod error;
pub mod manifest;
pub mod normalizer;
pub mod order;
pub mod pipeline;
pub mod workspace;

pub use crate::engine::{AudioEngine, SoxEngine};
pub use crate::error::{Result, SpriteError, Stage};
pub use crate::pipeline::{PipelineSettings, RunSummary, SpritePipeline};
