//! WAV-only audio engine for pipeline tests
//!
//! Implements [`AudioEngine`] with `hound` so the full pipeline runs without
//! SoX. Every artifact, whatever its extension, is a mono 16-bit WAV file:
//!
//! - normalize: nearest-neighbour resample, trim samples at or below the
//!   silence threshold from both ends (no loudness change, so each clip keeps
//!   the amplitude it was generated with)
//! - duration: frame count from the WAV header
//! - fit: pad with zeros, truncate to the target length
//! - concat: append samples in order
//!
//! Faults can be injected per source stem (a fitted length skew, or a hard
//! engine failure) and per sprite extension (a failed concatenation).

use async_trait::async_trait;
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use taped_sb::engine::{AudioEngine, FitParams, NormalizeParams};
use taped_sb::{SpriteError, Stage};

/// Source sample rate used by [`write_tone`]
pub const SOURCE_RATE: u32 = 24_000;

#[derive(Default)]
pub struct WavEngine {
    /// Milliseconds added to the fitted length, by source file stem
    fit_skew_ms: HashMap<String, i64>,
    /// Source stems whose normalize pass fails
    failing: Vec<String>,
    /// Sprite extensions whose concatenation fails
    failing_concat: Vec<String>,
    /// Scratch artifact → source stem
    origins: Mutex<HashMap<PathBuf, String>>,
    /// Every concat call, in order
    pub concat_calls: Mutex<Vec<(Vec<PathBuf>, PathBuf)>>,
}

impl WavEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fit_skew(mut self, stem: &str, skew_ms: i64) -> Self {
        self.fit_skew_ms.insert(stem.to_string(), skew_ms);
        self
    }

    pub fn with_failure(mut self, stem: &str) -> Self {
        self.failing.push(stem.to_string());
        self
    }

    pub fn with_concat_failure(mut self, extension: &str) -> Self {
        self.failing_concat.push(extension.to_string());
        self
    }
}

fn spec(rate: u32) -> WavSpec {
    WavSpec {
        channels: 1,
        sample_rate: rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    }
}

fn io_err(stage: Stage, path: &Path, e: hound::Error) -> SpriteError {
    SpriteError::engine(stage, path.display(), e.to_string())
}

fn read(stage: Stage, path: &Path) -> Result<(u32, Vec<i16>), SpriteError> {
    let mut reader = WavReader::open(path).map_err(|e| io_err(stage, path, e))?;
    let rate = reader.spec().sample_rate;
    let samples = reader
        .samples::<i16>()
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| io_err(stage, path, e))?;
    Ok((rate, samples))
}

fn write(stage: Stage, path: &Path, rate: u32, samples: &[i16]) -> Result<(), SpriteError> {
    let mut writer = WavWriter::create(path, spec(rate)).map_err(|e| io_err(stage, path, e))?;
    for sample in samples {
        writer.write_sample(*sample).map_err(|e| io_err(stage, path, e))?;
    }
    writer.finalize().map_err(|e| io_err(stage, path, e))
}

fn stem(path: &Path) -> String {
    path.file_stem().unwrap().to_string_lossy().into_owned()
}

#[async_trait]
impl AudioEngine for WavEngine {
    fn name(&self) -> &str {
        "wav-test"
    }

    async fn normalize(&self, input: &Path, output: &Path, params: &NormalizeParams) -> Result<(), SpriteError> {
        let source = stem(input);
        if self.failing.contains(&source) {
            return Err(SpriteError::engine(Stage::Normalize, input.display(), "injected failure"));
        }

        let (rate, samples) = read(Stage::Normalize, input)?;
        let resampled: Vec<i16> = if rate == params.sample_rate {
            samples
        } else {
            let frames = samples.len() as u64 * params.sample_rate as u64 / rate as u64;
            (0..frames)
                .map(|i| samples[(i * rate as u64 / params.sample_rate as u64) as usize])
                .collect()
        };

        let threshold = (params.silence_threshold_percent / 100.0 * i16::MAX as f64) as i32;
        let loud = |s: &i16| (*s as i32).abs() > threshold;
        let trimmed: Vec<i16> = match (resampled.iter().position(loud), resampled.iter().rposition(loud)) {
            (Some(first), Some(last)) => resampled[first..=last].to_vec(),
            _ => Vec::new(),
        };

        write(Stage::Normalize, output, params.sample_rate, &trimmed)?;
        self.origins.lock().unwrap().insert(output.to_path_buf(), source);
        Ok(())
    }

    async fn duration_secs(&self, path: &Path) -> Result<f64, SpriteError> {
        let reader = WavReader::open(path).map_err(|e| io_err(Stage::Measure, path, e))?;
        Ok(reader.duration() as f64 / reader.spec().sample_rate as f64)
    }

    async fn fit_duration(&self, input: &Path, output: &Path, params: &FitParams) -> Result<(), SpriteError> {
        let (rate, samples) = read(Stage::PadTrim, input)?;
        let per_ms = rate as u64 / 1000;

        let mut padded = vec![0i16; (params.pad_head_ms * per_ms) as usize];
        padded.extend_from_slice(&samples);
        padded.extend(std::iter::repeat(0i16).take((params.pad_tail_ms * per_ms) as usize));

        let origin = self.origins.lock().unwrap().get(input).cloned().unwrap_or_default();
        let skew = self.fit_skew_ms.get(&origin).copied().unwrap_or(0);
        let target_ms = (params.target_ms as i64 + skew).max(0) as u64;

        padded.resize((target_ms * per_ms) as usize, 0);
        write(Stage::PadTrim, output, rate, &padded)
    }

    async fn concat(&self, inputs: &[PathBuf], output: &Path) -> Result<(), SpriteError> {
        self.concat_calls
            .lock()
            .unwrap()
            .push((inputs.to_vec(), output.to_path_buf()));

        let extension = output.extension().map(|e| e.to_string_lossy().into_owned());
        if extension.is_some_and(|e| self.failing_concat.contains(&e)) {
            return Err(SpriteError::engine(Stage::Concat, output.display(), "encoder unavailable"));
        }

        let mut rate = SOURCE_RATE;
        let mut combined = Vec::new();
        for input in inputs {
            let (r, samples) = read(Stage::Concat, input)?;
            rate = r;
            combined.extend(samples);
        }
        write(Stage::Concat, output, rate, &combined)
    }
}

/// Write a source clip: silence, a square wave of `amplitude`, silence
pub fn write_tone(path: &Path, lead_ms: u64, tone_ms: u64, tail_ms: u64, amplitude: i16) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    let per_ms = SOURCE_RATE as u64 / 1000;
    let mut samples = vec![0i16; (lead_ms * per_ms) as usize];
    samples.extend((0..tone_ms * per_ms).map(|i| if (i / 24) % 2 == 0 { amplitude } else { -amplitude }));
    samples.extend(std::iter::repeat(0i16).take((tail_ms * per_ms) as usize));

    let mut writer = WavWriter::create(path, spec(SOURCE_RATE)).unwrap();
    for s in samples {
        writer.write_sample(s).unwrap();
    }
    writer.finalize().unwrap();
}

/// Read a WAV artifact's samples
pub fn read_samples(path: &Path) -> (u32, Vec<i16>) {
    read(Stage::Measure, path).unwrap()
}
