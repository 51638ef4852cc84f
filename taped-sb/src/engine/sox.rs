//! SoX backend
//!
//! Shells out to the `sox` command-line tool:
//!
//! ```text
//! normalize: sox IN OUT rate R silence 1 D T% reverse silence 1 D T% reverse norm L gain G
//! measure:   sox --i -D FILE
//! pad/trim:  sox IN OUT pad H T trim 0 S
//! concat:    sox A B C ... OUT
//! ```
//!
//! Child processes are killed if the pipeline future is dropped, so an
//! aborted run never leaves SoX writing into a removed workspace.

use super::{AudioEngine, FitParams, NormalizeParams};
use crate::error::{Result, SpriteError, Stage};
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use taped_common::timing::ms_to_secs_arg;
use tokio::process::Command;
use tracing::debug;

/// SoX command-line engine
#[derive(Debug, Clone)]
pub struct SoxEngine {
    binary: String,
}

impl SoxEngine {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    /// Check the executable can be started; returns its version line
    pub async fn probe(&self) -> Result<String> {
        let stdout = self
            .run(Stage::Normalize, &self.binary, vec![OsString::from("--version")])
            .await?;
        Ok(stdout.trim().to_string())
    }

    async fn run(&self, stage: Stage, target: impl std::fmt::Display, args: Vec<OsString>) -> Result<String> {
        debug!(stage = %stage, binary = %self.binary, args = ?args, "Running audio engine");

        let output = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    SpriteError::EngineNotFound {
                        stage,
                        binary: self.binary.clone(),
                    }
                } else {
                    SpriteError::engine(stage, &target, format!("failed to start {}: {}", self.binary, e))
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SpriteError::engine(
                stage,
                &target,
                format!("{} exited with {}: {}", self.binary, output.status, stderr.trim()),
            ));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl Default for SoxEngine {
    fn default() -> Self {
        Self::new("sox")
    }
}

#[async_trait]
impl AudioEngine for SoxEngine {
    fn name(&self) -> &str {
        "sox"
    }

    async fn normalize(&self, input: &Path, output: &Path, params: &NormalizeParams) -> Result<()> {
        self.run(Stage::Normalize, input.display(), normalize_args(input, output, params))
            .await?;
        Ok(())
    }

    async fn duration_secs(&self, path: &Path) -> Result<f64> {
        let stdout = self.run(Stage::Measure, path.display(), duration_args(path)).await?;
        parse_duration(&stdout).map_err(|message| SpriteError::engine(Stage::Measure, path.display(), message))
    }

    async fn fit_duration(&self, input: &Path, output: &Path, params: &FitParams) -> Result<()> {
        self.run(Stage::PadTrim, input.display(), fit_args(input, output, params))
            .await?;
        Ok(())
    }

    async fn concat(&self, inputs: &[PathBuf], output: &Path) -> Result<()> {
        self.run(Stage::Concat, output.display(), concat_args(inputs, output))
            .await?;
        Ok(())
    }
}

/// Arguments for the normalize pass.
///
/// Silence is trimmed from the start, the audio reversed, trimmed again and
/// reversed back, which removes trailing silence as well.
pub fn normalize_args(input: &Path, output: &Path, params: &NormalizeParams) -> Vec<OsString> {
    let silence = [
        "silence".to_string(),
        "1".to_string(),
        params.silence_min_duration_secs.to_string(),
        format!("{}%", params.silence_threshold_percent),
    ];

    let mut args: Vec<OsString> = vec![input.into(), output.into()];
    args.push("rate".into());
    args.push(params.sample_rate.to_string().into());
    args.extend(silence.iter().map(OsString::from));
    args.push("reverse".into());
    args.extend(silence.iter().map(OsString::from));
    args.push("reverse".into());
    args.push("norm".into());
    args.push(params.norm_level_db.to_string().into());
    args.push("gain".into());
    args.push(params.gain_db.to_string().into());
    args
}

/// Arguments for a duration query
pub fn duration_args(path: &Path) -> Vec<OsString> {
    vec!["--i".into(), "-D".into(), path.into()]
}

/// Arguments for the pad + trim pass
pub fn fit_args(input: &Path, output: &Path, params: &FitParams) -> Vec<OsString> {
    vec![
        input.into(),
        output.into(),
        "pad".into(),
        ms_to_secs_arg(params.pad_head_ms).into(),
        ms_to_secs_arg(params.pad_tail_ms).into(),
        "trim".into(),
        "0".into(),
        ms_to_secs_arg(params.target_ms).into(),
    ]
}

/// Arguments for concatenation: every input in order, then the output
pub fn concat_args(inputs: &[PathBuf], output: &Path) -> Vec<OsString> {
    inputs
        .iter()
        .map(|p| p.as_os_str().to_os_string())
        .chain(std::iter::once(output.as_os_str().to_os_string()))
        .collect()
}

/// Parse `sox --i -D` output: a single floating point number of seconds
pub fn parse_duration(stdout: &str) -> std::result::Result<f64, String> {
    let text = stdout.trim();
    let secs: f64 = text
        .parse()
        .map_err(|_| format!("unparsable duration output: {:?}", text))?;
    if !secs.is_finite() || secs < 0.0 {
        return Err(format!("invalid duration: {}", text));
    }
    Ok(secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(args: &[OsString]) -> Vec<String> {
        args.iter().map(|a| a.to_string_lossy().into_owned()).collect()
    }

    #[test]
    fn test_normalize_args_default_chain() {
        let params = NormalizeParams::from(&taped_common::config::EngineConfig::default());
        let args = normalize_args(Path::new("in.wav"), Path::new("out.wav"), &params);
        assert_eq!(
            strings(&args).join(" "),
            "in.wav out.wav rate 24000 silence 1 0.01 0% reverse silence 1 0.01 0% reverse norm -0.3 gain -10"
        );
    }

    #[test]
    fn test_fit_args_pad_then_trim() {
        let params = FitParams {
            pad_head_ms: 0,
            pad_tail_ms: 100,
            target_ms: 1300,
        };
        let args = fit_args(Path::new("tmp.wav"), Path::new("final.wav"), &params);
        assert_eq!(
            strings(&args).join(" "),
            "tmp.wav final.wav pad 0.000 0.100 trim 0 1.300"
        );
    }

    #[test]
    fn test_duration_args() {
        assert_eq!(strings(&duration_args(Path::new("a.wav"))), vec!["--i", "-D", "a.wav"]);
    }

    #[test]
    fn test_concat_args_keep_order_and_end_with_output() {
        let inputs = vec![PathBuf::from("b.wav"), PathBuf::from("a.wav")];
        let args = concat_args(&inputs, Path::new("sprite.mp3"));
        assert_eq!(strings(&args), vec!["b.wav", "a.wav", "sprite.mp3"]);
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("1.300000\n").unwrap(), 1.3);
        assert_eq!(parse_duration("  0.000000 ").unwrap(), 0.0);
        assert!(parse_duration("").is_err());
        assert!(parse_duration("sox FAIL formats").is_err());
        assert!(parse_duration("-1").is_err());
        assert!(parse_duration("inf").is_err());
    }

    #[tokio::test]
    async fn test_missing_binary_is_reported() {
        let engine = SoxEngine::new("taped-no-such-engine-binary");
        let result = engine.duration_secs(Path::new("a.wav")).await;
        match result {
            Err(SpriteError::EngineNotFound { stage, binary }) => {
                assert_eq!(stage, Stage::Measure);
                assert_eq!(binary, "taped-no-such-engine-binary");
            }
            other => panic!("Expected EngineNotFound, got {:?}", other),
        }
    }
}
