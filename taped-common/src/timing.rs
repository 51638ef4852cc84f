//! Duration quantization for sprite clips
//!
//! Every clip placed into a sprite has a duration that is an exact multiple of
//! [`QUANTUM_MS`]. Manifest offsets are then sums of whole quanta, so a player
//! can seek with integer millisecond math and no floating point drift.
//!
//! # Conversion Flow
//!
//! ```text
//! Engine measurement (f64 seconds)
//!     ↓
//! secs_to_micros() → whole microseconds (float noise removed)
//!     ↓
//! quantize_secs() → ceiling to the next 100 ms (u64 milliseconds)
//!     ↓
//! ms_to_secs_arg() → "1.300" for the engine's trim argument
//! ```
//!
//! # Examples
//!
//! ```rust
//! use taped_common::timing::*;
//!
//! assert_eq!(quantize_secs(0.3).unwrap(), 300);
//! assert_eq!(quantize_secs(0.301).unwrap(), 400);
//! assert_eq!(quantize_secs(1.0).unwrap(), 1000);
//! assert_eq!(ms_to_secs_arg(1300), "1.300");
//! ```

use crate::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Quantization grain: every clip duration is a multiple of this value
pub const QUANTUM_MS: u64 = 100;

/// Microseconds per second
pub const MICROS_PER_SEC: f64 = 1_000_000.0;

const MICROS_PER_MS: u64 = 1_000;

// ============================================================================
// Conversions
// ============================================================================

/// Convert engine-reported seconds to whole microseconds.
///
/// Engines print durations with a fixed number of decimals, so rounding to the
/// microsecond removes binary float noise (`0.3 * 1e6` is `299999.99999999994`)
/// without changing any real measurement.
pub fn secs_to_micros(secs: f64) -> Result<u64> {
    if !secs.is_finite() || secs < 0.0 {
        return Err(Error::InvalidInput(format!(
            "Duration must be a finite non-negative number of seconds, got {}",
            secs
        )));
    }
    let micros = (secs * MICROS_PER_SEC).round();
    if micros > u64::MAX as f64 {
        return Err(Error::InvalidInput(format!("Duration out of range: {}s", secs)));
    }
    Ok(micros as u64)
}

/// Convert seconds to milliseconds, rounding to the nearest millisecond.
///
/// Used when comparing a measured artifact against its quantized target.
pub fn secs_to_ms(secs: f64) -> Result<u64> {
    let micros = secs_to_micros(secs)?;
    Ok((micros + MICROS_PER_MS / 2) / MICROS_PER_MS)
}

/// Round a measured duration up to the next [`QUANTUM_MS`] boundary.
///
/// Returns milliseconds. A duration already on a boundary is unchanged; zero
/// stays zero.
pub fn quantize_secs(secs: f64) -> Result<u64> {
    let micros = secs_to_micros(secs)?;
    let quantum_micros = QUANTUM_MS * MICROS_PER_MS;
    Ok(micros.div_ceil(quantum_micros) * QUANTUM_MS)
}

/// Format milliseconds as a seconds argument with millisecond precision.
pub fn ms_to_secs_arg(ms: u64) -> String {
    format!("{}.{:03}", ms / 1000, ms % 1000)
}

/// Check the quantization invariant
pub fn is_quantized(ms: u64) -> bool {
    ms % QUANTUM_MS == 0
}
