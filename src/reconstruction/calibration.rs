// Copyright (c) 2026 muondaq contributors
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/muondaq/muondaq

//! Timing-to-distance calibration
//!
//! The true r-t relation is hardware-dependent. The reconstructor takes the
//! mapping as an injected function so it can be swapped without touching the
//! fitting logic.

use std::sync::Arc;

/// Maps a (time-of-flight, time-over-threshold) pair to a drift radius in
/// detector units.
pub type CalibrationFn = Arc<dyn Fn(f64, f64) -> f64 + Send + Sync>;

/// Placeholder logistic calibration.
///
/// Saturates into (0, 1), i.e. at most one tube pitch.
// TODO: replace with the measured sMDT r-t relation once calibration data
// from the chambers exists.
pub fn default_calibration() -> CalibrationFn {
    Arc::new(|tof, tot| {
        let poly = -2.0 + 2e-2 * tof + 2e-2 * tot;
        1.0 / (1.0 + (-poly).exp())
    })
}
