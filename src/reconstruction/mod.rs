// Copyright (c) 2026 muondaq contributors
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/muondaq/muondaq

//! Track reconstruction - per-chamber line fits and 3D direction
//!
//! Pure and stateless: identical events always reconstruct to identical
//! results, which the tests lean on.

pub mod geometry;

mod calibration;

pub use calibration::{default_calibration, CalibrationFn};

use crate::config::ReconstructionConfig;
use crate::event::{Event, FailureReason, Hit, Reconstruction, LAYERS_PER_CHAMBER};

use geometry::{direction_from_plane_angles, lateral_position, layer_position, spherical_degrees};

/// One hit mapped into chamber-local fit coordinates.
struct FitPoint {
    /// Position along the layer-stacking axis.
    z: f64,
    /// Lateral wire position within the layer.
    lateral: f64,
    /// Calibrated drift radius.
    radius: f64,
}

/// Fits straight-line trajectories to assembled events.
pub struct TrackReconstructor {
    min_layers: u8,
    use_drift_radius: bool,
    calibration: CalibrationFn,
}

impl TrackReconstructor {
    /// Creates a reconstructor with an injected timing-to-distance mapping.
    pub fn new(config: &ReconstructionConfig, calibration: CalibrationFn) -> Self {
        Self {
            min_layers: config.min_layers,
            use_drift_radius: config.use_drift_radius,
            calibration,
        }
    }

    /// Creates a reconstructor with the placeholder calibration.
    pub fn with_default_calibration(config: &ReconstructionConfig) -> Self {
        Self::new(config, default_calibration())
    }

    /// Reconstructs one event. Never fails: unreconstructable events come
    /// back with `success = false` and a reason code.
    pub fn reconstruct(&self, event: &Event) -> Reconstruction {
        let chamber0: Vec<&Hit> = event.hits.iter().filter(|h| h.chamber == 0).collect();
        let chamber1: Vec<&Hit> = event.hits.iter().filter(|h| h.chamber == 1).collect();

        let fit0 = self.fit_chamber(&chamber0);
        let fit1 = self.fit_chamber(&chamber1);

        let mut reconstruction = Reconstruction {
            success: false,
            chamber0_hits: chamber0.len(),
            chamber1_hits: chamber1.len(),
            angle1_deg: fit0.as_ref().ok().map(|a| a.to_degrees()),
            angle2_deg: fit1.as_ref().ok().map(|a| a.to_degrees()),
            theta_deg: None,
            phi_deg: None,
            failure: None,
        };

        match (fit0, fit1) {
            (Ok(angle1), Ok(angle2)) => {
                let direction = direction_from_plane_angles(angle1, angle2);
                let (theta, phi) = spherical_degrees(&direction);
                reconstruction.success = true;
                reconstruction.theta_deg = Some(theta);
                reconstruction.phi_deg = Some(phi);
            }
            (Err(r0), Err(r1)) => {
                reconstruction.failure = Some(combine_reasons(r0, r1));
            }
            (Err(reason), Ok(_)) | (Ok(_), Err(reason)) => {
                reconstruction.failure = Some(reason);
            }
        }

        reconstruction
    }

    /// Fits one chamber, returning the trajectory projection's angle from
    /// the stacking axis in radians.
    fn fit_chamber(&self, hits: &[&Hit]) -> Result<f64, FailureReason> {
        let mut layers_hit = [false; LAYERS_PER_CHAMBER as usize];
        for hit in hits {
            layers_hit[hit.layer as usize] = true;
        }
        let distinct_layers = layers_hit.iter().filter(|&&l| l).count();
        if hits.len() < 2 || distinct_layers < self.min_layers as usize {
            return Err(FailureReason::InsufficientHits);
        }

        let points: Vec<FitPoint> = hits
            .iter()
            .map(|hit| FitPoint {
                z: layer_position(hit.layer),
                lateral: lateral_position(hit.tube_in_layer),
                radius: (self.calibration)(hit.time_of_flight, hit.time_over_threshold),
            })
            .collect();

        let (slope, intercept) =
            ols_line(points.iter().map(|p| (p.z, p.lateral)))
                .ok_or(FailureReason::DegenerateGeometry)?;

        let slope = if self.use_drift_radius {
            self.refit_with_drift(&points, slope, intercept)?
        } else {
            slope
        };

        Ok(slope.atan())
    }

    /// Second fit pass: each wire position is shifted toward the first-pass
    /// line by its drift radius, resolving the left/right ambiguity with the
    /// line's side. Wires already on the line are left in place, so exactly
    /// collinear hits fit identically with or without drift refinement.
    fn refit_with_drift(
        &self,
        points: &[FitPoint],
        slope: f64,
        intercept: f64,
    ) -> Result<f64, FailureReason> {
        let corrected = points.iter().map(|p| {
            let residual = (slope * p.z + intercept) - p.lateral;
            let shift = if residual == 0.0 {
                0.0
            } else {
                residual.signum() * p.radius
            };
            (p.z, p.lateral + shift)
        });
        ols_line(corrected)
            .map(|(m, _)| m)
            .ok_or(FailureReason::DegenerateGeometry)
    }
}

/// Ordinary least squares of lateral offset against layer position.
///
/// Returns `None` when the layer positions carry no variance, where the
/// slope is undefined.
fn ols_line(points: impl Iterator<Item = (f64, f64)> + Clone) -> Option<(f64, f64)> {
    let n = points.clone().count() as f64;
    let mean_z = points.clone().map(|(z, _)| z).sum::<f64>() / n;
    let mean_x = points.clone().map(|(_, x)| x).sum::<f64>() / n;

    let mut szz = 0.0;
    let mut szx = 0.0;
    for (z, x) in points {
        szz += (z - mean_z) * (z - mean_z);
        szx += (z - mean_z) * (x - mean_x);
    }
    if szz < 1e-12 {
        return None;
    }
    let slope = szx / szz;
    Some((slope, mean_x - slope * mean_z))
}

fn combine_reasons(r0: FailureReason, r1: FailureReason) -> FailureReason {
    if r0 == FailureReason::InsufficientHits || r1 == FailureReason::InsufficientHits {
        FailureReason::InsufficientHits
    } else {
        FailureReason::DegenerateGeometry
    }
}
