// Copyright (c) 2026 muondaq contributors
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/muondaq/muondaq

//! Detector geometry - tube positions and coordinate-frame conversion
//!
//! Each chamber stacks 4 layers of 12 tubes along the z axis. Chamber 0
//! measures the track's X-Z projection, chamber 1 is rotated 90 degrees and
//! measures the Y-Z projection.

use nalgebra::Vector3;

use crate::event::TUBES_PER_LAYER;

/// Lateral spacing between adjacent tubes, in detector units.
pub const TUBE_PITCH: f64 = 1.0;

/// Vertical spacing between adjacent layers, in detector units.
pub const LAYER_PITCH: f64 = 1.0;

/// Lateral position of a tube's wire within its layer.
#[inline]
pub fn lateral_position(tube_in_layer: u8) -> f64 {
    tube_in_layer as f64 * TUBE_PITCH
}

/// Position of a layer along the stacking axis.
#[inline]
pub fn layer_position(layer: u8) -> f64 {
    layer as f64 * LAYER_PITCH
}

/// The tube whose wire is closest to a lateral coordinate, if any.
///
/// Tracks passing outside the layer by more than half a pitch miss every
/// tube and return `None`.
pub fn nearest_tube(lateral: f64) -> Option<u8> {
    let index = (lateral / TUBE_PITCH).round();
    if index < 0.0 || index >= TUBES_PER_LAYER as f64 {
        return None;
    }
    Some(index as u8)
}

/// Combines the two per-chamber projection angles into a unit direction.
///
/// `angle1` is the X-Z projection's angle from the stacking axis, `angle2`
/// the Y-Z projection's, both in radians. The projections satisfy
/// `dx/dz = tan(angle1)` and `dy/dz = tan(angle2)`.
pub fn direction_from_plane_angles(angle1: f64, angle2: f64) -> Vector3<f64> {
    Vector3::new(angle1.tan(), angle2.tan(), 1.0).normalize()
}

/// Converts a downward-going unit direction to spherical angles in degrees.
///
/// Returns `(theta, phi)`: the polar angle from the stacking axis and the
/// azimuth from chamber 0's lateral axis, wrapped into [0, 360).
pub fn spherical_degrees(direction: &Vector3<f64>) -> (f64, f64) {
    let theta = direction.z.clamp(-1.0, 1.0).acos().to_degrees();
    let mut phi = direction.y.atan2(direction.x).to_degrees();
    if phi < 0.0 {
        phi += 360.0;
    }
    (theta, phi)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn tube_positions_are_aligned_across_layers() {
        for tube in 0..TUBES_PER_LAYER {
            assert_relative_eq!(lateral_position(tube), tube as f64);
        }
        assert_relative_eq!(layer_position(3), 3.0);
    }

    #[test]
    fn nearest_tube_rounds_to_wire() {
        assert_eq!(nearest_tube(0.0), Some(0));
        assert_eq!(nearest_tube(5.4), Some(5));
        assert_eq!(nearest_tube(5.6), Some(6));
        assert_eq!(nearest_tube(11.0), Some(11));
        assert_eq!(nearest_tube(-0.6), None);
        assert_eq!(nearest_tube(11.6), None);
    }

    #[test]
    fn vertical_track_maps_to_pole() {
        let dir = direction_from_plane_angles(0.0, 0.0);
        let (theta, phi) = spherical_degrees(&dir);
        assert_relative_eq!(theta, 0.0, epsilon = 1e-12);
        assert_relative_eq!(phi, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn tilt_in_one_plane_recovers_that_angle() {
        // Tilted only in the X-Z plane: theta equals the tilt, phi points
        // along chamber 0's axis.
        let tilt = 30.0f64.to_radians();
        let dir = direction_from_plane_angles(tilt, 0.0);
        let (theta, phi) = spherical_degrees(&dir);
        assert_relative_eq!(theta, 30.0, epsilon = 1e-9);
        assert_relative_eq!(phi, 0.0, epsilon = 1e-9);

        // Tilted only in the Y-Z plane: phi is a quarter turn.
        let dir = direction_from_plane_angles(0.0, tilt);
        let (theta, phi) = spherical_degrees(&dir);
        assert_relative_eq!(theta, 30.0, epsilon = 1e-9);
        assert_relative_eq!(phi, 90.0, epsilon = 1e-9);
    }

    #[test]
    fn negative_tilt_wraps_phi() {
        let tilt = (-20.0f64).to_radians();
        let dir = direction_from_plane_angles(tilt, 0.0);
        let (_, phi) = spherical_degrees(&dir);
        assert_relative_eq!(phi, 180.0, epsilon = 1e-9);

        let dir = direction_from_plane_angles(0.0, tilt);
        let (_, phi) = spherical_degrees(&dir);
        assert_relative_eq!(phi, 270.0, epsilon = 1e-9);
    }
}
