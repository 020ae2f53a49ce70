// Copyright (c) 2026 muondaq contributors
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/muondaq/muondaq

//! Event data model - hits, events and reconstruction results

mod statistics;

pub use statistics::{RunStatistics, StatisticsSnapshot};

use chrono::{DateTime, Utc};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

/// Total number of drift tubes across both chambers.
pub const TUBE_COUNT: u8 = 96;

/// Tubes per chamber (4 layers of 12).
pub const TUBES_PER_CHAMBER: u8 = 48;

/// Layers per chamber.
pub const LAYERS_PER_CHAMBER: u8 = 4;

/// Tubes per layer.
pub const TUBES_PER_LAYER: u8 = 12;

/// Position of a tube within the detector.
///
/// The mapping between a flat tube number and its (chamber, layer,
/// tube-in-layer) address is fixed and total:
/// `tube_number = chamber * 48 + layer * 12 + tube_in_layer`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TubeAddress {
    /// Chamber index (0 or 1). Chamber 1 is rotated 90 degrees.
    pub chamber: u8,
    /// Layer index within the chamber (0-3).
    pub layer: u8,
    /// Tube index within the layer (0-11).
    pub tube_in_layer: u8,
}

impl TubeAddress {
    /// Decodes a flat tube number (0-95) into its detector address.
    #[inline]
    pub fn from_tube_number(tube_number: u8) -> Option<Self> {
        if tube_number >= TUBE_COUNT {
            return None;
        }
        Some(Self {
            chamber: tube_number / TUBES_PER_CHAMBER,
            layer: (tube_number % TUBES_PER_CHAMBER) / TUBES_PER_LAYER,
            tube_in_layer: tube_number % TUBES_PER_LAYER,
        })
    }

    /// Re-encodes the address into its flat tube number.
    #[inline]
    pub fn tube_number(&self) -> u8 {
        self.chamber * TUBES_PER_CHAMBER + self.layer * TUBES_PER_LAYER + self.tube_in_layer
    }
}

/// A single drift-tube hit within an event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hit {
    /// Flat tube number (0-95).
    pub tube_number: u8,
    /// Chamber index (0 or 1).
    pub chamber: u8,
    /// Layer index within the chamber (0-3).
    pub layer: u8,
    /// Tube index within the layer (0-11).
    pub tube_in_layer: u8,
    /// Time of flight in nanoseconds.
    pub time_of_flight: f64,
    /// Time over threshold in nanoseconds.
    pub time_over_threshold: f64,
}

impl Hit {
    /// Builds a hit from a flat tube number and its timing pair.
    ///
    /// Returns `None` for tube numbers outside 0-95.
    pub fn new(tube_number: u8, tof: f64, tot: f64) -> Option<Self> {
        let addr = TubeAddress::from_tube_number(tube_number)?;
        Some(Self {
            tube_number,
            chamber: addr.chamber,
            layer: addr.layer,
            tube_in_layer: addr.tube_in_layer,
            time_of_flight: tof,
            time_over_threshold: tot,
        })
    }

    /// Detector address of this hit.
    #[inline]
    pub fn address(&self) -> TubeAddress {
        TubeAddress {
            chamber: self.chamber,
            layer: self.layer,
            tube_in_layer: self.tube_in_layer,
        }
    }
}

/// Reason a track reconstruction did not produce a fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// Too few hits or too few distinct layers in at least one chamber.
    InsufficientHits,
    /// All hits at the same layer position, no slope is defined.
    DegenerateGeometry,
}

/// Derived reconstruction record for one event.
///
/// Owned by its [`Event`] and immutable once computed. Angle fields are
/// absent when the corresponding fit failed; they are never defaulted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reconstruction {
    /// True only if both chambers produced a valid fit.
    #[serde(rename = "reconstruction_success")]
    pub success: bool,
    /// Number of hits in chamber 0.
    pub chamber0_hits: usize,
    /// Number of hits in chamber 1.
    pub chamber1_hits: usize,
    /// Chamber 0 fitted angle from the layer-stacking axis, degrees (X-Z plane).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub angle1_deg: Option<f64>,
    /// Chamber 1 fitted angle from the layer-stacking axis, degrees (Y-Z plane).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub angle2_deg: Option<f64>,
    /// Polar angle of the combined direction from the stacking axis, degrees.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theta_deg: Option<f64>,
    /// Azimuth of the combined direction from chamber 0's axis, degrees [0, 360).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phi_deg: Option<f64>,
    /// Set when `success` is false.
    #[serde(
        rename = "failure_reason",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub failure: Option<FailureReason>,
}

/// A single triggered detector event.
///
/// Created by the assembler at trigger time, enriched once by the track
/// reconstructor, then handed to consumers read-only behind an `Arc`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Event {
    /// Monotonically increasing, process-lifetime unique identifier.
    pub event_id: u64,
    /// Capture instant.
    pub timestamp: DateTime<Utc>,
    /// Hits in channel scan order. The order is not physically meaningful.
    pub hits: Vec<Hit>,
    /// Reconstruction result, attached once after assembly.
    #[serde(default)]
    pub reconstruction: Option<Reconstruction>,
}

impl Event {
    /// Creates an empty event with the given id, stamped now.
    pub fn new(event_id: u64) -> Self {
        Self {
            event_id,
            timestamp: Utc::now(),
            hits: Vec::new(),
            reconstruction: None,
        }
    }

    /// Number of hits in this event.
    #[inline]
    pub fn hit_count(&self) -> usize {
        self.hits.len()
    }

    /// Number of hits in the given chamber.
    pub fn chamber_hits(&self, chamber: u8) -> usize {
        self.hits.iter().filter(|h| h.chamber == chamber).count()
    }

    /// One-line human readable summary, used for per-event logging.
    pub fn summary(&self) -> String {
        if self.hits.is_empty() {
            return format!("Event {}: no hits", self.event_id);
        }
        format!(
            "Event {}: {} hits (C0: {}, C1: {})",
            self.event_id,
            self.hits.len(),
            self.chamber_hits(0),
            self.chamber_hits(1)
        )
    }
}

// The persisted schema carries an explicit `hit_count` field between
// `timestamp` and `hits`, so serialization is written out by hand. Field
// order is part of the contract with the event logger.
impl Serialize for Event {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let fields = if self.reconstruction.is_some() { 5 } else { 4 };
        let mut state = serializer.serialize_struct("Event", fields)?;
        state.serialize_field("event_id", &self.event_id)?;
        state.serialize_field("timestamp", &self.timestamp)?;
        state.serialize_field("hit_count", &self.hits.len())?;
        state.serialize_field("hits", &self.hits)?;
        if let Some(ref reconstruction) = self.reconstruction {
            state.serialize_field("reconstruction", reconstruction)?;
        }
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tube_address_round_trip() {
        for tube in 0..TUBE_COUNT {
            let addr = TubeAddress::from_tube_number(tube).unwrap();
            assert!(addr.chamber < 2);
            assert!(addr.layer < LAYERS_PER_CHAMBER);
            assert!(addr.tube_in_layer < TUBES_PER_LAYER);
            assert_eq!(addr.tube_number(), tube);
        }
    }

    #[test]
    fn tube_address_rejects_out_of_range() {
        assert!(TubeAddress::from_tube_number(96).is_none());
        assert!(TubeAddress::from_tube_number(255).is_none());
    }

    #[test]
    fn tube_address_known_values() {
        let addr = TubeAddress::from_tube_number(0).unwrap();
        assert_eq!((addr.chamber, addr.layer, addr.tube_in_layer), (0, 0, 0));

        let addr = TubeAddress::from_tube_number(47).unwrap();
        assert_eq!((addr.chamber, addr.layer, addr.tube_in_layer), (0, 3, 11));

        let addr = TubeAddress::from_tube_number(48).unwrap();
        assert_eq!((addr.chamber, addr.layer, addr.tube_in_layer), (1, 0, 0));

        let addr = TubeAddress::from_tube_number(95).unwrap();
        assert_eq!((addr.chamber, addr.layer, addr.tube_in_layer), (1, 3, 11));
    }

    #[test]
    fn hit_derives_address_fields() {
        let hit = Hit::new(61, 42.0, 17.5).unwrap();
        assert_eq!(hit.chamber, 1);
        assert_eq!(hit.layer, 1);
        assert_eq!(hit.tube_in_layer, 1);
        assert!(Hit::new(96, 0.0, 0.0).is_none());
    }

    #[test]
    fn event_summary_counts_per_chamber() {
        let mut event = Event::new(7);
        event.hits.push(Hit::new(3, 20.0, 10.0).unwrap());
        event.hits.push(Hit::new(50, 30.0, 12.0).unwrap());
        event.hits.push(Hit::new(51, 35.0, 14.0).unwrap());
        assert_eq!(event.summary(), "Event 7: 3 hits (C0: 1, C1: 2)");
        assert_eq!(Event::new(8).summary(), "Event 8: no hits");
    }

    #[test]
    fn event_serializes_persisted_schema() {
        let mut event = Event::new(17);
        event.hits.push(Hit::new(5, 42.0, 17.5).unwrap());
        event.reconstruction = Some(Reconstruction {
            success: true,
            chamber0_hits: 1,
            chamber1_hits: 0,
            angle1_deg: Some(0.0),
            angle2_deg: Some(0.0),
            theta_deg: Some(0.0),
            phi_deg: Some(0.0),
            failure: None,
        });

        let value: serde_json::Value =
            serde_json::from_str(&serde_json::to_string(&event).unwrap()).unwrap();
        assert_eq!(value["event_id"], 17);
        assert_eq!(value["hit_count"], 1);
        assert!(value["timestamp"].is_string());
        assert_eq!(value["hits"][0]["tube_number"], 5);
        assert_eq!(value["hits"][0]["chamber"], 0);
        assert_eq!(value["hits"][0]["layer"], 0);
        assert_eq!(value["hits"][0]["tube_in_layer"], 5);
        assert_eq!(value["hits"][0]["time_of_flight"], 42.0);
        assert_eq!(value["hits"][0]["time_over_threshold"], 17.5);
        assert_eq!(value["reconstruction"]["reconstruction_success"], true);
        assert_eq!(value["reconstruction"]["chamber0_hits"], 1);
        assert!(value["reconstruction"].get("failure_reason").is_none());
    }

    #[test]
    fn failed_reconstruction_omits_angles() {
        let mut event = Event::new(1);
        event.reconstruction = Some(Reconstruction {
            success: false,
            chamber0_hits: 0,
            chamber1_hits: 0,
            angle1_deg: None,
            angle2_deg: None,
            theta_deg: None,
            phi_deg: None,
            failure: Some(FailureReason::InsufficientHits),
        });

        let value: serde_json::Value =
            serde_json::from_str(&serde_json::to_string(&event).unwrap()).unwrap();
        let recon = &value["reconstruction"];
        assert_eq!(recon["reconstruction_success"], false);
        assert_eq!(recon["failure_reason"], "insufficient_hits");
        assert!(recon.get("angle1_deg").is_none());
        assert!(recon.get("theta_deg").is_none());
    }

    #[test]
    fn event_round_trips_through_json() {
        let mut event = Event::new(3);
        event.hits.push(Hit::new(10, 15.0, 8.0).unwrap());
        let json = serde_json::to_string(&event).unwrap();
        let back: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }
}
