// Copyright (c) 2026 muondaq contributors
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/muondaq/muondaq

//! Simulated timing channels for demo/testing
//!
//! Deterministic given a seed: the same configuration and seed replay the
//! same triggers, tracks and timing pairs.

use async_trait::async_trait;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

use super::{TimingChannelSource, TimingPair};
use crate::config::{HitModel, SimulationConfig};
use crate::error::ChannelError;
use crate::event::{TubeAddress, LAYERS_PER_CHAMBER, TUBE_COUNT, TUBES_PER_LAYER};
use crate::reconstruction::geometry::{layer_position, nearest_tube};

/// Simulates the 96 timing channels and the trigger line.
pub struct SimulatedTimingChannels {
    config: SimulationConfig,
    rng: ChaCha8Rng,
    trigger_latched: bool,
    armed: [bool; TUBE_COUNT as usize],
    pending: [Option<TimingPair>; TUBE_COUNT as usize],
}

impl SimulatedTimingChannels {
    /// Creates a simulator; a configured seed makes it fully deterministic.
    pub fn new(config: SimulationConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        Self {
            config,
            rng,
            trigger_latched: false,
            armed: [false; TUBE_COUNT as usize],
            pending: [None; TUBE_COUNT as usize],
        }
    }

    /// Forces a trigger and populates the channels, bypassing the trigger
    /// probability. Used by tests and single-shot demo runs.
    pub fn force_trigger(&mut self) {
        self.trigger_latched = true;
        self.generate_event();
    }

    fn timing_pair(&mut self) -> TimingPair {
        let [tof_lo, tof_hi] = self.config.tof_range_ns;
        let [tot_lo, tot_hi] = self.config.tot_range_ns;
        TimingPair {
            tof: self.rng.gen_range(tof_lo..tof_hi),
            tot: self.rng.gen_range(tot_lo..tot_hi),
        }
    }

    fn generate_event(&mut self) {
        match self.config.hit_model {
            HitModel::Uniform => self.generate_uniform(),
            HitModel::Track => self.generate_track(),
        }
    }

    /// Every tube fires independently with the configured probability.
    fn generate_uniform(&mut self) {
        for tube in 0..TUBE_COUNT as usize {
            if self.rng.gen::<f64>() < self.config.hit_probability {
                self.pending[tube] = Some(self.timing_pair());
            }
        }
    }

    /// One straight-line track through both chambers: per chamber, the tube
    /// nearest the track in each layer fires subject to hit probability and
    /// chamber efficiency, with optional adjacent-tube noise.
    fn generate_track(&mut self) {
        let (slopes, entries) = match self.config.pinned_track {
            Some(track) => ([track.slope_xz, track.slope_yz], [track.entry_x, track.entry_y]),
            None => {
                let max = self.config.max_slope;
                let lateral_max = (TUBES_PER_LAYER - 1) as f64;
                (
                    [self.rng.gen_range(-max..=max), self.rng.gen_range(-max..=max)],
                    [
                        self.rng.gen_range(0.0..=lateral_max),
                        self.rng.gen_range(0.0..=lateral_max),
                    ],
                )
            }
        };

        for chamber in 0..2u8 {
            let efficiency = self.config.chamber_efficiency[chamber as usize];
            let p_hit = self.config.hit_probability * efficiency;
            for layer in 0..LAYERS_PER_CHAMBER {
                let lateral =
                    entries[chamber as usize] + slopes[chamber as usize] * layer_position(layer);
                let Some(tube_in_layer) = nearest_tube(lateral) else {
                    continue;
                };
                if self.rng.gen::<f64>() < p_hit {
                    self.set_pending(chamber, layer, tube_in_layer);
                }
                if self.rng.gen::<f64>() < self.config.noise_probability {
                    let neighbor = if self.rng.gen::<bool>() {
                        tube_in_layer.checked_add(1).filter(|&t| t < TUBES_PER_LAYER)
                    } else {
                        tube_in_layer.checked_sub(1)
                    };
                    if let Some(noise_tube) = neighbor {
                        self.set_pending(chamber, layer, noise_tube);
                    }
                }
            }
        }
    }

    fn set_pending(&mut self, chamber: u8, layer: u8, tube_in_layer: u8) {
        let tube = TubeAddress {
            chamber,
            layer,
            tube_in_layer,
        }
        .tube_number();
        let pair = self.timing_pair();
        self.pending[tube as usize] = Some(pair);
    }

    fn inject_fault(&mut self, tube: u8) -> Result<(), ChannelError> {
        if self.config.fault_probability > 0.0
            && self.rng.gen::<f64>() < self.config.fault_probability
        {
            return Err(ChannelError::Bus {
                tube,
                message: "simulated bus fault".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl TimingChannelSource for SimulatedTimingChannels {
    async fn poll_trigger(&mut self) -> Result<bool, ChannelError> {
        if self.config.fault_probability > 0.0
            && self.rng.gen::<f64>() < self.config.fault_probability
        {
            return Err(ChannelError::Trigger("simulated trigger fault".to_string()));
        }
        if self.trigger_latched {
            return Ok(true);
        }
        if self.rng.gen::<f64>() < self.config.trigger_probability {
            self.force_trigger();
            return Ok(true);
        }
        Ok(false)
    }

    async fn arm_channel(&mut self, tube: u8) -> Result<(), ChannelError> {
        self.inject_fault(tube)?;
        if tube < TUBE_COUNT {
            self.armed[tube as usize] = true;
        }
        Ok(())
    }

    async fn read_channel(
        &mut self,
        tube: u8,
        post_arm: bool,
    ) -> Result<Option<TimingPair>, ChannelError> {
        self.inject_fault(tube)?;
        if tube >= TUBE_COUNT || !self.trigger_latched {
            return Ok(None);
        }
        let slot = tube as usize;
        if post_arm {
            if !self.armed[slot] {
                return Ok(None);
            }
            self.armed[slot] = false;
            Ok(self.pending[slot].take())
        } else {
            Ok(self.pending[slot])
        }
    }

    async fn reset_trigger(&mut self) -> Result<(), ChannelError> {
        self.trigger_latched = false;
        self.armed = [false; TUBE_COUNT as usize];
        self.pending = [None; TUBE_COUNT as usize];
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PinnedTrack;

    async fn scan_all(sim: &mut SimulatedTimingChannels) -> Vec<(u8, TimingPair)> {
        let mut hits = Vec::new();
        for tube in 0..TUBE_COUNT {
            sim.arm_channel(tube).await.unwrap();
            if let Some(pair) = sim.read_channel(tube, true).await.unwrap() {
                hits.push((tube, pair));
            }
        }
        hits
    }

    fn seeded(seed: u64, mutate: impl FnOnce(&mut SimulationConfig)) -> SimulatedTimingChannels {
        let mut config = SimulationConfig {
            seed: Some(seed),
            ..SimulationConfig::default()
        };
        mutate(&mut config);
        SimulatedTimingChannels::new(config)
    }

    #[tokio::test]
    async fn deterministic_given_seed() {
        let mut a = seeded(42, |_| {});
        let mut b = seeded(42, |_| {});
        a.force_trigger();
        b.force_trigger();
        assert_eq!(scan_all(&mut a).await, scan_all(&mut b).await);
    }

    #[tokio::test]
    async fn pinned_vertical_track_hits_one_tube_per_layer() {
        let mut sim = seeded(7, |c| {
            c.hit_probability = 1.0;
            c.noise_probability = 0.0;
            c.pinned_track = Some(PinnedTrack {
                slope_xz: 0.0,
                slope_yz: 0.0,
                entry_x: 5.0,
                entry_y: 5.0,
            });
        });
        sim.force_trigger();
        let hits = scan_all(&mut sim).await;
        assert_eq!(hits.len(), 8);
        let tubes: Vec<u8> = hits.iter().map(|(t, _)| *t).collect();
        // Tube 5 in every layer of both chambers.
        assert_eq!(tubes, vec![5, 17, 29, 41, 53, 65, 77, 89]);
    }

    #[tokio::test]
    async fn uniform_occupancy_matches_probability() {
        // Mean hits per chamber over many triggers converges to 48 * p.
        let p = 0.1;
        let cycles = 500;
        let mut sim = seeded(1234, |c| {
            c.hit_model = HitModel::Uniform;
            c.hit_probability = p;
        });

        let mut total = [0usize; 2];
        for _ in 0..cycles {
            sim.force_trigger();
            for (tube, _) in scan_all(&mut sim).await {
                total[(tube / 48) as usize] += 1;
            }
            sim.reset_trigger().await.unwrap();
        }

        let expected = 48.0 * p;
        for chamber_total in total {
            let mean = chamber_total as f64 / cycles as f64;
            assert!(
                (mean - expected).abs() < 0.5,
                "mean {mean} not within 0.5 of {expected}"
            );
        }
    }

    #[tokio::test]
    async fn reads_without_trigger_are_empty() {
        let mut sim = seeded(9, |c| c.hit_probability = 1.0);
        sim.arm_channel(0).await.unwrap();
        assert_eq!(sim.read_channel(0, true).await.unwrap(), None);
    }

    #[tokio::test]
    async fn reset_clears_latch_and_pending() {
        let mut sim = seeded(11, |c| {
            c.hit_probability = 1.0;
            c.trigger_probability = 0.0;
        });
        sim.force_trigger();
        assert!(sim.poll_trigger().await.unwrap());
        sim.reset_trigger().await.unwrap();
        // Idempotent on retry.
        sim.reset_trigger().await.unwrap();
        assert!(!sim.poll_trigger().await.unwrap());
        assert!(scan_all(&mut sim).await.is_empty());
    }

    #[tokio::test]
    async fn post_arm_read_consumes_the_measurement() {
        let mut sim = seeded(13, |c| {
            c.hit_probability = 1.0;
            c.noise_probability = 0.0;
            c.pinned_track = Some(PinnedTrack {
                slope_xz: 0.0,
                slope_yz: 0.0,
                entry_x: 0.0,
                entry_y: 0.0,
            });
        });
        sim.force_trigger();

        // Peek does not consume, and does not need an arm.
        assert!(sim.read_channel(0, false).await.unwrap().is_some());
        assert!(sim.read_channel(0, false).await.unwrap().is_some());

        sim.arm_channel(0).await.unwrap();
        assert!(sim.read_channel(0, true).await.unwrap().is_some());
        sim.arm_channel(0).await.unwrap();
        assert_eq!(sim.read_channel(0, true).await.unwrap(), None);
    }

    #[tokio::test]
    async fn fault_injection_surfaces_channel_errors() {
        let mut sim = seeded(17, |c| c.fault_probability = 1.0);
        assert!(sim.poll_trigger().await.is_err());
        assert!(sim.read_channel(3, true).await.is_err());
    }
}
