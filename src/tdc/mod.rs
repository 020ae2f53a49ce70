// Copyright (c) 2026 muondaq contributors
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/muondaq/muondaq

//! Timing channel module - hardware interface and simulation

mod simulator;
mod traits;

#[cfg(feature = "hardware")]
mod spi;

pub use simulator::SimulatedTimingChannels;
pub use traits::{TimingChannelSource, TimingPair};

#[cfg(feature = "hardware")]
pub use spi::SpiTimingChannels;

use anyhow::Result;
use tracing::info;

use crate::config::Config;

/// Builds the timing channel source selected by the configuration.
pub fn from_config(config: &Config) -> Result<Box<dyn TimingChannelSource>> {
    if config.simulated {
        info!("Using simulated timing channels");
        return Ok(Box::new(SimulatedTimingChannels::new(
            config.simulation.clone(),
        )));
    }
    hardware_source(config)
}

#[cfg(feature = "hardware")]
fn hardware_source(config: &Config) -> Result<Box<dyn TimingChannelSource>> {
    let device = config
        .daq
        .spi_device
        .as_deref()
        .unwrap_or("/dev/spidev0.0");
    info!("Opening TDC readout on {}", device);
    let source = SpiTimingChannels::open(
        device,
        std::time::Duration::from_millis(config.daq.read_timeout_ms),
    )?;
    Ok(Box::new(source))
}

#[cfg(not(feature = "hardware"))]
fn hardware_source(_config: &Config) -> Result<Box<dyn TimingChannelSource>> {
    anyhow::bail!("built without hardware support, enable the `hardware` feature")
}
