// Copyright (c) 2026 muondaq contributors
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/muondaq/muondaq

//! SPI-attached TDC readout (feature `hardware`)
//!
//! Talks to the TDC crate over spidev. Only the transfer framing lives
//! here; the register map itself is owned by the firmware.

use async_trait::async_trait;
use spidev::{SpiModeFlags, Spidev, SpidevOptions, SpidevTransfer};
use std::io;
use std::time::{Duration, Instant};

use super::{TimingChannelSource, TimingPair};
use crate::error::ChannelError;
use crate::event::TUBE_COUNT;

// Command bytes understood by the TDC firmware.
const CMD_TRIGGER_STATUS: u8 = 0x01;
const CMD_TRIGGER_RESET: u8 = 0x02;
const CMD_ARM: u8 = 0x10;
const CMD_READ: u8 = 0x20;

// Status byte in a readout frame.
const STATUS_HIT: u8 = 0x01;
const STATUS_BUSY: u8 = 0x02;

/// TDC tick length in nanoseconds.
const TICK_NS: f64 = 0.78125;

/// Hardware timing channels behind the shared capability contract.
pub struct SpiTimingChannels {
    spi: Spidev,
    read_timeout: Duration,
}

impl SpiTimingChannels {
    /// Opens and configures the SPI device, e.g. `/dev/spidev0.0`.
    pub fn open(device: &str, read_timeout: Duration) -> io::Result<Self> {
        let mut spi = Spidev::open(device)?;
        let options = SpidevOptions::new()
            .bits_per_word(8)
            .max_speed_hz(2_000_000)
            .mode(SpiModeFlags::SPI_MODE_0)
            .build();
        spi.configure(&options)?;
        Ok(Self { spi, read_timeout })
    }

    fn transfer(&mut self, tx: &[u8], rx: &mut [u8]) -> io::Result<()> {
        let mut transfer = SpidevTransfer::read_write(tx, rx);
        self.spi.transfer(&mut transfer)
    }

    fn bus_error(tube: u8, err: io::Error) -> ChannelError {
        ChannelError::Bus {
            tube,
            message: err.to_string(),
        }
    }
}

#[async_trait]
impl TimingChannelSource for SpiTimingChannels {
    async fn poll_trigger(&mut self) -> Result<bool, ChannelError> {
        let tx = [CMD_TRIGGER_STATUS, 0x00];
        let mut rx = [0u8; 2];
        self.transfer(&tx, &mut rx)
            .map_err(|e| ChannelError::Trigger(e.to_string()))?;
        Ok(rx[1] & STATUS_HIT != 0)
    }

    async fn arm_channel(&mut self, tube: u8) -> Result<(), ChannelError> {
        let tx = [CMD_ARM, tube];
        let mut rx = [0u8; 2];
        self.transfer(&tx, &mut rx)
            .map_err(|e| Self::bus_error(tube, e))
    }

    async fn read_channel(
        &mut self,
        tube: u8,
        post_arm: bool,
    ) -> Result<Option<TimingPair>, ChannelError> {
        if tube >= TUBE_COUNT {
            return Ok(None);
        }

        // Frame: [echo, status, tof_lo, tof_hi, tot_lo, tot_hi]. A busy
        // conversion is retried until the timeout window closes; the
        // channel then counts as empty for this event.
        let deadline = Instant::now() + self.read_timeout;
        loop {
            let tx = [CMD_READ | u8::from(post_arm), tube, 0, 0, 0, 0];
            let mut rx = [0u8; 6];
            self.transfer(&tx, &mut rx)
                .map_err(|e| Self::bus_error(tube, e))?;

            let status = rx[1];
            if status & STATUS_BUSY != 0 {
                if Instant::now() >= deadline {
                    return Err(ChannelError::Timeout {
                        tube,
                        timeout_ms: self.read_timeout.as_millis() as u64,
                    });
                }
                tokio::time::sleep(Duration::from_micros(50)).await;
                continue;
            }
            if status & STATUS_HIT == 0 {
                return Ok(None);
            }

            let tof_ticks = u16::from_le_bytes([rx[2], rx[3]]);
            let tot_ticks = u16::from_le_bytes([rx[4], rx[5]]);
            return Ok(Some(TimingPair {
                tof: tof_ticks as f64 * TICK_NS,
                tot: tot_ticks as f64 * TICK_NS,
            }));
        }
    }

    async fn reset_trigger(&mut self) -> Result<(), ChannelError> {
        let tx = [CMD_TRIGGER_RESET, 0x00];
        let mut rx = [0u8; 2];
        self.transfer(&tx, &mut rx)
            .map_err(|e| ChannelError::Trigger(e.to_string()))
    }
}
