// Copyright (c) 2026 muondaq contributors
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/muondaq/muondaq

//! Timing channel traits and common types

use async_trait::async_trait;

use crate::error::ChannelError;

/// Raw timing pair reported by one channel for one trigger.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimingPair {
    /// Time of flight in nanoseconds.
    pub tof: f64,
    /// Time over threshold in nanoseconds.
    pub tot: f64,
}

/// Capability interface to the 96 timing channels plus the trigger line.
///
/// The simulated and hardware implementations are interchangeable behind
/// this contract; the assembler and engine never branch on which one they
/// hold. All operations fail closed: a channel that cannot answer within
/// its timeout reports `Ok(None)` or a [`ChannelError`], never blocks
/// indefinitely.
#[async_trait]
pub trait TimingChannelSource: Send {
    /// Non-blocking check of whether the trigger condition is asserted.
    ///
    /// Bounded by the configured poll interval.
    async fn poll_trigger(&mut self) -> Result<bool, ChannelError>;

    /// Prepares a channel for readout. Idempotent on retry.
    async fn arm_channel(&mut self, tube: u8) -> Result<(), ChannelError>;

    /// Reads one channel's timing pair for the current trigger.
    ///
    /// `Ok(None)` means the channel reported no hit within its timeout
    /// window; an `Err` is a communication failure, which callers treat as
    /// "no hit for this tube" unless the error-rate policy trips. A read
    /// with `post_arm` set consumes the channel's latched measurement;
    /// without it the read is a non-destructive status peek.
    async fn read_channel(
        &mut self,
        tube: u8,
        post_arm: bool,
    ) -> Result<Option<TimingPair>, ChannelError>;

    /// Re-arms the trigger latch for the next event. Idempotent on retry.
    async fn reset_trigger(&mut self) -> Result<(), ChannelError>;
}
