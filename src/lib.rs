// Copyright (c) 2026 muondaq contributors
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/muondaq/muondaq

//! muondaq - Muon Drift-Tube Detector Acquisition & Reconstruction
//!
//! Operates a 96-tube drift chamber telescope: two chambers of 4 layers by
//! 12 tubes, rotated 90 degrees against each other, with a scintillator
//! trigger on top. On each trigger the acquisition engine scans the timing
//! channels, assembles an event, fits a straight-line trajectory per
//! chamber and publishes the enriched event to its consumers.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     Acquisition Engine                       │
//! │                                                              │
//! │  ┌───────────┐   ┌───────────┐   ┌─────────────────────┐     │
//! │  │  Timing   │ → │   Event   │ → │       Track         │     │
//! │  │  Channels │   │ Assembler │   │    Reconstructor    │     │
//! │  └───────────┘   └───────────┘   └─────────────────────┘     │
//! │   sim / SPI            │                    │                │
//! │                        └───── Arc<Event> ───┘                │
//! │                                  ↓                           │
//! │              ┌───────────────────┴──────────────────┐        │
//! │              ↓                                      ↓        │
//! │     ┌────────────────┐                    ┌────────────────┐ │
//! │     │  logger queue  │                    │ monitor queue  │ │
//! │     └────────────────┘                    └────────────────┘ │
//! └──────────│──────────────────────────────────────│────────────┘
//!            ↓                                      ↓
//!      JSONL event log                     statistics / display
//! ```
//!
//! The timing channels sit behind a capability trait with interchangeable
//! simulated and SPI-attached implementations; nothing downstream branches
//! on which one is in use.

#![warn(missing_docs)]

pub mod config;
pub mod core;
pub mod error;
pub mod event;
pub mod export;
pub mod reconstruction;
pub mod tdc;

// Re-exports for convenience
pub use crate::config::Config;
pub use crate::core::{AcquisitionEngine, EngineState, EventQueue};
pub use crate::event::{Event, Hit, Reconstruction, RunStatistics};
pub use crate::reconstruction::TrackReconstructor;
pub use crate::tdc::{SimulatedTimingChannels, TimingChannelSource};

/// muondaq version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// muondaq name
pub const NAME: &str = "muondaq";
