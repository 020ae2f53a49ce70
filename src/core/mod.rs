// Copyright (c) 2026 muondaq contributors
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/muondaq/muondaq

//! Core acquisition module - engine, assembler and hand-off queues

mod assembler;
mod engine;
mod queue;

pub use assembler::{EventAssembler, ScanOutcome};
pub use engine::{AcquisitionEngine, EngineState};
pub use queue::EventQueue;
