// Copyright (c) 2026 muondaq contributors
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/muondaq/muondaq

//! Event assembly - one full channel scan per trigger

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::error::ChannelError;
use crate::event::{Event, Hit};
use crate::tdc::TimingChannelSource;

/// Channel-operation tally for one scan, fed into the health window.
#[derive(Debug, Default)]
pub struct ScanOutcome {
    /// Channel and trigger operations attempted.
    pub operations: usize,
    /// Operations that failed with a communication error.
    pub errors: usize,
    /// The most recent communication error, if any.
    pub last_error: Option<ChannelError>,
}

impl ScanOutcome {
    fn ok(&mut self) {
        self.operations += 1;
    }

    fn error(&mut self, err: ChannelError) {
        self.operations += 1;
        self.errors += 1;
        self.last_error = Some(err);
    }
}

/// Builds one event per fired trigger by scanning the active channels.
pub struct EventAssembler {
    scan_order: Vec<u8>,
    event_ids: Arc<AtomicU64>,
}

impl EventAssembler {
    /// Creates an assembler scanning `scan_order`, drawing event ids from
    /// the shared monotonic counter.
    pub fn new(scan_order: Vec<u8>, event_ids: Arc<AtomicU64>) -> Self {
        Self {
            scan_order,
            event_ids,
        }
    }

    /// Scans every active channel and assembles the event.
    ///
    /// Each tube is armed and then read in fixed scan order. A channel with
    /// no hit is simply absent from the event; a communication error is
    /// tallied and the scan proceeds - there are no retries within a scan.
    /// The trigger latch is reset only after the scan completes, so a
    /// second trigger during readout is neither lost nor double-counted.
    /// A zero-hit event is valid and still returned.
    pub async fn assemble(&mut self, source: &mut dyn TimingChannelSource) -> (Event, ScanOutcome) {
        let mut outcome = ScanOutcome::default();
        let mut hits = Vec::new();

        for &tube in &self.scan_order {
            match source.arm_channel(tube).await {
                Ok(()) => outcome.ok(),
                Err(err) => {
                    outcome.error(err);
                    continue;
                }
            }
            match source.read_channel(tube, true).await {
                Ok(Some(pair)) => {
                    outcome.ok();
                    if let Some(hit) = Hit::new(tube, pair.tof, pair.tot) {
                        hits.push(hit);
                    }
                }
                Ok(None) => outcome.ok(),
                Err(err) => outcome.error(err),
            }
        }

        match source.reset_trigger().await {
            Ok(()) => outcome.ok(),
            Err(err) => outcome.error(err),
        }

        let mut event = Event::new(self.event_ids.fetch_add(1, Ordering::Relaxed));
        event.hits = hits;
        (event, outcome)
    }
}
