//! Run statistics - producer-owned counters with snapshot access

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Event;

/// Process-wide acquisition counters.
///
/// Owned by the acquisition engine and mutated only from the acquisition
/// task. Consumers never see a live reference; they receive a
/// [`StatisticsSnapshot`] copy with the derived rates filled in.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunStatistics {
    /// Events assembled, including zero-hit events.
    pub events: u64,
    /// Total hits across all events.
    pub hits: u64,
    /// Events with a successful track reconstruction.
    pub reconstructed: u64,
    /// Events where reconstruction failed (insufficient hits or degenerate fit).
    pub reconstruction_failures: u64,
    /// Events evicted from the logger queue because it was full.
    pub logger_dropped: u64,
    /// Events evicted from the monitor queue because it was full.
    pub monitor_dropped: u64,
    /// Channel or trigger communication errors observed.
    pub channel_errors: u64,
    /// Instant the current (or last) run started.
    pub started_at: Option<DateTime<Utc>>,
    /// Instant the last run stopped. Cleared while running.
    pub stopped_at: Option<DateTime<Utc>>,
}

impl RunStatistics {
    /// Marks the start of a run, clearing any previous stop mark.
    pub fn mark_started(&mut self) {
        self.started_at = Some(Utc::now());
        self.stopped_at = None;
    }

    /// Marks the end of a run.
    pub fn mark_stopped(&mut self) {
        self.stopped_at = Some(Utc::now());
    }

    /// Folds one assembled (and enriched) event into the counters.
    pub fn record_event(&mut self, event: &Event) {
        self.events += 1;
        self.hits += event.hits.len() as u64;
        match event.reconstruction {
            Some(ref r) if r.success => self.reconstructed += 1,
            _ => self.reconstruction_failures += 1,
        }
    }

    /// Elapsed run time in seconds, up to now for a run still in flight.
    pub fn runtime_seconds(&self) -> f64 {
        let Some(start) = self.started_at else {
            return 0.0;
        };
        let end = self.stopped_at.unwrap_or_else(Utc::now);
        (end - start).num_milliseconds() as f64 / 1000.0
    }

    /// Immutable copy with derived rates, for hand-off to consumers.
    pub fn snapshot(&self) -> StatisticsSnapshot {
        let runtime = self.runtime_seconds();
        let rate = |count: u64| {
            if runtime > 0.0 {
                count as f64 / runtime
            } else {
                0.0
            }
        };
        StatisticsSnapshot {
            counters: self.clone(),
            runtime_seconds: runtime,
            event_rate: rate(self.events),
            hit_rate: rate(self.hits),
            reconstruction_efficiency: if self.events > 0 {
                self.reconstructed as f64 / self.events as f64
            } else {
                0.0
            },
        }
    }
}

/// Point-in-time copy of [`RunStatistics`] with derived rates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatisticsSnapshot {
    /// Raw counters at snapshot time.
    #[serde(flatten)]
    pub counters: RunStatistics,
    /// Elapsed run time in seconds.
    pub runtime_seconds: f64,
    /// Events per second over the run so far.
    pub event_rate: f64,
    /// Hits per second over the run so far.
    pub hit_rate: f64,
    /// Fraction of events with a successful reconstruction.
    pub reconstruction_efficiency: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{FailureReason, Hit, Reconstruction};

    fn event_with_hits(n: u8, success: bool) -> Event {
        let mut event = Event::new(0);
        for tube in 0..n {
            event.hits.push(Hit::new(tube, 20.0, 10.0).unwrap());
        }
        event.reconstruction = Some(Reconstruction {
            success,
            chamber0_hits: n as usize,
            chamber1_hits: 0,
            angle1_deg: None,
            angle2_deg: None,
            theta_deg: None,
            phi_deg: None,
            failure: (!success).then_some(FailureReason::InsufficientHits),
        });
        event
    }

    #[test]
    fn record_event_updates_counters() {
        let mut stats = RunStatistics::default();
        stats.record_event(&event_with_hits(3, true));
        stats.record_event(&event_with_hits(5, false));
        stats.record_event(&Event::new(2));

        assert_eq!(stats.events, 3);
        assert_eq!(stats.hits, 8);
        assert_eq!(stats.reconstructed, 1);
        assert_eq!(stats.reconstruction_failures, 2);
    }

    #[test]
    fn snapshot_derives_efficiency() {
        let mut stats = RunStatistics::default();
        stats.mark_started();
        stats.record_event(&event_with_hits(2, true));
        stats.record_event(&event_with_hits(2, false));
        let snap = stats.snapshot();
        assert_eq!(snap.reconstruction_efficiency, 0.5);
        assert!(snap.runtime_seconds >= 0.0);
    }

    #[test]
    fn rates_are_zero_before_start() {
        let snap = RunStatistics::default().snapshot();
        assert_eq!(snap.runtime_seconds, 0.0);
        assert_eq!(snap.event_rate, 0.0);
        assert_eq!(snap.reconstruction_efficiency, 0.0);
    }
}
