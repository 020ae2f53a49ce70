//! Acquisition engine - the producer loop and its lifecycle

use std::collections::VecDeque;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::{EventAssembler, EventQueue, ScanOutcome};
use crate::config::{Config, DaqConfig};
use crate::error::{ChannelError, ConfigError, HealthFault, StartError};
use crate::event::{RunStatistics, StatisticsSnapshot};
use crate::reconstruction::{CalibrationFn, TrackReconstructor};
use crate::tdc::TimingChannelSource;

/// Acquisition lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// No polling occurs.
    Idle,
    /// The poll loop is live on its own task.
    Running,
    /// Stop requested; any in-flight assembly completes first.
    Stopping,
}

/// Sliding error-rate window over channel and trigger operations.
///
/// Evaluated only once fully populated, so a single early error cannot
/// trip the policy.
struct HealthWindow {
    outcomes: VecDeque<bool>,
    capacity: usize,
    threshold: f64,
    errors: usize,
    last_error: Option<ChannelError>,
}

impl HealthWindow {
    fn new(capacity: usize, threshold: f64) -> Self {
        Self {
            outcomes: VecDeque::with_capacity(capacity),
            capacity,
            threshold,
            errors: 0,
            last_error: None,
        }
    }

    fn record(&mut self, is_error: bool) {
        if self.outcomes.len() == self.capacity {
            if self.outcomes.pop_front() == Some(true) {
                self.errors -= 1;
            }
        }
        self.outcomes.push_back(is_error);
        if is_error {
            self.errors += 1;
        }
    }

    fn record_scan(&mut self, outcome: &ScanOutcome) {
        for _ in 0..outcome.operations - outcome.errors {
            self.record(false);
        }
        for _ in 0..outcome.errors {
            self.record(true);
        }
        if let Some(ref err) = outcome.last_error {
            self.last_error = Some(err.clone());
        }
    }

    fn record_error(&mut self, err: ChannelError) {
        self.record(true);
        self.last_error = Some(err);
    }

    fn check(&self) -> Option<HealthFault> {
        if self.outcomes.len() < self.capacity {
            return None;
        }
        let rate = self.errors as f64 / self.outcomes.len() as f64;
        if rate <= self.threshold {
            return None;
        }
        Some(HealthFault {
            rate,
            window: self.outcomes.len(),
            last_error: self
                .last_error
                .clone()
                .unwrap_or(ChannelError::Trigger("unknown".to_string())),
        })
    }
}

struct Shared {
    state: Mutex<EngineState>,
    stats: Mutex<RunStatistics>,
    fault: Mutex<Option<HealthFault>>,
    logger_queue: Arc<EventQueue>,
    monitor_queue: Arc<EventQueue>,
}

/// The producer: owns the run/stop lifecycle, drives trigger polling,
/// assembles and reconstructs events, and publishes them onto the bounded
/// consumer queues.
///
/// The engine is the sole mutator of channel state and statistics; consumers
/// only ever see `Arc<Event>` values popped from their queue and
/// [`StatisticsSnapshot`] copies.
pub struct AcquisitionEngine {
    config: DaqConfig,
    reconstructor: Arc<TrackReconstructor>,
    source: Arc<AsyncMutex<Box<dyn TimingChannelSource>>>,
    event_ids: Arc<AtomicU64>,
    shared: Arc<Shared>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl AcquisitionEngine {
    /// Creates an engine with the placeholder calibration.
    ///
    /// Validates the configuration before touching any hardware.
    pub fn new(
        config: &Config,
        source: Box<dyn TimingChannelSource>,
    ) -> Result<Self, ConfigError> {
        Self::with_calibration(
            config,
            source,
            crate::reconstruction::default_calibration(),
        )
    }

    /// Creates an engine with an injected timing-to-distance calibration.
    pub fn with_calibration(
        config: &Config,
        source: Box<dyn TimingChannelSource>,
        calibration: CalibrationFn,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let shared = Arc::new(Shared {
            state: Mutex::new(EngineState::Idle),
            stats: Mutex::new(RunStatistics::default()),
            fault: Mutex::new(None),
            logger_queue: Arc::new(EventQueue::new(config.daq.logger_queue_capacity)),
            monitor_queue: Arc::new(EventQueue::new(config.daq.monitor_queue_capacity)),
        });
        Ok(Self {
            config: config.daq.clone(),
            reconstructor: Arc::new(TrackReconstructor::new(&config.reconstruction, calibration)),
            source: Arc::new(AsyncMutex::new(source)),
            event_ids: Arc::new(AtomicU64::new(0)),
            shared,
            task: Mutex::new(None),
        })
    }

    /// Starts the poll loop on a dedicated task.
    ///
    /// Refused while a run is live or a health fault is latched.
    pub fn start(&self) -> Result<(), StartError> {
        if let Some(fault) = self.shared.fault.lock().clone() {
            return Err(StartError::Faulted(fault));
        }
        {
            let mut state = self.shared.state.lock();
            if *state != EngineState::Idle {
                return Err(StartError::AlreadyRunning);
            }
            *state = EngineState::Running;
        }
        {
            let mut stats = self.shared.stats.lock();
            *stats = RunStatistics::default();
            stats.mark_started();
        }

        let assembler = EventAssembler::new(self.config.scan_order(), self.event_ids.clone());
        let handle = tokio::spawn(run_loop(
            self.shared.clone(),
            self.source.clone(),
            self.reconstructor.clone(),
            assembler,
            self.config.clone(),
        ));
        *self.task.lock() = Some(handle);
        Ok(())
    }

    /// Requests a stop and waits for the loop to drain back to `Idle`.
    ///
    /// Idempotent; calling from `Idle` is a no-op. The stop is observed at
    /// the top of the poll loop and after each completed event, so it is
    /// bounded by one poll interval plus one channel scan.
    pub async fn stop(&self) {
        {
            let mut state = self.shared.state.lock();
            match *state {
                EngineState::Idle => return,
                EngineState::Running => *state = EngineState::Stopping,
                EngineState::Stopping => {}
            }
        }
        let task = self.task.lock().take();
        if let Some(task) = task {
            if let Err(err) = task.await {
                warn!("Acquisition task did not join cleanly: {}", err);
            }
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> EngineState {
        *self.shared.state.lock()
    }

    /// Immutable statistics snapshot for consumers.
    pub fn statistics(&self) -> StatisticsSnapshot {
        self.shared.stats.lock().snapshot()
    }

    /// The latched health fault, if the last run tripped the error policy.
    pub fn fault(&self) -> Option<HealthFault> {
        self.shared.fault.lock().clone()
    }

    /// Clears a latched health fault so the engine may start again.
    pub fn clear_fault(&self) {
        *self.shared.fault.lock() = None;
    }

    /// Hand-off queue consumed by the event logger.
    pub fn logger_queue(&self) -> Arc<EventQueue> {
        self.shared.logger_queue.clone()
    }

    /// Hand-off queue consumed by the presentation layer.
    pub fn monitor_queue(&self) -> Arc<EventQueue> {
        self.shared.monitor_queue.clone()
    }
}

async fn run_loop(
    shared: Arc<Shared>,
    source: Arc<AsyncMutex<Box<dyn TimingChannelSource>>>,
    reconstructor: Arc<TrackReconstructor>,
    mut assembler: EventAssembler,
    config: DaqConfig,
) {
    info!("Acquisition started");
    let poll_interval = Duration::from_millis(config.poll_interval_ms);
    let deadline = config
        .max_duration_secs
        .map(|secs| Instant::now() + Duration::from_secs_f64(secs));
    let mut health = HealthWindow::new(config.error_window, config.error_rate_threshold);

    // The producer is the sole user of the channel source for the whole run.
    let mut source = source.lock().await;

    loop {
        if *shared.state.lock() != EngineState::Running {
            break;
        }
        if let Some(deadline) = deadline {
            if Instant::now() >= deadline {
                info!("Run duration limit reached");
                *shared.state.lock() = EngineState::Stopping;
                break;
            }
        }

        match source.poll_trigger().await {
            Ok(false) => {
                health.record(false);
                tokio::time::sleep(poll_interval).await;
            }
            Ok(true) => {
                health.record(false);
                let (mut event, outcome) = assembler.assemble(&mut **source).await;
                health.record_scan(&outcome);

                event.reconstruction = Some(reconstructor.reconstruct(&event));
                debug!("{}", event.summary());

                let event = Arc::new(event);
                let evicted_logger = shared.logger_queue.push(event.clone());
                let evicted_monitor = shared.monitor_queue.push(event.clone());

                let events_so_far = {
                    let mut stats = shared.stats.lock();
                    stats.record_event(&event);
                    stats.channel_errors += outcome.errors as u64;
                    if evicted_logger {
                        stats.logger_dropped += 1;
                    }
                    if evicted_monitor {
                        stats.monitor_dropped += 1;
                    }
                    stats.events
                };

                if config.max_events.is_some_and(|max| events_so_far >= max) {
                    info!("Event count limit reached");
                    *shared.state.lock() = EngineState::Stopping;
                    break;
                }
            }
            Err(err) => {
                warn!("Trigger poll failed: {}", err);
                shared.stats.lock().channel_errors += 1;
                health.record_error(err);
                tokio::time::sleep(poll_interval).await;
            }
        }

        if let Some(fault) = health.check() {
            error!("Stopping acquisition: {}", fault);
            *shared.fault.lock() = Some(fault);
            *shared.state.lock() = EngineState::Stopping;
            break;
        }
    }

    shared.stats.lock().mark_stopped();
    *shared.state.lock() = EngineState::Idle;
    info!("Acquisition stopped");
}
