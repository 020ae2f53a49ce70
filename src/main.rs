// Copyright (c) 2026 muondaq contributors
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/muondaq/muondaq

//! muondaq - headless acquisition front-end
//!
//! Drives the detector (or its simulated stand-in) from the command line:
//! loads the configuration, starts the acquisition engine, persists events
//! as JSONL and prints run statistics on shutdown.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, error, info, Level};
use tracing_subscriber::FmtSubscriber;

use muondaq::config::Config;
use muondaq::core::{AcquisitionEngine, EngineState};
use muondaq::export::{run_event_logger, EventWriter};
use muondaq::{tdc, VERSION};

/// Muon drift-tube detector control system
#[derive(Parser, Debug)]
#[command(name = "muondaq")]
#[command(version = VERSION)]
#[command(about = "Muon drift-tube detector acquisition and track reconstruction")]
struct Args {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output file for event data
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Run duration in seconds
    #[arg(long)]
    duration: Option<f64>,

    /// Stop after this many events
    #[arg(long)]
    events: Option<u64>,

    /// Seed for the simulated timing channels
    #[arg(long)]
    seed: Option<u64>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Enable trace-level logging
    #[arg(long)]
    trace: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.trace {
        Level::TRACE
    } else if args.debug {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_ansi(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("muondaq v{} - drift-tube detector control", VERSION);

    let config_path = args
        .config
        .unwrap_or_else(|| PathBuf::from("muondaq.toml"));
    let mut config = Config::load_or_create(&config_path)?;

    // Command line overrides
    if let Some(output) = args.output {
        config.storage.output_file = output;
    }
    if let Some(duration) = args.duration {
        config.daq.max_duration_secs = Some(duration);
    }
    if let Some(events) = args.events {
        config.daq.max_events = Some(events);
    }
    if let Some(seed) = args.seed {
        config.simulation.seed = Some(seed);
    }
    config.validate()?;

    info!("Simulated channels: {}", config.simulated);

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run_acquisition(config))
}

async fn run_acquisition(config: Config) -> Result<()> {
    let source = tdc::from_config(&config)?;
    let engine = Arc::new(AcquisitionEngine::new(&config, source)?);
    let (shutdown_tx, _) = broadcast::channel(4);

    // Event logger consumer
    let logger_task = if config.storage.enabled {
        let writer = Arc::new(EventWriter::create(&config.storage.output_file)?);
        Some(tokio::spawn(run_event_logger(
            engine.logger_queue(),
            writer,
            Duration::from_millis(config.storage.drain_interval_ms),
            shutdown_tx.subscribe(),
        )))
    } else {
        None
    };

    // Presentation consumer: drains the monitor queue and reports progress
    let monitor_task = {
        let engine = engine.clone();
        let mut shutdown = shutdown_tx.subscribe();
        tokio::spawn(async move {
            let queue = engine.monitor_queue();
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(Duration::from_secs(10)) => {
                        while let Some(event) = queue.pop() {
                            debug!("{}", event.summary());
                        }
                        let stats = engine.statistics();
                        info!(
                            "{} events, {} hits, {:.2} ev/s, efficiency {:.1}%",
                            stats.counters.events,
                            stats.counters.hits,
                            stats.event_rate,
                            stats.reconstruction_efficiency * 100.0
                        );
                    }
                    _ = shutdown.recv() => break,
                }
            }
        })
    };

    engine.start()?;
    info!("Acquisition running, press Ctrl+C to stop");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received");
                break;
            }
            _ = tokio::time::sleep(Duration::from_millis(200)) => {
                // The engine idles itself on run limits or a health fault.
                if engine.state() == EngineState::Idle {
                    break;
                }
            }
        }
    }

    engine.stop().await;
    if let Some(fault) = engine.fault() {
        error!("Run ended on hardware fault: {}", fault);
    }

    let _ = shutdown_tx.send(());
    if let Some(task) = logger_task {
        let _ = task.await;
    }
    let _ = monitor_task.await;

    let stats = engine.statistics();
    info!("Final statistics:");
    info!("  events:        {}", stats.counters.events);
    info!("  total hits:    {}", stats.counters.hits);
    info!("  runtime:       {:.1} s", stats.runtime_seconds);
    info!("  event rate:    {:.2} Hz", stats.event_rate);
    info!("  hit rate:      {:.2} Hz", stats.hit_rate);
    info!(
        "  reconstructed: {} ({:.1}%)",
        stats.counters.reconstructed,
        stats.reconstruction_efficiency * 100.0
    );
    info!(
        "  dropped:       {} logger, {} monitor",
        stats.counters.logger_dropped, stats.counters.monitor_dropped
    );
    info!("  channel errors: {}", stats.counters.channel_errors);

    Ok(())
}
