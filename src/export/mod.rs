//! Event persistence - append-only JSONL output

use anyhow::Result;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::core::EventQueue;
use crate::event::Event;

/// Append-only event writer, one JSON object per line.
///
/// The line format is the persisted-schema contract with downstream
/// analysis; see the README example.
pub struct EventWriter {
    path: PathBuf,
    file: Mutex<BufWriter<File>>,
    written: Mutex<u64>,
}

impl EventWriter {
    /// Opens (or creates) the output file for appending.
    pub fn create(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            file: Mutex::new(BufWriter::new(file)),
            written: Mutex::new(0),
        })
    }

    /// Appends one event as a JSON line.
    pub fn write_event(&self, event: &Event) -> Result<()> {
        let json = serde_json::to_string(event)?;
        let mut file = self.file.lock().unwrap();
        writeln!(file, "{}", json)?;
        *self.written.lock().unwrap() += 1;
        Ok(())
    }

    /// Flushes buffered lines to disk.
    pub fn flush(&self) -> Result<()> {
        self.file.lock().unwrap().flush()?;
        Ok(())
    }

    /// Number of events written so far.
    pub fn written(&self) -> u64 {
        *self.written.lock().unwrap()
    }

    /// Output file path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Logger consumer: drains the hand-off queue to disk until shutdown.
///
/// Pops at its own pace and never back-pressures the producer; on shutdown
/// the queue is drained one last time and the file flushed.
pub async fn run_event_logger(
    queue: Arc<EventQueue>,
    writer: Arc<EventWriter>,
    drain_interval: Duration,
    mut shutdown: broadcast::Receiver<()>,
) {
    info!("Event logger writing to {:?}", writer.path());
    loop {
        drain(&queue, &writer);
        tokio::select! {
            _ = tokio::time::sleep(drain_interval) => {}
            _ = shutdown.recv() => {
                break;
            }
        }
    }
    drain(&queue, &writer);
    if let Err(err) = writer.flush() {
        warn!("Failed to flush event log: {}", err);
    }
    info!("Event logger stopped after {} events", writer.written());
}

fn drain(queue: &EventQueue, writer: &EventWriter) {
    while let Some(event) = queue.pop() {
        if let Err(err) = writer.write_event(&event) {
            warn!("Failed to persist event {}: {}", event.event_id, err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Hit;

    #[test]
    fn writes_one_json_object_per_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.jsonl");
        let writer = EventWriter::create(&path).unwrap();

        for id in 0..3u64 {
            let mut event = Event::new(id);
            event.hits.push(Hit::new(5, 42.0, 17.5).unwrap());
            writer.write_event(&event).unwrap();
        }
        writer.flush().unwrap();
        assert_eq!(writer.written(), 3);

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        for (idx, line) in lines.iter().enumerate() {
            let value: serde_json::Value = serde_json::from_str(line).unwrap();
            assert_eq!(value["event_id"], idx as u64);
            assert_eq!(value["hit_count"], 1);
        }
    }

    #[test]
    fn append_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.jsonl");

        {
            let writer = EventWriter::create(&path).unwrap();
            writer.write_event(&Event::new(0)).unwrap();
            writer.flush().unwrap();
        }
        {
            let writer = EventWriter::create(&path).unwrap();
            writer.write_event(&Event::new(1)).unwrap();
            writer.flush().unwrap();
        }

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);
    }

    #[tokio::test]
    async fn logger_drains_queue_on_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.jsonl");
        let writer = Arc::new(EventWriter::create(&path).unwrap());
        let queue = Arc::new(EventQueue::new(16));

        for id in 0..5u64 {
            queue.push(Arc::new(Event::new(id)));
        }

        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let task = tokio::spawn(run_event_logger(
            queue.clone(),
            writer.clone(),
            Duration::from_millis(5),
            shutdown_rx,
        ));

        tokio::time::sleep(Duration::from_millis(20)).await;
        queue.push(Arc::new(Event::new(5)));
        shutdown_tx.send(()).unwrap();
        task.await.unwrap();

        assert_eq!(writer.written(), 6);
        assert!(queue.is_empty());
    }
}
