//! Per-device serialized writer.
//!
//! Each supervisor owns one writer. Jobs are queued without blocking the read
//! path and applied one at a time, so durable order equals receipt order.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::domain::{DecodedRecord, StatusTransitionEvent};
use crate::persistence::PersistenceSink;
use crate::supervisor::events::{PersistenceKind, SupervisorEvent};
use crate::{Error, Result};

/// A single write queued for a device.
#[derive(Debug, Clone)]
pub enum WriteJob {
    Record {
        record: DecodedRecord,
        received_at: DateTime<Utc>,
    },
    Status(StatusTransitionEvent),
}

impl WriteJob {
    fn kind(&self) -> PersistenceKind {
        match self {
            Self::Record { .. } => PersistenceKind::Record,
            Self::Status(_) => PersistenceKind::StatusEvent,
        }
    }
}

/// Write outcome counters of one device.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PersistenceStats {
    pub written: u64,
    pub failed: u64,
    pub last_error: Option<String>,
}

/// Serialized, non-blocking writer for one device.
pub struct DeviceWriter {
    device_id: String,
    sender: Mutex<Option<mpsc::UnboundedSender<WriteJob>>>,
    handle: Mutex<Option<JoinHandle<()>>>,
    stats: Arc<Mutex<PersistenceStats>>,
}

impl DeviceWriter {
    /// Spawn the write loop for a device.
    pub fn spawn(
        device_id: impl Into<String>,
        sink: Arc<dyn PersistenceSink>,
        events: broadcast::Sender<SupervisorEvent>,
    ) -> Self {
        let device_id = device_id.into();
        let (sender, receiver) = mpsc::unbounded_channel();
        let stats = Arc::new(Mutex::new(PersistenceStats::default()));

        let handle = tokio::spawn(Self::run_write_loop(
            device_id.clone(),
            receiver,
            sink,
            events,
            Arc::clone(&stats),
        ));

        Self {
            device_id,
            sender: Mutex::new(Some(sender)),
            handle: Mutex::new(Some(handle)),
            stats,
        }
    }

    /// Queue a write. Returns `false` once the writer is closed.
    pub fn submit(&self, job: WriteJob) -> bool {
        match self.sender.lock().as_ref() {
            Some(sender) => sender.send(job).is_ok(),
            None => {
                debug!(device_id = %self.device_id, "Dropping write for closed writer");
                false
            }
        }
    }

    pub fn stats(&self) -> PersistenceStats {
        self.stats.lock().clone()
    }

    /// Stop accepting writes and wait for queued ones to finish.
    pub async fn close(&self, timeout: Duration) -> Result<()> {
        drop(self.sender.lock().take());
        let handle = self.handle.lock().take();
        let Some(handle) = handle else {
            return Ok(());
        };

        match tokio::time::timeout(timeout, handle).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(Error::persistence(format!(
                "writer task for {} failed: {}",
                self.device_id, e
            ))),
            Err(_) => Err(Error::persistence(format!(
                "timed out after {:?} flushing pending writes for {}",
                timeout, self.device_id
            ))),
        }
    }

    async fn run_write_loop(
        device_id: String,
        mut receiver: mpsc::UnboundedReceiver<WriteJob>,
        sink: Arc<dyn PersistenceSink>,
        events: broadcast::Sender<SupervisorEvent>,
        stats: Arc<Mutex<PersistenceStats>>,
    ) {
        while let Some(job) = receiver.recv().await {
            let kind = job.kind();
            let result = match &job {
                WriteJob::Record {
                    record,
                    received_at,
                } => sink.append_record(&device_id, record, *received_at).await,
                WriteJob::Status(event) => sink.append_status_event(event).await,
            };

            match result {
                Ok(()) => stats.lock().written += 1,
                Err(e) => {
                    let error = e.to_string();
                    warn!(device_id = %device_id, kind = %kind, error = %error, "Persistence write failed");
                    {
                        let mut stats = stats.lock();
                        stats.failed += 1;
                        stats.last_error = Some(error.clone());
                    }
                    let _ = events.send(SupervisorEvent::PersistenceFailed {
                        device_id: device_id.clone(),
                        kind,
                        error,
                    });
                }
            }
        }
        debug!(device_id = %device_id, "Writer drained");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    /// Sink that records payloads and fails every invalid record.
    #[derive(Default)]
    struct PickySink {
        stored: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl PersistenceSink for PickySink {
        async fn append_record(
            &self,
            _device_id: &str,
            record: &DecodedRecord,
            _received_at: DateTime<Utc>,
        ) -> Result<()> {
            // Yield so queued jobs would overtake each other if writes were concurrent.
            tokio::task::yield_now().await;
            if !record.is_valid() {
                return Err(Error::persistence("rejected"));
            }
            self.stored.lock().push(record.raw_payload().to_string());
            Ok(())
        }

        async fn append_status_event(&self, _event: &StatusTransitionEvent) -> Result<()> {
            Ok(())
        }
    }

    fn record_job(line: &str) -> WriteJob {
        WriteJob::Record {
            record: scan_frame::decode_line(line),
            received_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_writes_applied_in_order() {
        let sink = Arc::new(PickySink::default());
        let (events, _rx) = broadcast::channel(16);
        let writer = DeviceWriter::spawn("scanner1", sink.clone(), events);

        for counter in 0..20 {
            assert!(writer.submit(record_job(&format!("A,OK,PC1,SN1,{counter}"))));
        }
        writer.close(Duration::from_secs(5)).await.unwrap();

        let stored = sink.stored.lock().clone();
        let expected: Vec<String> = (0..20).map(|c| format!("A,OK,PC1,SN1,{c}")).collect();
        assert_eq!(stored, expected);
        assert_eq!(writer.stats().written, 20);
    }

    #[tokio::test]
    async fn test_failure_reported_and_not_retried() {
        let sink = Arc::new(PickySink::default());
        let (events, mut rx) = broadcast::channel(16);
        let writer = DeviceWriter::spawn("scanner1", sink.clone(), events);

        writer.submit(record_job("not,a,record"));
        writer.submit(record_job("A,OK,PC1,SN1,1"));
        writer.close(Duration::from_secs(5)).await.unwrap();

        let stats = writer.stats();
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.written, 1);
        assert_eq!(stats.last_error.as_deref(), Some("Persistence error: rejected"));

        match rx.recv().await.unwrap() {
            SupervisorEvent::PersistenceFailed {
                device_id, kind, ..
            } => {
                assert_eq!(device_id, "scanner1");
                assert_eq!(kind, PersistenceKind::Record);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_submit_after_close_is_rejected() {
        let (events, _rx) = broadcast::channel(16);
        let writer = DeviceWriter::spawn("scanner1", Arc::new(PickySink::default()), events);
        writer.close(Duration::from_secs(1)).await.unwrap();

        assert!(!writer.submit(record_job("A,OK,PC1,SN1,1")));
        assert!(writer.close(Duration::from_secs(1)).await.is_ok());
    }
}
