//! Shared fixtures for scanner-hub integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncWriteExt, DuplexStream};
use tokio::sync::broadcast;
use tokio::time::Instant;

use scanner_hub::database::{DbPool, init_pool_with_size, run_migrations};
use scanner_hub::domain::{DecodedRecord, StatusTransitionEvent};
use scanner_hub::persistence::PersistenceSink;
use scanner_hub::supervisor::{Connector, DeviceStream, SupervisorEvent};
use scanner_hub::{Error, Result};

/// Single-connection in-memory database with migrations applied.
pub async fn setup_test_db() -> DbPool {
    let pool = init_pool_with_size("sqlite::memory:", 1)
        .await
        .expect("Failed to create test pool");

    run_migrations(&pool)
        .await
        .expect("Failed to run migrations");

    pool
}

/// What the scripted connector does on one connect call.
#[derive(Debug, Clone)]
pub enum Step {
    Refuse,
    /// Never completes.
    Hang,
    /// Accept and send `payload`; keep the link open if `hold_open`.
    Stream { payload: Vec<u8>, hold_open: bool },
}

impl Step {
    pub fn lines(lines: &[&str], hold_open: bool) -> Self {
        let mut payload = Vec::new();
        for line in lines {
            payload.extend_from_slice(line.as_bytes());
            payload.extend_from_slice(b"\r\n");
        }
        Step::Stream { payload, hold_open }
    }
}

/// Connector replaying a script, then falling back to a fixed step.
pub struct ScriptedConnector {
    steps: Mutex<VecDeque<Step>>,
    fallback: Step,
    calls: Mutex<Vec<(Instant, String, u16)>>,
    peers: Mutex<Vec<DuplexStream>>,
}

impl ScriptedConnector {
    pub fn new(steps: Vec<Step>, fallback: Step) -> Arc<Self> {
        Arc::new(Self {
            steps: Mutex::new(steps.into()),
            fallback,
            calls: Mutex::new(Vec::new()),
            peers: Mutex::new(Vec::new()),
        })
    }

    pub fn refusing() -> Arc<Self> {
        Self::new(Vec::new(), Step::Refuse)
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn call_times(&self) -> Vec<Instant> {
        self.calls.lock().iter().map(|(at, _, _)| *at).collect()
    }

    pub fn last_target(&self) -> Option<(String, u16)> {
        self.calls.lock().last().map(|(_, host, port)| (host.clone(), *port))
    }
}

#[async_trait]
impl Connector for ScriptedConnector {
    async fn connect(&self, host: &str, port: u16) -> io::Result<DeviceStream> {
        self.calls.lock().push((Instant::now(), host.to_string(), port));
        let step = self
            .steps
            .lock()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());

        match step {
            Step::Refuse => Err(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                "connection refused",
            )),
            Step::Hang => std::future::pending().await,
            Step::Stream { payload, hold_open } => {
                let (client, mut server) = tokio::io::duplex(64 * 1024);
                server.write_all(&payload).await?;
                if hold_open {
                    self.peers.lock().push(server);
                }
                Ok(Box::new(client))
            }
        }
    }
}

/// In-memory sink capturing everything written through it.
#[derive(Default)]
pub struct MemorySink {
    pub records: Mutex<Vec<(String, DecodedRecord)>>,
    pub statuses: Mutex<Vec<StatusTransitionEvent>>,
    pub fail_records: bool,
}

impl MemorySink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing_records() -> Arc<Self> {
        Arc::new(Self {
            fail_records: true,
            ..Default::default()
        })
    }

    pub fn statuses_for(&self, device_id: &str) -> Vec<StatusTransitionEvent> {
        self.statuses
            .lock()
            .iter()
            .filter(|e| e.device_id == device_id)
            .cloned()
            .collect()
    }

    pub fn records_for(&self, device_id: &str) -> Vec<DecodedRecord> {
        self.records
            .lock()
            .iter()
            .filter(|(id, _)| id == device_id)
            .map(|(_, record)| record.clone())
            .collect()
    }
}

#[async_trait]
impl PersistenceSink for MemorySink {
    async fn append_record(
        &self,
        device_id: &str,
        record: &DecodedRecord,
        _received_at: DateTime<Utc>,
    ) -> Result<()> {
        if self.fail_records {
            return Err(Error::persistence("disk full"));
        }
        self.records
            .lock()
            .push((device_id.to_string(), record.clone()));
        Ok(())
    }

    async fn append_status_event(&self, event: &StatusTransitionEvent) -> Result<()> {
        self.statuses.lock().push(event.clone());
        Ok(())
    }
}

/// Wait for the first event matching `predicate`, skipping the rest.
pub async fn wait_for<F>(
    events: &mut broadcast::Receiver<SupervisorEvent>,
    mut predicate: F,
) -> SupervisorEvent
where
    F: FnMut(&SupervisorEvent) -> bool,
{
    let wait = async {
        loop {
            match events.recv().await {
                Ok(event) if predicate(&event) => return event,
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => panic!("event bus closed"),
            }
        }
    };
    tokio::time::timeout(Duration::from_secs(3600), wait)
        .await
        .expect("timed out waiting for supervisor event")
}
