//! Connection supervisor for a single scanner.
//!
//! A supervisor runs one connection cycle at a time:
//! connect, stream records, disconnect, back off, reconnect. Every cycle
//! captures the supervisor generation when it is spawned; state commits from
//! a cycle whose generation has moved on (forced reconnect, stop) are dropped,
//! so a stale cycle can neither resurrect a stopped supervisor nor clobber a
//! fresh one.

use chrono::Utc;
use futures::StreamExt;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::codec::FramedRead;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, info_span, warn};

use scan_frame::{LineFramer, decode_line};

use crate::Result;
use crate::domain::status_event::{ADDRESS_NOT_CONFIGURED, APPLICATION_SHUTDOWN, CONNECTION_CLOSED};
use crate::domain::{ConnectionState, DeviceEndpoint, DeviceStatus, StatusTransitionEvent};
use crate::persistence::{DeviceWriter, PersistenceSink, PersistenceStats, WriteJob};
use crate::supervisor::config::SupervisorConfig;
use crate::supervisor::connector::{Connector, DeviceStream};
use crate::supervisor::events::SupervisorEvent;
use crate::supervisor::registry::StatusRegistry;

/// Collaborators shared by every supervisor of an orchestrator.
#[derive(Clone)]
pub struct SupervisorContext {
    pub config: Arc<SupervisorConfig>,
    pub connector: Arc<dyn Connector>,
    pub sink: Arc<dyn PersistenceSink>,
    pub registry: StatusRegistry,
    pub events: broadcast::Sender<SupervisorEvent>,
}

/// State change requested by a connection cycle.
#[derive(Debug)]
enum Transition {
    Connecting,
    Connected,
    /// Disconnected without counting an attempt.
    Disconnected(String),
    /// Disconnected and counted as an unsuccessful attempt.
    Failed(String),
}

/// How a streaming session ended.
enum StreamEnd {
    Closed,
    Failed(String),
    Cancelled,
}

struct SupervisorState {
    connection: ConnectionState,
    generation: u64,
    started: bool,
    stopped: bool,
}

struct CycleHandle {
    token: CancellationToken,
    task: JoinHandle<()>,
}

struct Shared {
    endpoint: DeviceEndpoint,
    ctx: SupervisorContext,
    state: Mutex<SupervisorState>,
    cycle: Mutex<Option<CycleHandle>>,
    writer: DeviceWriter,
    /// Cancelled once on stop; every cycle token is a child of it.
    root: CancellationToken,
}

/// Owns the link to one scanner and keeps it alive until stopped.
pub struct ConnectionSupervisor {
    shared: Arc<Shared>,
}

impl ConnectionSupervisor {
    /// Create a supervisor in the initial disconnected state.
    ///
    /// Must be called within a tokio runtime; the device writer is spawned here.
    pub fn new(endpoint: DeviceEndpoint, ctx: SupervisorContext) -> Self {
        let writer = DeviceWriter::spawn(endpoint.id.clone(), Arc::clone(&ctx.sink), ctx.events.clone());
        let shared = Shared {
            endpoint,
            ctx,
            state: Mutex::new(SupervisorState {
                connection: ConnectionState::new(),
                generation: 0,
                started: false,
                stopped: false,
            }),
            cycle: Mutex::new(None),
            writer,
            root: CancellationToken::new(),
        };
        Self {
            shared: Arc::new(shared),
        }
    }

    pub fn device_id(&self) -> &str {
        &self.shared.endpoint.id
    }

    pub fn endpoint(&self) -> &DeviceEndpoint {
        &self.shared.endpoint
    }

    /// Record the startup status and spawn the first connection cycle.
    ///
    /// Returns `false` if the supervisor was already started or has been stopped.
    pub fn start(&self) -> bool {
        let generation = {
            let mut state = self.shared.state.lock();
            if state.started || state.stopped {
                return false;
            }
            state.started = true;
            self.shared.publish(&state.connection, true);
            state.generation
        };

        info!(device_id = %self.device_id(), endpoint = %self.shared.endpoint, "Starting supervisor");
        self.shared.spawn_cycle(generation);
        true
    }

    /// Tear down the current link and start a fresh cycle after a short delay.
    ///
    /// The attempt counter starts over. Returns `false` if the supervisor is stopped.
    pub fn force_reconnect(&self) -> bool {
        let generation = {
            let mut state = self.shared.state.lock();
            if state.stopped {
                return false;
            }
            state.generation += 1;
            match state.connection.reset() {
                Ok(()) => self.shared.publish(&state.connection, false),
                Err(e) => warn!(device_id = %self.device_id(), error = %e, "Failed to reset connection state"),
            }
            state.generation
        };

        self.shared.cancel_cycle();

        let shared = Arc::clone(&self.shared);
        let delay = self.shared.ctx.config.force_reconnect_delay();
        info!(device_id = %self.device_id(), delay_ms = delay.as_millis() as u64, "Forcing reconnect");

        tokio::spawn(async move {
            tokio::select! {
                _ = shared.root.cancelled() => return,
                _ = tokio::time::sleep(delay) => {}
            }
            let current = {
                let state = shared.state.lock();
                !state.stopped && state.generation == generation
            };
            if current {
                shared.spawn_cycle(generation);
            }
        });
        true
    }

    /// Close the link, record the shutdown and flush pending writes.
    ///
    /// No connection attempt is made after this returns, even one that was
    /// already scheduled.
    pub async fn stop(&self) -> Result<()> {
        {
            let mut state = self.shared.state.lock();
            if state.stopped {
                return Ok(());
            }
            state.stopped = true;
            state.generation += 1;
            match state.connection.mark_shutdown(APPLICATION_SHUTDOWN) {
                Ok(()) => self.shared.publish(&state.connection, true),
                Err(e) => warn!(device_id = %self.device_id(), error = %e, "Failed to record shutdown"),
            }
        }

        self.shared.root.cancel();
        let cycle = self.shared.cycle.lock().take();
        if let Some(cycle) = cycle
            && let Err(e) = cycle.task.await
        {
            warn!(device_id = %self.device_id(), error = %e, "Connection cycle ended abnormally");
        }

        let result = self
            .shared
            .writer
            .close(self.shared.ctx.config.shutdown_flush_timeout())
            .await;

        let _ = self.shared.ctx.events.send(SupervisorEvent::Stopped {
            device_id: self.device_id().to_string(),
        });
        info!(device_id = %self.device_id(), "Supervisor stopped");
        result
    }

    pub fn status(&self) -> DeviceStatus {
        let state = self.shared.state.lock();
        DeviceStatus::from_state(&self.shared.endpoint, &state.connection)
    }

    pub fn persistence_stats(&self) -> PersistenceStats {
        self.shared.writer.stats()
    }

    pub fn is_stopped(&self) -> bool {
        self.shared.state.lock().stopped
    }
}

impl Shared {
    /// Mirror the state into the registry and, for recorded transitions,
    /// queue the history entry and announce it.
    ///
    /// Called with the state lock held so entries stay ordered.
    fn publish(&self, connection: &ConnectionState, record_event: bool) {
        self.ctx.registry.publish(
            &self.endpoint.id,
            DeviceStatus::from_state(&self.endpoint, connection),
        );
        if !record_event {
            return;
        }

        let event = StatusTransitionEvent::capture(&self.endpoint, connection);
        self.writer.submit(WriteJob::Status(event.clone()));
        let _ = self.ctx.events.send(SupervisorEvent::StatusChanged { event });
    }

    /// Commit a transition on behalf of the cycle of `generation`.
    ///
    /// Returns `false` when the cycle is stale and must exit.
    fn apply(&self, generation: u64, transition: Transition) -> bool {
        let mut state = self.state.lock();
        if state.stopped || state.generation != generation {
            debug!(device_id = %self.endpoint.id, ?transition, "Discarding transition from stale cycle");
            return false;
        }

        let (result, record_event) = match transition {
            Transition::Connecting => (state.connection.begin_connecting(), false),
            Transition::Connected => (state.connection.mark_connected(), true),
            Transition::Disconnected(reason) => (state.connection.mark_disconnected(Some(reason)), true),
            Transition::Failed(reason) => (state.connection.record_failure(reason), true),
        };

        match result {
            Ok(()) => self.publish(&state.connection, record_event),
            Err(e) => warn!(device_id = %self.endpoint.id, error = %e, "Ignoring illegal connection transition"),
        }
        true
    }

    fn reconnect_attempts(&self) -> u32 {
        self.state.lock().connection.reconnect_attempts
    }

    fn spawn_cycle(self: &Arc<Self>, generation: u64) {
        let token = self.root.child_token();
        let span = info_span!("supervisor", device_id = %self.endpoint.id, generation);
        let task = tokio::spawn(Arc::clone(self).run_cycle(generation, token.clone()).instrument(span));

        let previous = self.cycle.lock().replace(CycleHandle { token, task });
        if let Some(previous) = previous {
            previous.token.cancel();
        }
    }

    fn cancel_cycle(&self) {
        let cycle = self.cycle.lock().take();
        if let Some(cycle) = cycle {
            cycle.token.cancel();
        }
    }

    async fn run_cycle(self: Arc<Self>, generation: u64, token: CancellationToken) {
        let config = Arc::clone(&self.ctx.config);

        loop {
            let Some(host) = self.endpoint.address().map(str::to_string) else {
                if !self.apply(generation, Transition::Disconnected(ADDRESS_NOT_CONFIGURED.to_string())) {
                    return;
                }
                debug!("Scanner address not configured, checking again later");
                if !wait(&token, config.unconfigured_retry()).await {
                    return;
                }
                continue;
            };

            if !self.apply(generation, Transition::Connecting) {
                return;
            }
            let port = self.endpoint.port;
            debug!(host = %host, port, "Connecting");

            let connect = tokio::time::timeout(
                config.connect_timeout(),
                self.ctx.connector.connect(&host, port),
            );
            let outcome = tokio::select! {
                biased;
                _ = token.cancelled() => return,
                outcome = connect => outcome,
            };

            let failure = match outcome {
                Ok(Ok(stream)) => {
                    if !self.apply(generation, Transition::Connected) {
                        return;
                    }
                    info!(host = %host, port, "Connected");

                    match self.stream_records(stream, &token, config.max_line_length).await {
                        StreamEnd::Cancelled => return,
                        StreamEnd::Closed => {}
                        StreamEnd::Failed(error) => {
                            warn!(error = %error, "Transport error while connected");
                            if !self.apply(generation, Transition::Disconnected(error)) {
                                return;
                            }
                        }
                    }
                    CONNECTION_CLOSED.to_string()
                }
                Ok(Err(e)) => {
                    warn!(host = %host, port, error = %e, "Connection attempt failed");
                    e.to_string()
                }
                Err(_) => {
                    warn!(host = %host, port, "Connection attempt timed out");
                    format!("connect timed out after {}ms", config.connect_timeout_ms)
                }
            };

            if !self.apply(generation, Transition::Failed(failure)) {
                return;
            }

            let attempt = self.reconnect_attempts();
            let delay = config.backoff.delay_for_attempt(attempt);
            info!(attempt, delay_ms = delay.as_millis() as u64, "Scheduling reconnect");
            let _ = self.ctx.events.send(SupervisorEvent::ReconnectScheduled {
                device_id: self.endpoint.id.clone(),
                attempt,
                delay,
            });

            if !wait(&token, delay).await {
                return;
            }
        }
    }

    /// Decode and persist every inbound line until the link ends.
    async fn stream_records(
        &self,
        stream: DeviceStream,
        token: &CancellationToken,
        max_line_length: usize,
    ) -> StreamEnd {
        let mut frames = FramedRead::new(stream, LineFramer::with_max_length(max_line_length));

        loop {
            let next = tokio::select! {
                biased;
                _ = token.cancelled() => return StreamEnd::Cancelled,
                next = frames.next() => next,
            };

            match next {
                Some(Ok(line)) => {
                    let received_at = Utc::now();
                    let record = decode_line(&line);
                    if let Some(reason) = record.error_reason() {
                        debug!(reason, payload = %record.raw_payload(), "Invalid record");
                    }
                    let _ = self.ctx.events.send(SupervisorEvent::RecordDecoded {
                        device_id: self.endpoint.id.clone(),
                        is_valid: record.is_valid(),
                    });
                    self.writer.submit(WriteJob::Record {
                        record,
                        received_at,
                    });
                }
                Some(Err(e)) => return StreamEnd::Failed(e.to_string()),
                None => return StreamEnd::Closed,
            }
        }
    }
}

/// Sleep for `delay` unless cancelled first. Returns `false` on cancellation.
async fn wait(token: &CancellationToken, delay: Duration) -> bool {
    tokio::select! {
        biased;
        _ = token.cancelled() => false,
        _ = tokio::time::sleep(delay) => true,
    }
}
