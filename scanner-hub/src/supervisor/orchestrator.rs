//! Supervisor orchestration.
//!
//! Owns one [`ConnectionSupervisor`] per configured scanner and exposes the
//! lifecycle and status operations used by the binary and the HTTP layer.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures::future::join_all;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use crate::domain::{DeviceEndpoint, DeviceStatus};
use crate::persistence::{PersistenceSink, PersistenceStats};
use crate::supervisor::config::SupervisorConfig;
use crate::supervisor::connector::Connector;
use crate::supervisor::device::{ConnectionSupervisor, SupervisorContext};
use crate::supervisor::events::SupervisorEvent;
use crate::supervisor::registry::StatusRegistry;

/// Manages the supervisors of every scanner.
pub struct SupervisorOrchestrator {
    /// Live supervisors (device_id -> supervisor)
    supervisors: DashMap<String, Arc<ConnectionSupervisor>>,
    ctx: SupervisorContext,
}

impl SupervisorOrchestrator {
    pub fn new(
        config: SupervisorConfig,
        connector: Arc<dyn Connector>,
        sink: Arc<dyn PersistenceSink>,
    ) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));

        Self {
            supervisors: DashMap::new(),
            ctx: SupervisorContext {
                config: Arc::new(config),
                connector,
                sink,
                registry: StatusRegistry::new(),
                events,
            },
        }
    }

    /// Subscribe to supervisor events.
    pub fn subscribe(&self) -> broadcast::Receiver<SupervisorEvent> {
        self.ctx.events.subscribe()
    }

    pub fn registry(&self) -> &StatusRegistry {
        &self.ctx.registry
    }

    /// Start one supervisor per endpoint.
    ///
    /// Endpoints whose id already has a live supervisor, or that the sink
    /// cannot store, are logged and skipped. Returns how many were started.
    pub fn start_all(&self, endpoints: &[DeviceEndpoint]) -> usize {
        let mut started = 0;

        for endpoint in endpoints {
            if !self.ctx.sink.supports_device(&endpoint.id) {
                error!(device_id = %endpoint.id, "Record store rejected device id, skipping");
                continue;
            }

            match self.supervisors.entry(endpoint.id.clone()) {
                Entry::Occupied(_) => {
                    warn!(device_id = %endpoint.id, "Supervisor already running, skipping");
                }
                Entry::Vacant(slot) => {
                    let supervisor =
                        Arc::new(ConnectionSupervisor::new(endpoint.clone(), self.ctx.clone()));
                    if supervisor.start() {
                        started += 1;
                    }
                    slot.insert(supervisor);
                }
            }
        }

        info!(started, configured = endpoints.len(), "Scanner supervisors started");
        started
    }

    /// Stop every live supervisor.
    ///
    /// Best effort: a failure flushing one device does not block the others.
    /// Returns how many supervisors were stopped.
    pub async fn stop_all(&self) -> usize {
        let ids: Vec<String> = self.supervisors.iter().map(|e| e.key().clone()).collect();
        let supervisors: Vec<Arc<ConnectionSupervisor>> = ids
            .iter()
            .filter_map(|id| self.supervisors.remove(id).map(|(_, s)| s))
            .collect();

        let results = join_all(supervisors.iter().map(|s| s.stop())).await;
        for (supervisor, result) in supervisors.iter().zip(results) {
            if let Err(e) = result {
                error!(device_id = %supervisor.device_id(), error = %e, "Failed to stop supervisor cleanly");
            }
        }

        info!(stopped = supervisors.len(), "Scanner supervisors stopped");
        supervisors.len()
    }

    /// Force a fresh connection cycle for one device.
    ///
    /// Returns `false` for an unknown device id; nothing changes in that case.
    pub fn force_reconnect(&self, device_id: &str) -> bool {
        let Some(supervisor) = self.supervisors.get(device_id).map(|e| Arc::clone(e.value())) else {
            warn!(device_id, "Reconnect requested for unknown device");
            return false;
        };
        supervisor.force_reconnect()
    }

    /// Point-in-time status of every device.
    pub fn current_status(&self) -> BTreeMap<String, DeviceStatus> {
        self.ctx.registry.snapshot()
    }

    pub fn device_status(&self, device_id: &str) -> Option<DeviceStatus> {
        self.ctx.registry.get(device_id)
    }

    /// Persistence counters of every live device.
    pub fn persistence_stats(&self) -> BTreeMap<String, PersistenceStats> {
        self.supervisors
            .iter()
            .map(|e| (e.key().clone(), e.value().persistence_stats()))
            .collect()
    }

    /// Ids of the live supervisors, sorted.
    pub fn device_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.supervisors.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }

    pub fn is_running(&self, device_id: &str) -> bool {
        self.supervisors.contains_key(device_id)
    }

    /// Whether the device is known, live or stopped.
    pub fn is_known(&self, device_id: &str) -> bool {
        self.is_running(device_id) || self.ctx.registry.get(device_id).is_some()
    }
}
