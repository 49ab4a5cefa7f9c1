//! Process-wide view of the latest status of every scanner.

use dashmap::DashMap;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::domain::DeviceStatus;

/// Concurrent map from device id to its latest status.
///
/// Each slot is written only by the supervisor owning that device.
#[derive(Debug, Clone, Default)]
pub struct StatusRegistry {
    statuses: Arc<DashMap<String, DeviceStatus>>,
}

impl StatusRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, device_id: &str, status: DeviceStatus) {
        self.statuses.insert(device_id.to_string(), status);
    }

    pub fn get(&self, device_id: &str) -> Option<DeviceStatus> {
        self.statuses.get(device_id).map(|entry| entry.value().clone())
    }

    /// Point-in-time copy of every slot, ordered by device id.
    pub fn snapshot(&self) -> BTreeMap<String, DeviceStatus> {
        self.statuses
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.statuses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statuses.is_empty()
    }
}
