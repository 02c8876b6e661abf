use std::sync::Arc;

use async_trait::async_trait;
use pajgps_api::DeviceId;

use super::{unique_id, Entity, EntityKind, EntityState};
use crate::coordinator::{Coordinator, PositionSource};

/// GPS location of a device; named after the device itself
pub struct DeviceTracker {
    coordinator: Arc<Coordinator>,
    device_id: DeviceId,
    unique_id: String,
    name: String,
    state: EntityState,
}

impl DeviceTracker {
    pub fn new(coordinator: Arc<Coordinator>, guid: &str, device_id: DeviceId, device_name: &str) -> Self {
        Self {
            coordinator,
            device_id,
            unique_id: unique_id(guid, device_id, "gps"),
            name: device_name.to_string(),
            state: EntityState::Unavailable,
        }
    }
}

#[async_trait]
impl Entity for DeviceTracker {
    fn unique_id(&self) -> &str {
        &self.unique_id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn device_id(&self) -> DeviceId {
        self.device_id
    }

    fn kind(&self) -> EntityKind {
        EntityKind::DeviceTracker
    }

    fn state(&self) -> EntityState {
        self.state.clone()
    }

    fn icon(&self) -> Option<&'static str> {
        Some("mdi:map-marker")
    }

    async fn update(&mut self) {
        let coordinates = self
            .coordinator
            .get_position(self.device_id)
            .and_then(|record| record.coordinates());

        self.state = match coordinates {
            Some((latitude, longitude)) => EntityState::Location {
                latitude,
                longitude,
                elevation: self.coordinator.data().elevations.get(&self.device_id).copied(),
            },
            None => EntityState::Unavailable,
        };
    }
}
