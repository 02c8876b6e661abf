use std::sync::Arc;

use async_trait::async_trait;
use pajgps_api::DeviceId;

use super::{unique_id, Entity, EntityKind, EntityState};
use crate::coordinator::Coordinator;

const MAX_ELEVATION_M: f64 = 10000.0;

/// Elevation looked up for the device's last position
pub struct ElevationSensor {
    coordinator: Arc<Coordinator>,
    device_id: DeviceId,
    unique_id: String,
    name: String,
    elevation: Option<f64>,
}

impl ElevationSensor {
    pub fn new(coordinator: Arc<Coordinator>, guid: &str, device_id: DeviceId, device_name: &str) -> Self {
        Self {
            coordinator,
            device_id,
            unique_id: unique_id(guid, device_id, "elevation"),
            name: format!("{} Elevation", device_name),
            elevation: None,
        }
    }
}

#[async_trait]
impl Entity for ElevationSensor {
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
        EntityKind::Sensor
    }

    fn state(&self) -> EntityState {
        self.elevation.into()
    }

    fn icon(&self) -> Option<&'static str> {
        Some("mdi:map-marker-up")
    }

    fn unit(&self) -> Option<&'static str> {
        Some("m")
    }

    async fn update(&mut self) {
        self.elevation = self
            .coordinator
            .data()
            .elevations
            .get(&self.device_id)
            .copied()
            .map(|metres| metres.clamp(0.0, MAX_ELEVATION_M));
    }
}
