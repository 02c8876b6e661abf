use std::sync::Arc;

use async_trait::async_trait;
use pajgps_api::DeviceId;

use super::{unique_id, Entity, EntityKind, EntityState};
use crate::coordinator::{Coordinator, PositionSource};

const MAX_SPEED_KMH: f64 = 1000.0;

pub struct SpeedSensor {
    coordinator: Arc<Coordinator>,
    device_id: DeviceId,
    unique_id: String,
    name: String,
    speed: Option<f64>,
}

impl SpeedSensor {
    pub fn new(coordinator: Arc<Coordinator>, guid: &str, device_id: DeviceId, device_name: &str) -> Self {
        Self {
            coordinator,
            device_id,
            unique_id: unique_id(guid, device_id, "speed"),
            name: format!("{} Speed", device_name),
            speed: None,
        }
    }
}

#[async_trait]
impl Entity for SpeedSensor {
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
        self.speed.into()
    }

    fn icon(&self) -> Option<&'static str> {
        Some("mdi:speedometer")
    }

    fn unit(&self) -> Option<&'static str> {
        Some("km/h")
    }

    async fn update(&mut self) {
        self.speed = self
            .coordinator
            .get_position(self.device_id)
            .and_then(|record| record.speed)
            .map(|speed| (speed as f64).clamp(0.0, MAX_SPEED_KMH));
    }
}
