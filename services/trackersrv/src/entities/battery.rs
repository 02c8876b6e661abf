use std::sync::Arc;

use async_trait::async_trait;
use pajgps_api::DeviceId;

use super::{unique_id, Entity, EntityKind, EntityState};
use crate::coordinator::{Coordinator, PositionSource};

/// Icon for a battery percentage, in steps of ten
pub fn battery_icon(level: Option<i64>) -> &'static str {
    match level {
        Some(100) => "mdi:battery",
        Some(90..=99) => "mdi:battery-90",
        Some(80..=89) => "mdi:battery-80",
        Some(70..=79) => "mdi:battery-70",
        Some(60..=69) => "mdi:battery-60",
        Some(50..=59) => "mdi:battery-50",
        Some(40..=49) => "mdi:battery-40",
        Some(30..=39) => "mdi:battery-30",
        Some(20..=29) => "mdi:battery-20",
        Some(10..=19) => "mdi:battery-10",
        _ => "mdi:battery-alert",
    }
}

pub struct BatterySensor {
    coordinator: Arc<Coordinator>,
    device_id: DeviceId,
    unique_id: String,
    name: String,
    level: Option<i64>,
}

impl BatterySensor {
    pub fn new(coordinator: Arc<Coordinator>, guid: &str, device_id: DeviceId, device_name: &str) -> Self {
        Self {
            coordinator,
            device_id,
            unique_id: unique_id(guid, device_id, "battery"),
            name: format!("{} Battery Level", device_name),
            level: None,
        }
    }
}

#[async_trait]
impl Entity for BatterySensor {
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
        self.level.into()
    }

    fn icon(&self) -> Option<&'static str> {
        Some(battery_icon(self.level))
    }

    fn unit(&self) -> Option<&'static str> {
        Some("%")
    }

    async fn update(&mut self) {
        self.level = self
            .coordinator
            .get_position(self.device_id)
            .and_then(|record| record.battery)
            .map(|level| level.clamp(0, 100));
    }
}
