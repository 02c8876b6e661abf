//! Host-facing entities
//!
//! Each entity reads one value for one device out of the coordinator and
//! exposes it with a stable unique id. `update()` is called once per host
//! tick, after the coordinator tick.

mod alert;
mod battery;
mod elevation;
mod speed;
mod tracker;
mod voltage;

use std::sync::Arc;

use async_trait::async_trait;
use pajgps_api::DeviceId;
use serde::Serialize;
use tracing::{info, warn};

pub use alert::{AlertSensor, AlertSwitch};
pub use battery::{battery_icon, BatterySensor};
pub use elevation::ElevationSensor;
pub use speed::SpeedSensor;
pub use tracker::DeviceTracker;
pub use voltage::{VoltageSensor, PLAUSIBLE_VOLTAGE_RANGE};

use crate::config::OptionsConfig;
use crate::coordinator::{device_display_name, Coordinator, PositionSource, DOMAIN};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Sensor,
    BinarySensor,
    Switch,
    DeviceTracker,
}

/// Observable state; `Unavailable` serializes as `null`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EntityState {
    Unavailable,
    Number(f64),
    Integer(i64),
    Binary(bool),
    Location {
        latitude: f64,
        longitude: f64,
        #[serde(skip_serializing_if = "Option::is_none")]
        elevation: Option<f64>,
    },
}

impl EntityState {
    pub fn is_available(&self) -> bool {
        !matches!(self, EntityState::Unavailable)
    }
}

impl From<Option<f64>> for EntityState {
    fn from(value: Option<f64>) -> Self {
        value.map_or(EntityState::Unavailable, EntityState::Number)
    }
}

impl From<Option<i64>> for EntityState {
    fn from(value: Option<i64>) -> Self {
        value.map_or(EntityState::Unavailable, EntityState::Integer)
    }
}

#[async_trait]
pub trait Entity: Send + Sync {
    fn unique_id(&self) -> &str;

    fn name(&self) -> &str;

    fn device_id(&self) -> DeviceId;

    fn kind(&self) -> EntityKind;

    fn state(&self) -> EntityState;

    fn icon(&self) -> Option<&'static str> {
        None
    }

    fn unit(&self) -> Option<&'static str> {
        None
    }

    /// Pull the latest value from the coordinator
    async fn update(&mut self);
}

/// `pajgps_{guid}_{device}_{suffix}`
pub fn unique_id(guid: &str, device_id: DeviceId, suffix: &str) -> String {
    format!("{}_{}_{}_{}", DOMAIN, guid, device_id, suffix)
}

/// Create every entity the known devices support
pub fn build_entities(coordinator: &Arc<Coordinator>, options: &OptionsConfig) -> Vec<Box<dyn Entity>> {
    let data = coordinator.data();
    let guid = coordinator.settings().guid.clone();
    let source: Arc<dyn PositionSource> = coordinator.clone();
    let mut entities: Vec<Box<dyn Entity>> = Vec::new();

    for device in &data.devices {
        let name = device_display_name(Some(device), device.id);

        entities.push(Box::new(DeviceTracker::new(coordinator.clone(), &guid, device.id, &name)));

        if device.has_alarm_voltage {
            entities.push(Box::new(VoltageSensor::new(source.clone(), &guid, device.id, &name)));
        }
        if device.has_battery || options.force_battery {
            entities.push(Box::new(BatterySensor::new(coordinator.clone(), &guid, device.id, &name)));
        }
        entities.push(Box::new(SpeedSensor::new(coordinator.clone(), &guid, device.id, &name)));
        if options.fetch_elevation {
            entities.push(Box::new(ElevationSensor::new(coordinator.clone(), &guid, device.id, &name)));
        }

        for alert in device.supported_alerts() {
            entities.push(Box::new(AlertSensor::new(coordinator.clone(), &guid, device.id, &name, alert)));
            entities.push(Box::new(AlertSwitch::new(coordinator.clone(), &guid, device.id, &name, alert)));
        }
    }

    if entities.is_empty() {
        warn!("No PAJ GPS devices found to add as entities");
    } else {
        info!("Created {} entities for {} devices", entities.len(), data.devices.len());
    }
    entities
}
