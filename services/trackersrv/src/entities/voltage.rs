use std::ops::RangeInclusive;
use std::sync::Arc;

use async_trait::async_trait;
use pajgps_api::DeviceId;
use tracing::error;

use super::{unique_id, Entity, EntityKind, EntityState};
use crate::coordinator::PositionSource;

/// Readings outside this range (volts) are treated as telemetry noise
pub const PLAUSIBLE_VOLTAGE_RANGE: RangeInclusive<f64> = 0.0..=50.0;

/// Supply voltage of one tracker
///
/// Only created for models with voltage alarm support.
pub struct VoltageSensor {
    source: Arc<dyn PositionSource>,
    device_id: DeviceId,
    unique_id: String,
    name: String,
    value: Option<f64>,
}

impl VoltageSensor {
    pub fn new(source: Arc<dyn PositionSource>, guid: &str, device_id: DeviceId, device_name: &str) -> Self {
        Self {
            source,
            device_id,
            unique_id: unique_id(guid, device_id, "voltage"),
            name: format!("{} Voltage", device_name),
            value: None,
        }
    }

    /// Current reading in volts
    pub fn value(&self) -> Option<f64> {
        self.value
    }

    pub fn precision(&self) -> u8 {
        1
    }
}

#[async_trait]
impl Entity for VoltageSensor {
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
        self.value.into()
    }

    fn icon(&self) -> Option<&'static str> {
        Some("mdi:flash")
    }

    fn unit(&self) -> Option<&'static str> {
        Some("V")
    }

    async fn update(&mut self) {
        if let Err(e) = self.source.refresh().await {
            error!("Voltage update for device {} failed: {}", self.device_id, e);
            self.value = None;
            return;
        }

        self.value = self
            .source
            .get_position(self.device_id)
            .and_then(|record| record.voltage)
            .filter(|volts| PLAUSIBLE_VOLTAGE_RANGE.contains(volts));
    }
}
