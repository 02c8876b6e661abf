use std::sync::Arc;

use async_trait::async_trait;
use errors::Result;
use pajgps_api::{AlertType, DeviceId};

use super::{unique_id, Entity, EntityKind, EntityState};
use crate::coordinator::Coordinator;

/// On while an unread notification of its kind exists for the device
pub struct AlertSensor {
    coordinator: Arc<Coordinator>,
    device_id: DeviceId,
    alert: AlertType,
    unique_id: String,
    name: String,
    active: bool,
}

impl AlertSensor {
    pub fn new(
        coordinator: Arc<Coordinator>,
        guid: &str,
        device_id: DeviceId,
        device_name: &str,
        alert: AlertType,
    ) -> Self {
        Self {
            coordinator,
            device_id,
            alert,
            unique_id: unique_id(guid, device_id, &format!("alert_{}", alert.code())),
            name: format!("{} {}", device_name, alert.name()),
            active: false,
        }
    }

    pub fn is_on(&self) -> bool {
        self.active
    }
}

#[async_trait]
impl Entity for AlertSensor {
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
        EntityKind::BinarySensor
    }

    fn state(&self) -> EntityState {
        EntityState::Binary(self.active)
    }

    fn icon(&self) -> Option<&'static str> {
        Some(if self.active { "mdi:bell-alert" } else { "mdi:bell" })
    }

    async fn update(&mut self) {
        let code = self.alert.code();
        self.active = self
            .coordinator
            .data()
            .notifications
            .get(&self.device_id)
            .is_some_and(|unread| unread.iter().any(|n| n.alert_type == code));
    }
}

/// Enables or disables one alert kind on the device
pub struct AlertSwitch {
    coordinator: Arc<Coordinator>,
    device_id: DeviceId,
    alert: AlertType,
    unique_id: String,
    name: String,
    enabled: Option<bool>,
}

impl AlertSwitch {
    pub fn new(
        coordinator: Arc<Coordinator>,
        guid: &str,
        device_id: DeviceId,
        device_name: &str,
        alert: AlertType,
    ) -> Self {
        Self {
            coordinator,
            device_id,
            alert,
            unique_id: unique_id(guid, device_id, &format!("switch_{}", alert.code())),
            name: format!("{} {} Switch", device_name, alert.name()),
            enabled: None,
        }
    }

    pub async fn turn_on(&mut self) -> Result<()> {
        self.set(true).await
    }

    pub async fn turn_off(&mut self) -> Result<()> {
        self.set(false).await
    }

    async fn set(&mut self, enabled: bool) -> Result<()> {
        self.coordinator
            .update_alert_state(self.device_id, self.alert, enabled)
            .await?;
        self.enabled = Some(enabled);
        Ok(())
    }

    fn read_flag(&self) -> Option<bool> {
        self.coordinator
            .data()
            .device(self.device_id)
            .map(|device| device.alert_enabled(self.alert))
    }
}

#[async_trait]
impl Entity for AlertSwitch {
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
        EntityKind::Switch
    }

    fn state(&self) -> EntityState {
        self.enabled.map_or(EntityState::Unavailable, EntityState::Binary)
    }

    fn icon(&self) -> Option<&'static str> {
        Some("mdi:bell-cog")
    }

    async fn update(&mut self) {
        self.enabled = self.read_flag();
    }
}
