use async_trait::async_trait;
use errors::Result;

use crate::alert::AlertType;
use crate::models::{Device, DeviceId, Notification, PositionPayload};

/// Operations the bridge needs from the tracker cloud
#[async_trait]
pub trait TrackerApi: Send + Sync {
    /// Obtain a bearer token; a cached one is reused until it expires unless `force` is set
    async fn login(&self, force: bool) -> Result<()>;

    async fn get_devices(&self) -> Result<Vec<Device>>;

    /// Latest raw position entry for each requested device
    async fn get_all_last_positions(&self, device_ids: &[DeviceId]) -> Result<Vec<PositionPayload>>;

    async fn get_unread_notifications(&self) -> Result<Vec<Notification>>;

    /// Mark every notification of the given `meldungtyp` as read
    async fn mark_notifications_read(&self, alert_type: u8) -> Result<()>;

    /// Enable or disable one alert kind on one device
    async fn update_device_flag(
        &self,
        device_id: DeviceId,
        alert: AlertType,
        enabled: bool,
    ) -> Result<()>;

    /// `true` only when the API host answers with HTTP 200
    async fn check_availability(&self) -> bool;
}

/// Terrain elevation lookup
#[async_trait]
pub trait ElevationApi: Send + Sync {
    /// Elevation in metres, `None` when the service has no answer
    async fn fetch_elevation(&self, lat: f64, lng: f64) -> Result<Option<f64>>;
}
