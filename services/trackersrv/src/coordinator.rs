//! Update coordinator
//!
//! Owns the API clients and all fetched state. Three tiers refresh at their
//! own pace: the device list (slow), positions (medium) and unread
//! notifications (fast). Readers get immutable snapshots; every update builds
//! a new snapshot and swaps it in.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use async_trait::async_trait;
use errors::{Result, TrackerError};
use pajgps_api::{AlertType, Device, DeviceId, ElevationApi, Notification, TrackerApi};
use serde::Serialize;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::config::IntervalConfig;
use crate::store::{PositionRecord, PositionStore};

/// Integration domain, prefix of device identifiers
pub const DOMAIN: &str = "pajgps";

pub const MANUFACTURER: &str = "PAJ GPS";

/// Minimum time between two elevation lookups for a device that already has one
pub const MIN_ELEVATION_UPDATE_DELAY: Duration = Duration::from_secs(300);

/// Minimum movement (degrees of latitude or longitude) before elevation is looked up again
pub const MIN_ELEVATION_DISTANCE: f64 = 0.0045;

/// Everything fetched besides positions
#[derive(Debug, Clone, Default, Serialize)]
pub struct CoordinatorData {
    pub devices: Vec<Device>,
    /// Unread notifications per device; every known device has an entry
    pub notifications: HashMap<DeviceId, Vec<Notification>>,
    /// Metres above sea level
    pub elevations: HashMap<DeviceId, f64>,
}

impl CoordinatorData {
    pub fn device(&self, device_id: DeviceId) -> Option<&Device> {
        self.devices.iter().find(|d| d.id == device_id)
    }
}

#[derive(Debug, Clone)]
pub struct CoordinatorSettings {
    pub guid: String,
    pub intervals: IntervalConfig,
    pub mark_alerts_as_read: bool,
    pub fetch_elevation: bool,
}

impl Default for CoordinatorSettings {
    fn default() -> Self {
        Self {
            guid: "default".to_string(),
            intervals: IntervalConfig::default(),
            mark_alerts_as_read: true,
            fetch_elevation: false,
        }
    }
}

/// Device registry entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    pub identifier: String,
    pub name: String,
    pub manufacturer: String,
    pub model: Option<String>,
    pub sw_version: String,
}

/// Display name of a device, falling back to its id
pub fn device_display_name(device: Option<&Device>, device_id: DeviceId) -> String {
    device
        .and_then(|d| d.name.as_deref())
        .filter(|name| !name.trim().is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("PAJ GPS {}", device_id))
}

/// Read access to positions for sensors
#[async_trait]
pub trait PositionSource: Send + Sync {
    /// Make sure positions are fresh; may replay the outcome of a recent refresh
    async fn refresh(&self) -> Result<()>;

    fn get_position(&self, device_id: DeviceId) -> Option<PositionRecord>;
}

#[derive(Debug, Clone)]
struct PositionsWindow {
    opened_at: Instant,
    outcome: std::result::Result<(), String>,
}

#[derive(Debug, Clone, Copy)]
struct ElevationFetch {
    at: Instant,
    lat: f64,
    lng: f64,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub struct Coordinator {
    api: Arc<dyn TrackerApi>,
    elevation_api: Option<Arc<dyn ElevationApi>>,
    settings: CoordinatorSettings,
    store: PositionStore,
    data: Arc<ArcSwap<CoordinatorData>>,
    devices_run: Mutex<Option<Instant>>,
    notifications_run: Mutex<Option<Instant>>,
    positions_window: tokio::sync::Mutex<Option<PositionsWindow>>,
    elevation_fetches: Mutex<HashMap<DeviceId, ElevationFetch>>,
    tasks: Mutex<JoinSet<()>>,
}

impl std::fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("settings", &self.settings)
            .field("positions", &self.store.len())
            .finish_non_exhaustive()
    }
}

impl Coordinator {
    pub fn new(
        api: Arc<dyn TrackerApi>,
        elevation_api: Option<Arc<dyn ElevationApi>>,
        settings: CoordinatorSettings,
    ) -> Self {
        Self {
            api,
            elevation_api,
            settings,
            store: PositionStore::new(),
            data: Arc::new(ArcSwap::from_pointee(CoordinatorData::default())),
            devices_run: Mutex::new(None),
            notifications_run: Mutex::new(None),
            positions_window: tokio::sync::Mutex::new(None),
            elevation_fetches: Mutex::new(HashMap::new()),
            tasks: Mutex::new(JoinSet::new()),
        }
    }

    pub fn api(&self) -> &Arc<dyn TrackerApi> {
        &self.api
    }

    pub fn settings(&self) -> &CoordinatorSettings {
        &self.settings
    }

    /// Current snapshot of devices, notifications and elevations
    pub fn data(&self) -> Arc<CoordinatorData> {
        self.data.load_full()
    }

    pub fn store(&self) -> &PositionStore {
        &self.store
    }

    /// One host tick: log in, then run every tier that is due
    ///
    /// Only an authentication failure is returned; tier failures are logged.
    pub async fn tick(&self) -> Result<()> {
        self.reap_tasks();
        self.api.login(false).await?;

        if Self::due(&self.devices_run, self.settings.intervals.devices) {
            if let Err(e) = self.update_devices().await {
                warn!(
                    code = e.error_code(),
                    transport = e.is_transport(),
                    "Device update failed, keeping {} known devices: {}",
                    self.data.load().devices.len(),
                    e
                );
                // retry on the next tick
                *lock(&self.devices_run) = None;
            }
        }

        if let Err(e) = self.refresh_positions().await {
            error!(code = e.error_code(), "Position update failed: {}", e);
        }

        if Self::due(&self.notifications_run, self.settings.intervals.notifications) {
            if let Err(e) = self.update_notifications().await {
                warn!(code = e.error_code(), "Notification update failed: {}", e);
                *lock(&self.notifications_run) = None;
            }
        }

        Ok(())
    }

    /// Claim a tier run if its interval has elapsed
    fn due(last_run: &Mutex<Option<Instant>>, interval: Duration) -> bool {
        let mut last = lock(last_run);
        match *last {
            Some(at) if at.elapsed() < interval => false,
            _ => {
                *last = Some(Instant::now());
                true
            },
        }
    }

    async fn update_devices(&self) -> Result<()> {
        let devices = self.api.get_devices().await?;
        info!("Fetched {} devices", devices.len());

        self.data.rcu(|current| {
            let mut next = CoordinatorData::clone(current);
            next.elevations
                .retain(|id, _| devices.iter().any(|d| d.id == *id));
            next.devices = devices.clone();
            next
        });
        lock(&self.elevation_fetches).retain(|id, _| devices.iter().any(|d| d.id == *id));
        Ok(())
    }

    /// Run the positions tier unless the current freshness window is still open
    ///
    /// Within a window every caller gets the outcome of the refresh that
    /// opened it, so all sensors see the same result for one poll cycle.
    pub async fn refresh_positions(&self) -> Result<()> {
        let mut window = self.positions_window.lock().await;

        if let Some(open) = window.as_ref() {
            if open.opened_at.elapsed() < self.settings.intervals.positions {
                return open.outcome.clone().map_err(TrackerError::RefreshFailed);
            }
        }

        // age counts from the start of the fetch
        let started = Instant::now();
        let outcome = self.update_positions().await;
        *window = Some(PositionsWindow {
            opened_at: started,
            outcome: outcome.as_ref().map(|_| ()).map_err(|e| e.to_string()),
        });
        outcome
    }

    async fn update_positions(&self) -> Result<()> {
        let device_ids: Vec<DeviceId> = self.data.load().devices.iter().map(|d| d.id).collect();
        let count = self.store.refresh(self.api.as_ref(), &device_ids).await?;
        debug!("Positions updated for {} devices", count);

        if self.settings.fetch_elevation {
            self.schedule_elevation_updates();
        }
        Ok(())
    }

    fn schedule_elevation_updates(&self) {
        let Some(elevation_api) = self.elevation_api.as_ref() else {
            return;
        };

        let positions = self.store.snapshot();
        let known = self.data.load();
        let mut fetches = lock(&self.elevation_fetches);
        let mut tasks = lock(&self.tasks);

        for record in positions.values() {
            let Some((lat, lng)) = record.coordinates() else {
                continue;
            };
            let device_id = record.device_id;

            let needed = match (known.elevations.contains_key(&device_id), fetches.get(&device_id)) {
                (false, _) | (true, None) => true,
                (true, Some(last)) => {
                    last.at.elapsed() >= MIN_ELEVATION_UPDATE_DELAY
                        && ((lat - last.lat).abs() >= MIN_ELEVATION_DISTANCE
                            || (lng - last.lng).abs() >= MIN_ELEVATION_DISTANCE)
                },
            };
            if !needed {
                continue;
            }

            fetches.insert(
                device_id,
                ElevationFetch {
                    at: Instant::now(),
                    lat,
                    lng,
                },
            );

            let api = Arc::clone(elevation_api);
            let data = Arc::clone(&self.data);
            tasks.spawn(async move {
                match api.fetch_elevation(lat, lng).await {
                    Ok(Some(metres)) => {
                        let metres = metres.round();
                        data.rcu(|current| {
                            let mut next = CoordinatorData::clone(current);
                            next.elevations.insert(device_id, metres);
                            next
                        });
                        debug!("Elevation for device {} is {} m", device_id, metres);
                    },
                    Ok(None) => debug!("No elevation available for device {}", device_id),
                    Err(e) => warn!("Elevation lookup for device {} failed: {}", device_id, e),
                }
            });
        }
    }

    async fn update_notifications(&self) -> Result<()> {
        let unread: Vec<Notification> = self
            .api
            .get_unread_notifications()
            .await?
            .into_iter()
            .filter(|n| !n.is_read)
            .collect();

        let alert_types: BTreeSet<u8> = unread.iter().map(|n| n.alert_type).collect();

        self.data.rcu(|current| {
            let mut next = CoordinatorData::clone(current);
            let mut grouped: HashMap<DeviceId, Vec<Notification>> =
                next.devices.iter().map(|d| (d.id, Vec::new())).collect();
            for notification in &unread {
                grouped
                    .entry(notification.device_id)
                    .or_default()
                    .push(notification.clone());
            }
            next.notifications = grouped;
            next
        });
        debug!("{} unread notifications", unread.len());

        if self.settings.mark_alerts_as_read && !alert_types.is_empty() {
            let mut tasks = lock(&self.tasks);
            for alert_type in alert_types {
                let api = Arc::clone(&self.api);
                tasks.spawn(async move {
                    if let Err(e) = api.mark_notifications_read(alert_type).await {
                        warn!("Failed to mark alert type {} as read: {}", alert_type, e);
                    }
                });
            }
        }
        Ok(())
    }

    /// Enable or disable an alert on a device
    ///
    /// The API is called first; the local snapshot only changes once it accepted.
    pub async fn update_alert_state(
        &self,
        device_id: DeviceId,
        alert: AlertType,
        enabled: bool,
    ) -> Result<()> {
        if self.data.load().device(device_id).is_none() {
            return Err(TrackerError::DeviceNotFound(device_id));
        }

        self.api.update_device_flag(device_id, alert, enabled).await?;

        self.data.rcu(|current| {
            let mut next = CoordinatorData::clone(current);
            if let Some(device) = next.devices.iter_mut().find(|d| d.id == device_id) {
                device.set_alert_enabled(alert, enabled);
            }
            next
        });
        info!("{} on device {} set to {}", alert, device_id, enabled);
        Ok(())
    }

    pub fn device_info(&self, device_id: DeviceId) -> Option<DeviceInfo> {
        let data = self.data.load();
        let device = data.device(device_id)?;
        Some(DeviceInfo {
            identifier: format!("{}_{}_{}", DOMAIN, self.settings.guid, device_id),
            name: device_display_name(Some(device), device_id),
            manufacturer: MANUFACTURER.to_string(),
            model: device.model.clone(),
            sw_version: env!("CARGO_PKG_VERSION").to_string(),
        })
    }

    /// Number of background tasks not yet collected
    pub fn pending_tasks(&self) -> usize {
        lock(&self.tasks).len()
    }

    /// Wait for every background task to finish
    pub async fn drain_tasks(&self) {
        let mut tasks = std::mem::take(&mut *lock(&self.tasks));
        while let Some(result) = tasks.join_next().await {
            if let Err(e) = result {
                if e.is_panic() {
                    error!("Background task panicked: {}", e);
                }
            }
        }
    }

    fn reap_tasks(&self) {
        let mut tasks = lock(&self.tasks);
        while let Some(result) = tasks.try_join_next() {
            if let Err(e) = result {
                if e.is_panic() {
                    error!("Background task panicked: {}", e);
                }
            }
        }
    }

    /// Abort and collect all background tasks
    pub async fn shutdown(&self) {
        let mut tasks = std::mem::take(&mut *lock(&self.tasks));
        let pending = tasks.len();
        tasks.abort_all();
        while tasks.join_next().await.is_some() {}
        info!("Coordinator stopped ({} background tasks cancelled)", pending);
    }
}

#[async_trait]
impl PositionSource for Coordinator {
    async fn refresh(&self) -> Result<()> {
        self.refresh_positions().await
    }

    fn get_position(&self, device_id: DeviceId) -> Option<PositionRecord> {
        self.store.get_position(device_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pajgps_api::models::parse_devices;
    use pajgps_api::PositionPayload;
    use serde_json::json;

    struct StubApi {
        devices: Mutex<Vec<Device>>,
    }

    #[async_trait]
    impl TrackerApi for StubApi {
        async fn login(&self, _force: bool) -> Result<()> {
            Ok(())
        }

        async fn get_devices(&self) -> Result<Vec<Device>> {
            Ok(lock(&self.devices).clone())
        }

        async fn get_all_last_positions(&self, device_ids: &[DeviceId]) -> Result<Vec<PositionPayload>> {
            Ok(device_ids
                .iter()
                .map(|id| PositionPayload::from(json!({ "iddevice": id, "lat": 52.5, "lng": 13.4 })))
                .collect())
        }

        async fn get_unread_notifications(&self) -> Result<Vec<Notification>> {
            Ok(Vec::new())
        }

        async fn mark_notifications_read(&self, _alert_type: u8) -> Result<()> {
            Ok(())
        }

        async fn update_device_flag(&self, _device_id: DeviceId, _alert: AlertType, _enabled: bool) -> Result<()> {
            Ok(())
        }

        async fn check_availability(&self) -> bool {
            true
        }
    }

    struct FlatTerrain;

    #[async_trait]
    impl ElevationApi for FlatTerrain {
        async fn fetch_elevation(&self, _lat: f64, _lng: f64) -> Result<Option<f64>> {
            Ok(Some(40.0))
        }
    }

    fn devices(ids: &[DeviceId]) -> Vec<Device> {
        let entries: Vec<_> = ids
            .iter()
            .map(|id| json!({ "id": id, "name": "Van", "device_models": [{ "model": "Finder" }] }))
            .collect();
        parse_devices(json!({ "success": entries })).unwrap()
    }

    #[tokio::test]
    async fn test_removed_devices_drop_elevation_bookkeeping() {
        let api = Arc::new(StubApi {
            devices: Mutex::new(devices(&[1, 2])),
        });
        let settings = CoordinatorSettings {
            fetch_elevation: true,
            ..CoordinatorSettings::default()
        };
        let elevation: Arc<dyn ElevationApi> = Arc::new(FlatTerrain);
        let coordinator = Coordinator::new(api.clone(), Some(elevation), settings);

        coordinator.update_devices().await.unwrap();
        coordinator.refresh_positions().await.unwrap();
        coordinator.drain_tasks().await;
        assert_eq!(lock(&coordinator.elevation_fetches).len(), 2);
        assert_eq!(coordinator.data().elevations.len(), 2);

        *lock(&api.devices) = devices(&[2]);
        coordinator.update_devices().await.unwrap();
        assert!(!lock(&coordinator.elevation_fetches).contains_key(&1));
        assert!(lock(&coordinator.elevation_fetches).contains_key(&2));
        assert_eq!(coordinator.data().elevations.len(), 1);
    }

    #[test]
    fn test_display_name_fallback() {
        assert_eq!(device_display_name(None, 7), "PAJ GPS 7");
    }

    #[test]
    fn test_due_claims_run() {
        let last = Mutex::new(None);
        assert!(Coordinator::due(&last, Duration::from_secs(60)));
        assert!(!Coordinator::due(&last, Duration::from_secs(60)));
        assert!(Coordinator::due(&last, Duration::ZERO));
    }
}
