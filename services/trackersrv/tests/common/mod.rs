//! In-memory fakes for the tracker and elevation APIs
#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use errors::{Result, TrackerError};
use pajgps_api::models::parse_devices;
use pajgps_api::{AlertType, Device, DeviceId, ElevationApi, Notification, PositionPayload, TrackerApi};
use serde_json::{json, Value};
use trackersrv::config::IntervalConfig;
use trackersrv::{Coordinator, CoordinatorSettings};

#[derive(Default)]
pub struct FakeTrackerApi {
    pub devices: Mutex<Vec<Device>>,
    pub positions: Mutex<Vec<Value>>,
    pub notifications: Mutex<Vec<Notification>>,
    pub fail_login: AtomicBool,
    pub fail_devices: AtomicBool,
    pub fail_positions: AtomicBool,
    pub fail_notifications: AtomicBool,
    pub fail_flag_update: AtomicBool,
    pub login_calls: AtomicUsize,
    pub device_calls: AtomicUsize,
    pub position_calls: AtomicUsize,
    pub notification_calls: AtomicUsize,
    pub requested_ids: Mutex<Vec<Vec<DeviceId>>>,
    pub marked_read: Mutex<Vec<u8>>,
    pub flag_updates: Mutex<Vec<(DeviceId, AlertType, bool)>>,
    /// Latency of the positions endpoint
    pub positions_delay: Mutex<Duration>,
}

impl FakeTrackerApi {
    pub fn with_devices(devices: Vec<Device>) -> Arc<Self> {
        let api = Self::default();
        *api.devices.lock().unwrap() = devices;
        Arc::new(api)
    }

    pub fn set_positions(&self, positions: Vec<Value>) {
        *self.positions.lock().unwrap() = positions;
    }

    pub fn set_notifications(&self, notifications: Vec<Notification>) {
        *self.notifications.lock().unwrap() = notifications;
    }

    pub fn calls(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

fn transport_error() -> TrackerError {
    TrackerError::Http("connection refused".to_string())
}

#[async_trait]
impl TrackerApi for FakeTrackerApi {
    async fn login(&self, _force: bool) -> Result<()> {
        self.login_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_login.load(Ordering::SeqCst) {
            return Err(TrackerError::Auth("invalid credentials".to_string()));
        }
        Ok(())
    }

    async fn get_devices(&self) -> Result<Vec<Device>> {
        self.device_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_devices.load(Ordering::SeqCst) {
            return Err(transport_error());
        }
        Ok(self.devices.lock().unwrap().clone())
    }

    async fn get_all_last_positions(&self, device_ids: &[DeviceId]) -> Result<Vec<PositionPayload>> {
        self.position_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.positions_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.requested_ids.lock().unwrap().push(device_ids.to_vec());
        if self.fail_positions.load(Ordering::SeqCst) {
            return Err(transport_error());
        }
        Ok(self
            .positions
            .lock()
            .unwrap()
            .iter()
            .cloned()
            .map(PositionPayload::from)
            .collect())
    }

    async fn get_unread_notifications(&self) -> Result<Vec<Notification>> {
        self.notification_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_notifications.load(Ordering::SeqCst) {
            return Err(transport_error());
        }
        Ok(self.notifications.lock().unwrap().clone())
    }

    async fn mark_notifications_read(&self, alert_type: u8) -> Result<()> {
        self.marked_read.lock().unwrap().push(alert_type);
        Ok(())
    }

    async fn update_device_flag(&self, device_id: DeviceId, alert: AlertType, enabled: bool) -> Result<()> {
        if self.fail_flag_update.load(Ordering::SeqCst) {
            return Err(TrackerError::Api {
                status: 500,
                message: "flag update rejected".to_string(),
            });
        }
        self.flag_updates.lock().unwrap().push((device_id, alert, enabled));
        Ok(())
    }

    async fn check_availability(&self) -> bool {
        true
    }
}

#[derive(Default)]
pub struct FakeElevationApi {
    pub elevation: Mutex<Option<f64>>,
    pub calls: Mutex<Vec<(f64, f64)>>,
}

impl FakeElevationApi {
    pub fn returning(metres: f64) -> Arc<Self> {
        let api = Self::default();
        *api.elevation.lock().unwrap() = Some(metres);
        Arc::new(api)
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl ElevationApi for FakeElevationApi {
    async fn fetch_elevation(&self, lat: f64, lng: f64) -> Result<Option<f64>> {
        self.calls.lock().unwrap().push((lat, lng));
        Ok(*self.elevation.lock().unwrap())
    }
}

/// Device as the API reports it; `voltage` sets the voltage alarm capability
pub fn device(id: DeviceId, name: &str, voltage: bool) -> Device {
    let flag = u8::from(voltage);
    let body = json!({ "success": [{
        "id": id,
        "name": name,
        "imei": format!("35800000000{:04}", id),
        "alarmsos": 1,
        "alarm_volt": 0,
        "device_models": [{
            "model": "Allround Finder 4G",
            "standalone_battery": 1,
            "alarm_sos": 1,
            "alarm_volt": flag
        }]
    }]});
    parse_devices(body).unwrap().remove(0)
}

pub fn position(id: DeviceId, volt: Value) -> Value {
    let mut entry = json!({
        "iddevice": id,
        "lat": 52.52,
        "lng": 13.41,
        "direction": 90,
        "speed": 35,
        "battery": 76
    });
    if !volt.is_null() {
        entry["volt"] = volt;
    }
    entry
}

pub fn notification(device_id: DeviceId, alert_type: u8, is_read: bool) -> Notification {
    Notification {
        device_id,
        alert_type,
        is_read,
    }
}

pub fn settings(positions: Duration) -> CoordinatorSettings {
    CoordinatorSettings {
        guid: "test-guid".to_string(),
        intervals: IntervalConfig {
            devices: Duration::from_secs(300),
            positions,
            notifications: Duration::from_secs(10),
        },
        mark_alerts_as_read: true,
        fetch_elevation: false,
    }
}

pub fn coordinator(api: &Arc<FakeTrackerApi>, settings: CoordinatorSettings) -> Arc<Coordinator> {
    let api: Arc<dyn TrackerApi> = api.clone();
    Arc::new(Coordinator::new(api, None, settings))
}
