//! Raw `volt` field → store → voltage sensor, end to end

mod common;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use common::{coordinator, device, position, settings, FakeTrackerApi};
use errors::{Result, TrackerError};
use pajgps_api::DeviceId;
use serde_json::{json, Value};
use tracing_test::traced_test;
use trackersrv::entities::VoltageSensor;
use trackersrv::{Entity, EntityState, PositionRecord, PositionSource};

async fn sensor_for(volt: Value) -> (Arc<FakeTrackerApi>, VoltageSensor) {
    let api = FakeTrackerApi::with_devices(vec![device(1, "Van", true)]);
    api.set_positions(vec![position(1, volt)]);

    let coordinator = coordinator(&api, settings(Duration::from_secs(30)));
    coordinator.tick().await.unwrap();

    let sensor = VoltageSensor::new(coordinator, "test-guid", 1, "Van");
    (api, sensor)
}

#[tokio::test]
async fn test_millivolt_string_reaches_sensor_in_volts() {
    let (_api, mut sensor) = sensor_for(json!("12500")).await;
    sensor.update().await;

    assert_eq!(sensor.value(), Some(12.5));
    assert_eq!(sensor.state(), EntityState::Number(12.5));
    assert_eq!(sensor.unit(), Some("V"));
    assert_eq!(sensor.unique_id(), "pajgps_test-guid_1_voltage");
    assert_eq!(sensor.name(), "Van Voltage");
}

#[tokio::test]
async fn test_implausible_voltage_is_dropped_by_sensor() {
    let api = FakeTrackerApi::with_devices(vec![device(1, "Van", true)]);
    api.set_positions(vec![position(1, json!("999999"))]);
    let coordinator = coordinator(&api, settings(Duration::from_secs(30)));
    coordinator.tick().await.unwrap();

    // stored as converted, rejected only at the sensor
    assert_eq!(coordinator.store().get_position(1).unwrap().voltage, Some(999.999));

    let mut sensor = VoltageSensor::new(coordinator, "test-guid", 1, "Van");
    sensor.update().await;
    assert_eq!(sensor.value(), None);
    assert_eq!(sensor.state(), EntityState::Unavailable);
}

#[tokio::test]
#[traced_test]
async fn test_missing_volt_field_is_absent_without_warning() {
    let (_api, mut sensor) = sensor_for(Value::Null).await;
    sensor.update().await;

    assert_eq!(sensor.value(), None);
    assert!(!logs_contain("Unparseable voltage"));
}

#[tokio::test]
#[traced_test]
async fn test_non_numeric_volt_is_logged_and_absent() {
    let (_api, mut sensor) = sensor_for(json!("N/A")).await;
    sensor.update().await;

    assert_eq!(sensor.value(), None);
    assert!(logs_contain("Unparseable voltage value"));
    assert!(logs_contain("N/A"));
}

#[tokio::test]
async fn test_one_malformed_entry_does_not_abort_refresh() {
    let api = FakeTrackerApi::with_devices(vec![device(1, "Van", true), device(2, "Boat", true)]);
    api.set_positions(vec![
        position(1, json!({"unexpected": "object"})),
        position(2, json!(3.9)),
        json!({ "lat": 1.0, "lng": 2.0 }),
    ]);
    let coordinator = coordinator(&api, settings(Duration::from_secs(30)));
    coordinator.tick().await.unwrap();

    let store = coordinator.store();
    assert_eq!(store.len(), 2);
    assert_eq!(store.get_position(1).unwrap().voltage, None);
    assert_eq!(store.get_position(2).unwrap().voltage, Some(3.9));
}

#[tokio::test]
#[traced_test]
async fn test_refresh_failure_keeps_store_and_blanks_sensor() {
    let api = FakeTrackerApi::with_devices(vec![device(1, "Van", true)]);
    api.set_positions(vec![position(1, json!(12500))]);
    // zero window: every sensor update refreshes
    let coordinator = coordinator(&api, settings(Duration::ZERO));
    coordinator.tick().await.unwrap();

    let mut sensor = VoltageSensor::new(coordinator.clone(), "test-guid", 1, "Van");
    sensor.update().await;
    assert_eq!(sensor.value(), Some(12.5));

    let before = coordinator.store().get_position(1).unwrap();
    api.fail_positions.store(true, Ordering::SeqCst);
    sensor.update().await;

    assert_eq!(sensor.value(), None);
    assert_eq!(coordinator.store().get_position(1), Some(before));
    assert!(logs_contain("Voltage update for device 1 failed"));
}

#[tokio::test]
async fn test_sensors_share_one_refresh_per_window() {
    let api = FakeTrackerApi::with_devices(vec![device(1, "Van", true), device(2, "Boat", true)]);
    api.set_positions(vec![position(1, json!(12500)), position(2, json!(4100))]);
    api.fail_positions.store(true, Ordering::SeqCst);

    let coordinator = coordinator(&api, settings(Duration::from_secs(60)));
    coordinator.tick().await.unwrap();
    assert_eq!(FakeTrackerApi::calls(&api.position_calls), 1);

    // failure replayed to every sensor in the window, no extra requests
    let mut van = VoltageSensor::new(coordinator.clone(), "test-guid", 1, "Van");
    let mut boat = VoltageSensor::new(coordinator.clone(), "test-guid", 2, "Boat");
    van.update().await;
    boat.update().await;

    assert_eq!(van.value(), None);
    assert_eq!(boat.value(), None);
    assert_eq!(FakeTrackerApi::calls(&api.position_calls), 1);

    let replayed = coordinator.refresh().await.unwrap_err();
    assert!(matches!(replayed, TrackerError::RefreshFailed(_)));
}

/// Position source with a fixed voltage
struct FixedSource {
    voltage: Mutex<Option<f64>>,
    fail: AtomicBool,
}

impl FixedSource {
    fn new(voltage: Option<f64>) -> Arc<Self> {
        Arc::new(Self {
            voltage: Mutex::new(voltage),
            fail: AtomicBool::new(false),
        })
    }
}

#[async_trait]
impl PositionSource for FixedSource {
    async fn refresh(&self) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(TrackerError::Timeout("positions".to_string()));
        }
        Ok(())
    }

    fn get_position(&self, device_id: DeviceId) -> Option<PositionRecord> {
        Some(PositionRecord {
            device_id,
            voltage: *self.voltage.lock().unwrap(),
            lat: None,
            lng: None,
            direction: None,
            speed: None,
            battery: None,
        })
    }
}

#[tokio::test]
async fn test_plausibility_range_is_inclusive() {
    for (voltage, expected) in [
        (Some(0.0), Some(0.0)),
        (Some(50.0), Some(50.0)),
        (Some(12.6), Some(12.6)),
        (Some(50.01), None),
        (Some(-0.5), None),
        (None, None),
    ] {
        let mut sensor = VoltageSensor::new(FixedSource::new(voltage), "g", 9, "Bike");
        sensor.update().await;
        assert_eq!(sensor.value(), expected, "stored voltage {:?}", voltage);
    }
}

#[tokio::test]
async fn test_unknown_device_is_absent() {
    let api = FakeTrackerApi::with_devices(vec![device(1, "Van", true)]);
    api.set_positions(vec![position(1, json!(12500))]);
    let coordinator = coordinator(&api, settings(Duration::from_secs(30)));
    coordinator.tick().await.unwrap();

    let mut sensor = VoltageSensor::new(coordinator, "test-guid", 404, "Ghost");
    sensor.update().await;
    assert_eq!(sensor.value(), None);
}

#[tokio::test]
async fn test_fetch_error_clears_previous_value() {
    let source = FixedSource::new(Some(12.0));
    let mut sensor = VoltageSensor::new(source.clone(), "g", 1, "Bike");
    sensor.update().await;
    assert_eq!(sensor.value(), Some(12.0));

    source.fail.store(true, Ordering::SeqCst);
    sensor.update().await;
    assert_eq!(sensor.value(), None);

    source.fail.store(false, Ordering::SeqCst);
    *source.voltage.lock().unwrap() = Some(12.2);
    sensor.update().await;
    assert_eq!(sensor.value(), Some(12.2));
}
