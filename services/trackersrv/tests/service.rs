mod common;

use std::time::Duration;

use common::{coordinator, device, position, settings, FakeTrackerApi};
use serde_json::json;
use trackersrv::config::OptionsConfig;
use trackersrv::{EntityState, TrackerService};

#[tokio::test]
async fn test_start_builds_and_updates_entities() {
    let api = FakeTrackerApi::with_devices(vec![device(1, "Van", true)]);
    api.set_positions(vec![position(1, json!("12500"))]);
    let mut service = TrackerService::new(
        coordinator(&api, settings(Duration::from_secs(30))),
        OptionsConfig::default(),
    );

    service.start().await.unwrap();
    assert!(service.check_availability().await);

    let snapshot = service.snapshot();
    let voltage = snapshot
        .iter()
        .find(|e| e.unique_id == "pajgps_test-guid_1_voltage")
        .unwrap();
    assert_eq!(voltage.state, EntityState::Number(12.5));
    assert_eq!(voltage.unit, Some("V"));

    let rendered = serde_json::to_value(&snapshot).unwrap();
    let tracker = rendered
        .as_array()
        .unwrap()
        .iter()
        .find(|e| e["unique_id"] == "pajgps_test-guid_1_gps")
        .unwrap();
    assert_eq!(tracker["state"]["latitude"], json!(52.52));
    assert_eq!(tracker["kind"], json!("device_tracker"));
}

#[tokio::test]
async fn test_entities_created_once_devices_appear() {
    let api = FakeTrackerApi::with_devices(Vec::new());
    let mut settings = settings(Duration::from_secs(30));
    settings.intervals.devices = Duration::ZERO;
    let mut service = TrackerService::new(coordinator(&api, settings), OptionsConfig::default());

    service.start().await.unwrap();
    assert!(service.entities().is_empty());

    *api.devices.lock().unwrap() = vec![device(5, "Trailer", false)];
    service.poll().await;
    assert!(!service.entities().is_empty());
    service.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_run_until_stops_on_signal() {
    let api = FakeTrackerApi::with_devices(vec![device(1, "Van", true)]);
    let mut service = TrackerService::new(
        coordinator(&api, settings(Duration::from_secs(30))),
        OptionsConfig::default(),
    );
    service.start().await.unwrap();

    service
        .run_until(Duration::from_secs(10), tokio::time::sleep(Duration::from_secs(35)))
        .await;
    assert_eq!(FakeTrackerApi::calls(&api.login_calls), 4);
}
