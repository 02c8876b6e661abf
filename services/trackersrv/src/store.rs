//! Latest-position store
//!
//! Holds one record per device, replaced wholesale on every refresh. A
//! refresh builds the next map off to the side and publishes it with a single
//! pointer swap, so readers see either the old snapshot or the new one and a
//! failed or cancelled refresh leaves the old one in place.

use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;
use errors::Result;
use pajgps_api::{DeviceId, PositionPayload, TrackerApi};
use serde::Serialize;
use tracing::{debug, warn};

use crate::voltage::normalize;

/// Most recent position of one tracker
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PositionRecord {
    pub device_id: DeviceId,
    /// Volts; never a raw millivolt value
    pub voltage: Option<f64>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub direction: Option<i64>,
    pub speed: Option<i64>,
    pub battery: Option<i64>,
}

impl PositionRecord {
    pub fn from_payload(device_id: DeviceId, payload: &PositionPayload) -> Self {
        Self {
            device_id,
            voltage: normalize(payload.field("volt")).volts(),
            lat: payload.f64_field("lat"),
            lng: payload.f64_field("lng"),
            direction: payload.i64_field("direction"),
            speed: payload.i64_field("speed"),
            battery: payload.i64_field("battery"),
        }
    }

    /// Latitude and longitude when both are known
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        Some((self.lat?, self.lng?))
    }
}

pub type PositionMap = HashMap<DeviceId, PositionRecord>;

#[derive(Debug, Default)]
pub struct PositionStore {
    records: ArcSwap<PositionMap>,
}

impl PositionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the latest positions and replace the whole map
    ///
    /// Returns the number of records now stored. On fetch failure the error
    /// is returned and the previous map stays published.
    pub async fn refresh(&self, api: &dyn TrackerApi, device_ids: &[DeviceId]) -> Result<usize> {
        if device_ids.is_empty() {
            self.records.store(Arc::new(PositionMap::new()));
            return Ok(0);
        }

        let payloads = api.get_all_last_positions(device_ids).await?;

        let mut next = PositionMap::with_capacity(payloads.len());
        for payload in &payloads {
            let Some(device_id) = payload.device_id() else {
                warn!("Skipping position entry without a usable iddevice: {:?}", payload.0);
                continue;
            };
            next.insert(device_id, PositionRecord::from_payload(device_id, payload));
        }

        let count = next.len();
        self.records.store(Arc::new(next));
        debug!("Position store refreshed with {} records", count);
        Ok(count)
    }

    /// Current record for a device; never blocks, never fetches
    pub fn get_position(&self, device_id: DeviceId) -> Option<PositionRecord> {
        self.records.load().get(&device_id).cloned()
    }

    /// Consistent view for multi-device reads
    pub fn snapshot(&self) -> Arc<PositionMap> {
        self.records.load_full()
    }

    pub fn len(&self) -> usize {
        self.records.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.load().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_from_payload() {
        let payload = PositionPayload::from(json!({
            "iddevice": 3,
            "lat": 52.52,
            "lng": "13.41",
            "direction": 180,
            "speed": 42,
            "battery": "87",
            "volt": 12500
        }));
        let record = PositionRecord::from_payload(3, &payload);

        assert_eq!(record.voltage, Some(12.5));
        assert_eq!(record.coordinates(), Some((52.52, 13.41)));
        assert_eq!(record.direction, Some(180));
        assert_eq!(record.speed, Some(42));
        assert_eq!(record.battery, Some(87));
    }

    #[test]
    fn test_malformed_fields_become_none() {
        let payload = PositionPayload::from(json!({
            "iddevice": 3,
            "lat": "north",
            "lng": 13.41,
            "speed": null,
            "volt": "N/A"
        }));
        let record = PositionRecord::from_payload(3, &payload);

        assert_eq!(record.voltage, None);
        assert_eq!(record.lat, None);
        assert_eq!(record.coordinates(), None);
        assert_eq!(record.speed, None);
        assert_eq!(record.battery, None);
    }

    #[test]
    fn test_empty_store() {
        let store = PositionStore::new();
        assert!(store.is_empty());
        assert_eq!(store.len(), 0);
        assert_eq!(store.get_position(1), None);
        assert!(store.snapshot().is_empty());
    }
}
