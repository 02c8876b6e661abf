//! Typed views over tracker API payloads

use errors::{payload_error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::alert::AlertType;
use crate::serde_helpers::{deserialize_flag, deserialize_id, deserialize_opt_string};

/// Tracker identifier (`id` in the device list, `iddevice` elsewhere)
pub type DeviceId = u64;

/// A tracker as reported by `GET device`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Device {
    pub id: DeviceId,
    pub name: Option<String>,
    pub imei: Option<String>,
    pub model: Option<String>,

    // Model capabilities (device_models[0])
    pub has_battery: bool,
    pub has_alarm_sos: bool,
    pub has_alarm_shock: bool,
    pub has_alarm_voltage: bool,
    pub has_alarm_battery: bool,
    pub has_alarm_speed: bool,
    pub has_alarm_power_cutoff: bool,
    pub has_alarm_ignition: bool,
    pub has_alarm_drop: bool,

    // Per-device switches
    pub alarm_sos_enabled: bool,
    pub alarm_shock_enabled: bool,
    pub alarm_voltage_enabled: bool,
    pub alarm_battery_enabled: bool,
    pub alarm_speed_enabled: bool,
    pub alarm_power_cutoff_enabled: bool,
    pub alarm_ignition_enabled: bool,
    pub alarm_drop_enabled: bool,
}

impl Device {
    /// Whether the device model can raise this alert at all
    pub fn supports(&self, alert: AlertType) -> bool {
        match alert {
            AlertType::Shock => self.has_alarm_shock,
            AlertType::Battery => self.has_alarm_battery,
            AlertType::Sos => self.has_alarm_sos,
            AlertType::Speed => self.has_alarm_speed,
            AlertType::PowerCutoff => self.has_alarm_power_cutoff,
            AlertType::Ignition => self.has_alarm_ignition,
            AlertType::Drop => self.has_alarm_drop,
            AlertType::Voltage => self.has_alarm_voltage,
        }
    }

    pub fn alert_enabled(&self, alert: AlertType) -> bool {
        match alert {
            AlertType::Shock => self.alarm_shock_enabled,
            AlertType::Battery => self.alarm_battery_enabled,
            AlertType::Sos => self.alarm_sos_enabled,
            AlertType::Speed => self.alarm_speed_enabled,
            AlertType::PowerCutoff => self.alarm_power_cutoff_enabled,
            AlertType::Ignition => self.alarm_ignition_enabled,
            AlertType::Drop => self.alarm_drop_enabled,
            AlertType::Voltage => self.alarm_voltage_enabled,
        }
    }

    pub fn set_alert_enabled(&mut self, alert: AlertType, enabled: bool) {
        let flag = match alert {
            AlertType::Shock => &mut self.alarm_shock_enabled,
            AlertType::Battery => &mut self.alarm_battery_enabled,
            AlertType::Sos => &mut self.alarm_sos_enabled,
            AlertType::Speed => &mut self.alarm_speed_enabled,
            AlertType::PowerCutoff => &mut self.alarm_power_cutoff_enabled,
            AlertType::Ignition => &mut self.alarm_ignition_enabled,
            AlertType::Drop => &mut self.alarm_drop_enabled,
            AlertType::Voltage => &mut self.alarm_voltage_enabled,
        };
        *flag = enabled;
    }

    /// Alert kinds the model supports, in code order
    pub fn supported_alerts(&self) -> impl Iterator<Item = AlertType> + '_ {
        AlertType::ALL.into_iter().filter(|a| self.supports(*a))
    }
}

#[derive(Debug, Deserialize)]
struct RawDevice {
    #[serde(deserialize_with = "deserialize_id")]
    id: DeviceId,
    #[serde(default, deserialize_with = "deserialize_opt_string")]
    name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_opt_string")]
    imei: Option<String>,
    #[serde(default)]
    device_models: Vec<RawDeviceModel>,
    #[serde(default, deserialize_with = "deserialize_flag")]
    alarmsos: bool,
    #[serde(default, deserialize_with = "deserialize_flag")]
    alarmbewegung: bool,
    #[serde(default, deserialize_with = "deserialize_flag")]
    alarm_volt: bool,
    #[serde(default, deserialize_with = "deserialize_flag")]
    alarmakkuwarnung: bool,
    #[serde(default, deserialize_with = "deserialize_flag")]
    alarmgeschwindigkeit: bool,
    #[serde(default, deserialize_with = "deserialize_flag")]
    alarmstromunterbrechung: bool,
    #[serde(default, deserialize_with = "deserialize_flag")]
    alarmzuendalarm: bool,
    #[serde(default, deserialize_with = "deserialize_flag")]
    alarm_fall_enabled: bool,
}

#[derive(Debug, Deserialize)]
struct RawDeviceModel {
    #[serde(default, deserialize_with = "deserialize_opt_string")]
    model: Option<String>,
    #[serde(default, deserialize_with = "deserialize_flag")]
    standalone_battery: bool,
    #[serde(default, deserialize_with = "deserialize_flag")]
    alarm_sos: bool,
    #[serde(default, deserialize_with = "deserialize_flag")]
    alarm_erschuetterung: bool,
    #[serde(default, deserialize_with = "deserialize_flag")]
    alarm_volt: bool,
    #[serde(default, deserialize_with = "deserialize_flag")]
    alarm_batteriestand: bool,
    #[serde(default, deserialize_with = "deserialize_flag")]
    alarm_geschwindigkeit: bool,
    #[serde(default, deserialize_with = "deserialize_flag")]
    alarm_stromunterbrechung: bool,
    #[serde(default, deserialize_with = "deserialize_flag")]
    alarm_zuendalarm: bool,
    #[serde(default, deserialize_with = "deserialize_flag")]
    alarm_drop: bool,
}

impl RawDevice {
    fn into_device(self) -> Option<Device> {
        let mut models = self.device_models.into_iter();
        let Some(model) = models.next() else {
            warn!("Device {} has no device_models, skipping", self.id);
            return None;
        };

        Some(Device {
            id: self.id,
            name: self.name,
            imei: self.imei,
            model: model.model,
            has_battery: model.standalone_battery,
            has_alarm_sos: model.alarm_sos,
            has_alarm_shock: model.alarm_erschuetterung,
            has_alarm_voltage: model.alarm_volt,
            has_alarm_battery: model.alarm_batteriestand,
            has_alarm_speed: model.alarm_geschwindigkeit,
            has_alarm_power_cutoff: model.alarm_stromunterbrechung,
            has_alarm_ignition: model.alarm_zuendalarm,
            has_alarm_drop: model.alarm_drop,
            alarm_sos_enabled: self.alarmsos,
            alarm_shock_enabled: self.alarmbewegung,
            alarm_voltage_enabled: self.alarm_volt,
            alarm_battery_enabled: self.alarmakkuwarnung,
            alarm_speed_enabled: self.alarmgeschwindigkeit,
            alarm_power_cutoff_enabled: self.alarmstromunterbrechung,
            alarm_ignition_enabled: self.alarmzuendalarm,
            alarm_drop_enabled: self.alarm_fall_enabled,
        })
    }
}

/// An unread (or read) alert notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    #[serde(rename = "iddevice", deserialize_with = "deserialize_id")]
    pub device_id: DeviceId,
    #[serde(rename = "meldungtyp")]
    pub alert_type: u8,
    #[serde(rename = "isread", default, deserialize_with = "deserialize_flag")]
    pub is_read: bool,
}

impl Notification {
    /// The toggleable kind, if this code is one
    pub fn kind(&self) -> Option<AlertType> {
        AlertType::from_code(self.alert_type)
    }
}

/// One raw entry of `trackerdata/getalllastpositions`
///
/// Kept as a JSON object; field interpretation belongs to the consumer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PositionPayload(pub Map<String, Value>);

impl PositionPayload {
    /// `iddevice` as a number or numeric string
    pub fn device_id(&self) -> Option<DeviceId> {
        match self.0.get("iddevice")? {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Raw field; `None` when the key is absent
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Finite number from a JSON number or numeric string
    pub fn f64_field(&self, name: &str) -> Option<f64> {
        let value = match self.0.get(name)? {
            Value::Number(n) => n.as_f64()?,
            Value::String(s) => s.trim().parse::<f64>().ok()?,
            _ => return None,
        };
        value.is_finite().then_some(value)
    }

    /// Integer from a JSON number or numeric string; fractions are truncated
    pub fn i64_field(&self, name: &str) -> Option<i64> {
        match self.0.get(name)? {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
            Value::String(s) => {
                let s = s.trim();
                s.parse::<i64>()
                    .ok()
                    .or_else(|| s.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f as i64))
            },
            _ => None,
        }
    }
}

impl From<Value> for PositionPayload {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) => Self(map),
            _ => Self::default(),
        }
    }
}

/// The `success` member every tracker endpoint wraps its data in
pub(crate) fn success_field(body: Value, endpoint: &str) -> Result<Value> {
    match body {
        Value::Object(mut map) => map
            .remove("success")
            .ok_or_else(|| payload_error!("{} response has no 'success' member", endpoint)),
        other => Err(payload_error!("{} response is not an object: {}", endpoint, other)),
    }
}

fn success_array(body: Value, endpoint: &str) -> Result<Vec<Value>> {
    match success_field(body, endpoint)? {
        Value::Array(items) => Ok(items),
        other => Err(payload_error!("{} 'success' is not a list: {}", endpoint, other)),
    }
}

/// Parse the device list; malformed entries are skipped with a warning
pub fn parse_devices(body: Value) -> Result<Vec<Device>> {
    Ok(success_array(body, "device")?
        .into_iter()
        .filter_map(|entry| match serde_json::from_value::<RawDevice>(entry) {
            Ok(raw) => raw.into_device(),
            Err(e) => {
                warn!("Skipping malformed device entry: {}", e);
                None
            },
        })
        .collect())
}

/// Parse the notification list; malformed entries are skipped with a warning
pub fn parse_notifications(body: Value) -> Result<Vec<Notification>> {
    Ok(success_array(body, "notifications")?
        .into_iter()
        .filter_map(|entry| match serde_json::from_value::<Notification>(entry) {
            Ok(n) => Some(n),
            Err(e) => {
                warn!("Skipping malformed notification: {}", e);
                None
            },
        })
        .collect())
}

/// Split the positions response into raw per-device entries
pub fn parse_positions(body: Value) -> Result<Vec<PositionPayload>> {
    Ok(success_array(body, "trackerdata/getalllastpositions")?
        .into_iter()
        .map(PositionPayload::from)
        .collect())
}
